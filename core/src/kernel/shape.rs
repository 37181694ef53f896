//! Shapes handled by [`super::TruckKernel`].

use crate::geometry::{Curve, ParamRect, Surface};
use serde::{Deserialize, Serialize};

/// A topological shape.
///
/// Solids are full `truck` B-reps, serialised in truck's compressed form
/// (topology as index tables). Faces, edges and wires wrap the analytic
/// reference geometry directly: a face is a surface restricted to a
/// parameter window, a wire an ordered run of oriented edge curves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Shape {
    Solid(truck_modeling::Solid),
    Face { surface: Surface, window: ParamRect },
    Edge { curve: Curve },
    Wire { edges: Vec<Curve> },
    Compound(Vec<Shape>),
}

impl Shape {
    pub fn face(surface: Surface) -> Self {
        let window = surface.bounds();
        Shape::Face { surface, window }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Solid(_) => "solid",
            Shape::Face { .. } => "face",
            Shape::Edge { .. } => "edge",
            Shape::Wire { .. } => "wire",
            Shape::Compound(_) => "compound",
        }
    }

    pub fn as_solid(&self) -> Option<&truck_modeling::Solid> {
        match self {
            Shape::Solid(s) => Some(s),
            _ => None,
        }
    }

    /// All faces, depth first. Solids contribute none.
    pub fn faces(&self) -> Vec<(&Surface, &ParamRect)> {
        let mut out = Vec::new();
        self.collect_faces(&mut out);
        out
    }

    fn collect_faces<'a>(&'a self, out: &mut Vec<(&'a Surface, &'a ParamRect)>) {
        match self {
            Shape::Face { surface, window } => out.push((surface, window)),
            Shape::Compound(items) => items.iter().for_each(|s| s.collect_faces(out)),
            _ => {}
        }
    }

    /// Flatten nested compounds; a single remaining item is returned bare.
    pub fn compound(items: Vec<Shape>) -> Shape {
        let mut flat = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Shape::Compound(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Shape::Compound(flat)
        }
    }
}
