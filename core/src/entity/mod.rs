//! Bodies and parts.
//!
//! An [`Entity`] owns its shape by value and forwards a small set of
//! queries to the kernel. Bodies are the outer-mold-line solids (wing,
//! fuselage); parts are the structural members cut from them (spars, ribs,
//! frames, skins). Both carry optional reference geometry used to lay out
//! further structure.

mod boolean;

#[cfg(test)]
mod tests_lifecycle;

pub use boolean::{BooleanFailure, BooleanOutcome, Operand};

use crate::error::{ModelError, ModelResult};
use crate::geometry::{BoundingBox, ParamRect, Plane, Point3, Vector3};
use crate::kernel::{GeometryKernel, KernelOpError};
use crate::reference::{Geometry, ReferenceCurve, ReferenceSurface, SrefOptions};
use crate::topo::{EntityId, IdGenerator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Body,
    Part,
}

/// Display colour, each channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    /// A colour derived from an identity. Consecutive identities step the
    /// hue by the golden ratio, so neighbours stay visually distinct.
    pub fn from_id(id: EntityId) -> Self {
        const GOLDEN: f64 = 0.618_033_988_749_895;
        let hue = (id.value() as f64 * GOLDEN).fract();
        Self::from_hsv(hue, 0.55, 0.9)
    }

    fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        let sector = h * 6.0;
        let i = sector.floor();
        let f = sector - i;
        let (p, q, t) = (v * (1.0 - s), v * (1.0 - s * f), v * (1.0 - s * (1.0 - f)));
        let (r, g, b) = match i as u32 % 6 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Self::new(r, g, b)
    }
}

/// A body or part.
#[derive(Debug, Clone)]
pub struct Entity<K: GeometryKernel> {
    id: EntityId,
    label: String,
    kind: EntityKind,
    shape: Option<K::Shape>,
    sref: Option<ReferenceSurface<K>>,
    cref: Option<ReferenceCurve<K>>,
    metadata: BTreeMap<String, Value>,
    subparts: BTreeMap<String, Entity<K>>,
    color: Color,
}

/// Collects everything an entity is built from. Nothing is validated and
/// no identity is issued until [`EntityBuilder::build`].
#[derive(Debug)]
pub struct EntityBuilder<K: GeometryKernel> {
    label: String,
    kind: EntityKind,
    shape: Option<Geometry<K>>,
    sref: Option<(Geometry<K>, SrefOptions)>,
    cref: Option<Geometry<K>>,
    metadata: BTreeMap<String, Value>,
    color: Option<Color>,
}

impl<K: GeometryKernel> EntityBuilder<K> {
    pub fn new(label: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            label: label.into(),
            kind,
            shape: None,
            sref: None,
            cref: None,
            metadata: BTreeMap::new(),
            color: None,
        }
    }

    pub fn body(label: impl Into<String>) -> Self {
        Self::new(label, EntityKind::Body)
    }

    pub fn part(label: impl Into<String>) -> Self {
        Self::new(label, EntityKind::Part)
    }

    pub fn with_shape(mut self, shape: K::Shape) -> Self {
        self.shape = Some(Geometry::Shape(shape));
        self
    }

    /// Shape given as any geometry; surfaces become faces, curves edges.
    pub fn with_geometry(mut self, geometry: Geometry<K>) -> Self {
        self.shape = Some(geometry);
        self
    }

    pub fn with_sref(mut self, geometry: Geometry<K>, options: SrefOptions) -> Self {
        self.sref = Some((geometry, options));
        self
    }

    pub fn with_cref(mut self, geometry: Geometry<K>) -> Self {
        self.cref = Some(geometry);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Validate and build. The identity is drawn from `ids` only once every
    /// check has passed, so a failed build leaves no gap in the sequence.
    pub fn build(self, kernel: &K, ids: &IdGenerator) -> ModelResult<Entity<K>> {
        let shape = self.shape.map(|g| g.into_shape(kernel));
        if let Some(shape) = &shape {
            if !kernel.is_valid(shape) {
                return Err(ModelError::Kernel(KernelOpError::InvalidGeometry(format!(
                    "shape of '{}' is not valid",
                    self.label
                ))));
            }
        }
        let sref = self
            .sref
            .map(|(g, options)| ReferenceSurface::from_geometry(kernel, g, options))
            .transpose()?;
        let cref = self
            .cref
            .map(|g| ReferenceCurve::from_geometry(kernel, g))
            .transpose()?;

        let id = ids.next_id();
        info!(%id, label = %self.label, kind = ?self.kind, "entity created");
        Ok(Entity {
            id,
            label: self.label,
            kind: self.kind,
            shape,
            sref,
            cref,
            metadata: self.metadata,
            subparts: BTreeMap::new(),
            color: self.color.unwrap_or_else(|| Color::from_id(id)),
        })
    }
}

impl<K: GeometryKernel> Entity<K> {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    // === Shape ===

    pub fn shape(&self) -> Option<&K::Shape> {
        self.shape.as_ref()
    }

    pub fn is_null(&self) -> bool {
        self.shape.is_none()
    }

    pub fn set_shape(&mut self, shape: K::Shape) {
        self.shape = Some(shape);
    }

    /// Drop the shape, returning it. Everything else stays queryable.
    pub fn nullify(&mut self) -> Option<K::Shape> {
        self.shape.take()
    }

    /// True when the entity has a shape and the kernel accepts it.
    pub fn check(&self, kernel: &K) -> bool {
        self.shape.as_ref().map_or(false, |s| kernel.is_valid(s))
    }

    pub fn bounding_box(&self, kernel: &K, tolerance: Option<f64>) -> ModelResult<BoundingBox> {
        let shape = self.shape.as_ref().ok_or(ModelError::NullShape)?;
        let mut bbox = kernel.bounding_box(shape).ok_or_else(|| {
            KernelOpError::OperationFailed(format!("no bounding box for '{}'", self.label))
        })?;
        if let Some(tol) = tolerance {
            bbox.enlarge(tol);
        }
        Ok(bbox)
    }

    /// A new, independent entity reflected across `plane`, with its own
    /// identity. References and sub-parts are mirrored too.
    pub fn mirrored(&self, kernel: &K, ids: &IdGenerator, plane: &Plane, label: Option<&str>) -> ModelResult<Entity<K>> {
        let shape = self
            .shape
            .as_ref()
            .map(|s| kernel.mirror_shape(s, plane))
            .transpose()?;
        let subparts = self
            .subparts
            .iter()
            .map(|(key, part)| part.mirrored(kernel, ids, plane, None).map(|m| (key.clone(), m)))
            .collect::<ModelResult<BTreeMap<_, _>>>()?;

        let id = ids.next_id();
        info!(%id, source = %self.id, "entity mirrored");
        Ok(Entity {
            id,
            label: label.map_or_else(|| self.label.clone(), str::to_owned),
            kind: self.kind,
            shape,
            sref: self.sref.as_ref().map(|s| s.mirrored(kernel, plane)),
            cref: self.cref.as_ref().map(|c| c.mirrored(kernel, plane)),
            metadata: self.metadata.clone(),
            subparts,
            color: Color::from_id(id),
        })
    }

    // === Reference surface ===

    pub fn sref(&self) -> Option<&ReferenceSurface<K>> {
        self.sref.as_ref()
    }

    pub fn has_sref(&self) -> bool {
        self.sref.is_some()
    }

    /// Set the reference surface. Anything but a surface is rejected and
    /// leaves the current reference in place.
    pub fn set_sref(&mut self, kernel: &K, geometry: Geometry<K>, options: SrefOptions) -> ModelResult<()> {
        self.sref = Some(ReferenceSurface::from_geometry(kernel, geometry, options)?);
        Ok(())
    }

    fn require_sref(&self) -> ModelResult<&ReferenceSurface<K>> {
        self.sref.as_ref().ok_or_else(|| ModelError::MissingReference {
            label: self.label.clone(),
            which: "surface",
        })
    }

    pub fn sref_bounds(&self) -> ModelResult<ParamRect> {
        Ok(self.require_sref()?.bounds())
    }

    pub fn u1(&self) -> ModelResult<f64> {
        Ok(self.require_sref()?.u1())
    }

    pub fn u2(&self) -> ModelResult<f64> {
        Ok(self.require_sref()?.u2())
    }

    pub fn v1(&self) -> ModelResult<f64> {
        Ok(self.require_sref()?.v1())
    }

    pub fn v2(&self) -> ModelResult<f64> {
        Ok(self.require_sref()?.v2())
    }

    pub fn seval(&self, kernel: &K, u: f64, v: f64) -> ModelResult<Point3> {
        Ok(self.require_sref()?.evaluate(kernel, u, v))
    }

    pub fn snormal(&self, kernel: &K, u: f64, v: f64) -> ModelResult<Vector3> {
        Ok(self.require_sref()?.normal(kernel, u, v))
    }

    pub fn invert_sref(&self, kernel: &K, point: &Point3) -> ModelResult<(f64, f64)> {
        self.require_sref()?.invert(kernel, point)
    }

    pub fn extract_plane(&self, kernel: &K, u1: f64, v1: f64, u2: f64, v2: f64) -> ModelResult<Plane> {
        self.require_sref()?.extract_plane(kernel, u1, v1, u2, v2)
    }

    pub fn extract_curve(
        &self,
        kernel: &K,
        u1: f64,
        v1: f64,
        u2: f64,
        v2: f64,
        basis: Option<&Geometry<K>>,
    ) -> ModelResult<K::Curve> {
        self.require_sref()?.extract_curve(kernel, u1, v1, u2, v2, basis)
    }

    // === Reference curve ===

    pub fn cref(&self) -> Option<&ReferenceCurve<K>> {
        self.cref.as_ref()
    }

    pub fn has_cref(&self) -> bool {
        self.cref.is_some()
    }

    /// Set the reference curve. Anything but a curve is rejected and leaves
    /// the current reference in place.
    pub fn set_cref(&mut self, kernel: &K, geometry: Geometry<K>) -> ModelResult<()> {
        self.cref = Some(ReferenceCurve::from_geometry(kernel, geometry)?);
        Ok(())
    }

    fn require_cref(&self) -> ModelResult<&ReferenceCurve<K>> {
        self.cref.as_ref().ok_or_else(|| ModelError::MissingReference {
            label: self.label.clone(),
            which: "curve",
        })
    }

    pub fn ceval(&self, kernel: &K, u: f64) -> ModelResult<Point3> {
        Ok(self.require_cref()?.eval(kernel, u))
    }

    pub fn invert_cref(&self, kernel: &K, point: &Point3) -> ModelResult<f64> {
        self.require_cref()?.invert(kernel, point)
    }

    pub fn p1(&self, kernel: &K) -> ModelResult<Point3> {
        Ok(self.require_cref()?.p1(kernel))
    }

    pub fn p2(&self, kernel: &K) -> ModelResult<Point3> {
        Ok(self.require_cref()?.p2(kernel))
    }

    // === Metadata and sub-parts ===

    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn get_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    /// Attach `part` under its label, returning any sub-part it replaces.
    pub fn add_subpart(&mut self, part: Entity<K>) -> Option<Entity<K>> {
        self.subparts.insert(part.label.clone(), part)
    }

    pub fn get_subpart(&self, label: &str) -> Option<&Entity<K>> {
        self.subparts.get(label)
    }

    pub fn get_subpart_mut(&mut self, label: &str) -> Option<&mut Entity<K>> {
        self.subparts.get_mut(label)
    }

    pub fn remove_subpart(&mut self, label: &str) -> Option<Entity<K>> {
        self.subparts.remove(label)
    }

    pub fn subparts(&self) -> impl Iterator<Item = &Entity<K>> {
        self.subparts.values()
    }
}
