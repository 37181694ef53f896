//! Numeric settings for the bundled kernel.

use serde::{Deserialize, Serialize};

/// Tolerances and sampling densities used by [`crate::kernel::TruckKernel`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelSettings {
    /// Distance under which two edge endpoints are considered connected.
    pub tolerance: f64,
    /// Tolerance handed to `truck-shapeops` booleans.
    pub boolean_tolerance: f64,
    /// Chord tolerance for solid tessellation (bounding boxes, distances).
    pub mesh_tolerance: f64,
    /// Grid cells per parameter direction when sectioning a face.
    pub section_samples: usize,
    /// Seed grid per parameter direction for surface projection.
    pub projection_samples: usize,
    pub max_newton_iterations: usize,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            boolean_tolerance: 0.05,
            mesh_tolerance: 0.01,
            section_samples: 64,
            projection_samples: 16,
            max_newton_iterations: 50,
        }
    }
}

impl KernelSettings {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_boolean_tolerance(mut self, tolerance: f64) -> Self {
        self.boolean_tolerance = tolerance;
        self
    }

    pub fn with_mesh_tolerance(mut self, tolerance: f64) -> Self {
        self.mesh_tolerance = tolerance;
        self
    }

    pub fn with_section_samples(mut self, samples: usize) -> Self {
        self.section_samples = samples.max(2);
        self
    }

    pub fn with_projection_samples(mut self, samples: usize) -> Self {
        self.projection_samples = samples.max(2);
        self
    }

    pub fn with_max_newton_iterations(mut self, iterations: usize) -> Self {
        self.max_newton_iterations = iterations;
        self
    }

    /// Parse settings from a JSON object. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
