//! Parametric airframe modelling on top of a pluggable geometry kernel.
//!
//! Bodies and parts own kernel shapes and carry reference surfaces and
//! curves used to lay out structure. All geometry goes through
//! [`kernel::GeometryKernel`]; [`kernel::TruckKernel`] is the bundled
//! implementation.

pub mod config;
pub mod entity;
pub mod error;
pub mod exchange;
pub mod geometry;
pub mod kernel;
pub mod reference;
pub mod topo;

pub use config::KernelSettings;
pub use entity::{BooleanFailure, BooleanOutcome, Color, Entity, EntityBuilder, EntityKind, Operand};
pub use error::{Endpoint, ModelError, ModelResult};
pub use kernel::{GeometryKernel, KernelOpError, KernelResult, Shape, TruckKernel};
pub use reference::{Geometry, ReferenceCurve, ReferenceSurface, SrefOptions};
pub use topo::{EntityId, EntityRegistry, IdGenerator};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
