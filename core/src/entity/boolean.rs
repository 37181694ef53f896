//! Boolean mutation of entities.
//!
//! Every operation computes its new shape(s) first and only then replaces
//! anything, so a failure leaves all entities exactly as they were.

use super::Entity;
use crate::kernel::{GeometryKernel, KernelOpError};
use crate::reference::Geometry;
use std::borrow::Cow;
use thiserror::Error;
use tracing::warn;

/// Why a boolean left the receiver untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BooleanFailure {
    #[error("receiver has no shape")]
    NullReceiver,

    #[error("operand has no shape")]
    NullOperand,

    #[error("kernel boolean failed: {0}")]
    Kernel(#[from] KernelOpError),
}

/// Result of a boolean mutation.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum BooleanOutcome {
    /// New shape attached.
    Applied,
    /// Fused shape attached, but the unification pass that should follow
    /// it failed.
    AppliedWithoutUnify(KernelOpError),
    /// Nothing changed.
    Failed(BooleanFailure),
}

impl BooleanOutcome {
    /// True only when every requested step succeeded.
    pub fn succeeded(&self) -> bool {
        matches!(self, BooleanOutcome::Applied)
    }

    /// True when the receiver's shape was replaced.
    pub fn mutated(&self) -> bool {
        !matches!(self, BooleanOutcome::Failed(_))
    }

    pub fn failure(&self) -> Option<&BooleanFailure> {
        match self {
            BooleanOutcome::Failed(f) => Some(f),
            _ => None,
        }
    }
}

/// The other side of a boolean.
#[derive(Debug)]
pub enum Operand<'a, K: GeometryKernel> {
    Entity(&'a Entity<K>),
    Shape(&'a K::Shape),
    Geometry(&'a Geometry<K>),
}

impl<'a, K: GeometryKernel> Operand<'a, K> {
    fn resolve(self, kernel: &K) -> Result<Cow<'a, K::Shape>, BooleanFailure> {
        match self {
            Operand::Entity(e) => e.shape().map(Cow::Borrowed).ok_or(BooleanFailure::NullOperand),
            Operand::Shape(s) => Ok(Cow::Borrowed(s)),
            Operand::Geometry(g) => Ok(Cow::Owned(g.to_shape(kernel))),
        }
    }
}

impl<'a, K: GeometryKernel> From<&'a Entity<K>> for Operand<'a, K> {
    fn from(entity: &'a Entity<K>) -> Self {
        Operand::Entity(entity)
    }
}

impl<K: GeometryKernel> Entity<K> {
    fn receiver_shape(&self) -> Result<&K::Shape, BooleanFailure> {
        self.shape().ok_or(BooleanFailure::NullReceiver)
    }

    fn report(&self, op: &str, failure: BooleanFailure) -> BooleanOutcome {
        warn!(id = %self.id, label = %self.label, op, error = %failure, "boolean failed");
        BooleanOutcome::Failed(failure)
    }

    /// Fuse `other` into this entity, optionally unifying the result.
    pub fn merge<'a>(&mut self, kernel: &K, other: impl Into<Operand<'a, K>>, unify: bool) -> BooleanOutcome
    where
        K: 'a,
    {
        let fused = match self.try_fuse(kernel, other.into()) {
            Ok(shape) => shape,
            Err(failure) => return self.report("merge", failure),
        };
        if !unify {
            self.set_shape(fused);
            return BooleanOutcome::Applied;
        }
        match kernel.unify(&fused) {
            Ok(unified) => {
                self.set_shape(unified);
                BooleanOutcome::Applied
            }
            Err(err) => {
                warn!(id = %self.id, error = %err, "unify failed, keeping fused shape");
                self.set_shape(fused);
                BooleanOutcome::AppliedWithoutUnify(err)
            }
        }
    }

    fn try_fuse(&self, kernel: &K, other: Operand<'_, K>) -> Result<K::Shape, BooleanFailure> {
        let receiver = self.receiver_shape()?;
        let other = other.resolve(kernel)?;
        Ok(kernel.fuse(receiver, &other)?)
    }

    /// Remove `other` from this entity.
    pub fn cut<'a>(&mut self, kernel: &K, other: impl Into<Operand<'a, K>>) -> BooleanOutcome
    where
        K: 'a,
    {
        let result = self.receiver_shape().and_then(|receiver| {
            let tool = other.into().resolve(kernel)?;
            Ok(kernel.cut(receiver, &tool)?)
        });
        match result {
            Ok(shape) => {
                self.set_shape(shape);
                BooleanOutcome::Applied
            }
            Err(failure) => self.report("cut", failure),
        }
    }

    /// Split this entity with `tool`. With `split_both`, the tool is split
    /// by this entity's original shape as well. Both splits are computed
    /// before either entity changes.
    pub fn split(&mut self, kernel: &K, tool: &mut Entity<K>, split_both: bool) -> BooleanOutcome {
        let result = self.receiver_shape().and_then(|receiver| {
            let other = tool.shape().ok_or(BooleanFailure::NullOperand)?;
            let mine = kernel.split(receiver, other)?;
            let theirs = if split_both {
                Some(kernel.split(other, receiver)?)
            } else {
                None
            };
            Ok((mine, theirs))
        });
        match result {
            Ok((mine, theirs)) => {
                self.set_shape(mine);
                if let Some(theirs) = theirs {
                    tool.set_shape(theirs);
                }
                BooleanOutcome::Applied
            }
            Err(failure) => self.report("split", failure),
        }
    }

    /// Split this entity with a shape or geometry that is not an entity.
    pub fn split_with<'a>(&mut self, kernel: &K, tool: impl Into<Operand<'a, K>>) -> BooleanOutcome
    where
        K: 'a,
    {
        let result = self.receiver_shape().and_then(|receiver| {
            let tool = tool.into().resolve(kernel)?;
            Ok(kernel.split(receiver, &tool)?)
        });
        match result {
            Ok(shape) => {
                self.set_shape(shape);
                BooleanOutcome::Applied
            }
            Err(failure) => self.report("split", failure),
        }
    }
}
