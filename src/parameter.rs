//! Trainable parameters.
//!
//! A `Parameter` owns one weight matrix and a process-unique `ParameterId`.
//! Optimizers key their per-parameter memory by that id, so two parameters
//! holding identical weights still get independent state.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Matrix, Result};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Stable identity of a [`Parameter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId(u64);

impl ParameterId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Owner of a single weight matrix.
///
/// Not `Clone`: an id belongs to exactly one parameter.
#[derive(Debug)]
pub struct Parameter {
    id: ParameterId,
    weights: Matrix,
}

impl Parameter {
    pub fn new(weights: Matrix) -> Self {
        Self {
            id: ParameterId::next(),
            weights,
        }
    }

    #[inline]
    pub fn id(&self) -> ParameterId {
        self.id
    }

    #[inline]
    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    /// Apply an optimizer step: `weights = weights - step`.
    pub fn update(&mut self, step: &Matrix) -> Result<()> {
        self.weights = self.weights.subtract(step)?;
        Ok(())
    }

    /// Overwrite the weights with a previously captured copy. The id is kept.
    pub(crate) fn restore(&mut self, weights: &Matrix) -> Result<()> {
        self.weights.copy_from(weights)
    }
}
