//! Cost functions.
//!
//! A cost function seeds backpropagation at the output layer:
//!
//! - `compute(expected, activation)` gives the per-entry cost (`delta`); the
//!   output layer sums it to report the batch cost
//! - `differentiate(expected, activation, delta)` gives `dC/d(activation)`
//!
//! Both operate element-wise on `(outputs, samples)` matrices.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Matrix, Result};

/// Clipping bound for logarithms in cross-entropy.
const EPSILON: f32 = 1e-7;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// Supported cost functions.
pub enum CostFunction {
    /// Binary cross-entropy per output neuron.
    ///
    /// Expects activations in `(0, 1)` (e.g. a sigmoid output) and targets in `[0, 1]`.
    #[default]
    CrossEntropy,
    /// Squared error `(a - t)^2`.
    LeastSquares,
    /// Huber loss: quadratic within `delta` of the target, linear outside.
    Huber { delta: f32 },
}

impl CostFunction {
    /// Validate cost parameters.
    pub fn validate(self) -> Result<()> {
        if let CostFunction::Huber { delta } = self {
            if !(delta.is_finite() && delta > 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "huber delta must be finite and > 0, got {delta}"
                )));
            }
        }
        Ok(())
    }

    /// Per-entry cost of `activation` against `expected`.
    pub fn compute(self, expected: &Matrix, activation: &Matrix) -> Result<Matrix> {
        match self {
            CostFunction::CrossEntropy => expected.zip_map(activation, |t, a| {
                let a = a.clamp(EPSILON, 1.0 - EPSILON);
                -(t * a.ln() + (1.0 - t) * (1.0 - a).ln())
            }),
            CostFunction::LeastSquares => expected.zip_map(activation, |t, a| {
                let diff = a - t;
                diff * diff
            }),
            CostFunction::Huber { delta } => expected.zip_map(activation, |t, a| {
                let diff = (a - t).abs();
                if diff <= delta {
                    0.5 * diff * diff
                } else {
                    delta * (diff - 0.5 * delta)
                }
            }),
        }
    }

    /// Derivative of the cost with respect to `activation`.
    ///
    /// `delta` is the output of [`CostFunction::compute`] for the same operands;
    /// it must have the same shape even when a variant does not read it.
    pub fn differentiate(
        self,
        expected: &Matrix,
        activation: &Matrix,
        delta: &Matrix,
    ) -> Result<Matrix> {
        if delta.shape() != activation.shape() {
            return Err(Error::InvalidShape(format!(
                "delta is {}x{}, activation is {}x{}",
                delta.rows(),
                delta.cols(),
                activation.rows(),
                activation.cols()
            )));
        }

        match self {
            CostFunction::CrossEntropy => expected.zip_map(activation, |t, a| {
                let a = a.clamp(EPSILON, 1.0 - EPSILON);
                (a - t) / (a * (1.0 - a))
            }),
            // The factor 2 is folded into the learning rate.
            CostFunction::LeastSquares => expected.zip_map(activation, |t, a| a - t),
            CostFunction::Huber { delta: d } => expected.zip_map(activation, |t, a| {
                (a - t).clamp(-d, d)
            }),
        }
    }
}
