//! Optimizers.
//!
//! An optimizer turns the gradient of one [`Parameter`] into the step that the
//! parameter subtracts from its weights.
//!
//! Design notes:
//! - `Optimizer` is the validated configuration; `OptimizerState` owns the
//!   per-parameter memory (velocity / cache) and lives as long as the network.
//! - Memory is keyed by [`ParameterId`] and allocated lazily, zero-filled, on
//!   the first step for a parameter.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::parameter::{Parameter, ParameterId};
use crate::{Error, Matrix, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Optimizer choice for training.
pub enum Optimizer {
    /// Plain gradient descent: `step = rate * g`.
    Stochastic { rate: f32 },
    /// Gradient descent with momentum: `v = decay * v + rate * g`, `step = v`.
    Momentum { rate: f32, decay: f32 },
    /// RMSProp: `step = rate * g / (sqrt(cache) + epsilon)`.
    RmsProp { rate: f32, decay: f32, epsilon: f32 },
    /// Adaptive moments without bias correction.
    Adam {
        rate: f32,
        momentum_decay: f32,
        rms_decay: f32,
        epsilon: f32,
    },
}

impl Default for Optimizer {
    fn default() -> Self {
        Optimizer::Adam {
            rate: 0.001,
            momentum_decay: 0.9,
            rms_decay: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl Optimizer {
    /// Validate optimizer hyperparameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Optimizer::Stochastic { rate } => check_rate(rate),
            Optimizer::Momentum { rate, decay } => {
                check_rate(rate)?;
                check_decay("momentum decay", decay)
            }
            Optimizer::RmsProp {
                rate,
                decay,
                epsilon,
            } => {
                check_rate(rate)?;
                check_decay("rms decay", decay)?;
                check_epsilon(epsilon)
            }
            Optimizer::Adam {
                rate,
                momentum_decay,
                rms_decay,
                epsilon,
            } => {
                check_rate(rate)?;
                check_decay("momentum decay", momentum_decay)?;
                check_decay("rms decay", rms_decay)?;
                check_epsilon(epsilon)
            }
        }
    }

    /// Validate and allocate an empty state.
    pub fn state(self) -> Result<OptimizerState> {
        self.validate()?;
        Ok(OptimizerState {
            optimizer: self,
            moments: HashMap::new(),
        })
    }

    #[inline]
    pub fn rate(self) -> f32 {
        match self {
            Optimizer::Stochastic { rate }
            | Optimizer::Momentum { rate, .. }
            | Optimizer::RmsProp { rate, .. }
            | Optimizer::Adam { rate, .. } => rate,
        }
    }
}

fn check_rate(rate: f32) -> Result<()> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "learning rate must be finite and > 0, got {rate}"
        )));
    }
    Ok(())
}

fn check_decay(name: &str, decay: f32) -> Result<()> {
    if !(decay.is_finite() && (0.0..=1.0).contains(&decay)) {
        return Err(Error::InvalidConfig(format!(
            "{name} must be finite and in [0,1], got {decay}"
        )));
    }
    Ok(())
}

fn check_epsilon(epsilon: f32) -> Result<()> {
    if !(epsilon.is_finite() && epsilon > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "epsilon must be finite and > 0, got {epsilon}"
        )));
    }
    Ok(())
}

/// Per-parameter optimizer memory.
#[derive(Debug, Clone)]
struct Moments {
    velocity: Matrix,
    cache: Matrix,
}

/// Owned optimizer state.
#[derive(Debug, Clone)]
pub struct OptimizerState {
    optimizer: Optimizer,
    moments: HashMap<ParameterId, Moments>,
}

impl OptimizerState {
    #[inline]
    pub fn optimizer(&self) -> Optimizer {
        self.optimizer
    }

    /// Number of parameters this optimizer has seen.
    #[inline]
    pub fn tracked(&self) -> usize {
        self.moments.len()
    }

    /// Compute the step for `param` given its current `gradients`.
    ///
    /// The caller applies the step with [`Parameter::update`].
    pub fn step(&mut self, param: &Parameter, gradients: &Matrix) -> Result<Matrix> {
        let shape = param.weights().shape();
        if gradients.shape() != shape {
            return Err(Error::InvalidShape(format!(
                "gradients are {}x{}, parameter is {}x{}",
                gradients.rows(),
                gradients.cols(),
                shape.0,
                shape.1
            )));
        }

        match self.optimizer {
            Optimizer::Stochastic { rate } => Ok(gradients.scalar_multiply(rate)),
            Optimizer::Momentum { rate, decay } => {
                let moments = self.moments_for(param);
                moments.velocity = moments
                    .velocity
                    .zip_map(gradients, |v, g| decay * v + rate * g)?;
                Ok(moments.velocity.clone())
            }
            Optimizer::RmsProp {
                rate,
                decay,
                epsilon,
            } => {
                let moments = self.moments_for(param);
                moments.cache = moments
                    .cache
                    .zip_map(gradients, |c, g| decay * c + (1.0 - decay) * g * g)?;
                gradients.zip_map(&moments.cache, |g, c| rate * g / (c.sqrt() + epsilon))
            }
            Optimizer::Adam {
                rate,
                momentum_decay,
                rms_decay,
                epsilon,
            } => {
                let moments = self.moments_for(param);
                moments.velocity = moments.velocity.zip_map(gradients, |v, g| {
                    momentum_decay * v + (1.0 - momentum_decay) * g
                })?;
                moments.cache = moments
                    .cache
                    .zip_map(gradients, |c, g| rms_decay * c + (1.0 - rms_decay) * g * g)?;
                moments
                    .velocity
                    .zip_map(&moments.cache, |v, c| rate * v / (c.sqrt() + epsilon))
            }
        }
    }

    fn moments_for(&mut self, param: &Parameter) -> &mut Moments {
        let (rows, cols) = param.weights().shape();
        self.moments.entry(param.id()).or_insert_with(|| Moments {
            velocity: Matrix::zeros(rows, cols),
            cache: Matrix::zeros(rows, cols),
        })
    }
}
