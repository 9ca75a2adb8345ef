//! Activation functions.
//!
//! A layer computes a pre-activation `z = W x` and then applies an activation
//! function element-wise: `y = activation(z)`.
//!
//! Both `z` and `y` are memoized by the layer, so derivatives are expressed in
//! terms of whichever is cheaper for each function.
//!
//! Activations fall into two families which drive weight initialization:
//! saturating functions get a narrower initial range than rectified ones.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Matrix, Result};

const SELU_ALPHA: f32 = 1.673_263_2;
const SELU_SCALE: f32 = 1.050_701;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Element-wise activation function.
pub enum Activation {
    HyperbolicTangent,
    Sigmoid,
    Softsign,
    #[cfg_attr(feature = "serde", serde(rename = "relu"))]
    ReLU,
    #[cfg_attr(feature = "serde", serde(rename = "leaky_relu"))]
    LeakyReLU { alpha: f32 },
    Elu { alpha: f32 },
    Selu,
    Identity,
}

/// Initialization family of an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Bounded or smooth functions (tanh, sigmoid, softsign, identity).
    Saturating,
    /// Piecewise / exponential-linear functions (ReLU and friends).
    Rectified,
}

impl Activation {
    /// Validate activation parameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Activation::LeakyReLU { alpha } | Activation::Elu { alpha } => {
                if !(alpha.is_finite() && alpha >= 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "{self:?} alpha must be finite and >= 0, got {alpha}"
                    )));
                }
            }
            Activation::HyperbolicTangent
            | Activation::Sigmoid
            | Activation::Softsign
            | Activation::ReLU
            | Activation::Selu
            | Activation::Identity => {}
        }

        Ok(())
    }

    pub fn family(self) -> Family {
        match self {
            Activation::HyperbolicTangent
            | Activation::Sigmoid
            | Activation::Softsign
            | Activation::Identity => Family::Saturating,
            Activation::ReLU
            | Activation::LeakyReLU { .. }
            | Activation::Elu { .. }
            | Activation::Selu => Family::Rectified,
        }
    }

    /// Apply the activation to every entry of `z`.
    pub fn compute(self, z: &Matrix) -> Matrix {
        z.map(|x| self.forward(x))
    }

    /// Derivative of the activation at every entry, given the pre-activation
    /// `z` and the memoized output `computed`.
    pub fn differentiate(self, z: &Matrix, computed: &Matrix) -> Result<Matrix> {
        z.zip_map(computed, |x, y| self.derivative(x, y))
    }

    #[inline]
    pub(crate) fn forward(self, x: f32) -> f32 {
        match self {
            Activation::HyperbolicTangent => x.tanh(),
            Activation::Sigmoid => sigmoid(x),
            Activation::Softsign => x / (1.0 + x.abs()),
            Activation::ReLU => x.max(0.0),
            Activation::LeakyReLU { alpha } => {
                if x > 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
            Activation::Elu { alpha } => {
                if x > 0.0 {
                    x
                } else {
                    alpha * x.exp_m1()
                }
            }
            Activation::Selu => {
                if x > 0.0 {
                    SELU_SCALE * x
                } else {
                    SELU_SCALE * SELU_ALPHA * x.exp_m1()
                }
            }
            Activation::Identity => x,
        }
    }

    #[inline]
    pub(crate) fn derivative(self, x: f32, y: f32) -> f32 {
        match self {
            Activation::HyperbolicTangent => 1.0 - y * y,
            Activation::Sigmoid => y * (1.0 - y),
            Activation::Softsign => {
                let d = 1.0 + x.abs();
                1.0 / (d * d)
            }
            Activation::ReLU => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyReLU { alpha } => {
                if x > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
            Activation::Elu { alpha } => {
                if x > 0.0 {
                    1.0
                } else {
                    y + alpha
                }
            }
            Activation::Selu => {
                if x > 0.0 {
                    SELU_SCALE
                } else {
                    y + SELU_SCALE * SELU_ALPHA
                }
            }
            Activation::Identity => 1.0,
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Activation; 8] = [
        Activation::HyperbolicTangent,
        Activation::Sigmoid,
        Activation::Softsign,
        Activation::ReLU,
        Activation::LeakyReLU { alpha: 0.1 },
        Activation::Elu { alpha: 1.0 },
        Activation::Selu,
        Activation::Identity,
    ];

    #[test]
    fn alpha_must_be_finite_and_non_negative() {
        assert!(
            Activation::LeakyReLU { alpha: f32::NAN }
                .validate()
                .is_err()
        );
        assert!(Activation::Elu { alpha: -0.1 }.validate().is_err());
        assert!(Activation::LeakyReLU { alpha: 0.1 }.validate().is_ok());
    }

    #[test]
    fn families() {
        assert_eq!(Activation::HyperbolicTangent.family(), Family::Saturating);
        assert_eq!(Activation::Sigmoid.family(), Family::Saturating);
        assert_eq!(Activation::ReLU.family(), Family::Rectified);
        assert_eq!(Activation::Selu.family(), Family::Rectified);
    }

    #[test]
    fn compute_is_shape_preserving() {
        let z = Matrix::from_rows(&[[-2.0_f32, 0.0, 3.0], [0.5, -0.5, 1.0]]).unwrap();
        for act in ALL {
            let y = act.compute(&z);
            assert_eq!(y.shape(), z.shape());
            let d = act.differentiate(&z, &y).unwrap();
            assert_eq!(d.shape(), z.shape());
        }
        let relu = Activation::ReLU.compute(&z);
        assert_eq!(relu.row(0), &[0.0, 0.0, 3.0]);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let eps = 1e-3_f32;
        for act in ALL {
            for &x in &[-1.3_f32, -0.4, 0.2, 0.9, 2.1] {
                let y = act.forward(x);
                let analytic = act.derivative(x, y);
                let numeric = (act.forward(x + eps) - act.forward(x - eps)) / (2.0 * eps);
                assert!(
                    (analytic - numeric).abs() < 1e-2,
                    "{act:?} at {x}: analytic={analytic} numeric={numeric}"
                );
            }
        }
    }

    #[test]
    fn differentiate_rejects_mismatched_shapes() {
        let z = Matrix::zeros(2, 2);
        let y = Matrix::zeros(2, 3);
        assert!(Activation::Sigmoid.differentiate(&z, &y).is_err());
    }
}
