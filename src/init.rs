//! Weight initializers.
//!
//! All initializers draw each weight independently from `U(-r, r)`; they
//! differ only in how the half-width `r` is derived from the fan-in.

use rand::Rng;

use crate::Matrix;
use crate::activation::{Activation, Family};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Init {
    /// `r = sqrt(3 / fan_in)`. Used for saturating hidden activations.
    LeCun,
    /// `r = sqrt(6 / fan_in)`. Used for rectified hidden activations.
    He,
    /// `r = 1 / sqrt(fan_in)`. Used for every output layer.
    Output,
}

impl Init {
    /// Default initializer for a hidden layer with the given activation.
    pub fn for_hidden(activation: Activation) -> Self {
        match activation.family() {
            Family::Saturating => Init::LeCun,
            Family::Rectified => Init::He,
        }
    }

    /// Half-width of the sampling interval.
    pub fn range(self, fan_in: usize) -> f32 {
        let fan_in = fan_in.max(1) as f32;
        match self {
            Init::LeCun => (3.0 / fan_in).sqrt(),
            Init::He => (6.0 / fan_in).sqrt(),
            Init::Output => 1.0 / fan_in.sqrt(),
        }
    }

    /// A `(width, fan_in)` weight matrix.
    pub fn weights<R: Rng + ?Sized>(self, width: usize, fan_in: usize, rng: &mut R) -> Matrix {
        Matrix::uniform(width, fan_in, self.range(fan_in), rng)
    }
}
