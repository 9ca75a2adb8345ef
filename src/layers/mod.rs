//! Network layers.
//!
//! The layer set is closed:
//!
//! - [`Placeholder`]: input layer; validates the feature count and appends the
//!   bias row.
//! - [`Hidden`]: fully connected layer with an activation function.
//! - [`OutputLayer`]: either [`Multiclass`] (one neuron per class) or
//!   [`Linear`] (a single regression neuron).
//!
//! Lifecycle of a parameterized layer: `init(fan_in)` allocates the weights,
//! then repeated `forward` / `back` cycles train them. `forward` memoizes the
//! matrices `back` needs; calling `back` first is a precondition error.
//!
//! Batches are laid out column-wise: every matrix flowing between layers has
//! shape `(width, samples)`.

mod hidden;
mod output;
mod placeholder;

pub use hidden::Hidden;
pub use output::{Linear, Multiclass, OutputLayer, Targets};
pub use placeholder::Placeholder;

use crate::Matrix;

/// Result of a layer's backward pass.
#[derive(Debug, Clone)]
pub struct Backward {
    /// Weights as they were before this pass updated them.
    pub weights: Matrix,
    /// Error matrix `(width, samples)` to hand to the layer below.
    pub errors: Matrix,
    /// Max-norm of the step the optimizer applied.
    pub step_norm: f32,
}

/// Forward-pass memo shared by parameterized layers.
#[derive(Debug, Clone)]
pub(crate) struct Memo {
    pub(crate) input: Matrix,
    pub(crate) z: Matrix,
    pub(crate) computed: Matrix,
}
