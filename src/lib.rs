//! A small feed-forward neural network training engine.
//!
//! `rust-nn` trains multilayer perceptrons with mini-batch backpropagation,
//! pluggable optimizers, validation on a held-out split, early stopping, and
//! rollback to the best-scoring weights.
//!
//! # Layers of the API
//!
//! - Estimators: [`MlpClassifier`] and [`MlpRegressor`] take an [`MlpConfig`],
//!   own their network, and expose `train` / `partial` / `predict`.
//! - Networks: [`FeedForward`] (usually assembled with [`NetworkBuilder`])
//!   exposes `feed` / `backpropagate` / `infer` for custom loops, plus
//!   [`Snapshot`] for capturing and restoring weights.
//! - Math: [`Matrix`], [`Activation`], [`CostFunction`], [`Optimizer`].
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`; matrices are dense and row-major.
//! - Batches are column-wise: a batch of `n` samples with `d` features is a
//!   `(d, n)` matrix.
//! - Weights are `(width, fan_in)`. Inputs and hidden layers append a constant
//!   bias row, so every fan-in counts one extra row.
//!
//! # Errors
//!
//! Every fallible operation returns [`Result`]. Shape mismatches are
//! [`Error::InvalidShape`]. The plain indexing accessors [`Matrix::get`],
//! [`Matrix::row`] and [`Matrix::column`] panic on out-of-range indices, like
//! slice indexing; use [`Matrix::try_get`] where the index is not known to be
//! valid.
//!
//! # Quick start
//!
//! ```rust
//! use rust_nn::{Activation, HiddenSpec, Labeled, MlpClassifier, MlpConfig, Unlabeled};
//!
//! # fn main() -> rust_nn::Result<()> {
//! let rows = [[0.0_f32, 0.1], [0.1, 0.0], [0.9, 1.0], [1.0, 0.9]];
//! let labels = ["off", "off", "on", "on"].map(String::from).to_vec();
//! let dataset = Labeled::from_continuous(&rows, labels)?;
//!
//! let mut model = MlpClassifier::new(MlpConfig {
//!     hidden: vec![HiddenSpec::new(4, Activation::ReLU)],
//!     holdout: 0.5,
//!     epochs: 50,
//!     seed: Some(0),
//!     ..MlpConfig::default()
//! })?;
//! model.train(&dataset)?;
//!
//! let predictions = model.predict(&Unlabeled::from_continuous(&[[0.95_f32, 0.95]])?)?;
//! assert_eq!(predictions.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod builder;
pub mod classifier;
pub mod cost;
pub mod data;
pub mod error;
pub mod init;
pub mod layers;
pub(crate) mod matmul;
pub mod matrix;
pub mod metrics;
pub mod network;
pub mod optim;
pub mod parameter;
pub mod regressor;
pub mod snapshot;
pub mod train;

#[cfg(feature = "serde")]
pub mod persist;

pub use activation::{Activation, Family};
pub use builder::{HiddenSpec, NetworkBuilder};
pub use classifier::MlpClassifier;
pub use cost::CostFunction;
pub use data::{Dataset, Labeled, Unlabeled, Value};
pub use error::{Error, Result};
pub use init::Init;
pub use layers::Targets;
pub use matrix::Matrix;
pub use metrics::{Metric, Task};
pub use network::{Backprop, FeedForward};
pub use optim::{Optimizer, OptimizerState};
pub use parameter::{Parameter, ParameterId};
pub use regressor::MlpRegressor;
pub use snapshot::Snapshot;
pub use train::MlpConfig;
