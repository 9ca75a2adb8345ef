//! Network serialization (feature: `serde`).
//!
//! A versioned JSON format for [`FeedForward`]. Internal layer structs are
//! not serialized directly; the format names layer kinds explicitly and keeps
//! weights as flat row-major buffers with their shape alongside.
//!
//! Loading validates the version, every weight shape against the layer chain,
//! and that all weights are finite. Optimizer memory is not stored: a loaded
//! network starts with fresh moments.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::layers::{Hidden, Linear, Multiclass, OutputLayer, Placeholder};
use crate::network::FeedForward;
use crate::{Activation, CostFunction, Error, Matrix, Optimizer, Result};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNetwork {
    pub format_version: u32,
    pub inputs: usize,
    pub optimizer: Optimizer,
    pub hidden: Vec<SerializedHidden>,
    pub output: SerializedOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedHidden {
    pub activation: Activation,
    pub weights: SerializedWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SerializedOutput {
    Multiclass {
        classes: Vec<String>,
        activation: Activation,
        alpha: f32,
        cost: CostFunction,
        weights: SerializedWeights,
    },
    Linear {
        alpha: f32,
        cost: CostFunction,
        weights: SerializedWeights,
    },
}

/// Row-major `(rows, cols)` weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedWeights {
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<f32>,
}

impl From<&Matrix> for SerializedWeights {
    fn from(m: &Matrix) -> Self {
        Self {
            rows: m.rows(),
            cols: m.cols(),
            values: m.as_slice().to_vec(),
        }
    }
}

impl SerializedWeights {
    fn validate(&self, what: &str, rows: usize, cols: usize) -> Result<()> {
        if self.rows != rows || self.cols != cols {
            return Err(Error::InvalidData(format!(
                "{what} weights are {}x{}, expected {rows}x{cols}",
                self.rows, self.cols
            )));
        }
        if self.values.len() != rows * cols {
            return Err(Error::InvalidData(format!(
                "{what} weights hold {} values, expected {}",
                self.values.len(),
                rows * cols
            )));
        }
        if self.values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(format!(
                "{what} weights must contain only finite values"
            )));
        }
        Ok(())
    }

    fn into_matrix(self) -> Result<Matrix> {
        Matrix::from_flat(self.rows, self.cols, self.values)
    }
}

impl SerializedOutput {
    fn weights(&self) -> &SerializedWeights {
        match self {
            SerializedOutput::Multiclass { weights, .. } | SerializedOutput::Linear { weights, .. } => {
                weights
            }
        }
    }

    fn width(&self) -> usize {
        match self {
            SerializedOutput::Multiclass { classes, .. } => classes.len(),
            SerializedOutput::Linear { .. } => 1,
        }
    }
}

impl SerializedNetwork {
    pub fn validate(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported network format_version {}; expected {FORMAT_VERSION}",
                self.format_version
            )));
        }
        if self.inputs == 0 {
            return Err(Error::InvalidData("inputs must be > 0".to_owned()));
        }

        // Every layer's fan-in is the width (bias row included) of the one below.
        let mut fan_in = self.inputs + 1;
        for (i, layer) in self.hidden.iter().enumerate() {
            if layer.weights.rows < 2 {
                return Err(Error::InvalidData(format!(
                    "hidden layer {i} must have at least one neuron"
                )));
            }
            layer
                .weights
                .validate(&format!("hidden layer {i}"), layer.weights.rows, fan_in)?;
            fan_in = layer.weights.rows;
        }
        self.output
            .weights()
            .validate("output layer", self.output.width(), fan_in)
    }
}

impl TryFrom<&FeedForward> for SerializedNetwork {
    type Error = Error;

    fn try_from(network: &FeedForward) -> std::result::Result<Self, Self::Error> {
        let hidden = network
            .hidden()
            .iter()
            .map(|layer| {
                Ok(SerializedHidden {
                    activation: layer.activation(),
                    weights: SerializedWeights::from(layer.parameter()?.weights()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let weights = SerializedWeights::from(network.output().parameter()?.weights());
        let output = match network.output() {
            OutputLayer::Multiclass(layer) => SerializedOutput::Multiclass {
                classes: layer.classes().to_vec(),
                activation: layer.activation(),
                alpha: layer.alpha(),
                cost: layer.cost(),
                weights,
            },
            OutputLayer::Linear(layer) => SerializedOutput::Linear {
                alpha: layer.alpha(),
                cost: layer.cost(),
                weights,
            },
        };

        Ok(Self {
            format_version: FORMAT_VERSION,
            inputs: network.input_width(),
            optimizer: network.optimizer().optimizer(),
            hidden,
            output,
        })
    }
}

impl TryFrom<SerializedNetwork> for FeedForward {
    type Error = Error;

    fn try_from(value: SerializedNetwork) -> std::result::Result<Self, Self::Error> {
        value.validate()?;
        let invalid = |e: Error| Error::InvalidData(format!("invalid network: {e}"));

        let hidden = value
            .hidden
            .into_iter()
            .map(|layer| Hidden::from_parts(layer.activation, layer.weights.into_matrix()?))
            .collect::<Result<Vec<_>>>()
            .map_err(invalid)?;

        let output = match value.output {
            SerializedOutput::Multiclass {
                classes,
                activation,
                alpha,
                cost,
                weights,
            } => Multiclass::new(classes, activation, alpha, cost)
                .map(OutputLayer::Multiclass)
                .and_then(|layer| layer.with_weights(weights.into_matrix()?)),
            SerializedOutput::Linear {
                alpha,
                cost,
                weights,
            } => Linear::new(alpha, cost)
                .map(OutputLayer::Linear)
                .and_then(|layer| layer.with_weights(weights.into_matrix()?)),
        }
        .map_err(invalid)?;

        FeedForward::from_initialized(
            Placeholder::new(value.inputs).map_err(invalid)?,
            hidden,
            output,
            value.optimizer,
        )
        .map_err(invalid)
    }
}

impl FeedForward {
    /// Serialize the network to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        let ser = SerializedNetwork::try_from(self)?;
        serde_json::to_string_pretty(&ser)
            .map_err(|e| Error::InvalidData(format!("failed to serialize network: {e}")))
    }

    /// Serialize the network to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        let ser = SerializedNetwork::try_from(self)?;
        serde_json::to_string(&ser)
            .map_err(|e| Error::InvalidData(format!("failed to serialize network: {e}")))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedNetwork = serde_json::from_str(s)
            .map_err(|e| Error::InvalidData(format!("failed to parse network json: {e}")))?;
        ser.try_into()
    }

    /// Save the network to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        let p = path.as_ref();
        std::fs::write(p, s)
            .map_err(|e| Error::InvalidData(format!("failed to write {}: {e}", p.display())))
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::InvalidData(format!("failed to read {}: {e}", p.display())))?;
        Self::from_json_str(&s)
    }
}
