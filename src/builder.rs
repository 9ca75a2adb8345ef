//! Network builder.
//!
//! `NetworkBuilder` is the usual way to assemble a [`FeedForward`] by hand.
//! It records the input width and the hidden stack, then wires an output layer
//! on top and chains `init` through every layer.
//!
//! Hidden weights are drawn with the initializer matching their activation
//! family ([`Init::for_hidden`](crate::init::Init::for_hidden)):
//!
//! - saturating (`tanh`, `sigmoid`, `softsign`, identity): LeCun uniform
//! - rectified (`relu`, leaky relu, `elu`, `selu`): He uniform

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::layers::{Hidden, Linear, Multiclass, OutputLayer, Placeholder};
use crate::network::FeedForward;
use crate::{Activation, CostFunction, Error, Optimizer, Result};

/// One hidden layer: neuron count (bias excluded) and activation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HiddenSpec {
    pub neurons: usize,
    pub activation: Activation,
}

impl HiddenSpec {
    pub fn new(neurons: usize, activation: Activation) -> Self {
        Self {
            neurons,
            activation,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.neurons == 0 {
            return Err(Error::InvalidConfig(
                "hidden layer neurons must be > 0".to_owned(),
            ));
        }
        self.activation.validate()
    }
}

/// Builder for a [`FeedForward`] network.
///
/// ```rust
/// use rust_nn::{Activation, CostFunction, NetworkBuilder};
///
/// # fn main() -> rust_nn::Result<()> {
/// let net = NetworkBuilder::new(2)?
///     .add_hidden(8, Activation::ReLU)?
///     .build_multiclass(
///         vec!["no".to_owned(), "yes".to_owned()],
///         Activation::Sigmoid,
///         CostFunction::CrossEntropy,
///         0,
///     )?;
/// assert_eq!(net.output().width(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    inputs: usize,
    hidden: Vec<HiddenSpec>,
    optimizer: Optimizer,
    alpha: f32,
}

impl NetworkBuilder {
    /// Start a network that accepts `inputs` features per sample.
    pub fn new(inputs: usize) -> Result<Self> {
        if inputs == 0 {
            return Err(Error::InvalidConfig("inputs must be > 0".to_owned()));
        }
        Ok(Self {
            inputs,
            hidden: Vec::new(),
            optimizer: Optimizer::default(),
            alpha: 1e-4,
        })
    }

    /// Start from a list of hidden layer specs.
    pub fn from_specs(inputs: usize, hidden: &[HiddenSpec]) -> Result<Self> {
        let mut b = Self::new(inputs)?;
        for spec in hidden {
            b = b.add_hidden(spec.neurons, spec.activation)?;
        }
        Ok(b)
    }

    pub fn add_hidden(mut self, neurons: usize, activation: Activation) -> Result<Self> {
        let spec = HiddenSpec::new(neurons, activation);
        spec.validate()?;
        self.hidden.push(spec);
        Ok(self)
    }

    pub fn optimizer(mut self, optimizer: Optimizer) -> Result<Self> {
        optimizer.validate()?;
        self.optimizer = optimizer;
        Ok(self)
    }

    /// L2 penalty strength applied by the output layer.
    pub fn alpha(mut self, alpha: f32) -> Result<Self> {
        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "alpha must be finite and >= 0, got {alpha}"
            )));
        }
        self.alpha = alpha;
        Ok(self)
    }

    #[inline]
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    #[inline]
    pub fn hidden(&self) -> &[HiddenSpec] {
        &self.hidden
    }

    pub fn build_multiclass(
        self,
        classes: Vec<String>,
        activation: Activation,
        cost: CostFunction,
        seed: u64,
    ) -> Result<FeedForward> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_multiclass_with_rng(classes, activation, cost, &mut rng)
    }

    pub fn build_multiclass_with_rng<R: Rng + ?Sized>(
        self,
        classes: Vec<String>,
        activation: Activation,
        cost: CostFunction,
        rng: &mut R,
    ) -> Result<FeedForward> {
        let output = Multiclass::new(classes, activation, self.alpha, cost)?;
        self.build_with_rng(OutputLayer::Multiclass(output), rng)
    }

    pub fn build_linear(self, cost: CostFunction, seed: u64) -> Result<FeedForward> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_linear_with_rng(cost, &mut rng)
    }

    pub fn build_linear_with_rng<R: Rng + ?Sized>(
        self,
        cost: CostFunction,
        rng: &mut R,
    ) -> Result<FeedForward> {
        let output = Linear::new(self.alpha, cost)?;
        self.build_with_rng(OutputLayer::Linear(output), rng)
    }

    /// Build on top of an arbitrary (uninitialized) output layer.
    pub fn build_with_rng<R: Rng + ?Sized>(
        self,
        output: OutputLayer,
        rng: &mut R,
    ) -> Result<FeedForward> {
        let hidden = self
            .hidden
            .iter()
            .map(|spec| Hidden::new(spec.neurons, spec.activation))
            .collect::<Result<Vec<_>>>()?;

        FeedForward::new(
            Placeholder::new(self.inputs)?,
            hidden,
            output,
            self.optimizer,
            rng,
        )
    }
}
