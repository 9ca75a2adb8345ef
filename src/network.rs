use rand::Rng;

use crate::layers::{Hidden, OutputLayer, Placeholder, Targets};
use crate::optim::OptimizerState;
use crate::{Error, Matrix, Optimizer, Result};

/// A feed-forward network: placeholder → hidden* → output.
///
/// The network owns its optimizer state, so per-parameter memory lives exactly
/// as long as the weights it tracks.
#[derive(Debug)]
pub struct FeedForward {
    input: Placeholder,
    hidden: Vec<Hidden>,
    output: OutputLayer,
    optimizer: OptimizerState,
}

/// Summary of one backward pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backprop {
    /// Summed cost of the batch.
    pub cost: f32,
    /// Largest max-norm of any layer's step.
    pub step_norm: f32,
}

impl FeedForward {
    /// Assemble a network and chain `init` through every layer, each layer's
    /// width becoming the next layer's fan-in.
    pub fn new<R: Rng + ?Sized>(
        input: Placeholder,
        mut hidden: Vec<Hidden>,
        mut output: OutputLayer,
        optimizer: Optimizer,
        rng: &mut R,
    ) -> Result<Self> {
        let optimizer = optimizer.state()?;

        let mut fan_in = input.width();
        for layer in &mut hidden {
            fan_in = layer.init(fan_in, rng)?;
        }
        output.init(fan_in, rng)?;

        Ok(Self {
            input,
            hidden,
            output,
            optimizer,
        })
    }

    /// Assemble a network from layers that already carry weights.
    pub(crate) fn from_initialized(
        input: Placeholder,
        hidden: Vec<Hidden>,
        output: OutputLayer,
        optimizer: Optimizer,
    ) -> Result<Self> {
        let mut fan_in = input.width();
        for (i, layer) in hidden.iter().enumerate() {
            let cols = layer.parameter()?.weights().cols();
            if cols != fan_in {
                return Err(Error::InvalidShape(format!(
                    "hidden layer {i} has fan-in {cols}, expected {fan_in}"
                )));
            }
            fan_in = layer.width();
        }
        let cols = output.parameter()?.weights().cols();
        if cols != fan_in {
            return Err(Error::InvalidShape(format!(
                "output layer has fan-in {cols}, expected {fan_in}"
            )));
        }

        Ok(Self {
            input,
            hidden,
            output,
            optimizer: optimizer.state()?,
        })
    }

    #[inline]
    pub fn input(&self) -> &Placeholder {
        &self.input
    }

    #[inline]
    pub fn hidden(&self) -> &[Hidden] {
        &self.hidden
    }

    #[inline]
    pub fn output(&self) -> &OutputLayer {
        &self.output
    }

    #[inline]
    pub fn optimizer(&self) -> &OptimizerState {
        &self.optimizer
    }

    /// Number of input features.
    #[inline]
    pub fn input_width(&self) -> usize {
        self.input.inputs()
    }

    #[inline]
    pub fn num_hidden(&self) -> usize {
        self.hidden.len()
    }

    /// Forward pass over a `(features, samples)` batch, memoizing every layer.
    ///
    /// Returns the output activations `(outputs, samples)`.
    pub fn feed(&mut self, samples: &Matrix) -> Result<Matrix> {
        let mut activations = self.input.forward(samples)?;
        for layer in &mut self.hidden {
            activations = layer.forward(&activations)?;
        }
        self.output.forward(&activations)
    }

    /// Backward pass for the batch last passed to [`FeedForward::feed`].
    ///
    /// Runs output → last hidden → … → first hidden, handing each layer the
    /// pre-update weights and errors of the layer above it.
    pub fn backpropagate(&mut self, targets: Targets<'_>) -> Result<Backprop> {
        let (mut upstream, cost) = self.output.back(targets, &mut self.optimizer)?;
        let mut step_norm = upstream.step_norm;

        for layer in self.hidden.iter_mut().rev() {
            upstream = layer.back(&upstream.weights, &upstream.errors, &mut self.optimizer)?;
            step_norm = step_norm.max(upstream.step_norm);
        }

        log::trace!("backprop cost={cost} step_norm={step_norm}");

        Ok(Backprop { cost, step_norm })
    }

    /// Forward pass without touching any memoized state.
    pub fn infer(&self, samples: &Matrix) -> Result<Matrix> {
        let mut activations = self.input.forward(samples)?;
        for layer in &self.hidden {
            activations = layer.infer(&activations)?;
        }
        self.output.infer(&activations)
    }

    /// Weights of every parameterized layer, bottom to top.
    pub(crate) fn read(&self) -> Result<Vec<Matrix>> {
        let mut weights = Vec::with_capacity(self.hidden.len() + 1);
        for layer in &self.hidden {
            weights.push(layer.read()?);
        }
        weights.push(self.output.read()?);
        Ok(weights)
    }

    /// Overwrite every layer's weights, in the order of [`FeedForward::read`].
    pub(crate) fn write(&mut self, weights: &[Matrix]) -> Result<()> {
        if weights.len() != self.hidden.len() + 1 {
            return Err(Error::InvalidShape(format!(
                "snapshot holds {} layers, network has {}",
                weights.len(),
                self.hidden.len() + 1
            )));
        }
        for (layer, w) in self.hidden.iter().zip(weights) {
            let expected = layer.parameter()?.weights().shape();
            if w.shape() != expected {
                return Err(Error::InvalidShape(format!(
                    "snapshot layer is {}x{}, network layer is {}x{}",
                    w.rows(),
                    w.cols(),
                    expected.0,
                    expected.1
                )));
            }
        }
        let expected = self.output.parameter()?.weights().shape();
        let last = &weights[self.hidden.len()];
        if last.shape() != expected {
            return Err(Error::InvalidShape(format!(
                "snapshot output is {}x{}, network output is {}x{}",
                last.rows(),
                last.cols(),
                expected.0,
                expected.1
            )));
        }

        for (layer, w) in self.hidden.iter_mut().zip(weights) {
            layer.restore(w)?;
        }
        self.output.restore(last)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::layers::{Linear, Multiclass};
    use crate::{Activation, CostFunction};

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    fn network(seed: u64) -> FeedForward {
        let mut rng = StdRng::seed_from_u64(seed);
        FeedForward::new(
            Placeholder::new(2).unwrap(),
            vec![
                Hidden::new(4, Activation::HyperbolicTangent).unwrap(),
                Hidden::new(3, Activation::ReLU).unwrap(),
            ],
            OutputLayer::Multiclass(
                Multiclass::new(
                    labels(&["a", "b"]),
                    Activation::Sigmoid,
                    0.0,
                    CostFunction::CrossEntropy,
                )
                .unwrap(),
            ),
            Optimizer::default(),
            &mut rng,
        )
        .unwrap()
    }

    fn batch() -> Matrix {
        Matrix::from_rows(&[[0.1_f32, 0.9, -0.4], [0.3, -0.2, 0.8]]).unwrap()
    }

    #[test]
    fn init_chains_widths_into_fan_in() {
        let net = network(0);
        let shapes: Vec<_> = net.read().unwrap().iter().map(Matrix::shape).collect();
        assert_eq!(shapes, vec![(5, 3), (4, 5), (2, 4)]);
    }

    #[test]
    fn seeded_init_is_deterministic() {
        let a = network(123);
        let b = network(123);
        assert_eq!(a.infer(&batch()).unwrap(), b.infer(&batch()).unwrap());
    }

    #[test]
    fn feed_and_infer_agree() {
        let mut net = network(1);
        let fed = net.feed(&batch()).unwrap();
        assert_eq!(fed.shape(), (2, 3));
        assert_eq!(net.infer(&batch()).unwrap(), fed);
    }

    #[test]
    fn backpropagate_updates_every_layer_and_tracks_every_parameter() {
        let mut net = network(2);
        let before = net.read().unwrap();

        net.feed(&batch()).unwrap();
        let targets = labels(&["a", "b", "a"]);
        let report = net.backpropagate(Targets::Classes(&targets)).unwrap();

        assert!(report.cost > 0.0);
        assert!(report.step_norm > 0.0);
        assert_eq!(net.optimizer().tracked(), 3);
        for (old, new) in before.iter().zip(net.read().unwrap()) {
            assert_ne!(old, &new);
        }
    }

    #[test]
    fn repeated_steps_reduce_cost_on_a_fixed_batch() {
        let mut net = network(3);
        let targets = labels(&["a", "b", "a"]);

        net.feed(&batch()).unwrap();
        let first = net.backpropagate(Targets::Classes(&targets)).unwrap().cost;
        let mut last = first;
        for _ in 0..300 {
            net.feed(&batch()).unwrap();
            last = net.backpropagate(Targets::Classes(&targets)).unwrap().cost;
        }
        assert!(last < first, "first={first} last={last}");
    }

    #[test]
    fn feed_rejects_wrong_feature_count() {
        let mut net = network(4);
        assert!(matches!(
            net.feed(&Matrix::zeros(3, 2)),
            Err(Error::InvalidShape(_))
        ));
    }

    #[test]
    fn linear_network_without_hidden_layers() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut net = FeedForward::new(
            Placeholder::new(1).unwrap(),
            Vec::new(),
            OutputLayer::Linear(Linear::new(0.0, CostFunction::LeastSquares).unwrap()),
            Optimizer::Stochastic { rate: 0.05 },
            &mut rng,
        )
        .unwrap();

        let x = Matrix::from_rows(&[[0.0_f32, 0.5, 1.0]]).unwrap();
        let y = [1.0_f32, 2.0, 3.0];
        for _ in 0..2_000 {
            net.feed(&x).unwrap();
            net.backpropagate(Targets::Values(&y)).unwrap();
        }
        let out = net.infer(&x).unwrap();
        for (p, t) in out.as_slice().iter().zip(y) {
            assert!((p - t).abs() < 0.05, "pred={p} target={t}");
        }
    }

    #[test]
    fn write_rejects_foreign_topology() {
        let mut net = network(6);
        assert!(net.write(&[Matrix::zeros(2, 2)]).is_err());
        let mut weights = net.read().unwrap();
        weights[1] = Matrix::zeros(9, 9);
        assert!(net.write(&weights).is_err());
    }
}
