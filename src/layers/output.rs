use std::collections::HashSet;

use rand::Rng;

use super::{Backward, Memo};
use crate::init::Init;
use crate::optim::OptimizerState;
use crate::parameter::Parameter;
use crate::{Activation, CostFunction, Error, Matrix, Result};

/// Labels for one batch, in sample order.
#[derive(Debug, Clone, Copy)]
pub enum Targets<'a> {
    /// Class labels for a [`Multiclass`] output.
    Classes(&'a [String]),
    /// Continuous targets for a [`Linear`] output.
    Values(&'a [f32]),
}

impl Targets<'_> {
    pub fn len(&self) -> usize {
        match self {
            Targets::Classes(labels) => labels.len(),
            Targets::Values(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Multiclass output layer: one neuron per class.
#[derive(Debug)]
pub struct Multiclass {
    classes: Vec<String>,
    activation: Activation,
    alpha: f32,
    cost: CostFunction,
    param: Option<Parameter>,
    memo: Option<Memo>,
}

impl Multiclass {
    pub fn new(
        classes: Vec<String>,
        activation: Activation,
        alpha: f32,
        cost: CostFunction,
    ) -> Result<Self> {
        if classes.is_empty() {
            return Err(Error::InvalidConfig(
                "multiclass output needs at least one class".to_owned(),
            ));
        }
        let unique: HashSet<&String> = classes.iter().collect();
        if unique.len() != classes.len() {
            return Err(Error::InvalidConfig(
                "multiclass output classes must be unique".to_owned(),
            ));
        }
        activation.validate()?;
        cost.validate()?;
        check_alpha(alpha)?;

        Ok(Self {
            classes,
            activation,
            alpha,
            cost,
            param: None,
            memo: None,
        })
    }

    #[inline]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    #[inline]
    pub fn cost(&self) -> CostFunction {
        self.cost
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.classes.len()
    }

    /// One-hot encode `labels` as a `(classes, samples)` matrix.
    pub fn encode(&self, labels: &[String]) -> Result<Matrix> {
        let mut expected = vec![0.0_f32; self.classes.len() * labels.len()];
        for (j, label) in labels.iter().enumerate() {
            let i = self
                .classes
                .iter()
                .position(|c| c == label)
                .ok_or_else(|| Error::InvalidData(format!("unknown class label {label:?}")))?;
            expected[i * labels.len() + j] = 1.0;
        }
        Matrix::from_flat(self.classes.len(), labels.len(), expected)
    }

    fn activate(&self, input: &Matrix) -> Result<(Matrix, Matrix)> {
        let z = weights(&self.param)?.multiply(input)?;
        let computed = self.activation.compute(&z);
        Ok((z, computed))
    }
}

/// Linear output layer: a single neuron passing its weighted sum through.
#[derive(Debug)]
pub struct Linear {
    alpha: f32,
    cost: CostFunction,
    param: Option<Parameter>,
    memo: Option<Memo>,
}

impl Linear {
    pub fn new(alpha: f32, cost: CostFunction) -> Result<Self> {
        cost.validate()?;
        check_alpha(alpha)?;
        Ok(Self {
            alpha,
            cost,
            param: None,
            memo: None,
        })
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    #[inline]
    pub fn cost(&self) -> CostFunction {
        self.cost
    }

    #[inline]
    pub fn width(&self) -> usize {
        1
    }

    /// Encode `values` as a `(1, samples)` matrix.
    pub fn encode(&self, values: &[f32]) -> Result<Matrix> {
        Matrix::from_flat(1, values.len(), values.to_vec())
    }

    fn activate(&self, input: &Matrix) -> Result<(Matrix, Matrix)> {
        let z = weights(&self.param)?.multiply(input)?;
        Ok((z.clone(), z))
    }
}

/// The output layer of a network.
#[derive(Debug)]
pub enum OutputLayer {
    Multiclass(Multiclass),
    Linear(Linear),
}

impl OutputLayer {
    #[inline]
    pub fn width(&self) -> usize {
        match self {
            OutputLayer::Multiclass(layer) => layer.width(),
            OutputLayer::Linear(layer) => layer.width(),
        }
    }

    /// Allocate a fresh `(width, fan_in)` weight matrix and return the width.
    pub fn init<R: Rng + ?Sized>(&mut self, fan_in: usize, rng: &mut R) -> Result<usize> {
        if fan_in == 0 {
            return Err(Error::InvalidConfig("fan-in must be > 0".to_owned()));
        }
        let width = self.width();
        let weights = Init::Output.weights(width, fan_in, rng);
        let (param, memo) = self.slots_mut();
        *param = Some(Parameter::new(weights));
        *memo = None;
        Ok(width)
    }

    /// Attach stored weights `(width, fan_in)` to an uninitialized layer.
    pub(crate) fn with_weights(mut self, weights: Matrix) -> Result<Self> {
        if weights.rows() != self.width() || weights.cols() == 0 {
            return Err(Error::InvalidShape(format!(
                "output weights are {}x{}, expected {} rows",
                weights.rows(),
                weights.cols(),
                self.width()
            )));
        }
        let (param, _) = self.slots_mut();
        *param = Some(Parameter::new(weights));
        Ok(self)
    }

    pub fn parameter(&self) -> Result<&Parameter> {
        let param = match self {
            OutputLayer::Multiclass(layer) => &layer.param,
            OutputLayer::Linear(layer) => &layer.param,
        };
        param
            .as_ref()
            .ok_or_else(|| Error::Precondition("output layer has not been initialized".to_owned()))
    }

    /// Forward pass; memoizes what `back` needs.
    pub fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        let (z, computed) = self.activate(input)?;
        let (_, memo) = self.slots_mut();
        *memo = Some(Memo {
            input: input.clone(),
            z,
            computed: computed.clone(),
        });
        Ok(computed)
    }

    /// Forward pass without memoization.
    pub fn infer(&self, input: &Matrix) -> Result<Matrix> {
        let (_, computed) = self.activate(input)?;
        Ok(computed)
    }

    /// Backward pass seeded by the cost function.
    ///
    /// Returns the backward result and the summed cost of the batch.
    pub fn back(
        &mut self,
        targets: Targets<'_>,
        optimizer: &mut OptimizerState,
    ) -> Result<(Backward, f32)> {
        let (expected, activation, alpha, cost) = match (&*self, targets) {
            (OutputLayer::Multiclass(layer), Targets::Classes(labels)) => (
                layer.encode(labels)?,
                Some(layer.activation),
                layer.alpha,
                layer.cost,
            ),
            (OutputLayer::Linear(layer), Targets::Values(values)) => {
                (layer.encode(values)?, None, layer.alpha, layer.cost)
            }
            (OutputLayer::Multiclass(_), Targets::Values(_)) => {
                return Err(Error::InvalidData(
                    "multiclass output expects class labels".to_owned(),
                ));
            }
            (OutputLayer::Linear(_), Targets::Classes(_)) => {
                return Err(Error::InvalidData(
                    "linear output expects continuous targets".to_owned(),
                ));
            }
        };

        let (param, memo) = self.slots_mut();
        let memo = memo.as_ref().ok_or_else(|| {
            Error::Precondition("output layer back() called before forward()".to_owned())
        })?;
        let param = param
            .as_mut()
            .ok_or_else(|| Error::Precondition("output layer has not been initialized".to_owned()))?;

        let delta = cost.compute(&expected, &memo.computed)?;
        let errors = match (activation, cost) {
            // Fused form of cost' * sigmoid'; the product vanishes once the
            // sigmoid saturates to exactly 0 or 1 in f32.
            (Some(Activation::Sigmoid), CostFunction::CrossEntropy) => {
                memo.computed.subtract(&expected)?
            }
            (Some(activation), _) => cost
                .differentiate(&expected, &memo.computed, &delta)?
                .hadamard(&activation.differentiate(&memo.z, &memo.computed)?)?,
            (None, _) => cost.differentiate(&expected, &memo.computed, &delta)?,
        };

        // L2 penalty: 0.5 * alpha * (row sum of weights)^2, added across each output row.
        let penalties: Vec<f32> = param
            .weights()
            .row_sums()
            .into_iter()
            .map(|s| 0.5 * alpha * s * s)
            .collect();
        let cols = errors.cols();
        let errors = Matrix::from_flat(
            errors.rows(),
            cols,
            errors
                .as_slice()
                .iter()
                .enumerate()
                .map(|(idx, e)| e + penalties[idx / cols.max(1)])
                .collect(),
        )?;

        let gradients = errors.multiply(&memo.input.transpose())?;
        let step = optimizer.step(param, &gradients)?;

        let weights = param.weights().clone();
        param.update(&step)?;

        Ok((
            Backward {
                weights,
                errors,
                step_norm: step.max_norm(),
            },
            delta.sum(),
        ))
    }

    /// Deep copy of the weights.
    pub fn read(&self) -> Result<Matrix> {
        Ok(self.parameter()?.weights().clone())
    }

    /// Overwrite the weights with a copy taken by [`OutputLayer::read`].
    pub fn restore(&mut self, weights: &Matrix) -> Result<()> {
        let (param, _) = self.slots_mut();
        param
            .as_mut()
            .ok_or_else(|| Error::Precondition("output layer has not been initialized".to_owned()))?
            .restore(weights)
    }

    fn activate(&self, input: &Matrix) -> Result<(Matrix, Matrix)> {
        match self {
            OutputLayer::Multiclass(layer) => layer.activate(input),
            OutputLayer::Linear(layer) => layer.activate(input),
        }
    }

    fn slots_mut(&mut self) -> (&mut Option<Parameter>, &mut Option<Memo>) {
        match self {
            OutputLayer::Multiclass(layer) => (&mut layer.param, &mut layer.memo),
            OutputLayer::Linear(layer) => (&mut layer.param, &mut layer.memo),
        }
    }
}

fn weights(param: &Option<Parameter>) -> Result<&Matrix> {
    param
        .as_ref()
        .map(Parameter::weights)
        .ok_or_else(|| Error::Precondition("output layer has not been initialized".to_owned()))
}

fn check_alpha(alpha: f32) -> Result<()> {
    if !(alpha.is_finite() && alpha >= 0.0) {
        return Err(Error::InvalidConfig(format!(
            "alpha must be finite and >= 0, got {alpha}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::Optimizer;

    fn classes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    fn multiclass(alpha: f32) -> OutputLayer {
        OutputLayer::Multiclass(
            Multiclass::new(
                classes(&["a", "b", "c"]),
                Activation::Sigmoid,
                alpha,
                CostFunction::CrossEntropy,
            )
            .unwrap(),
        )
    }

    #[test]
    fn construction_validates_classes_and_alpha() {
        assert!(
            Multiclass::new(
                vec![],
                Activation::Sigmoid,
                0.0,
                CostFunction::CrossEntropy
            )
            .is_err()
        );
        assert!(
            Multiclass::new(
                classes(&["a", "a"]),
                Activation::Sigmoid,
                0.0,
                CostFunction::CrossEntropy
            )
            .is_err()
        );
        assert!(Linear::new(-1.0, CostFunction::LeastSquares).is_err());
    }

    #[test]
    fn encode_is_one_hot_and_rejects_unknown_labels() {
        let layer = Multiclass::new(
            classes(&["a", "b"]),
            Activation::Sigmoid,
            0.0,
            CostFunction::CrossEntropy,
        )
        .unwrap();
        let expected = layer.encode(&classes(&["b", "a", "b"])).unwrap();
        assert_eq!(expected.shape(), (2, 3));
        assert_eq!(expected.row(0), &[0.0, 1.0, 0.0]);
        assert_eq!(expected.row(1), &[1.0, 0.0, 1.0]);
        assert!(matches!(
            layer.encode(&classes(&["z"])),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn init_uses_output_range() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut layer = multiclass(0.0);
        assert_eq!(layer.init(4, &mut rng).unwrap(), 3);
        let w = layer.read().unwrap();
        assert_eq!(w.shape(), (3, 4));
        assert!(w.max_norm() <= Init::Output.range(4));
    }

    #[test]
    fn back_reports_cost_and_pre_update_weights() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut layer = multiclass(1e-4);
        layer.init(3, &mut rng).unwrap();
        let before = layer.read().unwrap();

        let input = Matrix::from_rows(&[[0.2_f32, 0.4], [-0.1, 0.3], [1.0, 1.0]]).unwrap();
        let computed = layer.forward(&input).unwrap();
        assert_eq!(computed.shape(), (3, 2));

        let mut opt = Optimizer::default().state().unwrap();
        let labels = classes(&["a", "c"]);
        let (out, cost) = layer.back(Targets::Classes(&labels), &mut opt).unwrap();

        assert!(cost > 0.0);
        assert_eq!(out.weights, before);
        assert_eq!(out.errors.shape(), (3, 2));
        assert!(out.step_norm > 0.0);
        assert_ne!(layer.read().unwrap(), before);
    }

    #[test]
    fn linear_passes_weighted_sum_through() {
        let layer = OutputLayer::Linear(Linear::new(0.0, CostFunction::LeastSquares).unwrap())
            .with_weights(Matrix::from_rows(&[[2.0_f32, 1.0]]).unwrap())
            .unwrap();
        let input = Matrix::from_rows(&[[1.0_f32, 3.0], [1.0, 1.0]]).unwrap();
        let out = layer.infer(&input).unwrap();
        assert_eq!(out.as_slice(), &[3.0, 7.0]);
    }

    #[test]
    fn linear_gradient_without_penalty_is_residual_times_input() {
        let mut layer = OutputLayer::Linear(Linear::new(0.0, CostFunction::LeastSquares).unwrap())
            .with_weights(Matrix::from_rows(&[[1.0_f32, 0.0]]).unwrap())
            .unwrap();
        let input = Matrix::from_rows(&[[2.0_f32], [1.0]]).unwrap();
        layer.forward(&input).unwrap();

        let mut opt = Optimizer::Stochastic { rate: 0.1 }.state().unwrap();
        let targets = [5.0_f32];
        let (out, cost) = layer.back(Targets::Values(&targets), &mut opt).unwrap();

        // prediction 2, residual -3, cost 9
        assert!((cost - 9.0).abs() < 1e-6);
        assert_eq!(out.errors.as_slice(), &[-3.0]);
        // gradients = [-6, -3]; step = 0.1 * gradients
        let after = layer.read().unwrap();
        assert!((after.get(0, 0) - 1.6).abs() < 1e-6);
        assert!((after.get(0, 1) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn penalty_is_added_per_output_row() {
        let mut layer = OutputLayer::Linear(Linear::new(0.5, CostFunction::LeastSquares).unwrap())
            .with_weights(Matrix::from_rows(&[[1.0_f32, 1.0]]).unwrap())
            .unwrap();
        let input = Matrix::from_rows(&[[1.0_f32], [1.0]]).unwrap();
        layer.forward(&input).unwrap();

        let mut opt = Optimizer::Stochastic { rate: 0.1 }.state().unwrap();
        let targets = [2.0_f32];
        let (out, _) = layer.back(Targets::Values(&targets), &mut opt).unwrap();

        // residual 0, penalty 0.5 * 0.5 * (1 + 1)^2 = 1
        assert_eq!(out.errors.as_slice(), &[1.0]);
    }

    #[test]
    fn saturated_sigmoid_still_learns_under_cross_entropy() {
        let mut layer = OutputLayer::Multiclass(
            Multiclass::new(
                classes(&["a", "b"]),
                Activation::Sigmoid,
                0.0,
                CostFunction::CrossEntropy,
            )
            .unwrap(),
        )
        .with_weights(Matrix::from_rows(&[[20.0_f32, 0.0], [0.0, 0.0]]).unwrap())
        .unwrap();
        let input = Matrix::from_rows(&[[1.0_f32], [1.0]]).unwrap();
        let computed = layer.forward(&input).unwrap();
        assert_eq!(computed.as_slice(), &[1.0, 0.5]);

        let mut opt = Optimizer::Stochastic { rate: 0.1 }.state().unwrap();
        let labels = classes(&["b"]);
        let (out, _) = layer.back(Targets::Classes(&labels), &mut opt).unwrap();

        assert_eq!(out.errors.as_slice(), &[1.0, -0.5]);
        let after = layer.read().unwrap();
        assert!((after.get(0, 0) - 19.9).abs() < 1e-5);
    }

    #[test]
    fn mismatched_targets_are_rejected() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut layer = multiclass(0.0);
        layer.init(2, &mut rng).unwrap();
        layer.forward(&Matrix::ones(2, 1)).unwrap();
        let mut opt = Optimizer::default().state().unwrap();
        assert!(matches!(
            layer.back(Targets::Values(&[1.0]), &mut opt),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn back_before_forward_is_a_precondition_error() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layer = multiclass(0.0);
        layer.init(2, &mut rng).unwrap();
        let mut opt = Optimizer::default().state().unwrap();
        let labels = classes(&["a"]);
        assert!(matches!(
            layer.back(Targets::Classes(&labels), &mut opt),
            Err(Error::Precondition(_))
        ));
    }
}
