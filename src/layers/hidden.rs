use rand::Rng;

use super::{Backward, Memo};
use crate::init::Init;
use crate::optim::OptimizerState;
use crate::parameter::Parameter;
use crate::{Activation, Error, Matrix, Result};

/// Fully connected hidden layer.
///
/// The layer has `neurons + 1` rows: the extra row is a bias neuron whose
/// output is held at one, so the layer above learns its own bias through an
/// ordinary weight column.
#[derive(Debug)]
pub struct Hidden {
    neurons: usize,
    activation: Activation,
    param: Option<Parameter>,
    memo: Option<Memo>,
}

impl Hidden {
    pub fn new(neurons: usize, activation: Activation) -> Result<Self> {
        if neurons == 0 {
            return Err(Error::InvalidConfig(
                "hidden layer must have at least one neuron".to_owned(),
            ));
        }
        activation.validate()?;
        Ok(Self {
            neurons,
            activation,
            param: None,
            memo: None,
        })
    }

    /// Rebuild an initialized layer from stored weights `(neurons + 1, fan_in)`.
    pub fn from_parts(activation: Activation, weights: Matrix) -> Result<Self> {
        if weights.rows() < 2 || weights.cols() == 0 {
            return Err(Error::InvalidShape(format!(
                "hidden weights must be at least 2x1, got {}x{}",
                weights.rows(),
                weights.cols()
            )));
        }
        let mut layer = Self::new(weights.rows() - 1, activation)?;
        layer.param = Some(Parameter::new(weights));
        Ok(layer)
    }

    #[inline]
    pub fn neurons(&self) -> usize {
        self.neurons
    }

    /// Output width including the bias row.
    #[inline]
    pub fn width(&self) -> usize {
        self.neurons + 1
    }

    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Allocate a fresh `(width, fan_in)` weight matrix and return the width.
    ///
    /// Calling `init` again replaces the parameter (and its identity).
    pub fn init<R: Rng + ?Sized>(&mut self, fan_in: usize, rng: &mut R) -> Result<usize> {
        if fan_in == 0 {
            return Err(Error::InvalidConfig("fan-in must be > 0".to_owned()));
        }
        let weights = Init::for_hidden(self.activation).weights(self.width(), fan_in, rng);
        self.param = Some(Parameter::new(weights));
        self.memo = None;
        Ok(self.width())
    }

    pub fn parameter(&self) -> Result<&Parameter> {
        self.param
            .as_ref()
            .ok_or_else(|| Error::Precondition("hidden layer has not been initialized".to_owned()))
    }

    /// Forward pass; memoizes what `back` needs.
    pub fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        let (z, computed, output) = self.activate(input)?;
        self.memo = Some(Memo {
            input: input.clone(),
            z,
            computed,
        });
        Ok(output)
    }

    /// Forward pass without memoization.
    pub fn infer(&self, input: &Matrix) -> Result<Matrix> {
        let (_, _, output) = self.activate(input)?;
        Ok(output)
    }

    fn activate(&self, input: &Matrix) -> Result<(Matrix, Matrix, Matrix)> {
        let weights = self.parameter()?.weights();
        let z = weights.multiply(input)?.row_exclude(self.neurons)?;
        let computed = self.activation.compute(&z);
        let output = computed.augment_below(&Matrix::ones(1, input.cols()))?;
        Ok((z, computed, output))
    }

    /// Backward pass.
    ///
    /// `prev_weights` and `prev_errors` come from the layer directly above,
    /// captured before that layer applied its own update.
    pub fn back(
        &mut self,
        prev_weights: &Matrix,
        prev_errors: &Matrix,
        optimizer: &mut OptimizerState,
    ) -> Result<Backward> {
        let memo = self.memo.as_ref().ok_or_else(|| {
            Error::Precondition("hidden layer back() called before forward()".to_owned())
        })?;
        let param = self
            .param
            .as_mut()
            .ok_or_else(|| Error::Precondition("hidden layer has not been initialized".to_owned()))?;

        let upstream = prev_weights
            .transpose()
            .multiply(prev_errors)?
            .row_exclude(self.neurons)?;
        let slope = self.activation.differentiate(&memo.z, &memo.computed)?;

        // The bias neuron is constant, so its error row is zero.
        let errors = slope
            .hadamard(&upstream)?
            .augment_below(&Matrix::zeros(1, upstream.cols()))?;

        let gradients = errors.multiply(&memo.input.transpose())?;
        let step = optimizer.step(param, &gradients)?;

        let weights = param.weights().clone();
        param.update(&step)?;

        Ok(Backward {
            weights,
            errors,
            step_norm: step.max_norm(),
        })
    }

    /// Deep copy of the weights.
    pub fn read(&self) -> Result<Matrix> {
        Ok(self.parameter()?.weights().clone())
    }

    /// Overwrite the weights with a copy taken by [`Hidden::read`].
    pub fn restore(&mut self, weights: &Matrix) -> Result<()> {
        self.param
            .as_mut()
            .ok_or_else(|| Error::Precondition("hidden layer has not been initialized".to_owned()))?
            .restore(weights)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::Optimizer;

    #[test]
    fn init_allocates_width_by_fan_in() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut layer = Hidden::new(4, Activation::ReLU).unwrap();
        assert!(layer.parameter().is_err());

        assert_eq!(layer.init(3, &mut rng).unwrap(), 5);
        assert_eq!(layer.read().unwrap().shape(), (5, 3));

        let first_id = layer.parameter().unwrap().id();
        layer.init(7, &mut rng).unwrap();
        assert_eq!(layer.read().unwrap().shape(), (5, 7));
        assert_ne!(layer.parameter().unwrap().id(), first_id);
    }

    #[test]
    fn forward_keeps_bias_row_at_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut layer = Hidden::new(2, Activation::HyperbolicTangent).unwrap();
        layer.init(3, &mut rng).unwrap();

        let input = Matrix::from_rows(&[[0.5_f32, -1.0], [2.0, 0.1], [1.0, 1.0]]).unwrap();
        let out = layer.forward(&input).unwrap();
        assert_eq!(out.shape(), (3, 2));
        assert_eq!(out.row(2), &[1.0, 1.0]);
        assert!(out.row(0).iter().all(|v| v.abs() < 1.0));
        assert_eq!(layer.infer(&input).unwrap(), out);
    }

    #[test]
    fn back_before_forward_is_a_precondition_error() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut layer = Hidden::new(2, Activation::ReLU).unwrap();
        layer.init(3, &mut rng).unwrap();
        let mut opt = Optimizer::default().state().unwrap();
        let err = layer
            .back(&Matrix::zeros(1, 3), &Matrix::zeros(1, 1), &mut opt)
            .unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[test]
    fn back_returns_pre_update_weights_and_zero_bias_error() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut layer = Hidden::new(2, Activation::Sigmoid).unwrap();
        layer.init(2, &mut rng).unwrap();
        let before = layer.read().unwrap();

        let input = Matrix::from_rows(&[[0.3_f32, -0.2], [1.0, 1.0]]).unwrap();
        layer.forward(&input).unwrap();

        // One upstream neuron reading all three rows of this layer.
        let prev_weights = Matrix::from_rows(&[[0.5_f32, -0.5, 0.25]]).unwrap();
        let prev_errors = Matrix::from_rows(&[[1.0_f32, -1.0]]).unwrap();
        let mut opt = Optimizer::Stochastic { rate: 0.1 }.state().unwrap();

        let out = layer.back(&prev_weights, &prev_errors, &mut opt).unwrap();
        assert_eq!(out.weights, before);
        assert_eq!(out.errors.shape(), (3, 2));
        assert_eq!(out.errors.row(2), &[0.0, 0.0]);
        assert!(out.step_norm > 0.0);
        assert_ne!(layer.read().unwrap(), before);
    }

    #[test]
    fn restore_rejects_other_shapes() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut layer = Hidden::new(2, Activation::ReLU).unwrap();
        layer.init(2, &mut rng).unwrap();
        assert!(layer.restore(&Matrix::zeros(2, 2)).is_err());
        layer.restore(&Matrix::zeros(3, 2)).unwrap();
        assert_eq!(layer.read().unwrap(), Matrix::zeros(3, 2));
    }
}
