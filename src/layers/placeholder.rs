use crate::{Error, Matrix, Result};

/// Input layer.
///
/// Holds no parameters. Its output is the input batch with a row of ones
/// appended, which feeds the bias weights of the next layer.
#[derive(Debug, Clone)]
pub struct Placeholder {
    inputs: usize,
}

impl Placeholder {
    pub fn new(inputs: usize) -> Result<Self> {
        if inputs == 0 {
            return Err(Error::InvalidConfig(
                "placeholder must have at least one input".to_owned(),
            ));
        }
        Ok(Self { inputs })
    }

    /// Number of input features.
    #[inline]
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Output width: features plus the bias row.
    #[inline]
    pub fn width(&self) -> usize {
        self.inputs + 1
    }

    pub fn forward(&self, input: &Matrix) -> Result<Matrix> {
        if input.rows() != self.inputs {
            return Err(Error::InvalidShape(format!(
                "network expects {} features per sample, got {}",
                self.inputs,
                input.rows()
            )));
        }
        input.augment_below(&Matrix::ones(1, input.cols()))
    }
}
