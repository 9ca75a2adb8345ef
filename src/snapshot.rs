use crate::network::FeedForward;
use crate::{Matrix, Result};

/// Deep copy of every parameterized layer's weights, bottom to top.
///
/// A snapshot shares nothing with the network it was taken from, so further
/// training leaves it untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    parameters: Vec<Matrix>,
}

impl Snapshot {
    pub fn take(network: &FeedForward) -> Result<Self> {
        Ok(Self {
            parameters: network.read()?,
        })
    }

    #[inline]
    pub fn parameters(&self) -> &[Matrix] {
        &self.parameters
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl FeedForward {
    /// Overwrite the weights with `snapshot`.
    ///
    /// Parameter identities are kept, so optimizer memory keeps tracking the
    /// same layers. A snapshot of a different topology is rejected before any
    /// layer is touched.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.write(&snapshot.parameters)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::layers::{Hidden, Linear, OutputLayer, Placeholder, Targets};
    use crate::{Activation, CostFunction, Error, Optimizer};

    fn network(seed: u64, neurons: usize) -> FeedForward {
        let mut rng = StdRng::seed_from_u64(seed);
        FeedForward::new(
            Placeholder::new(2).unwrap(),
            vec![Hidden::new(neurons, Activation::Softsign).unwrap()],
            OutputLayer::Linear(Linear::new(1e-4, CostFunction::LeastSquares).unwrap()),
            Optimizer::default(),
            &mut rng,
        )
        .unwrap()
    }

    #[test]
    fn round_trip_reproduces_inference_bit_for_bit() {
        let mut net = network(7, 3);
        let x = Matrix::from_rows(&[[0.5_f32, -1.5, 2.0], [1.0, 0.0, -0.25]]).unwrap();
        let y = [1.0_f32, -1.0, 0.5];

        let snapshot = Snapshot::take(&net).unwrap();
        assert_eq!(snapshot.len(), 2);
        let before = net.infer(&x).unwrap();
        let ids: Vec<_> = net.hidden().iter().map(|h| h.parameter().unwrap().id()).collect();

        for _ in 0..5 {
            net.feed(&x).unwrap();
            net.backpropagate(Targets::Values(&y)).unwrap();
        }
        assert_ne!(net.infer(&x).unwrap(), before);

        net.restore(&snapshot).unwrap();
        assert_eq!(net.infer(&x).unwrap(), before);

        let restored_ids: Vec<_> = net.hidden().iter().map(|h| h.parameter().unwrap().id()).collect();
        assert_eq!(ids, restored_ids);
    }

    #[test]
    fn snapshot_is_detached_from_later_training() {
        let mut net = network(8, 2);
        let snapshot = Snapshot::take(&net).unwrap();
        let copy = snapshot.clone();

        let x = Matrix::ones(2, 1);
        net.feed(&x).unwrap();
        net.backpropagate(Targets::Values(&[3.0])).unwrap();

        assert_eq!(snapshot, copy);
    }

    #[test]
    fn restore_rejects_a_different_topology() {
        let mut net = network(9, 3);
        let other = Snapshot::take(&network(9, 4)).unwrap();
        let before = net.read().unwrap();

        assert!(matches!(net.restore(&other), Err(Error::InvalidShape(_))));
        assert_eq!(net.read().unwrap(), before);
    }
}
