//! Training configuration and the shared epoch loop.
//!
//! [`MlpClassifier`](crate::MlpClassifier) and
//! [`MlpRegressor`](crate::MlpRegressor) differ only in how labels are encoded
//! and how the holdout split is scored. Everything else lives here: mini-batch
//! passes over a shuffled training split, per-epoch validation, the three
//! early-stopping rules, and rolling back to the best snapshot.

use rand::Rng;

use crate::builder::HiddenSpec;
use crate::data::{self, Dataset, Labeled};
use crate::layers::Targets;
use crate::network::FeedForward;
use crate::snapshot::Snapshot;
use crate::{Activation, CostFunction, Error, Metric, Optimizer, Result};

/// Scores within this distance of the metric's maximum stop training.
const SCORE_TOLERANCE: f32 = 1e-3;

/// Estimator hyperparameters.
///
/// `cost` and `metric` default per estimator when `None`: cross-entropy and
/// accuracy for classification, least squares and R² for regression.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MlpConfig {
    pub hidden: Vec<HiddenSpec>,
    pub batch_size: usize,
    pub optimizer: Optimizer,
    /// L2 penalty strength.
    pub alpha: f32,
    pub cost: Option<CostFunction>,
    /// Stop once the epoch cost changes by less than this.
    pub min_change: f32,
    pub metric: Option<Metric>,
    /// Fraction of the dataset held out for validation.
    pub holdout: f32,
    /// Number of trailing scores checked for a plateau.
    pub window: usize,
    pub epochs: usize,
    /// Output activation of the classifier. Ignored by the regressor.
    pub output_activation: Activation,
    /// Seed for weight init and shuffling; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden: Vec::new(),
            batch_size: 100,
            optimizer: Optimizer::default(),
            alpha: 1e-4,
            cost: None,
            min_change: 1e-4,
            metric: None,
            holdout: 0.1,
            window: 3,
            epochs: 1000,
            output_activation: Activation::Sigmoid,
            seed: None,
        }
    }
}

impl MlpConfig {
    pub fn validate(&self) -> Result<()> {
        for spec in &self.hidden {
            spec.validate()?;
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        self.optimizer.validate()?;
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "alpha must be finite and >= 0, got {}",
                self.alpha
            )));
        }
        if let Some(cost) = self.cost {
            cost.validate()?;
        }
        if !(self.min_change.is_finite() && self.min_change >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "min_change must be finite and >= 0, got {}",
                self.min_change
            )));
        }
        if !(0.01..=1.0).contains(&self.holdout) {
            return Err(Error::InvalidConfig(format!(
                "holdout must be in [0.01, 1.0], got {}",
                self.holdout
            )));
        }
        if self.window == 0 {
            return Err(Error::InvalidConfig("window must be > 0".to_owned()));
        }
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        self.output_activation.validate()
    }
}

/// Label types the training loop can feed to an output layer.
pub(crate) trait Label: Clone {
    fn targets(labels: &[Self]) -> Targets<'_>;
}

impl Label for String {
    fn targets(labels: &[String]) -> Targets<'_> {
        Targets::Classes(labels)
    }
}

impl Label for f32 {
    fn targets(labels: &[f32]) -> Targets<'_> {
        Targets::Values(labels)
    }
}

/// Per-epoch cost and validation score.
#[derive(Debug, Clone, Default)]
pub(crate) struct History {
    pub(crate) steps: Vec<f32>,
    pub(crate) scores: Vec<f32>,
}

/// Why an epoch loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stop {
    Converged,
    MaxScore,
    Plateau,
    Exhausted,
}

/// Run the epoch loop on `training`, scoring every epoch on `holdout`.
///
/// Leaves the network at its best-scoring snapshot when the final epoch
/// scored worse.
#[allow(clippy::too_many_arguments)]
pub(crate) fn fit<L, R, S>(
    network: &mut FeedForward,
    training: &Labeled<L>,
    holdout: &Labeled<L>,
    config: &MlpConfig,
    metric: Metric,
    rng: &mut R,
    history: &mut History,
    score: S,
) -> Result<Stop>
where
    L: Label,
    R: Rng + ?Sized,
    S: Fn(&FeedForward, &Labeled<L>) -> Result<f32>,
{
    if training.is_empty() {
        return Err(Error::InvalidData(
            "training split is empty; lower the holdout or add samples".to_owned(),
        ));
    }

    let (_, max) = metric.range();
    let rows = training.num_rows() as f32;
    let inputs = network.input_width();

    let mut best = metric.range().0;
    let mut snapshot: Option<Snapshot> = None;
    let mut previous = f32::INFINITY;
    let mut last = best;
    let mut stop = Stop::Exhausted;

    for epoch in 1..=config.epochs {
        let mut loss = 0.0_f32;
        for batch in training.randomize(rng).batch(config.batch_size)? {
            let x = data::features(batch.samples(), inputs)?;
            network.feed(&x)?;
            let report = network.backpropagate(L::targets(batch.labels()))?;
            loss += report.cost;
        }
        let cost = loss / rows;

        last = score(network, holdout)?;
        history.steps.push(cost);
        history.scores.push(last);

        log::debug!("epoch {epoch}: cost={cost:.6} score={last:.6}");

        if last > best {
            best = last;
            snapshot = Some(Snapshot::take(network)?);
        }

        if (previous - cost).abs() < config.min_change {
            stop = Stop::Converged;
        } else if last > max - SCORE_TOLERANCE {
            stop = Stop::MaxScore;
        } else if epoch >= config.window && plateaued(&history.scores, config.window) {
            stop = Stop::Plateau;
        }
        if stop != Stop::Exhausted {
            log::info!("early stop after epoch {epoch}: {stop:?}");
            break;
        }

        previous = cost;
    }

    if let Some(snapshot) = snapshot.as_ref().filter(|_| last < best) {
        network.restore(snapshot)?;
        log::info!("restored best snapshot (score {best:.6}, last {last:.6})");
    }

    Ok(stop)
}

/// True if the trailing `window` scores never improve: sorted descending, they
/// equal themselves. A flat window counts.
pub(crate) fn plateaued(scores: &[f32], window: usize) -> bool {
    if window == 0 || scores.len() < window {
        return false;
    }
    let tail = &scores[scores.len() - window..];
    let mut sorted = tail.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted == tail
}
