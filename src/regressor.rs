use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::builder::NetworkBuilder;
use crate::data::{self, Dataset, Labeled, Unlabeled};
use crate::metrics::Task;
use crate::network::FeedForward;
use crate::train::{self, History, MlpConfig};
use crate::{CostFunction, Error, Metric, Result};

/// Multilayer perceptron regressor with a single linear output neuron.
///
/// Same lifecycle as [`MlpClassifier`](crate::MlpClassifier); the holdout is a
/// plain random split instead of a stratified one.
///
/// An empty holdout (`floor(holdout * rows) == 0`) scores every epoch 0. For
/// [`Metric::MeanSquaredError`] and [`Metric::MeanAbsoluteError`] that is the
/// best possible score, so training stops after the first epoch.
#[derive(Debug)]
pub struct MlpRegressor {
    config: MlpConfig,
    cost: CostFunction,
    metric: Metric,
    rng: StdRng,
    network: Option<FeedForward>,
    history: History,
}

impl MlpRegressor {
    pub fn new(config: MlpConfig) -> Result<Self> {
        config.validate()?;
        let metric = config.metric.unwrap_or(Metric::RSquared);
        metric.validate_for(Task::Regression)?;
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        Ok(Self {
            cost: config.cost.unwrap_or(CostFunction::LeastSquares),
            metric,
            rng,
            network: None,
            history: History::default(),
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &MlpConfig {
        &self.config
    }

    #[inline]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    #[inline]
    pub fn is_trained(&self) -> bool {
        self.network.is_some()
    }

    #[inline]
    pub fn steps(&self) -> &[f32] {
        &self.history.steps
    }

    #[inline]
    pub fn scores(&self) -> &[f32] {
        &self.history.scores
    }

    #[inline]
    pub fn network(&self) -> Option<&FeedForward> {
        self.network.as_ref()
    }

    pub fn train(&mut self, dataset: &Labeled<f32>) -> Result<()> {
        check(dataset)?;

        let mut network = NetworkBuilder::from_specs(dataset.num_columns(), &self.config.hidden)?
            .optimizer(self.config.optimizer)?
            .alpha(self.config.alpha)?
            .build_linear_with_rng(self.cost, &mut self.rng)?;

        log::debug!(
            "built regressor: {} inputs, {} hidden layers",
            network.input_width(),
            network.num_hidden()
        );

        let mut history = History::default();
        fit(
            &self.config,
            self.metric,
            &mut self.rng,
            &mut network,
            &mut history,
            dataset,
        )?;

        self.network = Some(network);
        self.history = history;
        Ok(())
    }

    pub fn partial(&mut self, dataset: &Labeled<f32>) -> Result<()> {
        if self.network.is_none() {
            return self.train(dataset);
        }
        check(dataset)?;
        let network = self.network.as_mut().ok_or(Error::NotTrained)?;
        fit(
            &self.config,
            self.metric,
            &mut self.rng,
            network,
            &mut self.history,
            dataset,
        )
    }

    pub fn predict(&self, dataset: &Unlabeled) -> Result<Vec<f32>> {
        let network = self.network.as_ref().ok_or(Error::NotTrained)?;
        infer(network, dataset.samples())
    }
}

fn check(dataset: &Labeled<f32>) -> Result<()> {
    if dataset.is_empty() {
        return Err(Error::InvalidData(
            "cannot train on an empty dataset".to_owned(),
        ));
    }
    if let Some(i) = dataset.labels().iter().position(|t| !t.is_finite()) {
        return Err(Error::InvalidData(format!("target {i} is not finite")));
    }
    data::ensure_continuous(dataset.samples())
}

fn fit(
    config: &MlpConfig,
    metric: Metric,
    rng: &mut StdRng,
    network: &mut FeedForward,
    history: &mut History,
    dataset: &Labeled<f32>,
) -> Result<()> {
    let (holdout, training) = dataset.randomize(rng).split(config.holdout)?;
    if holdout.is_empty() {
        log::warn!(
            "holdout split of {} rows is empty; every epoch scores 0",
            dataset.num_rows()
        );
    }
    train::fit(
        network,
        &training,
        &holdout,
        config,
        metric,
        rng,
        history,
        |network, holdout| {
            if holdout.is_empty() {
                return Ok(0.0);
            }
            metric.score_values(&infer(network, holdout.samples())?, holdout.labels())
        },
    )?;
    Ok(())
}

fn infer(network: &FeedForward, samples: &[Vec<data::Value>]) -> Result<Vec<f32>> {
    let x = data::features(samples, network.input_width())?;
    Ok(network.infer(&x)?.as_slice().to_vec())
}
