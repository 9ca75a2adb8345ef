use std::collections::HashMap;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::builder::NetworkBuilder;
use crate::data::{self, Dataset, Labeled, Unlabeled};
use crate::metrics::Task;
use crate::network::FeedForward;
use crate::train::{self, History, MlpConfig};
use crate::{CostFunction, Error, Matrix, Metric, Result};

/// Multilayer perceptron classifier.
///
/// The network is built on the first training call from the dataset's width
/// and its labels in order of first appearance. `train` rebuilds it and
/// replaces the histories; `partial` keeps both and trains further.
#[derive(Debug)]
pub struct MlpClassifier {
    config: MlpConfig,
    cost: CostFunction,
    metric: Metric,
    rng: StdRng,
    classes: Vec<String>,
    network: Option<FeedForward>,
    history: History,
}

impl MlpClassifier {
    pub fn new(config: MlpConfig) -> Result<Self> {
        config.validate()?;
        let metric = config.metric.unwrap_or(Metric::Accuracy);
        metric.validate_for(Task::Classification)?;
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        Ok(Self {
            cost: config.cost.unwrap_or(CostFunction::CrossEntropy),
            metric,
            rng,
            classes: Vec::new(),
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

    /// Known classes in output-neuron order; empty before training.
    #[inline]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[inline]
    pub fn is_trained(&self) -> bool {
        self.network.is_some()
    }

    /// Average training cost per epoch, across `partial` calls since the last
    /// `train`.
    #[inline]
    pub fn steps(&self) -> &[f32] {
        &self.history.steps
    }

    /// Holdout score per epoch.
    #[inline]
    pub fn scores(&self) -> &[f32] {
        &self.history.scores
    }

    #[inline]
    pub fn network(&self) -> Option<&FeedForward> {
        self.network.as_ref()
    }

    /// Build a fresh network and train it from scratch.
    pub fn train(&mut self, dataset: &Labeled<String>) -> Result<()> {
        if dataset.is_empty() {
            return Err(Error::InvalidData(
                "cannot train on an empty dataset".to_owned(),
            ));
        }
        data::ensure_continuous(dataset.samples())?;

        let classes = dataset.possible_outcomes();
        let mut network = NetworkBuilder::from_specs(dataset.num_columns(), &self.config.hidden)?
            .optimizer(self.config.optimizer)?
            .alpha(self.config.alpha)?
            .build_multiclass_with_rng(
                classes.clone(),
                self.config.output_activation,
                self.cost,
                &mut self.rng,
            )?;

        log::debug!(
            "built classifier: {} inputs, {} hidden layers, classes {:?}",
            network.input_width(),
            network.num_hidden(),
            classes
        );

        // Nothing is committed until the first fit succeeds.
        let mut history = History::default();
        fit(
            &self.config,
            self.metric,
            &mut self.rng,
            &mut network,
            &classes,
            &mut history,
            dataset,
        )?;

        self.classes = classes;
        self.network = Some(network);
        self.history = history;
        Ok(())
    }

    /// Continue training the existing network; trains from scratch if there
    /// is none yet.
    pub fn partial(&mut self, dataset: &Labeled<String>) -> Result<()> {
        if self.network.is_none() {
            return self.train(dataset);
        }
        if dataset.is_empty() {
            return Err(Error::InvalidData(
                "cannot train on an empty dataset".to_owned(),
            ));
        }
        data::ensure_continuous(dataset.samples())?;
        if let Some(label) = dataset.labels().iter().find(|l| !self.classes.contains(*l)) {
            return Err(Error::InvalidData(format!(
                "label {label:?} was not seen when the network was built"
            )));
        }
        let network = self.network.as_mut().ok_or(Error::NotTrained)?;
        fit(
            &self.config,
            self.metric,
            &mut self.rng,
            network,
            &self.classes,
            &mut self.history,
            dataset,
        )
    }

    /// Most probable class per sample.
    pub fn predict(&self, dataset: &Unlabeled) -> Result<Vec<String>> {
        let network = self.network.as_ref().ok_or(Error::NotTrained)?;
        let activations = infer(network, dataset.samples())?;
        Ok(argmax(&activations, &self.classes))
    }

    /// Output activation of every class, per sample.
    pub fn proba(&self, dataset: &Unlabeled) -> Result<Vec<HashMap<String, f32>>> {
        let network = self.network.as_ref().ok_or(Error::NotTrained)?;
        let activations = infer(network, dataset.samples())?;
        Ok((0..activations.cols())
            .map(|j| {
                self.classes
                    .iter()
                    .enumerate()
                    .map(|(i, class)| (class.clone(), activations.get(i, j)))
                    .collect()
            })
            .collect())
    }
}

/// Stratified holdout split, then the shared epoch loop.
fn fit(
    config: &MlpConfig,
    metric: Metric,
    rng: &mut StdRng,
    network: &mut FeedForward,
    classes: &[String],
    history: &mut History,
    dataset: &Labeled<String>,
) -> Result<()> {
    let (holdout, training) = dataset.stratified_split(config.holdout)?;
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
            let activations = infer(network, holdout.samples())?;
            metric.score_classes(&argmax(&activations, classes), holdout.labels())
        },
    )?;
    Ok(())
}

fn infer(network: &FeedForward, samples: &[Vec<data::Value>]) -> Result<Matrix> {
    let x = data::features(samples, network.input_width())?;
    network.infer(&x)
}

/// Class of the largest activation in each column; the first maximum wins.
fn argmax(activations: &Matrix, classes: &[String]) -> Vec<String> {
    (0..activations.cols())
        .map(|j| {
            let mut best = 0;
            for i in 1..activations.rows() {
                if activations.get(i, j) > activations.get(best, j) {
                    best = i;
                }
            }
            classes[best].clone()
        })
        .collect()
}
