//! Validation metrics.
//!
//! Metrics score predictions against known labels. They never take part in
//! backprop; the training loop uses them on the holdout split to pick the best
//! snapshot and to detect a plateau.
//!
//! Every score is oriented so that higher is better: error metrics are
//! negated.

use std::collections::HashSet;

use crate::{Error, Result};

/// Which kind of estimator a metric scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Classification,
    Regression,
}

/// Supported validation metrics.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Fraction of correct predictions.
    Accuracy,
    /// Macro-averaged F1 over every label seen in either predictions or truth.
    F1Score,
    /// Negated mean squared error.
    MeanSquaredError,
    /// Negated mean absolute error.
    MeanAbsoluteError,
    /// Coefficient of determination.
    RSquared,
}

impl Metric {
    /// `(min, max)` attainable score.
    pub fn range(self) -> (f32, f32) {
        match self {
            Metric::Accuracy | Metric::F1Score => (0.0, 1.0),
            Metric::MeanSquaredError | Metric::MeanAbsoluteError => (f32::NEG_INFINITY, 0.0),
            Metric::RSquared => (f32::NEG_INFINITY, 1.0),
        }
    }

    pub fn task(self) -> Task {
        match self {
            Metric::Accuracy | Metric::F1Score => Task::Classification,
            Metric::MeanSquaredError | Metric::MeanAbsoluteError | Metric::RSquared => {
                Task::Regression
            }
        }
    }

    /// Reject a metric that cannot score the given task.
    pub fn validate_for(self, task: Task) -> Result<()> {
        if self.task() != task {
            return Err(Error::InvalidConfig(format!(
                "metric {self:?} cannot score {task:?}"
            )));
        }
        Ok(())
    }

    /// Score class predictions. An empty set scores 0.
    pub fn score_classes(self, predictions: &[String], labels: &[String]) -> Result<f32> {
        self.validate_for(Task::Classification)?;
        check_lengths(predictions.len(), labels.len())?;
        if labels.is_empty() {
            return Ok(0.0);
        }

        Ok(match self {
            Metric::F1Score => f1_macro(predictions, labels),
            _ => {
                let correct = predictions
                    .iter()
                    .zip(labels)
                    .filter(|(p, t)| p == t)
                    .count();
                correct as f32 / labels.len() as f32
            }
        })
    }

    /// Score continuous predictions. An empty set scores 0.
    pub fn score_values(self, predictions: &[f32], labels: &[f32]) -> Result<f32> {
        self.validate_for(Task::Regression)?;
        check_lengths(predictions.len(), labels.len())?;
        if labels.is_empty() {
            return Ok(0.0);
        }

        let n = labels.len() as f32;
        let residuals = predictions.iter().zip(labels).map(|(p, t)| t - p);

        Ok(match self {
            Metric::MeanSquaredError => -residuals.map(|r| r * r).sum::<f32>() / n,
            Metric::MeanAbsoluteError => -residuals.map(f32::abs).sum::<f32>() / n,
            _ => {
                let mean = labels.iter().sum::<f32>() / n;
                let ss_res: f32 = residuals.map(|r| r * r).sum();
                let ss_tot: f32 = labels.iter().map(|t| (t - mean) * (t - mean)).sum();
                1.0 - ss_res / ss_tot.max(f32::EPSILON)
            }
        })
    }
}

fn check_lengths(predictions: usize, labels: usize) -> Result<()> {
    if predictions != labels {
        return Err(Error::InvalidData(format!(
            "{predictions} predictions for {labels} labels"
        )));
    }
    Ok(())
}

fn f1_macro(predictions: &[String], labels: &[String]) -> f32 {
    let classes: HashSet<&String> = predictions.iter().chain(labels).collect();

    let total: f32 = classes
        .iter()
        .map(|&class| {
            let mut tp = 0_usize;
            let mut fp = 0_usize;
            let mut fn_ = 0_usize;
            for (p, t) in predictions.iter().zip(labels) {
                match (p == class, t == class) {
                    (true, true) => tp += 1,
                    (true, false) => fp += 1,
                    (false, true) => fn_ += 1,
                    (false, false) => {}
                }
            }
            let denom = 2 * tp + fp + fn_;
            if denom == 0 {
                0.0
            } else {
                (2 * tp) as f32 / denom as f32
            }
        })
        .sum();

    total / classes.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| (*x).to_owned()).collect()
    }

    #[test]
    fn accuracy_counts_matches() {
        let score = Metric::Accuracy
            .score_classes(&s(&["a", "b", "b", "a"]), &s(&["a", "b", "a", "a"]))
            .unwrap();
        assert!((score - 0.75).abs() < 1e-6);
    }

    #[test]
    fn f1_is_macro_averaged() {
        // class a: tp 2, fp 0, fn 1 -> 0.8; class b: tp 1, fp 1, fn 0 -> 2/3
        let score = Metric::F1Score
            .score_classes(&s(&["a", "b", "b", "a"]), &s(&["a", "b", "a", "a"]))
            .unwrap();
        assert!((score - (0.8 + 2.0 / 3.0) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn error_metrics_are_negated() {
        let p = [1.0_f32, 2.0, 4.0];
        let t = [1.0_f32, 3.0, 2.0];
        let mse = Metric::MeanSquaredError.score_values(&p, &t).unwrap();
        let mae = Metric::MeanAbsoluteError.score_values(&p, &t).unwrap();
        assert!((mse + 5.0 / 3.0).abs() < 1e-6);
        assert!((mae + 1.0).abs() < 1e-6);
    }

    #[test]
    fn r_squared_is_one_for_perfect_fit() {
        let t = [1.0_f32, 2.0, 3.0];
        assert!((Metric::RSquared.score_values(&t, &t).unwrap() - 1.0).abs() < 1e-6);
        let mean = [2.0_f32, 2.0, 2.0];
        assert!(Metric::RSquared.score_values(&mean, &t).unwrap().abs() < 1e-6);
    }

    #[test]
    fn empty_sets_score_zero() {
        assert_eq!(Metric::Accuracy.score_classes(&[], &[]).unwrap(), 0.0);
        assert_eq!(Metric::RSquared.score_values(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn rejects_wrong_task_and_lengths() {
        assert!(Metric::Accuracy.validate_for(Task::Regression).is_err());
        assert!(Metric::RSquared.score_classes(&[], &[]).is_err());
        assert!(Metric::Accuracy.score_classes(&s(&["a"]), &[]).is_err());
    }

    #[test]
    fn ranges() {
        assert_eq!(Metric::Accuracy.range(), (0.0, 1.0));
        assert_eq!(Metric::MeanAbsoluteError.range().1, 0.0);
        assert_eq!(Metric::RSquared.range(), (f32::NEG_INFINITY, 1.0));
    }
}
