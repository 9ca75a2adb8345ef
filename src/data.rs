//! Dataset boundary.
//!
//! Samples are rows of [`Value`]s. Estimators accept continuous features only;
//! categorical values are carried so callers can keep mixed tables in one
//! type, and are rejected when a batch is turned into a matrix.
//!
//! Rows are validated once at construction: every row must have the same
//! number of columns, and a labeled set must have one label per row.

use std::collections::HashMap;
use std::hash::Hash;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::{Error, Matrix, Result};

/// A single feature value.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Continuous(f32),
    Categorical(String),
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Continuous(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Categorical(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Categorical(v)
    }
}

/// Read access shared by labeled and unlabeled sets.
pub trait Dataset {
    fn samples(&self) -> &[Vec<Value>];

    fn num_rows(&self) -> usize {
        self.samples().len()
    }

    fn num_columns(&self) -> usize {
        self.samples().first().map_or(0, Vec::len)
    }

    fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }
}

/// Samples without labels, used for inference.
#[derive(Debug, Clone, PartialEq)]
pub struct Unlabeled {
    samples: Vec<Vec<Value>>,
}

impl Unlabeled {
    pub fn new(samples: Vec<Vec<Value>>) -> Result<Self> {
        check_rows(&samples)?;
        Ok(Self { samples })
    }

    /// Convenience constructor for all-continuous rows.
    pub fn from_continuous<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        Self::new(continuous_rows(rows))
    }
}

impl Dataset for Unlabeled {
    fn samples(&self) -> &[Vec<Value>] {
        &self.samples
    }
}

/// Samples paired with one label each.
///
/// `L` is `String` for classification and `f32` for regression.
#[derive(Debug, Clone, PartialEq)]
pub struct Labeled<L> {
    samples: Vec<Vec<Value>>,
    labels: Vec<L>,
}

impl<L> Dataset for Labeled<L> {
    fn samples(&self) -> &[Vec<Value>] {
        &self.samples
    }
}

impl<L: Clone> Labeled<L> {
    pub fn new(samples: Vec<Vec<Value>>, labels: Vec<L>) -> Result<Self> {
        if samples.len() != labels.len() {
            return Err(Error::InvalidData(format!(
                "{} samples but {} labels",
                samples.len(),
                labels.len()
            )));
        }
        check_rows(&samples)?;
        Ok(Self { samples, labels })
    }

    /// Convenience constructor for all-continuous rows.
    pub fn from_continuous<R: AsRef<[f32]>>(rows: &[R], labels: Vec<L>) -> Result<Self> {
        Self::new(continuous_rows(rows), labels)
    }

    #[inline]
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// The same rows drop their labels.
    pub fn unlabeled(&self) -> Unlabeled {
        Unlabeled {
            samples: self.samples.clone(),
        }
    }

    /// Shuffled copy; rows keep their labels.
    pub fn randomize<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut order: Vec<usize> = (0..self.samples.len()).collect();
        order.shuffle(rng);
        self.select(&order)
    }

    /// Consecutive batches of at most `size` rows; the last may be smaller.
    pub fn batch(&self, size: usize) -> Result<Vec<Self>> {
        if size == 0 {
            return Err(Error::InvalidConfig("batch size must be > 0".to_owned()));
        }
        Ok(self
            .samples
            .chunks(size)
            .zip(self.labels.chunks(size))
            .map(|(samples, labels)| Self {
                samples: samples.to_vec(),
                labels: labels.to_vec(),
            })
            .collect())
    }

    /// Split at `floor(ratio * rows)`: the first part holds that many rows,
    /// the second the rest, both in their current order.
    pub fn split(&self, ratio: f32) -> Result<(Self, Self)> {
        check_ratio(ratio)?;
        let n = split_point(self.samples.len(), ratio);
        Ok((
            Self {
                samples: self.samples[..n].to_vec(),
                labels: self.labels[..n].to_vec(),
            },
            Self {
                samples: self.samples[n..].to_vec(),
                labels: self.labels[n..].to_vec(),
            },
        ))
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            samples: indices.iter().map(|&i| self.samples[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
        }
    }
}

impl<L: Clone + Eq + Hash> Labeled<L> {
    /// Distinct labels in order of first appearance.
    pub fn possible_outcomes(&self) -> Vec<L> {
        self.strata().into_iter().map(|(label, _)| label).collect()
    }

    /// Split every label's rows separately at `floor(ratio * stratum)`, so
    /// both parts keep the label proportions.
    pub fn stratified_split(&self, ratio: f32) -> Result<(Self, Self)> {
        check_ratio(ratio)?;
        let mut left = Vec::new();
        let mut right = Vec::new();
        for (_, rows) in self.strata() {
            let n = split_point(rows.len(), ratio);
            left.extend_from_slice(&rows[..n]);
            right.extend_from_slice(&rows[n..]);
        }
        Ok((self.select(&left), self.select(&right)))
    }

    fn strata(&self) -> Vec<(L, Vec<usize>)> {
        let mut position: HashMap<&L, usize> = HashMap::new();
        let mut strata: Vec<(L, Vec<usize>)> = Vec::new();
        for (i, label) in self.labels.iter().enumerate() {
            match position.get(label) {
                Some(&s) => strata[s].1.push(i),
                None => {
                    position.insert(label, strata.len());
                    strata.push((label.clone(), vec![i]));
                }
            }
        }
        strata
    }
}

/// Lay `samples` out as a `(columns, rows)` matrix, one sample per column.
pub(crate) fn features(samples: &[Vec<Value>], columns: usize) -> Result<Matrix> {
    let n = samples.len();
    let mut data = vec![0.0_f32; columns * n];
    for (j, row) in samples.iter().enumerate() {
        if row.len() != columns {
            return Err(Error::InvalidShape(format!(
                "sample {j} has {} features, expected {columns}",
                row.len()
            )));
        }
        for (i, value) in row.iter().enumerate() {
            data[i * n + j] = match value {
                Value::Continuous(v) => *v,
                Value::Categorical(v) => {
                    return Err(Error::InvalidData(format!(
                        "categorical feature {v:?} in column {i}; only continuous features are supported"
                    )));
                }
            };
        }
    }
    Matrix::from_flat(columns, n, data)
}

/// Reject categorical values anywhere in `samples`.
pub(crate) fn ensure_continuous(samples: &[Vec<Value>]) -> Result<()> {
    for row in samples {
        for (i, value) in row.iter().enumerate() {
            if let Value::Categorical(v) = value {
                return Err(Error::InvalidData(format!(
                    "categorical feature {v:?} in column {i}; only continuous features are supported"
                )));
            }
        }
    }
    Ok(())
}

fn continuous_rows<R: AsRef<[f32]>>(rows: &[R]) -> Vec<Vec<Value>> {
    rows.iter()
        .map(|row| row.as_ref().iter().copied().map(Value::Continuous).collect())
        .collect()
}

fn check_rows(samples: &[Vec<Value>]) -> Result<()> {
    let Some(first) = samples.first() else {
        return Ok(());
    };
    for (i, row) in samples.iter().enumerate() {
        if row.len() != first.len() {
            return Err(Error::InvalidData(format!(
                "row {i} has {} columns, expected {}",
                row.len(),
                first.len()
            )));
        }
    }
    Ok(())
}

fn check_ratio(ratio: f32) -> Result<()> {
    if !(ratio.is_finite() && (0.0..=1.0).contains(&ratio)) {
        return Err(Error::InvalidConfig(format!(
            "split ratio must be in [0, 1], got {ratio}"
        )));
    }
    Ok(())
}

#[inline]
fn split_point(len: usize, ratio: f32) -> usize {
    ((ratio * len as f32).floor() as usize).min(len)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn labeled() -> Labeled<String> {
        let rows: Vec<[f32; 1]> = (0..10).map(|i| [i as f32]).collect();
        let labels = (0..10)
            .map(|i| if i < 6 { "a" } else { "b" }.to_owned())
            .collect();
        Labeled::from_continuous(&rows, labels).unwrap()
    }

    #[test]
    fn construction_validates_rows_and_labels() {
        assert!(Labeled::from_continuous(&[[1.0_f32]], vec![1.0_f32, 2.0]).is_err());
        assert!(
            Unlabeled::new(vec![
                vec![Value::from(1.0_f32)],
                vec![Value::from(1.0_f32), Value::from(2.0_f32)],
            ])
                .is_err()
        );
        let empty = Unlabeled::new(Vec::new()).unwrap();
        assert_eq!(empty.num_rows(), 0);
        assert_eq!(empty.num_columns(), 0);
    }

    #[test]
    fn randomize_keeps_pairs() {
        let mut rng = StdRng::seed_from_u64(0);
        let set = labeled().randomize(&mut rng);
        assert_eq!(set.num_rows(), 10);
        for (row, label) in set.samples().iter().zip(set.labels()) {
            let Value::Continuous(v) = row[0] else {
                panic!("expected continuous");
            };
            assert_eq!(label == "a", v < 6.0);
        }
    }

    #[test]
    fn batch_keeps_remainder() {
        let sizes: Vec<_> = labeled()
            .batch(4)
            .unwrap()
            .iter()
            .map(Dataset::num_rows)
            .collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert!(labeled().batch(0).is_err());
    }

    #[test]
    fn split_uses_floor() {
        let (left, right) = labeled().split(0.25).unwrap();
        assert_eq!(left.num_rows(), 2);
        assert_eq!(right.num_rows(), 8);
        assert!(labeled().split(1.5).is_err());
    }

    #[test]
    fn stratified_split_preserves_proportions() {
        let (left, right) = labeled().stratified_split(0.5).unwrap();
        let count = |set: &Labeled<String>, c: &str| set.labels().iter().filter(|l| *l == c).count();
        assert_eq!((count(&left, "a"), count(&left, "b")), (3, 2));
        assert_eq!((count(&right, "a"), count(&right, "b")), (3, 2));
    }

    #[test]
    fn outcomes_in_first_appearance_order() {
        let set = Labeled::from_continuous(
            &[[0.0_f32], [1.0], [2.0], [3.0]],
            vec!["z".to_owned(), "a".to_owned(), "z".to_owned(), "m".to_owned()],
        )
        .unwrap();
        assert_eq!(set.possible_outcomes(), vec!["z", "a", "m"]);
    }

    #[test]
    fn features_are_column_major_and_reject_categorical() {
        let set = Unlabeled::from_continuous(&[[1.0_f32, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
        let m = features(set.samples(), 2).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.row(0), &[1.0, 3.0, 5.0]);
        assert_eq!(m.row(1), &[2.0, 4.0, 6.0]);

        let mixed = Unlabeled::new(vec![vec![Value::from(1.0_f32), Value::from("red")]]).unwrap();
        assert!(matches!(
            features(mixed.samples(), 2),
            Err(Error::InvalidData(_))
        ));
        assert!(ensure_continuous(mixed.samples()).is_err());
        assert!(ensure_continuous(set.samples()).is_ok());
        assert!(matches!(
            features(set.samples(), 3),
            Err(Error::InvalidShape(_))
        ));
    }
}
