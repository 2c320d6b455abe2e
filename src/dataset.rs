//! Row-addressable training data consumed by cross-validation.
//!
//! Cross-validation never copies the caller's data. A fold is materialized as a
//! [`DatasetView`], a list of row indices over a borrowed [`Dataset`], and the
//! view is dropped as soon as the fold is scored.

use crate::errors::{validate_indices_in_range, validate_same_length, ValidationResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index-addressable rows of features with one numeric label each.
///
/// Class labels are encoded as numbers (`0.0`, `1.0`, ...). Implementations may
/// panic when `row >= self.len()`; every view built by this crate checks its
/// indices up front.
pub trait Dataset {
    /// Number of rows.
    fn len(&self) -> usize;

    /// Whether the dataset has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Feature vector of `row`.
    fn features(&self, row: usize) -> &[f64];

    /// Label of `row`.
    fn label(&self, row: usize) -> f64;
}

/// Owned, in-memory dataset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrainingData {
    features: Vec<Vec<f64>>,
    labels: Vec<f64>,
}

impl TrainingData {
    /// Builds a dataset from row-major features and their labels.
    ///
    /// # Example
    /// ```rust
    /// use robust_validation::dataset::{Dataset, TrainingData};
    ///
    /// let data = TrainingData::new(vec![vec![0.1], vec![0.9]], vec![0.0, 1.0]).unwrap();
    /// assert_eq!(data.len(), 2);
    /// assert!(TrainingData::new(vec![vec![0.1]], vec![0.0, 1.0]).is_err());
    /// ```
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<f64>) -> ValidationResult<Self> {
        validate_same_length(features.len(), labels.len(), "features vs labels")?;
        Ok(Self { features, labels })
    }

    /// Single-feature dataset, one row per value.
    pub fn from_series(values: &[f64], labels: Vec<f64>) -> ValidationResult<Self> {
        Self::new(values.iter().map(|&v| vec![v]).collect(), labels)
    }

    /// All labels in row order.
    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Width of the first row, `0` for an empty dataset.
    pub fn n_features(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }
}

impl Dataset for TrainingData {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn features(&self, row: usize) -> &[f64] {
        &self.features[row]
    }

    fn label(&self, row: usize) -> f64 {
        self.labels[row]
    }
}

/// Borrowed subset of a dataset, addressed by the parent's row indices.
///
/// Row `i` of the view is row `indices()[i]` of the parent.
#[derive(Debug)]
pub struct DatasetView<'a, D: Dataset + ?Sized> {
    data: &'a D,
    indices: Vec<usize>,
}

impl<'a, D: Dataset + ?Sized> Clone for DatasetView<'a, D> {
    fn clone(&self) -> Self {
        Self {
            data: self.data,
            indices: self.indices.clone(),
        }
    }
}

impl<'a, D: Dataset + ?Sized> DatasetView<'a, D> {
    /// Gathers `indices` from `data`, failing on the first index out of range.
    pub fn new(data: &'a D, indices: Vec<usize>) -> ValidationResult<Self> {
        validate_indices_in_range(&indices, data.len())?;
        Ok(Self { data, indices })
    }

    /// Parent row indices, in view order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Labels of the view's rows, in view order.
    pub fn labels(&self) -> Vec<f64> {
        self.indices.iter().map(|&i| self.data.label(i)).collect()
    }

    /// Iterates `(features, label)` pairs in view order.
    pub fn rows(&self) -> impl Iterator<Item = (&[f64], f64)> + '_ {
        self.indices
            .iter()
            .map(move |&i| (self.data.features(i), self.data.label(i)))
    }
}

impl<'a, D: Dataset + ?Sized> Dataset for DatasetView<'a, D> {
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn features(&self, row: usize) -> &[f64] {
        self.data.features(self.indices[row])
    }

    fn label(&self, row: usize) -> f64 {
        self.data.label(self.indices[row])
    }
}
