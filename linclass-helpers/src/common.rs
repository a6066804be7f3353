use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::{Float, LinearError};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Represents a single data point with features and a bipolar label.
///
/// F: The float type for the features and the label (e.g., f32, f64).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct DataPoint<F: Float> {
    pub features: Array1<F>,
    pub label: F,
}

impl<F: Float> DataPoint<F> {
    pub fn new(features: Array1<F>, label: F) -> Self {
        DataPoint { features, label }
    }
}

/// Checks that every label is exactly `-1` or `+1`.
pub fn check_labels<F: Float>(labels: ArrayView1<F>) -> Result<(), LinearError> {
    for (index, &y) in labels.iter().enumerate() {
        if y != F::one() && y != -F::one() {
            return Err(LinearError::InvalidLabel {
                index,
                value: y.to_f64_lossy(),
            });
        }
    }
    Ok(())
}

/// An in-memory training set: one row of `features` per entry of `labels`.
///
/// Construction validates the shape and the label encoding, so optimizers can
/// rely on both.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct Dataset<F: Float> {
    features: Array2<F>,
    labels: Array1<F>,
}

impl<F: Float> Dataset<F> {
    /// # Errors
    ///
    /// * `EmptyDataSet` if there are no rows.
    /// * `DimensionMismatch` if row and label counts differ.
    /// * `InvalidLabel` if a label is not `-1` or `+1`.
    pub fn new(features: Array2<F>, labels: Array1<F>) -> Result<Self, LinearError> {
        if features.nrows() == 0 {
            return Err(LinearError::EmptyDataSet);
        }
        if features.nrows() != labels.len() {
            return Err(LinearError::DimensionMismatch {
                context: "label count",
                expected: features.nrows(),
                found: labels.len(),
            });
        }
        check_labels(labels.view())?;
        Ok(Dataset { features, labels })
    }

    /// Builds a dataset from individual points, which must all share one width.
    pub fn from_points(points: &[DataPoint<F>]) -> Result<Self, LinearError> {
        let first = points.first().ok_or(LinearError::EmptyDataSet)?;
        let n_features = first.features.len();
        let mut features = Array2::zeros((points.len(), n_features));
        for (mut row, point) in features.axis_iter_mut(Axis(0)).zip(points) {
            if point.features.len() != n_features {
                return Err(LinearError::DimensionMismatch {
                    context: "data point width",
                    expected: n_features,
                    found: point.features.len(),
                });
            }
            row.assign(&point.features);
        }
        let labels = points.iter().map(|p| p.label).collect();
        Dataset::new(features, labels)
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> ArrayView2<'_, F> {
        self.features.view()
    }

    pub fn labels(&self) -> ArrayView1<'_, F> {
        self.labels.view()
    }

    /// Returns sample `i` as `(x_i, y_i)`.
    pub fn sample(&self, i: usize) -> (ArrayView1<'_, F>, F) {
        (self.features.row(i), self.labels[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArrayView1<'_, F>, F)> + '_ {
        self.features
            .axis_iter(Axis(0))
            .zip(self.labels.iter().copied())
    }
}
