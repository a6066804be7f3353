use linclass_helpers::Float;
use ndarray::Array1;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// State of a training run after one epoch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct EpochRecord<F: Float> {
    /// One-based index of the completed epoch.
    pub epoch: usize,
    /// Mean regularized loss over the training set.
    pub loss: F,
    /// Copy of `w`, when snapshots are enabled.
    pub weights: Option<Array1<F>>,
    /// Copy of the dual vector, when snapshots are enabled and the optimizer is SDCA.
    pub dual: Option<Array1<F>>,
    /// Primal minus dual objective, SDCA only.
    pub duality_gap: Option<F>,
}

/// The per-epoch records of one `fit` call, in order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct History<F: Float> {
    records: Vec<EpochRecord<F>>,
}

impl<F: Float> History<F> {
    pub(crate) fn with_capacity(epochs: usize) -> Self {
        History {
            records: Vec::with_capacity(epochs),
        }
    }

    pub(crate) fn push(&mut self, record: EpochRecord<F>) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EpochRecord<F>] {
        &self.records
    }

    pub fn last(&self) -> Option<&EpochRecord<F>> {
        self.records.last()
    }

    /// The mean loss of every epoch, e.g. for a learning curve.
    pub fn losses(&self) -> Vec<F> {
        self.records.iter().map(|r| r.loss).collect()
    }

    /// Weight snapshots, when they were recorded.
    pub fn weights(&self) -> impl Iterator<Item = &Array1<F>> + '_ {
        self.records.iter().filter_map(|r| r.weights.as_ref())
    }
}

impl<'a, F: Float> IntoIterator for &'a History<F> {
    type Item = &'a EpochRecord<F>;
    type IntoIter = std::slice::Iter<'a, EpochRecord<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
