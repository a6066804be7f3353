use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// The order in which one epoch visits the samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "snake_case")
)]
pub enum SampleOrder {
    /// Row order of the dataset, every epoch.
    #[default]
    Sequential,
    /// A fresh permutation every epoch, drawn from a seeded generator.
    Shuffled { seed: u64 },
}

/// Produces the visiting order of each epoch for a fixed number of samples.
///
/// Every epoch is a permutation of `0..n_samples`, so each sample is visited
/// exactly once per pass.
#[derive(Debug, Clone)]
pub struct EpochOrder {
    indices: Vec<usize>,
    rng: Option<Xoshiro256PlusPlus>,
}

impl EpochOrder {
    pub fn new(order: SampleOrder, n_samples: usize) -> Self {
        let rng = match order {
            SampleOrder::Sequential => None,
            SampleOrder::Shuffled { seed } => Some(Xoshiro256PlusPlus::seed_from_u64(seed)),
        };
        EpochOrder {
            indices: (0..n_samples).collect(),
            rng,
        }
    }

    /// The order for the next epoch.
    pub fn next_epoch(&mut self) -> &[usize] {
        if let Some(rng) = self.rng.as_mut() {
            self.indices.shuffle(rng);
        }
        &self.indices
    }
}
