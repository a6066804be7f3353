use linclass_helpers::{Dataset, Float, KernelConfig, LinearError, LossKind};
use ndarray::ArrayView1;
use sdca::SdcaOptimizer;
use sgd::{SgdOptimizer, StepSize};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// The two incremental strategies behind the estimator.
///
/// Both are driven the same way: prepare for a dataset, one `increment` per
/// visited sample, `end_epoch` after each full pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "snake_case")
)]
pub enum Optimizer<F: Float> {
    Sgd(SgdOptimizer<F>),
    Sdca(SdcaOptimizer<F>),
}

impl<F: Float> Optimizer<F> {
    pub fn name(&self) -> &'static str {
        match self {
            Optimizer::Sgd(_) => "SGD",
            Optimizer::Sdca(_) => "SDCA",
        }
    }

    pub fn config(&self) -> &KernelConfig<F> {
        match self {
            Optimizer::Sgd(sgd) => sgd.config(),
            Optimizer::Sdca(sdca) => sdca.config(),
        }
    }

    /// Sizes the optimizer state for `data`. SGD keeps existing weights; SDCA
    /// restarts from a zero dual vector.
    pub fn begin(&mut self, data: &Dataset<F>) -> Result<(), LinearError> {
        match self {
            Optimizer::Sgd(sgd) => sgd.initialize(data.n_features()),
            Optimizer::Sdca(sdca) => {
                sdca.initialize(data);
                Ok(())
            }
        }
    }

    /// One update for sample `index`: a gradient step for SGD, a dual
    /// coordinate step for SDCA.
    pub fn increment(&mut self, index: usize, x: ArrayView1<F>, y: F) -> Result<(), LinearError> {
        match self {
            Optimizer::Sgd(sgd) => sgd.increment(index, x, y),
            Optimizer::Sdca(sdca) => sdca.dual_step(index, x, y),
        }
    }

    pub fn end_epoch(&mut self) {
        match self {
            Optimizer::Sgd(sgd) => sgd.end_epoch(),
            Optimizer::Sdca(sdca) => sdca.end_epoch(),
        }
    }

    pub fn loss(&self, x: ArrayView1<F>, y: F) -> Result<F, LinearError> {
        match self {
            Optimizer::Sgd(sgd) => sgd.loss(x, y),
            Optimizer::Sdca(sdca) => sdca.loss(x, y),
        }
    }

    pub fn weights(&self) -> Option<ArrayView1<'_, F>> {
        match self {
            Optimizer::Sgd(sgd) => sgd.weights(),
            Optimizer::Sdca(sdca) => sdca.weights(),
        }
    }

    /// The dual vector, for SDCA only.
    pub fn dual(&self) -> Option<ArrayView1<'_, F>> {
        match self {
            Optimizer::Sgd(_) => None,
            Optimizer::Sdca(sdca) => sdca.dual(),
        }
    }

    /// The duality gap on `data`, for SDCA only.
    pub fn duality_gap(&self, data: &Dataset<F>) -> Option<Result<F, LinearError>> {
        match self {
            Optimizer::Sgd(_) => None,
            Optimizer::Sdca(sdca) => Some(sdca.duality_gap(data)),
        }
    }
}

impl<F: Float> From<SgdOptimizer<F>> for Optimizer<F> {
    fn from(sgd: SgdOptimizer<F>) -> Self {
        Optimizer::Sgd(sgd)
    }
}

impl<F: Float> From<SdcaOptimizer<F>> for Optimizer<F> {
    fn from(sdca: SdcaOptimizer<F>) -> Self {
        Optimizer::Sdca(sdca)
    }
}

/// Plain-data description of an optimizer, validated by [`OptimizerConfig::build`].
///
/// With the `serde` feature it reads as `{"kind": "sgd", "c": 1.0, "eps": 0.1}`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", tag = "kind", rename_all = "snake_case")
)]
pub enum OptimizerConfig<F: Float> {
    Sgd {
        c: F,
        eps: F,
        /// Multiplicative per-epoch step decay; constant step when absent.
        #[cfg_attr(feature = "serde", serde(default))]
        decay: Option<F>,
        #[cfg_attr(feature = "serde", serde(default))]
        loss: LossKind,
    },
    Sdca {
        c: F,
        #[cfg_attr(feature = "serde", serde(default))]
        loss: LossKind,
    },
}

impl<F: Float> OptimizerConfig<F> {
    /// Builds from a strategy name, `"sgd"` or `"sdca"`, with logistic loss.
    ///
    /// # Errors
    ///
    /// Returns `LinearError::Configuration` for an unknown `kind`, or for
    /// `"sgd"` without a step size.
    pub fn from_kind(kind: &str, c: F, eps: Option<F>) -> Result<Self, LinearError> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "sgd" => {
                let eps = eps.ok_or_else(|| LinearError::config("eps", "required for sgd"))?;
                Ok(OptimizerConfig::Sgd {
                    c,
                    eps,
                    decay: None,
                    loss: LossKind::Logistic,
                })
            }
            "sdca" => Ok(OptimizerConfig::Sdca {
                c,
                loss: LossKind::Logistic,
            }),
            other => Err(LinearError::config(
                "kind",
                format!("unknown optimizer {other:?}; expected sgd or sdca"),
            )),
        }
    }

    pub fn build(&self) -> Result<Optimizer<F>, LinearError> {
        match *self {
            OptimizerConfig::Sgd {
                c,
                eps,
                decay,
                loss,
            } => {
                let step = match decay {
                    Some(decay) => StepSize::Decay { eps, decay },
                    None => StepSize::Constant(eps),
                };
                Ok(SgdOptimizer::with_config(c, step, loss)?.into())
            }
            OptimizerConfig::Sdca { c, loss } => Ok(SdcaOptimizer::with_loss(c, loss)?.into()),
        }
    }
}
