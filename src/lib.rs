//! L2-regularized linear binary classification trained by stochastic
//! gradient descent or stochastic dual coordinate ascent.
//!
//! The workspace crates are re-exported here so applications need a single
//! dependency.

pub use linclass_helpers::{
    check_labels, loss, DataPoint, Dataset, EpochOrder, Float, FnProjection, Identity,
    KernelConfig, LinearError, LossKind, Projection, SampleOrder,
};
pub use logistic_regression::{EpochRecord, History, LogisticRegression, Optimizer, OptimizerConfig};
pub use sdca::SdcaOptimizer;
pub use sgd::{SgdOptimizer, StepSize};
