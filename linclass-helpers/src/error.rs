use thiserror::Error;

/// Errors raised by the optimizers and the estimator.
///
/// Every variant is fatal to the call that produced it; nothing is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinearError {
    /// A hyper-parameter is out of its valid range, or a loss name is unknown.
    #[error("invalid configuration for `{parameter}`: {reason}")]
    Configuration {
        parameter: &'static str,
        reason: String,
    },
    /// A feature width or sample count disagrees with what was seen before.
    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },
    /// Inference was requested before any successful `fit`.
    #[error("model is not fitted; call `fit` before `{operation}`")]
    NotFitted { operation: &'static str },
    /// An update produced NaN or infinity, usually a step size that is too large.
    #[error("{optimizer} produced a non-finite weight after updating sample {sample}")]
    NumericInstability {
        optimizer: &'static str,
        sample: usize,
    },
    /// Labels must use the bipolar encoding.
    #[error("label at index {index} is {value}, expected -1 or +1")]
    InvalidLabel { index: usize, value: f64 },
    /// The training data is empty.
    #[error("training data is empty")]
    EmptyDataSet,
}

impl LinearError {
    pub fn config(parameter: &'static str, reason: impl Into<String>) -> Self {
        LinearError::Configuration {
            parameter,
            reason: reason.into(),
        }
    }
}
