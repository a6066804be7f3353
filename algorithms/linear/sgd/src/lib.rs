use linclass_helpers::loss::{regularized_loss, sgd_increment};
use linclass_helpers::{Float, KernelConfig, LinearError, LossKind};
use log::{debug, warn};
use ndarray::{Array1, ArrayView1};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Step-size schedule for stochastic gradient descent.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate", rename_all = "snake_case")
)]
pub enum StepSize<F: Float> {
    /// The same `eps` for every update.
    Constant(F),
    /// `eps · decay^t` during epoch `t` (e.g., 0.99 for 1% decay per epoch).
    Decay { eps: F, decay: F },
}

impl<F: Float> StepSize<F> {
    fn validate(&self) -> Result<(), LinearError> {
        let eps = match *self {
            StepSize::Constant(eps) => eps,
            StepSize::Decay { eps, decay } => {
                if !(decay.is_finite() && decay > F::zero() && decay <= F::one()) {
                    return Err(LinearError::config(
                        "decay",
                        format!("must be in (0, 1], got {}", decay.to_f64_lossy()),
                    ));
                }
                eps
            }
        };
        if !(eps.is_finite() && eps > F::zero()) {
            return Err(LinearError::config(
                "eps",
                format!("must be finite and > 0, got {}", eps.to_f64_lossy()),
            ));
        }
        Ok(())
    }

    /// The initial step size.
    pub fn eps(&self) -> F {
        match *self {
            StepSize::Constant(eps) | StepSize::Decay { eps, .. } => eps,
        }
    }

    /// The step size used during epoch `epoch` (zero-based).
    pub fn at_epoch(&self, epoch: usize) -> F {
        match *self {
            StepSize::Constant(eps) => eps,
            StepSize::Decay { eps, decay } => {
                let t = i32::try_from(epoch).unwrap_or(i32::MAX);
                eps * decay.powi(t)
            }
        }
    }
}

/// Primal stochastic (sub)gradient descent on
/// `½‖w‖² + c · Σ_i φ(y_i · w·x_i)`.
///
/// Each call to [`SgdOptimizer::increment`] applies `w ← w + ε · g_i` for one
/// sample, with `g_i` the descent direction of that sample's regularized loss.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct SgdOptimizer<F: Float> {
    config: KernelConfig<F>,
    step: StepSize<F>,
    epoch: usize,
    weights: Option<Array1<F>>,
}

impl<F: Float> SgdOptimizer<F> {
    /// Creates a logistic-loss optimizer with a constant step size.
    ///
    /// # Errors
    ///
    /// Returns `LinearError::Configuration` if `c` or `eps` is not finite and positive.
    pub fn new(c: F, eps: F) -> Result<Self, LinearError> {
        Self::with_config(c, StepSize::Constant(eps), LossKind::Logistic)
    }

    /// Creates an optimizer with an explicit schedule and loss.
    pub fn with_config(c: F, step: StepSize<F>, loss: LossKind) -> Result<Self, LinearError> {
        let config = KernelConfig::new(c, loss)?;
        step.validate()?;
        if step.eps() >= F::one() {
            warn!(
                "SGD step size {} >= 1 makes every update overshoot the L2 term",
                step.eps().to_f64_lossy()
            );
        }
        Ok(Self {
            config,
            step,
            epoch: 0,
            weights: None,
        })
    }

    /// Starts from `weights` instead of the zero vector.
    pub fn with_initial_weights(mut self, weights: Array1<F>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn config(&self) -> &KernelConfig<F> {
        &self.config
    }

    pub fn step_size(&self) -> &StepSize<F> {
        &self.step
    }

    /// The step size the next update will use.
    pub fn current_eps(&self) -> F {
        self.step.at_epoch(self.epoch)
    }

    /// Number of completed epochs.
    pub fn epochs_done(&self) -> usize {
        self.epoch
    }

    pub fn weights(&self) -> Option<ArrayView1<'_, F>> {
        self.weights.as_ref().map(|w| w.view())
    }

    /// Prepares the weight vector for `n_features` inputs.
    ///
    /// Existing weights (caller-supplied or from a previous run) are kept, so
    /// a second training run continues where the first stopped. Non-finite
    /// weights are replaced by zeros.
    ///
    /// # Errors
    ///
    /// Returns `LinearError::DimensionMismatch` if the existing weights have a
    /// different width.
    pub fn initialize(&mut self, n_features: usize) -> Result<(), LinearError> {
        match &self.weights {
            Some(w) if w.len() != n_features => Err(LinearError::DimensionMismatch {
                context: "SGD weight vector",
                expected: w.len(),
                found: n_features,
            }),
            Some(w) if w.iter().any(|v| !v.is_finite()) => {
                warn!("SGD weights are not finite, restarting from zero");
                self.weights = Some(Array1::zeros(n_features));
                Ok(())
            }
            Some(_) => Ok(()),
            None => {
                self.weights = Some(Array1::zeros(n_features));
                Ok(())
            }
        }
    }

    /// Applies one update for sample `index`, `(x, y)`.
    ///
    /// # Errors
    ///
    /// * `NotFitted` if [`initialize`](Self::initialize) was never called.
    /// * `DimensionMismatch` if `x` has the wrong width.
    /// * `NumericInstability` if the update produced a non-finite weight.
    pub fn increment(&mut self, index: usize, x: ArrayView1<F>, y: F) -> Result<(), LinearError> {
        let eps = self.current_eps();
        let w = self
            .weights
            .as_mut()
            .ok_or(LinearError::NotFitted { operation: "increment" })?;
        if x.len() != w.len() {
            return Err(LinearError::DimensionMismatch {
                context: "SGD sample width",
                expected: w.len(),
                found: x.len(),
            });
        }

        let candidate = &*w + &sgd_increment(&self.config, x, y, w.view(), eps);
        // the weights are only replaced by a finite candidate
        if candidate.iter().any(|v| !v.is_finite()) {
            return Err(LinearError::NumericInstability {
                optimizer: "SGD",
                sample: index,
            });
        }
        *w = candidate;
        Ok(())
    }

    /// Regularized loss of one sample under the current weights.
    ///
    /// # Errors
    ///
    /// * `NotFitted` if [`initialize`](Self::initialize) was never called.
    /// * `DimensionMismatch` if `x` has the wrong width.
    pub fn loss(&self, x: ArrayView1<F>, y: F) -> Result<F, LinearError> {
        let w = self
            .weights
            .as_ref()
            .ok_or(LinearError::NotFitted { operation: "loss" })?;
        if x.len() != w.len() {
            return Err(LinearError::DimensionMismatch {
                context: "SGD sample width",
                expected: w.len(),
                found: x.len(),
            });
        }
        Ok(regularized_loss(&self.config, x, y, w.view()))
    }

    /// Advances the step-size schedule.
    pub fn end_epoch(&mut self) {
        self.epoch += 1;
        debug!(
            "SGD epoch {} done, next eps = {}",
            self.epoch,
            self.current_eps().to_f64_lossy()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use linclass_helpers::loss::descent_direction;
    use ndarray::array;

    #[test]
    fn test_single_sample_epoch_moves_along_descent_direction() {
        let x = array![0.5, -1.0, 2.0];
        let y = -1.0;
        let eps = 0.05;
        let mut sgd = SgdOptimizer::new(1.0, eps)
            .unwrap()
            .with_initial_weights(array![0.1, 0.2, -0.3]);
        sgd.initialize(3).unwrap();

        let before = sgd.weights().unwrap().to_owned();
        let g = descent_direction(sgd.config(), x.view(), y, before.view());
        let loss_before = sgd.loss(x.view(), y).unwrap();

        sgd.increment(0, x.view(), y).unwrap();
        sgd.end_epoch();

        let after = sgd.weights().unwrap().to_owned();
        for j in 0..3 {
            assert_relative_eq!(after[j] - before[j], eps * g[j], epsilon = 1e-12);
        }
        assert!(sgd.loss(x.view(), y).unwrap() < loss_before);
    }

    #[test]
    fn test_loss_decreases_over_epochs_with_small_step() {
        let x = array![1.0, 1.0];
        let mut sgd = SgdOptimizer::new(2.0, 0.01).unwrap();
        sgd.initialize(2).unwrap();

        let mut last = sgd.loss(x.view(), 1.0).unwrap();
        for _ in 0..20 {
            sgd.increment(0, x.view(), 1.0).unwrap();
            sgd.end_epoch();
            let now = sgd.loss(x.view(), 1.0).unwrap();
            assert!(now < last);
            last = now;
        }
    }

    #[test]
    fn test_decay_schedule() {
        let step = StepSize::Decay {
            eps: 0.5,
            decay: 0.5,
        };
        let mut sgd = SgdOptimizer::with_config(1.0, step, LossKind::Logistic).unwrap();
        assert_relative_eq!(sgd.current_eps(), 0.5);
        sgd.end_epoch();
        sgd.end_epoch();
        assert_relative_eq!(sgd.current_eps(), 0.125);
        assert_eq!(sgd.epochs_done(), 2);
    }

    #[test]
    fn test_hinge_loss_ignores_samples_beyond_margin() {
        let mut sgd =
            SgdOptimizer::with_config(1.0, StepSize::Constant(0.1), LossKind::Hinge).unwrap();
        sgd = sgd.with_initial_weights(array![2.0]);
        sgd.initialize(1).unwrap();
        sgd.increment(0, array![1.0].view(), 1.0).unwrap();
        // only the L2 shrinkage acts: 2.0 − 0.1 · 2.0
        assert_relative_eq!(sgd.weights().unwrap()[0], 1.8);
    }

    #[test]
    fn test_error_on_huge_step_size() {
        let mut sgd = SgdOptimizer::new(1.0, f64::MAX).unwrap();
        sgd.initialize(1).unwrap();
        let mut result = Ok(());
        for i in 0..10 {
            result = sgd.increment(i, array![1e300].view(), -1.0);
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(
            result,
            Err(LinearError::NumericInstability { optimizer: "SGD", .. })
        ));
    }

    #[test]
    fn test_error_on_invalid_config() {
        assert!(matches!(
            SgdOptimizer::new(0.0, 0.1),
            Err(LinearError::Configuration { parameter: "c", .. })
        ));
        assert!(matches!(
            SgdOptimizer::new(1.0, -0.1),
            Err(LinearError::Configuration { parameter: "eps", .. })
        ));
        let bad_decay = StepSize::Decay {
            eps: 0.1,
            decay: 1.5,
        };
        assert!(matches!(
            SgdOptimizer::with_config(1.0, bad_decay, LossKind::Logistic),
            Err(LinearError::Configuration { parameter: "decay", .. })
        ));
    }

    #[test]
    fn test_error_before_initialize_and_on_width_change() {
        let mut sgd = SgdOptimizer::new(1.0, 0.1).unwrap();
        assert!(matches!(
            sgd.increment(0, array![1.0].view(), 1.0),
            Err(LinearError::NotFitted { .. })
        ));

        sgd.initialize(2).unwrap();
        assert!(matches!(
            sgd.initialize(3),
            Err(LinearError::DimensionMismatch {
                expected: 2,
                found: 3,
                ..
            })
        ));
        assert!(matches!(
            sgd.increment(0, array![1.0].view(), 1.0),
            Err(LinearError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_diverging_step_keeps_last_finite_weights() {
        let mut sgd = SgdOptimizer::new(1.0, f64::MAX)
            .unwrap()
            .with_initial_weights(array![0.5]);
        sgd.initialize(1).unwrap();
        let result = sgd.increment(3, array![1e300].view(), -1.0);
        assert!(matches!(
            result,
            Err(LinearError::NumericInstability { optimizer: "SGD", sample: 3 })
        ));
        assert_eq!(sgd.weights().unwrap(), array![0.5]);
        assert!(sgd.weights().unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_initialize_restarts_from_non_finite_weights() {
        let mut sgd = SgdOptimizer::new(1.0, 0.1)
            .unwrap()
            .with_initial_weights(array![f64::NEG_INFINITY, 1.0]);
        sgd.initialize(2).unwrap();
        assert_eq!(sgd.weights().unwrap(), array![0.0, 0.0]);
        sgd.increment(0, array![1.0, 0.0].view(), 1.0).unwrap();
        assert!(sgd.weights().unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_error_on_loss_with_wrong_width() {
        let mut sgd = SgdOptimizer::new(1.0, 0.1).unwrap();
        assert!(matches!(
            sgd.loss(array![1.0].view(), 1.0),
            Err(LinearError::NotFitted { operation: "loss" })
        ));
        sgd.initialize(2).unwrap();
        assert!(matches!(
            sgd.loss(array![1.0, 2.0, 3.0].view(), 1.0),
            Err(LinearError::DimensionMismatch {
                context: "SGD sample width",
                expected: 2,
                found: 3,
            })
        ));
    }
}
