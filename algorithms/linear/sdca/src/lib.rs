use linclass_helpers::loss::{dual_increment, dual_value, loss_value, margin, regularized_loss};
use linclass_helpers::{Dataset, Float, KernelConfig, LinearError, LossKind};
use log::{debug, info};
use ndarray::{Array1, ArrayView1};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Stochastic dual coordinate ascent for `½‖w‖² + c · Σ_i φ(y_i · w·x_i)`.
///
/// The optimizer keeps one dual coefficient per training sample and the
/// primal weights derived from them,
///
/// ```text
/// w = Σ_i α_i · x_i
/// ```
///
/// Every [`dual_step`](SdcaOptimizer::dual_step) changes a single `α_i` and
/// moves `w` by `Δα_i · x_i`, so the relation holds after each step without
/// ever summing over the whole dataset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct SdcaOptimizer<F: Float> {
    config: KernelConfig<F>,
    alpha: Option<Array1<F>>,
    weights: Option<Array1<F>>,
}

impl<F: Float> SdcaOptimizer<F> {
    /// Creates a logistic-loss optimizer.
    ///
    /// # Errors
    ///
    /// Returns `LinearError::Configuration` if `c` is not finite and positive.
    pub fn new(c: F) -> Result<Self, LinearError> {
        Self::with_loss(c, LossKind::Logistic)
    }

    pub fn with_loss(c: F, loss: LossKind) -> Result<Self, LinearError> {
        Ok(Self {
            config: KernelConfig::new(c, loss)?,
            alpha: None,
            weights: None,
        })
    }

    pub fn config(&self) -> &KernelConfig<F> {
        &self.config
    }

    /// The regularization strength in the `λ`-form of the objective,
    /// `λ = 1 / (c · n)`, once the training set size is known.
    pub fn lambda(&self) -> Option<F> {
        self.alpha
            .as_ref()
            .map(|a| F::one() / (self.config.c * F::from_count(a.len())))
    }

    pub fn weights(&self) -> Option<ArrayView1<'_, F>> {
        self.weights.as_ref().map(|w| w.view())
    }

    /// The dual coefficients, one per training sample.
    pub fn dual(&self) -> Option<ArrayView1<'_, F>> {
        self.alpha.as_ref().map(|a| a.view())
    }

    /// Resets the dual vector to zero for `data` and the weights with it.
    pub fn initialize(&mut self, data: &Dataset<F>) {
        self.alpha = Some(Array1::zeros(data.n_samples()));
        self.weights = Some(Array1::zeros(data.n_features()));
        info!(
            "SDCA initialized: {} samples, {} features, loss = {}, c = {}, lambda = {}",
            data.n_samples(),
            data.n_features(),
            self.config.loss,
            self.config.c.to_f64_lossy(),
            self.lambda().map_or(f64::NAN, |l| l.to_f64_lossy())
        );
    }

    /// Maximizes the dual objective along coordinate `i`, holding all other
    /// coordinates fixed, and updates `w` incrementally.
    ///
    /// # Errors
    ///
    /// * `NotFitted` if [`initialize`](Self::initialize) was never called.
    /// * `DimensionMismatch` if `i` is out of range or `x` has the wrong width.
    /// * `NumericInstability` if the step produced a non-finite value.
    pub fn dual_step(&mut self, i: usize, x: ArrayView1<F>, y: F) -> Result<(), LinearError> {
        let (alpha, w) = match (self.alpha.as_mut(), self.weights.as_mut()) {
            (Some(alpha), Some(w)) => (alpha, w),
            _ => return Err(LinearError::NotFitted { operation: "dual_step" }),
        };
        if i >= alpha.len() {
            return Err(LinearError::DimensionMismatch {
                context: "SDCA coordinate index",
                expected: alpha.len(),
                found: i,
            });
        }
        if x.len() != w.len() {
            return Err(LinearError::DimensionMismatch {
                context: "SDCA sample width",
                expected: w.len(),
                found: x.len(),
            });
        }

        let delta = dual_increment(&self.config, x, y, w.view(), alpha[i]);
        if !delta.is_finite() {
            return Err(LinearError::NumericInstability {
                optimizer: "SDCA",
                sample: i,
            });
        }
        if delta != F::zero() {
            alpha[i] += delta;
            w.scaled_add(delta, &x);
        }
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
                context: "SDCA sample width",
                expected: w.len(),
                found: x.len(),
            });
        }
        Ok(regularized_loss(&self.config, x, y, w.view()))
    }

    /// Rebuilds `Σ_i α_i · x_i` from scratch.
    pub fn reconstruct_weights(&self, data: &Dataset<F>) -> Result<Array1<F>, LinearError> {
        let alpha = self.checked_dual(data, "reconstruct_weights")?;
        Ok(data.features().t().dot(&alpha))
    }

    /// `P(w) = ½‖w‖² + c · Σ_i φ(y_i · w·x_i)`.
    pub fn primal_objective(&self, data: &Dataset<F>) -> Result<F, LinearError> {
        let w = self
            .weights
            .as_ref()
            .ok_or(LinearError::NotFitted { operation: "primal_objective" })?;
        let data_term: F = data
            .iter()
            .map(|(x, y)| loss_value(self.config.loss, margin(x, y, w.view())))
            .sum();
        Ok(F::constant(0.5) * w.dot(w) + self.config.c * data_term)
    }

    /// `D(α) = Σ_i ψ(y_i · α_i) − ½‖w(α)‖²`.
    pub fn dual_objective(&self, data: &Dataset<F>) -> Result<F, LinearError> {
        let alpha = self.checked_dual(data, "dual_objective")?;
        let w = self
            .weights
            .as_ref()
            .ok_or(LinearError::NotFitted { operation: "dual_objective" })?;
        let conjugate: F = alpha
            .iter()
            .zip(data.labels().iter())
            .map(|(&a, &y)| dual_value(&self.config, y * a))
            .sum();
        Ok(conjugate - F::constant(0.5) * w.dot(w))
    }

    /// Primal minus dual objective; non-negative, zero at the optimum.
    pub fn duality_gap(&self, data: &Dataset<F>) -> Result<F, LinearError> {
        let gap = self.primal_objective(data)? - self.dual_objective(data)?;
        debug!("SDCA duality gap = {}", gap.to_f64_lossy());
        Ok(gap)
    }

    fn checked_dual(
        &self,
        data: &Dataset<F>,
        operation: &'static str,
    ) -> Result<ArrayView1<'_, F>, LinearError> {
        let alpha = self
            .alpha
            .as_ref()
            .ok_or(LinearError::NotFitted { operation })?;
        if alpha.len() != data.n_samples() {
            return Err(LinearError::DimensionMismatch {
                context: "SDCA dual vector",
                expected: alpha.len(),
                found: data.n_samples(),
            });
        }
        Ok(alpha.view())
    }

    /// Runs one full pass, visiting every sample once in `order`.
    pub fn run_epoch(&mut self, data: &Dataset<F>, order: &[usize]) -> Result<(), LinearError> {
        for &i in order {
            let (x, y) = data.sample(i);
            self.dual_step(i, x, y)?;
        }
        self.end_epoch();
        Ok(())
    }

    /// Logs the largest dual coefficient after a full pass.
    pub fn end_epoch(&self) {
        if let Some(alpha) = self.alpha.as_ref() {
            debug!(
                "SDCA epoch done, max |alpha| = {} (c = {})",
                max_abs_dual(alpha.view()).to_f64_lossy(),
                self.config.c.to_f64_lossy()
            );
        }
    }
}

/// `max_i |α_i|`; bounded by `c` for the logistic and hinge losses.
pub fn max_abs_dual<F: Float>(alpha: ArrayView1<F>) -> F {
    alpha.iter().fold(F::zero(), |acc, &a| acc.max(a.abs()))
}
