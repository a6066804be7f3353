use linclass_helpers::loss::{predicted_label, sigmoid_neg};
use linclass_helpers::{
    check_labels, Dataset, EpochOrder, Float, Identity, LinearError, Projection, SampleOrder,
};
use log::{debug, error, info};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

mod history;
mod optimizer;

pub use history::{EpochRecord, History};
pub use optimizer::{Optimizer, OptimizerConfig};

/// A linear binary classifier trained by an incremental [`Optimizer`].
///
/// The estimator owns the optimizer (and through it the weight vector), runs
/// the epoch loop and answers inference queries. Every row is passed through
/// the projection `P` before training and before inference.
///
/// Predictions use `sign(w·x)` with ties (`w·x == 0`) assigned to `+1`.
///
/// # Type Parameters
///
/// * `F`: The float type for the features (e.g., `f32`, `f64`).
/// * `P`: The feature projection, [`Identity`] unless one is supplied.
#[derive(Debug, Clone)]
pub struct LogisticRegression<F, P = Identity>
where
    F: Float,
    P: Projection<F>,
{
    optimizer: Optimizer<F>,
    projection: P,
    order: SampleOrder,
    snapshots: bool,
    n_features: Option<usize>,
    fitted: bool,
}

impl<F: Float> LogisticRegression<F, Identity> {
    /// Creates an estimator that trains on the raw features.
    pub fn new(optimizer: impl Into<Optimizer<F>>) -> Self {
        Self::with_projection(optimizer, Identity)
    }
}

impl<F, P> LogisticRegression<F, P>
where
    F: Float,
    P: Projection<F>,
{
    /// Creates an estimator that trains on `projection(x)` instead of `x`.
    pub fn with_projection(optimizer: impl Into<Optimizer<F>>, projection: P) -> Self {
        Self {
            optimizer: optimizer.into(),
            projection,
            order: SampleOrder::Sequential,
            snapshots: false,
            n_features: None,
            fitted: false,
        }
    }

    /// Sets the order in which each epoch visits the samples.
    pub fn with_order(mut self, order: SampleOrder) -> Self {
        self.order = order;
        self
    }

    /// Includes copies of `w` (and of `α` for SDCA) in recorded history.
    pub fn with_snapshots(mut self, snapshots: bool) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn optimizer(&self) -> &Optimizer<F> {
        &self.optimizer
    }

    /// The current weights, in projected feature space.
    pub fn weights(&self) -> Option<ArrayView1<'_, F>> {
        if self.fitted {
            self.optimizer.weights()
        } else {
            None
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Trains for `epochs` full passes over `(x, y)`.
    ///
    /// Returns the final weights and, when `record_history` is set, one
    /// [`EpochRecord`] per epoch. Nothing is recorded otherwise.
    ///
    /// A second call keeps the input width of the first one. SGD continues from
    /// the current weights; SDCA restarts its dual state on the new data.
    ///
    /// # Errors
    ///
    /// * `Configuration` if `epochs` is zero.
    /// * `DimensionMismatch` if `x` is narrower or wider than in an earlier fit,
    ///   or `y` has a different length than `x`.
    /// * `InvalidLabel` / `EmptyDataSet` for malformed training data.
    /// * `NumericInstability` if an update diverged; the model is left unfitted.
    pub fn fit(
        &mut self,
        x: ArrayView2<F>,
        y: ArrayView1<F>,
        epochs: usize,
        record_history: bool,
    ) -> Result<(Array1<F>, Option<History<F>>), LinearError> {
        if epochs == 0 {
            return Err(LinearError::config("epochs", "must be at least 1"));
        }
        self.check_width(x.ncols(), "fit feature count")?;

        let data = Dataset::new(self.projection.project_rows(x), y.to_owned())?;
        self.fitted = false;
        self.optimizer.begin(&data)?;
        self.n_features = Some(x.ncols());

        info!(
            "fitting with {} for {} epochs on {} samples x {} features",
            self.optimizer.name(),
            epochs,
            data.n_samples(),
            data.n_features()
        );

        let mut history = record_history.then(|| History::with_capacity(epochs));
        let mut order = EpochOrder::new(self.order, data.n_samples());

        for epoch in 1..=epochs {
            for &i in order.next_epoch() {
                let (xi, yi) = data.sample(i);
                if let Err(e) = self.optimizer.increment(i, xi, yi) {
                    error!("training aborted in epoch {}: {}", epoch, e);
                    return Err(e);
                }
            }
            self.optimizer.end_epoch();

            if let Some(history) = history.as_mut() {
                let record = self.epoch_record(epoch, &data)?;
                debug!(
                    "epoch {}/{}: mean loss = {}",
                    epoch,
                    epochs,
                    record.loss.to_f64_lossy()
                );
                history.push(record);
            }
        }

        let weights = self
            .optimizer
            .weights()
            .map(|w| w.to_owned())
            .ok_or(LinearError::NotFitted { operation: "fit" })?;
        self.fitted = true;
        Ok((weights, history))
    }

    fn epoch_record(&self, epoch: usize, data: &Dataset<F>) -> Result<EpochRecord<F>, LinearError> {
        let mut total = F::zero();
        for (xi, yi) in data.iter() {
            total += self.optimizer.loss(xi, yi)?;
        }
        let loss = total / F::from_count(data.n_samples());

        let duality_gap = self.optimizer.duality_gap(data).transpose()?;
        let (weights, dual) = if self.snapshots {
            (
                self.optimizer.weights().map(|w| w.to_owned()),
                self.optimizer.dual().map(|a| a.to_owned()),
            )
        } else {
            (None, None)
        };

        Ok(EpochRecord {
            epoch,
            loss,
            weights,
            dual,
            duality_gap,
        })
    }

    fn check_width(&self, found: usize, context: &'static str) -> Result<(), LinearError> {
        match self.n_features {
            Some(expected) if expected != found => Err(LinearError::DimensionMismatch {
                context,
                expected,
                found,
            }),
            _ => Ok(()),
        }
    }

    /// Projects `x` and returns it with the trained weights.
    fn prepare(
        &self,
        x: ArrayView2<F>,
        operation: &'static str,
    ) -> Result<(Array2<F>, ArrayView1<'_, F>), LinearError> {
        let w = self.weights().ok_or(LinearError::NotFitted { operation })?;
        self.check_width(x.ncols(), "inference feature count")?;
        let projected = self.projection.project_rows(x);
        if projected.ncols() != w.len() {
            return Err(LinearError::DimensionMismatch {
                context: "projected feature count",
                expected: w.len(),
                found: projected.ncols(),
            });
        }
        Ok((projected, w))
    }

    /// The raw margins `w·x` of every row.
    pub fn decision_function(&self, x: ArrayView2<F>) -> Result<Array1<F>, LinearError> {
        let (projected, w) = self.prepare(x, "decision_function")?;
        Ok(projected.dot(&w))
    }

    /// `sign(w·x)` for every row, as `-1` or `+1`; a zero margin maps to `+1`.
    ///
    /// # Errors
    ///
    /// * `NotFitted` before a successful `fit`.
    /// * `DimensionMismatch` if `x` has a different width than the training data.
    pub fn predict(&self, x: ArrayView2<F>) -> Result<Array1<F>, LinearError> {
        let margins = self.decision_function(x)?;
        Ok(margins.mapv(predicted_label))
    }

    /// Estimated probability of the positive class, `σ(w·x)`.
    pub fn predict_proba(&self, x: ArrayView2<F>) -> Result<Array1<F>, LinearError> {
        let margins = self.decision_function(x)?;
        Ok(margins.mapv(|m| sigmoid_neg(-m)))
    }

    /// Fraction of rows whose prediction equals the label, in `[0, 1]`.
    pub fn score_accuracy(&self, x: ArrayView2<F>, y: ArrayView1<F>) -> Result<F, LinearError> {
        let predictions = self.predict(x)?;
        if predictions.len() != y.len() {
            return Err(LinearError::DimensionMismatch {
                context: "label count",
                expected: predictions.len(),
                found: y.len(),
            });
        }
        if y.is_empty() {
            return Err(LinearError::EmptyDataSet);
        }
        check_labels(y)?;

        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| p == t)
            .count();
        Ok(F::from_count(correct) / F::from_count(y.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use linclass_helpers::{FnProjection, LossKind};
    use ndarray::array;
    use sdca::SdcaOptimizer;
    use sgd::SgdOptimizer;

    fn axis_data() -> (Array2<f64>, Array1<f64>) {
        (
            array![[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]],
            array![1.0, 1.0, -1.0, -1.0],
        )
    }

    /// Two well separated groups, mirrored through the origin.
    fn separable_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [2.0, 1.5],
            [1.5, 2.5],
            [3.0, 2.0],
            [2.2, 0.8],
            [1.0, 2.0],
            [-2.0, -1.5],
            [-1.5, -2.5],
            [-3.0, -2.0],
            [-2.2, -0.8],
            [-1.0, -2.0],
        ];
        let y = array![1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0, -1.0];
        (x, y)
    }

    #[test]
    fn test_sgd_axis_dataset() {
        let (x, y) = axis_data();
        let mut model = LogisticRegression::new(SgdOptimizer::new(1.0, 0.1).unwrap());
        let (w, history) = model.fit(x.view(), y.view(), 50, false).unwrap();

        assert!(history.is_none());
        assert!(w[0] > 0.0);
        assert_eq!(model.score_accuracy(x.view(), y.view()).unwrap(), 1.0);
        assert_eq!(model.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_sdca_axis_dataset() {
        let (x, y) = axis_data();
        let mut model = LogisticRegression::new(SdcaOptimizer::new(1.0).unwrap());
        model.fit(x.view(), y.view(), 1, false).unwrap();

        let alpha = model.optimizer().dual().unwrap();
        assert_eq!(alpha.len(), 4);
        for &a in alpha.iter() {
            assert!((-1.0..=1.0).contains(&a));
        }
        assert_eq!(model.score_accuracy(x.view(), y.view()).unwrap(), 1.0);
    }

    #[test]
    fn test_history_records_every_epoch() {
        let (x, y) = separable_data();
        let mut model =
            LogisticRegression::new(SgdOptimizer::new(1.0, 0.01).unwrap()).with_snapshots(true);
        let (w, history) = model.fit(x.view(), y.view(), 15, true).unwrap();
        let history = history.unwrap();

        assert_eq!(history.len(), 15);
        let epochs: Vec<usize> = history.records().iter().map(|r| r.epoch).collect();
        assert_eq!(epochs, (1..=15).collect::<Vec<_>>());
        assert_eq!(history.weights().count(), 15);
        assert_eq!(history.last().unwrap().weights.as_ref().unwrap(), &w);
        assert!(history.records().iter().all(|r| r.dual.is_none() && r.duality_gap.is_none()));

        let losses = history.losses();
        assert!(losses.last().unwrap() < losses.first().unwrap());
    }

    #[test]
    fn test_history_without_snapshots_stores_only_losses() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new(SdcaOptimizer::new(1.0).unwrap());
        let (_, history) = model.fit(x.view(), y.view(), 5, true).unwrap();
        let history = history.unwrap();

        assert_eq!(history.len(), 5);
        for record in &history {
            assert!(record.weights.is_none());
            assert!(record.dual.is_none());
            assert!(record.loss.is_finite());
            assert!(record.duality_gap.unwrap() >= -1e-9);
        }
    }

    #[test]
    fn test_sdca_snapshots_include_dual() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new(
            SdcaOptimizer::with_loss(1.0, LossKind::Square).unwrap(),
        )
        .with_snapshots(true);
        let (_, history) = model.fit(x.view(), y.view(), 3, true).unwrap();
        for record in history.unwrap().records() {
            assert_eq!(record.dual.as_ref().unwrap().len(), 10);
            assert_eq!(record.weights.as_ref().unwrap().len(), 2);
        }
    }

    #[test]
    fn test_separable_data_reaches_full_accuracy() {
        let (x, y) = separable_data();
        let optimizers: Vec<Optimizer<f64>> = vec![
            SgdOptimizer::new(1.0, 0.01).unwrap().into(),
            SdcaOptimizer::new(1.0).unwrap().into(),
            SdcaOptimizer::with_loss(1.0, LossKind::Hinge).unwrap().into(),
        ];
        for optimizer in optimizers {
            let name = optimizer.name();
            let mut model = LogisticRegression::new(optimizer)
                .with_order(SampleOrder::Shuffled { seed: 50307 });
            model.fit(x.view(), y.view(), 30, false).unwrap();
            let accuracy = model.score_accuracy(x.view(), y.view()).unwrap();
            assert_eq!(accuracy, 1.0, "{name} accuracy {accuracy}");
        }
    }

    #[test]
    fn test_predict_is_idempotent() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new(SgdOptimizer::new(1.0, 0.05).unwrap());
        model.fit(x.view(), y.view(), 3, false).unwrap();
        let first = model.predict(x.view()).unwrap();
        let second = model.predict(x.view()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_margin_predicts_positive() {
        let (x, y) = axis_data();
        let mut model = LogisticRegression::new(SgdOptimizer::new(1.0, 0.1).unwrap());
        model.fit(x.view(), y.view(), 5, false).unwrap();

        let origin = array![[0.0, 0.0]];
        assert_eq!(model.decision_function(origin.view()).unwrap()[0], 0.0);
        assert_eq!(model.predict(origin.view()).unwrap(), array![1.0]);
        assert_relative_eq!(model.predict_proba(origin.view()).unwrap()[0], 0.5);
    }

    #[test]
    fn test_accuracy_is_a_fraction() {
        let (x, y) = separable_data();
        let mut model = LogisticRegression::new(SgdOptimizer::new(1.0, 0.01).unwrap());
        model.fit(x.view(), y.view(), 10, false).unwrap();

        let flipped = y.mapv(|v| -v);
        assert_eq!(model.score_accuracy(x.view(), flipped.view()).unwrap(), 0.0);

        let mut mixed = y.clone();
        mixed[0] = -1.0;
        mixed[5] = 1.0;
        assert_relative_eq!(model.score_accuracy(x.view(), mixed.view()).unwrap(), 0.8);
    }

    #[test]
    fn test_projection_is_applied_before_fit_and_predict() {
        let (x, y) = axis_data();
        // flip the sign of every feature, which flips the learned weights
        let negate = FnProjection(|row: ArrayView1<f64>| row.mapv(|v| -v));
        let mut model = LogisticRegression::with_projection(SgdOptimizer::new(1.0, 0.1).unwrap(), negate);
        let (w, _) = model.fit(x.view(), y.view(), 50, false).unwrap();

        assert!(w[0] < 0.0 && w[1] < 0.0);
        assert_eq!(model.score_accuracy(x.view(), y.view()).unwrap(), 1.0);
    }

    #[test]
    fn test_projection_may_change_width() {
        let (x, y) = axis_data();
        let with_bias = FnProjection(|row: ArrayView1<f64>| {
            let mut out = row.to_vec();
            out.push(1.0);
            Array1::from(out)
        });
        let mut model =
            LogisticRegression::with_projection(SdcaOptimizer::new(1.0).unwrap(), with_bias);
        let (w, _) = model.fit(x.view(), y.view(), 5, false).unwrap();
        assert_eq!(w.len(), 3);
        assert_eq!(model.predict(x.view()).unwrap().len(), 4);
    }

    #[test]
    fn test_refit_continues_sgd_from_previous_weights() {
        let (x, y) = separable_data();
        let mut once = LogisticRegression::new(SgdOptimizer::new(1.0, 0.01).unwrap());
        let (w_once, _) = once.fit(x.view(), y.view(), 10, false).unwrap();

        let mut twice = LogisticRegression::new(SgdOptimizer::new(1.0, 0.01).unwrap());
        twice.fit(x.view(), y.view(), 5, false).unwrap();
        let (w_twice, _) = twice.fit(x.view(), y.view(), 5, false).unwrap();

        for (a, b) in w_once.iter().zip(w_twice.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_error_on_width_change_between_fits() {
        let (x, y) = axis_data();
        let mut model = LogisticRegression::new(SdcaOptimizer::new(1.0).unwrap());
        model.fit(x.view(), y.view(), 1, false).unwrap();

        let wider = array![[1.0, 0.0, 2.0], [0.0, 1.0, 2.0]];
        let result = model.fit(wider.view(), array![1.0, -1.0].view(), 1, false);
        assert_eq!(
            result.unwrap_err(),
            LinearError::DimensionMismatch {
                context: "fit feature count",
                expected: 2,
                found: 3,
            }
        );
        assert!(matches!(
            model.predict(wider.view()),
            Err(LinearError::DimensionMismatch { expected: 2, found: 3, .. })
        ));
    }

    #[test]
    fn test_error_before_fit() {
        let (x, y) = axis_data();
        let model = LogisticRegression::new(SgdOptimizer::new(1.0, 0.1).unwrap());
        assert_eq!(
            model.predict(x.view()).unwrap_err(),
            LinearError::NotFitted {
                operation: "decision_function"
            }
        );
        assert!(matches!(
            model.score_accuracy(x.view(), y.view()),
            Err(LinearError::NotFitted { .. })
        ));
        assert!(model.weights().is_none());
    }

    #[test]
    fn test_error_on_bad_training_input() {
        let (x, _) = axis_data();
        let mut model = LogisticRegression::new(SgdOptimizer::new(1.0, 0.1).unwrap());

        let zero_one = array![1.0, 1.0, 0.0, 0.0];
        assert_eq!(
            model.fit(x.view(), zero_one.view(), 1, false).unwrap_err(),
            LinearError::InvalidLabel {
                index: 2,
                value: 0.0
            }
        );
        assert!(matches!(
            model.fit(x.view(), array![1.0, -1.0].view(), 1, false),
            Err(LinearError::DimensionMismatch { context: "label count", .. })
        ));
        assert!(matches!(
            model.fit(x.view(), array![1.0, 1.0, -1.0, -1.0].view(), 0, false),
            Err(LinearError::Configuration { parameter: "epochs", .. })
        ));
    }

    #[test]
    fn test_divergence_leaves_model_unfitted() {
        let x = array![[1e200], [-1e200]];
        let y = array![-1.0, 1.0];
        let mut model = LogisticRegression::new(SgdOptimizer::new(1.0, 1e200).unwrap());
        let result = model.fit(x.view(), y.view(), 3, false);
        assert!(matches!(
            result,
            Err(LinearError::NumericInstability { optimizer: "SGD", .. })
        ));
        assert!(!model.is_fitted());
        assert!(matches!(
            model.predict(x.view()),
            Err(LinearError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_refit_after_divergence_resumes_from_last_finite_weights() {
        let step = sgd::StepSize::Constant(0.5);
        let optimizer = SgdOptimizer::with_config(4.0, step, LossKind::Hinge).unwrap();
        let mut model = LogisticRegression::new(optimizer);

        let benign_x = array![[1.0]];
        let benign_y = array![1.0];
        // w: 0 → 2 → 1 → 0.5
        let (w, _) = model.fit(benign_x.view(), benign_y.view(), 3, false).unwrap();
        assert_relative_eq!(w[0], 0.5);

        let result = model.fit(array![[f64::MAX]].view(), array![-1.0].view(), 1, false);
        assert_eq!(
            result.unwrap_err(),
            LinearError::NumericInstability {
                optimizer: "SGD",
                sample: 0
            }
        );
        assert!(!model.is_fitted());
        assert_eq!(model.optimizer().weights().unwrap(), array![0.5]);

        // 0.5 + 0.5 · (4 − 0.5)
        let (w, _) = model.fit(benign_x.view(), benign_y.view(), 1, false).unwrap();
        assert_relative_eq!(w[0], 2.25);
        assert_eq!(model.predict(benign_x.view()).unwrap(), array![1.0]);
    }

    #[test]
    fn test_failed_initialization_does_not_bind_width() {
        let optimizer = SgdOptimizer::new(1.0, 0.1)
            .unwrap()
            .with_initial_weights(array![0.0, 0.0, 0.0]);
        let mut model = LogisticRegression::new(optimizer);

        let (x, y) = axis_data();
        assert_eq!(
            model.fit(x.view(), y.view(), 1, false).unwrap_err(),
            LinearError::DimensionMismatch {
                context: "SGD weight vector",
                expected: 3,
                found: 2,
            }
        );

        let wide = array![[1.0, 0.0, 0.5], [-1.0, 0.0, -0.5]];
        let (w, _) = model.fit(wide.view(), array![1.0, -1.0].view(), 5, false).unwrap();
        assert_eq!(w.len(), 3);
        assert_eq!(model.predict(wide.view()).unwrap(), array![1.0, -1.0]);
    }

    #[test]
    fn test_independent_models_train_in_parallel() {
        let (x, y) = separable_data();
        let cs = [0.1, 1.0, 10.0];
        let scores: Vec<f64> = std::thread::scope(|s| {
            let handles: Vec<_> = cs
                .iter()
                .map(|&c| {
                    let (x, y) = (x.view(), y.view());
                    s.spawn(move || {
                        let mut model = LogisticRegression::new(SdcaOptimizer::new(c).unwrap());
                        model.fit(x, y, 10, false).unwrap();
                        model.score_accuracy(x, y).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }
}
