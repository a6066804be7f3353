//! SDCA with the square loss on two noisy clusters: learning curve on a
//! train and a held-out set, plus how far the dual coefficients move.

use linclass_helpers::loss::predicted_label;
use linclass_helpers::{LinearError, LossKind};
use logistic_regression::LogisticRegression;
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use sdca::SdcaOptimizer;

fn gen_clusters(n: usize, spread: f64, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut x = Array2::zeros((n, 2));
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let label = if i % 2 == 0 { 1.0 } else { -1.0 };
        x[[i, 0]] = label + rng.random_range(-spread..spread);
        x[[i, 1]] = label + rng.random_range(-spread..spread);
        y[i] = label;
    }
    (x, y)
}

fn main() -> Result<(), LinearError> {
    env_logger::init();

    let (x, y) = gen_clusters(1000, 1.2, 0);
    let (x_test, y_test) = gen_clusters(100, 1.2, 1);
    let n_iter = 20;

    let optimizer = SdcaOptimizer::with_loss(1.0, LossKind::Square)?;
    let mut model = LogisticRegression::new(optimizer).with_snapshots(true);
    let (w, history) = model.fit(x.view(), y.view(), n_iter, true)?;
    let history = history.expect("history was requested");

    println!("Final weights: {}", w);
    println!("\nepoch  train_acc  test_acc  mean_loss  duality_gap");
    for record in history.records() {
        let w_t = record.weights.as_ref().expect("snapshots enabled");
        let train = accuracy(&x, &y, w_t);
        let test = accuracy(&x_test, &y_test, w_t);
        println!(
            "{:>5}  {:>9.3}  {:>8.3}  {:>9.5}  {:>11.3e}",
            record.epoch,
            train,
            test,
            record.loss,
            record.duality_gap.unwrap_or(f64::NAN)
        );
    }

    let first = history.records()[0].dual.as_ref().expect("SDCA snapshots");
    let last = history.last().and_then(|r| r.dual.as_ref()).expect("SDCA snapshots");
    let moved = (last - first).mapv(f64::abs).sum() / first.len() as f64;
    println!("\nMean |alpha| change after the first epoch: {:.5}", moved);

    println!(
        "Estimator accuracy: train {:.3}, test {:.3}",
        model.score_accuracy(x.view(), y.view())?,
        model.score_accuracy(x_test.view(), y_test.view())?
    );
    Ok(())
}

fn accuracy(x: &Array2<f64>, y: &Array1<f64>, w: &Array1<f64>) -> f64 {
    let margins = x.dot(w);
    let hits = margins
        .iter()
        .zip(y.iter())
        .filter(|&(&m, &t)| predicted_label(m) == t)
        .count();
    hits as f64 / y.len() as f64
}
