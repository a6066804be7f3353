//! Accuracy of SGD and SDCA across a range of `c`, one independent estimator
//! per setting, trained on scoped threads.

use linclass_helpers::{LinearError, SampleOrder};
use logistic_regression::{LogisticRegression, OptimizerConfig};
use ndarray::{Array1, Array2, s};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

fn gen_overlapping(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut x = Array2::zeros((n, 3));
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let label = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        for j in 0..3 {
            x[[i, j]] = 0.4 * label * (j as f64 + 1.0) + rng.random_range(-1.5..1.5);
        }
        y[i] = label;
    }
    (x, y)
}

fn main() -> Result<(), LinearError> {
    env_logger::init();

    let (x, y) = gen_overlapping(1200, 50307);
    let n_train = 1020;
    let (x_train, x_test) = (x.slice(s![..n_train, ..]), x.slice(s![n_train.., ..]));
    let (y_train, y_test) = (y.slice(s![..n_train]), y.slice(s![n_train..]));

    let cs = [1e-4, 1e-3, 1e-2, 1e-1, 1.0, 10.0, 100.0];
    let mut configs = Vec::new();
    for &c in &cs {
        configs.push(OptimizerConfig::from_kind("sgd", c, Some(1e-3))?);
        configs.push(OptimizerConfig::from_kind("sdca", c, None)?);
    }

    let results: Vec<Result<(OptimizerConfig<f64>, f64, f64), LinearError>> =
        std::thread::scope(|scope| {
            let handles: Vec<_> = configs
                .iter()
                .map(|&config| {
                    scope.spawn(move || -> Result<_, LinearError> {
                        let mut model = LogisticRegression::new(config.build()?)
                            .with_order(SampleOrder::Shuffled { seed: 50307 });
                        model.fit(x_train, y_train, 10, false)?;
                        let train = model.score_accuracy(x_train, y_train)?;
                        let test = model.score_accuracy(x_test, y_test)?;
                        Ok((config, train, test))
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("training thread panicked"))
                .collect()
        });

    println!("{:<6} {:>10} {:>10} {:>10}", "kind", "c", "train", "test");
    for result in results {
        let (config, train, test) = result?;
        let (kind, c) = match config {
            OptimizerConfig::Sgd { c, .. } => ("sgd", c),
            OptimizerConfig::Sdca { c, .. } => ("sdca", c),
        };
        println!("{:<6} {:>10.0e} {:>10.3} {:>10.3}", kind, c, train, test);
    }
    Ok(())
}
