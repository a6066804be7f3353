use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use linclass_helpers::loss::predicted_label;
use linclass_helpers::LossKind;
use logistic_regression::LogisticRegression;
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use sdca::SdcaOptimizer;
use sgd::SgdOptimizer;

fn random_problem(n: usize, d: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    let x = Array2::from_shape_fn((n, d), |_| rng.random_range(-1.0..1.0));
    let truth = Array1::from_shape_fn(d, |j| if j % 2 == 0 { 1.0 } else { -0.5 });
    let y = x.dot(&truth).mapv(predicted_label);
    (x, y)
}

fn bench_epochs(c: &mut Criterion) {
    let mut group = c.benchmark_group("five_epochs");
    for &d in &[8usize, 64] {
        let (x, y) = random_problem(2000, d);

        group.bench_with_input(BenchmarkId::new("sgd", d), &d, |b, _| {
            b.iter(|| {
                let mut model = LogisticRegression::new(SgdOptimizer::new(1.0, 1e-3).unwrap());
                black_box(model.fit(x.view(), y.view(), 5, false).unwrap())
            })
        });

        for loss in [LossKind::Logistic, LossKind::Square] {
            group.bench_with_input(BenchmarkId::new(format!("sdca_{loss}"), d), &d, |b, _| {
                b.iter(|| {
                    let optimizer = SdcaOptimizer::with_loss(1.0, loss).unwrap();
                    let mut model = LogisticRegression::new(optimizer);
                    black_box(model.fit(x.view(), y.view(), 5, false).unwrap())
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_epochs);
criterion_main!(benches);
