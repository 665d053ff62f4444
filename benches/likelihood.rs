use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gpr::prelude::*;
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

const N: usize = 200;
const DIM: usize = 2;
const THETA: [f64; 3] = [0.0, 0.0, -2.3];

fn trained_gp() -> GaussianProcess {
    let mut rng = Xoshiro256Plus::seed_from_u64(17);
    let x =
        DMatrix::from_fn(N, DIM, |_, _| rng.gen::<f64>() * 2.0 - 1.0);

    let mut gp =
        GaussianProcess::new(DIM, "CovSum(CovSEiso, CovNoise)").unwrap();
    gp.set_loghyper(&THETA).unwrap();
    let y = gp.covf().draw_random_sample(&mut rng, &x).unwrap();
    gp.add_patterns(&x, &y).unwrap();
    gp
}

fn bench_factorization(c: &mut Criterion) {
    let mut gp = trained_gp();
    c.bench_function("factorize_200", |b| {
        b.iter(|| {
            // dirty the kernel so every pass refactorizes
            gp.set_loghyper(&THETA).unwrap();
            gp.compute().unwrap();
        })
    });
}

fn bench_likelihood_gradient(c: &mut Criterion) {
    let mut gp = trained_gp();
    gp.compute().unwrap();
    c.bench_function("log_likelihood_gradient_200", |b| {
        b.iter(|| black_box(gp.log_likelihood_gradient().unwrap()))
    });
}

fn bench_prediction(c: &mut Criterion) {
    let mut gp = trained_gp();
    gp.compute().unwrap();
    let _ = gp.f(&[0.0, 0.0]).unwrap();
    c.bench_function("predict_with_variance_200", |b| {
        b.iter(|| {
            let m = gp.f(black_box(&[0.21, -0.47])).unwrap();
            let v = gp.var(black_box(&[0.21, -0.47])).unwrap();
            black_box((m, v))
        })
    });
}

criterion_group!(
    benches,
    bench_factorization,
    bench_likelihood_gradient,
    bench_prediction
);
criterion_main!(benches);
