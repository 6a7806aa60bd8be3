use criterion::{black_box, criterion_group, criterion_main, Criterion};
use methylnorm::tools::huber::huber_default;
use methylnorm::tools::normexp::{self, NormExpParams};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Exp, Normal};

const N_VALUES: usize = 100_000;

fn synthetic_intensities(seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let background = Normal::new(500.0, 25.0).unwrap();
    let signal = Exp::new(1.0 / 1000.0).unwrap();
    (0..N_VALUES)
        .map(|_| background.sample(&mut rng) + signal.sample(&mut rng))
        .collect()
}

fn bench_signal(c: &mut Criterion) {
    let values = synthetic_intensities(1);
    let params = NormExpParams {
        mu:        500.0,
        log_sigma: 25.0f64.ln(),
        log_alpha: 1000.0f64.ln(),
    };
    c.bench_function("normexp_signal_100k", |b| {
        b.iter(|| normexp::signal(black_box(&params), black_box(&values)).unwrap())
    });
}

fn bench_huber(c: &mut Criterion) {
    let values = synthetic_intensities(2);
    c.bench_function("huber_100k", |b| {
        b.iter(|| huber_default(black_box(&values)).unwrap())
    });
}

criterion_group!(benches, bench_signal, bench_huber);
criterion_main!(benches);
