use criterion::{criterion_group, Criterion};
use pqlab_physics::{sample_with, simulate_with, Fixed, Link, Suite};

fn benchmark_simulate(c: &mut Criterion) {
    let link = Link::with_rtt(30.0).unwrap();
    for suite in Suite::ALL {
        c.bench_function(&format!("{}/suite={}", module_path!(), suite), |b| {
            b.iter(|| simulate_with(suite, &link, &Fixed(1.0)));
        });
    }

    let links: Vec<Link> = (0..1_024)
        .map(|i| Link::with_rtt(20.0 + (i % 20) as f64).unwrap())
        .collect();
    for suite in Suite::ALL {
        c.bench_function(
            &format!("{}/suite={} samples={}", module_path!(), suite, links.len()),
            |b| {
                b.iter(|| sample_with(suite, &links, &Fixed(1.0)));
            },
        );
    }
}

criterion_group!(benches, benchmark_simulate);
