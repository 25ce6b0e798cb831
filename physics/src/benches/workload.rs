use criterion::{criterion_group, Criterion};
use pqlab_physics::estimate_workload_ms;

fn benchmark_workload(c: &mut Criterion) {
    for complexity in [0.5, 1.0, 2.0, 5.0] {
        c.bench_function(
            &format!("{}/complexity={}", module_path!(), complexity),
            |b| {
                b.iter(|| estimate_workload_ms(complexity));
            },
        );
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = benchmark_workload,
}
