use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use toolflow_core::{FlowSolver, Instance, LsgBuilder, NetworkBuilder, Solver};

fn build_instance(jobs: usize, tools: usize, capacity: usize) -> Instance {
    let mut rng = StdRng::seed_from_u64(42);
    let costs = (0..tools).map(|_| rng.gen_range(1..=9)).collect();
    let requirements = (0..jobs)
        .map(|_| {
            let size = rng.gen_range(1..=capacity);
            let mut job_tools = Vec::with_capacity(size);
            while job_tools.len() < size {
                let tool = rng.gen_range(1..=tools);
                if !job_tools.contains(&tool) {
                    job_tools.push(tool);
                }
            }
            job_tools
        })
        .collect();
    Instance::new(capacity, costs, requirements).expect("valid instance")
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("lsg_build");
    for &jobs in &[20usize, 80] {
        let instance = build_instance(jobs, 30, 10);
        group.throughput(Throughput::Elements(instance.occurrence_count() as u64));
        group.bench_with_input(BenchmarkId::new("jobs", jobs), &instance, |b, instance| {
            b.iter(|| LsgBuilder.build_from_instance(instance, 0).expect("network"))
        });
    }
    group.finish();
}

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("lsg_solve");
    let solver = FlowSolver::new(LsgBuilder);
    for &(jobs, tools, capacity) in &[(10usize, 10usize, 4usize), (40, 30, 10), (80, 40, 15)] {
        let instance = build_instance(jobs, tools, capacity);
        group.throughput(Throughput::Elements(instance.occurrence_count() as u64));
        group.bench_with_input(
            BenchmarkId::new("n_m_c", format!("{}_{}_{}", jobs, tools, capacity)),
            &instance,
            |b, instance| {
                b.iter(|| {
                    let _ = solver.compute_solution(instance);
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_solve);
criterion_main!(benches);
