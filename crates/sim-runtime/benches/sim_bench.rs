use criterion::{criterion_group, criterion_main, Criterion};
use sim_ai::AiConfig;
use sim_core::scenario::demo_world;
use sim_core::{Catalog, SimConfig};
use sim_runtime::Simulation;

fn bench_ticks(c: &mut Criterion) {
    let catalog = Catalog::standard();
    let config = SimConfig::default();
    let world = demo_world(&catalog, &config).unwrap();
    let mut sim = Simulation::new(world, catalog, config, AiConfig::default());
    c.bench_function("sim_tick", |b| {
        b.iter(|| {
            let _ = sim.simulate_day();
        })
    });
}

criterion_group!(benches, bench_ticks);
criterion_main!(benches);
