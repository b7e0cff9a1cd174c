//! Simulation benchmarks for lane_core.
//!
//! Run with: `cargo bench -p lane_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use lane_core::battle::run_battle_tick;
use lane_core::prelude::*;
use lane_core::progression::progression_for;

/// A world with `per_side` tier-1 units of every archetype on each side,
/// spread over the lane.
fn crowded_world(config: &GameConfig, per_side: i32) -> World {
    let catalog = UnitCatalog::default();
    let progression = progression_for(&config.mode.progression);
    let mut world = World::new(config);
    for side in Side::ALL {
        let x0 = match side {
            Side::Player => 150,
            Side::Ai => 650,
        };
        for (row, archetype) in Archetype::ALL.into_iter().enumerate() {
            let key = UnitKey::new(archetype, 1);
            let Some(def) = catalog.get(key) else { continue };
            let stats = progression.resolve(def, world.sides.get(side), config);
            for i in 0..per_side {
                let id = world.next_unit_id();
                let position = Vec2Fixed::from_ints(x0 + (row as i32) * 12, 20 + i * 12);
                world.spawn(Unit::battle(id, key, side, stats, position, 0, 0));
            }
        }
    }
    world
}

pub fn battle_tick_benchmark(c: &mut Criterion) {
    let config = GameConfig::default();
    let progression = progression_for(&config.mode.progression);

    for per_side in [5, 20] {
        c.bench_function(&format!("battle_tick_{}_units", per_side * 8), |b| {
            b.iter_batched(
                || crowded_world(&config, per_side),
                |mut world| {
                    for _ in 0..50 {
                        run_battle_tick(&mut world, &config, progression.as_ref(), 16);
                        world.game_time += 16;
                    }
                    black_box(world.units.len())
                },
                BatchSize::SmallInput,
            );
        });
    }
}

pub fn full_match_benchmark(c: &mut Criterion) {
    c.bench_function("ai_match_one_round", |b| {
        b.iter(|| {
            let config = GameConfig::default()
                .with_seed(black_box(17))
                .ai_vs_ai(StrategyKind::Balanced, StrategyKind::Aggressive);
            let mut sim = Simulation::new(config);
            sim.start();
            for _ in 0..2_500 {
                sim.tick(16);
            }
            black_box(sim.state_hash())
        });
    });
}

criterion_group!(benches, battle_tick_benchmark, full_match_benchmark);
criterion_main!(benches);
