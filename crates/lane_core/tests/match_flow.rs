//! Whole-match behavior through the public [`Simulation`] API.

use lane_core::prelude::*;
use lane_test_utils::fixtures::{
    ai_match, human_vs_human, match_with, pos, run_for, run_until_phase_change,
};

/// Tick indices at which `attacker` damaged something, at 100 ms frames.
fn attack_ticks(sim: &mut Simulation, attacker: UnitId, frames: usize) -> Vec<usize> {
    let mut ticks = Vec::new();
    for frame in 0..frames {
        let events = sim.tick(100);
        if events
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::UnitDamaged { attacker: a, .. } if *a == attacker))
        {
            ticks.push(frame);
        }
    }
    ticks
}

fn duel(speed: u32) -> Simulation {
    let mut sim = match_with(
        human_vs_human(),
        &[
            (Side::Player, Archetype::Melee, 150, 100),
            (Side::Ai, Archetype::Melee, 50, 100),
        ],
    );
    sim.set_speed(speed);
    sim
}

#[test]
fn test_double_speed_halves_wall_time_between_attacks() {
    // Templates are ids 1 and 2; the player's battle unit is id 3.
    let attacker = UnitId(3);

    let mut normal = duel(1);
    let normal_ticks = attack_ticks(&mut normal, attacker, 200);
    let mut fast = duel(2);
    let fast_ticks = attack_ticks(&mut fast, attacker, 100);

    assert!(normal_ticks.len() >= 2 && fast_ticks.len() >= 2);
    assert_eq!(normal_ticks[1] - normal_ticks[0], 10);
    assert_eq!(fast_ticks[1] - fast_ticks[0], 5);
}

#[test]
fn test_rounds_cycle_and_auto_unlock_tier_two() {
    let mut sim = Simulation::new(human_vs_human());
    sim.start();

    let mut events = Vec::new();
    while sim.round() < 4 {
        events.extend(run_until_phase_change(&mut sim, 60_000));
    }
    assert!(!sim.side(Side::Player).has_tier(2));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SimEvent::RoundSettled { .. }))
            .count(),
        4
    );

    while sim.round() < 5 {
        events.extend(run_until_phase_change(&mut sim, 60_000));
    }
    for side in Side::ALL {
        assert!(sim.side(side).has_tier(2));
        assert!(events.contains(&SimEvent::TierUnlocked {
            side,
            tier: 2,
            purchased: false
        }));
    }
    assert!(events.iter().any(|e| matches!(
        e,
        SimEvent::GoldAwarded {
            source: GoldSource::TierUnlock,
            ..
        }
    )));
}

#[test]
fn test_leveled_auto_upgrade_every_third_round() {
    let mut sim = Simulation::new(human_vs_human().with_mode(GameMode::leveled()));
    sim.start();
    while sim.round() < 2 {
        run_until_phase_change(&mut sim, 60_000);
    }
    assert_eq!(sim.side(Side::Ai).upgrade_levels.get(Archetype::Caster), 0);
    while sim.round() < 3 {
        run_until_phase_change(&mut sim, 60_000);
    }
    for side in Side::ALL {
        for archetype in Archetype::ALL {
            assert_eq!(sim.side(side).upgrade_levels.get(archetype), 1);
        }
    }
}

#[test]
fn test_undefended_base_falls_to_computer() {
    let mut config = GameConfig::default().with_seed(11);
    config.starting_health = 2;
    let mut sim = Simulation::new(config);
    sim.start();

    let mut events = Vec::new();
    for _ in 0..20 {
        events.extend(run_until_phase_change(&mut sim, 60_000));
        if sim.is_game_over() {
            break;
        }
    }
    assert_eq!(sim.outcome(), Some(Some(Side::Ai)));
    assert_eq!(sim.phase(), Phase::Finished);
    assert_eq!(sim.side(Side::Player).health, 0);
    assert!(events
        .iter()
        .any(|e| matches!(e, SimEvent::BaseBreached { attacker: Side::Ai, .. })));
}

#[test]
fn test_restart_replays_the_same_match() {
    let mut sim = ai_match(5);
    run_for(&mut sim, 30_000);
    let first = sim.state_hash();
    assert!(!sim.units().is_empty() || sim.round() > 0);

    sim.restart();
    sim.start();
    run_for(&mut sim, 30_000);
    assert_eq!(sim.state_hash(), first);
}

#[test]
fn test_comeback_boost_reaches_new_units() {
    let mut sim = match_with(human_vs_human(), &[(Side::Ai, Archetype::Melee, 100, 100)]);
    // Lone AI unit walks into the player base.
    while sim.round() < 1 {
        run_until_phase_change(&mut sim, 60_000);
    }
    assert_eq!(sim.side(Side::Player).lives_lost, 1);

    let id = sim
        .place_unit(Side::Player, UnitKey::new(Archetype::Melee, 1), pos(100, 100))
        .expect("placement");
    // Default comeback: +2 % hp per life lost.
    assert_eq!(sim.world().unit(id).map(|u| u.stats.max_hp), Some(102));
}

#[test]
fn test_upgrade_rescales_existing_templates() {
    let mut config = human_vs_human().with_mode(GameMode::leveled());
    config.starting_gold = 500;
    let mut sim = match_with(config, &[(Side::Player, Archetype::Melee, 100, 100)]);
    while sim.round() < 1 {
        run_until_phase_change(&mut sim, 60_000);
    }
    let template = sim
        .world()
        .templates(Side::Player)
        .next()
        .map(|u| u.id)
        .expect("template survives the round");

    sim.upgrade_archetype(Side::Player, Archetype::Melee)
        .expect("upgrade");
    assert_eq!(sim.world().unit(template).map(|u| u.stats.max_hp), Some(105));
    assert_eq!(sim.world().unit(template).map(|u| u.hp), Some(105));
}
