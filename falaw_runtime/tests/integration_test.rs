//! Integration tests for falaw_runtime.
//!
//! Scenarios come from the built-ins or from tests/fixtures.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use falaw_kernel::config::KernelConfig;
use falaw_kernel::element::Element;
use falaw_kernel::regime::RecoveryStrategy;

use falaw_runtime::drift::{compare_reports, verify_determinism};
use falaw_runtime::entity::{Entity, ExtinctionCause, LifeState, Target};
use falaw_runtime::error::RuntimeError;
use falaw_runtime::replay::{rebuild_log, run_hash, run_scenario, step_log_hash};
use falaw_runtime::scenario::{Scenario, BUILTIN_NAMES};
use falaw_runtime::simulation::{SharedSimulation, Simulation, TerminationReason};

fn fixture(name: &str) -> Scenario {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    Scenario::load(path.to_str().expect("fixture path is UTF-8"))
        .expect("Failed to load fixture scenario")
}

fn alternative_config() -> KernelConfig {
    let mut config = KernelConfig::default();
    config.matrix.self_retention.insert(Element::San, 0.8);
    config
        .matrix
        .outflows
        .entry(Element::San)
        .or_default()
        .insert(Element::Huan, 0.2);
    config
}

// ─────────────────────────────────────────────────────────────
// Built-in scenarios
// ─────────────────────────────────────────────────────────────

#[test]
fn builtin_scenarios_run_within_limits() {
    let config = KernelConfig::default();
    for name in BUILTIN_NAMES {
        let scenario = Scenario::load(name).unwrap();
        let mut sim = Simulation::new(config.clone(), scenario.clone()).unwrap();
        let report = sim.run(None).unwrap();

        assert!(report.steps_run >= 1 && report.steps_run <= scenario.steps, "{}", name);
        assert!(report.entities_alive <= report.entities_total);
        assert_eq!(report.survivors.len(), report.entities_alive);
        if report.termination == TerminationReason::StepLimit {
            assert_eq!(report.steps_run, scenario.steps);
        }

        let fired = sim
            .step_log()
            .events()
            .iter()
            .filter(|e| e.regime_sequence.is_some())
            .count();
        assert_eq!(report.regime_events, fired);
        assert_eq!(sim.engine().monitor().log().len(), fired);
        assert_eq!(sim.engine().monitor().evaluations(), report.steps_run);
    }
}

#[test]
fn step_sequences_are_contiguous() {
    let mut sim = Simulation::new(KernelConfig::default(), Scenario::load("complex_interaction").unwrap())
        .unwrap();
    sim.run(Some(12)).unwrap();
    for (i, event) in sim.step_log().events().iter().enumerate() {
        assert_eq!(event.sequence, i as u64 + 1);
        assert_eq!(event.total, sim.entities().len());
    }
}

// ─────────────────────────────────────────────────────────────
// Fixture scenarios
// ─────────────────────────────────────────────────────────────

#[test]
fn depleted_individuals_go_extinct() {
    let scenario = fixture("depletion.json");
    let (report, _) = run_scenario(&KernelConfig::default(), &scenario).unwrap();

    assert_eq!(report.termination, TerminationReason::AllExtinct);
    assert_eq!(report.steps_run, 1);
    assert_eq!(report.entities_alive, 0);
    assert_eq!(report.extinctions, 2);
    assert_eq!(report.avg_primal, 0.0);
    assert!(report.survivors.is_empty());
}

#[test]
fn extinct_entities_stay_extinct() {
    let mut sim = Simulation::new(KernelConfig::default(), fixture("depletion.json")).unwrap();
    let first = sim.step().unwrap();
    assert!(first
        .extinctions
        .iter()
        .all(|r| r.cause == ExtinctionCause::PrimalDepletion && r.step == 1));

    let second = sim.step().unwrap();
    assert!(second.extinctions.is_empty());
    assert!(sim
        .entities()
        .iter()
        .all(|e| e.life_state() == LifeState::Extinct));
}

#[test]
fn collapsed_field_realigns_every_step() {
    let mut sim = Simulation::new(KernelConfig::default(), fixture("collapsed_field.json")).unwrap();

    let event = sim.step().unwrap();
    assert_eq!(event.regime_sequence, Some(1));
    assert!(event.field.cohesion < 0.3);

    let regime = sim.engine().monitor().log().latest().unwrap().clone();
    let expected: Vec<Target> = regime.outcome.targets.iter().map(Target::from).collect();
    for entity in sim.entities() {
        assert_eq!(entity.life_state(), LifeState::Transitioning);
        assert_eq!(entity.targets(), expected.as_slice());
    }

    let report = sim.run(None).unwrap();
    assert_eq!(report.termination, TerminationReason::RegimeSettled);
    assert_eq!(report.steps_run, 3);
    assert_eq!(report.regime_events, 3);
    assert_eq!(report.entities_alive, 3);
}

#[test]
fn complete_restart_clears_targets() {
    let mut sim = Simulation::new(KernelConfig::default(), fixture("collapsed_field.json")).unwrap();
    sim.run(None).unwrap();
    for regime in sim.engine().monitor().log().events() {
        if regime.strategy == RecoveryStrategy::CompleteRestart {
            assert!(regime.outcome.targets.is_empty());
        }
    }
}

#[test]
fn scarcity_drives_eliminations() {
    let mut sim = Simulation::new(KernelConfig::default(), fixture("scarcity.json")).unwrap();

    let first = sim.step().unwrap();
    assert_eq!(first.eliminations.len(), 1);
    let elimination = &first.eliminations[0];
    assert_eq!(elimination.eliminator, "individual_1");
    assert_eq!(elimination.eliminated, "individual_2");
    assert!(elimination.justification.justified);
    assert_eq!(first.extinctions[0].cause, ExtinctionCause::Eliminated);
    assert_eq!(first.extinctions[0].related, vec!["individual_1".to_string()]);

    let second = sim.step().unwrap();
    assert_eq!(second.eliminations.len(), 1);
    assert_eq!(second.eliminations[0].eliminated, "individual_3");

    let third = sim.step().unwrap();
    assert!(third.eliminations.is_empty());
    assert_eq!(sim.alive_count(), 1);

    match &sim.entities()[0] {
        Entity::Individual(i) => assert!(i.is_alive()),
        other => panic!("expected individual, got {:?}", other),
    }
}

// ─────────────────────────────────────────────────────────────
// Replay and drift
// ─────────────────────────────────────────────────────────────

#[test]
fn replay_is_deterministic() {
    let config = KernelConfig::default();
    for name in ["survival_competition", "realignment_preparation"] {
        let scenario = Scenario::load(name).unwrap();
        let hash = verify_determinism(&config, &scenario).unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, run_hash(&config, &scenario).unwrap());
    }
}

#[test]
fn identical_runs_have_no_drift() {
    let config = KernelConfig::default();
    let scenario = Scenario::load("survival_competition").unwrap();
    let (a, _) = run_scenario(&config, &scenario).unwrap();
    let (b, _) = run_scenario(&config, &scenario).unwrap();
    assert!(compare_reports(&a, &b).is_zero());
}

#[test]
fn alternative_constants_drift() {
    let scenario = Scenario::load("default").unwrap();
    let (a, hash_a) = run_scenario(&KernelConfig::default(), &scenario).unwrap();
    let (b, hash_b) = run_scenario(&alternative_config(), &scenario).unwrap();

    let drift = compare_reports(&a, &b);
    assert!(!drift.same_kernel_fingerprint);
    assert!(!drift.is_zero());
    assert_ne!(hash_a, hash_b);
}

#[test]
fn rebuilt_log_matches_recorded() {
    let mut sim = Simulation::new(KernelConfig::default(), Scenario::load("default").unwrap()).unwrap();
    sim.run(Some(6)).unwrap();
    let events = sim.step_log().events().to_vec();

    let (log, hash) = rebuild_log(&events).unwrap();
    assert_eq!(log, *sim.step_log());
    assert_eq!(hash, step_log_hash(sim.step_log()));

    let mut tampered = events.clone();
    tampered.remove(2);
    match rebuild_log(&tampered) {
        Err(RuntimeError::Sequence { expected, got }) => assert_eq!((expected, got), (3, 4)),
        other => panic!("expected sequence violation, got {:?}", other.map(|(_, h)| h)),
    }
}

// ─────────────────────────────────────────────────────────────
// Shared access
// ─────────────────────────────────────────────────────────────

#[test]
fn shared_simulation_serializes_steps() {
    let sim = Simulation::new(KernelConfig::default(), Scenario::load("default").unwrap()).unwrap();
    let shared = Arc::new(SharedSimulation::new(sim));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for _ in 0..2 {
                    shared.step().unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(shared.steps_run(), 8);
    let sim = Arc::try_unwrap(shared).ok().unwrap().into_inner();
    let sequences: Vec<u64> = sim.step_log().events().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, (1..=8).collect::<Vec<_>>());
}

#[test]
fn unknown_scenario_is_reported() {
    assert!(matches!(
        Scenario::load("tests/fixtures/missing.json"),
        Err(RuntimeError::UnknownScenario(_))
    ));
}
