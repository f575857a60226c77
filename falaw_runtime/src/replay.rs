//! Replay orchestrator: run a scenario from scratch, or rebuild a step
//! log from recorded events.
//!
//! All domain logic is delegated to the kernel and the simulation.
//! No shortcuts, no cached state.

use falaw_kernel::config::KernelConfig;
use falaw_kernel::hashing::{canonical_value, sha256_hex, to_bytes};
use serde_json::Value;

use crate::error::RuntimeResult;
use crate::event_store::{StepEvent, StepLog};
use crate::scenario::Scenario;
use crate::simulation::{Simulation, SimulationReport};

/// Run `scenario` under `config` in a fresh simulation.
///
/// Returns (report, fingerprint). A pure function of its inputs.
pub fn run_scenario(
    config: &KernelConfig,
    scenario: &Scenario,
) -> RuntimeResult<(SimulationReport, String)> {
    let mut sim = Simulation::new(config.clone(), scenario.clone())?;
    let report = sim.run(None)?;
    let hash = sim.fingerprint();
    Ok((report, hash))
}

/// Run and return only the fingerprint.
pub fn run_hash(config: &KernelConfig, scenario: &Scenario) -> RuntimeResult<String> {
    let (_, hash) = run_scenario(config, scenario)?;
    Ok(hash)
}

/// Re-append recorded events into a fresh log (sequence and schema are
/// checked again) and hash the result.
pub fn rebuild_log(events: &[StepEvent]) -> RuntimeResult<(StepLog, String)> {
    let mut log = StepLog::new();
    for event in events {
        log.append(event.clone())?;
    }
    let hash = step_log_hash(&log);
    Ok((log, hash))
}

/// SHA-256 over the canonical step events.
pub fn step_log_hash(log: &StepLog) -> String {
    let steps = Value::Array(log.events().iter().map(canonical_value).collect());
    sha256_hex(&to_bytes(&steps))
}
