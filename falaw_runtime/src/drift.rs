//! Drift detection: determinism verification and report comparison.

use std::collections::BTreeSet;

use falaw_kernel::config::KernelConfig;

use crate::error::{RuntimeError, RuntimeResult};
use crate::replay;
use crate::scenario::Scenario;
use crate::simulation::SimulationReport;

/// Run the same scenario twice and require identical fingerprints.
/// Returns the fingerprint.
pub fn verify_determinism(config: &KernelConfig, scenario: &Scenario) -> RuntimeResult<String> {
    let first = replay::run_hash(config, scenario)?;
    let second = replay::run_hash(config, scenario)?;
    if first != second {
        return Err(RuntimeError::Determinism { first, second });
    }
    Ok(first)
}

/// Structured comparison of two reports: deltas are `b − a`.
pub fn compare_reports(a: &SimulationReport, b: &SimulationReport) -> DriftReport {
    let survivors_a: BTreeSet<&str> = a.survivors.iter().map(|s| s.as_str()).collect();
    let survivors_b: BTreeSet<&str> = b.survivors.iter().map(|s| s.as_str()).collect();

    let gained: Vec<String> = survivors_b
        .difference(&survivors_a)
        .map(|s| s.to_string())
        .collect();
    let lost: Vec<String> = survivors_a
        .difference(&survivors_b)
        .map(|s| s.to_string())
        .collect();

    DriftReport {
        steps_delta: b.steps_run as i64 - a.steps_run as i64,
        alive_a: a.entities_alive,
        alive_b: b.entities_alive,
        alive_delta: b.entities_alive as i64 - a.entities_alive as i64,
        regime_events_delta: b.regime_events as i64 - a.regime_events as i64,
        eliminations_delta: b.eliminations as i64 - a.eliminations as i64,
        total_primal_delta: b.total_primal - a.total_primal,
        tension_delta: b.final_tension.aggregate.value - a.final_tension.aggregate.value,
        cohesion_delta: b.final_field.cohesion - a.final_field.cohesion,
        fragmentation_delta: b.final_field.fragmentation - a.final_field.fragmentation,
        same_termination: a.termination == b.termination,
        same_kernel_fingerprint: a.kernel_fingerprint == b.kernel_fingerprint,
        survivors_gained: gained,
        survivors_lost: lost,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriftReport {
    pub steps_delta: i64,
    pub alive_a: usize,
    pub alive_b: usize,
    pub alive_delta: i64,
    pub regime_events_delta: i64,
    pub eliminations_delta: i64,
    pub total_primal_delta: f64,
    pub tension_delta: f64,
    pub cohesion_delta: f64,
    pub fragmentation_delta: f64,
    pub same_termination: bool,
    pub same_kernel_fingerprint: bool,
    /// Alive in `b` only.
    pub survivors_gained: Vec<String>,
    /// Alive in `a` only.
    pub survivors_lost: Vec<String>,
}

impl DriftReport {
    /// True when nothing differs.
    pub fn is_zero(&self) -> bool {
        self.steps_delta == 0
            && self.alive_delta == 0
            && self.regime_events_delta == 0
            && self.eliminations_delta == 0
            && self.total_primal_delta == 0.0
            && self.tension_delta == 0.0
            && self.cohesion_delta == 0.0
            && self.fragmentation_delta == 0.0
            && self.same_termination
            && self.same_kernel_fingerprint
            && self.survivors_gained.is_empty()
            && self.survivors_lost.is_empty()
    }
}
