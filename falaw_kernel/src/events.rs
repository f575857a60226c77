//! FaLaw Kernel: Regime Events
//!
//! Events are pure data. A `RegimeEvent` records one regime transition:
//! what breached, how the crisis was read, which strategy ran and what it
//! produced. The log only grows; there is no removal or mutation API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::arithmetic::mean;
use crate::regime::{
    CrisisAssessment, CrisisType, IgnoredAspect, RecoveryStrategy, StrategyOutcome,
    ThresholdBreach,
};

/// Schema version for regime events. Part of the fingerprint.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeEvent {
    pub schema_version: u32,
    /// 1-based position in the log.
    pub sequence: u64,
    /// Monitor evaluation count at the time of the trigger.
    pub evaluation: u64,
    pub breaches: Vec<ThresholdBreach>,
    pub conditions_met: usize,
    pub min_conditions: usize,
    pub assessment: CrisisAssessment,
    pub tension_aggregate: f64,
    pub readiness: f64,
    pub strategy: RecoveryStrategy,
    pub ignored_aspects: Vec<IgnoredAspect>,
    pub outcome: StrategyOutcome,
}

/// Summary of the most recent events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeActivity {
    pub events: usize,
    pub crisis_types: BTreeMap<CrisisType, usize>,
    pub strategies: BTreeMap<RecoveryStrategy, usize>,
    pub average_urgency: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeLog {
    events: Vec<RegimeEvent>,
}

impl RegimeLog {
    /// Panics if `event.sequence` does not continue the log.
    pub(crate) fn append(&mut self, event: RegimeEvent) {
        let expected = self.events.len() as u64 + 1;
        if event.sequence != expected {
            panic!(
                "Sequence violation: expected {}, got {}",
                expected, event.sequence
            );
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[RegimeEvent] {
        &self.events
    }

    pub fn latest(&self) -> Option<&RegimeEvent> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events raised within the last `window` evaluations, counting
    /// `current_evaluation` itself.
    pub fn recent(&self, current_evaluation: u64, window: u64) -> Vec<&RegimeEvent> {
        let since = current_evaluation.saturating_sub(window);
        self.events
            .iter()
            .filter(|e| e.evaluation > since && e.evaluation <= current_evaluation)
            .collect()
    }

    /// Breakdown of the last `window` events.
    pub fn activity(&self, window: usize) -> RegimeActivity {
        let start = self.events.len().saturating_sub(window);
        let slice = &self.events[start..];

        let mut activity = RegimeActivity {
            events: slice.len(),
            ..RegimeActivity::default()
        };
        for e in slice {
            *activity
                .crisis_types
                .entry(e.assessment.crisis_type)
                .or_insert(0) += 1;
            *activity.strategies.entry(e.strategy).or_insert(0) += 1;
        }
        let urgencies: Vec<f64> = slice.iter().map(|e| e.assessment.urgency).collect();
        activity.average_urgency = mean(&urgencies);
        activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegimeConfig;
    use crate::regime::{FieldObservation, FieldState, RegimeMonitor};
    use crate::tension::TransitionReadiness;

    fn crisis() -> FieldObservation {
        FieldObservation {
            field: FieldState::new(0.1, 0.9, 0.1, 0.1).unwrap(),
            excitation: 0.2,
            has_active_targets: false,
        }
    }

    fn calm() -> FieldObservation {
        FieldObservation {
            field: FieldState::new(0.9, 0.05, 0.9, 0.9).unwrap(),
            excitation: 1.0,
            has_active_targets: true,
        }
    }

    fn tension() -> TransitionReadiness {
        TransitionReadiness {
            aggregate: 0.8,
            readiness: 0.88,
            components_above_high: 2,
        }
    }

    #[test]
    fn test_log_grows_with_triggers_only() {
        let mut m = RegimeMonitor::new(&RegimeConfig::default());
        let mut fired = 0;
        for obs in [crisis(), calm(), crisis(), calm(), calm(), crisis()] {
            if m.evaluate(&obs, &tension()).unwrap().is_some() {
                fired += 1;
            }
        }
        assert_eq!(fired, 3);
        assert_eq!(m.log().len(), 3);
        let seqs: Vec<u64> = m.log().events().iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(m.log().latest().unwrap().evaluation, 6);
    }

    #[test]
    fn test_recent_window() {
        let mut m = RegimeMonitor::new(&RegimeConfig::default());
        for obs in [crisis(), calm(), calm(), crisis(), crisis()] {
            m.evaluate(&obs, &tension()).unwrap();
        }
        assert_eq!(m.log().recent(5, 5).len(), 3);
        assert_eq!(m.log().recent(5, 2).len(), 2);
        assert_eq!(m.log().recent(5, 0).len(), 0);
    }

    #[test]
    fn test_activity_summary() {
        let mut m = RegimeMonitor::new(&RegimeConfig::default());
        for _ in 0..4 {
            m.evaluate(&crisis(), &tension()).unwrap();
        }
        let a = m.log().activity(3);
        assert_eq!(a.events, 3);
        assert_eq!(a.crisis_types.get(&CrisisType::Primal), Some(&3));
        assert_eq!(a.strategies.get(&RecoveryStrategy::CompleteRestart), Some(&3));
        assert_eq!(a.average_urgency, 1.0);
        assert_eq!(RegimeLog::default().activity(5).events, 0);
    }

    #[test]
    fn test_event_records_tension() {
        let mut m = RegimeMonitor::new(&RegimeConfig::default());
        let e = m.evaluate(&crisis(), &tension()).unwrap().unwrap();
        assert_eq!(e.tension_aggregate, 0.8);
        assert_eq!(e.readiness, 0.88);
        assert_eq!(e.schema_version, SCHEMA_VERSION);
        assert_eq!(m.log().events()[0], e);
    }
}
