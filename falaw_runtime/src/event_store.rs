//! Append-only step log, in memory.
//!
//! Rules:
//!   - Strict append only: no mutation, no deletion, no reordering
//!   - Sequence strictly increasing from 1 (validated on append)
//!   - Events with schema_version != STEP_SCHEMA_VERSION are rejected

use falaw_kernel::intensity::ElementIntensityMap;
use falaw_kernel::regime::{FieldState, RecoveryStrategy};
use falaw_kernel::target::EliminationJustification;
use falaw_kernel::tension::TensionLevel;
use serde::{Deserialize, Serialize};

use crate::entity::ExtinctionRecord;
use crate::error::{RuntimeError, RuntimeResult};

pub const STEP_SCHEMA_VERSION: u32 = 1;

/// One elimination attempt that was judged justified and carried out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Elimination {
    pub eliminator: String,
    pub eliminated: String,
    pub reason: String,
    pub justification: EliminationJustification,
}

/// Everything observed and done during one simulation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    pub schema_version: u32,
    pub sequence: u64,
    pub alive: usize,
    pub total: usize,
    pub field: FieldState,
    pub excitation: f64,
    pub intensities: ElementIntensityMap,
    pub tension_aggregate: f64,
    pub tension_level: TensionLevel,
    /// Sequence of the regime event fired this step, if any.
    pub regime_sequence: Option<u64>,
    pub strategy: Option<RecoveryStrategy>,
    pub eliminations: Vec<Elimination>,
    pub extinctions: Vec<ExtinctionRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepLog {
    events: Vec<StepEvent>,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single event. Validates schema and strict sequence
    /// ordering; a rejected event leaves the log untouched.
    pub fn append(&mut self, event: StepEvent) -> RuntimeResult<()> {
        if event.schema_version != STEP_SCHEMA_VERSION {
            return Err(RuntimeError::UnsupportedSchema(event.schema_version));
        }
        let expected = self.last_sequence() + 1;
        if event.sequence != expected {
            return Err(RuntimeError::Sequence {
                expected,
                got: event.sequence,
            });
        }
        self.events.push(event);
        Ok(())
    }

    pub fn events(&self) -> &[StepEvent] {
        &self.events
    }

    pub fn last_sequence(&self) -> u64 {
        self.events.last().map(|e| e.sequence).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Regime events fired within the last `window` steps.
    pub fn recent_regime_events(&self, window: usize) -> usize {
        self.events
            .iter()
            .rev()
            .take(window)
            .filter(|e| e.regime_sequence.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(sequence: u64, fired: bool) -> StepEvent {
        StepEvent {
            schema_version: STEP_SCHEMA_VERSION,
            sequence,
            alive: 1,
            total: 1,
            field: FieldState::new(0.5, 0.2, 0.5, 0.4).unwrap(),
            excitation: 0.8,
            intensities: ElementIntensityMap::uniform(0.5).unwrap(),
            tension_aggregate: 0.1,
            tension_level: TensionLevel::VeryLow,
            regime_sequence: if fired { Some(sequence) } else { None },
            strategy: None,
            eliminations: vec![],
            extinctions: vec![],
        }
    }

    #[test]
    fn test_append_in_order() {
        let mut log = StepLog::new();
        log.append(event(1, false)).unwrap();
        log.append(event(2, true)).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.last_sequence(), 2);
    }

    #[test]
    fn test_sequence_gap_rejected() {
        let mut log = StepLog::new();
        log.append(event(1, false)).unwrap();
        match log.append(event(3, false)) {
            Err(RuntimeError::Sequence { expected, got }) => {
                assert_eq!((expected, got), (2, 3));
            }
            other => panic!("expected sequence error, got {:?}", other),
        }
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_schema_version_rejected() {
        let mut log = StepLog::new();
        let mut e = event(1, false);
        e.schema_version = 2;
        assert!(matches!(log.append(e), Err(RuntimeError::UnsupportedSchema(2))));
        assert!(log.is_empty());
    }

    #[test]
    fn test_recent_regime_events_window() {
        let mut log = StepLog::new();
        for (i, fired) in [true, true, false, true, false, false].iter().enumerate() {
            log.append(event(i as u64 + 1, *fired)).unwrap();
        }
        assert_eq!(log.recent_regime_events(3), 1);
        assert_eq!(log.recent_regime_events(6), 3);
    }
}
