//! Runtime error taxonomy. Kernel failures pass through unchanged.

use falaw_kernel::error::KernelError;
use thiserror::Error;

use crate::entity::LifeState;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("unsupported step schema_version {0}")]
    UnsupportedSchema(u32),

    #[error("Sequence violation in step log: expected {expected}, got {got}")]
    Sequence { expected: u64, got: u64 },

    #[error("invalid life transition for {entity}: {from} -> {to}")]
    LifeTransition {
        entity: String,
        from: LifeState,
        to: LifeState,
    },

    #[error("DETERMINISM FAILURE: two runs produced different hashes (run 1: {first}, run 2: {second})")]
    Determinism { first: String, second: String },
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
