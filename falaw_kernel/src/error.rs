//! FaLaw Kernel: Error taxonomy
//!
//! Three classes, none retried: a deterministic call that fails once
//! fails every time.

use thiserror::Error;

/// All kernel failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    /// Malformed or incomplete constant tables. Raised once, at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Caller-supplied value outside its domain. No partial computation is
    /// performed.
    #[error("input domain error: {0}")]
    InputDomain(String),

    /// Row-sum or diagonal invariant broken. Fatal.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Reject anything that is not a finite value in `[0, 1]`.
pub(crate) fn ensure_unit(name: &str, value: f64) -> KernelResult<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(KernelError::InputDomain(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = KernelError::Configuration("self_retention missing kun".into());
        assert_eq!(
            err.to_string(),
            "configuration error: self_retention missing kun"
        );

        let err = KernelError::InputDomain("pressure".into());
        assert_eq!(err.to_string(), "input domain error: pressure");

        let err = KernelError::InvariantViolation("row 3".into());
        assert_eq!(err.to_string(), "invariant violation: row 3");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KernelError>();
    }

    #[test]
    fn test_ensure_unit() {
        assert_eq!(ensure_unit("x", 0.0), Ok(0.0));
        assert_eq!(ensure_unit("x", 1.0), Ok(1.0));
        assert!(ensure_unit("x", -0.01).is_err());
        assert!(ensure_unit("x", 1.01).is_err());
        assert!(ensure_unit("x", f64::NAN).is_err());
    }
}
