//! Unified error types for the dst ecosystem
//!
//! This module provides a common error type [`DstError`] that can represent
//! errors from any part of the system. Domain-specific error types (for
//! example the algorithm coordinator's `ScheduleError`) can be converted to
//! `DstError` for uniform handling at API boundaries.

use thiserror::Error;

/// Unified error type for all dst operations.
#[derive(Error, Debug)]
pub enum DstError {
    /// Data validation errors (horizon mismatches, bad profiles, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Solver/algorithm errors
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using DstError.
pub type DstResult<T> = Result<T, DstError>;

impl From<String> for DstError {
    fn from(s: String) -> Self {
        DstError::Other(s)
    }
}

impl From<&str> for DstError {
    fn from(s: &str) -> Self {
        DstError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DstError::Solver("local subproblem diverged".into());
        assert!(err.to_string().contains("Solver error"));
        assert!(err.to_string().contains("local subproblem diverged"));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> DstResult<()> {
            Err(DstError::Validation("test".into()))
        }

        fn outer() -> DstResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
