//! Error types for the algorithm coordinator.

use dst_core::SolveFailure;
use thiserror::Error;

/// Failure modes of a scheduling run.
///
/// Iteration-budget exhaustion is deliberately not represented here: it is a
/// normal termination mode reported through `SolveStatus::IterationLimitReached`
/// together with the best iterate found. Local solve failures are not retried;
/// repeating an identical subproblem would reproduce the same outcome.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// A single entity's subproblem has no feasible point given the current
    /// signals; the joint problem cannot be evaluated this iteration.
    #[error("local subproblem infeasible for entity '{entity}'")]
    LocalSolveInfeasible { entity: String },

    /// An unbounded local subproblem. Indicates a modeling/configuration
    /// defect, not recoverable by retry.
    #[error("local subproblem unbounded for entity '{entity}'")]
    LocalSolveUnbounded { entity: String },

    /// The local solver backend reported a numerical failure.
    #[error("local solve failed for entity '{entity}': {message}")]
    LocalSolveFailed { entity: String, message: String },

    /// A worker returned a trajectory of the wrong length. Fatal: every
    /// algorithm's reduction requires a complete, well-formed gather.
    #[error("entity '{entity}' returned a trajectory of length {actual}, expected {expected}")]
    CommunicationMismatch {
        entity: String,
        expected: usize,
        actual: usize,
    },

    /// Invalid run configuration.
    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),
}

impl ScheduleError {
    /// Attaches the failing entity's name to a local solve failure.
    pub fn from_failure(entity: &str, failure: SolveFailure) -> Self {
        match failure {
            SolveFailure::Infeasible => ScheduleError::LocalSolveInfeasible {
                entity: entity.to_string(),
            },
            SolveFailure::Unbounded => ScheduleError::LocalSolveUnbounded {
                entity: entity.to_string(),
            },
            SolveFailure::Numerical(message) => ScheduleError::LocalSolveFailed {
                entity: entity.to_string(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_mapping() {
        let err = ScheduleError::from_failure("building_1", SolveFailure::Infeasible);
        assert!(matches!(
            err,
            ScheduleError::LocalSolveInfeasible { ref entity } if entity == "building_1"
        ));

        let err = ScheduleError::from_failure("op", SolveFailure::Numerical("bad pivot".into()));
        assert!(err.to_string().contains("bad pivot"));
    }
}
