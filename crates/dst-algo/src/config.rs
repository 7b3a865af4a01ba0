//! Run configuration for the algorithm coordinator.

use crate::error::ScheduleError;
use dst_core::{IntegerMode, XUpdateMode};
use serde::{Deserialize, Serialize};

/// The four interchangeable update rules sharing one iteration skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// One joint problem over all entities, solved in a single call.
    /// The reference baseline and convergence oracle for the distributed
    /// variants; integer decisions are relaxed.
    Central,
    /// Sub-gradient ascent on the coupling multiplier. Tracks only the
    /// primal residual.
    DualDecomposition,
    /// Consensus-form exchange ADMM with a quadratic pull toward the
    /// blended average target.
    #[default]
    ExchangeAdmm,
    /// Exchange ADMM with mixed-integer local subproblems, incumbent
    /// tracking, and an optional trust-region x-update.
    ExchangeMiqpAdmm,
}

/// Parameters of one scheduling run. Immutable after solve start; every
/// solve call owns an independent copy of the derived signal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Algorithm to run.
    pub algorithm: Algorithm,

    /// Penalty/step parameter (rho). For dual decomposition this is the
    /// fixed sub-gradient step size; for the ADMM variants the quadratic
    /// penalty weight. Must be > 0.
    pub rho: f64,

    /// Primal feasibility tolerance (exchange imbalance).
    pub eps_primal: f64,

    /// Dual feasibility tolerance (signal change rate). Unused by dual
    /// decomposition, which stops on primal feasibility alone.
    pub eps_dual: f64,

    /// Iteration budget. Reaching it is a normal termination mode.
    pub max_iterations: usize,

    /// MIQP variant: whether integer decisions stay exact in local solves.
    pub integer_mode: IntegerMode,

    /// MIQP variant: whether the integer update region is restricted to a
    /// trust region around the previous iterate.
    pub x_update_mode: XUpdateMode,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            rho: 2.0,
            eps_primal: 0.01,
            eps_dual: 0.1,
            max_iterations: 200,
            integer_mode: IntegerMode::Integer,
            x_update_mode: XUpdateMode::Constrained,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if !self.rho.is_finite() || self.rho <= 0.0 {
            return Err(ScheduleError::InvalidConfig(format!(
                "rho must be a positive finite number, got {}",
                self.rho
            )));
        }
        if !self.eps_primal.is_finite() || self.eps_primal < 0.0 {
            return Err(ScheduleError::InvalidConfig(format!(
                "eps_primal must be >= 0, got {}",
                self.eps_primal
            )));
        }
        if !self.eps_dual.is_finite() || self.eps_dual < 0.0 {
            return Err(ScheduleError::InvalidConfig(format!(
                "eps_dual must be >= 0, got {}",
                self.eps_dual
            )));
        }
        if self.max_iterations == 0 {
            return Err(ScheduleError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
