//! Convergence monitoring.
//!
//! Pure functions of the current and previous iterates: they compute the
//! residual norms defined per algorithm and compare them against the
//! configured tolerances. Nothing here mutates solver state, so the same
//! inputs always produce the same termination decision.

use dst_core::Trajectory;
use serde::Serialize;

/// Primal/dual residual pair for one iteration.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Residuals {
    /// Disagreement between local trajectories and the consensus aggregate.
    pub primal: f64,
    /// Change rate of the signal vector between iterations.
    pub dual: f64,
}

impl Residuals {
    pub fn within(&self, tolerances: &Tolerances) -> bool {
        self.primal < tolerances.eps_primal && self.dual < tolerances.eps_dual
    }
}

/// Residual tolerances from the run configuration.
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    pub eps_primal: f64,
    pub eps_dual: f64,
}

/// Residuals of the exchange (consensus) form.
///
/// Primal: `sqrt(N) * ||x_bar||`, where `x_bar` is the mean exchanged
/// trajectory (the coupling demands `sum_i x_i = 0`, so the mean is the
/// per-entity share of the imbalance). Dual: `rho * sqrt(N) *
/// ||x_bar - x_bar_prev||`, the scaled change of the consensus point.
pub fn exchange_residuals(
    n_entities: usize,
    rho: f64,
    x_bar: &Trajectory,
    x_bar_prev: &Trajectory,
) -> Residuals {
    let root_n = (n_entities as f64).sqrt();
    Residuals {
        primal: root_n * x_bar.l2_norm(),
        dual: rho * root_n * x_bar.sub(x_bar_prev).l2_norm(),
    }
}

/// Residual of classic dual decomposition: the Euclidean norm of the
/// aggregate exchange imbalance. No dual residual is tracked; primal
/// feasibility is the only stopping signal.
pub fn imbalance_residual(aggregate: &Trajectory) -> Residuals {
    Residuals {
        primal: aggregate.l2_norm(),
        dual: 0.0,
    }
}
