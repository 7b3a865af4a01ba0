//! Result types of a completed scheduling run.

use dst_core::Trajectory;
use serde::Serialize;

/// How the run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Residuals dropped below their tolerances.
    Converged,
    /// The iteration budget ran out; the reported schedule is the best
    /// iterate found (incumbent for the MIQP variant, last iterate
    /// otherwise).
    IterationLimitReached,
}

/// The schedule produced by one run, together with run diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct DistrictSchedule {
    pub status: SolveStatus,
    /// Number of broadcast/gather iterations performed (1 for central).
    pub iterations: usize,
    /// Final primal residual.
    pub primal_residual: f64,
    /// Final dual residual (0 for algorithms that do not track one).
    pub dual_residual: f64,
    /// Sum of all entities' local objective values, penalty-free.
    pub objective: f64,
    /// Wall-clock solve time in milliseconds.
    pub solve_time_ms: u64,
    /// Per-building net power trajectories, in tree order.
    pub building_power: Vec<Trajectory>,
    /// Elementwise sum of the building trajectories: the district load
    /// profile the operator must supply.
    pub district_power: Trajectory,
}

impl DistrictSchedule {
    pub fn converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }
}
