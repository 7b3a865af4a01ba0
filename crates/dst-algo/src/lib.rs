//! # dst-algo: District Scheduling Algorithms
//!
//! Coordinates the power schedules of a two-level entity tree (one district
//! operator, N buildings) so that supplied and consumed power balance at
//! every timestep. Four interchangeable update rules share one iteration
//! skeleton:
//!
//! - **Central**: one joint quadratic problem over all entities, solved in a
//!   single call. Integer decisions are relaxed. The convergence oracle for
//!   the distributed variants.
//! - **Dual decomposition**: sub-gradient ascent on the coupling multiplier.
//! - **Exchange ADMM**: consensus-form ADMM with a proximal pull toward the
//!   blended average target.
//! - **Exchange MIQP-ADMM**: the ADMM skeleton over mixed-integer local
//!   subproblems with incumbent tracking and an optional trust-region
//!   x-update.
//!
//! The distributed variants talk to entities through a broadcast/gather
//! round trip ([`exchange`]) executed in parallel on rayon ([`dispatch`]).
//! Determinism is part of the contract: per-worker chunks are contiguous and
//! flattened in rank order, so two runs over the same tree and configuration
//! produce bit-identical schedules.
//!
//! ## Example
//!
//! ```no_run
//! use dst_algo::{Algorithm, RunConfig, ScheduleOptimizer};
//! use dst_scenarios::factory;
//!
//! let district = factory::two_building_district(24).unwrap();
//! let schedule = ScheduleOptimizer::new(RunConfig {
//!     algorithm: Algorithm::ExchangeAdmm,
//!     ..Default::default()
//! })
//! .solve(&district)?;
//!
//! println!(
//!     "{:?} after {} iterations, objective {:.3}",
//!     schedule.status, schedule.iterations, schedule.objective
//! );
//! # Ok::<(), dst_algo::ScheduleError>(())
//! ```

use dst_core::{EntityTree, OptimizationEntity, Trajectory};
use std::time::Instant;

mod central;
pub mod config;
pub mod convergence;
pub mod dispatch;
mod driver;
mod dual_decomposition;
pub mod error;
pub mod exchange;
mod exchange_admm;
mod exchange_miqp_admm;
pub mod solution;

pub use config::{Algorithm, RunConfig};
pub use convergence::Residuals;
pub use error::ScheduleError;
pub use solution::{DistrictSchedule, SolveStatus};

/// Entry point: runs one scheduling algorithm over an entity tree.
///
/// The configuration is immutable once the optimizer is built; every call to
/// [`solve`](Self::solve) derives a fresh copy of the algorithm's signal
/// state, so repeated solves over the same tree are independent and
/// identical.
#[derive(Debug, Clone)]
pub struct ScheduleOptimizer {
    config: RunConfig,
}

impl ScheduleOptimizer {
    pub fn new(config: RunConfig) -> Self {
        ScheduleOptimizer { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    pub fn with_rho(mut self, rho: f64) -> Self {
        self.config.rho = rho;
        self
    }

    pub fn with_tolerances(mut self, eps_primal: f64, eps_dual: f64) -> Self {
        self.config.eps_primal = eps_primal;
        self.config.eps_dual = eps_dual;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Runs the configured algorithm to completion and returns the district
    /// schedule together with run diagnostics.
    pub fn solve(&self, tree: &dyn EntityTree) -> Result<DistrictSchedule, ScheduleError> {
        self.config.validate()?;

        let horizon = tree.horizon();
        let mut entities: Vec<&dyn OptimizationEntity> = Vec::new();
        entities.push(tree.operator());
        entities.extend(tree.buildings());

        tracing::info!(
            algorithm = ?self.config.algorithm,
            entities = entities.len(),
            horizon,
            "starting scheduling run"
        );

        let started = Instant::now();
        let outcome = match self.config.algorithm {
            Algorithm::Central => central::run(&entities, horizon, &self.config)?,
            Algorithm::DualDecomposition => {
                dual_decomposition::run(&entities, horizon, &self.config)?
            }
            Algorithm::ExchangeAdmm => exchange_admm::run(&entities, horizon, &self.config)?,
            Algorithm::ExchangeMiqpAdmm => {
                exchange_miqp_admm::run(&entities, horizon, &self.config)?
            }
        };
        let solve_time_ms = started.elapsed().as_millis() as u64;

        // Entity 0 is the operator; buildings follow in tree order.
        let building_power: Vec<Trajectory> = outcome.powers[1..].to_vec();
        let district_power = Trajectory::sum_of(horizon, building_power.iter());

        tracing::info!(
            status = ?outcome.status,
            iterations = outcome.iterations,
            objective = outcome.objective,
            solve_time_ms,
            "scheduling run finished"
        );

        Ok(DistrictSchedule {
            status: outcome.status,
            iterations: outcome.iterations,
            primal_residual: outcome.residuals.primal,
            dual_residual: outcome.residuals.dual,
            objective: outcome.objective,
            solve_time_ms,
            building_power,
            district_power,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods() {
        let optimizer = ScheduleOptimizer::new(RunConfig::default())
            .with_algorithm(Algorithm::DualDecomposition)
            .with_rho(0.25)
            .with_tolerances(0.05, 0.5)
            .with_max_iterations(500);

        let config = optimizer.config();
        assert_eq!(config.algorithm, Algorithm::DualDecomposition);
        assert_eq!(config.rho, 0.25);
        assert_eq!(config.eps_primal, 0.05);
        assert_eq!(config.eps_dual, 0.5);
        assert_eq!(config.max_iterations, 500);
    }
}
