//! Central (joint) scheduling.
//!
//! Assembles every entity's quadratic model into one problem, adds the
//! coupling rows `sum_i x_i[t] = 0` and solves once. Entities with integer
//! decisions contribute their convex relaxation, so the central schedule is
//! the convex baseline the distributed variants are measured against.

use crate::config::RunConfig;
use crate::convergence::imbalance_residual;
use crate::driver::IterationOutcome;
use crate::error::ScheduleError;
use crate::solution::SolveStatus;
use dst_core::{OptimizationEntity, QpBuilder, Trajectory};

pub(crate) fn run(
    entities: &[&dyn OptimizationEntity],
    horizon: usize,
    _config: &RunConfig,
) -> Result<IterationOutcome, ScheduleError> {
    let mut builder = QpBuilder::new(0);

    // Global variable indices of each entity's exchanged trajectory.
    let mut power_columns: Vec<Vec<usize>> = Vec::with_capacity(entities.len());
    for entity in entities {
        if entity.has_integer_vars() {
            tracing::debug!(
                entity = entity.name(),
                "relaxing integer decisions for joint solve"
            );
        }
        let model = entity.joint_model();
        let offset = model.append_to(&mut builder);
        power_columns.push(model.power_vars.iter().map(|&v| offset + v).collect());
    }

    // Coupling: at every timestep the exchanged variables sum to zero.
    for t in 0..horizon {
        let terms: Vec<(usize, f64)> = power_columns.iter().map(|cols| (cols[t], 1.0)).collect();
        builder.add_eq(terms, 0.0);
    }

    let solution = builder
        .solve()
        .map_err(|failure| ScheduleError::from_failure("district", failure))?;

    let powers: Vec<Trajectory> = power_columns
        .iter()
        .map(|cols| Trajectory::from_values(cols.iter().map(|&c| solution.x[c]).collect()))
        .collect();
    let aggregate = Trajectory::sum_of(horizon, powers.iter());
    let residuals = imbalance_residual(&aggregate);

    tracing::debug!(
        objective = solution.objective,
        primal = residuals.primal,
        "joint solve complete"
    );

    Ok(IterationOutcome {
        status: SolveStatus::Converged,
        iterations: 1,
        residuals,
        objective: solution.objective,
        powers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dst_core::{
        LocalSolution, LocalSolveOptions, PowerSignal, QuadraticModel, SolveFailure,
    };

    /// Entity with objective `(x - preferred)^2` per timestep and box bounds.
    struct QuadraticEntity {
        name: String,
        preferred: Vec<f64>,
        lo: f64,
        hi: f64,
    }

    impl OptimizationEntity for QuadraticEntity {
        fn name(&self) -> &str {
            &self.name
        }

        fn horizon(&self) -> usize {
            self.preferred.len()
        }

        fn solve_local(
            &self,
            _signal: &PowerSignal,
            _options: &LocalSolveOptions,
        ) -> Result<LocalSolution, SolveFailure> {
            Err(SolveFailure::Numerical("not used in central tests".into()))
        }

        fn joint_model(&self) -> QuadraticModel {
            let h = self.preferred.len();
            QuadraticModel {
                num_vars: h,
                power_vars: (0..h).collect(),
                quadratic: (0..h).map(|t| (t, t, 1.0)).collect(),
                linear: self.preferred.iter().map(|p| -2.0 * p).collect(),
                eq: vec![],
                ineq: vec![],
                bounds: (0..h).map(|t| (t, self.lo, self.hi)).collect(),
            }
        }
    }

    #[test]
    fn test_joint_solve_balances_exchange() {
        // Two entities preferring +3 and -1; the coupling forces x0 = -x1,
        // and symmetry of the quadratic costs puts them at +2 and -2.
        let a = QuadraticEntity {
            name: "a".into(),
            preferred: vec![3.0, 3.0],
            lo: -10.0,
            hi: 10.0,
        };
        let b = QuadraticEntity {
            name: "b".into(),
            preferred: vec![-1.0, -1.0],
            lo: -10.0,
            hi: 10.0,
        };
        let entities: Vec<&dyn OptimizationEntity> = vec![&a, &b];

        let outcome = run(&entities, 2, &RunConfig::default()).unwrap();
        assert_eq!(outcome.status, SolveStatus::Converged);
        assert_eq!(outcome.iterations, 1);
        assert!((outcome.powers[0][0] - 2.0).abs() < 1e-4);
        assert!((outcome.powers[1][0] + 2.0).abs() < 1e-4);
        assert!(outcome.residuals.primal < 1e-4);
    }

    #[test]
    fn test_infeasible_joint_problem() {
        // Both entities forced strictly positive; the coupling can never
        // hold.
        let a = QuadraticEntity {
            name: "a".into(),
            preferred: vec![2.0],
            lo: 1.0,
            hi: 5.0,
        };
        let b = QuadraticEntity {
            name: "b".into(),
            preferred: vec![2.0],
            lo: 1.0,
            hi: 5.0,
        };
        let entities: Vec<&dyn OptimizationEntity> = vec![&a, &b];

        let err = run(&entities, 1, &RunConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::LocalSolveInfeasible { ref entity } if entity == "district"
        ));
    }
}
