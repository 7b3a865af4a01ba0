//! Classic dual decomposition on the exchange coupling.
//!
//! The coupling `sum_i x_i = 0` is priced with one multiplier per timestep.
//! Entities minimize their local objective plus `lambda[t] * x[t]`, and the
//! multiplier ascends along the constraint violation with fixed step rho:
//! `lambda <- lambda + rho * aggregate`. Only primal feasibility is tracked;
//! there is no dual residual in this scheme.

use crate::config::RunConfig;
use crate::convergence::{imbalance_residual, Residuals, Tolerances};
use crate::driver::{run_iterations, IterationOutcome, UpdateRule};
use crate::error::ScheduleError;
use crate::exchange::{GatherResult, SignalBroadcast};
use dst_core::{OptimizationEntity, PowerSignal, Trajectory};

pub(crate) struct DualDecompositionRule {
    n_entities: usize,
    rho: f64,
    tolerances: Tolerances,
    /// Coupling multiplier, one price per timestep, shared by all entities.
    lambda: Trajectory,
}

impl DualDecompositionRule {
    pub(crate) fn new(n_entities: usize, horizon: usize, config: &RunConfig) -> Self {
        DualDecompositionRule {
            n_entities,
            rho: config.rho,
            tolerances: Tolerances {
                eps_primal: config.eps_primal,
                eps_dual: config.eps_dual,
            },
            lambda: Trajectory::zeros(horizon),
        }
    }
}

impl UpdateRule for DualDecompositionRule {
    fn broadcast(&self) -> SignalBroadcast {
        let signals = (0..self.n_entities)
            .map(|_| PowerSignal::Linear {
                price: self.lambda.clone(),
            })
            .collect();
        SignalBroadcast::uniform(signals)
    }

    fn apply(&mut self, gather: &GatherResult) -> Residuals {
        self.lambda.add_assign(&gather.aggregate.scale(self.rho));
        imbalance_residual(&gather.aggregate)
    }

    fn converged(&self, residuals: &Residuals) -> bool {
        residuals.primal < self.tolerances.eps_primal
    }
}

pub(crate) fn run(
    entities: &[&dyn OptimizationEntity],
    horizon: usize,
    config: &RunConfig,
) -> Result<IterationOutcome, ScheduleError> {
    let mut rule = DualDecompositionRule::new(entities.len(), horizon, config);
    run_iterations(
        entities,
        horizon,
        &mut rule,
        config.max_iterations,
        "dual_decomposition",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::LocalUpdate;

    #[test]
    fn test_first_broadcast_is_zero_price() {
        let rule = DualDecompositionRule::new(3, 2, &RunConfig::default());
        let broadcast = rule.broadcast();
        assert_eq!(broadcast.len(), 3);
        for signal in &broadcast.signals {
            match signal {
                PowerSignal::Linear { price } => assert_eq!(price.values(), &[0.0, 0.0]),
                other => panic!("unexpected signal {:?}", other),
            }
        }
    }

    #[test]
    fn test_multiplier_ascends_along_imbalance() {
        let mut config = RunConfig::default();
        config.rho = 0.5;
        let mut rule = DualDecompositionRule::new(2, 2, &config);

        let aggregate = Trajectory::from_values(vec![2.0, -4.0]);
        let gather = GatherResult {
            updates: vec![LocalUpdate {
                entity: 0,
                power: aggregate.clone(),
                objective: 0.0,
                commitment: None,
            }],
            aggregate,
        };

        let residuals = rule.apply(&gather);
        assert_eq!(rule.lambda.values(), &[1.0, -2.0]);
        assert!((residuals.primal - 20f64.sqrt()).abs() < 1e-12);
        assert_eq!(residuals.dual, 0.0);
    }

    #[test]
    fn test_convergence_ignores_dual_tolerance() {
        let mut config = RunConfig::default();
        config.eps_primal = 0.1;
        config.eps_dual = 0.0;
        let rule = DualDecompositionRule::new(2, 1, &config);

        let residuals = Residuals {
            primal: 0.05,
            dual: 99.0,
        };
        assert!(rule.converged(&residuals));
    }
}
