//! Exchange ADMM over mixed-integer local subproblems.
//!
//! Shares the consensus skeleton of the convex exchange variant but carries
//! per-entity commitments between iterations: each broadcast hands every
//! entity its previous discrete decision, so constrained x-updates can limit
//! how far the integer decision moves per iteration. The joint problem is
//! non-convex, so the objective can regress between iterations; the driver
//! therefore keeps the best primal-feasible incumbent and returns it when
//! the iteration budget runs out.

use crate::config::RunConfig;
use crate::convergence::{exchange_residuals, Residuals, Tolerances};
use crate::driver::{run_iterations, IterationOutcome, UpdateRule};
use crate::error::ScheduleError;
use crate::exchange::{GatherResult, SignalBroadcast};
use dst_core::{
    Commitment, IntegerMode, LocalSolveOptions, OptimizationEntity, PowerSignal, Trajectory,
    XUpdateMode,
};

pub(crate) struct ExchangeMiqpAdmmRule {
    rho: f64,
    tolerances: Tolerances,
    integer_mode: IntegerMode,
    x_update: XUpdateMode,
    x_prev: Vec<Trajectory>,
    x_bar: Trajectory,
    u: Trajectory,
    /// Each entity's discrete decision from the previous iteration.
    commitments: Vec<Option<Commitment>>,
}

impl ExchangeMiqpAdmmRule {
    pub(crate) fn new(n_entities: usize, horizon: usize, config: &RunConfig) -> Self {
        ExchangeMiqpAdmmRule {
            rho: config.rho,
            tolerances: Tolerances {
                eps_primal: config.eps_primal,
                eps_dual: config.eps_dual,
            },
            integer_mode: config.integer_mode,
            x_update: config.x_update_mode,
            x_prev: vec![Trajectory::zeros(horizon); n_entities],
            x_bar: Trajectory::zeros(horizon),
            u: Trajectory::zeros(horizon),
            commitments: vec![None; n_entities],
        }
    }
}

impl UpdateRule for ExchangeMiqpAdmmRule {
    fn broadcast(&self) -> SignalBroadcast {
        let correction = self.x_bar.add(&self.u);
        let signals = self
            .x_prev
            .iter()
            .map(|x_i| PowerSignal::Proximal {
                rho: self.rho,
                target: x_i.sub(&correction),
            })
            .collect();
        let options = self
            .commitments
            .iter()
            .map(|previous| LocalSolveOptions {
                integer_mode: self.integer_mode,
                x_update: self.x_update,
                previous: previous.clone(),
            })
            .collect();
        SignalBroadcast { signals, options }
    }

    fn apply(&mut self, gather: &GatherResult) -> Residuals {
        let n = self.x_prev.len();
        let x_bar_new = gather.aggregate.scale(1.0 / n as f64);
        let residuals = exchange_residuals(n, self.rho, &x_bar_new, &self.x_bar);

        self.u.add_assign(&x_bar_new);
        for (idx, update) in gather.updates.iter().enumerate() {
            self.x_prev[idx] = update.power.clone();
            if update.commitment.is_some() {
                self.commitments[idx] = update.commitment.clone();
            }
        }
        self.x_bar = x_bar_new;
        residuals
    }

    fn converged(&self, residuals: &Residuals) -> bool {
        residuals.within(&self.tolerances)
    }

    fn admits_incumbent(&self, residuals: &Residuals) -> bool {
        // Only primal-feasible iterates may become the incumbent; an
        // uncoordinated early iterate can have the lowest objective sum
        // exactly because the coupling is still violated.
        residuals.primal <= self.tolerances.eps_primal
    }
}

pub(crate) fn run(
    entities: &[&dyn OptimizationEntity],
    horizon: usize,
    config: &RunConfig,
) -> Result<IterationOutcome, ScheduleError> {
    let mut rule = ExchangeMiqpAdmmRule::new(entities.len(), horizon, config);
    run_iterations(
        entities,
        horizon,
        &mut rule,
        config.max_iterations,
        "exchange_miqp_admm",
    )
}
