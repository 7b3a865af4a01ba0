//! Exchange ADMM in scaled consensus form.
//!
//! Each iteration broadcasts a proximal signal pulling entity `i` toward
//! `x_i^k - x_bar^k - u^k`, gathers the locally optimal trajectories,
//! averages them into the new consensus point `x_bar` and advances the
//! scaled dual variable `u <- u + x_bar`. The coupling `sum_i x_i = 0`
//! holds exactly when `x_bar` vanishes, which is what the primal residual
//! measures.

use crate::config::RunConfig;
use crate::convergence::{exchange_residuals, Residuals, Tolerances};
use crate::driver::{run_iterations, IterationOutcome, UpdateRule};
use crate::error::ScheduleError;
use crate::exchange::{GatherResult, SignalBroadcast};
use dst_core::{LocalSolveOptions, OptimizationEntity, PowerSignal, Trajectory};

pub(crate) struct ExchangeAdmmRule {
    rho: f64,
    tolerances: Tolerances,
    /// Previous local trajectories, zeros before the first iteration.
    x_prev: Vec<Trajectory>,
    /// Consensus point: mean of the exchanged trajectories.
    x_bar: Trajectory,
    /// Scaled dual variable.
    u: Trajectory,
}

impl ExchangeAdmmRule {
    pub(crate) fn new(n_entities: usize, horizon: usize, config: &RunConfig) -> Self {
        ExchangeAdmmRule {
            rho: config.rho,
            tolerances: Tolerances {
                eps_primal: config.eps_primal,
                eps_dual: config.eps_dual,
            },
            x_prev: vec![Trajectory::zeros(horizon); n_entities],
            x_bar: Trajectory::zeros(horizon),
            u: Trajectory::zeros(horizon),
        }
    }
}

impl UpdateRule for ExchangeAdmmRule {
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
        SignalBroadcast {
            options: vec![LocalSolveOptions::default(); self.x_prev.len()],
            signals,
        }
    }

    fn apply(&mut self, gather: &GatherResult) -> Residuals {
        let n = self.x_prev.len();
        let x_bar_new = gather.aggregate.scale(1.0 / n as f64);
        let residuals = exchange_residuals(n, self.rho, &x_bar_new, &self.x_bar);

        self.u.add_assign(&x_bar_new);
        for (slot, update) in self.x_prev.iter_mut().zip(gather.updates.iter()) {
            *slot = update.power.clone();
        }
        self.x_bar = x_bar_new;
        residuals
    }

    fn converged(&self, residuals: &Residuals) -> bool {
        residuals.within(&self.tolerances)
    }
}

pub(crate) fn run(
    entities: &[&dyn OptimizationEntity],
    horizon: usize,
    config: &RunConfig,
) -> Result<IterationOutcome, ScheduleError> {
    let mut rule = ExchangeAdmmRule::new(entities.len(), horizon, config);
    run_iterations(
        entities,
        horizon,
        &mut rule,
        config.max_iterations,
        "exchange_admm",
    )
}
