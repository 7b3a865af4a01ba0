//! Shared iteration skeleton of the distributed algorithms.
//!
//! Every distributed variant is a pure update rule plugged into the same
//! loop: broadcast signals, gather local solutions, apply the rule to obtain
//! new signals and residuals, stop when the rule declares convergence or the
//! iteration budget runs out. The loop owns iterate bookkeeping (incumbent
//! and last iterate) so the rules stay stateless with respect to reporting.

use crate::convergence::Residuals;
use crate::dispatch::broadcast_gather;
use crate::error::ScheduleError;
use crate::exchange::{GatherResult, SignalBroadcast};
use crate::solution::SolveStatus;
use dst_core::{OptimizationEntity, Trajectory};

/// One distributed update rule.
///
/// `broadcast` derives the per-entity signals from the rule's current state;
/// `apply` consumes a complete gather, advances the state and reports the
/// iteration's residuals.
pub(crate) trait UpdateRule {
    fn broadcast(&self) -> SignalBroadcast;
    fn apply(&mut self, gather: &GatherResult) -> Residuals;
    fn converged(&self, residuals: &Residuals) -> bool;

    /// Whether an iterate qualifies for incumbent retention. Non-convex
    /// variants can regress between iterations, so they keep the best
    /// primal-feasible iterate seen and return it when the iteration budget
    /// runs out; convex variants take the last iterate and admit nothing.
    fn admits_incumbent(&self, _residuals: &Residuals) -> bool {
        false
    }
}

/// The iterate selected at termination, plus run diagnostics.
#[derive(Debug)]
pub(crate) struct IterationOutcome {
    pub status: SolveStatus,
    pub iterations: usize,
    pub residuals: Residuals,
    pub objective: f64,
    /// Exchanged trajectories in entity order (operator first).
    pub powers: Vec<Trajectory>,
}

pub(crate) fn run_iterations(
    entities: &[&dyn OptimizationEntity],
    horizon: usize,
    rule: &mut dyn UpdateRule,
    max_iterations: usize,
    algorithm: &str,
) -> Result<IterationOutcome, ScheduleError> {
    let mut incumbent: Option<(f64, Vec<Trajectory>, Residuals)> = None;
    let mut last: Option<(f64, Vec<Trajectory>, Residuals)> = None;

    for iteration in 1..=max_iterations {
        let broadcast = rule.broadcast();
        let gather = broadcast_gather(entities, &broadcast, horizon)?;
        let residuals = rule.apply(&gather);
        let objective = gather.total_objective();

        tracing::debug!(
            algorithm,
            iteration,
            primal = residuals.primal,
            dual = residuals.dual,
            objective,
            "iteration complete"
        );

        let powers: Vec<Trajectory> = gather.updates.iter().map(|u| u.power.clone()).collect();

        if rule.converged(&residuals) {
            // Convergence always reports the converged iterate, not the
            // incumbent: the residual bounds apply to this iterate only.
            return Ok(IterationOutcome {
                status: SolveStatus::Converged,
                iterations: iteration,
                residuals,
                objective,
                powers,
            });
        }

        if rule.admits_incumbent(&residuals)
            && incumbent
                .as_ref()
                .map_or(true, |(best, ..)| objective < *best)
        {
            incumbent = Some((objective, powers.clone(), residuals));
        }
        last = Some((objective, powers, residuals));
    }

    // Prefer the best admitted iterate; without one, the last iterate is the
    // only candidate. Either way the reported residuals belong to the
    // returned iterate, not to the final iteration.
    let (objective, powers, residuals) = incumbent.or(last).ok_or_else(|| {
        ScheduleError::InvalidConfig("max_iterations must be at least 1".to_string())
    })?;

    tracing::info!(
        algorithm,
        iterations = max_iterations,
        primal = residuals.primal,
        dual = residuals.dual,
        "iteration budget exhausted"
    );

    Ok(IterationOutcome {
        status: SolveStatus::IterationLimitReached,
        iterations: max_iterations,
        residuals,
        objective,
        powers,
    })
}
