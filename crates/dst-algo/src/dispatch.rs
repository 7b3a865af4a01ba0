//! Parallel execution substrate for the broadcast/gather round trip.
//!
//! Entities are partitioned into contiguous per-worker chunks and each chunk's
//! local solves run on a rayon worker. Gather results are flattened back in
//! ascending rank order, so the reduction order (and with it every floating
//! point sum) is independent of worker scheduling. Running the same broadcast
//! twice yields bit-identical gathers.

use crate::error::ScheduleError;
use crate::exchange::{GatherResult, LocalUpdate, SignalBroadcast};
use dst_core::{OptimizationEntity, Trajectory};
use rayon::prelude::*;

/// Partitions `n_entities` into `n_workers` contiguous ascending chunks.
///
/// Sizes differ by at most one, with the remainder going to the lowest ranks.
/// Workers beyond the entity count receive empty chunks.
pub fn assign_entities(n_entities: usize, n_workers: usize) -> Vec<Vec<usize>> {
    let n_workers = n_workers.max(1);
    let base = n_entities / n_workers;
    let remainder = n_entities % n_workers;

    let mut chunks = Vec::with_capacity(n_workers);
    let mut next = 0usize;
    for rank in 0..n_workers {
        let size = base + usize::from(rank < remainder);
        chunks.push((next..next + size).collect());
        next += size;
    }
    chunks
}

/// Runs one broadcast/gather round trip over all entities.
///
/// Each entity's trajectory is validated against the shared horizon before
/// entering the reduction; a short or long trajectory aborts the run with
/// [`ScheduleError::CommunicationMismatch`]. The first failing entity in
/// tree order determines the reported error.
pub fn broadcast_gather(
    entities: &[&dyn OptimizationEntity],
    broadcast: &SignalBroadcast,
    horizon: usize,
) -> Result<GatherResult, ScheduleError> {
    debug_assert_eq!(entities.len(), broadcast.len());

    let chunks = assign_entities(entities.len(), rayon::current_num_threads());

    let per_chunk: Vec<Result<Vec<LocalUpdate>, ScheduleError>> = chunks
        .par_iter()
        .map(|chunk| {
            let mut updates = Vec::with_capacity(chunk.len());
            for &idx in chunk {
                let entity = entities[idx];
                let solution = entity
                    .solve_local(&broadcast.signals[idx], &broadcast.options[idx])
                    .map_err(|failure| ScheduleError::from_failure(entity.name(), failure))?;
                if solution.power.len() != horizon {
                    return Err(ScheduleError::CommunicationMismatch {
                        entity: entity.name().to_string(),
                        expected: horizon,
                        actual: solution.power.len(),
                    });
                }
                updates.push(LocalUpdate {
                    entity: idx,
                    power: solution.power,
                    objective: solution.objective,
                    commitment: solution.commitment,
                });
            }
            Ok(updates)
        })
        .collect();

    // Flatten in rank order; chunks are ascending so this restores entity
    // order and fixes the summation order.
    let mut updates = Vec::with_capacity(entities.len());
    for chunk_result in per_chunk {
        updates.extend(chunk_result?);
    }

    let aggregate = Trajectory::sum_of(horizon, updates.iter().map(|u| &u.power));
    Ok(GatherResult { updates, aggregate })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dst_core::{
        LocalSolution, LocalSolveOptions, PowerSignal, QuadraticModel, SolveFailure,
    };

    struct StubEntity {
        name: String,
        power: Vec<f64>,
        fail: Option<SolveFailure>,
    }

    impl OptimizationEntity for StubEntity {
        fn name(&self) -> &str {
            &self.name
        }

        fn horizon(&self) -> usize {
            self.power.len()
        }

        fn solve_local(
            &self,
            _signal: &PowerSignal,
            _options: &LocalSolveOptions,
        ) -> Result<LocalSolution, SolveFailure> {
            if let Some(failure) = &self.fail {
                return Err(failure.clone());
            }
            Ok(LocalSolution {
                power: Trajectory::from_values(self.power.clone()),
                objective: 1.0,
                commitment: None,
            })
        }

        fn joint_model(&self) -> QuadraticModel {
            QuadraticModel::default()
        }
    }

    fn stub(name: &str, power: Vec<f64>) -> StubEntity {
        StubEntity {
            name: name.to_string(),
            power,
            fail: None,
        }
    }

    #[test]
    fn test_assignment_even_split() {
        let chunks = assign_entities(6, 3);
        assert_eq!(chunks, vec![vec![0, 1], vec![2, 3], vec![4, 5]]);
    }

    #[test]
    fn test_assignment_remainder_to_lowest_ranks() {
        let chunks = assign_entities(7, 3);
        assert_eq!(chunks[0].len(), 3);
        assert_eq!(chunks[1].len(), 2);
        assert_eq!(chunks[2].len(), 2);
        let flat: Vec<usize> = chunks.into_iter().flatten().collect();
        assert_eq!(flat, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_assignment_more_workers_than_entities() {
        let chunks = assign_entities(2, 5);
        assert_eq!(chunks[0], vec![0]);
        assert_eq!(chunks[1], vec![1]);
        assert!(chunks[2..].iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_gather_aggregates_in_entity_order() {
        let a = stub("a", vec![1.0, 2.0]);
        let b = stub("b", vec![-0.5, 1.0]);
        let entities: Vec<&dyn OptimizationEntity> = vec![&a, &b];
        let broadcast = SignalBroadcast::uniform(vec![PowerSignal::None; 2]);

        let gather = broadcast_gather(&entities, &broadcast, 2).unwrap();
        assert_eq!(gather.updates[0].entity, 0);
        assert_eq!(gather.updates[1].entity, 1);
        assert_eq!(gather.aggregate.values(), &[0.5, 3.0]);
        assert!((gather.total_objective() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_length_is_mismatch() {
        let a = stub("a", vec![1.0, 2.0]);
        let short = stub("short", vec![1.0]);
        let entities: Vec<&dyn OptimizationEntity> = vec![&a, &short];
        let broadcast = SignalBroadcast::uniform(vec![PowerSignal::None; 2]);

        let err = broadcast_gather(&entities, &broadcast, 2).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::CommunicationMismatch {
                ref entity,
                expected: 2,
                actual: 1,
            } if entity == "short"
        ));
    }

    #[test]
    fn test_local_failure_names_entity() {
        let a = stub("a", vec![0.0]);
        let bad = StubEntity {
            name: "bad".to_string(),
            power: vec![0.0],
            fail: Some(SolveFailure::Infeasible),
        };
        let entities: Vec<&dyn OptimizationEntity> = vec![&a, &bad];
        let broadcast = SignalBroadcast::uniform(vec![PowerSignal::None; 2]);

        let err = broadcast_gather(&entities, &broadcast, 1).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::LocalSolveInfeasible { ref entity } if entity == "bad"
        ));
    }
}
