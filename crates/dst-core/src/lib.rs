//! # dst-core: District Scheduling Core
//!
//! Provides the fundamental data structures shared by the district schedule
//! optimization algorithms and the scenario collaborators.
//!
//! ## Design Philosophy
//!
//! A scheduling run operates on a **two-level entity tree**: one district
//! operator (root) and N buildings (children). Every entity owns an electrical
//! power trajectory over a common operation horizon, and exposes its local
//! objective/constraint capability through the [`OptimizationEntity`] trait.
//! The algorithms in `dst-algo` never look inside an entity; they only
//! exchange [`PowerSignal`]s and trajectories with it.
//!
//! This separation enables:
//! - Interchangeable update rules (central and distributed) over one protocol
//! - Parallel local solves using rayon (entities are `Send + Sync`)
//! - Type-safe entity references with newtype IDs
//! - Black-box local solvers: the embedded conic QP backend in [`solver`] is
//!   one implementation, not a requirement of the trait
//!
//! ## Core Data Structures
//!
//! - [`Trajectory`] - ordered power values (kW), one per timestep
//! - [`ScheduleSet`] - labeled schedules kept per entity for later comparison
//! - [`PowerSignal`] - the per-iteration penalty input to a local solve
//! - [`OptimizationEntity`] / [`EntityTree`] - the collaborator interfaces
//! - [`QuadraticModel`] - an entity's objective/constraints in standard form,
//!   consumed by the central (joint) algorithm
//!
//! ## Sign Convention
//!
//! Each entity exchanges a single variable vector `x` of horizon length. For
//! buildings `x` is the building's net electrical power. The district operator
//! exchanges its supplied power **negated**, so the coupling constraint over
//! the whole tree reads `sum_i x_i = 0` and the aggregate gathered by the
//! coordinator is directly the exchange imbalance.
//!
//! ## Modules
//!
//! - [`error`] - Unified error type for the dst ecosystem
//! - [`schedule`] - Labeled schedule storage and finalization
//! - [`entity`] - Entity traits, penalty signals, local solve results
//! - [`solver`] - Convex QP backend (Clarabel) used by local subproblems

use serde::{Deserialize, Serialize};
use std::ops::Index;

pub mod entity;
pub mod error;
pub mod schedule;
pub mod solver;

pub use entity::{
    Commitment, EntityTree, IntegerMode, LocalSolution, LocalSolveOptions, OptimizationEntity,
    PowerSignal, QuadraticModel, SolveFailure, XUpdateMode,
};
pub use error::{DstError, DstResult};
pub use schedule::ScheduleSet;
pub use solver::qp::{apply_signal, QpBuilder, QpSolution};

/// Newtype wrapper identifying an entity within one run's tree.
///
/// Index 0 is the district operator; buildings follow in tree order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(usize);

impl EntityId {
    #[inline]
    pub fn new(value: usize) -> Self {
        EntityId(value)
    }

    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity#{}", self.0)
    }
}

/// Ordered sequence of electrical power values (kW), one per timestep.
///
/// All trajectories in one run share the same length (the operation horizon)
/// and the same timestep indexing. The arithmetic helpers are the building
/// blocks of the variable-exchange updates and the residual norms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trajectory(Vec<f64>);

impl Trajectory {
    /// All-zero trajectory of the given horizon length.
    pub fn zeros(horizon: usize) -> Self {
        Trajectory(vec![0.0; horizon])
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Trajectory(values)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Elementwise `self += other`. Lengths must match.
    pub fn add_assign(&mut self, other: &Trajectory) {
        debug_assert_eq!(self.len(), other.len());
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a += b;
        }
    }

    /// Elementwise difference `self - other`. Lengths must match.
    pub fn sub(&self, other: &Trajectory) -> Trajectory {
        debug_assert_eq!(self.len(), other.len());
        Trajectory(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a - b)
                .collect(),
        )
    }

    /// Elementwise sum `self + other`. Lengths must match.
    pub fn add(&self, other: &Trajectory) -> Trajectory {
        debug_assert_eq!(self.len(), other.len());
        Trajectory(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a + b)
                .collect(),
        )
    }

    pub fn scale(&self, factor: f64) -> Trajectory {
        Trajectory(self.0.iter().map(|v| v * factor).collect())
    }

    /// Euclidean norm over all timesteps.
    pub fn l2_norm(&self) -> f64 {
        self.0.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Maximum absolute value over all timesteps.
    pub fn inf_norm(&self) -> f64 {
        self.0.iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
    }

    /// Elementwise sum of many trajectories of the given horizon.
    ///
    /// Returns all zeros when the iterator is empty.
    pub fn sum_of<'a>(horizon: usize, parts: impl Iterator<Item = &'a Trajectory>) -> Trajectory {
        let mut total = Trajectory::zeros(horizon);
        for part in parts {
            total.add_assign(part);
        }
        total
    }
}

impl Index<usize> for Trajectory {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl From<Vec<f64>> for Trajectory {
    fn from(values: Vec<f64>) -> Self {
        Trajectory(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId::new(3).to_string(), "Entity#3");
        assert_eq!(EntityId::new(3).value(), 3);
    }

    #[test]
    fn test_trajectory_norms() {
        let t = Trajectory::from_values(vec![3.0, -4.0]);
        assert!((t.l2_norm() - 5.0).abs() < 1e-12);
        assert!((t.inf_norm() - 4.0).abs() < 1e-12);
        assert_eq!(Trajectory::zeros(4).l2_norm(), 0.0);
    }

    #[test]
    fn test_trajectory_arithmetic() {
        let a = Trajectory::from_values(vec![1.0, 2.0]);
        let b = Trajectory::from_values(vec![0.5, -1.0]);
        assert_eq!(a.sub(&b).values(), &[0.5, 3.0]);
        assert_eq!(a.add(&b).values(), &[1.5, 1.0]);
        assert_eq!(a.scale(2.0).values(), &[2.0, 4.0]);

        let total = Trajectory::sum_of(2, [a.clone(), b].iter());
        assert_eq!(total.values(), &[1.5, 1.0]);
    }

    #[test]
    fn test_trajectory_serde_transparent() {
        let t = Trajectory::from_values(vec![1.0, 2.5]);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "[1.0,2.5]");
        let back: Trajectory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
