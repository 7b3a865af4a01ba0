//! Entity abstraction and the local-solve interface.
//!
//! The algorithm coordinator treats every entity (district operator or
//! building) as a black box that can do exactly two things: solve its local
//! subproblem under a penalty signal, and expose its objective/constraints in
//! standard quadratic form so the central algorithm can assemble one joint
//! problem. Device physics, data generation and model formulation live behind
//! this seam.

use crate::{QpBuilder, Trajectory};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Penalty/signal input to a local subproblem solve.
///
/// A fresh signal is computed by the coordinator once per iteration; entities
/// hold it only for the duration of one solve.
#[derive(Debug, Clone, PartialEq)]
pub enum PowerSignal {
    /// Plain local objective, no coordination term.
    None,
    /// Adds `price[t] * x[t]` to the local objective (dual decomposition).
    Linear { price: Trajectory },
    /// Adds `(rho/2) * ||x - target||^2` to the local objective (ADMM forms).
    Proximal { rho: f64, target: Trajectory },
}

/// How integer decision variables are treated in a local solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegerMode {
    /// Integer decisions are kept exact: each local solve is a (small) MIQP.
    Integer,
    /// Integer decisions are relaxed to their convex hull.
    #[default]
    Relaxed,
}

/// How the admissible integer-update region is restricted per iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XUpdateMode {
    /// Integer decisions may only move within a trust region of the previous
    /// iterate's commitment.
    Constrained,
    /// Integer decisions are re-optimized freely every iteration.
    #[default]
    Unconstrained,
}

/// An entity's committed discrete decision, carried between iterations so
/// constrained x-updates can anchor their trust region.
///
/// The interpretation of the values is private to the entity; for the bundled
/// scenario entities these are deferrable-load start offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment(pub Vec<usize>);

/// Per-iteration options accompanying a [`PowerSignal`] broadcast.
#[derive(Debug, Clone, Default)]
pub struct LocalSolveOptions {
    pub integer_mode: IntegerMode,
    pub x_update: XUpdateMode,
    /// The entity's commitment from the previous iteration, if any.
    pub previous: Option<Commitment>,
}

/// Result of one local subproblem solve.
#[derive(Debug, Clone)]
pub struct LocalSolution {
    /// The entity's exchanged variable, length = operation horizon.
    pub power: Trajectory,
    /// Local objective value at `power`, excluding any penalty term.
    pub objective: f64,
    /// Discrete decision taken in this solve, for entities that have one.
    pub commitment: Option<Commitment>,
}

/// Failure modes of a local subproblem solve.
///
/// Infeasibility and unboundedness indicate a modeling/configuration defect;
/// retrying with identical signals would reproduce them, so the coordinator
/// aborts the run instead.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SolveFailure {
    #[error("subproblem has no feasible point")]
    Infeasible,
    #[error("subproblem is unbounded")]
    Unbounded,
    #[error("numerical solver error: {0}")]
    Numerical(String),
}

/// An entity's objective and constraints in standard quadratic form, used by
/// the central algorithm to assemble the joint district-wide problem.
///
/// Variables are entity-local; `power_vars` marks which of them form the
/// exchanged trajectory. Quadratic terms are objective coefficients (a value
/// `c` at `(i, j)` contributes `c * v_i * v_j`). Integer decisions do not
/// appear here: entities expose their convex relaxation.
#[derive(Debug, Clone, Default)]
pub struct QuadraticModel {
    pub num_vars: usize,
    /// Indices of the exchanged trajectory variables, length = horizon.
    pub power_vars: Vec<usize>,
    /// Objective terms `c * v_i * v_j` as `(i, j, c)` with `i <= j`.
    pub quadratic: Vec<(usize, usize, f64)>,
    /// Objective terms `c * v_i`, indexed by variable.
    pub linear: Vec<f64>,
    /// Rows `a . v == b`.
    pub eq: Vec<(Vec<(usize, f64)>, f64)>,
    /// Rows `a . v <= b`.
    pub ineq: Vec<(Vec<(usize, f64)>, f64)>,
    /// Box bounds `(var, lo, hi)`; infinite bounds are skipped.
    pub bounds: Vec<(usize, f64, f64)>,
}

impl QuadraticModel {
    /// Appends this model's variables and rows to a joint problem builder.
    /// Returns the offset at which the model's variables were placed.
    pub fn append_to(&self, builder: &mut QpBuilder) -> usize {
        let offset = builder.add_vars(self.num_vars);
        for &(i, j, c) in &self.quadratic {
            builder.add_quadratic(offset + i, offset + j, c);
        }
        for (i, &c) in self.linear.iter().enumerate() {
            if c != 0.0 {
                builder.add_linear(offset + i, c);
            }
        }
        for (terms, rhs) in &self.eq {
            let shifted: Vec<(usize, f64)> =
                terms.iter().map(|&(i, a)| (offset + i, a)).collect();
            builder.add_eq(shifted, *rhs);
        }
        for (terms, rhs) in &self.ineq {
            let shifted: Vec<(usize, f64)> =
                terms.iter().map(|&(i, a)| (offset + i, a)).collect();
            builder.add_leq(shifted, *rhs);
        }
        for &(i, lo, hi) in &self.bounds {
            builder.bound(offset + i, lo, hi);
        }
        offset
    }
}

/// The local objective/constraint capability of one entity.
///
/// Implementations must be `Send + Sync`: the parallel execution substrate
/// solves many entities' subproblems concurrently, each on a private copy of
/// the broadcast signal.
pub trait OptimizationEntity: Send + Sync {
    fn name(&self) -> &str;

    /// The operation horizon H of this entity's trajectory.
    fn horizon(&self) -> usize;

    /// Whether the entity's local model contains integer decision variables.
    fn has_integer_vars(&self) -> bool {
        false
    }

    /// Solves the local subproblem under the given signal and returns the
    /// locally optimal trajectory of length [`Self::horizon`].
    fn solve_local(
        &self,
        signal: &PowerSignal,
        options: &LocalSolveOptions,
    ) -> Result<LocalSolution, SolveFailure>;

    /// The entity's objective/constraints for joint (central) assembly.
    fn joint_model(&self) -> QuadraticModel;
}

/// The entity tree consumed by the coordinator: one district operator (root)
/// and an ordered list of buildings. The coordinator never constructs or
/// mutates this tree.
pub trait EntityTree {
    fn horizon(&self) -> usize;
    fn operator(&self) -> &dyn OptimizationEntity;
    fn buildings(&self) -> Vec<&dyn OptimizationEntity>;
}
