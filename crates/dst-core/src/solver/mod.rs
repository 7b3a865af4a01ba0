//! Convex optimization backend for local subproblem solves.
//!
//! For algorithm solvers built on top of this backend, see `dst_algo`.

pub mod qp;

pub use qp::{apply_signal, QpBuilder, QpSolution};
