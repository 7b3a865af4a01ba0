//! Standard-form convex QP solver on Clarabel.
//!
//! Solves problems of the form
//!
//! ```text
//!   minimize    sum c_ij * x_i * x_j  +  sum c_i * x_i
//!   subject to  a_k . x  =  b_k        (equality rows)
//!               a_k . x  <= b_k        (inequality rows, incl. box bounds)
//! ```
//!
//! Clarabel expects the conic form `min (1/2)x'Px + q'x  s.t.  Ax + s = b,
//! s in K`, with the constraint matrix in Compressed Sparse Column (CSC)
//! format and `P` given as the upper triangle of the symmetric quadratic
//! form. The builder below accumulates rows/terms in the natural row-wise
//! form and performs the CSC conversion once at solve time.
//!
//! Solver statuses are mapped onto [`SolveFailure`]: primal infeasibility
//! becomes [`SolveFailure::Infeasible`], dual infeasibility (an unbounded
//! primal) becomes [`SolveFailure::Unbounded`], anything else that is not a
//! solved status is reported as a numerical error.

use crate::entity::{PowerSignal, SolveFailure};
use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettingsBuilder, IPSolver, SolverStatus, SupportedConeT};
use std::collections::BTreeMap;

/// Incremental builder for a standard-form convex QP.
#[derive(Debug, Clone, Default)]
pub struct QpBuilder {
    num_vars: usize,
    /// Objective coefficients `c * x_i * x_j`, keyed `(i, j)` with `i <= j`.
    quadratic: BTreeMap<(usize, usize), f64>,
    linear: Vec<f64>,
    eq_rows: Vec<(Vec<(usize, f64)>, f64)>,
    ineq_rows: Vec<(Vec<(usize, f64)>, f64)>,
}

/// Optimal point and objective value of a solved QP.
#[derive(Debug, Clone)]
pub struct QpSolution {
    pub x: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
}

impl QpBuilder {
    pub fn new(num_vars: usize) -> Self {
        QpBuilder {
            num_vars,
            quadratic: BTreeMap::new(),
            linear: vec![0.0; num_vars],
            eq_rows: Vec::new(),
            ineq_rows: Vec::new(),
        }
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Appends `count` fresh variables and returns the index of the first.
    pub fn add_vars(&mut self, count: usize) -> usize {
        let offset = self.num_vars;
        self.num_vars += count;
        self.linear.resize(self.num_vars, 0.0);
        offset
    }

    /// Adds the objective term `coeff * x_i * x_j`.
    pub fn add_quadratic(&mut self, i: usize, j: usize, coeff: f64) {
        let key = if i <= j { (i, j) } else { (j, i) };
        *self.quadratic.entry(key).or_insert(0.0) += coeff;
    }

    /// Adds the objective term `coeff * x_i`.
    pub fn add_linear(&mut self, i: usize, coeff: f64) {
        self.linear[i] += coeff;
    }

    /// Box bound `lo <= x_i <= hi`. Infinite bounds are skipped.
    pub fn bound(&mut self, i: usize, lo: f64, hi: f64) {
        if hi.is_finite() {
            self.ineq_rows.push((vec![(i, 1.0)], hi));
        }
        if lo.is_finite() {
            self.ineq_rows.push((vec![(i, -1.0)], -lo));
        }
    }

    /// Equality row `terms . x == rhs`.
    pub fn add_eq(&mut self, terms: Vec<(usize, f64)>, rhs: f64) {
        self.eq_rows.push((terms, rhs));
    }

    /// Inequality row `terms . x <= rhs`.
    pub fn add_leq(&mut self, terms: Vec<(usize, f64)>, rhs: f64) {
        self.ineq_rows.push((terms, rhs));
    }

    /// Evaluates the accumulated objective at a given point.
    pub fn objective_at(&self, x: &[f64]) -> f64 {
        let mut value = 0.0;
        for (&(i, j), &c) in &self.quadratic {
            value += c * x[i] * x[j];
        }
        for (i, &c) in self.linear.iter().enumerate() {
            value += c * x[i];
        }
        value
    }

    /// Assembles the conic form and invokes Clarabel.
    pub fn solve(&self) -> Result<QpSolution, SolveFailure> {
        let n = self.num_vars;

        // P: upper triangle of the symmetric quadratic form. An objective
        // coefficient c on x_i^2 corresponds to P_ii = 2c; a coefficient on
        // x_i * x_j (i != j) corresponds directly to P_ij = c.
        let mut p_cols: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (&(i, j), &c) in &self.quadratic {
            let value = if i == j { 2.0 * c } else { c };
            if value != 0.0 {
                p_cols[j].push((i, value));
            }
        }
        let p_mat = cols_to_csc(n, n, p_cols);

        // A: equality rows first (zero cone), then inequality rows
        // (nonnegative cone).
        let n_eq = self.eq_rows.len();
        let n_ineq = self.ineq_rows.len();
        let m = n_eq + n_ineq;

        let mut a_cols: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut rhs = Vec::with_capacity(m);
        for (row_idx, (terms, b)) in self
            .eq_rows
            .iter()
            .chain(self.ineq_rows.iter())
            .enumerate()
        {
            for &(col, value) in terms {
                a_cols[col].push((row_idx, value));
            }
            rhs.push(*b);
        }
        let a_mat = cols_to_csc(m, n, a_cols);

        let mut cones = Vec::new();
        if n_eq > 0 {
            cones.push(SupportedConeT::ZeroConeT(n_eq));
        }
        if n_ineq > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(n_ineq));
        }

        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .build()
            .map_err(|e| SolveFailure::Numerical(format!("Clarabel settings error: {:?}", e)))?;

        let mut solver = clarabel::solver::DefaultSolver::new(
            &p_mat,
            &self.linear,
            &a_mat,
            &rhs,
            &cones,
            settings,
        )
        .map_err(|e| SolveFailure::Numerical(format!("Clarabel initialization failed: {:?}", e)))?;

        solver.solve();

        let sol = solver.solution;
        match sol.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {
                let x = sol.x.clone();
                let objective = self.objective_at(&x);
                Ok(QpSolution {
                    x,
                    objective,
                    iterations: sol.iterations as usize,
                })
            }
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                Err(SolveFailure::Infeasible)
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                Err(SolveFailure::Unbounded)
            }
            other => Err(SolveFailure::Numerical(format!(
                "Clarabel returned status {:?}",
                other
            ))),
        }
    }
}

/// Adds a coordination signal's objective terms over the given power
/// variables.
///
/// A linear signal contributes `price[t] * x[t]`. A proximal signal
/// contributes `(rho/2) * (x[t] - target[t])^2`, expanded without the
/// constant term: `(rho/2) * x[t]^2 - rho * target[t] * x[t]`. Dropping the
/// constant leaves the minimizer unchanged and keeps `objective_at` free of
/// penalty offsets.
pub fn apply_signal(builder: &mut QpBuilder, power_vars: &[usize], signal: &PowerSignal) {
    match signal {
        PowerSignal::None => {}
        PowerSignal::Linear { price } => {
            for (t, &var) in power_vars.iter().enumerate() {
                builder.add_linear(var, price[t]);
            }
        }
        PowerSignal::Proximal { rho, target } => {
            for (t, &var) in power_vars.iter().enumerate() {
                builder.add_quadratic(var, var, rho / 2.0);
                builder.add_linear(var, -rho * target[t]);
            }
        }
    }
}

/// Converts column-wise `(row, value)` entries into a Clarabel CSC matrix.
/// Entries within a column are sorted by row and duplicates merged.
fn cols_to_csc(m: usize, n: usize, mut cols: Vec<Vec<(usize, f64)>>) -> CscMatrix<f64> {
    let mut col_ptr = Vec::with_capacity(n + 1);
    let mut row_idx = Vec::new();
    let mut values = Vec::new();
    let mut nnz = 0usize;

    for col in cols.iter_mut() {
        col_ptr.push(nnz);
        col.sort_by_key(|(r, _)| *r);
        let mut iter = col.iter().peekable();
        while let Some(&(r, v)) = iter.next() {
            let mut total = v;
            while let Some(&&(r2, v2)) = iter.peek() {
                if r2 == r {
                    total += v2;
                    iter.next();
                } else {
                    break;
                }
            }
            row_idx.push(r);
            values.push(total);
            nnz += 1;
        }
    }
    col_ptr.push(nnz);

    CscMatrix::new(m, n, col_ptr, row_idx, values)
}
