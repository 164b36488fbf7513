//! Sparse linear system primitive
//!
//! Jacobi-preconditioned conjugate gradients for the symmetric positive
//! definite systems produced by the flow and thermal assemblies:
//!
//! ```text
//! A·x = b,   A = diag(c) + Σ_faces g·(eᵢ − eⱼ)(eᵢ − eⱼ)ᵀ
//! ```
//!
//! The solver never fails: when the iteration cap is reached it returns the
//! best iterate and reports the residual so callers can shrink dt and retry.

use crate::error::SeepageError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Threshold under which denominators are treated as zero
const TINY: f64 = 1e-300;

/// Conjugate-gradient settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Maximum number of PCG iterations per solve
    pub max_iterations: usize,
    /// Residual tolerance relative to ‖b‖
    pub rel_tolerance: f64,
    /// Absolute residual tolerance
    pub abs_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            rel_tolerance: 1e-12,
            abs_tolerance: 0.0,
        }
    }
}

/// Outcome of one linear solve
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SolveReport {
    /// PCG iterations performed
    pub iterations: usize,
    /// Final residual ‖b − A·x‖ / ‖b‖ (absolute when b = 0)
    pub residual: f64,
    /// Whether the tolerance was met
    pub converged: bool,
}

/// A symmetric positive definite operator
pub trait LinearOperator: Sync {
    /// System size
    fn dim(&self) -> usize;

    /// Diagonal entry `i`, used by the Jacobi preconditioner
    fn diagonal(&self, i: usize) -> f64;

    /// Row `i` of `A·x`
    fn apply_row(&self, i: usize, x: &[f64]) -> f64;

    /// `y = A·x`
    fn apply(&self, x: &[f64], y: &mut [f64], parallel: bool) {
        if parallel {
            y.par_iter_mut()
                .enumerate()
                .for_each(|(i, yi)| *yi = self.apply_row(i, x));
        } else {
            for (i, yi) in y.iter_mut().enumerate() {
                *yi = self.apply_row(i, x);
            }
        }
    }
}

/// Row-wise sparse matrix: a diagonal plus off-diagonal `(column, value)` lists
#[derive(Debug, Clone, Default)]
pub struct SparseMatrix {
    diag: Vec<f64>,
    off: Vec<Vec<(usize, f64)>>,
}

impl SparseMatrix {
    /// Zero matrix of size `n`
    ///
    /// # Errors
    /// Returns `Allocation` when the row storage cannot be reserved.
    pub fn zeros(n: usize) -> Result<Self, SeepageError> {
        let mut diag = Vec::new();
        diag.try_reserve_exact(n)?;
        diag.resize(n, 0.0);
        let mut off = Vec::new();
        off.try_reserve_exact(n)?;
        off.resize_with(n, Vec::new);
        Ok(Self { diag, off })
    }

    /// Add `value` to the diagonal entry of row `i`
    #[inline]
    pub fn add_diagonal(&mut self, i: usize, value: f64) {
        self.diag[i] += value;
    }

    /// Add a symmetric coupling `g·(xᵢ − xⱼ)` between rows `i` and `j`
    pub fn add_coupling(&mut self, i: usize, j: usize, g: f64) {
        self.diag[i] += g;
        self.diag[j] += g;
        self.off[i].push((j, -g));
        self.off[j].push((i, -g));
    }

    /// Off-diagonal entries of row `i`
    pub fn row(&self, i: usize) -> &[(usize, f64)] {
        &self.off[i]
    }
}

impl LinearOperator for SparseMatrix {
    fn dim(&self) -> usize {
        self.diag.len()
    }

    #[inline]
    fn diagonal(&self, i: usize) -> f64 {
        self.diag[i]
    }

    #[inline]
    fn apply_row(&self, i: usize, x: &[f64]) -> f64 {
        self.off[i]
            .iter()
            .fold(self.diag[i] * x[i], |sum, &(j, a_ij)| sum + a_ij * x[j])
    }
}

fn dot(a: &[f64], b: &[f64], parallel: bool) -> f64 {
    if parallel {
        a.par_iter().zip(b).map(|(x, y)| x * y).sum()
    } else {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }
}

fn precondition<A: LinearOperator>(a: &A, r: &[f64], z: &mut [f64], parallel: bool) {
    let jacobi = |(i, zi): (usize, &mut f64)| {
        let d = a.diagonal(i);
        *zi = if d.abs() > TINY { r[i] / d } else { r[i] };
    };
    if parallel {
        z.par_iter_mut().enumerate().for_each(jacobi);
    } else {
        z.iter_mut().enumerate().for_each(jacobi);
    }
}

/// Solve `A·x = b` starting from `x0`
///
/// Returns the final iterate and a [`SolveReport`]. Non-convergence is not an
/// error: the best iterate is returned with `converged == false`.
pub fn pcg_solve<A: LinearOperator>(
    a: &A,
    b: &[f64],
    x0: Vec<f64>,
    config: &SolverConfig,
    parallel: bool,
) -> (Vec<f64>, SolveReport) {
    let n = a.dim();
    let mut x = x0;
    if n == 0 {
        return (
            x,
            SolveReport {
                iterations: 0,
                residual: 0.0,
                converged: true,
            },
        );
    }

    let b_norm = dot(b, b, parallel).sqrt();
    let scale = if b_norm > TINY { b_norm } else { 1.0 };
    let tol = config.abs_tolerance.max(config.rel_tolerance * b_norm);

    let mut r = vec![0.0; n];
    a.apply(&x, &mut r, parallel);
    for (ri, bi) in r.iter_mut().zip(b) {
        *ri = bi - *ri;
    }
    let mut r_norm = dot(&r, &r, parallel).sqrt();
    if r_norm <= tol {
        return (
            x,
            SolveReport {
                iterations: 0,
                residual: r_norm / scale,
                converged: true,
            },
        );
    }

    let mut z = vec![0.0; n];
    precondition(a, &r, &mut z, parallel);
    let mut p = z.clone();
    let mut rz_old = dot(&r, &z, parallel);
    let mut ap = vec![0.0; n];
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;
        a.apply(&p, &mut ap, parallel);
        let denom = dot(&p, &ap, parallel);
        if denom.abs() < TINY {
            break;
        }

        let alpha = rz_old / denom;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }

        r_norm = dot(&r, &r, parallel).sqrt();
        if r_norm <= tol {
            break;
        }

        precondition(a, &r, &mut z, parallel);
        let rz_new = dot(&r, &z, parallel);
        if rz_old.abs() < TINY {
            break;
        }
        let beta = rz_new / rz_old;
        for i in 0..n {
            p[i] = z[i] + beta * p[i];
        }
        rz_old = rz_new;
    }

    (
        x,
        SolveReport {
            iterations,
            residual: r_norm / scale,
            converged: r_norm <= tol,
        },
    )
}
