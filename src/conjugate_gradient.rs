use crate::Real;
use na::DVector;
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;
use std::fmt;

/// Preconditioner applied by the [`ConjugateGradient`] solver.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde-serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Preconditioner {
    /// Plain conjugate gradients.
    #[default]
    None,
    /// Scale residuals by the inverse of the matrix diagonal.
    Jacobi,
}

/// A conjugate-gradient solver for sparse symmetric positive-definite systems.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ConjugateGradient {
    /// Iterations stop once `‖r‖ ≤ tolerance·‖b‖`.
    pub tolerance: Real,
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// The preconditioner to apply.
    pub preconditioner: Preconditioner,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        Self {
            tolerance: 1.0e-6,
            max_iterations: 1000,
            preconditioner: Preconditioner::None,
        }
    }
}

/// The solver did not reach its tolerance within its iteration cap.
///
/// This is not an error: the best available solution is still returned.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ConvergenceWarning {
    /// Number of iterations performed.
    pub iterations: usize,
    /// Final `‖r‖ / ‖b‖`.
    pub relative_residual: Real,
    /// The tolerance that was not reached.
    pub tolerance: Real,
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "conjugate gradient stopped after {} iterations with relative residual {:e} (tolerance {:e})",
            self.iterations, self.relative_residual, self.tolerance
        )
    }
}

/// The outcome of a [`ConjugateGradient::solve`].
#[derive(Clone, Debug, PartialEq)]
pub struct SolveReport {
    /// The computed solution.
    pub solution: DVector<Real>,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Final `‖r‖ / ‖b‖` (zero if `b` is zero).
    pub relative_residual: Real,
    /// The tolerance the solver aimed for.
    pub tolerance: Real,
    /// Did the solver reach its tolerance?
    pub converged: bool,
}

impl SolveReport {
    /// The convergence warning to report, if the solver did not converge.
    pub fn warning(&self) -> Option<ConvergenceWarning> {
        if self.converged {
            None
        } else {
            Some(ConvergenceWarning {
                iterations: self.iterations,
                relative_residual: self.relative_residual,
                tolerance: self.tolerance,
            })
        }
    }
}

impl ConjugateGradient {
    /// Solves `a * x = b`, starting from `x = 0`.
    ///
    /// The result only depends on `a`, `b` and the solver settings.
    pub fn solve(&self, a: &CsrMatrix<Real>, b: &DVector<Real>) -> SolveReport {
        assert_eq!(a.nrows(), b.len());
        assert_eq!(a.ncols(), b.len());

        let mut x = DVector::zeros(b.len());
        let b_norm = b.norm();

        if b_norm == 0.0 {
            return SolveReport {
                solution: x,
                iterations: 0,
                relative_residual: 0.0,
                tolerance: self.tolerance,
                converged: true,
            };
        }

        let inv_diag = match self.preconditioner {
            Preconditioner::None => None,
            Preconditioner::Jacobi => Some(inverse_diagonal(a)),
        };

        let mut r = b.clone();
        let mut z = r.clone();
        if let Some(inv_diag) = &inv_diag {
            z.component_mul_assign(inv_diag);
        }
        let mut p = z.clone();
        let mut ap = DVector::zeros(b.len());
        let mut prev_rz = r.dot(&z);
        let threshold = self.tolerance * b_norm;
        let mut r_norm = b_norm;
        let mut iterations = 0;

        while iterations < self.max_iterations && r_norm > threshold {
            mul_csr_vector(a, &p, &mut ap);
            let pap = p.dot(&ap);

            if !pap.is_finite() || pap <= 0.0 {
                // Breakdown: keep the current iterate.
                break;
            }

            let alpha = prev_rz / pap;
            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &ap, 1.0);
            iterations += 1;
            r_norm = r.norm();

            z.copy_from(&r);
            if let Some(inv_diag) = &inv_diag {
                z.component_mul_assign(inv_diag);
            }

            let rz = r.dot(&z);
            let beta = rz / prev_rz;
            prev_rz = rz;
            p.axpy(1.0, &z, beta);
        }

        SolveReport {
            solution: x,
            iterations,
            relative_residual: r_norm / b_norm,
            tolerance: self.tolerance,
            converged: r_norm <= threshold,
        }
    }
}

/// Computes `out = a * x`, one row per task.
///
/// `nalgebra_sparse`'s `&a * &x` runs on a single thread and allocates its output.
fn mul_csr_vector(a: &CsrMatrix<Real>, x: &DVector<Real>, out: &mut DVector<Real>) {
    let offsets = a.row_offsets();
    let cols = a.col_indices();
    let vals = a.values();

    out.as_mut_slice()
        .par_iter_mut()
        .enumerate()
        .for_each(|(row, out)| {
            let range = offsets[row]..offsets[row + 1];
            *out = cols[range.clone()]
                .iter()
                .zip(&vals[range])
                .map(|(col, val)| *val * x[*col])
                .sum();
        });
}

fn inverse_diagonal(a: &CsrMatrix<Real>) -> DVector<Real> {
    DVector::from_iterator(
        a.nrows(),
        a.row_iter().enumerate().map(|(i, row)| {
            match row.get_entry(i).map(|entry| entry.into_value()) {
                Some(diag) if diag != 0.0 => 1.0 / diag,
                _ => 1.0,
            }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::DenseGrid;
    use crate::laplacian::assemble_screened_laplacian;
    use approx::assert_relative_eq;

    fn rhs(len: usize) -> DVector<Real> {
        DVector::from_fn(len, |i, _| ((i * 7919) % 13) as Real - 6.0)
    }

    #[test]
    fn near_diagonal_system_converges_quickly() {
        let grid = DenseGrid::new(3);
        let a = assemble_screened_laplacian(&grid, 1.0e6);
        let b = rhs(grid.num_nodes());
        let report = ConjugateGradient::default().solve(&a, &b);

        assert!(report.converged);
        assert!(report.iterations <= 5, "{} iterations", report.iterations);
        assert!(report.warning().is_none());
    }

    #[test]
    fn solves_screened_laplacian() {
        let grid = DenseGrid::new(3);
        let a = assemble_screened_laplacian(&grid, 1.0e-5);
        let b = rhs(grid.num_nodes());
        let report = ConjugateGradient::default().solve(&a, &b);
        assert!(report.converged);

        let residual = &b - &a * &report.solution;
        assert!(residual.norm() <= 1.0e-6 * b.norm() * 1.0001);
    }

    #[test]
    fn zero_rhs_gives_zero_solution() {
        let grid = DenseGrid::new(2);
        let a = assemble_screened_laplacian(&grid, 1.0e-5);
        let report = ConjugateGradient::default().solve(&a, &DVector::zeros(grid.num_nodes()));

        assert!(report.converged);
        assert_eq!(report.iterations, 0);
        assert!(report.solution.iter().all(|e| *e == 0.0));
    }

    #[test]
    fn deterministic() {
        let grid = DenseGrid::new(3);
        let a = assemble_screened_laplacian(&grid, 1.0e-5);
        let b = rhs(grid.num_nodes());
        let solver = ConjugateGradient::default();

        assert_eq!(solver.solve(&a, &b), solver.solve(&a, &b));
    }

    #[test]
    fn jacobi_matches_plain() {
        let grid = DenseGrid::new(3);
        let a = assemble_screened_laplacian(&grid, 1.0e-5);
        let b = rhs(grid.num_nodes());
        let plain = ConjugateGradient::default().solve(&a, &b);
        let jacobi = ConjugateGradient {
            preconditioner: Preconditioner::Jacobi,
            ..ConjugateGradient::default()
        }
        .solve(&a, &b);

        assert!(jacobi.converged);
        assert_relative_eq!(plain.solution, jacobi.solution, epsilon = 1.0e-4);
    }

    #[test]
    fn iteration_cap_reports_a_warning() {
        let grid = DenseGrid::new(3);
        let a = assemble_screened_laplacian(&grid, 1.0e-5);
        let b = rhs(grid.num_nodes());
        let report = ConjugateGradient {
            max_iterations: 2,
            ..ConjugateGradient::default()
        }
        .solve(&a, &b);

        assert!(!report.converged);
        assert_eq!(report.iterations, 2);
        assert!(report.solution.iter().all(|e| e.is_finite()));

        let warning = report.warning().unwrap();
        assert_eq!(warning.iterations, 2);
        assert!(warning.relative_residual > 1.0e-6);
        assert!(warning.to_string().contains("2 iterations"));
    }
}
