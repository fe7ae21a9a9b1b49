//! Stochastic Reconfiguration module - natural-gradient linear systems
//! built from sampled or exactly enumerated configurations.

mod exact;
mod mat_free;
mod solver;

use thiserror::Error;

pub use exact::SrMatExact;
pub use mat_free::SrMatFree;
pub use solver::{cg_solve, CgSolution, LinearOperator};

/// Numerical failures of the SR linear-algebra layer.
///
/// These are reported to the caller, never retried internally: it is the
/// caller's decision to abort, adjust the regularization, or continue.
#[derive(Debug, Clone, Error)]
pub enum SrError {
    #[error("regularized covariance matrix is not positive definite (lambda = {lambda:.3e})")]
    NotPositiveDefinite { lambda: f64 },

    #[error(
        "conjugate gradient did not converge within {max_iter} iterations \
         (relative residual {residual:.3e})"
    )]
    CgNoConvergence { max_iter: usize, residual: f64 },

    #[error("machine parameters became non-finite after update at iteration {iteration}")]
    NonFiniteParams { iteration: usize },
}
