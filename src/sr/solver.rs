//! Matrix-free conjugate gradient for the sampled SR system.

use nalgebra::DVector;

use super::SrError;
use crate::machine::RbmScalar;

/// Apply-only view of a Hermitian positive (semi-)definite operator.
///
/// The sampled covariance is consumed through this interface so the solver
/// never needs the dense matrix.
pub trait LinearOperator<T: RbmScalar> {
    fn dim(&self) -> usize;

    fn apply(&self, x: &DVector<T>) -> DVector<T>;
}

/// Converged CG solution.
#[derive(Clone, Debug)]
pub struct CgSolution<T: RbmScalar> {
    pub x: DVector<T>,
    pub iterations: usize,
    /// Final residual norm relative to `|b|`.
    pub residual: f64,
}

/// Solve `A x = b` by conjugate gradient with a fixed relative tolerance
/// and iteration cap. Non-convergence is an error, not a partial answer.
pub fn cg_solve<T, Op>(
    op: &Op,
    b: &DVector<T>,
    tol: f64,
    max_iter: usize,
) -> Result<CgSolution<T>, SrError>
where
    T: RbmScalar,
    Op: LinearOperator<T>,
{
    assert_eq!(b.len(), op.dim(), "right-hand side dimension mismatch");
    let b_norm = b.norm();
    if b_norm == 0.0 {
        return Ok(CgSolution {
            x: DVector::zeros(op.dim()),
            iterations: 0,
            residual: 0.0,
        });
    }

    let mut x = DVector::zeros(op.dim());
    let mut r = b.clone();
    let mut p = r.clone();
    let mut rs = r.norm_squared();

    for it in 0..max_iter {
        let ap = op.apply(&p);
        // p^H A p is real and positive for a Hermitian PD operator.
        let alpha = rs / p.dotc(&ap).real();
        x += &p * T::from_real(alpha);
        r -= ap * T::from_real(alpha);

        let rs_new = r.norm_squared();
        if rs_new.sqrt() <= tol * b_norm {
            return Ok(CgSolution {
                x,
                iterations: it + 1,
                residual: rs_new.sqrt() / b_norm,
            });
        }
        p = &r + p * T::from_real(rs_new / rs);
        rs = rs_new;
    }

    Err(SrError::CgNoConvergence {
        max_iter,
        residual: rs.sqrt() / b_norm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    struct DenseOp {
        a: DMatrix<f64>,
    }

    impl LinearOperator<f64> for DenseOp {
        fn dim(&self) -> usize {
            self.a.nrows()
        }

        fn apply(&self, x: &DVector<f64>) -> DVector<f64> {
            &self.a * x
        }
    }

    fn random_spd(dim: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let m = DMatrix::from_fn(dim, dim, |_, _| rng.gen_range(-1.0..1.0));
        m.transpose() * m + DMatrix::identity(dim, dim)
    }

    #[test]
    fn test_cg_matches_cholesky() {
        let a = random_spd(12, 3);
        let mut rng = StdRng::seed_from_u64(4);
        let b = DVector::from_fn(12, |_, _| rng.gen_range(-1.0..1.0));

        let op = DenseOp { a: a.clone() };
        let sol = cg_solve(&op, &b, 1e-12, 200).unwrap();
        let direct = nalgebra::Cholesky::new(a).unwrap().solve(&b);

        for i in 0..12 {
            assert_relative_eq!(sol.x[i], direct[i], epsilon = 1e-8);
        }
        assert!(sol.residual <= 1e-12);
    }

    #[test]
    fn test_cg_zero_rhs_returns_zero() {
        let op = DenseOp {
            a: random_spd(5, 9),
        };
        let sol = cg_solve(&op, &DVector::zeros(5), 1e-10, 50).unwrap();
        assert_eq!(sol.iterations, 0);
        assert!(sol.x.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_cg_reports_non_convergence() {
        let op = DenseOp {
            a: random_spd(10, 21),
        };
        let mut rng = StdRng::seed_from_u64(22);
        let b = DVector::from_fn(10, |_, _| rng.gen_range(-1.0..1.0));
        // One iteration cannot reach a 1e-14 residual on a random system.
        let res = cg_solve(&op, &b, 1e-14, 1);
        assert!(matches!(res, Err(SrError::CgNoConvergence { .. })));
    }
}
