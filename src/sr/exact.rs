//! Dense SR builder over an exhaustively enumerated basis.
//!
//! Configurations are weighted by `|psi(sigma)|^2 / sum |psi|^2` instead of
//! sampled; the covariance matrix is materialized since the exact variant
//! only makes sense for small systems anyway. Log-amplitudes are shifted
//! by their maximum real part before exponentiation so the weights never
//! overflow.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::basis::to_sigma;
use crate::hamiltonian::Hamiltonian;
use crate::machine::{Rbm, RbmScalar};
use crate::state::StateRef;

pub struct SrMatExact<'a, T: RbmScalar, H> {
    basis: Vec<u32>,
    ham: &'a H,
    s: DMatrix<T>,
    grad: DVector<T>,
    e_mean: T,
    constructed: bool,
}

impl<'a, T, H> SrMatExact<'a, T, H>
where
    T: RbmScalar,
    H: Hamiltonian + Sync,
{
    /// The basis is fixed for the lifetime of the builder; the machine is
    /// supplied per `construct` call so the builder survives parameter
    /// updates between iterations.
    pub fn new(basis: Vec<u32>, ham: &'a H) -> Self {
        assert!(!basis.is_empty(), "exact SR needs a non-empty basis");
        Self {
            basis,
            ham,
            s: DMatrix::zeros(0, 0),
            grad: DVector::zeros(0),
            e_mean: T::zero(),
            constructed: false,
        }
    }

    /// Rebuild S, F, and the energy from the machine's current parameters.
    pub fn construct(&mut self, machine: &Rbm<T>) {
        let n = machine.num_visible();
        let dim = machine.dim();
        let basis_len = self.basis.len();
        let ham = self.ham;

        let per_state: Vec<(f64, DVector<T>, T)> = self
            .basis
            .par_iter()
            .map(|&v| {
                let sigma = to_sigma(n, v);
                let theta = machine.calc_theta(&sigma);
                let log_c = machine.log_coeff(&sigma, &theta);
                let o = machine.log_deriv(&sigma, &theta);
                let state = StateRef::new(machine, &sigma, &theta);
                let e_loc = ham.local_energy(&state);
                (log_c.real(), o, e_loc)
            })
            .collect();

        let max_log = per_state
            .iter()
            .map(|(lc, _, _)| *lc)
            .fold(f64::NEG_INFINITY, f64::max);

        // |psi|^2 weights, normalized.
        let mut weights: Vec<f64> = per_state
            .iter()
            .map(|(lc, _, _)| (2.0 * (lc - max_log)).exp())
            .collect();
        let norm: f64 = weights.iter().sum();
        for w in weights.iter_mut() {
            *w /= norm;
        }

        let mut o_mean = DVector::zeros(dim);
        let mut e_mean = T::zero();
        for (k, (_, o, e)) in per_state.iter().enumerate() {
            let w = T::from_real(weights[k]);
            o_mean += o * w;
            e_mean += w * *e;
        }

        // Weighted centered rows: S = A^H A and F = A^H e with
        // A[k] = sqrt(w_k) (O_k - <O>), e[k] = sqrt(w_k) (E_k - <E>).
        let a = DMatrix::from_fn(basis_len, dim, |k, i| {
            T::from_real(weights[k].sqrt()) * (per_state[k].1[i] - o_mean[i])
        });
        let e_w = DVector::from_fn(basis_len, |k, _| {
            T::from_real(weights[k].sqrt()) * (per_state[k].2 - e_mean)
        });

        self.s = a.adjoint() * &a;
        self.grad = a.adjoint() * e_w;
        self.e_mean = e_mean;
        self.constructed = true;
    }

    /// Exact variational energy over the basis.
    pub fn eloc(&self) -> f64 {
        assert!(self.constructed, "SR system not constructed");
        self.e_mean.real()
    }

    pub fn eloc_value(&self) -> T {
        assert!(self.constructed, "SR system not constructed");
        self.e_mean
    }

    /// Covariance matrix `S = <O* O^T> - <O*><O^T>` (copy).
    pub fn corr_mat(&self) -> DMatrix<T> {
        assert!(self.constructed, "SR system not constructed");
        self.s.clone()
    }

    /// Energy gradient `F = <O* E_loc> - <O*><E_loc>` (copy).
    pub fn energy_grad(&self) -> DVector<T> {
        assert!(self.constructed, "SR system not constructed");
        self.grad.clone()
    }
}
