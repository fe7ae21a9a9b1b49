//! Matrix-free SR builder over sampled configurations.
//!
//! From N snapshots it accumulates the centered log-derivative rows
//! `dO_k = O(sigma_k) - <O>` and centered local energies, then exposes
//!
//!   S x = (1/N) dO^H (dO x) + lambda x,
//!   F   = (1/N) dO^H dE
//!
//! without ever materializing the dim x dim covariance. Per-sample work is
//! fork-join parallel; the final accumulation runs in a fixed order so a
//! given sample set always produces the same matrices regardless of the
//! thread count.

use log::warn;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use super::solver::LinearOperator;
use crate::hamiltonian::Hamiltonian;
use crate::machine::{Rbm, RbmScalar};
use crate::state::{Snapshot, StateRef};

/// Relative imaginary weight of the mean local energy above which an
/// intended-Hermitian Hamiltonian is reported as suspicious.
const ELOC_IMAG_TOL: f64 = 1e-8;

pub struct SrMatFree<'a, T: RbmScalar> {
    machine: &'a Rbm<T>,
    o_centered: DMatrix<T>,
    o_mean: DVector<T>,
    e_centered: DVector<T>,
    e_mean: T,
    e_var: f64,
    n_samples: usize,
    shift: f64,
}

impl<'a, T: RbmScalar> SrMatFree<'a, T> {
    pub fn new(machine: &'a Rbm<T>) -> Self {
        let dim = machine.dim();
        Self {
            machine,
            o_centered: DMatrix::zeros(0, dim),
            o_mean: DVector::zeros(dim),
            e_centered: DVector::zeros(0),
            e_mean: T::zero(),
            e_var: 0.0,
            n_samples: 0,
            shift: 0.0,
        }
    }

    /// Build the SR system from one sampling run, weight 1/N per snapshot.
    pub fn construct_from_sampling<H>(&mut self, samples: &[Snapshot<T>], ham: &H)
    where
        H: Hamiltonian + Sync,
    {
        assert!(!samples.is_empty(), "SR construction needs at least one sample");
        let dim = self.machine.dim();
        let n = samples.len();

        let rows: Vec<(DVector<T>, T)> = samples
            .par_iter()
            .map(|snap| {
                let state = StateRef::from_snapshot(self.machine, snap);
                let e_loc = ham.local_energy(&state);
                let o = self.machine.log_deriv(&snap.sigma, &snap.theta);
                (o, e_loc)
            })
            .collect();

        let inv_n = T::from_real(1.0 / n as f64);
        let mut o_mean = DVector::zeros(dim);
        let mut e_mean = T::zero();
        for (o, e) in rows.iter() {
            o_mean += o;
            e_mean += *e;
        }
        o_mean *= inv_n;
        e_mean *= inv_n;

        let o_centered = DMatrix::from_fn(n, dim, |k, i| rows[k].0[i] - o_mean[i]);
        let e_centered = DVector::from_fn(n, |k, _| rows[k].1 - e_mean);
        let e_var = e_centered.iter().map(|e| e.modulus_squared()).sum::<f64>() / n as f64;

        let imag_frac = e_mean.imaginary().abs() / e_mean.modulus().max(f64::MIN_POSITIVE);
        if imag_frac > ELOC_IMAG_TOL {
            warn!(
                "mean local energy has non-negligible imaginary part ({:.3e} relative); \
                 amplitude ratios or basis may be inconsistent",
                imag_frac
            );
        }

        self.o_centered = o_centered;
        self.o_mean = o_mean;
        self.e_centered = e_centered;
        self.e_mean = e_mean;
        self.e_var = e_var;
        self.n_samples = n;
    }

    /// Diagonal regularization added by `apply`.
    pub fn set_shift(&mut self, lambda: f64) {
        self.shift = lambda;
    }

    /// Current variational energy estimate (real part of the mean local
    /// energy).
    pub fn eloc(&self) -> f64 {
        self.e_mean.real()
    }

    /// Mean local energy including any imaginary part.
    pub fn eloc_value(&self) -> T {
        self.e_mean
    }

    /// Imaginary part of the mean local energy; should vanish for a
    /// Hermitian Hamiltonian.
    pub fn eloc_imag(&self) -> f64 {
        self.e_mean.imaginary()
    }

    /// Sample variance of the local energy.
    pub fn eloc_var(&self) -> f64 {
        self.e_var
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Mean log-derivative `<O>`.
    pub fn o_mean(&self) -> &DVector<T> {
        &self.o_mean
    }

    /// Energy gradient `F = <O* E_loc> - <O*><E_loc>`.
    pub fn f(&self) -> DVector<T> {
        assert!(self.n_samples > 0, "SR system not constructed");
        self.o_centered.adjoint() * &self.e_centered * T::from_real(1.0 / self.n_samples as f64)
    }
}

impl<T: RbmScalar> LinearOperator<T> for SrMatFree<'_, T> {
    fn dim(&self) -> usize {
        self.machine.dim()
    }

    fn apply(&self, x: &DVector<T>) -> DVector<T> {
        assert!(self.n_samples > 0, "SR system not constructed");
        let ox = &self.o_centered * x;
        self.o_centered.adjoint() * ox * T::from_real(1.0 / self.n_samples as f64)
            + x * T::from_real(self.shift)
    }
}
