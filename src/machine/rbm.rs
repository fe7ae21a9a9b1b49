//! Restricted Boltzmann machine ansatz for many-body wavefunctions.
//!
//! The RBM maps a spin configuration `sigma` in {-1,+1}^n to an amplitude
//!
//!   psi(sigma) = exp(a^T sigma) * prod_j cosh(theta_j),
//!   theta = W sigma + b
//!
//! with an m x n weight matrix `W` and optional visible/hidden biases
//! `a`, `b`. The parameter layout used by `get_params`/`log_deriv` is
//! `[W (column-major), a, b]`, biases omitted when disabled.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::traits::{Machine, RbmScalar};
use crate::basis::to_sigma;

/// RBM wavefunction machine over a real or complex scalar type.
// Serde bounds come from RbmScalar itself, not per-field inference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "", deserialize = ""))]
pub struct Rbm<T: RbmScalar> {
    use_bias: bool,
    n: usize,
    m: usize,
    w: DMatrix<T>,
    a: DVector<T>,
    b: DVector<T>,
}

impl<T: RbmScalar> Rbm<T> {
    /// Create a machine with all parameters zero.
    pub fn new(n: usize, m: usize, use_bias: bool) -> Self {
        Self {
            use_bias,
            n,
            m,
            w: DMatrix::zeros(m, n),
            a: DVector::zeros(n),
            b: DVector::zeros(m),
        }
    }

    pub fn num_visible(&self) -> usize {
        self.n
    }

    pub fn num_hidden(&self) -> usize {
        self.m
    }

    pub fn uses_bias(&self) -> bool {
        self.use_bias
    }

    /// Number of variational parameters: `n m + n + m` with biases,
    /// `n m` without.
    pub fn dim(&self) -> usize {
        if self.use_bias {
            self.n * self.m + self.n + self.m
        } else {
            self.n * self.m
        }
    }

    /// Weight entry `W[j, i]` (hidden j, visible i).
    pub fn w_at(&self, j: usize, i: usize) -> T {
        self.w[(j, i)]
    }

    /// Visible bias `a[i]`.
    pub fn a_at(&self, i: usize) -> T {
        self.a[i]
    }

    /// Hidden bias `b[j]`.
    pub fn b_at(&self, j: usize) -> T {
        self.b[j]
    }

    pub fn get_w(&self) -> &DMatrix<T> {
        &self.w
    }

    pub fn get_a(&self) -> &DVector<T> {
        &self.a
    }

    pub fn get_b(&self) -> &DVector<T> {
        &self.b
    }

    pub fn set_w(&mut self, w: DMatrix<T>) {
        assert_eq!(w.nrows(), self.m, "weight matrix row count mismatch");
        assert_eq!(w.ncols(), self.n, "weight matrix column count mismatch");
        self.w = w;
    }

    pub fn set_a(&mut self, a: DVector<T>) {
        assert!(self.use_bias, "visible bias is disabled for this machine");
        assert_eq!(a.len(), self.n, "visible bias length mismatch");
        self.a = a;
    }

    pub fn set_b(&mut self, b: DVector<T>) {
        assert!(self.use_bias, "hidden bias is disabled for this machine");
        assert_eq!(b.len(), self.m, "hidden bias length mismatch");
        self.b = b;
    }

    /// Fill all parameters with normal noise of the given width.
    pub fn initialize_random<R: Rng + ?Sized>(&mut self, rng: &mut R, std_dev: f64) {
        if self.use_bias {
            for i in 0..self.n {
                self.a[i] = T::random_normal(rng, std_dev);
            }
            for j in 0..self.m {
                self.b[j] = T::random_normal(rng, std_dev);
            }
        }
        for i in 0..self.n {
            for j in 0..self.m {
                self.w[(j, i)] = T::random_normal(rng, std_dev);
            }
        }
    }

    /// True when any parameter is NaN or infinite.
    pub fn has_nan(&self) -> bool {
        !self.w.iter().all(|x| x.is_finite())
            || !self.a.iter().all(|x| x.is_finite())
            || !self.b.iter().all(|x| x.is_finite())
    }

    pub fn calc_theta(&self, sigma: &DVector<i32>) -> DVector<T> {
        assert_eq!(sigma.len(), self.n, "configuration length mismatch");
        let s = sigma.map(|x| T::from_real(x as f64));
        &self.w * s + &self.b
    }

    pub fn log_coeff(&self, sigma: &DVector<i32>, theta: &DVector<T>) -> T {
        let mut res = T::zero();
        for (ai, &si) in self.a.iter().zip(sigma.iter()) {
            res += *ai * T::from_real(si as f64);
        }
        for t in theta.iter() {
            res += t.ln_cosh();
        }
        res
    }

    pub fn coeff(&self, sigma: &DVector<i32>, theta: &DVector<T>) -> T {
        let mut s = T::zero();
        for (ai, &si) in self.a.iter().zip(sigma.iter()) {
            s += *ai * T::from_real(si as f64);
        }
        let mut p = s.exp();
        for t in theta.iter() {
            p *= t.cosh();
        }
        p
    }

    pub fn log_deriv(&self, sigma: &DVector<i32>, theta: &DVector<T>) -> DVector<T> {
        assert_eq!(sigma.len(), self.n, "configuration length mismatch");
        assert_eq!(theta.len(), self.m, "effective field length mismatch");
        let mut res = DVector::zeros(self.dim());
        let tanhs = theta.map(|t| t.tanh());
        for i in 0..self.n {
            let si = T::from_real(sigma[i] as f64);
            res.rows_mut(i * self.m, self.m).copy_from(&(&tanhs * si));
        }
        if !self.use_bias {
            return res;
        }
        let nm = self.n * self.m;
        res.rows_mut(nm, self.n)
            .copy_from(&sigma.map(|x| T::from_real(x as f64)));
        res.rows_mut(nm + self.n, self.m).copy_from(&tanhs);
        res
    }

    pub fn get_params(&self) -> DVector<T> {
        let nm = self.n * self.m;
        let mut res = DVector::zeros(self.dim());
        res.rows_mut(0, nm)
            .copy_from(&DVector::from_column_slice(self.w.as_slice()));
        if !self.use_bias {
            return res;
        }
        res.rows_mut(nm, self.n).copy_from(&self.a);
        res.rows_mut(nm + self.n, self.m).copy_from(&self.b);
        res
    }

    pub fn set_params(&mut self, params: &DVector<T>) {
        assert_eq!(params.len(), self.dim(), "parameter vector length mismatch");
        let nm = self.n * self.m;
        self.w
            .as_mut_slice()
            .copy_from_slice(&params.as_slice()[..nm]);
        if !self.use_bias {
            return;
        }
        self.a.copy_from(&params.rows(nm, self.n));
        self.b.copy_from(&params.rows(nm + self.n, self.m));
    }

    pub fn update_params(&mut self, delta: &DVector<T>) {
        assert_eq!(delta.len(), self.dim(), "parameter delta length mismatch");
        let nm = self.n * self.m;
        for (w, d) in self.w.as_mut_slice().iter_mut().zip(&delta.as_slice()[..nm]) {
            *w += *d;
        }
        if !self.use_bias {
            return;
        }
        for (a, d) in self.a.iter_mut().zip(&delta.as_slice()[nm..nm + self.n]) {
            *a += *d;
        }
        for (b, d) in self.b.iter_mut().zip(&delta.as_slice()[nm + self.n..]) {
            *b += *d;
        }
    }
}

impl<T: RbmScalar> Machine for Rbm<T> {
    type Scalar = T;

    fn num_visible(&self) -> usize {
        Rbm::num_visible(self)
    }

    fn num_hidden(&self) -> usize {
        Rbm::num_hidden(self)
    }

    fn dim(&self) -> usize {
        Rbm::dim(self)
    }

    fn calc_theta(&self, sigma: &DVector<i32>) -> DVector<T> {
        Rbm::calc_theta(self, sigma)
    }

    fn log_coeff(&self, sigma: &DVector<i32>, theta: &DVector<T>) -> T {
        Rbm::log_coeff(self, sigma, theta)
    }

    fn coeff(&self, sigma: &DVector<i32>, theta: &DVector<T>) -> T {
        Rbm::coeff(self, sigma, theta)
    }

    fn log_deriv(&self, sigma: &DVector<i32>, theta: &DVector<T>) -> DVector<T> {
        Rbm::log_deriv(self, sigma, theta)
    }

    fn get_params(&self) -> DVector<T> {
        Rbm::get_params(self)
    }

    fn set_params(&mut self, params: &DVector<T>) {
        Rbm::set_params(self, params)
    }

    fn update_params(&mut self, delta: &DVector<T>) {
        Rbm::update_params(self, delta)
    }
}

/// Amplitudes over the full 2^n basis; only sensible for small systems.
pub fn get_psi<M: Machine>(machine: &M, normalize: bool) -> DVector<M::Scalar> {
    let n = machine.num_visible();
    let mut psi = DVector::zeros(1usize << n);
    for v in 0..(1u32 << n) {
        let sigma = to_sigma(n, v);
        let theta = machine.calc_theta(&sigma);
        psi[v as usize] = machine.coeff(&sigma, &theta);
    }
    if normalize {
        psi.normalize_mut();
    }
    psi
}

/// Amplitudes restricted to an explicit basis subset.
pub fn get_psi_on_basis<M: Machine>(
    machine: &M,
    basis: &[u32],
    normalize: bool,
) -> DVector<M::Scalar> {
    let n = machine.num_visible();
    let mut psi = DVector::zeros(basis.len());
    for (k, &v) in basis.iter().enumerate() {
        let sigma = to_sigma(n, v);
        let theta = machine.calc_theta(&sigma);
        psi[k] = machine.coeff(&sigma, &theta);
    }
    if normalize {
        psi.normalize_mut();
    }
    psi
}
