//! Incrementally updated wavefunction state for RBM machines.
//!
//! `StateValue` owns a `(sigma, theta)` pair and keeps the cached invariant
//! `theta = W sigma + b` through spin flips at O(m) per flipped site, which
//! is what makes long Metropolis chains affordable. `StateRef` is the
//! read-only counterpart over borrowed data, used when SR construction
//! walks already-recorded snapshots.
//!
//! All amplitude-ratio queries are O(m) and never mutate state; `flip*`
//! are the only mutation entry points.

use nalgebra::{ComplexField, DVector};

use crate::machine::{Rbm, RbmScalar};

/// One immutable `(sigma, theta)` record produced by a sampling run.
#[derive(Clone, Debug)]
pub struct Snapshot<T: RbmScalar> {
    pub sigma: DVector<i32>,
    pub theta: DVector<T>,
}

/// Read-only view shared by owning and borrowing RBM states.
///
/// Provided methods implement the log-amplitude-ratio algebra for one, two,
/// or k simultaneously flipped sites directly from the cached fields.
pub trait StateView {
    type Scalar: RbmScalar;

    fn machine(&self) -> &Rbm<Self::Scalar>;

    fn sigma_at(&self, i: usize) -> i32;

    fn theta_at(&self, j: usize) -> Self::Scalar;

    /// Owned copy of the full configuration.
    fn sigma_vec(&self) -> DVector<i32> {
        DVector::from_fn(self.machine().num_visible(), |i, _| self.sigma_at(i))
    }

    /// `log(psi(sigma with site k flipped) / psi(sigma))`, O(m).
    fn log_ratio_flip(&self, k: usize) -> Self::Scalar {
        let qs = self.machine();
        let sk = Self::Scalar::from_real(self.sigma_at(k) as f64);
        let two = Self::Scalar::from_real(2.0);
        let mut res = -two * qs.a_at(k) * sk;
        for j in 0..qs.num_hidden() {
            let t = self.theta_at(j);
            res += (t - two * sk * qs.w_at(j, k)).ln_cosh() - t.ln_cosh();
        }
        res
    }

    /// `log(psi(sigma with sites k and l flipped) / psi(sigma))`, O(m).
    fn log_ratio_flip2(&self, k: usize, l: usize) -> Self::Scalar {
        let qs = self.machine();
        let sk = Self::Scalar::from_real(self.sigma_at(k) as f64);
        let sl = Self::Scalar::from_real(self.sigma_at(l) as f64);
        let two = Self::Scalar::from_real(2.0);
        let mut res = -two * qs.a_at(k) * sk - two * qs.a_at(l) * sl;
        for j in 0..qs.num_hidden() {
            let t = self.theta_at(j);
            let t2 = t - two * sk * qs.w_at(j, k) - two * sl * qs.w_at(j, l);
            res += t2.ln_cosh() - t.ln_cosh();
        }
        res
    }

    /// Log-ratio for an arbitrary set of simultaneously flipped sites.
    fn log_ratio_flips(&self, sites: &[usize]) -> Self::Scalar {
        let qs = self.machine();
        let two = Self::Scalar::from_real(2.0);
        let mut res = Self::Scalar::from_real(0.0);
        for &k in sites {
            res -= two * qs.a_at(k) * Self::Scalar::from_real(self.sigma_at(k) as f64);
        }
        for j in 0..qs.num_hidden() {
            let t = self.theta_at(j);
            let mut t2 = t;
            for &k in sites {
                t2 -= two * Self::Scalar::from_real(self.sigma_at(k) as f64) * qs.w_at(j, k);
            }
            res += t2.ln_cosh() - t.ln_cosh();
        }
        res
    }

    fn ratio_flip(&self, k: usize) -> Self::Scalar {
        self.log_ratio_flip(k).exp()
    }

    fn ratio_flip2(&self, k: usize, l: usize) -> Self::Scalar {
        self.log_ratio_flip2(k, l).exp()
    }

    fn ratio_flips(&self, sites: &[usize]) -> Self::Scalar {
        self.log_ratio_flips(sites).exp()
    }
}

/// Owning state: one configuration, its effective fields, and the machine
/// they belong to. Flips commit moves and keep `theta` consistent.
pub struct StateValue<'a, T: RbmScalar> {
    machine: &'a Rbm<T>,
    sigma: DVector<i32>,
    theta: DVector<T>,
}

impl<'a, T: RbmScalar> StateValue<'a, T> {
    /// Build from an explicit configuration; computes theta once, O(n m).
    pub fn new(machine: &'a Rbm<T>, sigma: DVector<i32>) -> Self {
        let theta = machine.calc_theta(&sigma);
        Self {
            machine,
            sigma,
            theta,
        }
    }

    /// Replace the configuration and recompute theta from scratch.
    pub fn set_sigma(&mut self, sigma: DVector<i32>) {
        self.theta = self.machine.calc_theta(&sigma);
        self.sigma = sigma;
    }

    /// Commit a single-site flip, updating theta incrementally.
    pub fn flip(&mut self, k: usize) {
        let two_sk = T::from_real(2.0 * self.sigma[k] as f64);
        for j in 0..self.theta.len() {
            self.theta[j] -= two_sk * self.machine.w_at(j, k);
        }
        self.sigma[k] = -self.sigma[k];
    }

    /// Commit a two-site flip.
    pub fn flip2(&mut self, k: usize, l: usize) {
        let two_sk = T::from_real(2.0 * self.sigma[k] as f64);
        let two_sl = T::from_real(2.0 * self.sigma[l] as f64);
        for j in 0..self.theta.len() {
            self.theta[j] -=
                two_sk * self.machine.w_at(j, k) + two_sl * self.machine.w_at(j, l);
        }
        self.sigma[k] = -self.sigma[k];
        self.sigma[l] = -self.sigma[l];
    }

    /// Commit a multi-site flip; theta updates use the pre-flip sigma for
    /// every site, then all flipped entries are negated.
    pub fn flip_multi(&mut self, sites: &[usize]) {
        for &k in sites {
            let two_sk = T::from_real(2.0 * self.sigma[k] as f64);
            for j in 0..self.theta.len() {
                self.theta[j] -= two_sk * self.machine.w_at(j, k);
            }
        }
        for &k in sites {
            self.sigma[k] = -self.sigma[k];
        }
    }

    /// Log-ratio against another state of the same machine, computed from
    /// both cached field vectors. Useful as a drift check of accumulated
    /// incremental updates against a freshly constructed state.
    pub fn log_ratio_state(&self, other: &StateValue<'_, T>) -> T {
        let mut res = T::zero();
        for i in 0..self.sigma.len() {
            res += self.machine.a_at(i)
                * T::from_real((other.sigma[i] - self.sigma[i]) as f64);
        }
        for j in 0..self.theta.len() {
            res += other.theta[j].ln_cosh() - self.theta[j].ln_cosh();
        }
        res
    }

    pub fn get_sigma(&self) -> &DVector<i32> {
        &self.sigma
    }

    pub fn get_theta(&self) -> &DVector<T> {
        &self.theta
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            sigma: self.sigma.clone(),
            theta: self.theta.clone(),
        }
    }
}

impl<T: RbmScalar> StateView for StateValue<'_, T> {
    type Scalar = T;

    fn machine(&self) -> &Rbm<T> {
        self.machine
    }

    fn sigma_at(&self, i: usize) -> i32 {
        self.sigma[i]
    }

    fn theta_at(&self, j: usize) -> T {
        self.theta[j]
    }

    fn sigma_vec(&self) -> DVector<i32> {
        self.sigma.clone()
    }
}

/// Non-owning state view over externally stored `(sigma, theta)` data.
pub struct StateRef<'a, T: RbmScalar> {
    machine: &'a Rbm<T>,
    sigma: &'a DVector<i32>,
    theta: &'a DVector<T>,
}

impl<'a, T: RbmScalar> StateRef<'a, T> {
    pub fn new(machine: &'a Rbm<T>, sigma: &'a DVector<i32>, theta: &'a DVector<T>) -> Self {
        Self {
            machine,
            sigma,
            theta,
        }
    }

    pub fn from_snapshot(machine: &'a Rbm<T>, snapshot: &'a Snapshot<T>) -> Self {
        Self::new(machine, &snapshot.sigma, &snapshot.theta)
    }
}

impl<T: RbmScalar> StateView for StateRef<'_, T> {
    type Scalar = T;

    fn machine(&self) -> &Rbm<T> {
        self.machine
    }

    fn sigma_at(&self, i: usize) -> i32 {
        self.sigma[i]
    }

    fn theta_at(&self, j: usize) -> T {
        self.theta[j]
    }

    fn sigma_vec(&self) -> DVector<i32> {
        self.sigma.clone()
    }
}
