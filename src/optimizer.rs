//! Optimizer policies consuming a gradient-like vector.
//!
//! The runner solves the SR system for a natural-gradient direction and
//! hands it to one of these; the optimizer owns whatever internal state
//! (momentum, moment estimates) it needs and returns the actual parameter
//! delta, descent sign included.

use nalgebra::DVector;

use crate::machine::RbmScalar;

/// Gradient-to-update policy. Stateful; depends only on the sequence of
/// calls made so far.
pub trait Optimizer<T: RbmScalar> {
    /// Turn a gradient-like vector into a parameter delta of the same
    /// dimension.
    fn update(&mut self, grad: &DVector<T>) -> DVector<T>;

    /// Human-readable parameter description for logging.
    fn describe(&self) -> String;
}

/// Plain stochastic gradient descent with optional momentum.
#[derive(Clone, Debug)]
pub struct Sgd<T: RbmScalar> {
    eta: f64,
    momentum: f64,
    velocity: Option<DVector<T>>,
}

impl<T: RbmScalar> Sgd<T> {
    pub fn new(eta: f64, momentum: f64) -> Self {
        Self {
            eta,
            momentum,
            velocity: None,
        }
    }
}

impl<T: RbmScalar> Optimizer<T> for Sgd<T> {
    fn update(&mut self, grad: &DVector<T>) -> DVector<T> {
        let v = match self.velocity.take() {
            Some(v) => v * T::from_real(self.momentum) + grad,
            None => grad.clone(),
        };
        let delta = &v * T::from_real(-self.eta);
        self.velocity = Some(v);
        delta
    }

    fn describe(&self) -> String {
        format!("SGD(eta={}, momentum={})", self.eta, self.momentum)
    }
}

/// Adam with bias-corrected first and second moments. The second moment
/// uses `|g|^2`, so the complex variant scales both parts of each
/// component by one real factor.
#[derive(Clone, Debug)]
pub struct Adam<T: RbmScalar> {
    alpha: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    t: i32,
    m: Option<DVector<T>>,
    v: Option<DVector<f64>>,
}

impl<T: RbmScalar> Adam<T> {
    pub fn new(alpha: f64, beta1: f64, beta2: f64, eps: f64) -> Self {
        Self {
            alpha,
            beta1,
            beta2,
            eps,
            t: 0,
            m: None,
            v: None,
        }
    }
}

impl<T: RbmScalar> Default for Adam<T> {
    fn default() -> Self {
        Self::new(0.01, 0.9, 0.999, 1e-8)
    }
}

impl<T: RbmScalar> Optimizer<T> for Adam<T> {
    fn update(&mut self, grad: &DVector<T>) -> DVector<T> {
        let dim = grad.len();
        self.t += 1;

        let m_prev = self.m.take().unwrap_or_else(|| DVector::zeros(dim));
        let v_prev = self.v.take().unwrap_or_else(|| DVector::zeros(dim));
        assert_eq!(m_prev.len(), dim, "gradient dimension changed between calls");

        let m = m_prev * T::from_real(self.beta1) + grad * T::from_real(1.0 - self.beta1);
        let v = DVector::from_fn(dim, |i, _| {
            self.beta2 * v_prev[i] + (1.0 - self.beta2) * grad[i].modulus_squared()
        });

        let m_corr = 1.0 / (1.0 - self.beta1.powi(self.t));
        let v_corr = 1.0 / (1.0 - self.beta2.powi(self.t));
        let delta = DVector::from_fn(dim, |i, _| {
            let denom = (v[i] * v_corr).sqrt() + self.eps;
            m[i] * T::from_real(-self.alpha * m_corr / denom)
        });

        self.m = Some(m);
        self.v = Some(v);
        delta
    }

    fn describe(&self) -> String {
        format!(
            "Adam(alpha={}, beta1={}, beta2={}, eps={})",
            self.alpha, self.beta1, self.beta2, self.eps
        )
    }
}
