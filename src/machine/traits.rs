//! Scalar and machine traits for variational wavefunction ansätze.
//!
//! `RbmScalar` abstracts over the real and complex parametrizations of the
//! same ansatz, and `Machine` is the capability interface consumed by the
//! SR builders and the runner.

use nalgebra::{ComplexField, DVector};
use num_complex::Complex;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{de::DeserializeOwned, Serialize};

/// Scalar type of a machine: either `f64` or `Complex<f64>`.
///
/// Everything numeric the machines need beyond `ComplexField` lives here:
/// an overflow-safe `ln_cosh` and normal random initialization (the complex
/// variant draws real and imaginary parts independently).
pub trait RbmScalar:
    ComplexField<RealField = f64> + Copy + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Numerically stable `ln(cosh(x))`.
    ///
    /// Uses `|x| + ln(1 + exp(-2|x|)) - ln 2` so large `|x|` never
    /// overflows the intermediate `cosh`.
    fn ln_cosh(self) -> Self;

    /// Draw one scalar from a centered normal distribution.
    fn random_normal<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> Self;
}

impl RbmScalar for f64 {
    fn ln_cosh(self) -> Self {
        let x = self.abs();
        x + (-2.0 * x).exp().ln_1p() - std::f64::consts::LN_2
    }

    fn random_normal<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> Self {
        let nd = Normal::new(0.0, std_dev).unwrap();
        nd.sample(rng)
    }
}

impl RbmScalar for Complex<f64> {
    fn ln_cosh(self) -> Self {
        // cosh is even, so move to the non-negative real half plane first;
        // |exp(-2z)| <= 1 there and nothing overflows. The imaginary part
        // is only defined modulo 2πi, which ratios do not care about.
        let z = if self.re < 0.0 { -self } else { self };
        z + (Complex::new(1.0, 0.0) + (-2.0 * z).exp()).ln()
            - Complex::new(std::f64::consts::LN_2, 0.0)
    }

    fn random_normal<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> Self {
        let nd = Normal::new(0.0, std_dev).unwrap();
        Complex::new(nd.sample(rng), nd.sample(rng))
    }
}

/// Capability interface of a variational machine.
///
/// A machine is a pure function of its parameters: given a configuration it
/// yields (log-)amplitudes and the analytic parameter gradient of the
/// log-amplitude. It carries no per-sample state; cached quantities such as
/// the effective fields live in the state objects instead.
pub trait Machine {
    type Scalar: RbmScalar;

    /// Number of visible units (lattice sites).
    fn num_visible(&self) -> usize;

    /// Number of hidden units.
    fn num_hidden(&self) -> usize;

    /// Number of variational parameters.
    fn dim(&self) -> usize;

    /// Effective fields `theta = W sigma + b`, O(n m).
    fn calc_theta(&self, sigma: &DVector<i32>) -> DVector<Self::Scalar>;

    /// Log-amplitude `a^T sigma + sum_j ln cosh(theta_j)`.
    fn log_coeff(&self, sigma: &DVector<i32>, theta: &DVector<Self::Scalar>) -> Self::Scalar;

    /// Amplitude `exp(a^T sigma) prod_j cosh(theta_j)`; small systems only.
    fn coeff(&self, sigma: &DVector<i32>, theta: &DVector<Self::Scalar>) -> Self::Scalar;

    /// Gradient of `log_coeff` with respect to every parameter.
    fn log_deriv(&self, sigma: &DVector<i32>, theta: &DVector<Self::Scalar>)
        -> DVector<Self::Scalar>;

    /// Flatten all parameters into one vector.
    fn get_params(&self) -> DVector<Self::Scalar>;

    /// Inverse of [`Machine::get_params`].
    fn set_params(&mut self, params: &DVector<Self::Scalar>);

    /// Add a flat delta vector to the parameters in place.
    fn update_params(&mut self, delta: &DVector<Self::Scalar>);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ln_cosh_matches_direct_evaluation() {
        for &x in &[0.0, 0.3, -0.7, 2.5, -4.0] {
            assert_relative_eq!(x.ln_cosh(), x.cosh().ln(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_ln_cosh_large_argument_does_not_overflow() {
        // cosh(500) overflows f64; ln cosh(500) = 500 - ln 2.
        let v = 500.0f64.ln_cosh();
        assert!(v.is_finite());
        assert_relative_eq!(v, 500.0 - std::f64::consts::LN_2, epsilon = 1e-12);

        let w = (-800.0f64).ln_cosh();
        assert!(w.is_finite());
        assert_relative_eq!(w, 800.0 - std::f64::consts::LN_2, epsilon = 1e-12);
    }

    #[test]
    fn test_complex_ln_cosh_consistent_with_cosh() {
        // Branch cuts shift the imaginary part by multiples of 2π, so
        // compare through the exponential map.
        for &(re, im) in &[(0.4, 0.9), (-1.3, 2.1), (3.0, -0.5), (-250.0, 1.0)] {
            let z = Complex::new(re, im);
            let lc = z.ln_cosh();
            assert!(lc.re.is_finite() && lc.im.is_finite());
            if re.abs() < 20.0 {
                let direct = z.cosh();
                let recovered = lc.exp();
                assert_relative_eq!(recovered.re, direct.re, epsilon = 1e-10);
                assert_relative_eq!(recovered.im, direct.im, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_complex_random_normal_has_independent_parts() {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let samples: Vec<Complex<f64>> = (0..2000)
            .map(|_| Complex::random_normal(&mut rng, 1.0))
            .collect();
        let mean_re: f64 = samples.iter().map(|z| z.re).sum::<f64>() / 2000.0;
        let mean_im: f64 = samples.iter().map(|z| z.im).sum::<f64>() / 2000.0;
        assert!(mean_re.abs() < 0.1);
        assert!(mean_im.abs() < 0.1);
        // Real and imaginary draws differ.
        assert!(samples.iter().any(|z| (z.re - z.im).abs() > 1e-6));
    }
}
