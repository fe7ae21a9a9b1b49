//! Traits and shared pieces for Markov-chain sampling.

use rand::Rng;

use crate::machine::RbmScalar;
use crate::state::StateValue;

/// Lifecycle of one Markov chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChainStage {
    Uninitialized,
    Thermalizing,
    Sampling,
    Done,
}

/// Move-proposal policy driving one Monte Carlo sweep.
///
/// A sweep proposes a machine-size batch of local moves against the state
/// and commits each accepted one. Implementations must only mutate the
/// state through its flip operations.
pub trait Sweeper {
    fn sweep<T: RbmScalar, R: Rng + ?Sized>(&self, state: &mut StateValue<'_, T>, rng: &mut R);
}

/// Metropolis acceptance on `|ratio|^2 = exp(2 Re log_ratio)`, with the
/// probability clamped into [0, 1].
pub fn metropolis_accept<R: Rng + ?Sized>(rng: &mut R, log_ratio_re: f64) -> bool {
    let p = (2.0 * log_ratio_re).exp().clamp(0.0, 1.0);
    rng.gen::<f64>() < p
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_acceptance_clamped_and_always_accepts_uphill() {
        let mut rng = StdRng::seed_from_u64(5);
        // Huge positive log-ratio: probability saturates at one.
        for _ in 0..100 {
            assert!(metropolis_accept(&mut rng, 1e6));
        }
        // Hugely negative: never accepted.
        for _ in 0..100 {
            assert!(!metropolis_accept(&mut rng, -1e6));
        }
    }
}
