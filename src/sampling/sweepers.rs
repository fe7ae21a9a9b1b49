//! Concrete move-proposal policies.

use rand::Rng;

use super::traits::{metropolis_accept, Sweeper};
use crate::machine::RbmScalar;
use crate::state::{StateValue, StateView};

/// Single-site Metropolis moves: one sweep proposes `n` random site flips.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalSweeper;

impl Sweeper for LocalSweeper {
    fn sweep<T: RbmScalar, R: Rng + ?Sized>(&self, state: &mut StateValue<'_, T>, rng: &mut R) {
        let n = state.machine().num_visible();
        for _ in 0..n {
            let k = rng.gen_range(0..n);
            let log_ratio = state.log_ratio_flip(k);
            if metropolis_accept(rng, log_ratio.real()) {
                state.flip(k);
            }
        }
    }
}

/// Magnetization-conserving swap moves: one sweep proposes `n` exchanges of
/// two anti-aligned spins, keeping the number of up spins fixed.
#[derive(Clone, Copy, Debug, Default)]
pub struct SwapSweeper;

impl Sweeper for SwapSweeper {
    fn sweep<T: RbmScalar, R: Rng + ?Sized>(&self, state: &mut StateValue<'_, T>, rng: &mut R) {
        let n = state.machine().num_visible();
        for _ in 0..n {
            let k = rng.gen_range(0..n);
            let l = rng.gen_range(0..n);
            if state.sigma_at(k) == state.sigma_at(l) {
                continue;
            }
            let log_ratio = state.log_ratio_flip2(k, l);
            if metropolis_accept(rng, log_ratio.real()) {
                state.flip2(k, l);
            }
        }
    }
}
