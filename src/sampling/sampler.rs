//! Per-chain Markov sampler and the fork-join multi-chain driver.

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::traits::{ChainStage, Sweeper};
use crate::machine::{Rbm, RbmScalar};
use crate::state::{Snapshot, StateValue};

/// Uniform random configuration in `{-1,+1}^n`.
pub fn random_sigma<R: Rng + ?Sized>(n: usize, rng: &mut R) -> DVector<i32> {
    DVector::from_fn(n, |_, _| if rng.gen_bool(0.5) { 1 } else { -1 })
}

/// Random configuration with exactly `n_up` up spins (fixed-magnetization
/// sector).
pub fn random_sigma_with_up<R: Rng + ?Sized>(n: usize, n_up: usize, rng: &mut R) -> DVector<i32> {
    assert!(n_up <= n, "cannot place {} up spins on {} sites", n_up, n);
    let mut spins: Vec<i32> = (0..n).map(|i| if i < n_up { 1 } else { -1 }).collect();
    spins.shuffle(rng);
    DVector::from_vec(spins)
}

/// One Markov chain over a `StateValue`, driven by a pluggable sweeper.
///
/// The chain owns its random engine, constructed from an explicit seed so
/// runs are reproducible. Lifecycle: `randomize_sigma*` moves the chain to
/// `Thermalizing`; `sampling` thermalizes, records, and finishes in `Done`;
/// a finished chain must be re-randomized before it can sample again.
pub struct Sampler<'a, T: RbmScalar, S: Sweeper> {
    machine: &'a Rbm<T>,
    sweeper: S,
    rng: StdRng,
    seed: u64,
    state: Option<StateValue<'a, T>>,
    stage: ChainStage,
}

impl<'a, T: RbmScalar, S: Sweeper> Sampler<'a, T, S> {
    pub fn new(machine: &'a Rbm<T>, sweeper: S, seed: u64) -> Self {
        Self {
            machine,
            sweeper,
            rng: StdRng::seed_from_u64(seed),
            seed,
            state: None,
            stage: ChainStage::Uninitialized,
        }
    }

    /// Seed this chain's engine was constructed from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stage(&self) -> ChainStage {
        self.stage
    }

    /// Start the chain from a fresh unconstrained random configuration.
    pub fn randomize_sigma(&mut self) {
        let sigma = random_sigma(self.machine.num_visible(), &mut self.rng);
        self.state = Some(StateValue::new(self.machine, sigma));
        self.stage = ChainStage::Thermalizing;
    }

    /// Start the chain in the sector with exactly `n_up` up spins.
    pub fn randomize_sigma_with_up(&mut self, n_up: usize) {
        let sigma = random_sigma_with_up(self.machine.num_visible(), n_up, &mut self.rng);
        self.state = Some(StateValue::new(self.machine, sigma));
        self.stage = ChainStage::Thermalizing;
    }

    /// One full sweep of proposed moves.
    pub fn sweep(&mut self) {
        let state = self
            .state
            .as_mut()
            .expect("sampler swept before randomize_sigma");
        self.sweeper.sweep(state, &mut self.rng);
    }

    /// Thermalize for `n_therm` discarded sweeps, then record one snapshot
    /// after each of `n_sweeps` production sweeps.
    ///
    /// The returned sequence is finite and the chain ends in `Done`; a
    /// fresh call requires a fresh randomization.
    pub fn sampling(&mut self, n_sweeps: usize, n_therm: usize) -> Vec<Snapshot<T>> {
        assert!(
            self.stage == ChainStage::Thermalizing,
            "sampling requires a freshly randomized chain"
        );
        for _ in 0..n_therm {
            self.sweep();
        }
        self.stage = ChainStage::Sampling;

        let mut res = Vec::with_capacity(n_sweeps);
        for _ in 0..n_sweeps {
            self.sweep();
            res.push(self.state.as_ref().unwrap().snapshot());
        }
        self.stage = ChainStage::Done;
        res
    }
}

/// Run `n_chains` independent chains in parallel and concatenate their
/// snapshot sequences in chain order.
///
/// Each chain gets its own engine derived from `base_seed`, mutates only
/// its own state, and shares the machine read-only. Floating-point results
/// are bitwise reproducible for a fixed seed since each chain is
/// sequential and the concatenation order is fixed.
pub fn sample_chains<T, S>(
    machine: &Rbm<T>,
    sweeper: &S,
    n_chains: usize,
    n_sweeps: usize,
    n_therm: usize,
    n_up: Option<usize>,
    base_seed: u64,
) -> Vec<Snapshot<T>>
where
    T: RbmScalar,
    S: Sweeper + Clone + Sync,
{
    let per_chain: Vec<Vec<Snapshot<T>>> = (0..n_chains)
        .into_par_iter()
        .map(|chain| {
            let seed = base_seed.wrapping_add(0x9e37_79b9_7f4a_7c15u64.wrapping_mul(chain as u64 + 1));
            let mut sampler = Sampler::new(machine, sweeper.clone(), seed);
            match n_up {
                Some(k) => sampler.randomize_sigma_with_up(k),
                None => sampler.randomize_sigma(),
            }
            sampler.sampling(n_sweeps, n_therm)
        })
        .collect();
    per_chain.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::sweepers::{LocalSweeper, SwapSweeper};

    fn test_machine(seed: u64) -> Rbm<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut qs = Rbm::new(4, 4, true);
        qs.initialize_random(&mut rng, 0.2);
        qs
    }

    #[test]
    fn test_random_sigma_with_up_counts() {
        let mut rng = StdRng::seed_from_u64(1);
        for n_up in 0..=6 {
            let sigma = random_sigma_with_up(6, n_up, &mut rng);
            assert_eq!(sigma.iter().filter(|&&s| s == 1).count(), n_up);
        }
    }

    #[test]
    fn test_stage_transitions() {
        let qs = test_machine(4);
        let mut sampler = Sampler::new(&qs, LocalSweeper, 11);
        assert_eq!(sampler.stage(), ChainStage::Uninitialized);
        sampler.randomize_sigma();
        assert_eq!(sampler.stage(), ChainStage::Thermalizing);
        let samples = sampler.sampling(10, 5);
        assert_eq!(samples.len(), 10);
        assert_eq!(sampler.stage(), ChainStage::Done);
        // Re-randomizing re-arms the chain.
        sampler.randomize_sigma();
        assert_eq!(sampler.stage(), ChainStage::Thermalizing);
        assert_eq!(sampler.sampling(3, 0).len(), 3);
    }

    #[test]
    #[should_panic(expected = "swept before randomize_sigma")]
    fn test_sweep_before_randomize_panics() {
        let qs = test_machine(4);
        let mut sampler = Sampler::new(&qs, LocalSweeper, 1);
        sampler.sweep();
    }

    #[test]
    #[should_panic(expected = "freshly randomized chain")]
    fn test_sampling_after_done_panics() {
        let qs = test_machine(4);
        let mut sampler = Sampler::new(&qs, LocalSweeper, 1);
        sampler.randomize_sigma();
        let _ = sampler.sampling(2, 0);
        let _ = sampler.sampling(2, 0);
    }

    #[test]
    fn test_same_seed_reproduces_chain() {
        let qs = test_machine(9);
        let mut s1 = Sampler::new(&qs, LocalSweeper, 123);
        let mut s2 = Sampler::new(&qs, LocalSweeper, 123);
        s1.randomize_sigma();
        s2.randomize_sigma();
        let r1 = s1.sampling(20, 10);
        let r2 = s2.sampling(20, 10);
        for (a, b) in r1.iter().zip(r2.iter()) {
            assert_eq!(a.sigma, b.sigma);
        }
    }

    #[test]
    fn test_sample_chains_concatenates_all_chains() {
        let qs = test_machine(15);
        let samples = sample_chains(&qs, &SwapSweeper, 3, 25, 10, Some(2), 77);
        assert_eq!(samples.len(), 3 * 25);
        // Sector constraint survives the whole run.
        for snap in &samples {
            assert_eq!(snap.sigma.iter().filter(|&&s| s == 1).count(), 2);
        }
    }
}
