//! Rust NNQS - neural-network quantum states in Rust
//!
//! This crate represents quantum many-body wavefunctions with a restricted
//! Boltzmann machine (RBM) ansatz and optimizes the variational energy by
//! Stochastic Reconfiguration (SR), a natural-gradient method. The three
//! load-bearing pieces are the incrementally updated wavefunction state
//! (`state`), the Markov-chain sampler producing |psi|^2-distributed
//! configurations (`sampling`), and the SR linear-algebra layer (`sr`);
//! `runner` ties them into an optimization loop.

pub mod basis;
pub mod hamiltonian;
pub mod io;
pub mod machine;
pub mod optimizer;
pub mod runner;
pub mod sampling;
pub mod sr;
pub mod state;

// Re-export commonly used types at crate root
pub use basis::{basis_jz, full_basis, to_index, to_sigma};
pub use hamiltonian::{dense_matrix, ground_state_energy, Hamiltonian, Xxz};
pub use io::{load_checkpoint, read_run_config, save_checkpoint, RunConfig};
pub use machine::{get_psi, get_psi_on_basis, Machine, Rbm, RbmScalar};
pub use optimizer::{Adam, Optimizer, Sgd};
pub use runner::{IterationStats, LambdaSchedule, SamplingPlan, SrRunner};
pub use sampling::{
    random_sigma, random_sigma_with_up, sample_chains, ChainStage, LocalSweeper, Sampler,
    SwapSweeper, Sweeper,
};
pub use sr::{cg_solve, CgSolution, LinearOperator, SrError, SrMatExact, SrMatFree};
pub use state::{Snapshot, StateRef, StateValue, StateView};

#[cfg(test)]
mod tests {
    use crate::basis::{full_basis, to_index};
    use crate::hamiltonian::{ground_state_energy, Xxz};
    use crate::machine::{get_psi, Rbm};
    use crate::optimizer::Sgd;
    use crate::runner::SrRunner;
    use crate::sampling::{LocalSweeper, Sampler};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// The empirical visit histogram of a long chain converges to the
    /// exact |psi|^2 distribution on a small system.
    #[test]
    fn test_sampler_stationary_distribution() {
        let mut rng = StdRng::seed_from_u64(100);
        let mut qs = Rbm::<f64>::new(4, 4, true);
        qs.initialize_random(&mut rng, 0.2);

        let psi = get_psi(&qs, true);
        let exact: Vec<f64> = psi.iter().map(|c| c * c).collect();

        let n_sweeps = 40_000;
        let mut sampler = Sampler::new(&qs, LocalSweeper, 4242);
        sampler.randomize_sigma();
        let samples = sampler.sampling(n_sweeps, 500);

        let mut counts = [0usize; 16];
        for snap in &samples {
            counts[to_index(&snap.sigma) as usize] += 1;
        }

        for (v, &count) in counts.iter().enumerate() {
            let empirical = count as f64 / n_sweeps as f64;
            assert!(
                (empirical - exact[v]).abs() < 0.02,
                "state {:04b}: empirical {:.4} vs exact {:.4}",
                v,
                empirical,
                exact[v]
            );
        }
    }

    /// Full optimization run: a real machine on the four-site Heisenberg
    /// ring reaches the exactly diagonalized ground state energy.
    #[test]
    fn test_end_to_end_heisenberg_ground_state() {
        let n = 4;
        let m = 8;
        let mut rng = StdRng::seed_from_u64(1234);
        let mut qs = Rbm::<f64>::new(n, m, true);
        qs.initialize_random(&mut rng, 0.01);

        // Marshall sign rule makes the ground state representable by a
        // positive-amplitude machine.
        let ham = Xxz::new(n, 1.0, 1.0, true);
        let e0 = ground_state_energy(&ham);

        let runner = SrRunner::new()
            .with_lambda(1.0, 0.9, 1e-4)
            .with_max_iter(200);
        let mut opt = Sgd::new(0.05, 0.0);

        let mut energies = Vec::new();
        runner.run_exact(&mut qs, full_basis(n), &ham, &mut opt, |stats| {
            assert!(stats.error.is_none(), "iteration failed: {:?}", stats.error);
            energies.push(stats.energy);
        });
        assert_eq!(energies.len(), 200);

        let window = 20;
        let avg = |slice: &[f64]| slice.iter().sum::<f64>() / slice.len() as f64;
        let first = avg(&energies[..window]);
        let last = avg(&energies[energies.len() - window..]);
        assert!(
            last < first,
            "energy did not decrease: first window {:.6}, last window {:.6}",
            first,
            last
        );
        assert!(
            (last - e0).abs() / e0.abs() < 0.01,
            "final energy {:.6} not within 1% of exact {:.6}",
            last,
            e0
        );
    }
}
