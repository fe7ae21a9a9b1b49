//! Iteration loop binding sampling, SR construction, solving, and the
//! optimizer step.
//!
//! Each iteration: sample (or enumerate) -> build S and F -> regularize
//! the diagonal by a decaying lambda schedule -> solve for the natural
//! gradient -> let the optimizer turn it into a parameter delta -> apply.
//! Per-iteration diagnostics go to a caller-supplied callback; numerical
//! failures are reported there too and never retried internally. The loop
//! terminates only at the iteration cap.

use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::Instant;

use log::warn;
use nalgebra::{Cholesky, DVector};

use crate::hamiltonian::Hamiltonian;
use crate::io::save_checkpoint;
use crate::machine::{Rbm, RbmScalar};
use crate::optimizer::Optimizer;
use crate::sampling::{sample_chains, Sweeper};
use crate::sr::{cg_solve, SrError, SrMatExact, SrMatFree};

/// Monotonically decaying diagonal regularization with a floor:
/// `lambda_ll = max(lambda_min, lambda_initial * lambda_decay^ll)`.
#[derive(Clone, Copy, Debug)]
pub struct LambdaSchedule {
    pub initial: f64,
    pub decay: f64,
    pub min: f64,
}

impl LambdaSchedule {
    pub fn new(initial: f64, decay: f64, min: f64) -> Self {
        Self {
            initial,
            decay,
            min,
        }
    }

    pub fn at(&self, iteration: usize) -> f64 {
        (self.initial * self.decay.powi(iteration as i32)).max(self.min)
    }
}

/// Per-iteration diagnostics handed to the caller's callback.
#[derive(Clone, Debug)]
pub struct IterationStats {
    pub iteration: usize,
    /// Current variational energy estimate.
    pub energy: f64,
    /// Norm of the solved natural-gradient direction.
    pub update_norm: f64,
    pub sample_ms: u128,
    pub solve_ms: u128,
    /// Numerical failure of this iteration, if any. When set, the
    /// parameter update was skipped.
    pub error: Option<SrError>,
}

/// Sampling geometry for the sampled runner variant.
#[derive(Clone, Copy, Debug)]
pub struct SamplingPlan {
    pub n_chains: usize,
    pub n_sweeps: usize,
    pub n_therm: usize,
    /// Fixed-magnetization sector, if the sweeper conserves one.
    pub n_up: Option<usize>,
    pub seed: u64,
}

/// SR optimization driver.
pub struct SrRunner {
    lambda: LambdaSchedule,
    max_iter: usize,
    save_per: usize,
    checkpoint_dir: Option<PathBuf>,
    use_cg: bool,
    cg_tol: f64,
    cg_max_iter: usize,
}

impl Default for SrRunner {
    fn default() -> Self {
        Self {
            lambda: LambdaSchedule::new(1.0, 0.9, 1e-4),
            max_iter: 1000,
            save_per: 0,
            checkpoint_dir: None,
            use_cg: true,
            cg_tol: 1e-3,
            cg_max_iter: 1000,
        }
    }
}

impl SrRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lambda(mut self, initial: f64, decay: f64, min: f64) -> Self {
        self.lambda = LambdaSchedule::new(initial, decay, min);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Checkpoint cadence and directory; cadence 0 disables checkpoints.
    pub fn with_checkpoints(mut self, save_per: usize, dir: PathBuf) -> Self {
        self.save_per = save_per;
        self.checkpoint_dir = Some(dir);
        self
    }

    /// Choose between the CG solve of `S v = F` and using `F` directly as
    /// the update direction.
    pub fn with_cg(mut self, use_cg: bool, tol: f64, max_iter: usize) -> Self {
        self.use_cg = use_cg;
        self.cg_tol = tol;
        self.cg_max_iter = max_iter;
        self
    }

    /// Exact variant: enumerate `basis`, build the dense covariance, and
    /// solve with Cholesky each iteration.
    pub fn run_exact<T, H, O, C>(
        &self,
        machine: &mut Rbm<T>,
        basis: Vec<u32>,
        ham: &H,
        opt: &mut O,
        mut callback: C,
    ) where
        T: RbmScalar,
        H: Hamiltonian + Sync,
        O: Optimizer<T>,
        C: FnMut(&IterationStats),
    {
        let dim = machine.dim();
        let mut pending = Vec::new();
        let mut srex = SrMatExact::new(basis, ham);

        for ll in 0..self.max_iter {
            self.maybe_checkpoint(machine, ll, &mut pending);

            let build_start = Instant::now();
            srex.construct(&*machine);
            let energy = srex.eloc();

            let lambda = self.lambda.at(ll);
            let mut s = srex.corr_mat();
            for i in 0..dim {
                s[(i, i)] += T::from_real(lambda);
            }
            let solved = match Cholesky::new(s) {
                Some(chol) => Ok(chol.solve(&srex.energy_grad())),
                None => Err(SrError::NotPositiveDefinite { lambda }),
            };
            let solve_ms = build_start.elapsed().as_millis();

            let stats = self.step(machine, opt, ll, energy, solved, 0, solve_ms);
            callback(&stats);
        }

        Self::drain_checkpoints(pending);
    }

    /// Sampled variant: run independent chains, build the matrix-free SR
    /// system, and solve by CG (or take `F` directly when `use_cg` is
    /// off).
    #[allow(clippy::too_many_arguments)]
    pub fn run_sampled<T, H, S, O, C>(
        &self,
        machine: &mut Rbm<T>,
        ham: &H,
        sweeper: &S,
        plan: SamplingPlan,
        opt: &mut O,
        mut callback: C,
    ) where
        T: RbmScalar,
        H: Hamiltonian + Sync,
        S: Sweeper + Clone + Sync,
        O: Optimizer<T>,
        C: FnMut(&IterationStats),
    {
        let mut pending = Vec::new();

        for ll in 0..self.max_iter {
            self.maybe_checkpoint(machine, ll, &mut pending);

            let iter_seed = plan
                .seed
                .wrapping_add((ll as u64).wrapping_mul(0x2545_f491_4f6c_dd1d));

            let sample_start = Instant::now();
            let samples = sample_chains(
                &*machine,
                sweeper,
                plan.n_chains,
                plan.n_sweeps,
                plan.n_therm,
                plan.n_up,
                iter_seed,
            );
            let sample_ms = sample_start.elapsed().as_millis();

            let solve_start = Instant::now();
            let (energy, solved) = {
                let mut srm = SrMatFree::new(&*machine);
                srm.construct_from_sampling(&samples, ham);
                let energy = srm.eloc();

                let solved = if self.use_cg {
                    srm.set_shift(self.lambda.at(ll));
                    cg_solve(&srm, &srm.f(), self.cg_tol, self.cg_max_iter).map(|sol| sol.x)
                } else {
                    Ok(srm.f())
                };
                (energy, solved)
            };
            let solve_ms = solve_start.elapsed().as_millis();

            let stats = self.step(machine, opt, ll, energy, solved, sample_ms, solve_ms);
            callback(&stats);
        }

        Self::drain_checkpoints(pending);
    }

    /// Apply one solved direction through the optimizer, skipping the
    /// update when the solve failed and flagging NaN parameters after it.
    fn step<T, O>(
        &self,
        machine: &mut Rbm<T>,
        opt: &mut O,
        iteration: usize,
        energy: f64,
        solved: Result<DVector<T>, SrError>,
        sample_ms: u128,
        solve_ms: u128,
    ) -> IterationStats
    where
        T: RbmScalar,
        O: Optimizer<T>,
    {
        let mut stats = IterationStats {
            iteration,
            energy,
            update_norm: 0.0,
            sample_ms,
            solve_ms,
            error: None,
        };
        match solved {
            Ok(v) => {
                stats.update_norm = v.norm();
                let delta = opt.update(&v);
                machine.update_params(&delta);
                if machine.has_nan() {
                    stats.error = Some(SrError::NonFiniteParams { iteration });
                }
            }
            Err(e) => stats.error = Some(e),
        }
        stats
    }

    fn maybe_checkpoint<T: RbmScalar>(
        &self,
        machine: &Rbm<T>,
        iteration: usize,
        pending: &mut Vec<JoinHandle<()>>,
    ) {
        let dir = match &self.checkpoint_dir {
            Some(dir) if self.save_per != 0 && iteration % self.save_per == 0 => dir.clone(),
            _ => return,
        };
        // Fire-and-forget: the write must not block the next iteration's
        // sampling; handles are joined before the run returns.
        let snapshot = machine.clone();
        let path = dir.join(format!("w{:04}.dat", iteration));
        pending.push(std::thread::spawn(move || {
            if let Err(e) = save_checkpoint(&snapshot, &path) {
                warn!("checkpoint write to {} failed: {}", path.display(), e);
            }
        }));
    }

    fn drain_checkpoints(pending: Vec<JoinHandle<()>>) {
        for handle in pending {
            if handle.join().is_err() {
                warn!("checkpoint writer thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::full_basis;
    use crate::hamiltonian::Xxz;
    use crate::optimizer::Sgd;
    use crate::sampling::SwapSweeper;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lambda_schedule_decays_to_floor() {
        let sched = LambdaSchedule::new(1.0, 0.9, 1e-4);
        assert_eq!(sched.at(0), 1.0);
        assert!(sched.at(10) < sched.at(5));
        assert_eq!(sched.at(100_000), 1e-4);
    }

    #[test]
    fn test_exact_runner_invokes_callback_each_iteration() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut qs = Rbm::<f64>::new(4, 4, true);
        qs.initialize_random(&mut rng, 0.01);
        let ham = Xxz::new(4, 1.0, 1.0, true);
        let mut opt = Sgd::new(0.02, 0.0);

        let runner = SrRunner::new().with_max_iter(5);
        let mut seen = Vec::new();
        runner.run_exact(&mut qs, full_basis(4), &ham, &mut opt, |stats| {
            assert!(stats.error.is_none(), "unexpected error: {:?}", stats.error);
            assert!(stats.energy.is_finite());
            seen.push(stats.iteration);
        });
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert!(!qs.has_nan());
    }

    #[test]
    fn test_sampled_runner_smoke() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut qs = Rbm::<f64>::new(4, 4, true);
        qs.initialize_random(&mut rng, 0.01);
        let ham = Xxz::new(4, 1.0, 1.0, true);
        let mut opt = Sgd::new(0.02, 0.0);

        let runner = SrRunner::new().with_max_iter(3).with_cg(true, 1e-3, 500);
        let plan = SamplingPlan {
            n_chains: 2,
            n_sweeps: 200,
            n_therm: 50,
            n_up: Some(2),
            seed: 11,
        };
        let mut count = 0;
        runner.run_sampled(&mut qs, &ham, &SwapSweeper, plan, &mut opt, |stats| {
            assert!(stats.energy.is_finite());
            count += 1;
        });
        assert_eq!(count, 3);
        assert!(!qs.has_nan());
    }

    #[test]
    fn test_checkpoints_written_at_cadence() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut qs = Rbm::<f64>::new(4, 4, true);
        qs.initialize_random(&mut rng, 0.01);
        let ham = Xxz::new(4, 1.0, 1.0, true);
        let mut opt = Sgd::new(0.02, 0.0);

        let dir = tempfile::tempdir().unwrap();
        let runner = SrRunner::new()
            .with_max_iter(5)
            .with_checkpoints(2, dir.path().to_path_buf());
        runner.run_exact(&mut qs, full_basis(4), &ham, &mut opt, |_| {});

        for ll in [0usize, 2, 4] {
            let path = dir.path().join(format!("w{:04}.dat", ll));
            assert!(path.exists(), "missing checkpoint {}", path.display());
            let loaded: Rbm<f64> = crate::io::load_checkpoint(&path).unwrap();
            assert_eq!(loaded.num_visible(), 4);
        }
        assert!(!dir.path().join("w0001.dat").exists());
        assert!(!dir.path().join("w0003.dat").exists());
    }
}
