//! Heisenberg Ring Exact SR Optimization
//!
//! Optimizes a real RBM on the four-site Heisenberg ring with exact basis
//! enumeration, comparing against the exactly diagonalized ground state.
//!
//! Usage:
//!   cargo run --example heisenberg_exact --release

use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_nnqs::{full_basis, ground_state_energy, Rbm, Sgd, SrRunner, Xxz};

fn main() {
    let n = 4;
    let m = 8;

    println!("Heisenberg Ring Ground State via Exact SR");
    println!("=========================================\n");

    let mut rng = StdRng::seed_from_u64(42);
    let mut qs = Rbm::<f64>::new(n, m, true);
    qs.initialize_random(&mut rng, 0.01);

    // Sign rule makes the ground state positive, which a real RBM needs.
    let ham = Xxz::new(n, 1.0, 1.0, true);
    let e0 = ground_state_energy(&ham);
    println!("Exact ground state energy: {:.6}\n", e0);

    let runner = SrRunner::new()
        .with_lambda(1.0, 0.9, 1e-4)
        .with_max_iter(200);
    let mut opt = Sgd::new(0.05, 0.0);

    let mut last_energy = 0.0;
    runner.run_exact(&mut qs, full_basis(n), &ham, &mut opt, |stats| {
        if stats.iteration % 20 == 0 {
            println!("  iter {:4}  E = {:.6}", stats.iteration, stats.energy);
        }
        last_energy = stats.energy;
    });

    println!("\nFinal energy:     {:.6}", last_energy);
    println!("Relative error:   {:.2e}", (last_energy - e0).abs() / e0.abs());
}
