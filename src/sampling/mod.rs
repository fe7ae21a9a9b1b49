//! Sampling module - Markov-chain Monte Carlo over machine states.

mod sampler;
mod sweepers;
mod traits;

pub use sampler::{random_sigma, random_sigma_with_up, sample_chains, Sampler};
pub use sweepers::{LocalSweeper, SwapSweeper};
pub use traits::{metropolis_accept, ChainStage, Sweeper};
