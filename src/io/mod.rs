//! IO module - run configuration and parameter checkpoints.

mod checkpoint;
mod config;

pub use checkpoint::{load_checkpoint, save_checkpoint};
pub use config::{read_run_config, RunConfig};
