//! Run configuration read from a YAML file.
//!
//! Example:
//!
//! ```yaml
//! n: 12
//! alpha: 3
//! delta: 1.0
//! lambda_initial: 1.0
//! lambda_decay: 0.9
//! lambda_min: 1.0e-4
//! max_iter: 2000
//! save_per: 100
//! n_chains: 16
//! use_cg: true
//! cg_tol: 1.0e-3
//! seed: 42
//! ```

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_lambda_initial() -> f64 {
    1.0
}

fn default_lambda_decay() -> f64 {
    0.9
}

fn default_lambda_min() -> f64 {
    1e-4
}

fn default_save_per() -> usize {
    0
}

fn default_n_chains() -> usize {
    8
}

fn default_cg_tol() -> f64 {
    1e-3
}

fn default_cg_max_iter() -> usize {
    1000
}

fn default_init_std() -> f64 {
    0.01
}

fn default_seed() -> u64 {
    0
}

/// Everything the optimization binary needs; the core library consumes
/// these values, it does not own the file format.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of visible units (lattice sites).
    pub n: usize,
    /// Hidden units per visible unit; m = alpha * n.
    pub alpha: usize,
    #[serde(default = "default_true")]
    pub use_bias: bool,
    /// XXZ anisotropy.
    pub delta: f64,
    #[serde(default = "default_lambda_initial")]
    pub lambda_initial: f64,
    #[serde(default = "default_lambda_decay")]
    pub lambda_decay: f64,
    #[serde(default = "default_lambda_min")]
    pub lambda_min: f64,
    pub max_iter: usize,
    /// Checkpoint cadence in iterations; 0 disables checkpoints.
    #[serde(default = "default_save_per")]
    pub save_per: usize,
    #[serde(default = "default_n_chains")]
    pub n_chains: usize,
    /// Sweeps recorded per chain per iteration; defaults to 2 * dim.
    #[serde(default)]
    pub n_sweeps: Option<usize>,
    /// Thermalization sweeps per chain; defaults to 0.4 * dim.
    #[serde(default)]
    pub n_therm: Option<usize>,
    #[serde(default = "default_true")]
    pub use_cg: bool,
    #[serde(default = "default_cg_tol")]
    pub cg_tol: f64,
    #[serde(default = "default_cg_max_iter")]
    pub cg_max_iter: usize,
    #[serde(default = "default_init_std")]
    pub init_std: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// Read a YAML run configuration.
pub fn read_run_config(filename: &str) -> RunConfig {
    let file = std::fs::File::open(filename).unwrap();
    let reader = std::io::BufReader::new(file);
    serde_yaml::from_reader(reader).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let yaml = "n: 8\nalpha: 2\ndelta: 1.0\nmax_iter: 100\n";
        let cfg: RunConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.n, 8);
        assert_eq!(cfg.alpha, 2);
        assert!(cfg.use_bias);
        assert_eq!(cfg.save_per, 0);
        assert_eq!(cfg.n_chains, 8);
        assert_eq!(cfg.n_sweeps, None);
        assert!(cfg.use_cg);
        assert_eq!(cfg.seed, 0);
    }

    #[test]
    fn test_full_config_round_trip() {
        let cfg = RunConfig {
            n: 12,
            alpha: 3,
            use_bias: false,
            delta: 0.5,
            lambda_initial: 2.0,
            lambda_decay: 0.95,
            lambda_min: 1e-5,
            max_iter: 500,
            save_per: 50,
            n_chains: 4,
            n_sweeps: Some(200),
            n_therm: Some(40),
            use_cg: false,
            cg_tol: 1e-4,
            cg_max_iter: 300,
            init_std: 0.05,
            seed: 7,
        };
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let back: RunConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.n_sweeps, Some(200));
        assert_eq!(back.save_per, 50);
        assert!(!back.use_bias);
        assert!(!back.use_cg);
    }
}
