//! Binary checkpoints of machine parameters.
//!
//! The snapshot is the machine itself (bias flag, sizes, W, a, b in field
//! order) serialized with bincode; construct -> save -> load round-trips
//! to identical parameters.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::machine::{Rbm, RbmScalar};

/// Write a machine snapshot to `path`.
pub fn save_checkpoint<T: RbmScalar, P: AsRef<Path>>(
    machine: &Rbm<T>,
    path: P,
) -> bincode::Result<()> {
    let file = File::create(path)?;
    bincode::serialize_into(BufWriter::new(file), machine)
}

/// Read a machine snapshot back from `path`.
pub fn load_checkpoint<T: RbmScalar, P: AsRef<Path>>(path: P) -> bincode::Result<Rbm<T>> {
    let file = File::open(path)?;
    bincode::deserialize_from(BufReader::new(file))
}
