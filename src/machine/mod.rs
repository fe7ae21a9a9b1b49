//! Machine module - variational wavefunction machines and scalar types.

mod rbm;
mod traits;

pub use rbm::{get_psi, get_psi_on_basis, Rbm};
pub use traits::{Machine, RbmScalar};
