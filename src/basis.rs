//! Bit-encoded basis enumeration for small spin systems.
//!
//! A configuration of `n` spins is packed into the low `n` bits of a `u32`:
//! bit `i` set means `sigma_i = +1`, cleared means `sigma_i = -1`.

use nalgebra::DVector;

/// Decode a bit-packed basis index into a `{-1,+1}` configuration.
pub fn to_sigma(n: usize, val: u32) -> DVector<i32> {
    DVector::from_fn(n, |i, _| if (val >> i) & 1 == 1 { 1 } else { -1 })
}

/// Encode a `{-1,+1}` configuration back into its basis index.
pub fn to_index(sigma: &DVector<i32>) -> u32 {
    let mut val = 0u32;
    for (i, &s) in sigma.iter().enumerate() {
        if s == 1 {
            val |= 1 << i;
        }
    }
    val
}

/// The full 2^n basis.
pub fn full_basis(n: usize) -> Vec<u32> {
    assert!(n < 32, "full basis enumeration limited to n < 32");
    (0..(1u32 << n)).collect()
}

/// The fixed-magnetization sector with exactly `n_up` up spins.
pub fn basis_jz(n: usize, n_up: usize) -> Vec<u32> {
    assert!(n < 32, "basis enumeration limited to n < 32");
    assert!(n_up <= n, "cannot place {} up spins on {} sites", n_up, n);
    (0..(1u32 << n))
        .filter(|v| v.count_ones() as usize == n_up)
        .collect()
}
