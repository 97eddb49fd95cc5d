//! Deterministic synthetic arc weights.
//!
//! The binary format stores no weights, so every arc `u -> v` gets
//! `((mix(u) ^ mix(v)) & (WEIGHT - 1)) + 1`. The mixer must stay bit-exact:
//! hierarchies built from the same `.bin` file are compared byte for byte.

/// Number of random bits kept from the mixed endpoints.
pub const WEIGHT_LOG2: u32 = 5;

/// Exclusive upper bound of the masked hash; weights land in `[1, WEIGHT]`.
pub const WEIGHT: u32 = 1 << WEIGHT_LOG2;

/// 32-bit avalanche mixer.
#[must_use]
pub const fn mix(a: u32) -> u32 {
    let mut z = a.wrapping_add(0x6D2B_79F5);
    z = (z ^ (z >> 15)).wrapping_mul(z | 1);
    z ^= z.wrapping_add((z ^ (z >> 7)).wrapping_mul(z | 61));
    z ^ (z >> 14)
}

/// Synthetic weight of the arc `source -> target`.
#[must_use]
pub const fn synthesize(source: u32, target: u32) -> u32 {
    ((mix(source) ^ mix(target)) & (WEIGHT - 1)) + 1
}
