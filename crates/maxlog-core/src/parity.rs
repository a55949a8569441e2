//! Parity — XOR bit-folding for generator-polynomial taps
//!
//! Word parity used when deriving trellis outputs from a generator polynomial:
//! the output bit of a tap set is the parity of `state & taps`. The functions
//! are `const` so the trellis tables can be built at compile time.
//!
//! ## Example
//!
//! ```rust
//! use maxlog_core::parity::*;
//!
//! assert!(!has_odd_parity(0b11));
//! assert!(has_odd_parity(0b111));
//! assert_eq!(parity(0x8000_0001), 0);
//! ```

/// Returns `true` if `x` has an odd number of set bits.
///
/// Folds the word onto itself with XOR until bit 0 holds the parity of
/// all 32 bits.
#[inline]
pub const fn has_odd_parity(x: u32) -> bool {
    let mut v = x;
    v ^= v >> 16;
    v ^= v >> 8;
    v ^= v >> 4;
    v ^= v >> 2;
    v ^= v >> 1;
    v & 1 == 1
}

/// Returns `true` if `x` has an even number of set bits.
#[inline]
pub const fn has_even_parity(x: u32) -> bool {
    !has_odd_parity(x)
}

/// Parity bit of `x` (1 for odd weight, 0 for even).
#[inline]
pub const fn parity(x: u32) -> u32 {
    has_odd_parity(x) as u32
}
