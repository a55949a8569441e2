//! Vector Arithmetic Abstraction
//!
//! The trellis recursions are written once, against the [`VectorBackend`]
//! trait, and run on any of its implementations:
//!
//! | Backend   | Target          | Horizontal max          | Status      |
//! |-----------|-----------------|-------------------------|-------------|
//! | `Scalar`  | any             | min-with-index trick    | Reference   |
//! | `Ssse3`   | x86 / x86_64    | shuffle reduction       | Implemented |
//! | `Sse41`   | x86 / x86_64    | `minpos` trick          | Implemented |
//!
//! The scalar emulation defines the semantics. Hardware backends must match it
//! lane for lane on every input, saturation and sign-extension included.
//!
//! ## Capability tokens
//!
//! Backends are zero-sized tokens and every primitive takes `self`. A hardware
//! token can only be obtained through a constructor that has verified the CPU
//! features at run time, so holding one is proof that its intrinsics are safe
//! to execute.
//!
//! ```rust
//! use maxlog_core::simd::{Scalar, VectorBackend, Vector8x16};
//!
//! let b = Scalar;
//! let a = Vector8x16::new([32000, -5, 0, 1, 2, 3, 4, 5]);
//! let sum = b.add_saturating(a, b.broadcast(1000));
//! assert_eq!(sum.0[0], i16::MAX);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod scalar;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod x86;

pub use scalar::Scalar;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use x86::{Sse41, Ssse3, X86};

/// Eight signed 16-bit lanes, one per trellis state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(C, align(16))]
pub struct Vector8x16(pub [i16; 8]);

/// Sixteen signed 8-bit lanes, used for byte shuffles and their indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(C, align(16))]
pub struct Vector16x8(pub [i8; 16]);

impl Vector8x16 {
    pub const LANES: usize = 8;

    pub const fn new(lanes: [i16; 8]) -> Self {
        Self(lanes)
    }

    /// Reinterpret as bytes, lane `i` occupying bytes `2i` (low) and `2i + 1`.
    pub const fn to_bytes(self) -> Vector16x8 {
        let mut out = [0i8; 16];
        let mut i = 0;
        while i < 8 {
            let b = self.0[i].to_le_bytes();
            out[2 * i] = b[0] as i8;
            out[2 * i + 1] = b[1] as i8;
            i += 1;
        }
        Vector16x8(out)
    }
}

impl Vector16x8 {
    pub const LANES: usize = 16;

    pub const fn new(lanes: [i8; 16]) -> Self {
        Self(lanes)
    }

    /// Reinterpret pairs of bytes as little-endian 16-bit lanes.
    pub const fn to_lanes(self) -> Vector8x16 {
        let mut out = [0i16; 8];
        let mut i = 0;
        while i < 8 {
            out[i] = i16::from_le_bytes([self.0[2 * i] as u8, self.0[2 * i + 1] as u8]);
            i += 1;
        }
        Vector8x16(out)
    }
}

/// Build a 4-way shuffle immediate, highest destination first (as `_MM_SHUFFLE`).
pub const fn shuffle_mask(d: u8, c: u8, b: u8, a: u8) -> i32 {
    (((d as u32 & 3) << 6) | ((c as u32 & 3) << 4) | ((b as u32 & 3) << 2) | (a as u32 & 3)) as i32
}

/// Lanes (or 32-bit groups) `[2, 3, 0, 0]`.
pub const FOLD_HALVES: i32 = shuffle_mask(0, 0, 3, 2);
/// Lanes `[1, 0, 0, 0]`.
pub const FOLD_PAIR: i32 = shuffle_mask(0, 0, 0, 1);

/// The closed set of primitives the recursions are written against.
pub trait VectorBackend: Copy + fmt::Debug + Send + Sync {
    /// Short name for logs and configuration.
    const NAME: &'static str;

    /// All lanes set to `value`.
    fn broadcast(self, value: i16) -> Vector8x16;

    fn zero(self) -> Vector8x16;

    fn zero_bytes(self) -> Vector16x8;

    /// Lane `i` is `a[i]`, `-a[i]` or 0 as `pattern[i]` is positive, negative or zero.
    /// Negating `i16::MIN` wraps.
    fn signed_apply_sign(self, a: Vector8x16, pattern: Vector8x16) -> Vector8x16;

    /// Arithmetic shift right; counts of 16 or more fill each lane with its sign.
    fn shift_right_saturating(self, a: Vector8x16, count: u32) -> Vector8x16;

    fn add_saturating(self, a: Vector8x16, b: Vector8x16) -> Vector8x16;

    fn sub_saturating(self, a: Vector8x16, b: Vector8x16) -> Vector8x16;

    fn sub_wrapping(self, a: Vector8x16, b: Vector8x16) -> Vector8x16;

    /// `[a0, b0, a1, b1, a2, b2, a3, b3]`
    fn interleave_low(self, a: Vector8x16, b: Vector8x16) -> Vector8x16;

    /// `[a4, b4, a5, b5, a6, b6, a7, b7]`
    fn interleave_high(self, a: Vector8x16, b: Vector8x16) -> Vector8x16;

    /// Lane `i` is `table[indices[i] & 15]`, or 0 when `indices[i]` is negative.
    fn byte_shuffle(self, table: Vector16x8, indices: Vector16x8) -> Vector16x8;

    /// Every lane set to `a[0]`.
    fn lane0_broadcast(self, a: Vector8x16) -> Vector8x16;

    fn max_elementwise(self, a: Vector8x16, b: Vector8x16) -> Vector8x16;

    /// Smallest lane, compared as unsigned, and its index (lowest index on ties).
    fn horizontal_min_with_index(self, a: Vector8x16) -> (u16, usize);

    /// Permute the four 32-bit groups; destination `j` takes group `(IMM >> 2j) & 3`.
    fn lane32_shuffle<const IMM: i32>(self, a: Vector8x16) -> Vector8x16;

    /// Permute lanes 0..4, leaving lanes 4..8 untouched.
    fn lane16_lo_shuffle<const IMM: i32>(self, a: Vector8x16) -> Vector8x16;

    /// Permute lanes 4..8, leaving lanes 0..4 untouched.
    fn lane16_hi_shuffle<const IMM: i32>(self, a: Vector8x16) -> Vector8x16;

    /// Horizontal maximum, placed in every lane.
    #[inline(always)]
    fn max_broadcast(self, a: Vector8x16) -> Vector8x16 {
        max_broadcast_by_min_pos(self, a)
    }
}

/// Horizontal maximum through the unsigned minimum: `i16::MAX - a` maps the
/// signed range onto `0..=u16::MAX` in reverse order.
#[inline(always)]
pub fn max_broadcast_by_min_pos<B: VectorBackend>(b: B, a: Vector8x16) -> Vector8x16 {
    let ceiling = b.broadcast(i16::MAX);
    let (min, _) = b.horizontal_min_with_index(b.sub_wrapping(ceiling, a));
    b.broadcast(i16::MAX.wrapping_sub(min as i16))
}

/// Horizontal maximum by folding halves with shuffles, for targets without a
/// min-position instruction.
#[inline(always)]
pub fn max_broadcast_by_shuffle<B: VectorBackend>(b: B, a: Vector8x16) -> Vector8x16 {
    let m = b.max_elementwise(a, b.lane32_shuffle::<FOLD_HALVES>(a));
    let m = b.max_elementwise(m, b.lane16_lo_shuffle::<FOLD_HALVES>(m));
    let m = b.max_elementwise(m, b.lane16_lo_shuffle::<FOLD_PAIR>(m));
    b.lane0_broadcast(m)
}

/// Backend selector, resolved to a token at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Portable scalar emulation.
    Scalar,
    /// SSSE3 intrinsics.
    Ssse3,
    /// SSSE3 plus SSE4.1 `minpos`.
    Sse41,
}

impl Backend {
    /// Every backend, fastest last.
    pub const ALL: [Backend; 3] = [Backend::Scalar, Backend::Ssse3, Backend::Sse41];

    /// Detect the best backend supported by the current CPU.
    pub fn detect() -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|b| b.is_available())
            .unwrap_or(Backend::Scalar)
    }

    /// Whether the current CPU can run this backend.
    pub fn is_available(self) -> bool {
        match self {
            Backend::Scalar => true,
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Ssse3 => Ssse3::new().is_some(),
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Sse41 => Sse41::new().is_some(),
            #[allow(unreachable_patterns)]
            _ => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Scalar => "scalar",
            Backend::Ssse3 => "ssse3",
            Backend::Sse41 => "sse41",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
