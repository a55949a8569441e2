//! SSSE3 / SSE4.1 backends.
//!
//! Both share one implementation parameterized by whether `minpos`
//! (`_mm_minpos_epu16`, SSE4.1) is available. Without it, the min-with-index
//! primitive falls back to the scalar scan and the horizontal maximum uses the
//! shuffle reduction instead.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::{max_broadcast_by_min_pos, max_broadcast_by_shuffle, Scalar};
use super::{Vector16x8, Vector8x16, VectorBackend};

/// x86 capability token. `SSE41` selects the `minpos` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct X86<const SSE41: bool> {
    _private: (),
}

/// SSSE3 without `minpos`.
pub type Ssse3 = X86<false>;

/// SSSE3 with SSE4.1 `minpos`.
pub type Sse41 = X86<true>;

impl<const SSE41: bool> X86<SSE41> {
    /// Returns a token if the current CPU supports the required features.
    pub fn new() -> Option<Self> {
        let ssse3 = is_x86_feature_detected!("ssse3");
        let sse41 = !SSE41 || is_x86_feature_detected!("sse4.1");
        (ssse3 && sse41).then_some(Self { _private: () })
    }

    /// # Safety
    ///
    /// The CPU must support SSSE3, and SSE4.1 when `SSE41` is set.
    #[inline(always)]
    pub unsafe fn new_unchecked() -> Self {
        Self { _private: () }
    }
}

#[inline(always)]
fn load(v: Vector8x16) -> __m128i {
    // SAFETY: Vector8x16 is 16-byte aligned and 16 bytes long
    unsafe { _mm_load_si128(v.0.as_ptr() as *const __m128i) }
}

#[inline(always)]
fn load_bytes(v: Vector16x8) -> __m128i {
    // SAFETY: Vector16x8 is 16-byte aligned and 16 bytes long
    unsafe { _mm_load_si128(v.0.as_ptr() as *const __m128i) }
}

#[inline(always)]
fn store(r: __m128i) -> Vector8x16 {
    let mut out = Vector8x16::default();
    // SAFETY: as for `load`
    unsafe { _mm_store_si128(out.0.as_mut_ptr() as *mut __m128i, r) };
    out
}

#[inline(always)]
fn store_bytes(r: __m128i) -> Vector16x8 {
    let mut out = Vector16x8::default();
    // SAFETY: as for `load_bytes`
    unsafe { _mm_store_si128(out.0.as_mut_ptr() as *mut __m128i, r) };
    out
}

// SAFETY (all methods): a token only exists after `new` confirmed SSSE3 (and
// SSE4.1 for `Sse41`), or the caller of `new_unchecked` vouched for it. SSE2 is
// implied by SSSE3.
impl<const SSE41: bool> VectorBackend for X86<SSE41> {
    const NAME: &'static str = if SSE41 { "sse41" } else { "ssse3" };

    #[inline(always)]
    fn broadcast(self, value: i16) -> Vector8x16 {
        store(unsafe { _mm_set1_epi16(value) })
    }

    #[inline(always)]
    fn zero(self) -> Vector8x16 {
        store(unsafe { _mm_setzero_si128() })
    }

    #[inline(always)]
    fn zero_bytes(self) -> Vector16x8 {
        store_bytes(unsafe { _mm_setzero_si128() })
    }

    #[inline(always)]
    fn signed_apply_sign(self, a: Vector8x16, pattern: Vector8x16) -> Vector8x16 {
        store(unsafe { _mm_sign_epi16(load(a), load(pattern)) })
    }

    #[inline(always)]
    fn shift_right_saturating(self, a: Vector8x16, count: u32) -> Vector8x16 {
        // The count register is read as an unsigned 64-bit value
        store(unsafe { _mm_sra_epi16(load(a), _mm_cvtsi32_si128(count as i32)) })
    }

    #[inline(always)]
    fn add_saturating(self, a: Vector8x16, b: Vector8x16) -> Vector8x16 {
        store(unsafe { _mm_adds_epi16(load(a), load(b)) })
    }

    #[inline(always)]
    fn sub_saturating(self, a: Vector8x16, b: Vector8x16) -> Vector8x16 {
        store(unsafe { _mm_subs_epi16(load(a), load(b)) })
    }

    #[inline(always)]
    fn sub_wrapping(self, a: Vector8x16, b: Vector8x16) -> Vector8x16 {
        store(unsafe { _mm_sub_epi16(load(a), load(b)) })
    }

    #[inline(always)]
    fn interleave_low(self, a: Vector8x16, b: Vector8x16) -> Vector8x16 {
        store(unsafe { _mm_unpacklo_epi16(load(a), load(b)) })
    }

    #[inline(always)]
    fn interleave_high(self, a: Vector8x16, b: Vector8x16) -> Vector8x16 {
        store(unsafe { _mm_unpackhi_epi16(load(a), load(b)) })
    }

    #[inline(always)]
    fn byte_shuffle(self, table: Vector16x8, indices: Vector16x8) -> Vector16x8 {
        store_bytes(unsafe { _mm_shuffle_epi8(load_bytes(table), load_bytes(indices)) })
    }

    #[inline(always)]
    fn lane0_broadcast(self, a: Vector8x16) -> Vector8x16 {
        store(unsafe {
            let m = load(a);
            let m = _mm_unpacklo_epi16(m, m);
            let m = _mm_unpacklo_epi32(m, m);
            _mm_unpacklo_epi64(m, m)
        })
    }

    #[inline(always)]
    fn max_elementwise(self, a: Vector8x16, b: Vector8x16) -> Vector8x16 {
        store(unsafe { _mm_max_epi16(load(a), load(b)) })
    }

    #[inline(always)]
    fn horizontal_min_with_index(self, a: Vector8x16) -> (u16, usize) {
        if SSE41 {
            unsafe {
                let r = _mm_minpos_epu16(load(a));
                (
                    _mm_extract_epi16::<0>(r) as u16,
                    (_mm_extract_epi16::<1>(r) & 7) as usize,
                )
            }
        } else {
            Scalar.horizontal_min_with_index(a)
        }
    }

    #[inline(always)]
    fn lane32_shuffle<const IMM: i32>(self, a: Vector8x16) -> Vector8x16 {
        store(unsafe { _mm_shuffle_epi32::<IMM>(load(a)) })
    }

    #[inline(always)]
    fn lane16_lo_shuffle<const IMM: i32>(self, a: Vector8x16) -> Vector8x16 {
        store(unsafe { _mm_shufflelo_epi16::<IMM>(load(a)) })
    }

    #[inline(always)]
    fn lane16_hi_shuffle<const IMM: i32>(self, a: Vector8x16) -> Vector8x16 {
        store(unsafe { _mm_shufflehi_epi16::<IMM>(load(a)) })
    }

    #[inline(always)]
    fn max_broadcast(self, a: Vector8x16) -> Vector8x16 {
        if SSE41 {
            max_broadcast_by_min_pos(self, a)
        } else {
            max_broadcast_by_shuffle(self, a)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::{shuffle_mask, FOLD_HALVES, FOLD_PAIR};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const EDGES: [i16; 9] = [i16::MIN, i16::MIN + 1, -16384, -2, -1, 0, 1, 16384, i16::MAX];

    fn random_vector(rng: &mut StdRng) -> Vector8x16 {
        let mut lanes = [0i16; 8];
        for l in lanes.iter_mut() {
            *l = if rng.gen_bool(0.3) {
                EDGES[rng.gen_range(0..EDGES.len())]
            } else {
                rng.gen()
            };
        }
        Vector8x16::new(lanes)
    }

    fn random_indices(rng: &mut StdRng) -> Vector16x8 {
        let mut lanes = [0i8; 16];
        for l in lanes.iter_mut() {
            *l = rng.gen();
        }
        Vector16x8::new(lanes)
    }

    fn check_against_scalar<B: VectorBackend>(hw: B) {
        let s = Scalar;
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..2000 {
            let a = random_vector(&mut rng);
            let b = random_vector(&mut rng);
            let value: i16 = rng.gen();
            let count = if rng.gen_bool(0.2) { rng.gen_range(16..64) } else { rng.gen_range(0..16) };

            assert_eq!(hw.broadcast(value), s.broadcast(value));
            assert_eq!(hw.signed_apply_sign(a, b), s.signed_apply_sign(a, b));
            assert_eq!(hw.shift_right_saturating(a, count), s.shift_right_saturating(a, count));
            assert_eq!(hw.add_saturating(a, b), s.add_saturating(a, b));
            assert_eq!(hw.sub_saturating(a, b), s.sub_saturating(a, b));
            assert_eq!(hw.sub_wrapping(a, b), s.sub_wrapping(a, b));
            assert_eq!(hw.interleave_low(a, b), s.interleave_low(a, b));
            assert_eq!(hw.interleave_high(a, b), s.interleave_high(a, b));
            assert_eq!(hw.lane0_broadcast(a), s.lane0_broadcast(a));
            assert_eq!(hw.max_elementwise(a, b), s.max_elementwise(a, b));
            assert_eq!(hw.horizontal_min_with_index(a), s.horizontal_min_with_index(a));
            assert_eq!(hw.max_broadcast(a), s.max_broadcast(a));
            assert_eq!(hw.lane32_shuffle::<FOLD_HALVES>(a), s.lane32_shuffle::<FOLD_HALVES>(a));
            assert_eq!(hw.lane16_lo_shuffle::<FOLD_PAIR>(a), s.lane16_lo_shuffle::<FOLD_PAIR>(a));
            assert_eq!(
                hw.lane16_hi_shuffle::<{ shuffle_mask(1, 3, 0, 2) }>(a),
                s.lane16_hi_shuffle::<{ shuffle_mask(1, 3, 0, 2) }>(a)
            );

            let table = a.to_bytes();
            let indices = random_indices(&mut rng);
            assert_eq!(hw.byte_shuffle(table, indices), s.byte_shuffle(table, indices));
        }
        assert_eq!(hw.zero(), s.zero());
        assert_eq!(hw.zero_bytes(), s.zero_bytes());
    }

    #[test]
    fn test_ssse3_matches_scalar() {
        match Ssse3::new() {
            Some(hw) => check_against_scalar(hw),
            None => eprintln!("SSSE3 not available, skipping"),
        }
    }

    #[test]
    fn test_sse41_matches_scalar() {
        match Sse41::new() {
            Some(hw) => check_against_scalar(hw),
            None => eprintln!("SSE4.1 not available, skipping"),
        }
    }

    #[test]
    fn test_saturation_boundaries() {
        let Some(hw) = Ssse3::new() else { return };
        let max = hw.broadcast(i16::MAX);
        let min = hw.broadcast(i16::MIN);
        assert_eq!(hw.add_saturating(max, hw.broadcast(1)), max);
        assert_eq!(hw.sub_saturating(min, hw.broadcast(1)), min);
        assert_eq!(hw.sub_saturating(hw.zero(), min), max);
        assert_eq!(hw.signed_apply_sign(min, hw.broadcast(-1)), min);
    }

    #[test]
    fn test_names() {
        assert_eq!(Ssse3::NAME, "ssse3");
        assert_eq!(Sse41::NAME, "sse41");
    }
}
