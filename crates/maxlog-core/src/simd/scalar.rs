//! Scalar emulation of the 128-bit integer primitives.
//!
//! This is the reference semantics for every other backend. Each primitive is
//! a plain loop over the lanes with the same saturation, wrapping and
//! sign-extension rules as the corresponding SSE instruction.

use super::{Vector16x8, Vector8x16, VectorBackend};
use std::cmp::Ordering;

/// Portable backend, always available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scalar;

#[inline(always)]
fn map(a: Vector8x16, f: impl Fn(i16) -> i16) -> Vector8x16 {
    let mut out = [0i16; 8];
    for (o, &x) in out.iter_mut().zip(a.0.iter()) {
        *o = f(x);
    }
    Vector8x16(out)
}

#[inline(always)]
fn zip(a: Vector8x16, b: Vector8x16, f: impl Fn(i16, i16) -> i16) -> Vector8x16 {
    let mut out = [0i16; 8];
    for (o, (&x, &y)) in out.iter_mut().zip(a.0.iter().zip(b.0.iter())) {
        *o = f(x, y);
    }
    Vector8x16(out)
}

#[inline(always)]
const fn selector(imm: i32, j: usize) -> usize {
    ((imm >> (2 * j)) & 3) as usize
}

impl VectorBackend for Scalar {
    const NAME: &'static str = "scalar";

    #[inline(always)]
    fn broadcast(self, value: i16) -> Vector8x16 {
        Vector8x16([value; 8])
    }

    #[inline(always)]
    fn zero(self) -> Vector8x16 {
        Vector8x16([0; 8])
    }

    #[inline(always)]
    fn zero_bytes(self) -> Vector16x8 {
        Vector16x8([0; 16])
    }

    #[inline(always)]
    fn signed_apply_sign(self, a: Vector8x16, pattern: Vector8x16) -> Vector8x16 {
        zip(a, pattern, |x, p| match p.cmp(&0) {
            Ordering::Greater => x,
            Ordering::Less => x.wrapping_neg(),
            Ordering::Equal => 0,
        })
    }

    #[inline(always)]
    fn shift_right_saturating(self, a: Vector8x16, count: u32) -> Vector8x16 {
        if count >= 16 {
            map(a, |x| if x < 0 { -1 } else { 0 })
        } else {
            map(a, |x| x >> count)
        }
    }

    #[inline(always)]
    fn add_saturating(self, a: Vector8x16, b: Vector8x16) -> Vector8x16 {
        zip(a, b, i16::saturating_add)
    }

    #[inline(always)]
    fn sub_saturating(self, a: Vector8x16, b: Vector8x16) -> Vector8x16 {
        zip(a, b, i16::saturating_sub)
    }

    #[inline(always)]
    fn sub_wrapping(self, a: Vector8x16, b: Vector8x16) -> Vector8x16 {
        zip(a, b, i16::wrapping_sub)
    }

    #[inline(always)]
    fn interleave_low(self, a: Vector8x16, b: Vector8x16) -> Vector8x16 {
        let (a, b) = (a.0, b.0);
        Vector8x16([a[0], b[0], a[1], b[1], a[2], b[2], a[3], b[3]])
    }

    #[inline(always)]
    fn interleave_high(self, a: Vector8x16, b: Vector8x16) -> Vector8x16 {
        let (a, b) = (a.0, b.0);
        Vector8x16([a[4], b[4], a[5], b[5], a[6], b[6], a[7], b[7]])
    }

    #[inline(always)]
    fn byte_shuffle(self, table: Vector16x8, indices: Vector16x8) -> Vector16x8 {
        let mut out = [0i8; 16];
        for (o, &idx) in out.iter_mut().zip(indices.0.iter()) {
            *o = if idx < 0 { 0 } else { table.0[(idx & 0x0F) as usize] };
        }
        Vector16x8(out)
    }

    #[inline(always)]
    fn lane0_broadcast(self, a: Vector8x16) -> Vector8x16 {
        Vector8x16([a.0[0]; 8])
    }

    #[inline(always)]
    fn max_elementwise(self, a: Vector8x16, b: Vector8x16) -> Vector8x16 {
        zip(a, b, i16::max)
    }

    #[inline(always)]
    fn horizontal_min_with_index(self, a: Vector8x16) -> (u16, usize) {
        let mut min = a.0[0] as u16;
        let mut index = 0;
        for (i, &x) in a.0.iter().enumerate().skip(1) {
            if (x as u16) < min {
                min = x as u16;
                index = i;
            }
        }
        (min, index)
    }

    #[inline(always)]
    fn lane32_shuffle<const IMM: i32>(self, a: Vector8x16) -> Vector8x16 {
        let mut out = [0i16; 8];
        for j in 0..4 {
            let src = selector(IMM, j);
            out[2 * j] = a.0[2 * src];
            out[2 * j + 1] = a.0[2 * src + 1];
        }
        Vector8x16(out)
    }

    #[inline(always)]
    fn lane16_lo_shuffle<const IMM: i32>(self, a: Vector8x16) -> Vector8x16 {
        let mut out = a.0;
        for j in 0..4 {
            out[j] = a.0[selector(IMM, j)];
        }
        Vector8x16(out)
    }

    #[inline(always)]
    fn lane16_hi_shuffle<const IMM: i32>(self, a: Vector8x16) -> Vector8x16 {
        let mut out = a.0;
        for j in 0..4 {
            out[4 + j] = a.0[4 + selector(IMM, j)];
        }
        Vector8x16(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd::shuffle_mask;

    fn v(lanes: [i16; 8]) -> Vector8x16 {
        Vector8x16::new(lanes)
    }

    #[test]
    fn test_saturating_arithmetic() {
        let b = Scalar;
        let a = v([32767, -32768, 100, -100, 30000, -30000, 0, 1]);
        let c = v([1, -1, 50, -50, 5000, -5000, 0, -1]);
        assert_eq!(
            b.add_saturating(a, c),
            v([32767, -32768, 150, -150, 32767, -32768, 0, 0])
        );
        assert_eq!(
            b.sub_saturating(a, c),
            v([32766, -32767, 50, -50, 25000, -25000, 0, 2])
        );
        // 0 - MIN saturates instead of wrapping back to MIN
        assert_eq!(b.sub_saturating(b.zero(), b.broadcast(i16::MIN)), b.broadcast(i16::MAX));
        assert_eq!(b.sub_wrapping(b.zero(), b.broadcast(i16::MIN)), b.broadcast(i16::MIN));
    }

    #[test]
    fn test_signed_apply_sign() {
        let b = Scalar;
        let a = v([5, 5, 5, -7, -7, -7, i16::MIN, i16::MIN]);
        let p = v([1, -1, 0, 3, -3, 0, -1, 1]);
        assert_eq!(
            b.signed_apply_sign(a, p),
            v([5, -5, 0, -7, 7, 0, i16::MIN, i16::MIN])
        );
    }

    #[test]
    fn test_shift_right() {
        let b = Scalar;
        let a = v([7, -7, 1, -1, 0, i16::MAX, i16::MIN, -2]);
        assert_eq!(
            b.shift_right_saturating(a, 1),
            v([3, -4, 0, -1, 0, 16383, -16384, -1])
        );
        assert_eq!(
            b.shift_right_saturating(a, 16),
            v([0, -1, 0, -1, 0, 0, -1, -1])
        );
        assert_eq!(b.shift_right_saturating(a, 200), b.shift_right_saturating(a, 16));
        assert_eq!(b.shift_right_saturating(a, 0), a);
    }

    #[test]
    fn test_interleave() {
        let b = Scalar;
        let a = v([0, 1, 2, 3, 4, 5, 6, 7]);
        let c = v([10, 11, 12, 13, 14, 15, 16, 17]);
        assert_eq!(b.interleave_low(a, c), v([0, 10, 1, 11, 2, 12, 3, 13]));
        assert_eq!(b.interleave_high(a, c), v([4, 14, 5, 15, 6, 16, 7, 17]));
    }

    #[test]
    fn test_byte_shuffle_negative_index_is_zero() {
        let b = Scalar;
        let mut table = [0i8; 16];
        for (i, t) in table.iter_mut().enumerate() {
            *t = 100 + i as i8;
        }
        let indices = Vector16x8::new([0, 15, 16, 31, -1, -128, 127, 3, 0, 0, 0, 0, 0, 0, 0, 0]);
        let out = b.byte_shuffle(Vector16x8::new(table), indices);
        assert_eq!(&out.0[..8], &[100, 115, 100, 115, 0, 0, 115, 103]);
    }

    #[test]
    fn test_horizontal_min_with_index() {
        let b = Scalar;
        assert_eq!(b.horizontal_min_with_index(v([9, 4, 7, 4, 8, 5, 6, 4])), (4, 1));
        // Compared as unsigned: -1 is 0xFFFF
        assert_eq!(b.horizontal_min_with_index(v([-1, 3, -5, 2, 9, 9, 9, 9])), (2, 3));
        assert_eq!(b.horizontal_min_with_index(b.zero()), (0, 0));
    }

    #[test]
    fn test_max_through_negation() {
        let b = Scalar;
        let a = v([-40, 17, 3, -9000, 250, 249, 250, 0]);
        let ceiling = b.broadcast(i16::MAX);
        let (min, index) = b.horizontal_min_with_index(b.sub_wrapping(ceiling, a));
        assert_eq!(i16::MAX.wrapping_sub(min as i16), 250);
        assert_eq!(index, 4);
    }

    #[test]
    fn test_lane_shuffles() {
        let b = Scalar;
        let a = v([0, 1, 2, 3, 4, 5, 6, 7]);
        let rev = shuffle_mask(0, 1, 2, 3);
        assert_eq!(b.lane32_shuffle::<{ shuffle_mask(0, 1, 2, 3) }>(a), v([6, 7, 4, 5, 2, 3, 0, 1]));
        assert_eq!(b.lane16_lo_shuffle::<{ shuffle_mask(0, 1, 2, 3) }>(a), v([3, 2, 1, 0, 4, 5, 6, 7]));
        assert_eq!(b.lane16_hi_shuffle::<{ shuffle_mask(0, 1, 2, 3) }>(a), v([0, 1, 2, 3, 7, 6, 5, 4]));
        assert_eq!(rev, 0b00_01_10_11);
        assert_eq!(b.lane0_broadcast(a), b.broadcast(0));
    }
}
