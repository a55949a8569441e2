//! Backward (beta) recursion and LLR extraction.

use super::BranchMetrics;
use crate::simd::{Vector8x16, VectorBackend};
use crate::trellis::{LLR_GATHER_ONE, LLR_GATHER_ZERO, PARITY_BW};
use crate::types::Metric;

/// Step the backward metrics from stage `k + 1` to stage `k` and return the
/// LLR of the information bit at stage `k`.
///
/// `beta` holds the metrics of stage `k + 1` on entry and those of stage `k`
/// on return. `branch` and `alpha` are the forward pass outputs for stage `k`,
/// `z` its parity sample.
///
/// The LLR is built from `alpha`, the parity contribution and the entry
/// `beta` only:
///
/// ```text
///   llr = max_s(alpha_s - p_s + beta[next(s, 1)]) - max_s(alpha_s + p_s + beta[next(s, 0)])
/// ```
///
/// The systematic and a priori terms are left out, which makes the result the
/// extrinsic value a turbo loop hands to the other constituent decoder. The
/// difference is taken with wrapping arithmetic.
#[inline(always)]
pub fn backward_step<B: VectorBackend>(
    b: B,
    branch: &BranchMetrics,
    z: Metric,
    alpha: &Vector8x16,
    beta: &mut Vector8x16,
    norm: Metric,
) -> Metric {
    let parity = b.signed_apply_sign(b.broadcast(z), PARITY_BW);
    let next = *beta;

    // State s leaves towards s >> 1 (lanes 0..4) and (s >> 1) + 4 (lanes 4..8)
    let upper = b.add_saturating(b.interleave_low(next, next), branch.0);
    let lower = b.sub_saturating(b.interleave_high(next, next), branch.0);
    *beta = b.sub_saturating(b.max_elementwise(upper, lower), b.broadcast(norm));

    let table = next.to_bytes();
    let path_zero = b.add_saturating(
        b.add_saturating(*alpha, parity),
        b.byte_shuffle(table, LLR_GATHER_ZERO).to_lanes(),
    );
    let path_one = b.add_saturating(
        b.sub_saturating(*alpha, parity),
        b.byte_shuffle(table, LLR_GATHER_ONE).to_lanes(),
    );
    b.sub_wrapping(b.max_broadcast(path_one), b.max_broadcast(path_zero)).0[0]
}
