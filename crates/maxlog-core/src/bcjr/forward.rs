//! Forward (alpha) recursion, one trellis stage at a time.

use super::{BranchMetrics, ForwardOutput};
use crate::simd::{Vector8x16, VectorBackend};
use crate::trellis::{FW_GATHER_EVEN, FW_GATHER_ODD, PARITY_FW, SYSTEMATIC_FW};
use crate::types::StageSample;

/// Advance the forward metrics by one stage.
///
/// ```text
///   gamma_i = sys_i * x + par_i * z + (sys_i * le) >> 1     (saturating)
///   alpha'_i = max(alpha[even_i] + gamma_i, alpha[odd_i] - gamma_i)
///   alpha_next = alpha' - max(alpha')
/// ```
///
/// `gamma` is computed for the branch leaving the even predecessor of each
/// state; the odd predecessor's branch carries the opposite polarity. The
/// returned `norm` is the maximum subtracted from `alpha'`.
#[inline(always)]
pub fn forward_step<B: VectorBackend>(
    b: B,
    alpha_prev: &Vector8x16,
    sample: StageSample,
) -> ForwardOutput {
    let sys = b.signed_apply_sign(b.broadcast(sample.x), SYSTEMATIC_FW);
    let par = b.signed_apply_sign(b.broadcast(sample.z), PARITY_FW);
    let apriori = b.signed_apply_sign(b.broadcast(sample.le), SYSTEMATIC_FW);
    let plus = b.add_saturating(
        b.add_saturating(sys, par),
        b.shift_right_saturating(apriori, 1),
    );
    let minus = b.sub_saturating(b.zero(), plus);

    let table = alpha_prev.to_bytes();
    let from_even = b.byte_shuffle(table, FW_GATHER_EVEN).to_lanes();
    let from_odd = b.byte_shuffle(table, FW_GATHER_ODD).to_lanes();
    let acs = b.max_elementwise(
        b.add_saturating(from_even, plus),
        b.add_saturating(from_odd, minus),
    );

    let peak = b.max_broadcast(acs);
    ForwardOutput {
        // Lanes 0..4 of gamma cover all four distinct upper branches
        branch: BranchMetrics(b.interleave_low(plus, minus)),
        alpha: b.sub_saturating(acs, peak),
        norm: peak.0[0],
    }
}
