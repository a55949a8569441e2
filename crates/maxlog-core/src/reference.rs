//! Textbook Max-Log-MAP over the explicit trellis.
//!
//! Wide `i32` arithmetic, no vectors, no saturation and no renormalization.
//! Walks the trellis edge by edge the way the algorithm is usually written
//! down, so it serves as an independent check on the vector kernel. For even
//! a priori values and inputs that never saturate, the two agree exactly.

use crate::trellis::{branch_outputs, next_state, TrellisState, NUM_STATES};
use crate::types::{KernelResult, StageSample};

/// Metric of states a known boundary rules out.
const EXCLUDED: i32 = -1_000_000_000;

fn polarity(bit: u8) -> i32 {
    if bit == 1 {
        1
    } else {
        -1
    }
}

fn boundary(state: TrellisState) -> KernelResult<[i32; NUM_STATES]> {
    Ok(match state.validate()? {
        TrellisState::Known(s) => {
            let mut m = [EXCLUDED; NUM_STATES];
            m[s as usize] = 0;
            m
        }
        TrellisState::Unknown => [0; NUM_STATES],
    })
}

/// Parity part of the branch metric leaving `state` on `bit`.
fn parity_metric(state: u8, bit: u8, z: i32) -> i32 {
    polarity(branch_outputs(state, bit).1) * z
}

/// Full branch metric leaving `state` on `bit`.
fn branch_metric(state: u8, bit: u8, s: StageSample) -> i32 {
    let sys = polarity(bit);
    sys * s.x as i32 + parity_metric(state, bit, s.z as i32) + ((sys * s.le as i32) >> 1)
}

/// Extrinsic LLRs of one block, positive favoring bit 1.
pub fn max_log_map(
    samples: &[StageSample],
    initial: TrellisState,
    terminal: TrellisState,
) -> KernelResult<Vec<i32>> {
    let n = samples.len();
    let mut alpha = vec![[EXCLUDED; NUM_STATES]; n + 1];
    alpha[0] = boundary(initial)?;

    for (k, &sample) in samples.iter().enumerate() {
        for s in 0..NUM_STATES as u8 {
            for bit in 0..2 {
                let next = next_state(s, bit) as usize;
                let m = alpha[k][s as usize] + branch_metric(s, bit, sample);
                alpha[k + 1][next] = alpha[k + 1][next].max(m);
            }
        }
    }

    let mut beta = boundary(terminal)?;
    let mut llr = vec![0; n];
    for k in (0..n).rev() {
        let sample = samples[k];
        let mut best = [i32::MIN; 2];
        let mut prev = [EXCLUDED; NUM_STATES];
        for s in 0..NUM_STATES as u8 {
            for bit in 0..2 {
                let next = next_state(s, bit) as usize;
                let path = alpha[k][s as usize] + parity_metric(s, bit, sample.z as i32) + beta[next];
                best[bit as usize] = best[bit as usize].max(path);
                prev[s as usize] = prev[s as usize].max(beta[next] + branch_metric(s, bit, sample));
            }
        }
        llr[k] = best[1] - best[0];
        beta = prev;
    }
    Ok(llr)
}
