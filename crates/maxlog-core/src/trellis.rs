//! LTE Constituent Trellis — Branch Polarities and Shuffle Tables
//!
//! The 8-state recursive systematic convolutional code of the LTE turbo code
//! (3GPP TS 36.212): feedback polynomial `g0 = 13` (octal, `1 + D^2 + D^3`)
//! and feed-forward polynomial `g1 = 15` (octal, `1 + D + D^3`).
//!
//! ## State Labeling
//!
//! ```text
//!   state = s1 << 2 | s2 << 1 | s3        (s1 = most recent register)
//!
//!   a     = u ^ s2 ^ s3                   feedback
//!   p     = a ^ s1 ^ s3                   parity output
//!   next  = a << 2 | state >> 1
//! ```
//!
//! Destination state `i` is fed by states `2 (i mod 4)` and `2 (i mod 4) + 1`;
//! state `s` feeds `s >> 1` and `(s >> 1) + 4`. Output polarities are `+1` for
//! bit 1 and `-1` for bit 0, so a positive sample votes for a one.
//!
//! All tables below are evaluated at compile time from the polynomials. The
//! recursions only ever read them.

use crate::parity::parity;
use crate::simd::{Vector16x8, Vector8x16};
use crate::types::{KernelError, KernelResult, StateIndex};
use serde::{Deserialize, Serialize};

/// Number of trellis states.
pub const NUM_STATES: usize = 8;

/// Feedback generator polynomial (octal 13).
pub const FEEDBACK_POLY: u32 = 0o13;

/// Feed-forward generator polynomial (octal 15).
pub const FEEDFORWARD_POLY: u32 = 0o15;

const REGISTER_MASK: u32 = 0b111;

#[inline]
const fn feedback_bit(state: StateIndex, bit: u8) -> u32 {
    (bit as u32 & 1) ^ parity(state as u32 & FEEDBACK_POLY & REGISTER_MASK)
}

/// State reached from `state` on information bit `bit`.
#[inline]
pub const fn next_state(state: StateIndex, bit: u8) -> StateIndex {
    (((feedback_bit(state, bit) << 2) | (state as u32 >> 1)) & REGISTER_MASK) as StateIndex
}

/// `(systematic, parity)` output bits of the branch leaving `state` on `bit`.
#[inline]
pub const fn branch_outputs(state: StateIndex, bit: u8) -> (u8, u8) {
    let a = feedback_bit(state, bit);
    let p = a ^ parity(state as u32 & FEEDFORWARD_POLY & REGISTER_MASK);
    (bit & 1, p as u8)
}

const fn polarity(bit: u8) -> i16 {
    if bit == 1 {
        1
    } else {
        -1
    }
}

/// The predecessor of `state` whose index has the given low bit, and the
/// information bit on that branch.
const fn predecessor(state: StateIndex, low_bit: u8) -> (StateIndex, u8) {
    let mut s = 0;
    while s < NUM_STATES as u8 {
        let mut u = 0;
        while u < 2 {
            if s & 1 == low_bit && next_state(s, u) == state {
                return (s, u);
            }
            u += 1;
        }
        s += 1;
    }
    panic!("state has no predecessor");
}

const fn forward_polarity(output_parity: bool) -> Vector8x16 {
    let mut out = [0i16; 8];
    let mut i = 0;
    while i < NUM_STATES {
        let (prev, bit) = predecessor(i as StateIndex, 0);
        let (sys, par) = branch_outputs(prev, bit);
        out[i] = polarity(if output_parity { par } else { sys });
        i += 1;
    }
    Vector8x16(out)
}

const fn backward_parity_polarity() -> Vector8x16 {
    let mut out = [0i16; 8];
    let mut i = 0;
    while i < NUM_STATES {
        out[i] = polarity(branch_outputs(i as StateIndex, 0).1);
        i += 1;
    }
    Vector8x16(out)
}

/// Byte-shuffle indices gathering 16-bit lane `lanes[i]` into lane `i`.
const fn gather_bytes(lanes: [u8; 8]) -> Vector16x8 {
    let mut out = [0i8; 16];
    let mut i = 0;
    while i < 8 {
        out[2 * i] = (2 * lanes[i]) as i8;
        out[2 * i + 1] = (2 * lanes[i] + 1) as i8;
        i += 1;
    }
    Vector16x8(out)
}

const fn predecessor_lanes(low_bit: u8) -> [u8; 8] {
    let mut out = [0u8; 8];
    let mut i = 0;
    while i < NUM_STATES {
        out[i] = predecessor(i as StateIndex, low_bit).0;
        i += 1;
    }
    out
}

const fn successor_lanes(bit: u8) -> [u8; 8] {
    let mut out = [0u8; 8];
    let mut i = 0;
    while i < NUM_STATES {
        out[i] = next_state(i as StateIndex, bit);
        i += 1;
    }
    out
}

/// Systematic polarity of the branch from the even predecessor into each state.
pub const SYSTEMATIC_FW: Vector8x16 = forward_polarity(false);

/// Parity polarity of the branch from the even predecessor into each state.
pub const PARITY_FW: Vector8x16 = forward_polarity(true);

/// Parity polarity of the bit-0 branch leaving each state.
pub const PARITY_BW: Vector8x16 = backward_parity_polarity();

/// Gathers the even predecessor of each state from a forward metric vector.
pub const FW_GATHER_EVEN: Vector16x8 = gather_bytes(predecessor_lanes(0));

/// Gathers the odd predecessor of each state.
pub const FW_GATHER_ODD: Vector16x8 = gather_bytes(predecessor_lanes(1));

/// Gathers the bit-0 successor of each state from a backward metric vector.
pub const LLR_GATHER_ZERO: Vector16x8 = gather_bytes(successor_lanes(0));

/// Gathers the bit-1 successor of each state.
pub const LLR_GATHER_ONE: Vector16x8 = gather_bytes(successor_lanes(1));

const _: () = {
    let mut i = 0;
    while i < NUM_STATES {
        // Lower branches repeat the upper ones with inverted polarity
        if i < 4 {
            assert!(SYSTEMATIC_FW.0[i] == -SYSTEMATIC_FW.0[i + 4]);
            assert!(PARITY_FW.0[i] == -PARITY_FW.0[i + 4]);
        }
        let even = FW_GATHER_EVEN.0[2 * i];
        let odd = FW_GATHER_ODD.0[2 * i];
        assert!(even == 4 * (i as i8 % 4) && odd == even + 2);

        let zero = LLR_GATHER_ZERO.0[2 * i];
        let one = LLR_GATHER_ONE.0[2 * i];
        assert!(zero != one && zero % 8 == one % 8);
        assert!(zero >= 0 && zero < 16 && one >= 0 && one < 16);
        i += 1;
    }
};

/// What the decoder knows about the trellis state at a block boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "state", rename_all = "lowercase")]
pub enum TrellisState {
    /// The encoder is known to be in this state.
    Known(StateIndex),
    /// Any state is equally likely.
    Unknown,
}

impl Default for TrellisState {
    fn default() -> Self {
        TrellisState::Known(0)
    }
}

impl TrellisState {
    /// Metric assigned to states ruled out by a known boundary.
    pub const EXCLUDED: i16 = i16::MIN;

    pub fn validate(self) -> KernelResult<Self> {
        match self {
            TrellisState::Known(s) if s as usize >= NUM_STATES => Err(KernelError::InvalidState(s)),
            other => Ok(other),
        }
    }

    /// Boundary path metrics: 0 for admissible states, [`Self::EXCLUDED`] otherwise.
    pub fn metrics(self) -> KernelResult<Vector8x16> {
        match self.validate()? {
            TrellisState::Known(s) => {
                let mut lanes = [Self::EXCLUDED; NUM_STATES];
                lanes[s as usize] = 0;
                Ok(Vector8x16(lanes))
            }
            TrellisState::Unknown => Ok(Vector8x16([0; NUM_STATES])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lanes_of(bytes: Vector16x8) -> [i16; 8] {
        bytes.to_lanes().0.map(|w| {
            let lo = (w & 0xFF) as i16;
            assert_eq!(w >> 8, lo + 1, "byte pair must address one whole lane");
            lo / 2
        })
    }

    #[test]
    fn test_encoder_step() {
        // From state 0 a zero stays put, a one jumps to state 4 with parity 1
        assert_eq!(next_state(0, 0), 0);
        assert_eq!(branch_outputs(0, 0), (0, 0));
        assert_eq!(next_state(0, 1), 4);
        assert_eq!(branch_outputs(0, 1), (1, 1));
        // s3 = 1 feeds back into the register
        assert_eq!(next_state(1, 0), 4);
        assert_eq!(next_state(1, 1), 0);
    }

    #[test]
    fn test_two_edges_per_state() {
        let mut incoming = [0usize; NUM_STATES];
        for s in 0..NUM_STATES as u8 {
            let a = next_state(s, 0);
            let b = next_state(s, 1);
            assert_ne!(a, b);
            incoming[a as usize] += 1;
            incoming[b as usize] += 1;
        }
        assert!(incoming.iter().all(|&n| n == 2));
    }

    #[test]
    fn test_polarity_tables() {
        assert_eq!(SYSTEMATIC_FW.0, [-1, 1, -1, 1, 1, -1, 1, -1]);
        assert_eq!(PARITY_FW.0, [-1, -1, 1, 1, 1, 1, -1, -1]);
        assert_eq!(PARITY_BW, PARITY_FW);
    }

    #[test]
    fn test_gather_tables() {
        assert_eq!(lanes_of(FW_GATHER_EVEN), [0, 2, 4, 6, 0, 2, 4, 6]);
        assert_eq!(lanes_of(FW_GATHER_ODD), [1, 3, 5, 7, 1, 3, 5, 7]);
        assert_eq!(lanes_of(LLR_GATHER_ZERO), [0, 4, 5, 1, 2, 6, 7, 3]);
        assert_eq!(lanes_of(LLR_GATHER_ONE), [4, 0, 1, 5, 6, 2, 3, 7]);
    }

    #[test]
    fn test_gathers_match_connectivity() {
        for i in 0..NUM_STATES {
            let even = lanes_of(FW_GATHER_EVEN)[i] as u8;
            let odd = lanes_of(FW_GATHER_ODD)[i] as u8;
            assert!((0..2).any(|u| next_state(even, u) == i as u8));
            assert!((0..2).any(|u| next_state(odd, u) == i as u8));
        }
    }

    #[test]
    fn test_boundary_metrics() {
        let known = TrellisState::Known(0).metrics().unwrap();
        assert_eq!(known.0[0], 0);
        assert!(known.0[1..].iter().all(|&m| m == i16::MIN));
        assert_eq!(TrellisState::Unknown.metrics().unwrap().0, [0; 8]);
        assert_eq!(
            TrellisState::Known(8).metrics(),
            Err(KernelError::InvalidState(8))
        );
    }

    #[test]
    fn test_trellis_state_serde() {
        let s: TrellisState = serde_yaml::from_str("kind: known\nstate: 3\n").unwrap();
        assert_eq!(s, TrellisState::Known(3));
        let s: TrellisState = serde_yaml::from_str("kind: unknown\n").unwrap();
        assert_eq!(s, TrellisState::Unknown);
    }
}
