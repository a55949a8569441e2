//! # Max-Log-MAP Trellis Kernel
//!
//! Fixed-point forward/backward recursions for the 8-state recursive
//! systematic constituent code of the LTE turbo code. One call of the
//! forward and backward passes yields the extrinsic LLRs a turbo decoder's
//! iteration loop exchanges between its two constituent decoders.
//!
//! ## Overview
//!
//! - **Vector abstraction** ([`simd`]): 8 x 16-bit lanes, one per trellis
//!   state, with a scalar emulation and SSSE3 / SSE4.1 backends that agree
//!   bit for bit
//! - **Trellis tables** ([`trellis`]): branch polarities and shuffle patterns,
//!   derived at compile time from the generator polynomials
//! - **Recursions** ([`bcjr`]): per-stage forward and backward steps, the
//!   dispatching [`Kernel`] and the whole-block [`MapDecoder`]
//! - **Parity** ([`parity`]): XOR-fold parity used by the table derivation
//!
//! ## Signal Flow
//!
//! ```text
//! (x, z, le)[k] → forward_step → alpha[k+1], gamma[k], norm[k]
//!                                   │
//! beta[k+1] ────→ backward_step ←───┘ → beta[k], llr[k]
//! ```
//!
//! ## Example
//!
//! ```rust
//! use maxlog_core::prelude::*;
//!
//! let mut decoder = MapDecoder::new(Kernel::detect());
//! let block: Vec<StageSample> = (0..64)
//!     .map(|k| StageSample::new(if k % 3 == 0 { 20 } else { -20 }, 8, 0))
//!     .collect();
//! let llr = decoder.decode(&block);
//! assert_eq!(llr.len(), 64);
//! ```

pub mod bcjr;
pub mod config;
pub mod logging;
pub mod parity;
pub mod reference;
pub mod simd;
pub mod trellis;
pub mod types;

pub use bcjr::{Kernel, MapDecoder};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bcjr::{
        a_posteriori, backward_step, forward_step, BranchMetrics, ForwardOutput, Kernel,
        MapDecoder, NormPolicy,
    };
    pub use crate::config::{BackendChoice, KernelConfig};
    pub use crate::simd::{Backend, Scalar, Vector16x8, Vector8x16, VectorBackend};
    pub use crate::trellis::TrellisState;
    pub use crate::types::{KernelError, KernelResult, Metric, StageSample};
}
