//! Core types for the Max-Log-MAP kernel
//!
//! This module defines the scalar and stage types shared by the forward and
//! backward recursions, together with the error type used by the fallible
//! block-level and configuration surfaces.
//!
//! ## Fixed-Point Convention
//!
//! Every metric is a signed 16-bit value. Channel samples follow the
//! "positive means one" polarity used by the trellis tables: a large positive
//! systematic sample is strong evidence that the information bit is `1`.
//!
//! ```text
//!   bit 0  <-------- -32768 ... 0 ... +32767 --------> bit 1
//! ```
//!
//! The per-stage recursion never fails: overflow saturates and out-of-range
//! shuffle indices read as zero. Errors only arise at the edges, when a caller
//! hands the block decoder mismatched buffers or an impossible configuration.

/// A single fixed-point metric (branch, path or LLR value).
pub type Metric = i16;

/// A trellis state index (0..8).
pub type StateIndex = u8;

/// Result type for block-level kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors that can occur outside the per-stage recursion
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    #[error("Sample length mismatch: {name} has {actual} entries, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid trellis state: {0}. Must be between 0 and 7")]
    InvalidState(StateIndex),

    #[error("Vector backend '{0}' is not supported by this CPU")]
    BackendUnavailable(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Per-stage input triple supplied by the driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSample {
    /// Systematic channel sample.
    pub x: Metric,
    /// Parity channel sample.
    pub z: Metric,
    /// A priori (extrinsic) LLR from the other constituent decoder.
    pub le: Metric,
}

impl StageSample {
    pub fn new(x: Metric, z: Metric, le: Metric) -> Self {
        Self { x, z, le }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KernelError::LengthMismatch {
            name: "z",
            expected: 8,
            actual: 7,
        };
        assert_eq!(
            err.to_string(),
            "Sample length mismatch: z has 7 entries, expected 8"
        );
        assert!(KernelError::InvalidState(9).to_string().contains("9"));
    }

    #[test]
    fn test_stage_sample() {
        let s = StageSample::new(3, -4, 6);
        assert_eq!((s.x, s.z, s.le), (3, -4, 6));
        assert_eq!(StageSample::default(), StageSample::new(0, 0, 0));
    }
}
