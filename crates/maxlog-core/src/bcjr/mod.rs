//! Max-Log-MAP Trellis Recursions
//!
//! Fixed-point BCJR for the 8-state LTE constituent code, written once
//! against [`VectorBackend`](crate::simd::VectorBackend) and run on whichever
//! backend the CPU supports.
//!
//! ## Stage Flow
//!
//! ```text
//!   forward:   alpha[0] ──► alpha[1] ──► ... ──► alpha[n]
//!                 │  gamma[0]   │  gamma[1]          (stored with norm[k])
//!   backward:  llr[0] ◄── beta[1] ◄── ... ◄── beta[n]  (beta overwritten)
//! ```
//!
//! The forward pass stores every stage's alpha, branch metrics and
//! normalization value. The backward pass walks the stages in reverse,
//! keeping a single running beta and emitting one LLR per stage.
//!
//! ## Example
//!
//! ```rust
//! use maxlog_core::bcjr::Kernel;
//! use maxlog_core::simd::Vector8x16;
//! use maxlog_core::types::StageSample;
//!
//! let kernel = Kernel::detect();
//! let fwd = kernel.forward(&Vector8x16::default(), StageSample::new(10, -7, 6));
//! assert_eq!(fwd.norm, 20);
//!
//! let mut beta = Vector8x16::default();
//! let llr = kernel.backward(&fwd.branch, -7, &Vector8x16::default(), &mut beta, fwd.norm);
//! assert_eq!(llr, 0);
//! ```

mod backward;
mod block;
mod forward;

pub use backward::backward_step;
pub use block::{a_posteriori, MapDecoder, NormPolicy};
pub use forward::forward_step;

use crate::simd::{Backend, Scalar, Vector8x16};
use crate::types::{KernelError, KernelResult, Metric, StageSample};
use tracing::{debug, info};

/// Branch metrics of one stage.
///
/// Lanes `[g0, -g0, g1, -g1, g2, -g2, g3, -g3]`: the four distinct upper
/// transitions interleaved with their negations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BranchMetrics(pub Vector8x16);

impl BranchMetrics {
    /// Metric of upper transition `j` (0..4).
    #[inline]
    pub fn plus(&self, j: usize) -> Metric {
        self.0 .0[2 * j]
    }

    /// Metric of the transition mirroring upper transition `j`.
    #[inline]
    pub fn minus(&self, j: usize) -> Metric {
        self.0 .0[2 * j + 1]
    }
}

/// Result of one forward step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardOutput {
    pub branch: BranchMetrics,
    /// Normalized forward metrics; the largest lane is 0.
    pub alpha: Vector8x16,
    /// Maximum subtracted during normalization.
    pub norm: Metric,
}

/// Runtime-dispatching front end over the vector backends.
///
/// A `Kernel` only exists for a backend the CPU supports, so its hardware
/// paths are always safe to enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kernel {
    backend: Backend,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::detect()
    }
}

impl Kernel {
    /// Kernel on a specific backend.
    pub fn new(backend: Backend) -> KernelResult<Self> {
        if !backend.is_available() {
            return Err(KernelError::BackendUnavailable(backend.name()));
        }
        debug!(backend = %backend, "Kernel created");
        Ok(Self { backend })
    }

    /// Kernel on the best backend of the current CPU.
    pub fn detect() -> Self {
        let backend = Backend::detect();
        info!(backend = %backend, "Selected vector backend");
        Self { backend }
    }

    /// Portable kernel, identical output on every target.
    pub fn scalar() -> Self {
        Self {
            backend: Backend::Scalar,
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// One forward step. See [`forward_step`].
    pub fn forward(&self, alpha_prev: &Vector8x16, sample: StageSample) -> ForwardOutput {
        match self.backend {
            // SAFETY: `self.backend` was checked available at construction
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Ssse3 => unsafe { x86_entry::forward_ssse3(alpha_prev, sample) },
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Sse41 => unsafe { x86_entry::forward_sse41(alpha_prev, sample) },
            _ => forward_step(Scalar, alpha_prev, sample),
        }
    }

    /// One backward step. See [`backward_step`].
    pub fn backward(
        &self,
        branch: &BranchMetrics,
        z: Metric,
        alpha: &Vector8x16,
        beta: &mut Vector8x16,
        norm: Metric,
    ) -> Metric {
        match self.backend {
            // SAFETY: as in `forward`
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Ssse3 => unsafe { x86_entry::backward_ssse3(branch, z, alpha, beta, norm) },
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Sse41 => unsafe { x86_entry::backward_sse41(branch, z, alpha, beta, norm) },
            _ => backward_step(Scalar, branch, z, alpha, beta, norm),
        }
    }

    pub(crate) fn forward_pass(&self, pass: block::ForwardPass<'_>) {
        match self.backend {
            // SAFETY: as in `forward`
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Ssse3 => unsafe { x86_entry::forward_pass_ssse3(pass) },
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Sse41 => unsafe { x86_entry::forward_pass_sse41(pass) },
            _ => pass.run(Scalar),
        }
    }

    pub(crate) fn backward_pass(&self, pass: block::BackwardPass<'_>) {
        match self.backend {
            // SAFETY: as in `forward`
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Ssse3 => unsafe { x86_entry::backward_pass_ssse3(pass) },
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            Backend::Sse41 => unsafe { x86_entry::backward_pass_sse41(pass) },
            _ => pass.run(Scalar),
        }
    }
}

/// Entry points compiled with the backend's target features enabled, so the
/// `#[inline(always)]` primitives fold into straight-line SSE code.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86_entry {
    use super::block::{BackwardPass, ForwardPass};
    use super::{backward_step, forward_step, BranchMetrics, ForwardOutput};
    use crate::simd::{Sse41, Ssse3, Vector8x16};
    use crate::types::{Metric, StageSample};

    #[target_feature(enable = "ssse3")]
    pub(super) unsafe fn forward_ssse3(alpha_prev: &Vector8x16, sample: StageSample) -> ForwardOutput {
        forward_step(Ssse3::new_unchecked(), alpha_prev, sample)
    }

    #[target_feature(enable = "ssse3,sse4.1")]
    pub(super) unsafe fn forward_sse41(alpha_prev: &Vector8x16, sample: StageSample) -> ForwardOutput {
        forward_step(Sse41::new_unchecked(), alpha_prev, sample)
    }

    #[target_feature(enable = "ssse3")]
    pub(super) unsafe fn backward_ssse3(
        branch: &BranchMetrics,
        z: Metric,
        alpha: &Vector8x16,
        beta: &mut Vector8x16,
        norm: Metric,
    ) -> Metric {
        backward_step(Ssse3::new_unchecked(), branch, z, alpha, beta, norm)
    }

    #[target_feature(enable = "ssse3,sse4.1")]
    pub(super) unsafe fn backward_sse41(
        branch: &BranchMetrics,
        z: Metric,
        alpha: &Vector8x16,
        beta: &mut Vector8x16,
        norm: Metric,
    ) -> Metric {
        backward_step(Sse41::new_unchecked(), branch, z, alpha, beta, norm)
    }

    #[target_feature(enable = "ssse3")]
    pub(super) unsafe fn forward_pass_ssse3(pass: ForwardPass<'_>) {
        pass.run(Ssse3::new_unchecked())
    }

    #[target_feature(enable = "ssse3,sse4.1")]
    pub(super) unsafe fn forward_pass_sse41(pass: ForwardPass<'_>) {
        pass.run(Sse41::new_unchecked())
    }

    #[target_feature(enable = "ssse3")]
    pub(super) unsafe fn backward_pass_ssse3(pass: BackwardPass<'_>) {
        pass.run(Ssse3::new_unchecked())
    }

    #[target_feature(enable = "ssse3,sse4.1")]
    pub(super) unsafe fn backward_pass_sse41(pass: BackwardPass<'_>) {
        pass.run(Sse41::new_unchecked())
    }
}
