//! Block driver: one forward pass and one backward pass over a code block.

use super::{backward_step, forward_step, BranchMetrics, Kernel};
use crate::config::KernelConfig;
use crate::simd::{Vector8x16, VectorBackend};
use crate::trellis::TrellisState;
use crate::types::{KernelError, KernelResult, Metric, StageSample};
use serde::{Deserialize, Serialize};
use tracing::debug_span;

/// Where the backward pass takes its per-stage normalization constant from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "value", rename_all = "snake_case")]
pub enum NormPolicy {
    /// The maximum the forward pass subtracted at the same stage.
    #[default]
    ForwardCapture,
    /// The same constant at every stage.
    Fixed(Metric),
}

impl NormPolicy {
    #[inline(always)]
    pub fn resolve(self, captured: Metric) -> Metric {
        match self {
            NormPolicy::ForwardCapture => captured,
            NormPolicy::Fixed(value) => value,
        }
    }
}

pub(crate) struct ForwardPass<'a> {
    pub samples: &'a [StageSample],
    /// `samples.len() + 1` entries, entry 0 preset.
    pub alpha: &'a mut [Vector8x16],
    pub branch: &'a mut [BranchMetrics],
    pub norms: &'a mut [Metric],
}

impl ForwardPass<'_> {
    #[inline(always)]
    pub fn run<B: VectorBackend>(self, b: B) {
        for (k, sample) in self.samples.iter().enumerate() {
            let out = forward_step(b, &self.alpha[k], *sample);
            self.alpha[k + 1] = out.alpha;
            self.branch[k] = out.branch;
            self.norms[k] = out.norm;
        }
    }
}

pub(crate) struct BackwardPass<'a> {
    pub samples: &'a [StageSample],
    pub alpha: &'a [Vector8x16],
    pub branch: &'a [BranchMetrics],
    pub norms: &'a [Metric],
    pub policy: NormPolicy,
    pub terminal: Vector8x16,
    pub llr: &'a mut [Metric],
}

impl BackwardPass<'_> {
    #[inline(always)]
    pub fn run<B: VectorBackend>(self, b: B) {
        let mut beta = self.terminal;
        for k in (0..self.samples.len()).rev() {
            let norm = self.policy.resolve(self.norms[k]);
            self.llr[k] = backward_step(
                b,
                &self.branch[k],
                self.samples[k].z,
                &self.alpha[k],
                &mut beta,
                norm,
            );
        }
    }
}

/// A posteriori LLR of a stage from its extrinsic LLR.
///
/// Adds back the systematic (`2x`) and a priori terms the kernel leaves out.
/// Exact for even `le`.
pub fn a_posteriori(extrinsic: Metric, sample: StageSample) -> Metric {
    extrinsic
        .saturating_add(sample.x.saturating_mul(2))
        .saturating_add(sample.le)
}

/// Single constituent Max-Log-MAP pass over whole blocks.
///
/// Owns the per-stage buffers and reuses them across blocks, so a decoder
/// should live as long as the turbo loop driving it. Independent decoders
/// share nothing and may run on separate threads.
///
/// ```rust
/// use maxlog_core::bcjr::MapDecoder;
/// use maxlog_core::trellis::TrellisState;
/// use maxlog_core::types::StageSample;
///
/// let mut decoder = MapDecoder::default()
///     .with_terminal_state(TrellisState::Unknown)
///     .unwrap();
/// let llr = decoder.decode(&[
///     StageSample::new(16, 16, 0),
///     StageSample::new(4, 16, 0),
///     StageSample::new(16, -40, 0),
///     StageSample::new(16, 16, 0),
/// ]);
/// assert_eq!(llr, vec![24, -64, 24, 32]);
/// ```
#[derive(Debug, Clone)]
pub struct MapDecoder {
    kernel: Kernel,
    policy: NormPolicy,
    initial: TrellisState,
    terminal: TrellisState,
    samples: Vec<StageSample>,
    alpha: Vec<Vector8x16>,
    branch: Vec<BranchMetrics>,
    norms: Vec<Metric>,
}

impl Default for MapDecoder {
    fn default() -> Self {
        Self::new(Kernel::detect())
    }
}

impl MapDecoder {
    /// Decoder starting in state 0 with an open end and forward-captured
    /// normalization.
    pub fn new(kernel: Kernel) -> Self {
        Self {
            kernel,
            policy: NormPolicy::default(),
            initial: TrellisState::Known(0),
            terminal: TrellisState::Unknown,
            samples: Vec::new(),
            alpha: Vec::new(),
            branch: Vec::new(),
            norms: Vec::new(),
        }
    }

    pub fn from_config(config: &KernelConfig) -> KernelResult<Self> {
        config.validate()?;
        let kernel = Kernel::new(config.backend.resolve())?;
        Self::new(kernel)
            .with_policy(config.normalization)
            .with_initial_state(config.initial_state)?
            .with_terminal_state(config.terminal_state)
    }

    pub fn with_policy(mut self, policy: NormPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_initial_state(mut self, state: TrellisState) -> KernelResult<Self> {
        self.initial = state.validate()?;
        Ok(self)
    }

    pub fn with_terminal_state(mut self, state: TrellisState) -> KernelResult<Self> {
        self.terminal = state.validate()?;
        Ok(self)
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn policy(&self) -> NormPolicy {
        self.policy
    }

    pub fn initial_state(&self) -> TrellisState {
        self.initial
    }

    pub fn terminal_state(&self) -> TrellisState {
        self.terminal
    }

    /// Extrinsic LLRs of one block, one per stage.
    pub fn decode(&mut self, samples: &[StageSample]) -> Vec<Metric> {
        self.samples.clear();
        self.samples.extend_from_slice(samples);
        let mut llr = vec![0; samples.len()];
        self.run(&mut llr);
        llr
    }

    /// As [`decode`](Self::decode), with separate sample streams and a
    /// caller-owned output buffer. All four slices must have equal length.
    pub fn decode_into(
        &mut self,
        x: &[Metric],
        z: &[Metric],
        le: &[Metric],
        out: &mut [Metric],
    ) -> KernelResult<()> {
        let expected = x.len();
        for (name, actual) in [("z", z.len()), ("le", le.len()), ("out", out.len())] {
            if actual != expected {
                return Err(KernelError::LengthMismatch {
                    name,
                    expected,
                    actual,
                });
            }
        }
        self.samples.clear();
        self.samples.extend(
            x.iter()
                .zip(z)
                .zip(le)
                .map(|((&x, &z), &le)| StageSample::new(x, z, le)),
        );
        self.run(out);
        Ok(())
    }

    /// Forward metrics of the last block, `len + 1` entries.
    pub fn forward_metrics(&self) -> &[Vector8x16] {
        &self.alpha
    }

    /// Branch metrics of the last block.
    pub fn branch_metrics(&self) -> &[BranchMetrics] {
        &self.branch
    }

    /// Forward normalization values of the last block.
    pub fn norms(&self) -> &[Metric] {
        &self.norms
    }

    fn run(&mut self, llr: &mut [Metric]) {
        let n = self.samples.len();
        let _span = debug_span!("map_decode", len = n, backend = %self.kernel.backend()).entered();

        self.alpha.clear();
        self.alpha.resize(n + 1, Vector8x16::default());
        self.branch.clear();
        self.branch.resize(n, BranchMetrics::default());
        self.norms.clear();
        self.norms.resize(n, 0);

        // Boundary states were validated by the setters
        self.alpha[0] = boundary_metrics(self.initial);
        let terminal = boundary_metrics(self.terminal);

        self.kernel.forward_pass(ForwardPass {
            samples: &self.samples,
            alpha: &mut self.alpha,
            branch: &mut self.branch,
            norms: &mut self.norms,
        });
        self.kernel.backward_pass(BackwardPass {
            samples: &self.samples,
            alpha: &self.alpha,
            branch: &self.branch,
            norms: &self.norms,
            policy: self.policy,
            terminal,
            llr,
        });
    }
}

fn boundary_metrics(state: TrellisState) -> Vector8x16 {
    state.metrics().unwrap_or_default()
}
