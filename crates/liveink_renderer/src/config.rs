//! Engine configuration.
//!
//! The point-quality thresholds are deliberately injectable rather than
//! baked in: field observations of shipped variants show divergent,
//! experimentally-tuned values (distance-based in one, count-based in
//! another), so no single constant is treated as the contract. The default
//! gate is fully open.

use liveink_core::Ticks;
use serde::{Deserialize, Serialize};

/// How open strokes are keyed in the registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryMode {
    /// At most one open stroke process-wide; one device inks at a time.
    #[default]
    SingleStroke,
    /// At most one open stroke per device id.
    PerDevice,
}

/// Thresholds deciding when a young stroke becomes renderable and when a
/// sample is rejected as jitter. `None` disables the corresponding gate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// A sample farther than this from its predecessor restarts
    /// accumulation from that sample and opens the gate.
    pub max_jump: Option<f32>,
    /// The gate opens once the stroke spans this many ticks.
    pub min_time_span: Option<Ticks>,
    /// The gate opens once this many samples have accumulated.
    pub min_points: Option<usize>,
}

impl QualityConfig {
    /// No gating: every stroke is renderable from its first sample.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Whether any gate is configured at all.
    pub fn gated(&self) -> bool {
        self.max_jump.is_some() || self.min_time_span.is_some() || self.min_points.is_some()
    }
}

/// Construction-time options for the engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct EngineOptions {
    pub mode: RegistryMode,
    pub quality: QualityConfig,
    /// How the dedicated render thread commits frames. `Auto` suits
    /// embedders without a real compositor in the loop; `Manual` hands
    /// frame commits to the embedder.
    pub commit: liveink_dispatch::CommitMode,
}
