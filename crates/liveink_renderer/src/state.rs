//! Engine state.
//!
//! All registry and transition bookkeeping lives in one struct behind one
//! mutex. The lock covers in-memory state only: nothing that can re-enter
//! (cross-thread dispatch, render-complete arming, host callbacks) runs
//! while it is held.

use crate::config::QualityConfig;
use crate::context::{AppContext, RenderDomain};
use crate::device::DeviceTracker;
use crate::host_slot::HostSlots;
use crate::registry::StrokeRegistry;
use crate::stroke::StrokeId;
use liveink_core::{DeviceId, InkPoint, InkStyle, SegmentBuilder, Ticks, VisualId};
use liveink_dispatch::CommitMode;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Roots of the engine's subtree in the application visual tree.
#[derive(Clone, Copy, Debug)]
pub(crate) struct InkRoots {
    /// Root handed to the host; parents everything the engine draws.
    pub main: VisualId,
    /// Container for app-thread incremental strokes and finished copies.
    pub raw_ink: VisualId,
}

/// Counters over stroke lifecycles, exposed through [`Diagnostics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransitionStats {
    /// Full flicker-free transitions started.
    pub full_transitions: u64,
    /// Natural stroke ends that took the fast path because a full
    /// transition was already in flight.
    pub quick_finishes: u64,
    /// Strokes discarded through the fast-abort path.
    pub aborts: u64,
    /// Records fully released.
    pub completed: u64,
}

pub(crate) struct InkState {
    pub registry: StrokeRegistry,
    pub slots: Option<HostSlots>,
    pub render: Option<RenderDomain>,
    pub roots: Option<InkRoots>,
    pub active: bool,
    pub style: InkStyle,

    /// The one stroke allowed in full transition, process-wide.
    pub full_transition: Option<StrokeId>,
    /// One-shot armed on the app compositor.
    pub app_waiting: bool,
    /// FIFO of strokes awaiting render-thread visual removal. At most one
    /// remove-and-wait is in flight; the rest queue behind it.
    pub removal_queue: VecDeque<StrokeId>,
    pub removal_waiting: bool,

    /// Bumped on teardown; armed callbacks from an older epoch no-op.
    pub epoch: u64,
    pub stats: TransitionStats,
}

impl InkState {
    pub fn new(mode: crate::config::RegistryMode) -> Self {
        Self {
            registry: StrokeRegistry::new(mode),
            slots: None,
            render: None,
            roots: None,
            active: false,
            style: InkStyle::default(),
            full_transition: None,
            app_waiting: false,
            removal_queue: VecDeque::new(),
            removal_waiting: false,
            epoch: 0,
            stats: TransitionStats::default(),
        }
    }
}

/// Host callback fired on the application thread when a stroke finishes
/// naturally.
pub type CompletedCallback = Box<dyn Fn(CompletedStroke) + Send + Sync>;

/// Factory producing a geometry continuation per stroke.
pub type SegmentBuilderFactory =
    Box<dyn Fn(&InkStyle) -> Box<dyn SegmentBuilder> + Send + Sync>;

/// A naturally finished stroke as handed to the host.
#[derive(Clone, Debug)]
pub struct CompletedStroke {
    pub device: DeviceId,
    pub style: InkStyle,
    /// All accepted samples in arrival order.
    pub points: Vec<InkPoint>,
    pub start_time: Ticks,
    pub end_time: Ticks,
}

pub(crate) struct EngineShared {
    pub state: Mutex<InkState>,
    pub app: AppContext,
    pub quality: QualityConfig,
    pub commit_mode: CommitMode,
    pub tracker: Box<dyn DeviceTracker>,
    pub completed_hook: Option<CompletedCallback>,
    pub builder_factory: SegmentBuilderFactory,
}

/// Per-slot snapshot for embedders and tests.
#[derive(Clone, Copy, Debug)]
pub struct SlotDiagnostics {
    pub refs: usize,
    pub trigger_armed: bool,
    pub bridge: VisualId,
    pub target_root: VisualId,
}

/// Point-in-time snapshot of engine state.
#[derive(Clone, Debug)]
pub struct Diagnostics {
    pub active: bool,
    /// Strokes still receiving input.
    pub open_strokes: usize,
    /// Live records, including those mid-handoff.
    pub tracked_records: usize,
    pub full_transition_in_flight: bool,
    pub slots: Option<[SlotDiagnostics; 2]>,
    pub main_visual: Option<VisualId>,
    pub raw_ink_visual: Option<VisualId>,
    pub stats: TransitionStats,
}
