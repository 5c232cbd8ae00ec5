//! The inking engine facade.
//!
//! `LiveInk` is what a host embeds: it receives raw input events, owns the
//! stroke registry and handoff coordinator, and manages the dedicated
//! render thread's lifecycle. Lifecycle calls (activation, teardown,
//! reset, root visual) belong on the application thread; input events may
//! arrive on any thread.

use crate::config::EngineOptions;
use crate::context::{AppContext, RenderDomain};
use crate::device::{DeviceTracker, NoDeviceTracker};
use crate::error::{InkError, Result};
use crate::host_slot::{HostSlots, SlotIndex, SlotState};
use crate::state::{
    CompletedCallback, CompletedStroke, Diagnostics, EngineShared, InkRoots, InkState,
    SegmentBuilderFactory, SlotDiagnostics,
};
use crate::stroke::InputAck;
use liveink_core::{DeviceId, InkPoint, InkStyle, PolylineBuilder, Ticks, VisualId};
use liveink_dispatch::Priority;
use std::sync::{mpsc, Arc, Mutex};

/// Builder for a [`LiveInk`] engine.
pub struct LiveInkBuilder {
    app: AppContext,
    options: EngineOptions,
    tracker: Box<dyn DeviceTracker>,
    completed_hook: Option<CompletedCallback>,
    builder_factory: SegmentBuilderFactory,
}

impl LiveInkBuilder {
    fn new(app: AppContext) -> Self {
        Self {
            app,
            options: EngineOptions::default(),
            tracker: Box::new(NoDeviceTracker),
            completed_hook: None,
            builder_factory: Box::new(|style| Box::new(PolylineBuilder::new(style.width))),
        }
    }

    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Inject the device-state collaborator.
    pub fn device_tracker<T: DeviceTracker + 'static>(mut self, tracker: T) -> Self {
        self.tracker = Box::new(tracker);
        self
    }

    /// Callback fired on the application thread when a stroke finishes
    /// naturally, carrying the full point collection.
    pub fn on_stroke_completed<F>(mut self, hook: F) -> Self
    where
        F: Fn(CompletedStroke) + Send + Sync + 'static,
    {
        self.completed_hook = Some(Box::new(hook));
        self
    }

    /// Inject the tessellation collaborator producing a geometry
    /// continuation per stroke.
    pub fn segment_builder<F>(mut self, factory: F) -> Self
    where
        F: Fn(&InkStyle) -> Box<dyn liveink_core::SegmentBuilder> + Send + Sync + 'static,
    {
        self.builder_factory = Box::new(factory);
        self
    }

    pub fn build(self) -> LiveInk {
        LiveInk {
            shared: Arc::new(EngineShared {
                state: Mutex::new(InkState::new(self.options.mode)),
                app: self.app,
                quality: self.options.quality,
                commit_mode: self.options.commit,
                tracker: self.tracker,
                completed_hook: self.completed_hook,
                builder_factory: self.builder_factory,
            }),
        }
    }
}

/// Low-latency stroke renderer with flicker-free cross-thread handoff.
#[derive(Clone)]
pub struct LiveInk {
    shared: Arc<EngineShared>,
}

impl LiveInk {
    pub fn builder(app: AppContext) -> LiveInkBuilder {
        LiveInkBuilder::new(app)
    }

    /// Root of the engine's subtree in the application visual tree,
    /// creating it on first query. Nothing is drawn until this has been
    /// called. Application thread only.
    pub fn root_visual(&self) -> Result<VisualId> {
        self.require_app_thread()?;
        let main = {
            let mut state = self.shared.state.lock().unwrap();
            match state.roots {
                Some(roots) => roots.main,
                None => {
                    let mut tree = self.shared.app.visuals.lock().unwrap();
                    let tree_root = tree.root();
                    let main = tree.create_child(tree_root, "liveink");
                    let raw_ink = tree.create_child(main, "raw-ink");
                    drop(tree);
                    state.roots = Some(InkRoots { main, raw_ink });
                    main
                }
            }
        };
        // If input is already active, bring up the real-time visuals now.
        self.create_realtime_visuals()?;
        Ok(main)
    }

    /// Become active for input: create the host slots and the dedicated
    /// render thread (if the root visual has been queried). Application
    /// thread only.
    pub fn activate(&self) -> Result<()> {
        self.require_app_thread()?;
        self.shared.state.lock().unwrap().active = true;
        self.create_realtime_visuals()
    }

    /// Stop inking: force-abort every open stroke, tear down the host
    /// slots, and shut the render thread down. Application thread only.
    pub fn deactivate(&self) -> Result<()> {
        self.require_app_thread()?;
        self.shared.state.lock().unwrap().active = false;
        self.destroy_realtime_visuals();
        Ok(())
    }

    /// Replace the drawing style. Takes effect on the next stroke; the
    /// active stroke keeps its snapshot.
    pub fn set_style(&self, style: InkStyle) -> Result<()> {
        style.validate()?;
        self.shared.state.lock().unwrap().style = style;
        Ok(())
    }

    pub fn style(&self) -> InkStyle {
        self.shared.state.lock().unwrap().style.clone()
    }

    /// A contact began.
    pub fn stylus_down(
        &self,
        device: DeviceId,
        timestamp: Ticks,
        points: &[InkPoint],
    ) -> Option<InputAck> {
        self.shared.stylus_down(device, timestamp, points)
    }

    /// A contact moved.
    pub fn stylus_move(&self, device: DeviceId, timestamp: Ticks, points: &[InkPoint]) {
        self.shared.stylus_move(device, timestamp, points)
    }

    /// A contact ended.
    pub fn stylus_up(
        &self,
        device: DeviceId,
        timestamp: Ticks,
        points: &[InkPoint],
    ) -> Option<InputAck> {
        self.shared.stylus_up(device, timestamp, points)
    }

    /// The host finished routing a down event.
    pub fn down_processed(&self, ack: InputAck, target_verified: bool) {
        self.shared.down_processed(ack, target_verified)
    }

    /// The host finished routing an up event.
    pub fn up_processed(&self, ack: InputAck, target_verified: bool) {
        self.shared.up_processed(ack, target_verified)
    }

    /// The device entered the element. Confirmed mid-stroke entries abort
    /// the stroke.
    pub fn stylus_enter(&self, device: DeviceId, timestamp: Ticks, confirmed: bool) {
        self.shared.stylus_enter_leave(device, timestamp, true, confirmed)
    }

    /// The device left the element. Confirmed leaves before the terminal
    /// sample abort the stroke.
    pub fn stylus_leave(&self, device: DeviceId, timestamp: Ticks, confirmed: bool) {
        self.shared.stylus_enter_leave(device, timestamp, false, confirmed)
    }

    /// Abort whatever is being inked and start a fresh stroke from
    /// `points`. The device must be in the down state. Application thread
    /// only.
    pub fn reset(&self, device: DeviceId, timestamp: Ticks, points: &[InkPoint]) -> Result<()> {
        self.require_app_thread()?;
        if self.shared.tracker.is_device_up(device) {
            return Err(InkError::DeviceNotDown);
        }
        {
            let state = self.shared.state.lock().unwrap();
            if state.roots.is_none() || state.slots.is_none() || !state.active {
                return Ok(()); // nothing to do until inking is set up
            }
        }
        self.shared.abort_all_now();

        let (id, draw_now) = {
            let mut state = self.shared.state.lock().unwrap();
            let transitioning_slot = None; // abort_all cleared any transition
            let slot = {
                let Some(slots) = state.slots.as_mut() else {
                    return Ok(());
                };
                let slot = slots.pick_current(transitioning_slot);
                slots.get_mut(slot).refs += 1;
                slot
            };
            let style = state.style.clone();
            let builder = (self.shared.builder_factory)(&style);
            let mut record = crate::stroke::StrokeRecord::new(
                device,
                timestamp,
                style,
                slot,
                builder,
                &self.shared.quality,
            );
            record.is_reset = true;
            let draw_now = record.accept_batch(points, &self.shared.quality);
            let id = state.registry.insert(record);
            tracing::debug!(device, "stroke restarted via reset");
            (id, draw_now)
        };
        if let Some(points) = draw_now {
            self.shared.render_batch(id, &points);
        }
        Ok(())
    }

    /// Force-abort every open stroke without waiting for render-complete
    /// signals. Marshals itself to the application thread when called from
    /// elsewhere.
    pub fn abort_all(&self) {
        if self.shared.app.dispatcher.check_access() {
            self.shared.abort_all_now();
            return;
        }
        let shared = Arc::clone(&self.shared);
        if self
            .shared
            .app
            .dispatcher
            .invoke(Priority::Send, move || shared.abort_all_now())
            .is_err()
        {
            tracing::trace!("app dispatcher gone, abort_all dropped");
        }
    }

    /// Commit a frame on the render thread. Only meaningful for embedders
    /// driving a [`CommitMode::Manual`](liveink_dispatch::CommitMode)
    /// render thread.
    pub fn commit_render_frame(&self) {
        let handles = {
            let state = self.shared.state.lock().unwrap();
            state
                .render
                .as_ref()
                .map(|render| (render.dispatcher(), render.compositor()))
        };
        if let Some((dispatcher, compositor)) = handles {
            let _ = dispatcher.invoke(Priority::Send, move || compositor.frame_rendered());
        }
    }

    /// Block until the render thread has drained its queue. Gives
    /// embedders and tests a deterministic point to observe state.
    pub fn flush_render_thread(&self) {
        let dispatcher = {
            let state = self.shared.state.lock().unwrap();
            state.render.as_ref().map(|render| render.dispatcher())
        };
        let Some(dispatcher) = dispatcher else { return };
        let (tx, rx) = mpsc::channel();
        if dispatcher
            .invoke(Priority::Input, move || {
                let _ = tx.send(());
            })
            .is_ok()
        {
            let _ = rx.recv();
        }
    }

    /// Read snapshot of the render thread's visual tree, if active.
    pub fn render_visuals(&self) -> Option<liveink_core::SharedVisualTree> {
        let state = self.shared.state.lock().unwrap();
        state.render.as_ref().map(|render| render.visuals.clone())
    }

    /// Point-in-time snapshot of engine state.
    pub fn diagnostics(&self) -> Diagnostics {
        let state = self.shared.state.lock().unwrap();
        Diagnostics {
            active: state.active,
            open_strokes: state.registry.open_count(),
            tracked_records: state.registry.record_count(),
            full_transition_in_flight: state.full_transition.is_some(),
            slots: state.slots.as_ref().map(|slots| {
                [SlotIndex::A, SlotIndex::B].map(|index| {
                    let slot = slots.get(index);
                    SlotDiagnostics {
                        refs: slot.refs,
                        trigger_armed: slot.trigger,
                        bridge: slot.bridge,
                        target_root: slot.target_root,
                    }
                })
            }),
            main_visual: state.roots.map(|roots| roots.main),
            raw_ink_visual: state.roots.map(|roots| roots.raw_ink),
            stats: state.stats,
        }
    }

    fn require_app_thread(&self) -> Result<()> {
        if self.shared.app.dispatcher.check_access() {
            Ok(())
        } else {
            Err(InkError::WrongThread)
        }
    }

    /// Bring up the two host slots and the render thread. No-op unless
    /// active with a queried root visual, or when already created.
    fn create_realtime_visuals(&self) -> Result<()> {
        let needed = {
            let state = self.shared.state.lock().unwrap();
            state.active && state.roots.is_some() && state.slots.is_none()
        };
        if !needed {
            return Ok(());
        }

        // Start the render thread before publishing anything; its startup
        // blocks on the thread building its side of the tree.
        let (domain, target_a, target_b) = RenderDomain::start(self.shared.commit_mode)?;

        let mut state = self.shared.state.lock().unwrap();
        if state.slots.is_some() {
            return Ok(());
        }
        let Some(roots) = state.roots else {
            return Ok(());
        };
        let (bridge_a, bridge_b) = {
            let mut tree = self.shared.app.visuals.lock().unwrap();
            (
                tree.create_child(roots.main, "ink-host-a"),
                tree.create_child(roots.main, "ink-host-b"),
            )
        };
        state.slots = Some(HostSlots::new(
            SlotState::new(bridge_a, target_a),
            SlotState::new(bridge_b, target_b),
        ));
        state.render = Some(domain);
        tracing::debug!("real-time inking visuals created");
        Ok(())
    }

    /// Tear down the host slots and render thread. Open strokes are
    /// force-aborted first; outstanding completions are abandoned rather
    /// than waited for.
    fn destroy_realtime_visuals(&self) {
        self.shared.abort_all_now();

        let render = {
            let mut state = self.shared.state.lock().unwrap();
            state.epoch += 1;
            state.app_waiting = false;
            state.removal_waiting = false;
            state.removal_queue.clear();
            state.full_transition = None;

            if let (Some(slots), Some(roots)) = (state.slots.take(), state.roots) {
                let mut tree = self.shared.app.visuals.lock().unwrap();
                tree.remove_child(roots.main, slots.get(SlotIndex::A).bridge);
                tree.remove_child(roots.main, slots.get(SlotIndex::B).bridge);
            }
            state.render.take()
        };

        if let Some(render) = render {
            render.thread.shutdown_and_join();
            tracing::debug!("render thread shut down");
        }
    }
}
