//! Flicker-free stroke handoff.
//!
//! Moves a finished stroke's pixels from the render-thread surface to the
//! application-thread surface without a frame in which the stroke is
//! visible twice or not at all, while each surface stays mutable only by
//! its owning thread.
//!
//! The full transition for a single stroke:
//!
//! 1. [app]    arm the slot trigger (zero-area clip on the bridge) in the
//!             same operation that materializes the finished copy, then
//!             wait for the app thread's render-complete
//! 2. [render] remove the live stroke visual, wait for the render thread's
//!             render-complete (queued FIFO behind any removal already in
//!             flight)
//! 3. [render] on that completion, notify the app thread the live copy is
//!             gone (and start the next queued removal, if any)
//! 4. [app]    clear the trigger, wait for one more render-complete
//! 5. [app]    release the slot reference and forget the record
//!
//! Steps 1-2 guarantee the finished copy replaces the live copy within a
//! single committed frame; steps 3-4 guarantee the live copy is truly gone
//! before the bridge is unclipped for reuse. Only one stroke may hold a
//! full transition at a time; strokes ending while one is in flight (and
//! strokes being discarded) skip the trigger phases entirely.

use crate::state::{CompletedStroke, EngineShared};
use crate::stroke::{StrokeId, TransitionPhase};
use liveink_core::ClipShape;
use liveink_dispatch::Priority;
use std::sync::Arc;

/// What should become of a stroke leaving the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FinishMode {
    /// Natural end: the application tree keeps the stroke.
    Commit,
    /// Forced discard: the stroke simply disappears.
    Discard,
}

enum AfterTransitionStart {
    ArmAppRenderComplete,
    RemoveRenderVisual(StrokeId),
}

impl EngineShared {
    /// Entry point of the handoff. Marshals itself onto the application
    /// thread if needed; fire-and-continue from input threads.
    pub(crate) fn transition_stroke(self: &Arc<Self>, id: StrokeId, mode: FinishMode) {
        if self.app.dispatcher.check_access() {
            self.transition_stroke_on_app(id, mode);
            return;
        }
        let shared = Arc::clone(self);
        if self
            .app
            .dispatcher
            .invoke(Priority::Send, move || {
                shared.transition_stroke_on_app(id, mode)
            })
            .is_err()
        {
            tracing::trace!("app dispatcher gone, stroke transition dropped");
        }
    }

    fn transition_stroke_on_app(self: &Arc<Self>, id: StrokeId, mode: FinishMode) {
        let next = {
            let mut state = self.state.lock().unwrap();
            {
                let Some(record) = state.registry.get(id) else {
                    return;
                };
                if record.phase.is_some() {
                    return; // already on its way out
                }
            }
            // No more input for this stroke.
            state.registry.detach(id);

            // Drop the incremental app-thread copy; a committing stroke is
            // re-materialized as a finished container in the same operation
            // (full path) or at completion (quick path).
            let app_visual = state
                .registry
                .get_mut(id)
                .and_then(|record| record.app_visual.take());
            if let (Some(visual), Some(roots)) = (app_visual, state.roots) {
                let mut tree = self.app.visuals.lock().unwrap();
                tree.remove_child(roots.raw_ink, visual);
            }
            if mode == FinishMode::Discard {
                if let Some(record) = state.registry.get_mut(id) {
                    record.fill = None; // queued draws become no-ops
                }
            }

            if state.slots.is_none() {
                // Real-time visuals already torn down: nothing to hand off.
                state.registry.forget(id);
                return;
            }

            let Some(slot_index) = state.registry.get(id).map(|record| record.slot) else {
                return;
            };
            let single_ref = state.slots.as_ref().is_some_and(|slots| {
                slots.get(slot_index).refs == 1
            });

            let full = mode == FinishMode::Commit
                && state.full_transition.is_none()
                && single_ref;
            if full {
                // The frame that hides the live copy is the frame that
                // shows the finished one.
                self.materialize_finished_locked(&mut state, id);

                let bridge = {
                    let slot = state.slots.as_mut().map(|s| s.get_mut(slot_index));
                    let Some(slot) = slot else { return };
                    debug_assert!(
                        !slot.trigger,
                        "slot trigger armed outside a full transition"
                    );
                    slot.trigger = true;
                    slot.bridge
                };
                {
                    let mut tree = self.app.visuals.lock().unwrap();
                    tree.set_clip(bridge, Some(ClipShape::ZERO));
                }
                state.full_transition = Some(id);
                if let Some(record) = state.registry.get_mut(id) {
                    record.phase = Some(TransitionPhase::ClipPending);
                }
                state.stats.full_transitions += 1;
                tracing::debug!(?id, "full transition started");
                AfterTransitionStart::ArmAppRenderComplete
            } else {
                if let Some(record) = state.registry.get_mut(id) {
                    record.phase = Some(TransitionPhase::WaitRenderRemoval);
                    record.commit_on_complete = mode == FinishMode::Commit;
                }
                match mode {
                    FinishMode::Commit => state.stats.quick_finishes += 1,
                    FinishMode::Discard => state.stats.aborts += 1,
                }
                tracing::debug!(?id, ?mode, "fast-path transition started");
                AfterTransitionStart::RemoveRenderVisual(id)
            }
        };

        match next {
            AfterTransitionStart::ArmAppRenderComplete => self.arm_app_render_complete(),
            AfterTransitionStart::RemoveRenderVisual(id) => {
                self.remove_render_visual_and_notify(id)
            }
        }
    }

    /// Arm the one-shot app-thread render-complete, if not already armed.
    fn arm_app_render_complete(self: &Arc<Self>) {
        let armed = {
            let mut state = self.state.lock().unwrap();
            if state.app_waiting {
                None
            } else {
                state.app_waiting = true;
                Some(state.epoch)
            }
        };
        if let Some(epoch) = armed {
            let shared = Arc::clone(self);
            self.app
                .compositor
                .notify_next_render_complete(move || shared.on_app_render_complete(epoch));
        }
    }

    /// App-thread render-complete: either the trigger frame (step 1) or the
    /// trigger-clear frame (step 4) has committed.
    fn on_app_render_complete(self: &Arc<Self>, epoch: u64) {
        enum Next {
            RemoveRenderVisual(StrokeId),
            Complete(StrokeId),
        }
        let next = {
            let mut state = self.state.lock().unwrap();
            if state.epoch != epoch {
                return; // armed before a teardown
            }
            state.app_waiting = false;
            let Some(id) = state.full_transition else {
                debug_assert!(false, "app render-complete with no transition in flight");
                return;
            };
            let Some(slot_index) = state.registry.get(id).map(|record| record.slot) else {
                return;
            };
            let Some(slots) = state.slots.as_ref() else {
                return;
            };
            if slots.get(slot_index).trigger {
                if let Some(record) = state.registry.get_mut(id) {
                    record.phase = Some(TransitionPhase::WaitRenderRemoval);
                }
                Next::RemoveRenderVisual(id)
            } else {
                // Final frame committed with the trigger clear: done.
                Next::Complete(id)
            }
        };
        match next {
            Next::RemoveRenderVisual(id) => self.remove_render_visual_and_notify(id),
            Next::Complete(id) => self.transition_complete(id),
        }
    }

    /// Step 2: marshal to the render thread and take down the live visual.
    fn remove_render_visual_and_notify(self: &Arc<Self>, id: StrokeId) {
        let dispatcher = {
            let state = self.state.lock().unwrap();
            state.render.as_ref().map(|render| render.dispatcher())
        };
        let Some(dispatcher) = dispatcher else {
            // Render thread already gone; teardown finishes the cleanup.
            return;
        };
        let shared = Arc::clone(self);
        if dispatcher
            .invoke(Priority::Send, move || shared.remove_on_render_thread(id))
            .is_err()
        {
            tracing::trace!("render thread shut down, removal abandoned");
        }
    }

    /// Render thread: remove the live visual and wait for the removal to
    /// commit, or queue behind a removal already in flight.
    fn remove_on_render_thread(self: &Arc<Self>, id: StrokeId) {
        enum Next {
            ArmRenderComplete(u64),
            NotifyApp,
            Nothing,
        }
        let next = {
            let mut state = self.state.lock().unwrap();
            let Some(record) = state.registry.get(id) else {
                return;
            };
            if record.render_visual.is_some() {
                state.removal_queue.push_back(id);
                if state.removal_waiting {
                    // One remove-and-wait in flight at a time.
                    Next::Nothing
                } else {
                    self.detach_render_visual_locked(&mut state, id);
                    state.removal_waiting = true;
                    Next::ArmRenderComplete(state.epoch)
                }
            } else {
                // Never drew on the render thread: nothing to wait for.
                Next::NotifyApp
            }
        };
        match next {
            Next::ArmRenderComplete(epoch) => self.arm_render_thread_render_complete(epoch),
            Next::NotifyApp => self.notify_app_of_removal(id),
            Next::Nothing => {}
        }
    }

    fn arm_render_thread_render_complete(self: &Arc<Self>, epoch: u64) {
        let compositor = {
            let state = self.state.lock().unwrap();
            state.render.as_ref().map(|render| render.compositor())
        };
        if let Some(compositor) = compositor {
            let shared = Arc::clone(self);
            compositor.notify_next_render_complete(move || {
                shared.on_render_thread_render_complete(epoch)
            });
        }
    }

    /// Detach a stroke's live visual from its slot's target root.
    /// Render thread, engine lock held by caller.
    fn detach_render_visual_locked(
        &self,
        state: &mut crate::state::InkState,
        id: StrokeId,
    ) {
        let (visual, slot_index) = {
            let Some(record) = state.registry.get_mut(id) else {
                return;
            };
            match record.render_visual.take() {
                Some(visual) => (visual, record.slot),
                None => return,
            }
        };
        let Some(slots) = state.slots.as_ref() else {
            return;
        };
        let target_root = slots.get(slot_index).target_root;
        if let Some(render) = state.render.as_ref() {
            let mut tree = render.visuals.lock().unwrap();
            tree.remove_child(target_root, visual);
        }
    }

    /// Step 3: the removal frame committed on the render thread. Hand the
    /// finished stroke to the app thread and start the next queued removal.
    fn on_render_thread_render_complete(self: &Arc<Self>, epoch: u64) {
        let (done, follow_up) = {
            let mut state = self.state.lock().unwrap();
            if state.epoch != epoch {
                return;
            }
            let done = state.removal_queue.pop_front();
            if let Some(done) = done {
                if let Some(record) = state.registry.get_mut(done) {
                    record.phase = Some(TransitionPhase::WaitAppNotify);
                }
            }
            let follow_up = if state.removal_queue.is_empty() {
                state.removal_waiting = false;
                None
            } else {
                // Keep the next stroke queued until its own removal commits.
                state.removal_queue.front().copied().map(|next| (next, state.epoch))
            };
            (done, follow_up)
        };

        if let Some(done) = done {
            self.notify_app_of_removal(done);
        }
        if let Some((next, epoch)) = follow_up {
            // Post back to our own queue so this completion handler returns
            // before the next removal is issued.
            let dispatcher = {
                let state = self.state.lock().unwrap();
                state.render.as_ref().map(|render| render.dispatcher())
            };
            if let Some(dispatcher) = dispatcher {
                let shared = Arc::clone(self);
                let _ = dispatcher.invoke(Priority::Send, move || {
                    let mut state = shared.state.lock().unwrap();
                    shared.detach_render_visual_locked(&mut state, next);
                });
            }
            self.arm_render_thread_render_complete(epoch);
        }
    }

    /// Marshal back to the app thread: this stroke's render-thread content
    /// is gone.
    fn notify_app_of_removal(self: &Arc<Self>, id: StrokeId) {
        let shared = Arc::clone(self);
        if self
            .app
            .dispatcher
            .invoke(Priority::Send, move || shared.on_removal_confirmed(id))
            .is_err()
        {
            tracing::trace!("app dispatcher gone, removal notification dropped");
        }
    }

    /// Step 4 (full transition) or step 5 directly (fast path).
    fn on_removal_confirmed(self: &Arc<Self>, id: StrokeId) {
        enum Next {
            ArmAppRenderComplete,
            Complete,
        }
        let next = {
            let mut state = self.state.lock().unwrap();
            if !state.registry.contains(id) {
                return;
            }
            if state.full_transition != Some(id) {
                // A fast-path stroke finishing its queued removal.
                Next::Complete
            } else {
                let Some(slot_index) = state.registry.get(id).map(|record| record.slot)
                else {
                    return;
                };
                let trigger_bridge = {
                    let Some(slots) = state.slots.as_mut() else {
                        return;
                    };
                    let slot = slots.get_mut(slot_index);
                    if slot.trigger {
                        slot.trigger = false;
                        Some(slot.bridge)
                    } else {
                        None
                    }
                };
                match trigger_bridge {
                    Some(bridge) => {
                        // The bridge is empty now; unclipping it is safe and
                        // readies the slot for reuse.
                        {
                            let mut tree = self.app.visuals.lock().unwrap();
                            tree.set_clip(bridge, None);
                        }
                        if let Some(record) = state.registry.get_mut(id) {
                            record.phase = Some(TransitionPhase::ClipClearPending);
                        }
                        Next::ArmAppRenderComplete
                    }
                    None => {
                        // A full transition must still be waiting on its
                        // trigger frame here; anything else means the
                        // flicker-free invariant was violated.
                        debug_assert!(
                            state.app_waiting,
                            "full transition lost its trigger mid-flight"
                        );
                        Next::Complete
                    }
                }
            }
        };
        match next {
            Next::ArmAppRenderComplete => self.arm_app_render_complete(),
            Next::Complete => self.transition_complete(id),
        }
    }

    /// Step 5: release the slot reference and forget the record. Fires the
    /// host completion callback for naturally finished strokes.
    pub(crate) fn transition_complete(self: &Arc<Self>, id: StrokeId) {
        let completed = {
            let mut state = self.state.lock().unwrap();
            if !state.registry.contains(id) {
                return;
            }
            let commit_now = state
                .registry
                .get(id)
                .is_some_and(|record| record.commit_on_complete);
            if commit_now {
                // Quick finish: the live copy is gone, so the finished copy
                // appears now. A frame may have shown neither copy, never
                // both.
                self.materialize_finished_locked(&mut state, id);
            }
            let Some(record) = state.registry.forget(id) else {
                return;
            };
            if state.full_transition == Some(id) {
                state.full_transition = None;
            }
            if let Some(slots) = state.slots.as_mut() {
                let slot = slots.get_mut(record.slot);
                debug_assert!(slot.refs > 0, "slot reference count underflow");
                slot.refs = slot.refs.saturating_sub(1);
            }
            state.stats.completed += 1;
            tracing::debug!(?id, "stroke transition complete");

            record.fill.is_some().then(|| CompletedStroke {
                device: record.device,
                style: record.style.clone(),
                points: record.all_points(),
                start_time: record.start_time,
                end_time: record.last_time,
            })
        };

        if let (Some(stroke), Some(hook)) = (completed, self.completed_hook.as_ref()) {
            hook(stroke);
        }
    }

    /// Synchronously drain every record through the fast-abort path without
    /// waiting for any render-complete signal. Application thread only.
    pub(crate) fn abort_all_now(self: &Arc<Self>) {
        let cleanup = {
            let mut state = self.state.lock().unwrap();
            let mut orphaned_render_visuals = Vec::new();

            for id in state.registry.all_ids() {
                let Some(mut record) = state.registry.forget(id) else {
                    continue;
                };
                record.fill = None;
                if let (Some(visual), Some(roots)) = (record.app_visual.take(), state.roots) {
                    let mut tree = self.app.visuals.lock().unwrap();
                    tree.remove_child(roots.raw_ink, visual);
                }
                if let Some(visual) = record.render_visual.take() {
                    if let Some(slots) = state.slots.as_ref() {
                        orphaned_render_visuals
                            .push((slots.get(record.slot).target_root, visual));
                    }
                }
                if let Some(slots) = state.slots.as_mut() {
                    let slot = slots.get_mut(record.slot);
                    slot.refs = slot.refs.saturating_sub(1);
                }
                state.stats.aborts += 1;
            }

            // Abandon every pending completion; signals for them may never
            // arrive once the render thread goes away.
            state.full_transition = None;
            state.app_waiting = false;
            state.removal_waiting = false;
            state.removal_queue.clear();
            state.epoch += 1;

            if let Some(slots) = state.slots.as_mut() {
                for index in [crate::host_slot::SlotIndex::A, crate::host_slot::SlotIndex::B] {
                    let slot = slots.get_mut(index);
                    if slot.trigger {
                        slot.trigger = false;
                        let bridge = slot.bridge;
                        let mut tree = self.app.visuals.lock().unwrap();
                        tree.set_clip(bridge, None);
                    }
                }
            }

            let render = state
                .render
                .as_ref()
                .map(|render| (render.dispatcher(), render.visuals.clone()));
            (render, orphaned_render_visuals)
        };

        // Best-effort removal of orphaned render-thread visuals; benign if
        // the thread is already gone.
        if let (Some((dispatcher, visuals)), orphaned) = cleanup {
            if !orphaned.is_empty()
                && dispatcher
                    .invoke(Priority::Send, move || {
                        let mut tree = visuals.lock().unwrap();
                        for (target_root, visual) in orphaned {
                            tree.remove_child(target_root, visual);
                        }
                    })
                    .is_err()
            {
                tracing::trace!("render thread gone, orphaned visuals dropped with it");
            }
        }
    }
}
