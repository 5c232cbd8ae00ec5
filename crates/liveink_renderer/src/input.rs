//! Input event routing.
//!
//! Samples may arrive on the application thread or on platform input
//! threads. Handlers do their bookkeeping under the engine mutex and only
//! then touch the rendering paths, so the mutex is never held across a
//! cross-thread dispatch.

use crate::handoff::FinishMode;
use crate::stroke::{InputAck, StrokeRecord};
use crate::state::EngineShared;
use liveink_core::{DeviceId, InkPoint, Ticks, POINTER_DEVICE_ID};
use std::sync::Arc;

impl EngineShared {
    /// A contact began. Returns an ack token the host must hand back via
    /// `down_processed` once it has routed the event; `None` when inking is
    /// not set up or a stroke is already open for the key.
    pub(crate) fn stylus_down(
        self: &Arc<Self>,
        device: DeviceId,
        timestamp: Ticks,
        points: &[InkPoint],
    ) -> Option<InputAck> {
        let (id, draw_now) = {
            let mut state = self.state.lock().unwrap();
            if state.roots.is_none() || state.slots.is_none() {
                return None;
            }
            if state.registry.find(device, timestamp).is_some() {
                // One open stroke per key.
                return None;
            }

            let transitioning_slot = state
                .full_transition
                .and_then(|id| state.registry.get(id).map(|record| record.slot));
            let slot = {
                let slots = state.slots.as_mut()?;
                let slot = slots.pick_current(transitioning_slot);
                slots.get_mut(slot).refs += 1;
                slot
            };

            let style = state.style.clone();
            let builder = (self.builder_factory)(&style);
            let mut record =
                StrokeRecord::new(device, timestamp, style, slot, builder, &self.quality);
            let draw_now = record.accept_batch(points, &self.quality);
            let id = state.registry.insert(record);
            tracing::debug!(device, timestamp, "stroke started");
            (id, draw_now)
        };

        if let Some(points) = draw_now {
            self.render_batch(id, &points);
        }
        Some(InputAck { id })
    }

    /// Contact moved. Out-of-order and duplicate timestamps are dropped.
    pub(crate) fn stylus_move(
        self: &Arc<Self>,
        device: DeviceId,
        timestamp: Ticks,
        points: &[InkPoint],
    ) {
        let work = {
            let mut state = self.state.lock().unwrap();
            if state.roots.is_none() {
                return;
            }
            let Some(id) = state.registry.find(device, timestamp) else {
                return;
            };
            let Some(record) = state.registry.get_mut(id) else {
                return;
            };
            if record.device != device {
                return;
            }
            // Only in-order samples render: the geometry continuation
            // extends from the last point it saw.
            if !record.is_timestamp_after(timestamp) {
                return;
            }
            record.last_time = timestamp;
            record
                .accept_batch(points, &self.quality)
                .map(|points| (id, points))
        };

        if let Some((id, points)) = work {
            self.render_batch(id, &points);
        }
    }

    /// A contact ended. The terminal batch still renders; the stroke is
    /// closed and handed off once the host confirms routing via
    /// `up_processed`.
    pub(crate) fn stylus_up(
        self: &Arc<Self>,
        device: DeviceId,
        timestamp: Ticks,
        points: &[InkPoint],
    ) -> Option<InputAck> {
        let (id, draw_now) = {
            let mut state = self.state.lock().unwrap();
            if state.roots.is_none() {
                return None;
            }
            let id = state.registry.find(device, timestamp)?;
            let accept = {
                let record = state.registry.get(id)?;
                record.device == device
                    || (device == POINTER_DEVICE_ID
                        && (record.is_reset
                            || (record.is_timestamp_after(timestamp)
                                && self.tracker.is_device_up(record.device))))
            };
            if !accept {
                return None;
            }
            let record = state.registry.get_mut(id)?;
            let draw_now = record.accept_batch(points, &self.quality);
            record.seen_up = true;
            record.last_time = timestamp;
            tracing::debug!(device, timestamp, "stroke terminal sample seen");
            (id, draw_now)
        };

        if let Some(points) = draw_now {
            self.render_batch(id, &points);
        }
        Some(InputAck { id })
    }

    /// Host finished routing a down event. An unverified target means the
    /// stroke was speculative: discard it.
    pub(crate) fn down_processed(self: &Arc<Self>, ack: InputAck, target_verified: bool) {
        if !target_verified {
            self.transition_stroke(ack.id, FinishMode::Discard);
        }
    }

    /// Host finished routing an up event: hand the stroke off, keeping its
    /// content only when the target was verified.
    pub(crate) fn up_processed(self: &Arc<Self>, ack: InputAck, target_verified: bool) {
        let mode = if target_verified {
            FinishMode::Commit
        } else {
            FinishMode::Discard
        };
        self.transition_stroke(ack.id, mode);
    }

    /// Confirmed enter/leave mid-stroke force-aborts the stroke; the device
    /// crossed the element boundary while inking.
    pub(crate) fn stylus_enter_leave(
        self: &Arc<Self>,
        device: DeviceId,
        timestamp: Ticks,
        is_enter: bool,
        confirmed: bool,
    ) {
        if !confirmed {
            return; // speculative pass; wait for the confirmed one
        }
        let abort = {
            let state = self.state.lock().unwrap();
            let Some(id) = state.registry.find(device, timestamp) else {
                return;
            };
            let Some(record) = state.registry.get(id) else {
                return;
            };
            if record.device != device {
                return;
            }
            let mid_stroke = (is_enter && timestamp > record.start_time)
                || (!is_enter && !record.seen_up);
            mid_stroke.then_some(id)
        };
        if let Some(id) = abort {
            tracing::debug!(device, is_enter, "device crossed boundary mid-stroke, aborting");
            self.transition_stroke(id, FinishMode::Discard);
        }
    }
}
