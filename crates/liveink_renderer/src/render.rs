//! Incremental stroke rendering.
//!
//! Each accepted batch becomes one contour segment appended as one opaque
//! primitive. Prior primitives are never touched, which is what keeps a
//! partial stroke cheap to extend. Draws land in whichever domain the
//! input arrived on: directly into the app-thread container when already
//! on the application thread, otherwise marshaled to the render thread.

use crate::state::{EngineShared, InkState};
use crate::stroke::StrokeId;
use liveink_core::{DrawPrimitive, InkPoint, StrokeSegment};
use liveink_dispatch::Priority;
use std::sync::Arc;

impl EngineShared {
    /// Render one accepted batch for a stroke.
    pub(crate) fn render_batch(self: &Arc<Self>, id: StrokeId, points: &[InkPoint]) {
        if points.is_empty() {
            return;
        }

        if self.app.dispatcher.check_access() {
            self.draw_on_app_thread(id, points);
            return;
        }

        // Build the segment under the lock: the continuation must see
        // batches in arrival order, and input threads race each other.
        let dispatched = {
            let mut state = self.state.lock().unwrap();
            let segment = {
                let Some(record) = state.registry.get_mut(id) else {
                    return;
                };
                if record.fill.is_none() {
                    return; // aborted while this batch was in flight
                }
                match record.builder.append(points) {
                    Some(segment) => segment,
                    None => return, // duplicate/degenerate input
                }
            };
            let Some(render) = state.render.as_ref() else {
                return;
            };
            let dispatcher = render.dispatcher();
            drop(state);

            let shared = Arc::clone(self);
            dispatcher.invoke(Priority::Send, move || {
                shared.draw_on_render_thread(id, segment);
            })
        };
        if dispatched.is_err() {
            tracing::trace!("render thread gone, stroke segment dropped");
        }
    }

    /// App-thread draw path: the input arrived on the application thread
    /// itself, so the segment goes straight into the app tree.
    fn draw_on_app_thread(self: &Arc<Self>, id: StrokeId, points: &[InkPoint]) {
        let mut state = self.state.lock().unwrap();
        let Some(roots) = state.roots else { return };
        let (segment, fill, opacity, highlighter, existing) = {
            let Some(record) = state.registry.get_mut(id) else {
                return;
            };
            let Some(fill) = record.fill else { return };
            let Some(segment) = record.builder.append(points) else {
                return;
            };
            (
                segment,
                fill,
                record.opacity,
                record.style.highlighter,
                record.app_visual,
            )
        };

        let visual = match existing {
            Some(visual) => visual,
            None => {
                let mut tree = self.app.visuals.lock().unwrap();
                let visual = tree.create_child(roots.raw_ink, "stroke-live");
                if !highlighter {
                    tree.set_opacity(visual, opacity);
                }
                drop(tree);
                if let Some(record) = state.registry.get_mut(id) {
                    record.app_visual = Some(visual);
                }
                visual
            }
        };

        let mut tree = self.app.visuals.lock().unwrap();
        tree.push_primitive(
            visual,
            DrawPrimitive {
                path: segment.path,
                fill,
                bounds: segment.bounds,
            },
        );
    }

    /// Render-thread draw path, executed as a queued callback. The stroke
    /// can be aborted between submission and execution; that race must
    /// resolve to a silent no-op, never a fault.
    fn draw_on_render_thread(self: &Arc<Self>, id: StrokeId, segment: StrokeSegment) {
        let mut state = self.state.lock().unwrap();
        let Some(render) = state.render.as_ref() else {
            return;
        };
        let visuals = render.visuals.clone();

        let (fill, opacity, highlighter, slot, existing) = {
            let Some(record) = state.registry.get(id) else {
                return;
            };
            let Some(fill) = record.fill else {
                return; // aborted concurrently with this draw
            };
            (
                fill,
                record.opacity,
                record.style.highlighter,
                record.slot,
                record.render_visual,
            )
        };

        let visual = match existing {
            Some(visual) => visual,
            None => {
                let Some(slots) = state.slots.as_ref() else {
                    return;
                };
                let target_root = slots.get(slot).target_root;
                let mut tree = visuals.lock().unwrap();
                let visual = tree.create_child(target_root, "stroke-live");
                if !highlighter {
                    tree.set_opacity(visual, opacity);
                }
                drop(tree);
                if let Some(record) = state.registry.get_mut(id) {
                    record.render_visual = Some(visual);
                }
                visual
            }
        };

        let mut tree = visuals.lock().unwrap();
        tree.push_primitive(
            visual,
            DrawPrimitive {
                path: segment.path,
                fill,
                bounds: segment.bounds,
            },
        );
    }

    /// Replay a finishing stroke's accepted batches into a fresh container
    /// under the raw-ink root, giving the application tree a copy identical
    /// to the live one. App thread, engine lock held by caller.
    pub(crate) fn materialize_finished_locked(&self, state: &mut InkState, id: StrokeId) {
        let Some(roots) = state.roots else { return };
        let Some(record) = state.registry.get(id) else {
            return;
        };
        let Some(fill) = record.fill else { return };
        if record.batches.is_empty() {
            return;
        }

        let mut builder = (self.builder_factory)(&record.style);
        let mut tree = self.app.visuals.lock().unwrap();
        let container = tree.create_child(roots.raw_ink, "stroke-finished");
        if !record.style.highlighter {
            tree.set_opacity(container, record.opacity);
        }
        for points in &record.batches {
            if let Some(segment) = builder.append(points) {
                tree.push_primitive(
                    container,
                    DrawPrimitive {
                        path: segment.path,
                        fill,
                        bounds: segment.bounds,
                    },
                );
            }
        }
        tracing::debug!(device = record.device, "finished stroke materialized");
    }
}
