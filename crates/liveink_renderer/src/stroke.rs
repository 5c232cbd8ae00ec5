//! Per-stroke state.
//!
//! A record exists from the down sample (or an explicit reset) until the
//! handoff coordinator confirms the application thread has absorbed the
//! stroke's content and the host slot reference is released.

use crate::config::QualityConfig;
use crate::host_slot::SlotIndex;
use liveink_core::{
    Color, DeviceId, InkPoint, InkStyle, PointBatch, SegmentBuilder, Ticks, VisualId,
};
use slotmap::new_key_type;

new_key_type! {
    /// Unique identifier for a stroke record
    pub struct StrokeId;
}

/// Opaque token returned by `down`/`up`, handed back by the host once it
/// has finished routing the event.
#[derive(Clone, Copy, Debug)]
pub struct InputAck {
    pub(crate) id: StrokeId,
}

/// Phase of the flicker-free handoff a stroke is currently in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TransitionPhase {
    /// Trigger armed on the host slot; waiting for the app thread's frame.
    ClipPending,
    /// Waiting for the render thread to drop the live visual.
    WaitRenderRemoval,
    /// Removal committed on the render thread; app thread not yet told.
    WaitAppNotify,
    /// Trigger cleared; waiting for the app thread's final frame.
    ClipClearPending,
}

pub(crate) struct StrokeRecord {
    pub device: DeviceId,
    pub start_time: Ticks,
    pub last_time: Ticks,

    pub seen_up: bool,
    pub is_reset: bool,
    pub can_render: bool,
    pub check_valid: bool,

    /// Samples accumulated while the quality gate is still closed.
    pub pending: Vec<InkPoint>,
    /// Every accepted batch in arrival order; replayed for the finished copy.
    pub batches: Vec<PointBatch>,
    /// Geometry continuation. Must be fed samples in arrival order.
    pub builder: Box<dyn SegmentBuilder>,

    /// Incremental container in the app tree. UI thread only.
    pub app_visual: Option<VisualId>,
    /// Incremental container in the render tree. Render thread only.
    pub render_visual: Option<VisualId>,

    /// Style snapshot taken at creation; later style changes do not apply.
    pub style: InkStyle,
    /// Container opacity derived from the snapshot.
    pub opacity: f32,
    /// Fill for new primitives; cleared on abort so queued draws no-op.
    pub fill: Option<Color>,

    pub slot: SlotIndex,
    pub phase: Option<TransitionPhase>,
    /// Quick-finish path: materialize the finished copy at completion.
    pub commit_on_complete: bool,
}

impl StrokeRecord {
    pub fn new(
        device: DeviceId,
        timestamp: Ticks,
        style: InkStyle,
        slot: SlotIndex,
        builder: Box<dyn SegmentBuilder>,
        quality: &QualityConfig,
    ) -> Self {
        // Consecutive incremental segments overlap where they join, which
        // would double-blend a translucent fill. Non-highlighter strokes
        // draw opaque and carry the alpha on the container instead.
        let (opacity, fill) = if style.highlighter {
            (1.0, style.color)
        } else {
            (style.color.a, style.color.opaque())
        };
        Self {
            device,
            start_time: timestamp,
            last_time: timestamp,
            seen_up: false,
            is_reset: false,
            can_render: !quality.gated(),
            check_valid: quality.max_jump.is_some(),
            pending: Vec::new(),
            batches: Vec::new(),
            builder,
            app_visual: None,
            render_visual: None,
            style,
            opacity,
            fill: Some(fill),
            slot,
            phase: None,
            commit_on_complete: false,
        }
    }

    /// Whether `timestamp` falls inside this stroke's window. Tolerates the
    /// tick counter wrapping between start and end.
    pub fn is_timestamp_within(&self, timestamp: Ticks) -> bool {
        if !self.seen_up {
            // An open stroke claims every timestamp.
            return true;
        }
        if self.start_time <= self.last_time {
            self.start_time <= timestamp && timestamp <= self.last_time
        } else {
            // Counter wrapped between start and end.
            timestamp >= self.start_time || timestamp <= self.last_time
        }
    }

    /// Whether `timestamp` continues this stroke forward. Out-of-order
    /// samples fail this test and are dropped before rendering.
    pub fn is_timestamp_after(&self, timestamp: Ticks) -> bool {
        if self.seen_up {
            // Nothing is after a closed stroke.
            return false;
        }
        if self.last_time >= self.start_time {
            if timestamp >= self.last_time {
                true
            } else {
                // Accept the instant the counter wraps negative.
                self.last_time > 0 && timestamp < 0
            }
        } else {
            // Already wrapped: the window between last and start is ahead.
            self.last_time <= timestamp && timestamp <= self.start_time
        }
    }

    /// Run `points` through the quality gate. Returns the samples to draw
    /// now: the batch itself once the gate is open, or the flushed backlog
    /// the moment it opens. Accepted samples are also recorded for the
    /// finished-stroke replay.
    pub fn accept_batch(&mut self, points: &[InkPoint], quality: &QualityConfig) -> Option<Vec<InkPoint>> {
        if points.is_empty() {
            return None;
        }
        if self.can_render {
            self.batches.push(points.iter().copied().collect());
            return Some(points.to_vec());
        }

        if self.check_valid {
            if let Some(max_jump) = quality.max_jump {
                for point in points {
                    if let Some(last) = self.pending.last() {
                        let jump = last.position().distance(point.position());
                        if jump > max_jump {
                            // Jitter spike: restart accumulation here.
                            tracing::debug!(
                                device = self.device,
                                jump,
                                "sample jump over threshold, accumulation restarted"
                            );
                            self.pending.clear();
                            self.can_render = true;
                            self.check_valid = false;
                        }
                    }
                    self.pending.push(*point);
                }
            } else {
                self.pending.extend_from_slice(points);
            }
        } else {
            self.pending.extend_from_slice(points);
        }

        if let Some(span) = quality.min_time_span {
            if self.last_time.wrapping_sub(self.start_time) >= span {
                self.can_render = true;
                self.check_valid = false;
            }
        }
        if let Some(count) = quality.min_points {
            if self.pending.len() >= count {
                self.can_render = true;
                self.check_valid = false;
            }
        }

        if self.can_render {
            let flushed = std::mem::take(&mut self.pending);
            if flushed.is_empty() {
                return None;
            }
            self.batches.push(flushed.iter().copied().collect());
            Some(flushed)
        } else {
            None
        }
    }

    /// All accepted samples in arrival order.
    pub fn all_points(&self) -> Vec<InkPoint> {
        self.batches.iter().flat_map(|b| b.iter().copied()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liveink_core::{batch, PolylineBuilder};

    fn record(start: Ticks) -> StrokeRecord {
        StrokeRecord::new(
            1,
            start,
            InkStyle::default(),
            SlotIndex::A,
            Box::new(PolylineBuilder::new(2.0)),
            &QualityConfig::permissive(),
        )
    }

    #[test]
    fn test_open_stroke_claims_every_timestamp() {
        let record = record(100);
        assert!(record.is_timestamp_within(0));
        assert!(record.is_timestamp_within(i32::MIN));
        assert!(record.is_timestamp_within(i32::MAX));
    }

    #[test]
    fn test_window_after_up_without_wrap() {
        let mut record = record(100);
        record.last_time = 200;
        record.seen_up = true;

        assert!(record.is_timestamp_within(100));
        assert!(record.is_timestamp_within(150));
        assert!(record.is_timestamp_within(200));
        assert!(!record.is_timestamp_within(99));
        assert!(!record.is_timestamp_within(201));
    }

    #[test]
    fn test_window_with_wrapped_counter() {
        // Counter wrapped between start and end: start near i32::MAX, end
        // just past the wrap.
        let mut record = record(0x7FFF_FFF0);
        record.last_time = 5;
        record.seen_up = true;

        assert!(record.is_timestamp_within(0x7FFF_FFF0));
        assert!(record.is_timestamp_within(i32::MAX));
        assert!(record.is_timestamp_within(i32::MIN));
        assert!(record.is_timestamp_within(0));
        assert!(record.is_timestamp_within(5));
        assert!(!record.is_timestamp_within(6));
        assert!(!record.is_timestamp_within(0x7FFF_FFEF));
    }

    #[test]
    fn test_nothing_is_after_a_closed_stroke() {
        let mut record = record(100);
        record.last_time = 200;
        record.seen_up = true;
        assert!(!record.is_timestamp_after(300));
    }

    #[test]
    fn test_after_without_wrap() {
        let mut record = record(100);
        record.last_time = 150;

        assert!(record.is_timestamp_after(150)); // same tick continues
        assert!(record.is_timestamp_after(151));
        assert!(!record.is_timestamp_after(149));
        assert!(!record.is_timestamp_after(100));
    }

    #[test]
    fn test_after_accepts_the_wrap_instant() {
        let mut record = record(100);
        record.last_time = i32::MAX;

        // The counter just wrapped negative.
        assert!(record.is_timestamp_after(i32::MIN));
        assert!(record.is_timestamp_after(-1));
    }

    #[test]
    fn test_after_when_already_wrapped() {
        // last < start: the stroke already wrapped. Only timestamps between
        // last and start continue it.
        let mut record = record(0x7FFF_FFF0);
        record.last_time = 5;

        assert!(record.is_timestamp_after(5));
        assert!(record.is_timestamp_after(1000));
        assert!(record.is_timestamp_after(0x7FFF_FFF0));
        assert!(!record.is_timestamp_after(4));
        assert!(!record.is_timestamp_after(0x7FFF_FFF1));
    }

    #[test]
    fn test_predicate_sweep_across_wrap_boundary() {
        // Dense sweep near the wrap per the truth table: for every
        // timestamp, "within" after up must equal the wrapped-interval
        // membership test.
        let start: Ticks = 0x7FFF_FFF0;
        let last: Ticks = 5;
        let mut record = record(start);
        record.last_time = last;
        record.seen_up = true;

        for offset in -40i64..40 {
            let t = (start as i64 + offset) as Ticks;
            let expected = t >= start || t <= last;
            assert_eq!(record.is_timestamp_within(t), expected, "t = {t:#x}");
        }
    }

    #[test]
    fn test_permissive_gate_passes_batches_straight_through() {
        let mut record = record(100);
        assert!(record.can_render);
        let drawn = record
            .accept_batch(&batch(&[(0.0, 0.0)]), &QualityConfig::permissive())
            .unwrap();
        assert_eq!(drawn.len(), 1);
        assert_eq!(record.batches.len(), 1);
    }

    #[test]
    fn test_min_points_gate_flushes_backlog() {
        let quality = QualityConfig {
            min_points: Some(3),
            ..Default::default()
        };
        let mut record = StrokeRecord::new(
            1,
            100,
            InkStyle::default(),
            SlotIndex::A,
            Box::new(PolylineBuilder::new(2.0)),
            &quality,
        );
        assert!(!record.can_render);

        assert!(record.accept_batch(&batch(&[(0.0, 0.0)]), &quality).is_none());
        assert!(record.accept_batch(&batch(&[(1.0, 1.0)]), &quality).is_none());

        let flushed = record
            .accept_batch(&batch(&[(2.0, 2.0)]), &quality)
            .unwrap();
        assert_eq!(flushed.len(), 3);
        assert!(record.can_render);
        // Backlog flushed as one accepted batch.
        assert_eq!(record.batches.len(), 1);
    }

    #[test]
    fn test_max_jump_restarts_accumulation() {
        let quality = QualityConfig {
            max_jump: Some(10.0),
            min_points: Some(100),
            ..Default::default()
        };
        let mut record = StrokeRecord::new(
            1,
            100,
            InkStyle::default(),
            SlotIndex::A,
            Box::new(PolylineBuilder::new(2.0)),
            &quality,
        );

        assert!(record.accept_batch(&batch(&[(0.0, 0.0)]), &quality).is_none());
        // A 500px jump discards the backlog and opens the gate from here.
        let flushed = record
            .accept_batch(&batch(&[(500.0, 0.0)]), &quality)
            .unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].x, 500.0);
        assert!(record.can_render);
        assert!(!record.check_valid);
    }

    #[test]
    fn test_time_span_gate() {
        let quality = QualityConfig {
            min_time_span: Some(35),
            ..Default::default()
        };
        let mut record = StrokeRecord::new(
            1,
            100,
            InkStyle::default(),
            SlotIndex::A,
            Box::new(PolylineBuilder::new(2.0)),
            &quality,
        );

        record.last_time = 120;
        assert!(record.accept_batch(&batch(&[(0.0, 0.0)]), &quality).is_none());

        record.last_time = 140;
        let flushed = record
            .accept_batch(&batch(&[(1.0, 1.0)]), &quality)
            .unwrap();
        assert_eq!(flushed.len(), 2);
    }

    #[test]
    fn test_highlighter_keeps_fill_alpha() {
        let style = InkStyle::highlighter(Color::rgba(1.0, 1.0, 0.0, 0.4), 12.0);
        let record = StrokeRecord::new(
            1,
            0,
            style,
            SlotIndex::A,
            Box::new(PolylineBuilder::new(12.0)),
            &QualityConfig::permissive(),
        );
        assert_eq!(record.opacity, 1.0);
        assert_eq!(record.fill.unwrap().a, 0.4);
    }

    #[test]
    fn test_solid_stroke_premultiplies_alpha_into_opacity() {
        let style = InkStyle::new(Color::rgba(0.0, 0.0, 0.0, 0.5), 2.0);
        let record = StrokeRecord::new(
            1,
            0,
            style,
            SlotIndex::A,
            Box::new(PolylineBuilder::new(2.0)),
            &QualityConfig::permissive(),
        );
        assert_eq!(record.opacity, 0.5);
        assert_eq!(record.fill.unwrap().a, 1.0);
    }
}
