//! Stroke path building.
//!
//! Incremental rendering converts each batch of samples into one contour
//! segment that is appended to the stroke's visual and never touched again.
//! The [`SegmentBuilder`] trait is the seam to the tessellation collaborator:
//! a builder is a *continuation* — it must be fed samples in arrival order,
//! carrying enough state (at minimum the previous sample) that consecutive
//! segments join seamlessly. Restarting a builder from scratch is not
//! equivalent to continuing it.

use crate::geometry::{Point, Rect};
use crate::sample::InkPoint;
use smallvec::SmallVec;

/// Path command
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    Close,
}

/// A 2D path composed of commands
#[derive(Clone, Debug, Default)]
pub struct Path {
    commands: SmallVec<[PathCommand; 16]>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn move_to(&mut self, point: Point) {
        self.commands.push(PathCommand::MoveTo(point));
    }

    pub fn line_to(&mut self, point: Point) {
        self.commands.push(PathCommand::LineTo(point));
    }
}

/// One drawable contour increment produced from a batch of samples.
#[derive(Clone, Debug)]
pub struct StrokeSegment {
    pub path: Path,
    pub bounds: Rect,
}

/// Converts sample batches into contour segments, one call per batch.
///
/// Implementations own the continuation state between calls. Returning
/// `None` means the batch added nothing drawable (empty, duplicate, or
/// degenerate input) and no primitive must be appended for it.
pub trait SegmentBuilder: Send {
    fn append(&mut self, points: &[InkPoint]) -> Option<StrokeSegment>;
}

/// Default segment builder: connects samples with straight segments,
/// remembering the previous sample so consecutive batches join.
///
/// A single isolated sample yields a zero-length segment (a dot when drawn
/// with a round cap). Samples identical to the previous one are dropped,
/// which is what makes re-delivery of a terminal sample draw nothing.
pub struct PolylineBuilder {
    last: Option<Point>,
    half_width: f32,
}

impl PolylineBuilder {
    pub fn new(width: f32) -> Self {
        Self {
            last: None,
            half_width: width * 0.5,
        }
    }
}

impl SegmentBuilder for PolylineBuilder {
    fn append(&mut self, points: &[InkPoint]) -> Option<StrokeSegment> {
        if points.is_empty() {
            return None;
        }

        let mut path = Path::new();
        let mut bounds = Rect::ZERO;
        let mut cursor = self.last;

        for sample in points {
            let p = sample.position();
            match cursor {
                Some(prev) if prev == p => continue, // duplicate sample
                Some(prev) => {
                    if path.is_empty() {
                        path.move_to(prev);
                    }
                    path.line_to(p);
                    bounds = bounds.union(Rect::bounding(prev, p, self.half_width));
                }
                None => {
                    // First sample of the stroke: a dot until more arrive.
                    path.move_to(p);
                    path.line_to(p);
                    bounds = Rect::bounding(p, p, self.half_width);
                }
            }
            cursor = Some(p);
        }

        if path.is_empty() {
            return None;
        }

        self.last = cursor;
        Some(StrokeSegment { path, bounds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::batch;

    #[test]
    fn test_empty_batch_yields_nothing() {
        let mut builder = PolylineBuilder::new(2.0);
        assert!(builder.append(&[]).is_none());
    }

    #[test]
    fn test_first_sample_is_a_dot() {
        let mut builder = PolylineBuilder::new(2.0);
        let segment = builder.append(&batch(&[(3.0, 4.0)])).unwrap();
        assert_eq!(
            segment.path.commands(),
            &[
                PathCommand::MoveTo(Point::new(3.0, 4.0)),
                PathCommand::LineTo(Point::new(3.0, 4.0)),
            ]
        );
        assert_eq!(segment.bounds, Rect::new(2.0, 3.0, 2.0, 2.0));
    }

    #[test]
    fn test_segments_continue_from_previous_batch() {
        let mut builder = PolylineBuilder::new(2.0);
        builder.append(&batch(&[(0.0, 0.0)]));

        let segment = builder.append(&batch(&[(1.0, 1.0), (2.0, 2.0)])).unwrap();
        assert_eq!(
            segment.path.commands(),
            &[
                PathCommand::MoveTo(Point::ZERO),
                PathCommand::LineTo(Point::new(1.0, 1.0)),
                PathCommand::LineTo(Point::new(2.0, 2.0)),
            ]
        );
    }

    #[test]
    fn test_duplicate_samples_are_dropped() {
        let mut builder = PolylineBuilder::new(2.0);
        builder.append(&batch(&[(1.0, 1.0)]));

        // Re-delivering the same sample adds nothing.
        assert!(builder.append(&batch(&[(1.0, 1.0)])).is_none());

        // Mixed batch keeps only the fresh point.
        let segment = builder
            .append(&batch(&[(1.0, 1.0), (2.0, 2.0)]))
            .unwrap();
        assert_eq!(segment.path.commands().len(), 2);
    }

    #[test]
    fn test_bounds_cover_all_segments() {
        let mut builder = PolylineBuilder::new(4.0);
        let segment = builder
            .append(&batch(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]))
            .unwrap();
        assert_eq!(segment.bounds, Rect::new(-2.0, -2.0, 14.0, 14.0));
    }
}
