//! Liveink Core Primitives
//!
//! This crate provides the foundational types for the Liveink low-latency
//! inking engine:
//!
//! - **Geometry**: points, sizes, rectangles
//! - **Ink samples and styles**: raw stylus samples, immutable style snapshots
//! - **Stroke segments**: the incremental geometry-builder seam between raw
//!   samples and drawable contours
//! - **Visual trees**: container visuals with opacity, clipping, and
//!   append-only draw primitives, each container owned by exactly one thread

pub mod color;
pub mod geometry;
pub mod path;
pub mod sample;
pub mod style;
pub mod visual;

pub use color::Color;
pub use geometry::{Point, Rect, Size, Vec2};
pub use path::{Path, PathCommand, PolylineBuilder, SegmentBuilder, StrokeSegment};
pub use sample::{batch, DeviceId, InkPoint, PointBatch, Ticks, POINTER_DEVICE_ID};
pub use style::{InkStyle, StyleError, TipShape};
pub use visual::{ClipShape, DrawPrimitive, SharedVisualTree, VisualId, VisualNode, VisualTree};
