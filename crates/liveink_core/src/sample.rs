//! Raw input samples as delivered by the host input layer.

use smallvec::SmallVec;

/// Identifier of the input device a sample came from.
pub type DeviceId = u32;

/// Reserved device id for the default pointer (mouse) device.
pub const POINTER_DEVICE_ID: DeviceId = 0;

/// Wrapping 32-bit tick counter used to timestamp samples. Comparisons must
/// tolerate the counter wrapping past `i32::MAX` back to negative values.
pub type Ticks = i32;

/// One raw stylus/touch sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InkPoint {
    pub x: f32,
    pub y: f32,
    /// Normalized contact pressure, 0.5 for devices that do not report it.
    pub pressure: f32,
}

impl InkPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            pressure: 0.5,
        }
    }

    pub fn with_pressure(x: f32, y: f32, pressure: f32) -> Self {
        Self { x, y, pressure }
    }

    pub fn position(&self) -> crate::geometry::Point {
        crate::geometry::Point::new(self.x, self.y)
    }
}

/// An ordered batch of samples delivered by one input event.
pub type PointBatch = SmallVec<[InkPoint; 8]>;

/// Convenience constructor for tests and demos.
pub fn batch(points: &[(f32, f32)]) -> PointBatch {
    points
        .iter()
        .map(|&(x, y)| InkPoint::new(x, y))
        .collect()
}
