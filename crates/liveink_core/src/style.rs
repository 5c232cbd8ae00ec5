//! Drawing style for ink strokes.
//!
//! A stroke takes an immutable snapshot of the style at the moment it
//! begins; changing the style mid-stroke affects the next stroke only.

use crate::color::Color;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape of the stylus tip used when expanding samples into an outline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TipShape {
    #[default]
    Ellipse,
    Rectangle,
}

/// Drawing attributes for a stroke.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InkStyle {
    pub color: Color,
    /// Tip width in device-independent pixels.
    pub width: f32,
    /// Highlighter strokes keep their translucent fill as-is instead of
    /// pre-multiplying alpha into the container opacity.
    pub highlighter: bool,
    pub tip: TipShape,
}

impl InkStyle {
    pub fn new(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            highlighter: false,
            tip: TipShape::default(),
        }
    }

    pub fn highlighter(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            highlighter: true,
            tip: TipShape::Rectangle,
        }
    }

    /// Validate the style before it is accepted as the active style.
    pub fn validate(&self) -> Result<(), StyleError> {
        if !self.width.is_finite() || self.width <= 0.0 {
            return Err(StyleError::InvalidWidth(self.width));
        }
        if !self.color.is_finite() {
            return Err(StyleError::InvalidColor);
        }
        Ok(())
    }
}

impl Default for InkStyle {
    fn default() -> Self {
        Self::new(Color::BLACK, 2.0)
    }
}

/// Errors produced when validating a drawing style.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StyleError {
    /// Stroke width must be finite and positive
    #[error("invalid stroke width: {0}")]
    InvalidWidth(f32),

    /// Color components must be finite
    #[error("color has non-finite components")]
    InvalidColor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_style_is_valid() {
        assert!(InkStyle::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_width() {
        let mut style = InkStyle::default();
        style.width = 0.0;
        assert_eq!(style.validate(), Err(StyleError::InvalidWidth(0.0)));

        style.width = f32::NAN;
        assert!(matches!(
            style.validate(),
            Err(StyleError::InvalidWidth(_))
        ));
    }

    #[test]
    fn test_rejects_non_finite_color() {
        let mut style = InkStyle::default();
        style.color.g = f32::INFINITY;
        assert_eq!(style.validate(), Err(StyleError::InvalidColor));
    }
}
