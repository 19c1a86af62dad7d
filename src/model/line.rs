//! Detection intermediates: horizontal lines and label candidates.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// A horizontal segment in top-left page points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Left end
    pub x_start: f32,
    /// Right end
    pub x_end: f32,
    /// Vertical position from the page top
    pub y: f32,
}

impl Line {
    /// Create a line, ordering the endpoints.
    pub fn new(x0: f32, x1: f32, y: f32) -> Self {
        Self {
            x_start: x0.min(x1),
            x_end: x0.max(x1),
            y,
        }
    }

    /// Horizontal length.
    pub fn length(&self) -> f32 {
        self.x_end - self.x_start
    }
}

/// A piece of page text that looks like a field label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCandidate {
    /// Cleaned label text
    pub text: String,
    /// Bounding box of the source text line
    pub bbox: Rect,
    /// Mean font size of the line's spans (0 when unknown)
    pub font_size: f32,
}

impl LabelCandidate {
    /// Create a candidate.
    pub fn new(text: impl Into<String>, bbox: Rect, font_size: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            font_size,
        }
    }
}
