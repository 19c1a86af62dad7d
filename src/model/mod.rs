//! Data model shared by detection and generation.
//!
//! Every position stored here is in top-left page points (see
//! [`crate::geometry`]). Conversion to PDF content space happens only when a
//! document is written.

mod analysis;
mod field;
mod line;
mod visual;

pub use analysis::{AnalysisResult, Metadata};
pub use field::{
    apply_default_values, is_truthy, split_date, AbsolutePosition, Column, DateParts, DateSlot,
    DetectedField, FieldKind, Validation, VisibilityRule, CHECKBOX_TRUTHY,
};
pub use line::{LabelCandidate, Line};
pub use visual::{Alignment, ExtraImage, LogoPosition, Rgb, VisualConfig};
