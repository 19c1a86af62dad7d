//! Fillable form generation.
//!
//! Generation happens in two steps. [`LayoutEngine`] places every field,
//! either flowing down the page in columns or at its absolute position, and
//! records what to draw as plain data in top-left page points. [`FormWriter`]
//! then turns that layout into a lopdf document: page content, an optional
//! background drawn beneath it, and one AcroForm widget per interactive
//! field.
//!
//! [`overlay_fields`] skips drawing entirely and only adds widgets to an
//! existing document.

mod layout;
mod options;
mod synth;
mod writer;

pub use layout::{
    overlay_widgets, FormLayout, ImageSlot, LayoutEngine, Mark, PageLayout, WidgetKind,
    WidgetSpec, COLUMN_GUTTER, FIELD_BREAK_MARGIN, FLOW_START, MARGIN_X, MAX_PAGES, OVERLAY_MAX_LEN,
    SECTION_BREAK_MARGIN, TITLE_BASELINE,
};
pub use options::ComposeOptions;
pub use synth::{
    state_name, validation_script, visibility_script, SynthesizedField, WidgetSynth,
    FF_NO_TOGGLE_TO_OFF,
};
pub use writer::{add_fields_to_pdf, overlay_fields, FormWriter};
