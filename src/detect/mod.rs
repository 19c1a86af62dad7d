//! Form field detection.
//!
//! [`DocumentAnalyzer`] reads native AcroForm fields when a document has
//! them. Otherwise it looks for the visual shape of a form on every page:
//! horizontal rules found in the vector content and in a rendered bitmap,
//! merged, then matched to label text.

mod acroform;
mod analyzer;
mod associate;
mod config;
mod labels;
mod lexicon;
mod locate;
mod merge;
mod raster;
mod title;
mod vector;
mod worker;

pub use acroform::{
    extract_acroform_fields, FF_COMBO, FF_MULTILINE, FF_PUSHBUTTON, FF_RADIO, FF_REQUIRED,
};
pub use analyzer::DocumentAnalyzer;
pub use associate::{Associator, Placement};
pub use config::{AnalyzerConfig, AssociationRules, LabelRules, LineTolerances, RasterConfig};
pub use labels::LabelExtractor;
pub use lexicon::{Lexicon, TypeRule};
pub use locate::{find_box_at, find_box_in_document, AXIS_TOLERANCE, MIN_BOX_AREA, SEARCH_RADIUS};
pub use merge::merge_lines;
pub use raster::{detect_lines_in_image, detect_raster_lines};
pub use title::{detect_title, MIN_TITLE_CHARS};
pub use vector::detect_vector_lines;
pub use worker::{spawn_analysis, AnalysisEvent, AnalysisHandle};
