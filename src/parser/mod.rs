//! PDF parsing module.

mod content;
mod document;
mod fonts;
mod options;
mod text;

pub use content::{
    interpret_page, Matrix, PageContent, PaintedPath, PathItem, PlacedImage, Point, RasterImage,
};
pub use document::PdfDocument;
pub use fonts::FontMetrics;
pub use options::{ErrorMode, ExtractMode, ParseOptions};
pub use text::{
    decode_text_string, encode_text_string, encode_win_ansi, group_spans_into_lines, TextLine,
    TextSpan,
};

pub(crate) use document::{
    get_string_from_dict, inherited, page_media_box, resolve, resolve_dict,
};
