//! # formpdf
//!
//! Form field detection, coordinate mapping and fillable PDF generation.
//!
//! formpdf reads a PDF and finds where its form fields are: native AcroForm
//! fields when the document has them, otherwise the blank lines and boxes a
//! printed form is made of, matched to their labels. It can then generate a
//! fillable document from a field list, either drawing a fresh form or
//! placing widgets on top of an existing one.
//!
//! ## Quick Start
//!
//! ```no_run
//! use formpdf::{analyze_file, generate_form, ComposeOptions};
//!
//! fn main() -> formpdf::Result<()> {
//!     let analysis = analyze_file("solicitud_escaneada.pdf");
//!     if !analysis.success {
//!         eprintln!("{}", analysis.error.unwrap_or_default());
//!         return Ok(());
//!     }
//!
//!     // Redraw the detected fields as a fillable form
//!     let options = ComposeOptions::new().with_title("Solicitud");
//!     generate_form(&analysis.fields, &options, "solicitud.pdf")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **AcroForm extraction**: inherited flags, radio kids, choice options
//! - **Visual detection**: vector and raster line detection, merged and
//!   associated with label text
//! - **Coordinate mapping**: one top-left point convention, flipped only at
//!   the PDF boundary
//! - **Generation**: flowing or absolute layout, date sub-fields, radio
//!   groups, validation and visibility scripts, background merging
//! - **Parallel processing**: raster detection across pages with Rayon

pub mod compose;
pub mod detect;
pub mod error;
pub mod geometry;
pub mod model;
pub mod parser;
pub mod render;
pub mod sniff;

// Re-export commonly used types
pub use compose::{add_fields_to_pdf, ComposeOptions, FormWriter};
pub use detect::{AnalyzerConfig, DocumentAnalyzer, Lexicon};
pub use error::{Error, Result};
pub use geometry::{PageFrame, Rect};
pub use model::{
    AbsolutePosition, AnalysisResult, Column, DetectedField, FieldKind, Validation,
    VisibilityRule, VisualConfig,
};
pub use parser::{ParseOptions, PdfDocument};
pub use render::PreviewCache;
pub use sniff::{is_pdf, is_pdf_bytes, sniff_bytes, sniff_path, PdfHeader};

use std::path::Path;

/// Analyze a PDF file with the default configuration.
///
/// Failures to read the document are reported through
/// [`AnalysisResult::success`] rather than as an error, so callers can tell
/// "no fields" apart from "unreadable file".
///
/// # Example
///
/// ```no_run
/// use formpdf::analyze_file;
///
/// let result = analyze_file("formulario.pdf");
/// println!("{} fields, AcroForm: {}", result.fields.len(), result.has_acroform);
/// ```
pub fn analyze_file<P: AsRef<Path>>(path: P) -> AnalysisResult {
    DocumentAnalyzer::new().analyze_file(path)
}

/// Analyze a PDF file with a custom configuration.
///
/// # Example
///
/// ```no_run
/// use formpdf::{analyze_file_with_config, AnalyzerConfig, Lexicon};
///
/// let config = AnalyzerConfig::new()
///     .with_lexicon(Lexicon::english())
///     .vector_only();
/// let result = analyze_file_with_config("form.pdf", config);
/// ```
pub fn analyze_file_with_config<P: AsRef<Path>>(path: P, config: AnalyzerConfig) -> AnalysisResult {
    DocumentAnalyzer::with_config(config).analyze_file(path)
}

/// Analyze a PDF held in memory.
pub fn analyze_bytes(data: &[u8]) -> AnalysisResult {
    DocumentAnalyzer::new().analyze_bytes(data)
}

/// Generate a fillable PDF at `path`.
///
/// # Example
///
/// ```no_run
/// use formpdf::{generate_form, ComposeOptions, DetectedField, FieldKind};
///
/// let fields = vec![
///     DetectedField::new("Nombre", FieldKind::Text).required(true),
///     DetectedField::new("Fecha de nacimiento", FieldKind::from_type_name("date", vec![])),
/// ];
/// generate_form(&fields, &ComposeOptions::new(), "alta.pdf")?;
/// # Ok::<(), formpdf::Error>(())
/// ```
pub fn generate_form<P: AsRef<Path>>(
    fields: &[DetectedField],
    options: &ComposeOptions,
    path: P,
) -> Result<()> {
    FormWriter::new(options.clone()).write_to_file(fields, path)
}

/// Generate a fillable PDF in memory.
pub fn generate_form_bytes(fields: &[DetectedField], options: &ComposeOptions) -> Result<Vec<u8>> {
    FormWriter::new(options.clone()).write_to_bytes(fields)
}

/// Find the drawn box around a point on a page, in top-left page points.
///
/// # Example
///
/// ```no_run
/// use formpdf::locate_box;
///
/// if let Some(rect) = locate_box("formulario.pdf", 0, 200.0, 310.0)? {
///     println!("{:?}", rect);
/// }
/// # Ok::<(), formpdf::Error>(())
/// ```
pub fn locate_box<P: AsRef<Path>>(path: P, page: usize, x: f32, y: f32) -> Result<Option<Rect>> {
    let doc = PdfDocument::open(path)?;
    detect::find_box_in_document(&doc, page, x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_bytes_rejects_garbage() {
        let inputs: [&[u8]; 3] = [b"", b"%PDF", &[0xFF, 0xFE, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05]];
        for data in inputs {
            let result = analyze_bytes(data);
            assert!(!result.success);
            assert!(result.error.is_some());
            assert!(result.fields.is_empty());
        }
    }

    #[test]
    fn test_analyze_missing_file() {
        let result = analyze_file("/nonexistent/formulario.pdf");
        assert!(!result.success);
    }

    #[test]
    fn test_generate_then_analyze() {
        let fields = vec![
            DetectedField::new("Nombre", FieldKind::Text),
            DetectedField::new("Correo", FieldKind::Text).with_validation(Validation::Email),
        ];
        let bytes = generate_form_bytes(&fields, &ComposeOptions::new()).unwrap();
        assert!(is_pdf_bytes(&bytes));

        let result = analyze_bytes(&bytes);
        assert!(result.success);
        assert!(result.has_acroform);
        assert_eq!(result.fields.len(), 2);
        assert_eq!(result.fields[0].label, "f_0");
        assert_eq!(result.fields[1].label, "f_1");
    }

    #[test]
    fn test_locate_missing_file() {
        assert!(locate_box("/nonexistent/formulario.pdf", 0, 10.0, 10.0).is_err());
    }
}
