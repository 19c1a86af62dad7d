//! The analysis pass: native form fields first, visual detection otherwise.

use std::mem;
use std::panic::{self, catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::thread;

use rayon::prelude::*;

use crate::error::Result;
use crate::model::{AbsolutePosition, AnalysisResult, DetectedField, Line};
use crate::parser::{group_spans_into_lines, PageContent, ParseOptions, PdfDocument, TextSpan};

use super::acroform::extract_acroform_fields;
use super::associate::Associator;
use super::config::AnalyzerConfig;
use super::labels::LabelExtractor;
use super::merge::merge_lines;
use super::raster::detect_raster_lines;
use super::title::detect_title;
use super::vector::detect_vector_lines;

/// Fields found on one page, plus its text when it is the first page.
type PageFields = (Vec<DetectedField>, Vec<TextSpan>);

/// Finds form fields in PDF documents.
///
/// # Example
///
/// ```no_run
/// use formpdf::detect::DocumentAnalyzer;
///
/// let result = DocumentAnalyzer::new().analyze_file("solicitud.pdf");
/// if result.success {
///     for field in &result.fields {
///         println!("{} ({})", field.label, field.type_name());
///     }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocumentAnalyzer {
    config: AnalyzerConfig,
}

impl DocumentAnalyzer {
    /// Create an analyzer with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with custom configuration.
    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Options used when this analyzer opens documents itself.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions::new()
            .lenient()
            .with_images(self.config.raster_enabled)
    }

    /// Analyze a file. Never fails: problems are reported in the result.
    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> AnalysisResult {
        self.analyze_file_with_progress(path, |_, _| {})
    }

    /// Analyze a file, reporting `(current_page, total_pages)` as visual
    /// detection advances. The callback runs on the calling thread.
    pub fn analyze_file_with_progress<P, F>(&self, path: P, progress: F) -> AnalysisResult
    where
        P: AsRef<Path>,
        F: FnMut(usize, usize),
    {
        let path = path.as_ref();
        self.guarded(progress, |this, progress| {
            let doc = PdfDocument::open_with_options(path, this.parse_options())?;
            this.analyze_document(&doc, progress)
        })
    }

    /// Analyze a document held in memory.
    pub fn analyze_bytes(&self, data: &[u8]) -> AnalysisResult {
        self.guarded(|_, _| {}, |this, progress| {
            let doc = PdfDocument::from_bytes_with_options(data, this.parse_options())?;
            this.analyze_document(&doc, progress)
        })
    }

    /// Run `pass`, turning errors and panics into a failed result.
    fn guarded<F, G>(&self, mut progress: F, pass: G) -> AnalysisResult
    where
        F: FnMut(usize, usize),
        G: FnOnce(&Self, &mut dyn FnMut(usize, usize)) -> Result<AnalysisResult>,
    {
        match catch_unwind(AssertUnwindSafe(|| pass(self, &mut progress))) {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                log::warn!("Analysis failed: {}", e);
                AnalysisResult::failed(e.to_string())
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "analysis panicked".to_string());
                log::error!("Analysis panicked: {}", message);
                AnalysisResult::failed(message)
            }
        }
    }

    /// Analyze an open document.
    ///
    /// Native AcroForm fields are returned when there are any, and the
    /// visual pipeline does not run. Errors are hard failures only; per-page
    /// and per-field problems are logged and skipped.
    pub fn analyze_document(
        &self,
        doc: &PdfDocument,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<AnalysisResult> {
        let page_count = doc.page_count();
        let metadata = doc.metadata();

        let (acro_fields, has_acroform) = extract_acroform_fields(doc)?;
        let (fields, first_spans) = if has_acroform {
            let spans = if page_count > 0 {
                doc.page_content(0).map(|p| p.spans).unwrap_or_default()
            } else {
                Vec::new()
            };
            (acro_fields, spans)
        } else {
            self.detect_document(doc, progress)?
        };

        let title = detect_title(metadata.title.as_deref(), &first_spans);

        log::info!(
            "Analysis found {} fields on {} pages (acroform: {})",
            fields.len(),
            page_count,
            has_acroform
        );

        Ok(AnalysisResult {
            fields,
            title,
            has_acroform,
            page_count,
            success: true,
            error: None,
        })
    }

    /// Visual detection over every page. `progress` runs on the calling
    /// thread once a page's detection has finished.
    fn detect_document(
        &self,
        doc: &PdfDocument,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<PageFields> {
        let total = doc.page_count();
        let pages = if self.config.parallel && total > 1 {
            self.detect_parallel(doc, progress)?
        } else {
            let mut pages = Vec::with_capacity(total);
            for index in 0..total {
                pages.push(self.detect_page(doc, index)?);
                progress(index + 1, total);
            }
            pages
        };

        let mut fields = Vec::new();
        let mut first_spans = Vec::new();
        for (index, (page_fields, spans)) in pages.into_iter().enumerate() {
            if index == 0 {
                first_spans = spans;
            }
            fields.extend(page_fields);
        }
        Ok((fields, first_spans))
    }

    /// Pages run on the rayon pool; completions come back over a channel so
    /// the callback never leaves the calling thread.
    fn detect_parallel(
        &self,
        doc: &PdfDocument,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<PageFields>> {
        let total = doc.page_count();
        let (tx, rx) = crossbeam_channel::unbounded::<usize>();

        thread::scope(|scope| {
            let worker = scope.spawn(move || {
                (0..total)
                    .into_par_iter()
                    .map_with(tx, |tx, index| {
                        let page = self.detect_page(doc, index);
                        if page.is_ok() {
                            // The receiver lives until the pool is done
                            let _ = tx.send(index);
                        }
                        page
                    })
                    .collect::<Result<Vec<_>>>()
            });

            for (done, _) in rx.iter().enumerate() {
                progress(done + 1, total);
            }

            match worker.join() {
                Ok(pages) => pages,
                Err(panic) => panic::resume_unwind(panic),
            }
        })
    }

    /// Read, rasterize and analyze one page. Page content is dropped here;
    /// only the first page's text is handed back.
    fn detect_page(&self, doc: &PdfDocument, index: usize) -> Result<PageFields> {
        let mut page = doc.page_content(index)?;
        let raster_lines = if self.config.raster_enabled {
            detect_raster_lines(&page, &self.config.raster)
        } else {
            Vec::new()
        };
        let fields = self.analyze_page(&page, &raster_lines);
        let spans = if index == 0 {
            mem::take(&mut page.spans)
        } else {
            Vec::new()
        };
        Ok((fields, spans))
    }

    /// Fields on one page, given the lines the raster detector found there.
    pub fn analyze_page(&self, page: &PageContent, raster_lines: &[Line]) -> Vec<DetectedField> {
        let vector_lines = detect_vector_lines(page, &self.config.lines);
        let lines = merge_lines(&vector_lines, raster_lines, &self.config.lines);

        let text_lines = group_spans_into_lines(page.spans.clone(), self.config.labels.split_gap_em);
        let labels = LabelExtractor::new(&self.config.labels, &self.config.lexicon).extract(&text_lines);

        let associator = Associator::new(&self.config.association);
        let fields: Vec<DetectedField> = labels
            .into_iter()
            .filter_map(|label| {
                let (rect, placement) = associator.field_box(&label, &lines);
                if !rect.is_valid() {
                    log::debug!("Dropping label '{}' with empty box", label.text);
                    return None;
                }
                log::trace!("Label '{}' placed {:?} at {:?}", label.text, placement, rect);
                let kind = self.config.lexicon.infer_kind(&label.text);
                Some(DetectedField::placed(
                    label.text,
                    kind,
                    AbsolutePosition::from_rect(rect, page.page_index),
                ))
            })
            .collect();

        log::debug!(
            "Page {}: {} lines, {} fields",
            page.page_index,
            lines.len(),
            fields.len()
        );
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{PageFrame, Rect};
    use crate::model::FieldKind;
    use crate::parser::{PaintedPath, PathItem, Point, TextSpan};

    fn form_page() -> PageContent {
        let mut page = PageContent::empty(0, PageFrame::letter());
        page.spans.push(TextSpan::new("Nombre:", 50.0, 110.0, 40.0, 10.0));
        page.spans.push(TextSpan::new("Fecha de nacimiento:", 50.0, 160.0, 100.0, 10.0));
        page.paths.push(PaintedPath {
            items: vec![PathItem::Line(Point::new(100.0, 108.0), Point::new(300.0, 108.0))],
            fill: false,
            stroke: true,
            line_width: 0.5,
            fill_gray: 0.0,
            stroke_gray: 0.0,
        });
        page
    }

    #[test]
    fn test_analyze_page_vector_only() {
        let analyzer = DocumentAnalyzer::with_config(AnalyzerConfig::new().vector_only());
        let fields = analyzer.analyze_page(&form_page(), &[]);
        assert_eq!(fields.len(), 2);

        assert_eq!(fields[0].label, "Nombre");
        assert_eq!(fields[0].kind, FieldKind::Text);
        assert_eq!(
            fields[0].absolute_position.unwrap().rect(),
            Rect::new(100.0, 108.0, 200.0, 20.0)
        );

        // No line near the second label: estimated box right of it
        assert_eq!(fields[1].type_name(), "date");
        let pos = fields[1].absolute_position.unwrap();
        assert_eq!(pos.x, 155.0);
        assert_eq!(pos.w, 150.0);
    }

    #[test]
    fn test_raster_lines_are_merged() {
        let analyzer = DocumentAnalyzer::with_config(AnalyzerConfig::new().vector_only());
        let raster = vec![Line::new(100.5, 299.0, 109.0), Line::new(160.0, 400.0, 158.0)];
        let fields = analyzer.analyze_page(&form_page(), &raster);
        assert_eq!(fields[0].absolute_position.unwrap().x, 100.0);
        assert_eq!(fields[1].absolute_position.unwrap().x, 160.0);
    }

    /// Three pages of the form page; `broken` gets an unreadable
    /// `/Contents` entry.
    fn form_document(broken: Option<usize>) -> PdfDocument {
        use lopdf::{dictionary, Document, Object, ObjectId, Stream};

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let page_ids: Vec<ObjectId> = (0..3)
            .map(|index| {
                let contents = if broken == Some(index) {
                    Object::Integer(5)
                } else {
                    let ops = b"BT /F1 10 Tf 50 692 Td (Nombre:) Tj ET q 1 w 130 686 m 300 686 l S Q";
                    doc.add_object(Stream::new(dictionary! {}, ops.to_vec())).into()
                };
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                    "Contents" => contents,
                    "Resources" => dictionary! {
                        "Font" => dictionary! { "F1" => font_id },
                    },
                })
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
                "Count" => 3,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        PdfDocument::from_lopdf(doc)
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let doc = form_document(None);
        let mut sequential_progress = Vec::new();
        let sequential = DocumentAnalyzer::with_config(AnalyzerConfig::new().vector_only().sequential())
            .analyze_document(&doc, &mut |c, t| sequential_progress.push((c, t)))
            .unwrap();
        let mut parallel_progress = Vec::new();
        let parallel = DocumentAnalyzer::with_config(AnalyzerConfig::new().vector_only())
            .analyze_document(&doc, &mut |c, t| parallel_progress.push((c, t)))
            .unwrap();

        assert_eq!(sequential.fields, parallel.fields);
        assert_eq!(sequential.fields.len(), 3);
        let pages: Vec<_> = parallel.fields.iter().map(|f| f.page_index()).collect();
        assert_eq!(pages, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(sequential_progress, vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(parallel_progress, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_progress_follows_page_detection() {
        // The second page fails to read, so only the first one completes
        let doc = form_document(Some(1));
        let mut progress = Vec::new();
        let result = DocumentAnalyzer::with_config(AnalyzerConfig::new().vector_only().sequential())
            .analyze_document(&doc, &mut |c, t| progress.push((c, t)));

        assert!(result.is_err());
        assert_eq!(progress, vec![(1, 3)]);
    }

    #[test]
    fn test_parallel_failure_is_reported() {
        let doc = form_document(Some(2));
        let mut progress = Vec::new();
        let result = DocumentAnalyzer::with_config(AnalyzerConfig::new().vector_only())
            .analyze_document(&doc, &mut |c, t| progress.push((c, t)));

        assert!(result.is_err());
        assert!(progress.len() < 3);
    }

    #[test]
    fn test_unreadable_bytes() {
        let result = DocumentAnalyzer::new().analyze_bytes(b"not a pdf");
        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(!result.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result = DocumentAnalyzer::new().analyze_file("/nonexistent/form.pdf");
        assert!(!result.success);
        assert_eq!(result.page_count, 0);
    }
}
