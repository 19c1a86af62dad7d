//! PDF document access using lopdf.

use std::io::Read;
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};
use crate::geometry::{PageFrame, DEFAULT_PAGE_HEIGHT, DEFAULT_PAGE_WIDTH};
use crate::model::Metadata;
use crate::sniff::{sniff_bytes, sniff_path};

use super::content::{interpret_page, PageContent};
use super::options::{ErrorMode, ParseOptions};
use super::text::decode_text_string;

/// A loaded PDF document.
pub struct PdfDocument {
    doc: LopdfDocument,
    options: ParseOptions,
}

impl PdfDocument {
    /// Open a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ParseOptions::default())
    }

    /// Open a PDF file with custom options.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ParseOptions) -> Result<Self> {
        let path = path.as_ref();

        // Verify it's a PDF
        sniff_path(path)?;

        let doc = LopdfDocument::load(path).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Ok(Self::wrap(doc, options))
    }

    /// Parse a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Parse a PDF from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        sniff_bytes(data)?;
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Ok(Self::wrap(doc, options))
    }

    /// Parse a PDF from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Wrap an already-loaded lopdf document.
    pub fn from_lopdf(doc: LopdfDocument) -> Self {
        Self::wrap(doc, ParseOptions::default())
    }

    fn wrap(doc: LopdfDocument, options: ParseOptions) -> Self {
        // Note: lopdf 0.34 has no password support
        if doc.is_encrypted() {
            log::warn!("Document is encrypted; text may not decode");
        }
        Self { doc, options }
    }

    /// Replace the parse options.
    pub fn set_options(&mut self, options: ParseOptions) {
        self.options = options;
    }

    /// Current parse options.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// The underlying lopdf document.
    pub fn inner(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Consume and return the underlying lopdf document.
    pub fn into_inner(self) -> LopdfDocument {
        self.doc
    }

    /// Get the number of pages.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Page object ids in page order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    /// Object id of the page at a zero-based index.
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        let pages = self.page_ids();
        pages
            .get(index)
            .copied()
            .ok_or(Error::PageOutOfRange(index, pages.len()))
    }

    /// Zero-based index of a page object.
    pub fn page_index_of(&self, id: ObjectId) -> Option<usize> {
        self.page_ids().iter().position(|p| *p == id)
    }

    /// MediaBox of a page, inherited from ancestors when absent; Letter when
    /// missing altogether.
    pub fn media_box(&self, index: usize) -> Result<[f32; 4]> {
        Ok(page_media_box(&self.doc, self.page_id(index)?))
    }

    /// Get page dimensions.
    pub fn page_frame(&self, index: usize) -> Result<PageFrame> {
        Ok(PageFrame::from_media_box(self.media_box(index)?))
    }

    /// Interpret one page's content.
    ///
    /// In lenient mode an unreadable content stream yields an empty page.
    pub fn page_content(&self, index: usize) -> Result<PageContent> {
        let page_id = self.page_id(index)?;
        let media_box = self.media_box(index)?;
        match interpret_page(&self.doc, page_id, index, media_box, &self.options) {
            Ok(content) => Ok(content),
            Err(e) if self.options.error_mode == ErrorMode::Lenient => {
                log::warn!("Failed to read content of page {}: {}", index, e);
                Ok(PageContent::empty(index, PageFrame::from_media_box(media_box)))
            }
            Err(e) => Err(e),
        }
    }

    /// Document catalog.
    pub fn catalog(&self) -> Option<&Dictionary> {
        self.doc.catalog().ok()
    }

    /// The catalog's `/AcroForm` dictionary, if any.
    pub fn acroform(&self) -> Option<&Dictionary> {
        self.catalog()?
            .get(b"AcroForm")
            .ok()
            .and_then(|o| resolve_dict(&self.doc, o))
    }

    /// Whether the catalog carries an `/AcroForm` entry.
    pub fn has_acroform(&self) -> bool {
        self.acroform().is_some()
    }

    /// Extract document metadata.
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::with_version(self.doc.version.to_string());

        if let Some(info_dict) = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|o| resolve_dict(&self.doc, o))
        {
            metadata.title = get_string_from_dict(info_dict, b"Title");
            metadata.author = get_string_from_dict(info_dict, b"Author");
            metadata.subject = get_string_from_dict(info_dict, b"Subject");
            metadata.creator = get_string_from_dict(info_dict, b"Creator");
            metadata.producer = get_string_from_dict(info_dict, b"Producer");

            if let Some(date_str) = get_string_from_dict(info_dict, b"CreationDate") {
                metadata.created = parse_pdf_date(&date_str);
            }
            if let Some(date_str) = get_string_from_dict(info_dict, b"ModDate") {
                metadata.modified = parse_pdf_date(&date_str);
            }
        }

        metadata.page_count = self.page_count();
        metadata.encrypted = self.doc.is_encrypted();
        metadata.has_acroform = self.has_acroform();
        metadata
    }

    /// Get PDF version.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }
}

/// Normalized MediaBox of a page object, inherited when absent, Letter when
/// missing or degenerate.
pub(crate) fn page_media_box(doc: &LopdfDocument, page_id: ObjectId) -> [f32; 4] {
    inherited(doc, page_id, b"MediaBox")
        .and_then(|o| resolve(doc, o).as_array().ok())
        .and_then(|arr| {
            if arr.len() < 4 {
                return None;
            }
            let v: Vec<f32> = arr
                .iter()
                .map(|o| resolve(doc, o).as_float().unwrap_or(0.0))
                .collect();
            Some([
                v[0].min(v[2]),
                v[1].min(v[3]),
                v[0].max(v[2]),
                v[1].max(v[3]),
            ])
        })
        .filter(|b| b[2] > b[0] && b[3] > b[1])
        .unwrap_or([0.0, 0.0, DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT])
}

/// Follow a reference to its object; anything else is returned as is.
pub(crate) fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Resolve an object to a dictionary, direct or referenced.
pub(crate) fn resolve_dict<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

/// Look up `key` on a node or, failing that, its `/Parent` chain.
pub(crate) fn inherited<'a>(
    doc: &'a LopdfDocument,
    id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(id).ok()?;
    for _ in 0..32 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Helper to get a string from a PDF dictionary.
pub(crate) fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).ok().and_then(|obj| match obj {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(bytes) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    })
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
fn parse_pdf_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);

    // At minimum we need YYYY
    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|s| s.parse().ok()).unwrap_or(0);

    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| chrono::DateTime::from_naive_utc_and_offset(dt, chrono::Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use lopdf::{dictionary, Stream};

    fn two_page_doc() -> Vec<u8> {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, b"0 0 m 10 0 l S".to_vec()));
        let first = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let second = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![first.into(), second.into()],
                "Count" => 2,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Solicitud"),
            "CreationDate" => Object::string_literal("D:20240115103045"),
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_page_frames_inherit_media_box() {
        let doc = PdfDocument::from_bytes(&two_page_doc()).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_frame(0).unwrap(), PageFrame::letter());
        assert_eq!(doc.page_frame(1).unwrap(), PageFrame::a4());
        assert!(matches!(
            doc.page_frame(2),
            Err(Error::PageOutOfRange(2, 2))
        ));
    }

    #[test]
    fn test_metadata() {
        let doc = PdfDocument::from_bytes(&two_page_doc()).unwrap();
        let metadata = doc.metadata();
        assert_eq!(metadata.title.as_deref(), Some("Solicitud"));
        assert_eq!(metadata.page_count, 2);
        assert!(!metadata.has_acroform);
        assert_eq!(metadata.created.unwrap().year(), 2024);
    }

    #[test]
    fn test_page_content_and_index() {
        let doc = PdfDocument::from_bytes(&two_page_doc()).unwrap();
        let content = doc.page_content(0).unwrap();
        assert_eq!(content.segments().count(), 1);
        let second = doc.page_id(1).unwrap();
        assert_eq!(doc.page_index_of(second), Some(1));
    }

    #[test]
    fn test_rejects_non_pdf() {
        assert!(matches!(
            PdfDocument::from_bytes(b"<html></html>"),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_parse_pdf_date() {
        let date = parse_pdf_date("D:20240115103045").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 15);
    }

    #[test]
    fn test_parse_pdf_date_minimal() {
        let date = parse_pdf_date("D:2024").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 1);
    }
}
