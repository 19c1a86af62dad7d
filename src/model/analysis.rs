//! Analysis output types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DetectedField;

/// Outcome of one analysis pass over a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Fields found, in page order
    pub fields: Vec<DetectedField>,

    /// Document title, from metadata or the largest text on page 1
    pub title: Option<String>,

    /// Whether the fields came from a native AcroForm
    pub has_acroform: bool,

    /// Number of pages in the document
    pub page_count: usize,

    /// False when the document could not be read
    pub success: bool,

    /// Failure reason when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// A failed analysis carrying `message`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Detection ran but found nothing. Distinct from a failure.
    pub fn is_empty(&self) -> bool {
        self.success && self.fields.is_empty()
    }
}

/// Document metadata read from the trailer `/Info` dictionary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Creator application
    pub creator: Option<String>,

    /// PDF producer
    pub producer: Option<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    pub modified: Option<DateTime<Utc>>,

    /// PDF version (e.g., "1.7")
    pub pdf_version: String,

    /// Total number of pages
    pub page_count: usize,

    /// Whether the document is encrypted
    pub encrypted: bool,

    /// Whether the catalog carries an `/AcroForm`
    pub has_acroform: bool,
}

impl Metadata {
    /// Create new metadata with PDF version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            pdf_version: version.into(),
            ..Default::default()
        }
    }
}
