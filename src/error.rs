//! Error types for the formpdf library.

use std::io;
use thiserror::Error;

/// Result type alias for formpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while analyzing or generating PDF forms.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// The PDF structure is corrupted or malformed.
    #[error("Corrupted PDF structure: {0}")]
    Corrupted(String),

    /// A required PDF object is missing.
    #[error("Missing required object: {0}")]
    MissingObject(String),

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// Page rasterization or raster line detection failed.
    #[error("Raster error: {0}")]
    Raster(String),

    /// A field could not be placed on the output document.
    #[error("Layout error: {0}")]
    Layout(String),

    /// A PDF object had an unexpected shape for a form field.
    #[error("Invalid form field: {0}")]
    InvalidField(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            lopdf::Error::Xref(_)
            | lopdf::Error::Trailer
            | lopdf::Error::Offset(_)
            | lopdf::Error::ObjectIdMismatch
            | lopdf::Error::ReferenceCycle
            | lopdf::Error::ReferenceLimit => Error::Corrupted(err.to_string()),
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Raster(err.to_string())
    }
}
