//! Header sniffing, so non-PDF input is rejected before lopdf sees it.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

const MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3;

/// How much of the file is inspected. The linearization dictionary, when
/// present, is the first object and sits well inside this window.
const SNIFF_WINDOW: usize = 1024;

/// What the first bytes of a PDF say about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfHeader {
    /// Header version, e.g. "1.7"
    pub version: String,
    /// A `/Linearized` dictionary opens the file
    pub linearized: bool,
    /// The header is followed by a comment of high-bit bytes
    pub binary: bool,
}

impl std::fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)?;
        if self.linearized {
            write!(f, " (linearized)")?;
        }
        Ok(())
    }
}

/// Sniff the header of a file.
///
/// ```no_run
/// let header = formpdf::sniff::sniff_path("formulario.pdf")?;
/// println!("{}", header);
/// # Ok::<(), formpdf::Error>(())
/// ```
pub fn sniff_path<P: AsRef<Path>>(path: P) -> Result<PdfHeader> {
    let file = File::open(path)?;
    let mut head = Vec::with_capacity(SNIFF_WINDOW);
    file.take(SNIFF_WINDOW as u64).read_to_end(&mut head)?;
    sniff_bytes(&head)
}

/// Sniff the header of an in-memory document. Only the first kilobyte is
/// looked at.
pub fn sniff_bytes(data: &[u8]) -> Result<PdfHeader> {
    if data.len() < MAGIC.len() + VERSION_LEN || !data.starts_with(MAGIC) {
        return Err(Error::UnknownFormat);
    }

    let version = &data[MAGIC.len()..MAGIC.len() + VERSION_LEN];
    let version = String::from_utf8_lossy(version).into_owned();
    if !matches!(version.as_bytes(), [major, b'.', minor] if major.is_ascii_digit() && minor.is_ascii_digit())
    {
        return Err(Error::UnsupportedVersion(version));
    }

    let head = &data[..data.len().min(SNIFF_WINDOW)];
    let binary = head
        .split(|b| *b == b'\n' || *b == b'\r')
        .filter(|line| !line.is_empty())
        .nth(1)
        .is_some_and(|line| line.starts_with(b"%") && line[1..].iter().any(|b| *b >= 0x80));
    let linearized = head.windows(b"/Linearized".len()).any(|w| w == b"/Linearized");

    Ok(PdfHeader {
        version,
        linearized,
        binary,
    })
}

/// Whether the file at `path` starts like a PDF.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    sniff_path(path).is_ok()
}

/// Whether `data` starts like a PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    sniff_bytes(data).is_ok()
}
