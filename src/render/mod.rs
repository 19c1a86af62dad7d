//! Page rasterization and preview caching.
//!
//! The raster line detector and page previews both go through
//! [`PageRasterizer`]. Previews are memoized in a [`PreviewCache`] owned by
//! the caller.

mod cache;
mod raster;

pub use cache::{CacheStats, PreviewCache, PreviewKey, DEFAULT_CAPACITY};
pub use raster::{PageRasterizer, RasterOptions};

use std::path::Path;
use std::sync::Arc;

use image::GrayImage;

use crate::error::Result;
use crate::geometry::RasterScale;
use crate::parser::{ErrorMode, ParseOptions, PdfDocument};

/// Longest side of a preview, in pixels.
pub const MAX_PREVIEW_SIDE: u32 = 10_000;

/// Render one page of a loaded document.
pub fn render_page(doc: &PdfDocument, page: usize, dpi: f32) -> Result<GrayImage> {
    let content = doc.page_content(page)?;
    let scale = RasterScale::for_page(content.frame, dpi, MAX_PREVIEW_SIDE);
    PageRasterizer::new().render(&content, &scale)
}

/// Render one page of a file through a cache.
pub fn render_preview(
    cache: &PreviewCache,
    path: &Path,
    page: usize,
    dpi: u32,
) -> Result<Arc<GrayImage>> {
    cache.get_or_render(PreviewKey::new(path, page, dpi), || {
        let options = ParseOptions::new()
            .with_error_mode(ErrorMode::Lenient)
            .with_images(true);
        let doc = PdfDocument::open_with_options(path, options)?;
        render_page(&doc, page, dpi as f32)
    })
}
