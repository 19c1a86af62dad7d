//! Coordinate spaces and conversions.
//!
//! Three spaces are in play:
//!
//! - **Page points, top-left origin** (canonical). Every field, line and label
//!   the library hands out is stored here, y growing downward.
//! - **PDF content space, bottom-left origin**. Only the content-stream
//!   emitter and the AcroForm reader touch it, through [`flip_origin_y`] and
//!   the MediaBox-aware [`Rect::to_pdf_rect`] / [`Rect::from_pdf_rect`].
//! - **Pixels**, either a raster at some DPI ([`to_pixels`]) or a fixed-width
//!   display/preview ([`to_display`]).
//!
//! All functions here are plain arithmetic and never fail.

use serde::{Deserialize, Serialize};

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// US Letter width in points, used when a page has no usable MediaBox.
pub const DEFAULT_PAGE_WIDTH: f32 = 612.0;

/// US Letter height in points.
pub const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// Convert page points to pixels at `dpi`.
#[inline]
pub fn to_pixels(points: f32, dpi: f32) -> f32 {
    points * dpi / POINTS_PER_INCH
}

/// Convert pixels at `dpi` back to page points. Inverse of [`to_pixels`].
#[inline]
pub fn from_pixels(pixels: f32, dpi: f32) -> f32 {
    pixels * POINTS_PER_INCH / dpi
}

/// Convert page points to display pixels for a page `page_width` points wide
/// shown `display_width` pixels wide.
#[inline]
pub fn to_display(points: f32, page_width: f32, display_width: f32) -> f32 {
    points * display_width / page_width
}

/// Convert display pixels back to page points. Inverse of [`to_display`].
#[inline]
pub fn from_display(pixels: f32, page_width: f32, display_width: f32) -> f32 {
    pixels * page_width / display_width
}

/// Switch a y coordinate between top-left and bottom-left origin.
///
/// The operation is its own inverse.
#[inline]
pub fn flip_origin_y(y: f32, page_height: f32) -> f32 {
    page_height - y
}

/// Document-global y for pages stacked vertically in a preview.
#[inline]
pub fn to_global_y(page_index: usize, page_height: f32, local_y: f32) -> f32 {
    page_index as f32 * page_height + local_y
}

/// Split a document-global y back into `(page_index, local_y)`.
///
/// Negative input clamps to the top of page 0.
pub fn from_global_y(global_y: f32, page_height: f32) -> (usize, f32) {
    if global_y <= 0.0 || page_height <= 0.0 {
        return (0, global_y.max(0.0));
    }
    let page = (global_y / page_height).floor();
    (page as usize, global_y - page * page_height)
}

/// Axis-aligned rectangle in top-left page points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size.
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Create a rectangle from two corners in any order.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        let (left, right) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self::new(left, top, right - left, bottom - top)
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Vertical centre.
    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }

    /// Area in square points.
    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Whether the point lies inside or on the border.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Both dimensions strictly positive.
    pub fn is_valid(&self) -> bool {
        self.w > 0.0 && self.h > 0.0
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Convert to a PDF `/Rect` array `[llx, lly, urx, ury]` in the user space
    /// of a page with the given normalized MediaBox.
    pub fn to_pdf_rect(&self, media_box: [f32; 4]) -> [f32; 4] {
        let [x0, _, _, top] = media_box;
        [
            self.x + x0,
            flip_origin_y(self.bottom(), top),
            self.right() + x0,
            flip_origin_y(self.y, top),
        ]
    }

    /// Build from a PDF `/Rect` array (corners in any order) on a page with
    /// the given normalized MediaBox.
    pub fn from_pdf_rect(rect: [f32; 4], media_box: [f32; 4]) -> Rect {
        let [mx, _, _, top] = media_box;
        let [x0, y0, x1, y1] = rect;
        Rect::from_corners(
            x0 - mx,
            flip_origin_y(y0, top),
            x1 - mx,
            flip_origin_y(y1, top),
        )
    }
}

/// Size of one page in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageFrame {
    /// Width in points
    pub width: f32,
    /// Height in points
    pub height: f32,
}

impl Default for PageFrame {
    fn default() -> Self {
        Self::letter()
    }
}

impl PageFrame {
    /// Create a page frame.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// US Letter (612 x 792).
    pub fn letter() -> Self {
        Self::new(DEFAULT_PAGE_WIDTH, DEFAULT_PAGE_HEIGHT)
    }

    /// ISO A4 (595 x 842).
    pub fn a4() -> Self {
        Self::new(595.0, 842.0)
    }

    /// Build from a MediaBox `[x0, y0, x1, y1]`, falling back to Letter when
    /// the box is degenerate.
    pub fn from_media_box(media_box: [f32; 4]) -> Self {
        let width = (media_box[2] - media_box[0]).abs();
        let height = (media_box[3] - media_box[1]).abs();
        if width > 0.0 && height > 0.0 {
            Self::new(width, height)
        } else {
            Self::letter()
        }
    }

    /// MediaBox of a page of this size anchored at the origin.
    pub fn media_box(&self) -> [f32; 4] {
        [0.0, 0.0, self.width, self.height]
    }

    /// Flip a top-left y into content space for this page.
    pub fn to_content_y(&self, y_top: f32) -> f32 {
        flip_origin_y(y_top, self.height)
    }
}

/// Mapping between page points and a raster rendered from that page.
///
/// The raster pipeline works at a reduced DPI and caps the longer side, so the
/// effective factor is stored rather than recomputed from the DPI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterScale {
    /// Pixels per point
    pub pixels_per_point: f32,
    /// Raster width in pixels
    pub width_px: u32,
    /// Raster height in pixels
    pub height_px: u32,
}

impl RasterScale {
    /// Scale for rendering `frame` at `dpi`, shrunk so that neither side
    /// exceeds `max_side` pixels. Aspect ratio is preserved.
    pub fn for_page(frame: PageFrame, dpi: f32, max_side: u32) -> Self {
        let mut pixels_per_point = to_pixels(1.0, dpi);
        let longest = frame.width.max(frame.height) * pixels_per_point;
        if max_side > 0 && longest > max_side as f32 {
            pixels_per_point *= max_side as f32 / longest;
        }
        let width_px = (frame.width * pixels_per_point).round().max(1.0) as u32;
        let height_px = (frame.height * pixels_per_point).round().max(1.0) as u32;
        Self {
            pixels_per_point,
            width_px,
            height_px,
        }
    }

    /// Page points to raster pixels.
    pub fn to_px(&self, points: f32) -> f32 {
        points * self.pixels_per_point
    }

    /// Raster pixels to page points.
    pub fn to_points(&self, pixels: f32) -> f32 {
        pixels / self.pixels_per_point
    }

    /// Effective DPI after capping.
    pub fn effective_dpi(&self) -> f32 {
        self.pixels_per_point * POINTS_PER_INCH
    }
}

/// Mapping between page points and the fixed-width preview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScale {
    /// Page width in points
    pub page_width: f32,
    /// Page height in points
    pub page_height: f32,
    /// Display width in pixels
    pub display_width: f32,
}

impl DisplayScale {
    /// Create a display mapping.
    pub fn new(frame: PageFrame, display_width: f32) -> Self {
        Self {
            page_width: frame.width,
            page_height: frame.height,
            display_width,
        }
    }

    /// Display pixels per page point.
    pub fn factor(&self) -> f32 {
        to_display(1.0, self.page_width, self.display_width)
    }

    /// Height of one page in display pixels.
    pub fn page_height_px(&self) -> f32 {
        to_display(self.page_height, self.page_width, self.display_width)
    }

    /// Map a top-left page rectangle on `page_index` to stacked display
    /// coordinates.
    pub fn rect_to_display(&self, rect: &Rect, page_index: usize) -> Rect {
        let global_y = to_global_y(page_index, self.page_height, rect.y);
        let f = self.factor();
        Rect::new(rect.x * f, global_y * f, rect.w * f, rect.h * f)
    }

    /// Inverse of [`DisplayScale::rect_to_display`]: returns the page index
    /// and the page-local rectangle.
    pub fn rect_from_display(&self, rect: &Rect) -> (usize, Rect) {
        let f = self.factor();
        let (page, local_y) = from_global_y(rect.y / f, self.page_height);
        (page, Rect::new(rect.x / f, local_y, rect.w / f, rect.h / f))
    }
}
