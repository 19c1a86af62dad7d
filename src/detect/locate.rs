//! Finding the drawn box under a point, for click-to-place editing.

use crate::error::Result;
use crate::geometry::Rect;
use crate::parser::{PageContent, PdfDocument};

/// Drawn shapes smaller than this (in square points) are ignored.
pub const MIN_BOX_AREA: f32 = 100.0;
/// How far from the point enclosing lines are searched.
pub const SEARCH_RADIUS: f32 = 50.0;
/// Maximum skew of a segment counted as horizontal or vertical.
pub const AXIS_TOLERANCE: f32 = 5.0;

/// Box enclosing a point, in top-left page points.
///
/// The smallest painted path whose bounds contain the point wins. Failing
/// that, the box is assembled from the nearest horizontal rules above and
/// below the point, narrowed by vertical rules to its left and right when
/// there are any.
pub fn find_box_at(content: &PageContent, x: f32, y: f32) -> Option<Rect> {
    let drawn = content
        .paths
        .iter()
        .filter_map(|p| p.bbox())
        .filter(|r| r.contains(x, y) && r.area() > MIN_BOX_AREA)
        .min_by(|a, b| a.area().total_cmp(&b.area()));
    if drawn.is_some() {
        return drawn;
    }

    let mut top: Option<(f32, f32, f32)> = None;
    let mut bottom: Option<(f32, f32, f32)> = None;
    let mut left: Option<f32> = None;
    let mut right: Option<f32> = None;

    for (a, b) in content.segments() {
        if (a.y - b.y).abs() < AXIS_TOLERANCE {
            let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
            let ly = (a.y + b.y) / 2.0;
            if x < x0 || x > x1 || (ly - y).abs() >= SEARCH_RADIUS {
                continue;
            }
            if ly < y && top.map_or(true, |t| ly > t.2) {
                top = Some((x0, x1, ly));
            } else if ly > y && bottom.map_or(true, |b| ly < b.2) {
                bottom = Some((x0, x1, ly));
            }
        } else if (a.x - b.x).abs() < AXIS_TOLERANCE {
            let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
            let lx = (a.x + b.x) / 2.0;
            if y < y0 || y > y1 || (lx - x).abs() >= SEARCH_RADIUS {
                continue;
            }
            if lx < x && left.map_or(true, |l| lx > l) {
                left = Some(lx);
            } else if lx > x && right.map_or(true, |r| lx < r) {
                right = Some(lx);
            }
        }
    }

    let (top, bottom) = (top?, bottom?);
    let x0 = left.unwrap_or(top.0);
    let x1 = right.unwrap_or(top.1);
    Some(Rect::from_corners(x0, top.2, x1, bottom.2))
}

/// [`find_box_at`] on one page of a document.
pub fn find_box_in_document(doc: &PdfDocument, page: usize, x: f32, y: f32) -> Result<Option<Rect>> {
    let content = doc.page_content(page)?;
    Ok(find_box_at(&content, x, y))
}
