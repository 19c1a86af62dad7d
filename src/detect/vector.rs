//! Horizontal lines from vector drawing operators.

use crate::model::Line;
use crate::parser::PageContent;

use super::config::LineTolerances;

/// Find horizontal strokes and thin bars among a page's painted paths.
///
/// Segments qualify when their endpoints differ by less than
/// `horizontal_dy` vertically; rectangles when they are thinner than
/// `max_rect_height`. A bar is reported at its bottom edge.
pub fn detect_vector_lines(content: &PageContent, tolerances: &LineTolerances) -> Vec<Line> {
    let mut lines = Vec::new();

    for (a, b) in content.segments() {
        if (a.y - b.y).abs() < tolerances.horizontal_dy {
            let line = Line::new(a.x, b.x, (a.y + b.y) / 2.0);
            if line.length() > tolerances.min_length {
                lines.push(line);
            }
        }
    }

    for rect in content.rects() {
        if rect.h < tolerances.max_rect_height && rect.w > tolerances.min_length {
            lines.push(Line::new(rect.x, rect.right(), rect.bottom()));
        }
    }

    log::debug!(
        "Page {}: {} vector lines",
        content.page_index,
        lines.len()
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{PageFrame, Rect};
    use crate::parser::{PaintedPath, PathItem, Point};

    fn page(items: Vec<PathItem>) -> PageContent {
        let mut content = PageContent::empty(0, PageFrame::letter());
        content.paths.push(PaintedPath {
            items,
            fill: false,
            stroke: true,
            line_width: 1.0,
            fill_gray: 0.0,
            stroke_gray: 0.0,
        });
        content
    }

    #[test]
    fn test_horizontal_segments() {
        let content = page(vec![
            PathItem::Line(Point::new(300.0, 106.0), Point::new(130.0, 107.0)),
            // Too short
            PathItem::Line(Point::new(10.0, 50.0), Point::new(30.0, 50.0)),
            // Vertical
            PathItem::Line(Point::new(10.0, 50.0), Point::new(10.0, 200.0)),
        ]);
        let lines = detect_vector_lines(&content, &LineTolerances::default());
        assert_eq!(lines, vec![Line::new(130.0, 300.0, 106.5)]);
    }

    #[test]
    fn test_thin_rectangles() {
        let content = page(vec![
            PathItem::Rect(Rect::new(50.0, 200.0, 120.0, 1.0)),
            // A box, not a line
            PathItem::Rect(Rect::new(50.0, 300.0, 120.0, 20.0)),
        ]);
        let lines = detect_vector_lines(&content, &LineTolerances::default());
        assert_eq!(lines, vec![Line::new(50.0, 170.0, 201.0)]);
    }

    #[test]
    fn test_empty_page() {
        let content = PageContent::empty(0, PageFrame::letter());
        assert!(detect_vector_lines(&content, &LineTolerances::default()).is_empty());
    }
}
