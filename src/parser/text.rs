//! Positioned text and line grouping.

use std::cmp::Ordering;

use crate::geometry::Rect;

/// A run of text with position and font information.
///
/// Coordinates are top-left page points; `y` is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline, from the page top)
    pub y: f32,
    /// Advance width of the run
    pub width: f32,
    /// Font size in points, after text and graphics scaling
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,
}

impl TextSpan {
    /// Create a new text span.
    pub fn new(text: impl Into<String>, x: f32, y: f32, width: f32, font_size: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            font_size,
            font_name: String::new(),
        }
    }

    /// Set the font name.
    pub fn with_font(mut self, font_name: impl Into<String>) -> Self {
        self.font_name = font_name.into();
        self
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top of the glyph box (approximate ascender).
    pub fn top(&self) -> f32 {
        self.y - self.font_size * 0.8
    }

    /// Bottom of the glyph box (approximate descender).
    pub fn bottom(&self) -> f32 {
        self.y + self.font_size * 0.2
    }

    /// Glyph box.
    pub fn bbox(&self) -> Rect {
        Rect::from_corners(self.x, self.top(), self.right(), self.bottom())
    }
}

/// Spans sharing a baseline, sorted left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// The spans in this line, sorted by X position
    pub spans: Vec<TextSpan>,
}

impl TextLine {
    /// Create a text line from spans.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
        Self { spans }
    }

    /// Text of the line. A space is inserted where spans are separated by a
    /// visible gap and neither side already has one.
    pub fn text(&self) -> String {
        let mut result = String::new();
        let mut prev: Option<&TextSpan> = None;
        for span in &self.spans {
            if let Some(p) = prev {
                let gap = span.x - p.right();
                let needs_space = gap > p.font_size.max(span.font_size) * 0.25
                    && !result.ends_with(char::is_whitespace)
                    && !span.text.starts_with(char::is_whitespace);
                if needs_space {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
            prev = Some(span);
        }
        result
    }

    /// Union of the span boxes.
    pub fn bbox(&self) -> Rect {
        self.spans
            .iter()
            .map(TextSpan::bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default()
    }

    /// Arithmetic mean of span font sizes (0 for an empty line).
    pub fn avg_font_size(&self) -> f32 {
        if self.spans.is_empty() {
            return 0.0;
        }
        self.spans.iter().map(|s| s.font_size).sum::<f32>() / self.spans.len() as f32
    }

    /// Whether the line has no spans.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Group spans into lines.
///
/// Spans are bucketed by baseline (tolerance 30% of the font size) and each
/// bucket is then split wherever the horizontal gap between neighbours
/// exceeds `split_gap_em` times the font size, so that two labels sharing a
/// row come out as separate lines.
pub fn group_spans_into_lines(spans: Vec<TextSpan>, split_gap_em: f32) -> Vec<TextLine> {
    if spans.is_empty() {
        return vec![];
    }

    let mut spans = spans;
    spans.sort_by(|a, b| {
        let y_cmp = a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal);
        if y_cmp == Ordering::Equal {
            a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal)
        } else {
            y_cmp
        }
    });

    let mut rows: Vec<Vec<TextSpan>> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let y_tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= y_tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    rows.push(std::mem::take(&mut current));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        rows.push(current);
    }

    let mut lines = Vec::new();
    for row in rows {
        let row = TextLine::from_spans(row).spans;
        let mut piece: Vec<TextSpan> = Vec::new();
        for span in row {
            if let Some(last) = piece.last() {
                let gap = span.x - last.right();
                if gap > last.font_size.max(span.font_size) * split_gap_em {
                    lines.push(TextLine::from_spans(std::mem::take(&mut piece)));
                }
            }
            piece.push(span);
        }
        if !piece.is_empty() {
            lines.push(TextLine::from_spans(piece));
        }
    }

    lines
}

/// Decode a PDF text string: UTF-16BE when it carries a BOM, otherwise
/// UTF-8, otherwise Latin-1.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// Encode a string as a PDF text string: plain bytes for ASCII, UTF-16BE
/// with BOM otherwise.
pub fn encode_text_string(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        return text.as_bytes().to_vec();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Encode a string for a WinAnsi-encoded standard font, replacing characters
/// outside Latin-1 with `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if code < 256 {
                code as u8
            } else {
                b'?'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, y: f32, width: f32) -> TextSpan {
        TextSpan::new(text, x, y, width, 10.0)
    }

    #[test]
    fn test_groups_by_baseline() {
        let spans = vec![
            span("Apellidos:", 50.0, 140.0, 50.0),
            span("Nombre:", 50.0, 110.0, 40.0),
            span("Juan", 95.0, 111.0, 20.0),
        ];
        let lines = group_spans_into_lines(spans, 2.5);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "Nombre: Juan");
        assert_eq!(lines[1].text(), "Apellidos:");
    }

    #[test]
    fn test_splits_wide_gaps() {
        let spans = vec![
            span("Nombre:", 50.0, 100.0, 40.0),
            span("Apellidos:", 300.0, 100.0, 50.0),
        ];
        let lines = group_spans_into_lines(spans, 2.5);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "Nombre:");
        assert_eq!(lines[1].text(), "Apellidos:");
    }

    #[test]
    fn test_line_bbox_and_font() {
        let line = TextLine::from_spans(vec![
            TextSpan::new("Nom", 50.0, 110.0, 20.0, 10.0),
            TextSpan::new("bre", 70.0, 110.0, 20.0, 12.0),
        ]);
        assert_eq!(line.text(), "Nombre");
        assert_eq!(line.avg_font_size(), 11.0);
        let bbox = line.bbox();
        assert_eq!(bbox.x, 50.0);
        assert_eq!(bbox.right(), 90.0);
        assert!((bbox.y - (110.0 - 9.6)).abs() < 1e-4);
    }

    #[test]
    fn test_decode_text_string() {
        assert_eq!(decode_text_string(b"Nombre"), "Nombre");
        assert_eq!(
            decode_text_string(&[0xFE, 0xFF, 0x00, 0x53, 0x00, 0xED]),
            "Sí"
        );
        assert_eq!(decode_text_string(&[0x53, 0xED]), "Sí");
    }

    #[test]
    fn test_encode_text_string() {
        assert_eq!(encode_text_string("abc"), b"abc");
        let encoded = encode_text_string("Sí");
        assert_eq!(decode_text_string(&encoded), "Sí");
        assert_eq!(encode_win_ansi("Sí€"), vec![b'S', 0xED, b'?']);
    }
}
