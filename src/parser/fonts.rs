//! Glyph width metrics for advancing the text position.

use lopdf::{Dictionary, Document as LopdfDocument};

use super::document::resolve;

/// Widths of one font, in thousandths of an em.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    /// BaseFont name
    pub base_font: String,
    first_char: u32,
    widths: Vec<f32>,
    default_width: f32,
    /// Two-byte (Type0) font
    pub two_byte: bool,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            base_font: "Unknown".to_string(),
            first_char: 0,
            widths: Vec::new(),
            default_width: 500.0,
            two_byte: false,
        }
    }
}

impl FontMetrics {
    /// Read metrics from a font dictionary.
    pub fn from_font_dict(doc: &LopdfDocument, font: &Dictionary) -> Self {
        let base_font = font
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        let subtype = font
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .unwrap_or(b"");
        let two_byte = subtype == b"Type0";

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
            .max(0) as u32;

        let widths = font
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| resolve(doc, w).as_float().unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            default_width: standard_width(&base_font),
            base_font,
            first_char,
            widths,
            two_byte,
        }
    }

    /// Metrics for a standard-14 font referenced by name only.
    pub fn standard(base_font: &str) -> Self {
        Self {
            base_font: base_font.to_string(),
            default_width: standard_width(base_font),
            ..Default::default()
        }
    }

    /// Advance of a whole string operand at `font_size`, in points.
    pub fn text_width(&self, bytes: &[u8], font_size: f32) -> f32 {
        self.codes(bytes).map(|c| self.code_width(c)).sum::<f32>() * font_size / 1000.0
    }

    /// Width of one character code, in thousandths of an em.
    pub fn code_width(&self, code: u32) -> f32 {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }

    /// Character codes in a string operand.
    pub fn codes<'a>(&self, bytes: &'a [u8]) -> Box<dyn Iterator<Item = u32> + 'a> {
        if self.two_byte {
            Box::new(
                bytes
                    .chunks(2)
                    .map(|c| c.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32)),
            )
        } else {
            Box::new(bytes.iter().map(|b| *b as u32))
        }
    }
}

/// Average advance for fonts without a `/Widths` array.
fn standard_width(base_font: &str) -> f32 {
    let name = base_font.to_lowercase();
    if name.contains("courier") || name.contains("mono") {
        600.0
    } else if name.contains("times") {
        450.0
    } else {
        500.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_widths_from_dict() {
        let doc = LopdfDocument::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 65,
            "Widths" => vec![667.into(), 667.into()],
        };
        let metrics = FontMetrics::from_font_dict(&doc, &font);
        assert_eq!(metrics.code_width(65), 667.0);
        assert_eq!(metrics.code_width(66), 667.0);
        // Outside the table
        assert_eq!(metrics.code_width(67), 500.0);
        assert_eq!(metrics.code_width(10), 500.0);
    }

    #[test]
    fn test_standard_text_width() {
        let metrics = FontMetrics::standard("Courier-Bold");
        assert_eq!(metrics.text_width(b"abcd", 10.0), 24.0);
        assert_eq!(FontMetrics::standard("Helvetica").text_width(b"", 12.0), 0.0);
    }

    #[test]
    fn test_fallback_width() {
        let doc = LopdfDocument::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        };
        let metrics = FontMetrics::from_font_dict(&doc, &font);
        assert_eq!(metrics.code_width(65), 600.0);
        assert_eq!(metrics.codes(b"AB").count(), 2);
    }

    #[test]
    fn test_two_byte_codes() {
        let metrics = FontMetrics {
            two_byte: true,
            ..Default::default()
        };
        let codes: Vec<u32> = metrics.codes(&[0x00, 0x41, 0x01, 0x02]).collect();
        assert_eq!(codes, vec![0x41, 0x0102]);
    }
}
