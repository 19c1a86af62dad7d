//! Label recognition from page text.

use crate::geometry::Rect;
use crate::model::LabelCandidate;
use crate::parser::TextLine;

use super::config::LabelRules;
use super::lexicon::Lexicon;

/// Finds text lines that read like field labels.
///
/// Two shapes are recognised. Text with a colon contributes the part before
/// the first colon ("Nombre: ______"). Text without one is accepted as a
/// header-style label when it is short and looks like a word or two
/// ("Apellidos" over a table column). Keyword matches are accepted
/// generously; everything else has to pass the shape filters.
#[derive(Debug, Clone)]
pub struct LabelExtractor<'a> {
    rules: &'a LabelRules,
    lexicon: &'a Lexicon,
}

impl<'a> LabelExtractor<'a> {
    /// Create an extractor.
    pub fn new(rules: &'a LabelRules, lexicon: &'a Lexicon) -> Self {
        Self { rules, lexicon }
    }

    /// Labels among a page's text lines, in reading order.
    pub fn extract(&self, lines: &[TextLine]) -> Vec<LabelCandidate> {
        lines
            .iter()
            .filter(|line| !line.is_empty())
            .filter_map(|line| self.extract_label(&line.text(), line.bbox(), line.avg_font_size()))
            .collect()
    }

    /// Check one line of text. `font_size` of 0 means unknown.
    pub fn extract_label(&self, text: &str, bbox: Rect, font_size: f32) -> Option<LabelCandidate> {
        let text = text.trim();
        let label = match text.split_once(':') {
            Some((before, _)) => self.colon_label(before)?,
            None => self.header_label(text, font_size)?,
        };
        Some(LabelCandidate::new(label, bbox, font_size))
    }

    fn colon_label(&self, before: &str) -> Option<String> {
        let raw = before.trim();
        if raw.chars().count() < self.rules.min_chars {
            return None;
        }

        // "Nombre (como figura en el DNI):"
        let label = match raw.split_once('(') {
            Some((head, _)) => head.trim(),
            None => raw,
        };
        if label.chars().count() < self.rules.min_chars {
            return None;
        }

        if self.lexicon.has_field_keyword(label) {
            return Some(label.to_string());
        }

        if raw.chars().count() > self.rules.max_colon_chars
            || raw.split_whitespace().count() > self.rules.max_colon_words
        {
            return None;
        }
        // Tail of a parenthetical that started on the previous line
        if label.contains(')') && !raw.contains('(') {
            return None;
        }
        if self.lexicon.is_section_heading(label) {
            return None;
        }

        Some(label.to_string())
    }

    fn header_label(&self, text: &str, font_size: f32) -> Option<String> {
        let chars = text.chars().count();
        if chars < self.rules.min_chars || chars > self.rules.max_header_chars {
            return None;
        }
        if text.split_whitespace().count() > self.rules.max_header_words {
            return None;
        }
        if text.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if text.contains('(') || text.contains(')') {
            return None;
        }
        // Rules, dot leaders and numbering
        if !text.chars().any(char::is_alphabetic) {
            return None;
        }

        if self.lexicon.has_field_keyword(text) {
            return Some(text.to_string());
        }

        if self.lexicon.is_suffix_fragment(text) || self.lexicon.is_stopword(text) {
            return None;
        }

        let (min_size, max_size) = self.rules.font_size_range;
        if font_size > 0.0 && (font_size < min_size || font_size > max_size) {
            return None;
        }

        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TextSpan;

    fn extract(text: &str, font_size: f32) -> Option<String> {
        let rules = LabelRules::default();
        let lexicon = Lexicon::spanish();
        LabelExtractor::new(&rules, &lexicon)
            .extract_label(text, Rect::new(50.0, 100.0, 70.0, 12.0), font_size)
            .map(|c| c.text)
    }

    #[test]
    fn test_colon_label() {
        assert_eq!(extract("Nombre:", 10.0).as_deref(), Some("Nombre"));
        assert_eq!(
            extract("Apellidos: ____________", 10.0).as_deref(),
            Some("Apellidos")
        );
    }

    #[test]
    fn test_section_heading_rejected() {
        assert_eq!(extract("Documentación solicitada:", 10.0), None);
        assert_eq!(extract("DATOS PERSONALES:", 10.0), None);
    }

    #[test]
    fn test_parenthetical_stripped() {
        assert_eq!(
            extract("Domicilio (calle y número):", 10.0).as_deref(),
            Some("Domicilio")
        );
        assert_eq!(extract("fiscales):", 10.0), None);
    }

    #[test]
    fn test_keyword_overrides_length() {
        let long = "Indique aquí el nombre completo del representante legal de la entidad:";
        assert_eq!(extract(long, 10.0).as_deref(), Some(long.trim_end_matches(':')));
        let long_instruction =
            "Lea atentamente las instrucciones que figuran al dorso antes de rellenar:";
        assert_eq!(extract(long_instruction, 10.0), None);
    }

    #[test]
    fn test_colon_too_short() {
        assert_eq!(extract(":", 10.0), None);
        assert_eq!(extract("A: b", 10.0), None);
    }

    #[test]
    fn test_header_font_size_range() {
        assert_eq!(extract("XYZ123", 20.0), None);
        assert_eq!(extract("XYZ123", 10.0).as_deref(), Some("XYZ123"));
        assert_eq!(extract("XYZ123", 0.0).as_deref(), Some("XYZ123"));
        assert_eq!(extract("XYZ123", 4.0), None);
    }

    #[test]
    fn test_header_keyword_ignores_font_size() {
        assert_eq!(extract("Apellidos", 20.0).as_deref(), Some("Apellidos"));
        assert_eq!(extract("Dirección", 10.0).as_deref(), Some("Dirección"));
    }

    #[test]
    fn test_header_shape_filters() {
        assert_eq!(extract("12345", 10.0), None);
        assert_eq!(extract("a", 10.0), None);
        assert_eq!(extract("Ver (anexo)", 10.0), None);
        assert_eq!(extract("esta es una frase larga", 10.0), None);
        assert_eq!(extract("Este texto tiene demasiadas letras", 10.0), None);
        assert_eq!(extract("________", 10.0), None);
        assert_eq!(extract("para", 10.0), None);
        assert_eq!(extract("ción.", 10.0), None);
        assert_eq!(extract("Relación", 10.0), None);
    }

    #[test]
    fn test_extract_from_lines() {
        let rules = LabelRules::default();
        let lexicon = Lexicon::spanish();
        let lines = vec![
            TextLine::from_spans(vec![TextSpan::new("Nombre:", 50.0, 110.0, 40.0, 10.0)]),
            TextLine::from_spans(vec![TextSpan::new(
                "Rellene el formulario con letra clara y en mayúsculas.",
                50.0,
                140.0,
                300.0,
                10.0,
            )]),
        ];
        let labels = LabelExtractor::new(&rules, &lexicon).extract(&lines);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].text, "Nombre");
        assert_eq!(labels[0].font_size, 10.0);
        assert_eq!(labels[0].bbox.x, 50.0);
    }
}
