//! Document title detection.

use crate::parser::TextSpan;

/// Minimum trimmed length of a span considered as a title.
pub const MIN_TITLE_CHARS: usize = 6;

/// Pick a title: the metadata title when present, else the text of the
/// largest-font span on the first page.
///
/// Among spans of equal size the first one wins.
pub fn detect_title(metadata_title: Option<&str>, first_page_spans: &[TextSpan]) -> Option<String> {
    if let Some(title) = metadata_title.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(title.to_string());
    }

    let mut best: Option<&TextSpan> = None;
    for span in first_page_spans {
        if span.font_size <= 0.0 || span.text.trim().chars().count() < MIN_TITLE_CHARS {
            continue;
        }
        if best.map_or(true, |b| span.font_size > b.font_size) {
            best = Some(span);
        }
    }
    best.map(|s| s.text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_title_wins() {
        let spans = vec![TextSpan::new("SOLICITUD DE AYUDA", 50.0, 50.0, 200.0, 18.0)];
        assert_eq!(
            detect_title(Some("Formulario 2024"), &spans).as_deref(),
            Some("Formulario 2024")
        );
    }

    #[test]
    fn test_largest_font() {
        let spans = vec![
            TextSpan::new("Nombre:", 50.0, 150.0, 40.0, 10.0),
            TextSpan::new("SOLICITUD DE AYUDA", 50.0, 50.0, 200.0, 18.0),
            TextSpan::new("Anexo", 50.0, 30.0, 30.0, 24.0),
            TextSpan::new("OTRO TÍTULO GRANDE", 50.0, 80.0, 200.0, 18.0),
        ];
        // "Anexo" is too short; the first 18pt span wins the tie
        assert_eq!(
            detect_title(Some("  "), &spans).as_deref(),
            Some("SOLICITUD DE AYUDA")
        );
    }

    #[test]
    fn test_no_title() {
        assert_eq!(detect_title(None, &[]), None);
        let spans = vec![TextSpan::new("  abc  ", 50.0, 50.0, 20.0, 30.0)];
        assert_eq!(detect_title(None, &spans), None);
    }
}
