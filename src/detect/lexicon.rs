//! Word lists that drive label recognition and field-type inference.
//!
//! The built-in lists come in two locales. Spanish is the default because
//! the forms this engine grew up on are Spanish administrative documents;
//! other languages get [`Lexicon::english`] or a custom list.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::model::{DateParts, FieldKind};

/// A label pattern and the kind of field it implies.
#[derive(Debug, Clone)]
pub struct TypeRule {
    pattern: Regex,
    kind: FieldKind,
}

impl TypeRule {
    /// Compile a rule. Patterns are matched against the folded label.
    pub fn new(pattern: &str, kind: FieldKind) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            kind,
        })
    }

    /// Whether the rule matches a label.
    pub fn matches(&self, label: &str) -> bool {
        self.pattern.is_match(&fold(label))
    }

    /// Kind of field implied by a match.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }
}

/// Ordered so that the first match wins, e.g. "Nombre y fecha" stays text.
static BUILTIN_TYPE_RULES: LazyLock<Vec<TypeRule>> = LazyLock::new(|| {
    let text = || FieldKind::Text;
    let date = || FieldKind::Date {
        parts: DateParts::default(),
    };
    [
        (r"(nombre|name|apellidos?|surname|first\s*name|last\s*name)", text()),
        (r"(e-?mail|correo\s*electr[oó]nico)", text()),
        (r"(tel[eé]fono|phone|m[oó]vil|celular|tel\.?)", text()),
        (r"(fecha|date|nacimiento|birth)", date()),
        (r"(dni|nif|nie|documento|id|identification)", text()),
        (r"(direcci[oó]n|address|calle|street)", text()),
        (r"(c[oó]digo\s*postal|zip|postal\s*code|cp)", text()),
        (r"(ciudad|city|localidad|poblaci[oó]n)", text()),
        (r"(provincia|state|regi[oó]n)", text()),
        (r"(pa[ií]s|country)", text()),
    ]
    .into_iter()
    .filter_map(|(pattern, kind)| TypeRule::new(pattern, kind).ok())
    .collect()
});

/// Locale-specific word lists.
#[derive(Debug, Clone)]
pub struct Lexicon {
    /// Section headings that end in a colon but are not fields (exact match)
    pub section_headings: Vec<String>,
    /// Substrings that mark a label as a field regardless of other filters
    pub field_keywords: Vec<String>,
    /// Short words that are never header labels on their own
    pub stopwords: Vec<String>,
    /// Word endings that show up alone when a word is broken across lines
    pub suffix_fragments: Vec<String>,
    /// Words ending in this suffix and shorter than `truncated_max_chars`
    /// are treated as fragments
    pub truncated_suffix: Option<String>,
    /// Length limit for `truncated_suffix`
    pub truncated_max_chars: usize,
    /// Field-type inference rules, first match wins
    pub type_rules: Vec<TypeRule>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::spanish()
    }
}

/// Lowercase in composed form, so a decomposed "ó" extracted from a PDF
/// matches the word lists.
fn fold(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase()
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Lexicon {
    /// Spanish administrative forms.
    pub fn spanish() -> Self {
        Self {
            section_headings: owned(&[
                "datos personales",
                "datos fiscales",
                "documentación solicitada",
                "información básica",
                "información adicional",
                "documentos requeridos",
            ]),
            field_keywords: owned(&[
                "nombre",
                "apellido",
                "apellidos",
                "email",
                "correo",
                "teléfono",
                "telefono",
                "móvil",
                "movil",
                "dni",
                "nif",
                "nie",
                "fecha",
                "sexo",
                "edad",
                "dirección",
                "direccion",
                "ciudad",
                "provincia",
                "país",
                "pais",
                "cp",
                "código",
                "codigo",
                "iban",
                "cuenta",
                "banco",
                "empresa",
                "cargo",
                "puesto",
                "departamento",
                "seguridad social",
            ]),
            stopwords: owned(&[
                "de", "la", "el", "los", "las", "en", "con", "para", "por", "se", "debe", "y", "o",
            ]),
            suffix_fragments: owned(&["ción", "ducción", "miento", "mente", "idad"]),
            truncated_suffix: Some("ción".to_string()),
            truncated_max_chars: 10,
            type_rules: BUILTIN_TYPE_RULES.clone(),
        }
    }

    /// English forms.
    pub fn english() -> Self {
        Self {
            section_headings: owned(&[
                "personal information",
                "personal details",
                "contact information",
                "additional information",
                "required documents",
                "basic information",
            ]),
            field_keywords: owned(&[
                "name",
                "surname",
                "email",
                "e-mail",
                "phone",
                "mobile",
                "date",
                "birth",
                "gender",
                "age",
                "address",
                "city",
                "state",
                "province",
                "country",
                "zip",
                "postal",
                "account",
                "bank",
                "company",
                "employer",
                "position",
                "department",
                "signature",
                "ssn",
            ]),
            stopwords: owned(&[
                "the", "a", "an", "of", "and", "or", "to", "in", "for", "with", "by", "on", "must",
            ]),
            suffix_fragments: owned(&["tion", "ment", "ness", "ity", "ing"]),
            truncated_suffix: None,
            truncated_max_chars: 0,
            type_rules: BUILTIN_TYPE_RULES.clone(),
        }
    }

    /// Add field keywords.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_keywords
            .extend(keywords.into_iter().map(|k| fold(&Into::<String>::into(k))));
        self
    }

    /// Add section headings.
    pub fn with_section_headings<I, S>(mut self, headings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.section_headings
            .extend(headings.into_iter().map(|h| fold(&Into::<String>::into(h))));
        self
    }

    /// Put a type rule ahead of the existing ones.
    pub fn with_type_rule(mut self, pattern: &str, kind: FieldKind) -> Result<Self, regex::Error> {
        self.type_rules.insert(0, TypeRule::new(pattern, kind)?);
        Ok(self)
    }

    /// Exact, case-insensitive match against the section headings.
    pub fn is_section_heading(&self, label: &str) -> bool {
        let lower = fold(label);
        self.section_headings.iter().any(|h| *h == lower)
    }

    /// Whether the label contains a field keyword.
    pub fn has_field_keyword(&self, label: &str) -> bool {
        let lower = fold(label);
        self.field_keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    /// Whether the label is a lone stopword.
    pub fn is_stopword(&self, label: &str) -> bool {
        let lower = fold(label);
        self.stopwords.iter().any(|w| *w == lower)
    }

    /// Whether the label looks like the tail of a hyphenated word.
    pub fn is_suffix_fragment(&self, label: &str) -> bool {
        let lower = fold(label);
        let trimmed = lower.trim_end_matches('.');
        if self
            .suffix_fragments
            .iter()
            .any(|s| *s == lower || *s == trimmed)
        {
            return true;
        }
        match &self.truncated_suffix {
            Some(suffix) => {
                trimmed.ends_with(suffix.as_str())
                    && trimmed.chars().count() < self.truncated_max_chars
            }
            None => false,
        }
    }

    /// Field kind implied by a label; text when nothing matches.
    pub fn infer_kind(&self, label: &str) -> FieldKind {
        self.type_rules
            .iter()
            .find(|rule| rule.matches(label))
            .map(|rule| rule.kind().clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_headings_exact_match() {
        let lexicon = Lexicon::spanish();
        assert!(lexicon.is_section_heading("Documentación solicitada"));
        assert!(lexicon.is_section_heading("DATOS PERSONALES"));
        assert!(!lexicon.is_section_heading("Datos personales del titular"));
    }

    #[test]
    fn test_keywords_are_substrings() {
        let lexicon = Lexicon::spanish();
        assert!(lexicon.has_field_keyword("Nombre completo"));
        assert!(lexicon.has_field_keyword("Número de cuenta"));
        assert!(!lexicon.has_field_keyword("Documentación solicitada"));
    }

    #[test]
    fn test_suffix_fragments() {
        let lexicon = Lexicon::spanish();
        assert!(lexicon.is_suffix_fragment("ción."));
        assert!(lexicon.is_suffix_fragment("mente"));
        assert!(lexicon.is_suffix_fragment("Relación"));
        assert!(!lexicon.is_suffix_fragment("Nacionalidad"));
        assert!(!lexicon.is_suffix_fragment("Documentación"));
    }

    #[test]
    fn test_infer_kind() {
        let lexicon = Lexicon::spanish();
        assert_eq!(lexicon.infer_kind("Fecha de nacimiento").type_name(), "date");
        assert_eq!(lexicon.infer_kind("Date of birth").type_name(), "date");
        assert_eq!(lexicon.infer_kind("Nombre").type_name(), "text");
        assert_eq!(lexicon.infer_kind("Observaciones").type_name(), "text");
    }

    #[test]
    fn test_custom_rule_takes_precedence() {
        let lexicon = Lexicon::english()
            .with_type_rule(r"signature|firma", FieldKind::Signature)
            .unwrap();
        assert_eq!(lexicon.infer_kind("Signature").type_name(), "signature");
        assert!(Lexicon::english().with_type_rule("(", FieldKind::Text).is_err());
    }

    #[test]
    fn test_decomposed_accents() {
        let lexicon = Lexicon::spanish();
        // "Dirección" with a combining acute accent
        let decomposed = "Direccio\u{301}n";
        assert_eq!(lexicon.is_section_heading(decomposed), lexicon.is_section_heading("Dirección"));
        assert_eq!(lexicon.has_field_keyword(decomposed), lexicon.has_field_keyword("Dirección"));
    }

    #[test]
    fn test_english_lists() {
        let lexicon = Lexicon::english().with_keywords(["Passport"]);
        assert!(lexicon.has_field_keyword("Passport number"));
        assert!(lexicon.is_stopword("The"));
        assert!(!lexicon.is_suffix_fragment("Relation"));
    }
}
