//! Form field types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Rect;

/// Values that switch a checkbox on, compared case-insensitively.
pub const CHECKBOX_TRUTHY: &[&str] = &["yes", "true", "1", "on", "si", "sí", "x"];

/// Whether a default value turns a checkbox on.
pub fn is_truthy(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    CHECKBOX_TRUTHY.contains(&value.as_str())
}

/// Horizontal slot of a date sub-field, relative to the field's left edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateSlot {
    /// Offset from the field's x in points
    pub offset: f32,
    /// Width in points
    pub width: f32,
}

impl DateSlot {
    /// Create a slot.
    pub const fn new(offset: f32, width: f32) -> Self {
        Self { offset, width }
    }
}

/// Day/month/year sub-rectangles of a date field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateParts {
    /// Day box
    pub day: DateSlot,
    /// Month box
    pub month: DateSlot,
    /// Year box
    pub year: DateSlot,
}

impl Default for DateParts {
    fn default() -> Self {
        Self {
            day: DateSlot::new(50.0, 30.0),
            month: DateSlot::new(95.0, 30.0),
            year: DateSlot::new(140.0, 50.0),
        }
    }
}

impl DateParts {
    /// Slots in day, month, year order.
    pub fn slots(&self) -> [DateSlot; 3] {
        [self.day, self.month, self.year]
    }

    /// Total width spanned from the field's x to the end of the year box.
    pub fn extent(&self) -> f32 {
        self.slots()
            .iter()
            .map(|s| s.offset + s.width)
            .fold(0.0, f32::max)
    }
}

/// Split a `dd/mm/yyyy` default into its three parts. Anything else yields
/// three empty strings.
pub fn split_date(value: &str) -> [String; 3] {
    let parts: Vec<&str> = value.split('/').collect();
    if parts.len() == 3 {
        [
            parts[0].trim().to_string(),
            parts[1].trim().to_string(),
            parts[2].trim().to_string(),
        ]
    } else {
        Default::default()
    }
}

/// Field type with its type-specific payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    /// Single-line text
    #[default]
    Text,
    /// Date split into day, month and year boxes
    Date {
        /// Sub-field geometry
        #[serde(default)]
        parts: DateParts,
    },
    /// Boolean toggle
    Checkbox,
    /// Combo box
    Dropdown {
        /// Choices, in display order
        #[serde(default)]
        options: Vec<String>,
    },
    /// Multi-line text area
    Multiline,
    /// Signature area
    Signature,
    /// Numeric text
    Number,
    /// Exclusive choice among radio buttons
    Radio {
        /// Choices, in display order
        #[serde(default)]
        options: Vec<String>,
    },
    /// Section heading; not an interactive field
    Section,
}

impl FieldKind {
    /// Build a kind from its type name, attaching options to choice kinds.
    /// Unknown names map to text.
    pub fn from_type_name(name: &str, options: Vec<String>) -> Self {
        match name.trim().to_lowercase().as_str() {
            "date" => FieldKind::Date {
                parts: DateParts::default(),
            },
            "checkbox" => FieldKind::Checkbox,
            "dropdown" => FieldKind::Dropdown { options },
            "multiline" => FieldKind::Multiline,
            "signature" => FieldKind::Signature,
            "number" => FieldKind::Number,
            "radio" => FieldKind::Radio { options },
            "section" => FieldKind::Section,
            _ => FieldKind::Text,
        }
    }

    /// Lower-case type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Date { .. } => "date",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Dropdown { .. } => "dropdown",
            FieldKind::Multiline => "multiline",
            FieldKind::Signature => "signature",
            FieldKind::Number => "number",
            FieldKind::Radio { .. } => "radio",
            FieldKind::Section => "section",
        }
    }

    /// Options of a choice field; empty for other kinds.
    pub fn options(&self) -> &[String] {
        match self {
            FieldKind::Dropdown { options } | FieldKind::Radio { options } => options,
            _ => &[],
        }
    }

    /// Whether the kind produces an interactive widget.
    pub fn is_interactive(&self) -> bool {
        !matches!(self, FieldKind::Section)
    }
}

/// Field rectangle in top-left page points, with its page.
///
/// `y` is the top edge; the box spans `[y, y + h]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbsolutePosition {
    /// Left edge
    pub x: f32,
    /// Top edge, measured from the top of the page
    pub y: f32,
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
    /// Zero-based page index
    #[serde(alias = "page")]
    pub page_index: usize,
}

impl AbsolutePosition {
    /// Create a position from a rectangle and page.
    pub fn from_rect(rect: Rect, page_index: usize) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            page_index,
        }
    }

    /// The rectangle part.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    /// Check the size and page invariants against a document.
    pub fn validate(&self, page_count: usize) -> Result<()> {
        if !(self.w > 0.0 && self.h > 0.0) {
            return Err(Error::InvalidField(format!(
                "non-positive size {}x{}",
                self.w, self.h
            )));
        }
        if self.page_index >= page_count {
            return Err(Error::PageOutOfRange(self.page_index, page_count));
        }
        Ok(())
    }
}

/// Horizontal slot for flowing layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    /// Full content width
    #[default]
    Full,
    /// Left half; shares its row with the next field
    #[serde(alias = "1")]
    Left,
    /// Right half
    #[serde(alias = "2")]
    Right,
}

/// Keystroke validation attached to a text widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validation {
    /// No validation
    #[default]
    #[serde(alias = "Ninguno")]
    None,
    /// E-mail address
    #[serde(alias = "Email")]
    Email,
    /// Spanish DNI/NIE identity number
    #[serde(alias = "DNI/NIE")]
    IdDocument,
    /// Spanish phone number
    #[serde(alias = "Teléfono")]
    Phone,
    /// Any number, comma or dot decimal
    #[serde(alias = "Numérico")]
    Numeric,
}

/// Show a field only when another field holds a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityRule {
    /// Index of the trigger field in the same field list
    pub trigger_index: usize,
    /// Value that makes the field visible
    pub value: String,
}

impl VisibilityRule {
    /// Parse the template form `"<index>|<value>"`.
    pub fn parse(logic: &str) -> Option<Self> {
        let (index, value) = logic.split_once('|')?;
        let trigger_index = index.trim().parse().ok()?;
        Some(Self {
            trigger_index,
            value: value.to_string(),
        })
    }
}

/// A form field, detected or user-defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedField {
    /// Human-readable label
    pub label: String,

    /// Type and type-specific payload
    #[serde(flatten)]
    pub kind: FieldKind,

    /// Explicit placement; `None` for flowing fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_position: Option<AbsolutePosition>,

    /// Initial value
    #[serde(default)]
    pub default_value: String,

    /// Whether the field must be filled
    #[serde(default)]
    pub required: bool,

    /// Flowing-layout column
    #[serde(default)]
    pub column: Column,

    /// Keystroke validation
    #[serde(default)]
    pub validation: Validation,

    /// Conditional visibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<VisibilityRule>,
}

impl DetectedField {
    /// Create a flowing field.
    pub fn new(label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            label: label.into(),
            kind,
            absolute_position: None,
            default_value: String::new(),
            required: false,
            column: Column::Full,
            validation: Validation::None,
            visibility: None,
        }
    }

    /// Create a field placed at `position`.
    pub fn placed(label: impl Into<String>, kind: FieldKind, position: AbsolutePosition) -> Self {
        Self::new(label, kind).with_position(position)
    }

    /// Set the absolute position.
    pub fn with_position(mut self, position: AbsolutePosition) -> Self {
        self.absolute_position = Some(position);
        self
    }

    /// Set the default value.
    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    /// Mark as required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set the column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.column = column;
        self
    }

    /// Set the validation.
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    /// Set a visibility rule.
    pub fn with_visibility(mut self, rule: VisibilityRule) -> Self {
        self.visibility = Some(rule);
        self
    }

    /// Lower-case type name.
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Options of a choice field.
    pub fn options(&self) -> &[String] {
        self.kind.options()
    }

    /// Page the field sits on, if placed.
    pub fn page_index(&self) -> Option<usize> {
        self.absolute_position.map(|p| p.page_index)
    }

    /// Validation actually applied: number fields always validate as numeric.
    pub fn effective_validation(&self) -> Validation {
        match self.kind {
            FieldKind::Number => Validation::Numeric,
            _ => self.validation,
        }
    }

    /// Checkbox state derived from the default value.
    pub fn is_checked(&self) -> bool {
        is_truthy(&self.default_value)
    }

    /// Dropdown selection: the default when it is one of the options,
    /// otherwise the first option.
    pub fn selected_option(&self) -> Option<&str> {
        let options = self.options();
        options
            .iter()
            .find(|o| o.as_str() == self.default_value)
            .or_else(|| options.first())
            .map(String::as_str)
    }
}

/// Override `default_value` of every field whose label has an entry in
/// `values`. Returns how many fields were changed.
pub fn apply_default_values(
    fields: &mut [DetectedField],
    values: &HashMap<String, String>,
) -> usize {
    let mut changed = 0;
    for field in fields.iter_mut() {
        if let Some(value) = values.get(&field.label) {
            field.default_value = value.clone();
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthy_values() {
        for v in ["yes", "TRUE", "1", "On", "si", "Sí", "x", " X "] {
            assert!(is_truthy(v), "{v} should be truthy");
        }
        for v in ["no", "off", "0", "", "checked"] {
            assert!(!is_truthy(v), "{v} should be falsy");
        }
    }

    #[test]
    fn test_split_date() {
        assert_eq!(split_date("01/02/2024"), ["01", "02", "2024"]);
        assert_eq!(split_date("2024-02-01"), ["", "", ""]);
        assert_eq!(split_date("1/2"), ["", "", ""]);
    }

    #[test]
    fn test_kind_from_type_name() {
        let kind = FieldKind::from_type_name("Dropdown", vec!["A".into(), "B".into()]);
        assert_eq!(kind.options(), ["A", "B"]);
        assert_eq!(FieldKind::from_type_name("unknown", vec![]), FieldKind::Text);
        assert_eq!(
            FieldKind::from_type_name("checkbox", vec!["ignored".into()]).options(),
            [] as [String; 0]
        );
    }

    #[test]
    fn test_position_validation() {
        let pos = AbsolutePosition::from_rect(Rect::new(10.0, 10.0, 100.0, 20.0), 1);
        assert!(pos.validate(2).is_ok());
        assert!(matches!(pos.validate(1), Err(Error::PageOutOfRange(1, 1))));

        let flat = AbsolutePosition::from_rect(Rect::new(10.0, 10.0, 100.0, 0.0), 0);
        assert!(flat.validate(1).is_err());
    }

    #[test]
    fn test_visibility_rule_parse() {
        let rule = VisibilityRule::parse("2|Yes").unwrap();
        assert_eq!(rule.trigger_index, 2);
        assert_eq!(rule.value, "Yes");
        assert!(VisibilityRule::parse("nope").is_none());
        assert!(VisibilityRule::parse("x|1").is_none());
    }

    #[test]
    fn test_selected_option() {
        let field = DetectedField::new(
            "Color",
            FieldKind::Dropdown {
                options: vec!["Red".into(), "Blue".into()],
            },
        );
        assert_eq!(field.selected_option(), Some("Red"));
        let field = field.with_default_value("Blue");
        assert_eq!(field.selected_option(), Some("Blue"));
    }

    #[test]
    fn test_number_forces_numeric_validation() {
        let field = DetectedField::new("Edad", FieldKind::Number);
        assert_eq!(field.effective_validation(), Validation::Numeric);
    }

    #[test]
    fn test_serde_shape() {
        let field = DetectedField::placed(
            "Nombre",
            FieldKind::Text,
            AbsolutePosition::from_rect(Rect::new(130.0, 106.0, 170.0, 20.0), 0),
        );
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["absolute_position"]["page_index"], 0);

        let parsed: DetectedField = serde_json::from_str(
            r#"{"label":"Sexo","type":"radio","options":["H","M"],"column":"2","validation":"Ninguno"}"#,
        )
        .unwrap();
        assert_eq!(parsed.options(), ["H", "M"]);
        assert_eq!(parsed.column, Column::Right);
        assert!(parsed.absolute_position.is_none());
    }

    #[test]
    fn test_apply_default_values() {
        let mut fields = vec![
            DetectedField::new("Nombre", FieldKind::Text),
            DetectedField::new("Email", FieldKind::Text),
        ];
        let mut values = HashMap::new();
        values.insert("Email".to_string(), "a@b.es".to_string());
        assert_eq!(apply_default_values(&mut fields, &values), 1);
        assert_eq!(fields[1].default_value, "a@b.es");
        assert!(fields[0].default_value.is_empty());
    }
}
