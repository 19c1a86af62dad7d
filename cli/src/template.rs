//! Form templates stored as JSON.
//!
//! A template holds the field list in the editor's format (`label`, `type`,
//! `options`, `column`, `logic`), the visual configuration and any extra
//! images. The library only deals in [`DetectedField`]s; this module does the
//! translation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use formpdf::model::{apply_default_values, ExtraImage};
use formpdf::{
    AbsolutePosition, Column, ComposeOptions, DetectedField, FieldKind, Validation,
    VisibilityRule, VisualConfig,
};

type BoxError = Box<dyn std::error::Error>;

/// One field as written in a template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateField {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub options: Vec<String>,
    pub column: Column,
    /// Visibility rule as `"<index>|<value>"`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub logic: String,
    pub required: bool,
    pub default_value: String,
    pub validation: Validation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute_position: Option<AbsolutePosition>,
}

impl TemplateField {
    pub fn to_field(&self) -> DetectedField {
        let mut field = DetectedField::new(
            self.label.clone(),
            FieldKind::from_type_name(&self.kind, self.options.clone()),
        )
        .required(self.required)
        .with_column(self.column)
        .with_validation(self.validation)
        .with_default_value(self.default_value.clone());
        field.absolute_position = self.absolute_position;

        if !self.logic.is_empty() {
            match VisibilityRule::parse(&self.logic) {
                Some(rule) => field = field.with_visibility(rule),
                None => log::warn!("Ignoring malformed logic '{}' on '{}'", self.logic, self.label),
            }
        }
        field
    }

    pub fn from_field(field: &DetectedField) -> Self {
        Self {
            label: field.label.clone(),
            kind: field.type_name().to_string(),
            options: field.options().to_vec(),
            column: field.column,
            logic: field
                .visibility
                .as_ref()
                .map(|rule| format!("{}|{}", rule.trigger_index, rule.value))
                .unwrap_or_default(),
            required: field.required,
            default_value: field.default_value.clone(),
            validation: field.validation,
            absolute_position: field.absolute_position,
        }
    }
}

/// A saved form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub fields: Vec<TemplateField>,
    pub visual_config: VisualConfig,
    pub extra_images: Vec<ExtraImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<PathBuf>,
}

impl Template {
    /// Read a template, or a bare JSON array of fields.
    pub fn load(path: &Path) -> Result<Self, BoxError> {
        let data = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&data)?;
        let template = if value.is_array() {
            Template {
                fields: serde_json::from_value(value)?,
                ..Default::default()
            }
        } else {
            serde_json::from_value(value)?
        };
        Ok(template)
    }

    pub fn from_fields(title: Option<String>, fields: &[DetectedField]) -> Self {
        Template {
            title,
            fields: fields.iter().map(TemplateField::from_field).collect(),
            ..Default::default()
        }
    }

    pub fn fields(&self) -> Vec<DetectedField> {
        self.fields.iter().map(TemplateField::to_field).collect()
    }

    /// Fields with per-label value overrides from a JSON object file.
    pub fn fields_with_values(&self, values: Option<&Path>) -> Result<Vec<DetectedField>, BoxError> {
        let mut fields = self.fields();
        if let Some(path) = values {
            let values: HashMap<String, String> = serde_json::from_str(&fs::read_to_string(path)?)?;
            let changed = apply_default_values(&mut fields, &values);
            log::info!("Applied {} default values from {}", changed, path.display());
        }
        Ok(fields)
    }

    pub fn compose_options(&self) -> ComposeOptions {
        let mut options = ComposeOptions::new().with_visual(self.visual_config.clone());
        if let Some(title) = &self.title {
            options = options.with_title(title.clone());
        }
        if let Some(logo) = &self.logo {
            options = options.with_logo(logo.clone());
        }
        for image in &self.extra_images {
            options = options.with_extra_image(image.clone());
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_format() {
        let json = r#"{
            "title": "Inscripción",
            "fields": [
                {"label": "Nombre", "type": "text", "column": "left", "required": true},
                {"label": "Provincia", "type": "dropdown", "options": ["Madrid", "Sevilla"], "column": "right"},
                {"label": "Otra", "type": "text", "logic": "1|Sevilla"}
            ],
            "visual_config": {"font_name": "Times", "spacing": 50}
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plantilla.json");
        fs::write(&path, json).unwrap();

        let template = Template::load(&path).unwrap();
        let fields = template.fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].column, Column::Left);
        assert!(fields[0].required);
        assert_eq!(fields[1].options(), ["Madrid", "Sevilla"]);
        assert_eq!(fields[2].visibility.as_ref().unwrap().trigger_index, 1);

        let options = template.compose_options();
        assert_eq!(options.title, "Inscripción");
        assert_eq!(options.visual.spacing, 50.0);
    }

    #[test]
    fn test_bare_field_array_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campos.json");
        fs::write(&path, r#"[{"label": "Acepto", "type": "checkbox"}]"#).unwrap();
        let values = dir.path().join("valores.json");
        fs::write(&values, r#"{"Acepto": "sí"}"#).unwrap();

        let template = Template::load(&path).unwrap();
        let fields = template.fields_with_values(Some(&values)).unwrap();
        assert!(fields[0].is_checked());
    }

    #[test]
    fn test_round_trip_through_fields() {
        let field = DetectedField::new("Firma", FieldKind::Signature).with_visibility(VisibilityRule {
            trigger_index: 0,
            value: "Yes".to_string(),
        });
        let template = Template::from_fields(None, &[field.clone()]);
        assert_eq!(template.fields[0].logic, "0|Yes");
        assert_eq!(template.fields(), vec![field]);
    }
}
