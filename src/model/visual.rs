//! Visual configuration for generated forms.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// RGB colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
}

impl Rgb {
    /// Black.
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    /// Pure red, used for required markers.
    pub const RED: Rgb = Rgb::new(1.0, 0.0, 0.0);

    /// Create a colour.
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB`, `RRGGBB` or `#RGB`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return None,
        };
        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Title alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Left alignment (default)
    #[default]
    #[serde(alias = "Izquierda")]
    Left,
    /// Center alignment
    #[serde(alias = "Centro", alias = "centre")]
    Center,
    /// Right alignment
    #[serde(alias = "Derecha")]
    Right,
}

/// Logo position, top-left page points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogoPosition {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
}

impl Default for LogoPosition {
    fn default() -> Self {
        Self { x: 50.0, y: 30.0 }
    }
}

/// Look of a generated form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    /// Title and section colour, hex
    pub primary_color: String,
    /// Label colour, hex
    pub text_color: String,
    /// Base font (one of the standard 14 families)
    pub font_name: String,
    /// Label font size
    pub font_size_label: f32,
    /// Title font size
    pub font_size_title: f32,
    /// Vertical advance between flowing fields
    pub spacing: f32,
    /// Title alignment
    pub alignment: Alignment,
    /// Logo placement
    pub logo_position: LogoPosition,
    /// Background document
    pub bg_pdf_path: Option<PathBuf>,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            primary_color: "#2E86C1".to_string(),
            text_color: "#2C3E50".to_string(),
            font_name: "Helvetica".to_string(),
            font_size_label: 12.0,
            font_size_title: 18.0,
            spacing: 60.0,
            alignment: Alignment::Left,
            logo_position: LogoPosition::default(),
            bg_pdf_path: None,
        }
    }
}

impl VisualConfig {
    /// Primary colour, falling back to the default blue.
    pub fn primary_rgb(&self) -> Rgb {
        Rgb::from_hex(&self.primary_color).unwrap_or(Rgb::new(0.18, 0.525, 0.757))
    }

    /// Text colour, falling back to black.
    pub fn text_rgb(&self) -> Rgb {
        Rgb::from_hex(&self.text_color).unwrap_or(Rgb::BLACK)
    }

    /// Regular font resource name.
    pub fn regular_font(&self) -> String {
        standard_font(&self.font_name, false)
    }

    /// Bold font resource name.
    pub fn bold_font(&self) -> String {
        standard_font(&self.font_name, true)
    }
}

/// Map a family name onto a standard-14 BaseFont.
fn standard_font(family: &str, bold: bool) -> String {
    match (family.trim().to_lowercase().as_str(), bold) {
        ("times" | "times-roman", false) => "Times-Roman".to_string(),
        ("times" | "times-roman", true) => "Times-Bold".to_string(),
        ("courier", false) => "Courier".to_string(),
        ("courier", true) => "Courier-Bold".to_string(),
        ("helvetica" | "", false) => "Helvetica".to_string(),
        ("helvetica" | "", true) => "Helvetica-Bold".to_string(),
        _ => family.to_string(),
    }
}

/// An image placed on the first page of a generated form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraImage {
    /// Image file
    pub path: PathBuf,
    /// Left edge
    #[serde(default = "default_image_x")]
    pub x: f32,
    /// Top edge
    #[serde(default = "default_image_y")]
    pub y: f32,
    /// Width
    #[serde(default = "default_image_size")]
    pub w: f32,
    /// Height
    #[serde(default = "default_image_size")]
    pub h: f32,
}

fn default_image_x() -> f32 {
    50.0
}

fn default_image_y() -> f32 {
    200.0
}

fn default_image_size() -> f32 {
    100.0
}
