//! Options for generating fillable forms.

use std::path::{Path, PathBuf};

use crate::geometry::PageFrame;
use crate::model::{ExtraImage, VisualConfig};

/// Options for composing a fillable PDF.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Title drawn at the top of every page
    pub title: String,

    /// Colours, fonts and spacing
    pub visual: VisualConfig,

    /// Page size; when unset the background's first page decides, then Letter
    pub page_frame: Option<PageFrame>,

    /// Document drawn beneath every generated page
    pub background: Option<PathBuf>,

    /// Logo drawn in every page header
    pub logo: Option<PathBuf>,

    /// Images placed on the first page
    pub extra_images: Vec<ExtraImage>,

    /// Draw labels next to absolutely positioned fields
    pub draw_absolute_labels: bool,

    /// Flate-compress generated content streams
    pub compress: bool,
}

impl ComposeOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the visual configuration. Its `bg_pdf_path`, if any, becomes the
    /// background unless one was set explicitly.
    pub fn with_visual(mut self, visual: VisualConfig) -> Self {
        if self.background.is_none() {
            self.background = visual.bg_pdf_path.clone();
        }
        self.visual = visual;
        self
    }

    /// Force a page size.
    pub fn with_page_frame(mut self, frame: PageFrame) -> Self {
        self.page_frame = Some(frame);
        self
    }

    /// Set the background document.
    pub fn with_background(mut self, path: impl Into<PathBuf>) -> Self {
        self.background = Some(path.into());
        self
    }

    /// Set the header logo.
    pub fn with_logo(mut self, path: impl Into<PathBuf>) -> Self {
        self.logo = Some(path.into());
        self
    }

    /// Add an image to the first page.
    pub fn with_extra_image(mut self, image: ExtraImage) -> Self {
        self.extra_images.push(image);
        self
    }

    /// Enable or disable labels on absolute fields.
    pub fn with_absolute_labels(mut self, draw: bool) -> Self {
        self.draw_absolute_labels = draw;
        self
    }

    /// Enable or disable content stream compression.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Background path, if any.
    pub fn background(&self) -> Option<&Path> {
        self.background.as_deref()
    }
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            title: "Formulario".to_string(),
            visual: VisualConfig::default(),
            page_frame: None,
            background: None,
            logo: None,
            extra_images: Vec::new(),
            draw_absolute_labels: true,
            compress: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = ComposeOptions::new()
            .with_title("Solicitud")
            .with_page_frame(PageFrame::a4())
            .with_absolute_labels(false);
        assert_eq!(options.title, "Solicitud");
        assert_eq!(options.page_frame, Some(PageFrame::a4()));
        assert!(!options.draw_absolute_labels);
        assert!(options.compress);
    }

    #[test]
    fn test_visual_background() {
        let visual = VisualConfig {
            bg_pdf_path: Some(PathBuf::from("fondo.pdf")),
            ..Default::default()
        };
        let options = ComposeOptions::new().with_visual(visual.clone());
        assert_eq!(options.background(), Some(Path::new("fondo.pdf")));

        let options = ComposeOptions::new()
            .with_background("explicit.pdf")
            .with_visual(visual);
        assert_eq!(options.background(), Some(Path::new("explicit.pdf")));
    }
}
