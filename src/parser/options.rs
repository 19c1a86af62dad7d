//! Parsing options and configuration.

/// Options for reading page content.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// What to extract from each page
    pub extract_mode: ExtractMode,

    /// Decode image XObjects so they can be rasterized
    pub decode_images: bool,

    /// Maximum nesting of form XObjects followed by `Do`
    pub max_form_depth: u8,

    /// Images with more pixels than this are not decoded
    pub max_image_pixels: u64,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (unreadable pages come back empty).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Set extract mode.
    pub fn with_extract_mode(mut self, mode: ExtractMode) -> Self {
        self.extract_mode = mode;
        self
    }

    /// Extract text only.
    pub fn text_only(mut self) -> Self {
        self.extract_mode = ExtractMode::TextOnly;
        self
    }

    /// Enable or disable image decoding.
    pub fn with_images(mut self, decode: bool) -> Self {
        self.decode_images = decode;
        self
    }

    /// Set the form XObject nesting limit.
    pub fn with_max_form_depth(mut self, depth: u8) -> Self {
        self.max_form_depth = depth;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            extract_mode: ExtractMode::Full,
            decode_images: false,
            max_form_depth: 8,
            max_image_pixels: 25_000_000,
        }
    }
}

/// Error handling mode during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any error
    #[default]
    Strict,
    /// Skip invalid content and continue
    Lenient,
}

/// What content to extract from a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// Text, paths and images
    #[default]
    Full,
    /// Text spans only; paths and images are dropped
    TextOnly,
}
