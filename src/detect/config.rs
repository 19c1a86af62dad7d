//! Detection thresholds.
//!
//! Every number here is in page points unless the field name says pixels.

use super::lexicon::Lexicon;

/// Tolerances for classifying and deduplicating horizontal lines.
#[derive(Debug, Clone, PartialEq)]
pub struct LineTolerances {
    /// Maximum endpoint Y difference for a segment to count as horizontal
    pub horizontal_dy: f32,
    /// Minimum line length
    pub min_length: f32,
    /// Filled rectangles thinner than this are treated as drawn lines
    pub max_rect_height: f32,
    /// Lines closer than this vertically may be duplicates
    pub merge_dy: f32,
    /// Maximum endpoint X difference between duplicates
    pub merge_dx: f32,
}

impl Default for LineTolerances {
    fn default() -> Self {
        Self {
            horizontal_dy: 3.0,
            min_length: 30.0,
            max_rect_height: 3.0,
            merge_dy: 4.0,
            merge_dx: 10.0,
        }
    }
}

/// Raster line detection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterConfig {
    /// Working resolution
    pub dpi: f32,
    /// Cap on the longer side of the working image, in pixels
    pub max_side_px: u32,
    /// Side of the adaptive threshold window, in pixels (odd)
    pub threshold_window_px: u32,
    /// Offset subtracted from the local mean
    pub threshold_offset: i16,
    /// Canny lower hysteresis threshold
    pub canny_low: f32,
    /// Canny upper hysteresis threshold
    pub canny_high: f32,
    /// Minimum segment length, in pixels
    pub min_segment_px: u32,
    /// Largest gap bridged when joining runs, in pixels
    pub max_gap_px: u32,
    /// Runs on rows closer than this are joined into one segment
    pub max_dy_px: u32,
    /// Minimum length after conversion back to points
    pub min_length: f32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            dpi: 100.0,
            max_side_px: 2500,
            threshold_window_px: 11,
            threshold_offset: 2,
            canny_low: 50.0,
            canny_high: 150.0,
            min_segment_px: 50,
            max_gap_px: 10,
            max_dy_px: 5,
            min_length: 30.0,
        }
    }
}

/// Shape limits for label text.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelRules {
    /// Shortest label, in characters
    pub min_chars: usize,
    /// Longest text before a colon
    pub max_colon_chars: usize,
    /// Most words before a colon
    pub max_colon_words: usize,
    /// Longest standalone header label
    pub max_header_chars: usize,
    /// Most words in a standalone header label
    pub max_header_words: usize,
    /// Accepted font sizes for header labels without a keyword
    pub font_size_range: (f32, f32),
    /// Spans on one baseline further apart than this many ems start a new line
    pub split_gap_em: f32,
}

impl Default for LabelRules {
    fn default() -> Self {
        Self {
            min_chars: 2,
            max_colon_chars: 60,
            max_colon_words: 8,
            max_header_chars: 25,
            max_header_words: 4,
            font_size_range: (5.0, 14.0),
            split_gap_em: 2.5,
        }
    }
}

/// Label to line matching.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationRules {
    /// Same-row search: maximum distance from the label's vertical centre
    pub row_max_dy: f32,
    /// Same-row search: how far left of the label a line may start
    pub row_left_slack: f32,
    /// Same-row search: weight of the horizontal gap in the score
    pub row_gap_weight: f32,
    /// Below search: maximum drop under the label
    pub below_max_dy: f32,
    /// Below search: maximum horizontal gap
    pub below_max_dx: f32,
    /// Below search: weight of the horizontal gap in the score
    pub below_gap_weight: f32,
    /// Try same-row lines first and only look below when none match.
    /// When false both searches run and the lower score wins.
    pub prefer_same_row: bool,
    /// Height of a field placed on a line
    pub field_height: f32,
    /// Gap between a label and its estimated field
    pub fallback_gap: f32,
    /// Width of an estimated field
    pub fallback_width: f32,
}

impl Default for AssociationRules {
    fn default() -> Self {
        Self {
            row_max_dy: 25.0,
            row_left_slack: 10.0,
            row_gap_weight: 0.5,
            below_max_dy: 30.0,
            below_max_dx: 50.0,
            below_gap_weight: 0.3,
            prefer_same_row: true,
            field_height: 20.0,
            fallback_gap: 5.0,
            fallback_width: 150.0,
        }
    }
}

/// Configuration for [`DocumentAnalyzer`](super::DocumentAnalyzer).
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Line classification and merging
    pub lines: LineTolerances,
    /// Raster detection
    pub raster: RasterConfig,
    /// Label shape limits
    pub labels: LabelRules,
    /// Label to line matching
    pub association: AssociationRules,
    /// Locale word lists
    pub lexicon: Lexicon,
    /// Run the raster detector
    pub raster_enabled: bool,
    /// Rasterize pages on the rayon pool
    pub parallel: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            lines: LineTolerances::default(),
            raster: RasterConfig::default(),
            labels: LabelRules::default(),
            association: AssociationRules::default(),
            lexicon: Lexicon::default(),
            raster_enabled: true,
            parallel: true,
        }
    }
}

impl AnalyzerConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different lexicon.
    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = lexicon;
        self
    }

    /// Enable or disable the raster detector.
    pub fn with_raster(mut self, enabled: bool) -> Self {
        self.raster_enabled = enabled;
        self
    }

    /// Vector detection only.
    pub fn vector_only(self) -> Self {
        self.with_raster(false)
    }

    /// Process pages one at a time.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set line tolerances.
    pub fn with_line_tolerances(mut self, lines: LineTolerances) -> Self {
        self.lines = lines;
        self
    }

    /// Set raster settings.
    pub fn with_raster_config(mut self, raster: RasterConfig) -> Self {
        self.raster = raster;
        self
    }

    /// Set label rules.
    pub fn with_label_rules(mut self, labels: LabelRules) -> Self {
        self.labels = labels;
        self
    }

    /// Set association rules.
    pub fn with_association(mut self, association: AssociationRules) -> Self {
        self.association = association;
        self
    }
}
