//! Horizontal lines found in a rendered page.
//!
//! Catches rules that are not vector strokes: underscores typed as text,
//! scanned forms, lines baked into images.

use image::{GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::filter::box_filter;

use crate::error::Result;
use crate::geometry::RasterScale;
use crate::model::Line;
use crate::parser::PageContent;
use crate::render::PageRasterizer;

use super::config::RasterConfig;

/// Rasterize a page and find horizontal lines in it.
///
/// Best effort: any failure is logged and yields no lines.
pub fn detect_raster_lines(content: &PageContent, config: &RasterConfig) -> Vec<Line> {
    match try_detect_raster_lines(content, config) {
        Ok(lines) => {
            log::debug!(
                "Page {}: {} raster lines",
                content.page_index,
                lines.len()
            );
            lines
        }
        Err(e) => {
            log::warn!(
                "Raster line detection failed on page {}: {}",
                content.page_index,
                e
            );
            Vec::new()
        }
    }
}

fn try_detect_raster_lines(content: &PageContent, config: &RasterConfig) -> Result<Vec<Line>> {
    let scale = RasterScale::for_page(content.frame, config.dpi, config.max_side_px);
    let gray = PageRasterizer::new().render(content, &scale)?;
    Ok(detect_lines_in_image(&gray, &scale, config))
}

/// Find horizontal lines in a grayscale page image.
///
/// The image is binarized against its local mean (ink becomes white), edges
/// are traced with Canny, and long horizontal edge runs are collected. Each
/// segment is reported in page points.
pub fn detect_lines_in_image(gray: &GrayImage, scale: &RasterScale, config: &RasterConfig) -> Vec<Line> {
    let binary = adaptive_threshold(gray, config.threshold_window_px, config.threshold_offset);
    let edges = canny(&binary, config.canny_low, config.canny_high);

    horizontal_segments(&edges, config)
        .into_iter()
        .map(|s| {
            Line::new(
                scale.to_points(s.x0 as f32),
                scale.to_points(s.x1 as f32),
                scale.to_points(s.y()),
            )
        })
        .filter(|line| line.length() > config.min_length)
        .collect()
}

/// Inverted mean-adaptive threshold: pixels darker than the local mean by
/// more than `offset` become 255, everything else 0.
fn adaptive_threshold(gray: &GrayImage, window: u32, offset: i16) -> GrayImage {
    let radius = window / 2;
    let mean = box_filter(gray, radius, radius);
    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let threshold = mean.get_pixel(x, y).0[0] as i16 - offset;
        let value = if (pixel.0[0] as i16) <= threshold { 255 } else { 0 };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

/// A horizontal segment in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    x0: u32,
    x1: u32,
    y_sum: f32,
    rows: u32,
    last_row: u32,
}

impl Segment {
    fn y(&self) -> f32 {
        self.y_sum / self.rows as f32
    }
}

/// Runs of edge pixels along each row, bridging gaps of up to
/// `max_gap_px`. Runs on nearby rows that overlap are joined into one
/// segment at their mean row.
fn horizontal_segments(edges: &GrayImage, config: &RasterConfig) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();

    for y in 0..edges.height() {
        for (x0, x1) in row_runs(edges, y, config.max_gap_px) {
            if x1 - x0 + 1 < config.min_segment_px {
                continue;
            }
            let joined = segments.iter_mut().rev().find(|s| {
                y - s.last_row <= config.max_dy_px && x0 <= s.x1 && x1 >= s.x0
            });
            match joined {
                Some(s) => {
                    s.x0 = s.x0.min(x0);
                    s.x1 = s.x1.max(x1);
                    s.y_sum += y as f32;
                    s.rows += 1;
                    s.last_row = y;
                }
                None => segments.push(Segment {
                    x0,
                    x1,
                    y_sum: y as f32,
                    rows: 1,
                    last_row: y,
                }),
            }
        }
    }

    segments
}

/// Inclusive pixel ranges of edge runs in one row.
fn row_runs(edges: &GrayImage, y: u32, max_gap: u32) -> Vec<(u32, u32)> {
    let mut runs = Vec::new();
    let mut current: Option<(u32, u32)> = None;
    for x in 0..edges.width() {
        if edges.get_pixel(x, y).0[0] == 0 {
            continue;
        }
        current = match current {
            Some((start, end)) if x - end <= max_gap + 1 => Some((start, x)),
            Some(run) => {
                runs.push(run);
                Some((x, x))
            }
            None => Some((x, x)),
        };
    }
    runs.extend(current);
    runs
}
