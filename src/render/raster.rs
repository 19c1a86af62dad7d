//! Rasterization of interpreted page content with tiny-skia.

use image::GrayImage;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform};

use crate::error::{Error, Result};
use crate::geometry::RasterScale;
use crate::parser::{Matrix, PaintedPath, PathItem, PageContent, RasterImage, TextSpan};

/// Shortest underscore run drawn as a rule.
const MIN_UNDERSCORE_RUN: usize = 3;

/// Options for page rasterization.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// Paint decoded images
    pub draw_images: bool,
    /// Paint runs of `_` in text as rules, the way they show on paper
    pub draw_underscores: bool,
    /// Anti-aliasing
    pub anti_alias: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            draw_images: true,
            draw_underscores: true,
            anti_alias: true,
        }
    }
}

/// Renders [`PageContent`] to a grayscale bitmap.
///
/// Glyph shapes are not drawn; the raster is meant for finding rules and
/// boxes, and for previews of form layouts.
#[derive(Debug, Clone, Default)]
pub struct PageRasterizer {
    options: RasterOptions,
}

impl PageRasterizer {
    /// Create a rasterizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rasterizer with custom options.
    pub fn with_options(options: RasterOptions) -> Self {
        Self { options }
    }

    /// Render a page at the given scale.
    pub fn render(&self, content: &PageContent, scale: &RasterScale) -> Result<GrayImage> {
        let mut pixmap = Pixmap::new(scale.width_px, scale.height_px).ok_or_else(|| {
            Error::Raster(format!(
                "Failed to create pixmap {}x{}",
                scale.width_px, scale.height_px
            ))
        })?;
        pixmap.fill(tiny_skia::Color::WHITE);

        let ppp = scale.pixels_per_point;
        let transform = Transform::from_scale(ppp, ppp);
        let hairline = 1.0 / ppp;

        if self.options.draw_images {
            for placed in &content.images {
                if let Some(image) = &placed.image {
                    self.draw_image(&mut pixmap, image, &placed.transform, transform);
                }
            }
        }

        for path in &content.paths {
            self.draw_path(&mut pixmap, path, transform, hairline);
        }

        if self.options.draw_underscores {
            for span in &content.spans {
                self.draw_underscores(&mut pixmap, span, transform, hairline);
            }
        }

        Ok(to_gray(&pixmap))
    }

    fn paint(&self, gray: f32) -> Paint<'static> {
        let level = (gray.clamp(0.0, 1.0) * 255.0).round() as u8;
        let mut paint = Paint::default();
        paint.set_color_rgba8(level, level, level, 255);
        paint.anti_alias = self.options.anti_alias;
        paint
    }

    fn draw_path(&self, pixmap: &mut Pixmap, path: &PaintedPath, transform: Transform, hairline: f32) {
        let mut builder = PathBuilder::new();
        let mut last = None;
        for item in &path.items {
            match item {
                PathItem::Line(a, b) => {
                    if last != Some(*a) {
                        builder.move_to(a.x, a.y);
                    }
                    builder.line_to(b.x, b.y);
                    last = Some(*b);
                }
                PathItem::Curve(p0, p1, p2, p3) => {
                    if last != Some(*p0) {
                        builder.move_to(p0.x, p0.y);
                    }
                    builder.cubic_to(p1.x, p1.y, p2.x, p2.y, p3.x, p3.y);
                    last = Some(*p3);
                }
                PathItem::Rect(r) => {
                    // Zero-height bars still need to show up as a stroke
                    let h = r.h.max(hairline);
                    let w = r.w.max(hairline);
                    if let Some(rect) = tiny_skia::Rect::from_xywh(r.x, r.y, w, h) {
                        builder.push_rect(rect);
                    }
                    last = None;
                }
            }
        }
        let Some(skia_path) = builder.finish() else {
            return;
        };

        if path.fill {
            pixmap.fill_path(
                &skia_path,
                &self.paint(path.fill_gray),
                FillRule::Winding,
                transform,
                None,
            );
        }
        if path.stroke {
            let stroke = Stroke {
                width: path.line_width.max(hairline),
                ..Stroke::default()
            };
            pixmap.stroke_path(
                &skia_path,
                &self.paint(path.stroke_gray),
                &stroke,
                transform,
                None,
            );
        }
    }

    fn draw_underscores(&self, pixmap: &mut Pixmap, span: &TextSpan, transform: Transform, hairline: f32) {
        let chars: Vec<char> = span.text.chars().collect();
        if chars.is_empty() || !chars.contains(&'_') {
            return;
        }
        let advance = span.width / chars.len() as f32;
        let y = span.y + span.font_size * 0.1;
        let stroke = Stroke {
            width: (span.font_size * 0.06).max(hairline),
            ..Stroke::default()
        };
        let paint = self.paint(0.0);

        let mut i = 0;
        while i < chars.len() {
            if chars[i] != '_' {
                i += 1;
                continue;
            }
            let start = i;
            while i < chars.len() && chars[i] == '_' {
                i += 1;
            }
            if i - start < MIN_UNDERSCORE_RUN {
                continue;
            }
            let x0 = span.x + start as f32 * advance;
            let x1 = span.x + i as f32 * advance;
            let mut builder = PathBuilder::new();
            builder.move_to(x0, y);
            builder.line_to(x1, y);
            if let Some(path) = builder.finish() {
                pixmap.stroke_path(&path, &paint, &stroke, transform, None);
            }
        }
    }

    fn draw_image(&self, pixmap: &mut Pixmap, image: &RasterImage, placement: &Matrix, transform: Transform) {
        let Some(size) = tiny_skia::IntSize::from_wh(image.width, image.height) else {
            return;
        };
        let rgba: Vec<u8> = image
            .luma
            .iter()
            .flat_map(|&l| [l, l, l, 255])
            .collect();
        let Some(source) = Pixmap::from_vec(rgba, size) else {
            return;
        };

        // Image rows run top to bottom; the unit square's y axis runs up.
        let unit = Transform::from_row(
            1.0 / image.width as f32,
            0.0,
            0.0,
            -1.0 / image.height as f32,
            0.0,
            1.0,
        );
        let placed = Transform::from_row(
            placement.a,
            placement.b,
            placement.c,
            placement.d,
            placement.e,
            placement.f,
        );
        let full = unit.post_concat(placed).post_concat(transform);
        pixmap.draw_pixmap(0, 0, source.as_ref(), &PixmapPaint::default(), full, None);
    }
}

/// Convert an opaque RGBA pixmap to 8-bit luminance.
fn to_gray(pixmap: &Pixmap) -> GrayImage {
    let luma: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .map(|px| {
            let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
            ((299 * r + 587 * g + 114 * b) / 1000) as u8
        })
        .collect();
    GrayImage::from_raw(pixmap.width(), pixmap.height(), luma)
        .unwrap_or_else(|| GrayImage::new(pixmap.width(), pixmap.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{PageFrame, Rect};
    use crate::parser::Point;

    fn stroked(items: Vec<PathItem>) -> PaintedPath {
        PaintedPath {
            items,
            fill: false,
            stroke: true,
            line_width: 1.0,
            fill_gray: 0.0,
            stroke_gray: 0.0,
        }
    }

    #[test]
    fn test_blank_page_is_white() {
        let content = PageContent::empty(0, PageFrame::new(72.0, 72.0));
        let scale = RasterScale::for_page(content.frame, 72.0, 0);
        let image = PageRasterizer::new().render(&content, &scale).unwrap();
        assert_eq!(image.dimensions(), (72, 72));
        assert!(image.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_stroked_line_is_dark() {
        let mut content = PageContent::empty(0, PageFrame::new(200.0, 100.0));
        content.paths.push(stroked(vec![PathItem::Line(
            Point::new(20.0, 50.0),
            Point::new(180.0, 50.0),
        )]));
        let scale = RasterScale::for_page(content.frame, 144.0, 0);
        let image = PageRasterizer::new().render(&content, &scale).unwrap();
        assert_eq!(image.dimensions(), (400, 200));
        assert!(image.get_pixel(200, 100).0[0] < 128);
        assert_eq!(image.get_pixel(200, 20).0[0], 255);
    }

    #[test]
    fn test_filled_rect() {
        let mut content = PageContent::empty(0, PageFrame::new(100.0, 100.0));
        content.paths.push(PaintedPath {
            fill: true,
            stroke: false,
            ..stroked(vec![PathItem::Rect(Rect::new(10.0, 10.0, 50.0, 50.0))])
        });
        let scale = RasterScale::for_page(content.frame, 72.0, 0);
        let image = PageRasterizer::new().render(&content, &scale).unwrap();
        assert_eq!(image.get_pixel(30, 30).0[0], 0);
        assert_eq!(image.get_pixel(80, 80).0[0], 255);
    }

    #[test]
    fn test_underscore_run_is_drawn() {
        let mut content = PageContent::empty(0, PageFrame::new(300.0, 100.0));
        content
            .spans
            .push(TextSpan::new("Nombre ______________", 20.0, 50.0, 210.0, 10.0));
        let scale = RasterScale::for_page(content.frame, 72.0, 0);

        let darkest = |image: &GrayImage| (48..54).map(|y| image.get_pixel(200, y).0[0]).min();
        let image = PageRasterizer::new().render(&content, &scale).unwrap();
        assert!(darkest(&image).unwrap() < 200);
        // The label part of the span stays blank
        assert_eq!(image.get_pixel(40, 51).0[0], 255);

        let plain = PageRasterizer::with_options(RasterOptions {
            draw_underscores: false,
            ..Default::default()
        })
        .render(&content, &scale)
        .unwrap();
        assert_eq!(darkest(&plain), Some(255));
    }
}
