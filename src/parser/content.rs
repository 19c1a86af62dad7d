//! Content-stream interpretation.
//!
//! Walks a page's operators with a small graphics-state machine and records
//! what a renderer would paint: positioned text, stroked/filled paths and
//! images. Every coordinate leaves this module in top-left page points; the
//! initial CTM performs the flip, so nothing downstream deals with PDF user
//! space.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::geometry::{PageFrame, Rect};

use super::document::{resolve, resolve_dict};
use super::fonts::FontMetrics;
use super::options::{ExtractMode, ParseOptions};
use super::text::{decode_text_string, TextSpan};

/// 2D affine transform `[a b c d e f]`, row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    /// Scale/rotate x
    pub a: f32,
    /// Shear/rotate x
    pub b: f32,
    /// Shear/rotate y
    pub c: f32,
    /// Scale/rotate y
    pub d: f32,
    /// X translation
    pub e: f32,
    /// Y translation
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    /// Identity transform.
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    /// Create a matrix.
    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Pure translation.
    pub const fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Maps PDF user space of a page into top-left page points.
    pub fn page_flip(media_box: [f32; 4]) -> Self {
        Self::new(1.0, 0.0, 0.0, -1.0, -media_box[0], media_box[3])
    }

    /// Apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Transform a point.
    pub fn apply(&self, x: f32, y: f32) -> Point {
        Point {
            x: x * self.a + y * self.c + self.e,
            y: x * self.b + y * self.d + self.f,
        }
    }

    /// Length of the transformed x unit vector.
    pub fn horizontal_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// Length of the transformed y unit vector.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    /// No rotation or shear.
    pub fn is_axis_aligned(&self) -> bool {
        self.b.abs() < 1e-6 && self.c.abs() < 1e-6
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let v: Vec<f32> = operands.iter().take(6).filter_map(get_number).collect();
        if v.len() < 6 {
            return None;
        }
        Some(Matrix::new(v[0], v[1], v[2], v[3], v[4], v[5]))
    }
}

/// A point in top-left page points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X
    pub x: f32,
    /// Y, growing downward
    pub y: f32,
}

impl Point {
    /// Create a point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One drawing primitive, mirroring the path operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathItem {
    /// Straight segment (`l`, `h`)
    Line(Point, Point),
    /// Cubic Bézier (`c`, `v`, `y`)
    Curve(Point, Point, Point, Point),
    /// Axis-aligned rectangle (`re`)
    Rect(Rect),
}

/// A painted path.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintedPath {
    /// Primitives in construction order
    pub items: Vec<PathItem>,
    /// Filled
    pub fill: bool,
    /// Stroked
    pub stroke: bool,
    /// Stroke width in page points
    pub line_width: f32,
    /// Fill luminance, 0 black to 1 white
    pub fill_gray: f32,
    /// Stroke luminance
    pub stroke_gray: f32,
}

impl PaintedPath {
    /// Bounding box of all primitives (curves by their control points).
    pub fn bbox(&self) -> Option<Rect> {
        self.items
            .iter()
            .map(|item| match item {
                PathItem::Line(a, b) => Rect::from_corners(a.x, a.y, b.x, b.y),
                PathItem::Curve(p0, p1, p2, p3) => {
                    let xs = [p0.x, p1.x, p2.x, p3.x];
                    let ys = [p0.y, p1.y, p2.y, p3.y];
                    Rect::from_corners(
                        xs.iter().copied().fold(f32::INFINITY, f32::min),
                        ys.iter().copied().fold(f32::INFINITY, f32::min),
                        xs.iter().copied().fold(f32::NEG_INFINITY, f32::max),
                        ys.iter().copied().fold(f32::NEG_INFINITY, f32::max),
                    )
                }
                PathItem::Rect(r) => *r,
            })
            .reduce(|a, b| a.union(&b))
    }
}

/// Decoded 8-bit grayscale image.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major luminance, `width * height` bytes
    pub luma: Vec<u8>,
}

/// An image painted on the page.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    /// Maps the image unit square into top-left page points
    pub transform: Matrix,
    /// Bounding box on the page
    pub bbox: Rect,
    /// Pixels, when decoding was requested and the format is supported
    pub image: Option<Arc<RasterImage>>,
}

/// Everything painted on one page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// Zero-based page index
    pub page_index: usize,
    /// Page size
    pub frame: PageFrame,
    /// Text runs
    pub spans: Vec<TextSpan>,
    /// Paths
    pub paths: Vec<PaintedPath>,
    /// Images
    pub images: Vec<PlacedImage>,
}

impl PageContent {
    /// Empty content for a page.
    pub fn empty(page_index: usize, frame: PageFrame) -> Self {
        Self {
            page_index,
            frame,
            ..Default::default()
        }
    }

    /// Every straight segment of every painted path.
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.paths.iter().flat_map(|p| {
            p.items.iter().filter_map(|item| match item {
                PathItem::Line(a, b) => Some((*a, *b)),
                _ => None,
            })
        })
    }

    /// Every rectangle of every painted path.
    pub fn rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.paths.iter().flat_map(|p| {
            p.items.iter().filter_map(|item| match item {
                PathItem::Rect(r) => Some(*r),
                _ => None,
            })
        })
    }
}

/// Font and XObject resources visible to a content stream.
struct Resources<'a> {
    fonts: BTreeMap<Vec<u8>, (&'a Dictionary, FontMetrics)>,
    xobjects: BTreeMap<Vec<u8>, ObjectId>,
}

impl<'a> Resources<'a> {
    fn from_dict(doc: &'a LopdfDocument, res: Option<&'a Dictionary>) -> Self {
        let mut fonts = BTreeMap::new();
        let mut xobjects = BTreeMap::new();

        if let Some(res) = res {
            if let Some(font_dict) = res.get(b"Font").ok().and_then(|o| resolve_dict(doc, o)) {
                for (name, obj) in font_dict.iter() {
                    if let Some(font) = resolve_dict(doc, obj) {
                        fonts.insert(name.clone(), (font, FontMetrics::from_font_dict(doc, font)));
                    }
                }
            }
            if let Some(xobj_dict) = res.get(b"XObject").ok().and_then(|o| resolve_dict(doc, o)) {
                for (name, obj) in xobj_dict.iter() {
                    if let Ok(id) = obj.as_reference() {
                        xobjects.insert(name.clone(), id);
                    }
                }
            }
        }

        Self { fonts, xobjects }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    line_width: f32,
    fill_gray: f32,
    stroke_gray: f32,
    font_key: Vec<u8>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    h_scale: f32,
    leading: f32,
    rise: f32,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            line_width: 1.0,
            fill_gray: 0.0,
            stroke_gray: 0.0,
            font_key: Vec::new(),
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

struct Interpreter<'a> {
    doc: &'a LopdfDocument,
    options: &'a ParseOptions,
    out: PageContent,
    gs: GraphicsState,
    stack: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
    path: Vec<PathItem>,
    current: Option<Point>,
    start: Option<Point>,
    default_metrics: FontMetrics,
    image_cache: HashMap<ObjectId, Option<Arc<RasterImage>>>,
}

/// Interpret the content of one page.
pub fn interpret_page(
    doc: &LopdfDocument,
    page_id: ObjectId,
    page_index: usize,
    media_box: [f32; 4],
    options: &ParseOptions,
) -> Result<PageContent> {
    let frame = PageFrame::from_media_box(media_box);
    let content = page_content_bytes(doc, page_id)?;
    let resources = Resources::from_dict(doc, page_resources(doc, page_id));

    let mut interpreter = Interpreter {
        doc,
        options,
        out: PageContent::empty(page_index, frame),
        gs: GraphicsState::new(Matrix::page_flip(media_box)),
        stack: Vec::new(),
        tm: Matrix::IDENTITY,
        tlm: Matrix::IDENTITY,
        path: Vec::new(),
        current: None,
        start: None,
        default_metrics: FontMetrics::default(),
        image_cache: HashMap::new(),
    };
    interpreter.run(&content, &resources, 0)?;

    log::debug!(
        "page {}: {} spans, {} paths, {} images",
        page_index,
        interpreter.out.spans.len(),
        interpreter.out.paths.len(),
        interpreter.out.images.len()
    );
    Ok(interpreter.out)
}

impl<'a> Interpreter<'a> {
    fn run(&mut self, content: &[u8], resources: &Resources<'a>, depth: u8) -> Result<()> {
        let content = Content::decode(content).map_err(|e| Error::PdfParse(e.to_string()))?;

        for op in &content.operations {
            self.execute(op, resources, depth);
        }
        Ok(())
    }

    fn execute(&mut self, op: &Operation, resources: &Resources<'a>, depth: u8) {
        let operands = &op.operands;
        let n = |i: usize| operands.get(i).and_then(get_number);

        match op.operator.as_str() {
            // Graphics state
            "q" => self.stack.push(self.gs.clone()),
            "Q" => {
                if let Some(gs) = self.stack.pop() {
                    self.gs = gs;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.gs.ctm = m.then(&self.gs.ctm);
                }
            }
            "w" => {
                if let Some(w) = n(0) {
                    self.gs.line_width = w;
                }
            }
            "g" => self.gs.fill_gray = n(0).unwrap_or(0.0),
            "G" => self.gs.stroke_gray = n(0).unwrap_or(0.0),
            "rg" => self.gs.fill_gray = rgb_luma(n(0), n(1), n(2)),
            "RG" => self.gs.stroke_gray = rgb_luma(n(0), n(1), n(2)),
            "k" => self.gs.fill_gray = cmyk_luma(n(0), n(1), n(2), n(3)),
            "K" => self.gs.stroke_gray = cmyk_luma(n(0), n(1), n(2), n(3)),

            // Path construction
            "m" => {
                if let (Some(x), Some(y)) = (n(0), n(1)) {
                    let p = self.gs.ctm.apply(x, y);
                    self.current = Some(p);
                    self.start = Some(p);
                }
            }
            "l" => {
                if let (Some(x), Some(y)) = (n(0), n(1)) {
                    let p = self.gs.ctm.apply(x, y);
                    if let Some(cur) = self.current {
                        self.path.push(PathItem::Line(cur, p));
                    }
                    self.current = Some(p);
                }
            }
            "c" | "v" | "y" => self.curve(op.operator.as_str(), operands),
            "h" => self.close_subpath(),
            "re" => {
                if let (Some(x), Some(y), Some(w), Some(h)) = (n(0), n(1), n(2), n(3)) {
                    self.rectangle(x, y, w, h);
                }
            }

            // Path painting
            "S" => self.paint(false, true),
            "s" => {
                self.close_subpath();
                self.paint(false, true);
            }
            "f" | "F" | "f*" => self.paint(true, false),
            "B" | "B*" => self.paint(true, true),
            "b" | "b*" => {
                self.close_subpath();
                self.paint(true, true);
            }
            "n" => self.discard_path(),

            // Text
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.gs.font_key = name.clone();
                }
                self.gs.font_size = n(1).unwrap_or(12.0);
            }
            "Tc" => self.gs.char_spacing = n(0).unwrap_or(0.0),
            "Tw" => self.gs.word_spacing = n(0).unwrap_or(0.0),
            "Tz" => self.gs.h_scale = n(0).unwrap_or(100.0) / 100.0,
            "TL" => self.gs.leading = n(0).unwrap_or(0.0),
            "Ts" => self.gs.rise = n(0).unwrap_or(0.0),
            "Td" => {
                if let (Some(tx), Some(ty)) = (n(0), n(1)) {
                    self.next_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (n(0), n(1)) {
                    self.gs.leading = -ty;
                    self.next_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(0.0, -self.gs.leading),
            "Tj" => {
                if let Some(s) = operands.first() {
                    self.show_text(std::slice::from_ref(s), resources);
                }
            }
            "TJ" => {
                if let Some(Object::Array(arr)) = operands.first() {
                    self.show_text(arr, resources);
                }
            }
            "'" => {
                self.next_line(0.0, -self.gs.leading);
                if let Some(s) = operands.first() {
                    self.show_text(std::slice::from_ref(s), resources);
                }
            }
            "\"" => {
                self.gs.word_spacing = n(0).unwrap_or(self.gs.word_spacing);
                self.gs.char_spacing = n(1).unwrap_or(self.gs.char_spacing);
                self.next_line(0.0, -self.gs.leading);
                if let Some(s) = operands.get(2) {
                    self.show_text(std::slice::from_ref(s), resources);
                }
            }

            // External objects
            "Do" => {
                if let Some(Object::Name(name)) = operands.first() {
                    if let Some(id) = resources.xobjects.get(name) {
                        self.paint_xobject(*id, resources, depth);
                    }
                }
            }
            _ => {}
        }
    }

    fn curve(&mut self, operator: &str, operands: &[Object]) {
        let v: Vec<f32> = operands.iter().filter_map(get_number).collect();
        let Some(cur) = self.current else {
            return;
        };
        let ctm = self.gs.ctm;
        let (p1, p2, p3) = match (operator, v.len()) {
            ("c", 6..) => (
                ctm.apply(v[0], v[1]),
                ctm.apply(v[2], v[3]),
                ctm.apply(v[4], v[5]),
            ),
            ("v", 4..) => (cur, ctm.apply(v[0], v[1]), ctm.apply(v[2], v[3])),
            ("y", 4..) => {
                let p3 = ctm.apply(v[2], v[3]);
                (ctm.apply(v[0], v[1]), p3, p3)
            }
            _ => return,
        };
        self.path.push(PathItem::Curve(cur, p1, p2, p3));
        self.current = Some(p3);
    }

    fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let ctm = self.gs.ctm;
        let p0 = ctm.apply(x, y);
        let p1 = ctm.apply(x + w, y);
        let p2 = ctm.apply(x + w, y + h);
        let p3 = ctm.apply(x, y + h);
        if ctm.is_axis_aligned() {
            self.path
                .push(PathItem::Rect(Rect::from_corners(p0.x, p0.y, p2.x, p2.y)));
        } else {
            self.path.push(PathItem::Line(p0, p1));
            self.path.push(PathItem::Line(p1, p2));
            self.path.push(PathItem::Line(p2, p3));
            self.path.push(PathItem::Line(p3, p0));
        }
        self.current = Some(p0);
        self.start = Some(p0);
    }

    fn close_subpath(&mut self) {
        if let (Some(cur), Some(start)) = (self.current, self.start) {
            if cur != start {
                self.path.push(PathItem::Line(cur, start));
            }
            self.current = Some(start);
        }
    }

    fn paint(&mut self, fill: bool, stroke: bool) {
        if !self.path.is_empty() && self.options.extract_mode == ExtractMode::Full {
            let ctm = &self.gs.ctm;
            let det = (ctm.a * ctm.d - ctm.b * ctm.c).abs().sqrt();
            self.out.paths.push(PaintedPath {
                items: std::mem::take(&mut self.path),
                fill,
                stroke,
                line_width: (self.gs.line_width * det).max(0.0),
                fill_gray: self.gs.fill_gray,
                stroke_gray: self.gs.stroke_gray,
            });
        }
        self.discard_path();
    }

    fn discard_path(&mut self) {
        self.path.clear();
        self.current = None;
        self.start = None;
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translate(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn show_text(&mut self, parts: &[Object], resources: &Resources<'a>) {
        let (font_dict, metrics) = match resources.fonts.get(&self.gs.font_key) {
            Some((dict, metrics)) => (Some(*dict), metrics),
            None => (None, &self.default_metrics),
        };
        let encoding = font_dict.and_then(|f| f.get_font_encoding(self.doc).ok());

        let gs = &self.gs;
        let mut text = String::new();
        let mut advance = 0.0f32;

        for part in parts {
            match part {
                Object::String(bytes, _) => {
                    let decoded = match encoding {
                        Some(ref enc) => LopdfDocument::decode_text(enc, bytes)
                            .unwrap_or_else(|_| decode_text_string(bytes)),
                        None => decode_text_string(bytes),
                    };
                    text.push_str(&decoded);

                    for code in metrics.codes(bytes) {
                        let mut w =
                            metrics.code_width(code) / 1000.0 * gs.font_size + gs.char_spacing;
                        if code == 32 && !metrics.two_byte {
                            w += gs.word_spacing;
                        }
                        advance += w * gs.h_scale;
                    }
                }
                Object::Integer(_) | Object::Real(_) => {
                    // Negative adjustments move right; large ones are word gaps
                    let adjustment = -get_number(part).unwrap_or(0.0);
                    advance += adjustment / 1000.0 * gs.font_size * gs.h_scale;
                    if adjustment > 200.0
                        && !text.is_empty()
                        && !text.ends_with(' ')
                        && !text.ends_with('\u{00A0}')
                    {
                        if let Some(c) = text.chars().last() {
                            if !is_spaceless_script_char(c) {
                                text.push(' ');
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        let trm = self.tm.then(&gs.ctm);
        let origin = trm.apply(0.0, gs.rise);
        let width = (advance * trm.horizontal_scale()).abs();
        let font_size = (gs.font_size * trm.vertical_scale()).abs();
        let font_name = metrics.base_font.clone();

        if !text.trim().is_empty() {
            self.out.spans.push(
                TextSpan::new(text, origin.x, origin.y, width, font_size).with_font(font_name),
            );
        }

        self.tm = Matrix::translate(advance, 0.0).then(&self.tm);
    }

    fn paint_xobject(&mut self, id: ObjectId, resources: &Resources<'a>, depth: u8) {
        let doc = self.doc;
        let Ok(Object::Stream(stream)) = doc.get_object(id) else {
            return;
        };
        let subtype = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .unwrap_or(b"");

        match subtype {
            b"Image" if self.options.extract_mode == ExtractMode::Full => {
                self.place_image(id, stream)
            }
            b"Form" => {
                if depth >= self.options.max_form_depth {
                    log::debug!("form XObject {:?} skipped: nesting limit", id);
                    return;
                }
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|o| resolve(doc, o).as_array().ok())
                    .and_then(|arr| Matrix::from_operands(arr))
                    .unwrap_or(Matrix::IDENTITY);
                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());

                let own = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve_dict(doc, o));
                let form_resources = own.map(|res| Resources::from_dict(doc, Some(res)));

                let saved = (self.gs.clone(), self.stack.len(), self.tm, self.tlm);
                self.gs.ctm = matrix.then(&self.gs.ctm);
                let result = match form_resources {
                    Some(ref res) => self.run(&data, res, depth + 1),
                    None => self.run(&data, resources, depth + 1),
                };
                if let Err(e) = result {
                    log::debug!("form XObject {:?} skipped: {}", id, e);
                }
                self.gs = saved.0;
                self.stack.truncate(saved.1);
                self.tm = saved.2;
                self.tlm = saved.3;
            }
            _ => {}
        }
    }

    fn place_image(&mut self, id: ObjectId, stream: &Stream) {
        let ctm = self.gs.ctm;
        let corners = [
            ctm.apply(0.0, 0.0),
            ctm.apply(1.0, 0.0),
            ctm.apply(0.0, 1.0),
            ctm.apply(1.0, 1.0),
        ];
        let (mut x0, mut y0, mut x1, mut y1) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for p in corners {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }

        let image = if self.options.decode_images {
            let doc = self.doc;
            let max_pixels = self.options.max_image_pixels;
            self.image_cache
                .entry(id)
                .or_insert_with(|| decode_image(doc, stream, max_pixels).map(Arc::new))
                .clone()
        } else {
            None
        };

        self.out.images.push(PlacedImage {
            transform: ctm,
            bbox: Rect::from_corners(x0, y0, x1, y1),
            image,
        });
    }
}

/// Decode an image XObject to grayscale.
///
/// Supports JPEG and 8-bit raw gray/RGB/CMYK samples; anything else
/// (masks, indexed colour, JBIG2, JPX) yields `None`.
fn decode_image(doc: &LopdfDocument, stream: &Stream, max_pixels: u64) -> Option<RasterImage> {
    let dict = &stream.dict;
    if matches!(dict.get(b"ImageMask").and_then(|o| o.as_bool()), Ok(true)) {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
    if width == 0 || height == 0 || (width as u64) * (height as u64) > max_pixels {
        return None;
    }

    let filter = dict.get(b"Filter").ok().and_then(|f| match f {
        Object::Name(n) => Some(n.clone()),
        Object::Array(arr) => arr.last().and_then(|o| o.as_name().ok()).map(|n| n.to_vec()),
        _ => None,
    });

    if filter.as_deref() == Some(b"DCTDecode".as_slice()) {
        let decoded =
            image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg).ok()?;
        let gray = decoded.to_luma8();
        return Some(RasterImage {
            width: gray.width(),
            height: gray.height(),
            luma: gray.into_raw(),
        });
    }

    let bpc = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bpc != 8 {
        return None;
    }

    let components = match dict.get(b"ColorSpace").map(|o| resolve(doc, o)) {
        Ok(Object::Name(name)) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" => 1,
            b"DeviceRGB" | b"CalRGB" => 3,
            b"DeviceCMYK" => 4,
            _ => return None,
        },
        Ok(Object::Array(arr)) => match arr.first().and_then(|o| o.as_name().ok()) {
            Some(b"ICCBased") => arr
                .get(1)
                .and_then(|o| o.as_reference().ok())
                .and_then(|id| doc.get_object(id).ok())
                .and_then(|o| o.as_stream().ok())
                .and_then(|s| s.dict.get(b"N").ok())
                .and_then(|n| n.as_i64().ok())
                .unwrap_or(3) as usize,
            Some(b"CalRGB") => 3,
            Some(b"CalGray") => 1,
            _ => return None,
        },
        _ => 1,
    };

    let data = if filter.is_some() {
        stream.decompressed_content().ok()?
    } else {
        stream.content.clone()
    };
    let pixels = width as usize * height as usize;
    if data.len() < pixels * components {
        return None;
    }

    let luma = data
        .chunks_exact(components)
        .take(pixels)
        .map(|px| match components {
            1 => px[0],
            3 => (rgb_luma(
                Some(px[0] as f32 / 255.0),
                Some(px[1] as f32 / 255.0),
                Some(px[2] as f32 / 255.0),
            ) * 255.0) as u8,
            4 => (cmyk_luma(
                Some(px[0] as f32 / 255.0),
                Some(px[1] as f32 / 255.0),
                Some(px[2] as f32 / 255.0),
                Some(px[3] as f32 / 255.0),
            ) * 255.0) as u8,
            _ => px[0],
        })
        .collect();

    Some(RasterImage {
        width,
        height,
        luma,
    })
}

/// Resources of a page, inherited through `/Parent` when absent.
fn page_resources(doc: &LopdfDocument, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..32 {
        if let Ok(res) = current.get(b"Resources") {
            return resolve_dict(doc, res);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Concatenated, decompressed page content.
fn page_content_bytes(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<u8>> {
    let page_dict = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::PdfParse(e.to_string()))?;

    let Ok(contents) = page_dict.get(b"Contents") else {
        // A page without content is blank, not broken
        return Ok(Vec::new());
    };

    let stream_bytes = |obj: &Object| -> Option<Vec<u8>> {
        match resolve(doc, obj) {
            Object::Stream(s) => Some(
                s.decompressed_content()
                    .unwrap_or_else(|_| s.content.clone()),
            ),
            _ => None,
        }
    };

    match resolve(doc, contents) {
        Object::Array(arr) => {
            let mut content = Vec::new();
            for obj in arr {
                if let Some(data) = stream_bytes(obj) {
                    content.extend_from_slice(&data);
                    content.push(b' ');
                }
            }
            Ok(content)
        }
        Object::Stream(_) => stream_bytes(contents)
            .ok_or_else(|| Error::PdfParse("Invalid content stream".to_string())),
        _ => Err(Error::PdfParse("Invalid content stream".to_string())),
    }
}

/// Helper to extract number from PDF object.
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn rgb_luma(r: Option<f32>, g: Option<f32>, b: Option<f32>) -> f32 {
    let (r, g, b) = (r.unwrap_or(0.0), g.unwrap_or(0.0), b.unwrap_or(0.0));
    (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 1.0)
}

fn cmyk_luma(c: Option<f32>, m: Option<f32>, y: Option<f32>, k: Option<f32>) -> f32 {
    let k = k.unwrap_or(0.0);
    let r = (1.0 - c.unwrap_or(0.0)) * (1.0 - k);
    let g = (1.0 - m.unwrap_or(0.0)) * (1.0 - k);
    let b = (1.0 - y.unwrap_or(0.0)) * (1.0 - k);
    rgb_luma(Some(r), Some(g), Some(b))
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and Extension A
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn doc_with_page(ops: &str) -> (LopdfDocument, ObjectId) {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content_id = doc.add_object(Stream::new(dictionary! {}, ops.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        (doc, page_id)
    }

    fn run(ops: &str) -> PageContent {
        let (doc, page_id) = doc_with_page(ops);
        interpret_page(
            &doc,
            page_id,
            0,
            [0.0, 0.0, 612.0, 792.0],
            &ParseOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_matrix_then() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translate(10.0, 5.0);
        let p = scale.then(&shift).apply(1.0, 1.0);
        assert_eq!(p, Point::new(12.0, 7.0));
        let p = shift.then(&scale).apply(1.0, 1.0);
        assert_eq!(p, Point::new(22.0, 12.0));
    }

    #[test]
    fn test_text_is_flipped_to_top_left() {
        let content = run("BT /F1 10 Tf 50 692 Td (Nombre:) Tj ET");
        assert_eq!(content.spans.len(), 1);
        let span = &content.spans[0];
        assert_eq!(span.text, "Nombre:");
        assert_eq!(span.x, 50.0);
        assert_eq!(span.y, 100.0);
        assert_eq!(span.font_size, 10.0);
        // 7 glyphs at the 500/1000 fallback width
        assert!((span.width - 35.0).abs() < 1e-3);
        assert_eq!(span.font_name, "Helvetica");
    }

    #[test]
    fn test_text_advances_between_shows() {
        let content = run("BT /F1 10 Tf 50 700 Td (AB) Tj (CD) Tj ET");
        assert_eq!(content.spans.len(), 2);
        assert!((content.spans[1].x - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_line_and_rect_paths() {
        let content = run("q 1 w 130 686 m 300 686 l S 50 500 200 1 re f Q");
        let segments: Vec<_> = content.segments().collect();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].0, Point::new(130.0, 106.0));
        assert_eq!(segments[0].1, Point::new(300.0, 106.0));

        let rects: Vec<_> = content.rects().collect();
        assert_eq!(rects.len(), 1);
        assert_eq!(rects[0], Rect::new(50.0, 291.0, 200.0, 1.0));
        assert!(content.paths[1].fill);
    }

    #[test]
    fn test_cm_applies_to_paths() {
        let content = run("q 1 0 0 1 100 0 cm 0 692 m 50 692 l S Q 0 0 m 10 0 l S");
        let segments: Vec<_> = content.segments().collect();
        assert_eq!(segments[0].0, Point::new(100.0, 100.0));
        // Restored after Q
        assert_eq!(segments[1].0, Point::new(0.0, 792.0));
    }

    #[test]
    fn test_unpainted_path_is_dropped() {
        let content = run("0 0 m 100 0 l W n");
        assert!(content.paths.is_empty());
    }

    #[test]
    fn test_missing_contents_is_blank() {
        let mut doc = LopdfDocument::with_version("1.5");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });
        let content = interpret_page(
            &doc,
            page_id,
            0,
            [0.0, 0.0, 612.0, 792.0],
            &ParseOptions::default(),
        )
        .unwrap();
        assert!(content.spans.is_empty());
        assert!(content.paths.is_empty());
    }

    #[test]
    fn test_text_only_skips_paths() {
        let (doc, page_id) = doc_with_page("0 0 m 100 0 l S BT /F1 10 Tf (Hola) Tj ET");
        let options = ParseOptions::new().text_only();
        let content =
            interpret_page(&doc, page_id, 0, [0.0, 0.0, 612.0, 792.0], &options).unwrap();
        assert!(content.paths.is_empty());
        assert_eq!(content.spans.len(), 1);
    }

    #[test]
    fn test_luma() {
        assert_eq!(rgb_luma(Some(1.0), Some(1.0), Some(1.0)), 1.0);
        assert_eq!(cmyk_luma(Some(0.0), Some(0.0), Some(0.0), Some(1.0)), 0.0);
    }
}
