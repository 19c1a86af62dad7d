//! Placement engine: where labels, outlines and widgets go on each page.
//!
//! Everything here is in top-left page points. The writer flips to PDF
//! content space when it emits operators and widget rectangles.

use crate::error::{Error, Result};
use crate::geometry::{PageFrame, Rect};
use crate::model::{
    split_date, AbsolutePosition, Alignment, Column, DateParts, DetectedField, FieldKind, Rgb,
    Validation, VisibilityRule,
};
use crate::parser::{encode_win_ansi, FontMetrics};

use super::options::ComposeOptions;

/// Left and right margin of flowing content.
pub const MARGIN_X: f32 = 50.0;
/// Title baseline, from the top of the page.
pub const TITLE_BASELINE: f32 = 70.0;
/// Flowing cursor on a fresh page.
pub const FLOW_START: f32 = 140.0;
/// A flowing field starts a new page once the cursor passes
/// `height - FIELD_BREAK_MARGIN`.
pub const FIELD_BREAK_MARGIN: f32 = 120.0;
/// Same, for section headings.
pub const SECTION_BREAK_MARGIN: f32 = 180.0;
/// Gap between the two half-width columns.
pub const COLUMN_GUTTER: f32 = 10.0;
/// Absolute fields may not open pages past this count.
pub const MAX_PAGES: usize = 1000;

const FIELD_HEIGHT: f32 = 20.0;
const MULTILINE_HEIGHT: f32 = 60.0;
const SIGNATURE_HEIGHT: f32 = 45.0;
const CHECKBOX_SIZE: f32 = 18.0;
const RADIO_SIZE: f32 = 14.0;
const RADIO_STEP: f32 = 25.0;
const SECTION_ADVANCE: f32 = 45.0;
const LOGO_MAX: (f32, f32) = (180.0, 100.0);

/// Image placed by a [`Mark::Image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    /// The header logo
    Logo,
    /// Index into [`ComposeOptions::extra_images`]
    Extra(usize),
}

/// Something painted on a page.
#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    /// Text; `y` is the baseline
    Text {
        x: f32,
        y: f32,
        text: String,
        size: f32,
        bold: bool,
        color: Rgb,
    },
    /// Straight stroke
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        dashed: bool,
        color: Rgb,
    },
    /// Stroked rectangle
    Rect { rect: Rect, width: f32, color: Rgb },
    /// Image scaled into `rect`
    Image { slot: ImageSlot, rect: Rect },
}

/// Interactive part of a widget.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetKind {
    /// Text entry
    Text {
        value: String,
        multiline: bool,
        validation: Validation,
    },
    /// Combo box
    Choice {
        options: Vec<String>,
        value: Option<String>,
    },
    /// Boolean toggle
    Checkbox { checked: bool },
    /// Radio group; one kid widget per option
    Radio {
        options: Vec<String>,
        selected: Option<usize>,
        kids: Vec<Rect>,
    },
    /// Signature area
    Signature,
}

/// A form field ready to be written as an AcroForm widget.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSpec {
    /// Fully qualified field name
    pub name: String,
    /// Index of the source field in the input list
    pub field_index: usize,
    /// Page the widget sits on
    pub page_index: usize,
    /// Widget rectangle; the union of the kids for radio groups
    pub rect: Rect,
    /// Required flag
    pub required: bool,
    /// Maximum text length
    pub max_len: Option<u32>,
    /// Conditional visibility
    pub visibility: Option<VisibilityRule>,
    /// Type-specific part
    pub kind: WidgetKind,
}

impl WidgetSpec {
    fn new(
        name: String,
        field: &DetectedField,
        field_index: usize,
        page_index: usize,
        rect: Rect,
        kind: WidgetKind,
    ) -> Self {
        Self {
            name,
            field_index,
            page_index,
            rect,
            required: field.required,
            max_len: None,
            visibility: field.visibility.clone(),
            kind,
        }
    }
}

/// Marks painted on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    /// In paint order
    pub marks: Vec<Mark>,
}

impl PageLayout {
    fn text(&mut self, x: f32, y: f32, text: impl Into<String>, size: f32, bold: bool, color: Rgb) {
        self.marks.push(Mark::Text {
            x,
            y,
            text: text.into(),
            size,
            bold,
            color,
        });
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), dashed: bool, color: Rgb) {
        self.marks.push(Mark::Line {
            from,
            to,
            width: 1.0,
            dashed,
            color,
        });
    }

    fn rect(&mut self, rect: Rect, color: Rgb) {
        self.marks.push(Mark::Rect {
            rect,
            width: 1.0,
            color,
        });
    }

    /// Text marks, in paint order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.marks.iter().filter_map(|m| match m {
            Mark::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Result of laying out a field list.
#[derive(Debug, Clone, PartialEq)]
pub struct FormLayout {
    /// Size shared by every page
    pub frame: PageFrame,
    /// Pages in order
    pub pages: Vec<PageLayout>,
    /// Widgets in field order
    pub widgets: Vec<WidgetSpec>,
}

impl FormLayout {
    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Widgets on one page.
    pub fn widgets_on(&self, page_index: usize) -> impl Iterator<Item = &WidgetSpec> {
        self.widgets
            .iter()
            .filter(move |w| w.page_index == page_index)
    }
}

/// Lays out fields over fresh pages.
///
/// Flowing fields stack down the page from a cursor, in full width or in
/// one of two columns, and move to a new page when they run out of room.
/// Absolute fields go exactly where their position says; a position on a
/// later page makes the intervening pages exist first. Every page gets the
/// header (logo and title).
#[derive(Debug, Clone)]
pub struct LayoutEngine<'a> {
    options: &'a ComposeOptions,
    frame: PageFrame,
    logo_size: Option<(u32, u32)>,
}

struct Flow {
    page: usize,
    cursor: f32,
}

impl<'a> LayoutEngine<'a> {
    /// Create an engine for pages of `frame`.
    pub fn new(options: &'a ComposeOptions, frame: PageFrame) -> Self {
        Self {
            options,
            frame,
            logo_size: None,
        }
    }

    /// Pixel size of the logo image, needed to keep its aspect ratio. The
    /// logo is only drawn when this is known.
    pub fn with_logo_size(mut self, width: u32, height: u32) -> Self {
        if width > 0 && height > 0 {
            self.logo_size = Some((width, height));
        }
        self
    }

    /// Lay out `fields` in order.
    pub fn layout(&self, fields: &[DetectedField]) -> Result<FormLayout> {
        if !(self.frame.width > 2.0 * MARGIN_X && self.frame.height > 0.0) {
            return Err(Error::Layout(format!(
                "page {}x{} is too small",
                self.frame.width, self.frame.height
            )));
        }

        let mut out = FormLayout {
            frame: self.frame,
            pages: Vec::new(),
            widgets: Vec::new(),
        };
        self.ensure_page(&mut out, 0);
        for (i, image) in self.options.extra_images.iter().enumerate() {
            out.pages[0].marks.push(Mark::Image {
                slot: ImageSlot::Extra(i),
                rect: Rect::new(image.x, image.y, image.w, image.h),
            });
        }

        let mut flow = Flow {
            page: 0,
            cursor: FLOW_START,
        };
        for (index, field) in fields.iter().enumerate() {
            match field.absolute_position {
                Some(pos) => {
                    self.place_absolute(&mut out, index, field, pos)?;
                    if pos.page_index > flow.page {
                        flow.page = pos.page_index;
                        flow.cursor = FLOW_START;
                    }
                }
                None => self.place_flowing(&mut out, index, field, &mut flow),
            }
        }

        log::debug!(
            "Laid out {} fields as {} widgets on {} pages",
            fields.len(),
            out.widgets.len(),
            out.pages.len()
        );
        Ok(out)
    }

    fn ensure_page(&self, out: &mut FormLayout, index: usize) {
        while out.pages.len() <= index {
            let mut page = PageLayout::default();
            self.draw_header(&mut page, out.pages.len());
            out.pages.push(page);
        }
    }

    fn draw_header(&self, page: &mut PageLayout, page_index: usize) {
        let visual = &self.options.visual;
        if let Some((w, h)) = self.logo_size {
            let aspect = h as f32 / w as f32;
            let mut width = LOGO_MAX.0.min(w as f32);
            let mut height = width * aspect;
            if height > LOGO_MAX.1 {
                height = LOGO_MAX.1;
                width = height / aspect;
            }
            page.marks.push(Mark::Image {
                slot: ImageSlot::Logo,
                rect: Rect::new(visual.logo_position.x, visual.logo_position.y, width, height),
            });
        }

        let title = if page_index == 0 {
            self.options.title.clone()
        } else {
            format!("{} (Cont.)", self.options.title)
        };
        let size = visual.font_size_title;
        let width = FontMetrics::standard(&visual.bold_font()).text_width(&encode_win_ansi(&title), size);
        let x = match visual.alignment {
            Alignment::Left => MARGIN_X,
            Alignment::Center => (self.frame.width - width) / 2.0,
            Alignment::Right => self.frame.width - MARGIN_X - width,
        };
        page.text(x, TITLE_BASELINE, title, size, true, visual.primary_rgb());
    }

    fn place_flowing(&self, out: &mut FormLayout, index: usize, field: &DetectedField, flow: &mut Flow) {
        let visual = &self.options.visual;
        let height = self.frame.height;

        if field.kind == FieldKind::Section {
            if flow.cursor > height - SECTION_BREAK_MARGIN {
                self.next_page(out, flow);
            }
            if field.column == Column::Left {
                flow.cursor += visual.spacing;
            }
            let base = flow.cursor + 20.0;
            self.draw_section(&mut out.pages[flow.page], MARGIN_X, base, &field.label);
            flow.cursor += SECTION_ADVANCE;
            return;
        }

        if flow.cursor > height - FIELD_BREAK_MARGIN {
            self.next_page(out, flow);
        }

        let column_width = (self.frame.width - 2.0 * MARGIN_X) / 2.0;
        let (x, w) = match field.column {
            Column::Full => (MARGIN_X, self.frame.width - 2.0 * MARGIN_X),
            Column::Left => (MARGIN_X, column_width - COLUMN_GUTTER),
            Column::Right => (
                MARGIN_X + column_width + COLUMN_GUTTER,
                column_width - COLUMN_GUTTER,
            ),
        };
        let base = flow.cursor + 20.0;
        let page_index = flow.page;
        let page = &mut out.pages[page_index];
        let text_rgb = visual.text_rgb();
        let label_size = visual.font_size_label;

        if field.required {
            page.text(x - 10.0, base - 5.0, "*", label_size, true, Rgb::RED);
        }
        if field.kind != FieldKind::Checkbox {
            page.text(x, base - 5.0, field.label.clone(), label_size, true, text_rgb);
        }

        let spacing = visual.spacing;
        let (widgets, advance) = match &field.kind {
            FieldKind::Date { parts } => {
                let widgets = self.date_widgets(page, field, index, page_index, x, base - 5.0, FIELD_HEIGHT, parts);
                (widgets, spacing)
            }
            FieldKind::Checkbox => {
                let rect = Rect::new(x, base - 3.0, CHECKBOX_SIZE, CHECKBOX_SIZE);
                page.rect(rect, Rgb::BLACK);
                page.text(x + 25.0, base + 10.0, field.label.clone(), label_size, true, text_rgb);
                let kind = WidgetKind::Checkbox {
                    checked: field.is_checked(),
                };
                let name = format!("check_{index}");
                (
                    vec![WidgetSpec::new(name, field, index, page_index, rect, kind)],
                    spacing * 0.7,
                )
            }
            FieldKind::Dropdown { options } => {
                let rect = Rect::new(x, base, w, FIELD_HEIGHT);
                page.rect(rect, Rgb::BLACK);
                let kind = WidgetKind::Choice {
                    options: options.clone(),
                    value: field.selected_option().map(str::to_string),
                };
                let name = format!("drop_{index}");
                (vec![WidgetSpec::new(name, field, index, page_index, rect, kind)], spacing)
            }
            FieldKind::Multiline => {
                let rect = Rect::new(x, base, w, MULTILINE_HEIGHT);
                page.rect(rect, Rgb::BLACK);
                let name = format!("multi_{index}");
                (
                    vec![WidgetSpec::new(name, field, index, page_index, rect, text_kind(field, true))],
                    spacing + 40.0,
                )
            }
            FieldKind::Signature => {
                let rect = Rect::new(x, base, w, SIGNATURE_HEIGHT);
                page.line((x, rect.bottom()), (x + w, rect.bottom()), true, Rgb::BLACK);
                let name = format!("sig_{index}");
                (
                    vec![WidgetSpec::new(name, field, index, page_index, rect, WidgetKind::Signature)],
                    spacing + 25.0,
                )
            }
            FieldKind::Radio { options } => {
                let widget = self.radio_widget(page, field, index, page_index, x, base, RADIO_SIZE, options);
                let extra = RADIO_STEP * options.len().saturating_sub(1) as f32;
                (vec![widget], spacing + extra)
            }
            FieldKind::Text | FieldKind::Number => {
                let rect = Rect::new(x, base - 5.0, w, FIELD_HEIGHT);
                page.line((x, rect.bottom()), (x + w, rect.bottom()), false, Rgb::BLACK);
                let name = match field.kind {
                    FieldKind::Number => format!("num_{index}"),
                    _ => format!("f_{index}"),
                };
                (
                    vec![WidgetSpec::new(name, field, index, page_index, rect, text_kind(field, false))],
                    spacing,
                )
            }
            FieldKind::Section => (Vec::new(), 0.0),
        };

        out.widgets.extend(widgets);
        if field.column != Column::Left {
            flow.cursor += advance;
        }
    }

    fn place_absolute(
        &self,
        out: &mut FormLayout,
        index: usize,
        field: &DetectedField,
        pos: AbsolutePosition,
    ) -> Result<()> {
        if !(pos.w.is_finite() && pos.h.is_finite() && pos.w > 0.0 && pos.h > 0.0) {
            return Err(Error::Layout(format!(
                "field {} '{}' has size {}x{}",
                index, field.label, pos.w, pos.h
            )));
        }
        if pos.page_index >= MAX_PAGES {
            return Err(Error::Layout(format!(
                "field {} '{}' is on page {}, past the {} page limit",
                index,
                field.label,
                pos.page_index + 1,
                MAX_PAGES
            )));
        }
        self.ensure_page(out, pos.page_index);

        let visual = &self.options.visual;
        let labels = self.options.draw_absolute_labels;
        let page_index = pos.page_index;
        let page = &mut out.pages[page_index];
        let r = pos.rect();
        let text_rgb = visual.text_rgb();
        let label_size = visual.font_size_label;

        if field.kind == FieldKind::Section {
            if labels {
                self.draw_section(page, r.x, r.y, &field.label);
            }
            return Ok(());
        }
        if labels {
            if field.required {
                page.text(r.x - 10.0, r.y - 3.0, "*", label_size, true, Rgb::RED);
            }
            if field.kind != FieldKind::Checkbox {
                page.text(r.x, r.y - 3.0, field.label.clone(), label_size, true, text_rgb);
            }
        }

        let widgets = match &field.kind {
            FieldKind::Date { parts } => {
                self.date_widgets(page, field, index, page_index, r.x, r.y, r.h, parts)
            }
            FieldKind::Checkbox => {
                let side = r.w.min(r.h);
                let rect = Rect::new(r.x, r.y, side, side);
                page.rect(rect, Rgb::BLACK);
                if labels {
                    page.text(
                        r.x + side + 7.0,
                        r.y + side * 0.75,
                        field.label.clone(),
                        label_size,
                        true,
                        text_rgb,
                    );
                }
                let kind = WidgetKind::Checkbox {
                    checked: field.is_checked(),
                };
                vec![WidgetSpec::new(format!("check_{index}"), field, index, page_index, rect, kind)]
            }
            FieldKind::Dropdown { options } => {
                page.rect(r, Rgb::BLACK);
                let kind = WidgetKind::Choice {
                    options: options.clone(),
                    value: field.selected_option().map(str::to_string),
                };
                vec![WidgetSpec::new(format!("drop_{index}"), field, index, page_index, r, kind)]
            }
            FieldKind::Multiline => {
                page.rect(r, Rgb::BLACK);
                vec![WidgetSpec::new(format!("multi_{index}"), field, index, page_index, r, text_kind(field, true))]
            }
            FieldKind::Signature => {
                page.line((r.x, r.bottom()), (r.right(), r.bottom()), true, Rgb::BLACK);
                vec![WidgetSpec::new(format!("sig_{index}"), field, index, page_index, r, WidgetKind::Signature)]
            }
            FieldKind::Radio { options } => {
                let size = r.h.min(RADIO_SIZE);
                vec![self.radio_widget(page, field, index, page_index, r.x, r.y, size, options)]
            }
            FieldKind::Text | FieldKind::Number => {
                page.line((r.x, r.bottom()), (r.right(), r.bottom()), false, Rgb::BLACK);
                let name = match field.kind {
                    FieldKind::Number => format!("num_{index}"),
                    _ => format!("f_{index}"),
                };
                vec![WidgetSpec::new(name, field, index, page_index, r, text_kind(field, false))]
            }
            FieldKind::Section => Vec::new(),
        };
        out.widgets.extend(widgets);
        Ok(())
    }

    fn next_page(&self, out: &mut FormLayout, flow: &mut Flow) {
        flow.page += 1;
        flow.cursor = FLOW_START;
        self.ensure_page(out, flow.page);
    }

    fn draw_section(&self, page: &mut PageLayout, x: f32, baseline: f32, label: &str) {
        let visual = &self.options.visual;
        let color = visual.primary_rgb();
        page.text(x, baseline, label.to_uppercase(), visual.font_size_title - 2.0, true, color);
        page.line(
            (x, baseline + 5.0),
            (self.frame.width - MARGIN_X, baseline + 5.0),
            false,
            color,
        );
    }

    /// Day, month and year boxes of a date. `top` is the boxes' top edge.
    #[allow(clippy::too_many_arguments)]
    fn date_widgets(
        &self,
        page: &mut PageLayout,
        field: &DetectedField,
        index: usize,
        page_index: usize,
        x: f32,
        top: f32,
        height: f32,
        parts: &DateParts,
    ) -> Vec<WidgetSpec> {
        let values = split_date(&field.default_value);
        let bottom = top + height;
        let slots = parts.slots();
        let mut widgets = Vec::with_capacity(3);
        for (i, (slot, suffix)) in slots.iter().zip(["d", "m", "y"]).enumerate() {
            let x0 = x + slot.offset;
            page.line((x0, bottom), (x0 + slot.width, bottom), false, Rgb::BLACK);
            if i < 2 {
                page.text(
                    x0 + slot.width + 5.0,
                    bottom,
                    "/",
                    self.options.visual.font_size_label,
                    true,
                    self.options.visual.text_rgb(),
                );
            }
            let kind = WidgetKind::Text {
                value: values[i].clone(),
                multiline: false,
                validation: field.effective_validation(),
            };
            widgets.push(WidgetSpec::new(
                format!("date_{index}_{suffix}"),
                field,
                index,
                page_index,
                Rect::new(x0, top, slot.width, height),
                kind,
            ));
        }
        widgets
    }

    /// A radio group with one box per option, stacked from `top`.
    #[allow(clippy::too_many_arguments)]
    fn radio_widget(
        &self,
        page: &mut PageLayout,
        field: &DetectedField,
        index: usize,
        page_index: usize,
        x: f32,
        top: f32,
        size: f32,
        options: &[String],
    ) -> WidgetSpec {
        let visual = &self.options.visual;
        let wanted = field.default_value.trim().to_lowercase();
        let selected = options
            .iter()
            .position(|o| !wanted.is_empty() && o.trim().to_lowercase() == wanted);

        let count = options.len().max(1);
        let mut kids = Vec::with_capacity(count);
        for i in 0..count {
            let rect = Rect::new(x, top + RADIO_STEP * i as f32, size, size);
            page.rect(rect, Rgb::BLACK);
            if let Some(option) = options.get(i) {
                page.text(
                    x + size + 6.0,
                    rect.y + size * 0.8,
                    option.clone(),
                    visual.font_size_label,
                    false,
                    visual.text_rgb(),
                );
            }
            kids.push(rect);
        }

        let rect = kids.iter().skip(1).fold(kids[0], |acc, r| acc.union(r));
        let kind = WidgetKind::Radio {
            options: options.to_vec(),
            selected,
            kids,
        };
        WidgetSpec::new(format!("radio_{index}"), field, index, page_index, rect, kind)
    }
}

fn text_kind(field: &DetectedField, multiline: bool) -> WidgetKind {
    WidgetKind::Text {
        value: field.default_value.clone(),
        multiline,
        validation: field.effective_validation(),
    }
}

/// Maximum text length of widgets added by [`overlay_widgets`].
pub const OVERLAY_MAX_LEN: u32 = 1000;

/// Widgets for adding absolute fields to an existing document, without
/// drawing anything.
///
/// Fields are named `field_<index>`. Flowing fields and sections are
/// skipped; page indices past the end land on the last page.
pub fn overlay_widgets(fields: &[DetectedField], page_count: usize) -> Vec<WidgetSpec> {
    let Some(last_page) = page_count.checked_sub(1) else {
        return Vec::new();
    };

    fields
        .iter()
        .enumerate()
        .filter_map(|(index, field)| {
            let pos = field.absolute_position?;
            if !field.kind.is_interactive() {
                return None;
            }
            if pos.page_index > last_page {
                log::debug!(
                    "Field '{}' targets page {}, placing it on page {}",
                    field.label,
                    pos.page_index,
                    last_page
                );
            }
            let page_index = pos.page_index.min(last_page);
            let rect = pos.rect();
            let kind = match &field.kind {
                FieldKind::Checkbox => WidgetKind::Checkbox {
                    checked: field.is_checked(),
                },
                FieldKind::Radio { options } => WidgetKind::Radio {
                    options: options.clone(),
                    selected: None,
                    kids: vec![rect],
                },
                FieldKind::Dropdown { options } => WidgetKind::Choice {
                    options: options.clone(),
                    value: field.selected_option().map(str::to_string),
                },
                FieldKind::Signature => WidgetKind::Signature,
                kind => text_kind(field, *kind == FieldKind::Multiline),
            };
            let mut widget = WidgetSpec::new(format!("field_{index}"), field, index, page_index, rect, kind);
            if matches!(widget.kind, WidgetKind::Text { .. }) {
                widget.max_len = Some(OVERLAY_MAX_LEN);
            }
            Some(widget)
        })
        .collect()
}
