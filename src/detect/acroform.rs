//! Reading native form fields.

use std::collections::HashSet;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::model::{AbsolutePosition, DateParts, DetectedField, FieldKind};
use crate::parser::{decode_text_string, resolve, resolve_dict, PdfDocument};

/// `/Ff` bit: field must have a value.
pub const FF_REQUIRED: i64 = 1 << 1;
/// `/Ff` bit: text field spans several lines.
pub const FF_MULTILINE: i64 = 1 << 12;
/// `/Ff` bit: button is a radio group.
pub const FF_RADIO: i64 = 1 << 15;
/// `/Ff` bit: button is a push button.
pub const FF_PUSHBUTTON: i64 = 1 << 16;
/// `/Ff` bit: choice field is a combo box.
pub const FF_COMBO: i64 = 1 << 17;

const MAX_FIELD_DEPTH: usize = 32;

/// Values inherited down the field tree.
#[derive(Debug, Clone, Default)]
struct Inherited {
    name: String,
    field_type: Option<Vec<u8>>,
    flags: Option<i64>,
}

/// Read the fields of a document's interactive form.
///
/// Returns the fields and whether any were found. A document without an
/// `/AcroForm` dictionary yields `(vec![], false)`. A malformed field is
/// logged and skipped.
pub fn extract_acroform_fields(doc: &PdfDocument) -> Result<(Vec<DetectedField>, bool)> {
    let Some(acroform) = doc.acroform() else {
        return Ok((Vec::new(), false));
    };

    let lopdf_doc = doc.inner();
    let roots: Vec<&Object> = match acroform.get(b"Fields") {
        Ok(obj) => match resolve(lopdf_doc, obj).as_array() {
            Ok(arr) => arr.iter().collect(),
            Err(_) => {
                log::warn!("AcroForm /Fields is not an array");
                Vec::new()
            }
        },
        Err(_) => Vec::new(),
    };

    let mut walker = FieldWalker {
        doc,
        visited: HashSet::new(),
        fields: Vec::new(),
    };
    for root in roots {
        walker.walk(root, &Inherited::default(), 0);
    }

    let fields = walker.fields;
    let has_acroform = !fields.is_empty();
    log::info!("AcroForm: {} fields", fields.len());
    Ok((fields, has_acroform))
}

struct FieldWalker<'a> {
    doc: &'a PdfDocument,
    visited: HashSet<ObjectId>,
    fields: Vec<DetectedField>,
}

impl<'a> FieldWalker<'a> {
    fn lopdf(&self) -> &'a LopdfDocument {
        self.doc.inner()
    }

    fn walk(&mut self, node: &'a Object, parent: &Inherited, depth: usize) {
        if depth > MAX_FIELD_DEPTH {
            log::warn!("Form field tree too deep; skipping subtree");
            return;
        }
        if let Object::Reference(id) = node {
            if !self.visited.insert(*id) {
                return;
            }
        }
        let Some(dict) = resolve_dict(self.lopdf(), node) else {
            log::warn!("Skipping form field that is not a dictionary");
            return;
        };

        let inherited = inherit(dict, parent);
        let kids = self.kids(dict);
        let field_kids: Vec<&'a Object> = kids
            .iter()
            .copied()
            .filter(|k| {
                resolve_dict(self.lopdf(), k).is_some_and(|d| d.has(b"T") || d.has(b"Kids"))
            })
            .collect();

        if !field_kids.is_empty() {
            for kid in field_kids {
                self.walk(kid, &inherited, depth + 1);
            }
            return;
        }

        // Terminal field: its kids are widgets, or it is its own widget
        let widgets: Vec<(Option<ObjectId>, &'a Dictionary)> = if kids.is_empty() {
            vec![(node.as_reference().ok(), dict)]
        } else {
            kids.iter()
                .filter_map(|k| {
                    resolve_dict(self.lopdf(), k).map(|d| (k.as_reference().ok(), d))
                })
                .collect()
        };

        match self.build_field(dict, &inherited, &widgets) {
            Ok(field) => self.fields.push(field),
            Err(e) => log::warn!("Skipping form field '{}': {}", inherited.name, e),
        }
    }

    fn kids(&self, dict: &'a Dictionary) -> Vec<&'a Object> {
        dict.get(b"Kids")
            .ok()
            .and_then(|o| resolve(self.lopdf(), o).as_array().ok())
            .map(|arr| arr.iter().collect())
            .unwrap_or_default()
    }

    fn build_field(
        &self,
        dict: &Dictionary,
        inherited: &Inherited,
        widgets: &[(Option<ObjectId>, &Dictionary)],
    ) -> Result<DetectedField> {
        let flags = inherited.flags.unwrap_or(0);
        let label = if inherited.name.is_empty() {
            format!("Campo {}", self.fields.len() + 1)
        } else {
            inherited.name.clone()
        };

        let kind = match inherited.field_type.as_deref() {
            Some(b"Tx") if flags & FF_MULTILINE != 0 => FieldKind::Multiline,
            Some(b"Btn") if flags & FF_RADIO != 0 => FieldKind::Radio {
                options: self.radio_states(widgets),
            },
            Some(b"Btn") => FieldKind::Checkbox,
            Some(b"Ch") => FieldKind::Dropdown {
                options: self.choice_options(dict),
            },
            Some(b"Sig") => FieldKind::Signature,
            _ => FieldKind::Text,
        };

        let (first_ref, first_widget) = widgets
            .first()
            .copied()
            .ok_or_else(|| Error::InvalidField("no widget".into()))?;
        let page_index = self.widget_page(first_ref, first_widget);
        let media_box = self.doc.media_box(page_index)?;

        let mut rect = widget_rect(self.lopdf(), first_widget, media_box)
            .ok_or_else(|| Error::InvalidField("missing /Rect".into()))?;
        if matches!(kind, FieldKind::Radio { .. }) {
            // One box around the buttons on the first button's page
            for (id, widget) in widgets.iter().skip(1) {
                if self.widget_page(*id, widget) == page_index {
                    if let Some(r) = widget_rect(self.lopdf(), widget, media_box) {
                        rect = rect.union(&r);
                    }
                }
            }
        }
        if !rect.is_valid() {
            return Err(Error::InvalidField(format!(
                "empty rectangle {}x{}",
                rect.w, rect.h
            )));
        }

        let mut field = DetectedField::placed(
            label,
            kind,
            AbsolutePosition::from_rect(rect, page_index),
        )
        .required(flags & FF_REQUIRED != 0);

        if let Some(value) = self.field_value(dict, flags) {
            field = field.with_default_value(value);
        }

        // Date fields are text fields in the file
        if field.kind == FieldKind::Text && is_date_format(dict) {
            field.kind = FieldKind::Date {
                parts: DateParts::default(),
            };
        }

        Ok(field)
    }

    /// Page of a widget: its `/P` entry, else the page whose `/Annots`
    /// lists it, else the first page.
    fn widget_page(&self, id: Option<ObjectId>, widget: &Dictionary) -> usize {
        if let Some(index) = widget
            .get(b"P")
            .ok()
            .and_then(|o| o.as_reference().ok())
            .and_then(|p| self.doc.page_index_of(p))
        {
            return index;
        }

        if let Some(id) = id {
            let doc = self.lopdf();
            for (index, page_id) in self.doc.page_ids().into_iter().enumerate() {
                let listed = doc
                    .get_dictionary(page_id)
                    .ok()
                    .and_then(|page| page.get(b"Annots").ok())
                    .and_then(|a| resolve(doc, a).as_array().ok())
                    .is_some_and(|annots| {
                        annots.iter().any(|a| a.as_reference().ok() == Some(id))
                    });
                if listed {
                    return index;
                }
            }
        }

        0
    }

    fn field_value(&self, dict: &Dictionary, flags: i64) -> Option<String> {
        let doc = self.lopdf();
        let value = dict.get(b"V").or_else(|_| dict.get(b"DV")).ok()?;
        let value = match resolve(doc, value) {
            Object::String(bytes, _) => decode_text_string(bytes),
            Object::Name(name) => {
                let name = String::from_utf8_lossy(name).to_string();
                if name == "Off" {
                    return None;
                }
                name
            }
            // Multi-select list boxes
            Object::Array(items) if flags & FF_COMBO == 0 => items
                .iter()
                .filter_map(|i| match resolve(doc, i) {
                    Object::String(bytes, _) => Some(decode_text_string(bytes)),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(", "),
            _ => return None,
        };
        (!value.is_empty()).then_some(value)
    }

    /// Display strings of `/Opt`, which holds strings or
    /// `[export, display]` pairs.
    fn choice_options(&self, dict: &Dictionary) -> Vec<String> {
        let doc = self.lopdf();
        let Some(opts) = dict
            .get(b"Opt")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
        else {
            return Vec::new();
        };
        opts.iter()
            .filter_map(|opt| match resolve(doc, opt) {
                Object::String(bytes, _) => Some(decode_text_string(bytes)),
                Object::Array(pair) => match pair.last().map(|o| resolve(doc, o)) {
                    Some(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
                    _ => None,
                },
                _ => None,
            })
            .collect()
    }

    /// On-state names from each widget's normal appearance.
    fn radio_states(&self, widgets: &[(Option<ObjectId>, &Dictionary)]) -> Vec<String> {
        let doc = self.lopdf();
        let mut states: Vec<String> = Vec::new();
        for (_, widget) in widgets {
            let Some(normal) = widget
                .get(b"AP")
                .ok()
                .and_then(|ap| resolve_dict(doc, ap))
                .and_then(|ap| ap.get(b"N").ok())
                .and_then(|n| resolve_dict(doc, n))
            else {
                continue;
            };
            for (name, _) in normal.iter() {
                let name = String::from_utf8_lossy(name).to_string();
                if name != "Off" && !states.contains(&name) {
                    states.push(name);
                }
            }
        }
        states
    }
}

fn inherit(dict: &Dictionary, parent: &Inherited) -> Inherited {
    let partial = dict.get(b"T").ok().and_then(|t| match t {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    });
    let name = match (parent.name.is_empty(), partial) {
        (_, None) => parent.name.clone(),
        (true, Some(p)) => p,
        (false, Some(p)) => format!("{}.{}", parent.name, p),
    };
    Inherited {
        name,
        field_type: dict
            .get(b"FT")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| n.to_vec())
            .or_else(|| parent.field_type.clone()),
        flags: dict
            .get(b"Ff")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .or(parent.flags),
    }
}

/// Widget `/Rect` in top-left page points.
fn widget_rect(doc: &LopdfDocument, widget: &Dictionary, media_box: [f32; 4]) -> Option<Rect> {
    let arr = resolve(doc, widget.get(b"Rect").ok()?).as_array().ok()?;
    if arr.len() < 4 {
        return None;
    }
    let mut v = [0.0f32; 4];
    for (slot, obj) in v.iter_mut().zip(arr.iter()) {
        *slot = resolve(doc, obj).as_float().ok()?;
    }
    Some(Rect::from_pdf_rect(v, media_box))
}

/// Whether a text field carries an `AFDate_FormatEx` format action.
fn is_date_format(dict: &Dictionary) -> bool {
    let Ok(Object::Dictionary(aa)) = dict.get(b"AA") else {
        return false;
    };
    let Ok(Object::Dictionary(format)) = aa.get(b"F") else {
        return false;
    };
    match format.get(b"JS") {
        Ok(Object::String(bytes, _)) => {
            String::from_utf8_lossy(bytes).contains("AFDate_Format")
        }
        _ => false,
    }
}
