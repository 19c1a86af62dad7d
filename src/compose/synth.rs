//! AcroForm field dictionaries for laid-out widgets.

use std::collections::HashMap;

use lopdf::{dictionary, Dictionary, Document as LopdfDocument, Object, ObjectId, Stream, StringFormat};

use crate::detect::{FF_COMBO, FF_MULTILINE, FF_RADIO, FF_REQUIRED};
use crate::error::Result;
use crate::geometry::Rect;
use crate::model::Validation;
use crate::parser::encode_text_string;

use super::layout::{WidgetKind, WidgetSpec};

/// `/Ff` bit: a radio group always keeps one button on.
pub const FF_NO_TOGGLE_TO_OFF: i64 = 1 << 14;

/// Resource name of the form font in `/DR`.
pub const FORM_FONT: &str = "F1";

const BUTTON_FONT: &str = "ZaDb";
const CHECK_GLYPH: &str = "4";
const RADIO_GLYPH: &str = "l";
const ON_STATE: &str = "Yes";
const OFF_STATE: &str = "Off";

/// Keystroke validator run when a text widget loses focus.
pub fn validation_script(validation: Validation) -> Option<&'static str> {
    match validation {
        Validation::None => None,
        Validation::Email => Some(
            r#"var re=/^[\w-\.]+@([\w-]+\.)+[\w-]{2,4}$/; if(event.value&&!re.test(event.value)){app.alert("Email incorrecto"); event.rc=false;}"#,
        ),
        Validation::IdDocument => Some(
            r#"var re=/^[XYZ0-9][0-9]{7}[TRWAGMYFPDXBNJZSQVHLCKE]$/i; if(event.value&&!re.test(event.value)){app.alert("DNI inválido"); event.rc=false;}"#,
        ),
        Validation::Phone => Some(
            r#"var re=/^(\+34|0034|34)?[6789]\d{8}$/; if(event.value&&!re.test(event.value)){app.alert("Teléfono inválido"); event.rc=false;}"#,
        ),
        Validation::Numeric => Some(
            r#"if(event.value&&isNaN(event.value.replace(",","."))){app.alert("Debe ser numérico"); event.rc=false;}"#,
        ),
    }
}

/// Calculate script that shows the field only while `trigger` holds
/// `value`, or while `trigger` is a checked checkbox.
pub fn visibility_script(trigger: &str, value: &str) -> String {
    format!(
        r#"var t=this.getField("{}"); if(t.value=="{}"||(t.type=="checkbox"&&t.value!="Off")){{event.target.display=display.visible;}}else{{event.target.display=display.hidden;}}"#,
        js_escape(trigger),
        js_escape(value)
    )
}

fn js_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// PDF name for a radio option's on state.
///
/// Keeps ASCII letters and digits and turns whitespace into `_`; an option
/// with nothing left becomes `Opcion<n>` (1-based).
pub fn state_name(option: &str, index: usize) -> String {
    let name: String = option
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();
    if name.is_empty() {
        format!("Opcion{}", index + 1)
    } else {
        name
    }
}

/// `/AcroForm` dictionary with an empty `/Fields` array.
pub fn acroform_dictionary(base_font: &str, font_size: f32) -> Dictionary {
    dictionary! {
        "Fields" => Vec::<Object>::new(),
        "DR" => dictionary! {
            "Font" => font_resources(base_font),
        },
        "DA" => Object::string_literal(default_appearance(font_size)),
        "NeedAppearances" => true,
    }
}

/// Form fonts referenced by widget appearances.
pub fn font_resources(base_font: &str) -> Dictionary {
    let mut fonts = Dictionary::new();
    fonts.set(
        FORM_FONT,
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
            "Encoding" => "WinAnsiEncoding",
        },
    );
    fonts.set(BUTTON_FONT, zapf_dingbats());
    fonts
}

fn zapf_dingbats() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "ZapfDingbats",
    }
}

fn default_appearance(font_size: f32) -> String {
    format!("/{} {} Tf 0 g", FORM_FONT, font_size)
}

fn text_string(s: &str) -> Object {
    Object::String(encode_text_string(s), StringFormat::Literal)
}

fn name(s: &str) -> Object {
    Object::Name(s.as_bytes().to_vec())
}

fn pdf_rect(rect: &Rect, media_box: [f32; 4]) -> Object {
    Object::Array(
        rect.to_pdf_rect(media_box)
            .iter()
            .map(|v| Object::Real(*v))
            .collect(),
    )
}

/// Objects added for one widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedField {
    /// Top-level field, for `/AcroForm /Fields`
    pub field: ObjectId,
    /// Widget annotations, for the page's `/Annots`
    pub annotations: Vec<ObjectId>,
}

/// Turns [`WidgetSpec`]s into AcroForm objects.
#[derive(Debug)]
pub struct WidgetSynth<'a> {
    font_size: f32,
    names: HashMap<usize, &'a str>,
}

impl<'a> WidgetSynth<'a> {
    /// Create a synthesizer for a widget list. Visibility rules refer to
    /// fields by index; the first widget of each field gives its name.
    pub fn new(widgets: &'a [WidgetSpec], font_size: f32) -> Self {
        let mut names = HashMap::new();
        for widget in widgets {
            names.entry(widget.field_index).or_insert(widget.name.as_str());
        }
        Self { font_size, names }
    }

    /// Add the objects for `spec` to `doc`. `page_id` and `media_box`
    /// belong to the page the widget sits on.
    pub fn add_widget(
        &self,
        doc: &mut LopdfDocument,
        spec: &WidgetSpec,
        page_id: ObjectId,
        media_box: [f32; 4],
    ) -> Result<SynthesizedField> {
        let mut field = Dictionary::new();
        field.set("T", text_string(&spec.name));
        let mut flags = if spec.required { FF_REQUIRED } else { 0 };
        if let Some(actions) = self.actions(spec) {
            field.set("AA", actions);
        }

        match &spec.kind {
            WidgetKind::Text {
                value, multiline, ..
            } => {
                field.set("FT", name("Tx"));
                field.set("DA", Object::string_literal(default_appearance(self.font_size)));
                if !value.is_empty() {
                    field.set("V", text_string(value));
                }
                if *multiline {
                    flags |= FF_MULTILINE;
                }
                if let Some(max_len) = spec.max_len {
                    field.set("MaxLen", max_len as i64);
                }
            }
            WidgetKind::Choice { options, value } => {
                field.set("FT", name("Ch"));
                field.set(
                    "Opt",
                    Object::Array(options.iter().map(|o| text_string(o)).collect()),
                );
                field.set("DA", Object::string_literal(default_appearance(self.font_size)));
                field.set("V", text_string(value.as_deref().unwrap_or("")));
                flags |= FF_COMBO;
            }
            WidgetKind::Checkbox { checked } => {
                let state = if *checked { ON_STATE } else { OFF_STATE };
                field.set("FT", name("Btn"));
                field.set("V", name(state));
                field.set("AS", name(state));
                field.set("MK", dictionary! { "CA" => Object::string_literal(CHECK_GLYPH) });
                field.set("AP", toggle_appearance(doc, &spec.rect, ON_STATE, CHECK_GLYPH));
            }
            WidgetKind::Signature => {
                field.set("FT", name("Sig"));
            }
            WidgetKind::Radio {
                options,
                selected,
                kids,
            } => {
                return self.add_radio(doc, spec, field, flags, options, *selected, kids, page_id, media_box);
            }
        }

        field.set("Ff", flags);
        set_widget_entries(&mut field, &spec.rect, page_id, media_box);
        let id = doc.add_object(field);
        Ok(SynthesizedField {
            field: id,
            annotations: vec![id],
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn add_radio(
        &self,
        doc: &mut LopdfDocument,
        spec: &WidgetSpec,
        mut parent: Dictionary,
        flags: i64,
        options: &[String],
        selected: Option<usize>,
        kids: &[Rect],
        page_id: ObjectId,
        media_box: [f32; 4],
    ) -> Result<SynthesizedField> {
        let parent_id = doc.new_object_id();
        let mut kid_ids = Vec::with_capacity(kids.len());
        let mut value = OFF_STATE.to_string();

        for (i, rect) in kids.iter().enumerate() {
            let state = state_name(options.get(i).map_or("", String::as_str), i);
            let on = selected == Some(i);
            if on {
                value = state.clone();
            }
            let mut kid = dictionary! {
                "Parent" => parent_id,
                "AS" => name(if on { state.as_str() } else { OFF_STATE }),
                "MK" => dictionary! { "CA" => Object::string_literal(RADIO_GLYPH) },
            };
            kid.set("AP", toggle_appearance(doc, rect, &state, RADIO_GLYPH));
            set_widget_entries(&mut kid, rect, page_id, media_box);
            kid_ids.push(doc.add_object(kid));
        }

        parent.set("FT", name("Btn"));
        parent.set("Ff", flags | FF_RADIO | FF_NO_TOGGLE_TO_OFF);
        parent.set("V", name(&value));
        parent.set(
            "Kids",
            Object::Array(kid_ids.iter().map(|id| Object::Reference(*id)).collect()),
        );
        doc.objects.insert(parent_id, Object::Dictionary(parent));

        log::trace!("Radio group '{}' with {} buttons", spec.name, kid_ids.len());
        Ok(SynthesizedField {
            field: parent_id,
            annotations: kid_ids,
        })
    }

    /// `/AA` entries: validation for text, visibility for anything.
    fn actions(&self, spec: &WidgetSpec) -> Option<Dictionary> {
        let mut actions = Dictionary::new();

        if let WidgetKind::Text { validation, .. } = &spec.kind {
            if let Some(js) = validation_script(*validation) {
                actions.set("V", javascript(js));
            }
        }

        if let Some(rule) = &spec.visibility {
            match self.names.get(&rule.trigger_index) {
                Some(trigger) => actions.set("C", javascript(&visibility_script(trigger, &rule.value))),
                None => log::warn!(
                    "Field '{}' depends on field {}, which has no widget",
                    spec.name,
                    rule.trigger_index
                ),
            }
        }

        if actions.is_empty() {
            None
        } else {
            Some(actions)
        }
    }
}

fn javascript(js: &str) -> Dictionary {
    dictionary! {
        "S" => "JavaScript",
        "JS" => text_string(js),
    }
}

fn set_widget_entries(dict: &mut Dictionary, rect: &Rect, page_id: ObjectId, media_box: [f32; 4]) {
    dict.set("Type", name("Annot"));
    dict.set("Subtype", name("Widget"));
    dict.set("Rect", pdf_rect(rect, media_box));
    dict.set("F", 4);
    dict.set("P", page_id);
}

/// Normal appearances for a two-state button: a dingbat glyph when on,
/// nothing when off.
fn toggle_appearance(doc: &mut LopdfDocument, rect: &Rect, on_state: &str, glyph: &str) -> Dictionary {
    let (w, h) = (rect.w.max(1.0), rect.h.max(1.0));
    let size = w.min(h) * 0.8;
    let x = (w - size * 0.75) / 2.0;
    let y = (h - size * 0.7) / 2.0;
    let content = format!(
        "q BT 0 g /{} {:.2} Tf {:.2} {:.2} Td ({}) Tj ET Q",
        BUTTON_FONT, size, x, y, glyph
    );

    let bbox = || {
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(w),
            Object::Real(h),
        ])
    };
    let on = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => bbox(),
            "Resources" => dictionary! {
                "Font" => dictionary! { BUTTON_FONT => zapf_dingbats() },
            },
        },
        content.into_bytes(),
    );
    let off = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => bbox(),
        },
        Vec::new(),
    );

    let mut normal = Dictionary::new();
    normal.set(on_state, doc.add_object(on));
    normal.set(OFF_STATE, doc.add_object(off));
    dictionary! { "N" => normal }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VisibilityRule;

    const LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

    fn spec(name: &str, field_index: usize, kind: WidgetKind) -> WidgetSpec {
        WidgetSpec {
            name: name.to_string(),
            field_index,
            page_index: 0,
            rect: Rect::new(50.0, 155.0, 200.0, 20.0),
            required: false,
            max_len: None,
            visibility: None,
            kind,
        }
    }

    fn text(validation: Validation) -> WidgetKind {
        WidgetKind::Text {
            value: "Juan".into(),
            multiline: true,
            validation,
        }
    }

    fn dict(doc: &LopdfDocument, id: ObjectId) -> &Dictionary {
        doc.get_object(id).unwrap().as_dict().unwrap()
    }

    #[test]
    fn test_text_widget() {
        let mut doc = LopdfDocument::with_version("1.7");
        let page = (1, 0);
        let mut widget = spec("f_0", 0, text(Validation::Email));
        widget.required = true;
        widget.max_len = Some(1000);
        let widgets = vec![widget];
        let synth = WidgetSynth::new(&widgets, 12.0);
        let out = synth.add_widget(&mut doc, &widgets[0], page, LETTER).unwrap();
        assert_eq!(out.annotations, vec![out.field]);

        let field = dict(&doc, out.field);
        assert_eq!(field.get(b"FT").unwrap().as_name().unwrap(), b"Tx");
        assert_eq!(field.get(b"Ff").unwrap().as_i64().unwrap(), FF_REQUIRED | FF_MULTILINE);
        assert_eq!(field.get(b"MaxLen").unwrap().as_i64().unwrap(), 1000);
        assert_eq!(field.get(b"P").unwrap().as_reference().unwrap(), page);

        let rect: Vec<f32> = field
            .get(b"Rect")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_float().unwrap())
            .collect();
        assert_eq!(rect, vec![50.0, 617.0, 250.0, 637.0]);

        let aa = field.get(b"AA").unwrap().as_dict().unwrap();
        assert!(aa.has(b"V"));
        assert!(!aa.has(b"C"));
    }

    #[test]
    fn test_checkbox_states() {
        let mut doc = LopdfDocument::with_version("1.7");
        let widgets = vec![spec("check_0", 0, WidgetKind::Checkbox { checked: true })];
        let out = WidgetSynth::new(&widgets, 12.0)
            .add_widget(&mut doc, &widgets[0], (1, 0), LETTER)
            .unwrap();
        let field = dict(&doc, out.field);
        assert_eq!(field.get(b"V").unwrap().as_name().unwrap(), b"Yes");
        assert_eq!(field.get(b"AS").unwrap().as_name().unwrap(), b"Yes");
        let mk = field.get(b"MK").unwrap().as_dict().unwrap();
        assert_eq!(mk.get(b"CA").unwrap().as_str().unwrap(), b"4");
        let normal = field
            .get(b"AP")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"N")
            .unwrap()
            .as_dict()
            .unwrap();
        assert!(normal.has(b"Yes") && normal.has(b"Off"));
    }

    #[test]
    fn test_choice_value() {
        let mut doc = LopdfDocument::with_version("1.7");
        let kind = WidgetKind::Choice {
            options: vec!["Rojo".into(), "Azul".into()],
            value: Some("Azul".into()),
        };
        let widgets = vec![spec("drop_0", 0, kind)];
        let out = WidgetSynth::new(&widgets, 10.0)
            .add_widget(&mut doc, &widgets[0], (1, 0), LETTER)
            .unwrap();
        let field = dict(&doc, out.field);
        assert_eq!(field.get(b"Ff").unwrap().as_i64().unwrap(), FF_COMBO);
        assert_eq!(field.get(b"V").unwrap().as_str().unwrap(), b"Azul");
        assert_eq!(field.get(b"Opt").unwrap().as_array().unwrap().len(), 2);
        assert_eq!(field.get(b"DA").unwrap().as_str().unwrap(), b"/F1 10 Tf 0 g");
    }

    #[test]
    fn test_radio_group_kids() {
        let mut doc = LopdfDocument::with_version("1.7");
        let kids = vec![
            Rect::new(50.0, 160.0, 14.0, 14.0),
            Rect::new(50.0, 185.0, 14.0, 14.0),
        ];
        let kind = WidgetKind::Radio {
            options: vec!["Sí".into(), "No aplica".into()],
            selected: Some(1),
            kids,
        };
        let widgets = vec![spec("radio_0", 0, kind)];
        let out = WidgetSynth::new(&widgets, 12.0)
            .add_widget(&mut doc, &widgets[0], (1, 0), LETTER)
            .unwrap();

        assert_eq!(out.annotations.len(), 2);
        let parent = dict(&doc, out.field);
        assert_eq!(
            parent.get(b"Ff").unwrap().as_i64().unwrap(),
            FF_RADIO | FF_NO_TOGGLE_TO_OFF
        );
        assert_eq!(parent.get(b"V").unwrap().as_name().unwrap(), b"No_aplica");
        assert!(!parent.has(b"Rect"));

        let first = dict(&doc, out.annotations[0]);
        assert_eq!(first.get(b"AS").unwrap().as_name().unwrap(), b"Off");
        assert_eq!(first.get(b"Parent").unwrap().as_reference().unwrap(), out.field);
        let second = dict(&doc, out.annotations[1]);
        assert_eq!(second.get(b"AS").unwrap().as_name().unwrap(), b"No_aplica");
    }

    #[test]
    fn test_visibility_uses_trigger_name() {
        let mut doc = LopdfDocument::with_version("1.7");
        let mut dependent = spec("f_1", 1, text(Validation::None));
        dependent.visibility = Some(VisibilityRule {
            trigger_index: 0,
            value: "Sí".into(),
        });
        let widgets = vec![
            spec("check_0", 0, WidgetKind::Checkbox { checked: false }),
            dependent,
        ];
        let synth = WidgetSynth::new(&widgets, 12.0);
        let out = synth.add_widget(&mut doc, &widgets[1], (1, 0), LETTER).unwrap();
        let aa = dict(&doc, out.field).get(b"AA").unwrap().as_dict().unwrap();
        assert!(aa.has(b"C"));
        assert!(!aa.has(b"V"));

        let script = visibility_script("check_0", "a\"b");
        assert!(script.starts_with(r#"var t=this.getField("check_0");"#));
        assert!(script.contains(r#"t.value=="a\"b""#));
    }

    #[test]
    fn test_state_names() {
        assert_eq!(state_name("Hombre", 0), "Hombre");
        assert_eq!(state_name(" Sí señor ", 0), "S_seor");
        assert_eq!(state_name("¿?", 2), "Opcion3");
    }

    #[test]
    fn test_validation_scripts() {
        assert!(validation_script(Validation::None).is_none());
        assert!(validation_script(Validation::Numeric)
            .unwrap()
            .contains("isNaN"));
    }
}
