//! Writing fillable documents with lopdf.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document as LopdfDocument, Object, ObjectId, Stream, StringFormat};

use crate::error::{Error, Result};
use crate::geometry::PageFrame;
use crate::model::{DetectedField, Rgb, VisualConfig};
use crate::parser::{encode_text_string, encode_win_ansi, inherited, page_media_box, PdfDocument};

use super::layout::{overlay_widgets, FormLayout, ImageSlot, LayoutEngine, Mark};
use super::options::ComposeOptions;
use super::synth::{acroform_dictionary, font_resources, WidgetSynth, FORM_FONT};

const BOLD_FONT: &str = "F2";
const PRODUCER: &str = concat!("formpdf ", env!("CARGO_PKG_VERSION"));

/// Generates fillable PDFs from a field list.
///
/// # Example
///
/// ```no_run
/// use formpdf::compose::{ComposeOptions, FormWriter};
/// use formpdf::model::{DetectedField, FieldKind};
///
/// let fields = vec![
///     DetectedField::new("Nombre", FieldKind::Text),
///     DetectedField::new("Acepto las condiciones", FieldKind::Checkbox),
/// ];
/// let writer = FormWriter::new(ComposeOptions::new().with_title("Solicitud"));
/// writer.write_to_file(&fields, "solicitud.pdf")?;
/// # Ok::<(), formpdf::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FormWriter {
    options: ComposeOptions,
}

impl FormWriter {
    /// Create a writer.
    pub fn new(options: ComposeOptions) -> Self {
        Self { options }
    }

    /// Current options.
    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    /// Lay out `fields` without writing anything.
    pub fn layout(&self, fields: &[DetectedField]) -> Result<FormLayout> {
        let background = self.open_background()?;
        self.layout_with(fields, background.as_ref())
    }

    /// Build the output document in memory.
    pub fn build(&self, fields: &[DetectedField]) -> Result<LopdfDocument> {
        let background = self.open_background()?;
        let layout = self.layout_with(fields, background.as_ref())?;
        let visual = &self.options.visual;
        let frame = layout.frame;

        let mut doc = LopdfDocument::with_version("1.7");
        let pages_id = doc.new_object_id();
        let background_pages = match background {
            Some(bg) => import_pages(&mut doc, bg.into_inner()),
            None => Vec::new(),
        };
        let images = self.embed_images(&mut doc, &layout)?;

        let page_ids: Vec<ObjectId> = (0..layout.page_count()).map(|_| doc.new_object_id()).collect();

        let synth = WidgetSynth::new(&layout.widgets, visual.font_size_label);
        let mut annotations: Vec<Vec<Object>> = vec![Vec::new(); page_ids.len()];
        let mut fields_ids = Vec::with_capacity(layout.widgets.len());
        for widget in &layout.widgets {
            let out = synth.add_widget(&mut doc, widget, page_ids[widget.page_index], frame.media_box())?;
            annotations[widget.page_index].extend(out.annotations.into_iter().map(Object::Reference));
            fields_ids.push(out.field);
        }

        let fonts = dictionary! {
            FORM_FONT => standard_font(&visual.regular_font()),
            BOLD_FONT => standard_font(&visual.bold_font()),
        };
        let mut background_forms: HashMap<ObjectId, ObjectId> = HashMap::new();

        for (index, page) in layout.pages.iter().enumerate() {
            let mut operations = Vec::new();
            let mut xobjects = Dictionary::new();

            if let Some(last) = background_pages.len().checked_sub(1) {
                let bg_page = background_pages[index.min(last)];
                let form_id = match background_forms.get(&bg_page) {
                    Some(id) => *id,
                    None => {
                        let id = self.background_form(&mut doc, bg_page)?;
                        background_forms.insert(bg_page, id);
                        id
                    }
                };
                xobjects.set("BG0", form_id);
                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new("Do", vec![Object::Name(b"BG0".to_vec())]));
                operations.push(Operation::new("Q", vec![]));
            }

            for mark in &page.marks {
                if let Mark::Image { slot, .. } = mark {
                    match images.get(slot) {
                        Some((name, id)) => xobjects.set(name.as_str(), *id),
                        None => continue,
                    }
                }
                operations.extend(mark_operations(mark, frame, &images));
            }

            let content = Content { operations }.encode()?;
            let content_id = doc.add_object(self.stream(Dictionary::new(), content)?);

            let mut resources = dictionary! { "Font" => fonts.clone() };
            if !xobjects.is_empty() {
                resources.set("XObject", xobjects);
            }
            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(frame.width),
                    Object::Real(frame.height),
                ],
                "Contents" => content_id,
                "Resources" => resources,
            };
            let annots = std::mem::take(&mut annotations[index]);
            if !annots.is_empty() {
                page_dict.set("Annots", annots);
            }
            doc.objects.insert(page_ids[index], Object::Dictionary(page_dict));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
                "Count" => page_ids.len() as i64,
            }),
        );
        let mut acroform = acroform_dictionary(&visual.regular_font(), visual.font_size_label);
        acroform.set(
            "Fields",
            fields_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "AcroForm" => acroform,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(encode_text_string(&self.options.title), StringFormat::Literal),
            "Producer" => Object::string_literal(PRODUCER),
            "CreationDate" => Object::string_literal(Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        if !background_pages.is_empty() {
            // Drop the imported catalog, page tree and anything only they used
            let pruned = doc.prune_objects();
            log::debug!("Pruned {} unused background objects", pruned.len());
        }

        log::info!(
            "Generated {} pages with {} form fields",
            layout.page_count(),
            fields_ids.len()
        );
        Ok(doc)
    }

    /// Build the document and serialize it.
    pub fn write_to_bytes(&self, fields: &[DetectedField]) -> Result<Vec<u8>> {
        let mut doc = self.build(fields)?;
        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        Ok(out)
    }

    /// Build the document and save it to `path`.
    pub fn write_to_file<P: AsRef<Path>>(&self, fields: &[DetectedField], path: P) -> Result<()> {
        let mut doc = self.build(fields)?;
        doc.save(path.as_ref())?;
        Ok(())
    }

    fn open_background(&self) -> Result<Option<PdfDocument>> {
        self.options
            .background()
            .map(PdfDocument::open)
            .transpose()
    }

    fn layout_with(&self, fields: &[DetectedField], background: Option<&PdfDocument>) -> Result<FormLayout> {
        let frame = match (self.options.page_frame, background) {
            (Some(frame), _) => frame,
            (None, Some(bg)) if bg.page_count() > 0 => bg.page_frame(0)?,
            _ => PageFrame::letter(),
        };

        let mut engine = LayoutEngine::new(&self.options, frame);
        if let Some(path) = &self.options.logo {
            match image::image_dimensions(path) {
                Ok((w, h)) => engine = engine.with_logo_size(w, h),
                Err(e) => log::warn!("Skipping logo {}: {}", path.display(), e),
            }
        }
        engine.layout(fields)
    }

    /// Embed every image the layout uses, once each.
    fn embed_images(&self, doc: &mut LopdfDocument, layout: &FormLayout) -> Result<HashMap<ImageSlot, (String, ObjectId)>> {
        let mut images = HashMap::new();
        for page in &layout.pages {
            for mark in &page.marks {
                let Mark::Image { slot, .. } = mark else {
                    continue;
                };
                if images.contains_key(slot) {
                    continue;
                }
                let path = match slot {
                    ImageSlot::Logo => self.options.logo.as_deref(),
                    ImageSlot::Extra(i) => self.options.extra_images.get(*i).map(|img| img.path.as_path()),
                };
                let Some(path) = path else {
                    continue;
                };
                match self.image_xobject(doc, path) {
                    Ok(id) => {
                        let name = format!("Im{}", images.len() + 1);
                        images.insert(*slot, (name, id));
                    }
                    Err(e) => log::warn!("Skipping image {}: {}", path.display(), e),
                }
            }
        }
        Ok(images)
    }

    /// RGB image XObject with its alpha channel as a soft mask.
    fn image_xobject(&self, doc: &mut LopdfDocument, path: &Path) -> Result<ObjectId> {
        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        let mask = self.stream(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        )?;
        let mask_id = doc.add_object(mask);
        let image = self.stream(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "SMask" => mask_id,
            },
            rgb,
        )?;
        Ok(doc.add_object(image))
    }

    /// A background page wrapped as a form XObject, so it can be drawn
    /// beneath generated content without touching its content stream.
    fn background_form(&self, doc: &mut LopdfDocument, page_id: ObjectId) -> Result<ObjectId> {
        let content = doc.get_page_content(page_id)?;
        let media_box = page_media_box(doc, page_id);
        let bbox: Vec<Object> = media_box.iter().map(|v| Object::Real(*v)).collect();
        // Generated pages start at 0,0
        let matrix: Vec<Object> = [1.0, 0.0, 0.0, 1.0, -media_box[0], -media_box[1]]
            .iter()
            .map(|v| Object::Real(*v))
            .collect();
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => bbox,
            "Matrix" => matrix,
        };
        if let Some(resources) = inherited(doc, page_id, b"Resources") {
            dict.set("Resources", resources.clone());
        }
        let form = self.stream(dict, content)?;
        Ok(doc.add_object(form))
    }

    fn stream(&self, dict: Dictionary, data: Vec<u8>) -> Result<Stream> {
        if self.options.compress {
            deflate_stream(dict, &data)
        } else {
            Ok(Stream::new(dict, data))
        }
    }
}

fn deflate_stream(mut dict: Dictionary, data: &[u8]) -> Result<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;
    dict.set("Filter", "FlateDecode");
    Ok(Stream::new(dict, compressed))
}

fn standard_font(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Move every object of `other` into `doc`, returning its page ids in order.
fn import_pages(doc: &mut LopdfDocument, mut other: LopdfDocument) -> Vec<ObjectId> {
    other.renumber_objects_with(doc.max_id + 1);
    let pages: Vec<ObjectId> = other.get_pages().into_values().collect();
    doc.max_id = doc.max_id.max(other.max_id);
    doc.objects.extend(other.objects);
    log::debug!("Imported background with {} pages", pages.len());
    pages
}

fn color_operands(color: Rgb) -> Vec<Object> {
    vec![color.r.into(), color.g.into(), color.b.into()]
}

/// Content operators for one mark, flipped into PDF space.
fn mark_operations(mark: &Mark, frame: PageFrame, images: &HashMap<ImageSlot, (String, ObjectId)>) -> Vec<Operation> {
    match mark {
        Mark::Text {
            x,
            y,
            text,
            size,
            bold,
            color,
        } => {
            let font = if *bold { BOLD_FONT } else { FORM_FONT };
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(font.as_bytes().to_vec()), (*size).into()]),
                Operation::new("rg", color_operands(*color)),
                Operation::new("Td", vec![(*x).into(), frame.to_content_y(*y).into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]
        }
        Mark::Line {
            from,
            to,
            width,
            dashed,
            color,
        } => {
            let mut ops = vec![
                Operation::new("q", vec![]),
                Operation::new("RG", color_operands(*color)),
                Operation::new("w", vec![(*width).into()]),
            ];
            if *dashed {
                ops.push(Operation::new(
                    "d",
                    vec![Object::Array(vec![1.into(), 2.into()]), 0.into()],
                ));
            }
            ops.extend([
                Operation::new("m", vec![from.0.into(), frame.to_content_y(from.1).into()]),
                Operation::new("l", vec![to.0.into(), frame.to_content_y(to.1).into()]),
                Operation::new("S", vec![]),
                Operation::new("Q", vec![]),
            ]);
            ops
        }
        Mark::Rect { rect, width, color } => vec![
            Operation::new("q", vec![]),
            Operation::new("RG", color_operands(*color)),
            Operation::new("w", vec![(*width).into()]),
            Operation::new(
                "re",
                vec![
                    rect.x.into(),
                    frame.to_content_y(rect.bottom()).into(),
                    rect.w.into(),
                    rect.h.into(),
                ],
            ),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ],
        Mark::Image { slot, rect } => {
            let Some((name, _)) = images.get(slot) else {
                return Vec::new();
            };
            vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        rect.w.into(),
                        0.into(),
                        0.into(),
                        rect.h.into(),
                        rect.x.into(),
                        frame.to_content_y(rect.bottom()).into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ]
        }
    }
}

/// Add absolute fields to an existing document as AcroForm widgets,
/// leaving page content alone.
///
/// Existing form fields are kept. Fields without a position are skipped and
/// page indices past the end land on the last page. Returns the number of
/// fields added.
pub fn overlay_fields(doc: &mut LopdfDocument, fields: &[DetectedField], font_size: f32) -> Result<usize> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let widgets = overlay_widgets(fields, page_ids.len());
    let synth = WidgetSynth::new(&widgets, font_size);
    let base_font = VisualConfig::default().regular_font();

    let mut field_ids = Vec::with_capacity(widgets.len());
    for widget in &widgets {
        let page_id = page_ids[widget.page_index];
        let media_box = page_media_box(doc, page_id);
        let out = synth.add_widget(doc, widget, page_id, media_box)?;
        append_annotations(doc, page_id, &out.annotations)?;
        field_ids.push(out.field);
    }
    install_fields(doc, &field_ids, &base_font, font_size)?;

    log::info!("Added {} form fields to {} pages", field_ids.len(), page_ids.len());
    Ok(field_ids.len())
}

fn references(ids: &[ObjectId]) -> Vec<Object> {
    ids.iter().map(|id| Object::Reference(*id)).collect()
}

fn append_annotations(doc: &mut LopdfDocument, page_id: ObjectId, annots: &[ObjectId]) -> Result<()> {
    let existing = doc.get_dictionary(page_id)?.get(b"Annots").ok().cloned();
    match existing {
        Some(Object::Reference(id)) => {
            doc.get_object_mut(id)?.as_array_mut()?.extend(references(annots));
        }
        Some(Object::Array(mut arr)) => {
            arr.extend(references(annots));
            doc.get_dictionary_mut(page_id)?.set("Annots", arr);
        }
        _ => {
            doc.get_dictionary_mut(page_id)?.set("Annots", references(annots));
        }
    }
    Ok(())
}

/// Register top-level fields in the catalog's `/AcroForm`, creating it when
/// missing and making sure the form font is available.
fn install_fields(doc: &mut LopdfDocument, field_ids: &[ObjectId], base_font: &str, font_size: f32) -> Result<()> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| Error::MissingObject("document catalog".to_string()))?;

    let existing = doc.get_dictionary(catalog_id)?.get(b"AcroForm").ok().cloned();
    let acroform_id = match existing {
        Some(Object::Reference(id)) => id,
        Some(Object::Dictionary(dict)) => doc.add_object(dict),
        _ => doc.add_object(acroform_dictionary(base_font, font_size)),
    };
    doc.get_dictionary_mut(catalog_id)?.set("AcroForm", acroform_id);

    let acroform = doc.get_dictionary_mut(acroform_id)?;
    acroform.set("NeedAppearances", true);
    if !acroform.has(b"DA") {
        acroform.set("DA", Object::string_literal(format!("/{} {} Tf 0 g", FORM_FONT, font_size)));
    }
    if !acroform.has(b"DR") {
        acroform.set("DR", dictionary! { "Font" => font_resources(base_font) });
    } else if let Ok(Object::Dictionary(dr)) = acroform.get_mut(b"DR") {
        if !dr.has(b"Font") {
            dr.set("Font", font_resources(base_font));
        } else if let Ok(Object::Dictionary(fonts)) = dr.get_mut(b"Font") {
            for (key, font) in font_resources(base_font).iter() {
                if !fonts.has(key) {
                    fonts.set(key.clone(), font.clone());
                }
            }
        }
    }

    match acroform.get(b"Fields").ok().cloned() {
        Some(Object::Reference(id)) => {
            doc.get_object_mut(id)?.as_array_mut()?.extend(references(field_ids));
        }
        Some(Object::Array(mut arr)) => {
            arr.extend(references(field_ids));
            acroform.set("Fields", arr);
        }
        _ => acroform.set("Fields", references(field_ids)),
    }
    Ok(())
}

/// Open `input`, add `fields` as widgets and save to `output`.
pub fn add_fields_to_pdf<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    fields: &[DetectedField],
) -> Result<usize> {
    let mut doc = PdfDocument::open(input)?.into_inner();
    let added = overlay_fields(&mut doc, fields, VisualConfig::default().font_size_label)?;
    doc.save(output.as_ref())?;
    Ok(added)
}
