//! Integration tests for form generation and overlay.

use formpdf::compose::{overlay_fields, ComposeOptions, FormWriter};
use formpdf::model::ExtraImage;
use formpdf::parser::decode_text_string;
use formpdf::{
    add_fields_to_pdf, analyze_bytes, analyze_file, generate_form, AbsolutePosition, Column,
    DetectedField, FieldKind, PageFrame, PdfDocument, Rect, Validation, VisibilityRule,
};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

fn placed(label: &str, kind: FieldKind, rect: Rect, page: usize) -> DetectedField {
    DetectedField::placed(label, kind, AbsolutePosition::from_rect(rect, page))
}

fn blank_pdf(pages: usize, media_box: [i64; 4]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_ids: Vec<ObjectId> = (0..pages)
        .map(|_| {
            let content = doc.add_object(Stream::new(dictionary! {}, b"q 0 0 1 rg Q".to_vec()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content,
            })
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
            "Count" => pages as i64,
            "MediaBox" => media_box.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

#[test]
fn test_generated_form_round_trips_through_analysis() {
    let fields = vec![
        DetectedField::new("Datos personales", FieldKind::Section),
        DetectedField::new("Nombre", FieldKind::Text)
            .required(true)
            .with_column(Column::Left),
        DetectedField::new("Apellidos", FieldKind::Text).with_column(Column::Right),
        DetectedField::new("Observaciones", FieldKind::Multiline),
        DetectedField::new(
            "Provincia",
            FieldKind::Dropdown {
                options: vec!["Madrid".into(), "Sevilla".into()],
            },
        )
        .with_default_value("Sevilla"),
        DetectedField::new("Acepto", FieldKind::Checkbox).with_default_value("x"),
        DetectedField::new(
            "Turno",
            FieldKind::Radio {
                options: vec!["Mañana".into(), "Tarde".into()],
            },
        )
        .with_default_value("tarde"),
        DetectedField::new("Firma", FieldKind::Signature),
    ];
    let bytes = FormWriter::new(ComposeOptions::new().with_title("Inscripción"))
        .write_to_bytes(&fields)
        .unwrap();

    let result = analyze_bytes(&bytes);
    assert!(result.success);
    assert!(result.has_acroform);
    assert_eq!(result.title.as_deref(), Some("Inscripción"));

    let labels: Vec<&str> = result.fields.iter().map(|f| f.label.as_str()).collect();
    assert_eq!(
        labels,
        ["f_1", "f_2", "multi_3", "drop_4", "check_5", "radio_6", "sig_7"]
    );

    let name = &result.fields[0];
    assert!(name.required);
    let surname = &result.fields[1];
    // Same row, right half
    assert_eq!(name.absolute_position.unwrap().y, surname.absolute_position.unwrap().y);
    assert!(surname.absolute_position.unwrap().x > 300.0);

    assert_eq!(result.fields[2].kind, FieldKind::Multiline);
    assert_eq!(result.fields[3].options(), ["Madrid", "Sevilla"]);
    assert_eq!(result.fields[3].default_value, "Sevilla");
    assert!(result.fields[4].is_checked());
    assert_eq!(result.fields[5].options(), ["Maana", "Tarde"]);
    assert_eq!(result.fields[5].default_value, "Tarde");
    assert_eq!(result.fields[6].kind, FieldKind::Signature);
}

#[test]
fn test_generated_rects_map_back_to_layout() {
    let fields = vec![placed("Importe", FieldKind::Number, Rect::new(320.0, 400.0, 120.0, 22.0), 0)];
    let frame = PageFrame::a4();
    let bytes = FormWriter::new(ComposeOptions::new().with_page_frame(frame))
        .write_to_bytes(&fields)
        .unwrap();

    let doc = PdfDocument::from_bytes(&bytes).unwrap();
    assert_eq!(doc.page_frame(0).unwrap(), frame);

    let result = analyze_bytes(&bytes);
    assert_eq!(result.fields.len(), 1);
    let pos = result.fields[0].absolute_position.unwrap();
    assert_eq!(pos.page_index, 0);
    assert!((pos.x - 320.0).abs() < 1e-3);
    assert!((pos.y - 400.0).abs() < 1e-3);
    assert!((pos.w - 120.0).abs() < 1e-3);
    assert!((pos.h - 22.0).abs() < 1e-3);
}

#[test]
fn test_long_form_breaks_pages() {
    let fields: Vec<DetectedField> = (0..25)
        .map(|i| DetectedField::new(format!("Campo {i}"), FieldKind::Text))
        .collect();
    let bytes = FormWriter::default().write_to_bytes(&fields).unwrap();
    let doc = PdfDocument::from_bytes(&bytes).unwrap();
    assert!(doc.page_count() >= 3);

    let result = analyze_bytes(&bytes);
    assert_eq!(result.fields.len(), 25);
    let last = result.fields.last().unwrap().page_index().unwrap();
    assert_eq!(last, doc.page_count() - 1);
    // Fields never run into the bottom margin
    for field in &result.fields {
        assert!(field.absolute_position.unwrap().rect().bottom() < 792.0 - 100.0);
    }
}

#[test]
fn test_scripts_are_attached() {
    let fields = vec![
        DetectedField::new("Tiene hijos", FieldKind::Checkbox),
        DetectedField::new("Número de hijos", FieldKind::Number).with_visibility(VisibilityRule {
            trigger_index: 0,
            value: "Yes".to_string(),
        }),
        DetectedField::new("Correo", FieldKind::Text).with_validation(Validation::Email),
    ];
    let doc = FormWriter::new(ComposeOptions::new().with_compression(false))
        .build(&fields)
        .unwrap();

    let scripts: Vec<String> = doc
        .objects
        .values()
        .filter_map(|o| o.as_dict().ok())
        .filter_map(|d| d.get(b"JS").ok())
        .filter_map(|js| js.as_str().ok())
        .map(decode_text_string)
        .collect();

    assert!(scripts.iter().any(|s| s.contains(r#"getField("check_0")"#)));
    assert!(scripts.iter().any(|s| s.contains("isNaN")));
    assert!(scripts.iter().any(|s| s.contains("@")));
}

#[test]
fn test_overlay_on_existing_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("original.pdf");
    let output = dir.path().join("rellenable.pdf");
    blank_pdf(2, [0, 0, 595, 842]).save(&input).unwrap();

    let fields = vec![
        placed("Nombre", FieldKind::Text, Rect::new(100.0, 120.0, 200.0, 20.0), 0),
        DetectedField::new("Sin posición", FieldKind::Text),
        placed("Conforme", FieldKind::Checkbox, Rect::new(100.0, 300.0, 14.0, 14.0), 7),
    ];
    assert_eq!(add_fields_to_pdf(&input, &output, &fields).unwrap(), 2);

    let result = analyze_file(&output);
    assert!(result.success);
    assert!(result.has_acroform);
    assert_eq!(result.page_count, 2);
    assert_eq!(result.fields.len(), 2);

    assert_eq!(result.fields[0].label, "field_0");
    let pos = result.fields[0].absolute_position.unwrap();
    assert_eq!(pos.page_index, 0);
    assert!((pos.y - 120.0).abs() < 1e-3);

    // Page index past the end lands on the last page
    assert_eq!(result.fields[1].label, "field_2");
    assert_eq!(result.fields[1].page_index(), Some(1));

    // Page content is untouched
    let original = PdfDocument::open(&input).unwrap();
    let overlaid = PdfDocument::open(&output).unwrap();
    assert_eq!(
        original.page_content(0).unwrap().paths.len(),
        overlaid.page_content(0).unwrap().paths.len()
    );
}

#[test]
fn test_overlay_on_offset_media_box() {
    let mut doc = blank_pdf(1, [0, 100, 612, 892]);
    let fields = vec![placed("Nombre", FieldKind::Text, Rect::new(100.0, 42.0, 200.0, 20.0), 0)];
    overlay_fields(&mut doc, &fields, 10.0).unwrap();

    let widget = doc
        .objects
        .values()
        .filter_map(|o| o.as_dict().ok())
        .find(|d| d.get(b"Subtype").and_then(|s| s.as_name()).ok() == Some(b"Widget".as_slice()))
        .unwrap();
    let rect: Vec<f32> = widget
        .get(b"Rect")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_float().unwrap())
        .collect();
    assert_eq!(rect, vec![100.0, 830.0, 300.0, 850.0]);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    let result = analyze_bytes(&bytes);
    let pos = result.fields[0].absolute_position.unwrap();
    assert_eq!(pos.rect(), Rect::new(100.0, 42.0, 200.0, 20.0));
}

#[test]
fn test_overlay_twice_accumulates() {
    let mut doc = blank_pdf(1, [0, 0, 612, 792]);
    let fields = vec![placed("Uno", FieldKind::Text, Rect::new(50.0, 50.0, 100.0, 20.0), 0)];
    overlay_fields(&mut doc, &fields, 10.0).unwrap();
    overlay_fields(&mut doc, &fields, 10.0).unwrap();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    let result = analyze_bytes(&bytes);
    assert_eq!(result.fields.len(), 2);
}

#[test]
fn test_background_is_drawn_beneath() {
    let dir = tempfile::tempdir().unwrap();
    let background = dir.path().join("fondo.pdf");
    let output = dir.path().join("salida.pdf");
    blank_pdf(1, [0, 0, 595, 842]).save(&background).unwrap();

    let fields = vec![DetectedField::new("Nombre", FieldKind::Text)];
    let options = ComposeOptions::new().with_background(&background);
    generate_form(&fields, &options, &output).unwrap();

    let doc = PdfDocument::open(&output).unwrap();
    // Page size follows the background
    assert_eq!(doc.page_frame(0).unwrap(), PageFrame::a4());

    let page = doc.inner().get_dictionary(doc.page_id(0).unwrap()).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    assert!(resources.get(b"XObject").unwrap().as_dict().unwrap().has(b"BG0"));
}

#[test]
fn test_offset_background_is_moved_to_origin() {
    let dir = tempfile::tempdir().unwrap();
    let background = dir.path().join("fondo.pdf");
    let output = dir.path().join("salida.pdf");
    blank_pdf(1, [0, 100, 612, 892]).save(&background).unwrap();

    let fields = vec![DetectedField::new("Nombre", FieldKind::Text)];
    generate_form(&fields, &ComposeOptions::new().with_background(&background), &output).unwrap();

    let doc = PdfDocument::open(&output).unwrap();
    assert_eq!(doc.media_box(0).unwrap(), [0.0, 0.0, 612.0, 792.0]);

    let page = doc.inner().get_dictionary(doc.page_id(0).unwrap()).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let form_id = resources
        .get(b"XObject")
        .unwrap()
        .as_dict()
        .unwrap()
        .get(b"BG0")
        .unwrap()
        .as_reference()
        .unwrap();
    let form = doc.inner().get_object(form_id).unwrap().as_stream().unwrap();
    let matrix: Vec<f32> = form
        .dict
        .get(b"Matrix")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_float().unwrap())
        .collect();
    assert_eq!(matrix, vec![1.0, 0.0, 0.0, 1.0, 0.0, -100.0]);
}

#[test]
fn test_missing_images_are_skipped() {
    let options = ComposeOptions::new()
        .with_logo("/nonexistent/logo.png")
        .with_extra_image(ExtraImage {
            path: "/nonexistent/sello.png".into(),
            x: 400.0,
            y: 600.0,
            w: 100.0,
            h: 100.0,
        });
    let bytes = FormWriter::new(options)
        .write_to_bytes(&[DetectedField::new("Nombre", FieldKind::Text)])
        .unwrap();
    assert_eq!(analyze_bytes(&bytes).fields.len(), 1);
}

#[test]
fn test_invalid_absolute_field_is_an_error() {
    let fields = vec![placed("Roto", FieldKind::Text, Rect::new(10.0, 10.0, -5.0, 20.0), 0)];
    assert!(FormWriter::default().build(&fields).is_err());
}
