//! Serializes a laid-out [`Document`] with `lopdf`.
//!
//! Nothing time- or randomness-dependent is written, so the same document
//! always produces the same bytes.

use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};

use super::layout::{Document, TextCell};
use super::metrics::{self, FontStyle};
use super::{PT_PER_MM, RenderError};

const PDF_VERSION: &str = "1.4";
const PRODUCER: &str = "knowledge-hub";

fn points(mm: f32) -> Object {
    Object::Real((mm * PT_PER_MM * 100.0).round() / 100.0)
}

fn font_object(style: FontStyle) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => style.base_font(),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn cell_operations(cell: &TextCell, page_height_mm: f32) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                cell.style.resource_name().into(),
                Object::Real(cell.size_pt),
            ],
        ),
        Operation::new(
            "Td",
            vec![points(cell.x_mm), points(page_height_mm - cell.baseline_mm)],
        ),
        Operation::new("Tj", vec![Object::string_literal(metrics::encode(&cell.text))]),
        Operation::new("ET", vec![]),
    ]
}

pub fn write_pdf(document: &Document) -> Result<Vec<u8>, RenderError> {
    let mut pdf = lopdf::Document::with_version(PDF_VERSION);
    let pages_id = pdf.new_object_id();

    let regular_id = pdf.add_object(font_object(FontStyle::Regular));
    let bold_id = pdf.add_object(font_object(FontStyle::Bold));
    let resources_id = pdf.add_object(dictionary! {
        "Font" => dictionary! {
            FontStyle::Regular.resource_name() => regular_id,
            FontStyle::Bold.resource_name() => bold_id,
        },
    });

    let mut kids = Vec::with_capacity(document.pages.len());
    for page in &document.pages {
        let operations: Vec<Operation> = page
            .cells
            .iter()
            .filter(|cell| !cell.text.is_empty())
            .flat_map(|cell| cell_operations(cell, document.page_height_mm))
            .collect();
        let content = Content { operations };
        let content_id = pdf.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            points(document.page_width_mm),
            points(document.page_height_mm),
        ],
    };
    pdf.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = pdf.add_object(dictionary! {
        "Title" => Object::string_literal(metrics::encode(&document.title)),
        "Producer" => Object::string_literal(PRODUCER),
    });
    pdf.trailer.set("Root", catalog_id);
    pdf.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    pdf.save_to(&mut buffer)?;
    Ok(buffer)
}
