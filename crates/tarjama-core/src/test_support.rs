//! Fixtures shared by the unit tests: a tiny TrueType font and one- or
//! multi-page PDFs with Helvetica text.

#![allow(clippy::unwrap_used, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Character ranges mapped by [`minimal_font`], glyph ids assigned in order from 1.
const FONT_RANGES: [(u32, u32); 4] = [
    (0x0020, 0x007E),
    (0x0600, 0x06FF),
    (0xFB50, 0xFBFF),
    (0xFE70, 0xFEFF),
];

/// A TrueType font with just enough tables for ttf-parser: `cmap` (format 12),
/// `head`, `hhea`, `hmtx` and `maxp`. 1000 units per em, every glyph 500 wide.
pub fn minimal_font() -> Vec<u8> {
    let glyph_count: u32 = 1 + FONT_RANGES.iter().map(|(lo, hi)| hi - lo + 1).sum::<u32>();
    let num_glyphs = glyph_count as u16;

    let mut cmap = Vec::new();
    push_u16(&mut cmap, 0); // version
    push_u16(&mut cmap, 1); // numTables
    push_u16(&mut cmap, 3); // Windows
    push_u16(&mut cmap, 10); // UCS-4
    push_u32(&mut cmap, 12);
    push_u16(&mut cmap, 12); // format
    push_u16(&mut cmap, 0);
    push_u32(&mut cmap, 16 + 12 * FONT_RANGES.len() as u32);
    push_u32(&mut cmap, 0); // language
    push_u32(&mut cmap, FONT_RANGES.len() as u32);
    let mut next_gid = 1;
    for (lo, hi) in FONT_RANGES {
        push_u32(&mut cmap, lo);
        push_u32(&mut cmap, hi);
        push_u32(&mut cmap, next_gid);
        next_gid += hi - lo + 1;
    }

    let mut head = Vec::new();
    push_u32(&mut head, 0x0001_0000); // version
    push_u32(&mut head, 0x0001_0000); // fontRevision
    push_u32(&mut head, 0); // checkSumAdjustment
    push_u32(&mut head, 0x5F0F_3CF5);
    push_u16(&mut head, 0); // flags
    push_u16(&mut head, 1000); // unitsPerEm
    head.extend_from_slice(&[0; 16]); // created, modified
    push_i16(&mut head, 0);
    push_i16(&mut head, -200);
    push_i16(&mut head, 1000);
    push_i16(&mut head, 800);
    push_u16(&mut head, 0); // macStyle
    push_u16(&mut head, 8); // lowestRecPPEM
    push_i16(&mut head, 2); // fontDirectionHint
    push_i16(&mut head, 0); // indexToLocFormat
    push_i16(&mut head, 0); // glyphDataFormat

    let mut hhea = Vec::new();
    push_u32(&mut hhea, 0x0001_0000);
    push_i16(&mut hhea, 800); // ascender
    push_i16(&mut hhea, -200); // descender
    push_i16(&mut hhea, 0); // lineGap
    push_u16(&mut hhea, 500); // advanceWidthMax
    hhea.extend_from_slice(&[0; 22]);
    push_u16(&mut hhea, num_glyphs); // numberOfHMetrics

    let mut hmtx = Vec::new();
    for _ in 0..num_glyphs {
        push_u16(&mut hmtx, 500);
        push_i16(&mut hmtx, 0);
    }

    let mut maxp = Vec::new();
    push_u32(&mut maxp, 0x0000_5000);
    push_u16(&mut maxp, num_glyphs);

    let tables: [(&[u8; 4], Vec<u8>); 5] = [
        (b"cmap", cmap),
        (b"head", head),
        (b"hhea", hhea),
        (b"hmtx", hmtx),
        (b"maxp", maxp),
    ];

    let mut font = Vec::new();
    push_u32(&mut font, 0x0001_0000);
    push_u16(&mut font, tables.len() as u16);
    push_u16(&mut font, 64); // searchRange
    push_u16(&mut font, 2); // entrySelector
    push_u16(&mut font, 16); // rangeShift

    let mut offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in &tables {
        font.extend_from_slice(*tag);
        push_u32(&mut font, 0); // checksum, not verified by the parser
        push_u32(&mut font, offset as u32);
        push_u32(&mut font, data.len() as u32);

        body.extend_from_slice(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 12 + 16 * tables.len() + body.len();
    }
    font.extend_from_slice(&body);
    font
}

fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn push_i16(buf: &mut Vec<u8>, v: i16) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn helvetica_resources() -> Dictionary {
    let font = Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]);
    Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Dictionary(font))])),
    )])
}

fn text_stream(text: &str, x: f32, y: f32, size: f32) -> Stream {
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    Stream::new(Dictionary::new(), content.encode().unwrap())
}

/// A one-page Letter document with `text` at (100, 700) in 24pt, kept in memory.
pub fn single_page_document(text: &str) -> (Document, ObjectId) {
    text_page_document(text, 100.0, 700.0, 24.0)
}

/// A one-page Letter document with `text` drawn at baseline `(x, y)` in PDF space.
pub fn text_page_document(text: &str, x: f32, y: f32, size: f32) -> (Document, ObjectId) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let resources_id = doc.add_object(helvetica_resources());
    let content_id = doc.add_object(text_stream(text, x, y, size));

    let page_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        ("Contents", Object::Reference(content_id)),
        ("Resources", Object::Reference(resources_id)),
        (
            "MediaBox",
            Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
        ),
    ]));

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    (doc, page_id)
}

/// An `n`-page document saved to bytes. Page `i` reads "Page i+1"; the
/// MediaBox and Resources live on the page tree root and are inherited.
pub fn multi_page_pdf(n: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let resources_id = doc.add_object(helvetica_resources());

    let kids: Vec<Object> = (1..=n)
        .map(|i| {
            let stream = text_stream(&format!("Page {i}"), 100.0, 700.0, 24.0);
            let content_id = doc.add_object(stream);
            let page_id = doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
            ]));
            Object::Reference(page_id)
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(n as i64)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Decoded content operations of a page, empty if the content is unreadable.
pub fn page_contents(doc: &Document, page_id: ObjectId) -> Vec<Operation> {
    doc.get_page_content(page_id)
        .ok()
        .and_then(|bytes| Content::decode(&bytes).ok())
        .map(|content| content.operations)
        .unwrap_or_default()
}
