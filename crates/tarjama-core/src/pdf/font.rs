//! TrueType font embedding for the Arabic overlay text.
//!
//! The overlay font is loaded from disk (Amiri by default) and embedded as a
//! CIDFont with Identity-H encoding, so content streams address glyphs by id
//! and any presentation form the font covers can be drawn.
//!
//! # PDF Font Structure
//!
//! - **Type0 font**: The top-level font dictionary that references:
//!   - **CIDFont**: Glyph metrics for the glyphs actually used, and:
//!     - **FontDescriptor**: Font metadata (flags, bounding box, etc.)
//!     - **FontFile2**: The embedded TrueType font program
//!   - **ToUnicode CMap**: Maps used glyph ids back to Unicode for copy/paste
//!
//! The font program is written once per output document and shared by every
//! page that carries translated text.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::Face;

use crate::error::{Error, Result};

/// Resource name of the overlay font in page dictionaries
pub const FONT_RESOURCE_NAME: &str = "FArab";

/// A parsed TrueType font with the metrics needed for layout and embedding.
///
/// Metrics and the character map are copied out of the face at load time, so
/// the value owns everything it needs and is cheap to share across threads.
#[derive(Debug, Clone)]
pub struct ArabicFont {
    data: Arc<Vec<u8>>,
    base_name: String,
    units_per_em: u16,
    ascent: i16,
    descent: i16,
    cap_height: i16,
    bbox: [i16; 4],
    glyphs: HashMap<char, u16>,
    advances: Vec<u16>,
}

impl ArabicFont {
    /// Load a font file. A missing file is reported as [`Error::FontMissing`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::FontMissing(path.display().to_string()));
        }
        let data = std::fs::read(path)?;
        let font = Self::from_bytes(data)?;
        tracing::debug!(
            "Loaded font {} from {} ({} glyphs mapped)",
            font.base_name,
            path.display(),
            font.glyphs.len()
        );
        Ok(font)
    }

    /// Parse a font already in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let face = Face::parse(&data, 0).map_err(|e| Error::FontParse(e.to_string()))?;

        let mut glyphs = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    if let (Some(c), Some(gid)) = (char::from_u32(cp), subtable.glyph_index(cp)) {
                        glyphs.entry(c).or_insert(gid.0);
                    }
                });
            }
        }

        let advances = (0..face.number_of_glyphs())
            .map(|gid| {
                face.glyph_hor_advance(ttf_parser::GlyphId(gid))
                    .unwrap_or(0)
            })
            .collect();

        let bbox = face.global_bounding_box();
        let base_name = postscript_name(&face).unwrap_or_else(|| "ArabicOverlay".to_string());
        let units_per_em = face.units_per_em();
        let ascent = face.ascender();
        let descent = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascent);

        Ok(Self {
            data: Arc::new(data),
            base_name,
            units_per_em,
            ascent,
            descent,
            cap_height,
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            glyphs,
            advances,
        })
    }

    /// Get the glyph ID for a character, falling back to .notdef (0) if not found.
    pub fn glyph_id(&self, c: char) -> u16 {
        self.glyphs.get(&c).copied().unwrap_or(0)
    }

    /// Whether the font has a real glyph for `c`.
    pub fn covers(&self, c: char) -> bool {
        self.glyph_id(c) != 0
    }

    /// Get the advance width of a glyph in font units.
    pub fn glyph_width(&self, glyph_id: u16) -> u16 {
        self.advances
            .get(usize::from(glyph_id))
            .copied()
            .unwrap_or(0)
    }

    pub const fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Width of `text` in PDF points at `font_size`.
    #[allow(clippy::cast_precision_loss)] // Precision loss acceptable for width calculations
    pub fn string_width(&self, text: &str, font_size: f32) -> f32 {
        let units_per_em = f32::from(self.units_per_em.max(1));
        let total_units: u32 = text
            .chars()
            .map(|c| u32::from(self.glyph_width(self.glyph_id(c))))
            .sum();
        total_units as f32 * font_size / units_per_em
    }

    /// Scale a font-unit width to PDF's 1000-unit system.
    fn scale_width(&self, width: u16) -> i64 {
        let units_per_em = i64::from(self.units_per_em.max(1));
        (i64::from(width) * 1000) / units_per_em
    }
}

/// PostScript name from the `name` table, reduced to characters valid in a PDF name.
fn postscript_name(face: &Face<'_>) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
        .find_map(|n| n.to_string())
        .map(|s| {
            s.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                .collect::<String>()
        })
        .filter(|s| !s.is_empty())
}

/// Writes one copy of a font into a document and tracks which glyphs use it.
///
/// The Type0 object id is reserved up front so pages can reference it while
/// text is still being encoded; [`FontEmbedder::finish`] writes the objects
/// once the set of used glyphs is known.
pub struct FontEmbedder<'f> {
    font: &'f ArabicFont,
    type0_id: ObjectId,
    used: BTreeMap<u16, char>,
}

impl<'f> FontEmbedder<'f> {
    pub fn new(font: &'f ArabicFont, doc: &mut Document) -> Self {
        Self {
            font,
            type0_id: doc.new_object_id(),
            used: BTreeMap::new(),
        }
    }

    pub const fn font(&self) -> &'f ArabicFont {
        self.font
    }

    /// Object id of the Type0 font dictionary
    pub const fn font_id(&self) -> ObjectId {
        self.type0_id
    }

    /// Encode text as a hex string of glyph IDs (without angle brackets)
    /// and record each glyph for the width table and ToUnicode map.
    pub fn encode(&mut self, text: &str) -> String {
        text.chars().fold(String::new(), |mut acc, c| {
            let gid = self.font.glyph_id(c);
            if gid != 0 {
                self.used.entry(gid).or_insert(c);
            }
            let _ = write!(acc, "{gid:04X}");
            acc
        })
    }

    /// Number of distinct glyphs encoded so far
    pub fn used_glyphs(&self) -> usize {
        self.used.len()
    }

    /// Write the font objects. Does nothing if no glyph was ever encoded.
    pub fn finish(self, doc: &mut Document) {
        if self.used.is_empty() {
            return;
        }
        let font_file_id = self.create_font_file(doc);
        let descriptor_id = self.create_font_descriptor(doc, font_file_id);
        let cid_font_id = self.create_cid_font(doc, descriptor_id);
        let to_unicode_id = self.create_to_unicode_cmap(doc);

        let type0 = Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type0".to_vec())),
            ("BaseFont", Object::Name(self.font.base_name.as_bytes().to_vec())),
            ("Encoding", Object::Name(b"Identity-H".to_vec())),
            ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)])),
            ("ToUnicode", Object::Reference(to_unicode_id)),
        ]);
        doc.set_object(self.type0_id, Object::Dictionary(type0));

        tracing::debug!(
            "Embedded {} with {} used glyphs",
            self.font.base_name,
            self.used.len()
        );
    }

    /// Create the FontFile2 stream containing the raw TrueType data.
    #[allow(clippy::cast_possible_wrap)] // Font size always fits in i64
    fn create_font_file(&self, doc: &mut Document) -> ObjectId {
        let mut dict = Dictionary::new();
        dict.set("Length1", Object::Integer(self.font.data.len() as i64));

        let stream = Stream::new(dict, self.font.data.to_vec()).with_compression(true);
        doc.add_object(Object::Stream(stream))
    }

    fn create_font_descriptor(&self, doc: &mut Document, font_file_id: ObjectId) -> ObjectId {
        let font = self.font;
        let dict = Dictionary::from_iter([
            ("Type", Object::Name(b"FontDescriptor".to_vec())),
            ("FontName", Object::Name(font.base_name.as_bytes().to_vec())),
            ("Flags", Object::Integer(32)), // Nonsymbolic
            (
                "FontBBox",
                Object::Array(font.bbox.iter().map(|v| Object::Integer(i64::from(*v))).collect()),
            ),
            ("ItalicAngle", Object::Integer(0)),
            ("Ascent", Object::Integer(i64::from(font.ascent))),
            ("Descent", Object::Integer(i64::from(font.descent))),
            ("CapHeight", Object::Integer(i64::from(font.cap_height))),
            ("StemV", Object::Integer(80)),
            ("FontFile2", Object::Reference(font_file_id)),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }

    fn create_cid_font(&self, doc: &mut Document, descriptor_id: ObjectId) -> ObjectId {
        let default_width = self.font.scale_width(self.font.glyph_width(self.font.glyph_id(' ')));

        let dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
            ("BaseFont", Object::Name(self.font.base_name.as_bytes().to_vec())),
            (
                "CIDSystemInfo",
                Object::Dictionary(Dictionary::from_iter([
                    ("Registry", Object::String(b"Adobe".to_vec(), StringFormat::Literal)),
                    ("Ordering", Object::String(b"Identity".to_vec(), StringFormat::Literal)),
                    ("Supplement", Object::Integer(0)),
                ])),
            ),
            ("FontDescriptor", Object::Reference(descriptor_id)),
            ("DW", Object::Integer(default_width)),
            ("W", Object::Array(self.build_widths_array())),
            ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
        ]);

        doc.add_object(Object::Dictionary(dict))
    }

    /// W array for the used glyphs: `[gid [w1 w2 ...]]` per run of consecutive ids.
    fn build_widths_array(&self) -> Vec<Object> {
        let mut result = Vec::new();
        let mut iter = self.used.keys().copied().peekable();

        while let Some(first_gid) = iter.next() {
            let mut widths = vec![Object::Integer(
                self.font.scale_width(self.font.glyph_width(first_gid)),
            )];
            let mut expected_next = first_gid.saturating_add(1);

            while let Some(&gid) = iter.peek() {
                if gid != expected_next {
                    break;
                }
                widths.push(Object::Integer(self.font.scale_width(self.font.glyph_width(gid))));
                expected_next = gid.saturating_add(1);
                iter.next();
            }

            result.push(Object::Integer(i64::from(first_gid)));
            result.push(Object::Array(widths));
        }

        result
    }

    /// ToUnicode CMap with one `bfchar` entry per used glyph.
    fn create_to_unicode_cmap(&self, doc: &mut Document) -> ObjectId {
        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo <<
  /Registry (Adobe)
  /Ordering (UCS)
  /Supplement 0
>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
",
        );

        let entries: Vec<(u16, char)> = self.used.iter().map(|(g, c)| (*g, *c)).collect();
        // bfchar blocks hold at most 100 entries
        for chunk in entries.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for (gid, c) in chunk {
                let mut units = [0u16; 2];
                let utf16: String = c
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{u:04X}"))
                    .collect();
                let _ = writeln!(cmap, "<{gid:04X}> <{utf16}>");
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str(
            "endcmap
CMapName currentdict /CMap defineresource pop
end
end",
        );

        let stream = Stream::new(Dictionary::new(), cmap.into_bytes());
        doc.add_object(Object::Stream(stream))
    }
}

/// Add `font_id` to a page's `/Resources /Font` under [`FONT_RESOURCE_NAME`].
///
/// Handles both inline Resources dictionaries and indirect references. The
/// updated Resources are written back inline so pages that shared a
/// Resources object do not see each other's changes.
pub fn register_page_font(doc: &mut Document, page_id: ObjectId, font_id: ObjectId) -> Result<()> {
    let mut resources = resolve_resources(doc, page_id)?;

    let mut fonts = resources
        .get(b"Font")
        .ok()
        .and_then(|obj| resolve_dict_object(doc, obj))
        .unwrap_or_else(Dictionary::new);

    fonts.set(FONT_RESOURCE_NAME, Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
    if let Object::Dictionary(page_dict) = page {
        page_dict.set("Resources", Object::Dictionary(resources));
    }
    Ok(())
}

/// Resolve the Resources dictionary for a page, handling indirect references
/// and inheritance from parent Pages nodes.
pub fn resolve_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let page = doc
        .get_object(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

    if let Object::Dictionary(page_dict) = page {
        if let Some(dict) = page_dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve_dict_object(doc, obj))
        {
            return Ok(dict);
        }
        if let Some(dict) = page_dict
            .get(b"Parent")
            .ok()
            .and_then(|parent| resolve_inherited(doc, parent, b"Resources", 10))
            .and_then(|obj| resolve_dict_object(doc, &obj))
        {
            return Ok(dict);
        }
    }

    Ok(Dictionary::new())
}

/// Resolve an object that should be a Dictionary (handles References).
pub fn resolve_dict_object(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(ref_id) => match doc.get_object(*ref_id) {
            Ok(Object::Dictionary(d)) => Some(d.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Walk up the Pages tree looking for an inheritable attribute.
///
/// `depth` bounds the walk so circular Parent references terminate.
pub fn resolve_inherited(
    doc: &Document,
    parent_obj: &Object,
    key: &[u8],
    depth: usize,
) -> Option<Object> {
    if depth == 0 {
        return None;
    }
    let Object::Reference(parent_id) = parent_obj else {
        return None;
    };
    let Ok(Object::Dictionary(parent)) = doc.get_object(*parent_id) else {
        return None;
    };

    if let Ok(value) = parent.get(key) {
        return Some(value.clone());
    }
    parent
        .get(b"Parent")
        .ok()
        .and_then(|grandparent| resolve_inherited(doc, grandparent, key, depth - 1))
}
