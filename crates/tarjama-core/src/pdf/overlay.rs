//! PDF overlay generation for translated spans.
//!
//! Each span is drawn as a single line at its original baseline. On a copy
//! of the original page the source text is first covered with an opaque
//! rectangle; on a blank canvas only the text is drawn.

use std::fmt::Write;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::font::{FONT_RESOURCE_NAME, FontEmbedder, register_page_font, resolve_inherited};
use super::spans::TextSpan;
use crate::config::{RenderConfig, TextAlign};
use crate::error::{Error, Result};
use crate::shaping::shape_for_display;

/// US Letter, used when a page has no usable box
const DEFAULT_PAGE_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// A span together with the text that replaces it.
#[derive(Debug, Clone)]
pub struct SpanOverlay {
    pub span: TextSpan,
    pub translated: String,
}

/// Outcome of rendering one page's overlays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub rendered: usize,
    pub skipped: usize,
}

/// A span converted to PDF user space and encoded for the overlay font.
#[derive(Debug, Clone)]
struct PreparedSpan {
    /// Blanking rectangle: x, y, width, height
    rect: [f32; 4],
    text_x: f32,
    baseline_y: f32,
    font_size: f32,
    hex_glyphs: String,
}

/// Draws translated spans onto pages of a lopdf document.
pub struct OverlayRenderer<'a> {
    config: &'a RenderConfig,
}

impl<'a> OverlayRenderer<'a> {
    pub const fn new(config: &'a RenderConfig) -> Self {
        Self { config }
    }

    /// Render `overlays` onto `page_id`.
    ///
    /// `blank_original` draws the fill rectangles over the source text; it is
    /// off for blank canvases. A span that cannot be rendered is logged and
    /// counted as skipped, the rest of the page is still drawn.
    pub fn render_page(
        &self,
        doc: &mut Document,
        page_id: ObjectId,
        overlays: &[SpanOverlay],
        embedder: &mut FontEmbedder<'_>,
        blank_original: bool,
    ) -> Result<RenderReport> {
        let page_box = page_box(doc, page_id);

        let mut report = RenderReport::default();
        let mut prepared = Vec::with_capacity(overlays.len());
        for (i, overlay) in overlays.iter().enumerate() {
            match self.prepare(overlay, page_box, embedder) {
                Ok(span) => prepared.push(span),
                Err(e) => {
                    tracing::warn!("Skipping span {} ({:?}): {}", i, overlay.span.text, e);
                    report.skipped += 1;
                }
            }
        }
        report.rendered = prepared.len();

        if prepared.is_empty() {
            return Ok(report);
        }

        register_page_font(doc, page_id, embedder.font_id())?;
        let content = self.create_overlay_content(&prepared, blank_original);
        append_content_to_page(doc, page_id, content.into_bytes())?;

        Ok(report)
    }

    /// Lay out one span. Errors here only ever skip the span.
    fn prepare(
        &self,
        overlay: &SpanOverlay,
        page_box: [f32; 4],
        embedder: &mut FontEmbedder<'_>,
    ) -> Result<PreparedSpan> {
        let span = &overlay.span;
        if !span.bbox.is_valid() || !span.origin.x.is_finite() || !span.origin.y.is_finite() {
            return Err(Error::SpanRender(format!(
                "degenerate geometry {:?}",
                span.bbox.as_array()
            )));
        }
        if !(span.font_size.is_finite() && span.font_size > 0.0) {
            return Err(Error::SpanRender(format!(
                "invalid font size {}",
                span.font_size
            )));
        }

        let shaped = shape_for_display(overlay.translated.trim(), self.config.keep_harakat);
        let font = embedder.font();
        if !shaped
            .chars()
            .any(|c| !c.is_whitespace() && font.covers(c))
        {
            return Err(Error::SpanRender("no glyph in the overlay font".to_string()));
        }

        let [box_x0, _, _, box_top] = page_box;
        let x0 = box_x0 + span.bbox.x0;
        let x1 = box_x0 + span.bbox.x1;
        let bottom = box_top - span.bbox.y1;
        let baseline_y = box_top - span.origin.y;

        let box_width = span.bbox.width();
        let mut font_size = span.font_size;
        let mut text_width = font.string_width(&shaped, font_size);
        if self.config.fit_to_box && text_width > box_width && text_width > 0.0 {
            let scale = (box_width / text_width).max(self.config.min_font_scale);
            font_size *= scale;
            text_width *= scale;
        }

        let text_x = match self.config.align {
            TextAlign::Start => x0,
            TextAlign::End => x1 - text_width,
        };

        let pad = self.config.padding;
        Ok(PreparedSpan {
            rect: [
                x0 - pad,
                bottom - pad,
                box_width + 2.0 * pad,
                span.bbox.height() + 2.0 * pad,
            ],
            text_x,
            baseline_y,
            font_size,
            hex_glyphs: embedder.encode(&shaped),
        })
    }

    /// Build the overlay content stream.
    fn create_overlay_content(&self, spans: &[PreparedSpan], blank_original: bool) -> String {
        let mut content = String::new();

        content.push_str("q\n");

        // All rectangles first so no blanking covers a neighbour's text
        if blank_original {
            let _ = writeln!(content, "{} rg", self.config.fill_color.to_pdf_operands());
            for span in spans {
                let [x, y, w, h] = span.rect;
                let _ = writeln!(content, "{x:.2} {y:.2} {w:.2} {h:.2} re f");
            }
        }

        let _ = writeln!(content, "{} rg", self.config.text_color.to_pdf_operands());
        // Fill mode; OCR layers often leave invisible mode (3) set
        content.push_str("0 Tr\n");

        for span in spans {
            content.push_str("BT\n");
            let _ = writeln!(content, "/{FONT_RESOURCE_NAME} {:.2} Tf", span.font_size);
            let _ = writeln!(content, "{:.2} {:.2} Td", span.text_x, span.baseline_y);
            let _ = writeln!(content, "<{}> Tj", span.hex_glyphs);
            content.push_str("ET\n");
        }

        content.push_str("Q\n");
        content
    }
}

/// Append an overlay content stream to a page.
///
/// Existing content is bracketed by `q`/`Q` first so a transformation or
/// color left set by the original stream does not leak into the overlay.
fn append_content_to_page(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let existing: Vec<Object> = {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
        match page.get(b"Contents").ok() {
            Some(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Some(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    };

    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), content));
    let mut contents = Vec::with_capacity(existing.len() + 3);
    if !existing.is_empty() {
        let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
        contents.push(Object::Reference(save_id));
        contents.extend(existing);
        contents.push(Object::Reference(restore_id));
    }
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
    if let Object::Dictionary(dict) = page {
        dict.set("Contents", Object::Array(contents));
    }
    Ok(())
}

/// Visible page box: CropBox if present, else MediaBox, following inheritance.
pub fn page_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return DEFAULT_PAGE_BOX;
    };

    let lookup = |key: &[u8]| {
        page.get(key)
            .ok()
            .cloned()
            .or_else(|| {
                page.get(b"Parent")
                    .ok()
                    .and_then(|parent| resolve_inherited(doc, parent, key, 10))
            })
            .and_then(|obj| rect_from_object(doc, &obj))
    };

    lookup(b"CropBox")
        .or_else(|| lookup(b"MediaBox"))
        .unwrap_or(DEFAULT_PAGE_BOX)
}

/// Read a `[x0 y0 x1 y1]` array (direct or referenced), normalised so x0 < x1, y0 < y1.
pub fn rect_from_object(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let arr = match obj {
        Object::Array(arr) => arr,
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(arr)) => arr,
            _ => return None,
        },
        _ => return None,
    };
    if arr.len() != 4 {
        return None;
    }

    let values: Vec<f32> = arr
        .iter()
        .filter_map(|o| match o {
            #[allow(clippy::cast_precision_loss)]
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        })
        .collect();
    if values.len() != 4 {
        return None;
    }

    Some([
        values[0].min(values[2]),
        values[1].min(values[3]),
        values[0].max(values[2]),
        values[1].max(values[3]),
    ])
}
