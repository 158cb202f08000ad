use mupdf::TextPageOptions;

use super::document::PdfDocument;
use super::page_index::PageIndex;
use crate::error::{Error, Result};

/// Bounding box in mupdf page space (origin top-left, y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// All four coordinates are finite and the box has positive area.
    pub fn is_valid(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite()) && self.width() > 0.0 && self.height() > 0.0
    }

    pub const fn as_array(self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }

    /// Smallest box containing both
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Create from mupdf Quad (4 points defining a quadrilateral)
    pub const fn from_quad(quad: &mupdf::Quad) -> Self {
        let x0 = quad.ul.x.min(quad.ur.x).min(quad.ll.x).min(quad.lr.x);
        let y0 = quad.ul.y.min(quad.ur.y).min(quad.ll.y).min(quad.lr.y);
        let x1 = quad.ul.x.max(quad.ur.x).max(quad.ll.x).max(quad.lr.x);
        let y1 = quad.ul.y.max(quad.ur.y).max(quad.ll.y).max(quad.lr.y);
        Self { x0, y0, x1, y1 }
    }
}

/// Baseline origin of a span, same space as [`BoundingBox`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// A run of characters sharing one font size on one line.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub bbox: BoundingBox,
    pub origin: Point,
    pub font_size: f32,
    pub text: String,
}

/// One glyph as reported by mupdf, detached from the text page.
#[derive(Debug, Clone, Copy)]
struct CharInfo {
    c: char,
    bbox: BoundingBox,
    origin: Point,
    size: f32,
}

/// Chars whose sizes differ by less than this belong to the same span
const SIZE_EPSILON: f32 = 0.01;

/// Span extraction from PDF pages
pub struct SpanExtractor<'a> {
    doc: &'a PdfDocument,
}

impl<'a> SpanExtractor<'a> {
    pub const fn new(doc: &'a PdfDocument) -> Self {
        Self { doc }
    }

    /// Extract the text spans of a page in reading order.
    ///
    /// Whitespace-only spans are dropped. Spans are never merged across
    /// lines, so each keeps its own baseline.
    pub fn extract_spans(&self, page_num: usize) -> Result<Vec<TextSpan>> {
        let page_index = PageIndex::try_from_page_num(page_num, self.doc.page_count())?;

        let doc = self.doc.open_document()?;
        let page = doc
            .load_page(page_index.into())
            .map_err(|e| Error::PdfTextExtraction {
                page: page_num,
                reason: format!("Failed to load page: {e}"),
            })?;

        let text_page = page
            .to_text_page(TextPageOptions::empty())
            .map_err(|e| Error::PdfTextExtraction {
                page: page_num,
                reason: format!("Failed to get text page: {e}"),
            })?;

        let mut spans = Vec::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                let chars = line.chars().filter_map(|ch| {
                    ch.char().map(|c| {
                        let origin = ch.origin();
                        CharInfo {
                            c,
                            bbox: BoundingBox::from_quad(&ch.quad()),
                            origin: Point {
                                x: origin.x,
                                y: origin.y,
                            },
                            size: ch.size(),
                        }
                    })
                });
                spans.extend(group_line(chars));
            }
        }

        tracing::debug!("Page {}: extracted {} spans", page_num, spans.len());
        Ok(spans)
    }
}

/// Split one line into spans at font size changes.
fn group_line(chars: impl IntoIterator<Item = CharInfo>) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    let mut current: Option<TextSpan> = None;

    for ch in chars {
        match current.as_mut() {
            Some(span) if (span.font_size - ch.size).abs() < SIZE_EPSILON => {
                span.text.push(ch.c);
                span.bbox = span.bbox.union(ch.bbox);
            }
            _ => {
                if let Some(done) = current.take() {
                    push_non_blank(&mut spans, done);
                }
                current = Some(TextSpan {
                    bbox: ch.bbox,
                    origin: ch.origin,
                    font_size: ch.size,
                    text: ch.c.to_string(),
                });
            }
        }
    }
    if let Some(done) = current {
        push_non_blank(&mut spans, done);
    }
    spans
}

fn push_non_blank(spans: &mut Vec<TextSpan>, span: TextSpan) {
    if !span.text.trim().is_empty() {
        spans.push(span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(c: char, x: f32, size: f32) -> CharInfo {
        CharInfo {
            c,
            bbox: BoundingBox::new(x, 100.0 - size, x + size * 0.5, 100.0),
            origin: Point { x, y: 98.0 },
            size,
        }
    }

    #[test]
    fn test_union() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, -2.0, 12.0, 8.0);
        assert_eq!(a.union(b), BoundingBox::new(0.0, -2.0, 12.0, 10.0));
    }

    #[test]
    fn test_invalid_boxes() {
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!BoundingBox::new(0.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!BoundingBox::new(f32::NAN, 0.0, 1.0, 1.0).is_valid());
    }

    #[test]
    fn test_group_line_splits_on_size_change() {
        let chars = [
            ch('A', 10.0, 12.0),
            ch('b', 16.0, 12.0),
            ch('C', 22.0, 18.0),
            ch('d', 31.0, 18.0),
        ];
        let spans = group_line(chars);

        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "Ab");
        assert!((spans[0].font_size - 12.0).abs() < f32::EPSILON);
        assert!((spans[0].bbox.x0 - 10.0).abs() < f32::EPSILON);
        assert!((spans[0].bbox.x1 - 22.0).abs() < f32::EPSILON);
        assert_eq!(spans[1].text, "Cd");
        assert!((spans[1].origin.x - 22.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_group_line_drops_whitespace_spans() {
        let chars = [
            ch(' ', 0.0, 9.0),
            ch(' ', 4.0, 9.0),
            ch('x', 8.0, 11.0),
        ];
        let spans = group_line(chars);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "x");
    }

    #[test]
    fn test_group_line_empty() {
        assert!(group_line(std::iter::empty()).is_empty());
    }
}
