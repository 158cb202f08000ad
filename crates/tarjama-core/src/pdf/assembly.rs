//! Output page assembly.
//!
//! Works on a single lopdf document: translated copies are new page objects
//! that share content streams with their source page, and the page tree is
//! rebuilt flat in the order the layout asks for.

use lopdf::{Dictionary, Document, Object, ObjectId};

use super::document::PdfDocument;
use super::font::{ArabicFont, FontEmbedder, resolve_inherited};
use super::overlay::{OverlayRenderer, RenderReport, SpanOverlay};
use super::page_index::PageIndex;
use crate::config::{Canvas, PageLayout, RenderConfig};
use crate::error::{Error, Result};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Attributes a blank canvas takes over from its source page
const PAGE_GEOMETRY: [&[u8]; 3] = [b"MediaBox", b"CropBox", b"Rotate"];

/// Translated spans for one source page (0-based page number).
#[derive(Debug, Clone)]
pub struct PagePlan {
    pub page_num: usize,
    pub overlays: Vec<SpanOverlay>,
}

/// Output of [`PageAssembler::assemble`].
#[derive(Debug)]
pub struct AssembledDocument {
    pub pdf_bytes: Vec<u8>,
    /// One report per plan, in plan order
    pub reports: Vec<RenderReport>,
    pub page_count: usize,
}

/// Builds the output document from per-page overlays.
pub struct PageAssembler<'a> {
    font: &'a ArabicFont,
    render: &'a RenderConfig,
    layout: PageLayout,
    canvas: Canvas,
}

impl<'a> PageAssembler<'a> {
    pub const fn new(
        font: &'a ArabicFont,
        render: &'a RenderConfig,
        layout: PageLayout,
        canvas: Canvas,
    ) -> Self {
        Self {
            font,
            render,
            layout,
            canvas,
        }
    }

    /// Render every plan and save the result.
    ///
    /// Pages without a plan are left out of the output. Any error here aborts
    /// the whole document; only per-span failures are tolerated (inside the
    /// overlay renderer).
    pub fn assemble(&self, source: &PdfDocument, plans: &[PagePlan]) -> Result<AssembledDocument> {
        let mut doc = source.load_editable()?;
        let pages = doc.get_pages();

        for &page_id in pages.values() {
            materialize_inherited(&mut doc, page_id)?;
        }

        let renderer = OverlayRenderer::new(self.render);
        let mut embedder = FontEmbedder::new(self.font, &mut doc);

        let mut originals = Vec::with_capacity(plans.len());
        let mut translations = Vec::with_capacity(plans.len());
        let mut reports = Vec::with_capacity(plans.len());

        for plan in plans {
            let index = PageIndex::try_from_page_num(plan.page_num, pages.len())?;
            let page_id = *pages
                .get(&index.as_lopdf_page_number())
                .ok_or(Error::PdfInvalidPage {
                    page: plan.page_num,
                    total: pages.len(),
                })?;

            let report = match self.layout {
                PageLayout::Overwrite => {
                    originals.push(page_id);
                    renderer.render_page(&mut doc, page_id, &plan.overlays, &mut embedder, true)?
                }
                PageLayout::Interleaved | PageLayout::Appended => {
                    let copy_id = match self.canvas {
                        Canvas::Original => copy_page(&mut doc, page_id)?,
                        Canvas::Blank => blank_page_like(&mut doc, page_id)?,
                    };
                    originals.push(page_id);
                    translations.push(copy_id);
                    let blank_original = self.canvas == Canvas::Original;
                    renderer.render_page(
                        &mut doc,
                        copy_id,
                        &plan.overlays,
                        &mut embedder,
                        blank_original,
                    )?
                }
            };

            tracing::debug!(
                "Page {}: rendered {} spans, skipped {}",
                plan.page_num,
                report.rendered,
                report.skipped
            );
            reports.push(report);
        }

        let order = output_order(self.layout, &originals, &translations);
        rebuild_page_tree(&mut doc, &order)?;
        embedder.finish(&mut doc);
        let pruned = doc.prune_objects();
        tracing::debug!("Dropped {} unreferenced objects", pruned.len());

        let mut pdf_bytes = Vec::new();
        doc.save_to(&mut pdf_bytes)
            .map_err(|e| Error::PdfSave(format!("Failed to save PDF: {e}")))?;

        Ok(AssembledDocument {
            pdf_bytes,
            reports,
            page_count: order.len(),
        })
    }
}

/// Final page order for a layout.
fn output_order(
    layout: PageLayout,
    originals: &[ObjectId],
    translations: &[ObjectId],
) -> Vec<ObjectId> {
    match layout {
        PageLayout::Overwrite => originals.to_vec(),
        PageLayout::Interleaved => originals
            .iter()
            .zip(translations)
            .flat_map(|(o, t)| [*o, *t])
            .collect(),
        PageLayout::Appended => originals.iter().chain(translations).copied().collect(),
    }
}

/// Copy inherited attributes onto the page itself so it can be re-parented.
fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

    let Ok(parent) = page.get(b"Parent") else {
        return Ok(());
    };
    let inherited: Vec<(&[u8], Object)> = INHERITABLE
        .into_iter()
        .filter(|key| page.get(key).is_err())
        .filter_map(|key| resolve_inherited(doc, parent, key, 10).map(|value| (key, value)))
        .collect();

    if inherited.is_empty() {
        return Ok(());
    }
    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
    for (key, value) in inherited {
        page.set(key.to_vec(), value);
    }
    Ok(())
}

/// Duplicate a page object; content streams are shared, annotations are not copied.
fn copy_page(doc: &mut Document, page_id: ObjectId) -> Result<ObjectId> {
    let mut dict = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::PdfAssembly(format!("Failed to copy page: {e}")))?
        .clone();
    dict.remove(b"Annots");
    Ok(doc.add_object(Object::Dictionary(dict)))
}

/// New empty page with the same boxes and rotation as `page_id`.
fn blank_page_like(doc: &mut Document, page_id: ObjectId) -> Result<ObjectId> {
    let source = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::PdfAssembly(format!("Failed to read page: {e}")))?;

    let mut dict = Dictionary::from_iter([
        ("Type", Object::Name(b"Page".to_vec())),
        ("Resources", Object::Dictionary(Dictionary::new())),
    ]);
    for key in PAGE_GEOMETRY {
        if let Ok(value) = source.get(key) {
            dict.set(key.to_vec(), value.clone());
        }
    }
    Ok(doc.add_object(Object::Dictionary(dict)))
}

/// Replace the page tree with a single flat Pages node listing `order`.
fn rebuild_page_tree(doc: &mut Document, order: &[ObjectId]) -> Result<()> {
    let pages_id = doc
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| Error::PdfAssembly(format!("Missing page tree root: {e}")))?;

    for &page_id in order {
        let page = doc
            .get_dictionary_mut(page_id)
            .map_err(|e| Error::PdfAssembly(format!("Failed to update page: {e}")))?;
        page.set("Parent", Object::Reference(pages_id));
    }

    let kids = order.iter().map(|id| Object::Reference(*id)).collect();
    let count = i64::try_from(order.len())
        .map_err(|_| Error::PdfAssembly("too many pages".to_string()))?;

    let root = doc
        .get_dictionary_mut(pages_id)
        .map_err(|e| Error::PdfAssembly(format!("Failed to update page tree: {e}")))?;
    root.set("Kids", Object::Array(kids));
    root.set("Count", Object::Integer(count));
    root.remove(b"Parent");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::spans::{BoundingBox, Point, TextSpan};
    use crate::test_support::{minimal_font, multi_page_pdf, page_contents};

    fn plan(page_num: usize, translated: &str) -> PagePlan {
        PagePlan {
            page_num,
            overlays: vec![SpanOverlay {
                span: TextSpan {
                    bbox: BoundingBox::new(100.0, 70.0, 160.0, 95.0),
                    origin: Point { x: 100.0, y: 92.0 },
                    font_size: 24.0,
                    text: format!("Page {}", page_num + 1),
                },
                translated: translated.to_string(),
            }],
        }
    }

    fn assemble(
        layout: PageLayout,
        canvas: Canvas,
        plans: &[PagePlan],
    ) -> (Document, AssembledDocument) {
        let font = ArabicFont::from_bytes(minimal_font()).unwrap();
        let render = RenderConfig::default();
        let source = PdfDocument::from_bytes(multi_page_pdf(3)).unwrap();
        let out = PageAssembler::new(&font, &render, layout, canvas)
            .assemble(&source, plans)
            .unwrap();
        let doc = Document::load_mem(&out.pdf_bytes).unwrap();
        (doc, out)
    }

    fn page_texts(doc: &Document) -> Vec<bool> {
        // true when the page still carries its Helvetica source text
        doc.get_pages()
            .values()
            .map(|id| {
                page_contents(doc, *id).iter().any(|op| {
                    op.operator == "Tf" && op.operands[0].as_name().is_ok_and(|n| n == b"F1")
                })
            })
            .collect()
    }

    #[test]
    fn test_output_order() {
        let o = [(1, 0), (2, 0)];
        let t = [(10, 0), (20, 0)];
        assert_eq!(output_order(PageLayout::Overwrite, &o, &t), vec![(1, 0), (2, 0)]);
        assert_eq!(
            output_order(PageLayout::Interleaved, &o, &t),
            vec![(1, 0), (10, 0), (2, 0), (20, 0)]
        );
        assert_eq!(
            output_order(PageLayout::Appended, &o, &t),
            vec![(1, 0), (2, 0), (10, 0), (20, 0)]
        );
    }

    #[test]
    fn test_overwrite_keeps_page_count() {
        let plans: Vec<_> = (0..3).map(|i| plan(i, "صفحة")).collect();
        let (doc, out) = assemble(PageLayout::Overwrite, Canvas::Original, &plans);
        assert_eq!(doc.get_pages().len(), 3);
        assert_eq!(out.page_count, 3);
        assert!(out.reports.iter().all(|r| r.rendered == 1));
    }

    #[test]
    fn test_interleaved_doubles_pages() {
        let plans: Vec<_> = (0..3).map(|i| plan(i, "صفحة")).collect();
        let (doc, _) = assemble(PageLayout::Interleaved, Canvas::Blank, &plans);
        assert_eq!(doc.get_pages().len(), 6);
        assert_eq!(page_texts(&doc), vec![true, false, true, false, true, false]);
    }

    #[test]
    fn test_appended_puts_translations_last() {
        let plans: Vec<_> = (0..3).map(|i| plan(i, "صفحة")).collect();
        let (doc, _) = assemble(PageLayout::Appended, Canvas::Blank, &plans);
        assert_eq!(page_texts(&doc), vec![true, true, true, false, false, false]);
    }

    #[test]
    fn test_original_canvas_copy_keeps_source_content() {
        let plans = [plan(0, "صفحة")];
        let (doc, _) = assemble(PageLayout::Interleaved, Canvas::Original, &plans);
        assert_eq!(doc.get_pages().len(), 2);
        let ids: Vec<_> = doc.get_pages().values().copied().collect();
        // Copy has the source text plus a blanking rectangle over it
        let copy_ops = page_contents(&doc, ids[1]);
        assert!(copy_ops.iter().any(|op| op.operator == "re"));
        // The original stays untouched
        let original_ops = page_contents(&doc, ids[0]);
        assert!(!original_ops.iter().any(|op| op.operator == "re"));
    }

    #[test]
    fn test_page_selection_drops_unselected() {
        let plans = [plan(2, "ثلاثة")];
        let (doc, out) = assemble(PageLayout::Overwrite, Canvas::Original, &plans);
        assert_eq!(doc.get_pages().len(), 1);
        assert_eq!(out.reports.len(), 1);
    }

    #[test]
    fn test_invalid_page_is_error() {
        let font = ArabicFont::from_bytes(minimal_font()).unwrap();
        let render = RenderConfig::default();
        let source = PdfDocument::from_bytes(multi_page_pdf(1)).unwrap();
        let result = PageAssembler::new(&font, &render, PageLayout::Overwrite, Canvas::Original)
            .assemble(&source, &[plan(5, "x")]);
        assert!(matches!(result, Err(Error::PdfInvalidPage { page: 5, total: 1 })));
    }
}
