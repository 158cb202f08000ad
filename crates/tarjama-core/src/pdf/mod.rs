mod assembly;
mod document;
mod font;
mod page_index;
mod spans;
pub mod overlay;

pub use assembly::{AssembledDocument, PageAssembler, PagePlan};
pub use document::PdfDocument;
pub use font::{ArabicFont, FONT_RESOURCE_NAME, FontEmbedder};
pub use overlay::{OverlayRenderer, RenderReport, SpanOverlay};
pub use page_index::PageIndex;
pub use spans::{BoundingBox, Point, SpanExtractor, TextSpan};
