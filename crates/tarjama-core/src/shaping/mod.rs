//! Arabic text preparation for PDF output.
//!
//! PDF viewers draw a `Tj` string glyph by glyph from left to right, with no
//! shaping or bidi of their own. Translated text therefore goes through two
//! steps before it is encoded:
//! 1. [`reshape`]: pick contextual letter forms and ligatures
//! 2. [`reorder_visual`]: lay the shaped text out in visual order

mod bidi;
mod reshape;

pub use bidi::reorder_visual;
pub use reshape::{is_harakat, reshape};

/// Shape and reorder `text` so it can be drawn left-to-right as-is.
pub fn shape_for_display(text: &str, keep_harakat: bool) -> String {
    reorder_visual(&reshape(text, keep_harakat))
}
