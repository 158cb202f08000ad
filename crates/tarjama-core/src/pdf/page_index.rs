//! Checked page index shared by the mupdf (0-based `i32`) and lopdf
//! (1-based `u32`) sides of the pipeline.

use std::fmt;

use crate::error::Error;

/// A page index validated against a document's page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageIndex(i32);

impl PageIndex {
    /// Validate a 0-based page number against `total_pages`.
    pub fn try_from_page_num(page_num: usize, total_pages: usize) -> Result<Self, Error> {
        let out_of_range = || Error::PdfInvalidPage {
            page: page_num,
            total: total_pages,
        };

        if page_num >= total_pages {
            return Err(out_of_range());
        }
        i32::try_from(page_num).map(Self).map_err(|_| out_of_range())
    }

    /// 0-based index as used by `mupdf::Document::load_page`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// 1-based page number as used by `lopdf::Document::get_pages`.
    #[must_use]
    pub const fn as_lopdf_page_number(self) -> u32 {
        // Non-negative by construction
        (self.0 + 1).cast_unsigned()
    }
}

impl From<PageIndex> for i32 {
    fn from(index: PageIndex) -> Self {
        index.0
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
