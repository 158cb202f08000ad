//! Logical to visual reordering with the Unicode Bidirectional Algorithm.

use unicode_bidi::BidiInfo;

/// Mirror image of a paired punctuation mark, for glyphs inside RTL runs.
const fn mirrored(c: char) -> char {
    match c {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        '«' => '»',
        '»' => '«',
        '‹' => '›',
        '›' => '‹',
        _ => c,
    }
}

/// Reorder `text` from logical order into left-to-right display order.
///
/// The paragraph direction comes from the first strong character. Each
/// right-to-left run is reversed and its brackets mirrored; left-to-right
/// runs such as Latin words and digits keep their internal order.
pub fn reorder_visual(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let info = BidiInfo::new(text, None);
    let mut out = String::with_capacity(text.len());

    for para in &info.paragraphs {
        let (levels, runs) = info.visual_runs(para, para.range.clone());
        for run in runs {
            let slice = &text[run.clone()];
            if levels[run.start].is_rtl() {
                out.extend(slice.chars().rev().map(mirrored));
            } else {
                out.push_str(slice);
            }
        }
    }
    out
}
