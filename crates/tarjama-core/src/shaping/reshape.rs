//! Contextual shaping of Arabic script into presentation forms.
//!
//! PDF text operators place glyphs exactly as given, so connected letter
//! forms have to be chosen before the text reaches the content stream.
//! Letters are mapped to the Arabic Presentation Forms blocks according to
//! their neighbours, and lam followed by an alef variant becomes a single
//! ligature.

/// How a letter connects to its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joining {
    /// Connects on both sides; forms are `base`, `base+1`, `base+2`, `base+3`
    /// (isolated, final, initial, medial)
    Dual(u32),
    /// Connects only to the preceding letter; forms are `base`, `base+1`
    Right(u32),
    /// Joins both sides but has no forms of its own (tatweel, ZWJ)
    Causing,
    /// Arabic letter that never connects (hamza)
    NonJoining(u32),
}

impl Joining {
    const fn joins_next(self) -> bool {
        matches!(self, Self::Dual(_) | Self::Causing)
    }

    const fn joins_prev(self) -> bool {
        !matches!(self, Self::NonJoining(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Isolated,
    Final,
    Initial,
    Medial,
}

const LAM: char = '\u{0644}';

fn joining(c: char) -> Option<Joining> {
    use Joining::{Causing, Dual, NonJoining, Right};

    let joining = match c {
        '\u{0621}' => NonJoining(0xFE80),
        '\u{0622}' => Right(0xFE81),
        '\u{0623}' => Right(0xFE83),
        '\u{0624}' => Right(0xFE85),
        '\u{0625}' => Right(0xFE87),
        '\u{0626}' => Dual(0xFE89),
        '\u{0627}' => Right(0xFE8D),
        '\u{0628}' => Dual(0xFE8F),
        '\u{0629}' => Right(0xFE93),
        '\u{062A}' => Dual(0xFE95),
        '\u{062B}' => Dual(0xFE99),
        '\u{062C}' => Dual(0xFE9D),
        '\u{062D}' => Dual(0xFEA1),
        '\u{062E}' => Dual(0xFEA5),
        '\u{062F}' => Right(0xFEA9),
        '\u{0630}' => Right(0xFEAB),
        '\u{0631}' => Right(0xFEAD),
        '\u{0632}' => Right(0xFEAF),
        '\u{0633}' => Dual(0xFEB1),
        '\u{0634}' => Dual(0xFEB5),
        '\u{0635}' => Dual(0xFEB9),
        '\u{0636}' => Dual(0xFEBD),
        '\u{0637}' => Dual(0xFEC1),
        '\u{0638}' => Dual(0xFEC5),
        '\u{0639}' => Dual(0xFEC9),
        '\u{063A}' => Dual(0xFECD),
        '\u{0640}' | '\u{200D}' => Causing,
        '\u{0641}' => Dual(0xFED1),
        '\u{0642}' => Dual(0xFED5),
        '\u{0643}' => Dual(0xFED9),
        '\u{0644}' => Dual(0xFEDD),
        '\u{0645}' => Dual(0xFEE1),
        '\u{0646}' => Dual(0xFEE5),
        '\u{0647}' => Dual(0xFEE9),
        '\u{0648}' => Right(0xFEED),
        '\u{0649}' => Right(0xFEEF),
        '\u{064A}' => Dual(0xFEF1),
        // Persian, Urdu and other extended letters
        '\u{0671}' => Right(0xFB50),
        '\u{0679}' => Dual(0xFB66),
        '\u{067A}' => Dual(0xFB5E),
        '\u{067B}' => Dual(0xFB52),
        '\u{067E}' => Dual(0xFB56),
        '\u{067F}' => Dual(0xFB62),
        '\u{0680}' => Dual(0xFB5A),
        '\u{0683}' => Dual(0xFB76),
        '\u{0684}' => Dual(0xFB72),
        '\u{0686}' => Dual(0xFB7A),
        '\u{0687}' => Dual(0xFB7E),
        '\u{0688}' => Right(0xFB88),
        '\u{068C}' => Right(0xFB84),
        '\u{068D}' => Right(0xFB82),
        '\u{068E}' => Right(0xFB86),
        '\u{0691}' => Right(0xFB8C),
        '\u{0698}' => Right(0xFB8A),
        '\u{06A4}' => Dual(0xFB6A),
        '\u{06A6}' => Dual(0xFB6E),
        '\u{06A9}' => Dual(0xFB8E),
        '\u{06AD}' => Dual(0xFBD3),
        '\u{06AF}' => Dual(0xFB92),
        '\u{06B1}' => Dual(0xFB9A),
        '\u{06B3}' => Dual(0xFB96),
        // Noon ghunna only has isolated and final forms
        '\u{06BA}' => Right(0xFB9E),
        '\u{06BB}' => Dual(0xFBA0),
        '\u{06BE}' => Dual(0xFBAA),
        '\u{06C0}' => Right(0xFBA4),
        '\u{06C1}' => Dual(0xFBA6),
        '\u{06C5}' => Right(0xFBE0),
        '\u{06C6}' => Right(0xFBD9),
        '\u{06C7}' => Right(0xFBD7),
        '\u{06C8}' => Right(0xFBDB),
        '\u{06C9}' => Right(0xFBE2),
        '\u{06CB}' => Right(0xFBDE),
        '\u{06CC}' => Dual(0xFBFC),
        '\u{06D0}' => Dual(0xFBE4),
        '\u{06D2}' => Right(0xFBAE),
        '\u{06D3}' => Right(0xFBB0),
        _ => return None,
    };
    Some(joining)
}

/// Lam-alef ligature code points (isolated, final) for the alef that follows lam.
const fn lam_alef(alef: char) -> Option<(u32, u32)> {
    match alef {
        '\u{0622}' => Some((0xFEF5, 0xFEF6)),
        '\u{0623}' => Some((0xFEF7, 0xFEF8)),
        '\u{0625}' => Some((0xFEF9, 0xFEFA)),
        '\u{0627}' => Some((0xFEFB, 0xFEFC)),
        _ => None,
    }
}

/// Arabic diacritics and Quranic annotation marks.
pub fn is_harakat(c: char) -> bool {
    matches!(c,
        '\u{0610}'..='\u{061A}'
        | '\u{064B}'..='\u{065F}'
        | '\u{0670}'
        | '\u{06D6}'..='\u{06ED}')
}

fn form_char(c: char, joining: Joining, form: Form) -> char {
    let code = match (joining, form) {
        (Joining::Causing, _) => return c,
        (Joining::NonJoining(base), _) => base,
        (Joining::Dual(base) | Joining::Right(base), Form::Isolated) => base,
        (Joining::Dual(base) | Joining::Right(base), Form::Final) => base + 1,
        (Joining::Dual(base), Form::Initial) => base + 2,
        (Joining::Dual(base), Form::Medial) => base + 3,
        // Right-joining letters never take a form that connects forward
        (Joining::Right(base), Form::Initial) => base,
        (Joining::Right(base), Form::Medial) => base + 1,
    };
    char::from_u32(code).unwrap_or(c)
}

/// Replace Arabic letters with their contextual presentation forms.
///
/// The result is still in logical order. Characters without Arabic joining
/// behaviour pass through unchanged. Diacritics are removed unless
/// `keep_harakat` is set, in which case they are kept in place and ignored
/// when deciding how neighbouring letters join.
pub fn reshape(text: &str, keep_harakat: bool) -> String {
    let chars: Vec<char> = text
        .chars()
        .filter(|&c| keep_harakat || !is_harakat(c))
        .collect();

    // Nearest non-diacritic neighbour on each side
    let prev_letter = |i: usize| chars[..i].iter().rev().copied().find(|&c| !is_harakat(c));
    let next_index = |i: usize| (i + 1..chars.len()).find(|&j| !is_harakat(chars[j]));

    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let Some(join) = joining(c) else {
            out.push(c);
            i += 1;
            continue;
        };

        let joins_prev = join.joins_prev()
            && prev_letter(i)
                .and_then(joining)
                .is_some_and(Joining::joins_next);

        if c == LAM
            && let Some(j) = next_index(i)
            && let Some((isolated, final_form)) = lam_alef(chars[j])
        {
            let code = if joins_prev { final_form } else { isolated };
            out.push(char::from_u32(code).unwrap_or(c));
            // Diacritics between lam and alef stay with the ligature
            out.extend(chars[i + 1..j].iter());
            i = j + 1;
            continue;
        }

        let joins_next = join.joins_next()
            && next_index(i)
                .and_then(|j| joining(chars[j]))
                .is_some_and(Joining::joins_prev);

        let form = match (joins_prev, joins_next) {
            (true, true) => Form::Medial,
            (true, false) => Form::Final,
            (false, true) => Form::Initial,
            (false, false) => Form::Isolated,
        };
        out.push(form_char(c, join, form));
        i += 1;
    }
    out
}
