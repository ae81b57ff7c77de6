use unicode_normalization::char::decompose_canonical;
use unicode_normalization::UnicodeNormalization as _;

/// One of the two built-in faces every report is set in. Both belong to the standard
/// set of fourteen fonts that any PDF renderer must provide, so no font data is ever
/// loaded or embedded into the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    /// Helvetica, used for the body text.
    Regular,
    /// Helvetica-Bold, used for the titles and the section labels.
    Bold,
}

impl Face {
    /// The name under which the face is registered in the page resources.
    pub(crate) fn resource_name(&self) -> &'static str {
        match self {
            Face::Regular => "F0",
            Face::Bold => "F1",
        }
    }

    /// The `BaseFont` name of the face as expected by the PDF specification.
    pub(crate) fn base_font(&self) -> &'static str {
        match self {
            Face::Regular => "Helvetica",
            Face::Bold => "Helvetica-Bold",
        }
    }
}

/// Width assumed for characters the tables do not cover. The value is the width of
/// most lowercase Helvetica letters, which keeps the wrapping conservative enough.
const DEFAULT_GLYPH_WIDTH: u16 = 556;

/// Measures the given text in the given face and font size, returning the width in
/// points. The measurement is pure: the text is NFC-normalized exactly like it is
/// before being encoded into the document, so the measured width matches what ends
/// up on the page.
pub fn text_width(text: &str, face: Face, font_size: f32) -> f32 {
    let total_width: u32 = text
        .nfc()
        .map(|character| u32::from(glyph_width(character, face)))
        .sum();

    total_width as f32 * font_size / 1000.0
}

/// The advance width of a single character in thousandths of the font size.
fn glyph_width(character: char, face: Face) -> u16 {
    if let Some(width) = mapped_width(character, face) {
        return width;
    }

    // Accented latin letters measure as their base letter, which has the same
    // advance width in both Helvetica faces
    let base_character = canonical_base(character);
    if base_character != character {
        if let Some(width) = mapped_width(base_character, face) {
            return width;
        }
    }

    DEFAULT_GLYPH_WIDTH
}

/// Retrieve the first character of the canonical decomposition, which for accented
/// letters is the unaccented base letter.
fn canonical_base(character: char) -> char {
    let mut base = character;
    let mut is_first = true;
    decompose_canonical(character, |decomposed| {
        if is_first {
            base = decomposed;
            is_first = false;
        }
    });

    base
}

fn mapped_width(character: char, face: Face) -> Option<u16> {
    match face {
        Face::Regular => regular_width(character),
        Face::Bold => bold_width(character),
    }
}

/// Advance widths of the Helvetica face, as published in the Adobe font metrics.
fn regular_width(character: char) -> Option<u16> {
    let width = match character {
        ' ' | '\u{a0}' => 278,
        '!' => 278,
        '"' => 355,
        '#' | '$' => 556,
        '%' => 889,
        '&' => 667,
        '\'' => 191,
        '(' | ')' => 333,
        '*' => 389,
        '+' => 584,
        ',' | '.' | '/' => 278,
        '-' => 333,
        '0'..='9' => 556,
        ':' | ';' => 278,
        '<' | '=' | '>' => 584,
        '?' => 556,
        '@' => 1015,
        'A' | 'B' => 667,
        'C' | 'D' => 722,
        'E' => 667,
        'F' => 611,
        'G' => 778,
        'H' => 722,
        'I' => 278,
        'J' => 500,
        'K' => 667,
        'L' => 556,
        'M' => 833,
        'N' => 722,
        'O' => 778,
        'P' => 667,
        'Q' => 778,
        'R' => 722,
        'S' => 667,
        'T' => 611,
        'U' => 722,
        'V' => 667,
        'W' => 944,
        'X' | 'Y' => 667,
        'Z' => 611,
        '[' | ']' | '\\' => 278,
        '^' => 469,
        '_' => 556,
        '`' => 333,
        'a' | 'b' => 556,
        'c' => 500,
        'd' | 'e' => 556,
        'f' => 278,
        'g' | 'h' => 556,
        'i' | 'j' => 222,
        'k' => 500,
        'l' => 222,
        'm' => 833,
        'n' | 'o' | 'p' | 'q' => 556,
        'r' => 333,
        's' => 500,
        't' => 278,
        'u' => 556,
        'v' => 500,
        'w' => 722,
        'x' | 'y' | 'z' => 500,
        '{' | '}' => 334,
        '|' => 260,
        '~' => 584,
        '\u{2022}' => 350,  // bullet
        '\u{2013}' => 556,  // en dash
        '\u{2014}' => 1000, // em dash
        '\u{2018}' | '\u{2019}' => 222,
        '\u{201c}' | '\u{201d}' => 333,
        '\u{2026}' => 1000, // ellipsis
        '\u{a1}' => 333,    // inverted exclamation mark
        '\u{bf}' => 611,    // inverted question mark
        '\u{b0}' => 400,    // degree sign
        _ => return None,
    };

    Some(width)
}

/// Advance widths of the Helvetica-Bold face, as published in the Adobe font metrics.
fn bold_width(character: char) -> Option<u16> {
    let width = match character {
        ' ' | '\u{a0}' => 278,
        '!' => 333,
        '"' => 474,
        '#' | '$' => 556,
        '%' => 889,
        '&' => 722,
        '\'' => 238,
        '(' | ')' => 333,
        '*' => 389,
        '+' => 584,
        ',' | '.' | '/' => 278,
        '-' => 333,
        '0'..='9' => 556,
        ':' | ';' => 333,
        '<' | '=' | '>' => 584,
        '?' => 611,
        '@' => 975,
        'A' | 'B' | 'C' | 'D' => 722,
        'E' => 667,
        'F' => 611,
        'G' => 778,
        'H' => 722,
        'I' => 278,
        'J' => 556,
        'K' => 722,
        'L' => 611,
        'M' => 833,
        'N' => 722,
        'O' => 778,
        'P' => 667,
        'Q' => 778,
        'R' => 722,
        'S' => 667,
        'T' => 611,
        'U' => 722,
        'V' => 667,
        'W' => 944,
        'X' | 'Y' => 667,
        'Z' => 611,
        '[' | ']' => 333,
        '\\' => 278,
        '^' => 584,
        '_' => 556,
        '`' => 333,
        'a' => 556,
        'b' => 611,
        'c' => 556,
        'd' => 611,
        'e' => 556,
        'f' => 333,
        'g' | 'h' => 611,
        'i' | 'j' => 278,
        'k' => 556,
        'l' => 278,
        'm' => 889,
        'n' | 'o' | 'p' | 'q' => 611,
        'r' => 389,
        's' => 556,
        't' => 333,
        'u' => 611,
        'v' => 556,
        'w' => 778,
        'x' | 'y' => 556,
        'z' => 500,
        '{' | '}' => 389,
        '|' => 280,
        '~' => 584,
        '\u{2022}' => 350,  // bullet
        '\u{2013}' => 556,  // en dash
        '\u{2014}' => 1000, // em dash
        '\u{2018}' | '\u{2019}' => 278,
        '\u{201c}' | '\u{201d}' => 500,
        '\u{2026}' => 1000, // ellipsis
        '\u{a1}' => 333,    // inverted exclamation mark
        '\u{bf}' => 611,    // inverted question mark
        '\u{b0}' => 400,    // degree sign
        _ => return None,
    };

    Some(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_width() {
        assert_eq!(text_width("", Face::Regular, 11.0), 0.0);
        assert_eq!(text_width("", Face::Bold, 11.0), 0.0);
    }

    #[test]
    fn width_scales_linearly_with_the_font_size() {
        let narrow = text_width("Supervisor", Face::Regular, 10.0);
        let wide = text_width("Supervisor", Face::Regular, 20.0);
        assert!((wide - 2.0 * narrow).abs() < 1e-4);
    }

    #[test]
    fn known_helvetica_widths_add_up() {
        // H (722) + o (556) + l (222) + a (556) = 2056 thousandths
        let width = text_width("Hola", Face::Regular, 10.0);
        assert!((width - 20.56).abs() < 1e-4);
    }

    #[test]
    fn bold_face_is_wider_than_the_regular_face() {
        let regular = text_width("Incidencias", Face::Regular, 12.0);
        let bold = text_width("Incidencias", Face::Bold, 12.0);
        assert!(bold > regular);
    }

    #[test]
    fn accented_letters_measure_as_their_base_letter() {
        assert_eq!(
            text_width("Código", Face::Regular, 11.0),
            text_width("Codigo", Face::Regular, 11.0)
        );
        assert_eq!(
            text_width("Categoría", Face::Bold, 11.0),
            text_width("Categoria", Face::Bold, 11.0)
        );
    }

    #[test]
    fn unknown_characters_fall_back_to_the_default_width() {
        let width = text_width("\u{4e16}", Face::Regular, 10.0);
        assert!((width - f32::from(DEFAULT_GLYPH_WIDTH) / 100.0).abs() < 1e-4);
    }
}
