//! Unicode math-alphabet mappings.
//!
//! TeX math renders Latin letters in styled alphabets (italic by default).
//! Rather than juggling font files, glyphs are remapped into the
//! Mathematical Alphanumeric Symbols block, with the handful of letters
//! Unicode predates scattered through the Letterlike Symbols block.

/// Styled alphabet a glyph is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MathFont {
    Upright,
    Italic,
    Bold,
    BoldItalic,
    DoubleStruck,
    Script,
    Fraktur,
}

/// Maps a character into the requested alphabet. Characters without a styled
/// counterpart pass through unchanged.
pub(crate) fn restyle(ch: char, font: MathFont) -> char {
    match font {
        MathFont::Upright => ch,
        MathFont::Italic => italic(ch),
        MathFont::Bold => offset_alphabet(ch, 0x1D400, 0x1D41A, Some(0x1D7CE), &[]),
        MathFont::BoldItalic => offset_alphabet(ch, 0x1D468, 0x1D482, None, &[]),
        MathFont::DoubleStruck => offset_alphabet(
            ch,
            0x1D538,
            0x1D552,
            Some(0x1D7D8),
            &[
                ('C', 'ℂ'),
                ('H', 'ℍ'),
                ('N', 'ℕ'),
                ('P', 'ℙ'),
                ('Q', 'ℚ'),
                ('R', 'ℝ'),
                ('Z', 'ℤ'),
            ],
        ),
        MathFont::Script => offset_alphabet(
            ch,
            0x1D49C,
            0x1D4B6,
            None,
            &[
                ('B', 'ℬ'),
                ('E', 'ℰ'),
                ('F', 'ℱ'),
                ('H', 'ℋ'),
                ('I', 'ℐ'),
                ('L', 'ℒ'),
                ('M', 'ℳ'),
                ('R', 'ℛ'),
                ('e', 'ℯ'),
                ('g', 'ℊ'),
                ('o', 'ℴ'),
            ],
        ),
        MathFont::Fraktur => offset_alphabet(
            ch,
            0x1D504,
            0x1D51E,
            None,
            &[
                ('C', 'ℭ'),
                ('H', 'ℌ'),
                ('I', 'ℑ'),
                ('R', 'ℜ'),
                ('Z', 'ℨ'),
            ],
        ),
    }
}

fn italic(ch: char) -> char {
    // U+210E PLANCK CONSTANT fills the hole where italic h would live.
    if ch == 'h' {
        return 'ℎ';
    }
    offset_alphabet(ch, 0x1D434, 0x1D44E, None, &[])
}

fn offset_alphabet(
    ch: char,
    upper_base: u32,
    lower_base: u32,
    digit_base: Option<u32>,
    exceptions: &[(char, char)],
) -> char {
    if let Some(&(_, mapped)) = exceptions.iter().find(|(from, _)| *from == ch) {
        return mapped;
    }
    let mapped = match ch {
        'A'..='Z' => char::from_u32(upper_base + (ch as u32 - 'A' as u32)),
        'a'..='z' => char::from_u32(lower_base + (ch as u32 - 'a' as u32)),
        '0'..='9' => digit_base.and_then(|base| char::from_u32(base + (ch as u32 - '0' as u32))),
        _ => None,
    };
    mapped.unwrap_or(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn italic_letters_map_into_math_block() {
        assert_eq!(restyle('x', MathFont::Italic), '𝑥');
        assert_eq!(restyle('A', MathFont::Italic), '𝐴');
        assert_eq!(restyle('h', MathFont::Italic), 'ℎ');
    }

    #[test]
    fn double_struck_uses_letterlike_exceptions() {
        assert_eq!(restyle('R', MathFont::DoubleStruck), 'ℝ');
        assert_eq!(restyle('N', MathFont::DoubleStruck), 'ℕ');
        assert_eq!(restyle('A', MathFont::DoubleStruck), '𝔸');
    }

    #[test]
    fn unmapped_characters_pass_through() {
        assert_eq!(restyle('+', MathFont::Bold), '+');
        assert_eq!(restyle('α', MathFont::Italic), 'α');
    }
}
