//! Designatable character sets (SCS) and their translation tables.
//!
//! Each set covers a contiguous code-point range and substitutes glyphs
//! within it; translation is consulted only when a character is written
//! to the screen. ASCII is the absence of translation.

/// A character set designatable into one of the G0-G3 slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Charset {
    /// No translation.
    #[default]
    Ascii,
    /// DEC Special Graphics (line drawing), `ESC ( 0`.
    DecGraphics,
    /// United Kingdom national set, `ESC ( A`.
    UnitedKingdom,
    /// VT52 graphics mode set, `ESC F`.
    Vt52Graphics,
}

/// DEC Special Graphics, 0x5F..=0x7E.
const DEC_GRAPHICS: (char, &[char]) = (
    '\x5f',
    &[
        ' ', '\u{25c6}', '\u{2592}', '\u{2409}', '\u{240c}', '\u{240d}',
        '\u{240a}', '\u{00b0}', '\u{00b1}', '\u{2424}', '\u{240b}', '\u{2518}',
        '\u{2510}', '\u{250c}', '\u{2514}', '\u{253c}', '\u{23ba}', '\u{23bb}',
        '\u{2500}', '\u{23bc}', '\u{23bd}', '\u{251c}', '\u{2524}', '\u{2534}',
        '\u{252c}', '\u{2502}', '\u{2264}', '\u{2265}', '\u{03c0}', '\u{2260}',
        '\u{00a3}', '\u{00b7}',
    ],
);

/// VT52 graphics mode, 0x5E..=0x7E. The b-e entries stand in for the
/// fraction-numerator glyphs of the hardware character generator.
const VT52_GRAPHICS: (char, &[char]) = (
    '\x5e',
    &[
        ' ', ' ', ' ', '\u{2588}', '1', '3', '5', '7', '\u{00b0}', '\u{00b1}',
        '\u{2192}', '\u{2026}', '\u{00f7}', '\u{2193}', '\u{23ba}', '\u{23ba}',
        '\u{23bb}', '\u{23bb}', '\u{2500}', '\u{2500}', '\u{23bc}', '\u{23bd}',
        '\u{2080}', '\u{2081}', '\u{2082}', '\u{2083}', '\u{2084}', '\u{2085}',
        '\u{2086}', '\u{2087}', '\u{2088}', '\u{2089}', '\u{00b6}',
    ],
);

impl Charset {
    /// Translate a code point through the set. Characters outside the
    /// set's range pass through unchanged.
    pub fn translate(&self, input: char) -> char {
        match self {
            Charset::Ascii => input,
            Charset::DecGraphics => table_lookup(DEC_GRAPHICS, input),
            Charset::UnitedKingdom => {
                if input == '#' {
                    '\u{00a3}'
                } else {
                    input
                }
            }
            Charset::Vt52Graphics => table_lookup(VT52_GRAPHICS, input),
        }
    }
}

fn table_lookup((min, table): (char, &[char]), input: char) -> char {
    let offset = (input as usize).wrapping_sub(min as usize);
    match table.get(offset) {
        Some(&glyph) => glyph,
        None => input,
    }
}
