//! Color handling: RGB triples, color references, and the 256-entry palette.

/// An 8-bit-per-channel RGB triple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A color reference as stored in a cell: either a palette index or a
/// direct RGB value (SGR 38/48 with the `2;r;g;b` form).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Indexed(u8),
    Rgb(Rgb),
}

/// The 256-entry color palette. Entries 0-15 are the standard and bright
/// ANSI colors, 16-231 a 6x6x6 color cube, 232-255 a grayscale ramp.
/// Entries are mutable through OSC 4 and restored by a full reset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    pub colors: [Rgb; 256],
}

/// Standard (0-7) and bright (8-15) ANSI colors.
const ANSI_COLORS: [Rgb; 16] = [
    Rgb::new(0, 0, 0),
    Rgb::new(204, 0, 0),
    Rgb::new(0, 204, 0),
    Rgb::new(204, 204, 0),
    Rgb::new(0, 0, 204),
    Rgb::new(204, 0, 204),
    Rgb::new(0, 204, 204),
    Rgb::new(204, 204, 204),
    Rgb::new(102, 102, 102),
    Rgb::new(255, 0, 0),
    Rgb::new(0, 255, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(0, 0, 255),
    Rgb::new(255, 0, 255),
    Rgb::new(0, 255, 255),
    Rgb::new(255, 255, 255),
];

/// Channel intensities of the 6x6x6 cube.
const CUBE_LEVELS: [u8; 6] = [0x00, 0x5F, 0x87, 0xAF, 0xD7, 0xFF];

impl Default for Palette {
    fn default() -> Self {
        let mut colors = [Rgb::default(); 256];

        colors[..16].copy_from_slice(&ANSI_COLORS);

        for r in 0..6 {
            for g in 0..6 {
                for b in 0..6 {
                    colors[16 + r * 36 + g * 6 + b] =
                        Rgb::new(CUBE_LEVELS[r], CUBE_LEVELS[g], CUBE_LEVELS[b]);
                }
            }
        }

        for i in 0..24 {
            let gray = (8 + i * 10) as u8;
            colors[232 + i] = Rgb::new(gray, gray, gray);
        }

        Self { colors }
    }
}

impl Palette {
    /// Resolve a color reference against the palette.
    pub fn resolve(&self, color: Color) -> Rgb {
        match color {
            Color::Indexed(index) => self.colors[index as usize],
            Color::Rgb(rgb) => rgb,
        }
    }

    /// Redefine one palette entry (OSC 4).
    pub fn set(&mut self, index: usize, rgb: Rgb) {
        self.colors[index] = rgb;
    }

    /// Parse an X11-style color specification: `#RGB`, `#RRGGBB`,
    /// `#RRRGGGBBB`, `#RRRRGGGGBBBB`, `rgb:R/G/B` (1-4 hex digits per
    /// channel), or `rgbi:f/f/f` with intensities in 0.0..=1.0.
    pub fn parse_color_spec(spec: &str) -> Option<Rgb> {
        let spec = spec.trim();

        if let Some(hex) = spec.strip_prefix('#') {
            if hex.is_empty() || hex.len() % 3 != 0 || hex.len() > 12 {
                return None;
            }
            let digits = hex.len() / 3;
            let r = scale_hex_channel(&hex[..digits])?;
            let g = scale_hex_channel(&hex[digits..2 * digits])?;
            let b = scale_hex_channel(&hex[2 * digits..])?;
            return Some(Rgb::new(r, g, b));
        }

        if let Some(rgb) = spec.strip_prefix("rgb:") {
            let mut channels = rgb.split('/');
            let r = scale_hex_channel(channels.next()?)?;
            let g = scale_hex_channel(channels.next()?)?;
            let b = scale_hex_channel(channels.next()?)?;
            if channels.next().is_some() {
                return None;
            }
            return Some(Rgb::new(r, g, b));
        }

        if let Some(rgbi) = spec.strip_prefix("rgbi:") {
            let mut channels = rgbi.split('/');
            let r = scale_intensity(channels.next()?)?;
            let g = scale_intensity(channels.next()?)?;
            let b = scale_intensity(channels.next()?)?;
            if channels.next().is_some() {
                return None;
            }
            return Some(Rgb::new(r, g, b));
        }

        None
    }
}

/// Scale a 1-4 hex digit channel value to 8 bits.
fn scale_hex_channel(digits: &str) -> Option<u8> {
    if digits.is_empty() || digits.len() > 4 {
        return None;
    }
    let value = u16::from_str_radix(digits, 16).ok()?;
    Some(match digits.len() {
        1 => (value * 0x11) as u8,
        2 => value as u8,
        3 => (value >> 4) as u8,
        _ => (value >> 8) as u8,
    })
}

/// Scale a floating-point intensity in 0.0..=1.0 to 8 bits.
fn scale_intensity(text: &str) -> Option<u8> {
    let value: f64 = text.parse().ok()?;
    if !(0.0..=1.0).contains(&value) {
        return None;
    }
    Some((value * 255.0).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_palette_layout() {
        let palette = Palette::default();
        assert_eq!(palette.colors[1], Rgb::new(204, 0, 0));
        assert_eq!(palette.colors[15], Rgb::new(255, 255, 255));
        // Cube corners.
        assert_eq!(palette.colors[16], Rgb::new(0, 0, 0));
        assert_eq!(palette.colors[196], Rgb::new(0xFF, 0, 0));
        assert_eq!(palette.colors[231], Rgb::new(0xFF, 0xFF, 0xFF));
        // Grayscale ramp endpoints.
        assert_eq!(palette.colors[232], Rgb::new(8, 8, 8));
        assert_eq!(palette.colors[255], Rgb::new(238, 238, 238));
    }

    #[test]
    fn resolve_follows_reference_kind() {
        let mut palette = Palette::default();
        palette.set(40, Rgb::new(1, 2, 3));
        assert_eq!(palette.resolve(Color::Indexed(40)), Rgb::new(1, 2, 3));
        assert_eq!(
            palette.resolve(Color::Rgb(Rgb::new(9, 9, 9))),
            Rgb::new(9, 9, 9)
        );
    }

    #[test]
    fn parses_hash_forms() {
        assert_eq!(
            Palette::parse_color_spec("#fff"),
            Some(Rgb::new(255, 255, 255))
        );
        assert_eq!(
            Palette::parse_color_spec("#102030"),
            Some(Rgb::new(0x10, 0x20, 0x30))
        );
        assert_eq!(
            Palette::parse_color_spec("#100200300"),
            Some(Rgb::new(0x10, 0x20, 0x30))
        );
        assert_eq!(
            Palette::parse_color_spec("#100020003000"),
            Some(Rgb::new(0x10, 0x20, 0x30))
        );
    }

    #[test]
    fn parses_rgb_and_rgbi_forms() {
        assert_eq!(
            Palette::parse_color_spec("rgb:ff/80/00"),
            Some(Rgb::new(0xFF, 0x80, 0x00))
        );
        assert_eq!(
            Palette::parse_color_spec("rgb:ffff/8000/0000"),
            Some(Rgb::new(0xFF, 0x80, 0x00))
        );
        assert_eq!(
            Palette::parse_color_spec("rgbi:1.0/0.5/0.0"),
            Some(Rgb::new(255, 128, 0))
        );
    }

    #[test]
    fn rejects_malformed_specs() {
        assert_eq!(Palette::parse_color_spec(""), None);
        assert_eq!(Palette::parse_color_spec("#12345"), None);
        assert_eq!(Palette::parse_color_spec("rgb:ff/80"), None);
        assert_eq!(Palette::parse_color_spec("rgbi:2.0/0.0/0.0"), None);
        assert_eq!(Palette::parse_color_spec("teal"), None);
    }
}
