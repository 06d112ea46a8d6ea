//! CSS hex color parsing.

use peniko::Color;

/// Parse a CSS hex color (`#rgb`, `#rrggbb` or `#rrggbbaa`).
///
/// Element colors travel as CSS strings on the wire; anything unparseable
/// falls back to opaque black rather than failing the paint.
pub fn parse_css_color(value: &str) -> Color {
    parse_hex(value.trim()).unwrap_or(Color::BLACK)
}

fn parse_hex(value: &str) -> Option<Color> {
    let hex = value.strip_prefix('#')?;
    match hex.len() {
        3 => {
            let r = nibble(hex, 0)?;
            let g = nibble(hex, 1)?;
            let b = nibble(hex, 2)?;
            Some(Color::from_rgba8(r * 17, g * 17, b * 17, 255))
        }
        6 => {
            let r = byte(hex, 0)?;
            let g = byte(hex, 2)?;
            let b = byte(hex, 4)?;
            Some(Color::from_rgba8(r, g, b, 255))
        }
        8 => {
            let r = byte(hex, 0)?;
            let g = byte(hex, 2)?;
            let b = byte(hex, 4)?;
            let a = byte(hex, 6)?;
            Some(Color::from_rgba8(r, g, b, a))
        }
        _ => None,
    }
}

fn nibble(hex: &str, index: usize) -> Option<u8> {
    u8::from_str_radix(hex.get(index..index + 1)?, 16).ok()
}

fn byte(hex: &str, index: usize) -> Option<u8> {
    u8::from_str_radix(hex.get(index..index + 2)?, 16).ok()
}
