use std::str::FromStr;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::display::DisplayBuffer;

pub const DEFAULT_BACKGROUND_COLOR: Chip8Color = Chip8Color::new(0, 0, 0);
pub const DEFAULT_FOREGROUND_COLOR: Chip8Color = Chip8Color::new(255, 255, 255);

/// One pixel in RGBX8888 layout (little-endian byte order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C, packed)]
pub struct Chip8Color {
    padding: u8,
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

impl Chip8Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Chip8Color {
        Chip8Color { r, g, b, padding: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse hex color {0:?}, expected RRGGBB or 0xRRGGBB")]
pub struct ColorParseError(String);

impl FromStr for Chip8Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Chip8Color, ColorParseError> {
        let err = || ColorParseError(s.to_string());
        let hex = s.strip_prefix("0x").unwrap_or(s);

        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        Ok(Chip8Color::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Colors used to turn a [`DisplayBuffer`] into texture pixels.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub foreground: Chip8Color,
    pub background: Chip8Color,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            foreground: DEFAULT_FOREGROUND_COLOR,
            background: DEFAULT_BACKGROUND_COLOR,
        }
    }
}

impl Palette {
    /// Convert a frame into `out`, resizing it to the frame's pixel count.
    pub fn render(&self, frame: &DisplayBuffer, out: &mut Vec<Chip8Color>) {
        out.clear();
        out.extend(frame.pixels().iter().map(|&p| {
            if p > 0 {
                self.foreground
            } else {
                self.background
            }
        }));
    }

    /// Raw bytes of rendered pixels, as expected by a streaming texture.
    pub fn as_bytes(pixels: &[Chip8Color]) -> &[u8] {
        bytemuck::cast_slice(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        assert_eq!("0xFF8000".parse(), Ok(Chip8Color::new(255, 128, 0)));
        assert_eq!("00ff10".parse(), Ok(Chip8Color::new(0, 255, 16)));
    }

    #[test]
    fn test_parse_color_rejects() {
        assert!("0xFF80".parse::<Chip8Color>().is_err());
        assert!("GG0000".parse::<Chip8Color>().is_err());
        assert!("".parse::<Chip8Color>().is_err());
        assert!("0x+F0000".parse::<Chip8Color>().is_err());
    }

    #[test]
    fn test_render_frame() {
        let mut frame = DisplayBuffer::default();
        frame.draw_sprite(&[0x80], 1, 0);
        let palette = Palette {
            foreground: Chip8Color::new(1, 2, 3),
            background: Chip8Color::new(9, 9, 9),
        };

        let mut pixels = Vec::new();
        palette.render(&frame, &mut pixels);

        assert_eq!(pixels.len(), frame.width() * frame.height());
        assert_eq!(pixels[0], Chip8Color::new(9, 9, 9));
        assert_eq!(pixels[1], Chip8Color::new(1, 2, 3));

        // RGBX8888 read as little-endian u32: X, B, G, R
        let bytes = Palette::as_bytes(&pixels);
        assert_eq!(bytes.len(), pixels.len() * 4);
        assert_eq!(&bytes[4..8], &[0, 3, 2, 1]);
    }
}
