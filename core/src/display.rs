use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const SCREEN_WIDTH: usize = 128;
pub const SCREEN_HEIGHT: usize = 64;

/// Receives the pixel grid after every frame change. Presentation must not
/// block the engine.
pub trait DisplaySink {
    fn present(&mut self, frame: &DisplayBuffer);
}

/// Sink that discards frames, for headless runs.
pub struct NullSink;

impl DisplaySink for NullSink {
    fn present(&mut self, _frame: &DisplayBuffer) {}
}

/// Sink holding only the newest frame, for a UI on another thread.
/// Frames presented between two [`FrameSlot::take`] calls collapse into
/// the last one.
#[derive(Clone, Default)]
pub struct FrameSlot(Arc<Mutex<DisplayBuffer>>);

impl FrameSlot {
    /// Newest frame, if one was presented since the last call.
    pub fn take(&self) -> Option<DisplayBuffer> {
        let mut latest = self.lock();
        latest.take_dirty().then(|| latest.clone())
    }

    fn lock(&self) -> MutexGuard<'_, DisplayBuffer> {
        // The pixels stay whole even if another holder panicked
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DisplaySink for FrameSlot {
    fn present(&mut self, frame: &DisplayBuffer) {
        let mut latest = self.lock();
        latest.pixels.copy_from_slice(&frame.pixels);
        latest.dirty = true;
    }
}

/// Monochrome frame buffer, row-major, one byte (0 or 1) per pixel.
#[derive(Clone)]
pub struct DisplayBuffer {
    pixels: Vec<u8>,
    dirty: bool,
}

impl Default for DisplayBuffer {
    fn default() -> Self {
        DisplayBuffer {
            pixels: vec![0u8; SCREEN_WIDTH * SCREEN_HEIGHT],
            dirty: false,
        }
    }
}

impl DisplayBuffer {
    pub fn width(&self) -> usize {
        SCREEN_WIDTH
    }

    pub fn height(&self) -> usize {
        SCREEN_HEIGHT
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[(y % SCREEN_HEIGHT) * SCREEN_WIDTH + (x % SCREEN_WIDTH)] > 0
    }

    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = 0);
        self.dirty = true;
    }

    /// XOR an 8 pixel wide sprite onto the buffer at (x, y), one byte per row,
    /// MSB leftmost. Both axes wrap independently.
    ///
    /// Returns true if any pixel was switched off.
    pub fn draw_sprite(&mut self, sprite: &[u8], x: usize, y: usize) -> bool {
        let mut collision = false;

        for (row, data) in sprite.iter().enumerate() {
            let py = (y + row) % SCREEN_HEIGHT;
            for column in 0..8 {
                let bit = (data >> (7 - column)) & 1;
                if bit == 0 {
                    continue;
                }
                let px = (x + column) % SCREEN_WIDTH;
                let cell = &mut self.pixels[py * SCREEN_WIDTH + px];
                if *cell == 1 {
                    collision = true;
                }
                *cell ^= 1;
            }
        }

        self.dirty = true;
        collision
    }

    /// True if the buffer changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(display: &DisplayBuffer) -> Vec<(usize, usize)> {
        let mut on = Vec::new();
        for y in 0..SCREEN_HEIGHT {
            for x in 0..SCREEN_WIDTH {
                if display.pixel(x, y) {
                    on.push((x, y));
                }
            }
        }
        on
    }

    #[test]
    fn test_starts_blank() {
        let display = DisplayBuffer::default();
        assert!(display.pixels().iter().all(|p| *p == 0));
        assert_eq!(display.pixels().len(), 128 * 64);
    }

    #[test]
    fn test_draw_msb_first() {
        let mut display = DisplayBuffer::default();

        let collision = display.draw_sprite(&[0b1000_0001, 0b0100_0000], 10, 20);

        assert!(!collision);
        assert_eq!(lit(&display), vec![(10, 20), (17, 20), (11, 21)]);
    }

    #[test]
    fn test_draw_twice_erases_and_collides() {
        let mut display = DisplayBuffer::default();
        let glyph = [0xF0, 0x90, 0x90, 0x90, 0xF0];

        assert!(!display.draw_sprite(&glyph, 3, 4));
        assert!(!lit(&display).is_empty());

        assert!(display.draw_sprite(&glyph, 3, 4));
        assert!(lit(&display).is_empty());
    }

    #[test]
    fn test_overlap_without_clearing_is_no_collision() {
        let mut display = DisplayBuffer::default();
        display.draw_sprite(&[0b1000_0000], 0, 0);

        // Sets a neighbouring pixel, nothing switched off
        assert!(!display.draw_sprite(&[0b0100_0000], 0, 0));
        // Partial overlap switches (0,0) off
        assert!(display.draw_sprite(&[0b1000_0000], 0, 0));
        assert_eq!(lit(&display), vec![(1, 0)]);
    }

    #[test]
    fn test_wraps_horizontally() {
        let mut display = DisplayBuffer::default();
        display.draw_sprite(&[0xFF], SCREEN_WIDTH - 3, 0);

        assert_eq!(
            lit(&display),
            vec![(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (125, 0), (126, 0), (127, 0)]
        );
    }

    #[test]
    fn test_wraps_vertically() {
        let mut display = DisplayBuffer::default();
        display.draw_sprite(&[0x80, 0x80, 0x80], 5, SCREEN_HEIGHT - 1);

        assert_eq!(lit(&display), vec![(5, 0), (5, 1), (5, 63)]);
    }

    #[test]
    fn test_origin_wraps() {
        let mut display = DisplayBuffer::default();
        display.draw_sprite(&[0x80], SCREEN_WIDTH + 2, SCREEN_HEIGHT + 1);
        assert_eq!(lit(&display), vec![(2, 1)]);
    }

    #[test]
    fn test_clear() {
        let mut display = DisplayBuffer::default();
        display.draw_sprite(&[0xFF; 15], 30, 30);
        display.clear();
        assert!(display.pixels().iter().all(|p| *p == 0));
    }

    #[test]
    fn test_dirty_flag() {
        let mut display = DisplayBuffer::default();
        assert!(!display.take_dirty());

        display.draw_sprite(&[0x01], 0, 0);
        assert!(display.take_dirty());
        assert!(!display.take_dirty());

        display.clear();
        assert!(display.take_dirty());
    }

    #[test]
    fn test_frame_slot_keeps_newest() {
        let mut slot = FrameSlot::default();
        let reader = slot.clone();
        assert!(reader.take().is_none());

        let mut display = DisplayBuffer::default();
        display.draw_sprite(&[0xFF], 0, 0);
        slot.present(&display);
        display.clear();
        slot.present(&display);

        let frame = reader.take().unwrap();
        assert_eq!(frame.pixels(), display.pixels());
        assert!(reader.take().is_none());
    }
}
