use crate::error::{Chip8Error, Result};

pub const MEMORY_SIZE: usize = 0x1000;
/// Where program images are loaded and execution starts.
pub const PROGRAM_START: u16 = 0x200;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;

pub const FONT_ADDRESS: u16 = 0x050;
pub const FONT_GLYPH_HEIGHT: u16 = 5;
pub const FONT_SIZE: usize = 80;

pub static DEFAULT_FONT: [u8; FONT_SIZE] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// The 4K address space. Every access is bounds checked and an access
/// outside it is reported as [`Chip8Error::AddressOutOfRange`].
pub struct AddressSpace {
    bytes: Box<[u8; MEMORY_SIZE]>,
}

impl AddressSpace {
    /// Zeroed memory with `font` copied to [`FONT_ADDRESS`].
    pub fn with_font(font: &[u8]) -> Result<AddressSpace> {
        if font.len() != FONT_SIZE {
            return Err(Chip8Error::InvalidFont { len: font.len() });
        }
        let mut memory = AddressSpace {
            bytes: Box::new([0u8; MEMORY_SIZE]),
        };
        memory.load(FONT_ADDRESS, font)?;
        Ok(memory)
    }

    /// Copy a program image to [`PROGRAM_START`].
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<()> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                len: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        self.load(PROGRAM_START, rom)
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) -> Result<()> {
        let range = Self::range(addr as usize, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    pub fn read_u8(&self, addr: u16) -> Result<u8> {
        self.bytes
            .get(addr as usize)
            .copied()
            .ok_or(Chip8Error::AddressOutOfRange {
                address: addr as usize,
            })
    }

    pub fn write_u8(&mut self, addr: u16, value: u8) -> Result<()> {
        let cell = self
            .bytes
            .get_mut(addr as usize)
            .ok_or(Chip8Error::AddressOutOfRange {
                address: addr as usize,
            })?;
        *cell = value;
        Ok(())
    }

    /// Big-endian word, high byte first. Used for instruction fetch.
    pub fn read_u16_be(&self, addr: u16) -> Result<u16> {
        let range = Self::range(addr as usize, 2)?;
        let word = &self.bytes[range];
        Ok(u16::from_be_bytes([word[0], word[1]]))
    }

    pub fn slice(&self, addr: u16, len: usize) -> Result<&[u8]> {
        let range = Self::range(addr as usize, len)?;
        Ok(&self.bytes[range])
    }

    /// Address of the glyph for the low nibble of `digit`.
    pub fn font_address(digit: u8) -> u16 {
        FONT_ADDRESS + (digit & 0x0F) as u16 * FONT_GLYPH_HEIGHT
    }

    fn range(start: usize, len: usize) -> Result<std::ops::Range<usize>> {
        let end = start + len;
        if end > MEMORY_SIZE {
            // Report the first byte that falls outside.
            return Err(Chip8Error::AddressOutOfRange {
                address: start.max(MEMORY_SIZE),
            });
        }
        Ok(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_loaded() {
        let memory = AddressSpace::with_font(&DEFAULT_FONT).unwrap();

        // First glyph: 0
        assert_eq!(memory.slice(FONT_ADDRESS, 5).unwrap(), &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
        // Last glyph: F
        assert_eq!(
            memory.slice(AddressSpace::font_address(0xF), 5).unwrap(),
            &[0xF0, 0x80, 0xF0, 0x80, 0x80]
        );
    }

    #[test]
    fn test_program_memory_zeroed() {
        let memory = AddressSpace::with_font(&DEFAULT_FONT).unwrap();
        assert!(memory.slice(PROGRAM_START, MAX_ROM_SIZE).unwrap().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_invalid_font() {
        let res = AddressSpace::with_font(&[0u8; 16]);
        assert!(matches!(res, Err(Chip8Error::InvalidFont { len: 16 })));
    }

    #[test]
    fn test_load_rom() {
        let mut memory = AddressSpace::with_font(&DEFAULT_FONT).unwrap();
        memory.load_rom(&[0x00, 0xE0, 0x12, 0x00]).unwrap();
        assert_eq!(memory.read_u16_be(0x200).unwrap(), 0x00E0);
        assert_eq!(memory.read_u16_be(0x202).unwrap(), 0x1200);
    }

    #[test]
    fn test_load_rom_max_size() {
        let mut memory = AddressSpace::with_font(&DEFAULT_FONT).unwrap();
        let rom = vec![0xAB; MAX_ROM_SIZE];
        memory.load_rom(&rom).unwrap();
        assert_eq!(memory.read_u8(0xFFF).unwrap(), 0xAB);
    }

    #[test]
    fn test_load_rom_too_large() {
        let mut memory = AddressSpace::with_font(&DEFAULT_FONT).unwrap();
        let rom = vec![0; MAX_ROM_SIZE + 1];
        let res = memory.load_rom(&rom);
        assert!(matches!(res, Err(Chip8Error::RomTooLarge { len: 3585, max: 3584 })));
    }

    #[test]
    fn test_out_of_range() {
        let mut memory = AddressSpace::with_font(&DEFAULT_FONT).unwrap();
        assert!(memory.read_u8(0xFFF).is_ok());
        assert!(matches!(
            memory.read_u8(0x1000),
            Err(Chip8Error::AddressOutOfRange { address: 0x1000 })
        ));
        assert!(matches!(
            memory.write_u8(0x1234, 1),
            Err(Chip8Error::AddressOutOfRange { address: 0x1234 })
        ));
        // Word straddling the end of memory
        assert!(matches!(
            memory.read_u16_be(0xFFF),
            Err(Chip8Error::AddressOutOfRange { address: 0x1000 })
        ));
        assert!(memory.slice(0xFFC, 5).is_err());
    }

    #[test]
    fn test_font_address_masks_digit() {
        assert_eq!(AddressSpace::font_address(0x0), 0x050);
        assert_eq!(AddressSpace::font_address(0xA), 0x050 + 50);
        assert_eq!(AddressSpace::font_address(0x1A), 0x050 + 50);
    }
}
