use thiserror::Error;

pub type Result<T> = std::result::Result<T, Chip8Error>;

/// Faults that terminate a run. Nothing here is recovered from.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("call stack overflow (depth {depth})")]
    StackOverflow { depth: usize },
    #[error("return with an empty call stack")]
    StackUnderflow,
    #[error("memory access outside address space at 0x{address:04x}")]
    AddressOutOfRange { address: usize },
    #[error("ROM is {len} bytes, at most {max} fit in program memory")]
    RomTooLarge { len: usize, max: usize },
    #[error("a ROM must be provided")]
    MissingRom,
    #[error("font must be 80 bytes, got {len}")]
    InvalidFont { len: usize },
    #[error("keyboard stopped delivering keys while waiting for a key press")]
    KeyboardUnavailable,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
