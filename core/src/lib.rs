mod chip8;
mod color;
mod display;
mod error;
mod instruction;
mod keypad;
mod memory;
mod registers;
mod timer;

pub use chip8::{Chip8, Chip8Builder, HaltHandle, KeyWaitMode, Step};
pub use color::{
    Chip8Color, ColorParseError, Palette, DEFAULT_BACKGROUND_COLOR, DEFAULT_FOREGROUND_COLOR,
};
pub use display::{DisplayBuffer, DisplaySink, FrameSlot, NullSink, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use error::{Chip8Error, Result};
pub use instruction::{DecodeError, Instruction};
pub use keypad::{ChannelKeyboard, Disconnected, Key, KeyEvent, KeyWait, Keyboard, KeypadHandle};
pub use memory::{
    AddressSpace, DEFAULT_FONT, FONT_ADDRESS, FONT_SIZE, MEMORY_SIZE, PROGRAM_START,
};
pub use timer::{TimerClock, Timers, TIMER_HZ};
