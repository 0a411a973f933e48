use crate::error::{Chip8Error, Result};
use crate::memory::PROGRAM_START;

pub(crate) const REGISTER_COUNT: usize = 16;
pub(crate) const STACK_DEPTH: usize = 16;
/// VF doubles as carry/borrow/collision/shift flag.
pub(crate) const FLAG: usize = 0xF;

pub(crate) struct Registers {
    /// General purpose registers
    pub(crate) v: [u8; REGISTER_COUNT],
    /// Index register
    pub(crate) index: u16,
    /// Program counter
    pub(crate) pc: u16,
}

impl Default for Registers {
    fn default() -> Self {
        Registers {
            v: [0u8; REGISTER_COUNT],
            index: 0,
            pc: PROGRAM_START,
        }
    }
}

impl Registers {
    /// Move to the next instruction.
    pub(crate) fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    /// Advance unconditionally, then once more if `condition` holds.
    pub(crate) fn skip_if(&mut self, condition: bool) {
        self.advance();
        if condition {
            self.advance();
        }
    }
}

/// Return addresses for subroutine calls.
#[derive(Default)]
pub(crate) struct CallStack {
    frames: [u16; STACK_DEPTH],
    sp: usize,
}

impl CallStack {
    pub(crate) fn push(&mut self, addr: u16) -> Result<()> {
        if self.sp == STACK_DEPTH {
            return Err(Chip8Error::StackOverflow { depth: self.sp });
        }
        self.frames[self.sp] = addr;
        self.sp += 1;
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<u16> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.frames[self.sp])
    }

    pub(crate) fn depth(&self) -> usize {
        self.sp
    }

    /// Live frames, oldest first.
    pub(crate) fn frames(&self) -> &[u16] {
        &self.frames[..self.sp]
    }
}
