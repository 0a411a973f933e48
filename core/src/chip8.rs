// CHIP-8 interpreter
//
// Useful links:
// * [Guide to making a CHIP-8 emulator](https://tobiasvl.github.io/blog/write-a-chip-8-emulator/)
// * [Cowgod's Chip-8 Technical Reference](http://devernay.free.fr/hacks/chip8/C8TECH10.HTM)
//
// Arithmetic deliberately differs from the COSMAC VIP in three places:
// 8XY5/8XY7 store the absolute difference, and 8XYE puts the *low* bit of
// VX into VF. Programs written for this machine rely on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::display::{DisplayBuffer, DisplaySink, NullSink};
use crate::error::{Chip8Error, Result};
use crate::instruction::Instruction;
use crate::keypad::{Disconnected, KeyWait, Keyboard};
use crate::memory::{AddressSpace, DEFAULT_FONT};
use crate::registers::{CallStack, Registers, FLAG};
use crate::timer::{TimerClock, Timers, TIMER_HZ};

/// What a cancelled key wait (FX0A) means to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyWaitMode {
    /// Wait until a key arrives. The wait is only given up while halting,
    /// any other interruption means the keyboard is gone.
    #[default]
    Blocking,
    /// An interrupted wait stops execution before the instruction completes.
    Interruptible,
}

/// Result of executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// A key wait was cancelled. PC still points at the FX0A instruction.
    Interrupted,
}

/// Kill switch for [`Chip8::run`], usable from any thread.
#[derive(Debug, Clone, Default)]
pub struct HaltHandle(Arc<AtomicBool>);

impl HaltHandle {
    pub fn halt(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_halted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct Chip8Builder {
    /// ROM
    rom: Option<Vec<u8>>,
    /// Font sprite
    font: Option<Vec<u8>>,
    /// PRNG Seed
    rng_seed: Option<u64>,
    keyboard: Option<Box<dyn Keyboard + Send>>,
    sink: Option<Box<dyn DisplaySink + Send>>,
    key_wait: KeyWaitMode,
    /// Start the 60Hz timer thread on build
    timer_clock: bool,
    /// Instructions per second for `run`, unthrottled when None
    ips: Option<u32>,
}

pub struct Chip8 {
    memory: AddressSpace,
    regs: Registers,
    stack: CallStack,
    timers: Arc<Timers>,
    clock: Option<TimerClock>,
    display: DisplayBuffer,
    keyboard: Box<dyn Keyboard + Send>,
    sink: Box<dyn DisplaySink + Send>,
    rng: StdRng,
    key_wait: KeyWaitMode,
    ips: Option<u32>,
    halt: HaltHandle,
}

impl Default for Chip8Builder {
    fn default() -> Self {
        Chip8Builder::new()
    }
}

impl Chip8Builder {
    pub fn new() -> Chip8Builder {
        Chip8Builder {
            rom: None,
            font: None,
            rng_seed: None,
            keyboard: None,
            sink: None,
            key_wait: KeyWaitMode::default(),
            timer_clock: true,
            ips: None,
        }
    }

    pub fn with_rom(mut self, rom: Vec<u8>) -> Self {
        self.rom = Some(rom);
        self
    }

    pub fn with_font(mut self, font: Vec<u8>) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_keyboard(mut self, keyboard: impl Keyboard + Send + 'static) -> Self {
        self.keyboard = Some(Box::new(keyboard));
        self
    }

    pub fn with_display_sink(mut self, sink: impl DisplaySink + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn with_key_wait(mut self, mode: KeyWaitMode) -> Self {
        self.key_wait = mode;
        self
    }

    pub fn with_timer_clock(mut self, enabled: bool) -> Self {
        self.timer_clock = enabled;
        self
    }

    pub fn with_ips(mut self, ips: u32) -> Self {
        self.ips = Some(ips);
        self
    }

    pub fn build(self) -> Result<Chip8> {
        let font = self.font.as_deref().unwrap_or(&DEFAULT_FONT[..]);
        let mut memory = AddressSpace::with_font(font)?;

        let rom = self.rom.ok_or(Chip8Error::MissingRom)?;
        memory.load_rom(&rom)?;
        info!("Loaded ROM [size: {}]", rom.len());

        let rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let timers = Arc::new(Timers::default());
        let clock = if self.timer_clock {
            Some(TimerClock::start(Arc::clone(&timers), TIMER_HZ)?)
        } else {
            None
        };

        Ok(Chip8 {
            memory,
            regs: Registers::default(),
            stack: CallStack::default(),
            timers,
            clock,
            display: DisplayBuffer::default(),
            keyboard: self.keyboard.unwrap_or_else(|| Box::new(Disconnected)),
            sink: self.sink.unwrap_or_else(|| Box::new(NullSink)),
            rng,
            key_wait: self.key_wait,
            ips: self.ips,
            halt: HaltHandle::default(),
        })
    }
}

impl Chip8 {
    pub fn pc(&self) -> u16 {
        self.regs.pc
    }

    pub fn index(&self) -> u16 {
        self.regs.index
    }

    pub fn registers(&self) -> &[u8] {
        &self.regs.v
    }

    pub fn stack(&self) -> &[u16] {
        self.stack.frames()
    }

    pub fn memory(&self) -> &AddressSpace {
        &self.memory
    }

    pub fn display(&self) -> &DisplayBuffer {
        &self.display
    }

    /// Shared handle to the delay and sound timers, e.g. for a sound device.
    pub fn timers(&self) -> Arc<Timers> {
        Arc::clone(&self.timers)
    }

    pub fn halt_handle(&self) -> HaltHandle {
        self.halt.clone()
    }

    pub fn has_timer_clock(&self) -> bool {
        self.clock.is_some()
    }

    /// Count the timers down once, for hosts that run without the clock
    /// thread.
    pub fn tick_timers(&self) {
        self.timers.tick();
    }

    /// Execute instructions until halted, or until an interruptible key wait
    /// is cancelled. Fatal faults are returned as errors.
    pub fn run(&mut self) -> Result<()> {
        let delta = self.ips.map(|ips| Duration::from_secs(1) / ips.max(1));
        let mut next_step = Instant::now();

        while !self.halt.is_halted() {
            if let Some(delta) = delta {
                let now = Instant::now();
                if let Some(delay) = next_step.checked_duration_since(now) {
                    thread::sleep(delay);
                }
                // Don't race to catch up after a long key wait
                next_step = (next_step + delta).max(now);
            }

            if self.step()? == Step::Interrupted {
                info!("Execution interrupted at 0x{:04x}", self.regs.pc);
                return Ok(());
            }
        }

        info!("Execution halted at 0x{:04x}", self.regs.pc);
        Ok(())
    }

    /// Fetch, decode and execute the instruction at PC.
    pub fn step(&mut self) -> Result<Step> {
        let pc = self.regs.pc;
        let raw = self.memory.read_u16_be(pc)?;

        match Instruction::decode(raw) {
            Ok(inst) => {
                trace!("0x{:04x}: {:04x} {}", pc, raw, inst);
                self.execute(inst)
            }
            Err(err) => {
                warn!("0x{:04x}: {}, skipping", pc, err);
                self.regs.advance();
                Ok(Step::Continue)
            }
        }
    }

    fn execute(&mut self, inst: Instruction) -> Result<Step> {
        let v = &mut self.regs.v;

        match inst {
            Instruction::ClearDisplay => {
                self.display.clear();
                self.sink.present(&self.display);
                self.regs.advance();
            }
            Instruction::Return => {
                self.regs.pc = self.stack.pop()?;
                self.regs.advance();
            }
            Instruction::Jump { addr } => {
                self.regs.pc = addr;
            }
            Instruction::Call { addr } => {
                self.stack.push(self.regs.pc)?;
                debug!("call 0x{:03x} [depth: {}]", addr, self.stack.depth());
                self.regs.pc = addr;
            }
            Instruction::SkipIfEq { x, imm } => {
                let cond = v[x] == imm;
                self.regs.skip_if(cond);
            }
            Instruction::SkipIfNe { x, imm } => {
                let cond = v[x] != imm;
                self.regs.skip_if(cond);
            }
            Instruction::SkipIfRegEq { x, y } => {
                let cond = v[x] == v[y];
                self.regs.skip_if(cond);
            }
            Instruction::SkipIfRegNe { x, y } => {
                let cond = v[x] != v[y];
                self.regs.skip_if(cond);
            }
            Instruction::Set { x, imm } => {
                v[x] = imm;
                self.regs.advance();
            }
            Instruction::AddImm { x, imm } => {
                v[x] = v[x].wrapping_add(imm);
                self.regs.advance();
            }
            Instruction::Copy { x, y } => {
                v[x] = v[y];
                self.regs.advance();
            }
            Instruction::Or { x, y } => {
                v[x] |= v[y];
                self.regs.advance();
            }
            Instruction::And { x, y } => {
                v[x] &= v[y];
                self.regs.advance();
            }
            Instruction::Xor { x, y } => {
                v[x] ^= v[y];
                self.regs.advance();
            }
            Instruction::AddReg { x, y } => {
                let (sum, carry) = v[x].overflowing_add(v[y]);
                v[x] = sum;
                v[FLAG] = carry as u8;
                self.regs.advance();
            }
            Instruction::Sub { x, y } => {
                let (vx, vy) = (v[x], v[y]);
                v[FLAG] = (vx > vy) as u8;
                v[x] = vx.abs_diff(vy);
                self.regs.advance();
            }
            Instruction::ShiftRight { x } => {
                let bit = v[x] & 0x01;
                v[x] >>= 1;
                v[FLAG] = bit;
                self.regs.advance();
            }
            Instruction::SubN { x, y } => {
                let (vx, vy) = (v[x], v[y]);
                v[FLAG] = (vy > vx) as u8;
                v[x] = vy.abs_diff(vx);
                self.regs.advance();
            }
            Instruction::ShiftLeft { x } => {
                let bit = v[x] & 0x01;
                v[x] <<= 1;
                v[FLAG] = bit;
                self.regs.advance();
            }
            Instruction::SetIndex { addr } => {
                self.regs.index = addr;
                self.regs.advance();
            }
            Instruction::JumpPlusV0 { addr } => {
                self.regs.pc = addr + v[0] as u16;
            }
            Instruction::RandAnd { x, mask } => {
                let n = self.rng.next_u32() as u8;
                v[x] = n & mask;
                self.regs.advance();
            }
            Instruction::Draw { x, y, height } => {
                let (ox, oy) = (v[x] as usize, v[y] as usize);
                let sprite = self.memory.slice(self.regs.index, height as usize)?;
                let collision = self.display.draw_sprite(sprite, ox, oy);
                self.regs.v[FLAG] = collision as u8;
                self.sink.present(&self.display);
                self.regs.advance();
            }
            Instruction::SkipIfKey { x } => {
                let vx = v[x];
                let pressed = self.keyboard.pressed_key();
                self.regs.skip_if(pressed.map(|k| k.value()) == Some(vx));
            }
            Instruction::SkipIfNotKey { x } => {
                let vx = v[x];
                let pressed = self.keyboard.pressed_key();
                self.regs.skip_if(pressed.map(|k| k.value()) != Some(vx));
            }
            Instruction::GetDelay { x } => {
                v[x] = self.timers.delay();
                self.regs.advance();
            }
            Instruction::WaitKey { x } => {
                debug!("waiting for key press");
                match self.keyboard.wait_for_key() {
                    KeyWait::Pressed(key) => {
                        debug!("key {:X} pressed", key.value());
                        self.regs.v[x] = key.value();
                        self.regs.advance();
                    }
                    KeyWait::Interrupted
                        if self.key_wait == KeyWaitMode::Interruptible
                            || self.halt.is_halted() =>
                    {
                        return Ok(Step::Interrupted);
                    }
                    KeyWait::Interrupted => return Err(Chip8Error::KeyboardUnavailable),
                }
            }
            Instruction::SetDelay { x } => {
                self.timers.set_delay(v[x]);
                self.regs.advance();
            }
            Instruction::SetSound { x } => {
                self.timers.set_sound(v[x]);
                self.regs.advance();
            }
            Instruction::AddToIndex { x } => {
                self.regs.index = self.regs.index.wrapping_add(v[x] as u16);
                self.regs.advance();
            }
            Instruction::FontAddress { x } => {
                self.regs.index = AddressSpace::font_address(v[x]);
                self.regs.advance();
            }
            Instruction::StoreBcd { x } => {
                let value = self.regs.v[x];
                let digits = [value / 100, (value % 100) / 10, value % 10];
                for (offset, digit) in digits.into_iter().enumerate() {
                    let addr = self.index_offset(offset)?;
                    self.memory.write_u8(addr, digit)?;
                }
                self.regs.advance();
            }
            Instruction::RegDump { x } => {
                for i in 0..=x {
                    let addr = self.index_offset(i)?;
                    self.memory.write_u8(addr, self.regs.v[i])?;
                }
                self.regs.advance();
            }
            Instruction::RegLoad { x } => {
                for i in 0..=x {
                    let addr = self.index_offset(i)?;
                    self.regs.v[i] = self.memory.read_u8(addr)?;
                }
                self.regs.advance();
            }
        }

        Ok(Step::Continue)
    }

    /// I + offset, as an address. Overflowing 16 bits is out of range.
    fn index_offset(&self, offset: usize) -> Result<u16> {
        let addr = self.regs.index as usize + offset;
        u16::try_from(addr).map_err(|_| Chip8Error::AddressOutOfRange { address: addr })
    }
}
