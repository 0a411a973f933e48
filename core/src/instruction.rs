use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown instruction 0x{0:04x}")]
    UnknownInstruction(u16),
}

/// One decoded CHIP-8 instruction. Register operands are indices 0-15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0
    ClearDisplay,
    /// 00EE
    Return,
    /// 1NNN
    Jump { addr: u16 },
    /// 2NNN
    Call { addr: u16 },
    /// 3XKK
    SkipIfEq { x: usize, imm: u8 },
    /// 4XKK
    SkipIfNe { x: usize, imm: u8 },
    /// 5XY0
    SkipIfRegEq { x: usize, y: usize },
    /// 6XKK
    Set { x: usize, imm: u8 },
    /// 7XKK
    AddImm { x: usize, imm: u8 },
    /// 8XY0
    Copy { x: usize, y: usize },
    /// 8XY1
    Or { x: usize, y: usize },
    /// 8XY2
    And { x: usize, y: usize },
    /// 8XY3
    Xor { x: usize, y: usize },
    /// 8XY4
    AddReg { x: usize, y: usize },
    /// 8XY5
    Sub { x: usize, y: usize },
    /// 8XY6
    ShiftRight { x: usize },
    /// 8XY7
    SubN { x: usize, y: usize },
    /// 8XYE
    ShiftLeft { x: usize },
    /// 9XY0
    SkipIfRegNe { x: usize, y: usize },
    /// ANNN
    SetIndex { addr: u16 },
    /// BNNN
    JumpPlusV0 { addr: u16 },
    /// CXKK
    RandAnd { x: usize, mask: u8 },
    /// DXYN
    Draw { x: usize, y: usize, height: u8 },
    /// EX9E
    SkipIfKey { x: usize },
    /// EXA1
    SkipIfNotKey { x: usize },
    /// FX07
    GetDelay { x: usize },
    /// FX0A
    WaitKey { x: usize },
    /// FX15
    SetDelay { x: usize },
    /// FX18
    SetSound { x: usize },
    /// FX1E
    AddToIndex { x: usize },
    /// FX29
    FontAddress { x: usize },
    /// FX33
    StoreBcd { x: usize },
    /// FX55
    RegDump { x: usize },
    /// FX65
    RegLoad { x: usize },
}

impl Instruction {
    /// Decode a raw big-endian instruction word.
    pub fn decode(raw: u16) -> Result<Instruction, DecodeError> {
        let n1 = (raw >> 12) & 0xF;
        let x = ((raw >> 8) & 0xF) as usize;
        let y = ((raw >> 4) & 0xF) as usize;
        let n = (raw & 0xF) as u8;
        let kk = (raw & 0xFF) as u8;
        let nnn = raw & 0x0FFF;

        let inst = match (n1, n) {
            (0x0, _) => match nnn {
                0x0E0 => Instruction::ClearDisplay,
                0x0EE => Instruction::Return,
                _ => return Err(DecodeError::UnknownInstruction(raw)),
            },
            (0x1, _) => Instruction::Jump { addr: nnn },
            (0x2, _) => Instruction::Call { addr: nnn },
            (0x3, _) => Instruction::SkipIfEq { x, imm: kk },
            (0x4, _) => Instruction::SkipIfNe { x, imm: kk },
            (0x5, 0x0) => Instruction::SkipIfRegEq { x, y },
            (0x6, _) => Instruction::Set { x, imm: kk },
            (0x7, _) => Instruction::AddImm { x, imm: kk },
            (0x8, 0x0) => Instruction::Copy { x, y },
            (0x8, 0x1) => Instruction::Or { x, y },
            (0x8, 0x2) => Instruction::And { x, y },
            (0x8, 0x3) => Instruction::Xor { x, y },
            (0x8, 0x4) => Instruction::AddReg { x, y },
            (0x8, 0x5) => Instruction::Sub { x, y },
            (0x8, 0x6) => Instruction::ShiftRight { x },
            (0x8, 0x7) => Instruction::SubN { x, y },
            (0x8, 0xE) => Instruction::ShiftLeft { x },
            (0x9, 0x0) => Instruction::SkipIfRegNe { x, y },
            (0xA, _) => Instruction::SetIndex { addr: nnn },
            (0xB, _) => Instruction::JumpPlusV0 { addr: nnn },
            (0xC, _) => Instruction::RandAnd { x, mask: kk },
            (0xD, _) => Instruction::Draw { x, y, height: n },
            (0xE, _) => match kk {
                0x9E => Instruction::SkipIfKey { x },
                0xA1 => Instruction::SkipIfNotKey { x },
                _ => return Err(DecodeError::UnknownInstruction(raw)),
            },
            (0xF, _) => match kk {
                0x07 => Instruction::GetDelay { x },
                0x0A => Instruction::WaitKey { x },
                0x15 => Instruction::SetDelay { x },
                0x18 => Instruction::SetSound { x },
                0x1E => Instruction::AddToIndex { x },
                0x29 => Instruction::FontAddress { x },
                0x33 => Instruction::StoreBcd { x },
                0x55 => Instruction::RegDump { x },
                0x65 => Instruction::RegLoad { x },
                _ => return Err(DecodeError::UnknownInstruction(raw)),
            },
            _ => return Err(DecodeError::UnknownInstruction(raw)),
        };
        Ok(inst)
    }
}

// Assembler style mnemonics, used when tracing execution.
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            ClearDisplay => write!(f, "CLS"),
            Return => write!(f, "RET"),
            Jump { addr } => write!(f, "JP 0x{:03x}", addr),
            Call { addr } => write!(f, "CALL 0x{:03x}", addr),
            SkipIfEq { x, imm } => write!(f, "SE V{:X}, 0x{:02x}", x, imm),
            SkipIfNe { x, imm } => write!(f, "SNE V{:X}, 0x{:02x}", x, imm),
            SkipIfRegEq { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            Set { x, imm } => write!(f, "LD V{:X}, 0x{:02x}", x, imm),
            AddImm { x, imm } => write!(f, "ADD V{:X}, 0x{:02x}", x, imm),
            Copy { x, y } => write!(f, "LD V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg { x, y } => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB V{:X}, V{:X}", x, y),
            ShiftRight { x } => write!(f, "SHR V{:X}", x),
            SubN { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x } => write!(f, "SHL V{:X}", x),
            SkipIfRegNe { x, y } => write!(f, "SNE V{:X}, V{:X}", x, y),
            SetIndex { addr } => write!(f, "LD I, 0x{:03x}", addr),
            JumpPlusV0 { addr } => write!(f, "JP V0, 0x{:03x}", addr),
            RandAnd { x, mask } => write!(f, "RND V{:X}, 0x{:02x}", x, mask),
            Draw { x, y, height } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, height),
            SkipIfKey { x } => write!(f, "SKP V{:X}", x),
            SkipIfNotKey { x } => write!(f, "SKNP V{:X}", x),
            GetDelay { x } => write!(f, "LD V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD V{:X}, K", x),
            SetDelay { x } => write!(f, "LD DT, V{:X}", x),
            SetSound { x } => write!(f, "LD ST, V{:X}", x),
            AddToIndex { x } => write!(f, "ADD I, V{:X}", x),
            FontAddress { x } => write!(f, "LD F, V{:X}", x),
            StoreBcd { x } => write!(f, "LD B, V{:X}", x),
            RegDump { x } => write!(f, "LD [I], V{:X}", x),
            RegLoad { x } => write!(f, "LD V{:X}, [I]", x),
        }
    }
}
