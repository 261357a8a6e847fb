use crate::error::{Error, Result};
use crate::memory::Memory;
use crate::mode::AddressMode;

/// The Intcode instruction set.
///
/// Opcodes:
/// - 1  (ADD): `*c = *a + *b`
/// - 2  (MUL): `*c = *a * *b`
/// - 99 (HLT): stop
///
/// Both binary opcodes take three operands. Any other opcode value is fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Multiply,
    Halt,
}

const ADD: i64 = 1;
const MUL: i64 = 2;
const HLT: i64 = 99;

impl Opcode {
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            ADD => Some(Opcode::Add),
            MUL => Some(Opcode::Multiply),
            HLT => Some(Opcode::Halt),
            _ => None,
        }
    }

    pub fn value(self) -> i64 {
        match self {
            Opcode::Add => ADD,
            Opcode::Multiply => MUL,
            Opcode::Halt => HLT,
        }
    }

    /// Number of operand cells following the opcode cell.
    pub fn arity(self) -> usize {
        match self {
            Opcode::Add | Opcode::Multiply => 3,
            Opcode::Halt => 0,
        }
    }

    /// Opcode cell plus operand cells.
    pub fn width(self) -> usize {
        1 + self.arity()
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Multiply => "MUL",
            Opcode::Halt => "HLT",
        }
    }
}

/// An operand slot: the address of the parameter cell and how to resolve it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operand {
    pub address: i64,
    pub mode: AddressMode,
}

/// A decoded instruction. Built fresh every cycle from whatever memory holds
/// at the instruction pointer, so programs that rewrite themselves see their
/// own changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    Add { ip: usize, operands: [Operand; 3] },
    Multiply { ip: usize, operands: [Operand; 3] },
    Halt { ip: usize },
}

impl Instruction {
    pub fn ip(&self) -> usize {
        match *self {
            Instruction::Add { ip, .. }
            | Instruction::Multiply { ip, .. }
            | Instruction::Halt { ip } => ip,
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Multiply { .. } => Opcode::Multiply,
            Instruction::Halt { .. } => Opcode::Halt,
        }
    }

    /// One entry per operand cell; length equals the opcode's arity.
    pub fn operands(&self) -> &[Operand] {
        match self {
            Instruction::Add { operands, .. } | Instruction::Multiply { operands, .. } => operands.as_slice(),
            Instruction::Halt { .. } => &[],
        }
    }

    /// Override the addressing mode of each operand, in order. Extra modes
    /// are ignored; operands without a mode keep theirs.
    pub fn with_modes(mut self, modes: &[AddressMode]) -> Self {
        if let Instruction::Add { operands, .. } | Instruction::Multiply { operands, .. } =
            &mut self
        {
            for (operand, &mode) in operands.iter_mut().zip(modes) {
                operand.mode = mode;
            }
        }
        self
    }
}

/// Decode the instruction at `ip`. Operands default to position mode.
pub fn decode(memory: &Memory, ip: usize) -> Result<Instruction> {
    let value = memory.read(ip as i64)?;
    let opcode = Opcode::from_value(value).ok_or(Error::UnknownOpcode { opcode: value, ip })?;
    let operand = |k: usize| Operand {
        address: (ip + k) as i64,
        mode: AddressMode::Position,
    };
    Ok(match opcode {
        Opcode::Add => Instruction::Add {
            ip,
            operands: [operand(1), operand(2), operand(3)],
        },
        Opcode::Multiply => Instruction::Multiply {
            ip,
            operands: [operand(1), operand(2), operand(3)],
        },
        Opcode::Halt => Instruction::Halt { ip },
    })
}

/// Decode the instruction at `ip` with explicit operand modes.
pub fn decode_with_modes(memory: &Memory, ip: usize, modes: &[AddressMode]) -> Result<Instruction> {
    Ok(decode(memory, ip)?.with_modes(modes))
}
