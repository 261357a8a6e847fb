use std::fmt;

use crate::error::Result;
use crate::memory::Memory;

/// How an operand is turned into an effective memory location.
///
/// `operand` below is always the address of the parameter cell itself
/// (e.g. `ip + 1`).
///
/// - `Position`: the parameter cell holds an address. Reads fetch the value
///   stored there, writes target it.
/// - `Immediate`: the parameter cell is the final location. Reads fetch its
///   value directly, writes target the parameter cell.
/// - `Value`: resolves exactly like `Position`. It only changes how the
///   operand is rendered in a trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AddressMode {
    #[default]
    Position,
    Immediate,
    Value,
}

impl AddressMode {
    /// The value an operand yields when used as a source.
    pub fn resolve_read(self, memory: &Memory, operand: i64) -> Result<i64> {
        match self {
            AddressMode::Immediate => memory.read(operand),
            AddressMode::Position | AddressMode::Value => memory.read(memory.read(operand)?),
        }
    }

    /// The address an operand designates when used as a destination.
    pub fn resolve_write(self, memory: &Memory, operand: i64) -> Result<i64> {
        match self {
            AddressMode::Immediate => Ok(operand),
            AddressMode::Position | AddressMode::Value => memory.read(operand),
        }
    }

    /// Render an operand for a trace line: raw stored value tagged by mode,
    /// followed by what it resolves to.
    pub fn format_operand(self, raw: i64, resolved: i64) -> String {
        match self {
            AddressMode::Immediate => format!("${raw:4}  ({resolved})"),
            AddressMode::Position => format!("[{raw:4}] ({resolved})"),
            AddressMode::Value => format!(" {raw:4}  ({resolved})"),
        }
    }
}

impl fmt::Display for AddressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressMode::Position => "position",
            AddressMode::Immediate => "immediate",
            AddressMode::Value => "value",
        };
        f.write_str(name)
    }
}
