use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while loading or running an Intcode program.
///
/// All variants are terminal for the run that raised them. A memory image
/// that produced an error mid-run may be partially mutated and should not be
/// resumed.
#[derive(Debug, Error)]
pub enum Error {
    /// A token in the program text is not a signed decimal integer.
    #[error("line {line}, column {column} (address {address}): invalid integer {token:?}")]
    Format {
        line: usize,
        column: usize,
        address: usize,
        token: String,
    },

    /// A read or write touched an address outside `0..size`.
    #[error("address {address} is out of range for memory of size {size}")]
    OutOfRange { address: i64, size: usize },

    #[error("unknown opcode {opcode} at position {ip}")]
    UnknownOpcode { opcode: i64, ip: usize },

    /// The instruction pointer ran off the end of memory before a halt.
    #[error("no halt instruction before end of memory (ip {ip}, size {size})")]
    MissingHalt { ip: usize, size: usize },

    #[error("no program loaded")]
    EmptyProgram,

    /// Raised only by budgeted runs; the core loop has no step limit.
    #[error("step limit of {limit} exceeded without halting")]
    StepLimit { limit: usize },

    #[error("cannot load program from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a run stopped without halting. Kept by the machine after the error
/// that raised it has been returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    OutOfRange { address: i64, size: usize },
    UnknownOpcode { opcode: i64, ip: usize },
    MissingHalt { ip: usize, size: usize },
    EmptyProgram,
    StepLimit { limit: usize },
}

impl From<Fault> for Error {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::OutOfRange { address, size } => Error::OutOfRange { address, size },
            Fault::UnknownOpcode { opcode, ip } => Error::UnknownOpcode { opcode, ip },
            Fault::MissingHalt { ip, size } => Error::MissingHalt { ip, size },
            Fault::EmptyProgram => Error::EmptyProgram,
            Fault::StepLimit { limit } => Error::StepLimit { limit },
        }
    }
}

impl Error {
    /// The run-terminating fault this error represents, if it was raised
    /// while the machine was executing rather than while loading.
    pub fn fault(&self) -> Option<Fault> {
        match *self {
            Error::OutOfRange { address, size } => Some(Fault::OutOfRange { address, size }),
            Error::UnknownOpcode { opcode, ip } => Some(Fault::UnknownOpcode { opcode, ip }),
            Error::MissingHalt { ip, size } => Some(Fault::MissingHalt { ip, size }),
            Error::EmptyProgram => Some(Fault::EmptyProgram),
            Error::StepLimit { limit } => Some(Fault::StepLimit { limit }),
            Error::Format { .. } | Error::Io { .. } => None,
        }
    }

    /// True for errors raised while the machine was executing, as opposed to
    /// loading or host-side failures.
    pub fn is_runtime(&self) -> bool {
        self.fault().is_some()
    }
}
