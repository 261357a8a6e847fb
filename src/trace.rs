use std::fmt;
use std::io;

use crate::isa::Opcode;
use crate::mode::AddressMode;

/// One operand as it appeared when its instruction executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TracedOperand {
    pub mode: AddressMode,
    /// The value stored in the parameter cell.
    pub raw: i64,
    /// What the parameter resolved to before the instruction took effect.
    pub resolved: i64,
}

/// A record of one executed instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceEvent {
    pub ip: usize,
    pub opcode: Opcode,
    pub operands: Vec<TracedOperand>,
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:4}:\t{}", self.ip, self.opcode.mnemonic())?;
        for op in &self.operands {
            write!(f, "\t{}", op.mode.format_operand(op.raw, op.resolved))?;
        }
        Ok(())
    }
}

/// Side channel that receives every executed instruction.
///
/// Tracing must never affect what the machine computes; implementations only
/// observe.
pub trait Tracer {
    /// Whether events should be built at all. Resolving operands for display
    /// costs extra reads, so the machine skips that work when this is false.
    fn enabled(&self) -> bool {
        true
    }

    fn record(&mut self, event: &TraceEvent);
}

/// Discards everything.
pub struct NoTrace;

impl Tracer for NoTrace {
    fn enabled(&self) -> bool {
        false
    }

    fn record(&mut self, _event: &TraceEvent) {}
}

/// Collects events in memory.
impl Tracer for Vec<TraceEvent> {
    fn record(&mut self, event: &TraceEvent) {
        self.push(event.clone());
    }
}

/// Writes one human-readable line per instruction.
pub struct WriteTracer<W: io::Write> {
    out: W,
}

impl<W: io::Write> WriteTracer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: io::Write> Tracer for WriteTracer<W> {
    fn record(&mut self, event: &TraceEvent) {
        // A broken trace sink must not abort the run.
        if let Err(e) = writeln!(self.out, "{event}") {
            log::debug!("trace write failed: {e}");
        }
    }
}
