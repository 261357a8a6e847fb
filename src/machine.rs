use crate::error::{Error, Fault, Result};
use crate::isa::{self, Instruction, Opcode, Operand};
use crate::loader;
use crate::memory::Memory;
use crate::mode::AddressMode;
use crate::trace::{NoTrace, TraceEvent, TracedOperand, Tracer};

/// Lifecycle of a machine.
///
/// `Ready` until the first run or step, `Running` while the fetch-decode-
/// execute loop is live, then one of the two terminal states. `Failed` keeps
/// the fault that ended the run. Starting a new run from a terminal state
/// resets the instruction pointer to 0 but keeps memory as the previous run
/// left it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Ready,
    Running,
    Halted,
    Failed(Fault),
}

/// Options for a single run, as picked by a host.
#[derive(Clone, Debug, Default)]
pub struct RunConfig {
    /// Print every executed instruction.
    pub trace: bool,
    /// Give up after this many instructions. `None` runs until halt or error.
    pub step_limit: Option<usize>,
}

/// An Intcode machine: one memory image and the instruction pointer that
/// walks it.
///
/// The machine owns its memory exclusively. To run the same program many
/// times, give each run its own clone of the original memory.
#[derive(Clone, Debug)]
pub struct Machine {
    memory: Memory,
    ip: usize,
    state: State,
    steps: usize,
}

impl Machine {
    pub fn new(memory: Memory) -> Self {
        Self {
            memory,
            ip: 0,
            state: State::Ready,
            steps: 0,
        }
    }

    /// Parse program text straight into a ready machine.
    pub fn load(text: &str) -> Result<Self> {
        Ok(Self::new(loader::load(text)?))
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn into_memory(self) -> Memory {
        self.memory
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Instructions executed in the current run, including the final halt.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Read a cell directly.
    pub fn read(&self, address: i64) -> Result<i64> {
        self.memory.read(address)
    }

    /// Write a cell directly.
    pub fn write(&mut self, address: i64, value: i64) -> Result<()> {
        self.memory.write(address, value)
    }

    /// Read through the address resolver, e.g. to follow a pointer cell.
    pub fn peek(&self, operand: i64, mode: AddressMode) -> Result<i64> {
        mode.resolve_read(&self.memory, operand)
    }

    /// Write through the address resolver.
    pub fn poke(&mut self, operand: i64, value: i64, mode: AddressMode) -> Result<()> {
        let target = mode.resolve_write(&self.memory, operand)?;
        self.memory.write(target, value)
    }

    /// Run from address 0 until halt.
    pub fn run(&mut self) -> Result<()> {
        self.run_traced(&mut NoTrace)
    }

    /// Run from address 0 until halt, reporting each instruction to `tracer`.
    pub fn run_traced<T: Tracer + ?Sized>(&mut self, tracer: &mut T) -> Result<()> {
        self.start()?;
        while self.step(tracer)? != State::Halted {}
        log::debug!("halted at {} after {} steps", self.ip, self.steps);
        Ok(())
    }

    /// Run from address 0, failing with [`Error::StepLimit`] if the program
    /// has not halted after `limit` instructions.
    pub fn run_bounded<T: Tracer + ?Sized>(&mut self, limit: usize, tracer: &mut T) -> Result<()> {
        self.start()?;
        while self.steps < limit {
            if self.step(tracer)? == State::Halted {
                log::debug!("halted at {} after {} steps", self.ip, self.steps);
                return Ok(());
            }
        }
        let fault = Fault::StepLimit { limit };
        self.state = State::Failed(fault);
        Err(fault.into())
    }

    /// Run according to a host's [`RunConfig`].
    pub fn run_with<T: Tracer + ?Sized>(&mut self, config: &RunConfig, tracer: &mut T) -> Result<()> {
        match (config.trace, config.step_limit) {
            (true, Some(limit)) => self.run_bounded(limit, tracer),
            (true, None) => self.run_traced(tracer),
            (false, Some(limit)) => self.run_bounded(limit, &mut NoTrace),
            (false, None) => self.run(),
        }
    }

    /// Execute a single instruction.
    ///
    /// A `Ready` machine is started first. Stepping a halted machine does
    /// nothing; stepping a failed one returns the fault that stopped it.
    pub fn step<T: Tracer + ?Sized>(&mut self, tracer: &mut T) -> Result<State> {
        match self.state {
            State::Ready => self.start()?,
            State::Running => {}
            State::Halted => return Ok(State::Halted),
            State::Failed(fault) => return Err(fault.into()),
        }
        match self.cycle(tracer) {
            Ok(state) => {
                self.state = state;
                Ok(state)
            }
            Err(e) => {
                log::debug!("run failed at {}: {e}", self.ip);
                if let Some(fault) = e.fault() {
                    self.state = State::Failed(fault);
                }
                Err(e)
            }
        }
    }

    fn start(&mut self) -> Result<()> {
        self.ip = 0;
        self.steps = 0;
        if self.memory.is_empty() {
            self.state = State::Failed(Fault::EmptyProgram);
            return Err(Error::EmptyProgram);
        }
        self.state = State::Running;
        Ok(())
    }

    /// One fetch-decode-execute cycle. The opcode is re-read from memory
    /// every time.
    fn cycle<T: Tracer + ?Sized>(&mut self, tracer: &mut T) -> Result<State> {
        let instr = isa::decode(&self.memory, self.ip)?;
        self.execute(&instr, tracer)?;
        self.steps += 1;
        if instr.opcode() == Opcode::Halt {
            return Ok(State::Halted);
        }
        self.ip += instr.opcode().width();
        if self.ip >= self.memory.size() {
            return Err(Error::MissingHalt {
                ip: self.ip,
                size: self.memory.size(),
            });
        }
        Ok(State::Running)
    }

    /// Carry out a decoded instruction against memory. Does not move the
    /// instruction pointer.
    pub fn execute<T: Tracer + ?Sized>(&mut self, instr: &Instruction, tracer: &mut T) -> Result<()> {
        log::trace!("{:4}: {}", instr.ip(), instr.opcode().mnemonic());
        match *instr {
            Instruction::Halt { ip } => {
                if tracer.enabled() {
                    tracer.record(&TraceEvent {
                        ip,
                        opcode: Opcode::Halt,
                        operands: Vec::new(),
                    });
                }
                Ok(())
            }
            Instruction::Add { ip, operands } => {
                self.binary(ip, Opcode::Add, operands, i64::wrapping_add, tracer)
            }
            Instruction::Multiply { ip, operands } => {
                self.binary(ip, Opcode::Multiply, operands, i64::wrapping_mul, tracer)
            }
        }
    }

    fn binary<T: Tracer + ?Sized>(
        &mut self,
        ip: usize,
        opcode: Opcode,
        [a, b, c]: [Operand; 3],
        op: fn(i64, i64) -> i64,
        tracer: &mut T,
    ) -> Result<()> {
        let x = a.mode.resolve_read(&self.memory, a.address)?;
        let y = b.mode.resolve_read(&self.memory, b.address)?;
        let target = c.mode.resolve_write(&self.memory, c.address)?;

        if tracer.enabled() {
            // Any read that fails here would fail identically in the write below.
            let before = self.memory.read(target)?;
            let event = TraceEvent {
                ip,
                opcode,
                operands: vec![
                    self.traced(a, x)?,
                    self.traced(b, y)?,
                    self.traced(c, before)?,
                ],
            };
            tracer.record(&event);
        }

        self.memory.write(target, op(x, y))
    }

    fn traced(&self, operand: Operand, resolved: i64) -> Result<TracedOperand> {
        Ok(TracedOperand {
            mode: operand.mode,
            raw: self.memory.read(operand.address)?,
            resolved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::WriteTracer;

    fn run_program(text: &str) -> Result<Vec<i64>> {
        let mut m = Machine::load(text)?;
        m.run()?;
        Ok(m.into_memory().into_cells())
    }

    #[test]
    fn test_worked_example() {
        assert_eq!(
            run_program("1,9,10,3,2,3,11,0,99,30,40,50").unwrap(),
            vec![3500, 9, 10, 70, 2, 3, 11, 0, 99, 30, 40, 50]
        );
    }

    #[test]
    fn test_small_programs() {
        assert_eq!(run_program("1,0,0,0,99").unwrap(), vec![2, 0, 0, 0, 99]);
        assert_eq!(run_program("2,3,0,3,99").unwrap(), vec![2, 3, 0, 6, 99]);
        assert_eq!(run_program("2,4,4,5,99,0").unwrap(), vec![2, 4, 4, 5, 99, 9801]);
    }

    #[test]
    fn test_self_modifying_program() {
        // The first ADD overwrites cell 4 (a HLT) with MUL, so execution
        // continues instead of stopping there.
        assert_eq!(
            run_program("1,1,1,4,99,5,6,0,99").unwrap(),
            vec![30, 1, 1, 4, 2, 5, 6, 0, 99]
        );
    }

    #[test]
    fn test_missing_halt() {
        let mut m = Machine::load("1,0,0,0").unwrap();
        assert!(matches!(m.run(), Err(Error::MissingHalt { ip: 4, size: 4 })));
        assert_eq!(m.state(), State::Failed(Fault::MissingHalt { ip: 4, size: 4 }));
        // The instruction before the failure still took effect.
        assert_eq!(m.read(0).unwrap(), 2);
    }

    #[test]
    fn test_unknown_opcode() {
        let mut m = Machine::load("3,0,0,0,99").unwrap();
        assert!(matches!(
            m.run(),
            Err(Error::UnknownOpcode { opcode: 3, ip: 0 })
        ));
        assert_eq!(m.state(), State::Failed(Fault::UnknownOpcode { opcode: 3, ip: 0 }));
    }

    #[test]
    fn test_stepping_failed_machine_repeats_fault() {
        let mut m = Machine::load("3,0,0,0,99").unwrap();
        for _ in 0..2 {
            assert!(matches!(
                m.step(&mut NoTrace),
                Err(Error::UnknownOpcode { opcode: 3, ip: 0 })
            ));
        }
        assert_eq!(m.state(), State::Failed(Fault::UnknownOpcode { opcode: 3, ip: 0 }));
        assert_eq!(m.ip(), 0);
        assert_eq!(m.steps(), 0);
    }

    #[test]
    fn test_stepping_after_missing_halt_repeats_fault() {
        let mut m = Machine::load("1,0,0,0").unwrap();
        assert!(m.step(&mut NoTrace).is_err());
        assert!(matches!(
            m.step(&mut NoTrace),
            Err(Error::MissingHalt { ip: 4, size: 4 })
        ));
        // The failed step did not execute anything further.
        assert_eq!(m.read(0).unwrap(), 2);
    }

    #[test]
    fn test_unknown_opcode_after_progress() {
        let mut m = Machine::load("1,0,0,0,7,0,0,0,99").unwrap();
        assert!(matches!(
            m.run(),
            Err(Error::UnknownOpcode { opcode: 7, ip: 4 })
        ));
        assert_eq!(m.steps(), 1);
    }

    #[test]
    fn test_empty_program() {
        let mut m = Machine::new(Memory::new());
        assert!(matches!(m.run(), Err(Error::EmptyProgram)));
        assert_eq!(m.state(), State::Failed(Fault::EmptyProgram));
        assert!(matches!(m.step(&mut NoTrace), Err(Error::EmptyProgram)));
        assert_eq!(m.steps(), 0);
    }

    #[test]
    fn test_operand_out_of_range() {
        // Source operand points past the end.
        let mut m = Machine::load("1,50,0,0,99").unwrap();
        assert!(matches!(
            m.run(),
            Err(Error::OutOfRange { address: 50, size: 5 })
        ));
    }

    #[test]
    fn test_truncated_instruction() {
        let mut m = Machine::load("1,0,0").unwrap();
        assert!(matches!(m.run(), Err(Error::OutOfRange { address: 3, .. })));
    }

    #[test]
    fn test_halt_alone() {
        let mut m = Machine::load("99").unwrap();
        m.run().unwrap();
        assert_eq!(m.state(), State::Halted);
        assert_eq!(m.ip(), 0);
        assert_eq!(m.steps(), 1);
    }

    #[test]
    fn test_state_transitions() {
        let mut m = Machine::load("1,0,0,0,99").unwrap();
        assert_eq!(m.state(), State::Ready);
        assert_eq!(m.step(&mut NoTrace).unwrap(), State::Running);
        assert_eq!(m.ip(), 4);
        assert_eq!(m.step(&mut NoTrace).unwrap(), State::Halted);
        // Terminal: further steps are no-ops.
        assert_eq!(m.step(&mut NoTrace).unwrap(), State::Halted);
        assert_eq!(m.ip(), 4);
        assert_eq!(m.steps(), 2);
    }

    #[test]
    fn test_run_bounded_stops_runaway() {
        // Three instructions before the halt, budget of two.
        let mut m = Machine::load("1,0,0,0,1,0,0,0,1,0,0,0,99").unwrap();
        assert!(matches!(
            m.run_bounded(2, &mut NoTrace),
            Err(Error::StepLimit { limit: 2 })
        ));
        assert_eq!(m.state(), State::Failed(Fault::StepLimit { limit: 2 }));
    }

    #[test]
    fn test_run_bounded_within_budget() {
        let mut m = Machine::load("1,0,0,0,99").unwrap();
        m.run_bounded(2, &mut NoTrace).unwrap();
        assert_eq!(m.state(), State::Halted);
    }

    #[test]
    fn test_rerun_restarts_at_zero_on_mutated_memory() {
        let mut m = Machine::load("1,0,0,0,99").unwrap();
        m.run().unwrap();
        m.run().unwrap();
        assert_eq!(m.read(0).unwrap(), 4);
    }

    #[test]
    fn test_peek_and_poke_modes() {
        let mut m = Machine::load("1,4,0,0,99").unwrap();
        assert_eq!(m.peek(1, AddressMode::Immediate).unwrap(), 4);
        assert_eq!(m.peek(1, AddressMode::Position).unwrap(), 99);
        m.poke(1, 12, AddressMode::Immediate).unwrap();
        assert_eq!(m.read(1).unwrap(), 12);
        m.poke(2, 5, AddressMode::Position).unwrap();
        // Cell 2 held 0, so position mode writes to cell 0.
        assert_eq!(m.read(0).unwrap(), 5);
    }

    #[test]
    fn test_poke_then_run() {
        let mut m = Machine::load("1,0,0,0,99,3,4").unwrap();
        m.write(1, 5).unwrap();
        m.write(2, 6).unwrap();
        m.run().unwrap();
        assert_eq!(m.read(0).unwrap(), 7);
    }

    #[test]
    fn test_trace_events() {
        let mut m = Machine::load("1,9,10,3,2,3,11,0,99,30,40,50").unwrap();
        let mut events: Vec<TraceEvent> = Vec::new();
        m.run_traced(&mut events).unwrap();
        assert_eq!(events.len(), 3);

        assert_eq!(events[0].opcode, Opcode::Add);
        let resolved: Vec<(i64, i64)> = events[0].operands.iter().map(|o| (o.raw, o.resolved)).collect();
        assert_eq!(resolved, vec![(9, 30), (10, 40), (3, 3)]);

        assert_eq!(events[1].ip, 4);
        assert_eq!(events[1].opcode, Opcode::Multiply);
        let resolved: Vec<(i64, i64)> = events[1].operands.iter().map(|o| (o.raw, o.resolved)).collect();
        assert_eq!(resolved, vec![(3, 70), (11, 50), (0, 1)]);

        assert_eq!(events[2].ip, 8);
        assert_eq!(events[2].opcode, Opcode::Halt);
        assert!(events[2].operands.is_empty());
    }

    #[test]
    fn test_trace_text() {
        let mut m = Machine::load("1,0,0,0,99").unwrap();
        let mut tracer = WriteTracer::new(Vec::new());
        m.run_traced(&mut tracer).unwrap();
        let text = String::from_utf8(tracer.into_inner()).unwrap();
        assert_eq!(
            text,
            "   0:\tADD\t[   0] (1)\t[   0] (1)\t[   0] (1)\n   4:\tHLT\n"
        );
    }

    #[test]
    fn test_tracing_does_not_change_results() {
        let text = "1,9,10,3,2,3,11,0,99,30,40,50";
        let mut plain = Machine::load(text).unwrap();
        plain.run().unwrap();
        let mut traced = Machine::load(text).unwrap();
        traced.run_traced(&mut Vec::<TraceEvent>::new()).unwrap();
        assert_eq!(plain.memory(), traced.memory());
        assert_eq!(plain.steps(), traced.steps());
    }

    #[test]
    fn test_run_with_config() {
        let mut m = Machine::load("1,0,0,0,99").unwrap();
        let mut events: Vec<TraceEvent> = Vec::new();
        m.run_with(&RunConfig::default(), &mut events).unwrap();
        assert!(events.is_empty());

        let mut m = Machine::load("1,0,0,0,99").unwrap();
        let config = RunConfig {
            trace: true,
            step_limit: Some(10),
        };
        m.run_with(&config, &mut events).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_execute_with_immediate_destination() {
        // ADD cell(4) + cell(5) into the operand cell itself at address 3.
        let mut m = Machine::load("1,4,5,3,99,0").unwrap();
        let instr = isa::decode_with_modes(
            m.memory(),
            0,
            &[AddressMode::Position, AddressMode::Position, AddressMode::Immediate],
        )
        .unwrap();
        m.execute(&instr, &mut NoTrace).unwrap();
        assert_eq!(m.read(3).unwrap(), 99);
    }
}
