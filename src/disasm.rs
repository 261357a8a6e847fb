use std::fmt::Write;

use crate::isa::Opcode;
use crate::memory::Memory;

/// Pretty-print a static listing of a memory image for human inspection.
///
/// Walks from address 0, treating each cell that holds a known opcode (with
/// enough cells left for its operands) as an instruction and everything
/// else as data. Operands are shown in position mode. The listing is only a
/// guess: self-modifying programs can execute something quite different.
pub fn disassemble(memory: &Memory) -> String {
    let cells = memory.cells();
    let mut out = String::new();
    let mut addr = 0;
    while addr < cells.len() {
        match Opcode::from_value(cells[addr]).filter(|op| addr + op.width() <= cells.len()) {
            Some(op) => {
                let raw = &cells[addr..addr + op.width()];
                let words: Vec<String> = raw.iter().map(|c| c.to_string()).collect();
                let args: Vec<String> = raw[1..].iter().map(|a| format!("[{a}]")).collect();
                let _ = writeln!(
                    out,
                    "{addr:4}: {:<20} {} {}",
                    words.join(","),
                    op.mnemonic(),
                    args.join(" ")
                );
                addr += op.width();
            }
            None => {
                let _ = writeln!(out, "{addr:4}: {:<20} DAT", cells[addr]);
                addr += 1;
            }
        }
    }
    out
}
