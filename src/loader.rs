use std::path::Path;

use crate::error::{Error, Result};
use crate::memory::Memory;

/// Parse comma-separated signed integers into a fresh memory image.
///
/// Each line is split on commas independently. Whitespace around tokens is
/// ignored, as are blank lines and a single trailing comma at the end of a
/// line. Any other token that is not an integer is a [`Error::Format`]
/// carrying its line, column and the address it would have been loaded at.
pub fn load(text: &str) -> Result<Memory> {
    let mut memory = Memory::new();
    for (line_idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split(',').collect();
        let last = tokens.len() - 1;
        let mut column = 1;
        for (i, raw) in tokens.iter().enumerate() {
            let token = raw.trim();
            if token.is_empty() && i == last && i > 0 {
                break;
            }
            let value = token.parse::<i64>().map_err(|_| Error::Format {
                line: line_idx + 1,
                column: column + (raw.len() - raw.trim_start().len()),
                address: memory.size(),
                token: token.to_string(),
            })?;
            memory.push(value);
            column += raw.len() + 1;
        }
    }
    log::debug!("loaded {} cells", memory.size());
    Ok(memory)
}

/// Read and parse a program file.
///
/// Bytes that are not valid UTF-8 reach the parser as replacement
/// characters, so they are reported as a bad token with its position.
pub fn load_file(path: impl AsRef<Path>) -> Result<Memory> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load(&String::from_utf8_lossy(&bytes))
}
