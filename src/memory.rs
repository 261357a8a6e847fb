use crate::error::{Error, Result};

/// The machine's entire address space: a flat, zero-indexed sequence of
/// signed integers.
///
/// Code and data share this space. Its length is fixed once loaded; reads
/// and writes outside `0..size()` fail with [`Error::OutOfRange`] instead of
/// growing or wrapping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<i64>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of cells.
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Append a cell. Only used while loading a program.
    pub(crate) fn push(&mut self, value: i64) {
        self.cells.push(value);
    }

    /// Validate `address` against the current bounds and convert it to an index.
    fn index(&self, address: i64) -> Result<usize> {
        usize::try_from(address)
            .ok()
            .filter(|&i| i < self.cells.len())
            .ok_or(Error::OutOfRange {
                address,
                size: self.cells.len(),
            })
    }

    pub fn read(&self, address: i64) -> Result<i64> {
        let i = self.index(address)?;
        Ok(self.cells[i])
    }

    pub fn write(&mut self, address: i64, value: i64) -> Result<()> {
        let i = self.index(address)?;
        self.cells[i] = value;
        Ok(())
    }

    /// Read-only view of every cell, in address order.
    pub fn cells(&self) -> &[i64] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<i64> {
        self.cells
    }
}

impl From<Vec<i64>> for Memory {
    fn from(cells: Vec<i64>) -> Self {
        Self { cells }
    }
}

impl From<&[i64]> for Memory {
    fn from(cells: &[i64]) -> Self {
        Self {
            cells: cells.to_vec(),
        }
    }
}
