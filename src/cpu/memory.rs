//! Main memory: 4096 sixteen-bit words addressed by 12 bits.

use crate::isa::{Word, ADDRESS_MASK};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of memory cells.
pub const MEMORY_SIZE: usize = 4096;

/// Marker for a cell the assembler never wrote.
pub const UNPROGRAMMED: Word = 0xFFFF;

/// A cell vector that is not exactly [`MEMORY_SIZE`] long.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("memory image has {0} cells, expected {MEMORY_SIZE}")]
pub struct MemorySizeError(pub usize);

/// Main memory. Also serves as the assembler's output image.
///
/// Serializes as a plain array of words.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Word>", into = "Vec<Word>")]
pub struct Memory {
    cells: Vec<Word>,
}

impl Memory {
    /// Create a memory with every cell unprogrammed.
    pub fn new() -> Self {
        Self {
            cells: vec![UNPROGRAMMED; MEMORY_SIZE],
        }
    }

    /// Read a cell. The address is truncated to 12 bits.
    #[inline]
    pub fn read(&self, addr: Word) -> Word {
        self.cells[(addr & ADDRESS_MASK) as usize]
    }

    /// Write a cell. The address is truncated to 12 bits.
    #[inline]
    pub fn write(&mut self, addr: Word, value: Word) {
        self.cells[(addr & ADDRESS_MASK) as usize] = value;
    }

    pub fn is_programmed(&self, addr: Word) -> bool {
        self.read(addr) != UNPROGRAMMED
    }

    /// Mark every cell unprogrammed.
    pub fn clear(&mut self) {
        self.cells.fill(UNPROGRAMMED);
    }

    /// All cells, indexed by address.
    pub fn cells(&self) -> &[Word] {
        &self.cells
    }

    /// Iterate over `(address, value)` for every programmed cell.
    pub fn programmed(&self) -> impl Iterator<Item = (Word, Word)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &cell)| cell != UNPROGRAMMED)
            .map(|(addr, &cell)| (addr as Word, cell))
    }

    /// Dump a range of cells (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, Word)> {
        let start = start.min(MEMORY_SIZE);
        let end = start.saturating_add(count).min(MEMORY_SIZE);
        (start..end)
            .map(|i| (i, self.cells[i]))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<Word>> for Memory {
    type Error = MemorySizeError;

    fn try_from(cells: Vec<Word>) -> Result<Self, Self::Error> {
        if cells.len() != MEMORY_SIZE {
            return Err(MemorySizeError(cells.len()));
        }
        Ok(Self { cells })
    }
}

impl From<Memory> for Vec<Word> {
    fn from(memory: Memory) -> Self {
        memory.cells
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("programmed_cells", &self.programmed().count())
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}
