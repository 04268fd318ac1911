//! File layout records.
//!
//! This module defines the structures used to translate between the address space an
//! image is linked for and the byte offsets of the file on disk. Each resolver builds a
//! list of [`Section`]s once and answers every lookup from it.

use std::ops::Range;

use crate::error::{Error, Result};

/// A section of an executable image, as seen by the loader and on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Name of the section (e.g., ".text", "__text").
    pub name: String,
    /// The address where this section starts in memory (VA or RVA, per format).
    pub address: u64,
    /// Size of the section in memory.
    pub size: u64,
    /// The offset where the section's bytes start in the file.
    pub file_offset: u64,
    /// Number of bytes backed by the file.
    pub file_size: u64,
}

impl Section {
    /// Returns the file offset of `address` if this section covers it.
    ///
    /// The memory extent is the larger of the in-memory and on-disk sizes, but the
    /// resulting offset must still fall inside the bytes the file actually holds.
    pub fn file_offset_of(&self, address: u64) -> Option<u64> {
        let extent = self.size.max(self.file_size);
        let delta = address.checked_sub(self.address)?;
        if delta >= extent || delta >= self.file_size {
            return None;
        }
        Some(self.file_offset + delta)
    }
}

/// Maps an address to a file offset through the first section that covers it.
pub fn address_to_file_offset(sections: &[Section], address: u64) -> Result<u64> {
    sections
        .iter()
        .find_map(|s| s.file_offset_of(address))
        .ok_or(Error::UnmappedAddress(address))
}

/// Byte range of a function in the coordinate space of the outer file.
///
/// `end` is `None` when the container records no size for the symbol; callers must then
/// let the patch pattern bound the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl FunctionRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn open(start: usize) -> Self {
        Self { start, end: None }
    }

    /// Concrete slice bounds inside a buffer of `len` bytes. Open ranges run to the end.
    pub fn bounds(&self, len: usize) -> Range<usize> {
        let end = self.end.unwrap_or(len).min(len);
        self.start.min(end)..end
    }
}
