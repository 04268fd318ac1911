//! Linux ELF images.
//!
//! Function addresses in `.symtab` are virtual addresses. Every symbol we care about
//! lives in `.text`, so one delta between that section's file offset and its load
//! address converts all of them.

use object::read::elf::{ElfFile64, FileHeader};
use object::{Endianness, Object, ObjectSection, ObjectSymbol};

use super::checked_range;
use crate::arch::Architecture;
use crate::error::{Error, Result};
use crate::layout::FunctionRange;
use crate::symbol::{FunctionSymbol, FunctionTable};

const FORMAT: &str = "ELF";

#[derive(Debug)]
pub struct ElfImage {
    architecture: Architecture,
    /// `.text` file offset minus `.text` address.
    sym_offset: i64,
    functions: FunctionTable,
    len: usize,
}

impl ElfImage {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let elf = ElfFile64::<Endianness>::parse(data).map_err(Error::parse(FORMAT))?;
        let architecture = Architecture::from_elf_machine(elf.elf_header().e_machine(elf.endian()))?;

        let missing_text = || Error::MissingSection {
            format: FORMAT,
            name: ".text",
        };
        let text = elf.section_by_name(".text").ok_or_else(missing_text)?;
        let (text_offset, _) = text.file_range().ok_or_else(missing_text)?;
        let sym_offset = text_offset.wrapping_sub(text.address()) as i64;

        let functions: FunctionTable = elf
            .symbols()
            .filter_map(|sym| {
                let name = sym.name().ok().filter(|n| !n.is_empty())?;
                Some((
                    name.to_string(),
                    FunctionSymbol {
                        value: sym.address(),
                        size: Some(sym.size()),
                        section: sym.section_index().map_or(0, |i| i.0),
                    },
                ))
            })
            .collect();
        if functions.is_empty() {
            return Err(Error::MissingSection {
                format: FORMAT,
                name: ".symtab",
            });
        }

        tracing::debug!(
            "ELF image: {:?}, {} symbols, symbol offset {:#x}",
            architecture,
            functions.len(),
            sym_offset
        );

        Ok(Self {
            architecture,
            sym_offset,
            functions,
            len: data.len(),
        })
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn function_file_range(&self, arch: Architecture, name: &str) -> Result<FunctionRange> {
        if arch != self.architecture {
            return Err(Error::ArchitectureNotPresent(arch));
        }

        let func = self.functions.unique(name)?;
        let start = func
            .value
            .checked_add_signed(self.sym_offset)
            .ok_or(Error::UnmappedAddress(func.value))?;
        tracing::debug!("{}: VA {:#x} -> file offset {:#x}", name, func.value, start);
        checked_range(name, start, func.size, self.len)
    }
}
