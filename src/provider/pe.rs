//! Windows PE images with PDB symbols.

use std::path::Path;

use object::pe::{ImageDosHeader, ImageNtHeaders64};
use object::read::pe::ImageNtHeaders;
use object::LittleEndian as LE;

use super::checked_range;
use crate::arch::Architecture;
use crate::debug_info;
use crate::error::{Error, Result};
use crate::layout::{address_to_file_offset, FunctionRange, Section};
use crate::symbol::FunctionTable;
use crate::utils::fixed_name;

const FORMAT: &str = "PE";

/// Section table and procedure table of a PE32+ image.
#[derive(Debug)]
pub struct PeImage {
    architecture: Architecture,
    sections: Vec<Section>,
    /// Index into `sections`.
    text: usize,
    functions: FunctionTable,
    len: usize,
}

impl PeImage {
    /// Parses the image at `path` together with its companion `.pdb`.
    pub fn open(path: &Path, data: &[u8]) -> Result<Self> {
        let pdb = debug_info::companion_path(path);
        if !pdb.is_file() {
            return Err(Error::MissingDebugInfo {
                exe: path.to_path_buf(),
                pdb,
            });
        }
        let mut image = Self::parse(data, FunctionTable::new())?;
        image.functions = debug_info::load_functions(&pdb)?;
        Ok(image)
    }

    /// Parses the image headers, taking function symbols from an already loaded table.
    pub fn parse(data: &[u8], functions: FunctionTable) -> Result<Self> {
        let dos = ImageDosHeader::parse(data).map_err(Error::parse(FORMAT))?;
        let mut offset = dos.nt_headers_offset().into();
        let (nt, _) = ImageNtHeaders64::parse(data, &mut offset).map_err(Error::parse(FORMAT))?;
        let architecture = Architecture::from_pe_machine(nt.file_header().machine.get(LE))?;

        let sections: Vec<Section> = nt
            .sections(data, offset)
            .map_err(Error::parse(FORMAT))?
            .iter()
            .map(|header| Section {
                name: fixed_name(&header.name),
                address: header.virtual_address.get(LE).into(),
                size: header.virtual_size.get(LE).into(),
                file_offset: header.pointer_to_raw_data.get(LE).into(),
                file_size: header.size_of_raw_data.get(LE).into(),
            })
            .collect();

        let mut texts = sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.name == ".text")
            .map(|(i, _)| i);
        let text = match (texts.next(), texts.next()) {
            (Some(i), None) => i,
            _ => {
                return Err(Error::MissingSection {
                    format: FORMAT,
                    name: ".text",
                })
            }
        };

        tracing::debug!(
            "PE image: {:?}, {} sections, .text at RVA {:#x}",
            architecture,
            sections.len(),
            sections[text].address
        );

        Ok(Self {
            architecture,
            sections,
            text,
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
        // PDB section numbers are 1-based.
        if func.section != 0 && func.section != self.text + 1 {
            tracing::warn!(
                "{} is recorded in section {} but resolved against .text",
                name,
                func.section
            );
        }
        let text = &self.sections[self.text];
        let rva = text.address + func.value;
        let start = address_to_file_offset(&self.sections, rva)?;
        tracing::debug!("{}: RVA {:#x} -> file offset {:#x}", name, rva, start);
        checked_range(name, start, func.size, self.len)
    }
}
