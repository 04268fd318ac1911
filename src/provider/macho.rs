//! macOS Mach-O images, universal or thin.
//!
//! A universal ("fat") binary is a short big-endian header followed by one complete
//! Mach-O image per architecture. Each slice is parsed on its own: its sections come
//! from the `LC_SEGMENT_64` commands in load-command order, which is the numbering the
//! symbol table's `n_sect` field refers to. Offsets found inside a slice are relative
//! to that slice and must be rebased onto the outer file.
//!
//! The symbol table has no size field, so resolved ranges are open-ended.

use object::macho::{MachHeader64, N_SECT, N_TYPE};
use object::read::macho::{
    FatArch, LoadCommandVariant, MachHeader, MachOFatFile32, MachOFatFile64, Nlist, Segment,
};
use object::Endianness;

use crate::arch::Architecture;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::layout::{FunctionRange, Section};
use crate::symbol::{FunctionSymbol, FunctionTable};
use crate::utils::fixed_name;

const FORMAT: &str = "Mach-O";

/// One architecture-specific image inside the file.
#[derive(Debug)]
pub struct Slice {
    pub architecture: Architecture,
    /// Where the slice starts in the outer file.
    pub base: u64,
    pub size: usize,
    sections: Vec<Section>,
    symbols: FunctionTable,
}

impl Slice {
    /// Parses the slice whose bytes are `data`. `declared` is the CPU type recorded for
    /// it in the fat header, if there is one.
    fn parse(data: &[u8], base: u64, declared: Option<u32>) -> Result<Self> {
        let header = match MachHeader64::<Endianness>::parse(data, 0) {
            Ok(header) => header,
            Err(e) => {
                // 32-bit slices are not 64-bit images; report their CPU type instead.
                if let Some(cputype) = declared {
                    Architecture::from_macho_cputype(cputype)?;
                }
                return Err(Error::Parse {
                    format: FORMAT,
                    source: e,
                });
            }
        };
        let endian = header.endian().map_err(Error::parse(FORMAT))?;
        let cputype = header.cputype(endian);
        if let Some(declared) = declared.filter(|&d| d != cputype) {
            tracing::warn!(
                "slice at {:#x}: fat header says CPU {:#x}, image says {:#x}",
                base,
                declared,
                cputype
            );
        }
        let architecture = Architecture::from_macho_cputype(cputype)?;

        let mut sections = Vec::new();
        let mut symtab = None;
        let mut commands = header
            .load_commands(endian, data, 0)
            .map_err(Error::parse(FORMAT))?;
        while let Some(command) = commands.next().map_err(Error::parse(FORMAT))? {
            match command.variant().map_err(Error::parse(FORMAT))? {
                LoadCommandVariant::Segment64(segment, section_data) => {
                    let headers = segment
                        .sections(endian, section_data)
                        .map_err(Error::parse(FORMAT))?;
                    sections.extend(headers.iter().map(|s| Section {
                        name: fixed_name(&s.sectname),
                        address: s.addr.get(endian),
                        size: s.size.get(endian),
                        file_offset: s.offset.get(endian).into(),
                        file_size: s.size.get(endian),
                    }));
                }
                LoadCommandVariant::Symtab(command) => symtab = Some(command),
                _ => {}
            }
        }

        let symtab = symtab.ok_or(Error::MissingSection {
            format: FORMAT,
            name: "LC_SYMTAB",
        })?;
        let table = symtab
            .symbols::<MachHeader64<Endianness>, _>(endian, data)
            .map_err(Error::parse(FORMAT))?;
        let mut symbols = FunctionTable::new();
        for nlist in table.iter() {
            // Only symbols defined in a section; debugging entries are skipped.
            if nlist.is_stab() || nlist.n_type() & N_TYPE != N_SECT {
                continue;
            }
            let name = nlist
                .name(endian, table.strings())
                .map_err(Error::parse(FORMAT))?;
            symbols.insert(
                String::from_utf8_lossy(name).into_owned(),
                FunctionSymbol {
                    value: nlist.n_value(endian),
                    size: None,
                    section: nlist.n_sect().into(),
                },
            );
        }

        tracing::debug!(
            "Mach-O slice {:?} at {:#x}: {} sections, {} symbols",
            architecture,
            base,
            sections.len(),
            symbols.len()
        );

        Ok(Self {
            architecture,
            base,
            size: data.len(),
            sections,
            symbols,
        })
    }

    /// File offset of `name` in the outer file. The symbol must land inside this slice.
    fn function_offset(&self, name: &str) -> Result<u64> {
        let symbol = self.symbols.first(name)?;
        let section = symbol
            .section
            .checked_sub(1)
            .and_then(|i| self.sections.get(i))
            .ok_or(Error::UnmappedAddress(symbol.value))?;
        let relative = symbol
            .value
            .checked_sub(section.address)
            .ok_or(Error::UnmappedAddress(symbol.value))?;
        relative
            .checked_add(section.file_offset)
            .filter(|&offset| offset < self.size as u64)
            .and_then(|offset| offset.checked_add(self.base))
            .ok_or_else(|| Error::RangeOutOfBounds {
                name: name.to_string(),
                start: symbol.value,
                len: self.size,
            })
    }
}

#[derive(Debug)]
pub struct MachOImage {
    slices: Vec<Slice>,
    len: usize,
}

impl MachOImage {
    pub fn parse(data: &[u8], format: Format) -> Result<Self> {
        let mut slices = Vec::new();
        match format {
            Format::MachOFat32 => {
                let fat = MachOFatFile32::parse(data).map_err(Error::parse(FORMAT))?;
                for arch in fat.arches() {
                    Self::push_fat_slice(&mut slices, data, arch)?;
                }
            }
            Format::MachOFat64 => {
                let fat = MachOFatFile64::parse(data).map_err(Error::parse(FORMAT))?;
                for arch in fat.arches() {
                    Self::push_fat_slice(&mut slices, data, arch)?;
                }
            }
            Format::MachO => Self::push(&mut slices, Slice::parse(data, 0, None)?),
            Format::Pe | Format::Elf => unreachable!("not a Mach-O format: {:?}", format),
        }

        Ok(Self {
            slices,
            len: data.len(),
        })
    }

    fn push_fat_slice<A: FatArch>(slices: &mut Vec<Slice>, data: &[u8], arch: &A) -> Result<()> {
        let (base, _) = arch.file_range();
        let bytes = arch.data(data).map_err(Error::parse(FORMAT))?;
        Self::push(slices, Slice::parse(bytes, base, Some(arch.cputype()))?);
        Ok(())
    }

    fn push(slices: &mut Vec<Slice>, slice: Slice) {
        if slices.iter().any(|s| s.architecture == slice.architecture) {
            tracing::warn!(
                "ignoring second {:?} slice at {:#x}",
                slice.architecture,
                slice.base
            );
            return;
        }
        slices.push(slice);
    }

    pub fn architectures(&self) -> impl Iterator<Item = Architecture> + '_ {
        self.slices.iter().map(|s| s.architecture)
    }

    pub fn slice(&self, arch: Architecture) -> Result<&Slice> {
        self.slices
            .iter()
            .find(|s| s.architecture == arch)
            .ok_or(Error::ArchitectureNotPresent(arch))
    }

    pub fn function_file_range(&self, arch: Architecture, name: &str) -> Result<FunctionRange> {
        let start = self.slice(arch)?.function_offset(name)?;
        tracing::debug!("{} ({:?}): file offset {:#x}", name, arch, start);
        match usize::try_from(start) {
            Ok(start) if start < self.len => Ok(FunctionRange::open(start)),
            _ => Err(Error::RangeOutOfBounds {
                name: name.to_string(),
                start,
                len: self.len,
            }),
        }
    }
}
