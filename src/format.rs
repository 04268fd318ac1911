//! Container format detection.
//!
//! Detection is shallow: the extension decides PE, magic bytes decide the
//! rest. The provider constructors do the real validation.

use std::path::Path;

use object::FileKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Windows executable; symbols come from the companion `.pdb`.
    Pe,
    Elf,
    /// Universal binary with 32-bit `fat_arch` records.
    MachOFat32,
    /// Universal binary with 64-bit `fat_arch_64` records.
    MachOFat64,
    /// A single-architecture 64-bit Mach-O.
    MachO,
}

impl Format {
    /// First match wins: `.exe` extension, then ELF magic, then fat Mach-O magic, then
    /// a thin Mach-O.
    pub fn detect(path: &Path, data: &[u8]) -> Option<Self> {
        let is_exe = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"));
        if is_exe {
            return Some(Self::Pe);
        }

        let kind = FileKind::parse(data).ok()?;
        tracing::debug!("{} sniffed as {:?}", path.display(), kind);
        match kind {
            FileKind::Elf32 | FileKind::Elf64 => Some(Self::Elf),
            FileKind::MachOFat32 => Some(Self::MachOFat32),
            FileKind::MachOFat64 => Some(Self::MachOFat64),
            FileKind::MachO64 => Some(Self::MachO),
            _ => None,
        }
    }
}
