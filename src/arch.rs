//! Architecture and platform identifiers.
//!
//! Each container format has its own machine-type field. This module maps those native
//! values onto the two architectures the patcher understands. Anything else is a hard
//! error: an image we cannot classify is never patched.

use std::fmt;

use object::elf::{EM_AARCH64, EM_X86_64};
use object::macho::{CPU_TYPE_ARM64, CPU_TYPE_X86_64};
use object::pe::{IMAGE_FILE_MACHINE_AMD64, IMAGE_FILE_MACHINE_ARM64};

use crate::error::{Error, Result};

/// A target architecture (e.g., x86_64, AArch64).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Architecture {
    X64,
    Arm64,
}

impl Architecture {
    /// Maps a COFF `Machine` field.
    pub fn from_pe_machine(machine: u16) -> Result<Self> {
        match machine {
            IMAGE_FILE_MACHINE_AMD64 => Ok(Self::X64),
            IMAGE_FILE_MACHINE_ARM64 => Ok(Self::Arm64),
            other => Err(Error::UnknownArchitecture {
                format: "PE",
                machine: other.into(),
            }),
        }
    }

    /// Maps an ELF `e_machine` field.
    pub fn from_elf_machine(machine: u16) -> Result<Self> {
        match machine {
            EM_X86_64 => Ok(Self::X64),
            EM_AARCH64 => Ok(Self::Arm64),
            other => Err(Error::UnknownArchitecture {
                format: "ELF",
                machine: other.into(),
            }),
        }
    }

    /// Maps a Mach-O `cputype` field.
    pub fn from_macho_cputype(cputype: u32) -> Result<Self> {
        match cputype {
            CPU_TYPE_X86_64 => Ok(Self::X64),
            CPU_TYPE_ARM64 => Ok(Self::Arm64),
            other => Err(Error::UnknownArchitecture {
                format: "Mach-O",
                machine: other,
            }),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X64 => f.write_str("X64"),
            Self::Arm64 => f.write_str("Arm64"),
        }
    }
}

/// The operating system an image was built for, fixed once its provider exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => f.write_str("Windows"),
            Self::Linux => f.write_str("Linux"),
            Self::MacOs => f.write_str("OSX"),
        }
    }
}
