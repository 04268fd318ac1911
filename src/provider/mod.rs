//! Unified access to the three executable formats.
//!
//! An [`AssemblyProvider`] is built once per input file. It answers two questions the
//! patcher needs, independent of the container: which architectures does the file hold,
//! and where in the file does a named function live.

use std::path::Path;

use crate::arch::{Architecture, Platform};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::layout::FunctionRange;
use crate::signer::{CommandRunner, Finalizer};

pub mod elf;
pub mod macho;
pub mod pe;

pub use elf::ElfImage;
pub use macho::MachOImage;
pub use pe::PeImage;

/// A parsed executable, one variant per platform.
#[derive(Debug)]
pub enum AssemblyProvider {
    Windows(PeImage),
    Linux(ElfImage),
    MacOs(MachOImage),
}

impl AssemblyProvider {
    /// Detects the container format of `data` (read from `path`) and parses it.
    pub fn create(path: &Path, data: &[u8]) -> Result<Self> {
        let format = Format::detect(path, data)
            .ok_or_else(|| Error::UnrecognizedFormat(path.to_path_buf()))?;
        let provider = match format {
            Format::Pe => Self::Windows(PeImage::open(path, data)?),
            Format::Elf => Self::Linux(ElfImage::parse(data)?),
            Format::MachOFat32 | Format::MachOFat64 | Format::MachO => {
                Self::MacOs(MachOImage::parse(data, format)?)
            }
        };
        tracing::debug!(
            "{} is a {} image with {:?}",
            path.display(),
            provider.platform(),
            provider.architectures()
        );
        Ok(provider)
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::Windows(_) => Platform::Windows,
            Self::Linux(_) => Platform::Linux,
            Self::MacOs(_) => Platform::MacOs,
        }
    }

    /// Architectures physically present in the file, in file order.
    pub fn architectures(&self) -> Vec<Architecture> {
        match self {
            Self::Windows(pe) => vec![pe.architecture()],
            Self::Linux(elf) => vec![elf.architecture()],
            Self::MacOs(macho) => macho.architectures().collect(),
        }
    }

    /// Byte range of `name` for the slice of architecture `arch`.
    pub fn function_file_range(&self, arch: Architecture, name: &str) -> Result<FunctionRange> {
        match self {
            Self::Windows(pe) => pe.function_file_range(arch, name),
            Self::Linux(elf) => elf.function_file_range(arch, name),
            Self::MacOs(macho) => macho.function_file_range(arch, name),
        }
    }

    /// Whether a written file must be re-signed before it will run.
    pub fn needs_signing(&self) -> bool {
        matches!(self, Self::MacOs(_))
    }

    /// Post-processing after the patched file has been written to `path`.
    pub fn finalize_patches<R: CommandRunner>(
        &self,
        path: &Path,
        finalizer: &Finalizer<R>,
    ) -> Result<()> {
        if self.needs_signing() {
            finalizer.sign(path)?;
        }
        Ok(())
    }
}

/// Builds a sized range, checking that it starts inside a file of `len` bytes.
pub(crate) fn checked_range(
    name: &str,
    start: u64,
    size: Option<u64>,
    len: usize,
) -> Result<FunctionRange> {
    let out_of_bounds = || Error::RangeOutOfBounds {
        name: name.to_string(),
        start,
        len,
    };
    let start_idx = usize::try_from(start).map_err(|_| out_of_bounds())?;
    if start_idx >= len {
        return Err(out_of_bounds());
    }
    Ok(match size {
        Some(size) => {
            let end = usize::try_from(size)
                .ok()
                .and_then(|size| start_idx.checked_add(size))
                .ok_or_else(out_of_bounds)?;
            if end > len {
                tracing::warn!("{} extends past the end of the file, truncating", name);
            }
            FunctionRange::new(start_idx, end.min(len))
        }
        None => FunctionRange::open(start_idx),
    })
}
