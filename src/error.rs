//! Error types.
//!
//! Every failure the core can report is a variant of [`enum@Error`]. They fall into four
//! groups: format errors (the input is not something we can read), resolution errors
//! (a symbol or architecture cannot be mapped), pattern errors (the bytes at a resolved
//! range are not what a patch expects) and external tool errors (signing). All of them
//! abort a run.

use std::path::PathBuf;

use thiserror::Error;

use crate::arch::Architecture;

/// Convenience alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The bytes match none of the supported containers.
    #[error("unknown executable file provided: {}", .0.display())]
    UnrecognizedFormat(PathBuf),

    /// A PE image was given without its `.pdb` next to it.
    #[error("{} does not have a companion .pdb file (expected {})", .exe.display(), .pdb.display())]
    MissingDebugInfo { exe: PathBuf, pdb: PathBuf },

    /// The container header or tables could not be parsed.
    #[error("failed to parse {format} image: {source}")]
    Parse {
        format: &'static str,
        #[source]
        source: object::Error,
    },

    /// The companion debug-info file could not be read.
    #[error("failed to read debug info {}: {source}", .path.display())]
    DebugInfo {
        path: PathBuf,
        #[source]
        source: pdb::Error,
    },

    #[error("{format} image has no usable {name} section")]
    MissingSection {
        format: &'static str,
        name: &'static str,
    },

    #[error("unknown {format} architecture type: {machine:#x}")]
    UnknownArchitecture { format: &'static str, machine: u32 },

    #[error("tried to patch for an architecture the image does not contain: {0}")]
    ArchitectureNotPresent(Architecture),

    #[error("function {0} not found")]
    SymbolNotFound(String),

    #[error("function {name} is ambiguous ({count} definitions)")]
    AmbiguousSymbol { name: String, count: usize },

    #[error("address {0:#x} is not covered by any section")]
    UnmappedAddress(u64),

    #[error("function {name} resolves to {start:#x}, outside the {len} byte image")]
    RangeOutOfBounds {
        name: String,
        start: u64,
        len: usize,
    },

    /// Neither the target nor the replacement is at the expected offset.
    #[error("failed to apply patch ({function}): target not found at offset {offset:#x}")]
    TargetNotFound { function: String, offset: usize },

    #[error(
        "no ad-hoc signer available; install quill (https://github.com/anchore/quill) \
         or run on macOS where codesign is provided by the Xcode command line tools"
    )]
    SignerNotFound,

    #[error("{program} did not exit with status code 0, got: {status}")]
    SignerFailed { program: &'static str, status: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(format: &'static str) -> impl FnOnce(object::Error) -> Error {
        move |source| Error::Parse { format, source }
    }
}
