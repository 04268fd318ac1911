//! Run orchestration.
//!
//! A run walks every architecture the provider reports and every patch the table lists
//! for it:
//! 1. Resolution: each function's byte range is computed once per architecture.
//! 2. Application: the patch engine sees only that function's bytes.
//! 3. Reporting: every patch gets a [`Status`], and progress is logged as it happens.
//!
//! In [`Mode::Apply`] the first failure aborts the run, so the caller never ends up with
//! a partially patched buffer it might write. In [`Mode::Validate`] nothing is mutated;
//! pattern mismatches become diagnostics and only resolution failures abort.

use std::collections::HashMap;
use std::fmt;

use crate::arch::{Architecture, Platform};
use crate::error::Result;
use crate::layout::FunctionRange;
use crate::patch::{Patch, PatchOutcome, Validation};
use crate::patches::PatchTable;
use crate::provider::AssemblyProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Apply,
    Validate,
}

/// What happened to one patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Patched,
    AlreadyPatched,
    /// Validate mode: the target is where the patch expects it.
    Validated,
    /// Validate mode: the target was found at another offset.
    Moved { found: usize },
    /// Validate mode: the target is not in the function.
    Missing,
}

impl Status {
    pub fn is_ok(self) -> bool {
        !matches!(self, Self::Moved { .. } | Self::Missing)
    }
}

impl From<PatchOutcome> for Status {
    fn from(outcome: PatchOutcome) -> Self {
        match outcome {
            PatchOutcome::Patched => Self::Patched,
            PatchOutcome::AlreadyPatched => Self::AlreadyPatched,
        }
    }
}

impl From<Validation> for Status {
    fn from(validation: Validation) -> Self {
        match validation {
            Validation::AlreadyPatched => Self::AlreadyPatched,
            Validation::Valid => Self::Validated,
            Validation::Moved { found } => Self::Moved { found },
            Validation::Missing => Self::Missing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchReport {
    pub architecture: Architecture,
    pub patch: Patch,
    pub status: Status,
}

impl fmt::Display for PatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.patch.function;
        match self.status {
            Status::Patched => write!(f, "Patched {}", name),
            Status::AlreadyPatched => write!(f, "Already patched {}", name),
            Status::Validated => write!(f, "Patch for {} validated.", name),
            Status::Moved { found } => write!(
                f,
                "Patch for {} found at different offset. Old: {:#X} New: {:#X}",
                name, self.patch.offset, found
            ),
            Status::Missing => write!(f, "Patch for {} invalid, target doesn't exist.", name),
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub platform: Platform,
    pub mode: Mode,
    pub entries: Vec<PatchReport>,
}

impl RunReport {
    /// Whether any byte of the image changed.
    pub fn applied(&self) -> bool {
        self.entries.iter().any(|e| e.status == Status::Patched)
    }

    /// Whether every patch is in place or could be put in place.
    pub fn passed(&self) -> bool {
        self.entries.iter().all(|e| e.status.is_ok())
    }
}

/// Applies or validates every patch `table` holds for the image behind `provider`.
///
/// `image` must be the buffer the provider was created from.
pub fn run(
    provider: &AssemblyProvider,
    table: &PatchTable,
    image: &mut [u8],
    mode: Mode,
) -> Result<RunReport> {
    let platform = provider.platform();
    let mut ranges: HashMap<(Architecture, &str), FunctionRange> = HashMap::new();
    let mut entries = Vec::new();

    for arch in provider.architectures() {
        tracing::info!("Processing {} {}", platform, arch);
        let patches = table.patches(platform, arch);
        if patches.is_empty() {
            tracing::warn!("no patches defined for {} {}", platform, arch);
        }

        for patch in patches {
            let range = match ranges.get(&(arch, patch.function)) {
                Some(range) => *range,
                None => {
                    let range = provider.function_file_range(arch, patch.function)?;
                    ranges.insert((arch, patch.function), range);
                    range
                }
            };
            let bounds = range.bounds(image.len());
            tracing::debug!(
                "{} spans {:#x}..{:#x}",
                patch.function,
                bounds.start,
                bounds.end
            );

            let status: Status = match mode {
                Mode::Apply => patch.apply(&mut image[bounds])?.into(),
                Mode::Validate => patch.validate(&image[bounds]).into(),
            };
            let report = PatchReport {
                architecture: arch,
                patch: *patch,
                status,
            };
            if status.is_ok() {
                tracing::info!("{}", report);
            } else {
                tracing::warn!("{}", report);
            }
            entries.push(report);
        }
    }

    Ok(RunReport {
        platform,
        mode,
        entries,
    })
}
