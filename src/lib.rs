//! Function-level executable patcher.
//!
//! This library locates named functions in PE (with PDB), ELF and Mach-O executables
//! and applies verified, size-preserving byte patches to them.
//! It is organized into several modules:
//! - `config`: CLI configuration.
//! - `format`: Container format detection.
//! - `provider`: Per-format symbol resolution behind one enum.
//! - `patch` / `patches`: The patch engine and the built-in patch table.
//! - `patcher`: Run orchestration.
//! - `signer`: Ad-hoc re-signing of macOS binaries.
//! - `writer`: Writing the patched image.

pub mod arch;
pub mod config;
pub mod debug_info;
pub mod error;
pub mod format;
pub mod layout;
pub mod patch;
pub mod patcher;
pub mod patches;
pub mod provider;
pub mod signer;
pub mod symbol;
pub mod utils;
pub mod writer;

pub use error::{Error, Result};
