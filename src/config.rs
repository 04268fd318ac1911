//! Configuration module.
//!
//! This module defines the command-line interface (CLI) using `clap`.
//! It handles parsing the input executable, the output path and the run mode.

use clap::Parser;
use std::path::PathBuf;

/// Patches named functions inside Windows, Linux and macOS executables.
///
/// Functions are located through the executable's own symbol table (ELF, Mach-O) or the
/// `.pdb` next to it (Windows). Every patch is checked against the bytes it expects
/// before anything is changed, and the file is only rewritten if all patches succeed.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Executable to patch
    pub input: PathBuf,

    /// Output file
    #[arg(short, long, help = "Write the patched executable here instead of in place")]
    pub output: Option<PathBuf>,

    /// Validate only
    #[arg(
        long,
        conflicts_with = "output",
        help = "Check every patch against the executable without modifying it"
    )]
    pub validate: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", help = "Set the logging level")]
    pub log_level: String,
}
