//! Entry point for the sympatch binary.
//!
//! This file handles high-level application flow:
//! 1. Parse command-line arguments using `clap` and set up logging.
//! 2. Map the input file into a private copy-on-write buffer.
//! 3. Detect the container format and build the matching provider.
//! 4. Apply (or validate) the built-in patches for every architecture in the file.
//! 5. Write the buffer back once, and re-sign it on macOS.
//!
//! Error handling is done via `anyhow`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use memmap2::MmapOptions;
use std::fs::File;
use tracing_subscriber::EnvFilter;

use sympatch::config::Config;
use sympatch::patcher::{self, Mode};
use sympatch::patches::PatchTable;
use sympatch::provider::AssemblyProvider;
use sympatch::signer::Finalizer;
use sympatch::writer::write_image;

fn main() -> Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_new(&config.log_level)
        .with_context(|| format!("invalid log level {:?}", config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let input = config.input.as_path();
    let file = File::open(input).with_context(|| format!("file not found: {}", input.display()))?;
    // Private mapping: edits stay in memory until written out explicitly.
    let mut image = unsafe { MmapOptions::new().map_copy(&file)? };

    let provider = AssemblyProvider::create(input, &image)?;
    let finalizer = Finalizer::system();
    let mode = if config.validate {
        Mode::Validate
    } else {
        Mode::Apply
    };

    // Find the signer before touching anything, so a missing one aborts early.
    if mode == Mode::Apply && provider.needs_signing() {
        finalizer.signer()?;
    }

    let report = patcher::run(&provider, &PatchTable::builtin(), &mut image, mode)?;
    tracing::debug!(
        "{} patches checked for {}",
        report.entries.len(),
        report.platform
    );

    match report.mode {
        Mode::Validate => {
            if !report.passed() {
                bail!("Errors found, can't continue.");
            }
            println!("Patches validated.");
        }
        Mode::Apply => {
            if report.applied() {
                let output = config.output.as_deref().unwrap_or(input);
                write_image(output, &image, input)?;
                provider.finalize_patches(output, &finalizer)?;
                println!("Patched {}", output.display());
            } else {
                println!("Nothing to do, {} is already patched", input.display());
            }
        }
    }

    println!("Done");
    Ok(())
}
