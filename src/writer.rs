//! Output writer.
//!
//! This module handles writing the patched executable back to disk. The buffer goes to a
//! temporary file in the destination directory which is then renamed over the
//! destination, so a failed write never leaves a truncated executable behind.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::Result;

/// Writes `bytes` to `output`, giving it the permissions of `source`.
pub fn write_image(output: &Path, bytes: &[u8], source: &Path) -> Result<()> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.as_file().sync_all()?;

    // Keep the executable bit.
    let permissions = fs::metadata(source)?.permissions();
    fs::set_permissions(temp.path(), permissions)?;

    temp.persist(output).map_err(|e| e.error)?;
    tracing::debug!("wrote {} bytes to {}", bytes.len(), output.display());
    Ok(())
}
