//! Companion debug-info loading.
//!
//! PE images carry no usable symbol table of their own; function names and sizes come
//! from the `.pdb` written next to them by the linker. The whole procedure table is read
//! up front and the file is closed before [`load_functions`] returns, so a provider never
//! holds an open debug-info handle.

use std::fs::File;
use std::path::{Path, PathBuf};

use pdb::{FallibleIterator, SymbolData, PDB};

use crate::error::{Error, Result};
use crate::symbol::{FunctionSymbol, FunctionTable};

/// Path of the debug-info file that belongs to `exe`: same directory, same stem.
pub fn companion_path(exe: &Path) -> PathBuf {
    exe.with_extension("pdb")
}

/// Reads every procedure record (`S_GPROC32`/`S_LPROC32`) from all module streams.
///
/// Symbol values are offsets relative to the start of the procedure's section.
pub fn load_functions(path: &Path) -> Result<FunctionTable> {
    let wrap = |source: pdb::Error| Error::DebugInfo {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path)?;
    let mut pdb = PDB::open(file).map_err(wrap)?;
    let dbi = pdb.debug_information().map_err(wrap)?;
    let mut modules = dbi.modules().map_err(wrap)?;

    let mut table = FunctionTable::new();
    while let Some(module) = modules.next().map_err(wrap)? {
        let Some(info) = pdb.module_info(&module).map_err(wrap)? else {
            continue;
        };
        let mut symbols = info.symbols().map_err(wrap)?;
        while let Some(symbol) = symbols.next().map_err(wrap)? {
            // Records the crate cannot decode are irrelevant to us.
            let Ok(SymbolData::Procedure(proc)) = symbol.parse() else {
                continue;
            };
            table.insert(
                proc.name.to_string().into_owned(),
                FunctionSymbol {
                    value: proc.offset.offset.into(),
                    size: Some(proc.len.into()),
                    section: proc.offset.section.into(),
                },
            );
        }
    }

    tracing::debug!("read {} procedures from {}", table.len(), path.display());
    Ok(table)
}
