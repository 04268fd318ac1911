//! Symbol table management.
//!
//! Tracks function symbols read from an image (or its debug info) by name. The PE and
//! ELF resolvers require a name to be unique; the Mach-O resolver takes the first
//! definition in table order.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// A function symbol as recorded by its source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSymbol {
    /// Address or offset, in whatever space the source table uses.
    pub value: u64,
    /// Size in bytes, if the table records one.
    pub size: Option<u64>,
    /// Section the symbol belongs to, in the source table's own numbering.
    pub section: usize,
}

/// Symbols grouped by name, preserving the order they were read in.
#[derive(Debug, Default, Clone)]
pub struct FunctionTable {
    entries: HashMap<String, Vec<FunctionSymbol>>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, symbol: FunctionSymbol) {
        self.entries.entry(name.into()).or_default().push(symbol);
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The single symbol called `name`. Missing and duplicated names are errors.
    pub fn unique(&self, name: &str) -> Result<&FunctionSymbol> {
        match self.entries.get(name).map(Vec::as_slice) {
            Some([symbol]) => Ok(symbol),
            Some(all) if !all.is_empty() => Err(Error::AmbiguousSymbol {
                name: name.to_string(),
                count: all.len(),
            }),
            _ => Err(Error::SymbolNotFound(name.to_string())),
        }
    }

    /// The first symbol called `name`, in table order.
    pub fn first(&self, name: &str) -> Result<&FunctionSymbol> {
        let all = self
            .entries
            .get(name)
            .filter(|all| !all.is_empty())
            .ok_or_else(|| Error::SymbolNotFound(name.to_string()))?;
        if all.len() > 1 {
            tracing::warn!(
                "{} definitions of {}, using the first at {:#x}",
                all.len(),
                name,
                all[0].value
            );
        }
        Ok(&all[0])
    }
}

impl FromIterator<(String, FunctionSymbol)> for FunctionTable {
    fn from_iter<I: IntoIterator<Item = (String, FunctionSymbol)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, symbol) in iter {
            table.insert(name, symbol);
        }
        table
    }
}
