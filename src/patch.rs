//! Byte patches.
//!
//! A [`Patch`] names a function, an offset into it, and two equal-length byte patterns:
//! the code the patch was written against and the code that replaces it. Patches are
//! always handed the bytes of a single function, never the whole image, so a patch can
//! only ever touch the function it was resolved for.

use std::fmt;

use crate::error::{Error, Result};
use crate::utils::find_bytes;

/// A fixed, size-preserving substitution inside one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Patch {
    pub function: &'static str,
    pub offset: usize,
    pub target: &'static [u8],
    pub replacement: &'static [u8],
}

/// Result of [`Patch::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched,
    AlreadyPatched,
}

impl PatchOutcome {
    pub fn changed(self) -> bool {
        matches!(self, Self::Patched)
    }
}

/// Read-only diagnosis of a patch against a function's current bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    AlreadyPatched,
    /// The target sits exactly at the declared offset.
    Valid,
    /// The target exists, but somewhere else.
    Moved { found: usize },
    /// The target does not occur in the function at all.
    Missing,
}

impl Validation {
    pub fn is_ok(self) -> bool {
        matches!(self, Self::AlreadyPatched | Self::Valid)
    }
}

impl Patch {
    /// Builds a patch. Target and replacement must have the same length; in a `const`
    /// context a mismatch fails the build.
    pub const fn new(
        function: &'static str,
        offset: usize,
        target: &'static [u8],
        replacement: &'static [u8],
    ) -> Self {
        assert!(
            target.len() == replacement.len(),
            "patch target and replacement differ in length"
        );
        Self {
            function,
            offset,
            target,
            replacement,
        }
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    fn window<'a>(&self, function_bytes: &'a [u8]) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(self.len())?;
        function_bytes.get(self.offset..end)
    }

    /// Whether the replacement is already in place at the declared offset.
    pub fn is_patched(&self, function_bytes: &[u8]) -> bool {
        self.window(function_bytes) == Some(self.replacement)
    }

    /// Searches the whole function for the target pattern, ignoring the declared offset.
    pub fn find(&self, function_bytes: &[u8]) -> Option<usize> {
        find_bytes(function_bytes, self.target)
    }

    /// Rewrites the declared window from target to replacement.
    ///
    /// Applying a patch twice is harmless: the second call sees the replacement and
    /// reports [`PatchOutcome::AlreadyPatched`]. If neither pattern is at the offset the
    /// bytes are left untouched and [`Error::TargetNotFound`] is returned.
    pub fn apply(&self, function_bytes: &mut [u8]) -> Result<PatchOutcome> {
        if self.is_patched(function_bytes) {
            return Ok(PatchOutcome::AlreadyPatched);
        }
        if self.window(function_bytes) != Some(self.target) {
            return Err(Error::TargetNotFound {
                function: self.function.to_string(),
                offset: self.offset,
            });
        }
        function_bytes[self.offset..self.offset + self.len()].copy_from_slice(self.replacement);
        Ok(PatchOutcome::Patched)
    }

    pub fn validate(&self, function_bytes: &[u8]) -> Validation {
        if self.is_patched(function_bytes) {
            return Validation::AlreadyPatched;
        }
        match self.find(function_bytes) {
            None => Validation::Missing,
            Some(found) if found == self.offset => Validation::Valid,
            Some(found) => Validation::Moved { found },
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{:#x} ({} bytes)", self.function, self.offset, self.len())
    }
}
