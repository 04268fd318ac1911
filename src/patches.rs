//! Patch table.
//!
//! Maps each platform and architecture to the ordered list of patches to apply. The
//! built-in table holds the Windows x86-64 achievement-gate patches; other combinations
//! are present but empty until patches are authored for them.

use std::collections::HashMap;

use crate::arch::{Architecture, Platform};
use crate::patch::Patch;

const WINDOWS_X64: &[Patch] = &[
    Patch::new(
        "AchievementGui::updateInGameLongEnoughLabel",
        0x33,
        &[
            0x48, 0x8B, 0x80, 0x80, 0x01, 0x00, 0x00, // mov rax, [rax+180h]
            0x49, 0x8B, 0x90, 0x58, 0x02, 0x00, 0x00, // mov rdx, [r8+258h]
            0x48, 0xD1, 0xE8, // shr rax, 1
            0x48, 0x3B, 0xD0, // cmp rdx, rax
        ],
        &[
            0x48, 0x8B, 0x80, 0x80, 0x01, 0x00, 0x00, // mov rax, [rax+180h]
            0x49, 0x8B, 0x90, 0x58, 0x02, 0x00, 0x00, // mov rdx, [r8+258h]
            0x48, 0x31, 0xC0, // xor rax, rax
            0x48, 0x3B, 0xD0, // cmp rdx, rax
        ],
    ),
    Patch::new(
        "Player::isOnlineLongEnoughToGetAchievements",
        0,
        &[
            0x48, 0x8B, 0x41, 0x20, // mov rax, [rcx+20h]
            0x48, 0x8B, 0x80, 0x80, 0x01, 0x00, 0x00, // mov rax, [rax+180h]
            0x48, 0xD1, 0xE8, // shr rax, 1
            0x48, 0x39, 0x81, 0x58, 0x02, 0x00, 0x00, // cmp [rcx+258h], rax
        ],
        &[
            0x48, 0x8B, 0x41, 0x20, // mov rax, [rcx+20h]
            0x48, 0x8B, 0x80, 0x80, 0x01, 0x00, 0x00, // mov rax, [rax+180h]
            0x48, 0x31, 0xC0, // xor rax, rax
            0x48, 0x39, 0x81, 0x58, 0x02, 0x00, 0x00, // cmp [rcx+258h], rax
        ],
    ),
];

/// `Platform -> Architecture -> [Patch]`.
#[derive(Debug, Default, Clone)]
pub struct PatchTable {
    sets: HashMap<(Platform, Architecture), Vec<Patch>>,
}

impl PatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The patches shipped with this tool.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.extend(Platform::Windows, Architecture::X64, WINDOWS_X64.iter().copied());
        table
    }

    pub fn insert(&mut self, platform: Platform, arch: Architecture, patch: Patch) {
        self.sets.entry((platform, arch)).or_default().push(patch);
    }

    pub fn extend(
        &mut self,
        platform: Platform,
        arch: Architecture,
        patches: impl IntoIterator<Item = Patch>,
    ) {
        self.sets.entry((platform, arch)).or_default().extend(patches);
    }

    /// Patches for one platform/architecture pair, in application order.
    pub fn patches(&self, platform: Platform, arch: Architecture) -> &[Patch] {
        self.sets
            .get(&(platform, arch))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
