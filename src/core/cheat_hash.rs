//! Cheat variable hash.
//!
//! Summarizes the names and values of cheat-protected variables into one
//! 64-bit number so a server can compare clients. The high half is the CRC32
//! of the names, the low half the CRC32 of every name followed by its data
//! probe string.

use crc32fast::Hasher;

use super::cvar::format_g;
use super::{CVarFlags, CVarRegistry, CVarValue, ConsoleState};

/// Hash state and the slice of the random-checked index it covers.
#[derive(Debug, Clone)]
pub struct CheatHash {
    first: usize,
    last: usize,
    dirty: bool,
    hash: u64,
}

impl Default for CheatHash {
    fn default() -> Self {
        Self {
            first: 0,
            last: 0,
            dirty: true,
            hash: 0,
        }
    }
}

impl CheatHash {
    /// Select `random_checked[first..=last]` and mark the hash for recalculation.
    pub fn set_range(&mut self, first: usize, last: usize) {
        self.first = first;
        self.last = last;
        self.dirty = true;
    }

    pub fn range(&self) -> (usize, usize) {
        (self.first, self.last)
    }

    /// Recalculate if marked dirty.
    pub fn calculate(&mut self, registry: &CVarRegistry) {
        if !self.dirty {
            return;
        }

        let mut names = Hasher::new();
        let mut names_values = Hasher::new();

        let random = registry.random_checked();
        let selected = random
            .iter()
            .skip(self.first)
            .take(self.last.saturating_add(1).saturating_sub(self.first));

        for name in selected.chain(registry.always_checked()) {
            names.update(name.as_bytes());
            names_values.update(name.as_bytes());
            if let Some(var) = registry.get(name) {
                names_values.update(var.data_probe_string().as_bytes());
            }
        }

        self.hash = (u64::from(names.finalize()) << 32) | u64::from(names_values.finalize());
        self.dirty = false;
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn is_calculated(&self) -> bool {
        !self.dirty
    }
}

fn is_listed_cheat(flags: CVarFlags) -> bool {
    flags.contains(CVarFlags::CHEAT) && !flags.contains(CVarFlags::CHEAT_NOCHECK)
}

impl ConsoleState {
    pub fn set_cheat_var_hash_range(&mut self, first: usize, last: usize) {
        self.cheat_hash.set_range(first, last);
    }

    /// Recalculate the cheat hash if its range changed.
    pub fn calc_cheat_var_hash(&mut self) {
        self.cheat_hash.calculate(&self.vars);
    }

    pub fn cheat_var_hash(&self) -> u64 {
        self.cheat_hash.hash()
    }

    pub fn is_hash_calculated(&self) -> bool {
        self.cheat_hash.is_calculated()
    }

    /// Number of variables in the random-checked index.
    pub fn num_cheat_vars(&self) -> usize {
        self.vars.random_checked().len()
    }

    /// Name of the `offset`-th cheat variable (sorted), `None` while the hash
    /// is being recalculated.
    pub fn cheat_var_at(&self, offset: usize) -> Option<&str> {
        if !self.cheat_hash.is_calculated() {
            return None;
        }
        self.vars
            .iter()
            .filter(|(_, var)| is_listed_cheat(var.get_flags()))
            .nth(offset)
            .map(|(name, _)| name)
    }

    /// Listing of cheat variables with their values.
    ///
    /// With `use_last_range` only the range covered by the last hash is
    /// listed. `None` while the hash is being recalculated.
    pub fn cheat_vars_listing(&self, use_last_range: bool) -> Option<Vec<String>> {
        if !self.cheat_hash.is_calculated() {
            return None;
        }

        let (start, end) = if use_last_range {
            self.cheat_hash.range()
        } else {
            (0, usize::MAX)
        };

        let mut lines = vec!["VF_CHEAT & ~VF_CHEAT_NOCHECK list:".to_string()];
        lines.extend(
            self.vars
                .iter()
                .filter(|(_, var)| is_listed_cheat(var.get_flags()))
                .enumerate()
                .filter(|(i, _)| (start..=end).contains(i))
                .map(|(_, (name, var))| {
                    let value = match var.value() {
                        CVarValue::Float(v) => format_g(*v, 1),
                        other => other.to_string(),
                    };
                    format!("{} = {}", name, value)
                }),
        );

        lines.push("VF_CHEAT_ALWAYS_CHECK list:".to_string());
        lines.extend(self.vars.always_checked().iter().filter_map(|name| {
            self.vars
                .get(name)
                .map(|var| format!("{} = {}", name, var.get_string()))
        }));

        Some(lines)
    }
}
