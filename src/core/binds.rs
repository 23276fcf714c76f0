//! Key binds: key names mapped to console input executed on key press.

use std::collections::BTreeMap;

use bitflags::bitflags;

bitflags! {
    /// Modifier keys held during a key press.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyModifiers: u8 {
        const CTRL = 1 << 0;
        const SHIFT = 1 << 1;
        const ALT = 1 << 2;
        const SUPER = 1 << 3;
    }
}

/// Bind name for `key` pressed with `modifiers`, e.g. `ctrl_shift_f5`.
pub fn bind_name(key: &str, modifiers: KeyModifiers) -> String {
    let mut name = String::new();
    if modifiers.contains(KeyModifiers::CTRL) {
        name.push_str("ctrl_");
    }
    if modifiers.contains(KeyModifiers::SHIFT) {
        name.push_str("shift_");
    }
    if modifiers.contains(KeyModifiers::ALT) {
        name.push_str("alt_");
    }
    if modifiers.contains(KeyModifiers::SUPER) {
        name.push_str("win_");
    }
    name.push_str(key);
    name
}

#[derive(Debug, Clone, Default)]
pub struct KeyBinds {
    binds: BTreeMap<String, String>,
}

impl KeyBinds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `command` to `key`. An existing bind for the key is kept.
    ///
    /// Returns true if the bind was created.
    pub fn create(&mut self, key: &str, command: &str) -> bool {
        if self.binds.contains_key(key) {
            return false;
        }
        self.binds.insert(key.to_string(), command.to_string());
        true
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.binds.remove(key)
    }

    pub fn find(&self, key: &str) -> Option<&str> {
        self.binds.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.binds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }

    /// Sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.binds.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_name_prefixes() {
        assert_eq!(bind_name("f1", KeyModifiers::empty()), "f1");
        assert_eq!(bind_name("f1", KeyModifiers::CTRL | KeyModifiers::SHIFT), "ctrl_shift_f1");
        assert_eq!(bind_name("a", KeyModifiers::all()), "ctrl_shift_alt_win_a");
    }

    #[test]
    fn test_create_keeps_existing() {
        let mut binds = KeyBinds::new();
        assert!(binds.create("f1", "r_fov 90"));
        assert!(!binds.create("f1", "r_fov 60"));
        assert_eq!(binds.find("f1"), Some("r_fov 90"));

        assert_eq!(binds.remove("f1"), Some("r_fov 90".to_string()));
        assert!(binds.create("f1", "r_fov 60"));
        assert_eq!(binds.find("f1"), Some("r_fov 60"));
        assert_eq!(binds.find("f2"), None);
    }
}
