//! Command history.

use std::collections::VecDeque;

/// Maximum number of remembered lines.
pub const MAX_HISTORY_ENTRIES: usize = 50;

/// Executed input lines, newest first, with a browse cursor.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<String>,
    pos: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `line` and reset the cursor. A repeat of the newest entry is not stored twice.
    pub fn add(&mut self, line: &str) {
        self.pos = None;
        if self.entries.front().is_some_and(|front| front == line) {
            return;
        }
        self.entries.push_front(line.to_string());
        self.entries.truncate(MAX_HISTORY_ENTRIES);
    }

    /// Step towards older (`up`) or newer entries.
    ///
    /// Returns the newly selected entry, or `None` when the cursor cannot move.
    pub fn element(&mut self, up: bool) -> Option<&str> {
        let next = match (up, self.pos) {
            (true, None) => 0,
            (true, Some(p)) => p + 1,
            (false, Some(p)) if p > 0 => p - 1,
            (false, _) => return None,
        };
        let entry = self.entries.get(next)?;
        self.pos = Some(next);
        Some(entry.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pos = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_front() {
        let mut history = History::new();
        history.add("r_fov 90");
        history.add("r_fov 90");
        assert_eq!(history.len(), 1);

        history.add("echo hi");
        history.add("r_fov 90");
        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["r_fov 90", "echo hi", "r_fov 90"]);
    }

    #[test]
    fn test_capacity() {
        let mut history = History::new();
        for i in 0..(MAX_HISTORY_ENTRIES + 10) {
            history.add(&i.to_string());
        }
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history.iter().next(), Some("59"));
    }

    #[test]
    fn test_browse() {
        let mut history = History::new();
        history.add("first");
        history.add("second");
        history.add("third");

        assert_eq!(history.element(false), None);
        assert_eq!(history.element(true), Some("third"));
        assert_eq!(history.element(true), Some("second"));
        assert_eq!(history.element(true), Some("first"));
        assert_eq!(history.element(true), None);
        assert_eq!(history.element(false), Some("second"));
        assert_eq!(history.element(false), Some("third"));
        assert_eq!(history.element(false), None);

        history.add("fourth");
        assert_eq!(history.element(true), Some("fourth"));
    }

    #[test]
    fn test_browse_empty() {
        let mut history = History::new();
        assert_eq!(history.element(true), None);
        assert_eq!(history.element(false), None);
    }
}
