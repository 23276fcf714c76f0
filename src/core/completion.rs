//! Tab completion over commands, variables and command arguments.

use super::registry::starts_with_ignore_case;
use super::{CVarFlags, ConsoleOutputLevel, ConsoleState};

/// Supplies completion candidates for the arguments of one command or variable.
pub trait ArgumentAutoComplete: Send + Sync {
    fn count(&self) -> usize;
    fn value(&self, index: usize) -> Option<String>;
}

impl ArgumentAutoComplete for Vec<String> {
    fn count(&self) -> usize {
        self.len()
    }

    fn value(&self, index: usize) -> Option<String> {
        self.get(index).cloned()
    }
}

impl<F> ArgumentAutoComplete for F
where
    F: Fn() -> Vec<String> + Send + Sync,
{
    fn count(&self) -> usize {
        self().len()
    }

    fn value(&self, index: usize) -> Option<String> {
        self().into_iter().nth(index)
    }
}

/// State of the cycling Tab completion.
#[derive(Debug, Clone, Default)]
pub struct TabCompletion {
    prev_tab: String,
    tab_count: usize,
}

impl TabCompletion {
    pub fn reset(&mut self) {
        self.prev_tab.clear();
        self.tab_count = 0;
    }

    /// The text completion candidates are matched against.
    pub fn prefix(&self) -> &str {
        &self.prev_tab
    }
}

impl ConsoleState {
    /// Complete `input` and return the new edit line.
    ///
    /// The first press lists every candidate and takes the first one; later
    /// presses cycle through the candidates, wrapping around.
    pub fn process_completion(&mut self, input: &str) -> String {
        let body = input.strip_prefix('\\').unwrap_or(input);

        let prev = &self.completion.prev_tab;
        if prev.len() > body.len() || !starts_with_ignore_case(body, prev) {
            self.completion.reset();
        }

        if input.is_empty() {
            return String::new();
        }

        let show_list = self.completion.tab_count == 0 && self.completion.prev_tab.is_empty();
        if self.completion.tab_count == 0 {
            self.completion.prev_tab = body.to_string();
        }

        let prefix = self.completion.prev_tab.clone();
        let matches = self.completion_candidates(&prefix);

        if show_list && !matches.is_empty() {
            self.add_line_level(" ", ConsoleOutputLevel::Result);
            for candidate in &matches {
                if self.vars.contains(candidate) {
                    self.display_var_value(candidate);
                } else {
                    self.add_line_level(&format!("    {} (Command)", candidate), ConsoleOutputLevel::Result);
                }
            }
        }

        if let Some(candidate) = matches.get(self.completion.tab_count) {
            self.completion.tab_count += 1;
            return format!("{} ", candidate);
        }

        if self.completion.tab_count > 0 {
            self.completion.tab_count = 0;
            return self.process_completion(&prefix);
        }

        input.to_string()
    }

    fn completion_candidates(&self, prefix: &str) -> Vec<String> {
        let restricted = self.is_restricted();
        let allowed = |flags: CVarFlags| !restricted || flags.contains(CVarFlags::RESTRICTEDMODE);

        if let Some((name, _)) = prefix.split_once(' ') {
            let entry_allowed = self
                .commands
                .get(name)
                .map(|meta| meta.flags)
                .or_else(|| self.vars.get(name).map(|var| var.get_flags()))
                .is_none_or(allowed);

            if entry_allowed {
                if let Some(provider) = self.auto_complete.get(name) {
                    let mut candidates: Vec<String> = (0..provider.count())
                        .filter_map(|i| provider.value(i))
                        .map(|value| format!("{} {}", name, value))
                        .filter(|candidate| starts_with_ignore_case(candidate, prefix))
                        .collect();
                    if !candidates.is_empty() {
                        candidates.sort();
                        return candidates;
                    }
                }
            }
        }

        let mut candidates: Vec<String> = self
            .commands
            .iter()
            .filter(|(name, meta)| allowed(meta.flags) && starts_with_ignore_case(name, prefix))
            .map(|(name, _)| name.to_string())
            .chain(
                self.vars
                    .iter()
                    .filter(|(name, var)| allowed(var.get_flags()) && starts_with_ignore_case(name, prefix))
                    .map(|(name, _)| name.to_string()),
            )
            .collect();
        candidates.sort();
        candidates
    }

    pub fn reset_auto_completion(&mut self) {
        self.completion.reset();
    }

    /// Visible variables and commands, sorted, optionally filtered by a
    /// case-insensitive prefix.
    pub fn sorted_vars(&self, prefix: Option<&str>) -> Vec<String> {
        let prefix = prefix.unwrap_or("");
        let visible = |flags: CVarFlags| !flags.contains(CVarFlags::INVISIBLE);

        let mut names: Vec<String> = self
            .vars
            .iter()
            .filter(|(name, var)| visible(var.get_flags()) && starts_with_ignore_case(name, prefix))
            .map(|(name, _)| name.to_string())
            .chain(
                self.commands
                    .iter()
                    .filter(|(name, meta)| visible(meta.flags) && starts_with_ignore_case(name, prefix))
                    .map(|(name, _)| name.to_string()),
            )
            .collect();
        names.sort();
        names
    }

    /// The first name sorting after `substr`, compared case-sensitively and
    /// then case-insensitively.
    pub fn auto_complete(&self, substr: &str) -> Option<String> {
        let names = self.sorted_vars(None);
        if let Some(name) = names.iter().find(|name| name.as_str() > substr) {
            return Some(name.clone());
        }
        let lower = substr.to_ascii_lowercase();
        names
            .into_iter()
            .find(|name| name.to_ascii_lowercase() > lower)
    }

    /// The last name sorting before `substr`; wraps to the last name.
    pub fn auto_complete_prev(&self, substr: &str) -> Option<String> {
        let names = self.sorted_vars(None);
        if let Some(name) = names.iter().rev().find(|name| name.as_str() < substr) {
            return Some(name.clone());
        }
        let lower = substr.to_ascii_lowercase();
        names
            .iter()
            .rev()
            .find(|name| name.to_ascii_lowercase() < lower)
            .or_else(|| names.last())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CVar, DefaultHost};

    fn console() -> ConsoleState {
        let mut console = ConsoleState::new(DefaultHost::new(false, false));
        console.register(CVar::new("r_fov", 60));
        console.register(CVar::new("r_width", 1280));
        console.register(CVar::new("r_hidden", 0).flags(CVarFlags::INVISIBLE));
        console.register(CVar::new("g_gravity", -9.8f32));
        console
    }

    #[test]
    fn test_first_tab_lists_and_completes() {
        let mut console = console();
        let before = console.lines().count();

        assert_eq!(console.process_completion("r_f"), "r_fov ");
        assert!(console.lines().count() > before);
        assert!(console.lines().any(|l| l.text.contains("r_fov")));
    }

    #[test]
    fn test_tab_cycles_and_wraps() {
        let mut console = console();
        let first = console.process_completion("r_");
        assert_eq!(first, "r_fov ");
        let second = console.process_completion(&first);
        assert_eq!(second, "r_hidden ");
        let third = console.process_completion(&second);
        assert_eq!(third, "r_width ");
        let wrapped = console.process_completion(&third);
        assert_eq!(wrapped, "r_fov ");
    }

    #[test]
    fn test_case_insensitive_prefix() {
        let mut console = console();
        assert_eq!(console.process_completion("G_GR"), "g_gravity ");
    }

    #[test]
    fn test_no_match_returns_input() {
        let mut console = console();
        assert_eq!(console.process_completion("zzz"), "zzz");
        assert_eq!(console.process_completion(""), "");
    }

    #[test]
    fn test_legacy_backslash() {
        let mut console = console();
        assert_eq!(console.process_completion("\\g_"), "g_gravity ");
    }

    #[test]
    fn test_argument_completion() {
        let mut console = console();
        console.register_auto_complete("map", vec!["dust".to_string(), "docks".to_string(), "arena".to_string()]);
        console.register(CVar::new("map", ""));

        assert_eq!(console.process_completion("map d"), "map docks ");
        console.reset_auto_completion();
        assert_eq!(console.process_completion("map a"), "map arena ");
    }

    #[test]
    fn test_closure_provider() {
        let mut console = console();
        console.register_auto_complete("team", || vec!["red".to_string(), "blue".to_string()]);
        assert_eq!(console.process_completion("team r"), "team red ");
    }

    #[test]
    fn test_restricted_mode_filters() {
        let mut console = console();
        console.register(CVar::new("r_safe", 0).flags(CVarFlags::RESTRICTEDMODE));
        console.set_cvar("con_restricted", "1");

        assert_eq!(console.process_completion("r_"), "r_safe ");
        let next = console.process_completion("r_safe ");
        assert_eq!(next, "r_safe ");
    }

    #[test]
    fn test_sorted_vars_skip_invisible() {
        let console = console();
        let names = console.sorted_vars(Some("r_"));
        assert_eq!(names, vec!["r_fov", "r_width"]);
    }

    #[test]
    fn test_auto_complete_next_and_prev() {
        let console = console();
        assert_eq!(console.auto_complete("r_fov").as_deref(), Some("r_width"));
        assert_eq!(console.auto_complete_prev("r_width").as_deref(), Some("r_fov"));
        assert_eq!(console.auto_complete_prev("").as_deref(), console.sorted_vars(None).last().map(String::as_str));
    }
}
