//! CVar group definitions.
//!
//! A group is an integer variable (for example `sys_spec_shadows`) whose value
//! selects a set of assignments applied to other variables:
//!
//! ```text
//! [default]
//! ; group default value
//! _value = 2
//! e_shadows = 1
//! e_shadows_max_texture_size = 1024
//!
//! [1]
//! e_shadows = 0
//!
//! [3]
//! e_shadows_max_texture_size = 2048
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

/// Every group variable name starts with this (ASCII case-insensitive).
pub const GROUP_PREFIX: &str = "sys_spec_";

/// Errors from parsing or registering a group.
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("cvar group '{0}' must start with \"sys_spec_\"")]
    ReservedPrefix(String),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("failed to read group file: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed group definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CVarGroup {
    default_value: i32,
    defaults: Vec<(String, String)>,
    levels: BTreeMap<i32, Vec<(String, String)>>,
}

impl CVarGroup {
    /// Parse a definition.
    pub fn parse(text: &str) -> Result<Self, GroupError> {
        let mut group = CVarGroup {
            default_value: 1,
            ..Default::default()
        };
        let mut section: Option<Option<i32>> = None;

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with("--") {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let Some(name) = header.strip_suffix(']') else {
                    return Err(GroupError::Parse {
                        line: index + 1,
                        message: format!("unterminated section header '{}'", line),
                    });
                };
                let name = name.trim();
                section = if name.eq_ignore_ascii_case("default") {
                    Some(None)
                } else {
                    let level = name.parse::<i32>().map_err(|_| GroupError::Parse {
                        line: index + 1,
                        message: format!("section '{}' is neither 'default' nor a number", name),
                    })?;
                    group.levels.entry(level).or_default();
                    Some(Some(level))
                };
                continue;
            }

            let Some((name, value)) = line.split_once('=') else {
                return Err(GroupError::Parse {
                    line: index + 1,
                    message: format!("expected 'name = value', found '{}'", line),
                });
            };
            let name = name.trim().to_string();
            let value = value.trim().trim_matches('"').to_string();

            match section {
                None => {
                    return Err(GroupError::Parse {
                        line: index + 1,
                        message: "assignment outside of a section".to_string(),
                    });
                }
                Some(None) if name == "_value" => {
                    group.default_value = value.parse().unwrap_or(group.default_value);
                }
                Some(None) => group.defaults.push((name, value)),
                Some(Some(level)) => group.levels.entry(level).or_default().push((name, value)),
            }
        }

        Ok(group)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GroupError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Value of the group variable when nothing else sets it.
    pub fn default_value(&self) -> i32 {
        self.default_value
    }

    /// Levels that have their own section.
    pub fn levels(&self) -> impl Iterator<Item = i32> + '_ {
        self.levels.keys().copied()
    }

    /// Assignments for `level`: the defaults overlaid by the level's section.
    pub fn assignments(&self, level: i32) -> Vec<(String, String)> {
        let mut result = self.defaults.clone();
        for (name, value) in self.levels.get(&level).into_iter().flatten() {
            match result.iter_mut().find(|(existing, _)| existing == name) {
                Some(slot) => slot.1 = value.clone(),
                None => result.push((name.clone(), value.clone())),
            }
        }
        result
    }

    /// Help text listing what each level sets.
    pub fn describe(&self) -> String {
        let mut help = String::from("Console variable group to apply settings to multiple variables\n");
        for level in self.levels() {
            help.push_str(&format!("\n[{}]", level));
            for (name, value) in self.assignments(level) {
                help.push_str(&format!("\n {} = {}", name, value));
            }
        }
        help
    }
}

/// True if `name` may be used for a group variable.
pub fn is_group_name(name: &str) -> bool {
    name.len() >= GROUP_PREFIX.len()
        && name.as_bytes()[..GROUP_PREFIX.len()].eq_ignore_ascii_case(GROUP_PREFIX.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHADOWS: &str = "
[default]
; comment
_value = 2
e_shadows = 1
e_shadow_res = 1024

[1]
e_shadows = 0

[3]
e_shadow_res = 2048
r_extra = \"on\"
";

    #[test]
    fn test_parse_and_overlay() {
        let group = CVarGroup::parse(SHADOWS).unwrap();
        assert_eq!(group.default_value(), 2);
        assert_eq!(group.levels().collect::<Vec<_>>(), vec![1, 3]);

        let level1 = group.assignments(1);
        assert_eq!(
            level1,
            vec![
                ("e_shadows".to_string(), "0".to_string()),
                ("e_shadow_res".to_string(), "1024".to_string()),
            ]
        );

        let level3 = group.assignments(3);
        assert!(level3.contains(&("e_shadow_res".to_string(), "2048".to_string())));
        assert!(level3.contains(&("r_extra".to_string(), "on".to_string())));

        assert_eq!(group.assignments(7).len(), 2);
    }

    #[test]
    fn test_default_value_fallback() {
        let group = CVarGroup::parse("[default]\na = 1\n").unwrap();
        assert_eq!(group.default_value(), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            CVarGroup::parse("a = 1"),
            Err(GroupError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            CVarGroup::parse("[high]\na = 1"),
            Err(GroupError::Parse { line: 1, .. })
        ));
        assert!(matches!(
            CVarGroup::parse("[default]\njunk"),
            Err(GroupError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_group_name_prefix() {
        assert!(is_group_name("sys_spec_shadows"));
        assert!(is_group_name("SYS_SPEC_Full"));
        assert!(!is_group_name("r_shadows"));
        assert!(!is_group_name("sys_spe"));
    }

    #[test]
    fn test_describe_lists_levels() {
        let group = CVarGroup::parse(SHADOWS).unwrap();
        let help = group.describe();
        assert!(help.contains("[1]"));
        assert!(help.contains(" e_shadow_res = 2048"));
    }
}
