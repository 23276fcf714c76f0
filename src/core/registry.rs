//! Variable registry.
//!
//! Owns every [`CVar`], the values staged for variables that are not
//! registered yet, the two cheat-checked name indexes, cvar groups and change
//! sinks. Every user-visible mutation goes through the protection gate in
//! [`CVarRegistry::set`].

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use bevy::prelude::*;

use super::groups::{CVarGroup, GroupError, is_group_name};
use super::{AccessMode, CVar, CVarFlags, CVarValue, ConVarChangedEvent, ConsoleLine, ConsoleOutputLevel};

/// Observer of variable changes.
pub trait CVarSink: Send + Sync {
    /// Return false to veto the change.
    fn on_before_change(&mut self, var: &CVar, new_value: &str) -> bool {
        let _ = (var, new_value);
        true
    }

    fn on_after_change(&mut self, var: &CVar) {
        let _ = var;
    }
}

/// Handle returned when adding a [`CVarSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CVarSinkId(u64);

/// Result of a set request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// Value stored.
    Applied,
    /// The new value equals the current one; nothing happened.
    Unchanged,
    /// Refused by the protection gate.
    Denied,
    /// Refused by a sink.
    Vetoed,
    NotFound,
}

impl SetOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, SetOutcome::Applied)
    }
}

/// A config value waiting for its variable to be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingConfig {
    value: String,
    part_of_group: bool,
}

/// Registry of console variables.
pub struct CVarRegistry {
    vars: BTreeMap<String, CVar>,
    pending: HashMap<String, PendingConfig>,
    always_checked: Vec<String>,
    random_checked: Vec<String>,
    groups: HashMap<String, CVarGroup>,
    sinks: Vec<(CVarSinkId, Box<dyn CVarSink>)>,
    next_sink_id: u64,
    processing_group: bool,
    groups_privileged: bool,
    allow_const_modifications: bool,
    changes: Vec<ConVarChangedEvent>,
    notices: Vec<ConsoleLine>,
}

impl Default for CVarRegistry {
    fn default() -> Self {
        Self {
            vars: BTreeMap::new(),
            pending: HashMap::new(),
            always_checked: Vec::new(),
            random_checked: Vec::new(),
            groups: HashMap::new(),
            sinks: Vec::new(),
            next_sink_id: 0,
            processing_group: false,
            groups_privileged: true,
            allow_const_modifications: false,
            changes: Vec::new(),
            notices: Vec::new(),
        }
    }
}

impl CVarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variable.
    ///
    /// A duplicate name is reported and the already registered variable is
    /// returned untouched. A value staged by [`load_config_var`] for this name
    /// is applied (through the gate) before the change callback is attached.
    ///
    /// [`load_config_var`]: Self::load_config_var
    pub fn register(&mut self, mut cvar: CVar, mode: AccessMode) -> &CVar {
        self.admit(&mut cvar, mode);
        self.insert_admitted(cvar)
    }

    /// [`register`](Self::register), also handing back the lines it reported.
    pub(crate) fn register_reporting(&mut self, mut cvar: CVar, mode: AccessMode) -> (&CVar, Vec<ConsoleLine>) {
        self.admit(&mut cvar, mode);
        let notices = std::mem::take(&mut self.notices);
        (self.insert_admitted(cvar), notices)
    }

    fn admit(&mut self, cvar: &mut CVar, mode: AccessMode) {
        if self.vars.contains_key(cvar.name()) {
            let message = format!(
                "[CVARS]: [DUPLICATE] Register({}): variable [{}] is already registered",
                cvar.ty(),
                cvar.name()
            );
            error!("{}", message);
            self.notices.push(ConsoleLine::new(ConsoleOutputLevel::Error, message));
        } else {
            self.prepare_new(cvar, mode);
        }
    }

    fn insert_admitted(&mut self, cvar: CVar) -> &CVar {
        match self.vars.entry(cvar.name().to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(cvar),
        }
    }

    fn prepare_new(&mut self, cvar: &mut CVar, mode: AccessMode) {
        let mut flags = cvar.get_flags();
        if !cvar.allows_modify() {
            flags |= CVarFlags::CONST;
        }
        cvar.set_flags(flags);
        let callback = cvar.take_on_change();

        if let Some(pending) = self.pending.get(cvar.name()).cloned() {
            let value = cvar.parse_value(&pending.value);
            let previous = std::mem::replace(&mut self.processing_group, pending.part_of_group);
            let differs = value != *cvar.value();
            let allowed = check_protection(
                cvar,
                &value.to_string(),
                mode,
                self.gate_context(),
                differs,
                &mut self.notices,
            );
            self.processing_group = previous;

            if allowed {
                cvar.store(value);
                cvar.set_flags(cvar.get_flags() | CVarFlags::MODIFIED | CVarFlags::WASINCONFIG);
            }
        } else {
            cvar.set_flags(cvar.get_flags() - CVarFlags::MODIFIED);
        }

        let flags = cvar.get_flags();
        if flags.contains(CVarFlags::CHEAT_ALWAYS_CHECK) {
            insert_sorted(&mut self.always_checked, cvar.name());
        } else if flags & (CVarFlags::CHEAT | CVarFlags::CHEAT_NOCHECK) == CVarFlags::CHEAT {
            insert_sorted(&mut self.random_checked, cvar.name());
        }

        cvar.set_on_change(callback);
    }

    /// Remove a variable. Returns false if it was not registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        if self.vars.remove(name).is_none() {
            return false;
        }
        remove_sorted(&mut self.always_checked, name);
        remove_sorted(&mut self.random_checked, name);
        self.groups.remove(name);
        true
    }

    /// Parse `value` into the variable's type and set it through the gate.
    pub fn set(&mut self, name: &str, value: &str, mode: AccessMode) -> SetOutcome {
        let Some(var) = self.vars.get(name) else {
            return SetOutcome::NotFound;
        };
        let value = var.parse_value(value);
        self.apply(name, value, mode, false)
    }

    /// Set a typed value through the gate; it is converted to the variable's type.
    pub fn set_value(&mut self, name: &str, value: impl Into<CVarValue>, mode: AccessMode) -> SetOutcome {
        self.apply(name, value.into(), mode, false)
    }

    /// Apply a configuration value.
    ///
    /// Registered variables are set through the gate and marked `WASINCONFIG`;
    /// unknown names are staged until they get registered.
    pub fn load_config_var(&mut self, name: &str, value: &str, mode: AccessMode) -> SetOutcome {
        match self.vars.get(name) {
            Some(var) => {
                let value = var.parse_value(value);
                self.apply(name, value, mode, true)
            }
            None => {
                self.pending.insert(
                    name.to_string(),
                    PendingConfig {
                        value: value.to_string(),
                        part_of_group: self.processing_group,
                    },
                );
                SetOutcome::NotFound
            }
        }
    }

    fn apply(&mut self, name: &str, value: CVarValue, mode: AccessMode, from_config: bool) -> SetOutcome {
        let Some(var) = self.vars.get(name) else {
            return SetOutcome::NotFound;
        };
        let value = value.convert(var.ty(), var.get_flags().contains(CVarFlags::BITFIELD));

        if value == *var.value() {
            if from_config {
                if let Some(var) = self.vars.get_mut(name) {
                    var.set_flags(var.get_flags() | CVarFlags::WASINCONFIG);
                }
            }
            return SetOutcome::Unchanged;
        }

        let new_text = value.to_string();
        let context = self.gate_context();
        if !check_protection(var, &new_text, mode, context, true, &mut self.notices) {
            return SetOutcome::Denied;
        }
        for (_, sink) in self.sinks.iter_mut() {
            if !sink.on_before_change(var, &new_text) {
                return SetOutcome::Vetoed;
            }
        }

        let Some(var) = self.vars.get_mut(name) else {
            return SetOutcome::NotFound;
        };
        let old = var.store(value);
        let mut flags = var.get_flags() | CVarFlags::MODIFIED;
        if from_config {
            flags |= CVarFlags::WASINCONFIG;
        }
        var.set_flags(flags);
        let level = var.get_i32();

        self.notify_changed(name, old.to_string());

        if self.groups.contains_key(name) {
            self.apply_group(name, level, mode);
        }
        SetOutcome::Applied
    }

    fn notify_changed(&mut self, name: &str, old: String) {
        let Some(var) = self.vars.get(name) else {
            return;
        };
        if let Some(callback) = var.on_change_callback() {
            callback(var);
        }
        for (_, sink) in self.sinks.iter_mut() {
            sink.on_after_change(var);
        }
        self.changes.push(ConVarChangedEvent::new(name, old, var.get_string()));
    }

    /// Reset every variable to its registration-time default, bypassing the gate.
    pub fn reset_all_to_defaults(&mut self) {
        let names: Vec<String> = self.vars.keys().cloned().collect();
        for name in names {
            let Some(var) = self.vars.get_mut(&name) else {
                continue;
            };
            let old = var.get_string();
            if var.reset() {
                self.notify_changed(&name, old);
            }
        }
    }

    /// Register a cvar group variable from a parsed definition.
    ///
    /// The group variable is an int whose value selects a level; the level's
    /// assignments are applied immediately and on every later change.
    pub fn register_cvar_group(&mut self, name: &str, group: CVarGroup, mode: AccessMode) -> Result<(), GroupError> {
        if !is_group_name(name) {
            return Err(GroupError::ReservedPrefix(name.to_string()));
        }
        if self.vars.contains_key(name) {
            warn!("[CVARS]: CVar groups should only be registered once: {}", name);
            self.notices.push(ConsoleLine::new(
                ConsoleOutputLevel::Warn,
                format!("CVar groups should only be registered once: {}", name),
            ));
            return Ok(());
        }

        let cvar = CVar::new(name, group.default_value()).help(group.describe());
        self.groups.insert(name.to_string(), group);
        let level = self.register(cvar, mode).get_i32();
        self.apply_group(name, level, mode);
        Ok(())
    }

    fn apply_group(&mut self, name: &str, level: i32, mode: AccessMode) {
        let Some(group) = self.groups.get(name) else {
            return;
        };
        let assignments = group.assignments(level);

        let previous = std::mem::replace(&mut self.processing_group, true);
        for (var, value) in assignments {
            self.load_config_var(&var, &value, mode);
        }
        self.processing_group = previous;
    }

    fn gate_context(&self) -> GateContext {
        GateContext {
            in_group: self.processing_group,
            skip_for_group: self.processing_group && self.groups_privileged,
            allow_const: self.allow_const_modifications,
        }
    }

    /// Whether assignments applied by a group bypass the protection gate (default true).
    pub fn set_groups_privileged(&mut self, privileged: bool) {
        self.groups_privileged = privileged;
    }

    /// Treat `CONST` variables as unprotected (default false).
    pub fn set_allow_const_modifications(&mut self, allow: bool) {
        self.allow_const_modifications = allow;
    }

    pub fn add_sink(&mut self, sink: Box<dyn CVarSink>) -> CVarSinkId {
        let id = CVarSinkId(self.next_sink_id);
        self.next_sink_id += 1;
        self.sinks.push((id, sink));
        id
    }

    pub fn remove_sink(&mut self, id: CVarSinkId) -> bool {
        let before = self.sinks.len();
        self.sinks.retain(|(sink_id, _)| *sink_id != id);
        self.sinks.len() != before
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&CVar> {
        self.vars.get(name)
    }

    /// Direct mutable access. Bypasses the gate and all notifications.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut CVar> {
        self.vars.get_mut(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Name-sorted iteration.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CVar)> {
        self.vars.iter().map(|(name, var)| (name.as_str(), var))
    }

    /// Names starting with `prefix`, compared ASCII case-insensitively.
    pub fn names_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.vars
            .keys()
            .map(String::as_str)
            .filter(move |name| starts_with_ignore_case(name, prefix))
    }

    /// Variables not flagged `INVISIBLE`.
    pub fn visible_count(&self) -> usize {
        self.vars
            .values()
            .filter(|var| !var.get_flags().contains(CVarFlags::INVISIBLE))
            .count()
    }

    /// Cheat variables hashed on every calculation, sorted.
    pub fn always_checked(&self) -> &[String] {
        &self.always_checked
    }

    /// Cheat variables hashed when they fall into the selected range, sorted.
    pub fn random_checked(&self) -> &[String] {
        &self.random_checked
    }

    pub fn is_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// The staged value for a variable that is not registered yet.
    pub fn pending_value(&self, name: &str) -> Option<&str> {
        self.pending.get(name).map(|p| p.value.as_str())
    }

    pub fn is_processing_group(&self) -> bool {
        self.processing_group
    }

    pub(crate) fn take_changes(&mut self) -> Vec<ConVarChangedEvent> {
        std::mem::take(&mut self.changes)
    }

    pub(crate) fn take_notices(&mut self) -> Vec<ConsoleLine> {
        std::mem::take(&mut self.notices)
    }
}

#[derive(Debug, Clone, Copy)]
struct GateContext {
    in_group: bool,
    skip_for_group: bool,
    allow_const: bool,
}

/// Decide whether `var` may change to `new_value`, logging the decision.
///
/// `log_change` suppresses the report when the caller knows nothing would
/// actually change.
fn check_protection(
    var: &CVar,
    new_value: &str,
    mode: AccessMode,
    context: GateContext,
    log_change: bool,
    notices: &mut Vec<ConsoleLine>,
) -> bool {
    if context.skip_for_group {
        return true;
    }

    let flags = var.get_flags();
    let is_const = flags.contains(CVarFlags::CONST) && !context.allow_const;
    let is_cheat = flags.is_cheat();
    let is_read_only = flags.contains(CVarFlags::READONLY);
    let is_deprecated = flags.contains(CVarFlags::DEPRECATED);

    if !(is_const || is_cheat || is_read_only || is_deprecated) {
        return true;
    }

    let allowed = context.allow_const || (!is_deprecated && (mode.dev_mode || mode.editor));

    if log_change && (!mode.editor || is_deprecated) {
        let message = format!(
            "[CVARS]: [{}] variable [{}] from [{}] to [{}]{}; Marked as{}{}{}{}",
            if allowed { "CHANGED" } else { "IGNORED CHANGE" },
            var.name(),
            var.get_string(),
            new_value,
            if context.in_group { " as part of a cvar group" } else { "" },
            if is_const { " [VF_CONST_CVAR]" } else { "" },
            if is_cheat { " [VF_CHEAT]" } else { "" },
            if is_read_only { " [VF_READONLY]" } else { "" },
            if is_deprecated { " [VF_DEPRECATED]" } else { "" },
        );

        if allowed {
            warn!("{}", message);
            warn!("Modifying marked variables will not be allowed in Release mode!");
            notices.push(ConsoleLine::new(ConsoleOutputLevel::Warn, message));
            notices.push(ConsoleLine::new(
                ConsoleOutputLevel::Warn,
                "Modifying marked variables will not be allowed in Release mode!",
            ));
        } else {
            error!("{}", message);
            notices.push(ConsoleLine::new(ConsoleOutputLevel::Error, message));
        }
    }

    allowed
}

fn insert_sorted(index: &mut Vec<String>, name: &str) {
    if let Err(position) = index.binary_search_by(|probe| probe.as_str().cmp(name)) {
        index.insert(position, name.to_string());
    }
}

fn remove_sorted(index: &mut Vec<String>, name: &str) {
    if let Ok(position) = index.binary_search_by(|probe| probe.as_str().cmp(name)) {
        index.remove(position);
    }
}

/// ASCII case-insensitive `starts_with`.
pub(crate) fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len() && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    fn release() -> AccessMode {
        AccessMode::RELEASE
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("r_fov", 60).help("Field of view"), release());

        let var = registry.get("r_fov").unwrap();
        assert_eq!(var.get_i32(), 60);
        assert_eq!(var.get_help(), "Field of view");
        assert!(!var.get_flags().contains(CVarFlags::MODIFIED));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_returns_existing() {
        let mut registry = CVarRegistry::new();
        let first = registry.register(CVar::new("r_fov", 60), release()) as *const CVar;
        let second = registry.register(CVar::new("r_fov", 90), release()) as *const CVar;

        assert!(std::ptr::eq(first, second));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("r_fov").unwrap().get_i32(), 60);

        let notices = registry.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, ConsoleOutputLevel::Error);
        assert!(notices[0].text.contains("[DUPLICATE]"));
        assert!(notices[0].text.contains("[r_fov]"));
    }

    #[test]
    fn test_disallow_modify_marks_const() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("sys_version", 3).allow_modify(false), release());
        assert!(registry.get("sys_version").unwrap().is_const());

        assert_eq!(registry.set("sys_version", "4", release()), SetOutcome::Denied);
        assert_eq!(registry.get("sys_version").unwrap().get_i32(), 3);
    }

    #[test]
    fn test_const_gate_in_release() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("c", 1).flags(CVarFlags::CONST), release());

        for value in ["2", "-5", "abc"] {
            let before = registry.get("c").unwrap().get_i32();
            registry.set("c", value, release());
            assert_eq!(registry.get("c").unwrap().get_i32(), before);
        }
    }

    #[test]
    fn test_cheat_gate_logs_error() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("g_gravity", -9.8f32).flags(CVarFlags::CHEAT), release());
        registry.take_notices();

        assert_eq!(registry.set("g_gravity", "-1", release()), SetOutcome::Denied);
        assert_eq!(registry.get("g_gravity").unwrap().get_f32(), -9.8);

        let notices = registry.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, ConsoleOutputLevel::Error);
        assert_eq!(
            notices[0].text,
            "[CVARS]: [IGNORED CHANGE] variable [g_gravity] from [-9.8] to [-1]; Marked as [VF_CHEAT]"
        );
    }

    #[test]
    fn test_cheat_gate_allows_dev_with_warning() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("g_gravity", -9.8f32).flags(CVarFlags::CHEAT), release());

        assert_eq!(registry.set("g_gravity", "-1", AccessMode::DEV), SetOutcome::Applied);
        assert_eq!(registry.get("g_gravity").unwrap().get_f32(), -1.0);

        let notices = registry.take_notices();
        assert_eq!(notices.len(), 2);
        assert!(notices[0].text.starts_with("[CVARS]: [CHANGED]"));
        assert!(notices[1].text.contains("Release mode"));
    }

    #[test]
    fn test_editor_changes_are_quiet() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("c", 1).flags(CVarFlags::READONLY), release());
        let editor = AccessMode { dev_mode: false, editor: true };

        assert_eq!(registry.set("c", "2", editor), SetOutcome::Applied);
        assert!(registry.take_notices().is_empty());
    }

    #[test]
    fn test_deprecated_always_refused() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("old", 1).flags(CVarFlags::DEPRECATED), release());
        let editor = AccessMode { dev_mode: true, editor: true };

        assert_eq!(registry.set("old", "2", editor), SetOutcome::Denied);
        let notices = registry.take_notices();
        assert!(notices[0].text.contains("[VF_DEPRECATED]"));
    }

    #[test]
    fn test_same_value_is_unchanged() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("c", 1).flags(CVarFlags::CONST), release());
        assert_eq!(registry.set("c", "1", release()), SetOutcome::Unchanged);
        assert!(registry.take_notices().is_empty());
    }

    #[test]
    fn test_set_marks_modified_and_records_change() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("r_fov", 60), release());

        assert_eq!(registry.set("r_fov", "90", release()), SetOutcome::Applied);
        let var = registry.get("r_fov").unwrap();
        assert!(var.get_flags().contains(CVarFlags::MODIFIED));

        let changes = registry.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_value, "60");
        assert_eq!(changes[0].new_value, "90");
    }

    #[test]
    fn test_on_change_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = CVarRegistry::new();
        registry.register(
            CVar::new("r_fov", 60).on_change(move |var| {
                assert_eq!(var.get_i32(), 75);
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            release(),
        );

        registry.set("r_fov", "75", release());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct Veto(Arc<Mutex<Vec<String>>>);

    impl CVarSink for Veto {
        fn on_before_change(&mut self, _var: &CVar, new_value: &str) -> bool {
            new_value != "13"
        }

        fn on_after_change(&mut self, var: &CVar) {
            if let Ok(mut seen) = self.0.lock() {
                seen.push(var.get_string());
            }
        }
    }

    #[test]
    fn test_sink_veto_and_notify() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("n", 0), release());
        let id = registry.add_sink(Box::new(Veto(seen.clone())));

        assert_eq!(registry.set("n", "13", release()), SetOutcome::Vetoed);
        assert_eq!(registry.set("n", "12", release()), SetOutcome::Applied);
        assert_eq!(*seen.lock().unwrap(), vec!["12"]);

        assert!(registry.remove_sink(id));
        assert_eq!(registry.set("n", "13", release()), SetOutcome::Applied);
    }

    #[test]
    fn test_staged_config_applies_on_register() {
        let mut registry = CVarRegistry::new();
        assert_eq!(registry.load_config_var("r_width", "1920", release()), SetOutcome::NotFound);
        assert_eq!(registry.pending_value("r_width"), Some("1920"));

        registry.register(CVar::new("r_width", 1280), release());
        let var = registry.get("r_width").unwrap();
        assert_eq!(var.get_i32(), 1920);
        assert!(var.get_flags().contains(CVarFlags::WASINCONFIG));
        assert_eq!(registry.pending_value("r_width"), Some("1920"));
    }

    #[test]
    fn test_config_value_survives_reregister() {
        let mut registry = CVarRegistry::new();
        registry.load_config_var("x", "5", release());
        registry.register(CVar::new("x", 1), release());
        assert_eq!(registry.get("x").unwrap().get_i32(), 5);

        assert!(registry.unregister("x"));
        registry.register(CVar::new("x", 1), release());
        assert_eq!(registry.get("x").unwrap().get_i32(), 5);
    }

    #[test]
    fn test_staged_config_respects_gate() {
        let mut registry = CVarRegistry::new();
        registry.load_config_var("g_god", "1", release());
        registry.register(CVar::new("g_god", 0).flags(CVarFlags::CHEAT), release());

        let var = registry.get("g_god").unwrap();
        assert_eq!(var.get_i32(), 0);
        assert!(!var.get_flags().contains(CVarFlags::WASINCONFIG));
    }

    #[test]
    fn test_load_config_on_registered_var() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("r_vsync", 0), release());
        assert_eq!(registry.load_config_var("r_vsync", "1", release()), SetOutcome::Applied);
        assert!(registry.get("r_vsync").unwrap().get_flags().contains(CVarFlags::WASINCONFIG));
    }

    #[test]
    fn test_checked_indexes() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("z_cheat", 0).flags(CVarFlags::CHEAT), release());
        registry.register(CVar::new("a_cheat", 0).flags(CVarFlags::CHEAT), release());
        registry.register(CVar::new("nocheck", 0).flags(CVarFlags::CHEAT | CVarFlags::CHEAT_NOCHECK), release());
        registry.register(
            CVar::new("always", 0).flags(CVarFlags::CHEAT | CVarFlags::CHEAT_ALWAYS_CHECK),
            release(),
        );
        registry.register(CVar::new("plain", 0), release());

        assert_eq!(registry.random_checked(), ["a_cheat", "z_cheat"]);
        assert_eq!(registry.always_checked(), ["always"]);

        assert!(registry.unregister("a_cheat"));
        assert_eq!(registry.random_checked(), ["z_cheat"]);
        assert!(!registry.unregister("a_cheat"));
    }

    #[test]
    fn test_reset_all_bypasses_gate() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("c", 1).flags(CVarFlags::CHEAT), release());
        registry.register(CVar::new("p", 5), release());
        registry.set("c", "7", AccessMode::DEV);
        registry.set("p", "9", release());

        registry.reset_all_to_defaults();
        assert_eq!(registry.get("c").unwrap().get_i32(), 1);
        assert_eq!(registry.get("p").unwrap().get_i32(), 5);
    }

    #[test]
    fn test_cvar_group() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("e_shadows", 0).flags(CVarFlags::CHEAT), release());

        let group = CVarGroup::parse("[default]\n_value = 1\ne_shadows = 1\ne_res = 512\n[2]\ne_res = 2048\n").unwrap();
        registry.register_cvar_group("sys_spec_shadows", group, release()).unwrap();

        // Group assignments bypass the cheat gate and stage unknown names.
        assert_eq!(registry.get("e_shadows").unwrap().get_i32(), 1);
        assert_eq!(registry.pending_value("e_res"), Some("512"));

        registry.register(CVar::new("e_res", 256), release());
        assert_eq!(registry.get("e_res").unwrap().get_i32(), 512);

        registry.set("sys_spec_shadows", "2", release());
        assert_eq!(registry.get("e_res").unwrap().get_i32(), 2048);
        assert!(!registry.is_processing_group());
    }

    #[test]
    fn test_cvar_group_name_rules() {
        let mut registry = CVarRegistry::new();
        let group = CVarGroup::parse("[default]\na = 1\n").unwrap();
        assert!(matches!(
            registry.register_cvar_group("r_quality", group.clone(), release()),
            Err(GroupError::ReservedPrefix(_))
        ));
        assert!(!registry.contains("r_quality"));

        registry.register_cvar_group("SYS_SPEC_Quality", group.clone(), release()).unwrap();
        registry.take_notices();
        registry.register_cvar_group("SYS_SPEC_Quality", group, release()).unwrap();
        let notices = registry.take_notices();
        assert!(notices[0].text.contains("only be registered once"));
    }

    #[test]
    fn test_unprivileged_groups_are_gated() {
        let mut registry = CVarRegistry::new();
        registry.set_groups_privileged(false);
        registry.register(CVar::new("e_shadows", 0).flags(CVarFlags::CHEAT), release());

        let group = CVarGroup::parse("[default]\ne_shadows = 1\n").unwrap();
        registry.register_cvar_group("sys_spec_shadows", group, release()).unwrap();
        assert_eq!(registry.get("e_shadows").unwrap().get_i32(), 0);
        assert!(registry.take_notices().iter().any(|n| n.text.contains("as part of a cvar group")));
    }

    #[test]
    fn test_allow_const_modifications() {
        let mut registry = CVarRegistry::new();
        registry.set_allow_const_modifications(true);
        registry.register(CVar::new("c", 1).flags(CVarFlags::CONST), release());
        assert_eq!(registry.set("c", "2", release()), SetOutcome::Applied);
    }

    #[test]
    fn test_allow_const_override_permits_deprecated() {
        let mut registry = CVarRegistry::new();
        registry.set_allow_const_modifications(true);
        registry.register(CVar::new("d", 1).flags(CVarFlags::DEPRECATED), release());
        assert_eq!(registry.set("d", "2", AccessMode::DEV), SetOutcome::Applied);
        assert_eq!(registry.get("d").unwrap().get_i32(), 2);

        registry.set_allow_const_modifications(false);
        assert_eq!(registry.set("d", "3", AccessMode::DEV), SetOutcome::Denied);
        assert_eq!(registry.get("d").unwrap().get_i32(), 2);
    }

    #[test]
    fn test_names_with_prefix() {
        let mut registry = CVarRegistry::new();
        registry.register(CVar::new("r_fov", 60), release());
        registry.register(CVar::new("R_Width", 1), release());
        registry.register(CVar::new("g_gravity", 1.0f32), release());

        let names: Vec<_> = registry.names_with_prefix("r_").collect();
        assert_eq!(names, vec!["R_Width", "r_fov"]);
    }
}
