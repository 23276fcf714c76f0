//! The console resource.
//!
//! [`ConsoleState`] owns everything the console knows about: variables,
//! command metadata, the deferred queue, scrollback, history, the edit line,
//! key binds and the cheat hash. Native command handlers are kept apart in
//! [`CommandHandlers`] so a running handler can borrow the console.
//!
//! Execution of input lives in the interpreter, which works on the `World`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use bevy::prelude::*;

use super::binds::KeyBinds;
use super::buffer::{LineBuffer, OutputPrintSink, OutputSinkId};
use super::cheat_hash::CheatHash;
use super::completion::{ArgumentAutoComplete, TabCompletion};
use super::deferred::DeferredQueue;
use super::groups::{CVarGroup, GroupError};
use super::history::History;
use super::input::InputLine;
use super::registry::{CVarRegistry, CVarSink, CVarSinkId, SetOutcome};
use super::{
    flags_string, AccessMode, CVar, CVarFlags, CommandHandlers, CommandMeta, CommandRegistry, ConCommand,
    ConVarChangedEvent, ConsoleHost, ConsoleLine, ConsoleOutputLevel,
};

/// Scrollback size used until `con_line_buffer_size` is registered.
const DEFAULT_LINE_BUFFER_SIZE: usize = 1000;

/// The developer console.
#[derive(Resource)]
pub struct ConsoleState {
    pub(crate) vars: CVarRegistry,
    pub(crate) commands: CommandRegistry,
    pub(crate) auto_complete: HashMap<String, Box<dyn ArgumentAutoComplete>>,
    pub(crate) deferred: DeferredQueue,
    pub(crate) buffer: LineBuffer,
    pub(crate) history: History,
    pub(crate) input: InputLine,
    pub(crate) completion: TabCompletion,
    pub(crate) binds: KeyBinds,
    pub(crate) cheat_hash: CheatHash,
    pub(crate) script_depth: u32,
    host: Box<dyn ConsoleHost>,
    active: bool,
    activation_key_enabled: bool,
    console_key_pressed: bool,
    toggles: Vec<bool>,
    clear_requested: bool,
}

impl ConsoleState {
    /// Create a console and register its own configuration variables.
    pub fn new(host: impl ConsoleHost + 'static) -> Self {
        let mut console = Self {
            vars: CVarRegistry::new(),
            commands: CommandRegistry::new(),
            auto_complete: HashMap::new(),
            deferred: DeferredQueue::new(),
            buffer: LineBuffer::new(),
            history: History::new(),
            input: InputLine::new(),
            completion: TabCompletion::default(),
            binds: KeyBinds::new(),
            cheat_hash: CheatHash::default(),
            script_depth: 0,
            host: Box::new(host),
            active: false,
            activation_key_enabled: true,
            console_key_pressed: false,
            toggles: Vec::new(),
            clear_requested: false,
        };

        console.register(
            CVar::new("sys_DeactivateConsole", 0).help("0: normal console behavior\n1: hide the console"),
        );
        console.register(CVar::new("con_display_last_messages", 0));
        console.register(CVar::new("con_line_buffer_size", DEFAULT_LINE_BUFFER_SIZE as i32));
        console.register(CVar::new("con_showonload", 0).help("Show console on level loading"));
        console.register(
            CVar::new("con_debug", 0)
                .flags(CVarFlags::CHEAT)
                .help("Log every GetCVar call"),
        );
        console.register(
            CVar::new("con_restricted", 0)
                .flags(CVarFlags::RESTRICTEDMODE)
                .help("0=normal mode / 1=restricted access to the console"),
        );
        console
    }

    #[inline]
    pub fn host(&self) -> &dyn ConsoleHost {
        self.host.as_ref()
    }

    #[inline]
    pub fn access_mode(&self) -> AccessMode {
        self.host.access_mode()
    }

    // ---- variables -------------------------------------------------------

    /// Register a variable. On a duplicate name the existing one is returned.
    pub fn register(&mut self, cvar: CVar) -> &CVar {
        let mode = self.access_mode();
        let capacity = self.line_buffer_size();
        let (var, notices) = self.vars.register_reporting(cvar, mode);
        for line in notices {
            self.buffer.post_line(line, capacity);
        }
        var
    }

    pub fn register_int(&mut self, name: &str, value: i32, flags: CVarFlags, help: &str) -> &CVar {
        self.register(CVar::new(name, value).flags(flags).help(help))
    }

    pub fn register_float(&mut self, name: &str, value: f32, flags: CVarFlags, help: &str) -> &CVar {
        self.register(CVar::new(name, value).flags(flags).help(help))
    }

    pub fn register_string(&mut self, name: &str, value: &str, flags: CVarFlags, help: &str) -> &CVar {
        self.register(CVar::new(name, value).flags(flags).help(help))
    }

    pub fn register_int64(&mut self, name: &str, value: i64, flags: CVarFlags, help: &str) -> &CVar {
        self.register(CVar::new(name, value).flags(flags).help(help))
    }

    /// Register a `sys_spec_*` group variable from its definition text.
    pub fn register_cvar_group(&mut self, name: &str, definition: &str) -> Result<(), GroupError> {
        let group = CVarGroup::parse(definition)?;
        let mode = self.access_mode();
        let result = self.vars.register_cvar_group(name, group, mode);
        self.flush_notices();
        result
    }

    pub fn register_cvar_group_file(&mut self, name: &str, path: impl AsRef<Path>) -> Result<(), GroupError> {
        let group = CVarGroup::load(path)?;
        let mode = self.access_mode();
        let result = self.vars.register_cvar_group(name, group, mode);
        self.flush_notices();
        result
    }

    /// Remove a variable together with its argument autocompleter.
    pub fn unregister_variable(&mut self, name: &str) -> bool {
        self.auto_complete.remove(name);
        self.vars.unregister(name)
    }

    pub fn get_cvar(&self, name: &str) -> Option<&CVar> {
        if self.vars.get("con_debug").is_some_and(|v| v.get_i32() != 0) {
            debug!("GetCVar(\"{}\") called", name);
        }
        self.vars.get(name)
    }

    /// Set a variable from text through the protection gate.
    pub fn set_cvar(&mut self, name: &str, value: &str) -> SetOutcome {
        let mode = self.access_mode();
        let outcome = self.vars.set(name, value, mode);
        self.flush_notices();
        outcome
    }

    /// Apply a configuration value, staging it if the variable does not exist yet.
    pub fn load_config_var(&mut self, name: &str, value: &str) -> SetOutcome {
        let mode = self.access_mode();
        let outcome = self.vars.load_config_var(name, value, mode);
        self.flush_notices();
        outcome
    }

    pub fn reset_cvars_to_defaults(&mut self) {
        self.vars.reset_all_to_defaults();
    }

    #[inline]
    pub fn vars(&self) -> &CVarRegistry {
        &self.vars
    }

    /// The registry itself. Changes made here skip the console's line output.
    #[inline]
    pub fn vars_mut(&mut self) -> &mut CVarRegistry {
        &mut self.vars
    }

    pub fn add_var_sink(&mut self, sink: impl CVarSink + 'static) -> CVarSinkId {
        self.vars.add_sink(Box::new(sink))
    }

    pub fn remove_var_sink(&mut self, id: CVarSinkId) -> bool {
        self.vars.remove_sink(id)
    }

    // ---- commands --------------------------------------------------------

    /// Add a command; native handlers go into `handlers`.
    ///
    /// A duplicate name is reported and rejected, keeping the existing one.
    pub fn add_command(&mut self, command: ConCommand, handlers: &mut CommandHandlers) -> bool {
        let (meta, handler) = command.split();
        let name = meta.name.clone();
        if !self.commands.add(meta) {
            self.error(&format!(
                "[CVARS]: [DUPLICATE] AddCommand(): console command [{}] is already registered",
                name
            ));
            return false;
        }
        if let Some(handler) = handler {
            handlers.register(name, handler);
        }
        true
    }

    pub fn remove_command(&mut self, name: &str, handlers: &mut CommandHandlers) {
        if self.commands.remove(name).is_some() {
            handlers.unregister(name);
        }
    }

    #[inline]
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn command(&self, name: &str) -> Option<&CommandMeta> {
        self.commands.get(name)
    }

    pub fn register_auto_complete(&mut self, name: &str, provider: impl ArgumentAutoComplete + 'static) {
        self.auto_complete.insert(name.to_string(), Box::new(provider));
    }

    pub fn unregister_auto_complete(&mut self, name: &str) {
        self.auto_complete.remove(name);
    }

    // ---- key binds -------------------------------------------------------

    /// Bind `command` to `key` unless the key is bound already.
    pub fn create_key_bind(&mut self, key: &str, command: &str) -> bool {
        self.binds.create(key, command)
    }

    pub fn find_key_bind(&self, key: &str) -> Option<&str> {
        self.binds.find(key)
    }

    #[inline]
    pub fn key_binds(&self) -> &KeyBinds {
        &self.binds
    }

    pub fn key_binds_mut(&mut self) -> &mut KeyBinds {
        &mut self.binds
    }

    // ---- window ----------------------------------------------------------

    /// Open or close the console. Opening is refused while
    /// `sys_DeactivateConsole` is set.
    pub fn show_console(&mut self, show: bool) {
        let deactivated = self
            .vars
            .get("sys_DeactivateConsole")
            .is_some_and(|v| v.get_i32() != 0);
        let show = show && !deactivated;

        if show != self.active {
            self.active = show;
            self.toggles.push(show);
        }
        if show {
            self.buffer.scroll_to_bottom();
        }
    }

    /// Whether the console is open.
    #[inline]
    pub fn status(&self) -> bool {
        self.active
    }

    pub fn enable_activation_key(&mut self, enable: bool) {
        self.activation_key_enabled = enable;
    }

    #[inline]
    pub fn activation_key_enabled(&self) -> bool {
        self.activation_key_enabled
    }

    /// The toggle key was pressed this frame; the edit line is cleared on the
    /// next update so the key's character does not stay in it.
    pub fn set_console_key_pressed(&mut self) {
        self.console_key_pressed = true;
    }

    pub(crate) fn take_console_key_pressed(&mut self) -> bool {
        std::mem::take(&mut self.console_key_pressed)
    }

    /// Clear the scrollback.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.clear_requested = true;
    }

    // ---- output ----------------------------------------------------------

    pub fn add_line(&mut self, text: &str) {
        self.add_line_level(text, ConsoleOutputLevel::Info);
    }

    pub fn add_line_level(&mut self, text: &str, level: ConsoleOutputLevel) {
        let capacity = self.line_buffer_size();
        self.buffer.add_line(text, level, capacity);
    }

    /// Append to the last line.
    pub fn add_line_plus(&mut self, text: &str) {
        self.buffer.add_line_plus(text);
    }

    pub fn lines(&self) -> impl DoubleEndedIterator<Item = &ConsoleLine> {
        self.buffer.iter()
    }

    /// Line `n` counted from the newest (0).
    pub fn get_line_no(&self, n: usize) -> Option<&ConsoleLine> {
        self.buffer.get_line_no(n)
    }

    #[inline]
    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut LineBuffer {
        &mut self.buffer
    }

    pub fn add_output_sink(&mut self, sink: impl OutputPrintSink + 'static) -> OutputSinkId {
        self.buffer.add_sink(Box::new(sink))
    }

    pub fn remove_output_sink(&mut self, id: OutputSinkId) -> bool {
        self.buffer.remove_sink(id)
    }

    pub(crate) fn response(&mut self, text: &str) {
        self.add_line_level(text, ConsoleOutputLevel::Result);
    }

    pub(crate) fn warning(&mut self, text: &str) {
        warn!("{}", text);
        self.add_line_level(text, ConsoleOutputLevel::Warn);
    }

    pub(crate) fn error(&mut self, text: &str) {
        error!("{}", text);
        self.add_line_level(text, ConsoleOutputLevel::Error);
    }

    /// Move lines the registry reported into the scrollback.
    pub(crate) fn flush_notices(&mut self) {
        let capacity = self.line_buffer_size();
        for line in self.vars.take_notices() {
            self.buffer.post_line(line, capacity);
        }
    }

    // ---- display ---------------------------------------------------------

    /// Print `name = value [flags]` for a variable.
    pub fn display_var_value(&mut self, name: &str) {
        let Some(var) = self.vars.get(name) else {
            return;
        };
        let flags = var.get_flags();
        let value = if flags.contains(CVarFlags::INVISIBLE) {
            String::new()
        } else {
            var.display_value()
        };
        let line = if self.host.is_editor() {
            format!("{}={} [ {} ]", name, value, flags_string(flags))
        } else {
            format!("    {} = {} [{}]", name, value, flags_string(flags))
        };
        self.response(&line);
    }

    /// Print help text, one indented line per help line.
    pub fn display_help(&mut self, help: &str, name: &str) {
        if help.is_empty() {
            self.response(&format!("No help available for {}", name));
            return;
        }
        for line in help.split('\n') {
            self.response(&format!("    {}", line));
        }
    }

    /// List every visible variable and command whose name contains `substr`.
    pub fn find_var(&mut self, substr: &str) {
        let needle = substr.to_lowercase();
        for name in self.sorted_vars(None) {
            if !name.to_lowercase().contains(&needle) {
                continue;
            }
            if self.vars.contains(&name) {
                self.display_var_value(&name);
            } else {
                self.response(&format!("    {} (Command)", name));
            }
        }
    }

    // ---- input -----------------------------------------------------------

    pub fn add_command_to_history(&mut self, line: &str) {
        self.history.add(line);
    }

    #[inline]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Browse history; `up` goes to older entries.
    pub fn history_element(&mut self, up: bool) -> Option<&str> {
        self.history.element(up)
    }

    pub fn input_line(&self) -> &str {
        self.input.text()
    }

    pub fn cursor_pos(&self) -> usize {
        self.input.cursor()
    }

    pub fn set_input_line(&mut self, line: &str) {
        self.input.set(line);
    }

    pub fn add_input_utf8(&mut self, text: &str) {
        self.input.insert(text);
    }

    pub fn remove_input_char(&mut self, backspace: bool) {
        self.input.remove_char(backspace);
    }

    pub(crate) fn take_input_line(&mut self) -> String {
        let line = self.input.text().to_string();
        self.input.clear();
        line
    }

    // ---- deferred execution ----------------------------------------------

    #[inline]
    pub fn deferred(&self) -> &DeferredQueue {
        &self.deferred
    }

    pub fn deferred_mut(&mut self) -> &mut DeferredQueue {
        &mut self.deferred
    }

    /// Queue every line executed through `execute_string` instead of running it.
    pub fn set_deferred_execution(&mut self, deferred: bool) {
        self.deferred.set_deferred_mode(deferred);
    }

    pub fn is_deferred_execution(&self) -> bool {
        self.deferred.deferred_mode()
    }

    /// Pause the deferred queue for `frames` frames.
    pub fn set_wait_frames(&mut self, frames: i32) {
        self.deferred.set_wait_frames(frames);
    }

    /// Pause the deferred queue for `seconds` from the current frame start.
    pub fn set_wait_seconds(&mut self, seconds: f32) {
        let delay = Duration::try_from_secs_f32(seconds).unwrap_or(Duration::ZERO);
        let until = self.host.now() + delay;
        self.deferred.set_wait_until(until);
    }

    // ---- misc ------------------------------------------------------------

    /// Abort the application through the host.
    pub fn exit(&self, message: &str) {
        let message = if message.is_empty() {
            "No comments from application"
        } else {
            message
        };
        self.host.fatal(message);
    }

    /// Restricted mode: console input may only touch `RESTRICTEDMODE` entries.
    pub fn is_restricted(&self) -> bool {
        self.vars.get("con_restricted").is_some_and(|v| v.get_i32() != 0)
    }

    pub fn line_buffer_size(&self) -> usize {
        self.vars
            .get("con_line_buffer_size")
            .map_or(DEFAULT_LINE_BUFFER_SIZE, |v| v.get_i32().max(0) as usize)
    }

    pub(crate) fn take_changes(&mut self) -> Vec<ConVarChangedEvent> {
        self.vars.take_changes()
    }

    pub(crate) fn take_output(&mut self) -> Vec<ConsoleLine> {
        self.buffer.drain_outbox().collect()
    }

    pub(crate) fn take_toggles(&mut self) -> Vec<bool> {
        std::mem::take(&mut self.toggles)
    }

    pub(crate) fn take_clear_requested(&mut self) -> bool {
        std::mem::take(&mut self.clear_requested)
    }
}
