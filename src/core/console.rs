//! System parameters and `World` helpers for the console.
//!
//! The [`Console`] system parameter combines [`ConsoleState`] and
//! [`CommandHandlers`] so that commands can be added from ordinary systems.
//! Executing input needs the whole `World`; from a system, queue it with
//! [`Console::queue`] or send a `ConsoleInputEvent`.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use super::interpreter::{execute_command, execute_string};
use super::{CVar, CommandHandlers, CommandMeta, ConCommand, ConsoleState, SetOutcome};

/// Console system parameter.
///
/// # Examples
///
/// ```ignore
/// fn setup_console(mut console: Console) {
///     console.register(CVar::new("g_gravity", -9.8f32).flags(CVarFlags::CHEAT).help("World gravity"));
///     console.add_command(
///         ConCommand::new("noclip", |_, world| {
///             world.resource_mut::<Player>().noclip ^= true;
///         })
///         .help("Toggle noclip"),
///     );
///
///     let gravity = console.get_f32("g_gravity");
///     console.set("g_gravity", "-4");
/// }
/// ```
#[derive(SystemParam)]
pub struct Console<'w> {
    state: ResMut<'w, ConsoleState>,
    handlers: ResMut<'w, CommandHandlers>,
}

impl Console<'_> {
    /// Register a variable. On a duplicate name the existing one is returned.
    pub fn register(&mut self, cvar: CVar) -> &CVar {
        self.state.register(cvar)
    }

    /// Add a command. Returns false, keeping the existing one, on a duplicate name.
    pub fn add_command(&mut self, command: ConCommand) -> bool {
        self.state.add_command(command, &mut self.handlers)
    }

    pub fn remove_command(&mut self, name: &str) {
        self.state.remove_command(name, &mut self.handlers);
    }

    pub fn get_cvar(&self, name: &str) -> Option<&CVar> {
        self.state.get_cvar(name)
    }

    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.state.get_cvar(name).map(CVar::get_i32)
    }

    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.state.get_cvar(name).map(CVar::get_f32)
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.state.get_cvar(name).map(CVar::get_string)
    }

    /// Set a variable from text through the protection gate.
    pub fn set(&mut self, name: &str, value: &str) -> SetOutcome {
        self.state.set_cvar(name, value)
    }

    pub fn command(&self, name: &str) -> Option<&CommandMeta> {
        self.state.command(name)
    }

    /// Queue a line for the next deferred drain.
    pub fn queue(&mut self, line: &str, silent: bool) {
        self.state.deferred_mut().push(line, silent);
    }

    pub fn show(&mut self, show: bool) {
        self.state.show_console(show);
    }

    pub fn is_open(&self) -> bool {
        self.state.status()
    }

    pub fn add_line(&mut self, text: &str) {
        self.state.add_line(text);
    }

    pub fn state(&self) -> &ConsoleState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ConsoleState {
        &mut self.state
    }
}

/// Read-only console system parameter.
#[derive(SystemParam)]
pub struct ConsoleRef<'w> {
    state: Res<'w, ConsoleState>,
}

impl ConsoleRef<'_> {
    pub fn get_cvar(&self, name: &str) -> Option<&CVar> {
        self.state.get_cvar(name)
    }

    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.state.get_cvar(name).map(CVar::get_i32)
    }

    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.state.get_cvar(name).map(CVar::get_f32)
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.state.get_cvar(name).map(CVar::get_string)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.vars().contains(name) || self.state.commands().contains(name)
    }

    pub fn is_open(&self) -> bool {
        self.state.status()
    }

    pub fn state(&self) -> &ConsoleState {
        &self.state
    }
}

/// Console access for code holding the `World`, such as exclusive systems and
/// command handlers.
pub trait ConsoleWorldExt {
    /// Add a command. Returns false on a duplicate name.
    fn add_console_command(&mut self, command: ConCommand) -> bool;

    fn remove_console_command(&mut self, name: &str);

    /// Execute a line now as application input.
    fn execute_console_string(&mut self, line: &str, silent: bool);

    /// Queue a line for the deferred drain.
    fn defer_console_string(&mut self, line: &str, silent: bool);

    /// Run a command, bypassing restricted mode. `ignore_dev_mode` lets cheat
    /// commands run outside dev mode.
    fn execute_console_command(&mut self, statement: &str, ignore_dev_mode: bool) -> bool;
}

impl ConsoleWorldExt for World {
    fn add_console_command(&mut self, command: ConCommand) -> bool {
        self.resource_scope(|world, mut handlers: Mut<CommandHandlers>| {
            world.resource_mut::<ConsoleState>().add_command(command, &mut handlers)
        })
    }

    fn remove_console_command(&mut self, name: &str) {
        self.resource_scope(|world, mut handlers: Mut<CommandHandlers>| {
            world.resource_mut::<ConsoleState>().remove_command(name, &mut handlers);
        });
    }

    fn execute_console_string(&mut self, line: &str, silent: bool) {
        execute_string(self, line, silent, false);
    }

    fn defer_console_string(&mut self, line: &str, silent: bool) {
        execute_string(self, line, silent, true);
    }

    fn execute_console_command(&mut self, statement: &str, ignore_dev_mode: bool) -> bool {
        execute_command(self, statement, ignore_dev_mode)
    }
}
