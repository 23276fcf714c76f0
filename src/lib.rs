//! A CryEngine-style developer console for Bevy.
//!
//! - **CVar**: typed console variables (int, int64, float, string) with
//!   protection flags, change callbacks and default-value groups
//! - **ConCommand**: native commands and script commands with `%1`..`%9`
//!   argument templates
//! - **Deferred execution**: a per-frame queue with `wait_frames`,
//!   `wait_seconds` and `BLOCKFRAME` entries
//! - **Cheat protection**: cheat variables are locked outside dev mode and
//!   hashed so tampering can be detected
//! - **Console**: system parameter for registering and querying from systems
//!
//! # Features
//!
//! - `egui` (default): egui console window, with log capture
//! - `log-capture`: mirror log events into the console scrollback
//! - `terminal`: stdin/stdout backend for dedicated servers
//! - `persist`: RON persistence of `DUMPTODISK` variables (`host_writeconfig`)
//! - `full`: Enable egui + persist
//!
//! # Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_xconsole::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(ConsolePlugin::default())
//!         .add_systems(Startup, setup_console)
//!         .run();
//! }
//!
//! fn setup_console(mut console: Console) {
//!     console.register(CVar::new("g_gravity", -9.8f32)
//!         .help("World gravity")
//!         .flags(CVarFlags::CHEAT));
//!
//!     console.add_command(ConCommand::new("noclip", |_, world| {
//!         info!("Noclip toggled!");
//!     }).help("Toggle noclip mode"));
//!
//!     console.add_command(ConCommand::script("fov", "r_fov %1; echo fov is now %1"));
//!
//!     let gravity = console.get_f32("g_gravity");
//!     console.set("g_gravity", "-4");
//! }
//! ```

use bevy::prelude::*;

pub mod core;

pub use core::{
    CVar, CVarFlags, CVarGroup, CVarRegistry, CVarType, CVarValue, CommandArgs, CommandHandler, CommandHandlers,
    CommandMeta, ConCommand, ConVarChangedEvent, Console, ConsoleClearEvent, ConsoleEventsPlugin, ConsoleHost,
    ConsoleInputEvent, ConsoleKey, ConsoleLine, ConsoleOutputEvent, ConsoleOutputLevel, ConsoleRef, ConsoleState,
    ConsoleToggleEvent, ConsoleWorldExt, DefaultHost, FrameClock, KeyModifiers, SetOutcome, split_commands,
    tokenize,
};

pub mod builtins;
pub mod keyboard;

#[cfg(feature = "egui")]
pub mod config;
#[cfg(feature = "log-capture")]
pub mod logging;
#[cfg(feature = "egui")]
pub mod ui;

#[cfg(feature = "terminal")]
pub mod terminal;

#[cfg(feature = "persist")]
pub mod persist;

pub use builtins::DumpDirectory;
pub use keyboard::ConsoleKeyboard;

#[cfg(feature = "egui")]
pub use config::{ConsoleConfig, ConsoleTheme};

#[cfg(feature = "persist")]
pub use persist::{ConfigError, ConfigPath, SavedVars};

#[cfg(feature = "terminal")]
pub use terminal::{TerminalConfig, TerminalPlugin};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::core::{
        CVar, CVarFlags, CommandArgs, ConCommand, ConVarChangedEvent, Console, ConsoleInputEvent,
        ConsoleOutputEvent, ConsoleOutputLevel, ConsoleRef, ConsoleState, ConsoleWorldExt, SetOutcome,
    };
    pub use crate::{ConsolePlugin, ConsoleSet};
}

/// Ordering of the console's `Update` work.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleSet {
    /// Input messages and key presses are collected.
    Input,
    /// Input is executed and the deferred queue drained.
    Execute,
    /// Output, variable change, toggle and clear messages are written.
    Output,
}

/// Main console plugin.
///
/// A [`ConsoleState`] inserted before the plugin is kept, which is how a
/// custom [`ConsoleHost`] is installed:
///
/// ```ignore
/// app.insert_resource(ConsoleState::new(MyHost::new()))
///     .add_plugins(ConsolePlugin::default());
/// ```
pub struct ConsolePlugin {
    /// Cheat variables and commands may be used.
    pub dev_mode: bool,
    /// Running inside an editor; cheat commands are always allowed.
    pub editor: bool,
}

impl Default for ConsolePlugin {
    fn default() -> Self {
        Self {
            dev_mode: cfg!(debug_assertions),
            editor: false,
        }
    }
}

impl Plugin for ConsolePlugin {
    fn build(&self, app: &mut App) {
        let clock = FrameClock::new();
        let world = app.world_mut();
        let mut console = world.remove_resource::<ConsoleState>().unwrap_or_else(|| {
            ConsoleState::new(DefaultHost::new(self.dev_mode, self.editor).with_clock(clock.clone()))
        });
        let mut handlers = world.remove_resource::<CommandHandlers>().unwrap_or_default();
        builtins::register_builtin_commands(&mut console, &mut handlers);

        app.insert_resource(console)
            .insert_resource(handlers)
            .insert_resource(clock)
            .init_resource::<PendingInput>()
            .init_resource::<keyboard::PendingKeys>()
            .init_resource::<ConsoleKeyboard>()
            .init_resource::<DumpDirectory>()
            .add_plugins(core::ConsoleEventsPlugin);

        // Three-stage pipeline:
        // 1. collect input messages and key presses
        // 2. execute them with exclusive World access, then drain the deferred queue
        // 3. send the resulting messages
        app.configure_sets(
            Update,
            (ConsoleSet::Input, ConsoleSet::Execute, ConsoleSet::Output).chain(),
        )
        .add_systems(
            Update,
            (sync_host_clock, read_console_input, keyboard::read_keyboard).in_set(ConsoleSet::Input),
        )
        .add_systems(Update, update_console.in_set(ConsoleSet::Execute))
        .add_systems(Update, send_console_outputs.in_set(ConsoleSet::Output));

        #[cfg(feature = "log-capture")]
        app.add_systems(Update, logging::forward_logs_to_console.in_set(ConsoleSet::Input));

        #[cfg(feature = "persist")]
        {
            app.init_resource::<persist::ConfigPath>()
                .add_systems(PreStartup, persist::load_config_on_startup);
        }

        #[cfg(feature = "egui")]
        {
            use bevy_egui::EguiPrimaryContextPass;
            use config::ConsoleConfig;
            use ui::ConsoleUiState;

            app.insert_resource(ConsoleKeyboard { edit_line: false })
                .init_resource::<ConsoleUiState>()
                .init_resource::<ConsoleConfig>()
                .init_resource::<ui::AutoCompletions>()
                .register_type::<ConsoleConfig>()
                .add_systems(
                    Update,
                    (ui::reset_on_open, ui::update_completions)
                        .chain()
                        .after(ConsoleSet::Output),
                )
                .add_systems(EguiPrimaryContextPass, ui::render_ui_system.run_if(ui::console_open));
        }

        #[cfg(feature = "terminal")]
        {
            app.add_plugins(terminal::TerminalPlugin);
        }
    }
}

/// Input messages read this frame.
#[derive(Resource, Default)]
struct PendingInput(Vec<ConsoleInputEvent>);

/// Keep the host clock at the app's real elapsed time.
fn sync_host_clock(clock: Res<FrameClock>, time: Option<Res<Time<Real>>>) {
    if let Some(time) = time {
        clock.set(time.elapsed());
    }
}

fn read_console_input(mut input_events: MessageReader<ConsoleInputEvent>, mut pending: ResMut<PendingInput>) {
    pending.0.extend(input_events.read().cloned());
}

/// Exclusive system that executes pending input and runs the per-frame update.
fn update_console(world: &mut World) {
    let inputs = std::mem::take(&mut world.resource_mut::<PendingInput>().0);

    for input in inputs {
        if input.from_console && !input.deferred {
            world
                .resource_mut::<ConsoleState>()
                .add_command_to_history(&input.command);
            core::execute_string_internal(world, &input.command, true, input.silent);
        } else {
            core::execute_string(world, &input.command, input.silent, input.deferred);
        }
    }

    keyboard::apply_pending_keys(world);
    core::interpreter::update(world);
}

fn send_console_outputs(
    mut console: ResMut<ConsoleState>,
    mut output_events: MessageWriter<ConsoleOutputEvent>,
    mut change_events: MessageWriter<ConVarChangedEvent>,
    mut toggle_events: MessageWriter<ConsoleToggleEvent>,
    mut clear_events: MessageWriter<ConsoleClearEvent>,
) {
    for line in console.take_output() {
        output_events.write(line.into());
    }
    for change in console.take_changes() {
        change_events.write(change);
    }
    for open in console.take_toggles() {
        toggle_events.write(ConsoleToggleEvent { open });
    }
    if console.take_clear_requested() {
        clear_events.write(ConsoleClearEvent);
    }
}
