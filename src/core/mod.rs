//! Core console engine with zero optional dependencies.
//!
//! - [`ConsoleState`] - the console resource: variables, commands, deferred
//!   queue, scrollback, history, edit line, key binds and cheat hash
//! - [`CVar`] / [`CVarRegistry`] - typed variables behind a protection gate
//! - [`ConCommand`] - native and script commands
//! - [`interpreter`] - line execution against the `World`
//! - [`Console`] / [`ConsoleRef`] - system parameters for ordinary systems
//! - Messages for communication between layers

mod binds;
mod buffer;
mod cheat_hash;
mod command;
mod completion;
mod console;
mod cvar;
mod deferred;
mod dump;
mod events;
mod groups;
mod history;
mod host;
mod input;
pub mod interpreter;
mod registry;
mod state;
mod tokenizer;

pub use binds::{KeyBinds, KeyModifiers, bind_name};
pub use buffer::{ConsoleLine, LineBuffer, OutputPrintSink, OutputSinkId};
pub use cheat_hash::CheatHash;
pub use command::{
    CommandArgs, CommandHandler, CommandHandlers, CommandMeta, CommandRegistry, ConCommand, TemplateError,
    expand_template,
};
pub use completion::{ArgumentAutoComplete, TabCompletion};
pub use console::{Console, ConsoleRef, ConsoleWorldExt};
pub use cvar::{CVar, CVarFlags, CVarType, CVarValue, alpha_bits64, bits_alpha64, flags_string};
pub use deferred::{DeferredCommand, DeferredQueue};
pub use dump::{COMMANDS_AND_VARS_FILE, DumpError, VARS_FILE};
pub use events::{
    ConVarChangedEvent, ConsoleClearEvent, ConsoleEventsPlugin, ConsoleInputEvent, ConsoleOutputEvent,
    ConsoleOutputLevel, ConsoleToggleEvent,
};
pub use groups::{CVarGroup, GroupError, is_group_name};
pub use history::History;
pub use host::{AccessMode, ConsoleHost, DefaultHost, FrameClock};
pub use input::{ConsoleKey, InputLine, on_text_input, process_key};
pub use interpreter::{
    MAX_SCRIPT_DEPTH, execute_command, execute_console_command, execute_deferred_commands, execute_input_buffer,
    execute_string, execute_string_internal,
};
pub use registry::{CVarRegistry, CVarSink, CVarSinkId, SetOutcome};
pub use state::ConsoleState;
pub use tokenizer::{
    StatementHead, TokenizedCommand, split_commands, statement_head, strip_value, tokenize, tokenize_string,
};
