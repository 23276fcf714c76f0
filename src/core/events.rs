//! Console messages for communication between layers.
//!
//! - UI -> Core: input lines
//! - Core -> UI: output lines, open/close and clear requests
//! - Core -> Systems: variable changes

use bevy::prelude::*;

use super::ConsoleLine;

/// A line of input for the console to execute.
///
/// # Examples
///
/// ```ignore
/// fn load_level(mut input: MessageWriter<ConsoleInputEvent>) {
///     input.write(ConsoleInputEvent::new("map dust; wait_frames 1; r_fov 90").deferred());
/// }
/// ```
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct ConsoleInputEvent {
    /// The line to execute. May hold several `;`-separated statements.
    pub command: String,
    /// Typed into the console by the user (subject to restricted mode and
    /// recorded in history).
    pub from_console: bool,
    /// Queue for the per-frame drain instead of executing now.
    pub deferred: bool,
    /// Suppress echo and value display.
    pub silent: bool,
}

impl ConsoleInputEvent {
    /// Input typed by the user.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            from_console: true,
            deferred: false,
            silent: false,
        }
    }

    /// Input from the application rather than the user.
    pub fn script(command: impl Into<String>) -> Self {
        Self {
            from_console: false,
            ..Self::new(command)
        }
    }

    pub fn deferred(mut self) -> Self {
        self.from_console = false;
        self.deferred = true;
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// A line posted to the console output.
#[derive(Message, Debug, Clone)]
pub struct ConsoleOutputEvent {
    pub message: String,
    pub level: ConsoleOutputLevel,
}

/// Kind of console output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleOutputLevel {
    /// Debug information (gray).
    Debug,
    /// General information (white).
    #[default]
    Info,
    /// Warning (yellow).
    Warn,
    /// Error (red).
    Error,
    /// Echo of an executed statement.
    Command,
    /// Response to input, such as a variable's value.
    Result,
}

impl ConsoleOutputEvent {
    pub fn new(level: ConsoleOutputLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ConsoleOutputLevel::Error, message)
    }
}

impl From<ConsoleLine> for ConsoleOutputEvent {
    fn from(line: ConsoleLine) -> Self {
        Self {
            message: line.text,
            level: line.level,
        }
    }
}

/// A variable changed value.
///
/// # Examples
///
/// ```ignore
/// fn on_fov_change(mut events: MessageReader<ConVarChangedEvent>) {
///     for event in events.read() {
///         if &*event.name == "r_fov" {
///             info!("FOV changed to {}", event.new_value);
///         }
///     }
/// }
/// ```
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct ConVarChangedEvent {
    pub name: Box<str>,
    pub old_value: String,
    pub new_value: String,
}

impl ConVarChangedEvent {
    pub fn new(name: impl Into<Box<str>>, old_value: impl Into<String>, new_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
        }
    }
}

/// The console was opened or closed.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleToggleEvent {
    pub open: bool,
}

impl ConsoleToggleEvent {
    pub fn opened() -> Self {
        Self { open: true }
    }

    pub fn closed() -> Self {
        Self { open: false }
    }
}

/// The scrollback was cleared.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct ConsoleClearEvent;

/// Registers every console message type.
pub struct ConsoleEventsPlugin;

impl Plugin for ConsoleEventsPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ConsoleInputEvent>()
            .add_message::<ConsoleOutputEvent>()
            .add_message::<ConVarChangedEvent>()
            .add_message::<ConsoleToggleEvent>()
            .add_message::<ConsoleClearEvent>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_input_event() {
        let event = ConsoleInputEvent::new("r_fov 90");
        assert_eq!(event.command, "r_fov 90");
        assert!(event.from_console);
        assert!(!event.deferred);

        let queued = ConsoleInputEvent::new("map dust").deferred().silent();
        assert!(!queued.from_console);
        assert!(queued.deferred);
        assert!(queued.silent);

        assert!(!ConsoleInputEvent::script("r_fov 90").from_console);
    }

    #[test]
    fn test_output_from_line() {
        let event = ConsoleOutputEvent::from(ConsoleLine::new(ConsoleOutputLevel::Error, "bad"));
        assert_eq!(event.level, ConsoleOutputLevel::Error);
        assert_eq!(event.message, "bad");
    }

    #[test]
    fn test_convar_changed_event() {
        let event = ConVarChangedEvent::new("r_fov", "60", "90");
        assert_eq!(&*event.name, "r_fov");
        assert_eq!(event.old_value, "60");
        assert_eq!(event.new_value, "90");
    }
}
