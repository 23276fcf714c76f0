//! Log capture into the console scrollback through a custom
//! [LogPlugin](bevy::log::LogPlugin) layer.

use bevy::log::{BoxedLayer, Level};
use bevy::prelude::*;
use std::sync::mpsc;
use std::time::SystemTime;
use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::field::Visit;

use crate::core::{ConsoleOutputLevel, ConsoleState};

/// Log target of this crate. The console already holds its own messages, so
/// they are not captured a second time.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Install with [`LogPlugin::custom_layer`](bevy::log::LogPlugin::custom_layer)
/// to mirror log events into the console.
pub fn custom_log_layer(app: &mut App) -> Option<BoxedLayer> {
    Some(Box::new(create_custom_log_layer(app)))
}

fn create_custom_log_layer(app: &mut App) -> LogCaptureLayer {
    let (sender, receiver) = mpsc::channel();
    app.add_message::<LogMessage>();
    app.insert_non_send_resource(CapturedLogEvents(receiver));
    app.add_systems(PostUpdate, transfer_log_events);

    LogCaptureLayer { sender }
}

/// A captured log event.
#[derive(Message, Debug, Clone)]
pub struct LogMessage {
    pub message: String,
    pub name: &'static str,
    /// Module path style target, e.g. `my_game::net`.
    pub target: &'static str,
    pub level: Level,
    pub module_path: Option<&'static str>,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
    pub time: SystemTime,
}

impl LogMessage {
    fn is_own(&self) -> bool {
        self.target == OWN_TARGET || self.target.strip_prefix(OWN_TARGET).is_some_and(|rest| rest.starts_with("::"))
    }
}

/// Scrollback level of a log level.
pub fn output_level(level: Level) -> ConsoleOutputLevel {
    match level {
        Level::ERROR => ConsoleOutputLevel::Error,
        Level::WARN => ConsoleOutputLevel::Warn,
        Level::INFO => ConsoleOutputLevel::Info,
        Level::DEBUG | Level::TRACE => ConsoleOutputLevel::Debug,
    }
}

fn transfer_log_events(receiver: NonSend<CapturedLogEvents>, mut log_events: MessageWriter<LogMessage>) {
    for msg in receiver.0.try_iter() {
        log_events.write(msg);
    }
}

/// Append captured log events to the console scrollback.
pub(crate) fn forward_logs_to_console(
    logs: Option<MessageReader<LogMessage>>,
    console: Option<ResMut<ConsoleState>>,
) {
    let (Some(mut logs), Some(mut console)) = (logs, console) else {
        return;
    };
    for log in logs.read().filter(|log| !log.is_own()) {
        console.add_line_level(&log.message, output_level(log.level));
    }
}

struct CapturedLogEvents(mpsc::Receiver<LogMessage>);

struct LogCaptureLayer {
    sender: mpsc::Sender<LogMessage>,
}

impl<S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>> Layer<S> for LogCaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut message = None;
        event.record(&mut LogEventVisitor(&mut message));
        if let Some(message) = message {
            let metadata = event.metadata();
            let _ = self.sender.send(LogMessage {
                message,
                name: metadata.name(),
                target: metadata.target(),
                level: *metadata.level(),
                module_path: metadata.module_path(),
                file: metadata.file(),
                line: metadata.line(),
                time: SystemTime::now(),
            });
        }
    }
}

struct LogEventVisitor<'a>(&'a mut Option<String>);

impl Visit for LogEventVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = Some(format!("{value:?}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DefaultHost;

    fn log(target: &'static str, level: Level, message: &str) -> LogMessage {
        LogMessage {
            message: message.to_string(),
            name: "event",
            target,
            level,
            module_path: None,
            file: None,
            line: None,
            time: SystemTime::now(),
        }
    }

    #[test]
    fn test_own_target() {
        assert!(log(OWN_TARGET, Level::INFO, "").is_own());
        assert!(log("bevy_xconsole::core::state", Level::INFO, "").is_own());
        assert!(!log("bevy_xconsole_ext", Level::INFO, "").is_own());
        assert!(!log("my_game", Level::INFO, "").is_own());
    }

    #[test]
    fn test_forward_skips_own_messages() {
        let mut app = App::new();
        app.add_message::<LogMessage>()
            .insert_resource(ConsoleState::new(DefaultHost::new(false, false)))
            .add_systems(Update, forward_logs_to_console);

        app.world_mut().write_message(log("my_game", Level::WARN, "low ammo"));
        app.world_mut().write_message(log("bevy_xconsole::core", Level::WARN, "already shown"));
        app.update();

        let console = app.world().resource::<ConsoleState>();
        let line = console.get_line_no(0).unwrap();
        assert_eq!(line.text, "low ammo");
        assert_eq!(line.level, ConsoleOutputLevel::Warn);
        assert!(!console.lines().any(|l| l.text == "already shown"));
    }
}
