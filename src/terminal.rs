//! stdin/stdout console for dedicated servers.
//!
//! Lines read from stdin are executed as if typed into the console; console
//! output is printed to stdout.

use std::io::{self, BufRead, Write};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use bevy::prelude::*;

use crate::core::{ConsoleInputEvent, ConsoleOutputEvent, ConsoleOutputLevel};

pub struct TerminalPlugin;

impl Plugin for TerminalPlugin {
    fn build(&self, app: &mut App) {
        let (sender, receiver) = mpsc::channel();
        let _handle = spawn_stdin_reader(sender);

        app.insert_resource(StdinReceiver(Mutex::new(receiver)))
            .init_resource::<TerminalConfig>()
            .add_systems(Update, read_stdin.before(crate::ConsoleSet::Input))
            .add_systems(Update, write_stdout.after(crate::ConsoleSet::Output));
    }
}

#[derive(Resource)]
pub struct TerminalConfig {
    /// ANSI colors per output level.
    pub colored: bool,
    /// Print the executed statement echo lines.
    pub echo_commands: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            colored: false,
            echo_commands: false,
        }
    }
}

#[derive(Resource)]
struct StdinReceiver(Mutex<Receiver<String>>);

fn spawn_stdin_reader(sender: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines().map_while(Result::ok) {
            let text = line.trim().to_string();
            if !text.is_empty() && sender.send(text).is_err() {
                break;
            }
        }
    })
}

fn read_stdin(receiver: Res<StdinReceiver>, mut events: MessageWriter<ConsoleInputEvent>) {
    let Ok(rx) = receiver.0.lock() else {
        warn!("stdin receiver is poisoned");
        return;
    };
    while let Ok(line) = rx.try_recv() {
        events.write(ConsoleInputEvent::new(line));
    }
}

fn write_stdout(mut events: MessageReader<ConsoleOutputEvent>, config: Res<TerminalConfig>) {
    let mut stdout = io::stdout().lock();
    for event in events.read() {
        if event.level == ConsoleOutputLevel::Command && !config.echo_commands {
            continue;
        }
        let _ = if config.colored {
            writeln!(stdout, "{}{}\x1b[0m", ansi_color(event.level), event.message)
        } else {
            writeln!(stdout, "{}", event.message)
        };
    }
    let _ = stdout.flush();
}

fn ansi_color(level: ConsoleOutputLevel) -> &'static str {
    match level {
        ConsoleOutputLevel::Debug => "\x1b[90m",
        ConsoleOutputLevel::Info => "\x1b[0m",
        ConsoleOutputLevel::Warn => "\x1b[33m",
        ConsoleOutputLevel::Error => "\x1b[31m",
        ConsoleOutputLevel::Command => "\x1b[36m",
        ConsoleOutputLevel::Result => "\x1b[32m",
    }
}
