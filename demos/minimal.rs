//! Minimal headless console example.
//!
//! Drives the console with input messages and prints what it answers.
//!
//! Run with: `cargo run --example minimal --no-default-features`

use bevy::prelude::*;
use bevy_xconsole::prelude::*;

fn main() {
    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins(ConsolePlugin::default())
        .add_systems(Startup, setup)
        .add_systems(Update, print_outputs.after(ConsoleSet::Output))
        .add_systems(Update, send_test_commands.run_if(run_once))
        .run();
}

fn setup(mut console: Console) {
    console.register(CVar::new("g_gravity", -9.8f32).help("World gravity"));

    console.add_command(
        ConCommand::new("greet", |args, world| {
            let name = args.get_or(0, "World").to_string();
            world.resource_mut::<ConsoleState>().add_line(&format!("Hello, {}!", name));
        })
        .help("Greet someone\ngreet [name]"),
    );

    // Script command: %1 is replaced by the first argument.
    console.add_command(ConCommand::script("heavy", "g_gravity %1; echo gravity set to %1"));

    // Open so statements are echoed.
    console.show(true);
}

fn send_test_commands(mut events: MessageWriter<ConsoleInputEvent>) {
    events.write(ConsoleInputEvent::new("g_gravity"));
    events.write(ConsoleInputEvent::new("g_gravity -20"));
    events.write(ConsoleInputEvent::new("greet Developer"));
    events.write(ConsoleInputEvent::new("heavy -30"));
    events.write(ConsoleInputEvent::new("g_gravity ?"));
    events.write(ConsoleInputEvent::new("?grav"));

    // Runs over the next frames: the second echo waits two frames.
    events.write(ConsoleInputEvent::script("echo first").deferred());
    events.write(ConsoleInputEvent::script("wait_frames 2").deferred());
    events.write(ConsoleInputEvent::script("echo after two frames").deferred());
}

fn print_outputs(mut events: MessageReader<ConsoleOutputEvent>) {
    for event in events.read() {
        let prefix = match event.level {
            ConsoleOutputLevel::Debug => "[DEBUG]",
            ConsoleOutputLevel::Info => "[INFO]",
            ConsoleOutputLevel::Warn => "[WARN]",
            ConsoleOutputLevel::Error => "[ERROR]",
            ConsoleOutputLevel::Command => "]",
            ConsoleOutputLevel::Result => "[>]",
        };
        println!("{} {}", prefix, event.message);
    }
}
