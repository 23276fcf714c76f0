//! Terminal console example for dedicated servers.
//!
//! Run with: `cargo run --example terminal --no-default-features --features terminal`
//!
//! Try:
//! - `help` - list commands and variables
//! - `sv_maxplayers 16` - set a variable
//! - `status` - show the server state
//! - `DumpVars` - write consolevars.txt

use bevy::prelude::*;
use bevy_xconsole::prelude::*;
use bevy_xconsole::TerminalConfig;

fn main() {
    println!("=== Terminal Console Example ===");
    println!("Type commands and press Enter.");

    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins(ConsolePlugin {
            dev_mode: false,
            editor: false,
        })
        .insert_resource(TerminalConfig {
            colored: true,
            echo_commands: false,
        })
        .add_systems(Startup, setup)
        .run();
}

fn setup(mut console: Console) {
    console.register(
        CVar::new("sv_maxplayers", 32)
            .help("Maximum number of players")
            .flags(CVarFlags::DUMPTODISK),
    );
    console.register(CVar::new("sv_hostname", "My Server").help("Server name"));
    console.register(CVar::new("sv_cheats_demo", 0).flags(CVarFlags::CHEAT));

    console.add_command(
        ConCommand::new("status", |_args, world| {
            let mut console = world.resource_mut::<ConsoleState>();
            let hostname = console.get_cvar("sv_hostname").map(|v| v.get_string()).unwrap_or_default();
            let players = console.get_cvar("sv_maxplayers").map_or(0, |v| v.get_i32());
            console.add_line(&format!("Hostname: {}", hostname));
            console.add_line(&format!("Max Players: {}", players));
        })
        .help("Show server status"),
    );
}
