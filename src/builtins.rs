//! Built-in console commands.

use std::path::PathBuf;

use bevy::prelude::*;

use crate::core::{
    CVarFlags, CommandArgs, CommandHandlers, ConCommand, ConsoleState, execute_string,
};

/// Directory the `DumpCommandsVars` and `DumpVars` commands write into.
#[derive(Resource, Debug, Clone)]
pub struct DumpDirectory(pub PathBuf);

impl Default for DumpDirectory {
    fn default() -> Self {
        Self(PathBuf::from("."))
    }
}

fn dump_dir(world: &World) -> PathBuf {
    world
        .get_resource::<DumpDirectory>()
        .map_or_else(|| PathBuf::from("."), |dir| dir.0.clone())
}

fn add(console: &mut ConsoleState, handlers: &mut CommandHandlers, command: ConCommand) {
    console.add_command(command, handlers);
}

/// Register the built-in commands.
pub fn register_builtin_commands(console: &mut ConsoleState, handlers: &mut CommandHandlers) {
    add(
        console,
        handlers,
        ConCommand::new("ConsoleShow", |_, world| {
            world.resource_mut::<ConsoleState>().show_console(true);
        })
        .help("Opens the console"),
    );

    add(
        console,
        handlers,
        ConCommand::new("ConsoleHide", |_, world| {
            world.resource_mut::<ConsoleState>().show_console(false);
        })
        .help("Closes the console"),
    );

    add(
        console,
        handlers,
        ConCommand::new("DumpCommandsVars", |args, world| {
            let dir = dump_dir(world);
            let mut console = world.resource_mut::<ConsoleState>();
            if let Err(err) = console.dump_commands_vars(dir, args.get_or(0, "")) {
                console.error(&err.to_string());
            }
        })
        .help("This console command dumps all console variables and commands to disk\nDumpCommandsVars [prefix]"),
    );

    add(
        console,
        handlers,
        ConCommand::new("DumpVars", |args, world| {
            let dir = dump_dir(world);
            let include_cheat = args.parse::<i32>(0) == Some(1);
            let mut console = world.resource_mut::<ConsoleState>();
            if let Err(err) = console.dump_vars(dir, include_cheat) {
                console.error(&err.to_string());
            }
        })
        .help("This console command dumps all console variables to disk\nDumpVars [IncludeCheatCvars]"),
    );

    add(
        console,
        handlers,
        ConCommand::new("audit_cvars", |args, world| {
            world.resource_mut::<ConsoleState>().audit_cvars(args.iter());
        })
        .help("Logs all console commands and cvars"),
    );

    add(
        console,
        handlers,
        ConCommand::new("Bind", |args, world| {
            if args.len() < 2 {
                return;
            }
            let command: String = args.iter().skip(1).map(|arg| format!("{} ", arg)).collect();
            world.resource_mut::<ConsoleState>().create_key_bind(args.get_or(0, ""), &command);
        }),
    );

    add(
        console,
        handlers,
        ConCommand::new("wait_seconds", |args, world| {
            if !args.is_empty() {
                let seconds = args.parse_or::<f32>(0, 0.0);
                world.resource_mut::<ConsoleState>().set_wait_seconds(seconds);
            }
        })
        .flags(CVarFlags::BLOCKFRAME)
        .help(
            "Forces the console to wait for a given number of seconds before the next deferred command is processed\n\
             Works only in deferred command mode",
        ),
    );

    add(
        console,
        handlers,
        ConCommand::new("wait_frames", |args, world| {
            if !args.is_empty() {
                let frames = args.parse_or::<i32>(0, 0);
                world.resource_mut::<ConsoleState>().set_wait_frames(frames);
            }
        })
        .flags(CVarFlags::BLOCKFRAME)
        .help(
            "Forces the console to wait for a given number of frames before the next deferred command is processed\n\
             Works only in deferred command mode",
        ),
    );

    add(
        console,
        handlers,
        ConCommand::new("resetcvars", |_, world| {
            world.resource_mut::<ConsoleState>().reset_cvars_to_defaults();
        })
        .help("Resets all cvars to their initial values"),
    );

    add(
        console,
        handlers,
        ConCommand::new("exec", exec).help("Executes a console script file, one line at a time\nexec <file>"),
    );

    add(
        console,
        handlers,
        ConCommand::new("help", help).help("Show help for a command or variable, or list all commands\nhelp [name]"),
    );

    add(
        console,
        handlers,
        ConCommand::new("echo", |args, world| {
            world.resource_mut::<ConsoleState>().add_line(&args.join(" "));
        })
        .flags(CVarFlags::RESTRICTEDMODE)
        .help("Print text to the console"),
    );

    add(
        console,
        handlers,
        ConCommand::new("clear", |_, world| {
            world.resource_mut::<ConsoleState>().clear();
        })
        .flags(CVarFlags::RESTRICTEDMODE)
        .help("Clear the console output"),
    );

    add(
        console,
        handlers,
        ConCommand::new("DumpAllAnticheatVars", |_, world| {
            print_cheat_vars(&mut world.resource_mut::<ConsoleState>(), "DumpAllAnticheatVars", false);
        })
        .help("Lists every variable that takes part in the cheat hash"),
    );

    add(
        console,
        handlers,
        ConCommand::new("DumpLastHashedAnticheatVars", |_, world| {
            print_cheat_vars(&mut world.resource_mut::<ConsoleState>(), "DumpLastHashedAnticheatVars", true);
        })
        .help("Lists the variables covered by the last cheat hash"),
    );

    #[cfg(feature = "persist")]
    add(console, handlers, crate::persist::host_writeconfig_command());
}

fn exec(args: &CommandArgs, world: &mut World) {
    let Some(file) = args.get(0) else {
        world.resource_mut::<ConsoleState>().warning("Usage: exec <file>");
        return;
    };

    let contents = match std::fs::read_to_string(file) {
        Ok(contents) => contents,
        Err(err) => {
            world
                .resource_mut::<ConsoleState>()
                .error(&format!("Failed to read '{}': {}", file, err));
            return;
        }
    };

    info!("Executing '{}'", file);
    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("--") || line.starts_with("//") {
            continue;
        }
        execute_string(world, line, true, false);
    }
}

fn help(args: &CommandArgs, world: &mut World) {
    let mut console = world.resource_mut::<ConsoleState>();

    let Some(name) = args.get(0) else {
        let names: Vec<String> = console
            .commands()
            .iter()
            .filter(|(_, meta)| !meta.flags.contains(CVarFlags::INVISIBLE))
            .map(|(name, _)| format!("    {}", name))
            .collect();
        console.response("Commands:");
        for line in names {
            console.response(&line);
        }
        console.response("Use 'help <name>' for details or '?<text>' to search");
        return;
    };

    if let Some(help) = console.vars().get(name).map(|var| var.get_help().to_string()) {
        console.display_help(&help, name);
        console.display_var_value(name);
    } else if let Some(help) = console.command(name).map(|meta| meta.help.clone()) {
        console.display_help(&help, name);
    } else {
        console.warning(&format!("Unknown command or variable: {}", name));
    }
}

fn print_cheat_vars(console: &mut ConsoleState, command: &str, use_last_range: bool) {
    match console.cheat_vars_listing(use_last_range) {
        Some(lines) => {
            for line in lines {
                console.response(&line);
            }
        }
        None => console.response(&format!(
            "{} - cannot complete, cheat vars are in a state of flux, please retry.",
            command
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::core::{CVar, ConsoleWorldExt, DefaultHost, execute_console_command, execute_deferred_commands};

    fn world() -> World {
        let mut world = World::new();
        let mut console = ConsoleState::new(DefaultHost::new(false, false));
        let mut handlers = CommandHandlers::new();
        register_builtin_commands(&mut console, &mut handlers);
        world.insert_resource(console);
        world.insert_resource(handlers);
        world
    }

    fn console(world: &mut World) -> Mut<'_, ConsoleState> {
        world.resource_mut::<ConsoleState>()
    }

    fn last_line(world: &World) -> String {
        world
            .resource::<ConsoleState>()
            .get_line_no(0)
            .map(|l| l.text.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_show_and_hide() {
        let mut world = world();
        world.execute_console_string("ConsoleShow", true);
        assert!(console(&mut world).status());
        world.execute_console_string("ConsoleHide", true);
        assert!(!console(&mut world).status());
    }

    #[test]
    fn test_bind_joins_arguments() {
        let mut world = world();
        world.execute_console_string("Bind f1 r_fov 90", true);
        assert_eq!(console(&mut world).find_key_bind("f1"), Some("r_fov 90 "));

        world.execute_console_string("Bind f2", true);
        assert_eq!(console(&mut world).find_key_bind("f2"), None);
    }

    #[test]
    fn test_wait_frames_pauses_queue() {
        let mut world = world();
        console(&mut world).register(CVar::new("r_fov", 60));

        execute_console_command(&mut world, "wait_frames 1");
        execute_console_command(&mut world, "r_fov 90");

        execute_deferred_commands(&mut world);
        assert_eq!(console(&mut world).get_cvar("r_fov").unwrap().get_i32(), 60);
        execute_deferred_commands(&mut world);
        assert_eq!(console(&mut world).get_cvar("r_fov").unwrap().get_i32(), 60);
        execute_deferred_commands(&mut world);
        assert_eq!(console(&mut world).get_cvar("r_fov").unwrap().get_i32(), 90);
    }

    #[test]
    fn test_wait_seconds_sets_deadline() {
        let mut world = world();
        world.execute_console_string("wait_seconds 2.5", true);
        assert_eq!(
            console(&mut world).deferred().wait_until(),
            Some(std::time::Duration::from_secs_f32(2.5))
        );

        world.execute_console_string("wait_seconds bogus", true);
        assert_eq!(console(&mut world).deferred().wait_until(), Some(std::time::Duration::ZERO));
    }

    #[test]
    fn test_resetcvars() {
        let mut world = world();
        console(&mut world).register(CVar::new("r_fov", 60));
        world.execute_console_string("r_fov 90; resetcvars", true);
        assert_eq!(console(&mut world).get_cvar("r_fov").unwrap().get_i32(), 60);
    }

    #[test]
    fn test_exec_runs_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autoexec.cfg");
        fs::write(&path, "-- settings\nr_fov 90\n\n// more\nr_width = 1920\n").unwrap();

        let mut world = world();
        console(&mut world).register(CVar::new("r_fov", 60));
        console(&mut world).register(CVar::new("r_width", 1280));

        world.execute_console_string(&format!("exec {}", path.display()), true);
        assert_eq!(console(&mut world).get_cvar("r_fov").unwrap().get_i32(), 90);
        assert_eq!(console(&mut world).get_cvar("r_width").unwrap().get_i32(), 1920);
    }

    #[test]
    fn test_deferred_exec_queues_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.cfg");
        fs::write(&path, "r_fov 90\nwait_frames 1\nr_fov 100\n").unwrap();

        let mut world = world();
        console(&mut world).register(CVar::new("r_fov", 60));

        execute_console_command(&mut world, &format!("exec {}", path.display()));
        assert_eq!(console(&mut world).deferred().len(), 3);
        assert_eq!(console(&mut world).get_cvar("r_fov").unwrap().get_i32(), 60);

        execute_deferred_commands(&mut world);
        assert_eq!(console(&mut world).get_cvar("r_fov").unwrap().get_i32(), 90);
        execute_deferred_commands(&mut world);
        execute_deferred_commands(&mut world);
        assert_eq!(console(&mut world).get_cvar("r_fov").unwrap().get_i32(), 100);
    }

    #[test]
    fn test_exec_missing_file() {
        let mut world = world();
        world.execute_console_string("exec /nonexistent/file.cfg", true);
        assert!(last_line(&world).starts_with("Failed to read '/nonexistent/file.cfg'"));
    }

    #[test]
    fn test_help() {
        let mut world = world();
        console(&mut world).register(CVar::new("r_fov", 60).help("Field of view"));

        world.execute_console_string("help r_fov", true);
        let lines: Vec<_> = world.resource::<ConsoleState>().lines().rev().take(2).map(|l| l.text.clone()).collect();
        assert_eq!(lines, vec!["    r_fov = 60 []", "    Field of view"]);

        world.execute_console_string("help ConsoleShow", true);
        assert_eq!(last_line(&world), "    Opens the console");

        world.execute_console_string("help nothing_here", true);
        assert_eq!(last_line(&world), "Unknown command or variable: nothing_here");

        world.execute_console_string("help", true);
        assert!(last_line(&world).starts_with("Use 'help <name>'"));
    }

    #[test]
    fn test_echo_and_clear() {
        let mut world = world();
        world.execute_console_string("echo hello world", true);
        assert_eq!(last_line(&world), "hello world");

        world.execute_console_string("clear", true);
        assert!(console(&mut world).lines().next().is_none());
    }

    #[test]
    fn test_dump_vars_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = world();
        world.insert_resource(DumpDirectory(dir.path().to_path_buf()));

        world.execute_console_string("DumpVars 1", true);
        let text = fs::read_to_string(dir.path().join(crate::core::VARS_FILE)).unwrap();
        assert!(text.contains("variable: con_debug"));

        world.execute_console_string("DumpCommandsVars wait_", true);
        let text = fs::read_to_string(dir.path().join(crate::core::COMMANDS_AND_VARS_FILE)).unwrap();
        assert!(text.contains("Command: wait_frames"));
        assert!(!text.contains("Command: echo"));
    }

    #[test]
    fn test_anticheat_listing_needs_hash() {
        let mut world = world();
        world.execute_console_string("DumpAllAnticheatVars", true);
        assert_eq!(
            last_line(&world),
            "DumpAllAnticheatVars - cannot complete, cheat vars are in a state of flux, please retry."
        );

        console(&mut world).calc_cheat_var_hash();
        world.execute_console_string("DumpAllAnticheatVars", true);
        let lines: Vec<_> = world.resource::<ConsoleState>().lines().map(|l| l.text.clone()).collect();
        assert!(lines.contains(&"VF_CHEAT & ~VF_CHEAT_NOCHECK list:".to_string()));
        assert!(lines.contains(&"con_debug = 0".to_string()));
        assert_eq!(last_line(&world), "VF_CHEAT_ALWAYS_CHECK list:");
    }
}
