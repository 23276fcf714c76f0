//! Line interpreter.
//!
//! Input is executed against the `World` rather than the console resource
//! alone: native handlers get full world access and may execute further input
//! while they run, so the console is only borrowed for short stretches.

use std::ops::ControlFlow;
use std::panic::{AssertUnwindSafe, catch_unwind};

use bevy::prelude::*;

use super::registry::starts_with_ignore_case;
use super::tokenizer::{split_commands, statement_head, tokenize_string};
use super::{
    expand_template, CVarFlags, CVarType, CommandArgs, CommandHandlers, CommandMeta, ConsoleOutputLevel,
    ConsoleState,
};

/// Script commands expanding into script commands stop at this depth.
pub const MAX_SCRIPT_DEPTH: u32 = 32;

/// Execute a line of input that did not come from the console's edit line.
///
/// With `defer` (or deferred mode switched on) the line is queued for the
/// per-frame drain instead. An `exec` line is unrolled right away so the
/// script's lines are queued in order.
pub fn execute_string(world: &mut World, line: &str, silent: bool, defer: bool) {
    let deferred_mode = world.resource::<ConsoleState>().deferred.deferred_mode();
    if !deferred_mode && !defer {
        execute_string_internal(world, line, false, silent);
        return;
    }

    let line = line.trim_start();
    if starts_with_ignore_case(line, "exec") {
        let previous = {
            let mut console = world.resource_mut::<ConsoleState>();
            let previous = console.deferred.deferred_mode();
            console.deferred.set_deferred_mode(true);
            previous
        };
        execute_string_internal(world, line, false, silent);
        world.resource_mut::<ConsoleState>().deferred.set_deferred_mode(previous);
    } else {
        world.resource_mut::<ConsoleState>().deferred.push(line, silent);
    }
}

/// Queue a line silently for the next drain.
pub fn execute_console_command(world: &mut World, line: &str) {
    execute_string(world, line, true, true);
}

/// Execute a line immediately.
///
/// `from_console` marks input typed into the console, which is subject to
/// restricted mode.
pub fn execute_string_internal(world: &mut World, line: &str, from_console: bool, silent: bool) {
    if line.starts_with(['#', '@']) {
        let mut console = world.resource_mut::<ConsoleState>();
        if !console.is_restricted() || !from_console {
            console.add_line(line);
            return;
        }
    }

    for statement in split_commands(line) {
        if execute_statement(world, statement, from_console, silent).is_break() {
            return;
        }
    }
}

fn execute_statement(world: &mut World, statement: &str, from_console: bool, silent: bool) -> ControlFlow<()> {
    let mut console = world.resource_mut::<ConsoleState>();

    if !silent && console.status() {
        console.add_line_level(statement, ConsoleOutputLevel::Command);
    }

    let head = statement_head(statement);
    if head.name.len() > 1 {
        if let Some(substr) = head.name.strip_prefix('?') {
            console.find_var(substr);
            return ControlFlow::Continue(());
        }
    }

    let unrestricted = !console.is_restricted() || !from_console;
    let allowed = |flags: CVarFlags| unrestricted || flags.contains(CVarFlags::RESTRICTEDMODE);

    let command = console.commands.get(head.name).filter(|meta| allowed(meta.flags)).cloned();
    if let Some(meta) = command {
        if meta.flags.contains(CVarFlags::BLOCKFRAME) {
            console.deferred.bump_block_counter();
        }
        drop(console);
        run_command(world, &meta, statement, silent, false);
        return ControlFlow::Continue(());
    }

    let var = console
        .vars
        .get(head.name)
        .filter(|var| allowed(var.get_flags()))
        .map(|var| (var.get_flags(), var.ty(), var.get_help().to_string()));
    if let Some((flags, ty, help)) = var {
        if flags.contains(CVarFlags::BLOCKFRAME) {
            console.deferred.bump_block_counter();
        }

        if let Some(value) = head.value(statement) {
            if value == "?" {
                console.display_help(&help, head.name);
                return ControlFlow::Break(());
            }
            if !value.is_empty() || ty == CVarType::String {
                console.set_cvar(head.name, value);
            }
        }

        if !silent {
            console.display_var_value(head.name);
        }
        return ControlFlow::Continue(());
    }

    if !silent {
        console.warning(&format!("Unknown command: {}", head.name));
    }
    ControlFlow::Continue(())
}

/// Execute `statement` as a command invocation, bypassing restricted mode.
///
/// With `ignore_dev_mode` cheat commands run outside dev mode too. Returns
/// false if the statement does not name a command.
pub fn execute_command(world: &mut World, statement: &str, ignore_dev_mode: bool) -> bool {
    let name = statement_head(statement).name;
    let Some(meta) = world.resource::<ConsoleState>().commands.get(name).cloned() else {
        return false;
    };
    run_command(world, &meta, statement, false, ignore_dev_mode);
    true
}

fn run_command(world: &mut World, meta: &CommandMeta, statement: &str, silent: bool, ignore_dev_mode: bool) {
    info!("[CONSOLE] Executing console command '{}'", statement);

    let tokens = tokenize_string(statement);
    let typed_name = tokens.first().copied().unwrap_or(meta.name.as_str());
    let args = tokens.get(1..).unwrap_or(&[]);

    {
        let mut console = world.resource_mut::<ConsoleState>();
        if args.first() == Some(&"?") {
            console.display_help(&meta.help, &meta.name);
            return;
        }

        let mode = console.access_mode();
        if meta.flags.is_cheat() && !mode.editor {
            console.error(&format!("[CVARS]: [EXECUTE] command {} is marked [VF_CHEAT]", meta.name));
            if !mode.dev_mode && !ignore_dev_mode {
                return;
            }
        }
    }

    match &meta.script {
        None => run_native(world, &meta.name, CommandArgs::new(statement, typed_name, args.to_vec())),
        Some(template) => run_script(world, meta, template, statement, args, silent),
    }
}

fn run_native(world: &mut World, name: &str, args: CommandArgs) {
    let Some(handler) = world.resource_mut::<CommandHandlers>().take(name) else {
        warn!("Command '{}' is already executing", name);
        return;
    };

    let result = catch_unwind(AssertUnwindSafe(|| handler(&args, world)));

    let still_registered = world.resource::<ConsoleState>().commands.contains(name);
    let mut handlers = world.resource_mut::<CommandHandlers>();
    if still_registered && !handlers.contains(name) {
        handlers.put(name, handler);
    }

    if let Err(panic) = result {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Unknown panic".to_string());
        world
            .resource_mut::<ConsoleState>()
            .error(&format!("Command '{}' panicked: {}", name, message));
    }
}

fn run_script(world: &mut World, meta: &CommandMeta, template: &str, statement: &str, args: &[&str], silent: bool) {
    let expanded = {
        let mut console = world.resource_mut::<ConsoleState>();
        let expanded = match expand_template(&meta.name, template, statement, args) {
            Ok(expanded) => expanded,
            Err(err) => {
                console.warning(&err.to_string());
                return;
            }
        };
        if console.script_depth >= MAX_SCRIPT_DEPTH {
            console.error(&format!("Script command {} nested too deeply", meta.name));
            return;
        }
        console.script_depth += 1;
        expanded
    };

    execute_string_internal(world, &expanded, false, silent);

    let mut console = world.resource_mut::<ConsoleState>();
    console.script_depth = console.script_depth.saturating_sub(1);
}

/// Drain the deferred queue for this frame.
///
/// Nothing runs while a frame or time wait is pending. The drain stops after
/// a `BLOCKFRAME` command or variable was executed.
pub fn execute_deferred_commands(world: &mut World) {
    let start = {
        let mut console = world.resource_mut::<ConsoleState>();
        let now = console.host().now();
        match console.deferred.begin_frame(now) {
            Some(counter) => counter,
            None => return,
        }
    };

    while let Some(next) = world.resource::<ConsoleState>().deferred.front().cloned() {
        execute_string_internal(world, &next.command, false, next.silent);

        let mut console = world.resource_mut::<ConsoleState>();
        console.deferred.pop_front();
        if console.deferred.block_counter() != start {
            break;
        }
    }
}

/// Execute the edit line as console input and record it in history.
pub fn execute_input_buffer(world: &mut World) {
    let line = {
        let mut console = world.resource_mut::<ConsoleState>();
        if console.input_line().is_empty() {
            return;
        }
        let line = console.take_input_line();
        console.add_command_to_history(&line);
        line
    };
    execute_string_internal(world, &line, true, false);
}

/// Per-frame console work.
pub fn update(world: &mut World) {
    {
        let mut console = world.resource_mut::<ConsoleState>();
        if console.take_console_key_pressed() {
            console.input.clear();
        }
    }

    execute_deferred_commands(world);

    world.resource_mut::<ConsoleState>().calc_cheat_var_hash();
}
