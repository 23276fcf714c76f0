//! Console commands.
//!
//! A command is either native (a Rust handler with full `World` access) or a
//! script template whose `%1`, `%2`, `%%` and `%line` placeholders are filled
//! from the invocation and executed as console input.

use std::collections::{BTreeMap, HashMap};

use bevy::prelude::*;
use thiserror::Error;

use super::CVarFlags;

/// Arguments passed to a command handler.
#[derive(Debug, Clone)]
pub struct CommandArgs<'a> {
    /// The statement that invoked the command.
    raw: &'a str,
    /// The command name as typed.
    name: &'a str,
    /// Parsed arguments (excluding command name).
    args: Vec<&'a str>,
}

impl<'a> CommandArgs<'a> {
    pub fn new(raw: &'a str, name: &'a str, args: Vec<&'a str>) -> Self {
        Self { raw, name, args }
    }

    #[inline]
    pub fn raw(&self) -> &str {
        self.raw
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.name
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.args.get(index).copied()
    }

    #[inline]
    pub fn get_or(&self, index: usize, default: &'a str) -> &str {
        self.args.get(index).copied().unwrap_or(default)
    }

    /// Try to parse an argument as a specific type.
    pub fn parse<T: std::str::FromStr>(&self, index: usize) -> Option<T> {
        self.get(index).and_then(|s| s.parse().ok())
    }

    /// Parse an argument with a default value.
    pub fn parse_or<T: std::str::FromStr>(&self, index: usize, default: T) -> T {
        self.parse(index).unwrap_or(default)
    }

    #[inline]
    pub fn as_slice(&self) -> &[&str] {
        &self.args
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.args.iter().copied()
    }

    pub fn join(&self, separator: &str) -> String {
        self.args.join(separator)
    }

    /// Join arguments starting from an index.
    pub fn join_from(&self, start: usize, separator: &str) -> String {
        self.args.get(start..).unwrap_or(&[]).join(separator)
    }
}

/// Native command handler.
///
/// Handlers receive the parsed arguments and mutable access to the world, so
/// they may read and change the console state and execute further input.
pub type CommandHandler = Box<dyn Fn(&CommandArgs, &mut World) + Send + Sync>;

/// Stored command metadata. Native handlers live in [`CommandHandlers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMeta {
    pub name: String,
    pub help: String,
    pub flags: CVarFlags,
    /// Template for script commands, `None` for native ones.
    pub script: Option<String>,
}

impl CommandMeta {
    #[inline]
    pub fn is_script(&self) -> bool {
        self.script.is_some()
    }
}

enum CommandBody {
    Native(CommandHandler),
    Script(String),
}

/// A console command ready to be added to the console.
///
/// # Examples
///
/// ```ignore
/// let noclip = ConCommand::new("noclip", |_args, world| {
///     world.resource_mut::<Player>().noclip ^= true;
/// })
/// .help("Toggle collision for the local player")
/// .flags(CVarFlags::CHEAT);
///
/// let fast = ConCommand::script("fast", "g_speed = %1; r_motionblur = 0");
/// ```
pub struct ConCommand {
    name: String,
    help: String,
    flags: CVarFlags,
    body: CommandBody,
}

impl ConCommand {
    /// A native command.
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&CommandArgs, &mut World) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            help: String::new(),
            flags: CVarFlags::empty(),
            body: CommandBody::Native(Box::new(handler)),
        }
    }

    /// A script command expanding `template`.
    pub fn script(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: String::new(),
            flags: CVarFlags::empty(),
            body: CommandBody::Script(template.into()),
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn flags(mut self, flags: CVarFlags) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn get_help(&self) -> &str {
        &self.help
    }

    #[inline]
    pub fn get_flags(&self) -> CVarFlags {
        self.flags
    }

    /// Split into metadata and, for native commands, the handler.
    pub fn split(self) -> (CommandMeta, Option<CommandHandler>) {
        let (script, handler) = match self.body {
            CommandBody::Native(handler) => (None, Some(handler)),
            CommandBody::Script(template) => (Some(template), None),
        };
        (
            CommandMeta {
                name: self.name,
                help: self.help,
                flags: self.flags,
                script,
            },
            handler,
        )
    }
}

impl std::fmt::Debug for ConCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConCommand")
            .field("name", &self.name)
            .field("help", &self.help)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Registry of command metadata, sorted by name.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandMeta>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. Returns false, keeping the existing entry, on a duplicate name.
    pub fn add(&mut self, meta: CommandMeta) -> bool {
        if self.commands.contains_key(&meta.name) {
            return false;
        }
        self.commands.insert(meta.name.clone(), meta);
        true
    }

    pub fn remove(&mut self, name: &str) -> Option<CommandMeta> {
        self.commands.remove(name)
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&CommandMeta> {
        self.commands.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Name-sorted iteration.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandMeta)> {
        self.commands.iter().map(|(name, meta)| (name.as_str(), meta))
    }
}

/// Stores native command handlers separately from the console state.
///
/// This separation lets a handler take `&mut World` (including the console
/// state) while it runs.
#[derive(Resource, Default)]
pub struct CommandHandlers {
    handlers: HashMap<Box<str>, CommandHandler>,
}

impl CommandHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<Box<str>>, handler: CommandHandler) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Take a handler temporarily for execution.
    ///
    /// Use `put` to return the handler after execution.
    pub fn take(&mut self, name: &str) -> Option<CommandHandler> {
        self.handlers.remove(name)
    }

    /// Put a handler back after temporary removal.
    pub fn put(&mut self, name: &str, handler: CommandHandler) {
        self.handlers.insert(name.into(), handler);
    }
}

/// Argument count mismatch while expanding a script template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Too many arguments for: {0}")]
    TooManyArguments(String),
    #[error("Not enough arguments for: {0}")]
    NotEnoughArguments(String),
}

/// Expand a script command template.
///
/// * `%%` becomes every argument quoted and joined with commas;
/// * otherwise `%line` becomes the quoted text after the command name;
/// * otherwise `%1`..`%N` are replaced by the quoted arguments, and the
///   placeholders must match the argument count exactly.
///
/// `raw` is the invoking statement; backslashes and double quotes in it
/// (after its first character) are escaped before use in `%line`.
pub fn expand_template(name: &str, template: &str, raw: &str, args: &[&str]) -> Result<String, TemplateError> {
    let mut expanded = template.to_string();

    if expanded.contains("%%") {
        let joined = args
            .iter()
            .map(|arg| format!("\"{}\"", arg))
            .collect::<Vec<_>>()
            .join(",");
        return Ok(expanded.replacen("%%", &joined, 1));
    }

    if expanded.contains("%line") {
        let line = if args.is_empty() {
            String::new()
        } else {
            let escaped = escape_raw(raw);
            let rest = escaped.find(' ').map_or(escaped.as_str(), |at| &escaped[at + 1..]);
            format!("\"{}\"", rest)
        };
        return Ok(expanded.replacen("%line", &line, 1));
    }

    let count = args.len() + 1;
    for i in 1..=count {
        let placeholder = format!("%{}", i);
        match expanded.find(&placeholder) {
            None if i != count => return Err(TemplateError::TooManyArguments(name.to_string())),
            None => {}
            Some(_) if i == count => return Err(TemplateError::NotEnoughArguments(name.to_string())),
            Some(_) => {
                expanded = expanded.replacen(&placeholder, &format!("\"{}\"", args[i - 1]), 1);
            }
        }
    }

    Ok(expanded)
}

fn escape_raw(raw: &str) -> String {
    let mut chars = raw.chars();
    let mut escaped: String = chars.next().map(String::from).unwrap_or_default();
    for c in chars {
        if c == '\\' || c == '"' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
