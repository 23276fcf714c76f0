//! Text dumps of the console namespace and the protection audit.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use thiserror::Error;

use super::{flags_string, CVar, CVarFlags, ConsoleState};

pub const COMMANDS_AND_VARS_FILE: &str = "consolecommandsandvars.txt";
pub const VARS_FILE: &str = "consolevars.txt";

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

const LEGEND: &str = " REQUIRE_NET_SYNC: cannot be changed on client and when connecting it's sent to the client\n \
                      SAVEGAME: stored when saving a savegame\n \
                      READONLY: can not be changed by the user\n\
                      -------------------------\n\n";

fn write_var(out: &mut String, name: &str, var: &CVar) {
    let _ = write!(
        out,
        "variable: {} {}\ntype: {}\ncurrent: {}\nhelp: {}\n\n",
        name,
        flags_string(var.get_flags()),
        var.ty(),
        var.get_string(),
        var.get_help()
    );
}

fn write_file(path: PathBuf, contents: &str) -> Result<PathBuf, DumpError> {
    fs::write(&path, contents).map_err(|source| DumpError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

impl ConsoleState {
    /// Write every command and variable whose name starts with `prefix`
    /// (case-sensitive) to `consolecommandsandvars.txt` in `dir`.
    pub fn dump_commands_vars(&mut self, dir: impl AsRef<Path>, prefix: &str) -> Result<PathBuf, DumpError> {
        let mut out = String::from(" CHEAT: stays in the default value if cheats are not disabled\n");
        out.push_str(LEGEND);

        for (name, meta) in self.commands.iter().filter(|(name, _)| name.starts_with(prefix)) {
            let _ = write!(
                out,
                "Command: {} {}\nscript: {}\nhelp: {}\n\n",
                name,
                flags_string(meta.flags),
                meta.script.as_deref().unwrap_or(""),
                meta.help
            );
        }
        for (name, var) in self.vars.iter().filter(|(name, _)| name.starts_with(prefix)) {
            write_var(&mut out, name, var);
        }

        let path = write_file(dir.as_ref().join(COMMANDS_AND_VARS_FILE), &out)?;
        self.response(&format!("successfully wrote {}", COMMANDS_AND_VARS_FILE));
        Ok(path)
    }

    /// Write every variable to `consolevars.txt` in `dir`; cheat variables
    /// only with `include_cheat`.
    pub fn dump_vars(&mut self, dir: impl AsRef<Path>, include_cheat: bool) -> Result<PathBuf, DumpError> {
        let mut out = String::from(LEGEND);
        for (name, var) in self.vars.iter() {
            if include_cheat || !var.get_flags().contains(CVarFlags::CHEAT) {
                write_var(&mut out, name, var);
            }
        }

        let path = write_file(dir.as_ref().join(VARS_FILE), &out)?;
        self.response(&format!("successfully wrote {}", VARS_FILE));
        Ok(path)
    }

    /// Log every command and variable with its protection markers.
    ///
    /// Protected entries are skipped unless one of `cheat`, `const` or
    /// `readonly` names their protection. Returns the number of commands and
    /// variables listed.
    pub fn audit_cvars<'a>(&mut self, args: impl IntoIterator<Item = &'a str>) -> (usize, usize) {
        let mut exclude = CVarFlags::CHEAT_MASK | CVarFlags::CONST | CVarFlags::READONLY;
        for arg in args {
            if arg.eq_ignore_ascii_case("cheat") {
                exclude.remove(CVarFlags::CHEAT_MASK);
            } else if arg.eq_ignore_ascii_case("const") {
                exclude.remove(CVarFlags::CONST);
            } else if arg.eq_ignore_ascii_case("readonly") {
                exclude.remove(CVarFlags::READONLY);
            }
        }
        let listed = |protection: CVarFlags| protection.is_empty() || !protection.difference(exclude).is_empty();

        let mut lines = vec!["[CVARS]: [BEGIN AUDIT]".to_string()];

        let mut command_count = 0;
        for (name, meta) in self.commands.iter() {
            let protection = meta.flags & CVarFlags::CHEAT_MASK;
            if listed(protection) {
                let marker = if protection.is_empty() { "" } else { " [VF_CHEAT]" };
                lines.push(format!("[CVARS]: [COMMAND] {}{}", name, marker));
                command_count += 1;
            }
        }

        let mut var_count = 0;
        for (name, var) in self.vars.iter() {
            let flags = var.get_flags();
            let protection = flags & (CVarFlags::CHEAT_MASK | CVarFlags::CONST | CVarFlags::READONLY);
            if listed(protection) {
                lines.push(format!(
                    "[CVARS]: [VARIABLE] {}{}{}{}",
                    name,
                    if flags.is_cheat() { " [VF_CHEAT]" } else { "" },
                    if flags.contains(CVarFlags::CONST) { " [VF_CONST_CVAR]" } else { "" },
                    if flags.contains(CVarFlags::READONLY) { " [VF_READONLY]" } else { "" },
                ));
                var_count += 1;
            }
        }

        lines.push(format!(
            "[CVARS]: [END AUDIT] (commands {}/{}; variables {}/{})",
            command_count,
            self.commands.len(),
            var_count,
            self.vars.len()
        ));

        for line in lines {
            info!("{}", line);
            self.add_line(&line);
        }
        (command_count, var_count)
    }
}
