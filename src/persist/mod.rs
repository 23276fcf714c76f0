//! Persistence of `DUMPTODISK` variables.
//!
//! Values are saved to a RON file and fed back through
//! [`ConsoleState::load_config_var`] at startup, so a variable registered later
//! still picks up its saved value.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{CVarFlags, ConCommand, ConsoleState};

/// Default saved variable file name.
pub const DEFAULT_CONFIG_FILE: &str = "console.ron";

/// Serializable variable values (name -> string value).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SavedVars {
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

impl SavedVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty() && !p.exists()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let pretty = ron::ser::PrettyConfig::new().depth_limit(2);
        let contents = ron::ser::to_string_pretty(self, pretty)?;

        fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Every `DUMPTODISK` variable of `console`.
    pub fn from_console(console: &ConsoleState) -> Self {
        let vars = console
            .vars()
            .iter()
            .filter(|(_, var)| var.get_flags().contains(CVarFlags::DUMPTODISK))
            .map(|(name, var)| (name.to_string(), var.get_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error for '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Parse error for '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Path of the saved variable file.
#[derive(Resource, Debug, Clone)]
pub struct ConfigPath(pub PathBuf);

impl Default for ConfigPath {
    fn default() -> Self {
        Self(PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

/// Feed every saved value into the console. Returns the number of entries.
pub fn load_saved_vars(console: &mut ConsoleState, path: impl AsRef<Path>) -> Result<usize, ConfigError> {
    let saved = SavedVars::load(path)?;
    for (name, value) in &saved.vars {
        console.load_config_var(name, value);
        debug!("Loaded cvar: {} = \"{}\"", name, value);
    }
    Ok(saved.vars.len())
}

/// Save every `DUMPTODISK` variable. Returns the number of entries written.
pub fn save_vars(console: &ConsoleState, path: impl AsRef<Path>) -> Result<usize, ConfigError> {
    let saved = SavedVars::from_console(console);
    saved.save(path)?;
    Ok(saved.vars.len())
}

/// Load the saved variable file before anything registers its variables.
pub fn load_config_on_startup(mut console: ResMut<ConsoleState>, config_path: Res<ConfigPath>) {
    let path = &config_path.0;

    if !path.exists() {
        info!("No config file found at '{}', using defaults", path.display());
        return;
    }

    match load_saved_vars(&mut console, path) {
        Ok(count) => info!("Loaded {} cvars from '{}'", count, path.display()),
        Err(e) => error!("Failed to load config: {}", e),
    }
}

/// The `host_writeconfig [file]` command.
pub(crate) fn host_writeconfig_command() -> ConCommand {
    ConCommand::new("host_writeconfig", |args, world| {
        let path = match args.get(0) {
            Some(file) => PathBuf::from(file),
            None => world.get_resource::<ConfigPath>().cloned().unwrap_or_default().0,
        };

        let mut console = world.resource_mut::<ConsoleState>();
        match save_vars(&console, &path) {
            Ok(count) => console.response(&format!("Saved {} cvars to '{}'", count, path.display())),
            Err(e) => console.error(&format!("Failed to save config: {}", e)),
        }
    })
    .help("Save DUMPTODISK cvars to the config file\nhost_writeconfig [file]")
}
