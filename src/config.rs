//! Configuration file support for navscope
//!
//! Config files are loaded in order (later overrides earlier):
//! 1. `~/.config/navscope/config.toml` (user defaults)
//! 2. `.navscope.toml` in project root (project overrides)
//!
//! CLI flags override all config file values. The loaded [`Config`] is then
//! resolved against the project root into [`Settings`], the explicit object
//! handed to the engine and executor.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::commands::{CommandOverrides, Engine};

/// Placeholder for the project root in `paths` and `database_path`
pub const WORKSPACE_ROOT: &str = "${workspaceRoot}";

/// Project-level config file name
pub const PROJECT_CONFIG_FILE: &str = ".navscope.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration options loaded from config files
///
/// # Example
///
/// ```toml
/// # ~/.config/navscope/config.toml or .navscope.toml
/// paths = ["${workspaceRoot}/src", "${workspaceRoot}/include"]
/// database_path = "${workspaceRoot}/.navscope"
/// exclude = ["/build/.*", ".*_test\\.c"]
/// print_cmd = true
///
/// [engine_commands.config_index.cscope]
/// linux = 0
///
/// [[engine_commands.config]]
/// find_cmd = "fd -t f -e c -e h . ${src_path}"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Master switch; a disabled config makes the executor refuse all work
    pub enabled: Option<bool>,
    /// Indexing engine (only `cscope` today)
    pub engine: Option<Engine>,
    /// Source roots to enumerate
    pub paths: Option<Vec<String>>,
    /// Directory holding the file list and index
    pub database_path: Option<String>,
    /// Replaces the platform's build template when non-empty
    pub build_command: Option<String>,
    /// Regexes; matching lines are removed from the file list
    pub exclude: Option<Vec<String>>,
    /// Echo every resolved command before running it
    pub print_cmd: Option<bool>,
    /// Per-platform command template overrides
    pub engine_commands: Option<CommandOverrides>,
}

impl Config {
    /// Load configuration from user and project config files
    pub fn load(project_root: &Path) -> Self {
        let user_config = dirs::config_dir()
            .map(|d| d.join("navscope/config.toml"))
            .and_then(|p| Self::load_file(&p))
            .unwrap_or_default();

        let project_config =
            Self::load_file(&project_root.join(PROJECT_CONFIG_FILE)).unwrap_or_default();

        // Project overrides user
        let merged = user_config.override_with(project_config);
        tracing::debug!(
            enabled = ?merged.enabled,
            engine = ?merged.engine,
            paths = ?merged.paths,
            database_path = ?merged.database_path,
            exclude = merged.exclude.as_ref().map_or(0, Vec::len),
            command_overrides = merged.engine_commands.is_some(),
            "Effective config after merge"
        );
        merged
    }

    /// Load configuration from a specific file
    ///
    /// Missing files are silent; unreadable or malformed files are logged
    /// and skipped so defaults apply.
    pub fn load_file(path: &Path) -> Option<Self> {
        match Self::read_file(path) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded config");
                Some(config)
            }
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to load config {}: {}", path.display(), e);
                None
            }
        }
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Layer another config on top (other overrides self where present)
    pub fn override_with(self, other: Self) -> Self {
        Config {
            enabled: other.enabled.or(self.enabled),
            engine: other.engine.or(self.engine),
            paths: other.paths.or(self.paths),
            database_path: other.database_path.or(self.database_path),
            build_command: other.build_command.or(self.build_command),
            exclude: other.exclude.or(self.exclude),
            print_cmd: other.print_cmd.or(self.print_cmd),
            engine_commands: other.engine_commands.or(self.engine_commands),
        }
    }

    /// Resolve against the project root, filling defaults
    pub fn resolve(&self, workspace_root: &Path) -> Settings {
        let root = workspace_root.to_string_lossy();
        let expand = |raw: &str| PathBuf::from(raw.replace(WORKSPACE_ROOT, &root));

        let mut source_paths: Vec<PathBuf> = self
            .paths
            .iter()
            .flatten()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(expand)
            .collect();
        if source_paths.is_empty() {
            source_paths.push(workspace_root.to_path_buf());
        }

        let database_path = self
            .database_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(expand)
            .unwrap_or_else(|| workspace_root.join(Settings::DEFAULT_DATABASE_DIR));

        let build_command = self
            .build_command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Settings {
            enabled: self.enabled.unwrap_or(true),
            engine: self.engine.unwrap_or_default(),
            source_paths,
            database_path,
            build_command,
            excluded_paths: self.exclude.clone().unwrap_or_default(),
            print_cmd: self.print_cmd.unwrap_or(false),
            command_overrides: self.engine_commands.clone(),
        }
    }
}

/// Fully resolved settings for one session
///
/// Built once; the engine does not hot-reload. Construct a new engine to
/// pick up changed settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub enabled: bool,
    pub engine: Engine,
    pub source_paths: Vec<PathBuf>,
    pub database_path: PathBuf,
    pub build_command: Option<String>,
    pub excluded_paths: Vec<String>,
    pub print_cmd: bool,
    pub command_overrides: Option<CommandOverrides>,
}

impl Settings {
    /// Database directory used when none is configured, relative to the root
    pub const DEFAULT_DATABASE_DIR: &'static str = ".navscope";

    /// Defaults for a project root with no config files
    pub fn for_root(workspace_root: &Path) -> Self {
        Config::default().resolve(workspace_root)
    }
}
