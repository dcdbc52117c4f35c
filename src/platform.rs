//! Host platform classification
//!
//! Command templates differ between operating systems (`find` vs `dir`), so
//! every lookup starts by mapping the OS identifier onto a fixed set of
//! platform categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform category used to pick a command template slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Linux,
    Windows,
    MacOs,
    /// Anything not recognized (BSDs, Solaris, Android, ...)
    Other,
}

impl Platform {
    /// Every category, in override-table key order
    pub const ALL: [Platform; 4] = [
        Platform::Linux,
        Platform::Windows,
        Platform::MacOs,
        Platform::Other,
    ];

    /// Classify an OS identifier.
    ///
    /// Accepts both Rust's `std::env::consts::OS` names (`windows`, `macos`)
    /// and the Node-style names used in editor settings (`win32`, `darwin`).
    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Platform::Linux,
            "win32" | "windows" => Platform::Windows,
            "darwin" | "macos" => Platform::MacOs,
            _ => Platform::Other,
        }
    }

    /// Key naming this platform in a `config_index` override table
    pub fn config_key(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "win32",
            Platform::MacOs => "mac_os",
            Platform::Other => "others",
        }
    }

    /// Inverse of [`Platform::config_key`]; unknown keys yield `None`
    pub fn from_config_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.config_key() == key)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// Platform category of the running process
pub fn current_platform() -> Platform {
    Platform::from_os(std::env::consts::OS)
}
