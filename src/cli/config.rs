//! Configuration and project root detection
//!
//! Provides project root detection and CLI overrides on resolved settings.

use std::path::{Path, PathBuf};

use navscope::Settings;

use super::Cli;

/// Find project root by looking for common markers.
///
/// Walks up from the current directory; the first directory holding any
/// marker wins. Falls back to the current directory.
pub(crate) fn find_project_root() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_project_root_from(&cwd).unwrap_or_else(|| {
        tracing::warn!("No project root found, using current directory");
        cwd
    })
}

fn find_project_root_from(start: &Path) -> Option<PathBuf> {
    // Listed in priority order: if multiple exist in one directory, first match wins
    let markers = [
        navscope::config::PROJECT_CONFIG_FILE, // explicit navscope project
        "compile_commands.json",               // CMake/Bear compilation database
        "CMakeLists.txt",                      // CMake
        "Makefile",                            // make
        ".git",                                // Git repository root (fallback)
    ];

    let mut current = start;
    loop {
        if let Some(marker) = markers.iter().find(|m| current.join(m).exists()) {
            tracing::debug!(root = %current.display(), marker, "Detected project root");
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Apply CLI flags on top of config-file settings
/// CLI flags always override config values
pub(super) fn apply_cli_overrides(settings: &mut Settings, cli: &Cli, root: &Path) {
    if let Some(database) = &cli.database {
        // Relative paths are taken from the project root
        settings.database_path = root.join(database);
    }
    if cli.print_cmd {
        settings.print_cmd = true;
    }
}
