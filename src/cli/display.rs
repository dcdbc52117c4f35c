//! Output and display functions for CLI results

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use colored::Colorize;

use navscope::{CommandGenerator, Operation, OutputSink, Settings, SymbolLocation};

/// Notification sink that writes to the terminal
///
/// Everything goes to stderr so `--json` output on stdout stays parseable.
/// Counts reported errors so callers can tell "no results" from "failed".
#[derive(Debug, Default)]
pub struct TerminalSink {
    errors: AtomicUsize,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of errors reported so far
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }
}

impl OutputSink for TerminalSink {
    fn diag_log(&self, message: &str) {
        if !message.is_empty() {
            tracing::debug!("{message}");
        }
    }

    fn error_to_user(&self, message: &str) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        eprintln!("{} {}", "error:".red().bold(), message);
    }

    fn notify_user(&self, message: &str) {
        eprintln!("{}", message.dimmed());
    }

    fn update_state(&self, state: &str) {
        tracing::debug!(state, "State changed");
    }
}

/// Heading for a search, e.g. `Definition of 'main':`
fn heading(op: Operation, text: &str) -> String {
    let describe = op.describe();
    let mut chars = describe.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{} '{}':", capitalized, text)
}

/// Display search results as `file:line  text`
pub fn display_locations(locations: &[SymbolLocation], op: Operation, text: &str) {
    println!("{}", heading(op, text).bold());
    println!();
    for loc in locations {
        println!(
            "  {}:{}  {}",
            loc.file.cyan(),
            loc.line.to_string().yellow(),
            loc.text
        );
    }
    println!();
    println!("Total: {} result(s)", locations.len());
}

/// Display search results as JSON
pub fn display_locations_json(locations: &[SymbolLocation], op: Operation, text: &str) -> Result<()> {
    let json = serde_json::json!({
        "operation": op,
        "query": text,
        "total": locations.len(),
        "results": locations,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// Operation and template rows for `show-commands`
fn command_rows(commands: &dyn CommandGenerator, settings: &Settings) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("find_cmd", commands.list_files_cmd().to_string()),
        (
            "database_cmd",
            settings
                .build_command
                .clone()
                .unwrap_or_else(|| commands.build_database_cmd().to_string()),
        ),
        ("check_tool", commands.check_tool_cmd().to_string()),
    ];
    for op in Operation::SEARCHES {
        if let Some(field) = op.field_name() {
            rows.push((field, commands.template(op).to_string()));
        }
    }
    rows
}

/// Print the resolved templates for the running platform
pub fn display_commands(commands: &dyn CommandGenerator, settings: &Settings, json: bool) -> Result<()> {
    let rows = command_rows(commands, settings);
    if json {
        let templates: serde_json::Map<String, serde_json::Value> = rows
            .into_iter()
            .map(|(field, template)| (field.to_string(), serde_json::Value::String(template)))
            .collect();
        let output = serde_json::json!({
            "engine": commands.engine().name(),
            "platform": commands.platform().config_key(),
            "database_path": settings.database_path.to_string_lossy(),
            "source_paths": settings
                .source_paths
                .iter()
                .map(|p| p.to_string_lossy())
                .collect::<Vec<_>>(),
            "templates": templates,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} {} on {}",
        "Engine:".bold(),
        commands.engine(),
        commands.platform()
    );
    println!("{} {}", "Database:".bold(), settings.database_path.display());
    for root in &settings.source_paths {
        println!("{} {}", "Source:".bold(), root.display());
    }
    println!();
    let width = rows.iter().map(|(field, _)| field.len()).max().unwrap_or(0);
    for (field, template) in rows {
        println!("  {:width$}  {}", field.cyan(), template);
    }
    Ok(())
}
