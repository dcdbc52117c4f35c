//! CLI implementation for navscope

mod config;
mod display;

use config::{apply_cli_overrides, find_project_root};
use display::TerminalSink;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use navscope::{commands, Config, Executor, Operation, Readiness, Settings, TokioRunner};

/// Exit codes for CLI commands
#[repr(i32)]
pub enum ExitCode {
    /// Search returned no results
    NoResults = 2,
}

#[derive(Parser)]
#[command(name = "navscope")]
#[command(about = "C/C++ code navigation backed by cscope")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Project root (default: nearest directory with a project marker)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Database directory, overrides `database_path` from config
    #[arg(long, global = true, env = "NAVSCOPE_DATABASE")]
    database: Option<PathBuf>,

    /// Echo every command before running it
    #[arg(long, global = true)]
    print_cmd: bool,

    /// Show debug info (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the indexing tool is installed
    Check,
    /// Check tool and database
    Verify,
    /// Generate the file list and build the database
    Build {
        /// Extra exclusion regex for the file list (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
    },
    /// Find all references to a symbol
    Refs { symbol: String },
    /// Find the definition of a symbol
    Def { symbol: String },
    /// Find functions called by a function
    Callees { symbol: String },
    /// Find functions calling a function
    Callers { symbol: String },
    /// Find a text string
    Text { text: String },
    /// Find an egrep pattern
    Pattern { pattern: String },
    /// Find files by name
    File { name: String },
    /// Find files #including a file
    Includers { name: String },
    /// Print the resolved command templates for this platform
    ShowCommands,
}

impl Commands {
    /// Search operation and query text, for search subcommands
    fn search(&self) -> Option<(Operation, &str)> {
        match self {
            Commands::Refs { symbol } => Some((Operation::FindAllRef, symbol.as_str())),
            Commands::Def { symbol } => Some((Operation::FindDefinition, symbol.as_str())),
            Commands::Callees { symbol } => Some((Operation::FindCallee, symbol.as_str())),
            Commands::Callers { symbol } => Some((Operation::FindCaller, symbol.as_str())),
            Commands::Text { text } => Some((Operation::FindText, text.as_str())),
            Commands::Pattern { pattern } => Some((Operation::FindPattern, pattern.as_str())),
            Commands::File { name } => Some((Operation::FindFile, name.as_str())),
            Commands::Includers { name } => Some((Operation::FindIncluder, name.as_str())),
            Commands::Check | Commands::Verify | Commands::Build { .. } | Commands::ShowCommands => None,
        }
    }
}

/// Run CLI with pre-parsed arguments (main.rs parses first to read `-v`)
pub fn run_with(cli: Cli) -> Result<()> {
    let root = match &cli.project {
        Some(project) => project.clone(),
        None => find_project_root(),
    };

    // Load config and apply CLI overrides (CLI flags override config)
    let config = Config::load(&root);
    let mut settings = config.resolve(&root);
    apply_cli_overrides(&mut settings, &cli, &root);

    if let Some((op, text)) = cli.command.search() {
        return block_on(cmd_search(&cli, settings, op, text))?;
    }
    match &cli.command {
        Commands::Check => block_on(cmd_check(&cli, settings))?,
        Commands::Verify => block_on(cmd_verify(&cli, settings))?,
        Commands::Build { exclude } => {
            settings.excluded_paths.extend(exclude.iter().cloned());
            block_on(cmd_build(&cli, settings))?
        }
        Commands::ShowCommands => cmd_show_commands(&cli, &settings),
        _ => unreachable!("search commands handled above"),
    }
}

/// Drive one async command on a single-threaded runtime
fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    Ok(runtime.block_on(future))
}

fn executor(settings: Settings) -> (Executor, Arc<TerminalSink>) {
    let sink = Arc::new(TerminalSink::new());
    let executor = Executor::new(settings, TokioRunner, sink.clone());
    (executor, sink)
}

// === Commands ===

/// Probe the indexing tool
async fn cmd_check(cli: &Cli, settings: Settings) -> Result<()> {
    let engine = settings.engine;
    let (executor, _) = executor(settings);
    let available = executor.check_tool().await;

    if cli.json {
        let json = serde_json::json!({
            "engine": engine.name(),
            "available": available,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if available {
        println!("{} {} is available", "✓".green(), engine);
    }

    if !available {
        bail!("{} not found. Install it and make sure it is on PATH.", engine);
    }
    Ok(())
}

/// Check tool and database, reporting which one is missing
async fn cmd_verify(cli: &Cli, settings: Settings) -> Result<()> {
    let (executor, _) = executor(settings);
    let readiness = executor.readiness().await;
    let message = executor.readiness_message(readiness);

    if cli.json {
        let json = serde_json::json!({
            "ready": readiness.is_ready(),
            "state": readiness.status(),
            "database": executor.database_file().to_string_lossy(),
            "message": message,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if readiness == Readiness::Ready {
        println!(
            "{} Ready ({})",
            "✓".green(),
            executor.database_file().display()
        );
    }

    match message {
        Some(message) => bail!(message),
        None => Ok(()),
    }
}

/// Build the database
async fn cmd_build(cli: &Cli, settings: Settings) -> Result<()> {
    let database = settings.database_path.clone();
    let (executor, _) = executor(settings);
    let built = executor.build_database().await;

    if cli.json {
        let json = serde_json::json!({
            "built": built,
            "database": database.to_string_lossy(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if built {
        println!("{} Database built at {}", "✓".green(), database.display());
    }

    if !built {
        bail!("Database build failed");
    }
    Ok(())
}

/// Run one search and print the results
async fn cmd_search(cli: &Cli, settings: Settings, op: Operation, text: &str) -> Result<()> {
    let (executor, sink) = executor(settings);
    let locations = executor.run_search(text, op).await;

    if locations.is_empty() {
        // An error was already reported through the sink
        if sink.error_count() > 0 {
            bail!("Search failed");
        }
        if cli.json {
            display::display_locations_json(&locations, op, text)?;
        } else {
            println!("No results for {} '{}'", op.describe(), text);
        }
        std::process::exit(ExitCode::NoResults as i32);
    }

    if cli.json {
        display::display_locations_json(&locations, op, text)?;
    } else {
        display::display_locations(&locations, op, text);
    }
    Ok(())
}

/// Print resolved templates
fn cmd_show_commands(cli: &Cli, settings: &Settings) -> Result<()> {
    let generator = commands::build_for_host(settings.engine, settings.command_overrides.as_ref());
    display::display_commands(generator.as_ref(), settings, cli.json)
}
