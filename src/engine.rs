//! Search engine: multi-step workflows over the external indexer
//!
//! Enumerates source files per root, filters and persists the file list,
//! builds the index, and runs queries. Every operation returns a plain
//! `bool` (logical success) and leaves the raw output of the most recent
//! command available through [`SearchEngine::stdout`] / [`SearchEngine::stderr`].
//!
//! Operations take `&mut self`, so one engine instance runs one command at a
//! time. Use separate instances for concurrent queries.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::commands::{self, CommandGenerator, Operation};
use crate::config::Settings;
use crate::runner::{ExecutionResult, ProcessRunner, TokioRunner};
use crate::sink::OutputSink;
use crate::template::{self, Bindings, TemplateError};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No database path configured")]
    NoDatabasePath,
    #[error("Invalid exclusion pattern '{pattern}': {source}")]
    Exclusion {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Failed to write file list {}: {source}", path.display())]
    WriteFileList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not a search operation")]
    NotASearch(&'static str),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Drives the indexer through a [`CommandGenerator`] and a [`ProcessRunner`]
pub struct SearchEngine<R: ProcessRunner = TokioRunner> {
    runner: R,
    commands: Box<dyn CommandGenerator>,
    source_roots: Vec<PathBuf>,
    database_path: Option<PathBuf>,
    build_command: Option<String>,
    echo: Option<Arc<dyn OutputSink>>,
    last: ExecutionResult,
}

impl<R: ProcessRunner> SearchEngine<R> {
    pub fn new(
        runner: R,
        commands: Box<dyn CommandGenerator>,
        source_roots: Vec<PathBuf>,
        database_path: Option<PathBuf>,
    ) -> Self {
        Self {
            runner,
            commands,
            source_roots,
            database_path,
            build_command: None,
            echo: None,
            last: ExecutionResult::failed("No command has run yet"),
        }
    }

    /// Engine for resolved settings, with templates for the running platform
    pub fn from_settings(settings: &Settings, runner: R) -> Self {
        let commands = commands::build_for_host(settings.engine, settings.command_overrides.as_ref());
        Self::new(
            runner,
            commands,
            settings.source_paths.clone(),
            Some(settings.database_path.clone()),
        )
        .with_build_command(settings.build_command.clone())
    }

    /// Use `command` instead of the platform's build template
    pub fn with_build_command(mut self, command: Option<String>) -> Self {
        self.build_command = command.filter(|c| !c.trim().is_empty());
        self
    }

    /// Echo every resolved command line to `sink` before running it
    pub fn with_echo(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.echo = Some(sink);
        self
    }

    pub fn update_paths(&mut self, source_roots: Vec<PathBuf>, database_path: Option<PathBuf>) {
        self.source_roots = source_roots;
        self.database_path = database_path;
    }

    pub fn commands(&self) -> &dyn CommandGenerator {
        self.commands.as_ref()
    }

    pub fn database_path(&self) -> Option<&Path> {
        self.database_path.as_deref()
    }

    /// Stdout of the most recent command
    pub fn stdout(&self) -> &str {
        &self.last.stdout
    }

    /// Stderr of the most recent command (or the engine's own error text)
    pub fn stderr(&self) -> &str {
        &self.last.stderr
    }

    pub fn last_result(&self) -> &ExecutionResult {
        &self.last
    }

    fn database_str(&self) -> Option<String> {
        self.database_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
    }

    /// Record an engine-side failure as the last result
    fn fail(&mut self, error: EngineError) -> bool {
        tracing::warn!(error = %error, "Engine operation failed");
        self.last = ExecutionResult::failed(error.to_string());
        false
    }

    /// Resolve `template`, run it, and store the result.
    ///
    /// `in_database_dir` runs the child with the database directory as cwd.
    async fn run_template(&mut self, template: &str, bindings: &Bindings<'_>, in_database_dir: bool) -> bool {
        let request = match template::resolve(template, bindings) {
            Ok(request) => request,
            Err(e) => return self.fail(e.into()),
        };
        let cwd = if in_database_dir {
            self.database_path.clone()
        } else {
            None
        };
        let request = request.with_cwd(cwd);

        if let Some(echo) = &self.echo {
            echo.notify_user(&request.to_string());
        }
        tracing::debug!(program = %request.program, args = ?request.args, cwd = ?request.cwd, "Running command");

        self.last = self.runner.run(&request).await;
        self.last.is_ok()
    }

    /// Enumerate source files under every root and write the file list.
    ///
    /// Stops at the first root whose command fails; nothing is written in
    /// that case. Each exclusion pattern is compiled as `pattern + "\n"` and
    /// every match is removed from the combined listing.
    pub async fn generate_file_list(&mut self, excluded_patterns: &[String]) -> bool {
        let template = self.commands.list_files_cmd().to_string();
        let database = self.database_str();
        let roots = self.source_roots.clone();

        let mut listing = String::new();
        for root in &roots {
            let root = root.to_string_lossy();
            let bindings = Bindings::new()
                .src_path(&root)
                .database_path(database.as_deref());
            if !self.run_template(&template, &bindings, true).await {
                tracing::warn!(root = %root, code = self.last.code, "File enumeration failed");
                return false;
            }
            listing.push_str(&self.last.stdout);
        }

        let listing = match apply_exclusions(&listing, excluded_patterns) {
            Ok(listing) => listing,
            Err(e) => return self.fail(e),
        };

        match self.write_file_list(&listing) {
            Ok(path) => {
                tracing::info!(
                    path = %path.display(),
                    roots = roots.len(),
                    files = listing.lines().count(),
                    "Wrote file list"
                );
                true
            }
            Err(e) => self.fail(e),
        }
    }

    fn write_file_list(&self, listing: &str) -> Result<PathBuf, EngineError> {
        let dir = self.database_path.as_ref().ok_or(EngineError::NoDatabasePath)?;
        let path = dir.join(self.commands.engine().file_list_name());
        std::fs::write(&path, listing).map_err(|source| EngineError::WriteFileList {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Build the index from the file list
    pub async fn build_database(&mut self) -> bool {
        let template = match &self.build_command {
            Some(custom) => custom.clone(),
            None => self.commands.build_database_cmd().to_string(),
        };
        let database = self.database_str();
        let bindings = Bindings::new().database_path(database.as_deref());
        self.run_template(&template, &bindings, true).await
    }

    /// Run a query operation for `text`
    pub async fn search(&mut self, op: Operation, text: &str) -> bool {
        if !op.is_search() {
            return self.fail(EngineError::NotASearch(op.describe()));
        }
        let template = self.commands.template(op).to_string();
        let database = self.database_str();
        let bindings = Bindings::new()
            .text(text)
            .database_path(database.as_deref());
        self.run_template(&template, &bindings, true).await
    }

    pub async fn search_ref(&mut self, text: &str) -> bool {
        self.search(Operation::FindAllRef, text).await
    }

    pub async fn search_definition(&mut self, text: &str) -> bool {
        self.search(Operation::FindDefinition, text).await
    }

    pub async fn search_callee(&mut self, text: &str) -> bool {
        self.search(Operation::FindCallee, text).await
    }

    pub async fn search_caller(&mut self, text: &str) -> bool {
        self.search(Operation::FindCaller, text).await
    }

    pub async fn search_text(&mut self, text: &str) -> bool {
        self.search(Operation::FindText, text).await
    }

    pub async fn search_pattern(&mut self, text: &str) -> bool {
        self.search(Operation::FindPattern, text).await
    }

    pub async fn search_file(&mut self, text: &str) -> bool {
        self.search(Operation::FindFile, text).await
    }

    pub async fn search_includer(&mut self, text: &str) -> bool {
        self.search(Operation::FindIncluder, text).await
    }

    /// Probe for the external tool.
    ///
    /// Runs outside the database directory (it may not exist yet) and
    /// requires the tool's signature in its output.
    pub async fn check_tool(&mut self) -> bool {
        let template = self.commands.check_tool_cmd().to_string();
        if !self.run_template(&template, &Bindings::new(), false).await {
            return false;
        }

        let signature = self.commands.tool_signature();
        if self.last.stdout.contains(signature) || self.last.stderr.contains(signature) {
            return true;
        }
        tracing::warn!(signature, "Tool probe output did not match");
        self.last.success = false;
        if self.last.stderr.is_empty() {
            self.last.stderr = format!(
                "Unexpected output from '{}': {}",
                template,
                self.last.stdout.trim()
            );
        }
        false
    }
}

/// Remove every newline-terminated line of `listing` that matches any pattern.
///
/// A match may start anywhere in the line, but the whole line goes, so a
/// directory in the middle of a path never splices two entries together.
fn apply_exclusions(listing: &str, patterns: &[String]) -> Result<String, EngineError> {
    let mut result = listing.to_string();
    for pattern in patterns {
        let re = Regex::new(&format!("(?m)^[^\n]*(?:{pattern})\n")).map_err(|source| EngineError::Exclusion {
            pattern: pattern.clone(),
            source,
        })?;
        let before = result.len();
        result = re.replace_all(&result, "").into_owned();
        tracing::debug!(pattern = %pattern, removed_bytes = before - result.len(), "Applied exclusion");
    }
    Ok(result)
}
