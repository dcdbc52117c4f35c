//! Busy-guarded façade over the search engine
//!
//! This is the surface a front-end talks to. It verifies the tool and the
//! database, serializes builds and searches behind a busy flag, and turns
//! engine results into notifications on an [`OutputSink`]. Nothing here
//! returns an error: every call resolves to a bool or a (possibly empty)
//! list of locations.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::commands::Operation;
use crate::config::Settings;
use crate::engine::SearchEngine;
use crate::location::{parse_locations, SymbolLocation};
use crate::runner::{ProcessRunner, TokioRunner};
use crate::sink::OutputSink;

/// Short status strings passed to [`OutputSink::update_state`]
pub mod state {
    pub const READY: &str = "navscope: ready";
    pub const BUILDING: &str = "navscope: building database";
    pub const SEARCHING: &str = "navscope: searching";
    pub const BUILD_FAILED: &str = "navscope: build failed";
    pub const TOOL_MISSING: &str = "navscope: tool not found";
    pub const NO_DATABASE: &str = "navscope: no database";
    pub const DISABLED: &str = "navscope: disabled";
}

/// Why the executor can or cannot serve queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// The tool probe failed; install the tool
    ToolMissing,
    /// The tool works but no usable index exists; run a build
    DatabaseMissing,
    Disabled,
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        self == Readiness::Ready
    }

    /// Status string for this state
    pub fn status(self) -> &'static str {
        match self {
            Readiness::Ready => state::READY,
            Readiness::ToolMissing => state::TOOL_MISSING,
            Readiness::DatabaseMissing => state::NO_DATABASE,
            Readiness::Disabled => state::DISABLED,
        }
    }
}

/// Holds the busy flag for its lifetime. Released on drop, including unwinds.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Stateful orchestrator: one per workspace
pub struct Executor<R: ProcessRunner + Clone = TokioRunner> {
    settings: Settings,
    engine: Mutex<SearchEngine<R>>,
    /// Separate engine for tool probes so `verify` never waits on a build
    probe: Mutex<SearchEngine<R>>,
    sink: Arc<dyn OutputSink>,
    busy: AtomicBool,
}

impl<R: ProcessRunner + Clone> Executor<R> {
    pub fn new(settings: Settings, runner: R, sink: Arc<dyn OutputSink>) -> Self {
        let mut engine = SearchEngine::from_settings(&settings, runner.clone());
        if settings.print_cmd {
            engine = engine.with_echo(Arc::clone(&sink));
        }
        let probe = SearchEngine::from_settings(&settings, runner);
        tracing::debug!(
            engine = %settings.engine,
            database = %settings.database_path.display(),
            roots = settings.source_paths.len(),
            "Executor created"
        );
        Self {
            settings,
            engine: Mutex::new(engine),
            probe: Mutex::new(probe),
            sink,
            busy: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// True while a build or search is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Path of the index artifact whose presence means "built"
    pub fn database_file(&self) -> PathBuf {
        self.settings
            .database_path
            .join(self.settings.engine.database_file_name())
    }

    /// Probe the external tool
    pub async fn check_tool(&self) -> bool {
        let mut probe = self.probe.lock().await;
        let ok = probe.check_tool().await;
        if ok {
            self.sink.diag_log(probe.stdout().trim());
        } else {
            tracing::info!(code = probe.last_result().code, "Tool probe failed");
            self.sink.diag_log(probe.stderr().trim());
        }
        ok
    }

    /// Whether the index artifact exists and is readable and writable
    pub fn database_ready(&self) -> bool {
        let path = self.database_file();
        match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Database not usable");
                false
            }
        }
    }

    /// Classify the current state without notifying anyone
    pub async fn readiness(&self) -> Readiness {
        if !self.settings.enabled {
            return Readiness::Disabled;
        }
        if !self.check_tool().await {
            return Readiness::ToolMissing;
        }
        if !self.database_ready() {
            return Readiness::DatabaseMissing;
        }
        Readiness::Ready
    }

    /// User-facing explanation for a non-ready state
    pub fn readiness_message(&self, readiness: Readiness) -> Option<String> {
        match readiness {
            Readiness::Ready => None,
            Readiness::Disabled => Some("navscope is disabled in the configuration".to_string()),
            Readiness::ToolMissing => Some(format!(
                "{} not found. Install it and make sure it is on PATH.",
                self.settings.engine
            )),
            Readiness::DatabaseMissing => Some(format!(
                "No {} database at {}. Build the database first.",
                self.settings.engine,
                self.settings.database_path.display()
            )),
        }
    }

    /// Tool available AND database usable. Reports which one is missing.
    pub async fn verify(&self) -> bool {
        let readiness = self.readiness().await;
        let Some(message) = self.readiness_message(readiness) else {
            return true;
        };
        self.sink.error_to_user(&message);
        self.sink.update_state(readiness.status());
        false
    }

    /// Enumerate sources, write the file list, and build the index.
    ///
    /// Rejected with a notification when another build or search is running.
    pub async fn build_database(&self) -> bool {
        if !self.settings.enabled {
            if let Some(message) = self.readiness_message(Readiness::Disabled) {
                self.sink.error_to_user(&message);
            }
            self.sink.update_state(state::DISABLED);
            return false;
        }
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            tracing::info!("Build rejected: executor busy");
            self.sink.notify_user("navscope is busy. Try again when the current operation finishes.");
            return false;
        };

        self.sink.update_state(state::BUILDING);
        let ok = self.run_build().await;
        self.sink
            .update_state(if ok { state::READY } else { state::BUILD_FAILED });
        ok
    }

    async fn run_build(&self) -> bool {
        if !self.check_tool().await {
            if let Some(message) = self.readiness_message(Readiness::ToolMissing) {
                self.sink.error_to_user(&message);
            }
            return false;
        }

        let database = &self.settings.database_path;
        if let Err(e) = std::fs::create_dir_all(database) {
            tracing::warn!(path = %database.display(), error = %e, "Failed to create database directory");
            self.sink.error_to_user(&format!(
                "Cannot create database directory {}: {e}",
                database.display()
            ));
            return false;
        }

        let mut engine = self.engine.lock().await;
        tracing::info!(database = %database.display(), "Building database");
        if !engine.generate_file_list(&self.settings.excluded_paths).await {
            self.sink.error_to_user(&format!(
                "Failed to list source files: {}",
                engine.stderr().trim()
            ));
            return false;
        }
        if !engine.build_database().await {
            self.sink.error_to_user(&format!(
                "Failed to build database: {}",
                engine.stderr().trim()
            ));
            return false;
        }

        tracing::info!("Database built");
        self.sink
            .notify_user(&format!("Database built at {}", database.display()));
        true
    }

    /// Run one search and parse its output.
    ///
    /// Returns an empty list when verification fails, the executor is busy,
    /// or the tool reports an error.
    pub async fn run_search(&self, text: &str, op: Operation) -> Vec<SymbolLocation> {
        if !self.verify().await {
            return Vec::new();
        }
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            tracing::info!(op = ?op, "Search rejected: executor busy");
            self.sink.notify_user("navscope is busy. Try again when the current operation finishes.");
            return Vec::new();
        };

        self.sink.update_state(state::SEARCHING);
        let mut engine = self.engine.lock().await;
        let ok = engine.search(op, text).await;
        self.sink.update_state(state::READY);
        if !ok {
            self.sink.error_to_user(&format!(
                "Search for {} '{}' failed: {}",
                op.describe(),
                text,
                engine.stderr().trim()
            ));
            return Vec::new();
        }

        let locations = parse_locations(engine.stdout());
        tracing::debug!(op = ?op, text, hits = locations.len(), "Search finished");
        locations
    }

    pub async fn find_references(&self, text: &str) -> Vec<SymbolLocation> {
        self.run_search(text, Operation::FindAllRef).await
    }

    pub async fn find_definition(&self, text: &str) -> Vec<SymbolLocation> {
        self.run_search(text, Operation::FindDefinition).await
    }

    pub async fn find_callees(&self, text: &str) -> Vec<SymbolLocation> {
        self.run_search(text, Operation::FindCallee).await
    }

    pub async fn find_callers(&self, text: &str) -> Vec<SymbolLocation> {
        self.run_search(text, Operation::FindCaller).await
    }

    pub async fn find_text(&self, text: &str) -> Vec<SymbolLocation> {
        self.run_search(text, Operation::FindText).await
    }

    pub async fn find_pattern(&self, text: &str) -> Vec<SymbolLocation> {
        self.run_search(text, Operation::FindPattern).await
    }

    pub async fn find_file(&self, text: &str) -> Vec<SymbolLocation> {
        self.run_search(text, Operation::FindFile).await
    }

    pub async fn find_includers(&self, text: &str) -> Vec<SymbolLocation> {
        self.run_search(text, Operation::FindIncluder).await
    }
}
