//! # navscope - cscope-driven code navigation
//!
//! Symbol-level navigation for large C/C++ codebases by driving an external
//! indexer. navscope does not parse C itself: it resolves a per-platform
//! command template for each operation, runs it, and parses the tool's
//! line-oriented output.
//!
//! ## Features
//!
//! - **Per-platform templates**: POSIX `find` and Windows `dir` file listing
//!   out of the box, with user overrides merged field by field
//! - **Safe substitution**: templates are split into argv before placeholders
//!   are filled, so symbols never turn into extra arguments
//! - **Busy-guarded builds**: at most one index build in flight per executor
//! - **Structured results**: search output parsed into [`SymbolLocation`]s
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use navscope::{Config, Executor, TokioRunner, TracingSink};
//!
//! # async fn example() {
//! let root = std::path::Path::new(".");
//! let settings = Config::load(root).resolve(root);
//! let executor = Executor::new(settings, TokioRunner, Arc::new(TracingSink));
//!
//! if executor.build_database().await {
//!     for loc in executor.find_definition("main").await {
//!         println!("{}:{} {}", loc.file, loc.line, loc.text);
//!     }
//! }
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod engine;
pub mod executor;
pub mod location;
pub mod platform;
pub mod runner;
pub mod sink;
pub mod template;

pub use commands::{CommandGenerator, CommandOverrides, Engine, Operation};
pub use config::{Config, Settings};
pub use engine::{EngineError, SearchEngine};
pub use executor::{Executor, Readiness};
pub use location::{parse_locations, SymbolLocation};
pub use platform::{current_platform, Platform};
pub use runner::{ExecutionRequest, ExecutionResult, ProcessRunner, TokioRunner};
pub use sink::{OutputSink, TracingSink};
pub use template::TemplateError;
