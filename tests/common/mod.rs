//! Common test fixtures and helpers
//!
//! Usage in test files:
//! ```ignore
//! mod common;
//! use common::{MockRunner, RecordingSink};
//! ```

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use navscope::{ExecutionRequest, ExecutionResult, OutputSink, ProcessRunner};
use tokio::sync::{Notify, Semaphore};

pub type Handler = Box<dyn Fn(&ExecutionRequest) -> ExecutionResult + Send + Sync>;

/// Pauses matching requests until the test releases them
struct Gate {
    matches: fn(&ExecutionRequest) -> bool,
    entered: Notify,
    release: Semaphore,
}

/// Process runner that records every request and answers from a closure
pub struct MockRunner {
    calls: Mutex<Vec<ExecutionRequest>>,
    handler: Handler,
    gate: Option<Gate>,
}

impl MockRunner {
    pub fn new(handler: impl Fn(&ExecutionRequest) -> ExecutionResult + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
            gate: None,
        }
    }

    /// Every request exits 0 with `stdout`
    pub fn always(stdout: &'static str) -> Self {
        Self::new(move |_| ExecutionResult::exited(0, stdout, ""))
    }

    /// Behaves like a working cscope install (see [`cscope_handler`])
    pub fn cscope(search_output: &'static str) -> Self {
        Self::new(move |req| cscope_handler(req, search_output))
    }

    /// Hold requests matching `matches` until [`MockRunner::release_gate`]
    pub fn with_gate(mut self, matches: fn(&ExecutionRequest) -> bool) -> Self {
        self.gate = Some(Gate {
            matches,
            entered: Notify::new(),
            release: Semaphore::new(0),
        });
        self
    }

    /// Wait until a gated request has arrived
    pub async fn wait_for_gate(&self) {
        let gate = self.gate.as_ref().expect("runner has no gate");
        gate.entered.notified().await;
    }

    /// Let one gated request finish
    pub fn release_gate(&self) {
        let gate = self.gate.as_ref().expect("runner has no gate");
        gate.release.add_permits(1);
    }

    pub fn calls(&self) -> Vec<ExecutionRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Rendered command lines, in call order
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.to_string()).collect()
    }

    /// Number of calls whose argv contains `arg`
    pub fn count_with_arg(&self, arg: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.args.iter().any(|a| a == arg))
            .count()
    }
}

impl ProcessRunner for MockRunner {
    async fn run(&self, request: &ExecutionRequest) -> ExecutionResult {
        self.calls.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            if (gate.matches)(request) {
                gate.entered.notify_one();
                let _permit = gate.release.acquire().await.expect("gate closed");
            }
        }

        (self.handler)(request)
    }
}

/// Simulated cscope + find:
/// - `cscope -V` prints a version banner on stderr
/// - `find <root> ...` lists `<root>/main.c` and `<root>/util.h`
/// - `cscope -b ...` writes `cscope.out` into the working directory
/// - any `-L<n>` query prints `search_output`
pub fn cscope_handler(request: &ExecutionRequest, search_output: &str) -> ExecutionResult {
    match request.program.as_str() {
        "cscope" if request.args == ["-V"] => {
            ExecutionResult::exited(0, "", "cscope: version 15.9\n")
        }
        "cscope" if request.args.iter().any(|a| a == "-b") => {
            if let Some(cwd) = &request.cwd {
                if let Err(e) = std::fs::write(cwd.join("cscope.out"), "cscope 15 index") {
                    return ExecutionResult::exited(1, "", e.to_string());
                }
            }
            ExecutionResult::exited(0, "", "")
        }
        "cscope" => ExecutionResult::exited(0, search_output, ""),
        "find" => {
            let root = request.args.first().cloned().unwrap_or_default();
            ExecutionResult::exited(0, format!("{root}/main.c\n{root}/util.h\n"), "")
        }
        other => ExecutionResult::failed(format!("No such file or directory: {other}")),
    }
}

/// Whether the request is an index build
pub fn is_build(request: &ExecutionRequest) -> bool {
    request.program == "cscope" && request.args.iter().any(|a| a == "-b")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Diag(String),
    Error(String),
    Notice(String),
    State(String),
}

/// Sink that keeps every event for assertions
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.collect(|e| match e {
            Event::Error(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn notices(&self) -> Vec<String> {
        self.collect(|e| match e {
            Event::Notice(m) => Some(m.clone()),
            _ => None,
        })
    }

    pub fn states(&self) -> Vec<String> {
        self.collect(|e| match e {
            Event::State(s) => Some(s.clone()),
            _ => None,
        })
    }

    fn collect(&self, f: impl Fn(&Event) -> Option<String>) -> Vec<String> {
        self.events.lock().unwrap().iter().filter_map(f).collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl OutputSink for RecordingSink {
    fn diag_log(&self, message: &str) {
        self.push(Event::Diag(message.to_string()));
    }

    fn error_to_user(&self, message: &str) {
        self.push(Event::Error(message.to_string()));
    }

    fn notify_user(&self, message: &str) {
        self.push(Event::Notice(message.to_string()));
    }

    fn update_state(&self, state: &str) {
        self.push(Event::State(state.to_string()));
    }
}

/// Create a source tree with a few C files under `root/src`
pub fn write_sources(root: &Path) -> PathBuf {
    let src = root.join("src");
    std::fs::create_dir_all(&src).expect("Failed to create src dir");
    std::fs::write(src.join("main.c"), "int main(void) { return helper(); }\n")
        .expect("Failed to write main.c");
    std::fs::write(src.join("util.h"), "int helper(void);\n").expect("Failed to write util.h");
    src
}
