//! External process execution
//!
//! [`ProcessRunner`] is the seam between the search engine and the OS. The
//! tokio implementation spawns the program, drains stdout and stderr
//! concurrently, and waits for exit. It never returns an error: a program that
//! cannot be launched becomes an [`ExecutionResult`] with `success == false`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};

/// A fully resolved command line, ready to spawn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Program name or path (argv0)
    pub program: String,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Working directory for the child
    pub cwd: Option<PathBuf>,
    /// Extra environment variables layered over the inherited environment
    pub env: Option<BTreeMap<String, String>>,
}

impl ExecutionRequest {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: None,
            env: None,
        }
    }

    /// Set (or clear) the working directory
    pub fn with_cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }
}

impl fmt::Display for ExecutionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Outcome of one external command
///
/// `success` only says the process was launched and ran to completion.
/// Use [`ExecutionResult::is_ok`] for "launched and exited 0".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    /// Process ran and exited with `code`
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: true,
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Transport failure: nothing ran. Exit code stays 0.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: 0,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Logical success: launched AND exited 0
    pub fn is_ok(&self) -> bool {
        self.success && self.code == 0
    }
}

/// Runs external commands
///
/// Implementations must resolve for every request; failures are reported
/// through the returned [`ExecutionResult`], never by panicking.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, request: &ExecutionRequest) -> impl Future<Output = ExecutionResult> + Send;
}

impl<R: ProcessRunner> ProcessRunner for Arc<R> {
    fn run(&self, request: &ExecutionRequest) -> impl Future<Output = ExecutionResult> + Send {
        R::run(self.as_ref(), request)
    }
}

/// Default runner backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

impl ProcessRunner for TokioRunner {
    async fn run(&self, request: &ExecutionRequest) -> ExecutionResult {
        let spawned = {
            let mut command = tokio::process::Command::new(&request.program);
            command
                .args(&request.args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            if let Some(cwd) = &request.cwd {
                command.current_dir(cwd);
            }
            if let Some(env) = &request.env {
                command.envs(env);
            }
            command.spawn()
        };

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(program = %request.program, error = %e, "Failed to spawn command");
                return ExecutionResult::failed(e.to_string());
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdout, stderr, status) = tokio::join!(drain(stdout), drain(stderr), child.wait());

        match status {
            Ok(status) => {
                // Killed by a signal: no exit code
                let code = status.code().unwrap_or(-1);
                tracing::debug!(program = %request.program, code, "Command exited");
                ExecutionResult::exited(code, stdout, stderr)
            }
            Err(e) => {
                tracing::warn!(program = %request.program, error = %e, "Failed to wait for command");
                ExecutionResult {
                    success: false,
                    code: 0,
                    stdout,
                    stderr: e.to_string(),
                }
            }
        }
    }
}

/// Read a child stream to EOF, decoding once at the end so multi-byte
/// characters split across reads survive.
async fn drain<S: AsyncRead + Unpin>(stream: Option<S>) -> String {
    let Some(mut stream) = stream else {
        return String::new();
    };
    let mut buf = Vec::new();
    if let Err(e) = stream.read_to_end(&mut buf).await {
        tracing::debug!(error = %e, "Error reading child output");
    }
    String::from_utf8_lossy(&buf).into_owned()
}
