//! Executor tests
//!
//! Full build and search flows against a simulated cscope, the busy flag,
//! and the distinct "tool missing" / "no database" reports.

#![cfg(unix)]

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{cscope_handler, is_build, write_sources, MockRunner, RecordingSink};
use navscope::executor::state;
use navscope::{ExecutionResult, Executor, Readiness, Settings};
use tempfile::TempDir;

const SEARCH_OUTPUT: &str = "src/main.c main 1 int main(void) { return helper(); }\n\
                             src/util.h <global> 1 int helper(void);\n";

/// Settings with `root/src` as the only source root and `root/.navscope` as database
fn settings(root: &Path) -> Settings {
    let src = write_sources(root);
    let mut settings = Settings::for_root(root);
    settings.source_paths = vec![src];
    settings
}

fn executor(
    settings: Settings,
    runner: &Arc<MockRunner>,
    sink: &Arc<RecordingSink>,
) -> Executor<Arc<MockRunner>> {
    Executor::new(settings, Arc::clone(runner), sink.clone())
}

/// Pretend a previous build left an index behind
fn fake_index(settings: &Settings) {
    std::fs::create_dir_all(&settings.database_path).unwrap();
    std::fs::write(settings.database_path.join("cscope.out"), "index").unwrap();
}

// ===== Build =====

#[tokio::test]
async fn test_build_creates_file_list_and_index() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path());
    let db = settings.database_path.clone();
    let runner = Arc::new(MockRunner::cscope(""));
    let sink = RecordingSink::new();
    let executor = executor(settings, &runner, &sink);

    assert!(!db.exists());
    assert!(executor.build_database().await);

    let files = std::fs::read_to_string(db.join("cscope.files")).unwrap();
    assert_eq!(files.lines().count(), 2);
    assert!(files.contains("main.c"));
    assert!(db.join("cscope.out").exists());

    let programs: Vec<String> = runner.calls().iter().map(|c| c.program.clone()).collect();
    assert_eq!(programs, vec!["cscope", "find", "cscope"]);
    assert_eq!(runner.command_lines()[2], "cscope -b -q -k");

    assert!(sink.errors().is_empty());
    assert!(sink.notices().iter().any(|n| n.starts_with("Database built")));
    assert_eq!(sink.states(), vec![state::BUILDING, state::READY]);
    assert!(!executor.is_busy());
    assert!(executor.database_ready());
}

#[tokio::test]
async fn test_build_applies_configured_exclusions() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings(dir.path());
    settings.excluded_paths = vec![".*\\.h".to_string()];
    let db = settings.database_path.clone();
    let runner = Arc::new(MockRunner::cscope(""));
    let sink = RecordingSink::new();

    assert!(executor(settings, &runner, &sink).build_database().await);
    let files = std::fs::read_to_string(db.join("cscope.files")).unwrap();
    assert!(files.ends_with("main.c\n"));
    assert!(!files.contains("util.h"));
}

#[tokio::test]
async fn test_second_build_while_busy_is_rejected() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::cscope("").with_gate(is_build));
    let sink = RecordingSink::new();
    let executor = executor(settings(dir.path()), &runner, &sink);

    let (first, second) = tokio::join!(executor.build_database(), async {
        runner.wait_for_gate().await;
        assert!(executor.is_busy());
        let second = executor.build_database().await;
        runner.release_gate();
        second
    });

    assert!(first);
    assert!(!second);
    assert_eq!(runner.count_with_arg("-b"), 1);
    assert!(sink.notices().iter().any(|n| n.contains("busy")));
    assert!(!executor.is_busy());
}

#[tokio::test]
async fn test_failed_build_reports_stderr_and_clears_busy() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new(|req| {
        if req.program == "find" {
            ExecutionResult::exited(1, "", "find: permission denied\n")
        } else {
            cscope_handler(req, "")
        }
    }));
    let sink = RecordingSink::new();
    let executor = executor(settings(dir.path()), &runner, &sink);

    assert!(!executor.build_database().await);
    assert!(!executor.is_busy());
    assert_eq!(runner.count_with_arg("-b"), 0);
    let errors = sink.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("permission denied"));
    assert_eq!(sink.states().last().map(String::as_str), Some(state::BUILD_FAILED));

    // Not stuck: a retry runs the pipeline again
    assert!(!executor.build_database().await);
    assert_eq!(runner.calls().iter().filter(|c| c.program == "find").count(), 2);
}

#[tokio::test]
async fn test_build_without_tool_stops_before_listing() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new(|_| ExecutionResult::failed("No such file or directory")));
    let sink = RecordingSink::new();
    let executor = executor(settings(dir.path()), &runner, &sink);

    assert!(!executor.build_database().await);
    assert_eq!(runner.command_lines(), vec!["cscope -V"]);
    assert!(sink.errors()[0].contains("not found"));
}

#[tokio::test]
async fn test_disabled_executor_refuses_work() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings(dir.path());
    settings.enabled = false;
    let runner = Arc::new(MockRunner::cscope(SEARCH_OUTPUT));
    let sink = RecordingSink::new();
    let executor = executor(settings, &runner, &sink);

    assert!(!executor.build_database().await);
    assert!(executor.find_definition("main").await.is_empty());
    assert_eq!(executor.readiness().await, Readiness::Disabled);
    assert!(runner.calls().is_empty());
    assert!(sink.states().iter().all(|s| s == state::DISABLED));
}

#[tokio::test]
async fn test_print_cmd_echoes_commands() {
    let dir = TempDir::new().unwrap();
    let mut settings = settings(dir.path());
    settings.print_cmd = true;
    let runner = Arc::new(MockRunner::cscope(""));
    let sink = RecordingSink::new();

    assert!(executor(settings, &runner, &sink).build_database().await);
    let notices = sink.notices();
    assert!(notices.iter().any(|n| n.starts_with("find ")));
    assert!(notices.iter().any(|n| n == "cscope -b -q -k"));
}

// ===== Verify =====

#[tokio::test]
async fn test_verify_reports_missing_tool() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::new(|_| ExecutionResult::failed("No such file or directory")));
    let sink = RecordingSink::new();
    let executor = executor(settings(dir.path()), &runner, &sink);

    assert!(!executor.check_tool().await);
    assert!(!executor.verify().await);
    assert!(sink.errors()[0].contains("cscope not found"));
    assert_eq!(sink.states(), vec![state::TOOL_MISSING]);
}

#[tokio::test]
async fn test_verify_reports_missing_database() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::cscope(""));
    let sink = RecordingSink::new();
    let executor = executor(settings(dir.path()), &runner, &sink);

    assert!(executor.check_tool().await);
    assert!(!executor.database_ready());
    assert!(!executor.verify().await);
    assert!(sink.errors()[0].contains("No cscope database"));
    assert_eq!(sink.states(), vec![state::NO_DATABASE]);
}

#[tokio::test]
async fn test_verify_passes_with_index() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path());
    fake_index(&settings);
    let runner = Arc::new(MockRunner::cscope(""));
    let sink = RecordingSink::new();
    let executor = executor(settings, &runner, &sink);

    assert_eq!(executor.readiness().await, Readiness::Ready);
    assert!(executor.verify().await);
    assert!(sink.errors().is_empty());
}

// ===== Search =====

#[tokio::test]
async fn test_search_without_database_never_runs_query() {
    let dir = TempDir::new().unwrap();
    let runner = Arc::new(MockRunner::cscope(SEARCH_OUTPUT));
    let sink = RecordingSink::new();
    let executor = executor(settings(dir.path()), &runner, &sink);

    assert!(executor.find_references("helper").await.is_empty());
    assert_eq!(runner.command_lines(), vec!["cscope -V"]);
}

#[tokio::test]
async fn test_search_parses_locations() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path());
    fake_index(&settings);
    let db = settings.database_path.clone();
    let runner = Arc::new(MockRunner::cscope(SEARCH_OUTPUT));
    let sink = RecordingSink::new();
    let executor = executor(settings, &runner, &sink);

    let locations = executor.find_callers("helper").await;
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0].file, "src/main.c");
    assert_eq!(locations[0].line, 1);
    assert_eq!(locations[0].text, "main int main(void) { return helper(); }");
    assert_eq!(locations[1].text, "<global> int helper(void);");

    let query = runner.calls().pop().unwrap();
    assert_eq!(query.to_string(), "cscope -q -k -L3 helper");
    assert_eq!(query.cwd.as_deref(), Some(db.as_path()));
    assert_eq!(
        sink.states(),
        vec![state::SEARCHING, state::READY]
    );
}

#[tokio::test]
async fn test_every_find_uses_its_operation() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path());
    fake_index(&settings);
    let runner = Arc::new(MockRunner::cscope(SEARCH_OUTPUT));
    let sink = RecordingSink::new();
    let executor = executor(settings, &runner, &sink);

    assert_eq!(executor.find_references("s").await.len(), 2);
    assert_eq!(executor.find_definition("s").await.len(), 2);
    assert_eq!(executor.find_callees("s").await.len(), 2);
    assert_eq!(executor.find_callers("s").await.len(), 2);
    assert_eq!(executor.find_text("s").await.len(), 2);
    assert_eq!(executor.find_pattern("s").await.len(), 2);
    assert_eq!(executor.find_file("s").await.len(), 2);
    assert_eq!(executor.find_includers("s").await.len(), 2);

    for flag in ["-L0", "-L1", "-L2", "-L3", "-L4", "-L6", "-L7", "-L8"] {
        assert_eq!(runner.count_with_arg(flag), 1, "{flag}");
    }
}

#[tokio::test]
async fn test_failed_search_returns_empty_and_reports() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path());
    fake_index(&settings);
    let runner = Arc::new(MockRunner::new(|req| {
        if req.args.iter().any(|a| a.starts_with("-L")) {
            ExecutionResult::exited(1, "", "cscope: cannot read cscope.out\n")
        } else {
            cscope_handler(req, "")
        }
    }));
    let sink = RecordingSink::new();
    let executor = executor(settings, &runner, &sink);

    assert!(executor.find_definition("main").await.is_empty());
    let errors = sink.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("cannot read cscope.out"));
    assert!(!executor.is_busy());
}

#[tokio::test]
async fn test_search_during_build_is_rejected() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path());
    fake_index(&settings);
    let runner = Arc::new(MockRunner::cscope(SEARCH_OUTPUT).with_gate(is_build));
    let sink = RecordingSink::new();
    let executor = executor(settings, &runner, &sink);

    let (built, found) = tokio::join!(executor.build_database(), async {
        runner.wait_for_gate().await;
        // verify() still works while the build holds the engine
        let found = executor.find_definition("main").await;
        runner.release_gate();
        found
    });

    assert!(built);
    assert!(found.is_empty());
    assert_eq!(runner.count_with_arg("-L1"), 0);
    assert!(sink.notices().iter().any(|n| n.contains("busy")));
}

#[tokio::test]
async fn test_no_results_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path());
    fake_index(&settings);
    let runner = Arc::new(MockRunner::cscope(""));
    let sink = RecordingSink::new();
    let executor = executor(settings, &runner, &sink);

    assert!(executor.find_file("missing.c").await.is_empty());
    assert!(sink.errors().is_empty());
}
