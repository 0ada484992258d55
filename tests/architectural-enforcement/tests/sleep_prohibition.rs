//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT sleep to wait for things.
//! **Exceptions**: The TUI frame tick (`tokio::time::sleep` inside `select!`).
//! Periodic work in the core uses `tokio::time::interval`.

use architectural_enforcement::{production_lines, report, SourceLine};

fn blocking_sleeps(dir: &str) -> Vec<SourceLine> {
    production_lines(dir)
        .into_iter()
        .filter(|line| line.code.contains("thread::sleep"))
        .collect()
}

#[test]
fn test_no_thread_sleep_anywhere() {
    let mut violations = blocking_sleeps("core/src");
    violations.extend(blocking_sleeps("tui/src"));

    report(
        "Blocking sleep calls found in production code!",
        &violations,
        "Use tokio::time::interval for periodic work and await events instead of sleeping.",
    );
}

#[test]
fn test_core_does_not_sleep() {
    let violations: Vec<_> = production_lines("core/src")
        .into_iter()
        .filter(|line| line.code.contains("time::sleep"))
        .collect();

    report(
        "Sleep calls found in chat-core!",
        &violations,
        "The core is event driven: poll ticks come from PollTimer, completions from spawned tasks.",
    );
}
