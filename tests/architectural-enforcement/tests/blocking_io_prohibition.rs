//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: Nothing on the event loop may block on the network.
//! **Required**: `reqwest` async client, no `block_on` inside the app.
//!
//! Small synchronous file access (identity file, config, log file) happens
//! before the UI starts and is allowed.

use architectural_enforcement::{production_lines, report};

const FORBIDDEN: &[(&str, &str)] = &[
    ("reqwest::blocking", "Blocking HTTP client"),
    ("std::net::", "Blocking network I/O"),
    ("block_on(", "Blocking on a future"),
    ("block_in_place(", "Blocking inside the runtime"),
];

#[test]
fn test_no_blocking_io_in_production_code() {
    let mut violations = Vec::new();

    for dir in ["core/src", "tui/src"] {
        for line in production_lines(dir) {
            if FORBIDDEN.iter().any(|(pattern, _)| line.code.contains(pattern)) {
                violations.push(line);
            }
        }
    }

    let hint = FORBIDDEN
        .iter()
        .map(|(pattern, what)| format!("  - {what}: {pattern}"))
        .collect::<Vec<_>>()
        .join("\n");

    report(
        "Blocking I/O calls found in production code!",
        &violations,
        &format!("FORBIDDEN:\n{hint}"),
    );
}
