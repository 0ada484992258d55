//! Integration Test: Layering
//!
//! `chat-core` is headless. Terminal crates belong to `chat-tui` only, and
//! the core never reaches back into the surface.

use std::fs;

use architectural_enforcement::{production_lines, report, workspace_root};

#[test]
fn test_core_sources_have_no_terminal_imports() {
    let violations: Vec<_> = production_lines("core/src")
        .into_iter()
        .filter(|line| {
            ["ratatui", "crossterm", "chat_tui"]
                .iter()
                .any(|name| line.code.contains(&format!("{name}::")))
        })
        .collect();

    report(
        "chat-core imports terminal code!",
        &violations,
        "Move drawing and key handling into chat-tui.",
    );
}

#[test]
fn test_core_manifest_has_no_terminal_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("core/Cargo.toml")).unwrap();

    for name in ["ratatui", "crossterm", "chat-tui"] {
        assert!(
            !manifest.lines().any(|l| l.trim_start().starts_with(name)),
            "core/Cargo.toml depends on {name}"
        );
    }
}
