//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No sleeping in production code (the core polls with `tokio::time::interval`)
//! - No blocking network calls on the event loop
//! - `chat-core` stays free of terminal dependencies
//!
//! The helpers here walk the workspace sources and hand the tests every
//! production line, skipping comments and `#[cfg(test)]` modules.

use std::fs;
use std::path::{Path, PathBuf};

/// One line of production source
#[derive(Debug, Clone)]
pub struct SourceLine {
    pub path: PathBuf,
    pub number: usize,
    /// Code with any trailing `//` comment removed
    pub code: String,
}

impl std::fmt::Display for SourceLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.number, self.code.trim())
    }
}

/// Workspace root (two levels above this package)
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Every production line of every `.rs` file under `dir` (relative to the workspace root)
pub fn production_lines(dir: &str) -> Vec<SourceLine> {
    let root = workspace_root().join(dir);
    assert!(root.exists(), "source directory {} is missing", root.display());

    let mut lines = Vec::new();
    for entry in walkdir::WalkDir::new(&root)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let Ok(content) = fs::read_to_string(entry.path()) else {
            continue;
        };
        lines.extend(production_lines_of(entry.path(), &content));
    }
    lines
}

/// Production lines of one file
///
/// Test modules sit at the bottom of each file, so everything from the
/// first `#[cfg(test)]` on is skipped.
pub fn production_lines_of(path: &Path, content: &str) -> Vec<SourceLine> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .filter_map(|(idx, line)| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("//") {
                return None;
            }
            let code = strip_line_comment(line);
            Some(SourceLine {
                path: path.to_path_buf(),
                number: idx + 1,
                code: code.to_string(),
            })
        })
        .collect()
}

/// `line` without a trailing `//` comment
///
/// A `//` inside a string or char literal (a URL, say) is code, not a comment.
pub fn strip_line_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => return &line[..i],
            b'"' => i = skip_string(bytes, i + 1),
            b'r' if is_raw_string_start(bytes, i) => {
                let hashes = bytes[i + 1..].iter().take_while(|&&b| b == b'#').count();
                i = skip_raw_string(bytes, i + 2 + hashes, hashes);
            }
            b'\'' => i = skip_char_literal(bytes, i),
            _ => i += 1,
        }
    }
    line
}

/// Index just past the closing quote of a string whose body starts at `i`
fn skip_string(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn is_raw_string_start(bytes: &[u8], i: usize) -> bool {
    let ident_before = i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_');
    if ident_before {
        return false;
    }
    let rest = &bytes[i + 1..];
    let hashes = rest.iter().take_while(|&&b| b == b'#').count();
    rest.get(hashes) == Some(&b'"')
}

fn skip_raw_string(bytes: &[u8], mut i: usize, hashes: usize) -> usize {
    while i < bytes.len() {
        let closes = bytes[i + 1..].iter().take(hashes).filter(|&&b| b == b'#').count() == hashes;
        if bytes[i] == b'"' && closes {
            return i + 1 + hashes;
        }
        i += 1;
    }
    bytes.len()
}

/// Skip `'x'` or `'\x'`; a lifetime only skips its tick
fn skip_char_literal(bytes: &[u8], i: usize) -> usize {
    match (bytes.get(i + 1), bytes.get(i + 2)) {
        (Some(b'\\'), _) => bytes
            .get(i + 3..)
            .and_then(|rest| rest.iter().position(|&b| b == b'\''))
            .map_or(bytes.len(), |p| i + 4 + p),
        (Some(_), Some(b'\'')) => i + 3,
        _ => i + 1,
    }
}

/// Print violations and fail the test
pub fn report(title: &str, violations: &[SourceLine], hint: &str) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n{title}\n");
    for violation in violations {
        eprintln!("  {violation}");
    }
    eprintln!("\n{hint}");

    panic!(
        "\nFound {} violation(s) in production code.\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_and_test_modules_are_skipped() {
        let source = "\
use std::time::Duration;
// std::thread::sleep in a comment
let x = 1; // trailing std::thread::sleep
#[cfg(test)]
mod tests {
    fn f() { std::thread::sleep(Duration::ZERO); }
}
";
        let lines = production_lines_of(Path::new("x.rs"), source);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| !l.code.contains("sleep")));
        assert_eq!(lines[1].number, 3);
    }

    #[test]
    fn test_comment_markers_inside_literals_are_code() {
        let source = r#"let url = "http://x"; std::thread::sleep(d); // done
let raw = r"a//b"; std::thread::sleep(d);
let slash = '/'; let esc = '\''; std::thread::sleep(d); // c
fn f<'a>(s: &'a str) {} // std::thread::sleep
"#;
        let lines = production_lines_of(Path::new("x.rs"), source);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].code.contains("std::thread::sleep(d);"));
        assert!(!lines[0].code.contains("done"));
        assert!(lines[1].code.contains("std::thread::sleep(d);"));
        assert!(lines[2].code.contains("std::thread::sleep(d);"));
        assert!(!lines[2].code.contains("// c"));
        assert!(!lines[3].code.contains("sleep"));
    }

    #[test]
    fn test_escaped_quote_keeps_string_open() {
        assert_eq!(
            strip_line_comment(r#"let s = "a\"//b"; // note"#),
            r#"let s = "a\"//b"; "#
        );
    }
}
