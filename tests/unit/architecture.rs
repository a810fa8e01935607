//! Structural tests for layer boundaries.
//!
//! These tests scan source files so a stray import fails the build early
//! instead of surfacing as a tangled dependency later.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Track brace depth and report whether a line sits inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Non-comment lines outside `#[cfg(test)]` blocks, with their 1-based numbers.
fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut tracker = CfgTestTracker::new();
    content
        .lines()
        .enumerate()
        .filter(|(_, l)| !tracker.process_line(l))
        .filter(|(_, l)| {
            let t = l.trim();
            !t.starts_with("//") && !t.starts_with("/*") && !t.starts_with('*')
        })
        .map(|(i, l)| (i + 1, l.to_string()))
        .collect()
}

/// Every production line under `src/<layer>` containing one of `needles`.
fn violations(layer: &str, needles: &[&str]) -> Vec<String> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut found = Vec::new();
    for file in collect_rs_files(&root.join("src").join(layer)) {
        let rel = file.strip_prefix(root).unwrap_or(&file).display().to_string();
        for (n, line) in production_lines(&file) {
            if needles.iter().any(|needle| line.contains(needle)) {
                found.push(format!("{rel}:{n}: {}", line.trim()));
            }
        }
    }
    found
}

#[test]
fn domain_performs_no_io() {
    let found = violations(
        "domain",
        &[
            "crate::infra",
            "crate::application",
            "crate::output",
            "tokio",
            "std::fs",
            "std::process",
            "std::net",
            "reqwest",
        ],
    );
    assert!(found.is_empty(), "domain must stay pure:\n{}", found.join("\n"));
}

#[test]
fn application_depends_only_on_domain() {
    let found = violations(
        "application",
        &["crate::infra", "crate::output", "crate::cli", "crate::app::"],
    );
    assert!(
        found.is_empty(),
        "application must reach I/O through ports:\n{}",
        found.join("\n")
    );
}

#[test]
fn no_concrete_adapters_in_application() {
    let found = violations(
        "application",
        &[
            "DigitalOceanClient",
            "LocalKeyStore",
            "SshTunnelManager",
            "SshKeygenTrustStore",
            "TokioNetworkProbe",
            "TokioCommandRunner",
        ],
    );
    assert!(found.is_empty(), "{}", found.join("\n"));
}

#[test]
fn infra_does_not_render_output() {
    let found = violations(
        "infra",
        &["crate::output", "crate::cli", "println!", "eprintln!"],
    );
    assert!(
        found.is_empty(),
        "infra reports through tracing, not the terminal:\n{}",
        found.join("\n")
    );
}
