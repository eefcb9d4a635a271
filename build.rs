use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_LINES: usize = 750;

const CHECKED_EXTENSIONS: &[&str] = &["rs", "yaml"];

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/main");
    println!("cargo:rerun-if-changed=.git/packed-refs");

    let sha = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout)
                    .ok()
                    .map(|s| s.trim().to_string())
            } else {
                None
            }
        })
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=WORKBOX_GIT_SHA={}", sha);

    enforce_line_limits();
}

/// Source files are capped at `MAX_LINES` non-empty lines.
fn enforce_line_limits() {
    let root = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));

    let mut files = Vec::new();
    walk_directory(&root.join("src"), &mut files);
    let config = root.join("workbox.yaml");
    if config.is_file() {
        files.push(config);
    }

    let mut violations = Vec::new();
    for file in &files {
        println!("cargo:rerun-if-changed={}", file.display());
        let rel_path = file.strip_prefix(&root).unwrap_or(file);
        match std::fs::read_to_string(file) {
            Ok(content) => {
                let line_count = count_non_empty_lines(&content);
                if line_count > MAX_LINES {
                    violations.push((rel_path.to_path_buf(), line_count));
                }
            }
            Err(e) => println!(
                "cargo:warning=Could not read file {}: {}",
                rel_path.display(),
                e
            ),
        }
    }

    if !violations.is_empty() {
        eprintln!("\nFILE LINE LIMIT EXCEEDED (max {} lines)", MAX_LINES);
        for (path, lines) in &violations {
            eprintln!("  {} - {} lines", path.display(), lines);
        }
        panic!(
            "Build failed: {} file(s) exceed the {} line limit",
            violations.len(),
            MAX_LINES
        );
    }
}

fn walk_directory(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_directory(&path, files);
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| CHECKED_EXTENSIONS.contains(&ext))
        {
            files.push(path);
        }
    }
}

fn count_non_empty_lines(content: &str) -> usize {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count()
}
