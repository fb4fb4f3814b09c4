//! Shared test harness for git-cli integration tests.
//!
//! Provides process runners, assertion helpers, and repo setup utilities
//! used by all test files. Environment variables are fully pinned for
//! deterministic output across machines and CI runners.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

// ──────────────────────────── Types ────────────────────────────

/// Captured output from running a command.
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

// ──────────────────────────── Binary Discovery ────────────────────────────

/// Discover the path to the compiled `gitr` binary.
pub fn gitr_bin() -> PathBuf {
    let mut path = std::env::current_exe()
        .unwrap()
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf();
    path.push("gitr");
    path
}

// ──────────────────────────── Process Runners ────────────────────────────

/// Apply the full set of pinned environment variables to a `Command`.
fn pin_env(cmd: &mut Command, dir: &Path) {
    cmd.env("GIT_AUTHOR_NAME", "Test Author")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_AUTHOR_DATE", "1234567890 +0000")
        .env("GIT_COMMITTER_NAME", "Test Committer")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_DATE", "1234567890 +0000")
        .env("TZ", "UTC")
        .env("LC_ALL", "C")
        .env("LANG", "C")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("HOME", dir.parent().unwrap_or(dir))
        .env("GIT_PROTOCOL_FROM_USER", "0")
        .env("GIT_CONFIG_COUNT", "1")
        .env("GIT_CONFIG_KEY_0", "protocol.file.allow")
        .env("GIT_CONFIG_VALUE_0", "always");
}

/// Run C git in `dir` with the given arguments. Returns a `CommandResult`.
pub fn git(dir: &Path, args: &[&str]) -> CommandResult {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(dir);
    pin_env(&mut cmd, dir);
    let output = cmd.output().expect("failed to run git");
    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(128),
    }
}

/// Run the gitr binary in `dir` with the given arguments. Returns a `CommandResult`.
pub fn gitr(dir: &Path, args: &[&str]) -> CommandResult {
    let mut cmd = Command::new(gitr_bin());
    cmd.args(args).current_dir(dir);
    pin_env(&mut cmd, dir);
    let output = cmd.output().expect("failed to run gitr");
    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(128),
    }
}

/// Run C git with a specific date override (for multi-commit scenarios).
pub fn git_with_date(dir: &Path, args: &[&str], epoch: &str) -> CommandResult {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(dir);
    pin_env(&mut cmd, dir);
    cmd.env("GIT_AUTHOR_DATE", epoch)
        .env("GIT_COMMITTER_DATE", epoch);
    let output = cmd.output().expect("failed to run git");
    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(128),
    }
}

/// Run gitr with a specific date override (for multi-commit scenarios).
pub fn gitr_with_date(dir: &Path, args: &[&str], epoch: &str) -> CommandResult {
    let mut cmd = Command::new(gitr_bin());
    cmd.args(args).current_dir(dir);
    pin_env(&mut cmd, dir);
    cmd.env("GIT_AUTHOR_DATE", epoch)
        .env("GIT_COMMITTER_DATE", epoch);
    let output = cmd.output().expect("failed to run gitr");
    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(128),
    }
}

/// Generate a deterministic date string. Returns `"(1234567890 + counter) +0000"`.
pub fn next_date(counter: &mut u64) -> String {
    *counter += 1;
    format!("{} +0000", 1234567890u64 + *counter)
}

// ──────────────────────────── Assertion Helpers ────────────────────────────

/// Assert that stdout and exit_code are identical between git and gitr results.
pub fn assert_output_eq(git_result: &CommandResult, gitr_result: &CommandResult) {
    if git_result.exit_code != gitr_result.exit_code {
        panic!(
            "Exit code mismatch:\n  git:  {}\n  gitr: {}\n\ngit stdout:\n{}\ngitr stdout:\n{}\ngit stderr:\n{}\ngitr stderr:\n{}",
            git_result.exit_code, gitr_result.exit_code,
            git_result.stdout, gitr_result.stdout,
            git_result.stderr, gitr_result.stderr,
        );
    }
    if git_result.stdout != gitr_result.stdout {
        panic!(
            "Stdout mismatch (exit codes both {}):\n--- git ---\n{}\n--- gitr ---\n{}\n--- end ---",
            git_result.exit_code, git_result.stdout, gitr_result.stdout,
        );
    }
}

/// Assert that only exit codes match.
pub fn assert_exit_code_eq(git_result: &CommandResult, gitr_result: &CommandResult) {
    if git_result.exit_code != gitr_result.exit_code {
        panic!(
            "Exit code mismatch:\n  git:  {} (stdout: {:?})\n  gitr: {} (stdout: {:?})",
            git_result.exit_code,
            git_result.stdout.chars().take(200).collect::<String>(),
            gitr_result.exit_code,
            gitr_result.stdout.chars().take(200).collect::<String>(),
        );
    }
}

/// Compare two repository directories for equivalent state:
/// HEAD ref, all refs under refs/, and the set of loose object IDs.
pub fn assert_repo_state_eq(dir_a: &Path, dir_b: &Path) {
    let head_a = std::fs::read_to_string(dir_a.join(".git/HEAD"))
        .unwrap_or_else(|_| String::from("(no HEAD)"));
    let head_b = std::fs::read_to_string(dir_b.join(".git/HEAD"))
        .unwrap_or_else(|_| String::from("(no HEAD)"));
    if head_a != head_b {
        panic!(
            "HEAD divergence:\n  dir_a: {:?}\n  dir_b: {:?}",
            head_a.trim(),
            head_b.trim(),
        );
    }

    let refs_a = collect_refs(dir_a);
    let refs_b = collect_refs(dir_b);
    if refs_a != refs_b {
        panic!(
            "Refs divergence:\n  dir_a refs: {:?}\n  dir_b refs: {:?}",
            refs_a, refs_b,
        );
    }

    let objs_a = collect_loose_objects(dir_a);
    let objs_b = collect_loose_objects(dir_b);
    if objs_a != objs_b {
        let only_a: Vec<_> = objs_a.iter().filter(|o| !objs_b.contains(o)).collect();
        let only_b: Vec<_> = objs_b.iter().filter(|o| !objs_a.contains(o)).collect();
        panic!(
            "Object set divergence:\n  only in dir_a: {:?}\n  only in dir_b: {:?}",
            only_a, only_b,
        );
    }
}

/// Recursively collect all refs under `.git/refs/` as `(refname, oid)` pairs.
fn collect_refs(dir: &Path) -> Vec<(String, String)> {
    let refs_dir = dir.join(".git/refs");
    let mut refs = Vec::new();
    if refs_dir.exists() {
        collect_refs_recursive(&refs_dir, &refs_dir, &mut refs);
    }
    refs.sort();
    refs
}

fn collect_refs_recursive(base: &Path, current: &Path, refs: &mut Vec<(String, String)>) {
    if let Ok(entries) = std::fs::read_dir(current) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_refs_recursive(base, &path, refs);
            } else if path.is_file() {
                let rel = path.strip_prefix(base).unwrap().to_string_lossy().to_string();
                let content = std::fs::read_to_string(&path)
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                refs.push((rel, content));
            }
        }
    }
}

/// Collect loose object IDs from `.git/objects/` (excluding `info/` and `pack/`).
fn collect_loose_objects(dir: &Path) -> Vec<String> {
    let objects_dir = dir.join(".git/objects");
    let mut oids = Vec::new();
    if let Ok(entries) = std::fs::read_dir(&objects_dir) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name == "info" || name == "pack" {
                continue;
            }
            if entry.path().is_dir() && name.len() == 2 {
                if let Ok(sub_entries) = std::fs::read_dir(entry.path()) {
                    for sub in sub_entries.flatten() {
                        let sub_name = sub.file_name().to_string_lossy().to_string();
                        oids.push(format!("{}{}", name, sub_name));
                    }
                }
            }
        }
    }
    oids.sort();
    oids
}

// ──────────────────────────── Repo Setup Helpers ────────────────────────────

/// Initialize an empty repo with `git init -b main` and basic config. No commits.
pub fn setup_empty_repo(dir: &Path) {
    git(dir, &["init", "-b", "main"]);
    git(dir, &["config", "user.name", "Test Author"]);
    git(dir, &["config", "user.email", "test@example.com"]);
}

/// Create a repo with `n` sequential commits, each adding/modifying a file.
/// Uses deterministic content and incrementing dates.
pub fn setup_linear_history(dir: &Path, n: usize) {
    setup_empty_repo(dir);
    let mut counter = 0u64;
    for i in 0..n {
        let filename = format!("file_{}.txt", i);
        let content = format!("content for commit {}\n", i);
        std::fs::write(dir.join(&filename), &content).unwrap();
        let date = next_date(&mut counter);
        git_with_date(dir, &["add", &filename], &date);
        git_with_date(dir, &["commit", "-m", &format!("commit {}", i)], &date);
    }
}
