//! Integration tests for change detection against real git repositories.
//!
//! Each test builds a throwaway repository with the `git` CLI and returns
//! early when git is not installed.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use code_atlas::{ChangeDetector, DiffRequest, DiffSource, GitCli};

// ============================================================================
// Test Helpers
// ============================================================================

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Atlas Test", "-c", "user.email=atlas@example.com"])
        .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn write_file(dir: &Path, path: &str, content: &str) {
    let full = dir.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(full, content).unwrap();
}

fn commit_all(dir: &Path, message: &str) -> String {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

/// Repository with two commits: the root adds three files, the second
/// modifies one, deletes one, and adds one.
fn create_history() -> (TempDir, String, String) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    git(dir, &["init", "-q"]);

    write_file(dir, "lib/util.go", "package lib\n");
    write_file(dir, "lib/main.go", "package main\n");
    write_file(dir, "old.py", "x = 1\n");
    let first = commit_all(dir, "initial");

    write_file(dir, "lib/util.go", "package lib\n\nfunc Util() {}\n");
    fs::remove_file(dir.join("old.py")).unwrap();
    write_file(dir, "new.py", "import os\n");
    let second = commit_all(dir, "second");

    (temp_dir, first, second)
}

fn detector(dir: &Path) -> ChangeDetector {
    ChangeDetector::new(Arc::new(GitCli::new(dir)))
}

fn paths(set: &code_atlas::ChangeSet) -> Vec<&str> {
    let mut paths: Vec<&str> = set.iter().collect();
    paths.sort();
    paths
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_push_without_before_diffs_against_parent() {
    if !git_available() {
        return;
    }
    let (repo, _, second) = create_history();

    let set = detector(repo.path())
        .changed_files(&DiffRequest::push(second, None))
        .await
        .unwrap();

    assert_eq!(paths(&set), vec!["lib/util.go", "new.py"]);
}

#[tokio::test]
async fn test_null_before_is_treated_as_parent() {
    if !git_available() {
        return;
    }
    let (repo, _, _) = create_history();

    let request = DiffRequest::push("HEAD", Some("0".repeat(40)));
    let set = detector(repo.path()).changed_files(&request).await.unwrap();

    assert_eq!(paths(&set), vec!["lib/util.go", "new.py"]);
}

#[tokio::test]
async fn test_root_commit_reports_all_files() {
    if !git_available() {
        return;
    }
    let (repo, first, _) = create_history();

    let set = detector(repo.path())
        .changed_files(&DiffRequest::push(first, None))
        .await
        .unwrap();

    assert_eq!(paths(&set), vec!["lib/main.go", "lib/util.go", "old.py"]);
}

#[tokio::test]
async fn test_pull_request_range() {
    if !git_available() {
        return;
    }
    let (repo, first, _) = create_history();
    let dir = repo.path();
    git(dir, &["checkout", "-q", "-b", "feature"]);
    write_file(dir, "lib/main.go", "package main\n\nfunc main() {}\n");
    commit_all(dir, "feature work");

    let request = DiffRequest::pull_request(first, "feature");
    let set = detector(dir).changed_files(&request).await.unwrap();

    assert_eq!(paths(&set), vec!["lib/main.go", "lib/util.go", "new.py"]);
}

#[tokio::test]
async fn test_rename_reports_new_path() {
    if !git_available() {
        return;
    }
    let (repo, _, _) = create_history();
    let dir = repo.path();
    fs::create_dir_all(dir.join("cmd")).unwrap();
    git(dir, &["mv", "lib/main.go", "cmd/main.go"]);
    let head = commit_all(dir, "move main");

    let set = detector(dir)
        .changed_files(&DiffRequest::push(head, None))
        .await
        .unwrap();

    assert_eq!(paths(&set), vec!["cmd/main.go"]);
}

#[tokio::test]
async fn test_invalid_head_is_diff_unavailable() {
    if !git_available() {
        return;
    }
    let (repo, _, _) = create_history();

    let err = detector(repo.path())
        .changed_files(&DiffRequest::push("does-not-exist", None))
        .await
        .unwrap_err();

    assert!(err.is_diff_unavailable(), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_invalid_base_is_diff_unavailable() {
    if !git_available() {
        return;
    }
    let (repo, _, second) = create_history();

    let err = detector(repo.path())
        .changed_files(&DiffRequest::pull_request("no-such-branch", second))
        .await
        .unwrap_err();

    assert!(err.is_diff_unavailable());
}

#[tokio::test]
async fn test_not_a_repository_is_diff_unavailable() {
    if !git_available() {
        return;
    }
    let temp_dir = TempDir::new().unwrap();
    // A dangling `.git` pointer makes every git command fail.
    let dir = temp_dir.path().join("plain");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(".git"), "gitdir: /nonexistent\n").unwrap();

    let err = detector(&dir)
        .changed_files(&DiffRequest::push("HEAD", None))
        .await
        .unwrap_err();

    assert!(err.is_diff_unavailable());
}

#[tokio::test]
async fn test_git_cli_diff_source_directly() {
    if !git_available() {
        return;
    }
    let (repo, first, second) = create_history();

    let changes = GitCli::new(repo.path()).diff(Some(first.as_str()), &second).await.unwrap();
    let mut statuses: Vec<(String, &str)> = changes
        .iter()
        .map(|c| (c.path.clone(), c.status.as_str()))
        .collect();
    statuses.sort();

    assert_eq!(
        statuses,
        vec![
            ("lib/util.go".to_string(), "modified"),
            ("new.py".to_string(), "added"),
            ("old.py".to_string(), "deleted"),
        ]
    );
}

#[cfg(unix)]
#[test]
fn test_timed_out_git_command_is_abandoned() {
    if !git_available() {
        return;
    }
    let (repo, _, _) = create_history();
    let git_cli = GitCli::new(repo.path());

    let started = Instant::now();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let result = runtime.block_on(async {
        tokio::time::timeout(
            Duration::from_millis(200),
            git_cli.run_command(&["-c", "alias.nap=!sleep 5", "nap"]),
        )
        .await
    });
    drop(runtime);

    assert!(result.is_err(), "git finished before the timeout");
    assert!(
        started.elapsed() < Duration::from_secs(4),
        "shutdown took {:?}",
        started.elapsed()
    );
}
