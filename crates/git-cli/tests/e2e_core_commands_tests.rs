//! End-to-end tests for the plumbing commands this implementation supports:
//! init, hash-object, cat-file, write-tree, commit-tree, ls-tree, and clone.

mod common;
use common::*;

#[test]
fn test_init_creates_repository() {
    let dir = tempfile::tempdir().unwrap();
    let result = gitr(dir.path(), &["init"]);

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout.trim(), "Initialized git directory");
    assert!(dir.path().join(".git").is_dir());
    assert!(dir.path().join(".git/objects").is_dir());
    assert!(dir.path().join(".git/refs").is_dir());
}

#[test]
fn test_hash_object_and_cat_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    gitr(dir.path(), &["init"]);

    let file = dir.path().join("greeting.txt");
    std::fs::write(&file, "hello, world\n").unwrap();

    let hash = gitr(dir.path(), &["hash-object", "-w", "greeting.txt"]);
    assert_eq!(hash.exit_code, 0);
    let oid = hash.stdout.trim().to_string();
    assert_eq!(oid.len(), 40);

    let cat = gitr(dir.path(), &["cat-file", "-p", &oid]);
    assert_eq!(cat.exit_code, 0);
    assert_eq!(cat.stdout, "hello, world\n");

    let ty = gitr(dir.path(), &["cat-file", "-t", &oid]);
    assert_eq!(ty.stdout.trim(), "blob");

    let size = gitr(dir.path(), &["cat-file", "-s", &oid]);
    assert_eq!(size.stdout.trim(), "13");
}

#[test]
fn test_write_tree_and_ls_tree() {
    let dir = tempfile::tempdir().unwrap();
    gitr(dir.path(), &["init"]);

    std::fs::write(dir.path().join("a.txt"), "a\n").unwrap();
    std::fs::write(dir.path().join("b.txt"), "b\n").unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub/c.txt"), "c\n").unwrap();

    let tree = gitr(dir.path(), &["write-tree"]);
    assert_eq!(tree.exit_code, 0);
    let tree_oid = tree.stdout.trim().to_string();
    assert_eq!(tree_oid.len(), 40);

    let ls = gitr(dir.path(), &["ls-tree", &tree_oid]);
    assert_eq!(ls.exit_code, 0);
    assert!(ls.stdout.contains("blob"));
    assert!(ls.stdout.contains("a.txt"));
    assert!(ls.stdout.contains("b.txt"));
    assert!(ls.stdout.contains("tree"));
    assert!(ls.stdout.contains("sub"));

    let names = gitr(dir.path(), &["ls-tree", "--name-only", &tree_oid]);
    let mut lines: Vec<&str> = names.stdout.lines().collect();
    lines.sort();
    assert_eq!(lines, vec!["a.txt", "b.txt", "sub"]);
}

#[test]
fn test_commit_tree_produces_commit_object() {
    let dir = tempfile::tempdir().unwrap();
    gitr(dir.path(), &["init"]);

    std::fs::write(dir.path().join("file.txt"), "content\n").unwrap();
    let tree = gitr(dir.path(), &["write-tree"]);
    let tree_oid = tree.stdout.trim().to_string();

    let mut cmd = std::process::Command::new(gitr_bin());
    cmd.args(["commit-tree", &tree_oid, "-m", "initial commit"])
        .current_dir(dir.path())
        .env("GIT_AUTHOR_NAME", "Test Author")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_AUTHOR_DATE", "1234567890 +0000")
        .env("GIT_COMMITTER_NAME", "Test Committer")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_DATE", "1234567890 +0000");
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let commit_oid = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert_eq!(commit_oid.len(), 40);

    let cat = gitr(dir.path(), &["cat-file", "-p", &commit_oid]);
    assert!(cat.stdout.contains(&format!("tree {}", tree_oid)));
    assert!(cat.stdout.contains("initial commit"));
    assert!(!cat.stdout.contains("parent "));
}

#[test]
fn test_clone_local_repository() {
    let source = tempfile::tempdir().unwrap();
    setup_empty_repo(source.path());
    std::fs::write(source.path().join("readme.md"), "hello\n").unwrap();
    std::fs::create_dir(source.path().join("src")).unwrap();
    std::fs::write(source.path().join("src/main.rs"), "fn main() {}\n").unwrap();
    git(source.path(), &["add", "."]);
    git(source.path(), &["commit", "-m", "first commit"]);

    let parent = tempfile::tempdir().unwrap();
    let dest = parent.path().join("clone-dest");

    let result = gitr(
        parent.path(),
        &["clone", source.path().to_str().unwrap(), dest.to_str().unwrap()],
    );
    assert_eq!(result.exit_code, 0, "stderr: {}", result.stderr);

    assert_eq!(
        std::fs::read_to_string(dest.join("readme.md")).unwrap(),
        "hello\n"
    );
    assert_eq!(
        std::fs::read_to_string(dest.join("src/main.rs")).unwrap(),
        "fn main() {}\n"
    );

    let source_head = git(source.path(), &["rev-parse", "HEAD"]);
    let dest_head = git(&dest, &["rev-parse", "HEAD"]);
    assert_eq!(source_head.stdout, dest_head.stdout);
}
