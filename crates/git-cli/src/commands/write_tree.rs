use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use bstr::BString;
use clap::Args;
use git_object::{FileMode, Object, Tree, TreeEntry};
use git_odb::ObjectDatabase;

use crate::Cli;
use super::open_repo;

#[derive(Args)]
pub struct WriteTreeArgs {}

pub fn run(_args: &WriteTreeArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let cwd = std::env::current_dir()?;

    let oid = write_tree_for_dir(repo.odb(), &cwd)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", oid.to_hex())?;

    Ok(0)
}

/// Recursively builds and stores tree objects for a directory, returning
/// the OID of the tree for `dir` itself. `.git` is never descended into.
fn write_tree_for_dir(odb: &ObjectDatabase, dir: &Path) -> Result<git_hash::ObjectId> {
    let mut entries = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name == ".git" {
            continue;
        }

        let path = entry.path();
        let meta = std::fs::symlink_metadata(&path)?;

        if meta.file_type().is_symlink() {
            continue;
        }

        let (mode, oid) = if meta.is_dir() {
            let tree_oid = write_tree_for_dir(odb, &path)?;
            (FileMode::Tree, tree_oid)
        } else {
            let data = std::fs::read(&path)?;
            let executable = is_executable(&meta);
            let oid = odb.write(&Object::Blob(git_object::Blob { data }))?;
            (if executable { FileMode::Executable } else { FileMode::Regular }, oid)
        };

        entries.push(TreeEntry {
            mode,
            name: BString::from(name.to_string_lossy().into_owned()),
            oid,
        });
    }

    let mut tree = Tree { entries };
    tree.sort();
    let oid = odb.write(&Object::Tree(tree))?;
    Ok(oid)
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    false
}
