use std::io::{self, Write};

use anyhow::{bail, Result};
use bstr::ByteSlice;
use clap::Args;
use git_hash::ObjectId;

use crate::Cli;
use super::open_repo;

#[derive(Args)]
pub struct LsTreeArgs {
    /// Show only names
    #[arg(long)]
    name_only: bool,

    /// Tree or commit object to list
    #[arg(value_name = "hex-id")]
    object: String,
}

pub fn run(args: &LsTreeArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let odb = repo.odb();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let oid = resolve_object(&args.object, odb)?;

    let tree_oid = match odb.read(&oid)? {
        Some(git_object::Object::Tree(_)) => oid,
        Some(git_object::Object::Commit(commit)) => commit.tree,
        Some(other) => bail!("not a tree object: {} is a {}", args.object, other.object_type()),
        None => bail!("object not found: {}", args.object),
    };

    let obj = odb
        .read(&tree_oid)?
        .ok_or_else(|| anyhow::anyhow!("object not found: {}", tree_oid.to_hex()))?;

    let tree = match obj {
        git_object::Object::Tree(t) => t,
        _ => bail!("not a tree: {}", tree_oid.to_hex()),
    };

    for entry in tree.iter() {
        print_entry(entry, args.name_only, &mut out)?;
    }

    Ok(0)
}

fn resolve_object(spec: &str, odb: &git_odb::ObjectDatabase) -> Result<ObjectId> {
    if let Ok(oid) = ObjectId::from_hex(spec) {
        return Ok(oid);
    }
    if let Ok(oid) = odb.resolve_prefix(spec) {
        return Ok(oid);
    }
    bail!("object not found: {}", spec);
}

fn print_entry(entry: &git_object::TreeEntry, name_only: bool, out: &mut impl Write) -> Result<()> {
    if name_only {
        writeln!(out, "{}", entry.name.as_bstr())?;
    } else {
        let type_name = if entry.mode.is_tree() {
            "tree"
        } else if entry.mode.is_gitlink() {
            "commit"
        } else {
            "blob"
        };
        writeln!(
            out,
            "{} {} {}\t{}",
            entry.mode.as_bytes(),
            type_name,
            entry.oid.to_hex(),
            entry.name.as_bstr(),
        )?;
    }
    Ok(())
}
