use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use bstr::{BString, ByteSlice, ByteVec};
use clap::Args;
use git_hash::ObjectId;
use git_object::{FileMode, Object};
use git_protocol::remote::RefSpec;
use git_ref::RefName;
use git_repository::{InitOptions, Repository};
use git_transport::{GitUrl, Service};

use crate::Cli;

#[derive(Args)]
pub struct CloneArgs {
    /// Repository URL
    repository: String,

    /// Destination directory
    dest_dir: Option<String>,
}

pub fn run(args: &CloneArgs, _cli: &Cli) -> Result<i32> {
    let stderr = io::stderr();
    let mut err = stderr.lock();

    let dest = match &args.dest_dir {
        Some(d) => PathBuf::from(d),
        None => infer_directory(&args.repository)?,
    };

    if dest.exists() && std::fs::read_dir(&dest)?.next().is_some() {
        bail!(
            "fatal: destination path '{}' already exists and is not an empty directory.",
            dest.display()
        );
    }

    writeln!(err, "Cloning into '{}'...", dest.display())?;

    let url = GitUrl::parse(&args.repository)?;
    let mut transport = git_transport::connect(&url, Service::UploadPack)?;

    let reader = &mut git_protocol::pktline::PktLineReader::new(transport.reader());
    let (advertised_refs, capabilities) = git_protocol::v1::parse_ref_advertisement(reader)?;

    if advertised_refs.is_empty() {
        writeln!(err, "warning: You appear to have cloned an empty repository.")?;
    }

    let repo = Repository::init_opts(&dest, &InitOptions::default())?;

    write_remote_config(&repo, &args.repository)?;

    let fetch_refspec = RefSpec::parse("+refs/heads/*:refs/remotes/origin/*")?;
    let wanted_refs: Vec<String> = advertised_refs
        .iter()
        .filter(|(_, name)| {
            let n = name.to_str_lossy();
            n.starts_with("refs/heads/") || n.starts_with("refs/tags/")
        })
        .map(|(_, name)| name.to_str_lossy().to_string())
        .collect();

    if !advertised_refs.is_empty() {
        let fetch_opts = git_protocol::fetch::FetchOptions { progress: true };

        git_protocol::fetch::fetch(
            transport.as_mut(),
            &advertised_refs,
            &capabilities,
            &wanted_refs,
            repo.odb(),
            &fetch_opts,
        )?;

        let checkout_branch =
            determine_checkout_branch(&advertised_refs, &capabilities);

        for (oid, refname) in &advertised_refs {
            let name = refname.to_str_lossy();
            if let Some(dest_ref) = fetch_refspec.map_to_destination(&name) {
                let ref_name = RefName::new(BString::from(dest_ref.as_str()))?;
                repo.refs().write_ref(&ref_name, oid)?;
            }
            if name.starts_with("refs/tags/") {
                let ref_name = RefName::new(refname.clone())?;
                repo.refs().write_ref(&ref_name, oid)?;
            }
        }

        if let Some((ref branch_name, _)) = checkout_branch {
            let remote_head = RefName::new(BString::from("refs/remotes/origin/HEAD"))?;
            let remote_branch =
                RefName::new(BString::from(format!("refs/remotes/origin/{}", branch_name)))?;
            repo.refs().write_symbolic_ref(&remote_head, &remote_branch)?;
        }

        if let Some((branch_name, oid)) = checkout_branch {
            let head_ref = RefName::new(BString::from("HEAD"))?;
            let branch_ref =
                RefName::new(BString::from(format!("refs/heads/{}", branch_name)))?;
            repo.refs().write_symbolic_ref(&head_ref, &branch_ref)?;
            repo.refs().write_ref(&branch_ref, &oid)?;

            checkout_tree(&repo, &oid)?;
        }
    } else {
        let head_ref = RefName::new(BString::from("HEAD"))?;
        let branch_ref = RefName::new(BString::from("refs/heads/main"))?;
        repo.refs().write_symbolic_ref(&head_ref, &branch_ref)?;
    }

    Ok(0)
}

fn infer_directory(url_str: &str) -> Result<PathBuf> {
    let path = url_str
        .rsplit('/')
        .next()
        .unwrap_or(url_str)
        .trim_end_matches(".git");
    if path.is_empty() {
        bail!("cannot infer directory name from '{}'", url_str);
    }
    Ok(PathBuf::from(path))
}

fn write_remote_config(repo: &Repository, url: &str) -> Result<()> {
    let config_path = repo.git_dir().join("config");
    let mut content = std::fs::read_to_string(&config_path).unwrap_or_default();
    content.push_str(&format!(
        "\n[remote \"origin\"]\n\turl = {}\n\tfetch = +refs/heads/*:refs/remotes/origin/*\n",
        url
    ));
    std::fs::write(&config_path, content)?;
    Ok(())
}

fn determine_checkout_branch(
    advertised_refs: &[(ObjectId, BString)],
    capabilities: &git_protocol::capability::Capabilities,
) -> Option<(String, ObjectId)> {
    // Try to find HEAD's target via symref capability
    if let Some(symref) = capabilities.get("symref") {
        // Format: symref=HEAD:refs/heads/main
        if let Some(target) = symref.strip_prefix("HEAD:refs/heads/") {
            let branch = target.to_string();
            for (oid, name) in advertised_refs {
                if name.to_str_lossy() == format!("refs/heads/{}", branch) {
                    return Some((branch, *oid));
                }
            }
        }
    }

    // Fall back to HEAD ref
    for (oid, name) in advertised_refs {
        if name.to_str_lossy() == "HEAD" {
            // Try to match HEAD oid to a branch
            for (branch_oid, branch_name) in advertised_refs {
                let bn = branch_name.to_str_lossy();
                if bn.starts_with("refs/heads/") && branch_oid == oid {
                    let short = bn.strip_prefix("refs/heads/").unwrap();
                    return Some((short.to_string(), *oid));
                }
            }
            // Detached HEAD: use "main" as branch name
            return Some(("main".to_string(), *oid));
        }
    }

    None
}

fn checkout_tree(repo: &Repository, commit_oid: &ObjectId) -> Result<()> {
    let work_tree = repo
        .work_tree()
        .ok_or_else(|| anyhow::anyhow!("cannot checkout: bare repository"))?
        .to_path_buf();

    let obj = repo
        .odb()
        .read(commit_oid)?
        .ok_or_else(|| anyhow::anyhow!("commit {} not found", commit_oid.to_hex()))?;

    let tree_oid = match obj {
        Object::Commit(c) => c.tree,
        _ => bail!("expected commit, got {}", obj.object_type()),
    };

    checkout_tree_recursive(repo.odb(), &tree_oid, &work_tree, &BString::from(""))
}

/// Recursively materializes a tree into a directory. Symlink and gitlink
/// entries are skipped with a warning rather than materialized.
fn checkout_tree_recursive(
    odb: &git_odb::ObjectDatabase,
    tree_oid: &ObjectId,
    work_tree: &Path,
    prefix: &BString,
) -> Result<()> {
    let obj = odb
        .read(tree_oid)?
        .ok_or_else(|| anyhow::anyhow!("tree {} not found", tree_oid.to_hex()))?;

    let tree = match obj {
        Object::Tree(t) => t,
        _ => bail!("expected tree, got {}", obj.object_type()),
    };

    for entry in tree.iter() {
        let path = if prefix.is_empty() {
            entry.name.clone()
        } else {
            let mut p = prefix.clone();
            p.push_byte(b'/');
            p.extend_from_slice(&entry.name);
            p
        };

        if entry.mode.is_tree() {
            let dir_path = work_tree.join(path.to_str_lossy().as_ref());
            std::fs::create_dir_all(&dir_path)?;
            checkout_tree_recursive(odb, &entry.oid, work_tree, &path)?;
            continue;
        }

        if matches!(entry.mode, FileMode::Symlink | FileMode::Gitlink) {
            eprintln!(
                "warning: skipping {} entry '{}'",
                if entry.mode == FileMode::Symlink { "symlink" } else { "gitlink" },
                path.to_str_lossy()
            );
            continue;
        }

        let file_path = work_tree.join(path.to_str_lossy().as_ref());
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let blob_obj = odb
            .read(&entry.oid)?
            .ok_or_else(|| anyhow::anyhow!("blob {} not found", entry.oid.to_hex()))?;

        let data = match blob_obj {
            Object::Blob(b) => b.data,
            _ => bail!("expected blob for {}", path.to_str_lossy()),
        };

        std::fs::write(&file_path, &data)?;

        #[cfg(unix)]
        if entry.mode == FileMode::Executable {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&file_path, std::fs::Permissions::from_mode(0o755))?;
        }
    }

    Ok(())
}
