use std::fs;
use std::path::Path;

use crate::{DiscoveredRepo, InitOptions, RepoError, RepositoryKind};

/// Initialize a new git repository.
///
/// Creates the standard `.git/` structure:
/// - `objects/`, `objects/pack/` (empty)
/// - `refs/heads/`, `refs/tags/`
/// - `HEAD`, written only if absent, so re-running init during clone never
///   clobbers a just-checked-out HEAD
/// - `config`, a minimal `[core]` stanza
pub fn init_repository(path: &Path, options: &InitOptions) -> Result<DiscoveredRepo, RepoError> {
    let path = if path.is_relative() {
        std::env::current_dir()?.join(path)
    } else {
        path.to_path_buf()
    };

    let (git_dir, work_tree) = if options.bare {
        (path.clone(), None)
    } else {
        (path.join(".git"), Some(path.clone()))
    };

    fs::create_dir_all(git_dir.join("objects"))?;
    fs::create_dir_all(git_dir.join("objects").join("pack"))?;
    fs::create_dir_all(git_dir.join("refs").join("heads"))?;
    fs::create_dir_all(git_dir.join("refs").join("tags"))?;

    let default_branch = options.default_branch.as_deref().unwrap_or("main");

    let head_path = git_dir.join("HEAD");
    if !head_path.is_file() {
        fs::write(&head_path, format!("ref: refs/heads/{default_branch}\n"))?;
    }

    if !git_dir.join("config").is_file() {
        let config_content = if options.bare {
            "[core]\n\trepositoryformatversion = 0\n\tfilemode = true\n\tbare = true\n"
        } else {
            "[core]\n\trepositoryformatversion = 0\n\tfilemode = true\n\tbare = false\n"
        };
        fs::write(git_dir.join("config"), config_content)?;
    }

    Ok(DiscoveredRepo {
        common_dir: git_dir.clone(),
        git_dir,
        work_tree,
        kind: if options.bare {
            RepositoryKind::Bare
        } else {
            RepositoryKind::Normal
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_minimal_layout() {
        let dir = tempfile::tempdir().unwrap();
        let opts = InitOptions::default();
        let discovered = init_repository(dir.path(), &opts).unwrap();

        let git_dir = discovered.git_dir;
        assert!(git_dir.join("objects").is_dir());
        assert!(git_dir.join("objects").join("pack").is_dir());
        assert!(git_dir.join("refs").join("heads").is_dir());
        assert!(git_dir.join("refs").join("tags").is_dir());
        assert!(git_dir.join("config").is_file());

        let head = fs::read_to_string(git_dir.join("HEAD")).unwrap();
        assert_eq!(head, "ref: refs/heads/main\n");
    }

    #[test]
    fn init_does_not_clobber_existing_head() {
        let dir = tempfile::tempdir().unwrap();
        let opts = InitOptions::default();
        init_repository(dir.path(), &opts).unwrap();

        let git_dir = dir.path().join(".git");
        fs::write(git_dir.join("HEAD"), "ref: refs/heads/checked-out\n").unwrap();

        init_repository(dir.path(), &opts).unwrap();
        let head = fs::read_to_string(git_dir.join("HEAD")).unwrap();
        assert_eq!(head, "ref: refs/heads/checked-out\n");
    }

    #[test]
    fn init_bare_has_no_work_tree() {
        let dir = tempfile::tempdir().unwrap();
        let opts = InitOptions {
            bare: true,
            ..Default::default()
        };
        let discovered = init_repository(dir.path(), &opts).unwrap();
        assert!(discovered.work_tree.is_none());
        assert_eq!(discovered.kind, RepositoryKind::Bare);

        let config = fs::read_to_string(discovered.git_dir.join("config")).unwrap();
        assert!(config.contains("bare = true"));
    }

    #[test]
    fn init_with_custom_default_branch() {
        let dir = tempfile::tempdir().unwrap();
        let opts = InitOptions {
            default_branch: Some("trunk".to_string()),
            ..Default::default()
        };
        let discovered = init_repository(dir.path(), &opts).unwrap();

        let head = fs::read_to_string(discovered.git_dir.join("HEAD")).unwrap();
        assert_eq!(head, "ref: refs/heads/trunk\n");
    }
}
