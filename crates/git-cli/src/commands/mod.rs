pub mod cat_file;
pub mod clone;
pub mod commit_tree;
pub mod hash_object;
pub mod init;
pub mod ls_tree;
pub mod write_tree;

use anyhow::Result;
use clap::Subcommand;

use crate::Cli;

#[derive(Subcommand)]
pub enum Commands {
    /// Provide content or type and size information for repository objects
    CatFile(cat_file::CatFileArgs),
    /// Compute object ID and optionally create a blob from a file
    HashObject(hash_object::HashObjectArgs),
    /// List the contents of a tree object
    LsTree(ls_tree::LsTreeArgs),
    /// Create a tree object from the current index
    WriteTree(write_tree::WriteTreeArgs),
    /// Create a new commit object
    CommitTree(commit_tree::CommitTreeArgs),
    /// Create an empty Git repository or reinitialize an existing one
    Init(init::InitArgs),
    /// Clone a repository into a new directory
    Clone(clone::CloneArgs),
}

impl Commands {
    /// Get the command name as used in config keys (e.g., "log", "diff").
    pub fn command_name(&self) -> &str {
        match self {
            Commands::CatFile(_) => "cat-file",
            Commands::HashObject(_) => "hash-object",
            Commands::LsTree(_) => "ls-tree",
            Commands::WriteTree(_) => "write-tree",
            Commands::CommitTree(_) => "commit-tree",
            Commands::Init(_) => "init",
            Commands::Clone(_) => "clone",
        }
    }
}

/// Open a repository, respecting --git-dir override.
pub fn open_repo(cli: &Cli) -> Result<git_repository::Repository> {
    let repo = if let Some(ref git_dir) = cli.git_dir {
        git_repository::Repository::open(git_dir)?
    } else {
        git_repository::Repository::discover(".")?
    };
    Ok(repo)
}

pub fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Commands::CatFile(args) => cat_file::run(args, &cli),
        Commands::HashObject(args) => hash_object::run(args, &cli),
        Commands::LsTree(args) => ls_tree::run(args, &cli),
        Commands::WriteTree(args) => write_tree::run(args, &cli),
        Commands::CommitTree(args) => commit_tree::run(args, &cli),
        Commands::Init(args) => init::run(args, &cli),
        Commands::Clone(args) => clone::run(args, &cli),
    }
}
