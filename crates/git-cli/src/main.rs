mod commands;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

use commands::Commands;

#[derive(Parser)]
#[command(name = "gitr", about = "A Git implementation in Rust")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Run as if started in <path>
    #[arg(short = 'C', global = true)]
    directory: Option<PathBuf>,

    /// Set the path to the .git directory
    #[arg(long = "git-dir")]
    git_dir: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    if let Some(dir) = &cli.directory {
        if let Err(e) = std::env::set_current_dir(dir) {
            eprintln!("fatal: cannot change to '{}': {}", dir.display(), e);
            process::exit(1);
        }
    }

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("fatal: {e}");
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    commands::run(cli)
}
