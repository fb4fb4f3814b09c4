use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use git_repository::InitOptions;

use crate::Cli;

#[derive(Args)]
pub struct InitArgs {}

pub fn run(_args: &InitArgs, _cli: &Cli) -> Result<i32> {
    let target = std::env::current_dir()?;

    git_repository::Repository::init_opts(&target, &InitOptions::default())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Initialized git directory")?;

    Ok(0)
}
