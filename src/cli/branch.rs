//! Branch command — lists references found in a branch name.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::autolink::{Autolinks, ScanOptions};
use crate::cli::{load_settings, select_remote};
use crate::git::GitRepository;

/// Branch command options.
#[derive(Parser)]
pub struct BranchCommand {
    /// Branch name to scan; defaults to the current branch.
    #[arg(value_name = "NAME")]
    pub name: Option<String>,

    /// Remote whose provider supplies references (defaults to origin).
    #[arg(long, value_name = "NAME")]
    pub remote: Option<String>,

    /// Settings file (defaults to ~/.omni-autolink/settings.json).
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

impl BranchCommand {
    /// Executes the branch command.
    pub async fn execute(self) -> Result<()> {
        let settings = load_settings(self.settings.as_deref())?;
        let autolinks = Autolinks::from_settings(&settings);

        let repo = GitRepository::open().ok();
        let branch = match self.name {
            Some(name) => name,
            None => repo
                .as_ref()
                .context("Not in a git repository; pass the branch name instead")?
                .current_branch()
                .context(
                    "Failed to get current branch. Make sure you're not in detached HEAD state.",
                )?,
        };

        let remotes = match &repo {
            Some(repo) => repo.remotes()?,
            None => Vec::new(),
        };
        let remote = select_remote(&remotes, self.remote.as_deref())?;

        let links = autolinks
            .get_branch_autolinks(&branch, remote, ScanOptions::default())
            .await?;
        let ranked: Vec<_> = links.values().collect();
        let yaml = serde_yaml::to_string(&ranked).context("Failed to serialize autolinks")?;
        print!("{yaml}");
        Ok(())
    }
}
