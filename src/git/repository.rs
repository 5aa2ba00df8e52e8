//! Git repository access for the text that gets scanned

use std::path::Path;

use anyhow::{Context, Result};
use git2::Repository;

use crate::git::remote::RemoteInfo;

/// Git repository wrapper
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open repository at current directory
    pub fn open() -> Result<Self> {
        let repo = Repository::discover(".").context("Not in a git repository")?;

        Ok(Self { repo })
    }

    /// Open repository at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path).context("Failed to open git repository")?;

        Ok(Self { repo })
    }

    /// Get access to the underlying git2::Repository
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Get the full message of the commit `rev` resolves to
    pub fn commit_message(&self, rev: &str) -> Result<String> {
        let object = self
            .repo
            .revparse_single(rev)
            .with_context(|| format!("Failed to resolve revision: {rev}"))?;
        let commit = object
            .peel_to_commit()
            .with_context(|| format!("Revision is not a commit: {rev}"))?;

        Ok(commit.message().unwrap_or_default().to_string())
    }

    /// Get current branch name
    pub fn current_branch(&self) -> Result<String> {
        let head = self.repo.head().context("Failed to get HEAD reference")?;

        if let Some(name) = head.shorthand() {
            if name != "HEAD" {
                return Ok(name.to_string());
            }
        }

        anyhow::bail!("Repository is in detached HEAD state")
    }

    /// Get all remotes with their detected providers
    pub fn remotes(&self) -> Result<Vec<RemoteInfo>> {
        RemoteInfo::get_all_remotes(&self.repo)
    }

    /// Get one remote by name
    pub fn remote(&self, name: &str) -> Result<RemoteInfo> {
        self.remotes()?
            .into_iter()
            .find(|remote| remote.name == name)
            .with_context(|| format!("Remote not found: {name}"))
    }
}
