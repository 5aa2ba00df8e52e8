//! CLI interface for omni-autolink.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::git::RemoteInfo;

pub mod branch;
pub mod message;

/// omni-autolink: issue and pull-request autolinks for commits and branches.
#[derive(Parser)]
#[command(name = "omni-autolink")]
#[command(
    about = "Finds issue and pull-request references in commit messages and branch names",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// The main command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Main commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Links references in a commit message.
    Message(message::MessageCommand),
    /// Lists references found in a branch name.
    Branch(branch::BranchCommand),
}

impl Cli {
    /// Executes the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Message(message_cmd) => message_cmd.execute().await,
            Commands::Branch(branch_cmd) => branch_cmd.execute().await,
        }
    }
}

/// Loads settings from `path`, or from the default location.
pub(crate) fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => Settings::load_from_path(path),
        None => Settings::load(),
    };
    settings.context("Failed to load settings")
}

/// Picks the remote to scan against.
///
/// An explicit name must exist. Without one, `origin` is preferred, then
/// the first remote with a recognised provider.
pub(crate) fn select_remote<'a>(
    remotes: &'a [RemoteInfo],
    name: Option<&str>,
) -> Result<Option<&'a RemoteInfo>> {
    if let Some(name) = name {
        return remotes
            .iter()
            .find(|remote| remote.name == name)
            .map(Some)
            .with_context(|| format!("Remote not found: {name}"));
    }

    Ok(remotes
        .iter()
        .find(|remote| remote.name == "origin")
        .or_else(|| remotes.iter().find(|remote| remote.provider.is_some())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn remotes() -> Vec<RemoteInfo> {
        vec![
            RemoteInfo::new("mirror", "https://mirror.example.com/o/r.git"),
            RemoteInfo::new("upstream", "git@gitlab.com:g/p.git"),
        ]
    }

    #[test]
    fn select_remote_prefers_origin() {
        let mut remotes = remotes();
        remotes.push(RemoteInfo::new("origin", "https://git.internal/o/r.git"));
        let selected = select_remote(&remotes, None).unwrap().unwrap();
        assert_eq!(selected.name, "origin");
    }

    #[test]
    fn select_remote_falls_back_to_known_provider() {
        let remotes = remotes();
        let selected = select_remote(&remotes, None).unwrap().unwrap();
        assert_eq!(selected.name, "upstream");
    }

    #[test]
    fn select_remote_requires_named_remote_to_exist() {
        let remotes = remotes();
        assert_eq!(
            select_remote(&remotes, Some("mirror")).unwrap().unwrap().name,
            "mirror"
        );
        assert!(select_remote(&remotes, Some("nope")).is_err());
        assert!(select_remote(&[], None).unwrap().is_none());
    }

    #[test]
    fn cli_parses_message_options() {
        let cli = Cli::try_parse_from([
            "omni-autolink",
            "message",
            "fixes #1",
            "--format",
            "markdown",
            "--no-custom",
        ])
        .unwrap();
        let Commands::Message(message) = cli.command else {
            panic!("expected message command");
        };
        assert_eq!(message.text.as_deref(), Some("fixes #1"));
        assert_eq!(message.format, crate::autolink::OutputFormat::Markdown);
        assert!(message.no_custom);
        assert_eq!(message.commit, "HEAD");
    }
}
