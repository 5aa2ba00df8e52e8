//! Message command — links references in a commit message.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use crate::autolink::{enrich, Autolinks, LinkifyOptions, OutputFormat, ScanOptions};
use crate::cli::{load_settings, select_remote};
use crate::git::{GitRepository, DEFAULT_REVISION};

/// Message command options.
#[derive(Parser)]
pub struct MessageCommand {
    /// Text to scan; defaults to the message of `--commit`.
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,

    /// Commit whose message is scanned when no text is given.
    #[arg(long, default_value = DEFAULT_REVISION)]
    pub commit: String,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Plaintext)]
    pub format: OutputFormat,

    /// Ignores the autolinks configured in settings.
    #[arg(long)]
    pub no_custom: bool,

    /// Prints the extracted autolinks as YAML instead of linked text.
    #[arg(long)]
    pub list: bool,

    /// Settings file (defaults to ~/.omni-autolink/settings.json).
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Remote whose provider supplies references (defaults to origin).
    #[arg(long, value_name = "NAME")]
    pub remote: Option<String>,
}

impl MessageCommand {
    /// Executes the message command.
    pub async fn execute(self) -> Result<()> {
        let settings = load_settings(self.settings.as_deref())?;
        let autolinks = if self.no_custom {
            Autolinks::new(&[])
        } else {
            Autolinks::from_settings(&settings)
        };

        let repo = GitRepository::open().ok();
        let text = match self.text {
            Some(text) => text,
            None => repo
                .as_ref()
                .context("Not in a git repository; pass the text to scan instead")?
                .commit_message(&self.commit)?,
        };

        let remotes = match &repo {
            Some(repo) => repo.remotes()?,
            None => Vec::new(),
        };
        let remote = select_remote(&remotes, self.remote.as_deref())?;
        debug!(remote = ?remote.map(|r| r.name.as_str()), "Scanning commit message");

        if self.list {
            let links = autolinks
                .get_autolinks(&text, remote, ScanOptions::default())
                .await?;
            let links: Vec<_> = links.values().collect();
            let yaml = serde_yaml::to_string(&links).context("Failed to serialize autolinks")?;
            print!("{yaml}");
            return Ok(());
        }

        let enriched = autolinks.get_enriched_autolinks(&text, remote).await?;
        let snapshots = enrich::snapshot(&enriched, settings.enrichment_timeout()).await;
        let rendered = autolinks.linkify(
            &text,
            self.format,
            LinkifyOptions {
                remotes: remote.map(std::slice::from_ref),
                snapshots: Some(&snapshots),
                footnoted_ids: None,
            },
            None,
        );
        println!("{}", rendered.trim_end());
        Ok(())
    }
}
