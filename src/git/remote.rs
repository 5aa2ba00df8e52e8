//! Git remotes and the hosting providers behind them

use std::sync::Arc;

use anyhow::{Context, Result};
use git2::Repository;
use serde::Serialize;
use url::Url;

use crate::autolink::dynamic::CrossRepositoryReference;
use crate::autolink::integration::IssueIntegration;
use crate::autolink::reference::{
    AutolinkReference, AutolinkType, ProviderRef, Reference, RepositoryDescriptor,
};

/// Remote repository information
#[derive(Debug, Clone, Serialize)]
pub struct RemoteInfo {
    /// Name of the remote (e.g., "origin", "upstream")
    pub name: String,
    /// URI of the remote repository
    pub uri: String,
    /// Hosting provider detected from the URI
    #[serde(skip)]
    pub provider: Option<Arc<RemoteProvider>>,
}

impl RemoteInfo {
    /// Creates remote information, detecting the provider from `uri`
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let provider = RemoteProvider::from_uri(&uri).map(Arc::new);
        Self {
            name: name.into(),
            uri,
            provider,
        }
    }

    /// Creates remote information with an explicit provider
    pub fn with_provider(
        name: impl Into<String>,
        uri: impl Into<String>,
        provider: RemoteProvider,
    ) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            provider: Some(Arc::new(provider)),
        }
    }

    /// Get all remotes for a repository
    pub fn get_all_remotes(repo: &Repository) -> Result<Vec<Self>> {
        let mut remotes = Vec::new();
        let remote_names = repo.remotes().context("Failed to get remote names")?;

        for name in remote_names.iter().flatten() {
            if let Ok(remote) = repo.find_remote(name) {
                let uri = remote.url().unwrap_or("");
                remotes.push(Self::new(name, uri));
            }
        }

        Ok(remotes)
    }

    /// Cached connectivity of the provider's integration, if it has one
    pub fn maybe_integration_connected(&self) -> Option<bool> {
        self.provider
            .as_ref()?
            .integration
            .as_ref()?
            .maybe_connected()
    }
}

/// A hosting provider serving one repository
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    /// Identity of the hosting service
    pub origin: ProviderRef,
    /// Repository the remote points at
    pub repository: RepositoryDescriptor,
    /// References the provider recognises, in application order
    pub references: Vec<Reference>,
    /// Rich integration offering issue lookups, when one is connected
    pub integration: Option<Arc<dyn IssueIntegration>>,
}

impl RemoteProvider {
    /// Creates a provider with explicit references
    pub fn new(
        origin: ProviderRef,
        repository: RepositoryDescriptor,
        references: Vec<Reference>,
    ) -> Self {
        Self {
            origin,
            repository,
            references,
            integration: None,
        }
    }

    /// GitHub (or GitHub Enterprise on `domain`)
    pub fn github(domain: &str, repository: RepositoryDescriptor) -> Self {
        let base = format!("https://{domain}/{repository}");
        let title = "Open Issue or Pull Request #<num>";
        let references = vec![
            Reference::pattern(
                AutolinkReference::new("#", format!("{base}/issues/<num>"))
                    .title(title)
                    .descriptor(repository.clone()),
            ),
            Reference::pattern(
                AutolinkReference::new("gh-", format!("{base}/issues/<num>"))
                    .ignore_case(true)
                    .title(title)
                    .descriptor(repository.clone()),
            ),
            Reference::dynamic(CrossRepositoryReference::new(domain)),
        ];
        Self::new(
            ProviderRef::new("github", "GitHub", domain),
            repository,
            references,
        )
    }

    /// GitLab (or a self-managed instance on `domain`)
    pub fn gitlab(domain: &str, repository: RepositoryDescriptor) -> Self {
        let base = format!("https://{domain}/{repository}");
        let references = vec![
            Reference::pattern(
                AutolinkReference::new("#", format!("{base}/-/issues/<num>"))
                    .title("Open Issue #<num>")
                    .kind(AutolinkType::Issue)
                    .descriptor(repository.clone()),
            ),
            Reference::pattern(
                AutolinkReference::new("!", format!("{base}/-/merge_requests/<num>"))
                    .title("Open Merge Request !<num>")
                    .kind(AutolinkType::PullRequest)
                    .descriptor(repository.clone()),
            ),
        ];
        Self::new(
            ProviderRef::new("gitlab", "GitLab", domain),
            repository,
            references,
        )
    }

    /// Detects a github.com or gitlab.com provider from a remote URI
    pub fn from_uri(uri: &str) -> Option<Self> {
        let (host, path) = split_remote_uri(uri)?;
        let repository = repository_from_path(&path)?;
        match host.to_ascii_lowercase().as_str() {
            "github.com" | "www.github.com" | "ssh.github.com" => {
                Some(Self::github("github.com", repository))
            }
            "gitlab.com" | "www.gitlab.com" => Some(Self::gitlab("gitlab.com", repository)),
            _ => None,
        }
    }

    /// Attaches a rich integration
    #[must_use]
    pub fn with_integration(mut self, integration: Arc<dyn IssueIntegration>) -> Self {
        self.integration = Some(integration);
        self
    }
}

/// Splits a remote URI into host and repository path
///
/// Accepts URL forms (`https://`, `ssh://`, `git://`) and scp-like
/// `user@host:owner/repo.git`.
fn split_remote_uri(uri: &str) -> Option<(String, String)> {
    let uri = uri.trim();
    if uri.contains("://") {
        let url = Url::parse(uri).ok()?;
        let host = url.host_str()?.to_string();
        return Some((host, url.path().to_string()));
    }

    // scp-like syntax: [user@]host:path
    let (authority, path) = uri.split_once(':')?;
    if authority.contains('/') {
        return None;
    }
    let host = authority.rsplit('@').next()?;
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), path.to_string()))
}

fn repository_from_path(path: &str) -> Option<RepositoryDescriptor> {
    let path = path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, name) = path.rsplit_once('/')?;
    if owner.is_empty() || name.is_empty() {
        return None;
    }
    Some(RepositoryDescriptor::new(owner, name))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::autolink::test_utils::{github, MockIntegration};

    fn detected(uri: &str) -> Option<(String, String)> {
        RemoteProvider::from_uri(uri).map(|p| (p.origin.id, p.repository.to_string()))
    }

    #[test]
    fn detects_github_from_every_uri_form() {
        let expected = Some(("github".to_string(), "rust-works/omni-dev".to_string()));
        assert_eq!(detected("git@github.com:rust-works/omni-dev.git"), expected);
        assert_eq!(detected("https://github.com/rust-works/omni-dev.git"), expected);
        assert_eq!(detected("https://github.com/rust-works/omni-dev"), expected);
        assert_eq!(detected("ssh://git@github.com/rust-works/omni-dev.git"), expected);
    }

    #[test]
    fn detects_gitlab_with_nested_groups() {
        assert_eq!(
            detected("git@gitlab.com:group/sub/project.git"),
            Some(("gitlab".to_string(), "group/sub/project".to_string()))
        );
    }

    #[test]
    fn unknown_hosts_have_no_provider() {
        assert_eq!(detected("https://git.internal/o/r.git"), None);
        assert_eq!(detected("/srv/git/repo.git"), None);
        assert_eq!(detected("https://github.com/only-owner"), None);
    }

    #[test]
    fn github_references_resolve_issue_urls() {
        let provider = RemoteProvider::github("github.com", RepositoryDescriptor::new("o", "r"));
        let prefixes: Vec<&str> = provider
            .references
            .iter()
            .filter_map(Reference::as_pattern)
            .map(|r| r.prefix.as_str())
            .collect();
        assert_eq!(prefixes, vec!["#", "gh-"]);
        assert!(provider.references.iter().any(Reference::is_dynamic));
        let hash = provider.references[0].as_pattern().unwrap();
        assert_eq!(hash.url, "https://github.com/o/r/issues/<num>");
    }

    #[test]
    fn gitlab_merge_requests_are_pull_requests() {
        let provider = RemoteProvider::gitlab("gitlab.com", RepositoryDescriptor::new("g", "p"));
        let bang = provider.references[1].as_pattern().unwrap();
        assert_eq!(bang.prefix, "!");
        assert_eq!(bang.kind, Some(AutolinkType::PullRequest));
        assert_eq!(bang.url, "https://gitlab.com/g/p/-/merge_requests/<num>");
    }

    #[test]
    fn integration_connectivity_is_reported() {
        let plain = RemoteInfo::new("origin", "git@github.com:o/r.git");
        assert_eq!(plain.maybe_integration_connected(), None);

        let provider = RemoteProvider::github("github.com", RepositoryDescriptor::new("o", "r"))
            .with_integration(Arc::new(MockIntegration::new(github()).connected(Some(false))));
        let remote = RemoteInfo::with_provider("origin", "git@github.com:o/r.git", provider);
        assert_eq!(remote.maybe_integration_connected(), Some(false));
    }

    #[test]
    fn get_all_remotes_reads_repository() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let repo = Repository::init(dir.path())?;
        repo.remote("origin", "https://github.com/o/r.git")?;
        repo.remote("mirror", "https://mirror.example.com/o/r.git")?;

        let mut remotes = RemoteInfo::get_all_remotes(&repo)?;
        remotes.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(remotes.len(), 2);
        assert!(remotes[0].provider.is_none());
        assert_eq!(remotes[1].name, "origin");
        assert!(remotes[1].provider.is_some());
        Ok(())
    }
}
