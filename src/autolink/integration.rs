//! Contract for issue-tracking integrations.

use std::fmt;

use anyhow::Result;
use futures::future::BoxFuture;

use crate::autolink::issue::IssueOrPullRequest;
use crate::autolink::reference::{Autolink, ProviderRef, Reference, RepositoryDescriptor};

/// An issue-tracking service that contributes references and detail lookups.
///
/// Transport and authentication live behind this trait.
pub trait IssueIntegration: Send + Sync + fmt::Debug {
    /// Identity used for attribution, deduplication and precedence.
    fn provider(&self) -> &ProviderRef;

    /// Cached connectivity; `None` when not yet known.
    fn maybe_connected(&self) -> Option<bool>;

    /// Probes connectivity.
    fn is_connected(&self) -> BoxFuture<'_, bool>;

    /// Returns the references this integration recognises.
    fn autolinks(&self) -> BoxFuture<'_, Result<Vec<Reference>>>;

    /// Looks up one issue or pull request. `Ok(None)` means not found.
    fn get_issue_or_pull_request<'a>(
        &'a self,
        descriptor: Option<&'a RepositoryDescriptor>,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<IssueOrPullRequest>>>;

    /// Id to look `link` up by. Project-key schemes override this to include
    /// the prefix.
    fn enrichable_id(&self, link: &Autolink) -> String {
        link.id.clone()
    }
}

/// Returns cached connectivity, probing only when it is unknown.
pub async fn resolve_connected(integration: &dyn IssueIntegration) -> bool {
    match integration.maybe_connected() {
        Some(connected) => connected,
        None => integration.is_connected().await,
    }
}
