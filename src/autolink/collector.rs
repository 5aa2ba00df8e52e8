//! Gathers the ordered reference sets a scan runs against.

use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use crate::autolink::integration::IssueIntegration;
use crate::autolink::reference::{ProviderRef, Reference, ReferenceScope};
use crate::git::remote::RemoteInfo;

/// One source's references, with the provider they are attributed to.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    /// Origin of the references; `None` for user configuration.
    pub provider: Option<ProviderRef>,
    /// References in application order.
    pub references: Vec<Reference>,
}

impl ReferenceSet {
    /// Creates a reference set.
    pub fn new(provider: Option<ProviderRef>, references: Vec<Reference>) -> Self {
        Self {
            provider,
            references,
        }
    }
}

/// Toggles for [`collect_reference_sets`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectOptions {
    /// Collect for a branch-name scan rather than a message scan.
    pub for_branch: bool,
    /// Leave the user's custom references out.
    pub exclude_custom: bool,
}

/// Collects reference sets in precedence order: integrations, then the
/// remote's provider, then the user's custom references.
///
/// Integrations known to be disconnected are skipped; the rest are queried
/// concurrently and one failing does not affect the others. Custom
/// references are only included when no remote provider is in scope.
pub async fn collect_reference_sets(
    integrations: &[Arc<dyn IssueIntegration>],
    remote: Option<&RemoteInfo>,
    custom: &[Reference],
    options: CollectOptions,
) -> Vec<ReferenceSet> {
    let mut sets = Vec::new();

    let mut queried: Vec<&Arc<dyn IssueIntegration>> = Vec::new();
    for integration in integrations {
        if integration.maybe_connected() == Some(false) {
            continue;
        }
        if queried
            .iter()
            .any(|seen| seen.provider().same_origin(integration.provider()))
        {
            continue;
        }
        queried.push(integration);
    }

    let fetched = join_all(queried.iter().map(|integration| integration.autolinks())).await;
    for (integration, result) in queried.into_iter().zip(fetched) {
        match result {
            Ok(references) => sets.push(ReferenceSet::new(
                Some(integration.provider().clone()),
                references,
            )),
            Err(e) => {
                debug!(provider = %integration.provider().id, error = %e, "Skipping integration autolinks");
            }
        }
    }

    let provider = remote.and_then(|r| r.provider.as_deref());
    if let Some(provider) = provider {
        let references = if options.for_branch {
            provider
                .references
                .iter()
                .filter(|reference| match reference {
                    Reference::Dynamic { .. } => false,
                    Reference::Pattern(pattern) => {
                        pattern.reference_type != Some(ReferenceScope::Commit)
                    }
                })
                .cloned()
                .collect()
        } else {
            provider.references.clone()
        };
        sets.push(ReferenceSet::new(Some(provider.origin.clone()), references));
    }

    if !options.exclude_custom && provider.is_none() && !custom.is_empty() {
        sets.push(ReferenceSet::new(None, custom.to_vec()));
    }

    sets
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::autolink::dynamic::CrossRepositoryReference;
    use crate::autolink::reference::{AutolinkReference, RepositoryDescriptor};
    use crate::autolink::test_utils::{github, MockIntegration};
    use crate::git::remote::RemoteProvider;

    fn jira() -> ProviderRef {
        ProviderRef::new("jira", "Jira", "example.atlassian.net")
    }

    fn custom() -> Vec<Reference> {
        vec![Reference::pattern(AutolinkReference::new(
            "TASK-",
            "https://tasks.example.com/<num>",
        ))]
    }

    fn pattern(prefix: &str) -> Reference {
        Reference::pattern(AutolinkReference::new(prefix, "https://x/<num>"))
    }

    fn origins(sets: &[ReferenceSet]) -> Vec<Option<String>> {
        sets.iter()
            .map(|set| set.provider.as_ref().map(|p| p.id.clone()))
            .collect()
    }

    fn remote() -> RemoteInfo {
        RemoteInfo::new("origin", "git@github.com:o/r.git")
    }

    #[tokio::test]
    async fn order_is_integrations_then_remote() {
        let integrations: Vec<Arc<dyn IssueIntegration>> = vec![Arc::new(
            MockIntegration::new(jira()).with_references(vec![pattern("JIRA-")]),
        )];
        let remote = remote();
        let sets = collect_reference_sets(
            &integrations,
            Some(&remote),
            &custom(),
            CollectOptions::default(),
        )
        .await;
        assert_eq!(
            origins(&sets),
            vec![Some("jira".to_string()), Some("github".to_string())]
        );
    }

    #[tokio::test]
    async fn custom_references_come_last_without_remote_provider() {
        let integrations: Vec<Arc<dyn IssueIntegration>> =
            vec![Arc::new(MockIntegration::new(jira()))];
        let sets =
            collect_reference_sets(&integrations, None, &custom(), CollectOptions::default())
                .await;
        assert_eq!(origins(&sets), vec![Some("jira".to_string()), None]);
    }

    #[tokio::test]
    async fn unknown_host_remote_keeps_custom_references() {
        let remote = RemoteInfo::new("origin", "https://git.internal/o/r.git");
        assert!(remote.provider.is_none());
        let sets =
            collect_reference_sets(&[], Some(&remote), &custom(), CollectOptions::default())
                .await;
        assert_eq!(origins(&sets), vec![None]);
    }

    #[tokio::test]
    async fn custom_references_can_be_excluded() {
        let options = CollectOptions {
            exclude_custom: true,
            ..CollectOptions::default()
        };
        let sets = collect_reference_sets(&[], None, &custom(), options).await;
        assert!(sets.is_empty());
    }

    #[tokio::test]
    async fn disconnected_and_duplicate_integrations_are_skipped() {
        let integrations: Vec<Arc<dyn IssueIntegration>> = vec![
            Arc::new(MockIntegration::new(github()).connected(Some(false))),
            Arc::new(MockIntegration::new(jira()).connected(None)),
            Arc::new(MockIntegration::new(jira())),
        ];
        let sets =
            collect_reference_sets(&integrations, None, &[], CollectOptions::default()).await;
        assert_eq!(origins(&sets), vec![Some("jira".to_string())]);
    }

    #[tokio::test]
    async fn failing_integration_does_not_block_others() {
        let integrations: Vec<Arc<dyn IssueIntegration>> = vec![
            Arc::new(MockIntegration::new(github()).failing_references()),
            Arc::new(MockIntegration::new(jira()).with_references(vec![pattern("JIRA-")])),
        ];
        let sets =
            collect_reference_sets(&integrations, None, &[], CollectOptions::default()).await;
        assert_eq!(origins(&sets), vec![Some("jira".to_string())]);
        assert_eq!(sets[0].references.len(), 1);
    }

    #[tokio::test]
    async fn branch_scan_drops_dynamic_and_commit_scoped_remote_references() {
        let provider = RemoteProvider::new(
            github(),
            RepositoryDescriptor::new("o", "r"),
            vec![
                pattern("#"),
                Reference::pattern(
                    AutolinkReference::new("gh-", "https://x/<num>")
                        .reference_type(ReferenceScope::Commit),
                ),
                Reference::dynamic(CrossRepositoryReference::new("github.com")),
            ],
        );
        let remote = RemoteInfo::with_provider("origin", "https://github.com/o/r", provider);

        let options = CollectOptions {
            for_branch: true,
            ..CollectOptions::default()
        };
        let branch = collect_reference_sets(&[], Some(&remote), &[], options).await;
        assert_eq!(branch[0].references.len(), 1);

        let message =
            collect_reference_sets(&[], Some(&remote), &[], CollectOptions::default()).await;
        assert_eq!(message[0].references.len(), 3);
    }
}
