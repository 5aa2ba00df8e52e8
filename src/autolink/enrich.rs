//! Asynchronous issue/pull-request detail lookups for recognised autolinks.
//!
//! [`enrich`] attaches a lookup future to every autolink it can resolve a
//! detail source for. Rendering never waits on those futures directly:
//! [`snapshot`] races the batch against a bounded wait and reports each id as
//! ready, pending or empty. Pending lookups keep running on the runtime; the
//! caller awaits [`PendingDetail::resolve`] and renders again once it settles.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::autolink::integration::{resolve_connected, IssueIntegration};
use crate::autolink::issue::IssueOrPullRequest;
use crate::autolink::reference::{Autolink, AutolinkMap, RepositoryDescriptor};
use crate::git::remote::RemoteInfo;

/// A lookup that never fails; errors settle as `None`.
pub type DetailFuture = Shared<BoxFuture<'static, Option<IssueOrPullRequest>>>;

/// An autolink paired with its (possibly unsettled) detail lookup.
#[derive(Clone)]
pub struct EnrichedAutolink {
    /// Lookup future; `None` when no detail source applies.
    pub detail: Option<DetailFuture>,
    /// The autolink being enriched.
    pub autolink: Autolink,
}

impl fmt::Debug for EnrichedAutolink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrichedAutolink")
            .field("detail", &self.detail.as_ref().map(|d| d.peek().is_some()))
            .field("autolink", &self.autolink)
            .finish()
    }
}

/// Enriched autolinks keyed like the result collection they came from.
pub type EnrichedAutolinks = IndexMap<String, EnrichedAutolink>;

/// A lookup that had not settled when rendering started.
///
/// Clones share the footnote slot reserved when the provisional footnote is
/// rendered, so the follow-up render can be matched to it.
#[derive(Clone)]
pub struct PendingDetail {
    id: String,
    detail: DetailFuture,
    slot: Arc<OnceLock<usize>>,
}

impl PendingDetail {
    pub(crate) fn new(id: impl Into<String>, detail: DetailFuture) -> Self {
        Self {
            id: id.into(),
            detail,
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// Key of the autolink the lookup belongs to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Footnote number reserved for this lookup by the first render, if one
    /// was written.
    pub fn slot(&self) -> Option<usize> {
        self.slot.get().copied()
    }

    pub(crate) fn reserve(&self, slot: usize) {
        let _ = self.slot.set(slot);
    }

    /// Waits for the lookup to settle.
    pub async fn resolve(self) -> Option<IssueOrPullRequest> {
        self.detail.await
    }
}

impl fmt::Debug for PendingDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingDetail")
            .field("id", &self.id)
            .field("slot", &self.slot())
            .finish()
    }
}

/// Render-time state of a lookup.
#[derive(Debug, Clone)]
pub enum DetailSnapshot {
    /// The lookup settled with detail.
    Ready(IssueOrPullRequest),
    /// The lookup is still in flight.
    Pending(PendingDetail),
}

/// One autolink with its render-time detail.
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    /// Detail state; `None` when never looked up or nothing was found.
    pub detail: Option<DetailSnapshot>,
    /// The autolink to render.
    pub autolink: Autolink,
}

/// Render-time snapshots keyed like the result collection they came from.
pub type SnapshotMap = IndexMap<String, RenderSnapshot>;

/// Attaches detail lookups to `links`.
///
/// The remote's own integration is preferred when it is connected, serves
/// the autolink's provider, and the autolink does not name a different
/// repository. Otherwise a connected integration serving the autolink's
/// provider is used. Autolinks with neither stay unenriched.
pub async fn enrich(
    links: &AutolinkMap,
    remote: Option<&RemoteInfo>,
    integrations: &[Arc<dyn IssueIntegration>],
) -> EnrichedAutolinks {
    if links.is_empty() {
        return EnrichedAutolinks::new();
    }

    let mut contextual = None;
    if let Some(provider) = remote.and_then(|r| r.provider.as_deref()) {
        if let Some(integration) = &provider.integration {
            if resolve_connected(integration.as_ref()).await {
                contextual = Some((Arc::clone(integration), &provider.repository));
            }
        }
    }

    let connected = connected_integrations(integrations).await;

    let mut enriched = EnrichedAutolinks::with_capacity(links.len());
    for (key, link) in links {
        let source = match &contextual {
            Some((integration, repository))
                if link
                    .provider
                    .as_ref()
                    .is_some_and(|p| p.same_origin(integration.provider()))
                    && link
                        .descriptor
                        .as_ref()
                        .map_or(true, |descriptor| descriptor == *repository) =>
            {
                let descriptor = link
                    .descriptor
                    .clone()
                    .unwrap_or_else(|| (*repository).clone());
                Some((Arc::clone(integration), Some(descriptor)))
            }
            _ => origin_integration(link, &contextual, &connected)
                .map(|integration| (integration, link.descriptor.clone())),
        };

        let detail = source.map(|(integration, descriptor)| {
            let id = integration.enrichable_id(link);
            lookup(integration, descriptor, id)
        });
        enriched.insert(
            key.clone(),
            EnrichedAutolink {
                detail,
                autolink: link.clone(),
            },
        );
    }
    enriched
}

/// Resolves connectivity once per integration, probing concurrently.
async fn connected_integrations(
    integrations: &[Arc<dyn IssueIntegration>],
) -> Vec<Arc<dyn IssueIntegration>> {
    let states = join_all(
        integrations
            .iter()
            .map(|integration| resolve_connected(integration.as_ref())),
    )
    .await;
    integrations
        .iter()
        .zip(states)
        .filter(|(_, connected)| *connected)
        .map(|(integration, _)| Arc::clone(integration))
        .collect()
}

/// Finds a connected integration serving the autolink's own provider.
///
/// The contextual integration is only present when it is connected.
fn origin_integration(
    link: &Autolink,
    contextual: &Option<(Arc<dyn IssueIntegration>, &RepositoryDescriptor)>,
    connected: &[Arc<dyn IssueIntegration>],
) -> Option<Arc<dyn IssueIntegration>> {
    let provider = link.provider.as_ref()?;
    connected
        .iter()
        .chain(contextual.as_ref().map(|(integration, _)| integration))
        .find(|integration| integration.provider().same_origin(provider))
        .map(Arc::clone)
}

fn lookup(
    integration: Arc<dyn IssueIntegration>,
    descriptor: Option<RepositoryDescriptor>,
    id: String,
) -> DetailFuture {
    async move {
        match integration
            .get_issue_or_pull_request(descriptor.as_ref(), &id)
            .await
        {
            Ok(detail) => detail,
            Err(e) => {
                warn!(id = %id, provider = %integration.provider().id, error = %e, "Issue lookup failed");
                None
            }
        }
    }
    .boxed()
    .shared()
}

/// Waits up to `wait` for the lookups in `enriched`, then snapshots them.
///
/// Lookups still in flight become [`DetailSnapshot::Pending`] and are
/// spawned so they keep progressing after this returns.
pub async fn snapshot(enriched: &EnrichedAutolinks, wait: Duration) -> SnapshotMap {
    let lookups: Vec<DetailFuture> = enriched
        .values()
        .filter_map(|e| e.detail.clone())
        .collect();

    if !lookups.is_empty() && tokio::time::timeout(wait, join_all(lookups.clone())).await.is_err() {
        debug!(?wait, "Rendering before every issue lookup settled");
        for lookup in lookups.into_iter().filter(|l| l.peek().is_none()) {
            tokio::spawn(lookup);
        }
    }

    snapshot_now(enriched)
}

/// Snapshots `enriched` without waiting.
pub fn snapshot_now(enriched: &EnrichedAutolinks) -> SnapshotMap {
    enriched
        .iter()
        .map(|(key, e)| {
            let detail = e.detail.as_ref().and_then(|lookup| match lookup.peek() {
                Some(Some(issue)) => Some(DetailSnapshot::Ready(issue.clone())),
                Some(None) => None,
                None => Some(DetailSnapshot::Pending(PendingDetail::new(
                    key.clone(),
                    lookup.clone(),
                ))),
            });
            (
                key.clone(),
                RenderSnapshot {
                    detail,
                    autolink: e.autolink.clone(),
                },
            )
        })
        .collect()
}
