//! Shared test utilities for the `autolink` module.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use futures::future::{self, BoxFuture, FutureExt};

use crate::autolink::enrich::{DetailSnapshot, PendingDetail, RenderSnapshot};
use crate::autolink::integration::IssueIntegration;
use crate::autolink::issue::{IssueOrPullRequest, IssueState};
use crate::autolink::reference::{
    Autolink, AutolinkType, ProviderRef, Reference, RepositoryDescriptor,
};

/// Recorded `(descriptor, id)` lookup pairs.
type LookupLog = Arc<Mutex<Vec<(Option<RepositoryDescriptor>, String)>>>;

/// Mock integration with canned references, connectivity and issues.
///
/// Lookups for ids registered with [`stalled`](Self::stalled) never settle;
/// ids registered with [`failing`](Self::failing) resolve to an error. Every
/// lookup is recorded once it is polled; read them back with
/// [`lookups`](Self::lookups).
#[derive(Debug)]
pub(crate) struct MockIntegration {
    provider: ProviderRef,
    connected: Option<bool>,
    probe: bool,
    references: Vec<Reference>,
    references_fail: bool,
    issues: HashMap<String, IssueOrPullRequest>,
    failing: HashSet<String>,
    stalled: HashSet<String>,
    lookups: LookupLog,
    probes: Arc<AtomicUsize>,
}

impl MockIntegration {
    /// Creates a connected integration with no references and no issues.
    pub(crate) fn new(provider: ProviderRef) -> Self {
        Self {
            provider,
            connected: Some(true),
            probe: true,
            references: Vec::new(),
            references_fail: false,
            issues: HashMap::new(),
            failing: HashSet::new(),
            stalled: HashSet::new(),
            lookups: Arc::new(Mutex::new(Vec::new())),
            probes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sets the cached connectivity. With `None`, probes report `probe`.
    pub(crate) fn connected(mut self, connected: Option<bool>) -> Self {
        self.connected = connected;
        self
    }

    /// Sets the result of a connectivity probe.
    pub(crate) fn probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    /// Sets the references returned by `autolinks()`.
    pub(crate) fn with_references(mut self, references: Vec<Reference>) -> Self {
        self.references = references;
        self
    }

    /// Makes `autolinks()` fail.
    pub(crate) fn failing_references(mut self) -> Self {
        self.references_fail = true;
        self
    }

    /// Registers an issue returned for `id`.
    pub(crate) fn with_issue(mut self, id: &str, issue: IssueOrPullRequest) -> Self {
        self.issues.insert(id.to_string(), issue);
        self
    }

    /// Makes lookups for `id` fail.
    pub(crate) fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    /// Makes lookups for `id` never settle.
    pub(crate) fn stalled(mut self, id: &str) -> Self {
        self.stalled.insert(id.to_string());
        self
    }

    /// Number of connectivity probes performed so far.
    pub(crate) fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Returns the lookups performed so far.
    pub(crate) fn lookups(&self) -> Vec<(Option<RepositoryDescriptor>, String)> {
        self.lookups
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

impl IssueIntegration for MockIntegration {
    fn provider(&self) -> &ProviderRef {
        &self.provider
    }

    fn maybe_connected(&self) -> Option<bool> {
        self.connected
    }

    fn is_connected(&self) -> BoxFuture<'_, bool> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        future::ready(self.connected.unwrap_or(self.probe)).boxed()
    }

    fn autolinks(&self) -> BoxFuture<'_, Result<Vec<Reference>>> {
        let result = if self.references_fail {
            Err(anyhow!("{} is unavailable", self.provider.name))
        } else {
            Ok(self.references.clone())
        };
        future::ready(result).boxed()
    }

    fn get_issue_or_pull_request<'a>(
        &'a self,
        descriptor: Option<&'a RepositoryDescriptor>,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<IssueOrPullRequest>>> {
        if let Ok(mut log) = self.lookups.lock() {
            log.push((descriptor.cloned(), id.to_string()));
        }
        if self.stalled.contains(id) {
            return future::pending().boxed();
        }
        let result = if self.failing.contains(id) {
            Err(anyhow!("lookup of {id} failed"))
        } else {
            Ok(self.issues.get(id).cloned())
        };
        future::ready(result).boxed()
    }
}

// ── fixtures ─────────────────────────────────────────────────────────

/// The github.com provider identity.
pub(crate) fn github() -> ProviderRef {
    ProviderRef::new("github", "GitHub", "github.com")
}

/// An open issue created three days ago.
pub(crate) fn sample_issue(id: &str, title: &str) -> IssueOrPullRequest {
    IssueOrPullRequest {
        kind: AutolinkType::Issue,
        id: id.to_string(),
        title: title.to_string(),
        url: format!("https://github.com/o/r/issues/{id}"),
        state: IssueState::Opened,
        created_date: Utc::now() - Duration::days(3),
        closed_date: None,
        provider: github(),
    }
}

/// A `#<id>` autolink with no owning reference.
pub(crate) fn link_from(id: &str, provider: Option<ProviderRef>) -> Autolink {
    Autolink {
        provider,
        id: id.to_string(),
        index: 0,
        prefix: "#".to_string(),
        url: format!("https://github.com/o/r/issues/{id}"),
        alphanumeric: false,
        ignore_case: false,
        title: None,
        description: None,
        kind: None,
        descriptor: None,
        reference: None,
    }
}

/// A snapshot whose lookup settled with `issue`.
pub(crate) fn ready_snapshot(id: &str, issue: IssueOrPullRequest) -> RenderSnapshot {
    RenderSnapshot {
        detail: Some(DetailSnapshot::Ready(issue)),
        autolink: link_from(id, Some(github())),
    }
}

/// A snapshot whose lookup never settles.
pub(crate) fn pending_snapshot(id: &str) -> RenderSnapshot {
    let never = future::pending::<Option<IssueOrPullRequest>>()
        .boxed()
        .shared();
    RenderSnapshot {
        detail: Some(DetailSnapshot::Pending(PendingDetail::new(id, never))),
        autolink: link_from(id, Some(github())),
    }
}
