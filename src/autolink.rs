//! Autolink detection and rendering.
//!
//! [`Autolinks`] owns the user's custom references, the registered issue
//! integrations and the compiled-pattern cache. Scans run against reference
//! sets gathered from those sources plus the remote under consideration;
//! [`Autolinks::linkify`] rewrites text for an output format.

pub mod collector;
pub mod dynamic;
pub mod enrich;
pub mod error;
pub mod extract;
pub mod footnote;
pub mod integration;
pub mod issue;
pub mod linkify;
pub mod pattern;
pub mod rank;
pub mod reference;
pub mod render;
pub mod text;

#[cfg(test)]
pub(crate) mod test_utils;

use std::sync::Arc;

use tracing::debug;

pub use collector::{CollectOptions, ReferenceSet};
pub use dynamic::{CrossRepositoryReference, ProjectKeyReference};
pub use enrich::{
    DetailSnapshot, EnrichedAutolink, EnrichedAutolinks, PendingDetail, RenderSnapshot,
    SnapshotMap,
};
pub use error::AutolinkError;
pub use footnote::Footnotes;
pub use integration::IssueIntegration;
pub use issue::{IssueOrPullRequest, IssueState};
pub use linkify::{LinkifyOptions, TOKEN_DELIMITER};
pub use pattern::{OutputFormat, PatternCache};
pub use reference::{
    Autolink, AutolinkConfig, AutolinkMap, AutolinkReference, AutolinkType, DynamicReference,
    ProviderRef, Reference, ReferenceScope, RepositoryDescriptor,
};

use crate::config::Settings;
use crate::git::remote::RemoteInfo;

/// Options for [`Autolinks::get_autolinks`] and
/// [`Autolinks::get_branch_autolinks`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Leave the user's custom references out.
    pub exclude_custom: bool,
}

/// The autolink engine.
#[derive(Debug, Default)]
pub struct Autolinks {
    references: Vec<Reference>,
    integrations: Vec<Arc<dyn IssueIntegration>>,
    cache: PatternCache,
}

impl Autolinks {
    /// Creates an engine with one custom reference per configuration entry.
    ///
    /// Each entry is copied into a fresh reference; entries without a prefix
    /// or URL are kept but never match.
    pub fn new(configs: &[AutolinkConfig]) -> Self {
        let references: Vec<Reference> = configs
            .iter()
            .map(|config| Reference::pattern(AutolinkReference::from_config(config)))
            .collect();
        debug!(count = references.len(), "Loaded custom autolinks");
        Self {
            references,
            ..Self::default()
        }
    }

    /// Creates an engine from loaded settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.autolinks)
    }

    /// Registers an issue integration.
    #[must_use]
    pub fn with_integration(mut self, integration: Arc<dyn IssueIntegration>) -> Self {
        self.integrations.push(integration);
        self
    }

    /// Appends a custom reference, such as a [`ProjectKeyReference`].
    #[must_use]
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    /// Custom references in application order.
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Registered integrations.
    pub fn integrations(&self) -> &[Arc<dyn IssueIntegration>] {
        &self.integrations
    }

    /// The compiled-pattern cache.
    pub fn cache(&self) -> &PatternCache {
        &self.cache
    }

    /// Collects the reference sets for a scan.
    pub async fn reference_sets(
        &self,
        remote: Option<&RemoteInfo>,
        options: CollectOptions,
    ) -> Vec<ReferenceSet> {
        collector::collect_reference_sets(&self.integrations, remote, &self.references, options)
            .await
    }

    /// Extracts autolinks from a commit message, keyed by id.
    pub async fn get_autolinks(
        &self,
        message: &str,
        remote: Option<&RemoteInfo>,
        options: ScanOptions,
    ) -> Result<AutolinkMap, AutolinkError> {
        let sets = self
            .reference_sets(
                remote,
                CollectOptions {
                    for_branch: false,
                    exclude_custom: options.exclude_custom,
                },
            )
            .await;
        extract::extract_from_text(message, &sets, &self.cache)
    }

    /// Extracts ranked autolinks from a branch name, keyed by URL.
    pub async fn get_branch_autolinks(
        &self,
        branch: &str,
        remote: Option<&RemoteInfo>,
        options: ScanOptions,
    ) -> Result<AutolinkMap, AutolinkError> {
        let sets = self
            .reference_sets(
                remote,
                CollectOptions {
                    for_branch: true,
                    exclude_custom: options.exclude_custom,
                },
            )
            .await;
        extract::extract_from_branch_name(branch, &sets, &self.cache)
    }

    /// Attaches detail lookups to already extracted autolinks.
    pub async fn enrich_autolinks(
        &self,
        links: &AutolinkMap,
        remote: Option<&RemoteInfo>,
    ) -> EnrichedAutolinks {
        enrich::enrich(links, remote, &self.integrations).await
    }

    /// Extracts autolinks from a commit message and attaches detail lookups.
    pub async fn get_enriched_autolinks(
        &self,
        message: &str,
        remote: Option<&RemoteInfo>,
    ) -> Result<EnrichedAutolinks, AutolinkError> {
        let links = self
            .get_autolinks(message, remote, ScanOptions::default())
            .await?;
        Ok(self.enrich_autolinks(&links, remote).await)
    }

    /// Rewrites `text` for `format`. See [`linkify::linkify`].
    pub fn linkify(
        &self,
        text: &str,
        format: OutputFormat,
        options: LinkifyOptions<'_>,
        footnotes: Option<&mut Footnotes>,
    ) -> String {
        linkify::linkify(
            &self.cache,
            &self.references,
            text,
            format,
            options,
            footnotes,
        )
    }
}
