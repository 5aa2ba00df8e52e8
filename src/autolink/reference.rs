//! Reference patterns and the autolinks they produce.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::autolink::error::AutolinkError;
use crate::autolink::linkify::Tokenizer;

/// Placeholder replaced with the matched id in URL, title and description templates.
pub const NUM_PLACEHOLDER: &str = "<num>";

/// Kind of item an autolink points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutolinkType {
    /// An issue.
    #[serde(rename = "issue")]
    Issue,
    /// A pull or merge request.
    #[serde(rename = "pullrequest")]
    PullRequest,
}

impl fmt::Display for AutolinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issue => write!(f, "Issue"),
            Self::PullRequest => write!(f, "Pull Request"),
        }
    }
}

/// Scan a reference is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceScope {
    /// Commit messages only.
    Commit,
    /// Branch names only.
    Branch,
}

/// Identity of the provider (integration or remote host) an autolink comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderRef {
    /// Stable provider id, e.g. `github` or `jira`.
    pub id: String,
    /// Display name, e.g. `GitHub`.
    pub name: String,
    /// Host the provider serves, e.g. `github.com`.
    pub domain: String,
}

impl ProviderRef {
    /// Creates a provider identity.
    pub fn new(id: impl Into<String>, name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            domain: domain.into(),
        }
    }

    /// Whether both identities name the same provider instance.
    ///
    /// The display name is ignored.
    pub fn same_origin(&self, other: &Self) -> bool {
        self.id == other.id && self.domain == other.domain
    }
}

/// Repository that the ids of a reference belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    /// Owner (user, organisation or group path).
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepositoryDescriptor {
    /// Creates a repository descriptor.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepositoryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A user-configured autolink as stored in settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutolinkConfig {
    /// Literal prefix preceding the id, e.g. `#` or `JIRA-`.
    #[serde(default)]
    pub prefix: Option<String>,
    /// URL template containing `<num>`.
    #[serde(default)]
    pub url: Option<String>,
    /// Whether ids may contain letters (`\w+`) rather than digits only.
    #[serde(default)]
    pub alphanumeric: bool,
    /// Whether message matching ignores case.
    #[serde(default)]
    pub ignore_case: bool,
    /// Tooltip template containing `<num>`.
    #[serde(default)]
    pub title: Option<String>,
    /// Description template containing `<num>`.
    #[serde(default)]
    pub description: Option<String>,
    /// Kind of item the reference points at.
    #[serde(default, rename = "type")]
    pub kind: Option<AutolinkType>,
    /// Scan the reference is restricted to.
    #[serde(default)]
    pub reference_type: Option<ReferenceScope>,
}

static NEXT_REFERENCE_KEY: AtomicU64 = AtomicU64::new(1);

/// Identity of one reference instance; keys the compiled-pattern cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceKey(u64);

impl ReferenceKey {
    fn next() -> Self {
        Self(NEXT_REFERENCE_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// A prefix-plus-token reference pattern.
///
/// Every instance gets its own [`ReferenceKey`]. Not `Clone`: two instances
/// never share cached patterns.
#[derive(Debug)]
pub struct AutolinkReference {
    key: ReferenceKey,
    /// Literal prefix; empty when absent.
    pub prefix: String,
    /// URL template; empty when absent.
    pub url: String,
    /// Whether ids may contain letters.
    pub alphanumeric: bool,
    /// Whether message matching ignores case.
    pub ignore_case: bool,
    /// Tooltip template.
    pub title: Option<String>,
    /// Description template.
    pub description: Option<String>,
    /// Kind of item the reference points at.
    pub kind: Option<AutolinkType>,
    /// Scan the reference is restricted to.
    pub reference_type: Option<ReferenceScope>,
    /// Repository the ids belong to, when known.
    pub descriptor: Option<RepositoryDescriptor>,
}

impl AutolinkReference {
    /// Creates a digits-only, case-sensitive reference.
    pub fn new(prefix: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            key: ReferenceKey::next(),
            prefix: prefix.into(),
            url: url.into(),
            alphanumeric: false,
            ignore_case: false,
            title: None,
            description: None,
            kind: None,
            reference_type: None,
            descriptor: None,
        }
    }

    /// Copies a configuration entry into a fresh reference.
    pub fn from_config(config: &AutolinkConfig) -> Self {
        Self {
            alphanumeric: config.alphanumeric,
            ignore_case: config.ignore_case,
            title: config.title.clone(),
            description: config.description.clone(),
            kind: config.kind,
            reference_type: config.reference_type,
            ..Self::new(
                config.prefix.clone().unwrap_or_default(),
                config.url.clone().unwrap_or_default(),
            )
        }
    }

    /// Sets the token shape.
    #[must_use]
    pub fn alphanumeric(mut self, alphanumeric: bool) -> Self {
        self.alphanumeric = alphanumeric;
        self
    }

    /// Sets message-scan case sensitivity.
    #[must_use]
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Sets the tooltip template.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description template.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the kind of item referenced.
    #[must_use]
    pub fn kind(mut self, kind: AutolinkType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts the reference to one kind of scan.
    #[must_use]
    pub fn reference_type(mut self, scope: ReferenceScope) -> Self {
        self.reference_type = Some(scope);
        self
    }

    /// Sets the repository the ids belong to.
    #[must_use]
    pub fn descriptor(mut self, descriptor: RepositoryDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    /// Returns the cache identity of this instance.
    pub fn key(&self) -> ReferenceKey {
        self.key
    }

    /// Whether the reference has both a prefix and a URL template.
    pub fn is_cacheable(&self) -> bool {
        !self.prefix.is_empty() && !self.url.is_empty()
    }

    /// Whether the reference applies to scans of the given scope.
    pub fn applies_to(&self, scope: ReferenceScope) -> bool {
        self.reference_type.map_or(true, |declared| declared == scope)
    }

    /// Builds the autolink for one match of this reference.
    pub(crate) fn autolink(
        &self,
        owner: &Reference,
        provider: Option<&ProviderRef>,
        id: &str,
        index: usize,
    ) -> Autolink {
        Autolink {
            provider: provider.cloned(),
            id: id.to_string(),
            index,
            prefix: self.prefix.clone(),
            url: substitute(&self.url, id),
            alphanumeric: self.alphanumeric,
            ignore_case: self.ignore_case,
            title: self.title.as_deref().map(|t| substitute(t, id)),
            description: self.description.as_deref().map(|d| substitute(d, id)),
            kind: self.kind,
            descriptor: self.descriptor.clone(),
            reference: Some(owner.clone()),
        }
    }
}

/// Replaces every `<num>` in `template` with `id`.
pub fn substitute(template: &str, id: &str) -> String {
    template.replace(NUM_PLACEHOLDER, id)
}

/// A reference whose identifier grammar is not prefix-plus-token.
///
/// Implementations write straight into the result collection and are
/// responsible for their own keys and deduplication.
pub trait DynamicReference: Send + Sync + fmt::Debug {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Scans commit-message text, inserting autolinks into `links`.
    fn extract_from_text(
        &self,
        text: &str,
        provider: Option<&ProviderRef>,
        links: &mut AutolinkMap,
    ) -> Result<(), AutolinkError>;

    /// Scans a branch name, inserting autolinks keyed by resolved URL.
    fn extract_from_branch_name(
        &self,
        _branch: &str,
        _provider: Option<&ProviderRef>,
        _links: &mut AutolinkMap,
    ) -> Result<(), AutolinkError> {
        Ok(())
    }

    /// Rewrites `text`, routing every replacement through `tokens`.
    fn tokenize(&self, text: &str, _tokens: &mut Tokenizer<'_>) -> String {
        text.to_string()
    }
}

/// One entry of a reference set.
#[derive(Debug, Clone)]
pub enum Reference {
    /// Prefix-plus-token pattern.
    Pattern(Arc<AutolinkReference>),
    /// Custom extraction routine.
    Dynamic {
        /// Identity of this entry.
        key: ReferenceKey,
        /// The routine itself.
        reference: Arc<dyn DynamicReference>,
    },
}

impl Reference {
    /// Wraps a pattern reference.
    pub fn pattern(reference: AutolinkReference) -> Self {
        Self::Pattern(Arc::new(reference))
    }

    /// Wraps a dynamic reference.
    pub fn dynamic(reference: impl DynamicReference + 'static) -> Self {
        Self::Dynamic {
            key: ReferenceKey::next(),
            reference: Arc::new(reference),
        }
    }

    /// Returns the cache identity of the wrapped reference.
    pub fn key(&self) -> ReferenceKey {
        match self {
            Self::Pattern(reference) => reference.key(),
            Self::Dynamic { key, .. } => *key,
        }
    }

    /// Returns the pattern reference, if this is one.
    pub fn as_pattern(&self) -> Option<&AutolinkReference> {
        match self {
            Self::Pattern(reference) => Some(reference),
            Self::Dynamic { .. } => None,
        }
    }

    /// Whether this is a dynamic reference.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic { .. })
    }
}

/// One concrete match of a reference against source text.
#[derive(Debug, Clone, Serialize)]
pub struct Autolink {
    /// Provider the owning reference set came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderRef>,
    /// Matched id.
    pub id: String,
    /// Character offset of the match; meaningful for branch scans.
    pub index: usize,
    /// Literal prefix of the owning reference.
    pub prefix: String,
    /// Resolved URL.
    pub url: String,
    /// Whether the owning reference accepts letters.
    pub alphanumeric: bool,
    /// Whether the owning reference ignores case.
    pub ignore_case: bool,
    /// Resolved tooltip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Resolved description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Kind of item referenced.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<AutolinkType>,
    /// Repository the id belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<RepositoryDescriptor>,
    /// Reference that produced this match; used to render it again.
    #[serde(skip)]
    pub reference: Option<Reference>,
}

/// Ordered autolinks keyed by id (message scans) or resolved URL (branch scans).
pub type AutolinkMap = IndexMap<String, Autolink>;
