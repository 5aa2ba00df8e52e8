//! Issue and pull-request details returned by lookups.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::autolink::reference::{AutolinkType, ProviderRef};

/// Lifecycle state of an issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    /// Still open.
    Opened,
    /// Closed without merging.
    Closed,
    /// Merged (pull requests only).
    Merged,
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened => write!(f, "opened"),
            Self::Closed => write!(f, "closed"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// Human-readable detail for one referenced issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOrPullRequest {
    /// Issue or pull request.
    #[serde(rename = "type")]
    pub kind: AutolinkType,
    /// Provider-side id.
    pub id: String,
    /// Title as entered on the provider.
    pub title: String,
    /// Canonical URL.
    pub url: String,
    /// Current state.
    pub state: IssueState,
    /// Creation time.
    pub created_date: DateTime<Utc>,
    /// Close or merge time.
    #[serde(default)]
    pub closed_date: Option<DateTime<Utc>>,
    /// Provider that served the detail.
    pub provider: ProviderRef,
}

impl IssueOrPullRequest {
    /// Whether the item is no longer open.
    pub fn is_closed(&self) -> bool {
        self.state != IssueState::Opened
    }

    /// Close date for finished items, creation date otherwise.
    pub fn last_transition(&self) -> DateTime<Utc> {
        self.closed_date.unwrap_or(self.created_date)
    }
}
