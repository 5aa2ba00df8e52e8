//! References whose identifiers are not a fixed prefix plus a token.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::autolink::error::AutolinkError;
use crate::autolink::extract::{branch_id_end, char_offset, insert_branch_autolink};
use crate::autolink::linkify::Tokenizer;
use crate::autolink::pattern::OutputFormat;
use crate::autolink::reference::{
    substitute, Autolink, AutolinkMap, AutolinkType, DynamicReference, ProviderRef,
    RepositoryDescriptor,
};
use crate::autolink::render::{render_link, LinkTarget};

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static CROSS_REPOSITORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|\s|\(|\[|\{)(([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)#([0-9]+))(?-u:\b)").unwrap()
});

// Markdown-escaped text carries backslashes before `-`, `.`, `_` and `#`.
#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static CROSS_REPOSITORY_ESCAPED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(^|\s|\(|\[|\{)(((?:\\?[A-Za-z0-9_.-])+)/((?:\\?[A-Za-z0-9_.-])+)\\?#([0-9]+))(?-u:\b)",
    )
    .unwrap()
});

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static PROJECT_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s|\(|\[|\{)(([A-Z][A-Z0-9_]+)\\?-([0-9]+))(?-u:\b)").unwrap());

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static PROJECT_KEY_BRANCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[-_./])(?P<key>(?-u:[a-z][a-z0-9]+))-(?P<id>[0-9]+)").unwrap()
});

fn unescape(s: &str) -> String {
    s.replace('\\', "")
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map_or("", |m| m.as_str())
}

/// GitHub-style `owner/repo#123` references to another repository.
///
/// Results are keyed by the normalised label (`owner/repo#123`) so that
/// the same number in different repositories stays distinct.
#[derive(Debug, Clone)]
pub struct CrossRepositoryReference {
    domain: String,
}

impl CrossRepositoryReference {
    /// Creates a reference resolving against `https://{domain}`.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    fn url(&self, owner: &str, repo: &str, id: &str) -> String {
        format!("https://{}/{owner}/{repo}/issues/{id}", self.domain)
    }

    fn title(owner: &str, repo: &str, id: &str) -> String {
        format!("Open Issue or Pull Request {owner}/{repo}#{id}")
    }
}

impl DynamicReference for CrossRepositoryReference {
    fn name(&self) -> &str {
        "cross-repository"
    }

    fn extract_from_text(
        &self,
        text: &str,
        provider: Option<&ProviderRef>,
        links: &mut AutolinkMap,
    ) -> Result<(), AutolinkError> {
        for caps in CROSS_REPOSITORY.captures_iter(text) {
            let (owner, repo, id) = (group(&caps, 3), group(&caps, 4), group(&caps, 5));
            let index = caps.get(2).map_or(0, |m| char_offset(text, m.start()));
            links.insert(
                format!("{owner}/{repo}#{id}"),
                Autolink {
                    provider: provider.cloned(),
                    id: id.to_string(),
                    index,
                    prefix: format!("{owner}/{repo}#"),
                    url: self.url(owner, repo, id),
                    alphanumeric: false,
                    ignore_case: false,
                    title: Some(Self::title(owner, repo, id)),
                    description: None,
                    kind: None,
                    descriptor: Some(RepositoryDescriptor::new(owner, repo)),
                    reference: None,
                },
            );
        }
        Ok(())
    }

    fn tokenize(&self, text: &str, tokens: &mut Tokenizer<'_>) -> String {
        let pattern = match tokens.format() {
            OutputFormat::Markdown => &CROSS_REPOSITORY_ESCAPED,
            OutputFormat::Plaintext | OutputFormat::Html => &CROSS_REPOSITORY,
        };
        pattern
            .replace_all(text, |caps: &Captures<'_>| {
                let owner = unescape(group(caps, 3));
                let repo = unescape(group(caps, 4));
                let id = group(caps, 5);
                let key = format!("{owner}/{repo}#{id}");
                let target = LinkTarget {
                    key: &key,
                    label: group(caps, 2),
                    url: self.url(&owner, &repo, id),
                    title: Some(Self::title(&owner, &repo, id)),
                };
                let replacement = render_link(&target, tokens);
                format!("{}{}", group(caps, 1), tokens.push(replacement))
            })
            .into_owned()
    }
}

/// Project-key references such as `PROJ-123`.
///
/// Results are keyed `KEY-123` with prefix `KEY-` and id `123`. With
/// [`with_keys`](Self::with_keys) only the listed keys are recognised;
/// branch names are only scanned when keys are listed.
#[derive(Debug, Clone)]
pub struct ProjectKeyReference {
    url: String,
    title: Option<String>,
    keys: Vec<String>,
}

impl ProjectKeyReference {
    /// Creates a reference whose `url` template receives the full key in
    /// place of `<num>`, e.g. `https://example.atlassian.net/browse/<num>`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            keys: Vec::new(),
        }
    }

    /// Restricts recognition to `keys` (compared case-insensitively).
    #[must_use]
    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys
            .into_iter()
            .map(|k| k.into().to_ascii_uppercase())
            .collect();
        self
    }

    /// Sets the tooltip template; `<num>` receives the full key.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn accepts(&self, key: &str) -> bool {
        self.keys.is_empty() || self.keys.iter().any(|k| k.eq_ignore_ascii_case(key))
    }

    fn autolink(
        &self,
        provider: Option<&ProviderRef>,
        key: &str,
        id: &str,
        index: usize,
    ) -> Autolink {
        let full = format!("{key}-{id}");
        Autolink {
            provider: provider.cloned(),
            id: id.to_string(),
            index,
            prefix: format!("{key}-"),
            url: substitute(&self.url, &full),
            alphanumeric: false,
            ignore_case: false,
            title: self.title.as_deref().map(|t| substitute(t, &full)),
            description: None,
            kind: Some(AutolinkType::Issue),
            descriptor: None,
            reference: None,
        }
    }
}

impl DynamicReference for ProjectKeyReference {
    fn name(&self) -> &str {
        "project-key"
    }

    fn extract_from_text(
        &self,
        text: &str,
        provider: Option<&ProviderRef>,
        links: &mut AutolinkMap,
    ) -> Result<(), AutolinkError> {
        if self.url.is_empty() {
            return Err(AutolinkError::Extraction {
                reference: self.name().to_string(),
                message: "no URL template".to_string(),
            });
        }
        for caps in PROJECT_KEY.captures_iter(text) {
            let (key, id) = (group(&caps, 3), group(&caps, 4));
            if group(&caps, 2).contains('\\') || !self.accepts(key) {
                continue;
            }
            let index = caps.get(2).map_or(0, |m| char_offset(text, m.start()));
            links.insert(format!("{key}-{id}"), self.autolink(provider, key, id, index));
        }
        Ok(())
    }

    fn extract_from_branch_name(
        &self,
        branch: &str,
        provider: Option<&ProviderRef>,
        links: &mut AutolinkMap,
    ) -> Result<(), AutolinkError> {
        if self.keys.is_empty() {
            return Ok(());
        }
        let mut at = 0;
        while let Some(caps) = PROJECT_KEY_BRANCH.captures_at(branch, at) {
            let (Some(whole), Some(key), Some(id)) =
                (caps.get(0), caps.name("key"), caps.name("id"))
            else {
                break;
            };
            let end = branch_id_end(branch, id).filter(|_| self.accepts(key.as_str()));
            if let Some(end) = end {
                let key_text = key.as_str().to_ascii_uppercase();
                let link = self.autolink(
                    provider,
                    &key_text,
                    &branch[id.start()..end],
                    char_offset(branch, key.start()),
                );
                insert_branch_autolink(links, link);
                at = end;
            } else {
                at = whole.start()
                    + branch[whole.start()..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
            }
        }
        Ok(())
    }

    fn tokenize(&self, text: &str, tokens: &mut Tokenizer<'_>) -> String {
        PROJECT_KEY
            .replace_all(text, |caps: &Captures<'_>| {
                let (key, id) = (group(caps, 3), group(caps, 4));
                if !self.accepts(key) {
                    return group(caps, 0).to_string();
                }
                let full = format!("{key}-{id}");
                let target = LinkTarget {
                    key: &full,
                    label: group(caps, 2),
                    url: substitute(&self.url, &full),
                    title: self.title.as_deref().map(|t| substitute(t, &full)),
                };
                let replacement = render_link(&target, tokens);
                format!("{}{}", group(caps, 1), tokens.push(replacement))
            })
            .into_owned()
    }
}
