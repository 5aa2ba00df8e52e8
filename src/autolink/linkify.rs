//! Two-phase text rewriting.
//!
//! Every reference scans the current text and swaps each match for a
//! placeholder token (`\0<n>\0`), recording the rendered markup on the side.
//! Later references therefore never see text an earlier one consumed. One
//! final pass replaces every token with its markup.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use tracing::{error, warn};

use crate::autolink::enrich::{DetailSnapshot, SnapshotMap};
use crate::autolink::error::AutolinkError;
use crate::autolink::footnote::Footnotes;
use crate::autolink::pattern::{OutputFormat, PatternCache};
use crate::autolink::reference::{substitute, AutolinkReference, Reference};
use crate::autolink::render::{render_link, LinkTarget};
use crate::git::remote::RemoteInfo;

/// Delimiter that brackets placeholder tokens. Input containing it is not rewritten.
pub const TOKEN_DELIMITER: char = '\u{0}';

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x00([0-9]+)\x00").unwrap());

/// Optional inputs to [`linkify`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkifyOptions<'a> {
    /// Remotes whose providers contribute references in ambient mode.
    pub remotes: Option<&'a [RemoteInfo]>,
    /// Render-time snapshots; when non-empty, only their references are applied.
    pub snapshots: Option<&'a SnapshotMap>,
    /// Ids the caller already footnoted elsewhere in the same output.
    pub footnoted_ids: Option<&'a HashSet<String>>,
}

/// Per-call rewrite state shared by every reference applied in one [`linkify`].
pub struct Tokenizer<'a> {
    format: OutputFormat,
    replacements: Vec<String>,
    snapshots: Option<&'a SnapshotMap>,
    footnoted_ids: Option<&'a HashSet<String>>,
    footnotes: Option<&'a mut Footnotes>,
    footnote_slots: HashMap<String, usize>,
    now: DateTime<Utc>,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(
        format: OutputFormat,
        snapshots: Option<&'a SnapshotMap>,
        footnoted_ids: Option<&'a HashSet<String>>,
        footnotes: Option<&'a mut Footnotes>,
    ) -> Self {
        Self {
            format,
            replacements: Vec::new(),
            snapshots,
            footnoted_ids,
            footnotes,
            footnote_slots: HashMap::new(),
            now: Utc::now(),
        }
    }

    /// Output format being rendered.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Reference time for relative dates.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Records `replacement` and returns the token standing in for it.
    pub fn push(&mut self, replacement: String) -> String {
        let token = format!(
            "{TOKEN_DELIMITER}{}{TOKEN_DELIMITER}",
            self.replacements.len()
        );
        self.replacements.push(replacement);
        token
    }

    /// Render-time detail for `key`, if a snapshot carries one.
    pub fn detail(&self, key: &str) -> Option<&'a DetailSnapshot> {
        self.snapshots?.get(key)?.detail.as_ref()
    }

    /// Returns the footnote number for `key`, writing the footnote the first
    /// time `key` is seen in this call.
    ///
    /// A slot the sink already holds for `key` from an earlier render is
    /// rewritten in place. Otherwise returns `None` when there is no sink or
    /// the caller already footnoted `key`.
    pub fn footnote(&mut self, key: &str, text: impl FnOnce() -> String) -> Option<usize> {
        if let Some(index) = self.footnote_slots.get(key) {
            return Some(*index);
        }
        let sink = self.footnotes.as_deref_mut()?;
        if sink.slot(key).is_none() && self.footnoted_ids.is_some_and(|ids| ids.contains(key)) {
            return None;
        }
        let index = sink.upsert(key, text());
        self.footnote_slots.insert(key.to_string(), index);
        Some(index)
    }

    /// Replaces every token in `text` with its recorded markup.
    pub(crate) fn finish(self, text: &str) -> String {
        if self.replacements.is_empty() {
            return text.to_string();
        }
        TOKEN_PATTERN
            .replace_all(text, |caps: &Captures<'_>| {
                caps.get(1)
                    .and_then(|m| m.as_str().parse::<usize>().ok())
                    .and_then(|i| self.replacements.get(i))
                    .map_or_else(
                        || caps.get(0).map_or("", |m| m.as_str()).to_string(),
                        Clone::clone,
                    )
            })
            .into_owned()
    }
}

/// Rewrites `text`, replacing every recognised reference with markup for `format`.
///
/// With non-empty `options.snapshots` only the references behind those
/// snapshots are applied. Otherwise the custom references run first,
/// followed by each remote provider's references, connected providers
/// first. Plaintext output without a caller `footnotes` sink gets a
/// footnote trailer appended.
pub fn linkify(
    cache: &PatternCache,
    custom: &[Reference],
    text: &str,
    format: OutputFormat,
    options: LinkifyOptions<'_>,
    footnotes: Option<&mut Footnotes>,
) -> String {
    if text.contains(TOKEN_DELIMITER) {
        warn!("Text contains the placeholder delimiter; leaving it unlinked");
        return text.to_string();
    }

    let include_trailer = format == OutputFormat::Plaintext && footnotes.is_none();
    let mut trailer = Footnotes::new();
    let sink = match footnotes {
        Some(sink) => Some(sink),
        None if include_trailer => Some(&mut trailer),
        None => None,
    };

    let mut tokens = Tokenizer::new(format, options.snapshots, options.footnoted_ids, sink);
    let mut text = text.to_string();

    if let Some(snapshots) = options.snapshots.filter(|s| !s.is_empty()) {
        let mut applied = HashSet::new();
        for snapshot in snapshots.values() {
            if let Some(reference) = &snapshot.autolink.reference {
                if applied.insert(reference.key()) {
                    text = apply_reference(cache, reference, &text, &mut tokens);
                }
            }
        }
    } else {
        for reference in custom {
            text = apply_reference(cache, reference, &text, &mut tokens);
        }

        if let Some(remotes) = options.remotes {
            let mut ordered: Vec<&RemoteInfo> = remotes.iter().collect();
            ordered.sort_by_key(|remote| remote.maybe_integration_connected() != Some(true));
            for remote in ordered {
                let Some(provider) = &remote.provider else {
                    continue;
                };
                for reference in &provider.references {
                    text = apply_reference(cache, reference, &text, &mut tokens);
                }
            }
        }
    }

    let mut text = tokens.finish(&text);
    if include_trailer && !trailer.is_empty() {
        text.push_str(&trailer.render_trailer());
    }
    text
}

fn apply_reference(
    cache: &PatternCache,
    reference: &Reference,
    text: &str,
    tokens: &mut Tokenizer<'_>,
) -> String {
    match reference {
        Reference::Dynamic { reference, .. } => reference.tokenize(text, tokens),
        Reference::Pattern(reference) => {
            match cache.get_or_compile(reference, tokens.format().into()) {
                Ok(regex) => tokenize_pattern(reference, &regex, text, tokens),
                Err(e @ AutolinkError::InvalidPattern { .. }) => {
                    error!(prefix = %reference.prefix, error = %e, "Failed to build autolink renderer; skipping reference");
                    text.to_string()
                }
                Err(_) => text.to_string(),
            }
        }
    }
}

fn tokenize_pattern(
    reference: &AutolinkReference,
    regex: &Regex,
    text: &str,
    tokens: &mut Tokenizer<'_>,
) -> String {
    regex
        .replace_all(text, |caps: &Captures<'_>| {
            let group = |i| caps.get(i).map_or("", |m| m.as_str());
            let id = group(3);
            let target = LinkTarget {
                key: id,
                label: group(2),
                url: substitute(&reference.url, id),
                title: reference.title.as_deref().map(|t| substitute(t, id)),
            };
            let replacement = render_link(&target, tokens);
            format!("{}{}", group(1), tokens.push(replacement))
        })
        .into_owned()
}
