//! Pattern compilation and the per-reference compiled-pattern cache.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::autolink::error::AutolinkError;
use crate::autolink::reference::{AutolinkReference, ReferenceKey};
use crate::autolink::text::{encode_html_weak, escape_markdown};

/// Characters that may precede a reference in message text.
const MESSAGE_BOUNDARY: &str = r"(^|\s|\(|\[|\{)";

/// ASCII word character; ids never contain other scripts.
const ASCII_WORD: &str = r"(?-u:\w)";

/// ASCII digit.
const ASCII_DIGIT: &str = "[0-9]";

/// Word boundary after the id, judged on ASCII word characters only.
const ASCII_WORD_END: &str = r"(?-u:\b)";

/// Characters that separate words in a branch name.
pub(crate) const BRANCH_SEPARATORS: [char; 4] = ['-', '_', '.', '/'];

/// Output format requested by the presentation layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text with footnotes.
    #[default]
    Plaintext,
    /// Markdown links with tooltips.
    Markdown,
    /// HTML anchors with title attributes.
    Html,
}

/// Text shape a pattern is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternFormat {
    /// Raw commit-message text.
    Plaintext,
    /// Markdown-escaped, weakly HTML-encoded text.
    Markdown,
    /// Weakly HTML-encoded text.
    Html,
    /// Branch names.
    Branch,
}

impl From<OutputFormat> for PatternFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Plaintext => Self::Plaintext,
            OutputFormat::Markdown => Self::Markdown,
            OutputFormat::Html => Self::Html,
        }
    }
}

fn token_class(reference: &AutolinkReference) -> &'static str {
    if reference.alphanumeric {
        ASCII_WORD
    } else {
        ASCII_DIGIT
    }
}

/// Builds the regex source for `reference` in `format`.
///
/// Message formats capture `(boundary)(label(id))`; the branch format
/// captures the named groups `prefix` and `id`. The branch pattern has no
/// trailing assertion because the regex engine lacks look-ahead: callers
/// check that the match is followed by a separator or the end of input.
pub fn pattern_source(reference: &AutolinkReference, format: PatternFormat) -> String {
    let token = token_class(reference);
    let prefix = match format {
        PatternFormat::Plaintext | PatternFormat::Branch => regex::escape(&reference.prefix),
        PatternFormat::Html => regex::escape(&encode_html_weak(&reference.prefix)),
        PatternFormat::Markdown => {
            // Accept the escaped prefix and, for text the caller did not
            // escape, the raw one.
            let escaped = encode_html_weak(&escape_markdown(&reference.prefix));
            if escaped == reference.prefix {
                regex::escape(&escaped)
            } else {
                format!(
                    "(?:{}|{})",
                    regex::escape(&escaped),
                    regex::escape(&reference.prefix)
                )
            }
        }
    };

    match format {
        PatternFormat::Branch => format!(r"(?:^|[-_./])(?P<prefix>{prefix})(?P<id>{token}+)"),
        _ => format!("{MESSAGE_BOUNDARY}({prefix}({token}+)){ASCII_WORD_END}"),
    }
}

/// Compiles the pattern for `reference` in `format`.
///
/// Branch patterns always ignore case; message patterns honour the
/// reference's `ignore_case` flag.
pub fn compile(reference: &AutolinkReference, format: PatternFormat) -> Result<Regex, AutolinkError> {
    let ignore_case = match format {
        PatternFormat::Branch => true,
        _ => reference.ignore_case,
    };
    RegexBuilder::new(&pattern_source(reference, format))
        .case_insensitive(ignore_case)
        .build()
        .map_err(|source| AutolinkError::InvalidPattern {
            prefix: reference.prefix.clone(),
            source,
        })
}

#[derive(Debug, Default)]
struct CacheState {
    compiled: HashMap<(ReferenceKey, PatternFormat), Arc<Regex>>,
    unrenderable: HashSet<ReferenceKey>,
    compilations: usize,
}

/// Compiled patterns keyed by (reference identity, pattern format).
///
/// A pair is compiled at most once. A reference whose pattern fails to
/// compile is remembered as unrenderable and never compiled again.
#[derive(Debug, Default)]
pub struct PatternCache {
    state: Mutex<CacheState>,
}

impl PatternCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the compiled pattern for `reference` in `format`, compiling it
    /// on first use.
    ///
    /// Returns [`AutolinkError::NotRenderable`] for references without a
    /// prefix or URL and for references that failed before, and
    /// [`AutolinkError::InvalidPattern`] the first time compilation fails.
    pub fn get_or_compile(
        &self,
        reference: &AutolinkReference,
        format: PatternFormat,
    ) -> Result<Arc<Regex>, AutolinkError> {
        let key = reference.key();
        let mut state = self.lock();

        if !reference.is_cacheable() || state.unrenderable.contains(&key) {
            return Err(AutolinkError::NotRenderable {
                prefix: reference.prefix.clone(),
            });
        }
        if let Some(regex) = state.compiled.get(&(key, format)) {
            return Ok(Arc::clone(regex));
        }

        state.compilations += 1;
        match compile(reference, format) {
            Ok(regex) => {
                debug!(prefix = %reference.prefix, ?format, "Compiled autolink pattern");
                let regex = Arc::new(regex);
                state.compiled.insert((key, format), Arc::clone(&regex));
                Ok(regex)
            }
            Err(e) => {
                state.unrenderable.insert(key);
                Err(e)
            }
        }
    }

    /// Whether `key` previously failed to compile.
    pub fn is_unrenderable(&self, key: ReferenceKey) -> bool {
        self.lock().unrenderable.contains(&key)
    }

    /// Number of compilations performed so far, successful or not.
    pub fn compilations(&self) -> usize {
        self.lock().compilations
    }

    /// Number of cached patterns.
    pub fn len(&self) -> usize {
        self.lock().compiled.len()
    }

    /// Whether no pattern has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached pattern and failure record.
    pub fn clear(&self) {
        *self.lock() = CacheState::default();
    }
}
