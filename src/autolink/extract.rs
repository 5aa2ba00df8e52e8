//! Message and branch-name scans.

use std::sync::Arc;

use regex::{Match, Regex};
use tracing::error;

use crate::autolink::collector::ReferenceSet;
use crate::autolink::error::AutolinkError;
use crate::autolink::pattern::{PatternCache, PatternFormat, BRANCH_SEPARATORS};
use crate::autolink::rank::rank;
use crate::autolink::reference::{
    Autolink, AutolinkMap, AutolinkReference, AutolinkType, Reference, ReferenceScope,
};

/// Character offset of byte offset `byte` in `text`.
pub(crate) fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Whether `text` ends at `byte` or continues with a branch separator.
fn at_branch_boundary(text: &str, byte: usize) -> bool {
    text[byte..]
        .chars()
        .next()
        .map_or(true, |c| BRANCH_SEPARATORS.contains(&c))
}

/// End of the longest leading part of `id` that is followed by a branch
/// separator or the end of `text`.
///
/// Mirrors a greedy id with a trailing separator look-ahead, which the
/// regex engine cannot express.
pub(crate) fn branch_id_end(text: &str, id: Match<'_>) -> Option<usize> {
    if at_branch_boundary(text, id.end()) {
        return Some(id.end());
    }
    id.as_str()
        .char_indices()
        .rev()
        .find(|&(i, c)| i > 0 && BRANCH_SEPARATORS.contains(&c))
        .map(|(i, _)| id.start() + i)
}

fn compiled(
    cache: &PatternCache,
    reference: &AutolinkReference,
    format: PatternFormat,
) -> Option<Arc<Regex>> {
    match cache.get_or_compile(reference, format) {
        Ok(regex) => Some(regex),
        Err(e @ AutolinkError::InvalidPattern { .. }) => {
            error!(prefix = %reference.prefix, error = %e, "Failed to compile autolink pattern; skipping reference");
            None
        }
        Err(_) => None,
    }
}

/// Scans a commit message.
///
/// Results are keyed by id. A later set, or a later reference in the same
/// set, overwrites an earlier match of the same id. Branch-scoped references
/// are skipped. A failing dynamic reference aborts the whole scan.
pub fn extract_from_text(
    text: &str,
    sets: &[ReferenceSet],
    cache: &PatternCache,
) -> Result<AutolinkMap, AutolinkError> {
    let mut links = AutolinkMap::new();

    for set in sets {
        for reference in &set.references {
            match reference {
                Reference::Dynamic {
                    reference: dynamic, ..
                } => {
                    dynamic.extract_from_text(text, set.provider.as_ref(), &mut links)?;
                    claim_unowned(&mut links, reference);
                }
                Reference::Pattern(pattern) => {
                    if !pattern.applies_to(ReferenceScope::Commit) {
                        continue;
                    }
                    let Some(regex) = compiled(cache, pattern, PatternFormat::Plaintext) else {
                        continue;
                    };
                    for caps in regex.captures_iter(text) {
                        let (Some(label), Some(id)) = (caps.get(2), caps.get(3)) else {
                            continue;
                        };
                        let index = char_offset(text, label.start());
                        let link = pattern.autolink(
                            reference,
                            set.provider.as_ref(),
                            id.as_str(),
                            index,
                        );
                        links.insert(id.as_str().to_string(), link);
                    }
                }
            }
        }
    }

    Ok(links)
}

/// Scans a branch name.
///
/// Results are keyed by resolved URL, keep the earliest occurrence of each
/// URL, and come back ranked. Pull-request and commit-scoped references are
/// skipped.
pub fn extract_from_branch_name(
    branch: &str,
    sets: &[ReferenceSet],
    cache: &PatternCache,
) -> Result<AutolinkMap, AutolinkError> {
    let mut links = AutolinkMap::new();

    for set in sets {
        for reference in &set.references {
            match reference {
                Reference::Dynamic {
                    reference: dynamic, ..
                } => {
                    dynamic.extract_from_branch_name(branch, set.provider.as_ref(), &mut links)?;
                    claim_unowned(&mut links, reference);
                }
                Reference::Pattern(pattern) => {
                    if pattern.kind == Some(AutolinkType::PullRequest)
                        || !pattern.applies_to(ReferenceScope::Branch)
                    {
                        continue;
                    }
                    let Some(regex) = compiled(cache, pattern, PatternFormat::Branch) else {
                        continue;
                    };
                    for (start, id) in branch_matches(&regex, branch) {
                        let link = pattern.autolink(
                            reference,
                            set.provider.as_ref(),
                            id,
                            char_offset(branch, start),
                        );
                        insert_branch_autolink(&mut links, link);
                    }
                }
            }
        }
    }

    rank(&mut links);
    Ok(links)
}

/// Finds non-overlapping branch matches, returning the byte offset of each
/// prefix and the matched id.
///
/// An id not followed by a separator is cut back to its last inner
/// separator; a candidate with none is rejected and the search resumes one
/// character later.
fn branch_matches<'t>(regex: &Regex, branch: &'t str) -> Vec<(usize, &'t str)> {
    let mut found = Vec::new();
    let mut at = 0;
    while at <= branch.len() {
        let Some(caps) = regex.captures_at(branch, at) else {
            break;
        };
        let (Some(whole), Some(prefix), Some(id)) =
            (caps.get(0), caps.name("prefix"), caps.name("id"))
        else {
            break;
        };
        if let Some(end) = branch_id_end(branch, id) {
            found.push((prefix.start(), &branch[id.start()..end]));
            at = end;
        } else {
            at = whole.start()
                + branch[whole.start()..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
        }
    }
    found
}

/// Records a branch-scan match under its URL, keeping the earlier position
/// when the URL is already present.
pub fn insert_branch_autolink(links: &mut AutolinkMap, autolink: Autolink) {
    match links.get_mut(&autolink.url) {
        Some(existing) if existing.index <= autolink.index => {}
        Some(existing) => *existing = autolink,
        None => {
            links.insert(autolink.url.clone(), autolink);
        }
    }
}

/// Points matches a dynamic reference wrote without an owner back at it.
fn claim_unowned(links: &mut AutolinkMap, reference: &Reference) {
    for link in links.values_mut().filter(|l| l.reference.is_none()) {
        link.reference = Some(reference.clone());
    }
}
