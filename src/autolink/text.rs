//! Escaping and formatting helpers shared by the pattern compiler and renderers.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use chrono_humanize::HumanTime;
use regex::Regex;
use url::Url;

/// Separator drawn between a tooltip's title line and its detail block.
pub const DETAIL_SEPARATOR: &str = "\u{2014}\u{2014}";

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static MARKDOWN_SPECIAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\\`*_{}\[\]()#+\-.!]").unwrap());

#[allow(clippy::unwrap_used)] // Compile-time constant regex pattern
static MARKDOWN_HEADER_RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^===").unwrap());

/// Backslash-escapes markdown control characters.
pub fn escape_markdown(s: &str) -> String {
    let escaped = MARKDOWN_SPECIAL_CHARS.replace_all(s, r"\$0");
    MARKDOWN_HEADER_RULE
        .replace_all(&escaped, "\u{200B}===")
        .into_owned()
}

/// Encodes the five HTML-significant characters, leaving everything else intact.
pub fn encode_html_weak(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encodes an assembled link target.
///
/// Targets that do not parse as absolute URLs are returned unchanged.
pub fn encode_url(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_string(), |parsed| parsed.to_string())
}

/// Renders a footnote number with superscript digits.
pub fn superscript(n: usize) -> String {
    n.to_string()
        .chars()
        .map(|c| match c {
            '0' => '\u{2070}',
            '1' => '\u{00B9}',
            '2' => '\u{00B2}',
            '3' => '\u{00B3}',
            '4' => '\u{2074}',
            '5' => '\u{2075}',
            '6' => '\u{2076}',
            '7' => '\u{2077}',
            '8' => '\u{2078}',
            _ => '\u{2079}',
        })
        .collect()
}

/// Upper-cases the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Describes `date` relative to `now`, e.g. `3 days ago`.
pub fn from_now(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    HumanTime::from(date.signed_duration_since(now)).to_string()
}
