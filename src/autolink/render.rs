//! Per-format rendering of a single match.

use chrono::{DateTime, Utc};

use crate::autolink::enrich::DetailSnapshot;
use crate::autolink::issue::IssueOrPullRequest;
use crate::autolink::linkify::Tokenizer;
use crate::autolink::pattern::OutputFormat;
use crate::autolink::text::{
    capitalize, encode_html_weak, encode_url, escape_markdown, from_now, superscript,
    DETAIL_SEPARATOR,
};

const LOADING: &str = "Loading...";

/// One match, ready to render.
#[derive(Debug, Clone)]
pub struct LinkTarget<'a> {
    /// Key of the match in the result collection; used for snapshots and footnotes.
    pub key: &'a str,
    /// Matched text (prefix and id) as it appears in the input.
    pub label: &'a str,
    /// Resolved URL, not yet encoded.
    pub url: String,
    /// Resolved tooltip template.
    pub title: Option<String>,
}

/// Renders `target` for the tokenizer's output format.
///
/// Footnotes are registered on `tokens` as a side effect; the returned
/// string is the final replacement for the matched label.
pub fn render_link(target: &LinkTarget<'_>, tokens: &mut Tokenizer<'_>) -> String {
    match tokens.format() {
        OutputFormat::Plaintext => render_plaintext(target, tokens),
        OutputFormat::Markdown => render_markdown(target, tokens),
        OutputFormat::Html => render_html(target, tokens),
    }
}

fn state_line(issue: &IssueOrPullRequest, now: DateTime<Utc>) -> String {
    format!(
        "{}, {} {}",
        capitalize(&issue.state.to_string()),
        if issue.is_closed() { "closed" } else { "opened" },
        from_now(issue.last_transition(), now)
    )
}

fn render_plaintext(target: &LinkTarget<'_>, tokens: &mut Tokenizer<'_>) -> String {
    let label = target.label;
    match tokens.detail(target.key) {
        Some(DetailSnapshot::Ready(issue)) => {
            let now = tokens.now();
            let index = tokens.footnote(target.key, || {
                format!(
                    "{label}: {}  \u{2022}  {}",
                    issue.title.trim(),
                    state_line(issue, now)
                )
            });
            match index {
                Some(index) => format!("{label}{}", superscript(index)),
                None => label.to_string(),
            }
        }
        Some(DetailSnapshot::Pending(pending)) => {
            if let Some(index) = tokens.footnote(target.key, || format!("{label}: {LOADING}")) {
                pending.reserve(index);
            }
            label.to_string()
        }
        None => label.to_string(),
    }
}

/// Collects tooltip lines, registering any footnote along the way.
fn tooltip_lines(
    target: &LinkTarget<'_>,
    tokens: &mut Tokenizer<'_>,
    footnote: impl FnOnce(Option<&IssueOrPullRequest>, &str) -> String,
) -> Vec<String> {
    let mut lines: Vec<String> = target.title.iter().cloned().collect();
    let detail = tokens.detail(target.key);
    if detail.is_some() && !lines.is_empty() {
        lines.push(DETAIL_SEPARATOR.to_string());
    }
    let url = encode_url(&target.url);
    match detail {
        Some(DetailSnapshot::Ready(issue)) => {
            let now = tokens.now();
            tokens.footnote(target.key, || footnote(Some(issue), &url));
            lines.push(issue.title.trim().to_string());
            lines.push(state_line(issue, now));
        }
        Some(DetailSnapshot::Pending(pending)) => {
            if let Some(index) = tokens.footnote(target.key, || footnote(None, &url)) {
                pending.reserve(index);
            }
            lines.push(LOADING.to_string());
        }
        None => {}
    }
    lines
}

fn render_markdown(target: &LinkTarget<'_>, tokens: &mut Tokenizer<'_>) -> String {
    let label = target.label;
    let now = tokens.now();
    let lines = tooltip_lines(target, tokens, |issue, url| match issue {
        Some(issue) => format!(
            "[**{}**]({url} \"Open {} {} on {}\")\\\n{}{label} {}",
            escape_markdown(issue.title.trim()),
            issue.kind,
            label.replace('\\', ""),
            issue.provider.name,
            "\u{00A0}".repeat(5),
            state_line(issue, now)
        ),
        None => format!("[{label} {LOADING}]({url})"),
    });

    let url = encode_url(&target.url);
    if lines.is_empty() {
        format!("[{label}]({url})")
    } else {
        format!(
            "[{label}]({url} \"{}\")",
            lines.join("\n").replace('"', "\\\"")
        )
    }
}

fn render_html(target: &LinkTarget<'_>, tokens: &mut Tokenizer<'_>) -> String {
    let label = target.label;
    let now = tokens.now();
    let lines = tooltip_lines(target, tokens, |issue, url| {
        let href = encode_html_weak(url);
        match issue {
            Some(issue) => format!(
                "<a href=\"{href}\" title=\"Open {} {label} on {}\"><b>{}</b></a><br/>{label} {}",
                issue.kind,
                encode_html_weak(&issue.provider.name),
                encode_html_weak(issue.title.trim()),
                encode_html_weak(&state_line(issue, now))
            ),
            None => format!("<a href=\"{href}\">{label} {LOADING}</a>"),
        }
    });

    let href = encode_html_weak(&encode_url(&target.url));
    if lines.is_empty() {
        format!("<a href=\"{href}\">{label}</a>")
    } else {
        format!(
            "<a href=\"{href}\" title=\"{}\">{label}</a>",
            encode_html_weak(&lines.join("\n"))
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::autolink::enrich::{RenderSnapshot, SnapshotMap};
    use crate::autolink::footnote::Footnotes;
    use crate::autolink::test_utils::{pending_snapshot, ready_snapshot, sample_issue};

    fn target(title: Option<&str>) -> LinkTarget<'static> {
        LinkTarget {
            key: "5",
            label: "#5",
            url: "https://x/issues/5".to_string(),
            title: title.map(str::to_string),
        }
    }

    fn render(
        format: OutputFormat,
        target: &LinkTarget<'_>,
        snapshot: Option<RenderSnapshot>,
        footnoted: Option<&HashSet<String>>,
    ) -> (String, Footnotes) {
        let snapshots: Option<SnapshotMap> =
            snapshot.map(|s| [("5".to_string(), s)].into_iter().collect());
        let mut footnotes = Footnotes::new();
        let rendered = {
            let mut tokens =
                Tokenizer::new(format, snapshots.as_ref(), footnoted, Some(&mut footnotes));
            render_link(target, &mut tokens)
        };
        (rendered, footnotes)
    }

    // ── markdown ─────────────────────────────────────────────────────

    #[test]
    fn markdown_without_detail_is_a_plain_link() {
        let (out, footnotes) = render(OutputFormat::Markdown, &target(None), None, None);
        assert_eq!(out, "[#5](https://x/issues/5)");
        assert!(footnotes.is_empty());
    }

    #[test]
    fn markdown_title_becomes_tooltip() {
        let (out, _) = render(
            OutputFormat::Markdown,
            &target(Some("Open \"5\"")),
            None,
            None,
        );
        assert_eq!(out, r#"[#5](https://x/issues/5 "Open \"5\"")"#);
    }

    #[test]
    fn markdown_ready_detail_fills_tooltip_and_footnote() {
        let (out, footnotes) = render(
            OutputFormat::Markdown,
            &target(Some("Issue 5")),
            Some(ready_snapshot("5", sample_issue("5", "Fix crash"))),
            None,
        );
        assert!(out.contains("Issue 5\n\u{2014}\u{2014}\nFix crash\nOpened, opened"));
        assert_eq!(footnotes.len(), 1);
        assert!(footnotes.get(1).unwrap().contains("**Fix crash**"));
    }

    #[test]
    fn markdown_pending_detail_shows_loading() {
        let (out, footnotes) = render(
            OutputFormat::Markdown,
            &target(Some("Issue 5")),
            Some(pending_snapshot("5")),
            None,
        );
        assert!(out.ends_with("Issue 5\n\u{2014}\u{2014}\nLoading...\")"));
        assert_eq!(footnotes.len(), 1);
        assert_eq!(
            footnotes.get(1),
            Some("[#5 Loading...](https://x/issues/5)")
        );
    }

    #[test]
    fn markdown_skips_footnote_for_already_footnoted_id() {
        let footnoted: HashSet<String> = ["5".to_string()].into_iter().collect();
        let (_, footnotes) = render(
            OutputFormat::Markdown,
            &target(None),
            Some(pending_snapshot("5")),
            Some(&footnoted),
        );
        assert!(footnotes.is_empty());
    }

    // ── plaintext ────────────────────────────────────────────────────

    #[test]
    fn plaintext_without_detail_keeps_label() {
        let (out, footnotes) = render(OutputFormat::Plaintext, &target(None), None, None);
        assert_eq!(out, "#5");
        assert!(footnotes.is_empty());
    }

    #[test]
    fn plaintext_ready_detail_adds_superscript() {
        let (out, footnotes) = render(
            OutputFormat::Plaintext,
            &target(None),
            Some(ready_snapshot("5", sample_issue("5", "  Fix crash "))),
            None,
        );
        assert_eq!(out, "#5\u{00B9}");
        assert!(footnotes.get(1).unwrap().starts_with("#5: Fix crash  \u{2022}  Opened"));
    }

    #[test]
    fn plaintext_pending_detail_only_footnotes() {
        let (out, footnotes) = render(
            OutputFormat::Plaintext,
            &target(None),
            Some(pending_snapshot("5")),
            None,
        );
        assert_eq!(out, "#5");
        assert_eq!(footnotes.get(1), Some("#5: Loading..."));
    }

    // ── html ─────────────────────────────────────────────────────────

    #[test]
    fn html_encodes_title_attribute() {
        let (out, _) = render(OutputFormat::Html, &target(Some("<5>")), None, None);
        assert_eq!(
            out,
            "<a href=\"https://x/issues/5\" title=\"&lt;5&gt;\">#5</a>"
        );
    }

    #[test]
    fn html_without_title_omits_attribute() {
        let (out, _) = render(OutputFormat::Html, &target(None), None, None);
        assert_eq!(out, "<a href=\"https://x/issues/5\">#5</a>");
    }
}
