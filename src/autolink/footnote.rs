//! Footnotes collected while rendering.

use std::collections::{BTreeMap, HashMap};

use crate::autolink::text::{superscript, DETAIL_SEPARATOR};

/// Numbered footnotes, starting at 1.
///
/// `linkify` creates one for plaintext output when the caller supplies none
/// and appends it as a trailer; a caller-supplied sink is only appended to.
/// Footnotes added for an autolink key keep their number: rendering the same
/// key into the same sink again rewrites the entry in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Footnotes {
    entries: BTreeMap<usize, String>,
    slots: HashMap<String, usize>,
}

impl Footnotes {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a footnote and returns its number.
    pub fn push(&mut self, text: impl Into<String>) -> usize {
        let index = self.entries.len() + 1;
        self.entries.insert(index, text.into());
        index
    }

    /// Adds or rewrites the footnote for autolink `key` and returns its number.
    pub fn upsert(&mut self, key: &str, text: impl Into<String>) -> usize {
        if let Some(&index) = self.slots.get(key) {
            self.replace(index, text);
            return index;
        }
        let index = self.push(text);
        self.slots.insert(key.to_string(), index);
        index
    }

    /// Number of the footnote added for autolink `key`, if any.
    pub fn slot(&self, key: &str) -> Option<usize> {
        self.slots.get(key).copied()
    }

    /// Replaces the text of an existing footnote, e.g. once a pending lookup
    /// settles. Returns `false` if `index` was never assigned.
    pub fn replace(&mut self, index: usize, text: impl Into<String>) -> bool {
        match self.entries.get_mut(&index) {
            Some(entry) => {
                *entry = text.into();
                true
            }
            None => false,
        }
    }

    /// Returns the footnote numbered `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(&index).map(String::as_str)
    }

    /// Number of footnotes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no footnote was added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates footnotes in number order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries.iter().map(|(i, text)| (*i, text.as_str()))
    }

    /// Renders the trailer block appended to plaintext output.
    pub fn render_trailer(&self) -> String {
        let mut trailer = format!("\n{DETAIL_SEPARATOR}");
        for (index, text) in self.iter() {
            trailer.push('\n');
            trailer.push_str(&superscript(index));
            trailer.push(' ');
            trailer.push_str(text);
        }
        trailer
    }
}
