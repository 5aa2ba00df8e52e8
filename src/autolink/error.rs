//! Autolink-specific error handling.

use thiserror::Error;

/// Errors raised while compiling or applying autolink references.
#[derive(Error, Debug)]
pub enum AutolinkError {
    /// The reference prefix produced a pattern the regex engine rejected.
    #[error("Invalid autolink pattern for prefix {prefix:?}: {source}")]
    InvalidPattern {
        /// Literal prefix of the offending reference.
        prefix: String,
        /// Underlying regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// The reference is missing its prefix or URL template, or previously
    /// failed to compile, and is skipped.
    #[error("Autolink reference {prefix:?} is not renderable")]
    NotRenderable {
        /// Literal prefix of the skipped reference (may be empty).
        prefix: String,
    },

    /// A dynamic reference failed while extracting autolinks.
    #[error("Autolink extraction failed in {reference}: {message}")]
    Extraction {
        /// Name of the dynamic reference that failed.
        reference: String,
        /// Failure description.
        message: String,
    },
}
