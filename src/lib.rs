//! # omni-autolink
//!
//! Finds references to issues and pull requests in commit messages and
//! branch names, and rewrites text with links to them.
//!
//! ## Quick Start
//!
//! ```rust
//! use omni_autolink::autolink::{AutolinkConfig, Autolinks, LinkifyOptions, OutputFormat};
//!
//! let autolinks = Autolinks::new(&[AutolinkConfig {
//!     prefix: Some("#".to_string()),
//!     url: Some("https://example.com/issues/<num>".to_string()),
//!     ..AutolinkConfig::default()
//! }]);
//! let text = autolinks.linkify(
//!     "fixes #12",
//!     OutputFormat::Markdown,
//!     LinkifyOptions::default(),
//!     None,
//! );
//! assert_eq!(text, "fixes [#12](https://example.com/issues/12)");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod autolink;
pub mod cli;
pub mod config;
pub mod git;

pub use crate::autolink::Autolinks;
pub use crate::cli::Cli;

/// The current version of omni-autolink.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
