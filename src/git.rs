//! Git access: the commit messages and branch names to scan, and the
//! remotes whose hosting providers contribute references.

pub mod remote;
pub mod repository;

pub use remote::{RemoteInfo, RemoteProvider};
pub use repository::GitRepository;

/// Revision scanned when none is given.
pub const DEFAULT_REVISION: &str = "HEAD";
