pub mod error;
pub mod hgrc;
pub mod revisions;
pub mod svn_info;
pub mod types;

pub use error::ScmError;
pub use hgrc::HgRc;
pub use types::{non_empty, DiffResult, RemotePath, RepositoryInfo, ReviewOptions, RevisionSpec};
