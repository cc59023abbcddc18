//! Repository layout, commit records, and artifact resolution for DGit.
//!
//! Everything under `.dgit/` is owned by this crate: the directory
//! [`Layout`], the immutable JSON [commit records](CommitRecord) that double
//! as the version index, HEAD, and the [resolution](resolve) of a version
//! number to the best physical artifact across the two-tier storage
//! hierarchy (plus the legacy `objects/` path).

pub mod error;
mod layout;
mod models;
mod resolve;
mod store;

pub use crate::layout::Layout;
pub use crate::models::{CacheTier, CommitRecord, CompressionInfo, FileMeta};
pub use crate::resolve::{Artifact, resolve};
pub use crate::store::{CommitStore, MIN_HASH_PREFIX};
