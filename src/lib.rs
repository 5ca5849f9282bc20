//! upload-oss library
//!
//! Mirrors a static build output directory into an object storage bucket.
//! Provides the following capabilities:
//! - Enumerate the output directory and upload every file, entry document last
//! - Optionally delete remote objects that no longer exist locally ("clean")
//! - Stores: Aliyun OSS over HTTP, a local directory, and an in-memory bucket
//!
//! Pipeline: Enumerate -> Upload -> Clean

pub mod cli;
pub mod config;
pub mod error;
pub mod store;
pub mod sync;

// Re-export main types
pub use config::{Config, Credentials};
pub use error::{StoreError, SyncError};
pub use store::{ListPage, LocalStore, MemoryStore, OssStore, RemoteStore};
pub use sync::{CleanOutcome, CleanSummary, Phase, Reconciler, SyncReport};
