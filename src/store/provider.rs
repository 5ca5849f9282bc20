//! RemoteStore trait - Abstraction for the object storage backend.
//!
//! The upload pipeline only needs three operations from a bucket:
//! put one object, list keys under a prefix, and delete many keys at once.

use crate::error::StoreError;
use std::path::Path;

/// Maximum number of keys a single list request may return (OSS `max-keys` limit).
pub const MAX_PAGE_SIZE: usize = 1000;

/// One page of a key listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Object keys in this page
    pub keys: Vec<String>,
    /// Marker to pass to the next `list` call, `None` when the listing is exhausted
    pub next_marker: Option<String>,
}

/// Trait for all remote stores.
///
/// Keys are passed through as the caller built them; each store decides
/// how a leading `/` maps onto its own namespace.
pub trait RemoteStore {
    /// Name of the store (oss, local, memory)
    fn name(&self) -> &'static str;

    /// Upload the file at `local_path` as `key`, overwriting any existing object.
    fn put(&self, key: &str, local_path: &Path) -> Result<(), StoreError>;

    /// List keys starting with `prefix`, at most `max_keys` of them,
    /// continuing after `marker` when given.
    fn list(
        &self,
        prefix: &str,
        max_keys: usize,
        marker: Option<&str>,
    ) -> Result<ListPage, StoreError>;

    /// Delete all `keys` in one batch. Missing keys are not an error.
    fn delete_multiple(&self, keys: &[String]) -> Result<(), StoreError>;
}
