//! Sync module - Mirror the output directory into a remote store.
//!
//! This module contains:
//! - Local file enumeration and upload ordering
//! - Local path to remote key mapping
//! - The reconciler (upload + optional clean)
//! - Progress line formatting

pub mod files;
pub mod paths;
pub mod progress;
pub mod reconciler;

pub use files::{list_local_files, order_for_upload, LocalFile};
pub use reconciler::{
    find_redundant, CleanOutcome, CleanSummary, Phase, ReconciliationPlan, Reconciler,
    RedundantObject, SyncReport,
};
