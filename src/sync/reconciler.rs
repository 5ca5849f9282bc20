//! Reconciler - Upload the output directory and prune stale remote objects.
//!
//! Pipeline: Enumerate -> Upload (sequential, entry document last) -> Clean (optional)
//!
//! Any failure stops the run. Objects uploaded before the failure stay uploaded.

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::store::RemoteStore;
use crate::sync::files::{list_local_files, order_for_upload, LocalFile};
use crate::sync::paths::{is_bucket_root, list_prefix, relative_to_base, remote_key};
use crate::sync::progress::progress_msg;
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Enumerating,
    Uploading,
    Cleaning,
    Done,
    Failed,
}

/// Files to upload, in upload order.
#[derive(Debug, Clone)]
pub struct ReconciliationPlan {
    pub uploads: Vec<LocalFile>,
}

impl ReconciliationPlan {
    /// Relative paths of all files in the plan.
    pub fn relative_paths(&self) -> HashSet<&str> {
        self.uploads
            .iter()
            .map(|file| file.relative_path.as_str())
            .collect()
    }
}

/// A remote object with no local counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedundantObject {
    /// Key as returned by the store
    pub key: String,
    /// Path under the base directory
    pub relative_path: String,
}

/// Counts reported before deleting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanSummary {
    pub local_count: usize,
    pub remote_count: usize,
    pub redundant: Vec<RedundantObject>,
}

impl CleanSummary {
    pub fn redundant_count(&self) -> usize {
        self.redundant.len()
    }

    /// Share of remote objects that are redundant, rounded to a whole percent.
    pub fn redundant_percent(&self) -> u32 {
        if self.remote_count == 0 {
            return 0;
        }
        (self.redundant_count() as f64 / self.remote_count as f64 * 100.0).round() as u32
    }

    pub fn redundant_keys(&self) -> Vec<String> {
        self.redundant.iter().map(|obj| obj.key.clone()).collect()
    }
}

impl fmt::Display for CleanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Local files count: {}, OSS files count: {}, redundant files count: {} ({}%).",
            self.local_count,
            self.remote_count,
            self.redundant_count(),
            self.redundant_percent()
        )
    }
}

/// Result of the clean phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanOutcome {
    /// Base directory is the bucket root; nothing was listed or deleted
    SkippedBucketRoot,
    /// Listing found nothing redundant; delete was not called
    NothingToClean(CleanSummary),
    /// Redundant objects were deleted
    Cleaned(CleanSummary),
}

/// Result of a full run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Remote keys written, in upload order
    pub uploaded: Vec<String>,
    /// `None` when cleaning was not requested
    pub clean: Option<CleanOutcome>,
}

/// Drives one upload run against a remote store.
pub struct Reconciler<'a> {
    store: &'a dyn RemoteStore,
    config: Config,
    progress: ProgressBar,
    on_clean_summary: Option<Box<dyn FnMut(&CleanSummary) + 'a>>,
    phase: Phase,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn RemoteStore, config: Config) -> Self {
        Self {
            store,
            config,
            progress: ProgressBar::hidden(),
            on_clean_summary: None,
            phase: Phase::Idle,
        }
    }

    /// Report upload progress on `progress` instead of a hidden bar.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Call `report` with the clean counts once they are known, before anything is deleted.
    pub fn on_clean_summary(mut self, report: impl FnMut(&CleanSummary) + 'a) -> Self {
        self.on_clean_summary = Some(Box::new(report));
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole pipeline.
    pub fn run(&mut self) -> Result<SyncReport> {
        let plan = self.plan()?;
        let uploaded = self.upload(&plan)?;

        let clean = if self.config.clean {
            Some(self.clean(&plan)?)
        } else {
            None
        };

        self.phase = Phase::Done;
        Ok(SyncReport { uploaded, clean })
    }

    /// Enumerate the output directory and order files for upload.
    pub fn plan(&mut self) -> Result<ReconciliationPlan> {
        self.phase = Phase::Enumerating;
        let root = self.config.output_dir.clone();

        let files = match list_local_files(&root) {
            Ok(files) => files,
            Err(e) => return self.fail(e),
        };
        if files.is_empty() {
            return self.fail(SyncError::NoFilesFound { dir: root });
        }

        debug!("[Upload] Found {} files in {:?}", files.len(), root);
        let uploads = order_for_upload(files, &self.config.entry_document);
        Ok(ReconciliationPlan { uploads })
    }

    /// Upload every file of `plan`, one at a time, stopping at the first failure.
    /// Returns the remote keys written.
    pub fn upload(&mut self, plan: &ReconciliationPlan) -> Result<Vec<String>> {
        self.phase = Phase::Uploading;
        let total = plan.uploads.len();
        let base_dir = self.config.oss_base_dir.clone();

        info!(
            "[Upload] Uploading {} files from {:?} to {}/ via {}",
            total,
            self.config.output_dir,
            base_dir.trim_end_matches('/'),
            self.store.name()
        );

        let mut uploaded = Vec::with_capacity(total);
        for (i, file) in plan.uploads.iter().enumerate() {
            let key = remote_key(&base_dir, &file.relative_path);
            self.progress.set_message(progress_msg(
                i,
                total,
                &format!("Uploading {}", file.relative_path),
            ));
            debug!("[Upload] {} -> {}", file.relative_path, key);

            if let Err(source) = self.store.put(&key, &file.local_path) {
                self.progress.abandon_with_message(progress_msg(
                    i,
                    total,
                    &format!("Upload {} failed.", file.relative_path),
                ));
                return self.fail(SyncError::Upload {
                    path: file.relative_path.clone(),
                    position: i + 1,
                    total,
                    source,
                });
            }
            uploaded.push(key);
        }

        self.progress
            .finish_with_message(progress_msg(total, total, "Upload completed!"));
        info!("[Upload] Uploaded {} files", uploaded.len());
        Ok(uploaded)
    }

    /// Delete remote objects under the base directory that are not in `plan`.
    pub fn clean(&mut self, plan: &ReconciliationPlan) -> Result<CleanOutcome> {
        self.phase = Phase::Cleaning;
        let base_dir = self.config.oss_base_dir.clone();

        if is_bucket_root(&base_dir) {
            warn!("[Clean] oss-base-dir not set, clean is canceled.");
            return Ok(CleanOutcome::SkippedBucketRoot);
        }

        let remote_keys = match self.list_remote_keys(&base_dir) {
            Ok(keys) => keys,
            Err(e) => return self.fail(e),
        };

        let local = plan.relative_paths();
        let redundant = find_redundant(&base_dir, &remote_keys, &local);
        let summary = CleanSummary {
            local_count: plan.uploads.len(),
            remote_count: remote_keys.len(),
            redundant,
        };
        info!("[Clean] {}", summary);
        if let Some(report) = self.on_clean_summary.as_mut() {
            report(&summary);
        }

        if summary.redundant.is_empty() {
            info!("[Clean] There is no redundant files, skip cleaning.");
            return Ok(CleanOutcome::NothingToClean(summary));
        }

        let keys = summary.redundant_keys();
        if let Err(source) = self.store.delete_multiple(&keys) {
            return self.fail(SyncError::Delete {
                count: keys.len(),
                source,
            });
        }

        info!("[Clean] Deleted {} redundant files", keys.len());
        Ok(CleanOutcome::Cleaned(summary))
    }

    /// List every key under `base_dir`, following continuation markers.
    fn list_remote_keys(&self, base_dir: &str) -> Result<Vec<String>> {
        let prefix = list_prefix(base_dir);
        let page_size = self.config.effective_page_size();

        let mut keys = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let page = self
                .store
                .list(&prefix, page_size, marker.as_deref())
                .map_err(|source| SyncError::List {
                    prefix: prefix.clone(),
                    source,
                })?;

            let exhausted = page.keys.is_empty();
            keys.extend(page.keys);

            match page.next_marker {
                Some(next) if !exhausted && marker.as_deref() != Some(next.as_str()) => {
                    marker = Some(next);
                }
                _ => break,
            }
        }

        debug!("[Clean] Listed {} remote files under {}", keys.len(), prefix);
        Ok(keys)
    }

    fn fail<T>(&mut self, error: SyncError) -> Result<T> {
        self.phase = Phase::Failed;
        Err(error)
    }
}

/// Remote keys under `base_dir` whose relative path is not in `local`.
/// Keys outside the base directory are never reported.
pub fn find_redundant(
    base_dir: &str,
    remote_keys: &[String],
    local: &HashSet<&str>,
) -> Vec<RedundantObject> {
    remote_keys
        .iter()
        .filter_map(|key| {
            let relative_path = relative_to_base(base_dir, key)?;
            if local.contains(relative_path.as_str()) {
                None
            } else {
                Some(RedundantObject {
                    key: key.clone(),
                    relative_path,
                })
            }
        })
        .collect()
}
