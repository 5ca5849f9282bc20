//! Command implementation for the upload-oss CLI.
//!
//! One command: resolve config, open the store, upload, optionally clean.

use crate::cli::Cli;
use crate::config::Credentials;
use crate::store::{LocalStore, OssStore, RemoteStore};
use crate::sync::progress::upload_spinner;
use crate::sync::{CleanOutcome, Reconciler, SyncReport};
use anyhow::{Context, Result};
use colored::Colorize;
use tracing::debug;

const TAG: &str = "[upload-oss]";

/// Upload the output directory and clean the target directory if requested.
pub fn upload(cli: &Cli) -> Result<()> {
    let working_dir = std::env::current_dir().context("Cannot read working directory")?;
    let config = cli.resolve_config(&working_dir)?;
    debug!("Config: {:?}", config);

    // Credentials are checked before any local or remote work
    let store = open_store(cli)?;

    println!(
        "{} Uploading files from local directory {}/ to target directory {}/",
        TAG,
        config.output_dir.display(),
        config.oss_base_dir.trim_end_matches('/')
    );

    // Counts go out before the delete, so they are visible even if it fails
    let mut reconciler = Reconciler::new(store.as_ref(), config)
        .with_progress(upload_spinner())
        .on_clean_summary(|summary| println!("{}", summary));
    let report = reconciler.run()?;
    print_report(&report, &reconciler.config().oss_base_dir);

    Ok(())
}

fn open_store(cli: &Cli) -> Result<Box<dyn RemoteStore>> {
    if let Some(target) = &cli.local_target {
        println!(
            "{} Target: local directory {}",
            TAG,
            target.display().to_string().dimmed()
        );
        return Ok(Box::new(LocalStore::new(target)));
    }

    let credentials = Credentials::from_env()?;
    println!(
        "{} Target: OSS bucket {}",
        TAG,
        credentials.bucket.as_str().cyan()
    );
    let store = OssStore::new(&credentials).context("Cannot create OSS client")?;
    Ok(Box::new(store))
}

fn print_report(report: &SyncReport, oss_base_dir: &str) {
    println!(
        "{} {} {} files uploaded",
        "✓".green(),
        TAG,
        report.uploaded.len().to_string().green()
    );

    match &report.clean {
        None => {}
        Some(CleanOutcome::SkippedBucketRoot) => {
            println!(
                "{} {}",
                TAG,
                "oss-base-dir not set, clean is canceled.".yellow()
            );
        }
        Some(CleanOutcome::NothingToClean(_)) => {
            println!("{}", "There is no redundant files, skip cleaning.".dimmed());
        }
        Some(CleanOutcome::Cleaned(_)) => {
            println!(
                "{} Cleaning OSS path {}/ completed",
                "✓".green(),
                oss_base_dir.trim_end_matches('/')
            );
        }
    }
}
