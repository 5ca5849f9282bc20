//! upload-oss - Upload a static site build to Aliyun OSS
//!
//! Usage:
//!   upload-oss [--output-dir dist] [--oss-base-dir /site] [--clean]
//!
//! Credentials come from OSS_ACCESS_KEY_ID, OSS_ACCESS_KEY_SECRET, OSS_REGION
//! and OSS_BUCKET, or a `.env` file in the working directory.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use upload_oss::cli::{self, Cli};

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("upload_oss={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = cli::commands::upload(&cli) {
        eprintln!("{} {}", "✗".red(), format!("[upload-oss] Error: {}", e).red());
        for cause in e.chain().skip(1) {
            eprintln!("  {} {}", "Caused by:".dimmed(), cause);
        }
        std::process::exit(1);
    }
}
