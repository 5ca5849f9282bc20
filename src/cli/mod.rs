//! CLI definitions and command implementations for upload-oss.

pub mod commands;

use crate::config::Config;
use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Upload a build output directory to Aliyun OSS
#[derive(Parser, Debug)]
#[command(name = "upload-oss")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Local directory to upload (default: dist)
    #[arg(long, env = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Target directory in the bucket (default: /)
    #[arg(long)]
    pub oss_base_dir: Option<String>,

    /// Delete remote files under the target directory that no longer exist locally
    #[arg(long)]
    pub clean: bool,

    /// File uploaded last (default: index.html)
    #[arg(long)]
    pub entry_document: Option<String>,

    /// Config file (default: ./upload-oss.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Upload into this local directory instead of OSS (no credentials needed)
    #[arg(long)]
    pub local_target: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Build the effective config: file values first, then flags on top.
    pub fn resolve_config(&self, working_dir: &Path) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_from_dir(working_dir)?,
        };

        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(oss_base_dir) = &self.oss_base_dir {
            config.oss_base_dir = oss_base_dir.clone();
        }
        if self.clean {
            config.clean = true;
        }
        if let Some(entry_document) = &self.entry_document {
            config.entry_document = entry_document.clone();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE_NAME;
    use tempfile::TempDir;

    #[test]
    fn test_flags_parse() {
        let cli = Cli::try_parse_from([
            "upload-oss",
            "--output-dir",
            "build",
            "--oss-base-dir",
            "/site",
            "--clean",
        ])
        .unwrap();

        assert_eq!(cli.output_dir, Some(PathBuf::from("build")));
        assert_eq!(cli.oss_base_dir.as_deref(), Some("/site"));
        assert!(cli.clean);
        assert!(cli.local_target.is_none());
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let err = Cli::try_parse_from(["upload-oss", "--output-dri", "build"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_flags_override_file() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "output_dir = \"public\"\noss_base_dir = \"/blog\"\nclean = true\n",
        )?;

        let cli = Cli::try_parse_from(["upload-oss", "--oss-base-dir", "/site"])?;
        let config = cli.resolve_config(dir.path())?;

        assert_eq!(config.output_dir, PathBuf::from("public"));
        assert_eq!(config.oss_base_dir, "/site");
        assert!(config.clean);
        assert_eq!(config.entry_document, "index.html");

        Ok(())
    }

    #[test]
    fn test_explicit_config_path() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("deploy.toml");
        std::fs::write(&path, "entry_document = \"home.html\"\n")?;

        let cli = Cli::try_parse_from([
            "upload-oss",
            "--config",
            path.to_str().unwrap_or_default(),
        ])?;
        let config = cli.resolve_config(Path::new("/nonexistent"))?;
        assert_eq!(config.entry_document, "home.html");

        Ok(())
    }
}
