//! Config module - Manages upload-oss configuration.
//!
//! Two sources:
//! - `Credentials` for the bucket, read from the environment (and a `.env` file)
//! - `Config` for the upload itself, read from `upload-oss.toml` and overridden by flags

use crate::error::SyncError;
use crate::store::MAX_PAGE_SIZE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "upload-oss.toml";

pub const ENV_ACCESS_KEY_ID: &str = "OSS_ACCESS_KEY_ID";
pub const ENV_ACCESS_KEY_SECRET: &str = "OSS_ACCESS_KEY_SECRET";
pub const ENV_REGION: &str = "OSS_REGION";
pub const ENV_BUCKET: &str = "OSS_BUCKET";
pub const ENV_ENDPOINT: &str = "OSS_ENDPOINT";

/// Bucket credentials.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    /// OSS region, e.g. "oss-cn-hangzhou"
    pub region: Option<String>,
    pub bucket: String,
    /// Full endpoint URL, overrides the one derived from `region`
    pub endpoint: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"***")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Credentials {
    /// Load credentials from the process environment, after loading `.env`
    /// from the working directory if present. Variables already set win over `.env`.
    pub fn from_env() -> Result<Self, SyncError> {
        check_dotenv(dotenvy::dotenv())?;
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load credentials through `lookup`. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SyncError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let access_key_id = get(ENV_ACCESS_KEY_ID);
        let access_key_secret = get(ENV_ACCESS_KEY_SECRET);
        let bucket = get(ENV_BUCKET);
        let region = get(ENV_REGION);
        let endpoint = get(ENV_ENDPOINT);

        let mut missing = Vec::new();
        if access_key_id.is_none() {
            missing.push(ENV_ACCESS_KEY_ID);
        }
        if access_key_secret.is_none() {
            missing.push(ENV_ACCESS_KEY_SECRET);
        }
        if bucket.is_none() {
            missing.push(ENV_BUCKET);
        }
        if region.is_none() && endpoint.is_none() {
            missing.push(ENV_REGION);
        }

        match (access_key_id, access_key_secret, bucket) {
            (Some(access_key_id), Some(access_key_secret), Some(bucket)) if missing.is_empty() => {
                Ok(Self {
                    access_key_id,
                    access_key_secret,
                    region,
                    bucket,
                    endpoint,
                })
            }
            _ => Err(SyncError::Configuration(format!(
                "Missing {} (no .env file found?), uploading canceled!",
                missing.join(", ")
            ))),
        }
    }

    /// Endpoint URL of the region, e.g. `https://oss-cn-hangzhou.aliyuncs.com`.
    pub fn endpoint(&self) -> String {
        match (&self.endpoint, &self.region) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(region)) => format!("https://{}.aliyuncs.com", region),
            (None, None) => "https://oss.aliyuncs.com".to_string(),
        }
    }
}

/// A missing `.env` is fine (credentials may come from the real environment);
/// an unreadable or malformed one is not.
fn check_dotenv<T>(result: dotenvy::Result<T>) -> Result<(), SyncError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(SyncError::Configuration(format!(
            "Cannot parse .env: {}, uploading canceled!",
            e
        ))),
    }
}

/// Upload configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Local build output directory
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Target directory in the bucket ("/" means the bucket root)
    #[serde(default = "default_oss_base_dir")]
    pub oss_base_dir: String,

    /// Delete remote files that no longer exist locally
    #[serde(default)]
    pub clean: bool,

    /// File uploaded last, once everything it references is live
    #[serde(default = "default_entry_document")]
    pub entry_document: String,

    /// Keys requested per list call during clean
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_oss_base_dir() -> String {
    "/".to_string()
}

fn default_entry_document() -> String {
    "index.html".to_string()
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            oss_base_dir: default_oss_base_dir(),
            clean: false,
            entry_document: default_entry_document(),
            page_size: default_page_size(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Cannot parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `upload-oss.toml` from `dir`, or defaults if it doesn't exist.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Page size limited to what a single OSS list call accepts.
    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("dist"));
        assert_eq!(config.oss_base_dir, "/");
        assert!(!config.clean);
        assert_eq!(config.entry_document, "index.html");
        assert_eq!(config.page_size, 1000);
    }

    #[test]
    fn test_load_from_dir() -> Result<()> {
        let temp_dir = TempDir::new()?;
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "oss_base_dir = \"/site\"\nclean = true\n",
        )?;

        let mut expected = Config::new();
        expected.oss_base_dir = "/site".to_string();
        expected.clean = true;

        let loaded = Config::load_from_dir(temp_dir.path())?;
        assert_eq!(loaded, expected);

        Ok(())
    }

    #[test]
    fn test_malformed_dotenv_is_reported() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let env_path = temp_dir.path().join(".env");
        // Malformed first line, so nothing reaches the process environment
        std::fs::write(&env_path, "OSS_BUCKET b\nOSS_ACCESS_KEY_SECRET=secret\n")?;

        match check_dotenv(dotenvy::from_path(&env_path)) {
            Err(SyncError::Configuration(message)) => {
                assert!(message.contains("Cannot parse .env"));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        Ok(())
    }

    #[test]
    fn test_missing_dotenv_is_fine() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let result = check_dotenv(dotenvy::from_path(temp_dir.path().join(".env")));
        assert!(result.is_ok());
        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("custom.toml");
        std::fs::write(&config_path, "oss_base_dir = \"/blog\"\npage_size = 5000\n")?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.oss_base_dir, "/blog");
        assert_eq!(config.output_dir, PathBuf::from("dist"));
        assert_eq!(config.effective_page_size(), 1000);

        Ok(())
    }

    #[test]
    fn test_missing_dir_config_is_default() -> Result<()> {
        let temp_dir = TempDir::new()?;
        assert_eq!(Config::load_from_dir(temp_dir.path())?, Config::default());
        Ok(())
    }

    #[test]
    fn test_bad_config_file_errors() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("bad.toml");
        std::fs::write(&config_path, "clean = \"maybe\"")?;
        assert!(Config::load(&config_path).is_err());
        Ok(())
    }

    #[test]
    fn test_credentials_complete() {
        let credentials = Credentials::from_lookup(lookup(&[
            (ENV_ACCESS_KEY_ID, "id"),
            (ENV_ACCESS_KEY_SECRET, "secret"),
            (ENV_REGION, "oss-cn-shanghai"),
            (ENV_BUCKET, "site"),
        ]))
        .unwrap();

        assert_eq!(credentials.bucket, "site");
        assert_eq!(
            credentials.endpoint(),
            "https://oss-cn-shanghai.aliyuncs.com"
        );
        assert!(!format!("{:?}", credentials).contains("\"secret\""));
    }

    #[test]
    fn test_credentials_endpoint_replaces_region() {
        let credentials = Credentials::from_lookup(lookup(&[
            (ENV_ACCESS_KEY_ID, "id"),
            (ENV_ACCESS_KEY_SECRET, "secret"),
            (ENV_BUCKET, "site"),
            (ENV_ENDPOINT, "http://127.0.0.1:9000"),
        ]))
        .unwrap();

        assert_eq!(credentials.endpoint(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_credentials_missing_are_named() {
        let err = Credentials::from_lookup(lookup(&[
            (ENV_ACCESS_KEY_ID, "id"),
            (ENV_ACCESS_KEY_SECRET, "  "),
            (ENV_REGION, "oss-cn-shanghai"),
        ]))
        .unwrap_err();

        match err {
            SyncError::Configuration(message) => {
                assert!(message.contains(ENV_ACCESS_KEY_SECRET));
                assert!(message.contains(ENV_BUCKET));
                assert!(!message.contains(ENV_ACCESS_KEY_ID));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
