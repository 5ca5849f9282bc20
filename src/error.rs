//! Error types for the upload pipeline and the remote stores.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a [`RemoteStore`](crate::store::RemoteStore) implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP {status}: {code} {message}")]
    Http {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Request failed")]
    Request(#[from] reqwest::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Cannot decode XML response")]
    Xml(#[from] quick_xml::DeError),

    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),

    /// Injected by test doubles.
    #[error("{0}")]
    Other(String),
}

/// Terminal failure of an upload run. None of these are recovered from.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{0}")]
    Configuration(String),

    #[error("No local files found in {}, uploading canceled!", .dir.display())]
    NoFilesFound { dir: PathBuf },

    #[error("Cannot read local files in {}", .dir.display())]
    Enumerate {
        dir: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Upload {path} failed at [{position}/{total}]")]
    Upload {
        path: String,
        position: usize,
        total: usize,
        #[source]
        source: StoreError,
    },

    #[error("Cannot list remote files under {prefix}")]
    List {
        prefix: String,
        #[source]
        source: StoreError,
    },

    #[error("Cannot delete {count} redundant remote files")]
    Delete {
        count: usize,
        #[source]
        source: StoreError,
    },
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    /// Every message in the chain, outermost first.
    fn chain(err: &dyn std::error::Error) -> Vec<String> {
        let mut messages = vec![err.to_string()];
        let mut current = err.source();
        while let Some(cause) = current {
            messages.push(cause.to_string());
            current = cause.source();
        }
        messages
    }

    #[test]
    fn test_causes_are_not_repeated() {
        let err = SyncError::Delete {
            count: 1,
            source: StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "Operation not permitted",
            )),
        };

        assert_eq!(
            chain(&err),
            vec![
                "Cannot delete 1 redundant remote files",
                "IO error",
                "Operation not permitted",
            ]
        );
    }

    #[test]
    fn test_upload_message_names_file_and_position() {
        let err = SyncError::Upload {
            path: "sub/b.txt".to_string(),
            position: 2,
            total: 3,
            source: StoreError::Other("boom".to_string()),
        };

        assert_eq!(err.to_string(), "Upload sub/b.txt failed at [2/3]");
        assert_eq!(err.source().map(|e| e.to_string()).as_deref(), Some("boom"));
    }
}
