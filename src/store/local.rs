use crate::error::StoreError;
use crate::store::provider::{ListPage, RemoteStore};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Local file system store.
/// Mirrors the bucket into a directory (e.g. a preview folder served by a local web server).
pub struct LocalStore {
    target_path: PathBuf,
}

impl LocalStore {
    pub fn new(target_path: impl Into<PathBuf>) -> Self {
        Self {
            target_path: target_path.into(),
        }
    }

    /// Map an object key onto a path under the target directory.
    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let name = key.trim_start_matches('/');
        if name.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        let mut path = self.target_path.clone();
        for segment in name.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(StoreError::InvalidKey(key.to_string()));
            }
            path.push(segment);
        }
        Ok(path)
    }

    /// All object names (without leading `/`) currently stored, sorted.
    fn object_names(&self) -> Result<Vec<String>, StoreError> {
        if !self.target_path.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&self.target_path).min_depth(1) {
            let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.target_path) {
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

impl RemoteStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    fn put(&self, key: &str, local_path: &Path) -> Result<(), StoreError> {
        let dst = self.object_path(key)?;
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }

        debug!("[Local] Copying {:?} to {:?}", local_path, dst);
        fs::copy(local_path, &dst)?;
        Ok(())
    }

    fn list(
        &self,
        prefix: &str,
        max_keys: usize,
        marker: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        // Answer in the same form the caller asked in
        let leading = if prefix.starts_with('/') { "/" } else { "" };
        let name_prefix = prefix.trim_start_matches('/');

        let mut matching = self
            .object_names()?
            .into_iter()
            .filter(|name| name.starts_with(name_prefix))
            .map(|name| format!("{}{}", leading, name))
            .filter(|key| marker.map_or(true, |m| key.as_str() > m));

        let keys: Vec<String> = matching.by_ref().take(max_keys).collect();
        let next_marker = if matching.next().is_some() {
            keys.last().cloned()
        } else {
            None
        };

        Ok(ListPage { keys, next_marker })
    }

    fn delete_multiple(&self, keys: &[String]) -> Result<(), StoreError> {
        for key in keys {
            let path = self.object_path(key)?;
            match fs::remove_file(&path) {
                Ok(()) => debug!("[Local] Removed {:?}", path),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    #[test]
    fn test_put_list_delete() -> Result<()> {
        let source = TempDir::new()?;
        let bucket = TempDir::new()?;
        let file = source.path().join("a.txt");
        fs::write(&file, "hello")?;

        let store = LocalStore::new(bucket.path());
        store.put("/site/a.txt", &file)?;
        store.put("/site/sub/b.txt", &file)?;
        store.put("/other/c.txt", &file)?;

        assert_eq!(fs::read_to_string(bucket.path().join("site/sub/b.txt"))?, "hello");

        let page = store.list("/site/", 1000, None)?;
        assert_eq!(page.keys, vec!["/site/a.txt", "/site/sub/b.txt"]);

        let page = store.list("site/", 1000, None)?;
        assert_eq!(page.keys, vec!["site/a.txt", "site/sub/b.txt"]);

        store.delete_multiple(&["/site/a.txt".to_string(), "/site/missing.txt".to_string()])?;
        assert_eq!(store.list("/site/", 1000, None)?.keys, vec!["/site/sub/b.txt"]);

        Ok(())
    }

    #[test]
    fn test_list_paging() -> Result<()> {
        let source = TempDir::new()?;
        let bucket = TempDir::new()?;
        let file = source.path().join("x");
        fs::write(&file, "")?;

        let store = LocalStore::new(bucket.path());
        for name in ["a", "b", "c"] {
            store.put(&format!("/p/{}", name), &file)?;
        }

        let first = store.list("/p/", 2, None)?;
        assert_eq!(first.keys, vec!["/p/a", "/p/b"]);
        let second = store.list("/p/", 2, first.next_marker.as_deref())?;
        assert_eq!(second.keys, vec!["/p/c"]);
        assert!(second.next_marker.is_none());

        Ok(())
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let store = LocalStore::new("/tmp/bucket");
        assert!(matches!(
            store.object_path("/site/../../etc/passwd"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.object_path("/"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.object_path("a//b"), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_list_missing_target_is_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let store = LocalStore::new(dir.path().join("not-created"));
        assert!(store.list("/", 1000, None)?.keys.is_empty());
        Ok(())
    }
}
