use crate::error::StoreError;
use crate::store::provider::{ListPage, RemoteStore};
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// A call received by [`MemoryStore`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Put(String),
    List {
        prefix: String,
        max_keys: usize,
        marker: Option<String>,
    },
    DeleteMultiple(Vec<String>),
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<String, Vec<u8>>,
    calls: Vec<StoreCall>,
    failing_puts: HashSet<String>,
    fail_list: bool,
    fail_delete: bool,
}

/// In-memory bucket.
/// Records every call so tests can assert on exactly what reached the store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `keys` (with empty content).
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for key in keys {
                inner.objects.insert(key.into(), Vec::new());
            }
        }
        store
    }

    /// Make `put` fail for this exact key.
    pub fn fail_put_on(&self, key: impl Into<String>) {
        self.lock().failing_puts.insert(key.into());
    }

    pub fn fail_list(&self) {
        self.lock().fail_list = true;
    }

    pub fn fail_delete(&self) {
        self.lock().fail_delete = true;
    }

    /// All keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().objects.get(key).cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Keys passed to `put`, in call order (including the failed one).
    pub fn put_keys(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::Put(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Key batches passed to `delete_multiple`, in call order.
    pub fn delete_batches(&self) -> Vec<Vec<String>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::DeleteMultiple(keys) => Some(keys.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not hide the recorded calls from the others
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RemoteStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn put(&self, key: &str, local_path: &Path) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Put(key.to_string()));

        if inner.failing_puts.contains(key) {
            return Err(StoreError::Other(format!("injected put failure for {}", key)));
        }

        let content = std::fs::read(local_path)?;
        inner.objects.insert(key.to_string(), content);
        Ok(())
    }

    fn list(
        &self,
        prefix: &str,
        max_keys: usize,
        marker: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::List {
            prefix: prefix.to_string(),
            max_keys,
            marker: marker.map(str::to_string),
        });

        if inner.fail_list {
            return Err(StoreError::Other("injected list failure".to_string()));
        }

        let start = match marker {
            Some(marker) => Bound::Excluded(marker.to_string()),
            None => Bound::Unbounded,
        };
        let mut matching = inner
            .objects
            .range((start, Bound::Unbounded))
            .map(|(key, _)| key)
            .filter(|key| key.starts_with(prefix));

        let keys: Vec<String> = matching.by_ref().take(max_keys).cloned().collect();
        let next_marker = if matching.next().is_some() {
            keys.last().cloned()
        } else {
            None
        };

        Ok(ListPage { keys, next_marker })
    }

    fn delete_multiple(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::DeleteMultiple(keys.to_vec()));

        if inner.fail_delete {
            return Err(StoreError::Other("injected delete failure".to_string()));
        }

        for key in keys {
            inner.objects.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_pages_with_marker() -> Result<(), StoreError> {
        let store = MemoryStore::with_keys(["/site/a", "/site/b", "/site/c", "/other/x"]);

        let first = store.list("/site/", 2, None)?;
        assert_eq!(first.keys, vec!["/site/a", "/site/b"]);
        assert_eq!(first.next_marker.as_deref(), Some("/site/b"));

        let second = store.list("/site/", 2, first.next_marker.as_deref())?;
        assert_eq!(second.keys, vec!["/site/c"]);
        assert_eq!(second.next_marker, None);

        Ok(())
    }

    #[test]
    fn test_exact_page_has_no_marker() -> Result<(), StoreError> {
        let store = MemoryStore::with_keys(["/site/a", "/site/b"]);
        let page = store.list("/site/", 2, None)?;
        assert_eq!(page.keys.len(), 2);
        assert_eq!(page.next_marker, None);
        Ok(())
    }

    #[test]
    fn test_injected_failures_are_recorded() {
        let store = MemoryStore::new();
        store.fail_put_on("/a");
        store.fail_delete();

        assert!(store.put("/a", Path::new("/does/not/matter")).is_err());
        assert!(store.delete_multiple(&["/a".to_string()]).is_err());
        assert_eq!(store.put_keys(), vec!["/a"]);
        assert_eq!(store.delete_batches(), vec![vec!["/a".to_string()]]);
    }
}
