//! Mapping between local relative paths and remote keys.

/// Normalize a slash-separated path: backslashes become `/`, repeated
/// separators collapse, and a trailing separator is dropped (except for `/` itself).
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        let c = if c == '\\' { '/' } else { c };
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// Remote key of a local file: `<base>/<relative>`, normalized.
pub fn remote_key(base_dir: &str, relative_path: &str) -> String {
    normalize(&format!("{}/{}", base_dir, relative_path))
}

/// Whether `base_dir` points at the bucket root (empty or only separators).
pub fn is_bucket_root(base_dir: &str) -> bool {
    normalize(base_dir.trim()).trim_matches('/').is_empty()
}

/// Prefix used to list everything under `base_dir`.
pub fn list_prefix(base_dir: &str) -> String {
    format!("{}/", normalize(base_dir).trim_end_matches('/'))
}

/// Path of `key` relative to `base_dir`, or `None` if the key is not under it.
///
/// A leading separator is ignored on both sides, so `/site/a.txt` and
/// `site/a.txt` both give `a.txt` for base `/site`.
pub fn relative_to_base(base_dir: &str, key: &str) -> Option<String> {
    let base = normalize(base_dir);
    let base = base.trim_matches('/');
    let key = normalize(key);
    let key = key.trim_start_matches('/');

    let relative = if base.is_empty() {
        key
    } else {
        key.strip_prefix(base)?.strip_prefix('/')?
    };

    if relative.is_empty() {
        None
    } else {
        Some(relative.to_string())
    }
}
