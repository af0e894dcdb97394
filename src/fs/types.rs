use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Immutable description of one filesystem object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    /// Canonical absolute path
    pub full_path: PathBuf,
    pub display_name: String,
    pub is_folder: bool,
    /// Lower-case extension without the dot, empty for folders
    pub extension: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl PathEntry {
    pub fn new(full_path: &Path, is_folder: bool) -> Self {
        let full_path = canonicalize_path(full_path);
        let display_name = file_name(&full_path);
        let extension = if is_folder {
            String::new()
        } else {
            extension_of(&display_name)
        };

        Self {
            full_path,
            display_name,
            is_folder,
            extension,
            size: 0,
            modified: None,
        }
    }

    /// Build an entry from directory metadata.
    pub fn from_metadata(full_path: &Path, metadata: &std::fs::Metadata) -> Self {
        let mut entry = Self::new(full_path, metadata.is_dir());
        entry.size = if metadata.is_dir() { 0 } else { metadata.len() };
        entry.modified = metadata.modified().ok().and_then(|t| {
            DateTime::from_timestamp(
                t.duration_since(std::time::UNIX_EPOCH).ok()?.as_secs() as i64,
                0,
            )
        });
        entry
    }

    pub fn format_size(&self) -> String {
        if self.is_folder {
            return "<DIR>".to_string();
        }
        humansize::format_size(self.size, humansize::BINARY)
    }

    pub fn key(&self) -> String {
        path_key(&self.full_path)
    }
}

/// Directories first, then case-insensitive name order.
pub fn sort_entries(entries: &mut [PathEntry]) {
    entries.sort_by(|a, b| match (a.is_folder, b.is_folder) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a
            .display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
            .then_with(|| a.display_name.cmp(&b.display_name)),
    });
}

/// Make a path absolute and lexically normalized without touching the disk.
pub fn canonicalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            _ => normalized.push(component),
        }
    }

    if normalized.as_os_str().is_empty() {
        normalized.push("/");
    }

    normalized
}

/// Comparison key for a path: canonical, '/'-separated, no trailing slash.
/// Case is folded on hosts whose filesystems are case-insensitive.
pub fn path_key(path: &Path) -> String {
    let key = exact_key(path);
    if cfg!(any(windows, target_os = "macos")) {
        key.to_lowercase()
    } else {
        key
    }
}

/// Case-insensitive comparison key, used for prefix matching during lookups.
pub fn folded_key(path: &Path) -> String {
    exact_key(path).to_lowercase()
}

fn exact_key(path: &Path) -> String {
    let canonical = canonicalize_path(path);
    let mut key = canonical.to_string_lossy().replace('\\', "/");
    while key.len() > 1 && key.ends_with('/') {
        key.pop();
    }
    key
}

pub fn same_path(a: &Path, b: &Path) -> bool {
    path_key(a) == path_key(b)
}

/// True when `path` equals `ancestor` or lies beneath it (case-insensitive).
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    key_within(&folded_key(path), &folded_key(ancestor))
}

/// Same as [`is_within`] but on precomputed keys.
pub fn key_within(path_key: &str, ancestor_key: &str) -> bool {
    if path_key == ancestor_key {
        return true;
    }
    if ancestor_key.ends_with('/') {
        path_key.starts_with(ancestor_key)
    } else {
        path_key.len() > ancestor_key.len()
            && path_key.starts_with(ancestor_key)
            && path_key.as_bytes()[ancestor_key.len()] == b'/'
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

pub fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}
