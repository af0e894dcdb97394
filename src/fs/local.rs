use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IndexError, IoContext, Result};
use crate::fs::filter::filter_entries;
use crate::fs::types::{canonicalize_path, file_name, is_within, sort_entries, PathEntry};

/// Synchronous local filesystem access used by the tree and grid projections.
pub struct LocalFs;

impl LocalFs {
    /// List a directory with the exclusion rules applied, directories first.
    pub fn list_dir(path: &Path) -> Result<Vec<PathEntry>> {
        let dir = canonicalize_path(path);
        let read_dir = fs::read_dir(&dir).op_context("reading directory", &dir)?;

        let mut entries = Vec::new();
        for entry in read_dir {
            // Entries can vanish between readdir and stat; skip those.
            let Ok(entry) = entry else { continue };
            let Ok(metadata) = fs::metadata(entry.path()).or_else(|_| entry.metadata()) else {
                continue;
            };
            if is_hidden(&metadata) {
                continue;
            }
            entries.push(PathEntry::from_metadata(&dir.join(entry.file_name()), &metadata));
        }

        let mut entries = filter_entries(entries, |e| (e.display_name.as_str(), e.is_folder));
        sort_entries(&mut entries);
        Ok(entries)
    }

    pub fn entry(path: &Path) -> Result<PathEntry> {
        let metadata = fs::metadata(path).op_context("reading metadata of", path)?;
        Ok(PathEntry::from_metadata(path, &metadata))
    }

    pub fn create_dir(path: &Path) -> Result<()> {
        fs::create_dir(path).op_context("creating directory", path)
    }

    /// Create a new file; fails if something already exists at `path`.
    pub fn create_file(path: &Path, contents: &[u8]) -> Result<()> {
        use std::io::Write;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .op_context("creating file", path)?;
        file.write_all(contents).op_context("writing file", path)
    }

    pub fn delete(path: &Path) -> Result<()> {
        if path.is_dir() {
            fs::remove_dir_all(path).op_context("deleting directory", path)
        } else {
            fs::remove_file(path).op_context("deleting file", path)
        }
    }

    /// Rename within the same directory. Returns the new path.
    pub fn rename(path: &Path, new_name: &str) -> Result<PathBuf> {
        validate_name(new_name)?;
        let parent = path.parent().ok_or_else(|| IndexError::NotFound {
            path: path.to_path_buf(),
        })?;
        let target = parent.join(new_name);

        // A case-only rename targets the same file on case-insensitive hosts.
        let case_only = file_name(path).to_lowercase() == new_name.to_lowercase();
        if target.exists() && !case_only {
            return Err(IndexError::AlreadyExists { path: target });
        }

        fs::rename(path, &target).op_context("renaming", path)?;
        Ok(target)
    }

    /// Move `path` into `dest_dir`, keeping its name. Returns the new path.
    pub fn move_into(path: &Path, dest_dir: &Path) -> Result<PathBuf> {
        ensure_not_into_self(path, dest_dir)?;
        let target = dest_dir.join(file_name(path));
        if target.exists() {
            return Err(IndexError::AlreadyExists { path: target });
        }
        fs::rename(path, &target).op_context("moving", path)?;
        Ok(target)
    }

    /// Copy `path` into `dest_dir` under a unique name. Returns the new path.
    pub fn copy_into(path: &Path, dest_dir: &Path) -> Result<PathBuf> {
        ensure_not_into_self(path, dest_dir)?;
        let target = Self::unique_sibling(dest_dir, &file_name(path), path.is_dir());
        Self::copy(path, &target)?;
        Ok(target)
    }

    /// Copy a file or directory next to itself under a unique name.
    pub fn duplicate(path: &Path) -> Result<PathBuf> {
        let parent = path.parent().ok_or_else(|| IndexError::NotFound {
            path: path.to_path_buf(),
        })?;
        Self::copy_into(path, parent)
    }

    pub fn copy(from: &Path, to: &Path) -> Result<()> {
        if from.is_dir() {
            Self::copy_dir_recursive(from, to)
        } else {
            fs::copy(from, to).op_context("copying", from)?;
            Ok(())
        }
    }

    fn copy_dir_recursive(from: &Path, to: &Path) -> Result<()> {
        fs::create_dir_all(to).op_context("creating directory", to)?;

        for entry in fs::read_dir(from).op_context("reading directory", from)? {
            let entry = entry.op_context("reading directory", from)?;
            let file_type = entry.file_type().op_context("reading metadata of", &entry.path())?;
            let from_path = entry.path();
            let to_path = to.join(entry.file_name());

            if file_type.is_dir() {
                Self::copy_dir_recursive(&from_path, &to_path)?;
            } else {
                fs::copy(&from_path, &to_path).op_context("copying", &from_path)?;
            }
        }

        Ok(())
    }

    /// First free path of the form `stem.ext`, `stem_1.ext`, `stem_2.ext`...
    pub fn unique_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
        let compose = |suffix: Option<usize>| {
            let stem = match suffix {
                Some(n) => format!("{}_{}", stem, n),
                None => stem.to_string(),
            };
            if extension.is_empty() {
                dir.join(stem)
            } else {
                dir.join(format!("{}.{}", stem, extension))
            }
        };

        let mut candidate = compose(None);
        let mut counter = 1;
        while candidate.exists() {
            candidate = compose(Some(counter));
            counter += 1;
        }
        candidate
    }

    fn unique_sibling(dir: &Path, name: &str, is_dir: bool) -> PathBuf {
        if is_dir {
            return Self::unique_path(dir, name, "");
        }
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Self::unique_path(dir, stem, ext),
            _ => Self::unique_path(dir, name, ""),
        }
    }
}

/// A folder cannot be moved or copied into itself or its own subtree.
fn ensure_not_into_self(path: &Path, dest_dir: &Path) -> Result<()> {
    if path.is_dir() && is_within(dest_dir, path) {
        return Err(IndexError::InvalidName {
            name: path.display().to_string(),
            reason: "destination is inside the folder itself".to_string(),
        });
    }
    Ok(())
}

#[cfg(windows)]
fn is_hidden(metadata: &fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0
}

#[cfg(not(windows))]
fn is_hidden(_metadata: &fs::Metadata) -> bool {
    false
}

/// Reject names that would escape the directory or be hidden by the index.
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name.contains('/') || name.contains('\\') {
        Some("name contains a path separator")
    } else if name == "." || name == ".." {
        Some("name is reserved")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(IndexError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
