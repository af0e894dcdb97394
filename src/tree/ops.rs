//! Structural mutations on a browsed tree.
//!
//! Every operation touches the filesystem first. Only after it succeeds are
//! the affected folders marked dirty; children collections are never patched
//! in place, so the next access rebuilds them from disk. A failed operation
//! leaves the tree exactly as it was.

use std::path::{Path, PathBuf};

use crate::assets::AssetRegistry;
use crate::error::{IndexError, Result};
use crate::fs::types::{canonicalize_path, folded_key};
use crate::fs::{validate_name, LocalFs};
use crate::tree::node::TreeNode;

/// A file to materialize inside a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewAsset {
    /// Written from template contents, then registered with the pipeline.
    Template {
        name: String,
        extension: String,
        contents: Vec<u8>,
    },
    /// Generated by the pipeline itself.
    Typed {
        name: String,
        kind: String,
        extension: String,
    },
}

/// What a drop onto a node does with the dropped paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropEffect {
    Move,
    Copy,
}

fn parent_of(path: &Path) -> Result<PathBuf> {
    path.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| IndexError::NotFound {
            path: path.to_path_buf(),
        })
}

/// Mark `dir` dirty if it is materialized under `root`.
fn invalidate(root: &mut TreeNode, dir: &Path) {
    if let Some(folder) = root.as_folder_mut() {
        folder.mark_dirty_at(dir);
    }
}

fn ensure_not_root(root: &TreeNode, path: &Path, operation: &str) -> Result<()> {
    let is_root = root.as_folder().is_some_and(|f| f.is_root());
    if is_root && folded_key(root.path()) == folded_key(path) {
        return Err(IndexError::RootImmutable {
            path: path.to_path_buf(),
            operation: operation.to_string(),
        });
    }
    Ok(())
}

pub fn create_folder(root: &mut TreeNode, parent: &Path, name: &str) -> Result<PathBuf> {
    validate_name(name)?;
    let path = canonicalize_path(&parent.join(name));
    LocalFs::create_dir(&path)?;
    invalidate(root, parent);
    tracing::info!("created folder {}", path.display());
    Ok(path)
}

/// Create a folder named `NewFolder`, `NewFolder_1`, ... inside `parent`.
pub fn create_unique_folder(root: &mut TreeNode, parent: &Path) -> Result<PathBuf> {
    let path = LocalFs::unique_path(parent, "NewFolder", "");
    LocalFs::create_dir(&path)?;
    invalidate(root, parent);
    Ok(canonicalize_path(&path))
}

/// Materialize a new asset and notify the registry exactly once on success.
pub fn create_asset(
    root: &mut TreeNode,
    parent: &Path,
    asset: &NewAsset,
    registry: &dyn AssetRegistry,
) -> Result<PathBuf> {
    let path = match asset {
        NewAsset::Template {
            name,
            extension,
            contents,
        } => {
            validate_name(name)?;
            let path = LocalFs::unique_path(parent, name, extension);
            LocalFs::create_file(&path, contents)?;
            if let Err(e) = registry.register_created_file(&path) {
                // The file is on disk even though the pipeline refused it.
                invalidate(root, parent);
                return Err(e);
            }
            path
        }
        NewAsset::Typed {
            name,
            kind,
            extension,
        } => {
            validate_name(name)?;
            let path = LocalFs::unique_path(parent, name, extension);
            registry.create_typed_resource(kind, &path)?;
            path
        }
    };

    invalidate(root, parent);
    tracing::info!("created asset {}", path.display());
    Ok(canonicalize_path(&path))
}

pub fn rename(root: &mut TreeNode, path: &Path, new_name: &str) -> Result<PathBuf> {
    ensure_not_root(root, path, "renamed")?;
    let parent = parent_of(path)?;
    let target = LocalFs::rename(path, new_name)?;

    invalidate(root, path);
    invalidate(root, &parent);
    tracing::info!("renamed {} to {}", path.display(), new_name);
    Ok(canonicalize_path(&target))
}

pub fn move_to(root: &mut TreeNode, path: &Path, dest_dir: &Path) -> Result<PathBuf> {
    ensure_not_root(root, path, "moved")?;
    let parent = parent_of(path)?;
    let target = LocalFs::move_into(path, dest_dir)?;

    invalidate(root, path);
    invalidate(root, &parent);
    invalidate(root, dest_dir);
    tracing::info!("moved {} into {}", path.display(), dest_dir.display());
    Ok(canonicalize_path(&target))
}

pub fn copy_to(root: &mut TreeNode, path: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let target = LocalFs::copy_into(path, dest_dir)?;
    invalidate(root, dest_dir);
    Ok(canonicalize_path(&target))
}

pub fn duplicate(root: &mut TreeNode, path: &Path) -> Result<PathBuf> {
    ensure_not_root(root, path, "duplicated")?;
    let parent = parent_of(path)?;
    let target = LocalFs::duplicate(path)?;
    invalidate(root, &parent);
    Ok(canonicalize_path(&target))
}

pub fn delete(root: &mut TreeNode, path: &Path) -> Result<()> {
    ensure_not_root(root, path, "deleted")?;
    let parent = parent_of(path)?;
    LocalFs::delete(path)?;

    invalidate(root, &parent);
    tracing::info!("deleted {}", path.display());
    Ok(())
}

/// Drop `paths` onto the node at `target`. Each path is handled on its own;
/// one failure does not stop the rest.
pub fn drop_onto(
    root: &mut TreeNode,
    target: &Path,
    paths: &[PathBuf],
    effect: DropEffect,
) -> Vec<Result<PathBuf>> {
    let dest = match root.find_node(target) {
        Some(node) => node.drop_target().to_path_buf(),
        None => {
            return vec![Err(IndexError::NotFound {
                path: target.to_path_buf(),
            })]
        }
    };

    paths
        .iter()
        .map(|path| {
            // Dropping a folder into itself or its own subtree is a no-op error.
            if crate::fs::types::is_within(&dest, path) {
                return Err(IndexError::InvalidName {
                    name: path.display().to_string(),
                    reason: "cannot drop a folder into itself".to_string(),
                });
            }
            match effect {
                DropEffect::Move => move_to(root, path, &dest),
                DropEffect::Copy => copy_to(root, path, &dest),
            }
        })
        .collect()
}
