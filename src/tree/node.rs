use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use crate::assets::{AssetRecord, AssetRegistry, IconHint};
use crate::config::{PathClass, ProjectPaths};
use crate::events::{PanelId, TaskSender};
use crate::fs::types::{file_name, folded_key, key_within, path_key, PathEntry};
use crate::fs::LocalFs;
use crate::watch::{ChangeWatcher, WatchMode};

/// Recursion guard for filter scans of unexpanded folders (symlink loops).
const MAX_SCAN_DEPTH: usize = 32;

/// Materialization state of a folder's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    /// Never scanned.
    Unbuilt,
    /// Children reflect the last scan.
    Built,
    /// Children are stale; the next access rescans.
    Dirty,
}

/// A node of the browsed tree.
#[derive(Debug)]
pub enum TreeNode {
    Folder(FolderNode),
    File(FileNode),
}

impl TreeNode {
    pub fn path(&self) -> &Path {
        match self {
            TreeNode::Folder(folder) => folder.path(),
            TreeNode::File(file) => file.path(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TreeNode::Folder(folder) => folder.name(),
            TreeNode::File(file) => file.name(),
        }
    }

    pub fn icon(&self) -> IconHint {
        match self {
            TreeNode::Folder(folder) => folder.icon(),
            TreeNode::File(file) => file.icon(),
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, TreeNode::Folder(_))
    }

    pub fn has_children(&self) -> bool {
        match self {
            TreeNode::Folder(folder) => folder.has_children(),
            TreeNode::File(_) => false,
        }
    }

    /// Rescan the backing directory. Files have nothing to build.
    pub fn build_children(&mut self) {
        if let TreeNode::Folder(folder) = self {
            folder.build_children();
        }
    }

    pub fn matches_filter(&self, needle: &str) -> bool {
        match self {
            TreeNode::Folder(folder) => folder.matches_filter(needle),
            TreeNode::File(file) => file.matches_filter(needle),
        }
    }

    /// Folder that receives items dropped onto this node.
    pub fn drop_target(&self) -> &Path {
        match self {
            TreeNode::Folder(folder) => folder.path(),
            TreeNode::File(file) => file.path().parent().unwrap_or(file.path()),
        }
    }

    /// Find `path` at or below this node, materializing along the way.
    pub fn find_node(&mut self, path: &Path) -> Option<&mut TreeNode> {
        if folded_key(self.path()) == folded_key(path) {
            return Some(self);
        }
        match self {
            TreeNode::Folder(folder) => folder.find_descendant(path),
            TreeNode::File(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderNode> {
        match self {
            TreeNode::Folder(folder) => Some(folder),
            TreeNode::File(_) => None,
        }
    }

    pub fn as_folder_mut(&mut self) -> Option<&mut FolderNode> {
        match self {
            TreeNode::Folder(folder) => Some(folder),
            TreeNode::File(_) => None,
        }
    }

    pub fn as_file_mut(&mut self) -> Option<&mut FileNode> {
        match self {
            TreeNode::File(file) => Some(file),
            TreeNode::Folder(_) => None,
        }
    }

    /// Release watchers held anywhere in this subtree.
    pub fn dispose(&mut self) {
        if let TreeNode::Folder(folder) = self {
            folder.dispose();
        }
    }
}

/// A directory whose children are scanned on first access.
#[derive(Debug)]
pub struct FolderNode {
    path: PathBuf,
    display_name: String,
    icon: IconHint,
    is_root: bool,
    project: ProjectPaths,
    children: Vec<TreeNode>,
    state: ChildState,
    watcher: Option<ChangeWatcher>,
}

impl FolderNode {
    /// A folder is a root when it is given an explicit display name.
    pub fn new(path: &Path, display_name: Option<String>, project: &ProjectPaths) -> Self {
        let path = crate::fs::types::canonicalize_path(path);
        let is_root = display_name.is_some();
        let class = project.classify(&path);
        Self {
            display_name: display_name.unwrap_or_else(|| file_name(&path)),
            icon: IconHint::for_folder(class, is_root),
            path,
            is_root,
            project: project.clone(),
            children: Vec::new(),
            state: ChildState::Unbuilt,
            watcher: None,
        }
    }

    pub fn root(path: &Path, display_name: impl Into<String>, project: &ProjectPaths) -> Self {
        Self::new(path, Some(display_name.into()), project)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.display_name
    }

    pub fn icon(&self) -> IconHint {
        self.icon
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn class(&self) -> PathClass {
        self.project.classify(&self.path)
    }

    pub fn state(&self) -> ChildState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == ChildState::Dirty
    }

    pub fn is_built(&self) -> bool {
        self.state == ChildState::Built
    }

    pub fn is_watched(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn has_children(&self) -> bool {
        if self.state == ChildState::Built {
            return !self.children.is_empty();
        }
        LocalFs::list_dir(&self.path)
            .map(|entries| !entries.is_empty())
            .unwrap_or(false)
    }

    /// Children as last built, without triggering a scan.
    pub fn loaded_children(&self) -> &[TreeNode] {
        &self.children
    }

    /// Children, scanning first if they were never built or are dirty.
    pub fn children(&mut self) -> &[TreeNode] {
        self.ensure_children_built();
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [TreeNode] {
        self.ensure_children_built();
        &mut self.children
    }

    pub fn ensure_children_built(&mut self) {
        if self.state != ChildState::Built {
            self.build_children();
        }
    }

    /// Discard the children and rebuild them from a fresh directory scan.
    ///
    /// The new collection is assembled before it replaces the old one. A
    /// failed scan leaves the folder empty and is only logged.
    pub fn build_children(&mut self) {
        let rebuilt: Vec<TreeNode> = match LocalFs::list_dir(&self.path) {
            Ok(entries) => entries
                .into_iter()
                .map(|entry| self.child_node(entry))
                .collect(),
            Err(e) => {
                tracing::warn!("cannot list {}: {}", self.path.display(), e);
                Vec::new()
            }
        };

        let mut previous = std::mem::replace(&mut self.children, rebuilt);
        for child in &mut previous {
            child.dispose();
        }
        self.state = ChildState::Built;
        tracing::debug!(
            "rebuilt {} ({} children)",
            self.path.display(),
            self.children.len()
        );
    }

    fn child_node(&self, entry: PathEntry) -> TreeNode {
        if entry.is_folder {
            TreeNode::Folder(FolderNode::new(&entry.full_path, None, &self.project))
        } else {
            TreeNode::File(FileNode::new(entry))
        }
    }

    /// Flag the children as stale. Unbuilt folders stay unbuilt.
    pub fn mark_dirty(&mut self) {
        if self.state == ChildState::Built {
            self.state = ChildState::Dirty;
        }
    }

    /// Mark the already-materialized folder at `dir` dirty. Never scans.
    /// Returns whether such a folder was found.
    pub fn mark_dirty_at(&mut self, dir: &Path) -> bool {
        let target = path_key(dir);
        self.mark_dirty_by_key(&target)
    }

    fn mark_dirty_by_key(&mut self, target: &str) -> bool {
        let own = path_key(&self.path);
        if own == target {
            self.mark_dirty();
            return true;
        }
        if !key_within(target, &own) {
            return false;
        }
        self.children.iter_mut().any(|child| match child {
            TreeNode::Folder(folder) => folder.mark_dirty_by_key(target),
            TreeNode::File(_) => false,
        })
    }

    /// True if this folder's name, or any descendant's, contains `needle`
    /// (case-insensitive).
    ///
    /// Unmaterialized or stale folders are searched with a direct directory
    /// scan so matches inside unexpanded folders are found without building
    /// their children.
    pub fn matches_filter(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        if needle.is_empty() || self.display_name.to_lowercase().contains(&needle) {
            return true;
        }
        self.descendants_match(&needle)
    }

    fn descendants_match(&self, needle: &str) -> bool {
        if self.state == ChildState::Built {
            self.children.iter().any(|child| match child {
                TreeNode::Folder(folder) => {
                    folder.display_name.to_lowercase().contains(needle)
                        || folder.descendants_match(needle)
                }
                TreeNode::File(file) => file.display_name.to_lowercase().contains(needle),
            })
        } else {
            scan_matches(&self.path, needle, 0)
        }
    }

    /// Find a node strictly below this folder, building children on the way.
    pub fn find_descendant(&mut self, path: &Path) -> Option<&mut TreeNode> {
        let folded = folded_key(path);
        let own = folded_key(&self.path);
        if folded == own || !key_within(&folded, &own) {
            return None;
        }

        self.ensure_children_built();
        let exact = path_key(path);
        let index = self
            .children
            .iter()
            .position(|c| key_within(&exact, &path_key(c.path())))
            .or_else(|| {
                self.children
                    .iter()
                    .position(|c| key_within(&folded, &folded_key(c.path())))
            })?;

        let child = &mut self.children[index];
        if folded_key(child.path()) == folded {
            return Some(child);
        }
        match child {
            TreeNode::Folder(folder) => folder.find_descendant(path),
            TreeNode::File(_) => None,
        }
    }

    /// Mutable access to this folder or a materialized folder below it.
    pub fn find_folder_mut(&mut self, path: &Path) -> Option<&mut FolderNode> {
        if folded_key(&self.path) == folded_key(path) {
            return Some(self);
        }
        self.find_descendant(path)?.as_folder_mut()
    }

    /// Attach a recursive watcher reporting to `owner`. Setup failures leave
    /// the folder unwatched.
    pub fn attach_watcher(&mut self, owner: PanelId, sender: TaskSender) {
        if let Some(old) = self.watcher.take() {
            old.dispose();
        }
        self.watcher = ChangeWatcher::try_new(&self.path, WatchMode::tree(), owner, sender);
    }

    /// Release the watcher and every materialized descendant.
    pub fn dispose(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.dispose();
        }
        for child in &mut self.children {
            child.dispose();
        }
        self.children.clear();
        self.state = ChildState::Unbuilt;
    }
}

fn scan_matches(dir: &Path, needle: &str, depth: usize) -> bool {
    if depth >= MAX_SCAN_DEPTH {
        return false;
    }
    let Ok(entries) = LocalFs::list_dir(dir) else {
        return false;
    };
    entries.iter().any(|entry| {
        entry.display_name.to_lowercase().contains(needle)
            || (entry.is_folder && scan_matches(&entry.full_path, needle, depth + 1))
    })
}

/// A terminal node for one file.
#[derive(Debug)]
pub struct FileNode {
    path: PathBuf,
    display_name: String,
    extension: String,
    icon: IconHint,
    resource: Option<Weak<AssetRecord>>,
}

impl FileNode {
    pub fn new(entry: PathEntry) -> Self {
        Self {
            icon: IconHint::for_file(&entry.extension),
            path: entry.full_path,
            display_name: entry.display_name,
            extension: entry.extension,
            resource: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.display_name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn icon(&self) -> IconHint {
        self.icon
    }

    pub fn matches_filter(&self, needle: &str) -> bool {
        self.display_name
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }

    /// The registry's record for this file. Only a weak handle is cached, so
    /// records the registry drops are looked up again.
    pub fn resource(&mut self, registry: &dyn AssetRegistry) -> Option<Arc<AssetRecord>> {
        if let Some(record) = self.resource.as_ref().and_then(Weak::upgrade) {
            return Some(record);
        }
        let record = registry.find(&self.path)?;
        self.resource = Some(Arc::downgrade(&record));
        Some(record)
    }
}
