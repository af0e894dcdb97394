use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::assets::{AssetServices, IconHint};
use crate::config::CatalogConfig;
use crate::error::{IndexError, Result};
use crate::events::{FsChange, PanelId, TaskSender};
use crate::fs::types::{canonicalize_path, file_name, is_within, key_within, path_key};
use crate::grid::{GridGeometry, GridProjection};
use crate::remote::{RemoteCatalogTree, RemoteNode};
use crate::tree::{ops, DropEffect, FolderNode, NewAsset, TreeNode};
use crate::watch::{ChangeWatcher, WatchMode};

/// A root shown by a tree panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSpec {
    pub path: PathBuf,
    pub name: String,
}

/// Serializable description of a panel, used to create panels and to
/// snapshot the layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaneSpec {
    Tree { roots: Vec<RootSpec> },
    Grid { folder: Option<PathBuf> },
    RemoteTree,
    RemoteGrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneKind {
    Tree,
    Grid,
    RemoteTree,
    RemoteGrid,
}

/// One visible line of a tree panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub path: PathBuf,
    pub name: String,
    pub is_folder: bool,
    pub expanded: bool,
    pub selected: bool,
    pub icon: IconHint,
}

/// Nested filesystem tree over one or more roots.
pub struct TreePanel {
    roots: Vec<TreeNode>,
    expanded: HashSet<String>,
    selected: Option<PathBuf>,
    filter: String,
    services: AssetServices,
}

impl TreePanel {
    pub fn new(roots: &[RootSpec], services: AssetServices) -> Self {
        let mut panel = Self {
            roots: Vec::new(),
            expanded: HashSet::new(),
            selected: None,
            filter: String::new(),
            services,
        };
        for root in roots {
            panel.add_root(&root.path, &root.name);
        }
        panel
    }

    pub fn add_root(&mut self, path: &Path, name: &str) {
        let root = FolderNode::root(path, name, &self.services.project);
        self.expanded.insert(path_key(root.path()));
        self.roots.push(TreeNode::Folder(root));
    }

    pub fn roots(&self) -> &[TreeNode] {
        &self.roots
    }

    pub fn roots_mut(&mut self) -> &mut [TreeNode] {
        &mut self.roots
    }

    pub fn root_specs(&self) -> Vec<RootSpec> {
        self.roots
            .iter()
            .map(|root| RootSpec {
                path: root.path().to_path_buf(),
                name: root.name().to_string(),
            })
            .collect()
    }

    /// Watch every root recursively; changes are reported as `owner`.
    pub fn attach_watchers(&mut self, owner: PanelId, sender: &TaskSender) {
        for root in &mut self.roots {
            if let Some(folder) = root.as_folder_mut() {
                folder.attach_watcher(owner, sender.clone());
            }
        }
    }

    fn root_index(&self, path: &Path) -> Result<usize> {
        self.roots
            .iter()
            .position(|root| is_within(path, root.path()))
            .ok_or_else(|| IndexError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn root_for(&mut self, path: &Path) -> Result<&mut TreeNode> {
        let index = self.root_index(path)?;
        Ok(&mut self.roots[index])
    }

    pub fn find_node(&mut self, path: &Path) -> Option<&mut TreeNode> {
        self.roots.iter_mut().find_map(|root| root.find_node(path))
    }

    /// Expand the folder at `path`, materializing its children.
    pub fn expand(&mut self, path: &Path) -> bool {
        let Some(TreeNode::Folder(folder)) = self.find_node(path) else {
            return false;
        };
        folder.ensure_children_built();
        let key = path_key(folder.path());
        self.expanded.insert(key);
        true
    }

    pub fn collapse(&mut self, path: &Path) {
        self.expanded.remove(&path_key(path));
    }

    pub fn is_expanded(&self, path: &Path) -> bool {
        self.expanded.contains(&path_key(path))
    }

    /// Select the node at `path`. Returns the folder path when a folder was
    /// selected, which is what other panels follow.
    pub fn select(&mut self, path: &Path) -> Option<PathBuf> {
        let node = self.find_node(path)?;
        let node_path = node.path().to_path_buf();
        let is_folder = node.is_folder();
        self.selected = Some(node_path.clone());
        is_folder.then_some(node_path)
    }

    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.trim().to_string();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Flatten roots and expanded folders into visible rows. Rows hidden by
    /// the filter are skipped together with their subtrees.
    pub fn rows(&mut self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        let selected = self.selected.as_ref().map(|p| path_key(p));
        for root in &mut self.roots {
            push_rows(root, 0, &self.expanded, selected.as_deref(), &self.filter, &mut rows);
        }
        rows
    }

    pub fn select_next(&mut self) {
        let rows = self.rows();
        if rows.is_empty() {
            return;
        }

        let i = match rows.iter().position(|r| r.selected) {
            Some(i) => {
                if i >= rows.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.selected = Some(rows[i].path.clone());
    }

    pub fn select_previous(&mut self) {
        let rows = self.rows();
        if rows.is_empty() {
            return;
        }

        let i = match rows.iter().position(|r| r.selected) {
            Some(i) => {
                if i == 0 {
                    rows.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.selected = Some(rows[i].path.clone());
    }

    /// Mark whatever a watcher change touched as dirty. Never scans.
    pub fn apply_change(&mut self, change: &FsChange) -> bool {
        let mut touched = false;
        for root in &mut self.roots {
            if let Some(folder) = root.as_folder_mut() {
                touched |= folder.mark_dirty_at(change.affected_dir());
                touched |= folder.mark_dirty_at(&change.path);
            }
        }
        touched
    }

    /// Mark a materialized folder dirty in every root that contains it.
    pub fn invalidate(&mut self, dir: &Path) -> bool {
        let mut touched = false;
        for root in &mut self.roots {
            if let Some(folder) = root.as_folder_mut() {
                touched |= folder.mark_dirty_at(dir);
            }
        }
        touched
    }

    /// Explicit refresh of one folder, or of every root.
    pub fn refresh(&mut self, path: Option<&Path>) {
        match path {
            Some(path) => {
                self.invalidate(path);
            }
            None => {
                for root in &mut self.roots {
                    if let Some(folder) = root.as_folder_mut() {
                        folder.mark_dirty();
                    }
                }
            }
        }
    }

    pub fn create_folder(&mut self, parent: &Path, name: &str) -> Result<PathBuf> {
        ops::create_folder(self.root_for(parent)?, parent, name)
    }

    pub fn create_unique_folder(&mut self, parent: &Path) -> Result<PathBuf> {
        ops::create_unique_folder(self.root_for(parent)?, parent)
    }

    pub fn create_asset(&mut self, parent: &Path, asset: &NewAsset) -> Result<PathBuf> {
        let registry = self.services.registry.clone();
        ops::create_asset(self.root_for(parent)?, parent, asset, registry.as_ref())
    }

    pub fn rename(&mut self, path: &Path, new_name: &str) -> Result<PathBuf> {
        let target = ops::rename(self.root_for(path)?, path, new_name)?;
        self.remap(path, &target);
        Ok(target)
    }

    pub fn move_to(&mut self, path: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let target = ops::move_to(self.root_for(path)?, path, dest_dir)?;
        // The destination may live under another root.
        self.invalidate(dest_dir);
        self.remap(path, &target);
        Ok(target)
    }

    pub fn copy_to(&mut self, path: &Path, dest_dir: &Path) -> Result<PathBuf> {
        ops::copy_to(self.root_for(dest_dir)?, path, dest_dir)
    }

    pub fn duplicate(&mut self, path: &Path) -> Result<PathBuf> {
        ops::duplicate(self.root_for(path)?, path)
    }

    pub fn delete(&mut self, path: &Path) -> Result<()> {
        ops::delete(self.root_for(path)?, path)?;
        let key = path_key(path);
        self.expanded.retain(|k| !key_within(k, &key));
        if self.selected.as_ref().is_some_and(|s| is_within(s, path)) {
            self.selected = None;
        }
        Ok(())
    }

    pub fn drop_onto(
        &mut self,
        target: &Path,
        paths: &[PathBuf],
        effect: DropEffect,
    ) -> Vec<Result<PathBuf>> {
        match self.root_for(target) {
            Ok(root) => ops::drop_onto(root, target, paths, effect),
            Err(e) => vec![Err(e)],
        }
    }

    /// Carry expansion and selection over to a renamed or moved path.
    fn remap(&mut self, old: &Path, new: &Path) {
        let old_key = path_key(old);
        let new_key = path_key(new);
        let moved: Vec<String> = self
            .expanded
            .iter()
            .filter(|k| key_within(k, &old_key))
            .cloned()
            .collect();
        for key in moved {
            self.expanded.remove(&key);
            self.expanded
                .insert(format!("{}{}", new_key, &key[old_key.len()..]));
        }

        if let Some(selected) = &self.selected {
            if is_within(selected, old) {
                // is_within folds case, so skip by component count rather
                // than by a case-sensitive prefix.
                let depth = canonicalize_path(old).components().count();
                let rest: PathBuf = canonicalize_path(selected)
                    .components()
                    .skip(depth)
                    .collect();
                self.selected = Some(canonicalize_path(&new.join(rest)));
            }
        }
    }

    pub fn dispose(&mut self) {
        for root in &mut self.roots {
            root.dispose();
        }
    }
}

fn push_rows(
    node: &mut TreeNode,
    depth: usize,
    expanded: &HashSet<String>,
    selected: Option<&str>,
    filter: &str,
    rows: &mut Vec<TreeRow>,
) {
    if !filter.is_empty() && !node.matches_filter(filter) {
        return;
    }

    let key = path_key(node.path());
    let is_expanded = node.is_folder() && expanded.contains(&key);
    rows.push(TreeRow {
        depth,
        path: node.path().to_path_buf(),
        name: node.name().to_string(),
        is_folder: node.is_folder(),
        expanded: is_expanded,
        selected: selected == Some(key.as_str()),
        icon: node.icon(),
    });

    if !is_expanded {
        return;
    }
    if let Some(folder) = node.as_folder_mut() {
        for child in folder.children_mut() {
            push_rows(child, depth + 1, expanded, selected, filter, rows);
        }
    }
}

/// Icon grid over a local folder, or over remote results for a remote grid.
pub struct GridPanel {
    projection: GridProjection,
    watcher: Option<ChangeWatcher>,
    listener: Option<(PanelId, TaskSender)>,
    remote: bool,
}

impl GridPanel {
    pub fn local(geometry: GridGeometry, services: AssetServices) -> Self {
        Self {
            projection: GridProjection::new(geometry, services),
            watcher: None,
            listener: None,
            remote: false,
        }
    }

    pub fn remote(geometry: GridGeometry, services: AssetServices) -> Self {
        Self {
            remote: true,
            ..Self::local(geometry, services)
        }
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    /// Enable live updates. Takes effect on the next navigation.
    pub fn watch_as(&mut self, owner: PanelId, sender: TaskSender) {
        if !self.remote {
            self.listener = Some((owner, sender));
        }
    }

    pub fn projection(&self) -> &GridProjection {
        &self.projection
    }

    pub fn projection_mut(&mut self) -> &mut GridProjection {
        &mut self.projection
    }

    pub fn current_folder(&self) -> Option<&Path> {
        self.projection.current_folder()
    }

    /// Show `path` and point the folder watcher at it.
    pub fn navigate(&mut self, path: &Path) {
        let path = canonicalize_path(path);
        self.projection.load_folder(&path);
        self.repoint_watcher(&path);
    }

    fn repoint_watcher(&mut self, path: &Path) {
        let Some((owner, sender)) = &self.listener else {
            return;
        };
        match &mut self.watcher {
            Some(watcher) => {
                if let Err(e) = watcher.repoint(path) {
                    tracing::warn!("live updates disabled for {}: {}", path.display(), e);
                }
            }
            None => {
                self.watcher =
                    ChangeWatcher::try_new(path, WatchMode::folder(), *owner, sender.clone());
            }
        }
    }

    /// Open the item at `index`. Folders are navigated into; returns whether
    /// navigation happened.
    pub fn open(&mut self, index: usize) -> Result<bool> {
        let item = self
            .projection
            .item(index)
            .ok_or(IndexError::NoItem { index })?;
        if item.is_remote {
            return Err(IndexError::RemoteItem {
                name: item.name.clone(),
            });
        }
        if !item.is_folder {
            return Ok(false);
        }
        let path = item.path.clone();
        self.navigate(&path);
        Ok(true)
    }

    /// Navigate to the parent of the current folder.
    pub fn up(&mut self) -> bool {
        let Some(parent) = self
            .current_folder()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
        else {
            return false;
        };
        self.navigate(&parent);
        true
    }

    pub fn watcher_generation(&self) -> Option<u64> {
        self.watcher
            .as_ref()
            .filter(|w| w.is_enabled())
            .map(ChangeWatcher::generation)
    }

    /// Whether a watcher change still concerns the folder on screen.
    pub fn is_relevant(&self, generation: u64, change: &FsChange) -> bool {
        if self.watcher_generation() != Some(generation) {
            return false;
        }
        let Some(folder) = self.current_folder() else {
            return false;
        };
        let folder = path_key(folder);
        path_key(change.affected_dir()) == folder || path_key(&change.path) == folder
    }

    pub fn dispose(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.dispose();
        }
        self.listener = None;
    }
}

/// Remote catalog categories plus the live search node.
pub struct RemoteTreePanel {
    tree: RemoteCatalogTree,
    filter: String,
}

impl RemoteTreePanel {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            tree: RemoteCatalogTree::new(config),
            filter: String::new(),
        }
    }

    pub fn tree(&self) -> &RemoteCatalogTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut RemoteCatalogTree {
        &mut self.tree
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.trim().to_string();
    }

    /// Top-level nodes passing the filter.
    pub fn visible_nodes(&self) -> Vec<RemoteNode<'_>> {
        self.tree
            .nodes()
            .into_iter()
            .filter(|node| node.matches_filter(&self.filter))
            .collect()
    }
}

/// A panel hosted by the coordinator.
pub enum Pane {
    Tree(TreePanel),
    Grid(GridPanel),
    RemoteTree(RemoteTreePanel),
    RemoteGrid(GridPanel),
}

impl Pane {
    pub fn kind(&self) -> PaneKind {
        match self {
            Pane::Tree(_) => PaneKind::Tree,
            Pane::Grid(_) => PaneKind::Grid,
            Pane::RemoteTree(_) => PaneKind::RemoteTree,
            Pane::RemoteGrid(_) => PaneKind::RemoteGrid,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Pane::Tree(tree) => tree
                .roots()
                .first()
                .map(|r| r.name().to_string())
                .unwrap_or_else(|| "Files".to_string()),
            Pane::Grid(grid) => grid
                .current_folder()
                .map(file_name)
                .unwrap_or_else(|| "Grid".to_string()),
            Pane::RemoteTree(_) => "Catalog".to_string(),
            Pane::RemoteGrid(_) => "Packages".to_string(),
        }
    }

    pub fn spec(&self) -> PaneSpec {
        match self {
            Pane::Tree(tree) => PaneSpec::Tree {
                roots: tree.root_specs(),
            },
            Pane::Grid(grid) => PaneSpec::Grid {
                folder: grid.current_folder().map(Path::to_path_buf),
            },
            Pane::RemoteTree(_) => PaneSpec::RemoteTree,
            Pane::RemoteGrid(_) => PaneSpec::RemoteGrid,
        }
    }

    pub fn as_tree_mut(&mut self) -> Option<&mut TreePanel> {
        match self {
            Pane::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    /// Local or remote grid.
    pub fn as_grid(&self) -> Option<&GridPanel> {
        match self {
            Pane::Grid(grid) | Pane::RemoteGrid(grid) => Some(grid),
            _ => None,
        }
    }

    pub fn as_grid_mut(&mut self) -> Option<&mut GridPanel> {
        match self {
            Pane::Grid(grid) | Pane::RemoteGrid(grid) => Some(grid),
            _ => None,
        }
    }

    pub fn as_remote_tree_mut(&mut self) -> Option<&mut RemoteTreePanel> {
        match self {
            Pane::RemoteTree(remote) => Some(remote),
            _ => None,
        }
    }

    /// Release watchers. Called when the panel is removed.
    pub fn dispose(&mut self) {
        match self {
            Pane::Tree(tree) => tree.dispose(),
            Pane::Grid(grid) | Pane::RemoteGrid(grid) => grid.dispose(),
            Pane::RemoteTree(_) => {}
        }
    }
}
