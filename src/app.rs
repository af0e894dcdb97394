use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::assets::AssetServices;
use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::events::{PanelId, TaskQueue, TaskSender, UiTask};
use crate::fs::types::{canonicalize_path, path_key};
use crate::remote::{CatalogQuery, LoadTrigger, RemoteRecord};
use crate::tree::{DropEffect, NewAsset};
use crate::ui::{GridPanel, Pane, PaneKind, PaneSpec, RemoteTreePanel, TreePanel};

/// Identity of a separator between two adjacent panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeparatorId(pub u32);

/// One element of the left-to-right panel strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutItem {
    Panel(PanelId),
    Separator(SeparatorId),
}

/// Serializable panel arrangement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub panels: Vec<PaneSpec>,
    /// Position of the focused panel in `panels`
    pub active: usize,
}

/// What one tick applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub applied: usize,
    /// Tasks for closed panels, superseded searches or stale watch roots
    pub dropped: usize,
    pub trees_dirtied: usize,
    pub grids_reloaded: usize,
    pub results_loaded: usize,
    pub failures: usize,
}

impl TickReport {
    pub fn needs_redraw(&self) -> bool {
        self.trees_dirtied + self.grids_reloaded + self.results_loaded + self.failures > 0
    }
}

struct PanelSlot {
    id: PanelId,
    pane: Pane,
    close_visible: bool,
}

enum RemoteView {
    Category(String),
    Search(String),
}

/// Hosts the panels, routes notifications between them and drains the UI
/// task queue.
pub struct Coordinator {
    config: IndexConfig,
    services: AssetServices,
    catalog: Arc<dyn CatalogQuery>,
    runtime: Option<Handle>,
    panels: Vec<PanelSlot>,
    layout: Vec<LayoutItem>,
    next_id: u32,
    active: PanelId,
    queue: TaskQueue,
    message: String,
}

impl Coordinator {
    /// Create a coordinator showing `first`. There is always at least one
    /// panel from here on.
    pub fn new(
        config: IndexConfig,
        services: AssetServices,
        catalog: Arc<dyn CatalogQuery>,
        first: PaneSpec,
    ) -> Self {
        let mut coordinator = Self {
            config,
            services,
            catalog,
            runtime: Handle::try_current().ok(),
            panels: Vec::new(),
            layout: Vec::new(),
            next_id: 1,
            active: PanelId(1),
            queue: TaskQueue::new(),
            message: "Ready".to_string(),
        };
        coordinator.active = coordinator.add_panel(first);
        coordinator
    }

    /// Rebuild a saved arrangement.
    pub fn from_snapshot(
        config: IndexConfig,
        services: AssetServices,
        catalog: Arc<dyn CatalogQuery>,
        snapshot: LayoutSnapshot,
    ) -> Result<Self> {
        let mut specs = snapshot.panels.into_iter();
        let first = specs.next().ok_or(IndexError::LastPanel)?;
        let mut coordinator = Self::new(config, services, catalog, first);
        for spec in specs {
            coordinator.add_panel(spec);
        }
        if let Some(slot) = coordinator.panels.get(snapshot.active) {
            coordinator.active = slot.id;
        }
        Ok(coordinator)
    }

    /// Use `handle` for catalog queries instead of the ambient runtime.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Producer handle onto this coordinator's task queue.
    pub fn sender(&self) -> TaskSender {
        self.queue.sender()
    }

    // ----- Panel layout -----

    pub fn add_panel(&mut self, spec: PaneSpec) -> PanelId {
        let id = PanelId(self.next_id);
        self.next_id += 1;
        let pane = self.build_pane(id, spec);

        if !self.panels.is_empty() {
            self.layout.push(LayoutItem::Separator(SeparatorId(id.0)));
        }
        self.layout.push(LayoutItem::Panel(id));
        self.panels.push(PanelSlot {
            id,
            pane,
            close_visible: false,
        });
        self.update_close_buttons();

        tracing::info!("added panel {} ({} total)", id, self.panels.len());
        id
    }

    fn build_pane(&self, id: PanelId, spec: PaneSpec) -> Pane {
        let sender = self.queue.sender();
        match spec {
            PaneSpec::Tree { roots } => {
                let mut tree = TreePanel::new(&roots, self.services.clone());
                if self.config.watch {
                    tree.attach_watchers(id, &sender);
                }
                Pane::Tree(tree)
            }
            PaneSpec::Grid { folder } => {
                let mut grid = GridPanel::local(self.config.grid, self.services.clone());
                if self.config.watch {
                    grid.watch_as(id, sender);
                }
                if let Some(folder) = folder {
                    grid.navigate(&folder);
                }
                Pane::Grid(grid)
            }
            PaneSpec::RemoteTree => Pane::RemoteTree(RemoteTreePanel::new(&self.config.catalog)),
            PaneSpec::RemoteGrid => {
                Pane::RemoteGrid(GridPanel::remote(self.config.grid, self.services.clone()))
            }
        }
    }

    /// Remove a panel together with one adjacent separator. The last
    /// remaining panel cannot be removed.
    pub fn remove_panel(&mut self, id: PanelId) -> Result<()> {
        let index = self.slot_index(id)?;
        if self.panels.len() == 1 {
            return Err(IndexError::LastPanel);
        }

        let position = self
            .layout
            .iter()
            .position(|item| *item == LayoutItem::Panel(id))
            .ok_or(IndexError::UnknownPanel { id: id.0 })?;
        self.layout.remove(position);
        if position > 0 {
            self.layout.remove(position - 1);
        } else if matches!(self.layout.first(), Some(LayoutItem::Separator(_))) {
            self.layout.remove(0);
        }

        let mut slot = self.panels.remove(index);
        slot.pane.dispose();
        if self.active == id {
            self.active = self.panels[index.saturating_sub(1)].id;
        }
        self.update_close_buttons();

        tracing::info!("removed panel {} ({} left)", id, self.panels.len());
        Ok(())
    }

    fn update_close_buttons(&mut self) {
        let visible = self.panels.len() > 1;
        for slot in &mut self.panels {
            slot.close_visible = visible;
        }
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    pub fn separator_count(&self) -> usize {
        self.layout
            .iter()
            .filter(|item| matches!(item, LayoutItem::Separator(_)))
            .count()
    }

    pub fn layout(&self) -> &[LayoutItem] {
        &self.layout
    }

    /// Panel ids in registration order.
    pub fn panel_ids(&self) -> Vec<PanelId> {
        self.panels.iter().map(|slot| slot.id).collect()
    }

    pub fn close_visible(&self, id: PanelId) -> bool {
        self.panels
            .iter()
            .find(|slot| slot.id == id)
            .is_some_and(|slot| slot.close_visible)
    }

    pub fn pane(&self, id: PanelId) -> Option<&Pane> {
        self.panels
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| &slot.pane)
    }

    pub fn pane_mut(&mut self, id: PanelId) -> Option<&mut Pane> {
        self.panels
            .iter_mut()
            .find(|slot| slot.id == id)
            .map(|slot| &mut slot.pane)
    }

    fn slot_index(&self, id: PanelId) -> Result<usize> {
        self.panels
            .iter()
            .position(|slot| slot.id == id)
            .ok_or(IndexError::UnknownPanel { id: id.0 })
    }

    fn tree_mut(&mut self, id: PanelId) -> Result<&mut TreePanel> {
        self.pane_mut(id)
            .and_then(Pane::as_tree_mut)
            .ok_or(IndexError::UnknownPanel { id: id.0 })
    }

    fn grid_mut(&mut self, id: PanelId) -> Result<&mut GridPanel> {
        self.pane_mut(id)
            .and_then(Pane::as_grid_mut)
            .ok_or(IndexError::UnknownPanel { id: id.0 })
    }

    fn remote_tree_mut(&mut self, id: PanelId) -> Result<&mut RemoteTreePanel> {
        self.pane_mut(id)
            .and_then(Pane::as_remote_tree_mut)
            .ok_or(IndexError::UnknownPanel { id: id.0 })
    }

    pub fn active(&self) -> PanelId {
        self.active
    }

    /// Move focus to the next panel, wrapping around.
    pub fn switch_panel(&mut self) {
        let index = self.slot_index(self.active).unwrap_or(0);
        self.active = self.panels[(index + 1) % self.panels.len()].id;
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            panels: self.panels.iter().map(|slot| slot.pane.spec()).collect(),
            active: self.slot_index(self.active).unwrap_or(0),
        }
    }

    // ----- Status surface -----

    pub fn status(&self) -> &str {
        &self.message
    }

    fn report_failure(&mut self, what: &str, error: &IndexError) {
        tracing::warn!("{} failed: {}", what, error);
        self.message = format!("✗ {} failed: {}", what, error);
    }

    // ----- Cross-panel fan-out -----

    /// Select `path` in a tree panel. A folder selection is broadcast to
    /// every local grid, in registration order. Returns how many grids
    /// followed.
    pub fn select_folder(&mut self, tree: PanelId, path: &Path) -> Result<usize> {
        let Some(folder) = self.tree_mut(tree)?.select(path) else {
            return Ok(0);
        };

        let mut notified = 0;
        for slot in &mut self.panels {
            if let Pane::Grid(grid) = &mut slot.pane {
                grid.navigate(&folder);
                notified += 1;
            }
        }
        tracing::debug!("folder {} sent to {} grids", folder.display(), notified);
        Ok(notified)
    }

    fn broadcast_remote(&mut self, view: &RemoteView, records: &[RemoteRecord]) -> usize {
        let mut notified = 0;
        for slot in &mut self.panels {
            if let Pane::RemoteGrid(grid) = &mut slot.pane {
                let projection = grid.projection_mut();
                match view {
                    RemoteView::Category(name) => projection.load_remote_category(name, records),
                    RemoteView::Search(query) => projection.load_remote_search(query, records),
                }
                notified += 1;
            }
        }
        notified
    }

    /// Invalidate every other panel's view of `dirs` after a mutation.
    fn sync_others(&mut self, source: PanelId, dirs: &[PathBuf]) {
        let keys: Vec<String> = dirs.iter().map(|d| path_key(d)).collect();
        for slot in &mut self.panels {
            if slot.id == source {
                continue;
            }
            match &mut slot.pane {
                Pane::Tree(tree) => {
                    for dir in dirs {
                        tree.invalidate(dir);
                    }
                }
                Pane::Grid(grid) => {
                    let shown = grid.current_folder().map(path_key);
                    if shown.is_some_and(|k| keys.contains(&k)) {
                        grid.projection_mut().reload();
                    }
                }
                Pane::RemoteTree(_) | Pane::RemoteGrid(_) => {}
            }
        }
    }

    // ----- Mutations issued from panels -----

    pub fn create_folder(&mut self, tree: PanelId, parent: &Path, name: &str) -> Result<PathBuf> {
        let result = self.tree_mut(tree)?.create_folder(parent, name);
        self.after_mutation(tree, "create folder", result, &[parent.to_path_buf()])
    }

    pub fn rename(&mut self, tree: PanelId, path: &Path, new_name: &str) -> Result<PathBuf> {
        let result = self.tree_mut(tree)?.rename(path, new_name);
        let dirs = parent_dirs(path);
        self.after_mutation(tree, "rename", result, &dirs)
    }

    pub fn delete(&mut self, tree: PanelId, path: &Path) -> Result<()> {
        let result = self.tree_mut(tree)?.delete(path);
        let dirs = parent_dirs(path);
        self.after_mutation(tree, "delete", result, &dirs)
    }

    pub fn create_unique_folder(&mut self, tree: PanelId, parent: &Path) -> Result<PathBuf> {
        let result = self.tree_mut(tree)?.create_unique_folder(parent);
        self.after_mutation(tree, "create folder", result, &[parent.to_path_buf()])
    }

    pub fn create_asset(
        &mut self,
        tree: PanelId,
        parent: &Path,
        asset: &NewAsset,
    ) -> Result<PathBuf> {
        let result = self.tree_mut(tree)?.create_asset(parent, asset);
        self.after_mutation(tree, "create asset", result, &[parent.to_path_buf()])
    }

    pub fn move_to(&mut self, tree: PanelId, path: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let result = self.tree_mut(tree)?.move_to(path, dest_dir);
        let mut dirs = parent_dirs(path);
        dirs.push(canonicalize_path(dest_dir));
        self.after_mutation(tree, "move", result, &dirs)
    }

    pub fn copy_to(&mut self, tree: PanelId, path: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let result = self.tree_mut(tree)?.copy_to(path, dest_dir);
        self.after_mutation(tree, "copy", result, &[canonicalize_path(dest_dir)])
    }

    pub fn duplicate(&mut self, tree: PanelId, path: &Path) -> Result<PathBuf> {
        let result = self.tree_mut(tree)?.duplicate(path);
        let dirs = parent_dirs(path);
        self.after_mutation(tree, "duplicate", result, &dirs)
    }

    /// Drop `paths` onto `target` in a tree panel. Each path succeeds or fails
    /// on its own; the first failure is reported on the status line.
    pub fn drop_onto(
        &mut self,
        tree: PanelId,
        target: &Path,
        paths: &[PathBuf],
        effect: DropEffect,
    ) -> Result<Vec<Result<PathBuf>>> {
        let results = self.tree_mut(tree)?.drop_onto(target, paths, effect);

        let mut dirs = parent_dirs(target);
        if effect == DropEffect::Move {
            for path in paths {
                dirs.extend(parent_dirs(path));
            }
        }
        if results.iter().any(|r| r.is_ok()) {
            self.sync_others(tree, &dirs);
        }

        let what = match effect {
            DropEffect::Move => "move",
            DropEffect::Copy => "copy",
        };
        match results.iter().find_map(|r| r.as_ref().err()) {
            Some(e) => self.report_failure(what, e),
            None => self.message = format!("✓ {} done", what),
        }
        Ok(results)
    }

    pub fn grid_delete(&mut self, grid: PanelId, index: usize) -> Result<PathBuf> {
        let result = self.grid_mut(grid)?.projection_mut().delete(index);
        let dirs = self.shown_folder(grid);
        self.after_mutation(grid, "delete", result, &dirs)
    }

    pub fn grid_rename(&mut self, grid: PanelId, index: usize, new_name: &str) -> Result<PathBuf> {
        let result = self.grid_mut(grid)?.projection_mut().rename(index, new_name);
        let dirs = self.shown_folder(grid);
        self.after_mutation(grid, "rename", result, &dirs)
    }

    pub fn grid_duplicate(&mut self, grid: PanelId, index: usize) -> Result<PathBuf> {
        let result = self.grid_mut(grid)?.projection_mut().duplicate(index);
        let dirs = self.shown_folder(grid);
        self.after_mutation(grid, "duplicate", result, &dirs)
    }

    fn shown_folder(&self, grid: PanelId) -> Vec<PathBuf> {
        self.pane(grid)
            .and_then(Pane::as_grid)
            .and_then(GridPanel::current_folder)
            .map(|p| vec![p.to_path_buf()])
            .unwrap_or_default()
    }

    fn after_mutation<T>(
        &mut self,
        source: PanelId,
        what: &str,
        result: Result<T>,
        dirs: &[PathBuf],
    ) -> Result<T> {
        match result {
            Ok(value) => {
                self.sync_others(source, dirs);
                self.message = format!("✓ {} done", what);
                Ok(value)
            }
            Err(e) => {
                self.report_failure(what, &e);
                Err(e)
            }
        }
    }

    // ----- Remote catalog -----

    /// Select or expand a category. Issues a query only when the category
    /// is neither loaded nor loading; cached results are replayed to the
    /// remote grids right away.
    pub fn load_category(&mut self, panel: PanelId, category: usize) -> Result<LoadTrigger> {
        self.trigger_category(panel, category, false)
    }

    /// Forced refresh of a category.
    pub fn refresh_category(&mut self, panel: PanelId, category: usize) -> Result<LoadTrigger> {
        self.trigger_category(panel, category, true)
    }

    fn trigger_category(
        &mut self,
        panel: PanelId,
        category: usize,
        force: bool,
    ) -> Result<LoadTrigger> {
        let node = self
            .remote_tree_mut(panel)?
            .tree_mut()
            .category_mut(category)
            .ok_or(IndexError::NoItem { index: category })?;
        let trigger = if force { node.refresh() } else { node.trigger() };
        let name = node.display_name().to_string();
        let cached = node.results().to_vec();

        match &trigger {
            LoadTrigger::Query(filter) => {
                self.message = format!("Loading {}...", name);
                self.spawn_query(filter.clone(), move |result| UiTask::CategoryLoaded {
                    owner: panel,
                    category,
                    result,
                });
            }
            LoadTrigger::Cached => {
                self.broadcast_remote(&RemoteView::Category(name), &cached);
            }
            LoadTrigger::AlreadyLoading => {
                tracing::debug!("{} is already loading", name);
            }
        }
        Ok(trigger)
    }

    /// Run a free-text search. Always queries; replaces the previous search
    /// node. Returns the search id.
    pub fn search(&mut self, panel: PanelId, query: &str) -> Result<u64> {
        let id = self.remote_tree_mut(panel)?.tree_mut().begin_search(query);
        self.message = format!("Searching \"{}\"...", query);
        self.spawn_query(query.to_string(), move |result| UiTask::SearchCompleted {
            owner: panel,
            search_id: id,
            result,
        });
        Ok(id)
    }

    fn spawn_query<F>(&self, filter: String, into_task: F)
    where
        F: FnOnce(Result<Vec<RemoteRecord>>) -> UiTask + Send + 'static,
    {
        let sender = self.queue.sender();
        let Some(runtime) = &self.runtime else {
            sender.send(into_task(Err(IndexError::Query {
                filter,
                message: "no async runtime available".to_string(),
            })));
            return;
        };

        let catalog = Arc::clone(&self.catalog);
        let max_results = self.config.catalog.max_results;
        runtime.spawn(async move {
            let result = catalog.query(&filter, max_results).await;
            sender.send(into_task(result));
        });
    }

    // ----- Task queue -----

    /// Apply everything queued so far without blocking.
    pub fn tick(&mut self) -> TickReport {
        let tasks = self.queue.drain();
        self.apply_tasks(tasks)
    }

    /// Wait for at least one task, then apply it and anything queued behind it.
    pub async fn wait_tick(&mut self) -> TickReport {
        let Some(first) = self.queue.next().await else {
            return TickReport::default();
        };
        let mut tasks = vec![first];
        tasks.extend(self.queue.drain());
        self.apply_tasks(tasks)
    }

    fn apply_tasks(&mut self, tasks: Vec<UiTask>) -> TickReport {
        let mut report = TickReport::default();
        let mut reload: Vec<PanelId> = Vec::new();

        for task in tasks {
            let owner = task.owner();
            if self.slot_index(owner).is_err() {
                tracing::debug!("dropping task for closed panel {}", owner);
                report.dropped += 1;
                continue;
            }

            match task {
                UiTask::FsChanged {
                    owner,
                    generation,
                    change,
                } => match self.pane_mut(owner) {
                    Some(Pane::Tree(tree)) => {
                        if tree.apply_change(&change) {
                            report.trees_dirtied += 1;
                        }
                        report.applied += 1;
                    }
                    Some(Pane::Grid(grid)) if grid.is_relevant(generation, &change) => {
                        if !reload.contains(&owner) {
                            reload.push(owner);
                        }
                        report.applied += 1;
                    }
                    _ => report.dropped += 1,
                },
                UiTask::CategoryLoaded {
                    owner,
                    category,
                    result,
                } => {
                    let Some(node) = self
                        .pane_mut(owner)
                        .and_then(Pane::as_remote_tree_mut)
                        .and_then(|remote| remote.tree_mut().category_mut(category))
                    else {
                        report.dropped += 1;
                        continue;
                    };
                    let name = node.display_name().to_string();
                    let outcome = node.complete(result).map(<[RemoteRecord]>::to_vec);
                    report.applied += 1;
                    match outcome {
                        Ok(records) => {
                            self.broadcast_remote(&RemoteView::Category(name.clone()), &records);
                            self.message = format!("{}: {} packages", name, records.len());
                            report.results_loaded += 1;
                        }
                        Err(e) => {
                            self.report_failure(&format!("loading {}", name), &e);
                            report.failures += 1;
                        }
                    }
                }
                UiTask::SearchCompleted {
                    owner,
                    search_id,
                    result,
                } => {
                    let Some(remote) = self.pane_mut(owner).and_then(Pane::as_remote_tree_mut)
                    else {
                        report.dropped += 1;
                        continue;
                    };
                    let query = remote
                        .tree()
                        .search()
                        .map(|s| s.query().to_string())
                        .unwrap_or_default();
                    let Some(outcome) = remote
                        .tree_mut()
                        .complete_search(search_id, result)
                        .map(|r| r.map(<[RemoteRecord]>::to_vec))
                    else {
                        tracing::debug!("dropping superseded search {}", search_id);
                        report.dropped += 1;
                        continue;
                    };
                    report.applied += 1;
                    match outcome {
                        Ok(records) => {
                            self.broadcast_remote(&RemoteView::Search(query.clone()), &records);
                            self.message = format!("\"{}\": {} packages", query, records.len());
                            report.results_loaded += 1;
                        }
                        Err(e) => {
                            self.report_failure(&format!("search \"{}\"", query), &e);
                            report.failures += 1;
                        }
                    }
                }
            }
        }

        for id in reload {
            if let Some(grid) = self.pane_mut(id).and_then(Pane::as_grid_mut) {
                grid.projection_mut().reload();
                report.grids_reloaded += 1;
            }
        }
        report
    }

    /// Kind of every panel, in registration order.
    pub fn kinds(&self) -> Vec<PaneKind> {
        self.panels.iter().map(|slot| slot.pane.kind()).collect()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        for slot in &mut self.panels {
            slot.pane.dispose();
        }
    }
}

fn parent_dirs(path: &Path) -> Vec<PathBuf> {
    let path = canonicalize_path(path);
    let mut dirs = vec![path.clone()];
    if let Some(parent) = path.parent() {
        dirs.push(parent.to_path_buf());
    }
    dirs
}
