//! Flat grid projection over a folder listing or a remote result set.
//!
//! Items are never patched. Every load, and every mutation issued from the
//! grid, rebuilds the whole item list from its source. Hover is dropped on
//! rebuild; selection follows the selected path.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::{AssetServices, IconHint, Thumbnail};
use crate::error::{IndexError, Result};
use crate::fs::types::{canonicalize_path, same_path, PathEntry};
use crate::fs::LocalFs;
use crate::grid::layout::{CellRect, GridGeometry};
use crate::remote::RemoteRecord;

/// One positioned cell. Rebuilt wholesale on every load.
#[derive(Debug, Clone)]
pub struct GridItem {
    /// Local path, or the package identifier for remote items
    pub path: PathBuf,
    pub name: String,
    pub is_folder: bool,
    pub is_remote: bool,
    pub thumbnail: Option<Arc<Thumbnail>>,
    pub extension: String,
    pub remote: Option<RemoteRecord>,
    pub icon: IconHint,
    pub size_label: String,
}

impl GridItem {
    fn from_entry(entry: PathEntry, services: &AssetServices) -> Self {
        let icon = if entry.is_folder {
            IconHint::for_folder(services.project.classify(&entry.full_path), false)
        } else {
            IconHint::for_file(&entry.extension)
        };
        let thumbnail = if entry.is_folder {
            None
        } else {
            match services.thumbnails.thumbnail(&entry.full_path) {
                Ok(thumb) => thumb,
                Err(e) => {
                    tracing::debug!("no thumbnail for {}: {}", entry.full_path.display(), e);
                    None
                }
            }
        };

        Self {
            size_label: entry.format_size(),
            path: entry.full_path,
            name: entry.display_name,
            is_folder: entry.is_folder,
            is_remote: false,
            thumbnail,
            extension: entry.extension,
            remote: None,
            icon,
        }
    }

    fn from_record(record: &RemoteRecord) -> Self {
        Self {
            path: PathBuf::from(&record.identifier),
            name: record.title.clone(),
            is_folder: false,
            is_remote: true,
            thumbnail: None,
            extension: String::new(),
            remote: Some(record.clone()),
            icon: IconHint::for_package(&record.package_type),
            size_label: record.author_name.clone(),
        }
    }

    /// Local files and folders can be dragged out; remote packages cannot.
    pub fn can_drag(&self) -> bool {
        !self.is_remote
    }
}

/// What the grid is currently showing.
#[derive(Debug, Clone, Default)]
pub enum GridSource {
    #[default]
    Empty,
    Folder(PathBuf),
    RemoteCategory {
        name: String,
        records: Vec<RemoteRecord>,
    },
    RemoteSearch {
        query: String,
        records: Vec<RemoteRecord>,
    },
}

pub struct GridProjection {
    geometry: GridGeometry,
    services: AssetServices,
    source: GridSource,
    items: Vec<GridItem>,
    width: f32,
    hovered: Option<usize>,
    selected: Option<PathBuf>,
    load_count: u64,
}

impl GridProjection {
    pub fn new(geometry: GridGeometry, services: AssetServices) -> Self {
        Self {
            geometry,
            services,
            source: GridSource::Empty,
            items: Vec::new(),
            width: 0.0,
            hovered: None,
            selected: None,
            load_count: 0,
        }
    }

    /// Rescan `path` and replace every item. A missing or unreadable folder
    /// shows as empty.
    pub fn load_folder(&mut self, path: &Path) {
        let path = canonicalize_path(path);
        let entries = match LocalFs::list_dir(&path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("cannot list {}: {}", path.display(), e);
                Vec::new()
            }
        };
        let items = entries
            .into_iter()
            .map(|entry| GridItem::from_entry(entry, &self.services))
            .collect();
        self.source = GridSource::Folder(path);
        self.replace_items(items);
    }

    pub fn load_remote_category(&mut self, name: &str, records: &[RemoteRecord]) {
        self.source = GridSource::RemoteCategory {
            name: name.to_string(),
            records: records.to_vec(),
        };
        self.replace_items(records.iter().map(GridItem::from_record).collect());
    }

    pub fn load_remote_search(&mut self, query: &str, records: &[RemoteRecord]) {
        self.source = GridSource::RemoteSearch {
            query: query.to_string(),
            records: records.to_vec(),
        };
        self.replace_items(records.iter().map(GridItem::from_record).collect());
    }

    /// Rebuild from the current source.
    pub fn reload(&mut self) {
        match self.source.clone() {
            GridSource::Empty => self.replace_items(Vec::new()),
            GridSource::Folder(path) => self.load_folder(&path),
            GridSource::RemoteCategory { name, records } => {
                self.load_remote_category(&name, &records)
            }
            GridSource::RemoteSearch { query, records } => self.load_remote_search(&query, &records),
        }
    }

    fn replace_items(&mut self, items: Vec<GridItem>) {
        self.items = items;
        self.hovered = None;
        if let Some(selected) = &self.selected {
            if !self.items.iter().any(|item| same_path(&item.path, selected)) {
                self.selected = None;
            }
        }
        self.load_count += 1;
        tracing::debug!("grid loaded {} items", self.items.len());
    }

    pub fn source(&self) -> &GridSource {
        &self.source
    }

    pub fn current_folder(&self) -> Option<&Path> {
        match &self.source {
            GridSource::Folder(path) => Some(path),
            _ => None,
        }
    }

    pub fn items(&self) -> &[GridItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&GridItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of item rebuilds so far.
    pub fn load_count(&self) -> u64 {
        self.load_count
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width;
    }

    pub fn columns(&self) -> usize {
        self.geometry.columns(self.width)
    }

    pub fn rows(&self) -> usize {
        self.geometry.rows(self.items.len(), self.columns())
    }

    pub fn content_height(&self) -> f32 {
        self.geometry.content_height(self.items.len(), self.columns())
    }

    pub fn cell_rect(&self, index: usize) -> Option<CellRect> {
        (index < self.items.len()).then(|| self.geometry.cell_rect(index, self.columns()))
    }

    pub fn visible_range(&self, scroll_offset: f32, viewport_height: f32) -> Range<usize> {
        self.geometry
            .visible_range(scroll_offset, viewport_height, self.items.len(), self.columns())
    }

    pub fn hit_test(&self, x: f32, y: f32) -> Option<usize> {
        self.geometry.hit_test(x, y, self.width, self.items.len())
    }

    /// Update hover from a pointer position; returns the hovered index.
    pub fn hover_at(&mut self, x: f32, y: f32) -> Option<usize> {
        self.hovered = self.hit_test(x, y);
        self.hovered
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn select(&mut self, index: usize) -> Option<&GridItem> {
        let item = self.items.get(index)?;
        self.selected = Some(item.path.clone());
        Some(item)
    }

    pub fn select_at(&mut self, x: f32, y: f32) -> Option<&GridItem> {
        match self.hit_test(x, y) {
            Some(index) => self.select(index),
            None => {
                self.selected = None;
                None
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_index(&self) -> Option<usize> {
        let selected = self.selected.as_ref()?;
        self.items
            .iter()
            .position(|item| same_path(&item.path, selected))
    }

    pub fn selected_item(&self) -> Option<&GridItem> {
        self.selected_index().and_then(|i| self.items.get(i))
    }

    fn local_item(&self, index: usize) -> Result<&GridItem> {
        let item = self.items.get(index).ok_or(IndexError::NoItem { index })?;
        if item.is_remote {
            return Err(IndexError::RemoteItem {
                name: item.name.clone(),
            });
        }
        Ok(item)
    }

    pub fn delete(&mut self, index: usize) -> Result<PathBuf> {
        let path = self.local_item(index)?.path.clone();
        LocalFs::delete(&path)?;
        tracing::info!("deleted {}", path.display());
        self.reload();
        Ok(path)
    }

    pub fn rename(&mut self, index: usize, new_name: &str) -> Result<PathBuf> {
        let path = self.local_item(index)?.path.clone();
        let target = LocalFs::rename(&path, new_name)?;
        if self.selected.as_ref().is_some_and(|s| same_path(s, &path)) {
            self.selected = Some(canonicalize_path(&target));
        }
        tracing::info!("renamed {} to {}", path.display(), new_name);
        self.reload();
        Ok(canonicalize_path(&target))
    }

    pub fn duplicate(&mut self, index: usize) -> Result<PathBuf> {
        let path = self.local_item(index)?.path.clone();
        let target = LocalFs::duplicate(&path)?;
        self.reload();
        Ok(canonicalize_path(&target))
    }
}

impl std::fmt::Debug for GridProjection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridProjection")
            .field("source", &self.source)
            .field("items", &self.items.len())
            .field("load_count", &self.load_count)
            .finish()
    }
}
