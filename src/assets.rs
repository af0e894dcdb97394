//! Collaborators the index talks to but does not implement: the asset
//! registry (compilation pipeline) and the thumbnail source.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::{PathClass, ProjectPaths};
use crate::error::Result;
use crate::fs::types::{extension_of, file_name, path_key};

/// External record describing a registered asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub path: PathBuf,
    pub kind: String,
}

/// Asset-registration pipeline.
pub trait AssetRegistry: Send + Sync {
    /// Called once after a file was materialized from a template.
    fn register_created_file(&self, path: &Path) -> Result<()>;

    /// Called once to have the pipeline generate a typed resource at `path`.
    fn create_typed_resource(&self, kind: &str, path: &Path) -> Result<()>;

    /// Look up the record for an existing file, if the pipeline knows it.
    fn find(&self, path: &Path) -> Option<Arc<AssetRecord>>;
}

/// A call observed by [`MemoryRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Registered(PathBuf),
    Created { kind: String, path: PathBuf },
}

/// In-process registry that records every call and keeps records in memory.
#[derive(Default)]
pub struct MemoryRegistry {
    records: Mutex<HashMap<String, Arc<AssetRecord>>>,
    calls: Mutex<Vec<RegistryCall>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn insert(&self, path: &Path, kind: String) {
        let record = Arc::new(AssetRecord {
            path: path.to_path_buf(),
            kind,
        });
        if let Ok(mut records) = self.records.lock() {
            records.insert(path_key(path), record);
        }
    }

    fn record_call(&self, call: RegistryCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl AssetRegistry for MemoryRegistry {
    fn register_created_file(&self, path: &Path) -> Result<()> {
        self.insert(path, extension_of(&file_name(path)));
        self.record_call(RegistryCall::Registered(path.to_path_buf()));
        Ok(())
    }

    fn create_typed_resource(&self, kind: &str, path: &Path) -> Result<()> {
        self.insert(path, kind.to_string());
        self.record_call(RegistryCall::Created {
            kind: kind.to_string(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    fn find(&self, path: &Path) -> Option<Arc<AssetRecord>> {
        self.records.lock().ok()?.get(&path_key(path)).cloned()
    }
}

/// Opaque handle to a rendered preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub source: PathBuf,
}

pub trait ThumbnailProvider: Send + Sync {
    fn thumbnail(&self, path: &Path) -> Result<Option<Arc<Thumbnail>>>;
}

/// Image files preview as themselves; everything else has no thumbnail.
pub struct ImageThumbnails;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tga", "gif", "bmp", "webp"];

impl ThumbnailProvider for ImageThumbnails {
    fn thumbnail(&self, path: &Path) -> Result<Option<Arc<Thumbnail>>> {
        let ext = extension_of(&file_name(path));
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Some(Arc::new(Thumbnail {
                source: path.to_path_buf(),
            })))
        } else {
            Ok(None)
        }
    }
}

/// Type-derived icon and colour, used when no thumbnail is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconHint {
    pub icon: &'static str,
    pub color: &'static str,
}

impl IconHint {
    pub fn for_folder(class: PathClass, is_root: bool) -> Self {
        match (class, is_root) {
            (PathClass::Code, true) => Self { icon: "code", color: "purple" },
            (PathClass::Assets, true) => Self { icon: "inventory", color: "orange" },
            (_, true) => Self { icon: "folder_special", color: "yellow" },
            _ => Self { icon: "folder", color: "yellow" },
        }
    }

    pub fn for_file(extension: &str) -> Self {
        match extension {
            "vmdl" | "fbx" | "obj" | "gltf" | "glb" => Self { icon: "view_in_ar", color: "cyan" },
            "vmat" | "mat" => Self { icon: "texture", color: "green" },
            "png" | "jpg" | "jpeg" | "tga" | "gif" | "bmp" | "webp" => {
                Self { icon: "image", color: "green" }
            }
            "wav" | "mp3" | "ogg" | "sound" | "vsnd" => Self { icon: "volume_up", color: "blue" },
            "vmap" | "map" | "scene" => Self { icon: "map", color: "orange" },
            "cs" | "rs" | "razor" | "scss" => Self { icon: "code", color: "purple" },
            "json" | "toml" | "txt" | "md" => Self { icon: "description", color: "gray" },
            _ => Self { icon: "insert_drive_file", color: "gray" },
        }
    }

    pub fn for_package(package_type: &str) -> Self {
        match package_type.to_lowercase().as_str() {
            "model" => Self::for_file("vmdl"),
            "material" => Self::for_file("vmat"),
            "sound" => Self::for_file("vsnd"),
            "map" => Self::for_file("vmap"),
            "library" => Self { icon: "extension", color: "purple" },
            _ => Self { icon: "cloud", color: "blue" },
        }
    }
}

/// Everything a tree or grid needs from the outside world, bundled once.
#[derive(Clone)]
pub struct AssetServices {
    pub project: ProjectPaths,
    pub registry: Arc<dyn AssetRegistry>,
    pub thumbnails: Arc<dyn ThumbnailProvider>,
}

impl AssetServices {
    pub fn new(
        project: ProjectPaths,
        registry: Arc<dyn AssetRegistry>,
        thumbnails: Arc<dyn ThumbnailProvider>,
    ) -> Self {
        Self {
            project,
            registry,
            thumbnails,
        }
    }

    /// In-memory registry and image thumbnails, for tools and tests.
    pub fn standalone(project: ProjectPaths) -> Self {
        Self::new(
            project,
            Arc::new(MemoryRegistry::new()),
            Arc::new(ImageThumbnails),
        )
    }
}
