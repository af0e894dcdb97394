//! Index configuration.
//!
//! Replaces any ambient "current project" lookup: project roots, grid
//! geometry and catalog categories are explicit values handed to each
//! component at construction time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{IndexError, IoContext, Result};
use crate::fs::types::{canonicalize_path, is_within};
use crate::grid::GridGeometry;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    /// Attach change watchers to tree roots and grid folders.
    pub watch: bool,
    pub project: ProjectPaths,
    pub grid: GridGeometry,
    pub catalog: CatalogConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            watch: true,
            project: ProjectPaths::default(),
            grid: GridGeometry::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl IndexConfig {
    /// Default location: `<config dir>/assetdex/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("assetdex").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).op_context("reading config", path)?;
        toml::from_str(&text).map_err(|e| IndexError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Missing files fall back to defaults; malformed ones are errors.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).map_err(|e| IndexError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).op_context("creating directory", parent)?;
        }
        std::fs::write(path, text).op_context("writing config", path)
    }
}

/// Where the project's asset and code trees live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ProjectPaths {
    pub assets_root: Option<PathBuf>,
    pub code_root: Option<PathBuf>,
}

/// Which project tree a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Assets,
    Code,
    Unknown,
}

impl ProjectPaths {
    pub fn new(assets_root: impl Into<PathBuf>, code_root: impl Into<PathBuf>) -> Self {
        Self {
            assets_root: Some(canonicalize_path(&assets_root.into())),
            code_root: Some(canonicalize_path(&code_root.into())),
        }
    }

    pub fn classify(&self, path: &Path) -> PathClass {
        let inside = |root: &Option<PathBuf>| root.as_deref().is_some_and(|r| is_within(path, r));
        // Code is checked first so a code tree nested in assets still reads as code.
        if inside(&self.code_root) {
            PathClass::Code
        } else if inside(&self.assets_root) {
            PathClass::Assets
        } else {
            PathClass::Unknown
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub max_results: usize,
    pub categories: Vec<CategorySpec>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let category = |filter: &str, name: &str| CategorySpec {
            type_filter: filter.to_string(),
            display_name: name.to_string(),
        };
        Self {
            max_results: 200,
            categories: vec![
                category("type:model", "Models"),
                category("type:material", "Materials"),
                category("type:sound", "Sounds"),
                category("type:map", "Maps"),
                category("type:library", "Libraries"),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorySpec {
    pub type_filter: String,
    pub display_name: String,
}
