// Centralized error handling for the asset index
// Every variant carries enough context (path, operation) to be shown on the status line

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Error type for tree, grid, catalog and panel operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// File system errors with context
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("permission denied while {operation} {}", path.display())]
    PermissionDenied { path: PathBuf, operation: String },

    #[error("already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("I/O error while {operation} {}: {source}", path.display())]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Tree / grid rule violations
    #[error("root folder cannot be {operation}: {}", path.display())]
    RootImmutable { path: PathBuf, operation: String },

    #[error("'{name}' is a remote catalog item; local file operations are unavailable")]
    RemoteItem { name: String },

    #[error("no grid item at index {index}")]
    NoItem { index: usize },

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Remote catalog
    #[error("catalog query '{filter}' failed: {message}")]
    Query { filter: String, message: String },

    /// Watcher setup
    #[error("cannot watch {}: {message}", path.display())]
    Watch { path: PathBuf, message: String },

    /// Configuration
    #[error("config error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// Panel coordination
    #[error("the last remaining panel cannot be removed")]
    LastPanel,

    #[error("no panel with id {id}")]
    UnknownPanel { id: u32 },
}

impl IndexError {
    /// Classify an io::Error into the most specific variant for the given operation.
    pub fn from_io_error(err: io::Error, operation: &str, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => IndexError::NotFound { path },
            io::ErrorKind::PermissionDenied => IndexError::PermissionDenied {
                path,
                operation: operation.to_string(),
            },
            io::ErrorKind::AlreadyExists => IndexError::AlreadyExists { path },
            _ => IndexError::Io {
                path,
                operation: operation.to_string(),
                source: err,
            },
        }
    }

    /// Transient errors are the ones a rescan can recover from.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IndexError::NotFound { .. } | IndexError::PermissionDenied { .. }
        )
    }
}

/// Attach operation and path context to io results, like anyhow's `with_context`.
pub(crate) trait IoContext<T> {
    fn op_context(self, operation: &str, path: &std::path::Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn op_context(self, operation: &str, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| IndexError::from_io_error(e, operation, path))
    }
}
