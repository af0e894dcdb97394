//! File system watcher feeding the UI task queue.
//!
//! Uses the notify crate. Events arrive on notify's own thread and are only
//! ever forwarded into the [`TaskSender`]; the UI thread decides what to
//! dirty or reload.

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{IndexError, Result};
use crate::events::{FsChange, FsChangeKind, PanelId, TaskSender, UiTask};

/// What a watcher reports and how deep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchMode {
    pub recursive: bool,
    /// Forward content modifications as well as structure changes.
    pub include_modify: bool,
}

impl WatchMode {
    /// Tree roots: whole subtree, structure changes only.
    pub fn tree() -> Self {
        Self {
            recursive: true,
            include_modify: false,
        }
    }

    /// Grid folders: one directory, including modifications.
    pub fn folder() -> Self {
        Self {
            recursive: false,
            include_modify: true,
        }
    }

    fn recursive_mode(&self) -> RecursiveMode {
        if self.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        }
    }
}

/// Map a notify event kind to the changes the index cares about.
pub fn classify(kind: &EventKind, include_modify: bool) -> Option<FsChangeKind> {
    match kind {
        EventKind::Create(_) => Some(FsChangeKind::Created),
        EventKind::Remove(_) => Some(FsChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(_)) => Some(FsChangeKind::Renamed),
        EventKind::Modify(_) if include_modify => Some(FsChangeKind::Modified),
        _ => None,
    }
}

/// Delivery flag in bit 0 and the root generation above it, so the notify
/// thread reads both in a single load.
#[derive(Debug, Default)]
struct Delivery(AtomicU64);

impl Delivery {
    const ENABLED: u64 = 1;

    /// Generation to tag an event with, or `None` while delivery is off.
    fn snapshot(&self) -> Option<u64> {
        let state = self.0.load(Ordering::Acquire);
        (state & Self::ENABLED != 0).then_some(state >> 1)
    }

    fn enable(&self) {
        self.0.fetch_or(Self::ENABLED, Ordering::AcqRel);
    }

    fn disable(&self) {
        self.0.fetch_and(!Self::ENABLED, Ordering::AcqRel);
    }

    /// Move to the next generation; leaves the delivery flag as it was.
    fn advance(&self) {
        self.0.fetch_add(2, Ordering::AcqRel);
    }

    fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire) & Self::ENABLED != 0
    }

    fn generation(&self) -> u64 {
        self.0.load(Ordering::Acquire) >> 1
    }
}

/// One notify listener for one root, owned by a folder node or a grid panel.
pub struct ChangeWatcher {
    watcher: RecommendedWatcher,
    path: PathBuf,
    mode: WatchMode,
    delivery: Arc<Delivery>,
}

impl ChangeWatcher {
    /// Start watching `path`, tagging every forwarded change with `owner`.
    pub fn new(path: &Path, mode: WatchMode, owner: PanelId, sender: TaskSender) -> Result<Self> {
        let delivery = Arc::new(Delivery::default());

        let handler_delivery = Arc::clone(&delivery);
        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| {
                let Ok(event) = res else { return };
                let Some(generation) = handler_delivery.snapshot() else {
                    return;
                };
                let Some(kind) = classify(&event.kind, mode.include_modify) else {
                    return;
                };
                for path in event.paths {
                    sender.send(UiTask::FsChanged {
                        owner,
                        generation,
                        change: FsChange::new(kind, path),
                    });
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(1)),
        )
        .map_err(|e| watch_error(path, e))?;

        let mut this = Self {
            watcher,
            path: path.to_path_buf(),
            mode,
            delivery,
        };
        this.watcher
            .watch(path, mode.recursive_mode())
            .map_err(|e| watch_error(path, e))?;
        this.enable();
        Ok(this)
    }

    /// Like [`ChangeWatcher::new`], but a failure only leaves the owner unwatched.
    pub fn try_new(path: &Path, mode: WatchMode, owner: PanelId, sender: TaskSender) -> Option<Self> {
        match Self::new(path, mode, owner, sender) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!("live updates disabled for {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Point the watcher at a new root.
    ///
    /// Delivery is off while the path changes. Every event is tagged with the
    /// generation current when the callback read the delivery state, so an
    /// event read before the switch keeps the old generation. Events the
    /// backend still had buffered for the old root when delivery resumes get
    /// the new generation; receivers must also check the path against the
    /// root they show. On failure the watcher stays disabled.
    pub fn repoint(&mut self, new_path: &Path) -> Result<()> {
        self.disable();
        let _ = self.watcher.unwatch(&self.path);
        self.delivery.advance();
        self.path = new_path.to_path_buf();

        self.watcher
            .watch(new_path, self.mode.recursive_mode())
            .map_err(|e| watch_error(new_path, e))?;
        self.enable();
        Ok(())
    }

    pub fn enable(&self) {
        self.delivery.enable();
    }

    pub fn disable(&self) {
        self.delivery.disable();
    }

    pub fn is_enabled(&self) -> bool {
        self.delivery.is_enabled()
    }

    pub fn generation(&self) -> u64 {
        self.delivery.generation()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop delivery and release the OS handle.
    pub fn dispose(mut self) {
        self.disable();
        let _ = self.watcher.unwatch(&self.path);
    }
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("enabled", &self.is_enabled())
            .field("generation", &self.generation())
            .finish()
    }
}

fn watch_error(path: &Path, err: notify::Error) -> IndexError {
    IndexError::Watch {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
