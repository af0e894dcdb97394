//! Single-consumer task queue drained once per UI tick.
//!
//! Watcher threads and catalog query tasks never touch tree or grid state.
//! They push a [`UiTask`] through a [`TaskSender`]; the coordinator drains the
//! [`TaskQueue`] on its own thread and applies each task there.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::remote::RemoteRecord;

/// Identity of a panel hosted by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PanelId(pub u32);

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsChangeKind {
    Created,
    Deleted,
    Renamed,
    /// Only delivered to single-folder (grid) watches.
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsChange {
    pub kind: FsChangeKind,
    pub path: PathBuf,
}

impl FsChange {
    pub fn new(kind: FsChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Directory whose listing this change invalidates.
    pub fn affected_dir(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }
}

/// Work handed to the UI thread.
#[derive(Debug)]
pub enum UiTask {
    /// A watcher owned by `owner` saw a change. `generation` identifies which
    /// root the watcher pointed at when the event was produced.
    FsChanged {
        owner: PanelId,
        generation: u64,
        change: FsChange,
    },
    /// A category query issued by a remote-catalog panel finished.
    CategoryLoaded {
        owner: PanelId,
        category: usize,
        result: Result<Vec<RemoteRecord>>,
    },
    /// A search issued by a remote-catalog panel finished.
    SearchCompleted {
        owner: PanelId,
        search_id: u64,
        result: Result<Vec<RemoteRecord>>,
    },
}

impl UiTask {
    pub fn owner(&self) -> PanelId {
        match self {
            UiTask::FsChanged { owner, .. }
            | UiTask::CategoryLoaded { owner, .. }
            | UiTask::SearchCompleted { owner, .. } => *owner,
        }
    }
}

/// Cloneable, thread-safe producer side of the queue.
#[derive(Debug, Clone)]
pub struct TaskSender {
    tx: mpsc::UnboundedSender<UiTask>,
}

impl TaskSender {
    /// Enqueue a task. Returns false once the queue has been dropped.
    pub fn send(&self, task: UiTask) -> bool {
        self.tx.send(task).is_ok()
    }
}

/// Consumer side, owned by the UI thread.
#[derive(Debug)]
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<UiTask>,
    rx: mpsc::UnboundedReceiver<UiTask>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> TaskSender {
        TaskSender {
            tx: self.tx.clone(),
        }
    }

    /// Take everything queued so far without blocking.
    pub fn drain(&mut self) -> Vec<UiTask> {
        let mut tasks = Vec::new();
        while let Ok(task) = self.rx.try_recv() {
            tasks.push(task);
        }
        tasks
    }

    /// Wait for the next task. The queue holds its own sender, so this only
    /// resolves when a task arrives.
    pub async fn next(&mut self) -> Option<UiTask> {
        self.rx.recv().await
    }
}
