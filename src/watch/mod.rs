//! Live filesystem change delivery.

pub mod watcher;

pub use watcher::{classify, ChangeWatcher, WatchMode};
