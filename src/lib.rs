// Library module for assetdex
// Re-exports modules for use in integration tests and the CLI

pub mod app;
pub mod assets;
pub mod config;
pub mod error;
pub mod events;
pub mod fs;
pub mod grid;
pub mod logging;
pub mod remote;
pub mod tree;
pub mod ui;
pub mod watch;

pub use app::Coordinator;
pub use error::{IndexError, Result};
