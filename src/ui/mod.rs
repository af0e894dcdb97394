pub mod pane;

pub use pane::{
    GridPanel, Pane, PaneKind, PaneSpec, RemoteTreePanel, RootSpec, TreePanel, TreeRow,
};
