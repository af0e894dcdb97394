// Lazily materialized tree mirroring a filesystem subtree.
//
// Folders scan their directory on first access and rescan after being marked
// dirty. Mutations go through `ops`, which dirties instead of patching.

pub mod node;
pub mod ops;

pub use node::{ChildState, FileNode, FolderNode, TreeNode};
pub use ops::{DropEffect, NewAsset};
