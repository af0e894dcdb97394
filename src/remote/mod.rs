// Remote package catalog: the query seam and the category/search tree built
// on top of it.

pub mod catalog;
pub mod tree;

pub use catalog::{CatalogQuery, RemoteRecord, StaticCatalog};
pub use tree::{
    LoadState, LoadTrigger, RemoteCatalogTree, RemoteCategoryNode, RemoteNode,
    RemoteSearchResultNode,
};
