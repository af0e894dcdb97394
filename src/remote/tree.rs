//! Remote catalog tree: category nodes and a single live search node, each
//! backed by an asynchronous query.
//!
//! Nodes here only track state. Issuing the query and delivering its result
//! back to the UI thread is the coordinator's job; nodes say whether a query
//! is needed ([`LoadTrigger`]) and absorb the result when it arrives.

use crate::assets::IconHint;
use crate::config::{CatalogConfig, CategorySpec};
use crate::error::Result;
use crate::remote::catalog::RemoteRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
}

/// Outcome of asking a category to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTrigger {
    /// Caller must run this filter expression and report back.
    Query(String),
    /// A query is already in flight; nothing to do.
    AlreadyLoading,
    /// Results are cached; replay them instead of querying.
    Cached,
}

#[derive(Debug, Clone)]
pub struct RemoteCategoryNode {
    type_filter: String,
    display_name: String,
    state: LoadState,
    cached: Vec<RemoteRecord>,
}

impl RemoteCategoryNode {
    pub fn new(spec: &CategorySpec) -> Self {
        Self {
            type_filter: spec.type_filter.clone(),
            display_name: spec.display_name.clone(),
            state: LoadState::NotLoaded,
            cached: Vec::new(),
        }
    }

    pub fn type_filter(&self) -> &str {
        &self.type_filter
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    pub fn results(&self) -> &[RemoteRecord] {
        &self.cached
    }

    /// Selection or expansion. At most one query is ever in flight.
    pub fn trigger(&mut self) -> LoadTrigger {
        match self.state {
            LoadState::Loading => LoadTrigger::AlreadyLoading,
            LoadState::Loaded => LoadTrigger::Cached,
            LoadState::NotLoaded => {
                self.state = LoadState::Loading;
                LoadTrigger::Query(self.type_filter.clone())
            }
        }
    }

    /// Forced refresh: drop the loaded flag, then load again.
    pub fn refresh(&mut self) -> LoadTrigger {
        if self.state == LoadState::Loaded {
            self.state = LoadState::NotLoaded;
        }
        self.trigger()
    }

    /// Absorb a finished query. Failures return to `NotLoaded` and keep
    /// whatever was cached before.
    pub fn complete(&mut self, result: Result<Vec<RemoteRecord>>) -> Result<&[RemoteRecord]> {
        match result {
            Ok(records) => {
                self.cached = records;
                self.state = LoadState::Loaded;
                Ok(&self.cached)
            }
            Err(e) => {
                self.state = LoadState::NotLoaded;
                Err(e)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteSearchResultNode {
    id: u64,
    query: String,
    state: LoadState,
    results: Vec<RemoteRecord>,
}

impl RemoteSearchResultNode {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn results(&self) -> &[RemoteRecord] {
        &self.results
    }

    pub fn display_name(&self) -> String {
        match self.state {
            LoadState::Loading => format!("Searching \"{}\"...", self.query),
            _ => format!("Search: \"{}\" ({})", self.query, self.results.len()),
        }
    }
}

/// A catalog tree node, dispatched by variant.
#[derive(Debug, Clone, Copy)]
pub enum RemoteNode<'a> {
    Category(&'a RemoteCategoryNode),
    SearchResult(&'a RemoteSearchResultNode),
    Package(&'a RemoteRecord),
}

impl<'a> RemoteNode<'a> {
    pub fn display_name(&self) -> String {
        match self {
            RemoteNode::Category(c) => c.display_name().to_string(),
            RemoteNode::SearchResult(s) => s.display_name(),
            RemoteNode::Package(p) => p.title.clone(),
        }
    }

    /// Unloaded categories report children so they can be expanded.
    pub fn has_children(&self) -> bool {
        match self {
            RemoteNode::Category(c) => !c.is_loaded() || !c.results().is_empty(),
            RemoteNode::SearchResult(s) => !s.results().is_empty(),
            RemoteNode::Package(_) => false,
        }
    }

    pub fn children(&self) -> Vec<RemoteNode<'a>> {
        let records: &'a [RemoteRecord] = match self {
            RemoteNode::Category(c) => c.results(),
            RemoteNode::SearchResult(s) => s.results(),
            RemoteNode::Package(_) => &[],
        };
        records.iter().map(RemoteNode::Package).collect()
    }

    pub fn is_loading(&self) -> bool {
        match self {
            RemoteNode::Category(c) => c.is_loading(),
            RemoteNode::SearchResult(s) => s.state() == LoadState::Loading,
            RemoteNode::Package(_) => false,
        }
    }

    pub fn icon(&self) -> IconHint {
        match self {
            RemoteNode::Category(_) => IconHint {
                icon: "category",
                color: "blue",
            },
            RemoteNode::SearchResult(_) => IconHint {
                icon: "search",
                color: "blue",
            },
            RemoteNode::Package(p) => IconHint::for_package(&p.package_type),
        }
    }

    /// Case-insensitive title match on the node or any loaded child.
    pub fn matches_filter(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        if needle.is_empty() || self.display_name().to_lowercase().contains(&needle) {
            return true;
        }
        self.children()
            .iter()
            .any(|child| child.display_name().to_lowercase().contains(&needle))
    }
}

/// Categories from configuration plus at most one live search node.
#[derive(Debug, Clone)]
pub struct RemoteCatalogTree {
    categories: Vec<RemoteCategoryNode>,
    search: Option<RemoteSearchResultNode>,
    next_search_id: u64,
}

impl RemoteCatalogTree {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            categories: config.categories.iter().map(RemoteCategoryNode::new).collect(),
            search: None,
            next_search_id: 1,
        }
    }

    pub fn categories(&self) -> &[RemoteCategoryNode] {
        &self.categories
    }

    pub fn category(&self, index: usize) -> Option<&RemoteCategoryNode> {
        self.categories.get(index)
    }

    pub fn category_mut(&mut self, index: usize) -> Option<&mut RemoteCategoryNode> {
        self.categories.get_mut(index)
    }

    pub fn search(&self) -> Option<&RemoteSearchResultNode> {
        self.search.as_ref()
    }

    /// Replace any previous search node. Searches always execute.
    pub fn begin_search(&mut self, query: &str) -> u64 {
        let id = self.next_search_id;
        self.next_search_id += 1;
        self.search = Some(RemoteSearchResultNode {
            id,
            query: query.to_string(),
            state: LoadState::Loading,
            results: Vec::new(),
        });
        id
    }

    /// Absorb a finished search. Returns `None` when the search was
    /// superseded or cleared in the meantime.
    pub fn complete_search(
        &mut self,
        id: u64,
        result: Result<Vec<RemoteRecord>>,
    ) -> Option<Result<&[RemoteRecord]>> {
        let node = self.search.as_mut().filter(|s| s.id == id)?;
        Some(match result {
            Ok(records) => {
                node.results = records;
                node.state = LoadState::Loaded;
                Ok(&node.results)
            }
            Err(e) => {
                node.state = LoadState::NotLoaded;
                Err(e)
            }
        })
    }

    pub fn clear_search(&mut self) {
        self.search = None;
    }

    /// Top-level nodes: the search node first, then categories.
    pub fn nodes(&self) -> Vec<RemoteNode<'_>> {
        self.search
            .iter()
            .map(RemoteNode::SearchResult)
            .chain(self.categories.iter().map(RemoteNode::Category))
            .collect()
    }
}
