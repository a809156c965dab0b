//! The route tree: a path trie mapping static and parametrized URL segments
//! to registered items.

use std::collections::{BTreeMap, BTreeSet};

use estuary_core::reload;
use thiserror::Error;

/// Errors raised by route tree mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The path's terminal node already holds an item and no
    /// reload-replacement scope is active.
    #[error("route `{path}` is already registered")]
    Conflict {
        /// The conflicting path.
        path: String,
    },
    /// A removal walked a path that was never inserted.
    #[error("route `{path}` is not registered")]
    NotFound {
        /// The missing path.
        path: String,
    },
}

/// A successful match: the registered item plus the parameter values
/// captured in trie-walk order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched<T> {
    /// The registered item.
    pub item: T,
    /// Captured parametrized-segment values, in walk order.
    pub params: Vec<String>,
}

#[derive(Debug)]
struct Node<T> {
    literals: BTreeMap<String, Node<T>>,
    param: Option<Box<Node<T>>>,
    item: Option<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            literals: BTreeMap::new(),
            param: None,
            item: None,
        }
    }
}

/// A path trie over `/`-separated segments.
///
/// Empty segments are ignored, so `/a/b`, `a/b` and `a//b` address the same
/// node. A segment starting with `:` is parametrized: it occupies the
/// single parametrized child of its position, shared by every parameter
/// name declared there, and matches any one concrete segment. On lookup,
/// literal children are tried before the parametrized fallback, so
/// `/users/new` wins over `/users/:id`.
#[derive(Debug)]
pub struct RouteTree<T> {
    root: Node<T>,
    paths: BTreeSet<String>,
}

impl<T> Default for RouteTree<T> {
    fn default() -> Self {
        Self {
            root: Node::default(),
            paths: BTreeSet::new(),
        }
    }
}

impl<T> RouteTree<T> {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `item` at `path`, creating trie nodes on demand.
    ///
    /// # Errors
    ///
    /// Fails with [`RouteError::Conflict`] when the terminal node already
    /// holds an item — unless a reload-replacement scope is active, in
    /// which case the item is overwritten for live-reload ergonomics.
    pub fn insert(&mut self, path: &str, item: T) -> Result<(), RouteError> {
        let mut node = &mut self.root;
        for segment in segments(path) {
            node = if segment.starts_with(':') {
                node.param.get_or_insert_with(Box::default)
            } else {
                node.literals.entry(segment.to_owned()).or_default()
            };
        }
        if node.item.is_some() && !reload::replacement_active() {
            return Err(RouteError::Conflict {
                path: path.to_owned(),
            });
        }
        node.item = Some(item);
        self.paths.insert(path.to_owned());
        Ok(())
    }

    /// Matches a concrete path, trying literal children before the
    /// parametrized fallback at every step.
    ///
    /// Returns `None` when the walk leaves the trie or the terminal node
    /// holds no item — an unmatched path is not an error.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Matched<&T>> {
        let mut node = &self.root;
        let mut params = Vec::new();
        for segment in segments(path) {
            if let Some(next) = node.literals.get(segment) {
                node = next;
            } else {
                node = node.param.as_deref()?;
                params.push(segment.to_owned());
            }
        }
        node.item.as_ref().map(|item| Matched { item, params })
    }

    /// Removes and returns the item at `path`.
    ///
    /// Every step of the walk — including the parametrized fallback for
    /// `:`-segments — must already exist.
    ///
    /// # Errors
    ///
    /// Fails with [`RouteError::NotFound`] when a step is missing or the
    /// terminal node holds no item.
    pub fn remove(&mut self, path: &str) -> Result<T, RouteError> {
        let missing = || RouteError::NotFound {
            path: path.to_owned(),
        };
        let mut node = &mut self.root;
        for segment in segments(path) {
            node = if segment.starts_with(':') {
                node.param.as_deref_mut().ok_or_else(missing)?
            } else {
                node.literals.get_mut(segment).ok_or_else(missing)?
            };
        }
        let item = node.item.take().ok_or_else(missing)?;
        self.paths.remove(path);
        Ok(item)
    }

    /// Iterates the inserted path strings, independent of trie structure.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
