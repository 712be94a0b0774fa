//! Location Tree
//!
//! Registry of currently mounted location contexts. Nodes reference their
//! parent by location id, forming a forest. The tree checks that every
//! root-to-node path of `Type:id` segments is unique: two mounted regions
//! producing the same nested ids could not be told apart once their events
//! reach the collector.

use std::collections::HashSet;
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::{debug, error};
use uuid::Uuid;

use crate::context::Context;
use crate::error::LocationTreeError;
use crate::location::path::append_segment;

/// A mounted location context, identified by a per-mount location id.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationNode {
    location_id: String,
    context: Context,
}

impl LocationNode {
    /// New node with a freshly generated location id.
    pub fn new(context: Context) -> Self {
        Self::with_location_id(Uuid::new_v4().to_string(), context)
    }

    pub fn with_location_id(location_id: impl Into<String>, context: Context) -> Self {
        Self {
            location_id: location_id.into(),
            context,
        }
    }

    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

#[derive(Debug, Clone)]
struct TreeEntry {
    node: LocationNode,
    parent_location_id: Option<String>,
}

/// Forest of mounted location nodes with collision detection
#[derive(Debug, Default)]
pub struct LocationTree {
    entries: Vec<TreeEntry>,
    /// Collision paths already reported
    error_cache: HashSet<String>,
}

static GLOBAL_TREE: OnceLock<Mutex<LocationTree>> = OnceLock::new();

impl LocationTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide tree shared by every producer.
    pub fn global() -> &'static Mutex<LocationTree> {
        GLOBAL_TREE.get_or_init(|| Mutex::new(LocationTree::new()))
    }

    /// Mount `node` under `parent` (or as a root), then re-validate.
    ///
    /// Fails only when the declared parent is not mounted. Re-adding a node
    /// with an already mounted location id replaces the previous entry.
    pub fn add(
        &mut self,
        node: LocationNode,
        parent: Option<&LocationNode>,
    ) -> Result<(), LocationTreeError> {
        if let Some(parent) = parent {
            if !self.contains(parent.location_id()) {
                return Err(LocationTreeError::ParentNotFound {
                    parent: parent.context().path_segment(),
                    child: node.context().path_segment(),
                });
            }
        }

        let parent_location_id = parent.map(|p| p.location_id().to_string());
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|entry| entry.node.location_id == node.location_id)
        {
            debug!(location_id = %node.location_id, "Replacing mounted location node");
            existing.node = node;
            existing.parent_location_id = parent_location_id;
        } else {
            self.entries.push(TreeEntry {
                node,
                parent_location_id,
            });
        }

        self.validate();
        Ok(())
    }

    /// Unmount `node` and every descendant left without a parent.
    ///
    /// Returns how many entries were removed.
    pub fn remove(&mut self, node: &LocationNode) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|entry| entry.node.location_id != node.location_id);

        loop {
            let mounted: HashSet<String> = self
                .entries
                .iter()
                .map(|entry| entry.node.location_id.clone())
                .collect();
            let count = self.entries.len();
            self.entries.retain(|entry| match &entry.parent_location_id {
                Some(parent) => mounted.contains(parent),
                None => true,
            });
            if self.entries.len() == count {
                break;
            }
        }

        let removed = before - self.entries.len();
        debug!(
            location_id = %node.location_id,
            removed,
            "Removed location node"
        );
        removed
    }

    /// Walk every root depth-first and report path collisions.
    ///
    /// Each colliding path is logged once for the lifetime of the tree;
    /// returns the collisions newly reported by this call.
    pub fn validate(&mut self) -> Vec<String> {
        let collisions = {
            let mut seen_paths = HashSet::new();
            let mut visited = HashSet::new();
            let mut collisions = Vec::new();
            for root in self.roots() {
                self.walk(
                    root,
                    String::new(),
                    &mut seen_paths,
                    &mut visited,
                    &mut collisions,
                );
            }
            collisions
        };

        let mut reported = Vec::new();
        for path in collisions {
            if self.error_cache.insert(path.clone()) {
                error!(location_path = %path, "Location collision detected: {}", path);
                reported.push(path);
            }
        }
        reported
    }

    fn walk<'a>(
        &'a self,
        node: &'a LocationNode,
        parent_path: String,
        seen_paths: &mut HashSet<String>,
        visited: &mut HashSet<&'a str>,
        collisions: &mut Vec<String>,
    ) {
        if !visited.insert(node.location_id()) {
            return;
        }
        let path = append_segment(&parent_path, node.context());
        if !seen_paths.insert(path.clone()) {
            collisions.push(path.clone());
        }
        for child in self.children(node) {
            self.walk(child, path.clone(), seen_paths, visited, collisions);
        }
    }

    pub fn roots(&self) -> Vec<&LocationNode> {
        self.entries
            .iter()
            .filter(|entry| entry.parent_location_id.is_none())
            .map(|entry| &entry.node)
            .collect()
    }

    pub fn children(&self, node: &LocationNode) -> Vec<&LocationNode> {
        self.entries
            .iter()
            .filter(|entry| entry.parent_location_id.as_deref() == Some(node.location_id()))
            .map(|entry| &entry.node)
            .collect()
    }

    pub fn contains(&self, location_id: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.node.location_id == location_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collision paths reported so far.
    pub fn reported_collisions(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.error_cache.iter().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Drop every node and forget reported collisions.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.error_cache.clear();
    }

    /// Dump the tree at debug level, one line per node.
    pub fn log(&self) {
        for root in self.roots() {
            self.log_node(root, 0);
        }
    }

    fn log_node(&self, node: &LocationNode, depth: usize) {
        debug!(
            "{}{} [{}]",
            "  ".repeat(depth),
            node.context().path_segment(),
            node.location_id()
        );
        for child in self.children(node) {
            self.log_node(child, depth + 1);
        }
    }
}
