// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An immutable, in-memory representation of a configuration tree.
//!
//! Trees are assembled from owned [`TreeNode`]s (either by hand or by the
//! [`Fdt`] reader) and then frozen into a [`ConfigTree`]. The frozen tree
//! stores its nodes in an arena: every node knows its parent by index, which
//! gives cheap upward navigation without reference cycles, and every node
//! carrying a `phandle` property is indexed by that value.

use alloc::{
    borrow::ToOwned,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt;

use indexmap::IndexMap;
use twox_hash::xxhash64;

use crate::error::TreeError;
use crate::fdt::Fdt;

mod node;
mod property;
pub use node::{TreeNode, TreeNodeBuilder};
pub use property::{Property, PropertyValue};

/// The name of the property that makes a node a phandle target.
pub const PHANDLE_PROP: &str = "phandle";

pub(crate) type OrderedMap<K, V> = IndexMap<K, V, xxhash64::State>;

pub(crate) fn ordered_map<K, V>() -> OrderedMap<K, V> {
    IndexMap::with_hasher(xxhash64::State::with_seed(0xdead_cafe))
}

/// A stable index of a node inside a [`ConfigTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    parent: Option<NodeId>,
    properties: OrderedMap<String, Property>,
    children: OrderedMap<String, NodeId>,
}

/// A frozen configuration tree.
///
/// # Examples
///
/// ```
/// # use cros_config_tree::model::{ConfigTree, TreeNode};
/// let root = TreeNode::builder("")
///     .child(TreeNode::builder("chromeos").build())
///     .build();
/// let tree = ConfigTree::new(root).unwrap();
/// let chromeos = tree.find_node("/chromeos").unwrap();
/// assert_eq!(chromeos.parent(), Some(tree.root()));
/// ```
#[derive(Debug, Clone)]
pub struct ConfigTree {
    nodes: Vec<NodeData>,
    phandles: OrderedMap<u32, NodeId>,
}

impl ConfigTree {
    /// Freezes the given root node and all of its descendants.
    ///
    /// # Errors
    ///
    /// Returns an error if a `phandle` property is zero or not a single cell,
    /// or if two nodes share a phandle value.
    pub fn new(root: TreeNode) -> Result<Self, TreeError> {
        let mut tree = Self {
            nodes: Vec::new(),
            phandles: ordered_map(),
        };
        tree.insert(root, None)?;
        Ok(tree)
    }

    /// Reads the blob and freezes its node tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob structure cannot be read, or for any of
    /// the reasons listed in [`ConfigTree::new`].
    pub fn from_fdt(fdt: &Fdt<'_>) -> Result<Self, TreeError> {
        Self::new(fdt.to_tree_node()?)
    }

    fn insert(&mut self, node: TreeNode, parent: Option<NodeId>) -> Result<NodeId, TreeError> {
        let id = NodeId(self.nodes.len());
        let (name, properties, children) = node.into_parts();
        let phandle = properties.get(PHANDLE_PROP).map(Property::as_u32);
        self.nodes.push(NodeData {
            name,
            parent,
            properties,
            children: ordered_map(),
        });

        match phandle {
            None => {}
            Some(None | Some(0)) => {
                return Err(TreeError::InvalidPhandle {
                    path: self.node(id).path(),
                });
            }
            Some(Some(value)) => {
                if let Some(&first) = self.phandles.get(&value) {
                    return Err(TreeError::DuplicatePhandle {
                        phandle: value,
                        first: self.node(first).path(),
                        second: self.node(id).path(),
                    });
                }
                self.phandles.insert(value, id);
            }
        }

        for child in children.into_values() {
            let child_name = child.name().to_owned();
            let child_id = self.insert(child, Some(id))?;
            self.nodes[id.0].children.insert(child_name, child_id);
        }
        Ok(id)
    }

    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        self.node(NodeId(0))
    }

    /// Returns a handle to the node with the given id.
    ///
    /// # Panics
    ///
    /// Panics if the id was not produced by this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Node<'_> {
        assert!(id.0 < self.nodes.len(), "{id:?} does not belong to this tree");
        Node { tree: self, id }
    }

    /// Finds a node by its absolute path.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cros_config_tree::model::{ConfigTree, TreeNode};
    /// let root = TreeNode::builder("")
    ///     .child(TreeNode::builder("a").child(TreeNode::new("b")).build())
    ///     .build();
    /// let tree = ConfigTree::new(root).unwrap();
    /// assert_eq!(tree.find_node("/a/b").unwrap().name(), "b");
    /// assert_eq!(tree.find_node("/").unwrap(), tree.root());
    /// assert!(tree.find_node("/a/c").is_none());
    /// assert!(tree.find_node("a").is_none());
    /// ```
    #[must_use]
    pub fn find_node(&self, path: &str) -> Option<Node<'_>> {
        if !path.starts_with('/') {
            return None;
        }
        let mut current_node = self.root();
        for component in path.split('/').filter(|s| !s.is_empty()) {
            current_node = current_node.child(component)?;
        }
        Some(current_node)
    }

    /// Returns the node registered under the given phandle value.
    #[must_use]
    pub fn phandle_target(&self, phandle: u32) -> Option<Node<'_>> {
        self.phandles.get(&phandle).map(|&id| self.node(id))
    }

    /// Returns an iterator over all registered phandles and their nodes, in
    /// tree order.
    pub fn phandles(&self) -> impl Iterator<Item = (u32, Node<'_>)> {
        self.phandles.iter().map(|(&value, &id)| (value, self.node(id)))
    }

    /// Returns the number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the tree is empty. A frozen tree always has a root, so
    /// this is always `false`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A handle to a node of a [`ConfigTree`].
#[derive(Clone, Copy)]
pub struct Node<'a> {
    tree: &'a ConfigTree,
    id: NodeId,
}

impl<'a> Node<'a> {
    fn data(&self) -> &'a NodeData {
        &self.tree.nodes[self.id.0]
    }

    /// Returns the arena index of this node.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the tree this node belongs to.
    #[must_use]
    pub fn tree(&self) -> &'a ConfigTree {
        self.tree
    }

    /// Returns the name of this node. The root node has an empty name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    /// Returns whether this is the root node.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.data().parent.is_none()
    }

    /// Returns the parent of this node, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Node<'a>> {
        self.data().parent.map(|id| self.tree.node(id))
    }

    /// Finds a direct child by its name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<Node<'a>> {
        self.data().children.get(name).map(|&id| self.tree.node(id))
    }

    /// Returns an iterator over the children of this node, in insertion
    /// order.
    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + use<'a> {
        let tree = self.tree;
        self.data().children.values().map(move |&id| tree.node(id))
    }

    /// Finds a property by its name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&'a Property> {
        self.data().properties.get(name)
    }

    /// Returns an iterator over the properties of this node, in insertion
    /// order.
    pub fn properties(&self) -> impl Iterator<Item = &'a Property> + use<'a> {
        self.data().properties.values()
    }

    /// Returns whether this node has a property or a child with the given
    /// name.
    #[must_use]
    pub fn has_entry(&self, name: &str) -> bool {
        let data = self.data();
        data.properties.contains_key(name) || data.children.contains_key(name)
    }

    /// Returns this node's own phandle value, if it is a phandle target.
    #[must_use]
    pub fn phandle(&self) -> Option<u32> {
        self.property(PHANDLE_PROP).and_then(Property::as_u32)
    }

    /// Returns an iterator over the ancestors of this node, starting with its
    /// parent and ending with the root.
    pub fn ancestors(&self) -> impl Iterator<Item = Node<'a>> + use<'a> {
        core::iter::successors(self.parent(), Node::parent)
    }

    /// Returns the absolute path of this node. The root is `/`.
    #[must_use]
    pub fn path(&self) -> String {
        if self.is_root() {
            return "/".to_string();
        }
        let mut names: Vec<&str> = core::iter::once(*self)
            .chain(self.ancestors())
            .filter(|node| !node.is_root())
            .map(|node| node.name())
            .collect();
        names.reverse();
        let mut path = String::new();
        for name in names {
            path.push('/');
            path.push_str(name);
        }
        path
    }

    /// Returns the path of this node relative to `ancestor`, without a
    /// leading slash, or `None` if `ancestor` is not this node or one of its
    /// ancestors.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cros_config_tree::model::{ConfigTree, TreeNode};
    /// let root = TreeNode::builder("")
    ///     .child(TreeNode::builder("a").child(TreeNode::new("b")).build())
    ///     .build();
    /// let tree = ConfigTree::new(root).unwrap();
    /// let a = tree.find_node("/a").unwrap();
    /// let b = tree.find_node("/a/b").unwrap();
    /// assert_eq!(b.relative_path(a).as_deref(), Some("b"));
    /// assert_eq!(a.relative_path(a).as_deref(), Some(""));
    /// assert_eq!(a.relative_path(b), None);
    /// ```
    #[must_use]
    pub fn relative_path(&self, ancestor: Node<'a>) -> Option<String> {
        let mut names = Vec::new();
        let mut current = *self;
        while current != ancestor {
            names.push(current.name());
            current = current.parent()?;
        }
        names.reverse();
        Some(names.join("/"))
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("path", &self.path())
            .finish()
    }
}
