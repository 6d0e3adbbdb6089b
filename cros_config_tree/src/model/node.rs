// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::property::Property;
use super::{OrderedMap, ordered_map};
use alloc::{borrow::ToOwned, string::String};

/// An owned configuration node, used to assemble a tree before it is frozen
/// into a [`ConfigTree`](super::ConfigTree).
///
/// Children and properties are stored in insertion order. Adding a child or
/// property with a name that already exists replaces the previous one in
/// place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    name: String,
    properties: OrderedMap<String, Property>,
    children: OrderedMap<String, TreeNode>,
}

impl Default for TreeNode {
    fn default() -> Self {
        Self {
            name: String::new(),
            properties: ordered_map(),
            children: ordered_map(),
        }
    }
}

impl TreeNode {
    /// Creates a new [`TreeNode`] with the given name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cros_config_tree::model::TreeNode;
    /// let node = TreeNode::new("firmware");
    /// assert_eq!(node.name(), "firmware");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates a new [`TreeNodeBuilder`] with the given name.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TreeNodeBuilder {
        TreeNodeBuilder::new(name)
    }

    /// Returns the name of this node.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns an iterator over the properties of this node.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    /// Finds a property by its name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cros_config_tree::model::{Property, TreeNode};
    /// let mut node = TreeNode::new("firmware");
    /// node.add_property(Property::string("key-id", "REEF"));
    /// assert_eq!(node.property("key-id").unwrap().as_str(), Some("REEF"));
    /// ```
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Adds a property to this node.
    pub fn add_property(&mut self, property: Property) {
        self.properties.insert(property.name().to_owned(), property);
    }

    /// Returns an iterator over the children of this node.
    pub fn children(&self) -> impl Iterator<Item = &TreeNode> {
        self.children.values()
    }

    /// Finds a child by its name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.get(name)
    }

    /// Adds a child to this node.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cros_config_tree::model::TreeNode;
    /// let mut node = TreeNode::new("models");
    /// node.add_child(TreeNode::new("reef"));
    /// assert_eq!(node.child("reef").unwrap().name(), "reef");
    /// ```
    pub fn add_child(&mut self, child: TreeNode) {
        self.children.insert(child.name().to_owned(), child);
    }

    pub(super) fn into_parts(
        self,
    ) -> (
        String,
        OrderedMap<String, Property>,
        OrderedMap<String, TreeNode>,
    ) {
        (self.name, self.properties, self.children)
    }
}

/// A builder for creating [`TreeNode`]s.
#[derive(Debug, Default)]
pub struct TreeNodeBuilder {
    node: TreeNode,
}

impl TreeNodeBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            node: TreeNode::new(name),
        }
    }

    /// Adds a property to the node.
    #[must_use]
    pub fn property(mut self, property: Property) -> Self {
        self.node.add_property(property);
        self
    }

    /// Adds a child to the node.
    #[must_use]
    pub fn child(mut self, child: TreeNode) -> Self {
        self.node.add_child(child);
        self
    }

    /// Builds the `TreeNode`.
    #[must_use]
    pub fn build(self) -> TreeNode {
        self.node
    }
}
