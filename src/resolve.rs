// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Property lookup across sharing and default links.
//!
//! Configuration nodes rarely hold everything themselves. A model's
//! firmware may `shares` the firmware of another model, a whitelabel model
//! takes most settings from its base model, and a model with a `default`
//! falls back to another model for anything it does not define. The
//! [`Resolver`] follows these links in a fixed order: the node itself, then
//! the node it shares with, then the default model.

use indexmap::IndexMap;
use log::trace;

use crate::schema::{DEFAULT_PROP, Schema};
use crate::tree::model::{Node, NodeId, PHANDLE_PROP, Property, PropertyValue};
use crate::validator::MODELS_PATH;

/// A structural property that is never merged.
const REG_PROP: &str = "reg";

/// Resolves nodes and properties of a validated configuration tree.
#[derive(Debug, Clone)]
pub struct Resolver {
    share_props: Vec<String>,
}

impl Resolver {
    /// Creates a resolver that shares through the phandle properties
    /// declared by `schema`.
    #[must_use]
    pub fn new(schema: &Schema) -> Self {
        Self::with_share_props(schema.phandle_props())
    }

    /// Creates a resolver that shares through the given properties, tried in
    /// order.
    #[must_use]
    pub fn with_share_props<I>(props: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let share_props: Vec<String> = props.into_iter().map(Into::into).collect();
        debug_assert!(
            !share_props.iter().any(|prop| prop == DEFAULT_PROP),
            "'{DEFAULT_PROP}' is not a share property"
        );
        Self { share_props }
    }

    /// Returns the properties used for sharing, in the order they are tried.
    #[must_use]
    pub fn share_props(&self) -> &[String] {
        &self.share_props
    }

    /// Returns the node referenced by the phandle property `prop_name` of
    /// `node`, or `None` if there is no such property.
    ///
    /// # Panics
    ///
    /// Panics if the property is not a phandle, or references no node. A
    /// validated tree never does.
    #[must_use]
    pub fn follow_phandle<'t>(&self, node: Node<'t>, prop_name: &str) -> Option<Node<'t>> {
        let prop = node.property(prop_name)?;
        let value = prop
            .as_u32()
            .unwrap_or_else(|| panic!("'{prop_name}' of {} is not a phandle", node.path()));
        let target = node.tree().phandle_target(value).unwrap_or_else(|| {
            panic!(
                "phandle {value} in '{prop_name}' of {} references no node",
                node.path()
            )
        });
        Some(target)
    }

    /// Returns the node `node` shares with: the target of the first share
    /// property present on it.
    #[must_use]
    pub fn follow_share<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        self.share_props
            .iter()
            .find_map(|prop| self.follow_phandle(node, prop))
    }

    /// Descends from `node` along `relative_path`.
    ///
    /// Empty segments are ignored, so `""` and `"/"` return `node` itself.
    /// Where a segment is not a child of the current node, it is looked up
    /// on the node the current node shares with.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cros_config::resolve::Resolver;
    /// # use cros_config::tree::model::{ConfigTree, Property, TreeNode};
    /// let root = TreeNode::builder("")
    ///     .child(
    ///         TreeNode::builder("base")
    ///             .property(Property::u32("phandle", 1))
    ///             .child(TreeNode::new("audio"))
    ///             .build(),
    ///     )
    ///     .child(
    ///         TreeNode::builder("variant")
    ///             .property(Property::u32("shares", 1))
    ///             .build(),
    ///     )
    ///     .build();
    /// let tree = ConfigTree::new(root).unwrap();
    /// let resolver = Resolver::with_share_props(["shares"]);
    ///
    /// let variant = tree.find_node("/variant").unwrap();
    /// let audio = resolver.path_node(variant, "audio").unwrap();
    /// assert_eq!(audio.path(), "/base/audio");
    /// assert_eq!(resolver.path_node(variant, "/"), Some(variant));
    /// ```
    #[must_use]
    pub fn path_node<'t>(&self, node: Node<'t>, relative_path: &str) -> Option<Node<'t>> {
        let mut current = node;
        for segment in relative_path.split('/').filter(|s| !s.is_empty()) {
            current = match current.child(segment) {
                Some(child) => child,
                None => self.follow_share(current)?.child(segment)?,
            };
        }
        Some(current)
    }

    /// Looks up the property `prop_name` of the node at `relative_path`
    /// below `node`.
    ///
    /// The lookup tries, in order: the property on the resolved node, the
    /// property on the node it shares with, and the same lookup starting
    /// from the node `node` shares with if the path could not be resolved.
    /// If all of that fails and `node` has a `default` model, the whole
    /// lookup is repeated from there.
    #[must_use]
    pub fn path_property<'t>(
        &self,
        node: Node<'t>,
        relative_path: &str,
        prop_name: &str,
    ) -> Option<&'t Property> {
        let mut visited = Vec::new();
        self.path_property_from(node, relative_path, prop_name, &mut visited)
    }

    fn path_property_from<'t>(
        &self,
        node: Node<'t>,
        relative_path: &str,
        prop_name: &str,
        visited: &mut Vec<NodeId>,
    ) -> Option<&'t Property> {
        visited.push(node.id());
        let target = self.path_node(node, relative_path).or_else(|| {
            self.follow_share(node)
                .and_then(|shared| self.path_node(shared, relative_path))
        });
        if let Some(target) = target {
            let found = target.property(prop_name).or_else(|| {
                self.follow_share(target)
                    .and_then(|shared| shared.property(prop_name))
            });
            if found.is_some() {
                return found;
            }
        }

        let default = self.follow_phandle(node, DEFAULT_PROP)?;
        if visited.contains(&default.id()) {
            trace!("default chain of {} loops at {}", node.path(), default.path());
            return None;
        }
        self.path_property_from(default, relative_path, prop_name, visited)
    }

    /// Returns the properties of `node` merged with those of the node its
    /// phandle property `phandle_prop` references.
    ///
    /// The result holds, in order: the node's own properties sorted by name
    /// (except `phandle_prop` and `reg`), then the referenced node's
    /// properties whose names do not end in `phandle`, then the properties
    /// found the same way at the same place below the default model of the
    /// model `node` belongs to. A name that is already present is never
    /// overwritten.
    #[must_use]
    pub fn merged_properties(
        &self,
        node: Node<'_>,
        phandle_prop: &str,
    ) -> IndexMap<String, PropertyValue> {
        let mut visited = Vec::new();
        self.merged_properties_from(node, phandle_prop, &mut visited)
    }

    fn merged_properties_from(
        &self,
        node: Node<'_>,
        phandle_prop: &str,
        visited: &mut Vec<NodeId>,
    ) -> IndexMap<String, PropertyValue> {
        let mut own: Vec<&Property> = node
            .properties()
            .filter(|prop| prop.name() != phandle_prop && prop.name() != REG_PROP)
            .collect();
        own.sort_by(|a, b| a.name().cmp(b.name()));
        let mut merged: IndexMap<String, PropertyValue> = own
            .into_iter()
            .map(|prop| (prop.name().to_owned(), prop.value().clone()))
            .collect();

        if let Some(linked) = self.follow_phandle(node, phandle_prop) {
            for prop in linked.properties() {
                if !prop.name().ends_with(PHANDLE_PROP) {
                    merged
                        .entry(prop.name().to_owned())
                        .or_insert_with(|| prop.value().clone());
                }
            }
        }

        let Some(model) = self.model_of(node) else {
            return merged;
        };
        visited.push(model.id());
        if let Some(default) = self.follow_phandle(model, DEFAULT_PROP)
            && !visited.contains(&default.id())
            && let Some(relative_path) = node.relative_path(model)
            && let Some(fallback) = self.path_node(default, &relative_path)
        {
            for (name, value) in self.merged_properties_from(fallback, phandle_prop, visited) {
                merged.entry(name).or_insert(value);
            }
        }
        merged
    }

    /// Returns the model `node` belongs to, which may be `node` itself.
    #[must_use]
    pub fn model_of<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        core::iter::once(node).chain(node.ancestors()).find(|candidate| {
            candidate
                .parent()
                .is_some_and(|parent| parent.path() == MODELS_PATH)
        })
    }
}
