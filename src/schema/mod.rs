// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Declarative description of what a configuration tree may contain.
//!
//! A schema is a tree of [`NodeDesc`]s, parallel in shape to the
//! configuration tree it describes. Every node description lists the
//! properties ([`PropDesc`]) and subnodes it allows. Elements may be
//! required, and may be gated on the presence or absence of a sibling
//! element, see [`PropDesc::conditional`].
//!
//! # Examples
//!
//! ```
//! use cros_config::schema::{NodeDesc, PropDesc, Schema};
//!
//! let schema = Schema::new(
//!     NodeDesc::new("/").node(
//!         NodeDesc::new("firmware")
//!             .prop(PropDesc::phandle("shares", "/chromeos/family/firmware/MODEL"))
//!             .prop(
//!                 PropDesc::file("bcs-overlay")
//!                     .required()
//!                     .conditional("shares", false),
//!             ),
//!     ),
//! );
//! assert!(schema.phandle_props().contains("shares"));
//! ```

pub mod chromeos;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::ValidateError;
use crate::tree::model::{Node, Property};
use crate::validator::ValidationContext;

/// The phandle property that links a model to the model it falls back to.
/// It is not used for sharing.
pub const DEFAULT_PROP: &str = "default";

/// Checks a property whose rules cannot be expressed declaratively.
pub type CustomValidator =
    fn(&mut ValidationContext<'_>, Node<'_>, &Property) -> Result<(), ValidateError>;

/// A regular expression that has to match a whole value.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles `source`, anchored at both ends.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` is not a valid regular expression.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cros_config::schema::Pattern;
    /// let pattern = Pattern::new("[A-Z]{4}").unwrap();
    /// assert!(pattern.is_match("ABCD"));
    /// assert!(!pattern.is_match("ABCDE"));
    /// ```
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_owned(),
            regex: Regex::new(&format!("^(?:{source})$"))?,
        })
    }

    /// Returns the pattern as written, without the anchors.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns whether the whole of `value` matches.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn compile(source: &str) -> Pattern {
    Pattern::new(source).unwrap_or_else(|err| panic!("invalid schema pattern `{source}`: {err}"))
}

/// Whether an element must appear and when it is allowed to.
#[derive(Debug, Clone, Default)]
struct Presence {
    required: bool,
    conditions: IndexMap<String, bool>,
}

/// The type of a property and the checks that apply to its value.
#[derive(Debug, Clone)]
pub enum PropKind {
    /// A single string.
    String {
        /// The pattern the value has to match.
        pattern: Option<Pattern>,
    },
    /// A list of strings.
    StringList {
        /// The pattern every string has to match.
        pattern: Option<Pattern>,
    },
    /// A presence-only flag.
    Bool,
    /// A floating point number, written as a string.
    Float {
        /// The inclusive range the value has to be in.
        range: Option<(f64, f64)>,
    },
    /// The name of a file that is installed on the device.
    File {
        /// The pattern the value has to match.
        pattern: Option<Pattern>,
        /// Where the file is installed.
        target_dir: Option<PathBuf>,
    },
    /// A reference to another node, whose path has to match `target`.
    ///
    /// `target` is a `/`-separated path in which a segment may be `ANY`,
    /// `MODEL` or `SUBMODEL`.
    Phandle {
        /// The path pattern the referenced node has to match.
        target: String,
    },
    /// The structural `phandle` property of a node other nodes may reference.
    PhandleTarget,
    /// A property checked by a function.
    Custom(CustomValidator),
    /// Any property not otherwise described, optionally checked by a
    /// function.
    Any(Option<CustomValidator>),
}

/// Describes one property.
#[derive(Debug, Clone)]
pub struct PropDesc {
    name: String,
    kind: PropKind,
    presence: Presence,
}

impl PropDesc {
    fn with_kind(name: impl Into<String>, kind: PropKind) -> Self {
        Self {
            name: name.into(),
            kind,
            presence: Presence::default(),
        }
    }

    /// A string property.
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::with_kind(name, PropKind::String { pattern: None })
    }

    /// A string-list property.
    #[must_use]
    pub fn string_list(name: impl Into<String>) -> Self {
        Self::with_kind(name, PropKind::StringList { pattern: None })
    }

    /// A presence-only property.
    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::with_kind(name, PropKind::Bool)
    }

    /// A floating point property.
    #[must_use]
    pub fn float(name: impl Into<String>) -> Self {
        Self::with_kind(name, PropKind::Float { range: None })
    }

    /// A property naming a file that is installed on the device.
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            PropKind::File {
                pattern: None,
                target_dir: None,
            },
        )
    }

    /// A phandle property whose target has to match `target`.
    #[must_use]
    pub fn phandle(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            PropKind::Phandle {
                target: target.into(),
            },
        )
    }

    /// The `phandle` property itself, allowing the node to be referenced.
    #[must_use]
    pub fn phandle_target() -> Self {
        Self::with_kind(crate::tree::model::PHANDLE_PROP, PropKind::PhandleTarget)
    }

    /// A property checked by `validator`.
    #[must_use]
    pub fn custom(name: impl Into<String>, validator: CustomValidator) -> Self {
        Self::with_kind(name, PropKind::Custom(validator))
    }

    /// Matches every property that no other element of the node describes.
    #[must_use]
    pub fn any() -> Self {
        Self::with_kind("ANY", PropKind::Any(None))
    }

    /// Like [`PropDesc::any`], with each matched property checked by
    /// `validator`.
    #[must_use]
    pub fn any_with(validator: CustomValidator) -> Self {
        Self::with_kind("ANY", PropKind::Any(Some(validator)))
    }

    /// Marks the property as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.presence.required = true;
        self
    }

    /// Allows the property only if the sibling element `name` is present
    /// (`present == true`) or absent (`present == false`).
    ///
    /// A `../` prefix looks the sibling up on the parent node instead, and
    /// may be repeated. Multiple conditions must all hold.
    #[must_use]
    pub fn conditional(mut self, name: impl Into<String>, present: bool) -> Self {
        self.presence.conditions.insert(name.into(), present);
        self
    }

    /// Sets the pattern string values have to match.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression, or if the
    /// property does not hold strings.
    #[must_use]
    pub fn pattern(mut self, pattern: &str) -> Self {
        let compiled = compile(pattern);
        match &mut self.kind {
            PropKind::String { pattern }
            | PropKind::StringList { pattern }
            | PropKind::File { pattern, .. } => *pattern = Some(compiled),
            kind => panic!("property '{}' of kind {kind:?} has no pattern", self.name),
        }
        self
    }

    /// Sets the inclusive range of a float property.
    ///
    /// # Panics
    ///
    /// Panics if the property is not a float.
    #[must_use]
    pub fn range(mut self, min: f64, max: f64) -> Self {
        match &mut self.kind {
            PropKind::Float { range } => *range = Some((min, max)),
            kind => panic!("property '{}' of kind {kind:?} has no range", self.name),
        }
        self
    }

    /// Sets the directory a file property is installed to.
    ///
    /// # Panics
    ///
    /// Panics if the property is not a file.
    #[must_use]
    pub fn target_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        match &mut self.kind {
            PropKind::File { target_dir, .. } => *target_dir = Some(dir.into()),
            kind => panic!("property '{}' of kind {kind:?} has no target directory", self.name),
        }
        self
    }

    /// Returns the name of the property, or `ANY` for a catch-all.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the type of the property.
    #[must_use]
    pub fn kind(&self) -> &PropKind {
        &self.kind
    }

    /// Returns whether the property is required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.presence.required
    }

    /// Returns the conditional-presence rules, keyed by sibling name.
    #[must_use]
    pub fn conditions(&self) -> &IndexMap<String, bool> {
        &self.presence.conditions
    }
}

/// How a [`NodeDesc`] is matched against node names.
#[derive(Debug, Clone)]
pub enum NodeName {
    /// Matches exactly this name.
    Literal(String),
    /// Matches any node. A name that does not match the pattern is
    /// reported.
    Any(Pattern),
    /// Matches the name of any model.
    Model,
    /// Matches the name of any submodel of the enclosing model.
    Submodel,
}

/// Describes one node: the properties and subnodes it may contain.
#[derive(Debug, Clone)]
pub struct NodeDesc {
    name: NodeName,
    presence: Presence,
    elements: Vec<SchemaElement>,
}

impl NodeDesc {
    fn with_name(name: NodeName) -> Self {
        Self {
            name,
            presence: Presence::default(),
            elements: Vec::new(),
        }
    }

    /// A node with a fixed name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_name(NodeName::Literal(name.into()))
    }

    /// A node with any name, which has to match `pattern`.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression.
    #[must_use]
    pub fn any(pattern: &str) -> Self {
        Self::with_name(NodeName::Any(compile(pattern)))
    }

    /// A node named after a model.
    #[must_use]
    pub fn model() -> Self {
        Self::with_name(NodeName::Model)
    }

    /// A node named after a submodel of the enclosing model.
    #[must_use]
    pub fn submodel() -> Self {
        Self::with_name(NodeName::Submodel)
    }

    /// Marks the node as required. Only nodes with a fixed name can be
    /// required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.presence.required = true;
        self
    }

    /// See [`PropDesc::conditional`].
    #[must_use]
    pub fn conditional(mut self, name: impl Into<String>, present: bool) -> Self {
        self.presence.conditions.insert(name.into(), present);
        self
    }

    /// Adds a property description.
    #[must_use]
    pub fn prop(mut self, prop: PropDesc) -> Self {
        self.elements.push(SchemaElement::Prop(prop));
        self
    }

    /// Adds several property descriptions.
    #[must_use]
    pub fn props(mut self, props: impl IntoIterator<Item = PropDesc>) -> Self {
        self.elements
            .extend(props.into_iter().map(SchemaElement::Prop));
        self
    }

    /// Adds a subnode description.
    #[must_use]
    pub fn node(mut self, node: NodeDesc) -> Self {
        self.elements.push(SchemaElement::Node(node));
        self
    }

    /// Returns the name of the node: the fixed name, or `ANY`, `MODEL` or
    /// `SUBMODEL` for wildcards.
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.name {
            NodeName::Literal(name) => name,
            NodeName::Any(_) => "ANY",
            NodeName::Model => "MODEL",
            NodeName::Submodel => "SUBMODEL",
        }
    }

    /// Returns how the node is matched.
    #[must_use]
    pub fn kind(&self) -> &NodeName {
        &self.name
    }

    /// Returns whether the node is required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.presence.required
    }

    /// Returns the conditional-presence rules, keyed by sibling name.
    #[must_use]
    pub fn conditions(&self) -> &IndexMap<String, bool> {
        &self.presence.conditions
    }

    /// Returns all elements, in declaration order.
    #[must_use]
    pub fn elements(&self) -> &[SchemaElement] {
        &self.elements
    }

    /// Returns the property elements, in declaration order.
    pub fn props_iter(&self) -> impl Iterator<Item = &PropDesc> {
        self.elements.iter().filter_map(|element| match element {
            SchemaElement::Prop(prop) => Some(prop),
            SchemaElement::Node(_) => None,
        })
    }

    /// Returns the subnode elements, in declaration order.
    pub fn nodes_iter(&self) -> impl Iterator<Item = &NodeDesc> {
        self.elements.iter().filter_map(|element| match element {
            SchemaElement::Node(node) => Some(node),
            SchemaElement::Prop(_) => None,
        })
    }

    /// Finds an element by its name, as returned by [`SchemaElement::name`].
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&SchemaElement> {
        self.elements.iter().find(|element| element.name() == name)
    }
}

/// An element of a [`NodeDesc`].
#[derive(Debug, Clone)]
pub enum SchemaElement {
    /// A property.
    Prop(PropDesc),
    /// A subnode.
    Node(NodeDesc),
}

impl SchemaElement {
    /// Returns the name of the element.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Prop(prop) => prop.name(),
            Self::Node(node) => node.name(),
        }
    }

    /// Returns whether the element is required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        match self {
            Self::Prop(prop) => prop.is_required(),
            Self::Node(node) => node.is_required(),
        }
    }

    /// Returns the conditional-presence rules of the element.
    #[must_use]
    pub fn conditions(&self) -> &IndexMap<String, bool> {
        match self {
            Self::Prop(prop) => prop.conditions(),
            Self::Node(node) => node.conditions(),
        }
    }
}

/// A complete schema, rooted at the description of the root node.
#[derive(Debug)]
pub struct Schema {
    root: NodeDesc,
    target_dirs: OnceLock<BTreeMap<String, PathBuf>>,
    phandle_props: OnceLock<BTreeSet<String>>,
}

impl Schema {
    /// Creates a schema from the description of the root node.
    #[must_use]
    pub fn new(root: NodeDesc) -> Self {
        Self {
            root,
            target_dirs: OnceLock::new(),
            phandle_props: OnceLock::new(),
        }
    }

    /// Returns the description of the root node.
    #[must_use]
    pub fn root(&self) -> &NodeDesc {
        &self.root
    }

    /// Returns where each file property is installed, keyed by property
    /// name. If the same name is declared with several directories, the
    /// first one in schema order wins.
    pub fn target_directories(&self) -> &BTreeMap<String, PathBuf> {
        self.target_dirs.get_or_init(|| {
            let mut dirs = BTreeMap::new();
            visit_props(&self.root, &mut |prop| {
                if let PropKind::File {
                    target_dir: Some(dir),
                    ..
                } = prop.kind()
                {
                    dirs.entry(prop.name().to_owned())
                        .or_insert_with(|| dir.clone());
                }
            });
            dirs
        })
    }

    /// Returns the directory the file property `name` is installed to.
    #[must_use]
    pub fn target_directory(&self, name: &str) -> Option<&Path> {
        self.target_directories().get(name).map(PathBuf::as_path)
    }

    /// Returns the names of all phandle properties used for sharing, which
    /// is every phandle property except [`DEFAULT_PROP`].
    pub fn phandle_props(&self) -> &BTreeSet<String> {
        self.phandle_props.get_or_init(|| {
            let mut props = BTreeSet::new();
            visit_props(&self.root, &mut |prop| {
                if matches!(prop.kind(), PropKind::Phandle { .. }) && prop.name() != DEFAULT_PROP {
                    props.insert(prop.name().to_owned());
                }
            });
            props
        })
    }
}

fn visit_props<'a>(node: &'a NodeDesc, visit: &mut impl FnMut(&'a PropDesc)) {
    for element in node.elements() {
        match element {
            SchemaElement::Prop(prop) => visit(prop),
            SchemaElement::Node(child) => visit_props(child, visit),
        }
    }
}
