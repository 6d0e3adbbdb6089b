// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Validation of a configuration tree against a [`Schema`].
//!
//! The validator walks the configuration tree and the schema in lockstep.
//! Every node is matched against the subnode elements of its parent's
//! schema node, and every property against the property elements of its
//! own. Problems are collected as [`Diagnostic`]s; with
//! [`Policy::FailFast`] the first one ends the walk instead.

mod phandle;
mod sku_map;

pub use sku_map::validate_sku_map;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use indexmap::IndexMap;
use log::{debug, trace};
use regex::Regex;

use crate::diagnostics::Diagnostic;
use crate::error::ValidateError;
use crate::schema::{NodeDesc, NodeName, Pattern, PropDesc, PropKind, Schema};
use crate::tree::model::{ConfigTree, Node, PHANDLE_PROP, Property};

/// The path of the node holding all models.
pub const MODELS_PATH: &str = "/chromeos/models";

/// Properties the blob compiler adds on its own. They are never checked.
const STRUCTURAL_PROPS: [&str; 4] = ["linux,phandle", "reg", "#address-cells", "#size-cells"];

static SUBMODELS_PARENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/chromeos/models/([a-z0-9_-]+)/submodels$")
        .unwrap_or_else(|err| panic!("invalid submodel path pattern: {err}"))
});

/// What to do when a problem is found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Policy {
    /// Record the problem and keep going, so that one run reports
    /// everything.
    #[default]
    Accumulate,
    /// Stop at the first problem and return it as
    /// [`ValidateError::Violation`].
    FailFast,
}

/// Validates configuration trees against a schema.
///
/// A validator holds no per-run state and can validate any number of trees.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'s> {
    schema: &'s Schema,
    policy: Policy,
}

impl<'s> Validator<'s> {
    /// Creates a validator that accumulates all problems.
    #[must_use]
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            policy: Policy::Accumulate,
        }
    }

    /// Sets what to do when a problem is found.
    #[must_use]
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the schema trees are validated against.
    #[must_use]
    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Validates `tree` and returns the problems found, in tree order.
    ///
    /// # Errors
    ///
    /// Returns [`ValidateError::Violation`] for the first problem under
    /// [`Policy::FailFast`], and an error under either policy if the schema
    /// itself is inconsistent.
    pub fn validate(&self, tree: &ConfigTree) -> Result<Vec<Diagnostic>, ValidateError> {
        let mut ctx = ValidationContext::new(tree, self.policy);
        debug!(
            "validating {} nodes, {} models",
            tree.len(),
            ctx.models.len()
        );
        let root = tree.root();
        let mut chain = vec![self.schema.root()];
        ctx.validate_node(root, &chain)?;
        ctx.validate_children(root, &mut chain)?;
        Ok(ctx.into_diagnostics())
    }
}

/// The state of one validation run.
///
/// Custom validators receive the context to look up models and to report
/// problems with [`ValidationContext::fail`].
#[derive(Debug)]
pub struct ValidationContext<'t> {
    tree: &'t ConfigTree,
    policy: Policy,
    models: BTreeSet<String>,
    submodels: BTreeMap<String, BTreeSet<String>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'t> ValidationContext<'t> {
    /// Creates a context for `tree`, collecting its models and submodels.
    #[must_use]
    pub fn new(tree: &'t ConfigTree, policy: Policy) -> Self {
        let mut models = BTreeSet::new();
        let mut submodels = BTreeMap::new();
        for model in tree.find_node(MODELS_PATH).into_iter().flat_map(|node| node.children()) {
            models.insert(model.name().to_owned());
            let names: BTreeSet<String> = model
                .child("submodels")
                .into_iter()
                .flat_map(|node| node.children())
                .map(|submodel| submodel.name().to_owned())
                .collect();
            submodels.insert(model.name().to_owned(), names);
        }
        Self {
            tree,
            policy,
            models,
            submodels,
            diagnostics: Vec::new(),
        }
    }

    /// Returns the tree being validated.
    #[must_use]
    pub fn tree(&self) -> &'t ConfigTree {
        self.tree
    }

    /// Returns whether `name` is a model.
    #[must_use]
    pub fn is_model(&self, name: &str) -> bool {
        self.models.contains(name)
    }

    /// Returns the names of all models.
    #[must_use]
    pub fn models(&self) -> &BTreeSet<String> {
        &self.models
    }

    /// Returns the names of the submodels of `model`.
    #[must_use]
    pub fn submodels(&self, model: &str) -> Option<&BTreeSet<String>> {
        self.submodels.get(model)
    }

    /// Returns the problems found so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consumes the context, returning the problems found.
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Reports a problem on the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns the problem as [`ValidateError::Violation`] under
    /// [`Policy::FailFast`].
    pub fn fail(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), ValidateError> {
        let diagnostic = Diagnostic::new(path, message);
        debug!("{diagnostic}");
        match self.policy {
            Policy::Accumulate => {
                self.diagnostics.push(diagnostic);
                Ok(())
            }
            Policy::FailFast => Err(ValidateError::Violation(diagnostic)),
        }
    }

    fn validate_children(
        &mut self,
        node: Node<'t>,
        chain: &mut Vec<&NodeDesc>,
    ) -> Result<(), ValidateError> {
        for child in node.children() {
            let Some(schema) = self.find_node_schema(chain, node, child.name())? else {
                let valid = present_names(chain, node, |desc| desc.nodes_iter().map(NodeDesc::name))?;
                self.fail(
                    node.path(),
                    format!(
                        "Unexpected subnode '{}', valid list is ({})",
                        child.name(),
                        valid.join(", ")
                    ),
                )?;
                continue;
            };
            trace!("{} matches schema node '{}'", child.path(), schema.name());
            chain.push(schema);
            self.validate_node(child, chain)?;
            self.validate_children(child, chain)?;
            chain.pop();
        }
        Ok(())
    }

    fn validate_node(&mut self, node: Node<'t>, chain: &[&NodeDesc]) -> Result<(), ValidateError> {
        let schema = current(chain);
        if let NodeName::Any(pattern) = schema.kind()
            && !pattern.is_match(node.name())
        {
            self.fail(
                node.path(),
                format!(
                    "Node name '{}' does not match pattern '{pattern}'",
                    node.name()
                ),
            )?;
        }

        for prop in node.properties() {
            if STRUCTURAL_PROPS.contains(&prop.name()) {
                continue;
            }
            match find_prop_schema(chain, node, prop.name())? {
                Some(desc) => self.validate_property(desc, node, prop)?,
                None if prop.name() == PHANDLE_PROP => {
                    self.fail(node.path(), "phandle target not valid for this node")?;
                }
                None => {
                    let valid = present_names(chain, node, |desc| desc.props_iter().map(PropDesc::name))?;
                    self.fail(
                        node.path(),
                        format!(
                            "Unexpected property '{}', valid list is ({})",
                            prop.name(),
                            valid.join(", ")
                        ),
                    )?;
                }
            }
        }

        for desc in schema.props_iter() {
            if desc.is_required()
                && node.property(desc.name()).is_none()
                && element_present(desc.conditions(), chain, node)?
            {
                self.fail(
                    node.path(),
                    format!("Required property '{}' missing", desc.name()),
                )?;
            }
        }

        for desc in schema.nodes_iter() {
            let NodeName::Literal(name) = desc.kind() else {
                continue;
            };
            if desc.is_required()
                && node.child(name).is_none()
                && element_present(desc.conditions(), chain, node)?
            {
                let children: Vec<&str> = node.children().map(|child| child.name()).collect();
                let message = if children.is_empty() {
                    format!("Missing subnode '{name}'")
                } else {
                    format!("Missing subnode '{name}' in {}", children.join(", "))
                };
                self.fail(node.path(), message)?;
            }
        }
        Ok(())
    }

    fn validate_property(
        &mut self,
        desc: &PropDesc,
        node: Node<'t>,
        prop: &Property,
    ) -> Result<(), ValidateError> {
        match desc.kind() {
            PropKind::String { pattern } | PropKind::File { pattern, .. } => match prop.as_str() {
                Some(value) => self.check_pattern(node, prop, value, pattern.as_ref()),
                None => self.fail(
                    node.path(),
                    format!("'{}' value must be a string", prop.name()),
                ),
            },
            PropKind::StringList { pattern } => match prop.as_str_list() {
                Some(values) => {
                    for value in values {
                        self.check_pattern(node, prop, value, pattern.as_ref())?;
                    }
                    Ok(())
                }
                None => self.fail(
                    node.path(),
                    format!("'{}' value must be a string list", prop.name()),
                ),
            },
            PropKind::Bool if prop.is_flag() => Ok(()),
            PropKind::Bool => self.fail(
                node.path(),
                format!("'{}' must be a presence-only boolean", prop.name()),
            ),
            PropKind::Float { range } => self.check_float(node, prop, *range),
            PropKind::Phandle { target } => self.check_phandle(node, prop, target),
            PropKind::PhandleTarget | PropKind::Any(None) => Ok(()),
            PropKind::Custom(validator) | PropKind::Any(Some(validator)) => {
                validator(self, node, prop)
            }
        }
    }

    fn check_pattern(
        &mut self,
        node: Node<'t>,
        prop: &Property,
        value: &str,
        pattern: Option<&Pattern>,
    ) -> Result<(), ValidateError> {
        match pattern {
            Some(pattern) if !pattern.is_match(value) => self.fail(
                node.path(),
                format!(
                    "'{}' value '{value}' does not match pattern '{pattern}'",
                    prop.name()
                ),
            ),
            _ => Ok(()),
        }
    }

    fn check_float(
        &mut self,
        node: Node<'t>,
        prop: &Property,
        range: Option<(f64, f64)>,
    ) -> Result<(), ValidateError> {
        let text = prop.as_str().unwrap_or_default();
        let Ok(value) = text.parse::<f64>() else {
            return self.fail(
                node.path(),
                format!("'{}' value '{text}' must be a float", prop.name()),
            );
        };
        match range {
            Some((min, max)) if !(min..=max).contains(&value) => self.fail(
                node.path(),
                format!(
                    "'{}' value '{text}' is out of range [{min}..{max}]",
                    prop.name()
                ),
            ),
            _ => Ok(()),
        }
    }

    fn check_phandle(
        &mut self,
        node: Node<'t>,
        prop: &Property,
        pattern: &str,
    ) -> Result<(), ValidateError> {
        let Some(value) = prop.as_u32() else {
            return self.fail(
                node.path(),
                format!("Phandle '{}' must be a single cell", prop.name()),
            );
        };
        let tree = self.tree;
        match tree.phandle_target(value) {
            None => self.fail(
                node.path(),
                format!(
                    "Phandle '{}' value {value} does not reference any node",
                    prop.name()
                ),
            ),
            Some(target) if !self.check_phandle_target(target, pattern) => self.fail(
                node.path(),
                format!(
                    "Phandle '{}' targets node '{}' which does not match pattern '{pattern}'",
                    prop.name(),
                    target.path()
                ),
            ),
            Some(_) => Ok(()),
        }
    }

    /// Finds the schema for the child `name` of `parent`, among the subnode
    /// elements of the innermost schema node that are present.
    ///
    /// A literal name wins over `MODEL`, which wins over `SUBMODEL`, which
    /// wins over `ANY`.
    fn find_node_schema<'s>(
        &self,
        chain: &[&'s NodeDesc],
        parent: Node<'t>,
        name: &str,
    ) -> Result<Option<&'s NodeDesc>, ValidateError> {
        let mut candidates = Vec::new();
        for desc in current(chain).nodes_iter() {
            if element_present(desc.conditions(), chain, parent)? {
                candidates.push(desc);
            }
        }
        let find = |wanted: fn(&NodeName) -> bool| candidates.iter().copied().find(|desc| wanted(desc.kind()));

        if let Some(desc) = candidates
            .iter()
            .copied()
            .find(|desc| matches!(desc.kind(), NodeName::Literal(literal) if literal == name))
        {
            return Ok(Some(desc));
        }
        if self.is_model(name)
            && let Some(desc) = find(|kind| matches!(kind, NodeName::Model))
        {
            return Ok(Some(desc));
        }
        if self.is_submodel_of_parent(parent, name)
            && let Some(desc) = find(|kind| matches!(kind, NodeName::Submodel))
        {
            return Ok(Some(desc));
        }
        Ok(find(|kind| matches!(kind, NodeName::Any(_))))
    }

    fn is_submodel_of_parent(&self, parent: Node<'t>, name: &str) -> bool {
        SUBMODELS_PARENT
            .captures(&parent.path())
            .and_then(|captures| self.submodels.get(&captures[1]))
            .is_some_and(|submodels| submodels.contains(name))
    }
}

fn current<'s>(chain: &[&'s NodeDesc]) -> &'s NodeDesc {
    chain
        .last()
        .copied()
        .unwrap_or_else(|| unreachable!("the schema chain always holds the root"))
}

/// Finds the schema for the property `name` of `node`: an element with that
/// name if one is present, otherwise a present catch-all.
fn find_prop_schema<'s>(
    chain: &[&'s NodeDesc],
    node: Node<'_>,
    name: &str,
) -> Result<Option<&'s PropDesc>, ValidateError> {
    let mut any = None;
    for desc in current(chain).props_iter() {
        let matches_name = desc.name() == name;
        let is_any = matches!(desc.kind(), PropKind::Any(_));
        if !matches_name && !is_any {
            continue;
        }
        if !element_present(desc.conditions(), chain, node)? {
            continue;
        }
        if matches_name && !is_any {
            return Ok(Some(desc));
        }
        any = any.or(Some(desc));
    }
    Ok(any)
}

/// Returns the names of the elements of the innermost schema node that are
/// present on `node`, as selected by `names`.
fn present_names<'s, I>(
    chain: &[&'s NodeDesc],
    node: Node<'_>,
    names: impl Fn(&'s NodeDesc) -> I,
) -> Result<Vec<&'s str>, ValidateError>
where
    I: Iterator<Item = &'s str>,
{
    let schema = current(chain);
    let mut valid = Vec::new();
    for name in names(schema) {
        let present = match schema.element(name) {
            Some(element) => element_present(element.conditions(), chain, node)?,
            None => true,
        };
        if present {
            valid.push(name);
        }
    }
    Ok(valid)
}

/// Evaluates the conditional-presence rules of an element of the innermost
/// schema node, against the config node `node` that schema node describes.
///
/// Each rule names a sibling element, optionally prefixed with `../` once
/// per level to climb. The element is present only if every named sibling
/// is present or absent as the rule requires.
fn element_present(
    conditions: &IndexMap<String, bool>,
    chain: &[&NodeDesc],
    node: Node<'_>,
) -> Result<bool, ValidateError> {
    for (condition, &expected) in conditions {
        let mut name = condition.as_str();
        let mut depth = chain.len() - 1;
        let mut target = node;
        while let Some(rest) = name.strip_prefix("../") {
            let (Some(up), Some(parent)) = (depth.checked_sub(1), target.parent()) else {
                return Err(ValidateError::ConditionAboveRoot {
                    condition: condition.clone(),
                    path: node.path(),
                });
            };
            depth = up;
            target = parent;
            name = rest;
        }
        let schema = chain[depth];
        if schema.element(name).is_none() {
            return Err(ValidateError::UnknownCondition {
                condition: condition.clone(),
                schema_node: schema.name().to_owned(),
            });
        }
        if target.has_entry(name) != expected {
            return Ok(false);
        }
    }
    Ok(true)
}
