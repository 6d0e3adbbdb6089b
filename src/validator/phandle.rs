// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::ValidationContext;
use crate::tree::model::Node;

impl ValidationContext<'_> {
    /// Returns whether the path of `target` matches `pattern`.
    ///
    /// Both are split on `/` and compared segment by segment. A pattern
    /// segment of `ANY` matches anything, `MODEL` matches the name of a
    /// model, and `SUBMODEL` matches the name of a submodel of the model
    /// matched by an earlier `MODEL` segment. Any other segment has to be
    /// equal.
    #[must_use]
    pub fn check_phandle_target(&self, target: Node<'_>, pattern: &str) -> bool {
        let path = target.path();
        let expected: Vec<&str> = pattern.split('/').collect();
        let actual: Vec<&str> = path.split('/').collect();
        if expected.len() != actual.len() {
            return false;
        }
        let mut model = None;
        for (&segment, &name) in expected.iter().zip(&actual) {
            let matches = match segment {
                "ANY" => true,
                "MODEL" => {
                    model = Some(name);
                    self.is_model(name)
                }
                "SUBMODEL" => model
                    .and_then(|model| self.submodels(model))
                    .is_some_and(|submodels| submodels.contains(name)),
                literal => literal == name,
            };
            if !matches {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::Policy;
    use super::*;
    use crate::tree::model::{ConfigTree, Property, TreeNode};

    fn tree() -> ConfigTree {
        let reef = TreeNode::builder("reef")
            .property(Property::u32("phandle", 1))
            .child(
                TreeNode::builder("submodels")
                    .child(TreeNode::new("touch"))
                    .child(TreeNode::new("notouch"))
                    .build(),
            )
            .build();
        let firmware = TreeNode::builder("firmware")
            .child(
                TreeNode::builder("reef")
                    .child(TreeNode::new("build-targets"))
                    .build(),
            )
            .build();
        ConfigTree::new(
            TreeNode::builder("")
                .child(
                    TreeNode::builder("chromeos")
                        .child(TreeNode::builder("family").child(firmware).build())
                        .child(
                            TreeNode::builder("models")
                                .child(reef)
                                .child(TreeNode::new("pyro"))
                                .build(),
                        )
                        .build(),
                )
                .build(),
        )
        .unwrap()
    }

    fn check(tree: &ConfigTree, path: &str, pattern: &str) -> bool {
        let ctx = ValidationContext::new(tree, Policy::Accumulate);
        ctx.check_phandle_target(tree.find_node(path).unwrap(), pattern)
    }

    #[test]
    fn models() {
        let tree = tree();
        assert!(check(&tree, "/chromeos/models/reef", "/chromeos/models/MODEL"));
        assert!(check(&tree, "/chromeos/models/pyro", "/chromeos/models/MODEL"));
        assert!(!check(&tree, "/chromeos/models/reef", "/chromeos/models/ANY/x"));
        assert!(check(
            &tree,
            "/chromeos/family/firmware/reef",
            "/chromeos/family/firmware/MODEL"
        ));
    }

    #[test]
    fn submodels() {
        let tree = tree();
        assert!(check(
            &tree,
            "/chromeos/models/reef/submodels/touch",
            "/chromeos/models/MODEL/submodels/SUBMODEL"
        ));
        assert!(!check(
            &tree,
            "/chromeos/models/reef/submodels/touch",
            "/chromeos/models/ANY/submodels/SUBMODEL"
        ));
    }

    #[test]
    fn segment_count_must_match() {
        let tree = tree();
        assert!(!check(
            &tree,
            "/chromeos/family/firmware/reef/build-targets",
            "/chromeos/family/firmware/ANY"
        ));
        assert!(check(
            &tree,
            "/chromeos/family/firmware/reef/build-targets",
            "/chromeos/family/firmware/ANY/ANY"
        ));
    }

    #[test]
    fn literal_segments() {
        let tree = tree();
        assert!(check(&tree, "/chromeos/family", "/chromeos/family"));
        assert!(!check(&tree, "/chromeos/family", "/chromeos/models"));
        assert!(!check(&tree, "/chromeos/family", "/chromeos/MODEL"));
    }
}
