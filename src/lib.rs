// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Schema validation and property resolution for ChromeOS hardware
//! configuration trees.
//!
//! A configuration tree describes every hardware variant ("model") of a
//! product family. This crate checks such a tree against a declarative
//! [`Schema`](schema::Schema) with the [`Validator`](validator::Validator),
//! and answers property lookups that follow `shares`, `whitelabel` and
//! `default` links with the [`Resolver`](resolve::Resolver).
//!
//! # Examples
//!
//! ```
//! use cros_config::schema::chromeos;
//! use cros_config::tree::model::{ConfigTree, Property, TreeNode};
//! use cros_config::validator::Validator;
//!
//! let root = TreeNode::builder("")
//!     .child(
//!         TreeNode::builder("chromeos")
//!             .child(TreeNode::new("family"))
//!             .child(
//!                 TreeNode::builder("models")
//!                     .child(
//!                         TreeNode::builder("reef")
//!                             .property(Property::string("brand-code", "reef"))
//!                             .build(),
//!                     )
//!                     .build(),
//!             )
//!             .build(),
//!     )
//!     .build();
//! let tree = ConfigTree::new(root).unwrap();
//!
//! let diagnostics = Validator::new(chromeos::schema()).validate(&tree).unwrap();
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(
//!     diagnostics[0].to_string(),
//!     "/chromeos/models/reef: 'brand-code' value 'reef' does not match pattern '[A-Z]{4}'"
//! );
//! ```

pub mod compile;
pub mod diagnostics;
pub mod error;
pub mod resolve;
pub mod schema;
pub mod validator;

pub use cros_config_tree as tree;
