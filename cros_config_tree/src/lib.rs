// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reading and navigating hardware configuration trees.
//!
//! A hardware configuration is stored as a flattened device tree (FDT) blob.
//! This crate provides two layers on top of that format:
//!
//! - A small, allocation-free reader for the blob itself, see [`fdt::Fdt`].
//! - An immutable, in-memory [`ConfigTree`](model::ConfigTree) that keeps
//!   nodes in an arena, records the parent of every node and indexes all
//!   nodes that can be the target of a phandle.
//!
//! The configuration tree is built once and only ever read afterwards, which
//! lets handles to its nodes be plain `Copy` values.
//!
//! # Examples
//!
//! ```
//! use cros_config_tree::model::{ConfigTree, Property, TreeNode};
//!
//! let root = TreeNode::builder("")
//!     .child(
//!         TreeNode::builder("chromeos")
//!             .child(
//!                 TreeNode::builder("models")
//!                     .child(
//!                         TreeNode::builder("reef")
//!                             .property(Property::u32("phandle", 1))
//!                             .property(Property::string("brand-code", "ABCD"))
//!                             .build(),
//!                     )
//!                     .build(),
//!             )
//!             .build(),
//!     )
//!     .build();
//! let tree = ConfigTree::new(root).unwrap();
//!
//! let reef = tree.find_node("/chromeos/models/reef").unwrap();
//! assert_eq!(reef.property("brand-code").unwrap().as_str(), Some("ABCD"));
//! assert_eq!(tree.phandle_target(1).unwrap().path(), "/chromeos/models/reef");
//! ```

#![no_std]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

extern crate alloc;

pub mod error;
pub mod fdt;
pub mod model;
