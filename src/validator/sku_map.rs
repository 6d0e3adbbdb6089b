// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::BTreeSet;

use super::ValidationContext;
use crate::error::ValidateError;
use crate::tree::model::{Node, Property};

/// The largest SKU id a device can report.
const MAX_SKU_ID: u32 = 0xffff;

/// Matches devices whose SKU id could not be read.
const ANY_SKU_ID: u32 = 0xffff_ffff;

const SKU_TARGETS: [&str; 2] = [
    "/chromeos/models/MODEL",
    "/chromeos/models/MODEL/submodels/SUBMODEL",
];

/// Checks a SKU map: a list of `<sku-id phandle>` pairs.
///
/// Every SKU id must be unique and fit in 16 bits, except for the catch-all
/// id `0xffffffff`. Every phandle must reference a model or a submodel.
///
/// # Errors
///
/// Returns an error if a problem is found under
/// [`Policy::FailFast`](super::Policy::FailFast).
pub fn validate_sku_map(
    ctx: &mut ValidationContext<'_>,
    node: Node<'_>,
    prop: &Property,
) -> Result<(), ValidateError> {
    let cells = match prop.as_cells() {
        Some(cells) if cells.len() % 2 == 0 => cells,
        _ => {
            return ctx.fail(
                node.path(),
                format!("'{}' must hold <sku-id phandle> pairs", prop.name()),
            );
        }
    };
    let tree = ctx.tree();
    let mut seen = BTreeSet::new();
    for pair in cells.chunks_exact(2) {
        let (sku_id, phandle) = (pair[0], pair[1]);
        if sku_id > MAX_SKU_ID && sku_id != ANY_SKU_ID {
            ctx.fail(node.path(), format!("sku_id {sku_id} out of range"))?;
        }
        if !seen.insert(sku_id) {
            ctx.fail(node.path(), format!("Duplicate sku_id {sku_id}"))?;
        }
        let targets_model = tree.phandle_target(phandle).is_some_and(|target| {
            SKU_TARGETS
                .iter()
                .any(|pattern| ctx.check_phandle_target(target, pattern))
        });
        if !targets_model {
            ctx.fail(
                node.path(),
                format!(
                    "Phandle '{}' sku-id {sku_id} must target a model or submodel",
                    prop.name()
                ),
            )?;
        }
    }
    Ok(())
}
