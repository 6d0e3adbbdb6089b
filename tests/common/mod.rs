// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A small but complete family configuration shared by the integration
//! tests.
//!
//! Phandles:
//!
//! | value | node                                        |
//! |-------|---------------------------------------------|
//! | 1     | /chromeos/family/audio/bxt                  |
//! | 2     | /chromeos/family/firmware/reef              |
//! | 3     | /chromeos/family/touch/elan                 |
//! | 4     | /chromeos/models/reef                       |
//! | 5     | /chromeos/models/reef/submodels/touch       |
//! | 6     | /chromeos/models/reef/submodels/notouch     |
//! | 7     | /chromeos/models/pyro                       |
//! | 8     | /chromeos/models/caroline                   |
//! | 9     | /chromeos/models/electro                    |

#![allow(dead_code)]

use cros_config::tree::model::{ConfigTree, Property, TreeNode};

pub const BXT_AUDIO: u32 = 1;
pub const REEF_FIRMWARE: u32 = 2;
pub const ELAN_TOUCH: u32 = 3;
pub const REEF: u32 = 4;
pub const REEF_TOUCH: u32 = 5;
pub const REEF_NOTOUCH: u32 = 6;
pub const PYRO: u32 = 7;
pub const CAROLINE: u32 = 8;
pub const ELECTRO: u32 = 9;

/// A configuration that can be edited before it is frozen.
pub struct Config {
    pub family: TreeNode,
    pub models: Vec<TreeNode>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            family: family(),
            models: vec![reef(), pyro(), caroline(), electro()],
        }
    }
}

impl Config {
    /// Returns the model named `name`.
    pub fn model_mut(&mut self, name: &str) -> &mut TreeNode {
        self.models
            .iter_mut()
            .find(|model| model.name() == name)
            .unwrap()
    }

    pub fn build(self) -> ConfigTree {
        let mut models = TreeNode::new("models");
        for model in self.models {
            models.add_child(model);
        }
        let root = TreeNode::builder("")
            .child(
                TreeNode::builder("chromeos")
                    .child(self.family)
                    .child(models)
                    .build(),
            )
            .build();
        ConfigTree::new(root).unwrap()
    }
}

/// Returns the valid configuration.
pub fn config() -> ConfigTree {
    Config::default().build()
}

pub fn family() -> TreeNode {
    TreeNode::builder("family")
        .child(
            TreeNode::builder("audio")
                .child(
                    TreeNode::builder("bxt")
                        .property(Property::u32("phandle", BXT_AUDIO))
                        .property(Property::string("card", "bxtda7219max"))
                        .property(Property::string("volume", "cras-config/{cras-config-dir}/{card}"))
                        .property(Property::string("dsp-ini", "cras-config/{cras-config-dir}/dsp.ini"))
                        .property(Property::string("hifi-conf", "ucm-config/{card}.{ucm-suffix}/HiFi.conf"))
                        .property(Property::string("alsa-conf", "ucm-config/{card}.{ucm-suffix}/{card}.{ucm-suffix}.conf"))
                        .build(),
                )
                .build(),
        )
        .child(
            TreeNode::builder("firmware")
                .property(Property::string("script", "updater4.sh"))
                .child(
                    TreeNode::builder("reef")
                        .property(Property::u32("phandle", REEF_FIRMWARE))
                        .property(Property::string("bcs-overlay", "overlay-reef-private"))
                        .property(Property::string("main-image", "bcs://Reef.9042.87.1.tbz2"))
                        .property(Property::string("ec-image", "bcs://Reef_EC.9042.87.1.tbz2"))
                        .child(
                            TreeNode::builder("build-targets")
                                .property(Property::string("coreboot", "reef"))
                                .property(Property::string("ec", "reef"))
                                .property(Property::string("depthcharge", "reef"))
                                .property(Property::string("libpayload", "reef"))
                                .build(),
                        )
                        .build(),
                )
                .build(),
        )
        .child(TreeNode::builder("mapping").child(sku_map(&[(0, PYRO), (4, REEF), (8, REEF_TOUCH), (9, CAROLINE)])).build())
        .child(
            TreeNode::builder("touch")
                .child(
                    TreeNode::builder("elan")
                        .property(Property::u32("phandle", ELAN_TOUCH))
                        .property(Property::string("vendor", "elan"))
                        .property(Property::string("firmware-bin", "{vendor}/{pid}_{version}.bin"))
                        .property(Property::string("firmware-symlink", "{vendor}ts_i2c_{pid}.bin"))
                        .build(),
                )
                .build(),
        )
        .build()
}

/// A `sku-map` node mapping each SKU id to a phandle.
pub fn sku_map(entries: &[(u32, u32)]) -> TreeNode {
    let cells: Vec<u32> = entries.iter().flat_map(|&(sku_id, phandle)| [sku_id, phandle]).collect();
    TreeNode::builder("sku-map")
        .property(Property::string("platform-name", "Reef"))
        .property(Property::cells("simple-sku-map", &cells))
        .build()
}

fn main_audio(cras_config_dir: &str) -> TreeNode {
    TreeNode::builder("audio")
        .child(
            TreeNode::builder("main")
                .property(Property::u32("audio-type", BXT_AUDIO))
                .property(Property::string("cras-config-dir", cras_config_dir))
                .property(Property::string("ucm-suffix", cras_config_dir))
                .build(),
        )
        .build()
}

fn touch(present: &str) -> TreeNode {
    TreeNode::builder("touch")
        .property(Property::string("present", present))
        .build()
}

pub fn reef() -> TreeNode {
    TreeNode::builder("reef")
        .property(Property::u32("phandle", REEF))
        .property(Property::string("brand-code", "ACBB"))
        .property(Property::string("powerd-prefs", "reef"))
        .child(main_audio("reef"))
        .child(
            TreeNode::builder("firmware")
                .property(Property::u32("shares", REEF_FIRMWARE))
                .property(Property::string("key-id", "REEF"))
                .build(),
        )
        .child(
            TreeNode::builder("power")
                .property(Property::string("low-battery-shutdown-percent", "4.0"))
                .property(Property::string("power-supply-full-factor", "0.97"))
                .build(),
        )
        .child(
            TreeNode::builder("submodels")
                .child(
                    TreeNode::builder("touch")
                        .property(Property::u32("phandle", REEF_TOUCH))
                        .child(touch("yes"))
                        .build(),
                )
                .child(
                    TreeNode::builder("notouch")
                        .property(Property::u32("phandle", REEF_NOTOUCH))
                        .child(touch("no"))
                        .build(),
                )
                .build(),
        )
        .child(
            TreeNode::builder("thermal")
                .property(Property::string("dptf-dv", "reef/dptf.dv"))
                .build(),
        )
        .child(
            TreeNode::builder("touch")
                .property(Property::string("present", "probe"))
                .child(
                    TreeNode::builder("stylus")
                        .property(Property::u32("touch-type", ELAN_TOUCH))
                        .property(Property::string("pid", "3224"))
                        .property(Property::string("version", "5.0"))
                        .property(Property::string("probe-regex", "[Ss]tylus"))
                        .build(),
                )
                .build(),
        )
        .build()
}

pub fn pyro() -> TreeNode {
    TreeNode::builder("pyro")
        .property(Property::u32("phandle", PYRO))
        .property(Property::string("brand-code", "ACBC"))
        .child(main_audio("pyro"))
        .child(
            TreeNode::builder("firmware")
                .property(Property::string("key-id", "PYRO"))
                .property(Property::string("bcs-overlay", "overlay-pyro-private"))
                .property(Property::string("main-image", "bcs://Pyro.9042.87.1.tbz2"))
                .property(Property::strings("extra", &["${FILESDIR}/extra", "pyro.bin"]))
                .child(
                    TreeNode::builder("build-targets")
                        .property(Property::string("coreboot", "pyro"))
                        .property(Property::string("depthcharge", "pyro"))
                        .build(),
                )
                .build(),
        )
        .build()
}

/// A whitelabel of reef.
pub fn caroline() -> TreeNode {
    TreeNode::builder("caroline")
        .property(Property::u32("phandle", CAROLINE))
        .property(Property::u32("whitelabel", REEF))
        .property(Property::string("brand-code", "ACBD"))
        .property(Property::string("wallpaper", "caroline_2"))
        .build()
}

/// A model that falls back to reef for anything it does not define.
pub fn electro() -> TreeNode {
    TreeNode::builder("electro")
        .property(Property::u32("phandle", ELECTRO))
        .property(Property::u32("default", REEF))
        .property(Property::string("brand-code", "ACBE"))
        .child(
            TreeNode::builder("audio")
                .child(
                    TreeNode::builder("main")
                        .property(Property::u32("audio-type", BXT_AUDIO))
                        .property(Property::string("cras-config-dir", "electro"))
                        .build(),
                )
                .build(),
        )
        .child(
            TreeNode::builder("power")
                .property(Property::string("low-battery-shutdown-percent", "5.5"))
                .build(),
        )
        .build()
}
