// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The schema for ChromeOS family configurations.
//!
//! A family configuration lives under `/chromeos`. The `family` node holds
//! what all models share (audio cards, firmware builds, SKU mapping, touch
//! firmware) and `models` holds one node per hardware variant.

use std::sync::LazyLock;

use super::{NodeDesc, PropDesc, Schema};
use crate::validator::validate_sku_map;

/// Pattern for phandles that reference a model.
pub const MODEL_TARGET: &str = "/chromeos/models/MODEL";

const BCS_OVERLAY: &str = r"overlay-[a-z0-9_-]+-private";
const BCS_IMAGE: &str = r"bcs://.*\.tbz2";
const IDENTIFIER: &str = r"[a-z0-9_-]+";

static SCHEMA: LazyLock<Schema> = LazyLock::new(|| Schema::new(root()));

/// Returns the built-in schema.
pub fn schema() -> &'static Schema {
    &SCHEMA
}

fn root() -> NodeDesc {
    NodeDesc::new("/").node(
        NodeDesc::new("chromeos")
            .required()
            .node(family())
            .node(NodeDesc::new("models").required().node(model()))
            .node(NodeDesc::new("schema").node(NodeDesc::new("target-dirs").prop(PropDesc::any()))),
    )
}

fn family() -> NodeDesc {
    NodeDesc::new("family")
        .required()
        .node(
            NodeDesc::new("audio").node(
                NodeDesc::any("[a-z][a-z0-9-]*")
                    .prop(PropDesc::phandle_target())
                    .prop(PropDesc::string("card").required())
                    .prop(PropDesc::file("volume").required().target_dir("/etc/cras"))
                    .prop(PropDesc::file("dsp-ini").required().target_dir("/etc/cras"))
                    .prop(
                        PropDesc::file("hifi-conf")
                            .required()
                            .target_dir("/usr/share/alsa/ucm"),
                    )
                    .prop(
                        PropDesc::file("alsa-conf")
                            .required()
                            .target_dir("/usr/share/alsa/ucm"),
                    )
                    .prop(PropDesc::file("topology-bin").target_dir("/lib/firmware")),
            ),
        )
        .node(
            NodeDesc::new("firmware")
                .prop(PropDesc::file("script").required().pattern(r"updater4\.sh"))
                .node(
                    NodeDesc::model()
                        .prop(PropDesc::phandle_target())
                        .prop(PropDesc::file("bcs-overlay").required().pattern(BCS_OVERLAY))
                        .props(firmware_images())
                        .node(build_targets().required()),
                ),
        )
        .node(
            NodeDesc::new("mapping").node(
                NodeDesc::any(r"sku-map(@[0-9])?")
                    .prop(PropDesc::string("platform-name").pattern("[A-Za-z0-9 ]+"))
                    .prop(PropDesc::string("smbios-name-match").pattern("[A-Za-z0-9 ]+"))
                    .prop(
                        PropDesc::phandle("single-sku", MODEL_TARGET)
                            .conditional("simple-sku-map", false),
                    )
                    .prop(
                        PropDesc::custom("simple-sku-map", validate_sku_map)
                            .conditional("single-sku", false),
                    ),
            ),
        )
        .node(
            NodeDesc::new("touch").node(
                NodeDesc::any("[a-z0-9]+")
                    .prop(PropDesc::phandle_target())
                    .prop(PropDesc::string("vendor").required())
                    .prop(
                        PropDesc::file("firmware-bin")
                            .required()
                            .pattern(r"[A-Za-z0-9_/{}.-]+\.bin")
                            .target_dir("/opt/google/touch/firmware"),
                    )
                    .prop(
                        PropDesc::file("firmware-symlink")
                            .required()
                            .target_dir("/lib/firmware"),
                    )
                    .prop(PropDesc::string("date-code")),
            ),
        )
}

fn firmware_images() -> [PropDesc; 4] {
    ["main-image", "main-rw-image", "ec-image", "pd-image"]
        .map(|name| PropDesc::file(name).pattern(BCS_IMAGE))
}

fn build_targets() -> NodeDesc {
    NodeDesc::new("build-targets").props(
        [
            "coreboot",
            "ec",
            "depthcharge",
            "libpayload",
            "cr50",
            "u-boot",
            "base",
            "ish",
            "pd",
        ]
        .map(PropDesc::string),
    )
}

fn model() -> NodeDesc {
    NodeDesc::model()
        .prop(PropDesc::phandle_target())
        .prop(PropDesc::phandle("default", MODEL_TARGET).conditional("whitelabel", false))
        .prop(PropDesc::phandle("whitelabel", MODEL_TARGET).conditional("default", false))
        .prop(PropDesc::string("brand-code").pattern("[A-Z]{4}"))
        .prop(
            PropDesc::string("powerd-prefs")
                .pattern(IDENTIFIER)
                .conditional("whitelabel", false),
        )
        .prop(PropDesc::string("wallpaper").pattern("[a-z0-9_]+"))
        .node(audio().conditional("whitelabel", false))
        .node(firmware())
        .node(
            NodeDesc::new("power")
                .conditional("whitelabel", false)
                .prop(PropDesc::float("low-battery-shutdown-percent").range(0.0, 100.0))
                .prop(PropDesc::float("power-supply-full-factor").range(0.001, 1.0))
                .prop(PropDesc::boolean("has-keyboard-backlight")),
        )
        .node(
            NodeDesc::new("submodels").node(
                NodeDesc::submodel()
                    .prop(PropDesc::phandle_target())
                    .node(audio())
                    .node(touch()),
            ),
        )
        .node(
            NodeDesc::new("thermal").prop(
                PropDesc::file("dptf-dv")
                    .pattern(r"\w+/dptf\.dv")
                    .target_dir("/etc/dptf"),
            ),
        )
        .node(touch())
}

fn audio() -> NodeDesc {
    NodeDesc::new("audio").node(
        NodeDesc::any("main")
            .prop(PropDesc::phandle("audio-type", "/chromeos/family/audio/ANY").required())
            .prop(PropDesc::string("cras-config-dir").required().pattern(IDENTIFIER))
            .prop(PropDesc::string("ucm-suffix").pattern(IDENTIFIER))
            .prop(PropDesc::string("topology-name").pattern(IDENTIFIER)),
    )
}

fn firmware() -> NodeDesc {
    NodeDesc::new("firmware")
        .prop(PropDesc::phandle("shares", "/chromeos/family/firmware/MODEL"))
        .prop(PropDesc::string("key-id").pattern("[A-Z][A-Z0-9_]+"))
        .prop(PropDesc::boolean("no-firmware"))
        .prop(
            PropDesc::file("bcs-overlay")
                .required()
                .pattern(BCS_OVERLAY)
                .conditional("shares", false),
        )
        .props(
            firmware_images()
                .map(|image| image.conditional("shares", false)),
        )
        .prop(
            PropDesc::string_list("extra")
                .pattern(r"[A-Za-z0-9_${}/.-]+")
                .conditional("shares", false),
        )
        .node(build_targets().required().conditional("shares", false))
}

fn touch() -> NodeDesc {
    NodeDesc::new("touch")
        .prop(PropDesc::string("present").pattern("yes|no|probe"))
        .node(
            NodeDesc::any("[a-z0-9]+")
                .prop(PropDesc::phandle("touch-type", "/chromeos/family/touch/ANY").required())
                .prop(PropDesc::string("pid"))
                .prop(PropDesc::string("version"))
                .prop(PropDesc::string("probe-regex").conditional("../present", true)),
        )
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::schema::SchemaElement;

    #[test]
    fn target_directories() {
        let schema = schema();
        assert_eq!(schema.target_directory("volume"), Some(Path::new("/etc/cras")));
        assert_eq!(
            schema.target_directory("hifi-conf"),
            Some(Path::new("/usr/share/alsa/ucm"))
        );
        assert_eq!(
            schema.target_directory("firmware-bin"),
            Some(Path::new("/opt/google/touch/firmware"))
        );
        assert_eq!(schema.target_directory("dptf-dv"), Some(Path::new("/etc/dptf")));
        assert_eq!(schema.target_directory("bcs-overlay"), None);
    }

    #[test]
    fn phandle_props() {
        let props: Vec<&str> = schema().phandle_props().iter().map(String::as_str).collect();
        assert_eq!(
            props,
            ["audio-type", "shares", "single-sku", "touch-type", "whitelabel"]
        );
    }

    #[test]
    fn models_are_wildcards() {
        let Some(SchemaElement::Node(chromeos)) = schema().root().element("chromeos") else {
            panic!("no chromeos node");
        };
        let Some(SchemaElement::Node(models)) = chromeos.element("models") else {
            panic!("no models node");
        };
        assert!(models.is_required());
        assert_eq!(models.nodes_iter().map(NodeDesc::name).collect::<Vec<_>>(), ["MODEL"]);
    }
}
