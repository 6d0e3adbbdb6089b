// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use cros_config_tree::error::{FdtErrorKind, TreeError};
use cros_config_tree::fdt::{FDT_MAGIC, Fdt};
use cros_config_tree::model::{ConfigTree, PropertyValue};

/// Assembles just enough of a blob to exercise the reader.
#[derive(Default)]
struct BlobWriter {
    structure: Vec<u8>,
    strings: Vec<u8>,
}

impl BlobWriter {
    fn word(&mut self, value: u32) {
        self.structure.extend_from_slice(&value.to_be_bytes());
    }

    fn pad(&mut self) {
        while self.structure.len() % 4 != 0 {
            self.structure.push(0);
        }
    }

    fn begin_node(&mut self, name: &str) -> &mut Self {
        self.word(0x1);
        self.structure.extend_from_slice(name.as_bytes());
        self.structure.push(0);
        self.pad();
        self
    }

    fn end_node(&mut self) -> &mut Self {
        self.word(0x2);
        self
    }

    fn nop(&mut self) -> &mut Self {
        self.word(0x4);
        self
    }

    fn raw_prop(&mut self, name_offset: u32, value: &[u8]) -> &mut Self {
        self.word(0x3);
        self.word(u32::try_from(value.len()).unwrap());
        self.word(name_offset);
        self.structure.extend_from_slice(value);
        self.pad();
        self
    }

    fn prop(&mut self, name: &str, value: &[u8]) -> &mut Self {
        let name_offset = u32::try_from(self.strings.len()).unwrap();
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        self.raw_prop(name_offset, value)
    }

    fn finish(&mut self) -> Vec<u8> {
        self.word(0x9);
        let off_dt_struct = 40 + 16;
        let off_dt_strings = off_dt_struct + self.structure.len();
        let totalsize = off_dt_strings + self.strings.len();
        let header = [
            FDT_MAGIC,
            u32::try_from(totalsize).unwrap(),
            u32::try_from(off_dt_struct).unwrap(),
            u32::try_from(off_dt_strings).unwrap(),
            40,
            17,
            16,
            0,
            u32::try_from(self.strings.len()).unwrap(),
            u32::try_from(self.structure.len()).unwrap(),
        ];
        let mut blob: Vec<u8> = header.iter().flat_map(|word| word.to_be_bytes()).collect();
        blob.extend_from_slice(&[0; 16]);
        blob.extend_from_slice(&self.structure);
        blob.extend_from_slice(&self.strings);
        blob
    }
}

fn models_blob() -> Vec<u8> {
    BlobWriter::default()
        .begin_node("")
        .begin_node("chromeos")
        .begin_node("models")
        .begin_node("reef")
        .prop("phandle", &1u32.to_be_bytes())
        .prop("brand-code", b"ABCD\0")
        .nop()
        .begin_node("firmware")
        .prop("no-firmware", b"")
        .end_node()
        .end_node()
        .begin_node("pyro")
        .prop("phandle", &2u32.to_be_bytes())
        .prop("default", &1u32.to_be_bytes())
        .end_node()
        .end_node()
        .end_node()
        .end_node()
        .finish()
}

#[test]
fn read_tree() {
    let blob = models_blob();
    let fdt = Fdt::new(&blob).unwrap();
    let tree = ConfigTree::from_fdt(&fdt).unwrap();

    let models = tree.find_node("/chromeos/models").unwrap();
    let names: Vec<_> = models.children().map(|child| child.name()).collect();
    assert_eq!(names, vec!["reef", "pyro"]);

    let reef = models.child("reef").unwrap();
    let props: Vec<_> = reef.properties().map(|prop| prop.name()).collect();
    assert_eq!(props, vec!["phandle", "brand-code"]);
    assert_eq!(reef.property("brand-code").unwrap().as_str(), Some("ABCD"));

    let firmware = tree.find_node("/chromeos/models/reef/firmware").unwrap();
    assert_eq!(
        firmware.property("no-firmware").unwrap().value(),
        &PropertyValue::Bool
    );
}

#[test]
fn phandles_are_indexed() {
    let blob = models_blob();
    let tree = ConfigTree::from_fdt(&Fdt::new(&blob).unwrap()).unwrap();

    assert_eq!(
        tree.phandle_target(1).unwrap().path(),
        "/chromeos/models/reef"
    );
    assert_eq!(
        tree.phandle_target(2).unwrap().path(),
        "/chromeos/models/pyro"
    );
    assert!(tree.phandle_target(3).is_none());

    let pyro = tree.find_node("/chromeos/models/pyro").unwrap();
    let default = pyro.property("default").unwrap().as_u32().unwrap();
    assert_eq!(tree.phandle_target(default).unwrap().name(), "reef");
}

#[test]
fn bad_name_offset() {
    let blob = BlobWriter::default()
        .begin_node("")
        .raw_prop(100, b"x\0")
        .end_node()
        .finish();
    let fdt = Fdt::new(&blob).unwrap();
    let result = ConfigTree::from_fdt(&fdt);
    assert!(
        matches!(result, Err(TreeError::Fdt(e)) if e.kind == FdtErrorKind::InvalidLength)
    );
}

#[test]
fn truncated_property() {
    let mut writer = BlobWriter::default();
    writer.begin_node("");
    writer.word(0x3);
    writer.word(0x1000);
    writer.word(0);
    let blob = writer.finish();
    let fdt = Fdt::new(&blob).unwrap();
    assert!(matches!(
        fdt.to_tree_node(),
        Err(e) if e.kind == FdtErrorKind::InvalidLength
    ));
}
