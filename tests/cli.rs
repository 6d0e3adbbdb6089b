// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use cros_config::tree::fdt::FDT_MAGIC;
use tempfile::TempDir;

/// Writes a blob made only of nodes, each given by its depth-first name
/// list with `None` closing the current node.
fn blob(nodes: &[Option<&str>]) -> Vec<u8> {
    let mut structure = Vec::new();
    for node in nodes {
        match node {
            Some(name) => {
                structure.extend_from_slice(&1u32.to_be_bytes());
                structure.extend_from_slice(name.as_bytes());
                structure.push(0);
                while structure.len() % 4 != 0 {
                    structure.push(0);
                }
            }
            None => structure.extend_from_slice(&2u32.to_be_bytes()),
        }
    }
    structure.extend_from_slice(&9u32.to_be_bytes());

    let off_dt_struct = 40 + 16;
    let totalsize = off_dt_struct + structure.len();
    let header = [
        FDT_MAGIC,
        u32::try_from(totalsize).unwrap(),
        u32::try_from(off_dt_struct).unwrap(),
        u32::try_from(totalsize).unwrap(),
        40,
        17,
        16,
        0,
        0,
        u32::try_from(structure.len()).unwrap(),
    ];
    let mut blob: Vec<u8> = header.iter().flat_map(|word| word.to_be_bytes()).collect();
    blob.extend_from_slice(&[0; 16]);
    blob.extend_from_slice(&structure);
    blob
}

fn write(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn clean_blob() -> Vec<u8> {
    blob(&[
        Some(""),
        Some("chromeos"),
        Some("family"),
        None,
        Some("models"),
        None,
        None,
        None,
    ])
}

/// `/chromeos` without its `family` and `models` nodes.
fn empty_chromeos_blob() -> Vec<u8> {
    blob(&[Some(""), Some("chromeos"), None, None])
}

fn validate_config(args: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_validate-config"))
        .args(args)
        .env_remove("DTC")
        .output()
        .unwrap()
}

fn validate_config_fail_fast(args: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_validate-config"))
        .arg("--raise-on-error")
        .args(args)
        .env_remove("DTC")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn clean_blob_exits_zero() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "clean.dtb", &clean_blob());

    let output = validate_config(&[&path]);
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert_eq!(stdout(&output), "");
}

#[test]
fn diagnostics_exit_one() {
    let dir = TempDir::new().unwrap();
    let clean = write(&dir, "clean.dtb", &clean_blob());
    let broken = write(&dir, "broken.dtb", &empty_chromeos_blob());

    let output = validate_config(&[&clean, &broken]);
    assert_eq!(output.status.code(), Some(1), "{output:?}");
    let out = stdout(&output);
    assert!(out.starts_with(&format!("{}:\n", broken.display())), "{out}");
    assert!(out.contains("Missing subnode 'family'"), "{out}");
    assert!(out.contains("Missing subnode 'models'"), "{out}");
    assert!(!out.contains(&clean.display().to_string()), "{out}");
}

#[test]
fn raise_on_error_reports_only_the_first_violation() {
    let dir = TempDir::new().unwrap();
    let broken = write(&dir, "broken.dtb", &empty_chromeos_blob());

    let output = validate_config_fail_fast(&[&broken]);
    assert_eq!(output.status.code(), Some(1), "{output:?}");
    let out = stdout(&output);
    assert_eq!(out.matches("Missing subnode").count(), 1, "{out}");
}

#[test]
fn missing_blob_exits_two() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.dtb");

    let output = validate_config(&[&missing]);
    assert_eq!(output.status.code(), Some(2), "{output:?}");
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("missing.dtb"), "{err}");
}

#[test]
fn markdown_without_code_block_exits_two() {
    let dir = TempDir::new().unwrap();
    let notes = write(&dir, "notes.md", b"# Reef\n\nNo configuration here.\n");

    let output = validate_config(&[&notes]);
    assert_eq!(output.status.code(), Some(2), "{output:?}");
}

#[test]
fn unreadable_file_wins_over_diagnostics() {
    let dir = TempDir::new().unwrap();
    let broken = write(&dir, "broken.dtb", &empty_chromeos_blob());
    let missing = dir.path().join("missing.dtb");

    let output = validate_config(&[&broken, &missing]);
    assert_eq!(output.status.code(), Some(2), "{output:?}");
    assert!(stdout(&output).contains("Missing subnode"));
}
