// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Loading configuration trees from input files.
//!
//! Three kinds of input are accepted:
//!
//! - `.dtb` files are read as compiled blobs.
//! - `.md` files have their first fenced code block compiled as source.
//! - Anything else is compiled as device-tree source.
//!
//! Source is compiled by an external device-tree compiler into a temporary
//! file, which is removed again however the compilation ends.

use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use tempfile::NamedTempFile;

use crate::error::LoadError;
use crate::tree::error::TreeError;
use crate::tree::fdt::Fdt;
use crate::tree::model::ConfigTree;

/// The device-tree compiler used unless another one is configured.
pub const DEFAULT_COMPILER: &str = "dtc";

/// Turns input files into configuration trees.
#[derive(Debug, Clone)]
pub struct Compiler {
    program: PathBuf,
    include_dirs: Vec<PathBuf>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(DEFAULT_COMPILER)
    }
}

impl Compiler {
    /// Creates a loader that compiles source with `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            include_dirs: Vec::new(),
        }
    }

    /// Adds a directory to search for included source files.
    #[must_use]
    pub fn include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    /// Returns the compiler program.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Loads the configuration tree stored in `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or compiled, or does not
    /// hold a valid configuration tree.
    pub fn load(&self, path: &Path) -> Result<ConfigTree, LoadError> {
        match path.extension().and_then(OsStr::to_str) {
            Some("dtb") => {
                let blob = fs::read(path).map_err(|source| LoadError::Io {
                    path: path.to_owned(),
                    source,
                })?;
                parse_blob(path, &blob)
            }
            Some("md") => {
                let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
                    path: path.to_owned(),
                    source,
                })?;
                let source = extract_code_block(&text).ok_or_else(|| LoadError::NoCodeBlock {
                    path: path.to_owned(),
                })?;
                let mut dts = tempfile::Builder::new()
                    .suffix(".dts")
                    .tempfile()
                    .map_err(LoadError::TempFile)?;
                dts.write_all(source.as_bytes())
                    .and_then(|()| dts.flush())
                    .map_err(LoadError::TempFile)?;
                self.compile(dts.path(), path)
            }
            _ => self.compile(path, path),
        }
    }

    /// Compiles `source` and parses the result. `origin` is the input file
    /// the source came from; its directory is searched for includes.
    fn compile(&self, source: &Path, origin: &Path) -> Result<ConfigTree, LoadError> {
        let output: NamedTempFile = tempfile::Builder::new()
            .suffix(".dtb")
            .tempfile()
            .map_err(LoadError::TempFile)?;

        let mut command = Command::new(&self.program);
        command
            .args(["-I", "dts", "-O", "dtb", "-o"])
            .arg(output.path());
        let origin_dir = origin.parent().filter(|dir| !dir.as_os_str().is_empty());
        for dir in origin_dir
            .into_iter()
            .chain(self.include_dirs.iter().map(PathBuf::as_path))
        {
            command.arg("-i").arg(dir);
        }
        command.arg(source);
        debug!("running {command:?}");

        let result = command.output().map_err(|source| LoadError::Spawn {
            program: self.program().to_owned(),
            source,
        })?;
        if !result.status.success() {
            return Err(LoadError::Compiler {
                program: self.program().to_owned(),
                path: origin.to_owned(),
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_owned(),
            });
        }
        let blob = fs::read(output.path()).map_err(|source| LoadError::Io {
            path: output.path().to_owned(),
            source,
        })?;
        parse_blob(origin, &blob)
    }
}

fn parse_blob(path: &Path, blob: &[u8]) -> Result<ConfigTree, LoadError> {
    let tree = Fdt::new(blob)
        .map_err(TreeError::from)
        .and_then(|fdt| ConfigTree::from_fdt(&fdt));
    tree.map_err(|source| LoadError::Tree {
        path: path.to_owned(),
        source,
    })
}

/// Returns the contents of the first fenced code block of a Markdown
/// document, or `None` if there is no complete one.
///
/// # Examples
///
/// ```
/// # use cros_config::compile::extract_code_block;
/// let text = "# Reef\n\n```dts\n/dts-v1/;\n/ {};\n```\n";
/// assert_eq!(extract_code_block(text).as_deref(), Some("/dts-v1/;\n/ {};\n"));
/// ```
#[must_use]
pub fn extract_code_block(markdown: &str) -> Option<String> {
    let mut lines = markdown.lines();
    lines.find(|line| is_fence(line))?;
    let mut block = String::new();
    for line in lines {
        if is_fence(line) {
            return Some(block);
        }
        block.push_str(line);
        block.push('\n');
    }
    None
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_block_wins() {
        let text = "intro\n```\nfirst\n```\n\n```\nsecond\n```\n";
        assert_eq!(extract_code_block(text).as_deref(), Some("first\n"));
    }

    #[test]
    fn no_block() {
        assert_eq!(extract_code_block("just prose\n"), None);
        assert_eq!(extract_code_block("```\nunterminated\n"), None);
    }

    #[test]
    fn empty_block() {
        assert_eq!(extract_code_block("```\n```\n").as_deref(), Some(""));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Compiler::default()
            .load(&dir.path().join("missing.dtb"))
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }), "{err:?}");
    }

    #[test]
    fn bad_blob() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.dtb");
        fs::write(&path, b"not a blob at all, just text").unwrap();
        let err = Compiler::default().load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Tree { .. }), "{err:?}");
    }

    #[test]
    fn markdown_without_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("README.md");
        fs::write(&path, "# Nothing to see\n").unwrap();
        let err = Compiler::default().load(&path).unwrap_err();
        assert!(matches!(err, LoadError::NoCodeBlock { .. }), "{err:?}");
    }

    #[test]
    fn missing_compiler() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reef.dts");
        fs::write(&path, "/dts-v1/;\n/ {};\n").unwrap();
        let compiler = Compiler::new(dir.path().join("no-such-dtc"));
        let err = compiler.load(&path).unwrap_err();
        let LoadError::Spawn { program, .. } = err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(program, compiler.program());
    }

    #[cfg(unix)]
    #[test]
    fn failing_compiler() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reef.dts");
        fs::write(&path, "/dts-v1/;\n").unwrap();
        let err = Compiler::new("false").load(&path).unwrap_err();
        let LoadError::Compiler { status, .. } = err else {
            panic!("unexpected error {err:?}");
        };
        assert!(!status.success());
    }
}
