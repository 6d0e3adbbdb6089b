// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for the `cros_config` crate.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::diagnostics::Diagnostic;
use crate::tree::error::TreeError;

/// A failure that stops validation of a tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidateError {
    /// The first problem found while validating with
    /// [`Policy::FailFast`](crate::validator::Policy::FailFast).
    #[error("{0}")]
    Violation(Diagnostic),
    /// A conditional-presence rule names an element its schema node does not
    /// declare. This is a bug in the schema.
    #[error("conditional element '{condition}' is not declared by schema node '{schema_node}'")]
    UnknownCondition {
        /// The condition as written in the schema.
        condition: String,
        /// The name of the schema node the condition was looked up in.
        schema_node: String,
    },
    /// A conditional-presence rule climbs above the root of the tree.
    #[error("conditional element '{condition}' on '{path}' climbs above the root")]
    ConditionAboveRoot {
        /// The condition as written in the schema.
        condition: String,
        /// The node the condition was evaluated on.
        path: String,
    },
}

/// A failure to turn an input file into a configuration tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// An input file could not be read.
    #[error("cannot read `{}`", path.display())]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// A scratch file could not be created or written.
    #[error("cannot write a temporary file")]
    TempFile(#[source] io::Error),
    /// The device-tree compiler could not be started.
    #[error("cannot run `{}`", program.display())]
    Spawn {
        /// The compiler that was invoked.
        program: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
    /// The device-tree compiler rejected a source file.
    #[error("`{}` failed on `{}` ({status}): {stderr}", program.display(), path.display())]
    Compiler {
        /// The compiler that was invoked.
        program: PathBuf,
        /// The input file.
        path: PathBuf,
        /// The exit status of the compiler.
        status: ExitStatus,
        /// What the compiler printed on its error stream.
        stderr: String,
    },
    /// A Markdown input has no fenced code block.
    #[error("`{}` has no fenced code block", path.display())]
    NoCodeBlock {
        /// The input file.
        path: PathBuf,
    },
    /// A compiled blob is not a valid configuration tree.
    #[error("`{}` is not a valid configuration blob", path.display())]
    Tree {
        /// The input file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: TreeError,
    },
}
