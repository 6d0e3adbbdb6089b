// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Human-readable validation failures.

use std::fmt::{self, Write};
use std::path::Path;

/// A single problem found in a configuration tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    path: String,
    message: String,
}

impl Diagnostic {
    /// Creates a diagnostic for the node at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the absolute path of the node the problem was found on.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the description of the problem.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Renders the diagnostics of one input file, headed by the file name.
///
/// Returns an empty string if there is nothing to report.
///
/// # Examples
///
/// ```
/// # use std::path::Path;
/// # use cros_config::diagnostics::{Diagnostic, render};
/// let found = [Diagnostic::new("/chromeos", "Missing subnode 'models'")];
/// assert_eq!(
///     render(Path::new("reef.dts"), &found),
///     "reef.dts:\n  /chromeos: Missing subnode 'models'\n"
/// );
/// ```
#[must_use]
pub fn render(file: &Path, diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    if diagnostics.is_empty() {
        return out;
    }
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{}:", file.display());
    for diagnostic in diagnostics {
        let _ = writeln!(out, "  {diagnostic}");
    }
    out
}
