// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for the `cros_config_tree` crate.

use alloc::string::String;
use core::fmt;

/// An error that can occur when reading a configuration blob.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct FdtError {
    offset: usize,
    /// The type of the error that has occurred.
    pub kind: FdtErrorKind,
}

impl FdtError {
    pub(crate) fn new(kind: FdtErrorKind, offset: usize) -> Self {
        Self { offset, kind }
    }

    /// Returns the byte offset into the blob at which the error was detected.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// The kind of an error that can occur when reading a configuration blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FdtErrorKind {
    /// The magic number of the blob is invalid.
    InvalidMagic,
    /// The blob version is not supported by this library.
    UnsupportedVersion(u32),
    /// A length or offset points outside of the blob.
    InvalidLength,
    /// An invalid or unexpected structure token was encountered.
    BadToken(u32),
    /// A node or property name is not a valid NUL-terminated string.
    InvalidString,
}

impl fmt::Display for FdtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.kind, self.offset)
    }
}

impl fmt::Display for FdtErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic => write!(f, "invalid FDT magic number"),
            Self::UnsupportedVersion(version) => {
                write!(f, "the FDT version {version} is not supported")
            }
            Self::InvalidLength => write!(f, "invalid FDT length"),
            Self::BadToken(token) => write!(f, "bad FDT token: 0x{token:x}"),
            Self::InvalidString => write!(f, "invalid string in FDT"),
        }
    }
}

impl core::error::Error for FdtError {}

/// An error that can occur when building a [`ConfigTree`](crate::model::ConfigTree).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TreeError {
    /// Two nodes carry the same phandle value.
    DuplicatePhandle {
        /// The phandle value.
        phandle: u32,
        /// Path of the node that registered the phandle first.
        first: String,
        /// Path of the node that tried to register it again.
        second: String,
    },
    /// A `phandle` property is zero or is not a single cell.
    InvalidPhandle {
        /// Path of the node carrying the property.
        path: String,
    },
    /// A blob could not be read.
    Fdt(FdtError),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicatePhandle {
                phandle,
                first,
                second,
            } => write!(
                f,
                "phandle {phandle} is used by both `{first}` and `{second}`"
            ),
            Self::InvalidPhandle { path } => {
                write!(f, "`{path}` has an invalid phandle property")
            }
            Self::Fdt(err) => write!(f, "{err}"),
        }
    }
}

impl core::error::Error for TreeError {}

impl From<FdtError> for TreeError {
    fn from(err: FdtError) -> Self {
        Self::Fdt(err)
    }
}
