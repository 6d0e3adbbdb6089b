// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use alloc::{string::String, vec::Vec};

use zerocopy::{FromBytes, big_endian};

/// A configuration property: its name, the raw bytes read from the blob and
/// the value decoded from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: String,
    raw: Vec<u8>,
    value: PropertyValue,
}

/// The decoded value of a [`Property`].
///
/// The blob format carries no type information, so the value is guessed from
/// the shape of the payload, see [`PropertyValue::decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// A presence-only property with an empty payload.
    Bool,
    /// A single 32-bit cell.
    Int(u32),
    /// Several 32-bit cells.
    Cells(Vec<u32>),
    /// A single NUL-terminated string.
    Str(String),
    /// Several NUL-separated strings.
    StrList(Vec<String>),
    /// Anything else.
    Bytes(Vec<u8>),
}

impl PropertyValue {
    /// Decodes a raw property payload.
    ///
    /// An empty payload is a boolean. A payload made only of printable,
    /// non-empty, NUL-terminated strings is a string or a string list. A
    /// payload whose length is a multiple of four is one or more big-endian
    /// cells. Everything else is kept as bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cros_config_tree::model::PropertyValue;
    /// assert_eq!(PropertyValue::decode(b""), PropertyValue::Bool);
    /// assert_eq!(PropertyValue::decode(b"reef\0"), PropertyValue::Str("reef".into()));
    /// assert_eq!(PropertyValue::decode(&[0, 0, 0, 7]), PropertyValue::Int(7));
    /// ```
    #[must_use]
    pub fn decode(raw: &[u8]) -> Self {
        if raw.is_empty() {
            return Self::Bool;
        }
        if let Some(mut strings) = split_strings(raw) {
            return if strings.len() == 1 {
                Self::Str(strings.remove(0))
            } else {
                Self::StrList(strings)
            };
        }
        match cells(raw) {
            Some(cells) if cells.len() == 1 => Self::Int(cells[0]),
            Some(cells) => Self::Cells(cells),
            None => Self::Bytes(raw.to_vec()),
        }
    }
}

fn split_strings(raw: &[u8]) -> Option<Vec<String>> {
    let is_printable = raw
        .iter()
        .all(|&ch| ch.is_ascii_graphic() || ch == b' ' || ch == 0);
    let has_empty = raw.first() == Some(&0) || raw.windows(2).any(|window| window == [0, 0]);
    if !is_printable || has_empty || !raw.ends_with(&[0]) {
        return None;
    }
    Some(
        raw[..raw.len() - 1]
            .split(|&ch| ch == 0)
            .map(|s| s.iter().copied().map(char::from).collect())
            .collect(),
    )
}

fn cells(raw: &[u8]) -> Option<Vec<u32>> {
    <[big_endian::U32]>::ref_from_bytes(raw)
        .ok()
        .map(|cells| cells.iter().map(|cell| cell.get()).collect())
}

impl Property {
    /// Creates a new `Property` from its name and raw payload.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cros_config_tree::model::{Property, PropertyValue};
    /// let prop = Property::new("sku-id", vec![0, 0, 0, 4]);
    /// assert_eq!(prop.name(), "sku-id");
    /// assert_eq!(prop.value(), &PropertyValue::Int(4));
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, raw: impl Into<Vec<u8>>) -> Self {
        let raw = raw.into();
        Self {
            name: name.into(),
            value: PropertyValue::decode(&raw),
            raw,
        }
    }

    /// Creates a presence-only property.
    #[must_use]
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Creates a string property.
    #[must_use]
    pub fn string(name: impl Into<String>, value: &str) -> Self {
        Self::strings(name, &[value])
    }

    /// Creates a string-list property.
    #[must_use]
    pub fn strings(name: impl Into<String>, values: &[&str]) -> Self {
        let mut raw = Vec::new();
        for value in values {
            raw.extend_from_slice(value.as_bytes());
            raw.push(0);
        }
        Self::new(name, raw)
    }

    /// Creates a single-cell property.
    #[must_use]
    pub fn u32(name: impl Into<String>, value: u32) -> Self {
        Self::new(name, value.to_be_bytes())
    }

    /// Creates a property holding a list of cells.
    #[must_use]
    pub fn cells(name: impl Into<String>, values: &[u32]) -> Self {
        Self::new(
            name,
            values
                .iter()
                .flat_map(|value| value.to_be_bytes())
                .collect::<Vec<u8>>(),
        )
    }

    /// Returns the name of this property.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the raw payload of this property.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Returns the decoded value of this property.
    #[must_use]
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Returns the payload as a single cell, regardless of how it was
    /// decoded.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cros_config_tree::model::Property;
    /// let prop = Property::u32("phandle", 1234);
    /// assert_eq!(prop.as_u32(), Some(1234));
    /// assert_eq!(Property::string("name", "reef").as_u32(), None);
    /// ```
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        self.raw.as_slice().try_into().ok().map(u32::from_be_bytes)
    }

    /// Returns the payload as cells, regardless of how it was decoded.
    #[must_use]
    pub fn as_cells(&self) -> Option<Vec<u32>> {
        cells(&self.raw)
    }

    /// Returns the value if it is a single string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            PropertyValue::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value as a list of strings. A single string is a list of
    /// one.
    ///
    /// # Examples
    ///
    /// ```
    /// # use cros_config_tree::model::Property;
    /// let prop = Property::strings("files", &["a", "b"]);
    /// assert_eq!(prop.as_str_list(), Some(vec!["a", "b"]));
    /// ```
    #[must_use]
    pub fn as_str_list(&self) -> Option<Vec<&str>> {
        match &self.value {
            PropertyValue::Str(value) => Some(alloc::vec![value.as_str()]),
            PropertyValue::StrList(values) => Some(values.iter().map(String::as_str).collect()),
            _ => None,
        }
    }

    /// Returns whether this is a presence-only property.
    #[must_use]
    pub fn is_flag(&self) -> bool {
        self.raw.is_empty()
    }
}
