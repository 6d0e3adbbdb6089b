// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A reader for [Flattened Device Tree (FDT)] blobs.
//!
//! Only the parts of the format that are needed to rebuild the node tree are
//! read: the header, the structure block and the strings block. The memory
//! reservation block carries nothing of interest for a configuration and is
//! skipped.
//!
//! [Flattened Device Tree (FDT)]: https://devicetree-specification.readthedocs.io/en/latest/chapter5-flattened-format.html

use core::ffi::CStr;

use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;
use zerocopy::byteorder::big_endian;

use crate::error::{FdtError, FdtErrorKind};
use crate::model::{Property, TreeNode};

/// Version of the FDT specification supported by this library.
const FDT_VERSION: u32 = 17;
const FDT_TAGSIZE: usize = core::mem::size_of::<u32>();
/// The magic number every blob starts with.
pub const FDT_MAGIC: u32 = 0xd00d_feed;
const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_NOP: u32 = 0x4;
const FDT_END: u32 = 0x9;

#[repr(C, packed)]
#[derive(Debug, Copy, Clone, FromBytes, IntoBytes, Unaligned, Immutable, KnownLayout)]
struct FdtHeader {
    magic: big_endian::U32,
    totalsize: big_endian::U32,
    off_dt_struct: big_endian::U32,
    off_dt_strings: big_endian::U32,
    _off_mem_rsvmap: big_endian::U32,
    version: big_endian::U32,
    last_comp_version: big_endian::U32,
    _boot_cpuid_phys: big_endian::U32,
    size_dt_strings: big_endian::U32,
    _size_dt_struct: big_endian::U32,
}

/// A token in the structure block.
#[derive(Debug, PartialEq, Eq)]
enum FdtToken {
    BeginNode,
    EndNode,
    Prop,
    Nop,
    End,
}

impl TryFrom<u32> for FdtToken {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            FDT_BEGIN_NODE => Ok(FdtToken::BeginNode),
            FDT_END_NODE => Ok(FdtToken::EndNode),
            FDT_PROP => Ok(FdtToken::Prop),
            FDT_NOP => Ok(FdtToken::Nop),
            FDT_END => Ok(FdtToken::End),
            _ => Err(value),
        }
    }
}

/// A validated, borrowed view of a flattened device tree blob.
#[derive(Debug, Clone, Copy)]
pub struct Fdt<'a> {
    data: &'a [u8],
}

impl<'a> Fdt<'a> {
    /// Creates a new `Fdt` from the given byte slice.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is shorter than the header, the magic
    /// number is wrong, the blob version is not compatible with version 17 or
    /// the size recorded in the header does not match the slice length.
    pub fn new(data: &'a [u8]) -> Result<Self, FdtError> {
        if data.len() < core::mem::size_of::<FdtHeader>() {
            return Err(FdtError::new(FdtErrorKind::InvalidLength, 0));
        }

        let fdt = Fdt { data };
        let header = fdt.header();

        if header.magic.get() != FDT_MAGIC {
            return Err(FdtError::new(FdtErrorKind::InvalidMagic, 0));
        }
        if !(header.last_comp_version.get()..=header.version.get()).contains(&FDT_VERSION) {
            return Err(FdtError::new(
                FdtErrorKind::UnsupportedVersion(header.version.get()),
                20,
            ));
        }
        if header.totalsize.get() as usize != data.len() {
            return Err(FdtError::new(FdtErrorKind::InvalidLength, 4));
        }

        Ok(fdt)
    }

    fn header(&self) -> &FdtHeader {
        let (header, _remaining_bytes) = FdtHeader::ref_from_prefix(self.data)
            .expect("new() checks if the slice is at least as big as the header");
        header
    }

    /// Returns the version recorded in the blob header.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.header().version.get()
    }

    /// Returns the total size of the blob in bytes.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.data.len()
    }

    /// Reads the whole structure block into an owned [`TreeNode`] hierarchy.
    ///
    /// Nodes and properties keep the order in which they appear in the blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the structure block is truncated, contains an
    /// unknown token, or refers to a name outside of the strings block.
    pub fn to_tree_node(&self) -> Result<TreeNode, FdtError> {
        let mut offset = self.header().off_dt_struct.get() as usize;
        loop {
            match self.read_token(offset)? {
                FdtToken::Nop => offset += FDT_TAGSIZE,
                FdtToken::BeginNode => return self.read_node(&mut offset),
                _ => {
                    return Err(FdtError::new(
                        FdtErrorKind::BadToken(FDT_BEGIN_NODE),
                        offset,
                    ));
                }
            }
        }
    }

    /// Reads the node starting at `offset`, leaving `offset` just past its
    /// `FDT_END_NODE` token.
    fn read_node(&self, offset: &mut usize) -> Result<TreeNode, FdtError> {
        let name_offset = *offset + FDT_TAGSIZE;
        let name = self.string_at_offset(name_offset, None)?;
        *offset = align_tag_offset(name_offset + name.len() + 1);

        let mut node = TreeNode::new(name);
        loop {
            let token_offset = *offset;
            match self.read_token(token_offset)? {
                FdtToken::Prop => {
                    let len = self.read_u32(token_offset + FDT_TAGSIZE)? as usize;
                    let name_offset = self.read_u32(token_offset + 2 * FDT_TAGSIZE)? as usize;
                    let value_offset = token_offset + 3 * FDT_TAGSIZE;
                    let value = value_offset
                        .checked_add(len)
                        .and_then(|end| self.data.get(value_offset..end))
                        .ok_or(FdtError::new(FdtErrorKind::InvalidLength, token_offset))?;
                    node.add_property(Property::new(self.string(name_offset)?, value));
                    *offset = align_tag_offset(value_offset + len);
                }
                FdtToken::BeginNode => {
                    let child = self.read_node(offset)?;
                    node.add_child(child);
                }
                FdtToken::EndNode => {
                    *offset += FDT_TAGSIZE;
                    return Ok(node);
                }
                FdtToken::Nop => *offset += FDT_TAGSIZE,
                FdtToken::End => {
                    return Err(FdtError::new(
                        FdtErrorKind::BadToken(FDT_END),
                        token_offset,
                    ));
                }
            }
        }
    }

    fn read_u32(&self, offset: usize) -> Result<u32, FdtError> {
        self.data
            .get(offset..)
            .and_then(|bytes| big_endian::U32::ref_from_prefix(bytes).ok())
            .map(|(val, _)| val.get())
            .ok_or(FdtError::new(FdtErrorKind::InvalidLength, offset))
    }

    fn read_token(&self, offset: usize) -> Result<FdtToken, FdtError> {
        let val = self.read_u32(offset)?;
        FdtToken::try_from(val).map_err(|t| FdtError::new(FdtErrorKind::BadToken(t), offset))
    }

    /// Returns a string from the strings block.
    fn string(&self, string_block_offset: usize) -> Result<&'a str, FdtError> {
        let header = self.header();
        let strings_start = header.off_dt_strings.get() as usize;
        let strings_end = strings_start + header.size_dt_strings.get() as usize;
        let string_start = strings_start + string_block_offset;

        if string_start >= strings_end {
            return Err(FdtError::new(FdtErrorKind::InvalidLength, string_start));
        }

        self.string_at_offset(string_start, Some(strings_end))
    }

    /// Returns a NUL-terminated string from a given offset.
    fn string_at_offset(&self, offset: usize, end: Option<usize>) -> Result<&'a str, FdtError> {
        let slice = match end {
            Some(end) => self.data.get(offset..end),
            None => self.data.get(offset..),
        }
        .ok_or(FdtError::new(FdtErrorKind::InvalidLength, offset))?;

        match CStr::from_bytes_until_nul(slice).map(CStr::to_str) {
            Ok(Ok(val)) => Ok(val),
            _ => Err(FdtError::new(FdtErrorKind::InvalidString, offset)),
        }
    }
}

fn align_tag_offset(offset: usize) -> usize {
    offset.next_multiple_of(FDT_TAGSIZE)
}
