// Copyright 2024 The akaifat authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The 32-byte directory entry record and the 16.3 Akai name it encodes.

use akaifat_error::{Error, Result};
use bitflags::bitflags;

use crate::{akai_part::AkaiPart, codec, short_name::ShortName, DIR_ENTRY_SIZE};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
    }
}

const OFF_ATTRIBUTES: usize = 11;
const OFF_AKAI_PART: usize = 12;
const OFF_RESERVED: usize = 20;
const RESERVED_LEN: usize = 6;
const OFF_FIRST_CLUSTER: usize = 26;
const OFF_LENGTH: usize = 28;

/// An in-memory, decoded 32-byte directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    short_name: ShortName,
    attributes: Attributes,
    akai_part: AkaiPart,
    first_cluster: u16,
    length: u32,
    dirty: bool,
}

impl DirEntry {
    pub fn new(short_name: ShortName, akai_part: AkaiPart, attributes: Attributes) -> DirEntry {
        DirEntry {
            short_name,
            attributes,
            akai_part,
            first_cluster: 0,
            length: 0,
            dirty: true,
        }
    }

    /// Builds the `"."` entry of a freshly created subdirectory.
    pub fn dot(start_cluster: u16) -> DirEntry {
        DirEntry {
            short_name: ShortName::DOT,
            attributes: Attributes::DIRECTORY,
            akai_part: AkaiPart::EMPTY,
            first_cluster: start_cluster,
            length: 0,
            dirty: true,
        }
    }

    /// Builds the `".."` entry of a freshly created subdirectory.
    /// `parent_start_cluster` is 0 when the parent is the root directory.
    pub fn dot_dot(parent_start_cluster: u16) -> DirEntry {
        DirEntry {
            short_name: ShortName::DOT_DOT,
            attributes: Attributes::DIRECTORY,
            akai_part: AkaiPart::EMPTY,
            first_cluster: parent_start_cluster,
            length: 0,
            dirty: true,
        }
    }

    /// Builds the single root-directory volume-label entry.
    pub fn volume_label(label: &str) -> Result<DirEntry> {
        if label.len() > 11 || !label.is_ascii() {
            return Err(Error::InvalidLabel);
        }
        let (stem, ext) = label.split_at(label.len().min(8));
        let short_name = ShortName::from_parts_relaxed(stem, ext);
        Ok(DirEntry {
            short_name,
            attributes: Attributes::VOLUME_ID,
            akai_part: AkaiPart::EMPTY,
            first_cluster: 0,
            length: 0,
            dirty: true,
        })
    }

    /// Parses 32 raw bytes of a live (non-terminator, non-deleted) entry.
    pub fn parse(raw: &[u8]) -> Result<DirEntry> {
        let short_name = ShortName::parse(&raw[0..11])?;
        let attributes = Attributes::from_bits_truncate(codec::get_u8(raw, OFF_ATTRIBUTES));
        let akai_part = AkaiPart::parse(&raw[OFF_AKAI_PART..OFF_AKAI_PART + 8]);
        let first_cluster = codec::get_u16(raw, OFF_FIRST_CLUSTER);
        let length = codec::get_u32(raw, OFF_LENGTH);
        Ok(DirEntry {
            short_name,
            attributes,
            akai_part,
            first_cluster,
            length,
            dirty: false,
        })
    }

    /// Serializes into exactly [`DIR_ENTRY_SIZE`] bytes, clearing the
    /// `dirty` flag. Offset 20's high-cluster-word slot is always zeroed:
    /// this variant is FAT16-only, it never holds a high word.
    pub fn serialize(&mut self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), DIR_ENTRY_SIZE);
        out.fill(0);
        self.short_name.serialize(&mut out[0..11]);
        codec::set_u8(out, OFF_ATTRIBUTES, self.attributes.bits());
        self.akai_part.serialize(&mut out[OFF_AKAI_PART..OFF_AKAI_PART + 8]);
        out[OFF_RESERVED..OFF_RESERVED + RESERVED_LEN].fill(0);
        codec::set_u16(out, OFF_FIRST_CLUSTER, self.first_cluster);
        codec::set_u32(out, OFF_LENGTH, self.length);
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn attributes(&self) -> Attributes {
        self.attributes
    }

    pub fn is_file(&self) -> bool {
        !self.attributes.intersects(Attributes::DIRECTORY | Attributes::VOLUME_ID)
    }

    pub fn is_directory(&self) -> bool {
        self.attributes.contains(Attributes::DIRECTORY) && !self.attributes.contains(Attributes::VOLUME_ID)
    }

    pub fn is_volume_label(&self) -> bool {
        self.attributes.contains(Attributes::VOLUME_ID)
            && !self.attributes.contains(Attributes::DIRECTORY)
            && !self.is_lfn_entry()
    }

    pub fn is_lfn_entry(&self) -> bool {
        self.attributes.contains(
            Attributes::READ_ONLY | Attributes::HIDDEN | Attributes::SYSTEM | Attributes::VOLUME_ID,
        )
    }

    pub fn is_dot(&self) -> bool {
        self.short_name.is_dot()
    }

    pub fn is_dot_dot(&self) -> bool {
        self.short_name.is_dot_dot()
    }

    pub fn first_cluster(&self) -> u32 {
        self.first_cluster as u32
    }

    pub fn set_start_cluster(&mut self, cluster: u32) {
        debug_assert!(cluster <= u16::MAX as u32);
        self.first_cluster = cluster as u16;
        self.dirty = true;
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn set_length(&mut self, length: u32) {
        self.length = length;
        self.dirty = true;
    }

    pub fn short_name(&self) -> &ShortName {
        &self.short_name
    }

    pub fn set_short_name(&mut self, short_name: ShortName) {
        self.short_name = short_name;
        self.dirty = true;
    }

    pub fn akai_part(&self) -> &AkaiPart {
        &self.akai_part
    }

    pub fn set_akai_part(&mut self, akai_part: AkaiPart) {
        self.akai_part = akai_part;
        self.dirty = true;
    }

    /// The case-preserved, up-to-16.3 logical filename: the short-name
    /// stem, the Akai part, and (when present) a `.` plus the extension.
    pub fn akai_name(&self) -> String {
        let mut name = String::with_capacity(20);
        name.push_str(self.short_name.stem_trimmed());
        name.push_str(self.akai_part.trimmed());
        let ext = self.short_name.ext_trimmed();
        if !ext.is_empty() {
            name.push('.');
            name.push_str(ext);
        }
        name
    }
}

impl ShortName {
    /// Builds a volume-label short name: unlike [`ShortName::from_parts`]
    /// this does not reject illegal filename punctuation, since volume
    /// labels live outside the name-collision rules of a directory.
    pub(crate) fn from_parts_relaxed(stem: &str, ext: &str) -> ShortName {
        ShortName::from_parts(stem, ext).unwrap_or_else(|_| {
            let mut name = [b' '; 8];
            let stem_bytes = stem.as_bytes();
            let n = stem_bytes.len().min(8);
            name[..n].copy_from_slice(&stem_bytes[..n]);
            let mut ext_bytes = [b' '; 3];
            let eb = ext.as_bytes();
            let m = eb.len().min(3);
            ext_bytes[..m].copy_from_slice(&eb[..m]);
            ShortName::from_raw_parts(name, ext_bytes)
        })
    }
}

/// Splits a pre-dot filename component (up to 16 characters) into an 8
/// byte short-name stem and an up-to-8-byte Akai part.
pub fn split_stem(stem: &str) -> Result<(String, String)> {
    if stem.is_empty() || stem.len() > 16 {
        return Err(Error::NameTooLong);
    }
    if stem.len() <= 8 {
        Ok((stem.to_string(), String::new()))
    } else {
        Ok((stem[..8].to_string(), stem[8..].to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_raw_bytes() {
        let short_name = ShortName::from_parts("LONGSAMP", "SND").unwrap();
        let akai_part = AkaiPart::from_str("LENAME").unwrap();
        let mut entry = DirEntry::new(short_name, akai_part, Attributes::ARCHIVE);
        entry.set_start_cluster(5);
        entry.set_length(1000);

        let mut raw = [0u8; DIR_ENTRY_SIZE];
        entry.serialize(&mut raw);
        assert!(!entry.is_dirty());

        let parsed = DirEntry::parse(&raw).unwrap();
        assert_eq!(parsed.akai_name(), "LONGSAMPLENAME.SND");
        assert_eq!(parsed.first_cluster(), 5);
        assert_eq!(parsed.length(), 1000);
        assert_eq!(raw[20..26], [0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn split_stem_short_and_long() {
        assert_eq!(split_stem("TEST1").unwrap(), ("TEST1".to_string(), String::new()));
        assert_eq!(
            split_stem("LONGSAMPLENAME").unwrap(),
            ("LONGSAMP".to_string(), "LENAME".to_string())
        );
        assert!(split_stem(&"X".repeat(17)).is_err());
    }

    #[test]
    fn attribute_predicates() {
        let e = DirEntry::new(ShortName::from_parts("SUB1", "").unwrap(), AkaiPart::EMPTY, Attributes::DIRECTORY);
        assert!(e.is_directory());
        assert!(!e.is_file());
        assert!(!e.is_volume_label());
    }
}
