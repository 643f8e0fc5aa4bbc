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

//! The 8.3 "short name" stored in bytes `[0, 11)` of a directory entry.
//!
//! Unlike stock FAT, this variant does not force uppercase: the stem and
//! extension are stored and read back byte-for-byte, since they contribute
//! to the case-preserved 16.3 Akai name (§4.7).

use akaifat_error::{Error, Result};

use crate::{ENTRY_DELETED, ENTRY_DELETED_ESCAPE};

const ILLEGAL: &[u8] = &[
    0x22, 0x2A, 0x2B, 0x2C, 0x2E, 0x2F, 0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F, 0x5B, 0x5C, 0x5D, 0x7C,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortName {
    name: [u8; 8],
    ext: [u8; 3],
}

impl ShortName {
    pub const DOT: ShortName = ShortName {
        name: [b'.', b' ', b' ', b' ', b' ', b' ', b' ', b' '],
        ext: [b' ', b' ', b' '],
    };

    pub const DOT_DOT: ShortName = ShortName {
        name: [b'.', b'.', b' ', b' ', b' ', b' ', b' ', b' '],
        ext: [b' ', b' ', b' '],
    };

    /// Builds a short name from a bare stem and extension (no separating
    /// dot), validating length and character set. `"."`/`".."` must be
    /// built via [`ShortName::DOT`]/[`ShortName::DOT_DOT`], not this path.
    pub fn from_parts(stem: &str, ext: &str) -> Result<ShortName> {
        if stem.is_empty() || stem.len() > 8 || ext.len() > 3 {
            return Err(Error::NameTooLong);
        }
        if stem == "." || stem == ".." {
            return Err(Error::InvalidName);
        }
        if !stem.bytes().all(is_legal_char) || !ext.bytes().all(is_legal_char) {
            return Err(Error::InvalidName);
        }
        if stem.as_bytes()[0] == b' ' {
            return Err(Error::InvalidName);
        }

        let mut name = [b' '; 8];
        name[..stem.len()].copy_from_slice(stem.as_bytes());
        let mut ext_bytes = [b' '; 3];
        ext_bytes[..ext.len()].copy_from_slice(ext.as_bytes());
        Ok(ShortName {
            name,
            ext: ext_bytes,
        })
    }

    /// Parses the 11 raw bytes of a live (non-terminator, non-deleted)
    /// directory entry, restoring a leading `0x05` escape back to `0xE5`.
    pub fn parse(raw: &[u8]) -> Result<ShortName> {
        let mut name = [0u8; 8];
        name.copy_from_slice(&raw[0..8]);
        let mut ext = [0u8; 3];
        ext.copy_from_slice(&raw[8..11]);
        if name[0] == ENTRY_DELETED_ESCAPE {
            name[0] = ENTRY_DELETED;
        }
        Ok(ShortName { name, ext })
    }

    /// Serializes into 11 raw bytes, escaping a leading `0xE5` to `0x05` so
    /// it is not mistaken for the deleted-entry marker.
    pub fn serialize(&self, out: &mut [u8]) {
        let mut name = self.name;
        if name[0] == ENTRY_DELETED {
            name[0] = ENTRY_DELETED_ESCAPE;
        }
        out[0..8].copy_from_slice(&name);
        out[8..11].copy_from_slice(&self.ext);
    }

    pub fn stem_trimmed(&self) -> &str {
        trim_ascii(&self.name)
    }

    pub fn ext_trimmed(&self) -> &str {
        trim_ascii(&self.ext)
    }

    pub fn is_dot(&self) -> bool {
        *self == ShortName::DOT
    }

    pub fn is_dot_dot(&self) -> bool {
        *self == ShortName::DOT_DOT
    }

    /// Builds a short name directly from padded 8- and 3-byte fields,
    /// bypassing character-set validation. Used for volume labels, which
    /// are not subject to filename collision rules.
    pub(crate) fn from_raw_parts(name: [u8; 8], ext: [u8; 3]) -> ShortName {
        ShortName { name, ext }
    }
}

fn trim_ascii(raw: &[u8]) -> &str {
    let end = raw.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    std::str::from_utf8(&raw[..end]).unwrap_or("")
}

fn is_legal_char(b: u8) -> bool {
    if b < 0x20 {
        return b == ENTRY_DELETED_ESCAPE;
    }
    !ILLEGAL.contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ordinary_name() {
        let sn = ShortName::from_parts("LONGSAMP", "SND").unwrap();
        let mut raw = [0u8; 11];
        sn.serialize(&mut raw);
        let parsed = ShortName::parse(&raw).unwrap();
        assert_eq!(parsed, sn);
        assert_eq!(parsed.stem_trimmed(), "LONGSAMP");
        assert_eq!(parsed.ext_trimmed(), "SND");
    }

    #[test]
    fn leading_e5_escape_round_trips() {
        let mut raw = [b' '; 11];
        raw[0] = ENTRY_DELETED;
        let sn = ShortName {
            name: {
                let mut n = [b' '; 8];
                n[0] = ENTRY_DELETED;
                n
            },
            ext: [b' '; 3],
        };
        let mut serialized = [0u8; 11];
        sn.serialize(&mut serialized);
        assert_eq!(serialized[0], ENTRY_DELETED_ESCAPE);
        let parsed = ShortName::parse(&serialized).unwrap();
        assert_eq!(parsed.name[0], ENTRY_DELETED);
    }

    #[test]
    fn rejects_illegal_characters() {
        assert!(ShortName::from_parts("A*B", "SND").is_err());
        assert!(ShortName::from_parts("A.B", "SND").is_err());
    }

    #[test]
    fn rejects_leading_space() {
        assert!(ShortName::from_parts(" AB", "SND").is_err());
    }
}
