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

//! The eight-byte Akai name extension occupying offsets `[12, 20)` of a
//! directory entry, in the bytes the FAT spec reserves for long-filename
//! bookkeeping. Combined with the short name it forms a 16.3,
//! case-preserved logical filename.

use akaifat_error::{Error, Result};

const LEN: usize = 8;

fn is_valid_char(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'!'
            | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'-'
            | b'0'..=b'9'
            | b'@'
            | b'A'..=b'Z'
            | b'_'
            | b'a'..=b'z'
            | b'{'
            | b'}'
            | b'~'
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AkaiPart(pub [u8; LEN]);

impl AkaiPart {
    pub const EMPTY: AkaiPart = AkaiPart([b' '; LEN]);

    /// Builds a part from a trimmed name fragment of at most 8 characters.
    pub fn from_str(s: &str) -> Result<AkaiPart> {
        if s.len() > LEN {
            return Err(Error::NameTooLong);
        }
        if !s.bytes().all(is_valid_char) {
            return Err(Error::InvalidName);
        }
        let mut raw = [b' '; LEN];
        raw[..s.len()].copy_from_slice(s.as_bytes());
        Ok(AkaiPart(raw))
    }

    /// Decodes the raw 8 bytes of a directory entry. Any byte outside the
    /// valid set collapses the whole part to all-spaces rather than
    /// failing, since a foreign LFN fragment can land here on read.
    pub fn parse(raw: &[u8]) -> AkaiPart {
        let mut bytes = [0u8; LEN];
        bytes.copy_from_slice(&raw[..LEN]);
        if bytes.iter().all(|&b| is_valid_char(b)) {
            AkaiPart(bytes)
        } else {
            AkaiPart::EMPTY
        }
    }

    pub fn serialize(&self, out: &mut [u8]) {
        out[..LEN].copy_from_slice(&self.0);
    }

    pub fn trimmed(&self) -> &str {
        let end = self.0.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        std::str::from_utf8(&self.0[..end]).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.trimmed().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_part_round_trips() {
        let part = AkaiPart::from_str("LENAME").unwrap();
        let mut raw = [0u8; LEN];
        part.serialize(&mut raw);
        assert_eq!(AkaiPart::parse(&raw), part);
        assert_eq!(part.trimmed(), "LENAME");
    }

    #[test]
    fn invalid_byte_collapses_to_empty() {
        let raw = [b'A', b'B', 0x00, b' ', b' ', b' ', b' ', b' '];
        assert_eq!(AkaiPart::parse(&raw), AkaiPart::EMPTY);
    }

    #[test]
    fn from_str_rejects_too_long() {
        assert!(AkaiPart::from_str("TOOLONGGG").is_err());
    }

    #[test]
    fn from_str_rejects_invalid_char() {
        assert!(AkaiPart::from_str("BAD/NAME").is_err());
    }
}
