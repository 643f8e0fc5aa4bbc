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

//! Little-endian integer pack/unpack on byte slices.
//!
//! These are the only functions in the crate permitted to interpret raw
//! on-disk bytes as integers; every other module goes through them.

use akaifat_error::{Error, Result};

pub fn get_u8(buf: &[u8], offset: usize) -> u8 {
    buf[offset]
}

pub fn set_u8(buf: &mut [u8], offset: usize, value: u8) {
    buf[offset] = value;
}

pub fn get_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

pub fn set_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn get_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

pub fn set_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Writes a 32-bit field from a value that may have come from a wider
/// (`usize`/`u64`) computation, failing rather than silently truncating.
pub fn set_u32_checked(buf: &mut [u8], offset: usize, value: u64) -> Result<()> {
    if value > u32::MAX as u64 {
        return Err(Error::ValueOutOfRange);
    }
    set_u32(buf, offset, value as u32);
    Ok(())
}
