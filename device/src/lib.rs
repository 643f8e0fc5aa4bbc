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

//! The single collaborator the akaifat driver requires from its host: a
//! byte-addressable, sector-aligned block store.
//!
//! Implementations are free to back this with a raw volume, a disk image, a
//! RAM disk or anything else; the driver performs its own alignment and
//! never assumes a particular backing medium.

use akaifat_error::Result;

pub trait BlockDevice {
    /// Total size of the device in bytes.
    fn size(&self) -> u64;

    /// Sector size in bytes. Always one of 512, 1024, 2048 or 4096.
    fn sector_size(&self) -> u32;

    /// Reads `dst.len()` bytes starting at `offset`.
    ///
    /// Implementations must fail with `DeviceOutOfRange` when
    /// `offset + dst.len()` exceeds [`BlockDevice::size`].
    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<()>;

    /// Writes `src` starting at `offset`.
    ///
    /// Implementations must fail with `ReadOnlyDevice` when
    /// [`BlockDevice::is_read_only`] is true, and with `DeviceOutOfRange`
    /// when `offset + src.len()` exceeds [`BlockDevice::size`].
    fn write(&self, offset: u64, src: &[u8]) -> Result<()>;

    /// Flushes any buffering the implementation performs below this trait.
    fn flush(&self) -> Result<()>;

    /// Releases the underlying resource. No further calls are made after
    /// this returns.
    fn close(&self) -> Result<()>;

    fn is_read_only(&self) -> bool;
}

/// Range-checks a read/write span against a device's size, the way every
/// [`BlockDevice`] implementation is expected to before touching its
/// backing store.
pub fn check_span(device_size: u64, offset: u64, len: usize) -> Result<()> {
    let end = offset
        .checked_add(len as u64)
        .ok_or(akaifat_error::Error::DeviceOutOfRange)?;
    if end > device_size {
        return Err(akaifat_error::Error::DeviceOutOfRange);
    }
    Ok(())
}
