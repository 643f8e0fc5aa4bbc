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

//! The first sector of the volume: BPB fields plus the derived geometry
//! queries every other layer is built on.

use akaifat_device::BlockDevice;
use akaifat_error::{Error, Result};
use log::warn;

use crate::{codec, fat_table::FatType, MAX_CLUSTER_FAT12, MAX_CLUSTER_FAT16};

const BOOT_SECTOR_SIZE: usize = 512;

const OFF_BYTES_PER_SECTOR: usize = 11;
const OFF_SECTORS_PER_CLUSTER: usize = 13;
const OFF_RESERVED_SECTORS: usize = 14;
const OFF_FAT_COUNT: usize = 16;
const OFF_ROOT_ENTRY_COUNT: usize = 17;
const OFF_TOTAL_SECTORS_16: usize = 19;
const OFF_MEDIA: usize = 21;
const OFF_SECTORS_PER_FAT_16: usize = 22;
const OFF_TOTAL_SECTORS_32: usize = 32;
const OFF_VOLUME_LABEL: usize = 43;
const VOLUME_LABEL_LEN: usize = 11;
const OFF_SIGNATURE: usize = 510;

/// Boot sector (BPB) of the volume, buffered in memory and written back to
/// the device only when dirty.
#[derive(Debug, Clone)]
pub struct BootSector {
    raw: [u8; BOOT_SECTOR_SIZE],
    dirty: bool,
}

impl BootSector {
    /// Reads and validates the boot sector at device offset 0.
    pub fn read(device: &dyn BlockDevice) -> Result<Self> {
        let mut raw = [0u8; BOOT_SECTOR_SIZE];
        device.read(0, &mut raw)?;
        let bs = Self { raw, dirty: false };
        bs.validate()?;
        Ok(bs)
    }

    fn validate(&self) -> Result<()> {
        if self.raw[OFF_SIGNATURE] != 0x55 || self.raw[OFF_SIGNATURE + 1] != 0xAA {
            return Err(Error::BadSignature);
        }

        let bytes_per_sector = self.bytes_per_sector();
        if !matches!(bytes_per_sector, 512 | 1024 | 2048 | 4096) {
            warn!("unsupported bytes-per-sector value {bytes_per_sector}");
            return Err(Error::InvalidBootSector);
        }

        let sectors_per_cluster = self.sectors_per_cluster();
        if sectors_per_cluster == 0 || !sectors_per_cluster.is_power_of_two() {
            warn!("sectors-per-cluster {sectors_per_cluster} is not a power of two");
            return Err(Error::InvalidBootSector);
        }

        if self.reserved_sectors() < 1 {
            return Err(Error::InvalidBootSector);
        }

        if self.fat_count() < 1 {
            return Err(Error::InvalidBootSector);
        }

        // Validates that the volume resolves to a supported FAT type.
        self.fat_type()?;

        Ok(())
    }

    /// Writes the boot sector back to the device; a no-op unless dirty.
    pub fn write(&mut self, device: &dyn BlockDevice) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        device.write(0, &self.raw)?;
        self.dirty = false;
        Ok(())
    }

    pub fn bytes_per_sector(&self) -> u32 {
        codec::get_u16(&self.raw, OFF_BYTES_PER_SECTOR) as u32
    }

    pub fn sectors_per_cluster(&self) -> u32 {
        codec::get_u8(&self.raw, OFF_SECTORS_PER_CLUSTER) as u32
    }

    pub fn reserved_sectors(&self) -> u32 {
        codec::get_u16(&self.raw, OFF_RESERVED_SECTORS) as u32
    }

    pub fn fat_count(&self) -> u32 {
        codec::get_u8(&self.raw, OFF_FAT_COUNT) as u32
    }

    pub fn root_dir_entry_count(&self) -> u32 {
        codec::get_u16(&self.raw, OFF_ROOT_ENTRY_COUNT) as u32
    }

    pub fn media(&self) -> u8 {
        codec::get_u8(&self.raw, OFF_MEDIA)
    }

    pub fn sectors_per_fat(&self) -> u32 {
        codec::get_u16(&self.raw, OFF_SECTORS_PER_FAT_16) as u32
    }

    pub fn total_sectors(&self) -> u32 {
        let total16 = codec::get_u16(&self.raw, OFF_TOTAL_SECTORS_16) as u32;
        if total16 != 0 {
            total16
        } else {
            codec::get_u32(&self.raw, OFF_TOTAL_SECTORS_32)
        }
    }

    /// Bytes-per-sector × reserved + FAT region + root directory region
    /// offset, i.e. the byte offset of FAT copy `i`.
    pub fn fat_offset(&self, i: u32) -> u64 {
        let bps = self.bytes_per_sector() as u64;
        (self.reserved_sectors() as u64 + i as u64 * self.sectors_per_fat() as u64) * bps
    }

    pub fn root_dir_sector_count(&self) -> u32 {
        let bps = self.bytes_per_sector();
        let bytes = self.root_dir_entry_count() * crate::DIR_ENTRY_SIZE as u32;
        bytes.div_ceil(bps)
    }

    pub fn root_dir_offset(&self) -> u64 {
        self.fat_offset(0) + self.fat_count() as u64 * self.sectors_per_fat() as u64 * self.bytes_per_sector() as u64
    }

    pub fn files_offset(&self) -> u64 {
        self.root_dir_offset() + self.root_dir_entry_count() as u64 * crate::DIR_ENTRY_SIZE as u64
    }

    pub fn bytes_per_cluster(&self) -> u32 {
        self.bytes_per_sector() * self.sectors_per_cluster()
    }

    pub fn data_cluster_count(&self) -> u32 {
        let reserved = self.reserved_sectors();
        let fat_sectors = self.fat_count() * self.sectors_per_fat();
        let root_sectors = self.root_dir_sector_count();
        let data_sectors = self
            .total_sectors()
            .saturating_sub(reserved)
            .saturating_sub(fat_sectors)
            .saturating_sub(root_sectors);
        data_sectors / self.sectors_per_cluster().max(1)
    }

    pub fn fat_type(&self) -> Result<FatType> {
        let clusters = self.data_cluster_count();
        if clusters <= MAX_CLUSTER_FAT12 {
            Ok(FatType::Fat12)
        } else if clusters <= MAX_CLUSTER_FAT16 {
            Ok(FatType::Fat16)
        } else {
            Err(Error::UnsupportedFatType)
        }
    }

    pub fn volume_label(&self) -> Option<String> {
        let raw = &self.raw[OFF_VOLUME_LABEL..OFF_VOLUME_LABEL + VOLUME_LABEL_LEN];
        let trimmed = std::str::from_utf8(raw).ok()?.trim_end();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    pub fn set_volume_label(&mut self, label: &str) -> Result<()> {
        if label.len() > VOLUME_LABEL_LEN || !label.is_ascii() {
            return Err(Error::InvalidLabel);
        }
        let field = &mut self.raw[OFF_VOLUME_LABEL..OFF_VOLUME_LABEL + VOLUME_LABEL_LEN];
        field.fill(b' ');
        field[..label.len()].copy_from_slice(label.as_bytes());
        self.dirty = true;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn formatted_raw() -> [u8; BOOT_SECTOR_SIZE] {
        let mut raw = [0u8; BOOT_SECTOR_SIZE];
        codec::set_u16(&mut raw, OFF_BYTES_PER_SECTOR, 512);
        codec::set_u8(&mut raw, OFF_SECTORS_PER_CLUSTER, 4);
        codec::set_u16(&mut raw, OFF_RESERVED_SECTORS, 1);
        codec::set_u8(&mut raw, OFF_FAT_COUNT, 2);
        codec::set_u16(&mut raw, OFF_ROOT_ENTRY_COUNT, 512);
        // 16 MiB / 512 bytes per sector
        codec::set_u32(&mut raw, OFF_TOTAL_SECTORS_32, 16 * 1024 * 1024 / 512);
        codec::set_u8(&mut raw, OFF_MEDIA, 0xF8);
        codec::set_u16(&mut raw, OFF_SECTORS_PER_FAT_16, 16);
        raw[OFF_VOLUME_LABEL..OFF_VOLUME_LABEL + VOLUME_LABEL_LEN].copy_from_slice(b"AKAI       ");
        raw[OFF_SIGNATURE] = 0x55;
        raw[OFF_SIGNATURE + 1] = 0xAA;
        raw
    }

    #[test]
    fn rejects_bad_signature() {
        let mut raw = formatted_raw();
        raw[OFF_SIGNATURE] = 0;
        let bs = BootSector { raw, dirty: false };
        assert!(matches!(bs.validate(), Err(Error::BadSignature)));
    }

    #[test]
    fn computes_geometry() {
        let bs = BootSector {
            raw: formatted_raw(),
            dirty: false,
        };
        assert!(bs.validate().is_ok());
        assert_eq!(bs.bytes_per_cluster(), 2048);
        assert_eq!(bs.root_dir_offset(), bs.fat_offset(0) + 2 * 16 * 512);
        assert_eq!(bs.files_offset(), bs.root_dir_offset() + 512 * 32);
        assert_eq!(bs.fat_type().unwrap(), FatType::Fat16);
    }

    #[test]
    fn volume_label_round_trips() {
        let mut bs = BootSector {
            raw: formatted_raw(),
            dirty: false,
        };
        assert_eq!(bs.volume_label().as_deref(), Some("AKAI"));
        bs.set_volume_label("SAMPLER").unwrap();
        assert_eq!(bs.volume_label().as_deref(), Some("SAMPLER"));
    }
}
