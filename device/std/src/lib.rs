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

//! Out-of-the-box [`BlockDevice`] implementations for hosts that have a
//! `std::fs::File` (a disk image, a `/dev` raw volume node, ...) or that
//! just want an in-memory volume for testing.

use std::{
    cell::RefCell,
    fs::{File, OpenOptions},
    io::ErrorKind,
    os::unix::fs::FileExt,
    path::Path,
};

use akaifat_device::{check_span, BlockDevice};
use akaifat_error::{Error, Result};
use log::debug;

/// A block device backed by a regular file or raw volume node, opened once
/// and accessed through positioned reads/writes so no seek state is shared
/// across calls.
pub struct FileBlockDevice {
    file: File,
    size: u64,
    sector_size: u32,
    read_only: bool,
}

impl FileBlockDevice {
    pub fn open<P: AsRef<Path>>(path: P, sector_size: u32) -> Result<Self> {
        Self::open_with_options(path, sector_size, false)
    }

    pub fn open_read_only<P: AsRef<Path>>(path: P, sector_size: u32) -> Result<Self> {
        Self::open_with_options(path, sector_size, true)
    }

    fn open_with_options<P: AsRef<Path>>(
        path: P,
        sector_size: u32,
        read_only: bool,
    ) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(!read_only)
            .open(path)?;
        let size = file.metadata()?.len();
        debug!("opened block device of {size} bytes (read_only={read_only})");
        Ok(Self {
            file,
            size,
            sector_size,
            read_only,
        })
    }
}

impl BlockDevice for FileBlockDevice {
    fn size(&self) -> u64 {
        self.size
    }

    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<()> {
        check_span(self.size, offset, dst.len())?;
        self.file.read_exact_at(dst, offset)?;
        Ok(())
    }

    fn write(&self, offset: u64, src: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnlyDevice);
        }
        check_span(self.size, offset, src.len())?;
        self.file.write_all_at(src, offset)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if self.read_only {
            return Ok(());
        }
        self.file.sync_data().or_else(|e| {
            // Some backing files (character devices) do not support fsync.
            if e.kind() == ErrorKind::InvalidInput {
                Ok(())
            } else {
                Err(e)
            }
        })?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

/// An entirely in-memory volume, useful for tests and for building an image
/// before committing it to a real device.
pub struct MemoryBlockDevice {
    data: RefCell<Vec<u8>>,
    sector_size: u32,
    read_only: bool,
}

impl MemoryBlockDevice {
    pub fn new(size: usize, sector_size: u32) -> Self {
        Self {
            data: RefCell::new(vec![0u8; size]),
            sector_size,
            read_only: false,
        }
    }

    pub fn from_vec(data: Vec<u8>, sector_size: u32) -> Self {
        Self {
            data: RefCell::new(data),
            sector_size,
            read_only: false,
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data.into_inner()
    }

    pub fn make_read_only(&mut self) {
        self.read_only = true;
    }
}

impl BlockDevice for MemoryBlockDevice {
    fn size(&self) -> u64 {
        self.data.borrow().len() as u64
    }

    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn read(&self, offset: u64, dst: &mut [u8]) -> Result<()> {
        let data = self.data.borrow();
        check_span(data.len() as u64, offset, dst.len())?;
        let start = offset as usize;
        dst.copy_from_slice(&data[start..start + dst.len()]);
        Ok(())
    }

    fn write(&self, offset: u64, src: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnlyDevice);
        }
        let mut data = self.data.borrow_mut();
        check_span(data.len() as u64, offset, src.len())?;
        let start = offset as usize;
        data[start..start + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}
