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

//! The top-level façade: opens a [`BlockDevice`], validates its FAT copies
//! against each other, and exposes path-based file and directory access
//! rooted at the fixed root directory.

use std::cell::RefCell;
use std::rc::Rc;

use akaifat_device::BlockDevice;
use akaifat_error::{Error, Result};
use log::{info, warn};

use crate::{
    boot_sector::BootSector, cluster_chain::ClusterChain, directory::Directory, fat_table::Fat,
    lfn::LfnDirectory, File,
};

/// Controls how [`FileSystem::open`] treats the device and its redundant
/// FAT copies.
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    /// Open for read-only access even if the device permits writes.
    pub read_only: bool,
    /// Compare every FAT copy against the first and fail with
    /// [`Error::FatMismatch`] on divergence. On by default: a silently
    /// diverged backup FAT is exactly the kind of corruption this check
    /// exists to catch early.
    pub check_fat_copies: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        OpenOptions {
            read_only: false,
            check_fat_copies: true,
        }
    }
}

/// An open Akai FAT12/FAT16 volume.
pub struct FileSystem {
    device: Rc<dyn BlockDevice>,
    boot_sector: BootSector,
    fat: Rc<RefCell<Fat>>,
    fat_copy_count: u32,
    sectors_per_fat: u32,
    read_only: bool,
    root_offset: u64,
    root_capacity: u32,
    data_offset: u64,
    cluster_size: u32,
    root: LfnDirectory,
    closed: bool,
}

impl FileSystem {
    pub fn open(device: Rc<dyn BlockDevice>, options: OpenOptions) -> Result<FileSystem> {
        if !options.read_only && device.is_read_only() {
            return Err(Error::ReadOnlyDevice);
        }
        let read_only = options.read_only || device.is_read_only();

        let boot_sector = BootSector::read(&*device)?;
        let fat_type = boot_sector.fat_type()?;
        let entry_count = boot_sector.data_cluster_count() + crate::FIRST_CLUSTER;
        let sectors_per_fat = boot_sector.sectors_per_fat();
        let bytes_per_sector = boot_sector.bytes_per_sector();
        let fat_copy_count = boot_sector.fat_count();

        let primary = Fat::read(
            &*device,
            boot_sector.fat_offset(0),
            sectors_per_fat,
            bytes_per_sector,
            fat_type,
            entry_count,
        )?;

        if options.check_fat_copies {
            for i in 1..fat_copy_count {
                let copy = Fat::read(
                    &*device,
                    boot_sector.fat_offset(i),
                    sectors_per_fat,
                    bytes_per_sector,
                    fat_type,
                    entry_count,
                )?;
                if copy != primary {
                    warn!("FAT copy {i} diverges from the primary copy");
                    return Err(Error::FatMismatch);
                }
            }
        }

        let fat = Rc::new(RefCell::new(primary));
        let root_offset = boot_sector.root_dir_offset();
        let root_capacity = boot_sector.root_dir_entry_count();
        let data_offset = boot_sector.files_offset();
        let cluster_size = boot_sector.bytes_per_cluster();

        let root_dir = Directory::root(device.clone(), root_offset, root_capacity, read_only)?;
        let root = LfnDirectory::new(root_dir, fat.clone(), device.clone(), cluster_size, data_offset, read_only, 0);

        info!(
            "opened {:?} volume: {} data clusters, {} bytes/cluster",
            fat_type,
            boot_sector.data_cluster_count(),
            cluster_size
        );

        Ok(FileSystem {
            device,
            boot_sector,
            fat,
            fat_copy_count,
            sectors_per_fat,
            read_only,
            root_offset,
            root_capacity,
            data_offset,
            cluster_size,
            root,
            closed: false,
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::AlreadyClosed)
        } else {
            Ok(())
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn volume_label(&self) -> Option<String> {
        self.boot_sector.volume_label()
    }

    pub fn set_volume_label(&mut self, label: &str) -> Result<()> {
        self.check_open()?;
        if self.read_only {
            return Err(Error::ReadOnlyFilesystem);
        }
        self.boot_sector.set_volume_label(label)
    }

    /// Total bytes reachable in unallocated clusters.
    pub fn free_space(&self) -> u64 {
        self.fat.borrow().free_cluster_count() as u64 * self.cluster_size as u64
    }

    /// Total bytes addressable by the data region, whether free or not.
    pub fn usable_space(&self) -> u64 {
        self.boot_sector.data_cluster_count() as u64 * self.cluster_size as u64
    }

    fn root_directory(&self) -> Result<&LfnDirectory> {
        self.check_open()?;
        Ok(&self.root)
    }

    fn open_subdirectory(&self, start_cluster: u32) -> Result<LfnDirectory> {
        let chain = ClusterChain::new(
            self.fat.clone(),
            self.device.clone(),
            start_cluster,
            self.cluster_size,
            self.data_offset,
            self.read_only,
        );
        let directory = Directory::chain(chain, self.read_only)?;
        Ok(LfnDirectory::new(
            directory,
            self.fat.clone(),
            self.device.clone(),
            self.cluster_size,
            self.data_offset,
            self.read_only,
            start_cluster,
        ))
    }

    /// Resolves every path component but the last, returning the directory
    /// view it lives in and its bare name.
    fn navigate(&self, path: &str) -> Result<(LfnDirectory, String)> {
        self.check_open()?;
        let mut components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
        let name = components.pop().ok_or(Error::InvalidName)?.to_string();

        let current = self.root_directory()?;
        if components.is_empty() {
            // Clone shares the same backing Directory and Fat, so writes
            // made through this handle still land on the live root.
            return Ok((current.clone(), name));
        }

        let mut dir: LfnDirectory = {
            let entry = current.entry(components[0]).ok_or(Error::ObjectInvalid)?;
            if !entry.is_directory() {
                return Err(Error::ObjectInvalid);
            }
            self.open_subdirectory(entry.first_cluster())?
        };

        for comp in &components[1..] {
            let entry = dir.entry(comp).ok_or(Error::ObjectInvalid)?;
            if !entry.is_directory() {
                return Err(Error::ObjectInvalid);
            }
            dir = self.open_subdirectory(entry.first_cluster())?;
        }

        Ok((dir, name))
    }

    pub fn create_file(&self, path: &str) -> Result<File> {
        let (dir, name) = self.navigate(path)?;
        dir.add_file(&name)?;
        dir.open_file(&name)
    }

    pub fn open_file(&self, path: &str) -> Result<File> {
        let (dir, name) = self.navigate(path)?;
        dir.open_file(&name)
    }

    pub fn create_dir(&self, path: &str) -> Result<()> {
        let (dir, name) = self.navigate(path)?;
        dir.add_directory(&name)
    }

    pub fn remove(&self, path: &str) -> Result<()> {
        let (dir, name) = self.navigate(path)?;
        dir.remove(&name)
    }

    pub fn rename(&self, old_path: &str, new_name: &str) -> Result<()> {
        let (dir, old_name) = self.navigate(old_path)?;
        dir.rename(&old_name, new_name)
    }

    /// Moves an entry to another directory, possibly renaming it, by path.
    pub fn move_to(&self, old_path: &str, new_path: &str) -> Result<()> {
        let (source_dir, old_name) = self.navigate(old_path)?;
        let (target_dir, new_name) = self.navigate(new_path)?;
        source_dir.move_to(&old_name, &target_dir, &new_name)
    }

    pub fn list_root(&self) -> Result<Vec<String>> {
        Ok(self.root_directory()?.names())
    }

    /// Writes the boot sector, every FAT copy, and the root directory back
    /// to the device, in that order.
    pub fn flush(&mut self) -> Result<()> {
        self.check_open()?;
        if self.read_only {
            return Ok(());
        }

        self.boot_sector.write(&*self.device)?;

        let fat = self.fat.borrow();
        for i in 0..self.fat_copy_count {
            fat.write_copy(
                &*self.device,
                self.boot_sector.fat_offset(i),
                self.sectors_per_fat,
                self.boot_sector.bytes_per_sector(),
            )?;
        }
        drop(fat);

        self.root.flush()?;
        self.device.flush()?;
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.flush()?;
        self.device.close()?;
        self.closed = true;
        Ok(())
    }

    pub fn root_capacity(&self) -> u32 {
        self.root_capacity
    }

    pub fn root_offset(&self) -> u64 {
        self.root_offset
    }
}

impl Drop for FileSystem {
    fn drop(&mut self) {
        if !self.closed && !self.read_only {
            if let Err(e) = self.flush() {
                warn!("failed to flush filesystem on drop: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot_sector::tests_support::formatted_image;
    use akaifat_device_std::MemoryBlockDevice;

    fn open_fixture() -> FileSystem {
        let image = formatted_image();
        let device: Rc<dyn BlockDevice> = Rc::new(MemoryBlockDevice::from_vec(image, 512));
        FileSystem::open(device, OpenOptions::default()).unwrap()
    }

    #[test]
    fn create_write_and_reopen_file() {
        let mut fs = open_fixture();
        {
            let mut file = fs.create_file("SAMPLE.SND").unwrap();
            file.write(b"hello akai").unwrap();
            file.flush().unwrap();
        }
        fs.flush().unwrap();
        assert!(fs.list_root().unwrap().contains(&"SAMPLE.SND".to_string()));

        let mut reopened = fs.open_file("SAMPLE.SND").unwrap();
        let mut buf = [0u8; 10];
        reopened.read(&mut buf).unwrap();
        assert_eq!(&buf, b"hello akai");
    }

    #[test]
    fn create_subdirectory_and_nested_file() {
        let fs = open_fixture();
        fs.create_dir("SOUNDS").unwrap();
        let mut file = fs.create_file("SOUNDS/LONGSAMPLENAME.SND").unwrap();
        file.write(b"data").unwrap();
        file.flush().unwrap();

        let mut reopened = fs.open_file("SOUNDS/LONGSAMPLENAME.SND").unwrap();
        let mut buf = [0u8; 4];
        reopened.read(&mut buf).unwrap();
        assert_eq!(&buf, b"data");
    }

    #[test]
    fn free_space_shrinks_after_allocation() {
        let fs = open_fixture();
        let before = fs.free_space();
        let mut file = fs.create_file("SAMPLE.SND").unwrap();
        file.write(&[0u8; 4096]).unwrap();
        file.flush().unwrap();
        assert!(fs.free_space() < before);
    }

    #[test]
    fn remove_nonexistent_file_is_idempotent() {
        let fs = open_fixture();
        fs.remove("MISSING.SND").unwrap();
        fs.remove("MISSING.SND").unwrap();
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let fs = open_fixture();
        fs.create_file("TEST1.SND").unwrap();
        assert!(fs.open_file("test1.snd").is_ok());
    }

    #[test]
    fn move_to_crosses_directories() {
        let fs = open_fixture();
        fs.create_dir("SOUNDS").unwrap();
        let mut file = fs.create_file("SAMPLE.SND").unwrap();
        file.write(b"data").unwrap();
        file.flush().unwrap();

        fs.move_to("SAMPLE.SND", "SOUNDS/MOVED.SND").unwrap();

        assert!(fs.open_file("SAMPLE.SND").is_err());
        let mut moved = fs.open_file("SOUNDS/MOVED.SND").unwrap();
        let mut buf = [0u8; 4];
        moved.read(&mut buf).unwrap();
        assert_eq!(&buf, b"data");
    }
}
