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

//! A directory view indexed by logical (16.3 Akai) name rather than by raw
//! slot, and the cached [`File`]/subdirectory handles it hands out.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use akaifat_device::BlockDevice;
use akaifat_error::{Error, Result};

use crate::{
    cluster_chain::ClusterChain,
    directory::Directory,
    entry::{split_stem, Attributes, DirEntry},
    fat_table::Fat,
    File,
};

/// A handle that can be invalidated out from under its holder: once the
/// owning entry is removed, renamed away, or the filesystem is closed, the
/// `valid` flag flips and every further call fails with `ObjectInvalid`.
#[derive(Clone)]
pub struct Validity(Rc<Cell<bool>>);

impl Validity {
    pub fn new() -> Validity {
        Validity(Rc::new(Cell::new(true)))
    }

    pub fn check(&self) -> Result<()> {
        if self.0.get() {
            Ok(())
        } else {
            Err(Error::ObjectInvalid)
        }
    }

    pub fn invalidate(&self) {
        self.0.set(false);
    }
}

impl Default for Validity {
    fn default() -> Self {
        Validity::new()
    }
}

/// A directory's contents addressed by logical name. The backing
/// [`Directory`] is shared (`Rc<RefCell<_>>`) so that clones of this view
/// (handed out for every path lookup) and [`File`]s opened from it all see
/// and mutate the same live slot array; name lookups are resolved by
/// scanning that shared directory directly rather than through a cache a
/// clone could let go stale.
#[derive(Clone)]
pub struct LfnDirectory {
    directory: Rc<RefCell<Directory>>,
    fat: Rc<RefCell<Fat>>,
    device: Rc<dyn BlockDevice>,
    cluster_size: u32,
    data_offset: u64,
    read_only: bool,
    own_start_cluster: u32,
    validity: Validity,
}

impl LfnDirectory {
    pub fn new(
        directory: Directory,
        fat: Rc<RefCell<Fat>>,
        device: Rc<dyn BlockDevice>,
        cluster_size: u32,
        data_offset: u64,
        read_only: bool,
        own_start_cluster: u32,
    ) -> LfnDirectory {
        LfnDirectory {
            directory: Rc::new(RefCell::new(directory)),
            fat,
            device,
            cluster_size,
            data_offset,
            read_only,
            own_start_cluster,
            validity: Validity::new(),
        }
    }

    pub fn validity(&self) -> Validity {
        self.validity.clone()
    }

    /// Lookup key for a logical name: trimmed and lowercased, so that
    /// `"TEST1.SND"` and `" test1.snd "` name the same entry.
    fn normalize(name: &str) -> String {
        name.trim().to_ascii_lowercase()
    }

    fn find_slot(&self, name: &str) -> Option<usize> {
        let needle = Self::normalize(name);
        self.directory
            .borrow()
            .entries()
            .find(|(_, e)| {
                !e.is_dot() && !e.is_dot_dot() && !e.is_volume_label() && Self::normalize(&e.akai_name()) == needle
            })
            .map(|(slot, _)| slot)
    }

    /// Logical names of every live, non-dot entry, in slot order.
    pub fn names(&self) -> Vec<String> {
        let directory = self.directory.borrow();
        let mut pairs: Vec<(usize, String)> = directory
            .entries()
            .filter(|(_, e)| !e.is_dot() && !e.is_dot_dot() && !e.is_volume_label())
            .map(|(slot, e)| (slot, e.akai_name()))
            .collect();
        pairs.sort_by_key(|(slot, _)| *slot);
        pairs.into_iter().map(|(_, n)| n).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find_slot(name).is_some()
    }

    pub fn entry(&self, name: &str) -> Option<DirEntry> {
        let slot = self.find_slot(name)?;
        self.directory.borrow().entry_at(slot).cloned()
    }

    fn new_cluster_chain(&self, start: u32) -> ClusterChain {
        ClusterChain::new(
            self.fat.clone(),
            self.device.clone(),
            start,
            self.cluster_size,
            self.data_offset,
            self.read_only,
        )
    }

    fn split_name(name: &str) -> (&str, &str) {
        name.rsplit_once('.').unwrap_or((name, ""))
    }

    /// Splits a logical name into the `ShortName`/`AkaiPart` pair a
    /// directory entry stores, trimming surrounding whitespace first.
    fn name_parts(name: &str) -> Result<(crate::short_name::ShortName, crate::akai_part::AkaiPart)> {
        let name = name.trim();
        if name.is_empty() || name.len() > 20 {
            return Err(Error::NameTooLong);
        }
        let (stem_part, ext) = Self::split_name(name);
        if ext.len() > 3 {
            return Err(Error::NameTooLong);
        }
        let (short_stem, akai_fragment) = split_stem(stem_part)?;
        let short_name = crate::short_name::ShortName::from_parts(&short_stem, ext)?;
        let akai_part = crate::akai_part::AkaiPart::from_str(&akai_fragment)?;
        Ok((short_name, akai_part))
    }

    fn build_entry(&self, name: &str, attributes: Attributes) -> Result<DirEntry> {
        let (short_name, akai_part) = Self::name_parts(name)?;
        Ok(DirEntry::new(short_name, akai_part, attributes))
    }

    /// Adds a zero-length file entry named `name`.
    pub fn add_file(&self, name: &str) -> Result<()> {
        self.validity.check()?;
        if self.read_only {
            return Err(Error::ReadOnlyFilesystem);
        }
        if self.contains(name) {
            return Err(Error::NameInUse);
        }
        let entry = self.build_entry(name, Attributes::ARCHIVE)?;
        let mut directory = self.directory.borrow_mut();
        directory.add(entry)?;
        directory.flush()
    }

    /// Creates a subdirectory named `name` and seeds its `.`/`..` entries.
    pub fn add_directory(&self, name: &str) -> Result<()> {
        self.validity.check()?;
        if self.read_only {
            return Err(Error::ReadOnlyFilesystem);
        }
        if self.contains(name) {
            return Err(Error::NameInUse);
        }

        let placeholder = self.fat.borrow_mut().alloc_new()?;
        let mut sub = Directory::new_subdirectory(
            self.new_cluster_chain(placeholder),
            placeholder,
            self.own_start_cluster,
        )?;
        sub.flush()?;

        let mut entry = self.build_entry(name, Attributes::DIRECTORY)?;
        entry.set_start_cluster(placeholder);
        let mut directory = self.directory.borrow_mut();
        directory.add(entry)?;
        directory.flush()
    }

    /// Opens a live, read-write [`File`] view over an existing file entry.
    /// The returned handle writes its length back into this slot when
    /// flushed.
    pub fn open_file(&self, name: &str) -> Result<File> {
        self.validity.check()?;
        let slot = self.find_slot(name).ok_or(Error::ObjectInvalid)?;
        let directory = self.directory.borrow();
        let entry = directory.entry_at(slot).ok_or(Error::ObjectInvalid)?;
        if !entry.is_file() {
            return Err(Error::ObjectInvalid);
        }
        let chain = self.new_cluster_chain(entry.first_cluster());
        let length = entry.length();
        drop(directory);
        Ok(File::new(chain, length, self.read_only, self.directory.clone(), slot))
    }

    /// Removes a file or empty subdirectory by name. Removing a name that
    /// is not present is not an error: the end state the caller wants
    /// (the name is gone) already holds.
    pub fn remove(&self, name: &str) -> Result<()> {
        self.validity.check()?;
        if self.read_only {
            return Err(Error::ReadOnlyFilesystem);
        }
        let slot = match self.find_slot(name) {
            Some(slot) => slot,
            None => return Ok(()),
        };
        let (is_directory, first_cluster) = {
            let directory = self.directory.borrow();
            let entry = directory.entry_at(slot).ok_or(Error::ObjectInvalid)?;
            (entry.is_directory(), entry.first_cluster())
        };

        if is_directory {
            let child_chain = self.new_cluster_chain(first_cluster);
            let child = Directory::chain(child_chain, self.read_only)?;
            if !child.is_empty_of_content() {
                return Err(Error::DirectoryTooLarge);
            }
        }

        if first_cluster != 0 {
            let chain = self.fat.borrow().chain_of(first_cluster)?;
            let mut fat = self.fat.borrow_mut();
            for c in chain {
                fat.set_free(c);
            }
        }

        let mut directory = self.directory.borrow_mut();
        directory.remove(slot)?;
        directory.flush()
    }

    /// Renames an entry in place, keeping its slot and contents.
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.validity.check()?;
        if self.read_only {
            return Err(Error::ReadOnlyFilesystem);
        }
        if Self::normalize(old_name) == Self::normalize(new_name) {
            return Ok(());
        }
        if self.contains(new_name) {
            return Err(Error::NameInUse);
        }
        let slot = self.find_slot(old_name).ok_or(Error::ObjectInvalid)?;
        let (short_name, akai_part) = Self::name_parts(new_name)?;

        let mut directory = self.directory.borrow_mut();
        let entry = directory.entry_at_mut(slot).ok_or(Error::ObjectInvalid)?;
        entry.set_short_name(short_name);
        entry.set_akai_part(akai_part);
        directory.flush()
    }

    /// Moves an entry to another directory, optionally renaming it on the
    /// way. Uniqueness in `target` is checked before anything is mutated,
    /// so a rejected move leaves both directories untouched.
    pub fn move_to(&self, name: &str, target: &LfnDirectory, new_name: &str) -> Result<()> {
        self.validity.check()?;
        target.validity.check()?;
        if self.read_only || target.read_only {
            return Err(Error::ReadOnlyFilesystem);
        }
        if target.contains(new_name) {
            return Err(Error::NameInUse);
        }
        let slot = self.find_slot(name).ok_or(Error::ObjectInvalid)?;
        let (short_name, akai_part) = Self::name_parts(new_name)?;

        let source_entry = {
            let directory = self.directory.borrow();
            directory.entry_at(slot).ok_or(Error::ObjectInvalid)?.clone()
        };
        let mut moved = DirEntry::new(short_name, akai_part, source_entry.attributes());
        moved.set_start_cluster(source_entry.first_cluster());
        moved.set_length(source_entry.length());

        {
            let mut directory = self.directory.borrow_mut();
            directory.remove(slot)?;
            directory.flush()?;
        }
        {
            let mut directory = target.directory.borrow_mut();
            directory.add(moved)?;
            directory.flush()
        }
    }

    pub fn flush(&self) -> Result<()> {
        self.directory.borrow_mut().flush()
    }
}
