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

//! A directory's flat array of 32-byte slots, backed either by the fixed
//! root region or by a cluster chain. Slot position is the identity a
//! cache keys on; entries never move once written (removal frees the slot
//! in place rather than compacting the array).

use std::rc::Rc;

use akaifat_device::BlockDevice;
use akaifat_error::{Error, Result};

use crate::{
    cluster_chain::ClusterChain, entry::DirEntry, ENTRY_DELETED, ENTRY_END,
    DIR_ENTRY_SIZE, MAX_CLUSTER_CHAIN_DIRECTORY_SIZE,
};

/// Where a directory's entry array physically lives.
pub enum Backing {
    /// The fixed-size root directory region that precedes the data area.
    /// Cannot grow: once its slots are full, creating more entries fails.
    Root {
        device: Rc<dyn BlockDevice>,
        offset: u64,
        capacity: u32,
    },
    /// An ordinary subdirectory, stored in a growable cluster chain.
    Chain(ClusterChain),
}

pub struct Directory {
    backing: Backing,
    read_only: bool,
    slots: Vec<Option<DirEntry>>,
}

impl Directory {
    pub fn root(device: Rc<dyn BlockDevice>, offset: u64, capacity: u32, read_only: bool) -> Result<Directory> {
        let mut dir = Directory {
            backing: Backing::Root {
                device: device.clone(),
                offset,
                capacity,
            },
            read_only,
            slots: Vec::new(),
        };
        dir.reload()?;
        Ok(dir)
    }

    pub fn chain(chain: ClusterChain, read_only: bool) -> Result<Directory> {
        let mut dir = Directory {
            backing: Backing::Chain(chain),
            read_only,
            slots: Vec::new(),
        };
        dir.reload()?;
        Ok(dir)
    }

    /// Allocates a brand new one-cluster subdirectory and seeds it with the
    /// `.`/`..` entries.
    pub fn new_subdirectory(
        mut chain: ClusterChain,
        own_start_cluster: u32,
        parent_start_cluster: u32,
    ) -> Result<Directory> {
        chain.set_chain_length(1)?;
        let mut dir = Directory {
            backing: Backing::Chain(chain),
            read_only: false,
            slots: Vec::new(),
        };
        dir.reload()?;
        let dot_slot = dir.add(DirEntry::dot(own_start_cluster as u16))?;
        debug_assert_eq!(dot_slot, 0);
        let dot_dot_slot = dir.add(DirEntry::dot_dot(parent_start_cluster as u16))?;
        debug_assert_eq!(dot_dot_slot, 1);
        dir.flush()?;
        Ok(dir)
    }

    fn device(&self) -> Option<&Rc<dyn BlockDevice>> {
        match &self.backing {
            Backing::Root { device, .. } => Some(device),
            Backing::Chain(_) => None,
        }
    }

    fn reload(&mut self) -> Result<()> {
        let raw = match &self.backing {
            Backing::Root { device, offset, capacity } => {
                let mut buf = vec![0u8; *capacity as usize * DIR_ENTRY_SIZE];
                device.read(*offset, &mut buf)?;
                buf
            }
            Backing::Chain(chain) => {
                let len = chain.length_on_disk()? as usize;
                let mut buf = vec![0u8; len];
                if chain.start_cluster() != 0 {
                    chain.read_data(0, &mut buf)?;
                }
                buf
            }
        };

        let count = raw.len() / DIR_ENTRY_SIZE;
        let mut slots = Vec::with_capacity(count);
        for i in 0..count {
            let raw_entry = &raw[i * DIR_ENTRY_SIZE..(i + 1) * DIR_ENTRY_SIZE];
            if raw_entry[0] == ENTRY_END {
                // 0x00 marks "no further entries"; everything past this
                // point is unused and not worth parsing.
                break;
            }
            match raw_entry[0] {
                ENTRY_DELETED => slots.push(None),
                _ => slots.push(Some(DirEntry::parse(raw_entry)?)),
            }
        }
        slots.resize(count, None);
        self.slots = slots;
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live entries paired with the slot they occupy.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &DirEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|e| (i, e)))
    }

    pub fn entry_at(&self, slot: usize) -> Option<&DirEntry> {
        self.slots.get(slot).and_then(|s| s.as_ref())
    }

    pub fn entry_at_mut(&mut self, slot: usize) -> Option<&mut DirEntry> {
        self.slots.get_mut(slot).and_then(|s| s.as_mut())
    }

    /// Inserts `entry` into the first free slot, growing a chain-backed
    /// directory if none is available. Returns the slot index.
    pub fn add(&mut self, entry: DirEntry) -> Result<usize> {
        if self.read_only {
            return Err(Error::ReadOnlyFilesystem);
        }

        if let Some(slot) = self.slots.iter().position(|s| s.is_none()) {
            self.slots[slot] = Some(entry);
            return Ok(slot);
        }

        match &mut self.backing {
            Backing::Root { .. } => Err(Error::DirectoryFull),
            Backing::Chain(chain) => {
                let new_size = (self.slots.len() + 1) as u64 * DIR_ENTRY_SIZE as u64;
                if new_size > MAX_CLUSTER_CHAIN_DIRECTORY_SIZE {
                    return Err(Error::DirectoryTooLarge);
                }
                chain.ensure_capacity(new_size)?;
                let new_slot_count = (chain.length_on_disk()? / DIR_ENTRY_SIZE as u64) as usize;
                self.slots.resize(new_slot_count, None);
                let slot = self.slots.iter().position(|s| s.is_none()).expect("just grown");
                self.slots[slot] = Some(entry);
                Ok(slot)
            }
        }
    }

    /// Frees the slot occupied by an entry. The slot becomes reusable by a
    /// future [`Directory::add`].
    pub fn remove(&mut self, slot: usize) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnlyFilesystem);
        }
        if self.slots.get(slot).map_or(true, Option::is_none) {
            return Err(Error::ObjectInvalid);
        }
        self.slots[slot] = None;
        Ok(())
    }

    /// Writes every slot back to its backing store.
    pub fn flush(&mut self) -> Result<()> {
        if self.read_only {
            return Ok(());
        }

        let mut raw = vec![0u8; self.slots.len() * DIR_ENTRY_SIZE];
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let dst = &mut raw[i * DIR_ENTRY_SIZE..(i + 1) * DIR_ENTRY_SIZE];
            match slot {
                Some(entry) => entry.serialize(dst),
                None => dst[0] = ENTRY_DELETED,
            }
        }

        match &mut self.backing {
            Backing::Root { device, offset, .. } => {
                device.write(*offset, &raw)?;
            }
            Backing::Chain(chain) => {
                chain.write_data(0, &raw)?;
            }
        }
        Ok(())
    }

    pub fn is_empty_of_content(&self) -> bool {
        self.entries().all(|(_, e)| e.is_dot() || e.is_dot_dot())
    }
}
