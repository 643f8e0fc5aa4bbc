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

//! Random-access read/write over a chain of clusters threaded through the
//! FAT, shared by files and cluster-chain (non-root) directories.

use std::cell::RefCell;
use std::rc::Rc;

use akaifat_device::{check_span, BlockDevice};
use akaifat_error::{Error, Result};

use crate::{fat_table::Fat, FIRST_CLUSTER};

/// A stream of bytes backed by a linked chain of fixed-size clusters.
/// `start == 0` represents an empty chain with no clusters allocated yet.
pub struct ClusterChain {
    fat: Rc<RefCell<Fat>>,
    device: Rc<dyn BlockDevice>,
    start: u32,
    cluster_size: u32,
    data_offset: u64,
    read_only: bool,
}

impl ClusterChain {
    pub fn new(
        fat: Rc<RefCell<Fat>>,
        device: Rc<dyn BlockDevice>,
        start: u32,
        cluster_size: u32,
        data_offset: u64,
        read_only: bool,
    ) -> ClusterChain {
        ClusterChain {
            fat,
            device,
            start,
            cluster_size,
            data_offset,
            read_only,
        }
    }

    pub fn start_cluster(&self) -> u32 {
        self.start
    }

    fn cluster_offset(&self, cluster: u32) -> u64 {
        self.data_offset + (cluster - FIRST_CLUSTER) as u64 * self.cluster_size as u64
    }

    pub fn chain_length(&self) -> Result<u32> {
        Ok(self.fat.borrow().chain_of(self.start)?.len() as u32)
    }

    /// Total bytes addressable through the chain as currently allocated.
    pub fn length_on_disk(&self) -> Result<u64> {
        Ok(self.chain_length()? as u64 * self.cluster_size as u64)
    }

    /// Grows or shrinks the chain to hold exactly `new_cluster_count`
    /// clusters, allocating or freeing as needed.
    pub fn set_chain_length(&mut self, new_cluster_count: u32) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnlyFilesystem);
        }

        if new_cluster_count == 0 {
            if self.start != 0 {
                let chain = self.fat.borrow().chain_of(self.start)?;
                let mut fat = self.fat.borrow_mut();
                for c in chain {
                    fat.set_free(c);
                }
                self.start = 0;
            }
            return Ok(());
        }

        let current = self.fat.borrow().chain_of(self.start)?;
        let current_len = current.len() as u32;

        if new_cluster_count == current_len {
            return Ok(());
        }

        if new_cluster_count > current_len {
            let to_add = (new_cluster_count - current_len) as usize;
            if self.start == 0 {
                let mut fat = self.fat.borrow_mut();
                let new_chain = fat.alloc_new_chain(to_add)?;
                self.start = new_chain[0];
            } else {
                let tail = *current.last().unwrap();
                let mut fat = self.fat.borrow_mut();
                let mut cur = tail;
                for _ in 0..to_add {
                    cur = fat.alloc_append(cur)?;
                }
            }
        } else {
            let keep = new_cluster_count as usize;
            let new_tail = current[keep - 1];
            let to_free = &current[keep..];
            let mut fat = self.fat.borrow_mut();
            fat.set_eof(new_tail);
            for &c in to_free {
                fat.set_free(c);
            }
        }

        Ok(())
    }

    /// Grows (never shrinks) the chain so it can hold at least `bytes`
    /// bytes, rounding up to a whole number of clusters.
    pub fn ensure_capacity(&mut self, bytes: u64) -> Result<()> {
        let needed_clusters = bytes.div_ceil(self.cluster_size as u64) as u32;
        let current = self.chain_length()?;
        if needed_clusters > current {
            self.set_chain_length(needed_clusters)?;
        }
        Ok(())
    }

    /// Reads `dst.len()` bytes starting at byte `offset` within the chain.
    pub fn read_data(&self, offset: u64, dst: &mut [u8]) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }
        if self.start == 0 {
            return Err(Error::ReadPastEnd);
        }

        let chain = self.fat.borrow().chain_of(self.start)?;
        let cluster_size = self.cluster_size as u64;
        let mut remaining = dst;
        let mut pos = offset;

        while !remaining.is_empty() {
            let cluster_index = (pos / cluster_size) as usize;
            let cluster = *chain.get(cluster_index).ok_or(Error::ReadPastEnd)?;
            let intra = pos % cluster_size;
            let chunk_len = remaining.len().min((cluster_size - intra) as usize);

            let device_offset = self.cluster_offset(cluster) + intra;
            check_span(self.device.size(), device_offset, chunk_len)?;
            let (chunk, rest) = remaining.split_at_mut(chunk_len);
            self.device.read(device_offset, chunk)?;

            remaining = rest;
            pos += chunk_len as u64;
        }

        Ok(())
    }

    /// Writes `src` at byte `offset` within the chain, growing the chain
    /// first if the write would extend past its current allocation.
    pub fn write_data(&mut self, offset: u64, src: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnlyFilesystem);
        }
        if src.is_empty() {
            return Ok(());
        }

        self.ensure_capacity(offset + src.len() as u64)?;

        let chain = self.fat.borrow().chain_of(self.start)?;
        let cluster_size = self.cluster_size as u64;
        let mut remaining = src;
        let mut pos = offset;

        while !remaining.is_empty() {
            let cluster_index = (pos / cluster_size) as usize;
            let cluster = *chain.get(cluster_index).ok_or(Error::EndOfFile)?;
            let intra = pos % cluster_size;
            let chunk_len = remaining.len().min((cluster_size - intra) as usize);

            let device_offset = self.cluster_offset(cluster) + intra;
            let (chunk, rest) = remaining.split_at(chunk_len);
            self.device.write(device_offset, chunk)?;

            remaining = rest;
            pos += chunk_len as u64;
        }

        Ok(())
    }
}
