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

//! A cursor-addressed view over a file's cluster chain, with its directory
//! entry updated on [`File::flush`].

use std::cell::RefCell;
use std::rc::Rc;

use akaifat_error::{Error, Result};

use crate::{cluster_chain::ClusterChain, directory::Directory};

/// An open file. Reads are bounded by the entry's logical length even when
/// the backing chain is larger (a chain only ever grows in whole clusters);
/// writes past the current length extend it.
pub struct File {
    chain: ClusterChain,
    length: u64,
    position: u64,
    read_only: bool,
    directory: Rc<RefCell<Directory>>,
    slot: usize,
    length_dirty: bool,
}

impl File {
    pub(crate) fn new(
        chain: ClusterChain,
        length: u32,
        read_only: bool,
        directory: Rc<RefCell<Directory>>,
        slot: usize,
    ) -> File {
        File {
            chain,
            length: length as u64,
            position: 0,
            read_only,
            directory,
            slot,
            length_dirty: false,
        }
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn seek(&mut self, position: u64) {
        self.position = position;
    }

    /// Reads into `dst`, returning the number of bytes actually read
    /// (fewer than `dst.len()` only at end of file).
    pub fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        let remaining = self.length.saturating_sub(self.position);
        let n = (dst.len() as u64).min(remaining) as usize;
        if n == 0 {
            return Ok(0);
        }
        self.chain.read_data(self.position, &mut dst[..n])?;
        self.position += n as u64;
        Ok(n)
    }

    /// Writes `src` at the current position, extending the file's logical
    /// length (and its cluster chain, transparently) as needed.
    pub fn write(&mut self, src: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnlyFilesystem);
        }
        if src.is_empty() {
            return Ok(());
        }
        self.chain.write_data(self.position, src)?;
        self.position += src.len() as u64;
        if self.position > self.length {
            self.length = self.position;
            self.length_dirty = true;
        }
        Ok(())
    }

    /// Truncates or zero-extends the file to exactly `new_length` bytes.
    pub fn set_len(&mut self, new_length: u64) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnlyFilesystem);
        }
        self.chain.ensure_capacity(new_length)?;
        self.length = new_length;
        self.length_dirty = true;
        if self.position > self.length {
            self.position = self.length;
        }
        Ok(())
    }

    /// Writes the current length and start cluster back into the owning
    /// directory entry and persists the directory.
    pub fn flush(&mut self) -> Result<()> {
        if self.read_only || !self.length_dirty {
            return Ok(());
        }
        let mut directory = self.directory.borrow_mut();
        let entry = directory.entry_at_mut(self.slot).ok_or(Error::ObjectInvalid)?;
        entry.set_length(self.length as u32);
        entry.set_start_cluster(self.chain.start_cluster());
        directory.flush()?;
        self.length_dirty = false;
        Ok(())
    }
}
