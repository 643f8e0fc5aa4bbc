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

//! A read/write driver for the FAT12/FAT16 filesystem variant used by Akai
//! samplers.
//!
//! The on-disk layout is standard FAT16 (boot sector, one or more file
//! allocation tables, a fixed-size root directory, a cluster data region)
//! with one twist: every 32-byte directory entry carries an eight-byte
//! "Akai part" in the bytes the FAT spec reserves for long-filename
//! infrastructure, extending the visible filename from 8.3 to a
//! case-preserving 16.3 form.
//!
//! The driver takes its backing store as an injected [`akaifat_device::BlockDevice`]
//! and is single-threaded and synchronous: every public operation blocks on
//! device I/O and none are re-entrant.

pub mod akai_part;
pub mod boot_sector;
pub mod cluster_chain;
pub mod codec;
pub mod directory;
pub mod entry;
pub mod fat_table;
pub mod file;
pub mod filesystem;
pub mod lfn;
pub mod short_name;

pub use akaifat_error::{Error, Result};
pub use boot_sector::BootSector;
pub use entry::{Attributes, DirEntry};
pub use fat_table::{Fat, FatType};
pub use file::File;
pub use filesystem::{FileSystem, OpenOptions};
pub use lfn::LfnDirectory;

/// The first cluster number that can hold user data; 0 and 1 are reserved.
pub const FIRST_CLUSTER: u32 = 2;

/// Size in bytes of a single directory entry, on every directory type.
pub const DIR_ENTRY_SIZE: usize = 32;

/// Byte value terminating a directory's live-entry table.
pub const ENTRY_END: u8 = 0x00;
/// Byte value marking a directory entry as deleted.
pub const ENTRY_DELETED: u8 = 0xE5;
/// Replacement written in place of a leading 0xE5 so it is not confused
/// with the deleted marker; restored to 0xE5 on read.
pub const ENTRY_DELETED_ESCAPE: u8 = 0x05;

/// Upper bound on a cluster-chain-backed directory's size, per §4.11.
pub const MAX_CLUSTER_CHAIN_DIRECTORY_SIZE: u64 = 65536 * DIR_ENTRY_SIZE as u64;

/// Highest cluster count still addressable as FAT12.
pub const MAX_CLUSTER_FAT12: u32 = 4084;
/// Highest cluster count still addressable as FAT16.
pub const MAX_CLUSTER_FAT16: u32 = 65524;
