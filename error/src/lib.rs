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

//! Error taxonomy shared by the block device, directory and filesystem layers.
//!
//! Every public operation in the driver returns [`Result`]. Errors are never
//! swallowed or retried internally; structural errors discovered while
//! opening a filesystem are fatal to that filesystem instance.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("device I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("write attempted on a read-only device")]
    ReadOnlyDevice,
    #[error("mutation attempted on a read-only filesystem")]
    ReadOnlyFilesystem,
    #[error("requested span lies outside the device")]
    DeviceOutOfRange,

    #[error("operation attempted after the filesystem was closed")]
    AlreadyClosed,
    #[error("operation attempted on a handle whose entry was removed or whose filesystem was closed")]
    ObjectInvalid,

    #[error("boot sector is missing the 0x55 0xAA signature")]
    BadSignature,
    #[error("boot sector geometry does not correspond to a FAT12 or FAT16 volume")]
    UnsupportedFatType,
    #[error("boot sector fields are internally inconsistent")]
    InvalidBootSector,
    #[error("a secondary FAT copy does not match FAT copy 0")]
    FatMismatch,
    #[error("directory contents do not follow the FAT directory entry format")]
    MalformedDirectory,

    #[error("no free cluster is available for allocation")]
    FatFull,
    #[error("a cluster chain revisits a cluster it has already traversed")]
    FatCycle,

    #[error("read requested past the end of the cluster chain")]
    ReadPastEnd,
    #[error("read or write requested past the end of the file")]
    EndOfFile,

    #[error("directory has no room left for another entry")]
    DirectoryFull,
    #[error("directory would grow past the maximum cluster-chain directory size")]
    DirectoryTooLarge,

    #[error("name is already used by another entry in the directory")]
    NameInUse,
    #[error("name exceeds the length permitted by the short-name or Akai-part codec")]
    NameTooLong,
    #[error("name contains a character outside the permitted set")]
    InvalidName,
    #[error("volume label is invalid")]
    InvalidLabel,

    #[error("requested value does not fit the on-disk field")]
    ValueOutOfRange,
}

pub type Result<T> = std::result::Result<T, Error>;
