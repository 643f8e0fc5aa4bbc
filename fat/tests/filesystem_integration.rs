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

//! End-to-end coverage driving [`akaifat::FileSystem`] the way a host
//! application would: against a hand-built raw volume image, through the
//! public path-based API only.

use std::rc::Rc;

use akaifat::{Error, FileSystem, OpenOptions};
use akaifat_device::BlockDevice;
use akaifat_device_std::MemoryBlockDevice;

const BYTES_PER_SECTOR: u16 = 512;
const SECTORS_PER_CLUSTER: u8 = 1;
const RESERVED_SECTORS: u16 = 1;
const FAT_COUNT: u8 = 2;
const ROOT_ENTRY_COUNT: u16 = 32;
const SECTORS_PER_FAT: u16 = 2;
const DATA_SECTORS: u32 = 200;

fn le16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

/// Hand-assembles a small, valid FAT12-range volume image: a realistic
/// boot sector followed by zeroed FAT copies, root directory and data
/// region (zeroed means "entirely free/empty", which is a valid initial
/// state for every one of those regions).
fn formatted_image() -> Vec<u8> {
    let root_sectors = (ROOT_ENTRY_COUNT as u32 * 32).div_ceil(BYTES_PER_SECTOR as u32);
    let total_sectors = RESERVED_SECTORS as u32 + FAT_COUNT as u32 * SECTORS_PER_FAT as u32 + root_sectors + DATA_SECTORS;

    let mut image = vec![0u8; (total_sectors * BYTES_PER_SECTOR as u32) as usize];
    le16(&mut image, 11, BYTES_PER_SECTOR);
    image[13] = SECTORS_PER_CLUSTER;
    le16(&mut image, 14, RESERVED_SECTORS);
    image[16] = FAT_COUNT;
    le16(&mut image, 17, ROOT_ENTRY_COUNT);
    le16(&mut image, 19, total_sectors as u16);
    image[21] = 0xF8;
    le16(&mut image, 22, SECTORS_PER_FAT);
    image[43..54].copy_from_slice(b"AKAIDISK   ");
    image[510] = 0x55;
    image[511] = 0xAA;
    image
}

fn open_fixture() -> FileSystem {
    let device: Rc<dyn BlockDevice> = Rc::new(MemoryBlockDevice::from_vec(formatted_image(), 512));
    FileSystem::open(device, OpenOptions::default()).unwrap()
}

#[test]
fn freshly_formatted_volume_has_an_empty_root() {
    let fs = open_fixture();
    assert!(fs.list_root().unwrap().is_empty());
    assert_eq!(fs.volume_label().as_deref(), Some("AKAIDISK"));
    assert_eq!(fs.free_space(), fs.usable_space());
}

#[test]
fn sixteen_dot_three_name_round_trips_through_reopen() {
    let fs = open_fixture();
    {
        let mut file = fs.create_file("LONGSAMPLENAME.SND").unwrap();
        file.write(b"sample payload").unwrap();
        file.flush().unwrap();
    }
    assert_eq!(fs.list_root().unwrap(), vec!["LONGSAMPLENAME.SND".to_string()]);

    let mut reopened = fs.open_file("LONGSAMPLENAME.SND").unwrap();
    let mut buf = vec![0u8; "sample payload".len()];
    let n = reopened.read(&mut buf).unwrap();
    assert_eq!(n, buf.len());
    assert_eq!(&buf, b"sample payload");
}

#[test]
fn write_spanning_many_clusters_reads_back_exactly() {
    let fs = open_fixture();
    let mut file = fs.create_file("BIGFILE.WAV").unwrap();
    let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    file.write(&payload).unwrap();
    file.flush().unwrap();

    let mut reopened = fs.open_file("BIGFILE.WAV").unwrap();
    let mut readback = vec![0u8; payload.len()];
    let mut total = 0;
    while total < readback.len() {
        let n = reopened.read(&mut readback[total..]).unwrap();
        assert!(n > 0, "read stalled before reaching end of file");
        total += n;
    }
    assert_eq!(readback, payload);
}

#[test]
fn nested_directories_hold_independent_files() {
    let fs = open_fixture();
    fs.create_dir("SOUNDS").unwrap();
    fs.create_dir("SOUNDS/DRUMS").unwrap();

    let mut kick = fs.create_file("SOUNDS/DRUMS/KICKDRUM.WAV").unwrap();
    kick.write(b"kick").unwrap();
    kick.flush().unwrap();

    let mut snare = fs.create_file("SOUNDS/SNAREDRUM.WAV").unwrap();
    snare.write(b"snare").unwrap();
    snare.flush().unwrap();

    let mut kick_buf = [0u8; 4];
    fs.open_file("SOUNDS/DRUMS/KICKDRUM.WAV").unwrap().read(&mut kick_buf).unwrap();
    assert_eq!(&kick_buf, b"kick");

    let mut snare_buf = [0u8; 5];
    fs.open_file("SOUNDS/SNAREDRUM.WAV").unwrap().read(&mut snare_buf).unwrap();
    assert_eq!(&snare_buf, b"snare");

    assert!(fs.open_file("SOUNDS/KICKDRUM.WAV").is_err());
}

#[test]
fn removing_a_file_frees_its_clusters_for_reuse() {
    let fs = open_fixture();
    let mut file = fs.create_file("TEMP.SND").unwrap();
    file.write(&[0xAAu8; 8192]).unwrap();
    file.flush().unwrap();
    let free_after_write = fs.free_space();

    fs.remove("TEMP.SND").unwrap();
    let free_after_remove = fs.free_space();
    assert!(free_after_remove > free_after_write);

    // The freed slot and clusters must be reusable by a new file.
    let mut replacement = fs.create_file("TEMP.SND").unwrap();
    replacement.write(b"fresh").unwrap();
    replacement.flush().unwrap();
    assert_eq!(fs.free_space(), free_after_remove - replacement.len().div_ceil(512) * 512);
}

#[test]
fn renamed_file_keeps_its_data_and_slot() {
    let fs = open_fixture();
    let mut file = fs.create_file("OLDNAME.SND").unwrap();
    file.write(b"unchanged data").unwrap();
    file.flush().unwrap();

    fs.rename("OLDNAME.SND", "NEWSAMPLENAME.SND").unwrap();
    assert!(fs.open_file("OLDNAME.SND").is_err());

    let mut renamed = fs.open_file("NEWSAMPLENAME.SND").unwrap();
    let mut buf = vec![0u8; "unchanged data".len()];
    renamed.read(&mut buf).unwrap();
    assert_eq!(&buf, b"unchanged data");
}

#[test]
fn cross_directory_move_preserves_data_and_vacates_source() {
    let fs = open_fixture();
    fs.create_dir("SOUNDS").unwrap();
    let mut file = fs.create_file("SAMPLE.SND").unwrap();
    file.write(b"unchanged data").unwrap();
    file.flush().unwrap();

    fs.move_to("SAMPLE.SND", "SOUNDS/SAMPLE.SND").unwrap();

    assert!(fs.open_file("SAMPLE.SND").is_err());
    let mut moved = fs.open_file("SOUNDS/SAMPLE.SND").unwrap();
    let mut buf = vec![0u8; "unchanged data".len()];
    moved.read(&mut buf).unwrap();
    assert_eq!(&buf, b"unchanged data");
}

#[test]
fn move_to_existing_name_leaves_source_untouched() {
    let fs = open_fixture();
    fs.create_dir("SOUNDS").unwrap();
    fs.create_file("SAMPLE.SND").unwrap();
    fs.create_file("SOUNDS/TAKEN.SND").unwrap();

    assert!(matches!(
        fs.move_to("SAMPLE.SND", "SOUNDS/TAKEN.SND"),
        Err(Error::NameInUse)
    ));
    assert!(fs.open_file("SAMPLE.SND").is_ok());
}

#[test]
fn lookup_by_name_is_case_insensitive() {
    let fs = open_fixture();
    fs.create_file("TEST1.SND").unwrap();
    assert!(fs.open_file("test1.snd").is_ok());
    assert!(matches!(fs.create_file("Test1.snd"), Err(Error::NameInUse)));
}

#[test]
fn removing_an_absent_file_is_a_no_op() {
    let fs = open_fixture();
    fs.remove("GONE.SND").unwrap();
    fs.remove("GONE.SND").unwrap();
}

#[test]
fn corrupting_the_backup_fat_is_detected_on_open() {
    let mut image = formatted_image();
    // Flip a byte in the second FAT copy so it diverges from the first.
    let fat_copy_1_offset = RESERVED_SECTORS as usize * BYTES_PER_SECTOR as usize
        + SECTORS_PER_FAT as usize * BYTES_PER_SECTOR as usize;
    image[fat_copy_1_offset] = 0xFF;

    let device: Rc<dyn BlockDevice> = Rc::new(MemoryBlockDevice::from_vec(image, 512));
    let result = FileSystem::open(device, OpenOptions::default());
    assert!(matches!(result, Err(Error::FatMismatch)));
}

#[test]
fn check_fat_copies_can_be_disabled() {
    let mut image = formatted_image();
    let fat_copy_1_offset = RESERVED_SECTORS as usize * BYTES_PER_SECTOR as usize
        + SECTORS_PER_FAT as usize * BYTES_PER_SECTOR as usize;
    image[fat_copy_1_offset] = 0xFF;

    let device: Rc<dyn BlockDevice> = Rc::new(MemoryBlockDevice::from_vec(image, 512));
    let options = OpenOptions {
        check_fat_copies: false,
        ..OpenOptions::default()
    };
    assert!(FileSystem::open(device, options).is_ok());
}

#[test]
fn read_only_filesystem_rejects_mutation() {
    let device: Rc<dyn BlockDevice> = Rc::new(MemoryBlockDevice::from_vec(formatted_image(), 512));
    let fs = FileSystem::open(device, OpenOptions { read_only: true, ..OpenOptions::default() }).unwrap();
    assert!(matches!(fs.create_file("NOPE.SND"), Err(Error::ReadOnlyFilesystem)));
}
