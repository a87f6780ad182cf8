//! Synthetic fixture builders shared by the unit tests.
//!
//! Everything here writes the on-disk formats the decoders read: a minimal
//! compound document (version 3 or 4), DestList streams and shell link blobs.

use crate::destlist::RecordLayout;

const MINI_SECTOR: usize = 64;
const MINI_CUTOFF: usize = 4096;
const FREESECT: u32 = 0xFFFFFFFF;
const ENDOFCHAIN: u32 = 0xFFFFFFFE;
const FATSECT: u32 = 0xFFFFFFFD;
const DIFSECT: u32 = 0xFFFFFFFC;

fn sectors_for(len: usize, unit: usize) -> usize {
    (len + unit - 1) / unit
}

/// Append a contiguous chain of `count` sectors to `fat`, returning its start
fn alloc_chain(fat: &mut Vec<u32>, count: usize) -> u32 {
    if count == 0 {
        return ENDOFCHAIN;
    }
    let first = fat.len() as u32;
    for k in 0..count {
        fat.push(if k + 1 == count {
            ENDOFCHAIN
        } else {
            first + k as u32 + 1
        });
    }
    first
}

fn dir_entry(name: &str, kind: u8, right: u32, child: u32, start: u32, size: u64) -> [u8; 128] {
    let mut entry = [0u8; 128];
    let units: Vec<u16> = name.encode_utf16().collect();
    for (k, unit) in units.iter().enumerate() {
        entry[k * 2..k * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    entry[64..66].copy_from_slice(&(((units.len() + 1) * 2) as u16).to_le_bytes());
    entry[66] = kind;
    entry[67] = 1;
    entry[68..72].copy_from_slice(&FREESECT.to_le_bytes());
    entry[72..76].copy_from_slice(&right.to_le_bytes());
    entry[76..80].copy_from_slice(&child.to_le_bytes());
    entry[116..120].copy_from_slice(&start.to_le_bytes());
    entry[120..128].copy_from_slice(&size.to_le_bytes());
    entry
}

fn pad_to(out: &mut Vec<u8>, unit: usize) {
    let rem = out.len() % unit;
    if rem != 0 {
        out.resize(out.len() + unit - rem, 0);
    }
}

fn push_table(out: &mut Vec<u8>, table: &[u32]) {
    for entry in table {
        out.extend_from_slice(&entry.to_le_bytes());
    }
}

/// Sector geometry of a synthetic compound document
#[derive(Debug, Clone, Copy)]
pub struct CfbLayout {
    /// 9 writes a version 3 file, 12 a version 4 file
    pub sector_shift: u16,
    /// FAT sector ids kept in the header; the rest go to DIFAT sectors
    pub header_difat: usize,
}

impl Default for CfbLayout {
    fn default() -> Self {
        Self {
            sector_shift: 9,
            header_difat: 109,
        }
    }
}

/// Build a version 3 compound document holding `streams` under the root.
pub fn build_compound_file(streams: &[(&str, &[u8])]) -> Vec<u8> {
    build_compound_file_with(streams, CfbLayout::default())
}

/// Build a compound document with the given sector geometry.
///
/// Layout: FAT sectors first (sector 0), then any DIFAT sectors, the
/// directory, the mini FAT, the mini stream and finally the regular streams.
/// Sector N starts at `(N + 1) << sector_shift`. Streams below 4096 bytes go
/// to the mini stream.
pub fn build_compound_file_with(streams: &[(&str, &[u8])], layout: CfbLayout) -> Vec<u8> {
    let sector = 1usize << layout.sector_shift;
    let per_sector = sector / 4;
    let header_difat = layout.header_difat.min(109);

    let mut starts = vec![ENDOFCHAIN; streams.len()];
    let mut mini_fat: Vec<u32> = Vec::new();
    let mut mini_stream = Vec::new();
    for (i, (_, data)) in streams.iter().enumerate() {
        if data.is_empty() || data.len() >= MINI_CUTOFF {
            continue;
        }
        starts[i] = alloc_chain(&mut mini_fat, sectors_for(data.len(), MINI_SECTOR));
        mini_stream.extend_from_slice(data);
        mini_stream.resize(mini_fat.len() * MINI_SECTOR, 0);
    }

    let dir_sectors = sectors_for((streams.len() + 1) * 128, sector);
    let minifat_sectors = sectors_for(mini_fat.len() * 4, sector);
    let ministream_sectors = sectors_for(mini_stream.len(), sector);
    let big_sectors: usize = streams
        .iter()
        .filter(|(_, d)| d.len() >= MINI_CUTOFF)
        .map(|(_, d)| sectors_for(d.len(), sector))
        .sum();
    let content = dir_sectors + minifat_sectors + ministream_sectors + big_sectors;
    let difat_for = |fat_sectors: usize| {
        sectors_for(fat_sectors.saturating_sub(header_difat), per_sector - 1)
    };
    let mut fat_sectors = 1;
    while fat_sectors * per_sector < fat_sectors + difat_for(fat_sectors) + content {
        fat_sectors += 1;
    }
    let difat_sectors = difat_for(fat_sectors);

    let mut fat = vec![FATSECT; fat_sectors];
    fat.extend(std::iter::repeat(DIFSECT).take(difat_sectors));
    let dir_start = alloc_chain(&mut fat, dir_sectors);
    let minifat_start = alloc_chain(&mut fat, minifat_sectors);
    let ministream_start = alloc_chain(&mut fat, ministream_sectors);
    for (i, (_, data)) in streams.iter().enumerate() {
        if data.len() >= MINI_CUTOFF {
            starts[i] = alloc_chain(&mut fat, sectors_for(data.len(), sector));
        }
    }
    fat.resize(fat_sectors * per_sector, FREESECT);

    let version = if layout.sector_shift == 12 { 4u16 } else { 3 };
    let difat_start = if difat_sectors > 0 {
        fat_sectors as u32
    } else {
        ENDOFCHAIN
    };
    let mut out = Vec::new();
    out.extend_from_slice(&crate::ole::OLE_SIGNATURE);
    out.extend_from_slice(&[0u8; 16]);
    for value in [0x3Eu16, version, 0xFFFE, layout.sector_shift, 6] {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out.extend_from_slice(&[0u8; 6]);
    push_table(
        &mut out,
        &[
            0,
            fat_sectors as u32,
            dir_start,
            0,
            MINI_CUTOFF as u32,
            minifat_start,
            minifat_sectors as u32,
            difat_start,
            difat_sectors as u32,
        ],
    );
    for k in 0..109 {
        let entry = if k < fat_sectors.min(header_difat) {
            k as u32
        } else {
            FREESECT
        };
        out.extend_from_slice(&entry.to_le_bytes());
    }
    debug_assert_eq!(out.len(), 512);
    pad_to(&mut out, sector);

    push_table(&mut out, &fat);

    let overflow: Vec<u32> = (header_difat.min(fat_sectors)..fat_sectors)
        .map(|k| k as u32)
        .collect();
    for (k, chunk) in overflow.chunks(per_sector - 1).enumerate() {
        let mut table = chunk.to_vec();
        table.resize(per_sector - 1, FREESECT);
        table.push(if k + 1 < difat_sectors {
            (fat_sectors + k + 1) as u32
        } else {
            ENDOFCHAIN
        });
        push_table(&mut out, &table);
    }

    let first_child = if streams.is_empty() { FREESECT } else { 1 };
    out.extend_from_slice(&dir_entry(
        "Root Entry",
        5,
        FREESECT,
        first_child,
        ministream_start,
        mini_stream.len() as u64,
    ));
    for (i, (name, data)) in streams.iter().enumerate() {
        let right = if i + 1 < streams.len() {
            i as u32 + 2
        } else {
            FREESECT
        };
        out.extend_from_slice(&dir_entry(name, 2, right, FREESECT, starts[i], data.len() as u64));
    }
    pad_to(&mut out, sector);

    if minifat_sectors > 0 {
        let mut table = mini_fat.clone();
        table.resize(minifat_sectors * per_sector, FREESECT);
        push_table(&mut out, &table);
    }
    out.extend_from_slice(&mini_stream);
    pad_to(&mut out, sector);

    for (_, data) in streams {
        if data.len() >= MINI_CUTOFF {
            out.extend_from_slice(data);
            pad_to(&mut out, sector);
        }
    }
    out
}

/// Fields of one synthetic DestList record
#[derive(Debug, Clone)]
pub struct RecordFixture<'a> {
    pub entry_number: u32,
    pub hostname: &'a str,
    pub path: &'a str,
    pub last_modified: u64,
    pub pin: i32,
    pub access_count: f32,
    pub interaction_count: u32,
    pub file_droid: [u8; 16],
    pub block: Vec<u8>,
}

impl Default for RecordFixture<'_> {
    fn default() -> Self {
        Self {
            entry_number: 1,
            hostname: "host",
            path: "C:\\file.txt",
            last_modified: 125_911_584_000_000_000,
            pin: -1,
            access_count: 1.0,
            interaction_count: 1,
            file_droid: [0u8; 16],
            block: Vec::new(),
        }
    }
}

pub fn destlist_header(version: u32, entry_count: u32, pinned_count: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    for value in [version, entry_count, pinned_count, 0, entry_count, 0, 1, 0] {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

pub fn destlist_record(layout: RecordLayout, fixture: &RecordFixture) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0x1122_3344_5566_7788u64.to_le_bytes());
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&fixture.file_droid);
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&fixture.file_droid);

    let mut hostname = [0u8; 16];
    let bytes = fixture.hostname.as_bytes();
    let len = bytes.len().min(16);
    hostname[..len].copy_from_slice(&bytes[..len]);
    out.extend_from_slice(&hostname);

    out.extend_from_slice(&fixture.entry_number.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&fixture.access_count.to_le_bytes());
    out.extend_from_slice(&(fixture.last_modified as u32).to_le_bytes());
    out.extend_from_slice(&((fixture.last_modified >> 32) as u32).to_le_bytes());
    out.extend_from_slice(&fixture.pin.to_le_bytes());

    if layout == RecordLayout::Win10 {
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(&fixture.interaction_count.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes());
    }
    debug_assert_eq!(out.len(), layout.prefix_len());

    let units: Vec<u16> = fixture.path.encode_utf16().collect();
    out.extend_from_slice(&(units.len() as u16).to_le_bytes());
    for unit in units {
        out.extend_from_slice(&unit.to_le_bytes());
    }

    if layout == RecordLayout::Win10 {
        out.extend_from_slice(&(fixture.block.len() as u32).to_le_bytes());
        out.extend_from_slice(&fixture.block);
    }
    out
}

/// Header plus records, layout chosen from `version`
pub fn destlist_stream(version: u32, records: &[RecordFixture]) -> Vec<u8> {
    let layout = if version == 1 {
        RecordLayout::Win7
    } else {
        RecordLayout::Win10
    };
    let pinned = records.iter().filter(|r| r.pin >= 0).count() as u32;
    let mut out = destlist_header(version, records.len() as u32, pinned);
    for record in records {
        out.extend(destlist_record(layout, record));
    }
    out
}

/// Fields of one synthetic shell link
#[derive(Debug, Clone, Default)]
pub struct LnkFixture<'a> {
    pub local_path: Option<&'a str>,
    pub volume_label: Option<&'a str>,
    pub unicode_label: bool,
    pub drive_serial: u32,
    pub unicode: bool,
    pub id_list: bool,
    pub name: Option<&'a str>,
    pub relative_path: Option<&'a str>,
    pub working_dir: Option<&'a str>,
    pub arguments: Option<&'a str>,
    pub icon_location: Option<&'a str>,
    pub created: u64,
    pub accessed: u64,
    pub modified: u64,
    pub file_size: u32,
    /// Machine id and file droid for a tracker block
    pub tracker: Option<(&'a str, [u8; 16])>,
    /// Known folder id (dashed hex) for a known folder block
    pub known_folder: Option<&'a str>,
}

/// Shell link header signature and CLSID as written on disk
pub const LNK_HEADER_PREFIX: [u8; 20] = [
    0x4C, 0x00, 0x00, 0x00, 0x01, 0x14, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x46,
];

fn push_string(out: &mut Vec<u8>, value: &str, unicode: bool) {
    if unicode {
        let units: Vec<u16> = value.encode_utf16().collect();
        out.extend_from_slice(&(units.len() as u16).to_le_bytes());
        for unit in units {
            out.extend_from_slice(&unit.to_le_bytes());
        }
    } else {
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
        out.extend_from_slice(value.as_bytes());
    }
}

fn link_info(fixture: &LnkFixture, path: &str) -> Vec<u8> {
    let label = fixture.volume_label.unwrap_or("");
    let mut volume = Vec::new();
    if fixture.unicode_label {
        let units: Vec<u16> = label.encode_utf16().chain(std::iter::once(0)).collect();
        let size = 20 + units.len() * 2;
        for value in [size as u32, 3, fixture.drive_serial, 0x14, 0x14] {
            volume.extend_from_slice(&value.to_le_bytes());
        }
        for unit in units {
            volume.extend_from_slice(&unit.to_le_bytes());
        }
    } else {
        let size = 16 + label.len() + 1;
        for value in [size as u32, 3, fixture.drive_serial, 0x10] {
            volume.extend_from_slice(&value.to_le_bytes());
        }
        volume.extend_from_slice(label.as_bytes());
        volume.push(0);
    }

    let header_size = 28usize;
    let volume_offset = header_size;
    let local_offset = volume_offset + volume.len();
    let suffix_offset = local_offset + path.len() + 1;
    let total = suffix_offset + 1;

    let mut out = Vec::with_capacity(total);
    for value in [
        total as u32,
        header_size as u32,
        1,
        volume_offset as u32,
        local_offset as u32,
        0,
        suffix_offset as u32,
    ] {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out.extend_from_slice(&volume);
    out.extend_from_slice(path.as_bytes());
    out.push(0);
    out.push(0);
    out
}

pub fn build_lnk(fixture: &LnkFixture) -> Vec<u8> {
    let mut flags = 0u32;
    if fixture.id_list {
        flags |= 0x01;
    }
    if fixture.local_path.is_some() {
        flags |= 0x02;
    }
    let strings = [
        (0x04u32, fixture.name),
        (0x08, fixture.relative_path),
        (0x10, fixture.working_dir),
        (0x20, fixture.arguments),
        (0x40, fixture.icon_location),
    ];
    for (bit, value) in &strings {
        if value.is_some() {
            flags |= bit;
        }
    }
    if fixture.unicode {
        flags |= 0x80;
    }

    let mut out = Vec::new();
    out.extend_from_slice(&LNK_HEADER_PREFIX);
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&0x20u32.to_le_bytes());
    out.extend_from_slice(&fixture.created.to_le_bytes());
    out.extend_from_slice(&fixture.accessed.to_le_bytes());
    out.extend_from_slice(&fixture.modified.to_le_bytes());
    out.extend_from_slice(&fixture.file_size.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&[0u8; 10]);
    debug_assert_eq!(out.len(), 76);

    if fixture.id_list {
        // One root folder item and the terminator
        out.extend_from_slice(&6u16.to_le_bytes());
        out.extend_from_slice(&[0x04, 0x00, 0x1F, 0x50, 0x00, 0x00]);
    }
    if let Some(path) = fixture.local_path {
        out.extend(link_info(fixture, path));
    }
    for (_, value) in &strings {
        if let Some(value) = value {
            push_string(&mut out, value, fixture.unicode);
        }
    }

    if let Some((machine, droid)) = fixture.tracker {
        for value in [0x60u32, 0xA000_0003, 0x58, 0] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        let mut machine_id = [0u8; 16];
        let len = machine.len().min(16);
        machine_id[..len].copy_from_slice(&machine.as_bytes()[..len]);
        out.extend_from_slice(&machine_id);
        for _ in 0..2 {
            out.extend_from_slice(&[0u8; 16]);
            out.extend_from_slice(&droid);
        }
    }
    if let Some(folder) = fixture.known_folder {
        out.extend_from_slice(&0x1Cu32.to_le_bytes());
        out.extend_from_slice(&0xA000_000Bu32.to_le_bytes());
        let id: crate::guid::StructuredIdentifier = folder.parse().unwrap();
        out.extend_from_slice(&id.data1.to_le_bytes());
        out.extend_from_slice(&id.data2.to_le_bytes());
        out.extend_from_slice(&id.data3.to_le_bytes());
        out.extend_from_slice(&id.data4);
        out.extend_from_slice(&0u32.to_le_bytes());
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out
}

/// Custom destinations file: header, blobs, footer
pub fn custom_destinations(blobs: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in [2u32, 1, 0, blobs.len() as u32] {
        out.extend_from_slice(&value.to_le_bytes());
    }
    for blob in blobs {
        out.extend_from_slice(blob);
    }
    out.extend_from_slice(&crate::carve::CUSTOM_FOOTER);
    out
}
