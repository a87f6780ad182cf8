//! OLE Compound Document Format parsing
//!
//! `.automaticDestinations-ms` files are stored as Microsoft compound documents
//! holding a `DestList` stream plus one shell link stream per entry. The
//! reader works over an in-memory buffer and bounds checks every sector
//! reference, since sector chains in a damaged file can point anywhere.

use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Compound document signature
pub const OLE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const HEADER_SIZE: usize = 512;
const DIRECTORY_ENTRY_SIZE: usize = 128;
const HEADER_DIFAT_ENTRIES: usize = 109;

/// Special sector values
const FREESECT: u32 = 0xFFFFFFFF;
const ENDOFCHAIN: u32 = 0xFFFFFFFE;
const FATSECT: u32 = 0xFFFFFFFD;
const DIFSECT: u32 = 0xFFFFFFFC;
const MAXREGSECT: u32 = 0xFFFFFFFA;

fn malformed(msg: impl Into<String>) -> Error {
    Error::MalformedContainer(msg.into())
}

/// OLE Compound Document Header (512 bytes)
#[derive(Debug, Clone)]
pub struct OleHeader {
    pub minor_version: u16,
    pub major_version: u16,
    /// Sector size power (9 for 512 bytes, 12 for 4096)
    pub sector_size_power: u16,
    /// Mini sector size power (always 6 for 64 bytes)
    pub mini_sector_size_power: u16,
    pub num_directory_sectors: u32,
    pub num_fat_sectors: u32,
    pub directory_first_sector: u32,
    /// Streams smaller than this live in the mini stream
    pub mini_stream_cutoff: u32,
    pub mini_fat_first_sector: u32,
    pub num_mini_fat_sectors: u32,
    pub difat_first_sector: u32,
    pub num_difat_sectors: u32,
    /// First 109 DIFAT entries
    pub difat: Vec<u32>,
}

/// Directory entry types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OleEntryType {
    Empty,
    Storage,
    Stream,
    Root,
    Unknown(u8),
}

impl From<u8> for OleEntryType {
    fn from(value: u8) -> Self {
        match value {
            0 => OleEntryType::Empty,
            1 => OleEntryType::Storage,
            2 => OleEntryType::Stream,
            5 => OleEntryType::Root,
            other => OleEntryType::Unknown(other),
        }
    }
}

/// Directory Entry (128 bytes)
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Entry name (UTF-16LE, at most 31 characters)
    pub name: String,
    pub entry_type: OleEntryType,
    pub left_sibling_id: u32,
    pub right_sibling_id: u32,
    pub child_id: u32,
    pub starting_sector: u32,
    pub size: u64,
}

/// A named stream and its contents
#[derive(Debug, Clone)]
pub struct OleStream {
    pub name: String,
    pub data: Vec<u8>,
}

/// Parsed compound document with every stream read into memory
#[derive(Debug, Clone)]
pub struct CompoundFile {
    pub header: OleHeader,
    pub directory_entries: Vec<DirectoryEntry>,
    streams: Vec<OleStream>,
}

impl CompoundFile {
    /// Parse a compound document from bytes.
    ///
    /// Any structural problem is reported as `MalformedContainer`; no partial
    /// result is returned.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(malformed(format!(
                "file is {} bytes, smaller than the {} byte header",
                data.len(),
                HEADER_SIZE
            )));
        }
        if data[..8] != OLE_SIGNATURE {
            return Err(malformed("missing compound document signature"));
        }

        let header = OleHeader::parse(&data[..HEADER_SIZE])?;
        let reader = SectorReader::new(data, &header)?;

        let fat = reader.read_fat(&header)?;
        let directory_data = reader.read_chain(header.directory_first_sector, &fat, None)?;
        let directory_entries = directory_data
            .chunks_exact(DIRECTORY_ENTRY_SIZE)
            .map(DirectoryEntry::parse)
            .collect::<Result<Vec<_>>>()?;

        let root = directory_entries
            .first()
            .filter(|e| e.entry_type == OleEntryType::Root)
            .ok_or_else(|| malformed("first directory entry is not the root entry"))?;

        let mini_fat = if header.num_mini_fat_sectors > 0 {
            let raw = reader.read_chain(header.mini_fat_first_sector, &fat, None)?;
            u32_table(&raw)
        } else {
            Vec::new()
        };
        let mini_stream = if root.size > 0 {
            reader.read_chain(root.starting_sector, &fat, Some(root.size))?
        } else {
            Vec::new()
        };

        let mut streams = Vec::new();
        for entry in directory_entries
            .iter()
            .filter(|e| e.entry_type == OleEntryType::Stream)
        {
            let stream_data = if entry.size == 0 {
                Vec::new()
            } else if entry.size < header.mini_stream_cutoff as u64 {
                read_mini_chain(&mini_stream, entry.starting_sector, entry.size, &mini_fat)?
            } else {
                reader.read_chain(entry.starting_sector, &fat, Some(entry.size))?
            };
            streams.push(OleStream {
                name: entry.name.clone(),
                data: stream_data,
            });
        }

        Ok(CompoundFile {
            header,
            directory_entries,
            streams,
        })
    }

    /// Get a stream by name (case-insensitive)
    pub fn get_stream(&self, name: &str) -> Option<&[u8]> {
        self.streams
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| s.data.as_slice())
    }

    /// Iterate over (name, bytes) pairs in directory order
    pub fn streams(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.streams
            .iter()
            .map(|s| (s.name.as_str(), s.data.as_slice()))
    }

    /// List all stream names
    pub fn list_streams(&self) -> Vec<String> {
        self.streams.iter().map(|s| s.name.clone()).collect()
    }
}

/// Sector addressing over the raw file buffer
struct SectorReader<'a> {
    data: &'a [u8],
    sector_size: usize,
    sector_count: u32,
}

impl<'a> SectorReader<'a> {
    /// Sector N starts at `(N + 1) * sector_size`; the header occupies the
    /// whole first sector, which is 4096 bytes in version 4 files.
    fn new(data: &'a [u8], header: &OleHeader) -> Result<Self> {
        let sector_size = 1usize << header.sector_size_power;
        if data.len() < sector_size {
            return Err(malformed(format!(
                "file is {} bytes, smaller than one {} byte sector",
                data.len(),
                sector_size
            )));
        }
        // A trailing partial sector still holds data for the last stream
        let sector_count = ((data.len() + sector_size - 1) / sector_size - 1) as u32;
        Ok(Self {
            data,
            sector_size,
            sector_count,
        })
    }

    fn sector(&self, id: u32) -> Result<&'a [u8]> {
        if id > MAXREGSECT || id >= self.sector_count {
            return Err(malformed(format!(
                "sector {:#x} outside file of {} sectors",
                id, self.sector_count
            )));
        }
        let start = (id as usize + 1) * self.sector_size;
        let end = (start + self.sector_size).min(self.data.len());
        Ok(&self.data[start..end])
    }

    /// Collect the FAT from the header DIFAT plus any DIFAT sectors
    fn read_fat(&self, header: &OleHeader) -> Result<Vec<u32>> {
        let mut fat_sectors: Vec<u32> = header
            .difat
            .iter()
            .copied()
            .filter(|&s| s != FREESECT)
            .collect();

        let per_sector = self.sector_size / 4 - 1;
        let mut next = header.difat_first_sector;
        for _ in 0..header.num_difat_sectors {
            if next == ENDOFCHAIN || next == FREESECT {
                break;
            }
            let table = u32_table(self.sector(next)?);
            if table.len() <= per_sector {
                return Err(malformed("short DIFAT sector"));
            }
            fat_sectors.extend(table[..per_sector].iter().copied().filter(|&s| s != FREESECT));
            next = table[per_sector];
        }

        if fat_sectors.len() != header.num_fat_sectors as usize {
            log::debug!(
                "FAT sector count mismatch: header says {}, DIFAT lists {}",
                header.num_fat_sectors,
                fat_sectors.len()
            );
        }
        if fat_sectors.is_empty() {
            return Err(malformed("no FAT sectors"));
        }

        let mut fat = Vec::with_capacity(fat_sectors.len() * self.sector_size / 4);
        for sector in fat_sectors {
            fat.extend(u32_table(self.sector(sector)?));
        }
        Ok(fat)
    }

    /// Follow a FAT chain, optionally truncating to `size` bytes
    fn read_chain(&self, start: u32, fat: &[u32], size: Option<u64>) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let mut current = start;
        let mut steps = 0usize;

        while current != ENDOFCHAIN {
            if current == FREESECT || current == FATSECT || current == DIFSECT {
                return Err(malformed(format!("chain reaches special sector {:#x}", current)));
            }
            steps += 1;
            if steps > fat.len() {
                return Err(malformed("sector chain loops"));
            }
            data.extend_from_slice(self.sector(current)?);
            if let Some(limit) = size {
                if data.len() as u64 >= limit {
                    break;
                }
            }
            current = *fat
                .get(current as usize)
                .ok_or_else(|| malformed(format!("sector {:#x} missing from FAT", current)))?;
        }

        if let Some(limit) = size {
            if (data.len() as u64) < limit {
                return Err(malformed(format!(
                    "stream declares {} bytes but its chain holds {}",
                    limit,
                    data.len()
                )));
            }
            data.truncate(limit as usize);
        }
        Ok(data)
    }
}

/// Follow a mini FAT chain through the mini stream
fn read_mini_chain(mini_stream: &[u8], start: u32, size: u64, mini_fat: &[u32]) -> Result<Vec<u8>> {
    const MINI_SECTOR_SIZE: usize = 64;
    if size > mini_stream.len() as u64 {
        return Err(malformed(format!(
            "stream declares {} bytes but the mini stream holds {}",
            size,
            mini_stream.len()
        )));
    }
    let mut data = Vec::with_capacity(size as usize);
    let mut current = start;
    let mut steps = 0usize;

    while (data.len() as u64) < size {
        if current == ENDOFCHAIN {
            return Err(malformed("mini stream chain ends early"));
        }
        steps += 1;
        if steps > mini_fat.len() {
            return Err(malformed("mini sector chain loops or leaves the mini FAT"));
        }
        let offset = current as usize * MINI_SECTOR_SIZE;
        let sector = mini_stream
            .get(offset..offset + MINI_SECTOR_SIZE)
            .ok_or_else(|| malformed(format!("mini sector {:#x} outside mini stream", current)))?;
        data.extend_from_slice(sector);
        current = *mini_fat
            .get(current as usize)
            .ok_or_else(|| malformed(format!("mini sector {:#x} missing from mini FAT", current)))?;
    }

    data.truncate(size as usize);
    Ok(data)
}

fn u32_table(raw: &[u8]) -> Vec<u32> {
    raw.chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

impl OleHeader {
    fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let read = |e: std::io::Error| malformed(format!("header: {}", e));

        // Signature and CLSID
        cursor.seek(SeekFrom::Start(24)).map_err(read)?;

        let minor_version = cursor.read_u16::<LittleEndian>().map_err(read)?;
        let major_version = cursor.read_u16::<LittleEndian>().map_err(read)?;
        let byte_order = cursor.read_u16::<LittleEndian>().map_err(read)?;
        let sector_size_power = cursor.read_u16::<LittleEndian>().map_err(read)?;
        let mini_sector_size_power = cursor.read_u16::<LittleEndian>().map_err(read)?;

        if byte_order != 0xFFFE {
            return Err(malformed(format!("byte order mark {:#06x}", byte_order)));
        }
        match (major_version, sector_size_power) {
            (3, 9) | (4, 12) => {}
            _ => {
                return Err(malformed(format!(
                    "version {} with sector shift {} is not a valid combination",
                    major_version, sector_size_power
                )))
            }
        }
        if mini_sector_size_power != 6 {
            return Err(malformed(format!(
                "mini sector shift {}",
                mini_sector_size_power
            )));
        }

        // Reserved
        cursor.seek(SeekFrom::Current(6)).map_err(read)?;

        let num_directory_sectors = cursor.read_u32::<LittleEndian>().map_err(read)?;
        let num_fat_sectors = cursor.read_u32::<LittleEndian>().map_err(read)?;
        let directory_first_sector = cursor.read_u32::<LittleEndian>().map_err(read)?;
        let _transaction_signature = cursor.read_u32::<LittleEndian>().map_err(read)?;
        let mini_stream_cutoff = cursor.read_u32::<LittleEndian>().map_err(read)?;
        let mini_fat_first_sector = cursor.read_u32::<LittleEndian>().map_err(read)?;
        let num_mini_fat_sectors = cursor.read_u32::<LittleEndian>().map_err(read)?;
        let difat_first_sector = cursor.read_u32::<LittleEndian>().map_err(read)?;
        let num_difat_sectors = cursor.read_u32::<LittleEndian>().map_err(read)?;

        let mut difat = Vec::with_capacity(HEADER_DIFAT_ENTRIES);
        for _ in 0..HEADER_DIFAT_ENTRIES {
            difat.push(cursor.read_u32::<LittleEndian>().map_err(read)?);
        }

        Ok(OleHeader {
            minor_version,
            major_version,
            sector_size_power,
            mini_sector_size_power,
            num_directory_sectors,
            num_fat_sectors,
            directory_first_sector,
            mini_stream_cutoff,
            mini_fat_first_sector,
            num_mini_fat_sectors,
            difat_first_sector,
            num_difat_sectors,
            difat,
        })
    }
}

impl DirectoryEntry {
    fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let read = |e: std::io::Error| malformed(format!("directory entry: {}", e));

        let mut name_utf16 = [0u16; 32];
        for unit in name_utf16.iter_mut() {
            *unit = cursor.read_u16::<LittleEndian>().map_err(read)?;
        }
        let name_length = cursor.read_u16::<LittleEndian>().map_err(read)?;
        // Length is in bytes and includes the terminating NUL
        let char_count = ((name_length / 2) as usize).saturating_sub(1).min(31);
        let name = String::from_utf16_lossy(&name_utf16[..char_count]);

        let entry_type = OleEntryType::from(cursor.read_u8().map_err(read)?);
        let _color_flag = cursor.read_u8().map_err(read)?;
        let left_sibling_id = cursor.read_u32::<LittleEndian>().map_err(read)?;
        let right_sibling_id = cursor.read_u32::<LittleEndian>().map_err(read)?;
        let child_id = cursor.read_u32::<LittleEndian>().map_err(read)?;

        // CLSID, state bits, creation and modified times
        let mut skipped = [0u8; 16 + 4 + 8 + 8];
        cursor.read_exact(&mut skipped).map_err(read)?;

        let starting_sector = cursor.read_u32::<LittleEndian>().map_err(read)?;
        let size = cursor.read_u64::<LittleEndian>().map_err(read)?;

        Ok(DirectoryEntry {
            name,
            entry_type,
            left_sibling_id,
            right_sibling_id,
            child_id,
            starting_sector,
            size,
        })
    }
}
