//! DestList stream parsing.
//!
//! The `DestList` stream of an automatic destinations file is the MRU index:
//! a 32-byte header followed by one variable-length record per entry. Each
//! record names the stream holding its shell link through `entry_number`
//! (formatted as lowercase hex).
//!
//! Record layout, offsets in bytes:
//!
//! ```text
//!   0  u64   checksum
//!   8  GUID  volume droid
//!  24  GUID  file droid
//!  40  GUID  birth volume droid
//!  56  GUID  birth file droid
//!  72  [16]  NetBIOS hostname
//!  88  u32   entry number
//!  92  u32   unknown
//!  96  f32   access count
//! 100  u32   last modified (low half of FILETIME)
//! 104  u32   last modified (high half)
//! 108  i32   pin status, -1 when not pinned
//! --- version 1 ---
//! 112  u16   path length in UTF-16 units, then the path
//! --- version >= 2 ---
//! 112  u32   unknown
//! 116  u32   interaction count
//! 120  u64   unknown
//! 128  u16   path length in UTF-16 units, then the path,
//!            then a u32 block length and that many bytes
//! ```

use crate::datetime::filetime_to_datetime_or_epoch;
use crate::error::{Error, Result};
use crate::guid::StructuredIdentifier;
use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, Utc};
use encoding::all::WINDOWS_1252;
use encoding::{DecoderTrap, Encoding};
use serde::Serialize;
use std::collections::HashSet;
use std::io::{Cursor, Read};

/// Name of the index stream inside an automatic destinations file
pub const DESTLIST_STREAM: &str = "DestList";

/// Highest DestList version seen in the wild (Windows 10/11)
const HIGHEST_OBSERVED_VERSION: u32 = 4;

/// Build a `TruncatedRecord` mapper for a named field
fn truncated(field: &'static str) -> impl Fn(std::io::Error) -> Error {
    move |_| Error::TruncatedRecord(format!("DestList {} runs past end of data", field))
}

/// Record layout selected by the header version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordLayout {
    /// Version 1 (Windows 7/8)
    Win7,
    /// Version 2 and later (Windows 10/11)
    Win10,
}

impl RecordLayout {
    pub fn from_version(version: u32) -> Result<Self> {
        match version {
            0 => Err(Error::UnsupportedVersion(version)),
            1 => Ok(RecordLayout::Win7),
            v => {
                if v > HIGHEST_OBSERVED_VERSION {
                    log::warn!(
                        "DestList version {} has not been observed, decoding with the version 2+ layout",
                        v
                    );
                }
                Ok(RecordLayout::Win10)
            }
        }
    }

    /// Bytes before the path length field
    pub fn prefix_len(self) -> usize {
        match self {
            RecordLayout::Win7 => 112,
            RecordLayout::Win10 => 128,
        }
    }

    /// Smallest possible record: empty path and, for version 2+, empty block
    pub fn min_record_len(self) -> usize {
        match self {
            RecordLayout::Win7 => self.prefix_len() + 2,
            RecordLayout::Win10 => self.prefix_len() + 2 + 4,
        }
    }
}

/// DestList header (32 bytes)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestListHeader {
    pub version: u32,
    pub entry_count: u32,
    pub pinned_count: u32,
    /// Undocumented, often a float-like counter
    pub unknown1: u32,
    /// Highest entry number issued so far
    pub last_entry_number: u32,
    pub unknown2: u32,
    /// Incremented on every change to the list
    pub last_revision: u32,
    pub unknown3: u32,
}

impl DestListHeader {
    pub const SIZE: usize = 32;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::TruncatedRecord(format!(
                "DestList header needs {} bytes, got {}",
                Self::SIZE,
                data.len()
            )));
        }
        let mut cursor = Cursor::new(data);
        let mut next = || cursor.read_u32::<LittleEndian>().map_err(truncated("header"));
        Ok(DestListHeader {
            version: next()?,
            entry_count: next()?,
            pinned_count: next()?,
            unknown1: next()?,
            last_entry_number: next()?,
            unknown2: next()?,
            last_revision: next()?,
            unknown3: next()?,
        })
    }

    pub fn layout(&self) -> Result<RecordLayout> {
        RecordLayout::from_version(self.version)
    }
}

/// Pin state of a DestList record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "order")]
pub enum PinStatus {
    NotPinned,
    /// Position in the pinned section of the list
    Pinned(u32),
}

impl PinStatus {
    fn from_raw(raw: i32) -> Self {
        if raw == -1 {
            PinStatus::NotPinned
        } else {
            PinStatus::Pinned(raw as u32)
        }
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, PinStatus::Pinned(_))
    }
}

/// One DestList record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestListRecord {
    pub checksum: u64,
    pub volume_droid: StructuredIdentifier,
    pub file_droid: StructuredIdentifier,
    pub birth_volume_droid: StructuredIdentifier,
    pub birth_file_droid: StructuredIdentifier,
    pub hostname: String,
    /// Correlates with the shell link stream named by this number in hex
    pub entry_number: u32,
    pub unknown1: u32,
    /// Stored as a 32-bit float
    pub access_count: f32,
    pub last_modified: DateTime<Utc>,
    pub pin_status: PinStatus,
    /// Version 2+ only
    pub interaction_count: Option<u32>,
    /// Version 2+ only
    pub unknown2: Option<u32>,
    /// Version 2+ only
    pub unknown3: Option<u64>,
    pub path: String,
    /// Version 2+ trailing block, carried through undecoded
    #[serde(skip)]
    pub property_block: Vec<u8>,
}

impl DestListRecord {
    /// Length of the record at the start of `data`, computed from its length
    /// fields and checked against the available bytes.
    pub fn record_len(data: &[u8], layout: RecordLayout) -> Result<usize> {
        let prefix = layout.prefix_len();
        let path_units = data
            .get(prefix..prefix + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .ok_or_else(|| {
                Error::TruncatedRecord(format!(
                    "DestList record needs at least {} bytes, got {}",
                    layout.min_record_len(),
                    data.len()
                ))
            })?;

        let mut span = prefix + 2 + path_units as usize * 2;
        if layout == RecordLayout::Win10 {
            let block_len = data
                .get(span..span + 4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .ok_or_else(|| {
                    Error::TruncatedRecord("DestList path runs past end of data".to_string())
                })?;
            span = span
                .checked_add(4)
                .and_then(|s| s.checked_add(block_len as usize))
                .ok_or_else(|| {
                    Error::TruncatedRecord(format!("DestList block length {} overflows", block_len))
                })?;
        }

        if span > data.len() {
            return Err(Error::TruncatedRecord(format!(
                "DestList record spans {} bytes but only {} remain",
                span,
                data.len()
            )));
        }
        Ok(span)
    }

    /// Decode one record. `data` must be exactly the record's span.
    pub fn parse(data: &[u8], layout: RecordLayout) -> Result<Self> {
        if data.len() < layout.min_record_len() {
            return Err(Error::TruncatedRecord(format!(
                "DestList record needs at least {} bytes, got {}",
                layout.min_record_len(),
                data.len()
            )));
        }
        let mut cursor = Cursor::new(data);

        let checksum = cursor.read_u64::<LittleEndian>().map_err(truncated("checksum"))?;
        let volume_droid =
            StructuredIdentifier::from_reader(&mut cursor).map_err(truncated("volume droid"))?;
        let file_droid =
            StructuredIdentifier::from_reader(&mut cursor).map_err(truncated("file droid"))?;
        let birth_volume_droid = StructuredIdentifier::from_reader(&mut cursor)
            .map_err(truncated("birth volume droid"))?;
        let birth_file_droid = StructuredIdentifier::from_reader(&mut cursor)
            .map_err(truncated("birth file droid"))?;

        let mut hostname_raw = [0u8; 16];
        cursor.read_exact(&mut hostname_raw).map_err(truncated("hostname"))?;
        let hostname = parse_hostname(&hostname_raw);

        let entry_number = cursor.read_u32::<LittleEndian>().map_err(truncated("entry number"))?;
        let unknown1 = cursor.read_u32::<LittleEndian>().map_err(truncated("unknown"))?;
        let access_count = cursor.read_f32::<LittleEndian>().map_err(truncated("access count"))?;

        // FILETIME stored as two 32-bit halves, low first
        let low = cursor.read_u32::<LittleEndian>().map_err(truncated("last modified"))?;
        let high = cursor.read_u32::<LittleEndian>().map_err(truncated("last modified"))?;
        let last_modified = filetime_to_datetime_or_epoch(((high as u64) << 32) | low as u64);

        let pin_status =
            PinStatus::from_raw(cursor.read_i32::<LittleEndian>().map_err(truncated("pin status"))?);

        let (unknown2, interaction_count, unknown3) = match layout {
            RecordLayout::Win7 => (None, None, None),
            RecordLayout::Win10 => (
                Some(cursor.read_u32::<LittleEndian>().map_err(truncated("unknown"))?),
                Some(cursor.read_u32::<LittleEndian>().map_err(truncated("interaction count"))?),
                Some(cursor.read_u64::<LittleEndian>().map_err(truncated("unknown"))?),
            ),
        };

        let path_units = cursor.read_u16::<LittleEndian>().map_err(truncated("path length"))?;
        let path = read_utf16(&mut cursor, path_units as usize)?;

        let property_block = match layout {
            RecordLayout::Win7 => Vec::new(),
            RecordLayout::Win10 => {
                let block_len =
                    cursor.read_u32::<LittleEndian>().map_err(truncated("block length"))? as usize;
                let remaining = data.len() - cursor.position() as usize;
                if block_len > remaining {
                    return Err(Error::TruncatedRecord(format!(
                        "DestList block of {} bytes but only {} remain",
                        block_len, remaining
                    )));
                }
                let mut block = vec![0u8; block_len];
                cursor.read_exact(&mut block).map_err(truncated("block"))?;
                block
            }
        };

        let consumed = cursor.position() as usize;
        if consumed != data.len() {
            return Err(Error::TruncatedRecord(format!(
                "DestList record decoded {} bytes of a declared {}",
                consumed,
                data.len()
            )));
        }

        Ok(DestListRecord {
            checksum,
            volume_droid,
            file_droid,
            birth_volume_droid,
            birth_file_droid,
            hostname,
            entry_number,
            unknown1,
            access_count,
            last_modified,
            pin_status,
            interaction_count,
            unknown2,
            unknown3,
            path,
            property_block,
        })
    }

    /// Name of the shell link stream this record points at
    pub fn stream_name(&self) -> String {
        format!("{:x}", self.entry_number)
    }
}

/// Parsed DestList stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestList {
    pub header: DestListHeader,
    pub layout: RecordLayout,
    pub records: Vec<DestListRecord>,
}

impl DestList {
    /// Decode the header and `entry_count` records.
    ///
    /// Fails as a whole if any record is truncated or if two records share an
    /// entry number.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = DestListHeader::parse(data)?;
        let layout = header.layout()?;

        let max_records = (data.len() - DestListHeader::SIZE) / layout.min_record_len();
        let mut records = Vec::with_capacity((header.entry_count as usize).min(max_records));
        let mut seen = HashSet::new();
        let mut offset = DestListHeader::SIZE;

        for index in 0..header.entry_count {
            let remaining = &data[offset..];
            let span = DestListRecord::record_len(remaining, layout).map_err(|e| match e {
                Error::TruncatedRecord(msg) => {
                    Error::TruncatedRecord(format!("entry {} at offset {}: {}", index, offset, msg))
                }
                other => other,
            })?;
            let record = DestListRecord::parse(&remaining[..span], layout)?;
            if !seen.insert(record.entry_number) {
                return Err(Error::DuplicateEntry(record.entry_number));
            }
            records.push(record);
            offset += span;
        }

        if offset < data.len() {
            log::debug!(
                "{} bytes follow the {} declared DestList entries",
                data.len() - offset,
                header.entry_count
            );
        }

        Ok(DestList {
            header,
            layout,
            records,
        })
    }
}

/// Hostname field: UTF-16 when the second byte is zero, otherwise a single-byte string
fn parse_hostname(raw: &[u8; 16]) -> String {
    if raw[1] == 0 {
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .take_while(|&u| u != 0)
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        WINDOWS_1252
            .decode(&raw[..end], DecoderTrap::Replace)
            .unwrap_or_else(|_| String::from_utf8_lossy(&raw[..end]).into_owned())
    }
}

fn read_utf16(cursor: &mut Cursor<&[u8]>, units: usize) -> Result<String> {
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if units * 2 > remaining {
        return Err(Error::TruncatedRecord(format!(
            "DestList path of {} characters but only {} bytes remain",
            units, remaining
        )));
    }
    let mut buffer = Vec::with_capacity(units);
    for _ in 0..units {
        buffer.push(cursor.read_u16::<LittleEndian>().map_err(truncated("path"))?);
    }
    // Some writers include the terminator in the count
    while buffer.last() == Some(&0) {
        buffer.pop();
    }
    Ok(String::from_utf16_lossy(&buffer))
}
