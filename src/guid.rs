//! 16-byte structured identifiers (GUID/UUID) as stored by Windows.
//!
//! Distributed link tracking stores its object ids ("droids") as little-endian
//! GUIDs. Depending on the version nibble an identifier can carry a 60-bit
//! timestamp (version 1) or a hardware address (version 6), which are useful
//! for attributing a file to a machine and a point in time.

use crate::datetime::uuid_ticks_to_datetime;
use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::str::FromStr;
use uuid::Uuid;

/// GUID laid out as a 32-bit field, two 16-bit fields and an 8-byte tail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StructuredIdentifier {
    pub data1: u32,
    pub data2: u16,
    /// Top nibble is the version tag
    pub data3: u16,
    pub data4: [u8; 8],
}

impl StructuredIdentifier {
    /// Encoded size in bytes
    pub const SIZE: usize = 16;

    /// Decode from the first 16 bytes of `data`
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::TruncatedRecord(format!(
                "identifier needs {} bytes, got {}",
                Self::SIZE,
                data.len()
            )));
        }
        let mut cursor = data;
        Self::from_reader(&mut cursor).map_err(|e| Error::TruncatedRecord(e.to_string()))
    }

    /// Decode from a reader positioned at the identifier
    pub fn from_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let data1 = reader.read_u32::<LittleEndian>()?;
        let data2 = reader.read_u16::<LittleEndian>()?;
        let data3 = reader.read_u16::<LittleEndian>()?;
        let mut data4 = [0u8; 8];
        reader.read_exact(&mut data4)?;
        Ok(Self {
            data1,
            data2,
            data3,
            data4,
        })
    }

    /// Version tag from the top nibble of the third field
    pub fn version(&self) -> u8 {
        (self.data3 >> 12) as u8
    }

    pub fn is_nil(&self) -> bool {
        self.data1 == 0 && self.data2 == 0 && self.data3 == 0 && self.data4 == [0u8; 8]
    }

    /// Raw 60-bit tick count since 1582-10-15, only for version 1
    pub fn timestamp_ticks(&self) -> Option<u64> {
        if self.version() != 1 {
            return None;
        }
        let high = (self.data3 & 0x0FFF) as u64;
        Some((high << 48) | ((self.data2 as u64) << 32) | self.data1 as u64)
    }

    /// Embedded creation time, only for version 1 identifiers
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp_ticks().and_then(uuid_ticks_to_datetime)
    }

    /// Last six bytes of the tail, only for version 6 identifiers
    pub fn as_hardware_address(&self) -> Option<[u8; 6]> {
        if self.version() != 6 {
            return None;
        }
        let mut node = [0u8; 6];
        node.copy_from_slice(&self.data4[2..]);
        Some(node)
    }

    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_fields(self.data1, self.data2, self.data3, &self.data4)
    }

    /// Name from the built-in table of well-known identifiers
    pub fn symbolic_name(&self) -> Option<&'static str> {
        crate::known_ids::known_guids().lookup(self)
    }
}

impl fmt::Display for StructuredIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid().hyphenated())
    }
}

impl FromStr for StructuredIdentifier {
    type Err = Error;

    /// Accepts the canonical dashed form, with or without braces, in any case
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('{').trim_end_matches('}');
        let uuid = Uuid::parse_str(trimmed)
            .map_err(|e| Error::InvalidInput(format!("'{}' is not a GUID: {}", s, e)))?;
        let (data1, data2, data3, data4) = uuid.as_fields();
        Ok(Self {
            data1,
            data2,
            data3,
            data4: *data4,
        })
    }
}

impl Serialize for StructuredIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Format a hardware address as colon separated hex
pub fn format_mac(addr: &[u8; 6]) -> String {
    addr.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Table mapping canonical identifier strings to human names
#[derive(Debug, Clone, Default)]
pub struct GuidNames {
    names: HashMap<String, String>,
}

impl GuidNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[(&str, &str)]) -> Self {
        let mut table = Self::new();
        for (guid, name) in entries {
            table.insert(guid, *name);
        }
        table
    }

    /// Insert a name under a dashed-hex identifier string
    pub fn insert(&mut self, guid: &str, name: impl Into<String>) {
        self.names.insert(Self::normalize(guid), name.into());
    }

    pub fn lookup(&self, id: &StructuredIdentifier) -> Option<&str> {
        self.names.get(&id.to_string()).map(String::as_str)
    }

    /// Lookup by string; braces and case are ignored
    pub fn lookup_str(&self, guid: &str) -> Option<&str> {
        self.names.get(&Self::normalize(guid)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn normalize(guid: &str) -> String {
        guid.trim()
            .trim_start_matches('{')
            .trim_end_matches('}')
            .to_ascii_lowercase()
    }
}
