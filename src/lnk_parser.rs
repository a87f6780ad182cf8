//! Windows LNK (Shell Link) parser
//!
//! Jump lists embed one shell link per entry: as a stream of the compound
//! document for automatic destinations, back to back for custom destinations.
//! The parser decodes the header, LinkInfo, StringData and the extra data
//! blocks that carry forensic value (distributed link tracker, known folder),
//! then projects the result into a flat [`ShortcutRecord`].

use crate::datetime::filetime_to_datetime;
use crate::error::{Error, Result};
use crate::guid::StructuredIdentifier;
use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, Utc};
use encoding::all::WINDOWS_1252;
use encoding::{DecoderTrap, Encoding};
use serde::Serialize;
use std::fmt;
use std::io::Cursor;

/// First four bytes of every shell link (the header size, 0x4C)
pub const LNK_SIGNATURE: [u8; 4] = [0x4C, 0x00, 0x00, 0x00];

/// Size of the fixed shell link header
pub const LNK_HEADER_SIZE: usize = 76;

/// {00021401-0000-0000-C000-000000000046} as stored on disk
pub const LNK_CLSID: [u8; 16] = [
    0x01, 0x14, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46,
];

const TRACKER_BLOCK: u32 = 0xA000_0003;
const KNOWN_FOLDER_BLOCK: u32 = 0xA000_000B;

bitflags! {
    /// LinkFlags from the shell link header
    pub struct LinkFlags: u32 {
        const HAS_LINK_TARGET_ID_LIST         = 0x0000_0001;
        const HAS_LINK_INFO                   = 0x0000_0002;
        const HAS_NAME                        = 0x0000_0004;
        const HAS_RELATIVE_PATH               = 0x0000_0008;
        const HAS_WORKING_DIR                 = 0x0000_0010;
        const HAS_ARGUMENTS                   = 0x0000_0020;
        const HAS_ICON_LOCATION               = 0x0000_0040;
        const IS_UNICODE                      = 0x0000_0080;
        const FORCE_NO_LINK_INFO              = 0x0000_0100;
        const HAS_EXP_STRING                  = 0x0000_0200;
        const RUN_IN_SEPARATE_PROCESS         = 0x0000_0400;
        const HAS_DARWIN_ID                   = 0x0000_1000;
        const RUN_AS_USER                     = 0x0000_2000;
        const HAS_EXP_ICON                    = 0x0000_4000;
        const NO_PIDL_ALIAS                   = 0x0000_8000;
        const RUN_WITH_SHIM_LAYER             = 0x0002_0000;
        const FORCE_NO_LINK_TRACK             = 0x0004_0000;
        const ENABLE_TARGET_METADATA          = 0x0008_0000;
        const DISABLE_LINK_PATH_TRACKING      = 0x0010_0000;
        const DISABLE_KNOWN_FOLDER_TRACKING   = 0x0020_0000;
        const DISABLE_KNOWN_FOLDER_ALIAS      = 0x0040_0000;
        const ALLOW_LINK_TO_LINK              = 0x0080_0000;
        const UNALIAS_ON_SAVE                 = 0x0100_0000;
        const PREFER_ENVIRONMENT_PATH         = 0x0200_0000;
        const KEEP_LOCAL_ID_LIST_FOR_UNC      = 0x0400_0000;
    }
}

bitflags! {
    /// LinkInfoFlags
    pub struct LinkInfoFlags: u32 {
        const VOLUME_ID_AND_LOCAL_BASE_PATH               = 0x0000_0001;
        const COMMON_NETWORK_RELATIVE_LINK_AND_PATH_SUFFIX = 0x0000_0002;
    }
}

fn truncated(section: &'static str) -> impl Fn(std::io::Error) -> Error {
    move |_| Error::TruncatedRecord(format!("LNK {} runs past end of data", section))
}

/// Borrow `len` bytes at the cursor and advance past them
fn take<'a>(cursor: &mut Cursor<&'a [u8]>, len: usize, section: &str) -> Result<&'a [u8]> {
    let data: &'a [u8] = *cursor.get_ref();
    let start = cursor.position() as usize;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| {
            Error::TruncatedRecord(format!(
                "LNK {} of {} bytes at offset {} runs past end of data",
                section, len, start
            ))
        })?;
    cursor.set_position(end as u64);
    Ok(&data[start..end])
}

fn u32_at(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset.checked_add(4)?)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// NUL-terminated Windows-1252 string at `offset`
fn ansi_at(data: &[u8], offset: usize) -> Option<String> {
    let tail = data.get(offset..)?;
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    Some(decode_ansi(&tail[..end]))
}

/// NUL-terminated UTF-16LE string at `offset`
fn utf16_at(data: &[u8], offset: usize) -> Option<String> {
    let tail = data.get(offset..)?;
    let units: Vec<u16> = tail
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    Some(String::from_utf16_lossy(&units))
}

fn decode_ansi(bytes: &[u8]) -> String {
    WINDOWS_1252
        .decode(bytes, DecoderTrap::Replace)
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}

/// Shell link header (76 bytes)
#[derive(Debug, Clone, Serialize)]
pub struct ShellLinkHeader {
    pub link_flags: u32,
    pub file_attributes: u32,
    /// FILETIME
    pub creation_time: u64,
    /// FILETIME
    pub access_time: u64,
    /// FILETIME
    pub write_time: u64,
    pub file_size: u32,
    pub icon_index: i32,
    pub show_command: u32,
    pub hotkey: u16,
}

impl ShellLinkHeader {
    pub fn flags(&self) -> LinkFlags {
        LinkFlags::from_bits_truncate(self.link_flags)
    }
}

/// Drive type from the VolumeID structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriveType {
    Unknown,
    NoRootDir,
    Removable,
    Fixed,
    Remote,
    CdRom,
    RamDisk,
    Other(u32),
}

impl From<u32> for DriveType {
    fn from(value: u32) -> Self {
        match value {
            0 => DriveType::Unknown,
            1 => DriveType::NoRootDir,
            2 => DriveType::Removable,
            3 => DriveType::Fixed,
            4 => DriveType::Remote,
            5 => DriveType::CdRom,
            6 => DriveType::RamDisk,
            other => DriveType::Other(other),
        }
    }
}

impl fmt::Display for DriveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveType::Unknown => write!(f, "Unknown"),
            DriveType::NoRootDir => write!(f, "No root directory"),
            DriveType::Removable => write!(f, "Removable"),
            DriveType::Fixed => write!(f, "Fixed"),
            DriveType::Remote => write!(f, "Network"),
            DriveType::CdRom => write!(f, "CD-ROM"),
            DriveType::RamDisk => write!(f, "RAM disk"),
            DriveType::Other(value) => write!(f, "Type {}", value),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeId {
    pub drive_type: DriveType,
    pub serial_number: u32,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkInfo {
    pub flags: u32,
    pub volume_id: Option<VolumeId>,
    pub local_base_path: Option<String>,
    /// Share name from the CommonNetworkRelativeLink
    pub network_share: Option<String>,
    pub common_path_suffix: Option<String>,
}

impl LinkInfo {
    /// Local base path or share name joined with the common path suffix
    pub fn target_path(&self) -> Option<String> {
        let suffix = self.common_path_suffix.as_deref().unwrap_or("");
        if let Some(base) = self.local_base_path.as_deref().filter(|p| !p.is_empty()) {
            return Some(format!("{}{}", base, suffix));
        }
        let share = self.network_share.as_deref().filter(|s| !s.is_empty())?;
        if suffix.is_empty() {
            Some(share.to_string())
        } else {
            Some(format!("{}\\{}", share.trim_end_matches('\\'), suffix))
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StringData {
    pub name: Option<String>,
    pub relative_path: Option<String>,
    pub working_directory: Option<String>,
    pub arguments: Option<String>,
    pub icon_location: Option<String>,
}

/// Distributed link tracker block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerData {
    /// NetBIOS name of the machine the target last lived on
    pub machine_id: String,
    pub droid_volume: StructuredIdentifier,
    pub droid_file: StructuredIdentifier,
    pub birth_droid_volume: StructuredIdentifier,
    pub birth_droid_file: StructuredIdentifier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnownFolderData {
    pub folder_id: StructuredIdentifier,
    /// Symbolic name when the folder id is well known
    pub name: Option<String>,
    /// Offset of the folder's item in the IDList
    pub offset: u32,
}

/// Extra data block kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExtraDataKind {
    EnvironmentProps,
    ConsoleProps,
    TrackerProps,
    ConsoleCodepage,
    SpecialFolderProps,
    DarwinProps,
    IconEnvironmentProps,
    ShimProps,
    PropertyStoreProps,
    KnownFolderProps,
    VistaAndAboveIDListProps,
    Unknown(u32),
}

impl From<u32> for ExtraDataKind {
    fn from(signature: u32) -> Self {
        match signature {
            0xA000_0001 => ExtraDataKind::EnvironmentProps,
            0xA000_0002 => ExtraDataKind::ConsoleProps,
            TRACKER_BLOCK => ExtraDataKind::TrackerProps,
            0xA000_0004 => ExtraDataKind::ConsoleCodepage,
            0xA000_0005 => ExtraDataKind::SpecialFolderProps,
            0xA000_0006 => ExtraDataKind::DarwinProps,
            0xA000_0007 => ExtraDataKind::IconEnvironmentProps,
            0xA000_0008 => ExtraDataKind::ShimProps,
            0xA000_0009 => ExtraDataKind::PropertyStoreProps,
            KNOWN_FOLDER_BLOCK => ExtraDataKind::KnownFolderProps,
            0xA000_000C => ExtraDataKind::VistaAndAboveIDListProps,
            other => ExtraDataKind::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtraDataBlock {
    pub kind: ExtraDataKind,
    pub size: u32,
}

/// Fully decoded shell link
#[derive(Debug, Clone, Serialize)]
pub struct ShellLink {
    pub header: ShellLinkHeader,
    /// Size of the LinkTargetIDList, which is skipped
    pub id_list_size: Option<u16>,
    pub link_info: Option<LinkInfo>,
    pub string_data: StringData,
    pub extra_blocks: Vec<ExtraDataBlock>,
    pub tracker: Option<TrackerData>,
    pub known_folder: Option<KnownFolderData>,
}

/// The fields of a shell link the rest of the decoder works with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortcutRecord {
    pub target_path: Option<String>,
    pub arguments: Option<String>,
    pub working_directory: Option<String>,
    pub icon_location: Option<String>,
    pub name: Option<String>,
    pub relative_path: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub file_size: u32,
    pub file_attributes: u32,
    pub volume_serial: Option<u32>,
    pub volume_type: Option<DriveType>,
    pub volume_label: Option<String>,
    pub network_share: Option<String>,
    pub tracker: Option<TrackerData>,
    pub known_folder: Option<KnownFolderData>,
}

impl From<ShellLink> for ShortcutRecord {
    fn from(link: ShellLink) -> Self {
        let target_path = link
            .link_info
            .as_ref()
            .and_then(LinkInfo::target_path)
            .or_else(|| link.string_data.relative_path.clone());
        let volume = link.link_info.as_ref().and_then(|i| i.volume_id.as_ref());

        ShortcutRecord {
            target_path,
            volume_serial: volume.map(|v| v.serial_number),
            volume_type: volume.map(|v| v.drive_type),
            volume_label: volume.and_then(|v| v.label.clone()),
            network_share: link.link_info.as_ref().and_then(|i| i.network_share.clone()),
            arguments: link.string_data.arguments,
            working_directory: link.string_data.working_directory,
            icon_location: link.string_data.icon_location,
            name: link.string_data.name,
            relative_path: link.string_data.relative_path,
            created: filetime_to_datetime(link.header.creation_time),
            accessed: filetime_to_datetime(link.header.access_time),
            modified: filetime_to_datetime(link.header.write_time),
            file_size: link.header.file_size,
            file_attributes: link.header.file_attributes,
            tracker: link.tracker,
            known_folder: link.known_folder,
        }
    }
}

/// LNK parser
#[derive(Debug, Clone, Copy, Default)]
pub struct LnkParser;

impl LnkParser {
    pub fn new() -> Self {
        Self
    }

    /// Decode a shell link and project it into a [`ShortcutRecord`]
    pub fn parse_shortcut(&self, data: &[u8]) -> Result<ShortcutRecord> {
        self.parse_lnk_data(data).map(ShortcutRecord::from)
    }

    /// Parse LNK data. Bytes after the terminal extra data block are ignored.
    pub fn parse_lnk_data(&self, data: &[u8]) -> Result<ShellLink> {
        if data.len() < LNK_SIGNATURE.len() {
            return Err(Error::ShortSignature(format!(
                "{} bytes is too short to be a shortcut file",
                data.len()
            )));
        }
        if data[..4] != LNK_SIGNATURE {
            return Err(Error::BadSignature(format!(
                "not a shortcut file (header size {:02x?})",
                &data[..4]
            )));
        }
        if data.len() < LNK_HEADER_SIZE {
            return Err(Error::ShortSignature(format!(
                "{} bytes is too short to be a shortcut file, need at least {}",
                data.len(),
                LNK_HEADER_SIZE
            )));
        }

        let mut cursor = Cursor::new(data);
        let header = self.parse_header(&mut cursor)?;
        let flags = header.flags();

        let id_list_size = if flags.contains(LinkFlags::HAS_LINK_TARGET_ID_LIST) {
            let size = cursor.read_u16::<LittleEndian>().map_err(truncated("IDList size"))?;
            take(&mut cursor, size as usize, "IDList")?;
            Some(size)
        } else {
            None
        };

        let link_info = if flags.contains(LinkFlags::HAS_LINK_INFO)
            && !flags.contains(LinkFlags::FORCE_NO_LINK_INFO)
        {
            Some(self.parse_link_info(&mut cursor)?)
        } else {
            None
        };

        let string_data = self.parse_string_data(&mut cursor, flags)?;

        let mut link = ShellLink {
            header,
            id_list_size,
            link_info,
            string_data,
            extra_blocks: Vec::new(),
            tracker: None,
            known_folder: None,
        };
        self.parse_extra_data(&mut cursor, &mut link);
        Ok(link)
    }

    fn parse_header(&self, cursor: &mut Cursor<&[u8]>) -> Result<ShellLinkHeader> {
        let read = truncated("header");
        let _header_size = cursor.read_u32::<LittleEndian>().map_err(&read)?;

        let clsid = take(cursor, 16, "header CLSID")?;
        if clsid != LNK_CLSID {
            return Err(Error::BadSignature(
                "shell link CLSID is not 00021401-0000-0000-C000-000000000046".to_string(),
            ));
        }

        let link_flags = cursor.read_u32::<LittleEndian>().map_err(&read)?;
        let file_attributes = cursor.read_u32::<LittleEndian>().map_err(&read)?;
        let creation_time = cursor.read_u64::<LittleEndian>().map_err(&read)?;
        let access_time = cursor.read_u64::<LittleEndian>().map_err(&read)?;
        let write_time = cursor.read_u64::<LittleEndian>().map_err(&read)?;
        let file_size = cursor.read_u32::<LittleEndian>().map_err(&read)?;
        let icon_index = cursor.read_i32::<LittleEndian>().map_err(&read)?;
        let show_command = cursor.read_u32::<LittleEndian>().map_err(&read)?;
        let hotkey = cursor.read_u16::<LittleEndian>().map_err(&read)?;
        // Reserved
        take(cursor, 10, "header")?;

        Ok(ShellLinkHeader {
            link_flags,
            file_attributes,
            creation_time,
            access_time,
            write_time,
            file_size,
            icon_index,
            show_command,
            hotkey,
        })
    }

    fn parse_link_info(&self, cursor: &mut Cursor<&[u8]>) -> Result<LinkInfo> {
        let start = cursor.position() as usize;
        let size = cursor.read_u32::<LittleEndian>().map_err(truncated("LinkInfo size"))? as usize;
        if size < 28 {
            return Err(Error::TruncatedRecord(format!("LinkInfo size {} below 28", size)));
        }
        cursor.set_position(start as u64);
        let info = take(cursor, size, "LinkInfo")?;

        let field = |offset: usize| {
            u32_at(info, offset).ok_or_else(|| {
                Error::TruncatedRecord(format!("LinkInfo field at {} past end", offset))
            })
        };
        let header_size = field(4)?;
        let flags = LinkInfoFlags::from_bits_truncate(field(8)?);
        let volume_id_offset = field(12)? as usize;
        let local_base_path_offset = field(16)? as usize;
        let network_link_offset = field(20)? as usize;
        let suffix_offset = field(24)? as usize;
        let (local_base_path_offset_unicode, suffix_offset_unicode) = if header_size >= 0x24 {
            (Some(field(28)? as usize), Some(field(32)? as usize))
        } else {
            (None, None)
        };

        let string_at = |offset: usize, unicode: bool| -> Result<String> {
            let value = if unicode {
                utf16_at(info, offset)
            } else {
                ansi_at(info, offset)
            };
            value.ok_or_else(|| {
                Error::TruncatedRecord(format!("LinkInfo string offset {} past end", offset))
            })
        };

        let mut volume_id = None;
        let mut local_base_path = None;
        if flags.contains(LinkInfoFlags::VOLUME_ID_AND_LOCAL_BASE_PATH) {
            volume_id = Some(parse_volume_id(info, volume_id_offset)?);
            local_base_path = Some(match local_base_path_offset_unicode {
                Some(offset) if offset > 0 => string_at(offset, true)?,
                _ => string_at(local_base_path_offset, false)?,
            });
        }

        let network_share = if flags
            .contains(LinkInfoFlags::COMMON_NETWORK_RELATIVE_LINK_AND_PATH_SUFFIX)
        {
            parse_network_share(info, network_link_offset)?
        } else {
            None
        };

        let common_path_suffix = match suffix_offset_unicode {
            Some(offset) if offset > 0 => Some(string_at(offset, true)?),
            _ if suffix_offset > 0 => Some(string_at(suffix_offset, false)?),
            _ => None,
        };

        Ok(LinkInfo {
            flags: flags.bits(),
            volume_id,
            local_base_path,
            network_share,
            common_path_suffix,
        })
    }

    fn parse_string_data(&self, cursor: &mut Cursor<&[u8]>, flags: LinkFlags) -> Result<StringData> {
        let unicode = flags.contains(LinkFlags::IS_UNICODE);
        let mut read = |present: LinkFlags, section: &'static str| -> Result<Option<String>> {
            if !flags.contains(present) {
                return Ok(None);
            }
            let count = cursor.read_u16::<LittleEndian>().map_err(truncated(section))? as usize;
            if unicode {
                let raw = take(cursor, count * 2, section)?;
                let units: Vec<u16> = raw
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                Ok(Some(String::from_utf16_lossy(&units)))
            } else {
                Ok(Some(decode_ansi(take(cursor, count, section)?)))
            }
        };

        Ok(StringData {
            name: read(LinkFlags::HAS_NAME, "name string")?,
            relative_path: read(LinkFlags::HAS_RELATIVE_PATH, "relative path")?,
            working_directory: read(LinkFlags::HAS_WORKING_DIR, "working directory")?,
            arguments: read(LinkFlags::HAS_ARGUMENTS, "arguments")?,
            icon_location: read(LinkFlags::HAS_ICON_LOCATION, "icon location")?,
        })
    }

    /// Walk extra data blocks up to the terminal block. A malformed block ends
    /// the walk; what was decoded before it is kept.
    fn parse_extra_data(&self, cursor: &mut Cursor<&[u8]>, link: &mut ShellLink) {
        loop {
            let start = cursor.position() as usize;
            let data: &[u8] = *cursor.get_ref();
            let size = match u32_at(data, start) {
                Some(size) => size as usize,
                None => break,
            };
            if size < 4 {
                break;
            }
            let block = match take(cursor, size, "extra data block") {
                Ok(block) if size >= 8 => block,
                _ => {
                    log::debug!("extra data block of {} bytes at offset {} is malformed", size, start);
                    break;
                }
            };

            let signature = u32_at(block, 4).unwrap_or_default();
            let kind = ExtraDataKind::from(signature);
            match kind {
                ExtraDataKind::TrackerProps => link.tracker = parse_tracker(block),
                ExtraDataKind::KnownFolderProps => link.known_folder = parse_known_folder(block),
                _ => {}
            }
            link.extra_blocks.push(ExtraDataBlock {
                kind,
                size: size as u32,
            });
        }
    }
}

fn parse_volume_id(info: &[u8], offset: usize) -> Result<VolumeId> {
    let field = |at: usize| {
        u32_at(info, offset + at)
            .ok_or_else(|| Error::TruncatedRecord("VolumeID runs past end of LinkInfo".to_string()))
    };
    let drive_type = DriveType::from(field(4)?);
    let serial_number = field(8)?;
    let label_offset = field(12)? as usize;
    let label = if label_offset == 0x14 {
        let unicode_offset = field(16)? as usize;
        utf16_at(info, offset + unicode_offset)
    } else {
        ansi_at(info, offset + label_offset)
    };
    Ok(VolumeId {
        drive_type,
        serial_number,
        label: label.filter(|l| !l.is_empty()),
    })
}

fn parse_network_share(info: &[u8], offset: usize) -> Result<Option<String>> {
    let field = |at: usize| {
        u32_at(info, offset + at).ok_or_else(|| {
            Error::TruncatedRecord("CommonNetworkRelativeLink runs past end of LinkInfo".to_string())
        })
    };
    let net_name_offset = field(8)? as usize;
    let name = if net_name_offset > 0x14 {
        let unicode_offset = field(20)? as usize;
        utf16_at(info, offset + unicode_offset)
    } else {
        ansi_at(info, offset + net_name_offset)
    };
    Ok(name.filter(|n| !n.is_empty()))
}

fn parse_tracker(block: &[u8]) -> Option<TrackerData> {
    if block.len() < 0x60 {
        log::debug!("tracker block of {} bytes is too short", block.len());
        return None;
    }
    let machine = &block[16..32];
    let end = machine.iter().position(|&b| b == 0).unwrap_or(machine.len());
    Some(TrackerData {
        machine_id: decode_ansi(&machine[..end]),
        droid_volume: StructuredIdentifier::parse(&block[32..48]).ok()?,
        droid_file: StructuredIdentifier::parse(&block[48..64]).ok()?,
        birth_droid_volume: StructuredIdentifier::parse(&block[64..80]).ok()?,
        birth_droid_file: StructuredIdentifier::parse(&block[80..96]).ok()?,
    })
}

fn parse_known_folder(block: &[u8]) -> Option<KnownFolderData> {
    if block.len() < 0x1C {
        return None;
    }
    let folder_id = StructuredIdentifier::parse(&block[8..24]).ok()?;
    Some(KnownFolderData {
        name: folder_id.symbolic_name().map(str::to_string),
        folder_id,
        offset: u32_at(block, 24)?,
    })
}
