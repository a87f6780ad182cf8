//! Windows Jump List decoding
//!
//! Supports:
//! - `.automaticDestinations-ms`: compound document with a `DestList` index
//!   and one shell link stream per entry
//! - `.customDestinations-ms`: shell links written back to back
//!
//! Decoding is a pure function of the input bytes; [`decode`] only adds the
//! file read.

use crate::carve::carve_shortcuts;
use crate::destlist::{DestList, DestListHeader, DestListRecord, DESTLIST_STREAM};
use crate::error::{Error, Result};
use crate::known_ids::app_name;
use crate::lnk_parser::{LnkParser, ShortcutRecord, LNK_SIGNATURE};
use crate::ole::CompoundFile;
use crate::path_resolver::resolve_path;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

pub const AUTOMATIC_SUFFIX: &str = ".automaticdestinations-ms";
pub const CUSTOM_SUFFIX: &str = ".customdestinations-ms";

/// Which of the two jump list formats a file uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JumpListKind {
    Automatic,
    Custom,
}

impl JumpListKind {
    /// Classify by file name suffix (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(AUTOMATIC_SUFFIX) {
            Some(JumpListKind::Automatic)
        } else if name.ends_with(CUSTOM_SUFFIX) {
            Some(JumpListKind::Custom)
        } else {
            None
        }
    }
}

impl fmt::Display for JumpListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JumpListKind::Automatic => write!(f, "automatic"),
            JumpListKind::Custom => write!(f, "custom"),
        }
    }
}

/// One DestList record joined with its shell link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JumpListEntry {
    /// Absent for custom destinations
    pub destlist: Option<DestListRecord>,
    /// Display form of the DestList path, empty when it needs no resolving
    pub resolved_path: String,
    /// Absent when no stream matches or the shell link did not decode
    pub shortcut: Option<ShortcutRecord>,
}

impl JumpListEntry {
    pub fn new(destlist: Option<DestListRecord>, shortcut: Option<ShortcutRecord>) -> Self {
        let resolved_path = destlist
            .as_ref()
            .map(|record| resolve_path(&record.path))
            .unwrap_or_default();
        Self {
            destlist,
            resolved_path,
            shortcut,
        }
    }
}

/// Everything decoded from one jump list file
#[derive(Debug, Clone, Serialize)]
pub struct JumpListArtifact {
    pub source: String,
    pub kind: JumpListKind,
    /// File name up to the first '.'
    pub app_id: String,
    pub app_name: Option<String>,
    /// Absent for custom destinations and for files without a DestList
    pub header: Option<DestListHeader>,
    pub entries: Vec<JumpListEntry>,
}

/// Application id from a jump list file name
pub fn app_id_from_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.split('.').next().map(str::to_string))
        .unwrap_or_default()
}

/// Read and decode a jump list file, choosing the format from its name
pub fn decode(path: &Path) -> Result<JumpListArtifact> {
    let kind = JumpListKind::from_path(path).ok_or_else(|| {
        Error::InvalidInput(format!(
            "{} is not an automaticDestinations-ms or customDestinations-ms file",
            path.display()
        ))
    })?;
    let data = fs::read(path)?;
    decode_bytes(&data, path, kind)
}

/// Decode jump list bytes already in memory. `path` names the source.
pub fn decode_bytes(data: &[u8], path: &Path, kind: JumpListKind) -> Result<JumpListArtifact> {
    let (header, entries) = match kind {
        JumpListKind::Automatic => decode_automatic(data)?,
        JumpListKind::Custom => (None, decode_custom(data)?),
    };
    let app_id = app_id_from_path(path);
    log::debug!(
        "{}: {} {} entries for app id {}",
        path.display(),
        entries.len(),
        kind,
        app_id
    );

    Ok(JumpListArtifact {
        source: path.display().to_string(),
        kind,
        app_name: app_name(&app_id).map(str::to_string),
        app_id,
        header,
        entries,
    })
}

fn decode_automatic(data: &[u8]) -> Result<(Option<DestListHeader>, Vec<JumpListEntry>)> {
    let doc = CompoundFile::parse(data)?;

    let destlist = match doc.get_stream(DESTLIST_STREAM) {
        Some(bytes) => Some(DestList::parse(bytes)?),
        None => {
            log::debug!("no DestList stream, file holds no entries");
            None
        }
    };

    let parser = LnkParser::new();
    let mut shortcuts: HashMap<String, ShortcutRecord> = HashMap::new();
    for (name, bytes) in doc.streams() {
        if name.eq_ignore_ascii_case(DESTLIST_STREAM) {
            continue;
        }
        if !bytes.starts_with(&LNK_SIGNATURE) {
            log::debug!("stream {} is not a shell link", name);
            continue;
        }
        match parser.parse_shortcut(bytes) {
            Ok(shortcut) => {
                shortcuts.insert(name.to_ascii_lowercase(), shortcut);
            }
            Err(e) => log::debug!("stream {}: {}", name, e),
        }
    }

    let destlist = match destlist {
        Some(destlist) => destlist,
        None => return Ok((None, Vec::new())),
    };

    let entries: Vec<JumpListEntry> = destlist
        .records
        .into_iter()
        .map(|record| {
            let shortcut = shortcuts.remove(&record.stream_name());
            JumpListEntry::new(Some(record), shortcut)
        })
        .collect();

    if !shortcuts.is_empty() {
        log::debug!("{} shell link streams have no DestList entry", shortcuts.len());
    }
    Ok((Some(destlist.header), entries))
}

fn decode_custom(data: &[u8]) -> Result<Vec<JumpListEntry>> {
    Ok(carve_shortcuts(data)?
        .into_iter()
        .map(|shortcut| JumpListEntry::new(None, Some(shortcut)))
        .collect())
}
