//! Shell link carving for `.customDestinations-ms` files.
//!
//! Custom destination files have no container: a short header and category
//! records are followed by shell links written back to back, and the file
//! ends with a 4-byte footer. Each link is found by its header size and CLSID,
//! which together are far less likely to occur inside a link than the 4-byte
//! header size alone.

use crate::error::{Error, Result};
use crate::lnk_parser::{LnkParser, ShortcutRecord, LNK_CLSID, LNK_SIGNATURE};

/// Trailer of every custom destinations file
pub const CUSTOM_FOOTER: [u8; 4] = [0xAB, 0xFB, 0xBF, 0xBA];

const MARKER_LEN: usize = LNK_SIGNATURE.len() + LNK_CLSID.len();

fn is_marker(window: &[u8]) -> bool {
    window[..4] == LNK_SIGNATURE && window[4..MARKER_LEN] == LNK_CLSID
}

/// Offset of the first shell link header at or after `from`
fn find_marker(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(MARKER_LEN)
        .position(is_marker)
        .map(|pos| pos + from)
}

/// Split `data` into one slice per shell link header.
///
/// Each blob runs up to the next header; the last one runs to the end of the
/// buffer, minus the footer when present.
pub fn split_blobs(data: &[u8]) -> Result<Vec<&[u8]>> {
    if data.len() < MARKER_LEN {
        return Err(Error::ShortSignature(format!(
            "{} bytes cannot hold a shell link header",
            data.len()
        )));
    }
    let mut start = find_marker(data, 0).ok_or_else(|| {
        Error::BadSignature("no shell link header in custom destinations data".to_string())
    })?;

    let mut blobs = Vec::new();
    while let Some(next) = find_marker(data, start + 1) {
        blobs.push(&data[start..next]);
        start = next;
    }

    let mut last = &data[start..];
    if let Some(footer) = last.windows(CUSTOM_FOOTER.len()).rposition(|w| w == CUSTOM_FOOTER) {
        last = &last[..footer];
    }
    blobs.push(last);
    Ok(blobs)
}

/// Decode every carved blob, skipping the ones that fail
pub fn carve_shortcuts(data: &[u8]) -> Result<Vec<ShortcutRecord>> {
    let parser = LnkParser::new();
    let blobs = split_blobs(data)?;
    let mut shortcuts = Vec::with_capacity(blobs.len());

    for (index, blob) in blobs.iter().enumerate() {
        match parser.parse_shortcut(blob) {
            Ok(shortcut) => shortcuts.push(shortcut),
            Err(e) => log::debug!("skipping carved shortcut {} ({} bytes): {}", index, blob.len(), e),
        }
    }
    Ok(shortcuts)
}
