//! Best-effort display names for shell namespace paths.
//!
//! DestList paths for virtual folders are not file system paths but parsing
//! names such as `knownfolder:{18989B1D-...}` or
//! `::{26EE0668-...}\0\::{...}`. The resolver swaps the identifiers it knows
//! for readable names. The output is for display only.

use crate::known_ids::{control_panel_category, known_guids, CONTROL_PANEL_ROOT};

const KNOWN_FOLDER_PREFIX: &str = "knownfolder";
const GUID_TEXT_LEN: usize = 36;
/// `::{` + 36 characters + `}`
const SHELL_SEGMENT_LEN: usize = GUID_TEXT_LEN + 4;

/// Resolve a raw DestList path to display text.
///
/// Returns an empty string for ordinary paths, which need no resolution.
pub fn resolve_path(path: &str) -> String {
    if let Some(resolved) = resolve_known_folder(path) {
        return resolved;
    }
    if !path.contains("::{") {
        return String::new();
    }

    let separator = if path.contains('\\') || !path.contains('/') {
        '\\'
    } else {
        '/'
    };
    let mut resolved = Vec::new();
    let mut after_control_panel = false;

    for segment in path.split(separator) {
        if after_control_panel {
            after_control_panel = false;
            resolved.push(category_name(segment));
            continue;
        }
        match shell_segment_id(segment) {
            Some(id) => {
                after_control_panel = id.eq_ignore_ascii_case(CONTROL_PANEL_ROOT);
                let name = known_guids()
                    .lookup_str(id)
                    .map(str::to_string)
                    .unwrap_or_else(|| segment.to_string());
                resolved.push(name);
            }
            None => resolved.push(segment.to_string()),
        }
    }
    resolved.join(&separator.to_string())
}

/// `knownfolder` followed by an identifier, optionally as `:{...}`
fn resolve_known_folder(path: &str) -> Option<String> {
    let prefix = path.get(..KNOWN_FOLDER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(KNOWN_FOLDER_PREFIX) {
        return None;
    }
    let rest = &path[KNOWN_FOLDER_PREFIX.len()..];
    let rest = rest.strip_prefix(':').unwrap_or(rest);
    let rest = rest.strip_prefix('{').unwrap_or(rest);
    let id = rest.get(..GUID_TEXT_LEN)?;
    Some(
        known_guids()
            .lookup_str(id)
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string()),
    )
}

/// Identifier text of a `::{...}` segment
fn shell_segment_id(segment: &str) -> Option<&str> {
    if segment.len() != SHELL_SEGMENT_LEN || !segment.starts_with("::{") || !segment.ends_with('}')
    {
        return None;
    }
    segment.get(3..3 + GUID_TEXT_LEN)
}

fn category_name(segment: &str) -> String {
    u8::from_str_radix(segment, 16)
        .ok()
        .and_then(control_panel_category)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Unknown Control Panel category ({})", segment))
}
