//! Output formatting for decoded jump lists.
//!
//! Every [`JumpListEntry`] is flattened into a [`JumpListRow`] of plain
//! strings and numbers, which the JSON, CSV and human writers consume.

use crate::datetime::format_timestamp;
use crate::error::Result;
use crate::guid::{format_mac, StructuredIdentifier};
use crate::jumplist::{JumpListArtifact, JumpListEntry};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::Serialize;
use std::io::{BufWriter, Write};

/// Supported output formats
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable format, one block per entry
    Human,
    /// JSON array of rows
    Json,
    /// CSV with a header row
    Csv,
}

impl OutputFormat {
    /// Human output on a terminal, JSON when piped
    pub fn default_for(is_terminal: bool) -> Self {
        if is_terminal {
            OutputFormat::Human
        } else {
            OutputFormat::Json
        }
    }
}

/// Flat projection of one jump list entry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JumpListRow {
    pub source: String,
    pub list_type: String,
    pub app_id: String,
    pub app_name: String,
    pub entry_number: Option<u32>,
    pub destlist_path: String,
    pub resolved_path: String,
    pub hostname: String,
    pub pinned: Option<bool>,
    pub access_count: Option<f32>,
    pub interaction_count: Option<u32>,
    pub last_modified: String,
    pub volume_droid: String,
    pub file_droid: String,
    pub birth_volume_droid: String,
    pub birth_file_droid: String,
    pub file_droid_mac: String,
    pub file_droid_time: String,
    pub target_path: String,
    pub arguments: String,
    pub working_directory: String,
    pub icon_location: String,
    pub name: String,
    pub relative_path: String,
    pub target_created: String,
    pub target_accessed: String,
    pub target_modified: String,
    pub file_size: Option<u32>,
    pub volume_serial: String,
    pub volume_type: String,
    pub volume_label: String,
    pub tracker_machine_id: String,
}

fn droid(id: &StructuredIdentifier) -> String {
    if id.is_nil() {
        String::new()
    } else {
        id.to_string()
    }
}

fn time(value: Option<&DateTime<Utc>>, timezone: Tz) -> String {
    value
        .map(|t| format_timestamp(t, timezone))
        .unwrap_or_default()
}

impl JumpListRow {
    pub fn from_entry(artifact: &JumpListArtifact, entry: &JumpListEntry, timezone: Tz) -> Self {
        let mut row = JumpListRow {
            source: artifact.source.clone(),
            list_type: artifact.kind.to_string(),
            app_id: artifact.app_id.clone(),
            app_name: artifact.app_name.clone().unwrap_or_default(),
            resolved_path: entry.resolved_path.clone(),
            ..JumpListRow::default()
        };

        if let Some(record) = &entry.destlist {
            row.entry_number = Some(record.entry_number);
            row.destlist_path = record.path.clone();
            row.hostname = record.hostname.clone();
            row.pinned = Some(record.pin_status.is_pinned());
            row.access_count = Some(record.access_count);
            row.interaction_count = record.interaction_count;
            row.last_modified = format_timestamp(&record.last_modified, timezone);
            row.volume_droid = droid(&record.volume_droid);
            row.file_droid = droid(&record.file_droid);
            row.birth_volume_droid = droid(&record.birth_volume_droid);
            row.birth_file_droid = droid(&record.birth_file_droid);
            row.file_droid_mac = record
                .file_droid
                .as_hardware_address()
                .map(|mac| format_mac(&mac))
                .unwrap_or_default();
            row.file_droid_time = time(record.file_droid.as_timestamp().as_ref(), timezone);
        }

        if let Some(shortcut) = &entry.shortcut {
            row.target_path = shortcut.target_path.clone().unwrap_or_default();
            row.arguments = shortcut.arguments.clone().unwrap_or_default();
            row.working_directory = shortcut.working_directory.clone().unwrap_or_default();
            row.icon_location = shortcut.icon_location.clone().unwrap_or_default();
            row.name = shortcut.name.clone().unwrap_or_default();
            row.relative_path = shortcut.relative_path.clone().unwrap_or_default();
            row.target_created = time(shortcut.created.as_ref(), timezone);
            row.target_accessed = time(shortcut.accessed.as_ref(), timezone);
            row.target_modified = time(shortcut.modified.as_ref(), timezone);
            row.file_size = Some(shortcut.file_size);
            row.volume_serial = shortcut
                .volume_serial
                .map(|s| format!("{:08X}", s))
                .unwrap_or_default();
            row.volume_type = shortcut
                .volume_type
                .map(|t| t.to_string())
                .unwrap_or_default();
            row.volume_label = shortcut.volume_label.clone().unwrap_or_default();
            row.tracker_machine_id = shortcut
                .tracker
                .as_ref()
                .map(|t| t.machine_id.clone())
                .unwrap_or_default();
            // Custom destinations have no DestList droids, fall back to the tracker's
            if entry.destlist.is_none() {
                if let Some(tracker) = &shortcut.tracker {
                    row.volume_droid = droid(&tracker.droid_volume);
                    row.file_droid = droid(&tracker.droid_file);
                    row.birth_volume_droid = droid(&tracker.birth_droid_volume);
                    row.birth_file_droid = droid(&tracker.birth_droid_file);
                }
            }
        }
        row
    }

    /// Rows for every entry of an artifact
    pub fn from_artifact(artifact: &JumpListArtifact, timezone: Tz) -> Vec<Self> {
        artifact
            .entries
            .iter()
            .map(|entry| Self::from_entry(artifact, entry, timezone))
            .collect()
    }

    /// Filter on the target path, the DestList path and the resolved path
    pub fn matches(&self, filter: &Regex) -> bool {
        filter.is_match(&self.target_path)
            || filter.is_match(&self.destlist_path)
            || filter.is_match(&self.resolved_path)
    }
}

/// Handles output formatting and writing
pub struct OutputWriter;

impl OutputWriter {
    pub fn write_rows(rows: &[JumpListRow], format: OutputFormat, writer: Box<dyn Write>) -> Result<()> {
        match format {
            OutputFormat::Human => Self::write_human(rows, writer),
            OutputFormat::Json => Self::write_json(rows, writer),
            OutputFormat::Csv => Self::write_csv(rows, writer),
        }
    }

    fn write_human(rows: &[JumpListRow], mut writer: Box<dyn Write>) -> Result<()> {
        for row in rows {
            let app = if row.app_name.is_empty() {
                row.app_id.clone()
            } else {
                format!("{} ({})", row.app_id, row.app_name)
            };
            match row.entry_number {
                Some(number) => writeln!(writer, "{} #{:x} [{}]", app, number, row.list_type)?,
                None => writeln!(writer, "{} [{}]", app, row.list_type)?,
            }

            let fields = [
                ("Source:", &row.source),
                ("Path:", &row.destlist_path),
                ("Resolved:", &row.resolved_path),
                ("Target:", &row.target_path),
                ("Arguments:", &row.arguments),
                ("Working dir:", &row.working_directory),
                ("Hostname:", &row.hostname),
                ("Last modified:", &row.last_modified),
                ("Created:", &row.target_created),
                ("Accessed:", &row.target_accessed),
                ("Modified:", &row.target_modified),
                ("Volume serial:", &row.volume_serial),
                ("Volume type:", &row.volume_type),
                ("Volume label:", &row.volume_label),
                ("Machine ID:", &row.tracker_machine_id),
                ("File droid:", &row.file_droid),
                ("Droid MAC:", &row.file_droid_mac),
                ("Droid time:", &row.file_droid_time),
            ];
            for (label, value) in fields {
                if !value.is_empty() {
                    writeln!(writer, "  {:<17} {}", label, value)?;
                }
            }
            if let Some(pinned) = row.pinned {
                writeln!(writer, "  {:<17} {}", "Pinned:", if pinned { "yes" } else { "no" })?;
            }
            if let Some(count) = row.access_count {
                writeln!(writer, "  {:<17} {}", "Access count:", count)?;
            }
            if let Some(count) = row.interaction_count {
                writeln!(writer, "  {:<17} {}", "Interactions:", count)?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_json(rows: &[JumpListRow], mut writer: Box<dyn Write>) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, rows)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    fn write_csv(rows: &[JumpListRow], writer: Box<dyn Write>) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// Create appropriate writer based on output option
pub fn create_writer(output_file: Option<&str>) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = match output_file {
        Some(path) if path != "-" => Box::new(BufWriter::new(std::fs::File::create(path)?)),
        _ => Box::new(std::io::stdout()),
    };
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destlist::{DestListRecord, PinStatus};
    use crate::jumplist::JumpListKind;
    use crate::lnk_parser::{DriveType, ShortcutRecord};
    use std::sync::{Arc, Mutex};

    /// Writer that keeps what was written for inspection
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn artifact() -> JumpListArtifact {
        let record = DestListRecord {
            checksum: 0,
            volume_droid: StructuredIdentifier::default(),
            file_droid: "ba034b9e-bc96-11e5-b231-00155d016d0b".parse().unwrap(),
            birth_volume_droid: StructuredIdentifier::default(),
            birth_file_droid: StructuredIdentifier::default(),
            hostname: "lab-pc".to_string(),
            entry_number: 0x2a,
            unknown1: 0,
            access_count: 3.0,
            last_modified: DateTime::from_timestamp(946_684_800, 0).unwrap(),
            pin_status: PinStatus::Pinned(0),
            interaction_count: Some(7),
            unknown2: None,
            unknown3: None,
            path: "C:\\Users\\bob\\report, final.docx".to_string(),
            property_block: Vec::new(),
        };
        let shortcut = ShortcutRecord {
            target_path: Some("C:\\Users\\bob\\report, final.docx".to_string()),
            arguments: None,
            working_directory: None,
            icon_location: None,
            name: None,
            relative_path: None,
            created: DateTime::from_timestamp(946_684_800, 0),
            accessed: None,
            modified: None,
            file_size: 1024,
            file_attributes: 0x20,
            volume_serial: Some(0xDEAD_BEEF),
            volume_type: Some(DriveType::Fixed),
            volume_label: Some("OS".to_string()),
            network_share: None,
            tracker: None,
            known_folder: None,
        };
        JumpListArtifact {
            source: "5f7b5f1e01b83767.automaticDestinations-ms".to_string(),
            kind: JumpListKind::Automatic,
            app_id: "5f7b5f1e01b83767".to_string(),
            app_name: Some("Windows Explorer Quick Access".to_string()),
            header: None,
            entries: vec![JumpListEntry::new(Some(record), Some(shortcut))],
        }
    }

    #[test]
    fn test_row_projection() {
        let rows = JumpListRow::from_artifact(&artifact(), Tz::UTC);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.list_type, "automatic");
        assert_eq!(row.entry_number, Some(0x2a));
        assert_eq!(row.pinned, Some(true));
        assert_eq!(row.last_modified, "2000-01-01T00:00:00.000000000Z");
        assert_eq!(row.volume_droid, "");
        assert_eq!(row.file_droid, "ba034b9e-bc96-11e5-b231-00155d016d0b");
        assert!(!row.file_droid_time.is_empty());
        assert_eq!(row.file_droid_mac, "");
        assert_eq!(row.volume_serial, "DEADBEEF");
        assert_eq!(row.volume_type, "Fixed");
    }

    #[test]
    fn test_timezone_applies() {
        let rows = JumpListRow::from_artifact(&artifact(), Tz::Asia__Hong_Kong);
        assert_eq!(rows[0].last_modified, "2000-01-01T08:00:00.000000000+08:00");
    }

    #[test]
    fn test_filter() {
        let row = &JumpListRow::from_artifact(&artifact(), Tz::UTC)[0];
        assert!(row.matches(&Regex::new("(?i)REPORT").unwrap()));
        assert!(!row.matches(&Regex::new("invoice").unwrap()));
    }

    #[test]
    fn test_json_output() {
        let rows = JumpListRow::from_artifact(&artifact(), Tz::UTC);
        let out = Captured::default();
        OutputWriter::write_rows(&rows, OutputFormat::Json, Box::new(out.clone())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out.text()).unwrap();
        assert_eq!(value[0]["entry_number"], 42);
        assert_eq!(value[0]["hostname"], "lab-pc");
        assert_eq!(value[0]["app_name"], "Windows Explorer Quick Access");
    }

    #[test]
    fn test_csv_output() {
        let rows = JumpListRow::from_artifact(&artifact(), Tz::UTC);
        let out = Captured::default();
        OutputWriter::write_rows(&rows, OutputFormat::Csv, Box::new(out.clone())).unwrap();
        let text = out.text();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("source,list_type,app_id,app_name,entry_number"));
        // Comma in the path forces quoting
        assert!(lines.next().unwrap().contains("\"C:\\Users\\bob\\report, final.docx\""));
    }

    #[test]
    fn test_human_output() {
        let rows = JumpListRow::from_artifact(&artifact(), Tz::UTC);
        let out = Captured::default();
        OutputWriter::write_rows(&rows, OutputFormat::Human, Box::new(out.clone())).unwrap();
        let text = out.text();
        assert!(text.starts_with("5f7b5f1e01b83767 (Windows Explorer Quick Access) #2a [automatic]"));
        assert!(text.contains("Pinned:"));
        assert!(!text.contains("Arguments:"));
    }

    #[test]
    fn test_default_format() {
        assert_eq!(OutputFormat::default_for(true), OutputFormat::Human);
        assert_eq!(OutputFormat::default_for(false), OutputFormat::Json);
    }
}
