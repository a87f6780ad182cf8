//! Main application logic and orchestration.

use crate::{
    cli::{Config, InputType},
    error::{Error, Result},
    jumplist::{decode_bytes, JumpListArtifact},
    output::{create_writer, JumpListRow, OutputWriter},
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application runner
pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Decode every input, then filter and write the rows
    pub fn run(self) -> Result<()> {
        let total = self.config.inputs.len();
        let results = self.decode_all();

        let mut rows = Vec::new();
        let mut failed = 0usize;
        for (path, result) in results {
            match result {
                Ok(artifact) => {
                    rows.extend(JumpListRow::from_artifact(&artifact, self.config.timezone))
                }
                Err(e) => {
                    failed += 1;
                    log::error!("{}: {}", path.display(), e);
                }
            }
        }

        let decoded_rows = rows.len();
        let rows = self.apply_filter(rows);
        if total > 1 || failed > 0 {
            eprintln!(
                "📊 {} of {} files decoded, {} entries ({} after filtering)",
                total - failed,
                total,
                decoded_rows,
                rows.len()
            );
        }

        let writer = create_writer(self.config.output.as_deref())?;
        OutputWriter::write_rows(&rows, self.config.format, writer)?;

        if failed == total {
            return Err(Error::InvalidInput(format!(
                "none of the {} input files could be decoded",
                total
            )));
        }
        Ok(())
    }

    /// Decode inputs in parallel, keeping input order
    fn decode_all(&self) -> Vec<(PathBuf, Result<JumpListArtifact>)> {
        let inputs = &self.config.inputs;
        let progress = if inputs.len() > 1 {
            let pb = ProgressBar::new(inputs.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            pb.set_message("Decoding jump lists");
            pb
        } else {
            ProgressBar::hidden()
        };

        let results = inputs
            .par_iter()
            .map(|(path, input_type)| {
                let result = decode_file(path, *input_type, self.config.max_size);
                progress.inc(1);
                (path.clone(), result)
            })
            .collect();
        progress.finish_and_clear();
        results
    }

    fn apply_filter(&self, rows: Vec<JumpListRow>) -> Vec<JumpListRow> {
        match &self.config.filter_regex {
            Some(regex) => rows.into_iter().filter(|row| row.matches(regex)).collect(),
            None => rows,
        }
    }
}

/// Read one file, refusing anything above `max_size` bytes, and decode it
pub fn decode_file(path: &Path, input_type: InputType, max_size: u64) -> Result<JumpListArtifact> {
    let size = fs::metadata(path)?.len();
    if size > max_size {
        return Err(Error::InvalidInput(format!(
            "{} is {} bytes, above the {} byte limit",
            path.display(),
            size,
            max_size
        )));
    }
    let data = fs::read(path)?;
    log::info!("{}: {} bytes", path.display(), data.len());
    decode_bytes(&data, path, input_type.kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{build_lnk, custom_destinations, LnkFixture};

    fn write_custom(name: &str) -> PathBuf {
        let lnk = build_lnk(&LnkFixture {
            local_path: Some("C:\\a.txt"),
            ..LnkFixture::default()
        });
        let path = std::env::temp_dir().join(format!("{}-{}", std::process::id(), name));
        fs::write(&path, custom_destinations(&[lnk])).unwrap();
        path
    }

    #[test]
    fn test_decode_file() {
        let path = write_custom("app.customDestinations-ms");
        let artifact = decode_file(&path, InputType::CustomDestinations, 1 << 20);
        fs::remove_file(&path).unwrap();
        assert_eq!(artifact.unwrap().entries.len(), 1);
    }

    #[test]
    fn test_size_limit() {
        let path = write_custom("big.customDestinations-ms");
        let result = decode_file(&path, InputType::CustomDestinations, 16);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = decode_file(
            Path::new("/nonexistent/x.customDestinations-ms"),
            InputType::CustomDestinations,
            1 << 20,
        );
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
