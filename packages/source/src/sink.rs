//! Record sinks.
//!
//! The pipeline hands each court's table to a [`RecordSink`] once and
//! moves on. [`CsvSink`] writes one CSV file per court into an output
//! directory.

use std::path::{Path, PathBuf};

use causelist_source_models::CauseListTable;

/// Errors raised while persisting a court's records.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// I/O error (directory creation, file write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The court name does not produce a usable file name.
    #[error("court name '{0}' does not produce a file name")]
    InvalidName(String),
}

/// Destination for one court's extracted table.
pub trait RecordSink: Send + Sync {
    /// Persists `table` for `court_name` and returns where it went.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the records cannot be written.
    fn save(&self, court_name: &str, table: &CauseListTable) -> Result<PathBuf, SinkError>;
}

/// Writes `<output_dir>/<court_name>.csv`, header row first.
#[derive(Debug, Clone)]
pub struct CsvSink {
    output_dir: PathBuf,
}

impl CsvSink {
    /// Creates a sink writing into `output_dir`. The directory is created
    /// on first save.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// The directory files are written into.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl RecordSink for CsvSink {
    fn save(&self, court_name: &str, table: &CauseListTable) -> Result<PathBuf, SinkError> {
        let stem = output_file_name(court_name)
            .ok_or_else(|| SinkError::InvalidName(court_name.to_owned()))?;
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{stem}.csv"));

        let mut writer = csv::Writer::from_path(&path)?;
        // A table without headers is written as an empty file.
        if !table.headers.is_empty() {
            writer.write_record(&table.headers)?;
            for record in &table.records {
                writer.write_record(
                    table
                        .headers
                        .iter()
                        .map(|header| record.get(header).unwrap_or_default()),
                )?;
            }
        }
        writer.flush()?;

        log::info!("Data saved to {}", path.display());
        Ok(path)
    }
}

/// File stem for a court: lowercased, spaces and hyphens (and path
/// separators) replaced with underscores, trimmed. `None` if nothing is
/// left.
#[must_use]
pub fn output_file_name(court_name: &str) -> Option<String> {
    let stem: String = court_name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '-' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    let stem = stem.trim();
    if stem.is_empty() || stem.chars().all(|c| c == '_' || c == '.') {
        None
    } else {
        Some(stem.to_owned())
    }
}
