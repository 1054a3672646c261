//! CSV export of the progress history.

use crate::{Result, SessionStats};
use std::fs::File;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    timestamp: String,
    mode: String,
    score: usize,
    total: usize,
    percentage: f64,
}

impl From<&SessionStats> for CsvRow {
    fn from(stats: &SessionStats) -> Self {
        CsvRow {
            timestamp: stats.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            mode: stats.mode.to_string(),
            score: stats.score,
            total: stats.total,
            percentage: stats.percentage,
        }
    }
}

/// Write `history` to `csv_path` (replacing it) and return the row count
///
/// The file is fsynced before returning.
pub fn export_progress_csv(history: &[SessionStats], csv_path: &Path) -> Result<usize> {
    if let Some(parent) = csv_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(csv_path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(file);

    for stats in history {
        writer.serialize(CsvRow::from(stats))?;
    }

    // Headers are only emitted with the first record
    if history.is_empty() {
        writer.write_record(["timestamp", "mode", "score", "total", "percentage"])?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} sessions to {:?}", history.len(), csv_path);
    Ok(history.len())
}
