//! Scan result writers with clean feature flag handling.
use crate::{
    error::ScanError,
    scan::{PeakRecord, ResultRow, ScanReport},
};
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Sink for the ordered result rows of a scan and its peak summary.
#[async_trait]
pub trait StorageWriter: Send {
    /// Open the destination and write any header.
    async fn init(&mut self) -> Result<()>;
    /// Append result rows in scan order.
    async fn write(&mut self, rows: &[ResultRow]) -> Result<()>;
    /// Append the trailing peak summary. `None` records that no point was measured.
    async fn write_peak(&mut self, peak: Option<&PeakRecord>) -> Result<()>;
    /// Flush and close.
    async fn shutdown(&mut self) -> Result<()>;
}

/// Write a whole report through `writer`, optionally with the peak summary.
pub async fn write_report<W: StorageWriter + ?Sized>(
    writer: &mut W,
    report: &ScanReport,
    include_peak: bool,
) -> Result<()> {
    writer.init().await?;
    writer.write(&report.rows).await?;
    if include_peak {
        writer.write_peak(report.peak.as_ref()).await?;
    }
    writer.shutdown().await
}

/// Create the parent directory of `path` if it does not exist yet.
pub(crate) fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent)
        }
        _ => Ok(()),
    }
}

// ============================================================================
// CSV Writer
// ============================================================================

#[cfg(feature = "storage_csv")]
mod csv_enabled {
    use super::*;
    use anyhow::Context;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;

    /// Column names of the result section.
    pub const CSV_HEADER: [&str; 4] = ["x", "y", "raw_value", "filtered_value"];
    /// Column names of the peak summary section.
    pub const PEAK_HEADER: [&str; 3] = ["Peak Value", "X", "Y"];

    /// Writes result rows as CSV, with failed points as blank cells.
    pub struct CsvWriter {
        path: PathBuf,
        writer: Option<csv::Writer<File>>,
    }

    impl CsvWriter {
        /// Writer targeting `path`. Nothing is touched until [`StorageWriter::init`].
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self {
                path: path.into(),
                writer: None,
            }
        }

        /// Destination file.
        pub fn path(&self) -> &Path {
            &self.path
        }

        fn writer(&mut self) -> Result<&mut csv::Writer<File>> {
            self.writer
                .as_mut()
                .ok_or_else(|| ScanError::Storage("CSV writer used before init".into()).into())
        }
    }

    fn cell(value: Option<f64>) -> String {
        value.map_or(String::new(), |v| v.to_string())
    }

    #[async_trait]
    impl StorageWriter for CsvWriter {
        async fn init(&mut self) -> Result<()> {
            ensure_parent_dir(&self.path).with_context(|| {
                format!("Failed to create output directory for {:?}", self.path)
            })?;
            let file = File::create(&self.path)
                .with_context(|| format!("Failed to create CSV file at {:?}", self.path))?;

            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(file);
            writer
                .write_record(CSV_HEADER)
                .context("Failed to write CSV header")?;

            self.writer = Some(writer);
            tracing::info!("CSV Writer initialized at '{}'.", self.path.display());
            Ok(())
        }

        async fn write(&mut self, rows: &[ResultRow]) -> Result<()> {
            let writer = self.writer()?;
            for row in rows {
                writer
                    .write_record(&[
                        row.x.to_string(),
                        row.y.to_string(),
                        cell(row.raw),
                        cell(row.filtered),
                    ])
                    .context("Failed to write result row to CSV file")?;
            }
            Ok(())
        }

        async fn write_peak(&mut self, peak: Option<&PeakRecord>) -> Result<()> {
            let writer = self.writer()?;

            // Blank separator line between the results and the summary
            writer.flush().context("Failed to flush CSV writer")?;
            let mut file: &File = writer.get_ref();
            file.write_all(b"\n").context("Failed to write CSV separator")?;

            writer
                .write_record(PEAK_HEADER)
                .context("Failed to write peak header")?;
            let record = match peak {
                Some(peak) => [peak.value.to_string(), peak.x.to_string(), peak.y.to_string()],
                None => ["None".to_string(), "None".to_string(), "None".to_string()],
            };
            writer
                .write_record(&record)
                .context("Failed to write peak summary")?;
            Ok(())
        }

        async fn shutdown(&mut self) -> Result<()> {
            if let Some(mut writer) = self.writer.take() {
                writer.flush().context("Failed to flush CSV writer")?;
            }
            tracing::info!("Scan data saved to '{}'.", self.path.display());
            Ok(())
        }
    }
}

#[cfg(not(feature = "storage_csv"))]
mod csv_disabled {
    use super::*;
    use std::path::PathBuf;

    /// Placeholder used when the `storage_csv` feature is off.
    pub struct CsvWriter;

    impl CsvWriter {
        /// Writer targeting `path`; every operation fails with `FeatureNotEnabled`.
        pub fn new(_path: impl Into<PathBuf>) -> Self {
            Self
        }
    }

    #[async_trait]
    impl StorageWriter for CsvWriter {
        async fn init(&mut self) -> Result<()> {
            Err(ScanError::FeatureNotEnabled("storage_csv".to_string()).into())
        }

        async fn write(&mut self, _rows: &[ResultRow]) -> Result<()> {
            Err(ScanError::FeatureNotEnabled("storage_csv".to_string()).into())
        }

        async fn write_peak(&mut self, _peak: Option<&PeakRecord>) -> Result<()> {
            Err(ScanError::FeatureNotEnabled("storage_csv".to_string()).into())
        }

        async fn shutdown(&mut self) -> Result<()> {
            Err(ScanError::FeatureNotEnabled("storage_csv".to_string()).into())
        }
    }
}

#[cfg(feature = "storage_csv")]
pub use csv_enabled::{CsvWriter, CSV_HEADER, PEAK_HEADER};

#[cfg(not(feature = "storage_csv"))]
pub use csv_disabled::CsvWriter;
