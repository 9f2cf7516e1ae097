//! CSV output
//!
//! Rows go to a temporary file next to the target and are renamed over it in
//! [`CsvSink::finish`]. A sink that is dropped without finishing removes its
//! temporary file, so a failed export never leaves a truncated CSV behind.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};
use crate::normalize::{NormalizedRow, Schema};

/// Streams rows of one schema to one CSV file
pub struct CsvSink {
    target: PathBuf,
    schema: &'static Schema,
    overwrite: bool,
    writer: csv::Writer<NamedTempFile>,
    rows: usize,
}

impl CsvSink {
    /// Open a sink for `target` and write the header row.
    ///
    /// Fails with [`Error::DestinationExists`] before touching anything if the
    /// target exists and `overwrite` is false. Missing parent directories are
    /// created.
    pub fn create(target: &Path, schema: &'static Schema, overwrite: bool) -> Result<Self> {
        if !overwrite && target.exists() {
            return Err(Error::DestinationExists(target.to_path_buf()));
        }

        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let temp = tempfile::Builder::new()
            .prefix(".libretto-")
            .suffix(".csv.part")
            .tempfile_in(parent)?;
        debug!(target = %target.display(), temp = %temp.path().display(), "Opened CSV sink");

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(temp);
        writer.write_record(schema.headers())?;

        Ok(Self {
            target: target.to_path_buf(),
            schema,
            overwrite,
            writer,
            rows: 0,
        })
    }

    /// Schema the sink was opened with
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Final output path
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Data rows written so far
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Append one row. The row must belong to the sink's schema.
    pub fn write_row(&mut self, row: &NormalizedRow) -> Result<()> {
        if row.schema != self.schema || row.values.len() != self.schema.width() {
            return Err(Error::RowWidth {
                schema: self.schema.name,
                expected: self.schema.width(),
                actual: row.values.len(),
            });
        }
        self.writer.write_record(&row.values)?;
        self.rows += 1;
        Ok(())
    }

    /// Flush, sync and move the file into place. Returns the data row count.
    pub fn finish(self) -> Result<usize> {
        let Self {
            target,
            overwrite,
            writer,
            rows,
            ..
        } = self;

        let mut temp = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        temp.flush()?;
        temp.as_file().sync_all()?;

        let persisted = if overwrite {
            temp.persist(&target)
        } else {
            // Another process may have created the target since we checked
            temp.persist_noclobber(&target)
        };
        match persisted {
            Ok(_) => {}
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::DestinationExists(target));
            }
            Err(e) => return Err(Error::Io(e.error)),
        }

        debug!(target = %target.display(), rows, "Committed CSV");
        Ok(rows)
    }
}
