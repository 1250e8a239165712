//! CSV loading for the five report sources.
//!
//! Every source is read whole into a [`Table`]: the header row plus the raw
//! string records, whitespace-trimmed. Typed extraction happens later through
//! [`Table::deserialize`], which checks the required columns first so a
//! missing column is reported by name instead of as a serde failure.

use crate::error::{PipelineError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// An in-memory CSV table.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

impl Table {
    /// Reads a complete table from any CSV reader. The first row is the header.
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();

        let mut rows = Vec::new();
        for result in rdr.records() {
            rows.push(result?);
        }

        debug!(
            table = name,
            columns = headers.len(),
            rows = rows.len(),
            "Table read"
        );

        Ok(Self {
            name: name.to_string(),
            headers,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.headers.iter().map(str::to_string).collect()
    }

    /// Position of `column` in the header row.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingColumn`] if the header does not contain it.
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| PipelineError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        for column in columns {
            self.column_index(column)?;
        }
        Ok(())
    }

    /// Deserializes every row into `T` after checking that `required` columns exist.
    /// Columns not named by `T` are ignored.
    pub fn deserialize<T: DeserializeOwned>(&self, required: &[&str]) -> Result<Vec<T>> {
        self.require_columns(required)?;
        self.rows
            .iter()
            .map(|row| row.deserialize(Some(&self.headers)).map_err(PipelineError::from))
            .collect()
    }
}

/// Loads a CSV file from disk. The table is named after the file stem.
pub fn load_table(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| PipelineError::SourceOpen {
        path: path.display().to_string(),
        source,
    })?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let table = Table::from_reader(&name, file)?;
    if table.is_empty() {
        warn!(path = %path.display(), "Source table has no data rows");
    }
    info!(path = %path.display(), rows = table.len(), "Loaded source table");
    Ok(table)
}
