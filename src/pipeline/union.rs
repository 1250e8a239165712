//! Union of same-schema tables and first-wins deduplication.

use crate::error::{PipelineError, Result};
use crate::loader::Table;
use csv::StringRecord;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Result of [`dedup_by_key`].
#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub table: Table,
    /// Rows discarded because their key was already seen.
    pub dropped: usize,
    /// Keys whose later duplicates disagreed with the kept row on some column.
    /// The first row's values were kept in each case.
    pub conflicting_keys: Vec<String>,
}

/// Concatenates tables holding the same set of columns, preserving row order
/// across inputs. Columns are matched by name; rows of a table whose header
/// lists them in another order are rearranged into the first table's order.
///
/// # Errors
///
/// Returns [`PipelineError::SchemaMismatch`] if any table's column names differ
/// from the first table's, and [`PipelineError::Config`] if `tables` is empty.
pub fn concat(tables: &[Table]) -> Result<Table> {
    let first = tables
        .first()
        .ok_or_else(|| PipelineError::Config("no tables to union".to_string()))?;

    let mut rows = Vec::new();
    for table in tables {
        let positions = column_positions(first, table)?;
        if positions.iter().copied().eq(0..positions.len()) {
            rows.extend(table.rows.iter().cloned());
        } else {
            debug!(table = %table.name, "Reordering columns to match union schema");
            rows.extend(table.rows.iter().map(|row| {
                positions
                    .iter()
                    .map(|&i| row.get(i).unwrap_or_default())
                    .collect::<StringRecord>()
            }));
        }
    }

    let name = tables
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join("+");

    info!(table = %name, sources = tables.len(), rows = rows.len(), "Tables unioned");

    Ok(Table {
        name,
        headers: first.headers.clone(),
        rows,
    })
}

/// For each column of `schema`, its position in `table`.
fn column_positions(schema: &Table, table: &Table) -> Result<Vec<usize>> {
    let mismatch = || PipelineError::SchemaMismatch {
        table: table.name.clone(),
        expected: schema.column_names(),
        found: table.column_names(),
    };

    if schema.headers.len() != table.headers.len() {
        return Err(mismatch());
    }

    schema
        .headers
        .iter()
        .map(|column| {
            table
                .headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| mismatch())
        })
        .collect()
}

/// Keeps the first row for each distinct value of `key` and discards later ones.
///
/// Later duplicates that differ from the kept row are not an error; their keys
/// are returned in [`DedupOutcome::conflicting_keys`] and logged.
pub fn dedup_by_key(table: Table, key: &str) -> Result<DedupOutcome> {
    let idx = table.column_index(key)?;
    let Table {
        name,
        headers,
        rows,
    } = table;

    let mut first_seen: HashMap<String, usize> = HashMap::new();
    let mut reported = HashSet::new();
    let mut kept: Vec<StringRecord> = Vec::with_capacity(rows.len());
    let mut conflicting_keys = Vec::new();
    let mut dropped = 0;

    for row in rows {
        let value = row.get(idx).unwrap_or_default().to_string();
        match first_seen.get(&value) {
            Some(&pos) => {
                dropped += 1;
                let same = kept[pos].iter().eq(row.iter());
                debug!(key = %value, identical = same, "Duplicate row dropped");
                if !same && reported.insert(value.clone()) {
                    warn!(
                        table = %name,
                        key = %value,
                        "Duplicate key with differing values; keeping first occurrence"
                    );
                    conflicting_keys.push(value);
                }
            }
            None => {
                first_seen.insert(value, kept.len());
                kept.push(row);
            }
        }
    }

    info!(
        table = %name,
        key,
        kept = kept.len(),
        dropped,
        conflicts = conflicting_keys.len(),
        "Deduplicated by key"
    );

    Ok(DedupOutcome {
        table: Table {
            name,
            headers,
            rows: kept,
        },
        dropped,
        conflicting_keys,
    })
}
