//! Output formatting for the semester report and the consolidated table.
//!
//! Supports a plain-text table, CSV and JSON.

use anyhow::Result;
use csv::WriterBuilder;
use serde_json::{Map, Value};
use std::io::Write;
use tracing::debug;

use crate::pipeline::types::{ConsolidatedRecord, PivotTable};

const KEY_COLUMNS: [&str; 4] = ["Año", "Clase", "Ruta", "Semestre"];

fn header(table: &PivotTable) -> Vec<String> {
    KEY_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(table.airlines.iter().cloned())
        .collect()
}

/// Renders every row as strings, with `missing` for absent cells.
fn cells(table: &PivotTable, missing: &str) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|row| {
            let mut line = vec![
                row.key.year.to_string(),
                row.key.class.clone(),
                row.key.route.clone(),
                row.key.semester.number().to_string(),
            ];
            line.extend(table.airlines.iter().map(|airline| {
                row.prices
                    .get(airline)
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_else(|| missing.to_string())
            }));
            line
        })
        .collect()
}

/// Formats the pivot as an aligned text table. Absent cells print as `NaN`.
pub fn render_text(table: &PivotTable) -> String {
    let header = header(table);
    let body = cells(table, "NaN");

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for line in &body {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |line: &[String]| {
        line.iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                let pad = width - cell.chars().count();
                // Key columns are left-aligned, prices right-aligned.
                if i < KEY_COLUMNS.len() {
                    format!("{}{}", cell, " ".repeat(pad))
                } else {
                    format!("{}{}", " ".repeat(pad), cell)
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&format_line(&header));
    out.push('\n');
    for line in &body {
        out.push_str(&format_line(line));
        out.push('\n');
    }
    out
}

/// Writes the pivot as CSV. Absent cells are empty fields.
pub fn write_pivot_csv<W: Write>(table: &PivotTable, writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(header(table))?;
    for line in cells(table, "") {
        writer.write_record(line)?;
    }
    writer.flush()?;
    Ok(())
}

/// Serializes the pivot as a pretty JSON array of objects. Absent cells are `null`.
pub fn pivot_json(table: &PivotTable) -> Result<String> {
    let rows: Vec<Value> = table
        .rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            object.insert(KEY_COLUMNS[0].into(), row.key.year.into());
            object.insert(KEY_COLUMNS[1].into(), row.key.class.clone().into());
            object.insert(KEY_COLUMNS[2].into(), row.key.route.clone().into());
            object.insert(KEY_COLUMNS[3].into(), row.key.semester.number().into());
            for airline in &table.airlines {
                let value = row
                    .prices
                    .get(airline)
                    .map_or(Value::Null, |p| Value::from(*p));
                object.insert(airline.clone(), value);
            }
            Value::Object(object)
        })
        .collect();

    Ok(serde_json::to_string_pretty(&rows)?)
}

/// Writes consolidated records as CSV with the source column names.
pub fn write_consolidated_csv<W: Write>(records: &[ConsolidatedRecord], writer: W) -> Result<()> {
    debug!(records = records.len(), "Writing consolidated CSV");

    let mut writer = WriterBuilder::new().from_writer(writer);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
