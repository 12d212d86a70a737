//! Import/export bridge for the device inventory.
//!
//! Tabular files carry one column per device field in canonical order.
//! The active-list export leaves the identifier out; the archive export
//! keeps it, together with the archival timestamp. Import produces raw
//! row mappings (column label -> cell text) that callers feed into the
//! repository's bulk import.

use crate::device::{ArchivedDevice, Device, DeviceField};
use crate::{InventoryError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// One imported row: column label mapped to the raw cell value.
pub type RawRow = BTreeMap<String, String>;

const ARCHIVED_AT_COLUMN: &str = "Arşivlenme Tarihi";
const ID_COLUMN: &str = "ID";

/// Export devices to CSV, one column per field, no identifier column.
pub fn export_to_csv(devices: &[&Device], output: &Path) -> Result<()> {
    let mut file = std::fs::File::create(output)
        .map_err(|e| InventoryError::FileIo(format!("Failed to create export file: {}", e)))?;

    let header: Vec<&str> = DeviceField::ALL.iter().map(|f| f.label()).collect();
    writeln!(file, "{}", header.join(","))
        .map_err(|e| InventoryError::FileIo(format!("Failed to write CSV: {}", e)))?;

    for device in devices {
        let cells: Vec<String> = DeviceField::ALL
            .iter()
            .map(|field| escape(&field.value(device).to_string()))
            .collect();
        writeln!(file, "{}", cells.join(","))
            .map_err(|e| InventoryError::FileIo(format!("Failed to write CSV: {}", e)))?;
    }

    Ok(())
}

/// Export the archive to CSV. Archive rows keep their identifier and the
/// archival timestamp after the regular columns.
pub fn export_archive_to_csv(archived: &[ArchivedDevice], output: &Path) -> Result<()> {
    let mut file = std::fs::File::create(output)
        .map_err(|e| InventoryError::FileIo(format!("Failed to create export file: {}", e)))?;

    let mut header: Vec<&str> = DeviceField::ALL.iter().map(|f| f.label()).collect();
    header.push(ARCHIVED_AT_COLUMN);
    header.push(ID_COLUMN);
    writeln!(file, "{}", header.join(","))
        .map_err(|e| InventoryError::FileIo(format!("Failed to write CSV: {}", e)))?;

    for entry in archived {
        let mut cells: Vec<String> = DeviceField::ALL
            .iter()
            .map(|field| escape(&field.value(&entry.device).to_string()))
            .collect();
        cells.push(escape(&entry.archived_at));
        cells.push(entry.device.id.to_string());
        writeln!(file, "{}", cells.join(","))
            .map_err(|e| InventoryError::FileIo(format!("Failed to write CSV: {}", e)))?;
    }

    Ok(())
}

/// Export devices to JSON with the canonical labels, no identifier.
pub fn export_to_json(devices: &[&Device], output: &Path) -> Result<()> {
    let rows: Vec<serde_json::Map<String, Value>> = devices
        .iter()
        .map(|device| {
            DeviceField::ALL
                .iter()
                .map(|field| {
                    let value = match field.value(device) {
                        crate::device::FieldValue::Number(n) => Value::from(n),
                        other => Value::from(other.to_string()),
                    };
                    (field.label().to_string(), value)
                })
                .collect()
        })
        .collect();

    let json = serde_json::to_string_pretty(&rows)?;
    let mut file = std::fs::File::create(output)
        .map_err(|e| InventoryError::FileIo(format!("Failed to create export file: {}", e)))?;
    file.write_all(json.as_bytes())
        .map_err(|e| InventoryError::FileIo(format!("Failed to write export: {}", e)))?;

    Ok(())
}

/// Import rows from a CSV file. The first line names the columns; every
/// following non-empty line becomes one row mapping. The whole file is
/// parsed before anything is returned, so a malformed line imports
/// nothing.
pub fn import_from_csv(input: &Path) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(input)
        .map_err(|e| InventoryError::FileIo(format!("Failed to open import file: {}", e)))?;

    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header_line = lines
        .next()
        .ok_or_else(|| InventoryError::Import("Empty CSV file".to_string()))?
        .map_err(|e| InventoryError::FileIo(format!("Failed to read CSV header: {}", e)))?;
    let columns = parse_csv_line(&header_line);

    let mut rows = Vec::new();
    for (line_num, line_result) in lines.enumerate().take(10000) {
        let line = line_result
            .map_err(|e| InventoryError::FileIo(format!("Failed to read line {}: {}", line_num + 2, e)))?;

        if line.trim().is_empty() {
            continue;
        }

        let cells = parse_csv_line(&line);
        if cells.len() > columns.len() {
            return Err(InventoryError::Import(format!(
                "Line {} has {} cells but the header names {} columns",
                line_num + 2,
                cells.len(),
                columns.len()
            )));
        }

        let row: RawRow = columns
            .iter()
            .zip(cells.into_iter())
            .map(|(column, cell)| (column.clone(), cell))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

/// Import rows from a JSON array of objects. Cell values are flattened to
/// their textual form.
pub fn import_from_json(input: &Path) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(input)
        .map_err(|e| InventoryError::FileIo(format!("Failed to open import file: {}", e)))?;

    let reader = BufReader::new(file);
    let objects: Vec<serde_json::Map<String, Value>> = serde_json::from_reader(reader)
        .map_err(|e| InventoryError::Import(format!("Failed to parse JSON: {}", e)))?;

    let rows = objects
        .into_iter()
        .map(|object| {
            object
                .into_iter()
                .map(|(column, value)| {
                    let cell = match value {
                        Value::String(s) => s,
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (column, cell)
                })
                .collect()
        })
        .collect();

    Ok(rows)
}

/// Escape a CSV field, quoting when it contains a separator or quote.
fn escape(s: &str) -> String {
    let needs_quotes = s.contains(',') || s.contains('"') || s.contains('\n');
    let escaped = s.replace('"', "\"\"");
    if needs_quotes {
        format!("\"{}\"", escaped)
    } else {
        escaped
    }
}

/// Parse a CSV line, handling quoted fields and escaped quotes ("").
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes {
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => {
                current.push(c);
            }
        }
    }

    fields.push(current);
    fields
}
