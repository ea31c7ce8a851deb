//! Well spreadsheet reader.
//!
//! Each row is a well: an identifier, a latitude/longitude pair and one column
//! per formation top. Formation columns are recognised by a marker in their
//! header (`TOP` by default) and their values are converted to metres on load.
//! Blank cells mean the well did not penetrate that formation.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::types::{DataReader, PointRecord, PointTable, ReadError};
use crate::config::WellColumns;

/// Split a CSV line respecting quoted fields (handles commas inside quotes).
pub fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    // Escaped quote ("")
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
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Quotes a field for `csv_split` when it holds a comma, a quote or a line
/// break. Inner quotes are doubled.
pub fn csv_quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn parse_number(value: &str, line: usize, column: &str) -> Result<f64, ReadError> {
    value.parse::<f64>().map_err(|_| ReadError::Parse {
        line,
        column: column.to_string(),
        value: value.to_string(),
    })
}

pub struct WellReader<'a> {
    pub file_name: &'a Path,
    pub columns: &'a WellColumns,
}

impl<'a> WellReader<'a> {
    pub fn new(columns: &'a WellColumns) -> Self {
        Self {
            file_name: &columns.path,
            columns,
        }
    }

    pub fn from_path(file_name: &'a Path, columns: &'a WellColumns) -> Self {
        Self { file_name, columns }
    }

    fn column_index(&self, header: &[String], name: &str) -> Result<usize, ReadError> {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReadError::MissingColumn {
                path: self.file_name.to_path_buf(),
                column: name.to_string(),
            })
    }
}

impl DataReader for WellReader<'_> {
    type Output = PointTable;

    /// Coordinates come back as `(longitude, latitude)`.
    fn read_data(&self) -> Result<PointTable, ReadError> {
        let file = File::open(self.file_name).map_err(|source| ReadError::Io {
            path: self.file_name.to_path_buf(),
            source,
        })?;
        let mut lines = BufReader::new(file).lines();

        let header_line = match lines.next() {
            Some(line) => line.map_err(|source| ReadError::Io {
                path: self.file_name.to_path_buf(),
                source,
            })?,
            None => {
                return Err(ReadError::Empty {
                    path: self.file_name.to_path_buf(),
                });
            }
        };
        let header = csv_split(header_line.trim_start_matches('\u{feff}'));

        let id_idx = self.column_index(&header, &self.columns.id_column)?;
        let lat_idx = self.column_index(&header, &self.columns.lat_column)?;
        let lon_idx = self.column_index(&header, &self.columns.lon_column)?;

        let formations: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .filter(|(_, name)| name.contains(&self.columns.formation_marker))
            .map(|(i, name)| (i, name.clone()))
            .collect();

        let mut records = Vec::new();
        for (offset, line) in lines.enumerate() {
            // Header is line 1
            let line_number = offset + 2;
            let line = line.map_err(|source| ReadError::Io {
                path: self.file_name.to_path_buf(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let fields = csv_split(&line);
            if fields.len() != header.len() {
                return Err(ReadError::FieldCount {
                    line: line_number,
                    expected: header.len(),
                    found: fields.len(),
                });
            }

            let lat = parse_number(&fields[lat_idx], line_number, &header[lat_idx])?;
            let lon = parse_number(&fields[lon_idx], line_number, &header[lon_idx])?;

            let attributes = formations
                .iter()
                .map(|(i, name)| match fields[*i].as_str() {
                    "" => Ok(None),
                    value => parse_number(value, line_number, name)
                        .map(|v| Some(v * self.columns.depth_factor)),
                })
                .collect::<Result<Vec<_>, _>>()?;

            records.push(PointRecord {
                id: fields[id_idx].clone(),
                x: lon,
                y: lat,
                attributes,
            });
        }

        PointTable::new(
            formations.into_iter().map(|(_, name)| name).collect(),
            records,
        )
    }
}
