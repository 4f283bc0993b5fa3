use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use thiserror::Error;
use tracing::warn;

/// A loose CSV table: headers plus string cells, schema unknown until the
/// column-detection step runs.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Table { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell<'a>(&'a self, row: &'a [String], col: usize) -> &'a str {
        row.get(col).map(String::as_str).unwrap_or_default()
    }

    /// All values of one column, padded with "" for short rows.
    pub fn column(&self, col: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |r| r.get(col).map(String::as_str).unwrap_or_default())
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path:?} is not parseable as CSV: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path:?} has no header row")]
    NoHeader { path: PathBuf },
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

// Strict candidates, in order. Under the Encoding Standard the latin-1 and
// cp1252 labels both resolve to windows-1252.
const CANDIDATES: &[&Encoding] = &[UTF_8, WINDOWS_1252, UTF_16LE, UTF_16BE];

/// Read a CSV file of unknown encoding and schema. Tries each candidate
/// encoding strictly, then decodes lossily with replacement rather than
/// aborting the batch.
pub fn read_table(path: &Path) -> Result<Table, TableError> {
    let bytes = fs::read(path).map_err(|source| TableError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let text = decode(&bytes, path);
    parse_csv(&text, path)
}

fn decode(bytes: &[u8], path: &Path) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        {
            return text.into_owned();
        }
    }
    for encoding in CANDIDATES {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return text.into_owned();
        }
    }
    warn!(path = %path.display(), "no candidate encoding decoded cleanly; replacing invalid characters");
    let (text, _, _) = UTF_8.decode(bytes);
    text.into_owned()
}

fn parse_csv(text: &str, path: &Path) -> Result<Table, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| TableError::Parse {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(TableError::NoHeader {
            path: path.to_path_buf(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| TableError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }
    Ok(Table::new(headers, rows))
}

/// Write a table back out as UTF-8 CSV.
pub fn write_table(path: &Path, table: &Table) -> Result<(), TableError> {
    let mut writer =
        csv::Writer::from_path(path).map_err(|e| write_err(path, e))?;
    writer
        .write_record(&table.headers)
        .map_err(|e| write_err(path, e))?;
    for row in &table.rows {
        // Pad short rows so every output row has the full width.
        let mut padded: Vec<&str> = row.iter().map(String::as_str).collect();
        padded.resize(table.headers.len().max(row.len()), "");
        writer
            .write_record(&padded)
            .map_err(|e| write_err(path, e))?;
    }
    writer
        .flush()
        .map_err(|e| write_err(path, csv::Error::from(e)))?;
    Ok(())
}

fn write_err(path: &Path, source: csv::Error) -> TableError {
    TableError::Write {
        path: path.to_path_buf(),
        source,
    }
}
