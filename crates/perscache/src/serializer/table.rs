//! Tabular values and their CSV encoding

use std::io::{Read, Write};

use flate2::{read::GzDecoder, write::GzEncoder};
use serde::{Deserialize, Serialize};

use super::Serializer;
use crate::{CacheError, Result};

/// A rectangular table of named string columns
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given column names
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row
    ///
    /// Rows are not checked here; a row whose width differs from the header
    /// is rejected when the table is encoded.
    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    /// Builder-style [`push_row`](Self::push_row)
    pub fn with_row<I, S>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_row(row);
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Values of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map(String::as_str).unwrap_or_default())
                .collect(),
        )
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Compression applied to encoded tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

/// CSV encoding for [`Table`] values, optionally gzip-compressed
#[derive(Debug, Clone)]
pub struct CsvSerializer {
    compression: Compression,
    format_id: String,
    extension: String,
}

impl CsvSerializer {
    /// Plain CSV
    pub fn new() -> Self {
        Self::with_compression(Compression::None)
    }

    /// CSV with the given compression
    ///
    /// The compression is part of the format identity, so toggling it never
    /// serves an entry written with the other setting.
    pub fn with_compression(compression: Compression) -> Self {
        let (format_id, extension) = match compression {
            Compression::None => ("CsvSerializer", "csv"),
            Compression::Gzip => ("CsvSerializer+gzip", "csv.gz"),
        };
        Self {
            compression,
            format_id: format_id.to_string(),
            extension: extension.to_string(),
        }
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    fn to_csv(&self, table: &Table) -> Result<Vec<u8>> {
        if table.columns.is_empty() {
            return Err(CacheError::serialization(&self.format_id, "table has no columns"));
        }

        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer
            .write_record(&table.columns)
            .map_err(|e| CacheError::serialization(&self.format_id, e))?;

        for (index, row) in table.rows.iter().enumerate() {
            if row.len() != table.columns.len() {
                return Err(CacheError::serialization(
                    &self.format_id,
                    format!(
                        "row {} has {} fields, expected {}",
                        index,
                        row.len(),
                        table.columns.len()
                    ),
                ));
            }
            writer
                .write_record(row)
                .map_err(|e| CacheError::serialization(&self.format_id, e))?;
        }

        writer
            .into_inner()
            .map_err(|e| CacheError::serialization(&self.format_id, e))
    }

    fn from_csv(&self, bytes: &[u8]) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes);

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| CacheError::deserialization(&self.format_id, e))?
            .iter()
            .map(String::from)
            .collect();

        if columns.is_empty() {
            return Err(CacheError::deserialization(&self.format_id, "missing header row"));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| CacheError::deserialization(&self.format_id, e))?;
            rows.push(record.iter().map(String::from).collect());
        }

        Ok(Table { columns, rows })
    }
}

impl Default for CsvSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer<Table> for CsvSerializer {
    fn format_id(&self) -> &str {
        &self.format_id
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn encode(&self, value: &Table) -> Result<Vec<u8>> {
        let csv = self.to_csv(value)?;
        match self.compression {
            Compression::None => Ok(csv),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder
                    .write_all(&csv)
                    .map_err(|e| CacheError::serialization(&self.format_id, e))?;
                encoder
                    .finish()
                    .map_err(|e| CacheError::serialization(&self.format_id, e))
            }
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Table> {
        match self.compression {
            Compression::None => self.from_csv(bytes),
            Compression::Gzip => {
                let mut csv = Vec::new();
                GzDecoder::new(bytes)
                    .read_to_end(&mut csv)
                    .map_err(|e| CacheError::deserialization(&self.format_id, e))?;
                self.from_csv(&csv)
            }
        }
    }
}
