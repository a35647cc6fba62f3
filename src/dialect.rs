// 📄 CSV Dialect - the excel-like, semicolon-delimited format of both datasets
//
// Header row first, `"` quoting, empty lines skipped, and an empty cell
// means "absent".

use crate::error::{CoinsError, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::HashMap;
use std::io::{Read, Write};

pub const DELIMITER: u8 = b';';

/// Reader configured for the dataset dialect
///
/// Rows may be shorter or longer than the header; missing cells read as
/// absent.
pub fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(input)
}

/// Writer configured for the dataset dialect (CRLF line endings, like excel)
pub fn writer<W: Write>(output: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .delimiter(DELIMITER)
        .terminator(csv::Terminator::CRLF)
        .from_writer(output)
}

/// Column name -> position, resolved once from the header row
#[derive(Debug, Clone)]
pub struct Columns {
    dataset: &'static str,
    positions: HashMap<String, usize>,
}

impl Columns {
    pub fn from_headers(dataset: &'static str, headers: &StringRecord) -> Self {
        let mut positions = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            // First occurrence wins on duplicate headers
            positions.entry(name.to_string()).or_insert(idx);
        }
        Columns { dataset, positions }
    }

    pub fn has(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    /// Fail unless every listed column is present
    pub fn require(&self, columns: &[&str]) -> Result<()> {
        match columns.iter().find(|column| !self.has(column)) {
            Some(missing) => Err(CoinsError::missing_column(self.dataset, *missing)),
            None => Ok(()),
        }
    }

    /// Cell value, `None` when the column or cell is missing or empty
    pub fn get<'r>(&self, row: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.positions
            .get(column)
            .and_then(|&idx| row.get(idx))
            .filter(|value| !value.is_empty())
    }

    /// Owned cell value
    pub fn text(&self, row: &StringRecord, column: &str) -> Option<String> {
        self.get(row, column).map(str::to_string)
    }
}

/// Skip rows that carry no content at all
pub fn is_blank(row: &StringRecord) -> bool {
    row.iter().all(str::is_empty)
}
