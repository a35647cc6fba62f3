// 💶 Wage Table - year -> hourly wage, from the secondary dataset
//
// Malformed rows are dropped silently; only a broken stream is an error.

use crate::dialect::{self, Columns};
use crate::error::Result;
use crate::record::{parse_decimal, WAGE_SCALE};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::io::Read;
use tracing::debug;

pub const YEAR_COLUMN: &str = "Year";
pub const WAGE_COLUMN: &str = "Hourly wage (VALUEd)";

/// WageTable - hourly wage per calendar year
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WageTable {
    wages: BTreeMap<i32, Decimal>,
}

impl WageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the wage dataset
    ///
    /// A row is kept only if its year is all digits and its wage parses as a
    /// decimal (rounded half-up to 2 places). A later row for the same year
    /// replaces an earlier one.
    pub fn parse<R: Read>(input: R) -> Result<Self> {
        let mut rdr = dialect::reader(input);
        let columns = Columns::from_headers("wages", rdr.headers()?);
        columns.require(&[YEAR_COLUMN, WAGE_COLUMN])?;

        let mut table = WageTable::new();
        let mut dropped = 0usize;

        for row in rdr.records() {
            let row = row?;
            if dialect::is_blank(&row) {
                continue;
            }

            let year = columns.get(&row, YEAR_COLUMN).and_then(parse_year);
            let wage = columns
                .get(&row, WAGE_COLUMN)
                .and_then(|raw| parse_decimal(raw, WAGE_SCALE));

            match (year, wage) {
                (Some(year), Some(wage)) => table.insert(year, wage),
                _ => dropped += 1,
            }
        }

        debug!(years = table.len(), dropped, "Parsed wage table");
        Ok(table)
    }

    pub fn insert(&mut self, year: i32, wage: Decimal) {
        self.wages.insert(year, wage);
    }

    pub fn get(&self, year: i32) -> Option<Decimal> {
        self.wages.get(&year).copied()
    }

    pub fn contains(&self, year: i32) -> bool {
        self.wages.contains_key(&year)
    }

    pub fn len(&self) -> usize {
        self.wages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, Decimal)> + '_ {
        self.wages.iter().map(|(year, wage)| (*year, *wage))
    }
}

impl FromIterator<(i32, Decimal)> for WageTable {
    fn from_iter<I: IntoIterator<Item = (i32, Decimal)>>(iter: I) -> Self {
        WageTable {
            wages: iter.into_iter().collect(),
        }
    }
}

/// All-digit years only: no sign, no whitespace
fn parse_year(raw: &str) -> Option<i32> {
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        raw.parse().ok()
    } else {
        None
    }
}
