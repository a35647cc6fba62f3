// 📥 Ingestion - coins CSV + wages CSV -> finalized RecordSet
//
// Pipeline:
// 1. Wage table from the secondary dataset
// 2. One Record per coins row (dates and decimals degrade to absent)
// 3. id index + link graph built while parsing
// 4. Quantity reconciliation over linked records
// 5. Hourly-wage normalization
//
// The resulting RecordSet is never mutated again; a refresh builds a new one.

use crate::dialect::{self, Columns};
use crate::error::Result;
use crate::normalize::normalize_values;
use crate::reconciliation::{LinkGraph, QuantityReconciler, ReconciliationReport};
use crate::record::{parse_date, parse_decimal, Record, DEFAULT_SCALE, QUANTITY_SCALE};
use crate::wages::WageTable;
use csv::StringRecord;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, info};

// ============================================================================
// COLUMN SCHEMA
// ============================================================================

pub mod columns {
    pub const UID: &str = "UID";
    pub const TYPEID: &str = "TYPEID";
    pub const SOURCE: &str = "SOURCE";
    pub const MINT: &str = "MINT";
    pub const AUTHORITY: &str = "AUTHORITY";
    pub const DATE_FROM: &str = "DATEfrom";
    pub const DATE_TO: &str = "DATEto";
    pub const COIN_NAME: &str = "CoinNAME";
    pub const ALLOY: &str = "ALLOY";
    pub const VALUE: &str = "VALUEd";
    pub const QUANTITY: &str = "QTTYcoins";
    pub const PURITY: &str = "FINEness";
    pub const RAW_WEIGHT: &str = "WEIGHTraw";
    pub const FINE_WEIGHT: &str = "WEIGHTfine";
    pub const TAILLE: &str = "TAILLE";
    pub const HIGHER_AUTHORITY: &str = "AUTHORITY_SUPRA";
    pub const ALT_COIN_NAME: &str = "ALT_CoinNAME";
    pub const ALT_TYPEID: &str = "ALT_TYPEID";
    pub const LINK: &str = "LINK";
    pub const VALUE_IN_HOURLY_WAGES: &str = "VALUE_HourlyWAGE";
}

// ============================================================================
// RECORD SET
// ============================================================================

/// RecordSet - the finalized, read-only result of one ingestion pass
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl RecordSet {
    /// Wrap records in file order; for duplicate ids the last one is indexed
    pub fn new(records: Vec<Record>) -> Self {
        let index = index_records(&records);
        RecordSet { records, index }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Look up a record by external id
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.index.get(id).map(|&slot| &self.records[slot])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn index_records(records: &[Record]) -> HashMap<String, usize> {
    records
        .iter()
        .enumerate()
        .map(|(slot, record)| (record.id.clone(), slot))
        .collect()
}

// ============================================================================
// INGESTION
// ============================================================================

/// Summary of one ingestion pass
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub rows: usize,
    pub records: usize,
    pub skipped_rows: usize,
    pub linked_records: usize,
    pub wage_years: usize,
    pub normalized_values: usize,
    pub reconciliation: ReconciliationReport,
}

/// Parsed coins rows before reconciliation
#[derive(Debug, Default)]
pub struct ParsedCoins {
    pub records: Vec<Record>,
    pub links: LinkGraph,
    pub rows: usize,
    pub skipped_rows: usize,
}

/// Ingest both datasets into a finalized RecordSet
pub fn ingest<C: Read, W: Read>(coins: C, wages: W) -> Result<RecordSet> {
    ingest_with_stats(coins, wages).map(|(set, _)| set)
}

/// Ingest both datasets, also returning what happened along the way
pub fn ingest_with_stats<C: Read, W: Read>(coins: C, wages: W) -> Result<(RecordSet, IngestStats)> {
    let wages = WageTable::parse(wages)?;
    let parsed = parse_coins(coins)?;
    let (set, stats) = enrich(parsed, &wages);

    info!(
        records = stats.records,
        links = stats.linked_records,
        wage_years = stats.wage_years,
        normalized = stats.normalized_values,
        "Ingested coins dataset"
    );
    Ok((set, stats))
}

/// Reconcile and normalize parsed records into a RecordSet
pub fn enrich(parsed: ParsedCoins, wages: &WageTable) -> (RecordSet, IngestStats) {
    let ParsedCoins {
        mut records,
        links,
        rows,
        skipped_rows,
    } = parsed;

    let index = index_records(&records);
    let reconciliation = QuantityReconciler::new(&index, &links).reconcile(&mut records);
    let normalized_values = normalize_values(&mut records, wages);

    let stats = IngestStats {
        rows,
        records: records.len(),
        skipped_rows,
        linked_records: links.len(),
        wage_years: wages.len(),
        normalized_values,
        reconciliation,
    };

    (RecordSet { records, index }, stats)
}

/// Parse the coins dataset into records and their declared links
///
/// Only `UID` is a required column; any other missing column reads as
/// absent. Rows without a UID are skipped.
pub fn parse_coins<R: Read>(input: R) -> Result<ParsedCoins> {
    let mut rdr = dialect::reader(input);
    let cols = Columns::from_headers("coins", rdr.headers()?);
    cols.require(&[columns::UID])?;

    let mut parsed = ParsedCoins::default();
    for row in rdr.records() {
        let row = row?;
        if dialect::is_blank(&row) {
            continue;
        }
        parsed.rows += 1;

        let Some(record) = parse_row(&cols, &row) else {
            debug!(line = ?row.position().map(|p| p.line()), "Skipping row without UID");
            parsed.skipped_rows += 1;
            continue;
        };

        if let Some(link) = cols.get(&row, columns::LINK) {
            parsed.links.declare(record.id.clone(), link);
        }
        parsed.records.push(record);
    }

    Ok(parsed)
}

fn parse_row(cols: &Columns, row: &StringRecord) -> Option<Record> {
    let mut record = Record::new(cols.get(row, columns::UID)?);

    record.type_id = cols.text(row, columns::TYPEID);
    record.source = cols.text(row, columns::SOURCE);
    record.mint = cols.text(row, columns::MINT);
    record.authority = cols.text(row, columns::AUTHORITY);

    record.set_dates(
        cols.get(row, columns::DATE_FROM).and_then(parse_date),
        cols.get(row, columns::DATE_TO).and_then(parse_date),
    );

    record.coin_name = cols.text(row, columns::COIN_NAME);
    record.alloy = cols.text(row, columns::ALLOY);

    let decimal = |column: &str, scale: u32| cols.get(row, column).and_then(|raw| parse_decimal(raw, scale));
    record.value = decimal(columns::VALUE, DEFAULT_SCALE);
    record.quantity = decimal(columns::QUANTITY, QUANTITY_SCALE);
    record.purity = decimal(columns::PURITY, DEFAULT_SCALE);
    record.raw_weight = decimal(columns::RAW_WEIGHT, DEFAULT_SCALE);
    record.fine_weight = decimal(columns::FINE_WEIGHT, DEFAULT_SCALE);
    record.taille = decimal(columns::TAILLE, DEFAULT_SCALE);

    record.higher_authority = cols.text(row, columns::HIGHER_AUTHORITY);
    record.alternative_coin_name = cols.text(row, columns::ALT_COIN_NAME);
    record.alternative_type_id = cols.text(row, columns::ALT_TYPEID);

    Some(record)
}

// ============================================================================
// TESTS
// ============================================================================
