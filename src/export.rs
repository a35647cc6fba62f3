// 📤 Export - write records back out in the dataset dialect
//
// 19 columns, hourly-wage value last. The DATEfrom column carries the end
// date and DATEto the start date: downstream consumers read the file that
// way, so the inversion stays.

use crate::dialect;
use crate::error::Result;
use crate::ingest::columns;
use crate::record::{format_date, Record};
use rust_decimal::Decimal;
use std::io::Write;

pub const EXPORT_HEADERS: [&str; 19] = [
    columns::UID,
    columns::TYPEID,
    columns::SOURCE,
    columns::MINT,
    columns::AUTHORITY,
    columns::DATE_FROM,
    columns::DATE_TO,
    columns::COIN_NAME,
    columns::ALLOY,
    columns::VALUE,
    columns::QUANTITY,
    columns::PURITY,
    columns::RAW_WEIGHT,
    columns::FINE_WEIGHT,
    columns::TAILLE,
    columns::HIGHER_AUTHORITY,
    columns::ALT_COIN_NAME,
    columns::ALT_TYPEID,
    columns::VALUE_IN_HOURLY_WAGES,
];

/// Write the header and one row per record
pub fn write_records<'a, W, I>(output: W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Record>,
{
    let mut wtr = dialect::writer(output);
    wtr.write_record(EXPORT_HEADERS)?;

    for record in records {
        wtr.write_record(row(record))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Export into an in-memory string
pub fn records_to_csv_string<'a, I>(records: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut buffer = Vec::new();
    write_records(&mut buffer, records)?;
    // csv only ever writes the UTF-8 it was given
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn row(record: &Record) -> [String; 19] {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    let number = |value: &Option<Decimal>| value.map(|v| v.to_string()).unwrap_or_default();
    let date = |value: Option<chrono::NaiveDate>| value.map(format_date).unwrap_or_default();

    [
        record.id.clone(),
        text(&record.type_id),
        text(&record.source),
        text(&record.mint),
        text(&record.authority),
        date(record.date_to()),
        date(record.date_from()),
        text(&record.coin_name),
        text(&record.alloy),
        number(&record.value),
        number(&record.quantity),
        number(&record.purity),
        number(&record.raw_weight),
        number(&record.fine_weight),
        number(&record.taille),
        text(&record.higher_authority),
        text(&record.alternative_coin_name),
        text(&record.alternative_type_id),
        number(&record.value_in_hourly_wages),
    ]
}
