// 🪙 Record - one enriched row of the coins dataset
//
// Core attributes come straight from the source row. The derived fields
// (day span, hourly-wage value) are computed during ingestion and never
// supplied by the user.

use crate::temporal::DaySpan;
use chrono::{Datelike, NaiveDate};
use rust_decimal::serde::float_option;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use std::str::FromStr;

// ============================================================================
// FIXED-POINT SCALES
// ============================================================================

/// Scale of monetary value, purity, weights and taille
pub const DEFAULT_SCALE: u32 = 3;

/// Scale of the coin quantity
pub const QUANTITY_SCALE: u32 = 0;

/// Scale of hourly wages
pub const WAGE_SCALE: u32 = 2;

/// Round half-up to `scale` decimal places and pad to exactly that scale
pub fn round_half_up(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// Parse a plain numeric literal at a fixed scale
///
/// Empty or non-numeric input is absent, never an error.
pub fn parse_decimal(raw: &str, scale: u32) -> Option<Decimal> {
    if raw.is_empty() {
        return None;
    }

    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
        .map(|value| round_half_up(value, scale))
}

// ============================================================================
// DATES
// ============================================================================

/// Dataset date format: day-month-year, no padding (e.g. "1-7-1750")
const DATE_FORMAT: &str = "%d-%m-%Y";

/// Parse a `d-M-u` date; anything unparsable is absent
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

/// Format a date as `d-M-u`
pub fn format_date(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.day(), date.month(), date.year())
}

#[derive(Serialize)]
struct DateParts {
    year: i32,
    month: u32,
    day: u32,
}

fn serialize_date<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
    match date {
        Some(date) => DateParts {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
        .serialize(serializer),
        None => serializer.serialize_none(),
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// Record - a coin type with descriptive, temporal and numeric attributes
///
/// Date bounds are private so the derived span can never go stale: every
/// write goes through the setters, which recompute it.
///
/// JSON shape: absent attributes are left out, decimals are numbers and
/// dates are `{"year", "month", "day"}` objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "UID")]
    pub id: String,

    #[serde(rename = "TYPEID", skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,

    #[serde(rename = "SOURCE", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(rename = "MINT", skip_serializing_if = "Option::is_none")]
    pub mint: Option<String>,

    #[serde(rename = "AUTHORITY", skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,

    #[serde(
        rename = "DATEfrom",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_date"
    )]
    date_from: Option<NaiveDate>,

    #[serde(
        rename = "DATEto",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_date"
    )]
    date_to: Option<NaiveDate>,

    #[serde(rename = "CoinNAME", skip_serializing_if = "Option::is_none")]
    pub coin_name: Option<String>,

    #[serde(rename = "ALLOY", skip_serializing_if = "Option::is_none")]
    pub alloy: Option<String>,

    #[serde(
        rename = "VALUEd",
        skip_serializing_if = "Option::is_none",
        serialize_with = "float_option::serialize"
    )]
    pub value: Option<Decimal>,

    #[serde(
        rename = "QTTYcoins",
        skip_serializing_if = "Option::is_none",
        serialize_with = "float_option::serialize"
    )]
    pub quantity: Option<Decimal>,

    #[serde(
        rename = "FINEness",
        skip_serializing_if = "Option::is_none",
        serialize_with = "float_option::serialize"
    )]
    pub purity: Option<Decimal>,

    #[serde(
        rename = "WEIGHTraw",
        skip_serializing_if = "Option::is_none",
        serialize_with = "float_option::serialize"
    )]
    pub raw_weight: Option<Decimal>,

    #[serde(
        rename = "WEIGHTfine",
        skip_serializing_if = "Option::is_none",
        serialize_with = "float_option::serialize"
    )]
    pub fine_weight: Option<Decimal>,

    #[serde(
        rename = "TAILLE",
        skip_serializing_if = "Option::is_none",
        serialize_with = "float_option::serialize"
    )]
    pub taille: Option<Decimal>,

    #[serde(rename = "AUTHORITY_SUPRA", skip_serializing_if = "Option::is_none")]
    pub higher_authority: Option<String>,

    #[serde(rename = "ALT_CoinNAME", skip_serializing_if = "Option::is_none")]
    pub alternative_coin_name: Option<String>,

    #[serde(rename = "ALT_TYPEID", skip_serializing_if = "Option::is_none")]
    pub alternative_type_id: Option<String>,

    #[serde(
        rename = "VALUE_HourlyWAGE",
        skip_serializing_if = "Option::is_none",
        serialize_with = "float_option::serialize"
    )]
    pub value_in_hourly_wages: Option<Decimal>,

    // ========================================================================
    // DERIVED (recomputed whenever both date bounds are set)
    // ========================================================================
    #[serde(flatten)]
    span: Option<DaySpan>,
}

impl Record {
    /// Create an empty record with the given external id
    pub fn new(id: impl Into<String>) -> Self {
        Record {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn date_from(&self) -> Option<NaiveDate> {
        self.date_from
    }

    pub fn date_to(&self) -> Option<NaiveDate> {
        self.date_to
    }

    pub fn set_date_from(&mut self, date_from: Option<NaiveDate>) {
        self.date_from = date_from;
        self.recompute_span();
    }

    pub fn set_date_to(&mut self, date_to: Option<NaiveDate>) {
        self.date_to = date_to;
        self.recompute_span();
    }

    /// Set both bounds at once
    pub fn set_dates(&mut self, date_from: Option<NaiveDate>, date_to: Option<NaiveDate>) {
        self.date_from = date_from;
        self.date_to = date_to;
        self.recompute_span();
    }

    /// Builder: set both bounds
    pub fn with_dates(mut self, date_from: NaiveDate, date_to: NaiveDate) -> Self {
        self.set_dates(Some(date_from), Some(date_to));
        self
    }

    /// Derived span, absent unless both bounds are present
    pub fn span(&self) -> Option<&DaySpan> {
        self.span.as_ref()
    }

    /// Inclusive day count, 0 when a bound is missing
    pub fn total_days(&self) -> i64 {
        self.span.as_ref().map_or(0, |span| span.total_days)
    }

    fn recompute_span(&mut self) {
        self.span = match (self.date_from, self.date_to) {
            (Some(from), Some(to)) => Some(DaySpan::between(from, to)),
            _ => None,
        };
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_decimal_pads_scale() {
        let value = parse_decimal("100", DEFAULT_SCALE).unwrap();
        assert_eq!(value.to_string(), "100.000");
        assert_eq!(value.scale(), 3);
    }

    #[test]
    fn test_parse_decimal_rounds_half_up() {
        assert_eq!(parse_decimal("2.5", QUANTITY_SCALE).unwrap().to_string(), "3");
        assert_eq!(parse_decimal("-2.5", QUANTITY_SCALE).unwrap().to_string(), "-3");
        assert_eq!(parse_decimal("1.0005", DEFAULT_SCALE).unwrap().to_string(), "1.001");
        assert_eq!(parse_decimal("1.0004", DEFAULT_SCALE).unwrap().to_string(), "1.000");
    }

    #[test]
    fn test_parse_decimal_scientific() {
        assert_eq!(parse_decimal("1e3", QUANTITY_SCALE).unwrap().to_string(), "1000");
    }

    #[test]
    fn test_parse_decimal_invalid_is_absent() {
        assert_eq!(parse_decimal("", DEFAULT_SCALE), None);
        assert_eq!(parse_decimal("abc", DEFAULT_SCALE), None);
        assert_eq!(parse_decimal("1,5", DEFAULT_SCALE), None);
    }

    #[test]
    fn test_parse_date_unpadded() {
        assert_eq!(parse_date("1-7-1750"), Some(date(1750, 7, 1)));
        assert_eq!(parse_date("01-07-1750"), Some(date(1750, 7, 1)));
        assert_eq!(parse_date("31-12-1699"), Some(date(1699, 12, 31)));
    }

    #[test]
    fn test_parse_date_invalid_is_absent() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("1750-07-01"), None);
        assert_eq!(parse_date("32-1-1750"), None);
        assert_eq!(parse_date("unknown"), None);
    }

    #[test]
    fn test_format_date_unpadded() {
        assert_eq!(format_date(date(1750, 7, 1)), "1-7-1750");
        assert_eq!(format_date(date(812, 11, 23)), "23-11-812");
    }

    #[test]
    fn test_span_requires_both_bounds() {
        let mut record = Record::new("A");
        assert!(record.span().is_none());

        record.set_date_from(Some(date(2020, 1, 1)));
        assert!(record.span().is_none());
        assert_eq!(record.total_days(), 0);

        record.set_date_to(Some(date(2020, 1, 10)));
        assert_eq!(record.total_days(), 10);
        assert_eq!(record.span().unwrap().days_in(2020), 10);
    }

    #[test]
    fn test_span_recomputed_on_change() {
        let mut record = Record::new("A").with_dates(date(2020, 1, 1), date(2020, 1, 10));

        record.set_date_to(Some(date(2021, 1, 10)));
        assert_eq!(record.total_days(), 376);
        assert_eq!(record.span().unwrap().days_in(2021), 10);

        record.set_date_from(None);
        assert!(record.span().is_none());
        assert_eq!(record.total_days(), 0);
    }

    #[test]
    fn test_json_uses_external_names() {
        let mut record = Record::new("C-1").with_dates(date(2020, 1, 1), date(2020, 1, 10));
        record.mint = Some("Utrecht".to_string());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["UID"], "C-1");
        assert_eq!(json["MINT"], "Utrecht");
        assert_eq!(json["totalDays"], 10);
        assert!(json.get("totalDaysPerYear").is_some());
    }

    #[test]
    fn test_json_wire_shape() {
        let mut record = Record::new("C-1").with_dates(date(1750, 7, 1), date(1750, 12, 31));
        record.value = parse_decimal("10", DEFAULT_SCALE);
        record.quantity = parse_decimal("0", QUANTITY_SCALE);

        let json = serde_json::to_value(&record).unwrap();

        // decimals are numbers, so the client can add them up
        assert!(json["VALUEd"].is_number());
        assert_eq!(json["VALUEd"].as_f64(), Some(10.0));
        assert_eq!(json["QTTYcoins"].as_f64(), Some(0.0));

        // dates are split into their parts
        assert_eq!(json["DATEfrom"], serde_json::json!({"year": 1750, "month": 7, "day": 1}));
        assert_eq!(json["DATEto"]["day"], 31);

        // absent attributes are left out rather than null
        assert!(json.get("TYPEID").is_none());
        assert!(json.get("FINEness").is_none());
    }

    #[test]
    fn test_json_omits_missing_dates_and_span() {
        let json = serde_json::to_value(Record::new("C-2")).unwrap();

        assert_eq!(json, serde_json::json!({"UID": "C-2"}));
    }
}
