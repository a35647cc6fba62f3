// 🔎 Records Filter - declarative, query-driven selection over a RecordSet
//
// A query carries:
// - an optional year range (`from`, `to`) with a mode (`years`)
// - any number of `FIELD -> [criterion, ...]` entries
//
// Criteria use a tiny `negation:operator:operand` language:
//   text fields:     eq:ctns:gold   (contains, case-insensitive)
//                    eq:is:Utrecht  (any other operator: equals, case-insensitive)
//   decimal fields:  eq:0:100       (inclusive range min:max)
//   negation "eq" passes on a match, anything else passes on a non-match.
//
// Within one field the criteria are OR-ed; the date filter and every field
// filter are AND-ed. Records are only selected, never modified.

use crate::attributes::{FieldAccessor, FieldKind, FieldRegistry};
use crate::ingest::RecordSet;
use crate::record::Record;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use tracing::debug;

pub const YEARS_PARAM: &str = "years";
pub const FROM_PARAM: &str = "from";
pub const TO_PARAM: &str = "to";

/// Mode token requiring the whole record range inside the year range
pub const COMPLETE_MODE: &str = "complete";

// ============================================================================
// QUERY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterQuery {
    pub years: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,

    /// External field name -> raw criteria, in query order
    pub criteria: Vec<(String, Vec<String>)>,
}

impl FilterQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded query pairs
    ///
    /// The first `years`/`from`/`to` value wins; every other key keeps all
    /// of its values, grouped under the key's first position.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut query = FilterQuery::new();
        for (key, value) in pairs {
            let key = key.into();
            let value = value.into();
            match key.as_str() {
                YEARS_PARAM => {
                    query.years.get_or_insert(value);
                }
                FROM_PARAM => {
                    query.from.get_or_insert(value);
                }
                TO_PARAM => {
                    query.to.get_or_insert(value);
                }
                _ => query.push_criterion(key, value),
            }
        }
        query
    }

    /// Builder: year range
    pub fn with_range(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self.to = Some(to.into());
        self
    }

    /// Builder: year mode
    pub fn with_years(mut self, years: impl Into<String>) -> Self {
        self.years = Some(years.into());
        self
    }

    /// Builder: add a criterion for a field
    pub fn with_criterion(mut self, field: impl Into<String>, criterion: impl Into<String>) -> Self {
        self.push_criterion(field.into(), criterion.into());
        self
    }

    fn push_criterion(&mut self, field: String, criterion: String) {
        match self.criteria.iter_mut().find(|(name, _)| *name == field) {
            Some((_, values)) => values.push(criterion),
            None => self.criteria.push((field, vec![criterion])),
        }
    }

    /// Date range to filter on, when both years parse and from < to
    pub fn date_range(&self) -> Option<DateRange> {
        let from = year_start(self.from.as_deref()?)?;
        let to = year_end(self.to.as_deref()?)?;
        if from >= to {
            return None;
        }

        let mode = match self.years.as_deref() {
            Some(years) if years.eq_ignore_ascii_case(COMPLETE_MODE) => RangeMode::Complete,
            _ => RangeMode::Overlap,
        };
        Some(DateRange { from, to, mode })
    }
}

fn year_start(raw: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(raw.parse().ok()?, 1, 1)
}

fn year_end(raw: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(raw.parse().ok()?, 12, 31)
}

// ============================================================================
// DATE RANGE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    /// Record range strictly inside the query range
    Complete,
    /// Either record bound strictly inside the query range
    Overlap,
}

/// Query range from Jan 1 of `from` to Dec 31 of `to`
///
/// All comparisons are strict: a record bound falling exactly on Jan 1 of
/// `from` or Dec 31 of `to` does not count as inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub mode: RangeMode,
}

impl DateRange {
    pub fn accepts(&self, record: &Record) -> bool {
        let (Some(date_from), Some(date_to)) = (record.date_from(), record.date_to()) else {
            return false;
        };

        match self.mode {
            RangeMode::Complete => date_from > self.from && date_to < self.to,
            RangeMode::Overlap => self.strictly_inside(date_from) || self.strictly_inside(date_to),
        }
    }

    fn strictly_inside(&self, date: NaiveDate) -> bool {
        date > self.from && date < self.to
    }
}

// ============================================================================
// CRITERIA
// ============================================================================

/// Negation token meaning "pass when the match holds"
pub const MATCH_NEGATION: &str = "eq";

/// Operator token for case-insensitive containment on text fields
pub const CONTAINS_OPERATOR: &str = "ctns";

/// One `negation:operator:operand` clause, split but not yet interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub negation: String,
    pub operator: String,
    pub operand: String,
}

impl Criterion {
    /// Split into at most three parts; fewer than three is not a criterion
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, ':');
        Some(Criterion {
            negation: parts.next()?.to_string(),
            operator: parts.next()?.to_string(),
            operand: parts.next()?.to_string(),
        })
    }

    fn pass_on_match(&self) -> bool {
        self.negation == MATCH_NEGATION
    }

    /// Interpret against a text field
    pub fn text_test(&self) -> TextTest {
        let needle = self.operand.to_lowercase();
        let op = if self.operator == CONTAINS_OPERATOR {
            TextOp::Contains(needle)
        } else {
            TextOp::Equals(needle)
        };
        TextTest {
            pass_on_match: self.pass_on_match(),
            op,
        }
    }

    /// Interpret against a decimal field: `operator` is min, `operand` is max
    pub fn decimal_test(&self) -> DecimalTest {
        let range = parse_number(&self.operator).zip(parse_number(&self.operand));
        DecimalTest {
            pass_on_match: self.pass_on_match(),
            range,
        }
    }
}

fn parse_number(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOp {
    Contains(String),
    Equals(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTest {
    pass_on_match: bool,
    op: TextOp,
}

impl TextTest {
    /// Whether a record with this value passes; absent never matches
    pub fn passes(&self, value: Option<&str>) -> bool {
        let matched = value.is_some_and(|value| {
            let value = value.to_lowercase();
            match &self.op {
                TextOp::Contains(needle) => value.contains(needle.as_str()),
                TextOp::Equals(expected) => value == *expected,
            }
        });
        matched == self.pass_on_match
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalTest {
    pass_on_match: bool,
    /// None when either bound failed to parse: nothing matches
    range: Option<(Decimal, Decimal)>,
}

impl DecimalTest {
    pub fn passes(&self, value: Option<Decimal>) -> bool {
        let matched = match (value, self.range) {
            (Some(value), Some((min, max))) => min <= value && value <= max,
            _ => false,
        };
        matched == self.pass_on_match
    }
}

// ============================================================================
// FIELD FILTERS
// ============================================================================

/// All criteria of one recognized field, compiled for its kind
#[derive(Debug, Clone)]
enum FieldFilter {
    Text { name: String, tests: Vec<TextTest> },
    Decimal { name: String, tests: Vec<DecimalTest> },
}

impl FieldFilter {
    /// `None` for unknown names and for kinds that cannot be filtered
    fn compile(registry: &FieldRegistry, name: &str, raw: &[String]) -> Option<Self> {
        let criteria = raw.iter().filter_map(|c| Criterion::parse(c));
        match registry.kind_of(name)? {
            FieldKind::Text => Some(FieldFilter::Text {
                name: name.to_string(),
                tests: criteria.map(|c| c.text_test()).collect(),
            }),
            FieldKind::Decimal => Some(FieldFilter::Decimal {
                name: name.to_string(),
                tests: criteria.map(|c| c.decimal_test()).collect(),
            }),
            FieldKind::Date => None,
        }
    }

    /// Passes when any one criterion passes
    fn accepts(&self, registry: &FieldRegistry, record: &Record) -> bool {
        match self {
            FieldFilter::Text { name, tests } => {
                let value = registry.value(name, record).and_then(|v| v.as_text());
                tests.iter().any(|test| test.passes(value))
            }
            FieldFilter::Decimal { name, tests } => {
                let value = registry.value(name, record).and_then(|v| v.as_decimal());
                tests.iter().any(|test| test.passes(value))
            }
        }
    }
}

// ============================================================================
// RECORDS FILTER
// ============================================================================

/// Result of one filter run
#[derive(Debug, Clone, Serialize)]
pub struct FilterOutcome<'a> {
    pub records: Vec<&'a Record>,

    /// Text field -> distinct values among the selected records
    pub values: BTreeMap<String, BTreeSet<String>>,

    #[serde(rename = "minYear")]
    pub min_year: Option<i32>,

    #[serde(rename = "maxYear")]
    pub max_year: Option<i32>,
}

/// RecordsFilter - evaluates a FilterQuery against records
#[derive(Debug, Clone, Default)]
pub struct RecordsFilter {
    registry: FieldRegistry,

    /// Text fields summarized by `distinct_values`; empty means all of them
    value_fields: Vec<&'static FieldAccessor>,
}

impl RecordsFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: only summarize these fields
    ///
    /// Unknown names and non-text fields are dropped.
    pub fn with_value_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.value_fields = names
            .into_iter()
            .filter_map(|name| self.registry.lookup(name.as_ref()))
            .filter(|accessor| accessor.kind == FieldKind::Text)
            .collect();
        self
    }

    fn summarized_fields(&self) -> Vec<&'static FieldAccessor> {
        if self.value_fields.is_empty() {
            self.registry.text_fields().collect()
        } else {
            self.value_fields.clone()
        }
    }

    /// Select the records passing every filter of the query
    pub fn apply<'a, I>(&self, records: I, query: &FilterQuery) -> Vec<&'a Record>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut selected: Vec<&'a Record> = records.into_iter().collect();

        if let Some(range) = query.date_range() {
            selected.retain(|record| range.accepts(record));
        }

        for (name, raw) in &query.criteria {
            let Some(filter) = FieldFilter::compile(&self.registry, name, raw) else {
                debug!(field = %name, "Ignoring criteria for unknown or unfilterable field");
                continue;
            };
            selected.retain(|record| filter.accepts(&self.registry, record));
        }

        selected
    }

    /// Distinct non-absent values of the summarized text fields
    ///
    /// Fields without any value are left out of the map.
    pub fn distinct_values(&self, records: &[&Record]) -> BTreeMap<String, BTreeSet<String>> {
        let fields = self.summarized_fields();
        let mut values: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for record in records {
            for accessor in &fields {
                if let Some(text) = accessor.field.read(record).and_then(|v| v.as_text()) {
                    values.entry(accessor.name.to_string()).or_default().insert(text.to_string());
                }
            }
        }

        values
    }

    /// Smallest and largest year over all present date bounds
    pub fn year_bounds(&self, records: &[&Record]) -> Option<(i32, i32)> {
        records
            .iter()
            .flat_map(|record| [record.date_from(), record.date_to()])
            .flatten()
            .map(|date| date.year())
            .fold(None, |bounds, year| match bounds {
                None => Some((year, year)),
                Some((min, max)) => Some((min.min(year), max.max(year))),
            })
    }

    /// Filter and summarize in one go
    pub fn run<'a>(&self, set: &'a RecordSet, query: &FilterQuery) -> FilterOutcome<'a> {
        let records = self.apply(set, query);
        let values = self.distinct_values(&records);
        let bounds = self.year_bounds(&records);

        debug!(total = set.len(), selected = records.len(), "Filtered records");
        FilterOutcome {
            records,
            values,
            min_year: bounds.map(|(min, _)| min),
            max_year: bounds.map(|(_, max)| max),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
