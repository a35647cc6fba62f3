// 🏛️ Field Registry - record attributes addressed by their external name
//
// The filter engine only knows external names ("MINT", "VALUEd", ...). This
// table maps each name to its value kind and to the record field behind it,
// so the engine never has to know the Record layout. Unknown names are
// simply not found.

use crate::record::Record;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

// ============================================================================
// FIELD KINDS AND VALUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    Text,
    Decimal,
    Date,
}

/// A borrowed field value read off a record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Decimal(Decimal),
    Date(NaiveDate),
}

impl<'a> FieldValue<'a> {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Decimal(_) => FieldKind::Decimal,
            FieldValue::Date(_) => FieldKind::Date,
        }
    }

    /// Borrowed from the record, not from this value
    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            FieldValue::Text(text) => Some(*text),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Decimal(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Decimal(value) => write!(f, "{}", value),
            FieldValue::Date(date) => write!(f, "{}", crate::record::format_date(*date)),
        }
    }
}

// ============================================================================
// FIELD TABLE
// ============================================================================

/// Record attribute reachable through the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    TypeId,
    Source,
    Mint,
    Authority,
    DateFrom,
    DateTo,
    CoinName,
    Alloy,
    Value,
    Quantity,
    Purity,
    RawWeight,
    FineWeight,
    Taille,
    HigherAuthority,
    AlternativeCoinName,
    AlternativeTypeId,
    ValueInHourlyWages,
}

impl Field {
    /// Read this field from a record; `None` when absent
    pub fn read<'r>(&self, record: &'r Record) -> Option<FieldValue<'r>> {
        let text = |value: &'r Option<String>| value.as_deref().map(FieldValue::Text);
        let decimal = |value: Option<Decimal>| value.map(FieldValue::Decimal);

        match self {
            Field::Id => Some(FieldValue::Text(&record.id)),
            Field::TypeId => text(&record.type_id),
            Field::Source => text(&record.source),
            Field::Mint => text(&record.mint),
            Field::Authority => text(&record.authority),
            Field::DateFrom => record.date_from().map(FieldValue::Date),
            Field::DateTo => record.date_to().map(FieldValue::Date),
            Field::CoinName => text(&record.coin_name),
            Field::Alloy => text(&record.alloy),
            Field::Value => decimal(record.value),
            Field::Quantity => decimal(record.quantity),
            Field::Purity => decimal(record.purity),
            Field::RawWeight => decimal(record.raw_weight),
            Field::FineWeight => decimal(record.fine_weight),
            Field::Taille => decimal(record.taille),
            Field::HigherAuthority => text(&record.higher_authority),
            Field::AlternativeCoinName => text(&record.alternative_coin_name),
            Field::AlternativeTypeId => text(&record.alternative_type_id),
            Field::ValueInHourlyWages => decimal(record.value_in_hourly_wages),
        }
    }
}

/// One registry entry: external name, value kind, backing field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAccessor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub field: Field,
}

const fn accessor(name: &'static str, kind: FieldKind, field: Field) -> FieldAccessor {
    FieldAccessor { name, kind, field }
}

/// Every externally addressable record attribute
pub static FIELDS: [FieldAccessor; 19] = [
    accessor("UID", FieldKind::Text, Field::Id),
    accessor("TYPEID", FieldKind::Text, Field::TypeId),
    accessor("SOURCE", FieldKind::Text, Field::Source),
    accessor("MINT", FieldKind::Text, Field::Mint),
    accessor("AUTHORITY", FieldKind::Text, Field::Authority),
    accessor("DATEfrom", FieldKind::Date, Field::DateFrom),
    accessor("DATEto", FieldKind::Date, Field::DateTo),
    accessor("CoinNAME", FieldKind::Text, Field::CoinName),
    accessor("ALLOY", FieldKind::Text, Field::Alloy),
    accessor("VALUEd", FieldKind::Decimal, Field::Value),
    accessor("QTTYcoins", FieldKind::Decimal, Field::Quantity),
    accessor("FINEness", FieldKind::Decimal, Field::Purity),
    accessor("WEIGHTraw", FieldKind::Decimal, Field::RawWeight),
    accessor("WEIGHTfine", FieldKind::Decimal, Field::FineWeight),
    accessor("TAILLE", FieldKind::Decimal, Field::Taille),
    accessor("AUTHORITY_SUPRA", FieldKind::Text, Field::HigherAuthority),
    accessor("ALT_CoinNAME", FieldKind::Text, Field::AlternativeCoinName),
    accessor("ALT_TYPEID", FieldKind::Text, Field::AlternativeTypeId),
    accessor("VALUE_HourlyWAGE", FieldKind::Decimal, Field::ValueInHourlyWages),
];

// ============================================================================
// FIELD REGISTRY
// ============================================================================

/// FieldRegistry - lookups over the static field table
///
/// Names are matched exactly (case-sensitive), as they appear on the wire.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldRegistry;

impl FieldRegistry {
    pub fn new() -> Self {
        FieldRegistry
    }

    pub fn lookup(&self, name: &str) -> Option<&'static FieldAccessor> {
        FIELDS.iter().find(|accessor| accessor.name == name)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.lookup(name).map(|accessor| accessor.kind)
    }

    /// Value of `name` on `record`; `None` for unknown names or absent values
    pub fn value<'r>(&self, name: &str, record: &'r Record) -> Option<FieldValue<'r>> {
        self.lookup(name)?.field.read(record)
    }

    pub fn all(&self) -> impl Iterator<Item = &'static FieldAccessor> {
        FIELDS.iter()
    }

    pub fn text_fields(&self) -> impl Iterator<Item = &'static FieldAccessor> {
        FIELDS.iter().filter(|accessor| accessor.kind == FieldKind::Text)
    }

    pub fn len(&self) -> usize {
        FIELDS.len()
    }

    pub fn is_empty(&self) -> bool {
        FIELDS.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
