// 🕰️ Hourly-Wage Normalization - coin value expressed in hours of labour
//
// For each year the record is active and the wage table covers:
//   total_value += days_in_year * wage[year]
//   total_days  += days_in_year
// average_wage = total_value / total_days   (half-up, wage scale)
// normalized   = value / average_wage       (half-up, value scale)

use crate::record::{round_half_up, Record, WAGE_SCALE};
use crate::wages::WageTable;
use rust_decimal::Decimal;

/// Day-weighted average wage over the covered years of a record's span
pub fn average_wage(record: &Record, wages: &WageTable) -> Option<Decimal> {
    let span = record.span()?;

    let mut total_value = Decimal::ZERO;
    let mut total_days: i64 = 0;
    for (&year, &days) in &span.days_per_year {
        if let Some(wage) = wages.get(year) {
            total_value = total_value.checked_add(wage.checked_mul(Decimal::from(days))?)?;
            total_days += days;
        }
    }

    if total_days <= 0 {
        return None;
    }
    let average = total_value.checked_div(Decimal::from(total_days))?;
    Some(round_half_up(average, WAGE_SCALE))
}

/// Value of the record in hourly wages, absent without value or coverage
pub fn value_in_hourly_wages(record: &Record, wages: &WageTable) -> Option<Decimal> {
    let value = record.value?;
    let average = average_wage(record, wages)?;
    if average.is_zero() {
        return None;
    }

    let normalized = value.checked_div(average)?;
    Some(round_half_up(normalized, value.scale()))
}

/// Fill in `value_in_hourly_wages` for every record; returns how many got one
pub fn normalize_values(records: &mut [Record], wages: &WageTable) -> usize {
    let mut normalized = 0;
    for record in records.iter_mut() {
        record.value_in_hourly_wages = value_in_hourly_wages(record, wages);
        if record.value_in_hourly_wages.is_some() {
            normalized += 1;
        }
    }
    normalized
}
