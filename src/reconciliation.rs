// ⚖️ Quantity Reconciliation - split a shared coin total across linked records
//
// A record with a quantity of exactly zero that links to other records
// takes its share of each linked record's quantity, proportional to the
// number of days each of the two is active:
//
//   this   := q * dA / (dA + dB)
//   linked := q * dB / (dA + dB)
//
// where q is the linked record's quantity. Both results are rounded
// half-up at q's scale.
//
// The pass never mutates while reading. Every split is computed against the
// parsed records as they came out of the file, collected into an
// accumulator keyed by record slot, and applied in one go at the end. When
// several splits touch the same slot, the one processed last (record order,
// then link order) wins.

use crate::record::{round_half_up, Record};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

// ============================================================================
// LINK GRAPH
// ============================================================================

/// LinkGraph - record id -> ids of the records it declares links to
///
/// Declared one way in the source; the split adjusts both sides.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    links: HashMap<String, Vec<String>>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the comma-separated LINK cell of a row
    ///
    /// A later declaration for the same id replaces the earlier one.
    pub fn declare(&mut self, id: impl Into<String>, raw: &str) {
        let targets = raw.split(',').map(str::to_string).collect();
        self.links.insert(id.into(), targets);
    }

    pub fn targets(&self, id: &str) -> Option<&[String]> {
        self.links.get(id).map(Vec::as_slice)
    }

    /// Number of records that declare at least one link
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

// ============================================================================
// RECONCILIATION REPORT
// ============================================================================

/// One computed split between a zero-quantity record and a linked record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantitySplit {
    pub record_id: String,
    pub linked_id: String,
    pub original_total: Decimal,
    pub record_quantity: Decimal,
    pub linked_quantity: Decimal,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconciliationReport {
    /// Splits in processing order
    pub splits: Vec<QuantitySplit>,

    /// Links to unknown ids, to records without a quantity, or where
    /// neither side has any active day
    pub skipped_links: usize,
}

impl ReconciliationReport {
    pub fn summary(&self) -> String {
        format!(
            "{} quantity splits applied, {} links skipped",
            self.splits.len(),
            self.skipped_links
        )
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

/// QuantityReconciler - computes and applies link splits over a record slice
pub struct QuantityReconciler<'a> {
    index: &'a HashMap<String, usize>,
    links: &'a LinkGraph,
}

impl<'a> QuantityReconciler<'a> {
    /// `index` maps an external id to the slot of the record that answers
    /// to it (the last one, for duplicate ids)
    pub fn new(index: &'a HashMap<String, usize>, links: &'a LinkGraph) -> Self {
        QuantityReconciler { index, links }
    }

    /// Compute all splits against `records` and write them back
    pub fn reconcile(&self, records: &mut [Record]) -> ReconciliationReport {
        let (updates, report) = self.plan(records);

        for (slot, quantity) in updates {
            records[slot].quantity = Some(quantity);
        }

        debug!(splits = report.splits.len(), skipped = report.skipped_links, "Reconciled quantities");
        report
    }

    /// Read-only pass: slot -> new quantity, last write wins
    fn plan(&self, records: &[Record]) -> (HashMap<usize, Decimal>, ReconciliationReport) {
        let mut updates = HashMap::new();
        let mut report = ReconciliationReport::default();

        for (slot, record) in records.iter().enumerate() {
            if !record.quantity.is_some_and(|q| q.is_zero()) {
                continue;
            }
            let Some(targets) = self.links.targets(&record.id) else {
                continue;
            };

            for target_id in targets {
                let Some(&target) = self.index.get(target_id) else {
                    report.skipped_links += 1;
                    continue;
                };
                let linked = &records[target];

                match split(record, linked) {
                    Some((record_quantity, linked_quantity, original_total)) => {
                        updates.insert(slot, record_quantity);
                        updates.insert(target, linked_quantity);
                        report.splits.push(QuantitySplit {
                            record_id: record.id.clone(),
                            linked_id: linked.id.clone(),
                            original_total,
                            record_quantity,
                            linked_quantity,
                        });
                    }
                    None => report.skipped_links += 1,
                }
            }
        }

        (updates, report)
    }
}

/// (record share, linked share, linked total) for one pair
fn split(record: &Record, linked: &Record) -> Option<(Decimal, Decimal, Decimal)> {
    let total = linked.quantity?;
    let record_days = record.total_days();
    let linked_days = linked.total_days();
    let combined = record_days + linked_days;
    if combined == 0 {
        return None;
    }

    let scale = total.scale();
    let share = |days: i64| -> Option<Decimal> {
        let portion = total
            .checked_mul(Decimal::from(days))?
            .checked_div(Decimal::from(combined))?;
        Some(round_half_up(portion, scale))
    };

    Some((share(record_days)?, share(linked_days)?, total))
}

// ============================================================================
// TESTS
// ============================================================================
