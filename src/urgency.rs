//! Cross-references receiving records against pending requisitions.
//!
//! A receipt is urgent when its order number, after whitespace trimming,
//! exactly equals the trimmed order number of a requisition that is still
//! pending. No other normalization applies: `"42"` and `"042"` are different
//! orders.

use std::collections::HashSet;

use crate::models::{ReceivingRecord, Requisition};

/// Trimmed order numbers of every requisition still awaiting material.
pub fn pending_order_numbers(requisitions: &[Requisition]) -> HashSet<&str> {
    requisitions
        .iter()
        .filter(|req| !req.is_fulfilled)
        .map(Requisition::trimmed_order_number)
        .filter(|number| !number.is_empty())
        .collect()
}

/// The set of receiving-record ids that match a pending requisition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrgentMatches {
    ids: HashSet<i64>,
}

impl UrgentMatches {
    pub fn contains(&self, record_id: i64) -> bool {
        self.ids.contains(&record_id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.ids.iter().copied()
    }
}

/// Derives the urgent set for a page of receiving records.
pub fn derive_urgent(records: &[ReceivingRecord], requisitions: &[Requisition]) -> UrgentMatches {
    let pending = pending_order_numbers(requisitions);
    let ids = records
        .iter()
        .filter_map(|record| {
            record
                .trimmed_order_number()
                .filter(|number| pending.contains(number))
                .map(|_| record.id)
        })
        .collect();
    UrgentMatches { ids }
}

/// Whether a single order number matches any pending requisition. Used at
/// registration time to decide between the plain success notice and the
/// urgent-material warning.
pub fn matches_pending(order_number: Option<&str>, requisitions: &[Requisition]) -> bool {
    match order_number.map(str::trim).filter(|number| !number.is_empty()) {
        Some(number) => requisitions
            .iter()
            .any(|req| !req.is_fulfilled && req.trimmed_order_number() == number),
        None => false,
    }
}
