use std::collections::HashMap;
use strum::Display;

/// Cache resource names. Query keys start with one of these, and the
/// invalidation table maps mutations onto them.
pub const RECEIVING: &str = "recebimentos";
pub const CA_BOARD: &str = "ca_board";
pub const CA_DETAIL: &str = "ca";
pub const REQUISITIONS_PENDING: &str = "requisitions_pending";

/// Every mutation the client can issue, named for the invalidation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MutationKind {
    ReceivingCreated,
    ConferenceSubmitted,
    ReceivingResolved,
    ReceivingRejected,
    ChangeRequestCreated,
    ItemStockStatusUpdated,
    MovementRegistered,
    RequisitionCreated,
    RequisitionFulfilled,
}

/// Explicit mutation-to-resource dependency table.
///
/// Invalidation scope is decided here and nowhere else, so a reviewer can see
/// at a glance which reads a given write can stale out. A stock-status update
/// must hit both the detail resource and the board resource; refreshing only
/// one leaves the other showing pre-mutation data.
#[derive(Debug, Clone)]
pub struct InvalidationTable {
    affected: HashMap<MutationKind, Vec<&'static str>>,
}

impl InvalidationTable {
    /// The dependency table for the backend this crate targets.
    pub fn standard() -> Self {
        let mut affected = HashMap::new();
        affected.insert(MutationKind::ReceivingCreated, vec![RECEIVING]);
        affected.insert(MutationKind::ConferenceSubmitted, vec![RECEIVING]);
        affected.insert(MutationKind::ReceivingResolved, vec![RECEIVING]);
        affected.insert(MutationKind::ReceivingRejected, vec![RECEIVING]);
        affected.insert(MutationKind::ChangeRequestCreated, vec![CA_BOARD]);
        affected.insert(
            MutationKind::ItemStockStatusUpdated,
            vec![CA_DETAIL, CA_BOARD],
        );
        affected.insert(MutationKind::MovementRegistered, vec![CA_DETAIL]);
        affected.insert(MutationKind::RequisitionCreated, vec![REQUISITIONS_PENDING]);
        affected.insert(
            MutationKind::RequisitionFulfilled,
            vec![REQUISITIONS_PENDING],
        );
        Self { affected }
    }

    /// Resources a mutation of the given kind stales out.
    pub fn affected_resources(&self, kind: MutationKind) -> &[&'static str] {
        self.affected.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}
