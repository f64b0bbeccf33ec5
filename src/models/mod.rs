// Wire-faithful entities for the dashboard backend. Field names and status
// strings match the REST payloads exactly; the enums exist so the rest of the
// crate never compares raw strings.
pub mod change_request;
pub mod receiving;
pub mod requisition;

pub use change_request::{
    ChangeItem, ChangeRequest, ChangeRequestStatus, ItemAction, MaterialInfo, MovementType,
    NewChangeRequest, NewMaterialInfo, NewStockMovement, StockMovement, StockStatus,
};
pub use receiving::{
    ConferenceDetails, ConferencePayload, IssueType, NewReceivingRecord, ReceivingFilters,
    ReceivingRecord, ReceivingStatus, RejectionPayload, ResolutionOutcome, ResolutionPayload,
};
pub use requisition::{NewRequisition, Requisition};
