use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use super::WorkflowError;
use crate::cache::invalidation::{CA_BOARD, CA_DETAIL};
use crate::cache::{MutationKind, QueryCache, QueryKey};
use crate::client::ApiClient;
use crate::error::ClientError;
use crate::models::{
    ChangeItem, ChangeRequest, ChangeRequestStatus, MaterialInfo, MovementType, NewChangeRequest,
    NewStockMovement, StockMovement, StockStatus,
};
use crate::notify::Notifier;
use crate::ListPage;

/// Destination prefilled in the return dialog.
pub const DEFAULT_RETURN_DESTINATION: &str = "Almoxarifado Central";

/// The three kanban columns, bucketed by exact status. Completed and
/// cancelled requests have no column and never appear on the board.
#[derive(Debug, Clone, Default)]
pub struct BoardColumns {
    pub pending_analysis: Vec<ChangeRequest>,
    pub awaiting_purchase: Vec<ChangeRequest>,
    pub ready_for_execution: Vec<ChangeRequest>,
}

impl BoardColumns {
    pub fn is_empty(&self) -> bool {
        self.card_count() == 0
    }

    /// Total cards on the board, across all columns.
    pub fn card_count(&self) -> usize {
        self.pending_analysis.len() + self.awaiting_purchase.len() + self.ready_for_execution.len()
    }
}

/// Buckets change-requests into board columns.
pub fn categorize(requests: Vec<ChangeRequest>) -> BoardColumns {
    let mut columns = BoardColumns::default();
    for request in requests {
        match request.status {
            ChangeRequestStatus::PendingStockAnalysis => columns.pending_analysis.push(request),
            ChangeRequestStatus::AwaitingPurchase => columns.awaiting_purchase.push(request),
            ChangeRequestStatus::ReadyForExecution => columns.ready_for_execution.push(request),
            ChangeRequestStatus::Completed | ChangeRequestStatus::Cancelled => {}
        }
    }
    columns
}

/// User-entered fields of the return dialog. Destination and quantity are
/// prefilled from the item but stay editable.
#[derive(Debug, Clone)]
pub struct ReturnDetails {
    pub destination_stock: String,
    pub quantity_moved: i32,
    pub executed_by: String,
}

impl ReturnDetails {
    pub fn for_item(item: &ChangeItem, executed_by: impl Into<String>) -> Self {
        Self {
            destination_stock: DEFAULT_RETURN_DESTINATION.into(),
            quantity_moved: item.quantity,
            executed_by: executed_by.into(),
        }
    }
}

/// Marker for a return whose movement was registered but whose item status
/// update failed. Holds everything needed to re-run the status step alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStatusFix {
    pub ca_id: i64,
    pub item_id: i64,
    pub movement_id: i64,
}

/// Outcome of the two-step return.
#[derive(Debug)]
pub enum ReturnOutcome {
    /// Movement registered and item marked as returned to stock.
    Completed(StockMovement),
    /// Movement registered but the status update failed. The workflow keeps
    /// the fix marker until [`KanbanWorkflow::retry_status_fix`] or
    /// [`KanbanWorkflow::reconcile`] lands it.
    StatusPending {
        movement: StockMovement,
        fix: PendingStatusFix,
    },
}

/// Drives the change-request board and the per-item actions on a request's
/// detail view.
///
/// The board and the detail are cached under separate resources. Any action
/// that changes an item must stale out both, since the same item renders in
/// both places; the invalidation table encodes that pairing.
pub struct KanbanWorkflow {
    client: ApiClient,
    cache: Arc<QueryCache>,
    notifier: Notifier,
    pending_fixes: Vec<PendingStatusFix>,
}

impl KanbanWorkflow {
    pub fn new(client: ApiClient, cache: Arc<QueryCache>, notifier: Notifier) -> Self {
        Self {
            client,
            cache,
            notifier,
            pending_fixes: Vec::new(),
        }
    }

    /// Loads the board. One large page so every open request is present;
    /// paginating a kanban would hide cards.
    #[instrument(skip(self))]
    pub async fn load_board(&self) -> Result<BoardColumns, ClientError> {
        let page_size = self.client.kanban_page_size();
        let params = [("page", "1".to_string()), ("page_size", page_size.to_string())];
        let page: ListPage<ChangeRequest> = self
            .cache
            .get_or_fetch(QueryKey::list(CA_BOARD, &params), || {
                self.client.list_change_requests(1, page_size)
            })
            .await?;
        Ok(categorize(page.items))
    }

    /// Most recent board cached, bucketed again. Lets the page render
    /// something while a fresh fetch runs.
    pub fn placeholder_board(&self) -> Option<BoardColumns> {
        self.cache
            .placeholder::<ListPage<ChangeRequest>>(CA_BOARD)
            .map(|page| categorize(page.items))
    }

    /// Loads one change-request with its items and movement history.
    #[instrument(skip(self))]
    pub async fn load_detail(&self, id: i64) -> Result<ChangeRequest, ClientError> {
        self.cache
            .get_or_fetch(QueryKey::detail(CA_DETAIL, id), || {
                self.client.get_change_request(id)
            })
            .await
    }

    #[instrument(skip(self, payload))]
    pub async fn create_change_request(
        &self,
        payload: &NewChangeRequest,
    ) -> Result<ChangeRequest, WorkflowError> {
        let created = match self.client.create_change_request(payload).await {
            Ok(created) => created,
            Err(err) => return Err(self.report(err)),
        };
        self.cache.invalidate_for(MutationKind::ChangeRequestCreated);
        self.notifier.success(format!("C.A. #{} created", created.id));
        Ok(created)
    }

    /// Sets one item's stock status. Refreshes both the detail and the
    /// board; the same item renders in both.
    #[instrument(skip(self))]
    pub async fn update_item_stock_status(
        &self,
        item_id: i64,
        status: StockStatus,
    ) -> Result<MaterialInfo, WorkflowError> {
        let updated = match self.client.update_item_stock_status(item_id, status).await {
            Ok(updated) => updated,
            Err(err) => return Err(self.report(err)),
        };
        self.cache.invalidate_for(MutationKind::ItemStockStatusUpdated);
        self.notifier.success(format!(
            "Status of \"{}\" set to {}",
            updated.material_description, status
        ));
        Ok(updated)
    }

    /// Runs the two-step return: register the exit movement, then mark the
    /// item as returned to stock.
    ///
    /// The backend has no transaction across the two writes. When the
    /// movement lands but the status update fails, the inconsistency is made
    /// explicit: the caller gets [`ReturnOutcome::StatusPending`] and the
    /// workflow keeps a [`PendingStatusFix`] until a retry lands it.
    #[instrument(skip(self, item, details), fields(item_id = item.id))]
    pub async fn register_return_movement(
        &mut self,
        ca_id: i64,
        item: &ChangeItem,
        details: ReturnDetails,
    ) -> Result<ReturnOutcome, WorkflowError> {
        if !item.eligible_for_return() {
            return Err(WorkflowError::Client(ClientError::Validation(
                "item is not eligible for a return movement".into(),
            )));
        }
        let payload = NewStockMovement {
            ca_id,
            item_description: item.material_description.clone(),
            quantity_moved: details.quantity_moved,
            movement_type: MovementType::ExitFromSite,
            destination_stock: Some(details.destination_stock),
            executed_by: details.executed_by,
        };
        let movement = match self.client.create_stock_movement(&payload).await {
            Ok(movement) => movement,
            Err(err) => return Err(self.report(err)),
        };
        self.cache.invalidate_for(MutationKind::MovementRegistered);

        match self
            .client
            .update_item_stock_status(item.id, StockStatus::ReturnedToStock)
            .await
        {
            Ok(_) => {
                self.cache.invalidate_for(MutationKind::ItemStockStatusUpdated);
                self.notifier.success(format!(
                    "Return of \"{}\" registered",
                    item.material_description
                ));
                Ok(ReturnOutcome::Completed(movement))
            }
            Err(err) => {
                let fix = PendingStatusFix {
                    ca_id,
                    item_id: item.id,
                    movement_id: movement.id,
                };
                warn!(
                    ca_id,
                    item_id = item.id,
                    movement_id = movement.id,
                    error = %err,
                    "movement registered but the status update failed"
                );
                if !self.pending_fixes.contains(&fix) {
                    self.pending_fixes.push(fix);
                }
                self.notifier.warning(format!(
                    "Movement for \"{}\" registered, but the item status was not updated; a retry is pending",
                    item.material_description
                ));
                Ok(ReturnOutcome::StatusPending { movement, fix })
            }
        }
    }

    /// Returns whose status step is still owed.
    pub fn pending_fixes(&self) -> &[PendingStatusFix] {
        &self.pending_fixes
    }

    /// Re-runs the status step of a return whose movement already exists.
    #[instrument(skip(self))]
    pub async fn retry_status_fix(&mut self, fix: PendingStatusFix) -> Result<(), WorkflowError> {
        match self
            .client
            .update_item_stock_status(fix.item_id, StockStatus::ReturnedToStock)
            .await
        {
            Ok(_) => {
                self.pending_fixes.retain(|pending| *pending != fix);
                self.cache.invalidate_for(MutationKind::ItemStockStatusUpdated);
                self.notifier.success("Item marked as returned to stock");
                Ok(())
            }
            Err(err) => Err(self.report(err)),
        }
    }

    /// Retries every outstanding status fix concurrently. Fixes that land
    /// are dropped from the list; failures stay for the next sweep. Returns
    /// the number of fixes that landed.
    #[instrument(skip(self))]
    pub async fn reconcile(&mut self) -> usize {
        if self.pending_fixes.is_empty() {
            return 0;
        }
        let fixes = self.pending_fixes.clone();
        let results = join_all(fixes.iter().map(|fix| {
            self.client
                .update_item_stock_status(fix.item_id, StockStatus::ReturnedToStock)
        }))
        .await;

        let mut landed = 0;
        for (fix, result) in fixes.iter().zip(results) {
            match result {
                Ok(_) => {
                    self.pending_fixes.retain(|pending| pending != fix);
                    landed += 1;
                }
                Err(err) => {
                    warn!(item_id = fix.item_id, error = %err, "status fix retry failed");
                }
            }
        }
        if landed > 0 {
            self.cache.invalidate_for(MutationKind::ItemStockStatusUpdated);
            self.notifier
                .success(format!("Applied {} pending return status update(s)", landed));
        }
        landed
    }

    /// Validation failures surface inline; anything else becomes an error
    /// notice.
    fn report(&self, err: ClientError) -> WorkflowError {
        if !err.is_validation() {
            self.notifier.error(err.to_string());
        }
        err.into()
    }
}
