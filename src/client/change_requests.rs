use serde::Serialize;
use tracing::instrument;
use validator::Validate;

use super::ApiClient;
use crate::error::ClientError;
use crate::models::{
    ChangeRequest, MaterialInfo, NewChangeRequest, NewStockMovement, StockMovement, StockStatus,
};
use crate::ListPage;

/// Wire shape of the stock-status update endpoint.
#[derive(Debug, Serialize)]
struct StockStatusUpdate {
    stock_status: StockStatus,
}

impl ApiClient {
    #[instrument(skip(self))]
    pub async fn list_change_requests(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<ListPage<ChangeRequest>, ClientError> {
        self.get_json(
            "ca/",
            &[
                ("page", page.to_string()),
                ("page_size", page_size.to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_change_request(&self, id: i64) -> Result<ChangeRequest, ClientError> {
        self.get_json(&format!("ca/{}", id), &[]).await
    }

    #[instrument(skip(self, payload))]
    pub async fn create_change_request(
        &self,
        payload: &NewChangeRequest,
    ) -> Result<ChangeRequest, ClientError> {
        payload.validate().map_err(ClientError::validation)?;
        self.post_json("ca/", payload).await
    }

    /// Sets the stock status of one change-request item. The backend answers
    /// with the material summary of the updated item.
    #[instrument(skip(self))]
    pub async fn update_item_stock_status(
        &self,
        item_id: i64,
        stock_status: StockStatus,
    ) -> Result<MaterialInfo, ClientError> {
        self.put_json(
            &format!("ca/items/{}/stock-status", item_id),
            &StockStatusUpdate { stock_status },
        )
        .await
    }

    #[instrument(skip(self, payload))]
    pub async fn create_stock_movement(
        &self,
        payload: &NewStockMovement,
    ) -> Result<StockMovement, ClientError> {
        payload.validate().map_err(ClientError::validation)?;
        self.post_json("ca/movements", payload).await
    }
}
