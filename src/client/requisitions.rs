use tracing::instrument;
use validator::Validate;

use super::ApiClient;
use crate::error::ClientError;
use crate::models::{NewRequisition, Requisition};

impl ApiClient {
    /// All requisitions still waiting for material. The backend returns the
    /// full set unpaginated.
    #[instrument(skip(self))]
    pub async fn list_pending_requisitions(&self) -> Result<Vec<Requisition>, ClientError> {
        self.get_json("requisitions/pending", &[]).await
    }

    #[instrument(skip(self, payload))]
    pub async fn create_requisition(
        &self,
        payload: &NewRequisition,
    ) -> Result<Requisition, ClientError> {
        payload.validate().map_err(ClientError::validation)?;
        self.post_json("requisitions/", payload).await
    }

    /// Marks a requisition as delivered. Fulfilling one that is already
    /// fulfilled is rejected by the backend with a 400.
    #[instrument(skip(self))]
    pub async fn fulfill_requisition(&self, id: i64) -> Result<Requisition, ClientError> {
        self.put_empty(&format!("requisitions/{}/fulfill", id)).await
    }
}
