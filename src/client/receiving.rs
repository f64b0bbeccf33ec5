use tracing::instrument;
use validator::Validate;

use super::ApiClient;
use crate::error::ClientError;
use crate::models::{
    ConferencePayload, NewReceivingRecord, ReceivingFilters, ReceivingRecord, RejectionPayload,
    ResolutionPayload,
};
use crate::ListPage;

impl ApiClient {
    /// Fetches one page of the receiving log. Absent filters are omitted from
    /// the query string entirely.
    #[instrument(skip(self))]
    pub async fn list_receiving(
        &self,
        filters: &ReceivingFilters,
    ) -> Result<ListPage<ReceivingRecord>, ClientError> {
        self.get_json("recebimentos/", &filters.to_query(self.page_size))
            .await
    }

    #[instrument(skip(self, payload))]
    pub async fn create_receiving(
        &self,
        payload: &NewReceivingRecord,
    ) -> Result<ReceivingRecord, ClientError> {
        payload.validate().map_err(ClientError::validation)?;
        self.post_json("recebimentos/", payload).await
    }

    /// Records the conference verdict for a receipt awaiting it.
    #[instrument(skip(self, payload))]
    pub async fn submit_conference(
        &self,
        id: i64,
        payload: &ConferencePayload,
    ) -> Result<ReceivingRecord, ClientError> {
        payload.validate().map_err(ClientError::validation)?;
        self.put_json(&format!("recebimentos/{}", id), payload).await
    }

    /// Closes a pendency left open by a conference.
    #[instrument(skip(self, payload))]
    pub async fn resolve_receiving(
        &self,
        id: i64,
        payload: &ResolutionPayload,
    ) -> Result<ReceivingRecord, ClientError> {
        payload.validate().map_err(ClientError::validation)?;
        self.post_json(&format!("recebimentos/{}/resolve", id), payload)
            .await
    }

    /// Rejects a receipt at the gate, before any conference.
    #[instrument(skip(self, payload))]
    pub async fn reject_receiving(
        &self,
        id: i64,
        payload: &RejectionPayload,
    ) -> Result<ReceivingRecord, ClientError> {
        payload.validate().map_err(ClientError::validation)?;
        self.put_json(&format!("recebimentos/{}/reject", id), payload)
            .await
    }
}
