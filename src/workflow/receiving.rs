use std::sync::Arc;

use strum::IntoStaticStr;
use tracing::{debug, instrument};

use super::WorkflowError;
use crate::cache::invalidation::{RECEIVING, REQUISITIONS_PENDING};
use crate::cache::{MutationKind, QueryCache, QueryKey};
use crate::client::ApiClient;
use crate::error::ClientError;
use crate::models::{
    ConferencePayload, NewReceivingRecord, ReceivingFilters, ReceivingRecord, RejectionPayload,
    Requisition, ResolutionPayload,
};
use crate::notify::Notifier;
use crate::urgency::{self, UrgentMatches};
use crate::ListPage;

/// The one surface of the receiving page that is active at a time.
///
/// Every modal on the page is a variant here, so opening one closes every
/// other by construction; there is no way to represent two open forms.
#[derive(Debug, Clone, Default, IntoStaticStr)]
pub enum ReceivingState {
    #[default]
    Idle,
    /// Registration form for a new receipt.
    Registering,
    /// Pre-conference confirmation gate for one record.
    Confirming(ReceivingRecord),
    /// The conference form proper.
    ConferenceActive(ReceivingRecord),
    /// Gate rejection form, reached by refusing the confirmation.
    Rejecting(ReceivingRecord),
    /// Pendency resolution form.
    Resolving(ReceivingRecord),
    /// Read-only record details.
    ViewingDetails(ReceivingRecord),
}

impl ReceivingState {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ReceivingState::Idle)
    }

    /// The record the active surface operates on, when there is one.
    pub fn record(&self) -> Option<&ReceivingRecord> {
        match self {
            ReceivingState::Idle | ReceivingState::Registering => None,
            ReceivingState::Confirming(record)
            | ReceivingState::ConferenceActive(record)
            | ReceivingState::Rejecting(record)
            | ReceivingState::Resolving(record)
            | ReceivingState::ViewingDetails(record) => Some(record),
        }
    }
}

fn invalid(action: &'static str, state: &ReceivingState) -> WorkflowError {
    WorkflowError::InvalidTransition {
        action,
        state: state.name(),
    }
}

/// Drives the receiving log page: the list filters, the active modal, and
/// the mutation each modal submits.
///
/// Mutations follow one discipline: call the API, and only on success
/// invalidate the affected cache resources, close the form, and emit a
/// notice. On failure the form stays open with its input intact and the
/// error is reported, except validation errors, which the form renders
/// inline without a notice.
pub struct ReceivingWorkflow {
    client: ApiClient,
    cache: Arc<QueryCache>,
    notifier: Notifier,
    state: ReceivingState,
    filters: ReceivingFilters,
}

impl ReceivingWorkflow {
    pub fn new(client: ApiClient, cache: Arc<QueryCache>, notifier: Notifier) -> Self {
        Self {
            client,
            cache,
            notifier,
            state: ReceivingState::Idle,
            filters: ReceivingFilters::default(),
        }
    }

    pub fn state(&self) -> &ReceivingState {
        &self.state
    }

    pub fn filters(&self) -> &ReceivingFilters {
        &self.filters
    }

    /// Replaces the list filters; the next [`load_page`](Self::load_page)
    /// reflects them.
    pub fn set_filters(&mut self, filters: ReceivingFilters) {
        self.filters = filters;
    }

    pub fn set_page(&mut self, page: u32) {
        self.filters.page = page;
    }

    /// Loads the receiving page for the current filters through the cache.
    #[instrument(skip(self))]
    pub async fn load_page(&self) -> Result<ListPage<ReceivingRecord>, ClientError> {
        let params = self.filters.to_query(self.client.page_size());
        self.cache
            .get_or_fetch(QueryKey::list(RECEIVING, &params), || {
                self.client.list_receiving(&self.filters)
            })
            .await
    }

    /// Most recent page cached for this resource, whatever its filters.
    /// Lets the page render something while a fresh fetch runs.
    pub fn placeholder_page(&self) -> Option<ListPage<ReceivingRecord>> {
        self.cache.placeholder(RECEIVING)
    }

    /// Pending requisitions, cached under their own resource.
    pub async fn pending_requisitions(&self) -> Result<Vec<Requisition>, ClientError> {
        self.cache
            .get_or_fetch(QueryKey::bare(REQUISITIONS_PENDING), || {
                self.client.list_pending_requisitions()
            })
            .await
    }

    /// Urgency flags for the given visible records, derived from the pending
    /// requisitions.
    #[instrument(skip(self, records))]
    pub async fn urgent_matches(
        &self,
        records: &[ReceivingRecord],
    ) -> Result<UrgentMatches, ClientError> {
        let pending = self.pending_requisitions().await?;
        Ok(urgency::derive_urgent(records, &pending))
    }

    /// Opens the registration form. Only legal from the idle board.
    pub fn open_register(&mut self) -> Result<(), WorkflowError> {
        match self.state {
            ReceivingState::Idle => {
                self.state = ReceivingState::Registering;
                Ok(())
            }
            ref state => Err(invalid("open_register", state)),
        }
    }

    /// Opens the read-only details view for a record.
    pub fn open_details(&mut self, record: ReceivingRecord) -> Result<(), WorkflowError> {
        match self.state {
            ReceivingState::Idle => {
                self.state = ReceivingState::ViewingDetails(record);
                Ok(())
            }
            ref state => Err(invalid("open_details", state)),
        }
    }

    /// Opens the resolution form for a record left pending by its conference.
    pub fn start_resolution(&mut self, record: ReceivingRecord) -> Result<(), WorkflowError> {
        match self.state {
            ReceivingState::Idle => {
                self.state = ReceivingState::Resolving(record);
                Ok(())
            }
            ref state => Err(invalid("start_resolution", state)),
        }
    }

    /// Opens the confirmation gate for a record, replacing whatever surface
    /// was active. Read-only, nothing is sent.
    pub fn start_conference(&mut self, record: ReceivingRecord) {
        self.state = ReceivingState::Confirming(record);
    }

    /// Advances the confirmation gate into the conference form.
    pub fn confirm_conference(&mut self) -> Result<(), WorkflowError> {
        match std::mem::take(&mut self.state) {
            ReceivingState::Confirming(record) => {
                self.state = ReceivingState::ConferenceActive(record);
                Ok(())
            }
            other => {
                let err = invalid("confirm_conference", &other);
                self.state = other;
                Err(err)
            }
        }
    }

    /// Refuses the receipt at the gate, switching into the rejection form.
    pub fn refuse_at_gate(&mut self) -> Result<(), WorkflowError> {
        match std::mem::take(&mut self.state) {
            ReceivingState::Confirming(record) => {
                self.state = ReceivingState::Rejecting(record);
                Ok(())
            }
            other => {
                let err = invalid("refuse_at_gate", &other);
                self.state = other;
                Err(err)
            }
        }
    }

    /// Dismisses whatever surface is open. Local only, nothing is sent.
    pub fn close(&mut self) {
        self.state = ReceivingState::Idle;
    }

    /// Submits the registration form. On success the list is refreshed and
    /// the new record is checked against pending requisitions: a match turns
    /// the success notice into a warning so the operator flags the receipt
    /// right away.
    #[instrument(skip(self, payload))]
    pub async fn submit_registration(
        &mut self,
        payload: &NewReceivingRecord,
    ) -> Result<ReceivingRecord, WorkflowError> {
        if !matches!(self.state, ReceivingState::Registering) {
            return Err(invalid("submit_registration", &self.state));
        }
        let record = match self.client.create_receiving(payload).await {
            Ok(record) => record,
            Err(err) => return Err(self.report(err)),
        };
        self.cache.invalidate_for(MutationKind::ReceivingCreated);
        self.state = ReceivingState::Idle;
        self.notify_registration(&record).await;
        Ok(record)
    }

    /// Submits the conference verdict for the active record.
    #[instrument(skip(self, payload))]
    pub async fn submit_conference(
        &mut self,
        payload: &ConferencePayload,
    ) -> Result<ReceivingRecord, WorkflowError> {
        let id = match &self.state {
            ReceivingState::ConferenceActive(record) => record.id,
            state => return Err(invalid("submit_conference", state)),
        };
        let updated = match self.client.submit_conference(id, payload).await {
            Ok(updated) => updated,
            Err(err) => return Err(self.report(err)),
        };
        self.cache.invalidate_for(MutationKind::ConferenceSubmitted);
        self.state = ReceivingState::Idle;
        self.notifier
            .success(format!("Conference for NF {} recorded", updated.nf_number));
        Ok(updated)
    }

    /// Submits the gate rejection for the active record.
    #[instrument(skip(self, payload))]
    pub async fn submit_rejection(
        &mut self,
        payload: &RejectionPayload,
    ) -> Result<ReceivingRecord, WorkflowError> {
        let id = match &self.state {
            ReceivingState::Rejecting(record) => record.id,
            state => return Err(invalid("submit_rejection", state)),
        };
        let updated = match self.client.reject_receiving(id, payload).await {
            Ok(updated) => updated,
            Err(err) => return Err(self.report(err)),
        };
        self.cache.invalidate_for(MutationKind::ReceivingRejected);
        self.state = ReceivingState::Idle;
        self.notifier
            .success(format!("Entry NF {} rejected", updated.nf_number));
        Ok(updated)
    }

    /// Submits the resolution for the active pending record.
    #[instrument(skip(self, payload))]
    pub async fn submit_resolution(
        &mut self,
        payload: &ResolutionPayload,
    ) -> Result<ReceivingRecord, WorkflowError> {
        let id = match &self.state {
            ReceivingState::Resolving(record) => record.id,
            state => return Err(invalid("submit_resolution", state)),
        };
        let updated = match self.client.resolve_receiving(id, payload).await {
            Ok(updated) => updated,
            Err(err) => return Err(self.report(err)),
        };
        self.cache.invalidate_for(MutationKind::ReceivingResolved);
        self.state = ReceivingState::Idle;
        self.notifier
            .success(format!("Pendency for NF {} closed", updated.nf_number));
        Ok(updated)
    }

    /// Validation failures surface inline on the open form; anything else
    /// becomes an error notice. State is left untouched either way so the
    /// form stays open with its input intact.
    fn report(&self, err: ClientError) -> WorkflowError {
        if !err.is_validation() {
            self.notifier.error(err.to_string());
        }
        err.into()
    }

    async fn notify_registration(&self, record: &ReceivingRecord) {
        let urgent = match self.pending_requisitions().await {
            Ok(pending) => urgency::matches_pending(record.order_number.as_deref(), &pending),
            Err(err) => {
                debug!(error = %err, "skipping urgency check, pending requisitions unavailable");
                false
            }
        };
        if urgent {
            self.notifier.warning(format!(
                "Receipt NF {} matches a pending requisition",
                record.nf_number
            ));
        } else {
            self.notifier
                .success(format!("Receipt NF {} registered", record.nf_number));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::models::ReceivingStatus;
    use crate::session::Session;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn workflow() -> (ReceivingWorkflow, tokio::sync::mpsc::Receiver<crate::notify::Notice>) {
        let config = ClientConfig::for_base_url("http://127.0.0.1:9/api");
        let client = ApiClient::new(&config, Session::in_memory()).unwrap();
        let cache = Arc::new(QueryCache::new(None, false));
        let (notifier, rx) = Notifier::channel(4);
        (ReceivingWorkflow::new(client, cache, notifier), rx)
    }

    fn record(id: i64) -> ReceivingRecord {
        ReceivingRecord {
            id,
            nf_number: format!("NF-{}", id),
            supplier: "Fornecedor Alfa".into(),
            order_number: None,
            nf_value: None,
            nf_volume: None,
            received_by: Some("Portaria".into()),
            entry_date: Utc.with_ymd_and_hms(2024, 5, 10, 13, 0, 0).unwrap(),
            status: ReceivingStatus::AwaitingConference,
            details: None,
            resolved_by: None,
            resolution_notes: None,
            resolved_date: None,
        }
    }

    #[test]
    fn register_only_opens_from_idle() {
        let (mut wf, _rx) = workflow();
        assert!(wf.state().is_idle());
        wf.open_register().unwrap();
        assert_matches!(wf.state(), ReceivingState::Registering);

        let err = wf.open_register().unwrap_err();
        assert_matches!(
            err,
            WorkflowError::InvalidTransition {
                action: "open_register",
                state: "Registering",
            }
        );
    }

    #[test]
    fn only_one_surface_is_active_at_a_time() {
        let (mut wf, _rx) = workflow();
        wf.open_details(record(1)).unwrap();
        assert_matches!(wf.state(), ReceivingState::ViewingDetails(r) if r.id == 1);

        // Opening the confirmation gate replaces the details view.
        wf.start_conference(record(2));
        assert_matches!(wf.state(), ReceivingState::Confirming(r) if r.id == 2);
        assert_eq!(wf.state().record().map(|r| r.id), Some(2));

        wf.close();
        assert!(wf.state().is_idle());
    }

    #[test]
    fn gate_decides_between_conference_and_rejection() {
        let (mut wf, _rx) = workflow();
        wf.start_conference(record(7));
        wf.confirm_conference().unwrap();
        assert_matches!(wf.state(), ReceivingState::ConferenceActive(r) if r.id == 7);

        let (mut wf, _rx) = workflow();
        wf.start_conference(record(7));
        wf.refuse_at_gate().unwrap();
        assert_matches!(wf.state(), ReceivingState::Rejecting(r) if r.id == 7);
    }

    #[test]
    fn gate_transitions_require_the_gate() {
        let (mut wf, _rx) = workflow();
        let err = wf.confirm_conference().unwrap_err();
        assert_matches!(
            err,
            WorkflowError::InvalidTransition { action: "confirm_conference", state: "Idle" }
        );
        // Failed transition leaves the state alone.
        assert!(wf.state().is_idle());

        wf.open_register().unwrap();
        let err = wf.refuse_at_gate().unwrap_err();
        assert_matches!(
            err,
            WorkflowError::InvalidTransition { action: "refuse_at_gate", state: "Registering" }
        );
        assert_matches!(wf.state(), ReceivingState::Registering);
    }

    #[test]
    fn resolution_and_details_require_idle() {
        let (mut wf, _rx) = workflow();
        wf.open_register().unwrap();
        assert!(wf.start_resolution(record(3)).is_err());
        assert!(wf.open_details(record(3)).is_err());

        wf.close();
        wf.start_resolution(record(3)).unwrap();
        assert_matches!(wf.state(), ReceivingState::Resolving(r) if r.id == 3);
    }

    #[tokio::test]
    async fn submissions_are_guarded_by_state() {
        let (mut wf, _rx) = workflow();

        let payload = ConferencePayload::new("Almoxarife", None, None);
        let err = wf.submit_conference(&payload).await.unwrap_err();
        assert_matches!(
            err,
            WorkflowError::InvalidTransition { action: "submit_conference", state: "Idle" }
        );

        let payload = RejectionPayload {
            rejected_by: "Portaria".into(),
            rejection_reason: "Carga avariada".into(),
        };
        let err = wf.submit_rejection(&payload).await.unwrap_err();
        assert_matches!(err, WorkflowError::InvalidTransition { .. });
    }
}
