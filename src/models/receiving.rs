use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::Display;
use validator::{Validate, ValidationError};

/// Lifecycle status of a receiving record.
///
/// `AwaitingConference` is the entry state. Conference moves a record to
/// `Conferred`, or to `Pending` when an unresolved issue was recorded, or to
/// `Rejected` when the material was refused at the dock. `EntryRejected` is the
/// terminal state of the gate-rejection flow, before any conference happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ReceivingStatus {
    #[serde(rename = "Aguardando Conferência")]
    #[strum(serialize = "Aguardando Conferência")]
    AwaitingConference,
    #[serde(rename = "Conferido")]
    #[strum(serialize = "Conferido")]
    Conferred,
    #[serde(rename = "Pendente")]
    #[strum(serialize = "Pendente")]
    Pending,
    #[serde(rename = "Rejeitado")]
    #[strum(serialize = "Rejeitado")]
    Rejected,
    #[serde(rename = "Entrada Rejeitada")]
    #[strum(serialize = "Entrada Rejeitada")]
    EntryRejected,
}

/// Issue classification recorded at conference time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum IssueType {
    #[default]
    #[serde(rename = "sem pendência")]
    #[strum(serialize = "sem pendência")]
    NoIssue,
    #[serde(rename = "avaria")]
    #[strum(serialize = "avaria")]
    Damaged,
    #[serde(rename = "item errado")]
    #[strum(serialize = "item errado")]
    WrongItem,
    #[serde(rename = "quantidade incorreta")]
    #[strum(serialize = "quantidade incorreta")]
    WrongQuantity,
    #[serde(rename = "outro")]
    #[strum(serialize = "outro")]
    Other,
}

impl IssueType {
    /// Any classification other than "sem pendência" must carry a description.
    pub fn requires_description(self) -> bool {
        self != IssueType::NoIssue
    }
}

/// Conference verdict stored under a record's `details`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceDetails {
    pub conferred_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<DateTime<Utc>>,
    pub punctual: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_note: Option<String>,
    #[serde(default)]
    pub issue_type: IssueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_description: Option<String>,
    #[serde(default)]
    pub is_client_material: bool,
    #[serde(default)]
    pub refused_material: bool,
    /// Set by the backend once a pendency is closed via resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_resolved: Option<bool>,
}

/// A material receipt as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivingRecord {
    pub id: i64,
    pub nf_number: String,
    pub supplier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nf_value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nf_volume: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_by: Option<String>,
    pub entry_date: DateTime<Utc>,
    pub status: ReceivingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ConferenceDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_date: Option<DateTime<Utc>>,
}

impl ReceivingRecord {
    /// Order number with surrounding whitespace removed, for urgency matching.
    pub fn trimmed_order_number(&self) -> Option<&str> {
        self.order_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Payload for registering a new receipt.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewReceivingRecord {
    #[validate(length(min = 1, message = "Invoice number is required"))]
    pub nf_number: String,
    #[validate(length(min = 1, message = "Supplier is required"))]
    pub supplier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nf_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nf_volume: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_by: Option<String>,
}

/// Conference form payload. `punctual` is derived, never user-entered.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_conference", skip_on_field_errors = false))]
pub struct ConferencePayload {
    #[validate(length(min = 1, message = "Conferred-by is required"))]
    pub conferred_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<DateTime<Utc>>,
    pub punctual: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_note: Option<String>,
    pub issue_type: IssueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_description: Option<String>,
    pub is_client_material: bool,
    pub refused_material: bool,
}

impl ConferencePayload {
    /// Builds a payload with `punctual` computed from the two dates.
    pub fn new(
        conferred_by: impl Into<String>,
        expected_date: Option<DateTime<Utc>>,
        delivery_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            conferred_by: conferred_by.into(),
            expected_date,
            delivery_date,
            punctual: punctuality(expected_date, delivery_date),
            supplier_note: None,
            issue_type: IssueType::NoIssue,
            issue_description: None,
            is_client_material: false,
            refused_material: false,
        }
    }

    pub fn with_issue(mut self, issue_type: IssueType, description: impl Into<String>) -> Self {
        self.issue_type = issue_type;
        self.issue_description = Some(description.into());
        self
    }
}

/// A delivery is punctual when it arrived on or before the expected date.
/// With either date missing there is nothing to compare, so no lateness is
/// recorded.
pub fn punctuality(expected: Option<DateTime<Utc>>, delivery: Option<DateTime<Utc>>) -> bool {
    match (expected, delivery) {
        (Some(expected), Some(delivery)) => delivery <= expected,
        _ => true,
    }
}

fn validate_conference(payload: &ConferencePayload) -> Result<(), ValidationError> {
    if payload.issue_type.requires_description() {
        let described = payload
            .issue_description
            .as_deref()
            .map(str::trim)
            .is_some_and(|d| !d.is_empty());
        if !described {
            let mut err = ValidationError::new("issue_description_required");
            err.message = Some("An issue description is required when an issue is reported".into());
            return Err(err);
        }
    }
    Ok(())
}

/// Final status chosen when closing a pendency. Only these two outcomes exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ResolutionOutcome {
    #[serde(rename = "Conferido")]
    #[strum(serialize = "Conferido")]
    Conferred,
    #[serde(rename = "Rejeitado")]
    #[strum(serialize = "Rejeitado")]
    Rejected,
}

/// Payload for closing a pendency.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionPayload {
    #[validate(length(min = 1, message = "Resolved-by is required"))]
    pub resolved_by: String,
    #[validate(length(min = 1, message = "Resolution notes are required"))]
    pub resolution_notes: String,
    pub final_status: ResolutionOutcome,
}

/// Payload for rejecting an entry before conference.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RejectionPayload {
    #[validate(length(min = 1, message = "Rejected-by is required"))]
    pub rejected_by: String,
    #[validate(custom = "validate_trimmed_nonempty")]
    pub rejection_reason: String,
}

fn validate_trimmed_nonempty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("A justification is required".into());
        return Err(err);
    }
    Ok(())
}

/// Filters for the receiving list. Only present, non-empty values make it into
/// the query string; an unset filter never appears as an empty parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivingFilters {
    pub search: Option<String>,
    pub status: Option<ReceivingStatus>,
    pub is_client_material: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: u32,
}

impl Default for ReceivingFilters {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            is_client_material: None,
            start_date: None,
            end_date: None,
            page: 1,
        }
    }
}

impl ReceivingFilters {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    /// Serializes the filters for the list endpoint, omitting absent fields.
    pub fn to_query(&self, page_size: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("page_size", page_size.to_string()),
        ];
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        if let Some(status) = self.status {
            params.push(("status", status.to_string()));
        }
        if let Some(flag) = self.is_client_material {
            params.push(("is_client_material", flag.to_string()));
        }
        if let Some(date) = self.start_date {
            params.push(("start_date", date.to_string()));
        }
        if let Some(date) = self.end_date {
            params.push(("end_date", date.to_string()));
        }
        params
    }
}
