use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An urgent ad-hoc material request raised ahead of normal receiving.
///
/// The backend mixes camelCase and snake_case on this resource, so every field
/// carries its wire name explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requisition {
    pub id: i64,
    pub obra: i64,
    #[serde(rename = "sub_item", default, skip_serializing_if = "Option::is_none")]
    pub sub_item: Option<i64>,
    #[serde(rename = "requestedBy")]
    pub requested_by: String,
    #[serde(rename = "orderNumber")]
    pub order_number: String,
    #[serde(rename = "materialDescription")]
    pub material_description: String,
    #[serde(rename = "requestDate")]
    pub request_date: DateTime<Utc>,
    #[serde(rename = "isFulfilled")]
    pub is_fulfilled: bool,
    #[serde(rename = "receiving_id", default, skip_serializing_if = "Option::is_none")]
    pub receiving_id: Option<i64>,
}

impl Requisition {
    /// Order number with surrounding whitespace removed, for urgency matching.
    pub fn trimmed_order_number(&self) -> &str {
        self.order_number.trim()
    }
}

/// Payload for raising a requisition.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewRequisition {
    #[validate(range(min = 1, message = "Obra must be a positive number"))]
    pub obra: i64,
    #[serde(rename = "sub_item", skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "Sub-item cannot be negative"))]
    pub sub_item: Option<i64>,
    #[serde(rename = "requestedBy")]
    #[validate(length(min = 1, message = "Requested-by is required"))]
    pub requested_by: String,
    #[serde(rename = "orderNumber")]
    #[validate(length(min = 1, message = "Order number is required"))]
    pub order_number: String,
    #[serde(rename = "materialDescription")]
    #[validate(length(min = 1, message = "Material description is required"))]
    pub material_description: String,
}
