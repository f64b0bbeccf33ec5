use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use validator::{Validate, ValidationError};

/// Document-level status of a change-request (C.A.).
///
/// The backend derives this from the stock statuses of the request's items, so
/// the client never writes it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ChangeRequestStatus {
    #[serde(rename = "Pendente de Análise de Estoque")]
    #[strum(serialize = "Pendente de Análise de Estoque")]
    PendingStockAnalysis,
    #[serde(rename = "Aguardando Compra")]
    #[strum(serialize = "Aguardando Compra")]
    AwaitingPurchase,
    #[serde(rename = "Pronto para Execução")]
    #[strum(serialize = "Pronto para Execução")]
    ReadyForExecution,
    #[serde(rename = "Concluído")]
    #[strum(serialize = "Concluído")]
    Completed,
    #[serde(rename = "Cancelado")]
    #[strum(serialize = "Cancelado")]
    Cancelled,
}

/// Stock status of a single change-request item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum StockStatus {
    #[default]
    #[serde(rename = "Pendente de Verificação")]
    #[strum(serialize = "Pendente de Verificação")]
    PendingVerification,
    #[serde(rename = "Verificado - Em Estoque")]
    #[strum(serialize = "Verificado - Em Estoque")]
    VerifiedInStock,
    #[serde(rename = "Verificado - Compra Necessária")]
    #[strum(serialize = "Verificado - Compra Necessária")]
    VerifiedNeedsPurchase,
    #[serde(rename = "Retirada Registrada")]
    #[strum(serialize = "Retirada Registrada")]
    WithdrawalRecorded,
    #[serde(rename = "Retirada Pendente")]
    #[strum(serialize = "Retirada Pendente")]
    WithdrawalPending,
    #[serde(rename = "Devolvido ao Estoque")]
    #[strum(serialize = "Devolvido ao Estoque")]
    ReturnedToStock,
}

/// Whether an item is being added to or removed from the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ItemAction {
    #[serde(rename = "ADICIONAR")]
    #[strum(serialize = "ADICIONAR")]
    Add,
    #[serde(rename = "RETIRAR")]
    #[strum(serialize = "RETIRAR")]
    Remove,
}

/// Material summary as the backend reports it on a change-request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialInfo {
    pub material_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub quantity: i32,
}

/// A change-request line item, addressable for stock-status updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeItem {
    pub id: i64,
    pub action_type: ItemAction,
    pub material_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub quantity: i32,
    #[serde(default)]
    pub stock_status: StockStatus,
}

impl ChangeItem {
    /// A removal item that has not been returned yet is eligible for the
    /// return-movement flow.
    pub fn eligible_for_return(&self) -> bool {
        self.action_type == ItemAction::Remove && self.stock_status != StockStatus::ReturnedToStock
    }
}

/// A change-request document as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: i64,
    pub status: ChangeRequestStatus,
    pub creation_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<DateTime<Utc>>,
    pub obra: i64,
    pub op: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_item: Option<i64>,
    pub requester_info: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_adicionado: Option<MaterialInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_removido: Option<MaterialInfo>,
    #[serde(default)]
    pub items: Vec<ChangeItem>,
    #[serde(default)]
    pub movimentos: Vec<StockMovement>,
}

/// Material line for a new change-request.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewMaterialInfo {
    #[validate(
        length(min = 3, message = "Material description must have at least 3 characters"),
        custom = "validate_real_description"
    )]
    pub material_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: i32,
}

impl NewMaterialInfo {
    pub fn new(description: impl Into<String>, quantity: i32) -> Self {
        Self {
            material_description: description.into(),
            material_code: None,
            brand: None,
            quantity,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.material_code = Some(code.into());
        self
    }
}

/// The API docs UI submits "string" as a literal default; the backend treats it
/// as no description at all.
fn validate_real_description(value: &str) -> Result<(), ValidationError> {
    if value.eq_ignore_ascii_case("string") {
        let mut err = ValidationError::new("placeholder_description");
        err.message = Some("Material description looks like a placeholder".into());
        return Err(err);
    }
    Ok(())
}

/// Payload for opening a change-request. At least one of the two material
/// lines must be present; providing both means "substitute", and a
/// substitution of a material for itself is rejected.
#[derive(Debug, Clone, Serialize, Validate)]
#[validate(schema(function = "validate_new_change_request", skip_on_field_errors = false))]
pub struct NewChangeRequest {
    #[validate(range(min = 1, message = "Obra must be a positive number"))]
    pub obra: i64,
    #[validate(range(min = 1, message = "OP must be a positive number"))]
    pub op: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "Sub-item cannot be negative"))]
    pub sub_item: Option<i64>,
    #[validate(length(min = 3, message = "Requester info must have at least 3 characters"))]
    pub requester_info: String,
    #[validate(length(min = 10, message = "Reason must have at least 10 characters"))]
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate]
    pub item_adicionado: Option<NewMaterialInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate]
    pub item_removido: Option<NewMaterialInfo>,
}

fn validate_new_change_request(payload: &NewChangeRequest) -> Result<(), ValidationError> {
    let added = payload.item_adicionado.as_ref();
    let removed = payload.item_removido.as_ref();

    if added.is_none() && removed.is_none() {
        let mut err = ValidationError::new("no_items");
        err.message = Some("At least one item (added or removed) must be provided".into());
        return Err(err);
    }

    if let (Some(added), Some(removed)) = (added, removed) {
        let same_code = match (added.material_code.as_deref(), removed.material_code.as_deref()) {
            (Some(a), Some(r)) => !a.is_empty() && a == r,
            _ => false,
        };
        if same_code {
            let mut err = ValidationError::new("same_material_code");
            err.message =
                Some("Invalid substitution: added and removed items share a material code".into());
            return Err(err);
        }
        if added.material_description == removed.material_description {
            let mut err = ValidationError::new("same_material_description");
            err.message =
                Some("Invalid substitution: added and removed items share a description".into());
            return Err(err);
        }
    }

    Ok(())
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum MovementType {
    #[serde(rename = "SAIDA_DA_OBRA")]
    #[strum(serialize = "SAIDA_DA_OBRA")]
    ExitFromSite,
    #[serde(rename = "ENTRADA_NO_ALMOXARIFADO")]
    #[strum(serialize = "ENTRADA_NO_ALMOXARIFADO")]
    WarehouseIntake,
    #[serde(rename = "DESCARTE")]
    #[strum(serialize = "DESCARTE")]
    Disposal,
}

/// An audit entry for material moved in or out of a change-request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: i64,
    pub execution_date: DateTime<Utc>,
    pub ca_id: i64,
    pub item_description: String,
    pub quantity_moved: i32,
    pub movement_type: MovementType,
    #[serde(default)]
    pub destination_stock: Option<String>,
    pub executed_by: String,
}

/// Payload for recording a stock movement against a change-request.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewStockMovement {
    pub ca_id: i64,
    #[validate(length(min = 1, message = "Item description is required"))]
    pub item_description: String,
    #[validate(range(min = 1, message = "Moved quantity must be greater than zero"))]
    pub quantity_moved: i32,
    pub movement_type: MovementType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_stock: Option<String>,
    #[validate(length(min = 2, message = "Executed-by must have at least 2 characters"))]
    pub executed_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn valid_request() -> NewChangeRequest {
        NewChangeRequest {
            obra: 510,
            op: 2101,
            sub_item: Some(0),
            requester_info: "Equipe de Montagem".into(),
            reason: "Projeto revisado exige troca do perfil de alumínio".into(),
            item_adicionado: Some(NewMaterialInfo::new("Perfil de alumínio 40x40", 12)),
            item_removido: Some(NewMaterialInfo::new("Perfil de alumínio 30x30", 12)),
        }
    }

    #[test_case(ChangeRequestStatus::PendingStockAnalysis, "Pendente de Análise de Estoque")]
    #[test_case(ChangeRequestStatus::AwaitingPurchase, "Aguardando Compra")]
    #[test_case(ChangeRequestStatus::ReadyForExecution, "Pronto para Execução")]
    #[test_case(ChangeRequestStatus::Completed, "Concluído")]
    #[test_case(ChangeRequestStatus::Cancelled, "Cancelado")]
    fn request_status_uses_wire_strings(status: ChangeRequestStatus, wire: &str) {
        assert_eq!(serde_json::to_value(status).unwrap(), wire);
    }

    #[test_case(StockStatus::PendingVerification, "Pendente de Verificação")]
    #[test_case(StockStatus::VerifiedInStock, "Verificado - Em Estoque")]
    #[test_case(StockStatus::VerifiedNeedsPurchase, "Verificado - Compra Necessária")]
    #[test_case(StockStatus::WithdrawalRecorded, "Retirada Registrada")]
    #[test_case(StockStatus::WithdrawalPending, "Retirada Pendente")]
    #[test_case(StockStatus::ReturnedToStock, "Devolvido ao Estoque")]
    fn stock_status_uses_wire_strings(status: StockStatus, wire: &str) {
        assert_eq!(serde_json::to_value(status).unwrap(), wire);
    }

    #[test]
    fn creation_requires_at_least_one_item() {
        let mut request = valid_request();
        request.item_adicionado = None;
        request.item_removido = None;
        assert!(request.validate().is_err());
    }

    #[test]
    fn placeholder_description_is_rejected_case_insensitively() {
        let mut request = valid_request();
        request.item_adicionado = Some(NewMaterialInfo::new("String", 5));
        assert!(request.validate().is_err());
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut request = valid_request();
        request.item_removido = Some(NewMaterialInfo::new("Cabo flexível 2,5mm", 0));
        assert!(request.validate().is_err());
    }

    #[test]
    fn substitution_with_same_material_code_is_rejected() {
        let mut request = valid_request();
        request.item_adicionado = Some(NewMaterialInfo::new("Parafuso M6 zincado", 40).with_code("PAR-M6"));
        request.item_removido = Some(NewMaterialInfo::new("Parafuso M6 inox", 40).with_code("PAR-M6"));
        assert!(request.validate().is_err());
    }

    #[test]
    fn substitution_with_same_description_is_rejected() {
        let mut request = valid_request();
        request.item_adicionado = Some(NewMaterialInfo::new("Chapa galvanizada 2mm", 3));
        request.item_removido = Some(NewMaterialInfo::new("Chapa galvanizada 2mm", 5));
        assert!(request.validate().is_err());
    }

    #[test]
    fn substitution_of_distinct_materials_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn short_reason_is_rejected() {
        let mut request = valid_request();
        request.reason = "curta".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn removal_item_not_yet_returned_is_eligible_for_return() {
        let item = ChangeItem {
            id: 9,
            action_type: ItemAction::Remove,
            material_description: "Perfil de alumínio 30x30".into(),
            material_code: None,
            brand: None,
            quantity: 12,
            stock_status: StockStatus::WithdrawalRecorded,
        };
        assert!(item.eligible_for_return());

        let returned = ChangeItem {
            stock_status: StockStatus::ReturnedToStock,
            ..item.clone()
        };
        assert!(!returned.eligible_for_return());

        let added = ChangeItem {
            action_type: ItemAction::Add,
            ..item
        };
        assert!(!added.eligible_for_return());
    }

    #[test]
    fn change_request_deserializes_with_defaulted_lists() {
        let json = serde_json::json!({
            "id": 31,
            "status": "Pendente de Análise de Estoque",
            "creation_date": "2025-05-02T09:00:00Z",
            "obra": 510,
            "op": 2101,
            "sub_item": null,
            "requester_info": "Equipe de Montagem",
            "reason": "Projeto revisado exige troca do perfil de alumínio",
            "item_adicionado": {
                "material_description": "Perfil de alumínio 40x40",
                "material_code": "PERF-4040",
                "quantity": 12
            }
        });
        let ca: ChangeRequest = serde_json::from_value(json).unwrap();
        assert_eq!(ca.status, ChangeRequestStatus::PendingStockAnalysis);
        assert!(ca.items.is_empty());
        assert!(ca.movimentos.is_empty());
        assert_eq!(
            ca.item_adicionado.unwrap().material_code.as_deref(),
            Some("PERF-4040")
        );
    }

    #[test]
    fn movement_payload_enforces_executor_and_quantity() {
        let movement = NewStockMovement {
            ca_id: 31,
            item_description: "Perfil de alumínio 30x30".into(),
            quantity_moved: 0,
            movement_type: MovementType::ExitFromSite,
            destination_stock: Some("Almoxarifado Central".into()),
            executed_by: "J".into(),
        };
        let errors = movement.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("quantity_moved"));
        assert!(errors.field_errors().contains_key("executed_by"));
    }

    #[test]
    fn movement_type_round_trips() {
        let json = serde_json::to_string(&MovementType::ExitFromSite).unwrap();
        assert_eq!(json, "\"SAIDA_DA_OBRA\"");
        let back: MovementType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MovementType::ExitFromSite);
    }
}
