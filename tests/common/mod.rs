//! Shared harness for the integration tests: a mock backend plus a dashboard
//! pointed at it, and JSON fixtures shaped like the backend's payloads.
#![allow(dead_code)]

use std::time::Duration;

use fake::faker::company::en::CompanyName;
use fake::Fake;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use opsboard_client::config::ClientConfig;
use opsboard_client::notify::{Notice, NoticeLevel};
use opsboard_client::session::Session;
use opsboard_client::Dashboard;

/// A dashboard wired against a wiremock backend, with the notice receiver
/// kept so tests can assert on what the workflows reported.
pub struct TestDashboard {
    pub server: MockServer,
    pub dashboard: Dashboard,
    pub notices: mpsc::Receiver<Notice>,
}

impl TestDashboard {
    /// Starts a mock backend and a dashboard pointed at its `/api` prefix.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let config = ClientConfig::for_base_url(format!("{}/api", server.uri()));
        let (dashboard, notices) =
            Dashboard::new(&config, Session::in_memory()).expect("dashboard construction");
        Self {
            server,
            dashboard,
            notices,
        }
    }

    /// Next notice, failing the test when none shows up.
    pub async fn next_notice(&mut self) -> Notice {
        tokio::time::timeout(Duration::from_secs(2), self.notices.recv())
            .await
            .expect("timed out waiting for a notice")
            .expect("notice channel closed")
    }

    /// Next notice, asserted to carry the given level.
    pub async fn expect_notice(&mut self, level: NoticeLevel) -> Notice {
        let notice = self.next_notice().await;
        assert_eq!(notice.level, level, "unexpected notice: {}", notice.message);
        notice
    }

    pub fn assert_no_notice(&mut self) {
        if let Ok(notice) = self.notices.try_recv() {
            panic!("unexpected notice: {}", notice.message);
        }
    }

    /// Requests the mock server has seen so far.
    pub async fn recorded_requests(&self) -> Vec<wiremock::Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

/// Mounts the pending-requisitions endpoint with a fixed body. Most receiving
/// tests need it because registration runs an urgency check on success.
pub async fn mock_pending_requisitions(server: &MockServer, requisitions: Value) {
    Mock::given(method("GET"))
        .and(path("/api/requisitions/pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(requisitions))
        .mount(server)
        .await;
}

pub fn parse<T: DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("fixture matches the wire shape")
}

pub fn supplier_name() -> String {
    CompanyName().fake()
}

/// A receiving record as the backend serializes it.
pub fn receiving_json(id: i64, nf_number: &str, order_number: Option<&str>, status: &str) -> Value {
    let mut record = json!({
        "id": id,
        "nfNumber": nf_number,
        "supplier": supplier_name(),
        "receivedBy": "Portaria",
        "entryDate": "2024-06-10T12:00:00Z",
        "status": status,
    });
    if let Some(number) = order_number {
        record["orderNumber"] = json!(number);
    }
    record
}

pub fn receiving_page(records: Vec<Value>) -> Value {
    let total = records.len();
    json!({ "items": records, "total": total })
}

pub fn requisition_json(id: i64, order_number: &str, fulfilled: bool) -> Value {
    json!({
        "id": id,
        "obra": 510,
        "sub_item": 1,
        "requestedBy": "Planejamento",
        "orderNumber": order_number,
        "materialDescription": "Cabo PP 3x2,5mm",
        "requestDate": "2024-06-03T11:30:00Z",
        "isFulfilled": fulfilled,
    })
}

pub fn change_item_json(id: i64, action: &str, description: &str, stock_status: &str) -> Value {
    json!({
        "id": id,
        "action_type": action,
        "material_description": description,
        "quantity": 12,
        "stock_status": stock_status,
    })
}

pub fn change_request_json(id: i64, status: &str, items: Vec<Value>) -> Value {
    json!({
        "id": id,
        "status": status,
        "creation_date": "2024-06-01T09:00:00Z",
        "obra": 510,
        "op": 2101,
        "requester_info": "Equipe de Montagem",
        "reason": "Projeto revisado exige troca de perfil",
        "items": items,
        "movimentos": [],
    })
}

pub fn movement_json(id: i64, ca_id: i64, description: &str) -> Value {
    json!({
        "id": id,
        "execution_date": "2024-06-12T15:45:00Z",
        "ca_id": ca_id,
        "item_description": description,
        "quantity_moved": 12,
        "movement_type": "SAIDA_DA_OBRA",
        "destination_stock": "Almoxarifado Central",
        "executed_by": "João",
    })
}

pub fn material_info_json(description: &str) -> Value {
    json!({
        "material_description": description,
        "quantity": 12,
    })
}

pub fn detail_error(message: &str) -> Value {
    json!({ "detail": message })
}
