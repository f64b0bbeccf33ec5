//! Typed async client for the operations backend.
//!
//! One method per REST operation, grouped by resource in the submodules. All
//! requests flow through [`ApiClient::execute`], which injects the session's
//! bearer token and maps non-success responses onto [`ClientError::Api`] with
//! the backend's `detail` message.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiErrorBody, ClientError};
use crate::session::Session;

pub mod auth;
pub mod change_requests;
pub mod receiving;
pub mod requisitions;

pub use auth::{AuthToken, NewUserAccount, UserAccount};

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: Session,
    page_size: u32,
    kanban_page_size: u32,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: normalize_base_url(&config.api_base_url)?,
            session,
            page_size: config.page_size,
            kanban_page_size: config.kanban_page_size,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn page_size(&self) -> u32 {
        self.page_size
    }

    pub(crate) fn kanban_page_size(&self) -> u32 {
        self.kanban_page_size
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    async fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.bearer().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub(crate) async fn get_json<T>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let mut builder = self.http.get(self.endpoint(path)?);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        self.execute(builder).await
    }

    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.http.post(self.endpoint(path)?).json(body))
            .await
    }

    pub(crate) async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(self.http.put(self.endpoint(path)?).json(body))
            .await
    }

    pub(crate) async fn put_empty<T>(&self, path: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        self.execute(self.http.put(self.endpoint(path)?)).await
    }

    pub(crate) async fn execute<T>(&self, builder: RequestBuilder) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let builder = self.authorize(builder).await;
        decode(builder.send().await?).await
    }
}

pub(crate) async fn decode<T>(response: Response) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if status.is_success() {
        Ok(response.json::<T>().await?)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(api_error(status, body))
    }
}

/// The backend reports failures as `{"detail": "..."}`; anything else falls
/// back to the raw body or the status line.
fn api_error(status: StatusCode, body: String) -> ClientError {
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .map(|parsed| parsed.detail)
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

/// `Url::join` treats a base without a trailing slash as a file and would
/// drop its last path segment, so `…/api` must become `…/api/` up front.
fn normalize_base_url(raw: &str) -> Result<Url, ClientError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Ok(Url::parse(&normalized)?)
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_keeps_api_prefix_when_joining() {
        let base = normalize_base_url("http://localhost:8000/api").unwrap();
        let joined = base.join("recebimentos/").unwrap();
        assert_eq!(joined.as_str(), "http://localhost:8000/api/recebimentos/");

        let nested = base.join("recebimentos/7/resolve").unwrap();
        assert_eq!(
            nested.as_str(),
            "http://localhost:8000/api/recebimentos/7/resolve"
        );
    }

    #[test]
    fn api_error_prefers_backend_detail() {
        let err = api_error(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "NF ou Pedido já cadastrado."}"#.to_string(),
        );
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("NF ou Pedido já cadastrado."));
    }

    #[test]
    fn api_error_falls_back_to_raw_body_then_status() {
        let raw = api_error(StatusCode::BAD_GATEWAY, "upstream choked".to_string());
        assert!(raw.to_string().contains("upstream choked"));

        let empty = api_error(StatusCode::INTERNAL_SERVER_ERROR, String::new());
        assert!(empty.to_string().contains("Internal Server Error"));
    }
}
