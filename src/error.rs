use serde::Deserialize;
use thiserror::Error;

/// Errors surfaced by the API gateway and the query layer.
///
/// `Validation` is raised before any request leaves the process; `Api` carries
/// the backend's own message for a rejected call; `Transport` covers connect,
/// timeout, and body-decode failures. None of these are fatal: callers keep
/// their state and may resubmit.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Server rejected request ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Cache(#[from] crate::cache::CacheError),

    #[error(transparent)]
    Session(#[from] crate::session::SessionError),

    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}

impl ClientError {
    pub fn validation(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }

    /// Status code of a server rejection, if that is what this error is.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Error body shape used by the backend for rejected requests.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_exposes_status() {
        let err = ClientError::Api {
            status: 400,
            message: "NF já cadastrada".into(),
        };
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("NF já cadastrada"));
    }

    #[test]
    fn validation_error_has_no_status() {
        let err = ClientError::Validation("supplier is required".into());
        assert_eq!(err.status(), None);
        assert!(err.is_validation());
    }
}
