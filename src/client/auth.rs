use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use super::{decode, ApiClient};
use crate::error::ClientError;

/// Bearer token issued by the login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewUserAccount {
    #[validate(email(message = "A valid e-mail address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl ApiClient {
    /// Exchanges credentials for a bearer token and stores it in the session.
    /// The backend expects an OAuth2 password form, not JSON.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthToken, ClientError> {
        let response = self
            .http
            .post(self.endpoint("login")?)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let token: AuthToken = decode(response).await?;
        self.session.set_token(token.access_token.clone()).await?;
        info!("Authenticated as {}", username);
        Ok(token)
    }

    /// Forgets the session token, in memory and in the durable store.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session.clear().await?;
        info!("Session cleared");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<UserAccount, ClientError> {
        self.get_json("users/me", &[]).await
    }

    #[instrument(skip(self, account))]
    pub async fn register_user(&self, account: &NewUserAccount) -> Result<UserAccount, ClientError> {
        account.validate().map_err(ClientError::validation)?;
        self.post_json("users/", account).await
    }
}
