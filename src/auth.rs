//! Access tokens for the conversion service.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::AccountSettings;
use crate::error::ServiceError;

/// Source of bearer tokens for conversion service calls
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, ServiceError>;
}

/// Exchanges the account id and key for a token at the STS endpoint.
pub struct StsTokenProvider {
    client: Client,
    url: String,
    credential: String,
}

#[derive(Debug, Deserialize)]
struct StsTokenResponse {
    #[serde(rename = "AccessToken")]
    access_token: String,
}

impl StsTokenProvider {
    pub fn new(client: Client, account: &AccountSettings) -> Self {
        Self {
            client,
            url: format!(
                "{}/accounts/{}/token",
                account.authentication_endpoint.trim_end_matches('/'),
                account.account_id
            ),
            credential: format!("{}:{}", account.account_id, account.account_key),
        }
    }
}

#[async_trait]
impl TokenProvider for StsTokenProvider {
    async fn access_token(&self) -> Result<String, ServiceError> {
        tracing::debug!(url = %self.url, "Requesting access token");

        let response = self
            .client
            .get(&self.url)
            .bearer_auth(&self.credential)
            .send()
            .await
            .map_err(|source| ServiceError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let token: StsTokenResponse =
            response
                .json()
                .await
                .map_err(|e| ServiceError::InvalidResponse {
                    url: self.url.clone(),
                    message: e.to_string(),
                })?;

        Ok(token.access_token)
    }
}

/// A token obtained elsewhere.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, ServiceError> {
        Ok(self.0.clone())
    }
}
