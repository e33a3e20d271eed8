use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{ConversionOutcome, ConversionRequest};
use crate::auth::TokenProvider;
use crate::config::AccountSettings;
use crate::error::ServiceError;

/// Client for the conversion endpoints of one rendering account.
pub struct ConversionClient {
    client: Client,
    base_url: String,
    tokens: Box<dyn TokenProvider>,
}

impl ConversionClient {
    pub fn new(client: Client, account: &AccountSettings, tokens: Box<dyn TokenProvider>) -> Self {
        Self {
            client,
            base_url: format!(
                "{}/v1/accounts/{}/conversions",
                account.service_endpoint.trim_end_matches('/'),
                account.account_id
            ),
            tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Submit a conversion and return its id.
    ///
    /// Requests carrying container SAS tokens go to
    /// `createWithSharedAccessSignature`, all others to `create`.
    pub async fn create(
        &self,
        request: &ConversionRequest,
        extra: &Map<String, Value>,
    ) -> Result<String, ServiceError> {
        let path = if request.uses_sas() {
            "createWithSharedAccessSignature"
        } else {
            "create"
        };
        let url = self.url(path);

        tracing::info!(
            url = %url,
            input = %request.input.input_asset_path,
            output = %request.output.output_asset_file_name,
            "Submitting conversion"
        );

        let result = self.post_json(&url, &request.to_body(extra)).await;
        let body = match result {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "Conversion request failed");
                return Err(e);
            }
        };

        body.get("conversionId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ServiceError::InvalidResponse {
                url,
                message: "missing 'conversionId'".to_string(),
            })
    }

    /// Fetch the raw status document of a conversion.
    pub async fn status(&self, conversion_id: &str) -> Result<Value, ServiceError> {
        let url = self.url(conversion_id);
        let token = self.tokens.access_token().await?;

        tracing::debug!(url = %url, "Querying conversion status");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| ServiceError::Transport {
                url: url.clone(),
                source,
            })?;

        read_json(url, response).await
    }

    /// Query once and interpret the result.
    pub async fn check(&self, conversion_id: &str) -> Result<ConversionOutcome, ServiceError> {
        let response = self.status(conversion_id).await?;
        ConversionOutcome::from_status_response(&response).map_err(|message| {
            ServiceError::InvalidResponse {
                url: self.url(conversion_id),
                message,
            }
        })
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<Value, ServiceError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|source| ServiceError::Transport {
                url: url.to_string(),
                source,
            })?;

        read_json(url.to_string(), response).await
    }
}

async fn read_json(url: String, response: reqwest::Response) -> Result<Value, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ServiceError::Status {
            url,
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| ServiceError::InvalidResponse {
            url,
            message: e.to_string(),
        })
}
