//! HTTP oracle client.
//!
//! Posts JSON to `{base_url}/exchange` and `{base_url}/plan`. Any
//! OpenAI-style gateway fronting a planning model can implement these two
//! endpoints. Failures are surfaced immediately; the loop does not retry.

use async_trait::async_trait;
use autoforge_core::{ConversationTurn, OracleError};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{ExchangeRequest, Oracle, PlanRequest, TaskPlan};

pub struct HttpOracle {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpOracle {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| OracleError::NotConfigured(format!("http client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, OracleError> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(oracle = %self.name, %url, "Sending oracle request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Oracle returned error");
            return Err(OracleError::ApiError {
                status_code: status.as_u16(),
                message: error_body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| OracleError::Network(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(OracleError::EmptyReply);
        }
        serde_json::from_str(&text).map_err(|e| {
            OracleError::MalformedReply(format!("failed to parse oracle reply: {e}"))
        })
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exchange(&self, request: ExchangeRequest) -> Result<ConversationTurn, OracleError> {
        let turn: ConversationTurn = self.post("exchange", &request).await?;
        if turn.parts.is_empty() {
            return Err(OracleError::EmptyReply);
        }
        Ok(turn)
    }

    async fn plan(&self, request: PlanRequest) -> Result<TaskPlan, OracleError> {
        self.post("plan", &request).await
    }
}
