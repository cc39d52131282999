//! HTTP client for the transaction relayer.
//!
//! Endpoints:
//! - POST /api/v1/withdraw-all

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vault_api::PreparationData;
use vault_types::{Hex, Result, VaultError};

use crate::{TransactionResult, TransactionSubmitter, WithdrawAllRequest};

/// Relayer API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayerResponse<T> {
    pub code: Option<i32>,
    pub message: Option<String>,
    pub user_message: Option<String>,
    pub data: T,
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
struct RelayerErrorBody {
    message: Option<String>,
    user_message: Option<String>,
}

/// Relayer client for submitting transactions.
#[derive(Debug, Clone)]
pub struct RelayerClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl RelayerClient {
    pub fn new(base_url: &str, timeout_ms: Option<u64>) -> Self {
        let timeout_ms = timeout_ms.unwrap_or(30_000);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Submit a withdraw-all request to the relayer.
    ///
    /// POST /api/v1/withdraw-all
    pub async fn submit(&self, request: &WithdrawAllRequest) -> Result<Hex> {
        let url = format!("{}/api/v1/withdraw-all", self.base_url);
        tracing::debug!(%url, contract_address = %request.contract_address, "submitting withdraw-all");

        let resp = self
            .client
            .post(&url)
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| VaultError::Http(format!("relayer request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<RelayerErrorBody>(&body)
                .ok()
                .and_then(|b| pick_reason(b.user_message, b.message))
                .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default();
            return Err(VaultError::Submission(format!(
                "relayer returned status {}: {}",
                status, reason
            )));
        }

        let body: RelayerResponse<Hex> = resp.json().await.map_err(|e| {
            VaultError::InvalidResponse(format!("failed to parse relayer response: {}", e))
        })?;

        if body.data.trim().is_empty() {
            return Err(VaultError::Submission(
                pick_reason(body.user_message, body.message)
                    .unwrap_or_else(|| "relayer returned no transaction hash".into()),
            ));
        }

        Ok(body.data)
    }
}

/// First non-blank of the user-facing and internal relayer messages.
fn pick_reason(user_message: Option<String>, message: Option<String>) -> Option<String> {
    let non_blank = |m: String| {
        let m = m.trim();
        (!m.is_empty()).then(|| m.to_string())
    };
    user_message.and_then(non_blank).or_else(|| message.and_then(non_blank))
}

#[async_trait]
impl TransactionSubmitter for RelayerClient {
    async fn submit_withdraw_all(
        &self,
        data: &PreparationData,
        contract_address: &str,
    ) -> Result<TransactionResult> {
        let request = WithdrawAllRequest {
            contract_address: contract_address.to_string(),
            data: data.clone(),
        };
        let transaction_hash = self.submit(&request).await?;
        tracing::info!(%transaction_hash, "withdraw-all transaction submitted");
        Ok(TransactionResult { transaction_hash })
    }
}
