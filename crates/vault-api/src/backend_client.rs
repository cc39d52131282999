//! HTTP client for the vault backend.
//!
//! Endpoints:
//! - GET /api/get-withdraw-all-data?wallet_id=<id>

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use vault_types::{Result, VaultError, WalletId};

use crate::{PreparationData, PreparationSource};

/// Backend service client.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout_ms: Option<u64>) -> Self {
        let timeout_ms = timeout_ms.unwrap_or(20_000);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the data needed to withdraw everything from a wallet's vault.
    ///
    /// GET /api/get-withdraw-all-data?wallet_id=<id>
    pub async fn get_withdraw_all_data(&self, wallet_id: &WalletId) -> Result<PreparationData> {
        let url = format!("{}/api/get-withdraw-all-data", self.base_url);
        tracing::debug!(%url, %wallet_id, "fetching withdraw-all data");

        let resp = self
            .client
            .get(&url)
            .query(&[("wallet_id", wallet_id.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| VaultError::Http(format!("backend request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            tracing::warn!(status = status.as_u16(), %message, "backend rejected withdraw-all request");
            return Err(VaultError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let data: PreparationData = resp.json().await.map_err(|e| {
            VaultError::InvalidResponse(format!("failed to parse withdraw-all data: {}", e))
        })?;
        data.validate()?;

        tracing::debug!(contract_address = %data.contract_address, "withdraw-all data received");
        Ok(data)
    }
}

#[async_trait]
impl PreparationSource for BackendClient {
    async fn fetch_withdraw_all_data(&self, wallet_id: &WalletId) -> Result<PreparationData> {
        self.get_withdraw_all_data(wallet_id).await
    }
}

/// Pull a human-readable message out of an error response body.
///
/// Looks for `detail`, `message` or `error` string fields, then falls back to
/// the raw body and finally the status reason phrase.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                if !msg.trim().is_empty() {
                    return msg.trim().to_string();
                }
            }
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}
