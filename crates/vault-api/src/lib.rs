//! Backend access for the withdraw-all flow.
//!
//! - Fetch withdrawal preparation data for a wallet
//! - Keep the payload opaque apart from its destination address

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vault_types::{Hex, Result, VaultError, WalletId};

pub mod backend_client;

pub use backend_client::BackendClient;

/// Server-computed payload needed to build a withdraw-all transaction.
///
/// Only `contract_address` is interpreted here; every other field is kept
/// verbatim for the transaction layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparationData {
    pub contract_address: Hex,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PreparationData {
    /// Reject payloads whose destination is not a usable address.
    pub fn validate(&self) -> Result<()> {
        vault_types::validate_address(&self.contract_address).map_err(|e| {
            VaultError::InvalidResponse(format!("bad contract_address: {}", e))
        })
    }
}

/// Source of withdraw-all preparation data.
#[async_trait]
pub trait PreparationSource: Send + Sync {
    async fn fetch_withdraw_all_data(&self, wallet_id: &WalletId) -> Result<PreparationData>;
}
