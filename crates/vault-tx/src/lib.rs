//! Transaction submission for the withdraw-all flow.
//!
//! - `TransactionSubmitter` is the seam to whatever signs and broadcasts
//! - `RelayerClient` submits through a relayer service over HTTP

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vault_api::PreparationData;
use vault_types::{Hex, Result};

pub mod relayer_client;

pub use relayer_client::RelayerClient;

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub transaction_hash: Hex,
}

/// Relayer request for a withdraw-all transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawAllRequest {
    pub contract_address: Hex,
    pub data: PreparationData,
}

/// Submits a withdraw-all transaction built from preparation data.
///
/// Signing and chain interaction are entirely the implementor's concern.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit_withdraw_all(
        &self,
        data: &PreparationData,
        contract_address: &str,
    ) -> Result<TransactionResult>;
}
