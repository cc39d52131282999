use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 0x-prefixed hex string (e.g. "0x1234...").
pub type Hex = String;

/// Vault SDK error types.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("a withdrawal is already in progress")]
    Busy,

    #[error("request failed: {0}")]
    Http(String),

    #[error("backend returned status {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("transaction submission failed: {0}")]
    Submission(String),

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl VaultError {
    /// Display message, or `None` when the error carries no text to show.
    pub fn message(&self) -> Option<String> {
        let payload = match self {
            VaultError::Busy => return Some(self.to_string()),
            VaultError::Backend { message, .. } => message,
            VaultError::InvalidInput(msg)
            | VaultError::Http(msg)
            | VaultError::InvalidResponse(msg)
            | VaultError::Submission(msg)
            | VaultError::InvalidHex(msg)
            | VaultError::Config(msg)
            | VaultError::Other(msg) => msg,
        };
        if payload.trim().is_empty() {
            None
        } else {
            Some(self.to_string().trim().to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;

/// Identifier of the source wallet. Never empty.
///
/// Surrounding whitespace is stripped on parse, so `" 0xabc "` and
/// `"0xabc"` name the same wallet and only the trimmed form is sent out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletId(String);

impl WalletId {
    /// Validate an optional raw identifier.
    ///
    /// Absent, empty and whitespace-only values are rejected; anything else
    /// is kept with leading and trailing whitespace removed.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            Some(id) if !id.is_empty() => Ok(Self(id.to_string())),
            _ => Err(VaultError::InvalidInput("wallet not connected".into())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for WalletId {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(Some(value.as_str()))
    }
}

impl From<WalletId> for String {
    fn from(id: WalletId) -> Self {
        id.0
    }
}

/// Parse a hex string (with or without 0x prefix) to bytes.
///
/// Odd-length input is left-padded with a zero nibble.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    if hex_str.is_empty() {
        return Err(VaultError::InvalidHex("empty hex string".into()));
    }
    let decoded = if hex_str.len() % 2 == 1 {
        hex::decode(format!("0{}", hex_str))
    } else {
        hex::decode(hex_str)
    };
    decoded.map_err(|e| VaultError::InvalidHex(e.to_string()))
}

/// Check that a value is a 0x-prefixed, non-empty hex address.
pub fn validate_address(address: &str) -> Result<()> {
    if !address.starts_with("0x") {
        return Err(VaultError::InvalidHex(format!(
            "address must be 0x-prefixed: {}",
            address
        )));
    }
    hex_to_bytes(address).map(|_| ())
}
