use thiserror::Error;

use crate::address::Address;

/// Ledger client errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid cluster moniker: {0}")]
    InvalidCluster(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("transaction build error: {0}")]
    TransactionBuild(String),

    #[error("missing signer for required address {0}")]
    MissingSigner(Address),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },

    #[error("blockhash expired before transaction {0} was confirmed")]
    BlockhashExpired(String),

    #[error("timed out waiting for confirmation of {0}")]
    ConfirmationTimeout(String),
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        LedgerError::Transport(e.to_string())
    }
}
