//! JSON-RPC 2.0 client for a Solana RPC node.
//!
//! Only the handful of methods the token flow needs are covered. Every
//! call is a single HTTP POST. There is no retry at this layer.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::address::{address_to_bytes, Address};
use crate::error::LedgerError;
use crate::signing::SignedTransaction;

/// Durability tier a node reports for a slot or transaction.
///
/// Ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

/// A recent blockhash and the last block height at which it is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

impl LatestBlockhash {
    pub fn blockhash_bytes(&self) -> Result<[u8; 32], LedgerError> {
        address_to_bytes(&self.blockhash)
            .map_err(|e| LedgerError::Serialization(format!("blockhash: {e}")))
    }
}

/// Entry of a `getSignatureStatuses` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    /// `None` once the block is rooted.
    pub confirmations: Option<u64>,
    pub err: Option<Value>,
    pub confirmation_status: Option<Commitment>,
}

impl SignatureStatus {
    /// Whether the status has reached at least `commitment`.
    pub fn satisfies(&self, commitment: Commitment) -> bool {
        match self.confirmation_status {
            Some(status) => status >= commitment,
            None => self.confirmations.is_none(),
        }
    }
}

/// Token account balance as reported by `getTokenAccountBalance`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    /// Raw base units, as a decimal string.
    pub amount: String,
    pub decimals: u8,
    pub ui_amount_string: String,
}

impl TokenAmount {
    pub fn raw(&self) -> Result<u64, LedgerError> {
        self.amount
            .parse()
            .map_err(|e| LedgerError::Serialization(format!("token amount {}: {e}", self.amount)))
    }
}

/// Options for `sendTransaction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub skip_preflight: bool,
    pub preflight_commitment: Commitment,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            skip_preflight: false,
            preflight_commitment: Commitment::Confirmed,
        }
    }
}

/// The RPC calls the token flow depends on.
///
/// [`RpcClient`] talks to a real node; tests substitute an in-memory ledger.
pub trait LedgerRpc {
    fn get_slot(
        &self,
        commitment: Commitment,
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> impl Future<Output = Result<LatestBlockhash, LedgerError>> + Send;

    fn get_block_height(
        &self,
        commitment: Commitment,
    ) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// Submit a signed transaction; returns its Base58 signature.
    fn send_transaction(
        &self,
        transaction: &SignedTransaction,
        options: SendOptions,
    ) -> impl Future<Output = Result<String, LedgerError>> + Send;

    fn get_signature_statuses(
        &self,
        signatures: &[String],
    ) -> impl Future<Output = Result<Vec<Option<SignatureStatus>>, LedgerError>> + Send;

    fn get_token_account_balance(
        &self,
        account: &Address,
        commitment: Commitment,
    ) -> impl Future<Output = Result<TokenAmount, LedgerError>> + Send;
}

// ---------------------------------------------------------------------------
// Wire envelopes
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

fn decode_response<T: DeserializeOwned>(method: &str, body: Value) -> Result<T, LedgerError> {
    let response: RpcResponse<T> = serde_json::from_value(body)
        .map_err(|e| LedgerError::Serialization(format!("{method} response: {e}")))?;

    if let Some(err) = response.error {
        return Err(LedgerError::Rpc {
            code: err.code,
            message: err.message,
        });
    }

    response
        .result
        .ok_or_else(|| LedgerError::Serialization(format!("{method} response has no result")))
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// JSON-RPC over HTTP.
#[derive(Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, url = %self.url, "rpc request");

        let body: Value = self
            .http
            .post(&self.url)
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        decode_response(method, body)
    }
}

impl LedgerRpc for RpcClient {
    async fn get_slot(&self, commitment: Commitment) -> Result<u64, LedgerError> {
        self.call("getSlot", json!([{ "commitment": commitment }]))
            .await
    }

    async fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> Result<LatestBlockhash, LedgerError> {
        let response: WithContext<LatestBlockhash> = self
            .call("getLatestBlockhash", json!([{ "commitment": commitment }]))
            .await?;
        Ok(response.value)
    }

    async fn get_block_height(&self, commitment: Commitment) -> Result<u64, LedgerError> {
        self.call("getBlockHeight", json!([{ "commitment": commitment }]))
            .await
    }

    async fn send_transaction(
        &self,
        transaction: &SignedTransaction,
        options: SendOptions,
    ) -> Result<String, LedgerError> {
        let encoded = transaction.to_base64();
        self.call(
            "sendTransaction",
            json!([
                encoded,
                {
                    "encoding": "base64",
                    "skipPreflight": options.skip_preflight,
                    "preflightCommitment": options.preflight_commitment,
                }
            ]),
        )
        .await
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[String],
    ) -> Result<Vec<Option<SignatureStatus>>, LedgerError> {
        let response: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([signatures, { "searchTransactionHistory": false }]),
            )
            .await?;
        Ok(response.value)
    }

    async fn get_token_account_balance(
        &self,
        account: &Address,
        commitment: Commitment,
    ) -> Result<TokenAmount, LedgerError> {
        let response: WithContext<TokenAmount> = self
            .call(
                "getTokenAccountBalance",
                json!([account.to_string(), { "commitment": commitment }]),
            )
            .await?;
        Ok(response.value)
    }
}
