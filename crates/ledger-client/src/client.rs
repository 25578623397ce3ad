//! Connection handle: an RPC transport bound to a cluster, plus the
//! submit-and-confirm loop.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::cluster::Cluster;
use crate::error::LedgerError;
use crate::rpc::{Commitment, LedgerRpc, RpcClient, SendOptions};
use crate::signing::{get_signature_from_transaction, SignedTransaction};

/// How long and how hard to wait for a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmOptions {
    pub commitment: Commitment,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

/// RPC transport plus the cluster it points at.
#[derive(Debug)]
pub struct SolanaClient<R> {
    rpc: R,
    cluster: Cluster,
}

/// Connect to a cluster by moniker (`devnet`, `mainnet`, `localnet`, ...)
/// or explicit RPC URL.
pub fn create_solana_client(moniker: &str) -> Result<SolanaClient<RpcClient>, LedgerError> {
    let cluster: Cluster = moniker.parse()?;
    let rpc = RpcClient::new(cluster.rpc_url());
    Ok(SolanaClient::new(rpc, cluster))
}

impl<R: LedgerRpc> SolanaClient<R> {
    pub fn new(rpc: R, cluster: Cluster) -> Self {
        Self { rpc, cluster }
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    /// Send and wait for `confirmed` with the default polling settings.
    pub async fn send_and_confirm_transaction(
        &self,
        transaction: &SignedTransaction,
    ) -> Result<String, LedgerError> {
        self.send_and_confirm_transaction_with(transaction, ConfirmOptions::default())
            .await
    }

    /// Submit once, then poll signature status until it reaches
    /// `options.commitment`.
    ///
    /// Never resubmits. Gives up when the status reports an execution error,
    /// when the blockhash can no longer land, or when `options.timeout`
    /// elapses.
    pub async fn send_and_confirm_transaction_with(
        &self,
        transaction: &SignedTransaction,
        options: ConfirmOptions,
    ) -> Result<String, LedgerError> {
        let expected = get_signature_from_transaction(transaction)?;
        let send_options = SendOptions {
            skip_preflight: false,
            preflight_commitment: options.commitment,
        };

        let signature = self.rpc.send_transaction(transaction, send_options).await?;
        if signature != expected {
            warn!(%expected, returned = %signature, "node returned a different signature");
        }
        debug!(%signature, "transaction submitted");

        let started = Instant::now();
        let query = [signature.clone()];
        loop {
            let statuses = self.rpc.get_signature_statuses(&query).await?;
            if let Some(status) = statuses.into_iter().next().flatten() {
                if let Some(err) = status.err {
                    return Err(LedgerError::TransactionFailed {
                        signature,
                        reason: err.to_string(),
                    });
                }
                if status.satisfies(options.commitment) {
                    info!(%signature, slot = status.slot, commitment = ?options.commitment, "transaction confirmed");
                    return Ok(signature);
                }
            }

            let block_height = self.rpc.get_block_height(options.commitment).await?;
            if block_height > transaction.last_valid_block_height {
                return Err(LedgerError::BlockhashExpired(format!(
                    "{signature}: block height {block_height} passed {}",
                    transaction.last_valid_block_height
                )));
            }

            if started.elapsed() >= options.timeout {
                return Err(LedgerError::ConfirmationTimeout(format!(
                    "{signature} not {:?} after {:?}",
                    options.commitment, options.timeout
                )));
            }

            sleep(options.poll_interval).await;
        }
    }
}
