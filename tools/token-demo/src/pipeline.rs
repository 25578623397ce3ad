//! The three-stage token flow: create, mint, transfer.
//!
//! Every stage builds its transaction, signs it, prints the explorer link
//! for the signature, then submits and waits for `confirmed`. Stages run
//! strictly in order and the first failure aborts the run.

use ledger_client::amount::to_ui_string;
use ledger_client::{
    address, build_create_token_transaction, build_mint_tokens_transaction,
    build_transfer_tokens_transaction, derive_associated_token_address, get_explorer_link,
    get_signature_from_transaction, sign_transaction_message_with_signers, Address, Commitment,
    CreateTokenParams, ExplorerLink, KeyPairSigner, LedgerRpc, MintTokensParams, SolanaClient,
    TokenMetadata, TransactionMessage, TransferTokensParams, TOKEN_PROGRAM_ID,
};
use tracing::{info, warn};

use crate::config::DemoConfig;
use crate::error::DemoError;

/// Who takes part in a run.
#[derive(Debug, Clone)]
pub struct Identities {
    /// Fee payer, mint authority, initial holder.
    pub alice: KeyPairSigner,
    /// Transfer recipient; no signing capability.
    pub bob: Address,
    /// One-time identity whose address becomes the token's mint.
    pub mint: KeyPairSigner,
}

impl Identities {
    /// Decode alice, parse bob, and generate a fresh mint identity.
    pub fn load(config: &DemoConfig) -> Result<Self, DemoError> {
        Ok(Self {
            alice: config.signer()?,
            bob: address(&config.recipient)?,
            mint: KeyPairSigner::generate(),
        })
    }
}

/// What to create and how much to move.
#[derive(Debug, Clone)]
pub struct Plan {
    pub metadata: TokenMetadata,
    pub decimals: u8,
    pub mint_amount: u64,
    pub transfer_amount: u64,
}

impl From<&DemoConfig> for Plan {
    fn from(config: &DemoConfig) -> Self {
        Self {
            metadata: config.metadata.clone(),
            decimals: config.decimals,
            mint_amount: config.mint_amount,
            transfer_amount: config.transfer_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub mint: Address,
    pub create_signature: String,
    pub mint_signature: String,
    pub transfer_signature: String,
}

pub async fn run_pipeline<R: LedgerRpc>(
    client: &SolanaClient<R>,
    identities: &Identities,
    plan: &Plan,
) -> Result<PipelineReport, DemoError> {
    let rpc = client.rpc();
    let alice = &identities.alice;
    let mint = identities.mint.address();

    let slot = rpc.get_slot(Commitment::Confirmed).await?;
    info!(cluster = %client.cluster(), slot, "connected");

    // One blockhash for all three stages.
    let latest_blockhash = rpc.get_latest_blockhash(Commitment::Confirmed).await?;
    info!(
        alice = %alice.address(),
        bob = %identities.bob,
        %mint,
        "identities loaded"
    );

    let create_tx = build_create_token_transaction(&CreateTokenParams {
        fee_payer: alice,
        latest_blockhash: &latest_blockhash,
        mint: &identities.mint,
        metadata: plan.metadata.clone(),
        decimals: plan.decimals,
        compute_unit_limit: None,
        compute_unit_price: None,
    })?;
    let create_signature = submit(client, &create_tx, "create token").await?;

    let mint_tx = build_mint_tokens_transaction(&MintTokensParams {
        fee_payer: alice,
        latest_blockhash: &latest_blockhash,
        mint,
        mint_authority: alice,
        amount: plan.mint_amount,
        destination: alice.address(),
        token_program: None,
        compute_unit_limit: None,
        compute_unit_price: None,
    })?;
    let mint_signature = submit(client, &mint_tx, "mint tokens").await?;

    let transfer_tx = build_transfer_tokens_transaction(&TransferTokensParams {
        fee_payer: alice,
        latest_blockhash: &latest_blockhash,
        mint,
        authority: alice,
        amount: plan.transfer_amount,
        destination: identities.bob,
        source_ata: None,
        token_program: None,
        compute_unit_limit: None,
        compute_unit_price: None,
    })?;
    let transfer_signature = submit(client, &transfer_tx, "transfer tokens").await?;

    log_balances(client, identities, plan.decimals).await;

    Ok(PipelineReport {
        mint,
        create_signature,
        mint_signature,
        transfer_signature,
    })
}

/// Sign, announce, then send and confirm one stage's transaction.
async fn submit<R: LedgerRpc>(
    client: &SolanaClient<R>,
    transaction: &TransactionMessage,
    stage: &str,
) -> Result<String, DemoError> {
    let signed = sign_transaction_message_with_signers(transaction)?;
    let signature = get_signature_from_transaction(&signed)?;
    println!(
        "{}",
        get_explorer_link(ExplorerLink::Transaction(&signature), client.cluster())
    );

    client.send_and_confirm_transaction(&signed).await?;
    info!(stage, %signature, "stage confirmed");
    Ok(signature)
}

async fn log_balances<R: LedgerRpc>(client: &SolanaClient<R>, identities: &Identities, decimals: u8) {
    let mint = identities.mint.address();
    for (who, owner) in [("alice", identities.alice.address()), ("bob", identities.bob)] {
        let balance = match derive_associated_token_address(&owner, &mint, &TOKEN_PROGRAM_ID) {
            Ok(ata) => client
                .rpc()
                .get_token_account_balance(&ata, Commitment::Confirmed)
                .await
                .and_then(|b| b.raw()),
            Err(e) => Err(e),
        };
        match balance {
            Ok(raw) => info!(who, %owner, balance = %to_ui_string(raw, decimals), "token balance"),
            Err(e) => warn!(who, %owner, error = %e, "could not read token balance"),
        }
    }
}
