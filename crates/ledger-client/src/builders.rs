//! Transaction builders for the token lifecycle: create, mint, transfer.
//!
//! Each builder turns a parameter struct into an unsigned
//! [`TransactionMessage`] that already carries the keypairs needed to sign
//! it. Amounts are raw base units and are not checked against the mint's
//! decimals.

use crate::address::Address;
use crate::compute_budget::budget_instructions;
use crate::error::LedgerError;
use crate::keypair::KeyPairSigner;
use crate::rpc::LatestBlockhash;
use crate::spl_token::{
    create_associated_token_idempotent, derive_associated_token_address, initialize_mint2,
    mint_to, transfer, MINT_SIZE, TOKEN_PROGRAM_ID,
};
use crate::system_program::{create_account, rent_exempt_minimum};
use crate::token_metadata::{create_metadata_account_v3, TokenMetadata};
use crate::transaction::TransactionMessage;

pub const DEFAULT_CREATE_TOKEN_CU_LIMIT: u32 = 60_000;
pub const DEFAULT_MINT_TOKENS_CU_LIMIT: u32 = 40_000;
pub const DEFAULT_TRANSFER_TOKENS_CU_LIMIT: u32 = 40_000;

/// Create a new mint with Metaplex metadata.
#[derive(Debug, Clone)]
pub struct CreateTokenParams<'a> {
    pub fee_payer: &'a KeyPairSigner,
    pub latest_blockhash: &'a LatestBlockhash,
    /// Fresh keypair whose address becomes the mint.
    pub mint: &'a KeyPairSigner,
    pub metadata: TokenMetadata,
    pub decimals: u8,
    pub compute_unit_limit: Option<u32>,
    pub compute_unit_price: Option<u64>,
}

/// Mint `amount` base units into `destination`'s associated token account.
#[derive(Debug, Clone)]
pub struct MintTokensParams<'a> {
    pub fee_payer: &'a KeyPairSigner,
    pub latest_blockhash: &'a LatestBlockhash,
    pub mint: Address,
    pub mint_authority: &'a KeyPairSigner,
    pub amount: u64,
    /// Wallet that owns the receiving token account.
    pub destination: Address,
    /// Defaults to the legacy token program.
    pub token_program: Option<Address>,
    pub compute_unit_limit: Option<u32>,
    pub compute_unit_price: Option<u64>,
}

/// Move `amount` base units from `authority`'s token account to `destination`'s.
#[derive(Debug, Clone)]
pub struct TransferTokensParams<'a> {
    pub fee_payer: &'a KeyPairSigner,
    pub latest_blockhash: &'a LatestBlockhash,
    pub mint: Address,
    pub authority: &'a KeyPairSigner,
    pub amount: u64,
    /// Wallet that owns the receiving token account.
    pub destination: Address,
    /// Source token account. Defaults to the ATA derived from `authority`;
    /// set it when the source is not owned that way (multisig, PDAs).
    pub source_ata: Option<Address>,
    pub token_program: Option<Address>,
    pub compute_unit_limit: Option<u32>,
    pub compute_unit_price: Option<u64>,
}

pub fn build_create_token_transaction(
    params: &CreateTokenParams<'_>,
) -> Result<TransactionMessage, LedgerError> {
    let payer = params.fee_payer.address();
    let mint = params.mint.address();

    let mut instructions = budget_instructions(
        params
            .compute_unit_limit
            .unwrap_or(DEFAULT_CREATE_TOKEN_CU_LIMIT),
        params.compute_unit_price,
    );
    instructions.push(create_account(
        &payer,
        &mint,
        rent_exempt_minimum(MINT_SIZE),
        MINT_SIZE,
        &TOKEN_PROGRAM_ID,
    ));
    instructions.push(initialize_mint2(
        &TOKEN_PROGRAM_ID,
        &mint,
        params.decimals,
        &payer,
        Some(&payer),
    )?);
    instructions.push(create_metadata_account_v3(
        &mint,
        &payer,
        &payer,
        &payer,
        &params.metadata,
    )?);

    TransactionMessage::new(
        &instructions,
        &payer,
        params.latest_blockhash,
        &[params.fee_payer, params.mint],
    )
}

pub fn build_mint_tokens_transaction(
    params: &MintTokensParams<'_>,
) -> Result<TransactionMessage, LedgerError> {
    let payer = params.fee_payer.address();
    let token_program = params.token_program.unwrap_or(TOKEN_PROGRAM_ID);
    let destination_ata =
        derive_associated_token_address(&params.destination, &params.mint, &token_program)?;

    let mut instructions = budget_instructions(
        params
            .compute_unit_limit
            .unwrap_or(DEFAULT_MINT_TOKENS_CU_LIMIT),
        params.compute_unit_price,
    );
    instructions.push(create_associated_token_idempotent(
        &payer,
        &params.destination,
        &params.mint,
        &token_program,
    )?);
    instructions.push(mint_to(
        &token_program,
        &params.mint,
        &destination_ata,
        &params.mint_authority.address(),
        params.amount,
    )?);

    TransactionMessage::new(
        &instructions,
        &payer,
        params.latest_blockhash,
        &[params.fee_payer, params.mint_authority],
    )
}

pub fn build_transfer_tokens_transaction(
    params: &TransferTokensParams<'_>,
) -> Result<TransactionMessage, LedgerError> {
    let payer = params.fee_payer.address();
    let authority = params.authority.address();
    let token_program = params.token_program.unwrap_or(TOKEN_PROGRAM_ID);

    let source_ata = match params.source_ata {
        Some(ata) => ata,
        None => derive_associated_token_address(&authority, &params.mint, &token_program)?,
    };
    let destination_ata =
        derive_associated_token_address(&params.destination, &params.mint, &token_program)?;

    let mut instructions = budget_instructions(
        params
            .compute_unit_limit
            .unwrap_or(DEFAULT_TRANSFER_TOKENS_CU_LIMIT),
        params.compute_unit_price,
    );
    instructions.push(create_associated_token_idempotent(
        &payer,
        &params.destination,
        &params.mint,
        &token_program,
    )?);
    instructions.push(transfer(
        &token_program,
        &source_ata,
        &destination_ata,
        &authority,
        params.amount,
    )?);

    TransactionMessage::new(
        &instructions,
        &payer,
        params.latest_blockhash,
        &[params.fee_payer, params.authority],
    )
}
