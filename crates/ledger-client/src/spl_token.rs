//! SPL Token operations for Solana.
//!
//! Implements the SPL Token instructions the builders need and associated
//! token account (ATA) derivation without pulling in the `solana-sdk` or
//! the `spl-token` crates.

use crate::address::{find_program_address, Address};
use crate::error::LedgerError;
use crate::system_program::SYSTEM_PROGRAM_ID;
use crate::transaction::{AccountMeta, Instruction};

// ---------------------------------------------------------------------------
// Well-known program IDs
// ---------------------------------------------------------------------------

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: Address = Address::new([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79,
    0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff,
    0x00, 0xa9,
]);

/// Token-2022 Program ID: `TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb`
pub const TOKEN_2022_PROGRAM_ID: Address = Address::new([
    0x06, 0xdd, 0xf6, 0xe1, 0xee, 0x75, 0x8f, 0xde, 0x18, 0x42, 0x5d, 0xbc, 0xe4, 0x6c, 0xcd,
    0xda, 0xb6, 0x1a, 0xfc, 0x4d, 0x83, 0xb9, 0x0d, 0x27, 0xfe, 0xbd, 0xf9, 0x28, 0xd8, 0xa1,
    0x8b, 0xfc,
]);

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Address = Address::new([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d,
    0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9,
    0xf8, 0x59,
]);

/// Size of a legacy SPL mint account.
pub const MINT_SIZE: u64 = 82;

// Token program instruction tags.
const IX_TRANSFER: u8 = 3;
const IX_MINT_TO: u8 = 7;
const IX_INITIALIZE_MINT2: u8 = 20;

// Associated token program instruction tags.
const IX_CREATE_IDEMPOTENT: u8 = 1;

fn check_token_program(program: &Address) -> Result<(), LedgerError> {
    if *program == TOKEN_PROGRAM_ID || *program == TOKEN_2022_PROGRAM_ID {
        Ok(())
    } else {
        Err(LedgerError::TransactionBuild(format!(
            "{program} is not a token program"
        )))
    }
}

// ---------------------------------------------------------------------------
// Mint setup
// ---------------------------------------------------------------------------

/// Build an `InitializeMint2` instruction.
///
/// # Wire format
///
/// `[20, decimals, mint_authority(32), freeze_option(1), freeze_authority(32)?]`.
/// `InitializeMint2` does not need the rent sysvar account.
pub fn initialize_mint2(
    token_program: &Address,
    mint: &Address,
    decimals: u8,
    mint_authority: &Address,
    freeze_authority: Option<&Address>,
) -> Result<Instruction, LedgerError> {
    check_token_program(token_program)?;

    let mut data = Vec::with_capacity(67);
    data.push(IX_INITIALIZE_MINT2);
    data.push(decimals);
    data.extend_from_slice(mint_authority.as_bytes());
    match freeze_authority {
        Some(freeze) => {
            data.push(1);
            data.extend_from_slice(freeze.as_bytes());
        }
        None => data.push(0),
    }

    Ok(Instruction {
        program_id: *token_program,
        accounts: vec![AccountMeta::writable(*mint, false)],
        data,
    })
}

// ---------------------------------------------------------------------------
// MintTo / Transfer
// ---------------------------------------------------------------------------

/// Build an SPL Token `MintTo` instruction.
///
/// `amount` is in base units: with 2 decimals, `1000` mints 10.00 tokens.
pub fn mint_to(
    token_program: &Address,
    mint: &Address,
    destination: &Address,
    mint_authority: &Address,
    amount: u64,
) -> Result<Instruction, LedgerError> {
    check_token_program(token_program)?;

    let mut data = Vec::with_capacity(9);
    data.push(IX_MINT_TO);
    data.extend_from_slice(&amount.to_le_bytes());

    Ok(Instruction {
        program_id: *token_program,
        accounts: vec![
            AccountMeta::writable(*mint, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*mint_authority, true),
        ],
        data,
    })
}

/// Build an SPL Token `Transfer` instruction.
///
/// This transfers `amount` of the smallest token unit (e.g. for a token with
/// 2 decimals, `amount = 900` transfers 9.00 tokens).
///
/// # Wire format
///
/// Instruction index = 3, followed by u64 LE amount. Total data: 9 bytes.
pub fn transfer(
    token_program: &Address,
    source: &Address,
    destination: &Address,
    authority: &Address,
    amount: u64,
) -> Result<Instruction, LedgerError> {
    check_token_program(token_program)?;

    let mut data = Vec::with_capacity(9);
    data.push(IX_TRANSFER);
    data.extend_from_slice(&amount.to_le_bytes());

    Ok(Instruction {
        program_id: *token_program,
        accounts: vec![
            AccountMeta::writable(*source, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*authority, true),
        ],
        data,
    })
}

// ---------------------------------------------------------------------------
// Associated token accounts
// ---------------------------------------------------------------------------

/// Derive the associated token account address for an owner + mint pair.
///
/// The ATA is a Program Derived Address (PDA) with seeds:
///   `[owner, token_program_id, mint]`
/// derived from the Associated Token Account program.
pub fn derive_associated_token_address(
    owner: &Address,
    mint: &Address,
    token_program: &Address,
) -> Result<Address, LedgerError> {
    find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Create `owner`'s ATA for `mint` unless it already exists.
pub fn create_associated_token_idempotent(
    payer: &Address,
    owner: &Address,
    mint: &Address,
    token_program: &Address,
) -> Result<Instruction, LedgerError> {
    check_token_program(token_program)?;
    let ata = derive_associated_token_address(owner, mint, token_program)?;

    Ok(Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(ata, false),
            AccountMeta::readonly(*owner, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::readonly(*token_program, false),
        ],
        data: vec![IX_CREATE_IDEMPOTENT],
    })
}
