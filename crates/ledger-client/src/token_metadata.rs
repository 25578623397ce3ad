//! Metaplex Token Metadata: `CreateMetadataAccountV3`.
//!
//! The payload is Borsh: strings are a u32 LE length followed by UTF-8 bytes,
//! `Option<T>` is a one-byte tag followed by `T` when present, and `bool` is
//! a single byte.

use crate::address::{find_program_address, Address};
use crate::error::LedgerError;
use crate::system_program::SYSTEM_PROGRAM_ID;
use crate::transaction::{AccountMeta, Instruction};

/// Token Metadata Program ID: `metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s`
pub const TOKEN_METADATA_PROGRAM_ID: Address = Address::new([
    0x0b, 0x70, 0x65, 0xb1, 0xe3, 0xd1, 0x7c, 0x45, 0x38, 0x9d, 0x52, 0x7f, 0x6b, 0x04, 0xc3,
    0xcd, 0x58, 0xb8, 0x6c, 0x73, 0x1a, 0xa0, 0xfd, 0xb5, 0x49, 0xb6, 0xd1, 0xbc, 0x03, 0xf8,
    0x29, 0x46,
]);

const IX_CREATE_METADATA_ACCOUNT_V3: u8 = 33;

pub const MAX_NAME_LENGTH: usize = 32;
pub const MAX_SYMBOL_LENGTH: usize = 10;
pub const MAX_URI_LENGTH: usize = 200;

/// Display metadata attached to a new mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    /// Off-chain JSON metadata location.
    pub uri: String,
    /// Whether the update authority may change this metadata later.
    pub is_mutable: bool,
}

impl TokenMetadata {
    /// Enforce the on-chain length limits before anything is signed.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let checks = [
            ("name", self.name.len(), MAX_NAME_LENGTH),
            ("symbol", self.symbol.len(), MAX_SYMBOL_LENGTH),
            ("uri", self.uri.len(), MAX_URI_LENGTH),
        ];
        for (field, len, max) in checks {
            if len > max {
                return Err(LedgerError::TransactionBuild(format!(
                    "metadata {field} is {len} bytes, max {max}"
                )));
            }
        }
        Ok(())
    }
}

/// Derive the metadata account for `mint`.
pub fn find_metadata_address(mint: &Address) -> Result<Address, LedgerError> {
    find_program_address(
        &[
            b"metadata",
            TOKEN_METADATA_PROGRAM_ID.as_ref(),
            mint.as_ref(),
        ],
        &TOKEN_METADATA_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Build a `CreateMetadataAccountV3` instruction.
///
/// Seller fee is zero and creators, collection, uses and collection details
/// are all left unset.
pub fn create_metadata_account_v3(
    mint: &Address,
    mint_authority: &Address,
    payer: &Address,
    update_authority: &Address,
    metadata: &TokenMetadata,
) -> Result<Instruction, LedgerError> {
    metadata.validate()?;
    let metadata_account = find_metadata_address(mint)?;

    let mut data = Vec::with_capacity(
        1 + 12 + metadata.name.len() + metadata.symbol.len() + metadata.uri.len() + 7,
    );
    data.push(IX_CREATE_METADATA_ACCOUNT_V3);
    // DataV2
    put_string(&mut data, &metadata.name);
    put_string(&mut data, &metadata.symbol);
    put_string(&mut data, &metadata.uri);
    data.extend_from_slice(&0u16.to_le_bytes()); // seller_fee_basis_points
    data.push(0); // creators: None
    data.push(0); // collection: None
    data.push(0); // uses: None
    data.push(u8::from(metadata.is_mutable));
    data.push(0); // collection_details: None

    Ok(Instruction {
        program_id: TOKEN_METADATA_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(metadata_account, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(*mint_authority, true),
            AccountMeta::writable(*payer, true),
            AccountMeta::readonly(*update_authority, true),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
        ],
        data,
    })
}

fn put_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}
