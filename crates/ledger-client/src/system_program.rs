//! System Program instructions and rent arithmetic.

use crate::address::Address;
use crate::transaction::{AccountMeta, Instruction};

/// The Solana System Program public key: 32 zero bytes.
/// Base58: `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: Address = Address::new([0u8; 32]);

/// System Program `CreateAccount` instruction index (little-endian u32).
const CREATE_ACCOUNT_IX_INDEX: u32 = 0;

/// Bytes of per-account overhead the runtime charges rent for.
const ACCOUNT_STORAGE_OVERHEAD: u64 = 128;
const LAMPORTS_PER_BYTE_YEAR: u64 = 3_480;
const EXEMPTION_THRESHOLD_YEARS: u64 = 2;

/// Minimum lamport balance for an account of `space` bytes to be rent-exempt.
///
/// Computed locally from the cluster's default rent parameters, so no RPC
/// round-trip is needed while building a transaction.
pub fn rent_exempt_minimum(space: u64) -> u64 {
    (ACCOUNT_STORAGE_OVERHEAD + space) * LAMPORTS_PER_BYTE_YEAR * EXEMPTION_THRESHOLD_YEARS
}

/// Build a System Program `CreateAccount` instruction.
///
/// Data: u32 LE index (0) + u64 LE lamports + u64 LE space + 32-byte owner.
pub fn create_account(
    payer: &Address,
    new_account: &Address,
    lamports: u64,
    space: u64,
    owner: &Address,
) -> Instruction {
    let mut data = Vec::with_capacity(52);
    data.extend_from_slice(&CREATE_ACCOUNT_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data.extend_from_slice(&space.to_le_bytes());
    data.extend_from_slice(owner.as_bytes());

    Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(*new_account, true),
        ],
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_account_rent() {
        assert_eq!(rent_exempt_minimum(82), 1_461_600);
    }

    #[test]
    fn token_account_rent() {
        assert_eq!(rent_exempt_minimum(165), 2_039_280);
    }

    #[test]
    fn create_account_data_layout() {
        let owner = Address::new([7u8; 32]);
        let ix = create_account(&Address::new([1; 32]), &Address::new([2; 32]), 500, 82, &owner);

        assert_eq!(ix.data.len(), 52);
        assert_eq!(&ix.data[..4], &[0, 0, 0, 0]);
        assert_eq!(&ix.data[4..12], &500u64.to_le_bytes());
        assert_eq!(&ix.data[12..20], &82u64.to_le_bytes());
        assert_eq!(&ix.data[20..], owner.as_bytes());
    }

    #[test]
    fn create_account_both_accounts_sign() {
        let ix = create_account(
            &Address::new([1; 32]),
            &Address::new([2; 32]),
            1,
            0,
            &SYSTEM_PROGRAM_ID,
        );
        assert!(ix.accounts.iter().all(|a| a.is_signer && a.is_writable));
        assert_eq!(ix.program_id, SYSTEM_PROGRAM_ID);
    }
}
