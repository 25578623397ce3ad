//! In-process ledger that executes the token-flow programs.
//!
//! [`MemoryLedger`] implements [`LedgerRpc`] without a network. Submitted
//! transactions are decoded from their wire bytes, signature-checked, and
//! run against an account map: system `CreateAccount`, the token program's
//! `InitializeMint2`/`MintTo`/`Transfer`, ATA `CreateIdempotent`, and
//! Metaplex `CreateMetadataAccountV3`. Compute budget instructions are
//! accepted and ignored. Anything else fails the transaction.
//!
//! Each transaction is atomic and lands in its own block at `confirmed`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::address::Address;
use crate::amount::to_ui_string;
use crate::compute_budget::COMPUTE_BUDGET_PROGRAM_ID;
use crate::error::LedgerError;
use crate::rpc::{Commitment, LatestBlockhash, LedgerRpc, SendOptions, SignatureStatus, TokenAmount};
use crate::signing::{decode_wire_transaction, verify_signatures, SignedTransaction};
use crate::spl_token::{
    derive_associated_token_address, ASSOCIATED_TOKEN_PROGRAM_ID, MINT_SIZE,
    TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
use crate::system_program::{rent_exempt_minimum, SYSTEM_PROGRAM_ID};
use crate::token_metadata::{find_metadata_address, TOKEN_METADATA_PROGRAM_ID};
use crate::transaction::Message;

/// Blocks a blockhash stays usable for, as on mainnet.
const BLOCKHASH_VALIDITY: u64 = 150;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintState {
    pub decimals: u8,
    pub mint_authority: Option<Address>,
    pub freeze_authority: Option<Address>,
    pub supply: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccountState {
    pub mint: Address,
    pub owner: Address,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub mint: Address,
    pub update_authority: Address,
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub is_mutable: bool,
}

#[derive(Debug, Clone)]
enum Account {
    /// Allocated by the system program, not yet initialized by its owner.
    Allocated { owner: Address, space: u64 },
    Mint(MintState),
    Token(TokenAccountState),
    Metadata(MetadataRecord),
}

#[derive(Debug, Default)]
struct LedgerState {
    slot: u64,
    block_height: u64,
    blockhash_seq: u64,
    /// blockhash -> last valid block height
    blockhashes: HashMap<[u8; 32], u64>,
    accounts: HashMap<Address, Account>,
    statuses: HashMap<String, SignatureStatus>,
    submitted: usize,
}

/// Offline [`LedgerRpc`] backend.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, LedgerState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Transport("memory ledger lock poisoned".into()))
    }

    /// Number of `sendTransaction` calls received, accepted or not.
    pub fn submitted(&self) -> usize {
        self.state().map(|s| s.submitted).unwrap_or_default()
    }

    /// Skip ahead `blocks` blocks, expiring older blockhashes.
    pub fn advance_blocks(&self, blocks: u64) {
        if let Ok(mut state) = self.state() {
            state.block_height += blocks;
            state.slot += blocks;
        }
    }

    pub fn mint(&self, address: &Address) -> Option<MintState> {
        match self.state().ok()?.accounts.get(address) {
            Some(Account::Mint(mint)) => Some(mint.clone()),
            _ => None,
        }
    }

    pub fn token_account(&self, address: &Address) -> Option<TokenAccountState> {
        match self.state().ok()?.accounts.get(address) {
            Some(Account::Token(account)) => Some(account.clone()),
            _ => None,
        }
    }

    /// Metadata attached to `mint`, looked up through its metadata PDA.
    pub fn metadata(&self, mint: &Address) -> Option<MetadataRecord> {
        let pda = find_metadata_address(mint).ok()?;
        match self.state().ok()?.accounts.get(&pda) {
            Some(Account::Metadata(record)) => Some(record.clone()),
            _ => None,
        }
    }
}

impl LedgerRpc for MemoryLedger {
    async fn get_slot(&self, _commitment: Commitment) -> Result<u64, LedgerError> {
        Ok(self.state()?.slot)
    }

    async fn get_latest_blockhash(
        &self,
        _commitment: Commitment,
    ) -> Result<LatestBlockhash, LedgerError> {
        let mut state = self.state()?;
        state.blockhash_seq += 1;
        let hash: [u8; 32] = Sha256::digest(state.blockhash_seq.to_le_bytes()).into();
        let last_valid_block_height = state.block_height + BLOCKHASH_VALIDITY;
        state.blockhashes.insert(hash, last_valid_block_height);
        Ok(LatestBlockhash {
            blockhash: bs58::encode(hash).into_string(),
            last_valid_block_height,
        })
    }

    async fn get_block_height(&self, _commitment: Commitment) -> Result<u64, LedgerError> {
        Ok(self.state()?.block_height)
    }

    async fn send_transaction(
        &self,
        transaction: &SignedTransaction,
        options: SendOptions,
    ) -> Result<String, LedgerError> {
        let mut state = self.state()?;
        state.submitted += 1;

        let (signatures, message) = decode_wire_transaction(&transaction.to_wire_bytes())?;
        verify_signatures(&signatures, &message).map_err(|e| LedgerError::Rpc {
            code: -32003,
            message: format!("Transaction signature verification failure: {e}"),
        })?;
        let signature = bs58::encode(signatures[0]).into_string();

        match state.blockhashes.get(&message.recent_blockhash) {
            Some(last_valid) if *last_valid >= state.block_height => {}
            _ => {
                return Err(LedgerError::Rpc {
                    code: -32002,
                    message: "Blockhash not found".into(),
                })
            }
        }
        if state.statuses.contains_key(&signature) {
            return Err(LedgerError::Rpc {
                code: -32002,
                message: "This transaction has already been processed".into(),
            });
        }

        let outcome = execute(&state.accounts, &message);
        let err = match outcome {
            Ok(accounts) => {
                state.accounts = accounts;
                None
            }
            Err(err) if options.skip_preflight => Some(err),
            Err(err) => {
                return Err(LedgerError::Rpc {
                    code: -32002,
                    message: format!("Transaction simulation failed: {err}"),
                })
            }
        };

        state.slot += 1;
        state.block_height += 1;
        let slot = state.slot;
        debug!(%signature, slot, failed = err.is_some(), "memory ledger processed transaction");
        state.statuses.insert(
            signature.clone(),
            SignatureStatus {
                slot,
                confirmations: Some(0),
                err,
                confirmation_status: Some(Commitment::Confirmed),
            },
        );
        Ok(signature)
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[String],
    ) -> Result<Vec<Option<SignatureStatus>>, LedgerError> {
        let state = self.state()?;
        Ok(signatures
            .iter()
            .map(|sig| state.statuses.get(sig).cloned())
            .collect())
    }

    async fn get_token_account_balance(
        &self,
        account: &Address,
        _commitment: Commitment,
    ) -> Result<TokenAmount, LedgerError> {
        let state = self.state()?;
        let not_found = || LedgerError::Rpc {
            code: -32602,
            message: format!("Invalid param: could not find account {account}"),
        };
        let Some(Account::Token(token)) = state.accounts.get(account) else {
            return Err(not_found());
        };
        let Some(Account::Mint(mint)) = state.accounts.get(&token.mint) else {
            return Err(not_found());
        };
        Ok(TokenAmount {
            amount: token.amount.to_string(),
            decimals: mint.decimals,
            ui_amount_string: to_ui_string(token.amount, mint.decimals),
        })
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Error raised by one instruction, reported like the node does.
#[derive(Debug)]
struct InstructionError {
    index: usize,
    reason: String,
}

impl From<InstructionError> for Value {
    fn from(e: InstructionError) -> Self {
        json!({ "InstructionError": [e.index, { "Custom": e.reason }] })
    }
}

/// Run every instruction against a copy of `accounts`; the copy is only
/// returned if all of them succeed.
fn execute(
    accounts: &HashMap<Address, Account>,
    message: &Message,
) -> Result<HashMap<Address, Account>, Value> {
    let mut working = accounts.clone();
    for (index, ix) in message.instructions.iter().enumerate() {
        let key = |i: u8| message.account_keys[i as usize];
        let program = key(ix.program_id_index);
        let metas: Vec<(Address, bool)> = ix
            .account_indices
            .iter()
            .map(|i| (key(*i), (*i as usize) < message.num_required_signatures as usize))
            .collect();

        let ctx = Ix {
            accounts: &metas,
            data: &ix.data,
        };
        let result = match program {
            p if p == COMPUTE_BUDGET_PROGRAM_ID => Ok(()),
            p if p == SYSTEM_PROGRAM_ID => system(&mut working, &ctx),
            p if p == TOKEN_PROGRAM_ID || p == TOKEN_2022_PROGRAM_ID => {
                token(&mut working, &ctx, &program)
            }
            p if p == ASSOCIATED_TOKEN_PROGRAM_ID => associated_token(&mut working, &ctx),
            p if p == TOKEN_METADATA_PROGRAM_ID => metadata(&mut working, &ctx),
            other => Err(format!("unsupported program {other}")),
        };
        result.map_err(|reason| Value::from(InstructionError { index, reason }))?;
    }
    Ok(working)
}

struct Ix<'a> {
    accounts: &'a [(Address, bool)],
    data: &'a [u8],
}

impl Ix<'_> {
    fn account(&self, i: usize) -> Result<Address, String> {
        self.accounts
            .get(i)
            .map(|(a, _)| *a)
            .ok_or_else(|| "not enough account keys".to_string())
    }

    fn signer(&self, i: usize) -> Result<Address, String> {
        match self.accounts.get(i) {
            Some((a, true)) => Ok(*a),
            Some((a, false)) => Err(format!("{a} must sign")),
            None => Err("not enough account keys".into()),
        }
    }

    fn u64_at(&self, offset: usize) -> Result<u64, String> {
        self.data
            .get(offset..offset + 8)
            .and_then(|b| b.try_into().ok())
            .map(u64::from_le_bytes)
            .ok_or_else(|| "invalid instruction data".to_string())
    }

    fn address_at(&self, offset: usize) -> Result<Address, String> {
        self.data
            .get(offset..offset + 32)
            .and_then(|b| <[u8; 32]>::try_from(b).ok())
            .map(Address::from)
            .ok_or_else(|| "invalid instruction data".to_string())
    }
}

fn system(accounts: &mut HashMap<Address, Account>, ix: &Ix<'_>) -> Result<(), String> {
    if ix.data.len() != 52 || ix.data[..4] != [0, 0, 0, 0] {
        return Err("unsupported system instruction".into());
    }
    ix.signer(0)?;
    let new_account = ix.signer(1)?;
    let lamports = ix.u64_at(4)?;
    let space = ix.u64_at(12)?;
    let owner = ix.address_at(20)?;

    if accounts.contains_key(&new_account) {
        return Err(format!("account {new_account} already in use"));
    }
    if lamports < rent_exempt_minimum(space) {
        return Err("insufficient funds for rent".into());
    }
    accounts.insert(new_account, Account::Allocated { owner, space });
    Ok(())
}

fn token(
    accounts: &mut HashMap<Address, Account>,
    ix: &Ix<'_>,
    program: &Address,
) -> Result<(), String> {
    match ix.data.first() {
        Some(20) => {
            let mint = ix.account(0)?;
            match accounts.get(&mint) {
                Some(Account::Allocated { owner, space }) if owner == program && *space >= MINT_SIZE => {}
                Some(Account::Allocated { .. }) => return Err("incorrect program id or size".into()),
                _ => return Err(format!("mint {mint} not allocated or already initialized")),
            }
            let decimals = *ix.data.get(1).ok_or("invalid instruction data")?;
            let mint_authority = ix.address_at(2)?;
            let freeze_authority = match ix.data.get(34) {
                Some(1) => Some(ix.address_at(35)?),
                _ => None,
            };
            accounts.insert(
                mint,
                Account::Mint(MintState {
                    decimals,
                    mint_authority: Some(mint_authority),
                    freeze_authority,
                    supply: 0,
                }),
            );
            Ok(())
        }
        Some(7) => {
            let mint_addr = ix.account(0)?;
            let destination = ix.account(1)?;
            let authority = ix.signer(2)?;
            let amount = ix.u64_at(1)?;

            let Some(Account::Mint(mint)) = accounts.get(&mint_addr) else {
                return Err(format!("{mint_addr} is not a mint"));
            };
            if mint.mint_authority != Some(authority) {
                return Err("owner does not match".into());
            }
            let supply = mint.supply.checked_add(amount).ok_or("supply overflow")?;
            let Some(Account::Token(dest)) = accounts.get_mut(&destination) else {
                return Err(format!("{destination} is not a token account"));
            };
            if dest.mint != mint_addr {
                return Err("account not associated with this mint".into());
            }
            dest.amount = dest.amount.checked_add(amount).ok_or("balance overflow")?;
            if let Some(Account::Mint(mint)) = accounts.get_mut(&mint_addr) {
                mint.supply = supply;
            }
            Ok(())
        }
        Some(3) => {
            let source = ix.account(0)?;
            let destination = ix.account(1)?;
            let authority = ix.signer(2)?;
            let amount = ix.u64_at(1)?;

            let Some(Account::Token(src)) = accounts.get(&source) else {
                return Err(format!("{source} is not a token account"));
            };
            if src.owner != authority {
                return Err("owner does not match".into());
            }
            if src.amount < amount {
                return Err("insufficient funds".into());
            }
            let mint = src.mint;
            match accounts.get(&destination) {
                Some(Account::Token(dest)) if dest.mint == mint => {}
                Some(Account::Token(_)) => return Err("account not associated with this mint".into()),
                _ => return Err(format!("{destination} is not a token account")),
            }
            if let Some(Account::Token(src)) = accounts.get_mut(&source) {
                src.amount -= amount;
            }
            if let Some(Account::Token(dest)) = accounts.get_mut(&destination) {
                dest.amount += amount;
            }
            Ok(())
        }
        _ => Err("unsupported token instruction".into()),
    }
}

fn associated_token(accounts: &mut HashMap<Address, Account>, ix: &Ix<'_>) -> Result<(), String> {
    if ix.data != [1] {
        return Err("unsupported associated token instruction".into());
    }
    ix.signer(0)?;
    let ata = ix.account(1)?;
    let owner = ix.account(2)?;
    let mint = ix.account(3)?;
    let token_program = ix.account(5)?;

    let expected = derive_associated_token_address(&owner, &mint, &token_program)
        .map_err(|e| e.to_string())?;
    if ata != expected {
        return Err("associated address does not match seed derivation".into());
    }
    if !matches!(accounts.get(&mint), Some(Account::Mint(_))) {
        return Err(format!("{mint} is not a mint"));
    }
    match accounts.get(&ata) {
        Some(Account::Token(existing)) if existing.owner == owner && existing.mint == mint => Ok(()),
        Some(_) => Err(format!("account {ata} already in use")),
        None => {
            accounts.insert(
                ata,
                Account::Token(TokenAccountState {
                    mint,
                    owner,
                    amount: 0,
                }),
            );
            Ok(())
        }
    }
}

fn metadata(accounts: &mut HashMap<Address, Account>, ix: &Ix<'_>) -> Result<(), String> {
    if ix.data.first() != Some(&33) {
        return Err("unsupported metadata instruction".into());
    }
    let metadata_account = ix.account(0)?;
    let mint_addr = ix.account(1)?;
    let mint_authority = ix.signer(2)?;
    ix.signer(3)?;
    let update_authority = ix.account(4)?;

    let expected = find_metadata_address(&mint_addr).map_err(|e| e.to_string())?;
    if metadata_account != expected {
        return Err("metadata account does not match mint".into());
    }
    let Some(Account::Mint(mint)) = accounts.get(&mint_addr) else {
        return Err(format!("{mint_addr} is not a mint"));
    };
    if mint.mint_authority != Some(mint_authority) {
        return Err("mint authority does not match".into());
    }
    if accounts.contains_key(&metadata_account) {
        return Err("metadata already exists".into());
    }

    let mut cursor = &ix.data[1..];
    let name = borsh_string(&mut cursor)?;
    let symbol = borsh_string(&mut cursor)?;
    let uri = borsh_string(&mut cursor)?;
    // seller fee (2) + creators/collection/uses set to None (3), then is_mutable.
    let is_mutable = match cursor.get(5) {
        Some(b) => *b != 0,
        None => return Err("invalid instruction data".into()),
    };

    accounts.insert(
        metadata_account,
        Account::Metadata(MetadataRecord {
            mint: mint_addr,
            update_authority,
            name,
            symbol,
            uri,
            is_mutable,
        }),
    );
    Ok(())
}

fn borsh_string(cursor: &mut &[u8]) -> Result<String, String> {
    let len = cursor
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or("invalid instruction data")? as usize;
    let bytes = cursor.get(4..4 + len).ok_or("invalid instruction data")?;
    let s = String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())?;
    *cursor = &cursor[4 + len..];
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::KeyPairSigner;
    use crate::signing::sign_transaction_message_with_signers;
    use crate::spl_token::{create_associated_token_idempotent, initialize_mint2, mint_to};
    use crate::system_program::create_account;
    use crate::transaction::{Instruction, TransactionMessage};

    async fn submit(
        ledger: &MemoryLedger,
        ixs: &[Instruction],
        payer: &KeyPairSigner,
        signers: &[&KeyPairSigner],
        skip_preflight: bool,
    ) -> Result<String, LedgerError> {
        let bh = ledger.get_latest_blockhash(Commitment::Confirmed).await?;
        let msg = TransactionMessage::new(ixs, &payer.address(), &bh, signers)?;
        let tx = sign_transaction_message_with_signers(&msg)?;
        ledger
            .send_transaction(
                &tx,
                SendOptions {
                    skip_preflight,
                    ..SendOptions::default()
                },
            )
            .await
    }

    fn create_mint_ixs(payer: &KeyPairSigner, mint: &KeyPairSigner) -> Vec<Instruction> {
        vec![
            create_account(
                &payer.address(),
                &mint.address(),
                rent_exempt_minimum(MINT_SIZE),
                MINT_SIZE,
                &TOKEN_PROGRAM_ID,
            ),
            initialize_mint2(&TOKEN_PROGRAM_ID, &mint.address(), 2, &payer.address(), None).unwrap(),
        ]
    }

    #[tokio::test]
    async fn creates_mint() {
        let ledger = MemoryLedger::new();
        let payer = KeyPairSigner::generate();
        let mint = KeyPairSigner::generate();

        submit(&ledger, &create_mint_ixs(&payer, &mint), &payer, &[&payer, &mint], false)
            .await
            .unwrap();

        let state = ledger.mint(&mint.address()).unwrap();
        assert_eq!(state.decimals, 2);
        assert_eq!(state.mint_authority, Some(payer.address()));
        assert_eq!(state.supply, 0);
        assert_eq!(ledger.get_slot(Commitment::Confirmed).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_preflight_leaves_state_untouched() {
        let ledger = MemoryLedger::new();
        let payer = KeyPairSigner::generate();
        let mint = KeyPairSigner::generate();
        let mut ixs = create_mint_ixs(&payer, &mint);
        // Minting before an ATA exists fails the whole transaction.
        let ata = derive_associated_token_address(&payer.address(), &mint.address(), &TOKEN_PROGRAM_ID)
            .unwrap();
        ixs.push(mint_to(&TOKEN_PROGRAM_ID, &mint.address(), &ata, &payer.address(), 5).unwrap());

        let err = submit(&ledger, &ixs, &payer, &[&payer, &mint], false)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rpc { code: -32002, .. }));
        assert!(ledger.mint(&mint.address()).is_none());
    }

    #[tokio::test]
    async fn skip_preflight_records_failed_status() {
        let ledger = MemoryLedger::new();
        let payer = KeyPairSigner::generate();
        let mint = KeyPairSigner::generate().address();
        let ix = create_associated_token_idempotent(
            &payer.address(),
            &payer.address(),
            &mint,
            &TOKEN_PROGRAM_ID,
        )
        .unwrap();

        let sig = submit(&ledger, &[ix], &payer, &[&payer], true).await.unwrap();
        let statuses = ledger.get_signature_statuses(&[sig]).await.unwrap();
        let status = statuses[0].as_ref().unwrap();
        assert!(status.err.as_ref().unwrap().get("InstructionError").is_some());
    }

    #[tokio::test]
    async fn expired_blockhash_is_rejected() {
        let ledger = MemoryLedger::new();
        let payer = KeyPairSigner::generate();
        let mint = KeyPairSigner::generate();
        let bh = ledger.get_latest_blockhash(Commitment::Confirmed).await.unwrap();
        ledger.advance_blocks(BLOCKHASH_VALIDITY + 1);

        let msg = TransactionMessage::new(
            &create_mint_ixs(&payer, &mint),
            &payer.address(),
            &bh,
            &[&payer, &mint],
        )
        .unwrap();
        let tx = sign_transaction_message_with_signers(&msg).unwrap();
        let err = ledger
            .send_transaction(&tx, SendOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Blockhash not found"));
    }

    #[tokio::test]
    async fn unknown_balance_account_errors() {
        let ledger = MemoryLedger::new();
        let result = ledger
            .get_token_account_balance(&Address::new([1; 32]), Commitment::Confirmed)
            .await;
        assert!(matches!(result, Err(LedgerError::Rpc { code: -32602, .. })));
    }

    #[test]
    fn borsh_string_reads_and_advances() {
        let data = [3u8, 0, 0, 0, b'a', b'b', b'c', 9];
        let mut cursor = &data[..];
        assert_eq!(borsh_string(&mut cursor).unwrap(), "abc");
        assert_eq!(cursor, &[9]);
    }
}
