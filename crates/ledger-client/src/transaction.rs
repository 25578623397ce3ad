//! Legacy Solana transaction wire format.
//!
//! We build Solana transactions entirely by hand, with no `solana-sdk`
//! dependency. The wire format is a compact binary layout:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use crate::address::Address;
use crate::error::LedgerError;
use crate::keypair::KeyPairSigner;
use crate::rpc::LatestBlockhash;

/// Account keys are referenced by u8 index inside compiled instructions.
const MAX_ACCOUNTS: usize = 256;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value from a byte slice.
///
/// Returns `(value, bytes_consumed)` or an error if the data is truncated.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), LedgerError> {
    let mut value: u32 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            LedgerError::Serialization("unexpected end of data while decoding compact-u16".into())
        })?;
        consumed += 1;

        value |= ((byte & 0x7f) as u32) << shift;
        shift += 7;

        if byte & 0x80 == 0 || consumed >= 3 {
            break;
        }
    }

    if value > u16::MAX as u32 {
        return Err(LedgerError::Serialization(
            "compact-u16 value overflow".into(),
        ));
    }

    Ok((value as u16, consumed))
}

fn compact_len(len: usize, what: &str) -> Result<Vec<u8>, LedgerError> {
    let len = u16::try_from(len)
        .map_err(|_| LedgerError::Serialization(format!("too many {what}: {len}")))?;
    Ok(encode_compact_u16(len))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in a Solana instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: false,
        }
    }
}

/// A Solana instruction (before it is compiled into a message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled instruction where account references are replaced by u8 indices
/// into the message's `account_keys` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// A compiled legacy message: the bytes every signer signs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// All account keys referenced by this message, in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Address>,

    /// Number of required signatures (first N accounts are signers).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,

    pub recent_blockhash: [u8; 32],

    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// The declared signer set: the first `num_required_signatures` keys.
    pub fn signer_addresses(&self) -> &[Address] {
        let n = (self.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    /// Serialize the message (the bytes that get signed).
    pub fn serialize(&self) -> Result<Vec<u8>, LedgerError> {
        let mut buf = Vec::with_capacity(256);

        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed);
        buf.push(self.num_readonly_unsigned);

        buf.extend_from_slice(&compact_len(self.account_keys.len(), "account keys")?);
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(&self.recent_blockhash);

        buf.extend_from_slice(&compact_len(self.instructions.len(), "instructions")?);
        for ix in &self.instructions {
            buf.push(ix.program_id_index);

            buf.extend_from_slice(&compact_len(ix.account_indices.len(), "instruction accounts")?);
            buf.extend_from_slice(&ix.account_indices);

            buf.extend_from_slice(&compact_len(ix.data.len(), "instruction data bytes")?);
            buf.extend_from_slice(&ix.data);
        }

        Ok(buf)
    }

    /// Parse a serialized message back into its compiled form.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, LedgerError> {
        let mut reader = Reader { bytes, pos: 0 };

        let num_required_signatures = reader.u8()?;
        let num_readonly_signed = reader.u8()?;
        let num_readonly_unsigned = reader.u8()?;

        let num_accounts = reader.compact()?;
        let mut account_keys = Vec::with_capacity(num_accounts);
        for _ in 0..num_accounts {
            account_keys.push(Address::new(reader.array()?));
        }

        let recent_blockhash = reader.array()?;

        let num_instructions = reader.compact()?;
        let mut instructions = Vec::with_capacity(num_instructions);
        for _ in 0..num_instructions {
            let program_id_index = reader.u8()?;
            let n = reader.compact()?;
            let account_indices = reader.take(n)?.to_vec();
            let len = reader.compact()?;
            let data = reader.take(len)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                account_indices,
                data,
            });
        }

        if reader.pos != bytes.len() {
            return Err(LedgerError::Serialization(
                "trailing bytes after message".into(),
            ));
        }

        Ok(Self {
            account_keys,
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            recent_blockhash,
            instructions,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], LedgerError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len());
        let end = end.ok_or_else(|| LedgerError::Serialization("message truncated".into()))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, LedgerError> {
        Ok(self.take(1)?[0])
    }

    fn array(&mut self) -> Result<[u8; 32], LedgerError> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.take(32)?);
        Ok(out)
    }

    fn compact(&mut self) -> Result<usize, LedgerError> {
        let (value, consumed) = decode_compact_u16(&self.bytes[self.pos..])?;
        self.pos += consumed;
        Ok(value as usize)
    }
}

/// An unsigned transaction: a compiled message plus the signers the builder
/// attached to it.
#[derive(Debug, Clone)]
pub struct TransactionMessage {
    pub message: Message,
    pub signers: Vec<KeyPairSigner>,
    /// Block height after which the network rejects this message.
    pub last_valid_block_height: u64,
}

impl TransactionMessage {
    /// Compile `instructions` and attach `signers`.
    ///
    /// Signers whose address is not part of the declared signer set are
    /// dropped; duplicates are kept once.
    pub fn new(
        instructions: &[Instruction],
        fee_payer: &Address,
        latest_blockhash: &LatestBlockhash,
        signers: &[&KeyPairSigner],
    ) -> Result<Self, LedgerError> {
        let blockhash = latest_blockhash.blockhash_bytes()?;
        let message = compile_message(instructions, fee_payer, &blockhash)?;

        let mut attached: Vec<KeyPairSigner> = Vec::with_capacity(signers.len());
        for signer in signers {
            let addr = signer.address();
            if message.signer_addresses().contains(&addr)
                && !attached.iter().any(|s| s.address() == addr)
            {
                attached.push((*signer).clone());
            }
        }

        Ok(Self {
            message,
            signers: attached,
            last_valid_block_height: latest_blockhash.last_valid_block_height,
        })
    }
}

// ---------------------------------------------------------------------------
// Message compilation
// ---------------------------------------------------------------------------

/// Compile instructions into a message with a single fee payer.
///
/// The fee payer is always the first signer and is placed at index 0 in the
/// account keys.
pub fn compile_message(
    instructions: &[Instruction],
    fee_payer: &Address,
    recent_blockhash: &[u8; 32],
) -> Result<Message, LedgerError> {
    if instructions.is_empty() {
        return Err(LedgerError::TransactionBuild(
            "message has no instructions".into(),
        ));
    }

    // Instruction account lists are tiny, a Vec beats a map here.
    let mut entries: Vec<AccountMeta> = Vec::new();

    let mut upsert = |address: Address, signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.address == address) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountMeta {
                address,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    upsert(*fee_payer, true, true);

    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.address, meta.is_signer, meta.is_writable);
        }
        upsert(ix.program_id, false, false);
    }

    if entries.len() > MAX_ACCOUNTS {
        return Err(LedgerError::TransactionBuild(format!(
            "too many accounts: {}",
            entries.len()
        )));
    }

    // Stable sort keeps insertion order within a category, so the fee payer
    // stays at index 0.
    entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    let header_count = |what: &str, keep: fn(&AccountMeta) -> bool| -> Result<u8, LedgerError> {
        let count = entries.iter().filter(|e| keep(e)).count();
        u8::try_from(count).map_err(|_| {
            LedgerError::TransactionBuild(format!("too many {what}: {count}"))
        })
    };
    let num_signers = header_count("signers", |e| e.is_signer)?;
    let num_readonly_signed = header_count("read-only signers", |e| e.is_signer && !e.is_writable)?;
    let num_readonly_unsigned =
        header_count("read-only accounts", |e| !e.is_signer && !e.is_writable)?;

    let account_keys: Vec<Address> = entries.iter().map(|e| e.address).collect();

    let index_of = |address: &Address, what: &str| -> Result<u8, LedgerError> {
        account_keys
            .iter()
            .position(|k| k == address)
            .map(|i| i as u8)
            .ok_or_else(|| LedgerError::TransactionBuild(format!("{what} not in account keys")))
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let program_id_index = index_of(&ix.program_id, "program id")?;

        let account_indices = ix
            .accounts
            .iter()
            .map(|meta| index_of(&meta.address, "account"))
            .collect::<Result<Vec<u8>, _>>()?;

        compiled.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data: ix.data.clone(),
        });
    }

    Ok(Message {
        account_keys,
        num_required_signatures: num_signers,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        instructions: compiled,
    })
}
