//! Signing compiled messages and handling signed wire transactions.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature, VerifyingKey};

use crate::address::Address;
use crate::error::LedgerError;
use crate::keypair::KeyPairSigner;
use crate::transaction::{decode_compact_u16, encode_compact_u16, Message, TransactionMessage};

/// A fully signed transaction, ready for `sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// One signature per declared signer, in account-key order.
    pub signatures: Vec<[u8; 64]>,
    pub message: Message,
    message_bytes: Vec<u8>,
    /// Carried over from the blockhash the message was built against.
    pub last_valid_block_height: u64,
}

impl SignedTransaction {
    /// Wire format: compact-u16 count, signatures, message.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(3 + 64 * self.signatures.len() + self.message_bytes.len());
        wire.extend_from_slice(&encode_compact_u16(self.signatures.len() as u16));
        for sig in &self.signatures {
            wire.extend_from_slice(sig);
        }
        wire.extend_from_slice(&self.message_bytes);
        wire
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_wire_bytes())
    }
}

/// Sign a message with every signer it carries.
///
/// Each address in the declared signer set must have a matching signer,
/// otherwise nothing is signed and [`LedgerError::MissingSigner`] names the
/// first address without one.
pub fn sign_transaction_message_with_signers(
    tx: &TransactionMessage,
) -> Result<SignedTransaction, LedgerError> {
    let required = tx.message.signer_addresses();

    let mut ordered: Vec<&KeyPairSigner> = Vec::with_capacity(required.len());
    for addr in required {
        let signer = tx
            .signers
            .iter()
            .find(|s| s.address() == *addr)
            .ok_or(LedgerError::MissingSigner(*addr))?;
        ordered.push(signer);
    }

    let message_bytes = tx.message.serialize()?;
    let signatures = ordered.iter().map(|s| s.sign(&message_bytes)).collect();

    Ok(SignedTransaction {
        signatures,
        message: tx.message.clone(),
        message_bytes,
        last_valid_block_height: tx.last_valid_block_height,
    })
}

/// The transaction's canonical identifier: the fee payer's signature in Base58.
pub fn get_signature_from_transaction(tx: &SignedTransaction) -> Result<String, LedgerError> {
    tx.signatures
        .first()
        .map(|sig| bs58::encode(sig).into_string())
        .ok_or_else(|| LedgerError::Signing("transaction has no signatures".into()))
}

// ---------------------------------------------------------------------------
// Wire transactions
// ---------------------------------------------------------------------------

/// Split a wire-format transaction into its signatures and parsed message.
pub fn decode_wire_transaction(raw: &[u8]) -> Result<(Vec<[u8; 64]>, Message), LedgerError> {
    let (num_sigs, compact_len) = decode_compact_u16(raw)?;

    if num_sigs == 0 {
        return Err(LedgerError::TransactionBuild(
            "transaction has zero signatures".into(),
        ));
    }

    let sigs_end = compact_len + num_sigs as usize * 64;
    if sigs_end > raw.len() {
        return Err(LedgerError::Serialization(
            "transaction too short: signature slots exceed length".into(),
        ));
    }

    let signatures = raw[compact_len..sigs_end]
        .chunks_exact(64)
        .map(|chunk| {
            let mut sig = [0u8; 64];
            sig.copy_from_slice(chunk);
            sig
        })
        .collect();

    let message = Message::deserialize(&raw[sigs_end..])?;
    Ok((signatures, message))
}

/// Check every signature against its signer address.
pub fn verify_signatures(
    signatures: &[[u8; 64]],
    message: &Message,
) -> Result<(), LedgerError> {
    let signers = message.signer_addresses();
    if signatures.len() != signers.len() {
        return Err(LedgerError::Signing(format!(
            "expected {} signatures, got {}",
            signers.len(),
            signatures.len()
        )));
    }

    let message_bytes = message.serialize()?;
    for (sig, addr) in signatures.iter().zip(signers) {
        verify_one(sig, addr, &message_bytes)?;
    }
    Ok(())
}

fn verify_one(sig: &[u8; 64], addr: &Address, message_bytes: &[u8]) -> Result<(), LedgerError> {
    let key = VerifyingKey::from_bytes(addr.as_bytes())
        .map_err(|e| LedgerError::Signing(format!("{addr}: {e}")))?;
    key.verify_strict(message_bytes, &Signature::from_bytes(sig))
        .map_err(|_| LedgerError::Signing(format!("signature for {addr} does not verify")))
}
