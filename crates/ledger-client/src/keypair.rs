//! Ed25519 signing identities.
//!
//! Solana keypairs are stored as 64 bytes: the 32-byte Ed25519 secret seed
//! followed by the 32-byte public key. Wallets export that blob either as a
//! Base58 string or as a JSON array of byte values; both are accepted here.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};
use rand_core::OsRng;
use zeroize::{Zeroize, Zeroizing};

use crate::address::Address;
use crate::error::LedgerError;

/// Length of a serialized keypair: secret seed + public key.
pub const KEYPAIR_LENGTH: usize = 64;

/// A keypair able to authorize transactions for its address.
#[derive(Clone)]
pub struct KeyPairSigner {
    signing_key: SigningKey,
    address: Address,
}

impl KeyPairSigner {
    /// Generate a fresh random identity from the OS RNG.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Load a keypair from its 64-byte `secret || public` layout.
    ///
    /// The public half must match the key derived from the secret half.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        if bytes.len() != KEYPAIR_LENGTH {
            return Err(LedgerError::InvalidPrivateKey(format!(
                "expected {KEYPAIR_LENGTH} bytes, got {}",
                bytes.len()
            )));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();

        if signing_key.verifying_key().as_bytes() != &bytes[32..] {
            return Err(LedgerError::InvalidPrivateKey(
                "public key does not match secret key".into(),
            ));
        }

        Ok(Self::from_signing_key(signing_key))
    }

    /// Decode a Base58-encoded 64-byte keypair.
    pub fn from_base58(encoded: &str) -> Result<Self, LedgerError> {
        let bytes = Zeroizing::new(
            bs58::decode(encoded.trim())
                .into_vec()
                .map_err(|e| LedgerError::InvalidPrivateKey(format!("base58 decode failed: {e}")))?,
        );
        Self::from_bytes(&bytes)
    }

    /// Decode a keypair file body such as `[174, 47, 154, ...]`.
    pub fn from_json_bytes(json: &str) -> Result<Self, LedgerError> {
        let bytes: Zeroizing<Vec<u8>> = Zeroizing::new(
            serde_json::from_str(json)
                .map_err(|e| LedgerError::InvalidPrivateKey(format!("json decode failed: {e}")))?,
        );
        Self::from_bytes(&bytes)
    }

    /// The address this keypair signs for.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign arbitrary message bytes.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// The 64-byte `secret || public` layout `from_bytes` reads.
    pub fn to_bytes(&self) -> Zeroizing<[u8; KEYPAIR_LENGTH]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }

    /// Export as a Base58 string in the same layout `from_base58` reads.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.to_bytes()[..]).into_string()
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = Address::new(signing_key.verifying_key().to_bytes());
        Self {
            signing_key,
            address,
        }
    }
}

impl fmt::Debug for KeyPairSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
