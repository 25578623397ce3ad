//! Demo settings, embedded as literals.
//!
//! The secret key may be Base58 (Phantom / Solflare export) or a JSON byte
//! array (`solana-keygen` file contents). The compiled-in value is a
//! placeholder and must be replaced before running against a cluster.

use ledger_client::{KeyPairSigner, LedgerError, TokenMetadata};
use secrecy::{ExposeSecret, SecretString};

const DEFAULT_CLUSTER: &str = "devnet";
const DEFAULT_SECRET_KEY: &str = "your_wallet_secret_key";
const DEFAULT_RECIPIENT: &str = "4d4zsfq4gtJixDGvisSdFjsY78uH7BypkwmkXL1D8RfT";

const TOKEN_NAME: &str = "Only Possible On Solana";
const TOKEN_SYMBOL: &str = "OPOS";
const TOKEN_URI: &str =
    "https://raw.githubusercontent.com/solana-developers/opos-asset/main/assets/Climate/metadata.json";

#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Cluster moniker or RPC URL.
    pub cluster: String,
    /// Fee payer, mint authority and token owner ("alice").
    pub secret_key: SecretString,
    /// Transfer recipient ("bob").
    pub recipient: String,
    pub metadata: TokenMetadata,
    pub decimals: u8,
    /// Base units minted to alice.
    pub mint_amount: u64,
    /// Base units moved from alice to bob.
    pub transfer_amount: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            cluster: DEFAULT_CLUSTER.into(),
            secret_key: SecretString::from(DEFAULT_SECRET_KEY),
            recipient: DEFAULT_RECIPIENT.into(),
            metadata: TokenMetadata {
                name: TOKEN_NAME.into(),
                symbol: TOKEN_SYMBOL.into(),
                uri: TOKEN_URI.into(),
                is_mutable: true,
            },
            decimals: 2,
            mint_amount: 1000,
            transfer_amount: 900,
        }
    }
}

impl DemoConfig {
    /// Decode the configured secret key into alice's signer.
    pub fn signer(&self) -> Result<KeyPairSigner, LedgerError> {
        let secret = self.secret_key.expose_secret().trim();
        if secret.starts_with('[') {
            KeyPairSigner::from_json_bytes(secret)
        } else {
            KeyPairSigner::from_base58(secret)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_literals() {
        let config = DemoConfig::default();
        assert_eq!(config.cluster, "devnet");
        assert_eq!(config.recipient, DEFAULT_RECIPIENT);
        assert_eq!(config.metadata.name, "Only Possible On Solana");
        assert_eq!(config.metadata.symbol, "OPOS");
        assert!(config.metadata.is_mutable);
        assert_eq!(config.decimals, 2);
        assert_eq!(config.mint_amount, 1000);
        assert_eq!(config.transfer_amount, 900);
    }

    #[test]
    fn placeholder_secret_does_not_decode() {
        let err = DemoConfig::default().signer().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPrivateKey(_)));
    }

    #[test]
    fn base58_secret_is_accepted() {
        let key = KeyPairSigner::generate();
        let config = DemoConfig {
            secret_key: SecretString::from(key.to_base58()),
            ..DemoConfig::default()
        };
        assert_eq!(config.signer().unwrap().address(), key.address());
    }

    #[test]
    fn json_array_secret_is_accepted() {
        let key = KeyPairSigner::generate();
        let json = format!(
            "[{}]",
            key.to_bytes().iter().map(u8::to_string).collect::<Vec<_>>().join(",")
        );
        let config = DemoConfig {
            secret_key: SecretString::from(json),
            ..DemoConfig::default()
        };
        assert_eq!(config.signer().unwrap().address(), key.address());
    }

    #[test]
    fn secret_is_redacted_in_debug() {
        let config = DemoConfig {
            secret_key: SecretString::from("super-secret-value"),
            ..DemoConfig::default()
        };
        assert!(!format!("{config:?}").contains("super-secret-value"));
    }
}
