//! Named network environments and their RPC endpoints.

use std::fmt;
use std::str::FromStr;

use url::{form_urlencoded, Url};

use crate::error::LedgerError;

const DEVNET_RPC: &str = "https://api.devnet.solana.com";
const TESTNET_RPC: &str = "https://api.testnet.solana.com";
const MAINNET_RPC: &str = "https://api.mainnet-beta.solana.com";
const LOCALNET_RPC: &str = "http://127.0.0.1:8899";

/// A Solana cluster, either by moniker or as an explicit RPC URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cluster {
    Devnet,
    Testnet,
    Mainnet,
    Localnet,
    Custom(Url),
}

impl Cluster {
    /// JSON-RPC endpoint for this cluster.
    pub fn rpc_url(&self) -> String {
        match self {
            Cluster::Devnet => DEVNET_RPC.to_string(),
            Cluster::Testnet => TESTNET_RPC.to_string(),
            Cluster::Mainnet => MAINNET_RPC.to_string(),
            Cluster::Localnet => LOCALNET_RPC.to_string(),
            Cluster::Custom(url) => url.to_string(),
        }
    }

    /// Query suffix the block explorer needs to show this cluster.
    ///
    /// Mainnet is the explorer's default and gets no suffix.
    pub fn explorer_query(&self) -> String {
        match self {
            Cluster::Mainnet => String::new(),
            Cluster::Devnet => "?cluster=devnet".to_string(),
            Cluster::Testnet => "?cluster=testnet".to_string(),
            Cluster::Localnet => custom_query("http://localhost:8899"),
            Cluster::Custom(url) => custom_query(url.as_str()),
        }
    }
}

fn custom_query(url: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("cluster", "custom")
        .append_pair("customUrl", url)
        .finish();
    format!("?{query}")
}

impl FromStr for Cluster {
    type Err = LedgerError;

    fn from_str(moniker: &str) -> Result<Self, Self::Err> {
        match moniker.trim() {
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet" | "mainnet-beta" => Ok(Cluster::Mainnet),
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            other if other.starts_with("http://") || other.starts_with("https://") => {
                Url::parse(other)
                    .map(Cluster::Custom)
                    .map_err(|e| LedgerError::InvalidCluster(format!("{other}: {e}")))
            }
            other => Err(LedgerError::InvalidCluster(other.to_string())),
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cluster::Devnet => f.write_str("devnet"),
            Cluster::Testnet => f.write_str("testnet"),
            Cluster::Mainnet => f.write_str("mainnet"),
            Cluster::Localnet => f.write_str("localnet"),
            Cluster::Custom(url) => f.write_str(url.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_monikers() {
        assert_eq!("devnet".parse::<Cluster>().unwrap(), Cluster::Devnet);
        assert_eq!("testnet".parse::<Cluster>().unwrap(), Cluster::Testnet);
        assert_eq!("mainnet".parse::<Cluster>().unwrap(), Cluster::Mainnet);
        assert_eq!("mainnet-beta".parse::<Cluster>().unwrap(), Cluster::Mainnet);
        assert_eq!("localnet".parse::<Cluster>().unwrap(), Cluster::Localnet);
    }

    #[test]
    fn parses_custom_url() {
        let cluster: Cluster = "http://10.0.0.5:8899".parse().unwrap();
        assert_eq!(cluster.rpc_url(), "http://10.0.0.5:8899/");
    }

    #[test]
    fn unknown_moniker_is_rejected() {
        let err = "moonnet".parse::<Cluster>().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidCluster(m) if m == "moonnet"));
    }

    #[test]
    fn devnet_rpc_url() {
        assert_eq!(Cluster::Devnet.rpc_url(), "https://api.devnet.solana.com");
    }

    #[test]
    fn display_roundtrips_monikers() {
        for cluster in [Cluster::Devnet, Cluster::Testnet, Cluster::Mainnet, Cluster::Localnet] {
            let parsed: Cluster = cluster.to_string().parse().unwrap();
            assert_eq!(parsed, cluster);
        }
    }

    #[test]
    fn explorer_query_per_cluster() {
        assert_eq!(Cluster::Mainnet.explorer_query(), "");
        assert_eq!(Cluster::Devnet.explorer_query(), "?cluster=devnet");
        assert_eq!(
            Cluster::Localnet.explorer_query(),
            "?cluster=custom&customUrl=http%3A%2F%2Flocalhost%3A8899"
        );
    }

    #[test]
    fn custom_url_query_is_escaped() {
        let cluster: Cluster = "https://rpc.example.com/?api-key=abc&x=1".parse().unwrap();
        assert_eq!(
            cluster.explorer_query(),
            "?cluster=custom&customUrl=https%3A%2F%2Frpc.example.com%2F%3Fapi-key%3Dabc%26x%3D1"
        );
    }
}
