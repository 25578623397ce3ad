//! Block explorer links.

use crate::address::Address;
use crate::cluster::Cluster;

const EXPLORER_BASE: &str = "https://explorer.solana.com";

/// What an explorer link points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorerLink<'a> {
    Transaction(&'a str),
    Address(&'a Address),
    Block(u64),
}

/// Format a human-facing explorer URL for `target` on `cluster`.
pub fn get_explorer_link(target: ExplorerLink<'_>, cluster: &Cluster) -> String {
    let path = match target {
        ExplorerLink::Transaction(signature) => format!("tx/{signature}"),
        ExplorerLink::Address(address) => format!("address/{address}"),
        ExplorerLink::Block(slot) => format!("block/{slot}"),
    };
    format!("{EXPLORER_BASE}/{path}{}", cluster.explorer_query())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devnet_transaction_link() {
        let link = get_explorer_link(ExplorerLink::Transaction("5abc"), &Cluster::Devnet);
        assert_eq!(link, "https://explorer.solana.com/tx/5abc?cluster=devnet");
    }

    #[test]
    fn mainnet_has_no_cluster_param() {
        let link = get_explorer_link(ExplorerLink::Block(42), &Cluster::Mainnet);
        assert_eq!(link, "https://explorer.solana.com/block/42");
    }

    #[test]
    fn address_link_uses_base58() {
        let addr = Address::new([0u8; 32]);
        let link = get_explorer_link(ExplorerLink::Address(&addr), &Cluster::Testnet);
        assert_eq!(
            link,
            "https://explorer.solana.com/address/11111111111111111111111111111111?cluster=testnet"
        );
    }

    #[test]
    fn localnet_link_carries_custom_url() {
        let link = get_explorer_link(ExplorerLink::Transaction("sig"), &Cluster::Localnet);
        assert!(link.ends_with("?cluster=custom&customUrl=http%3A%2F%2Flocalhost%3A8899"));
    }
}
