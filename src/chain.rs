//! Chain registry for the mocknet
//!
//! Every chain the tool can touch is described once in a static capability
//! table: display name, address prefix, native asset decimals, and the
//! default RPC URL of its docker mocknet node. Callers select a record at
//! startup instead of re-dispatching on chain-name strings per call.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

/// Chains with mocknet nodes or alias tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Btc,
    Dash,
    Eth,
    Arb,
    Avax,
    Kuji,
    Thor,
    Maya,
    Xrd,
}

/// Static per-chain capability record.
#[derive(Debug, Clone)]
pub struct ChainParams {
    /// Canonical short name, as used in memos and on the CLI.
    pub name: &'static str,
    /// Expected address prefix on this network, where the chain has a
    /// meaningful one.
    pub address_prefix: Option<&'static str>,
    /// Decimals of the chain's native asset.
    pub decimals: u32,
    /// RPC URL of the chain's node inside the docker mocknet.
    pub default_rpc_url: &'static str,
}

/// One row per chain, looked up by [`Chain::params`].
static REGISTRY: &[(Chain, ChainParams)] = &[
    (
        Chain::Btc,
        ChainParams {
            name: "BTC",
            address_prefix: Some("bcrt1"),
            decimals: 8,
            default_rpc_url: "http://bitcoin:18443",
        },
    ),
    (
        Chain::Dash,
        ChainParams {
            name: "DASH",
            address_prefix: None,
            decimals: 8,
            default_rpc_url: "http://dash:19898",
        },
    ),
    (
        Chain::Eth,
        ChainParams {
            name: "ETH",
            address_prefix: Some("0x"),
            decimals: 18,
            default_rpc_url: "http://ethereum:8545",
        },
    ),
    (
        Chain::Arb,
        ChainParams {
            name: "ARB",
            address_prefix: Some("0x"),
            decimals: 18,
            default_rpc_url: "http://arbitrum:8547",
        },
    ),
    (
        Chain::Avax,
        ChainParams {
            name: "AVAX",
            address_prefix: Some("0x"),
            decimals: 18,
            default_rpc_url: "http://avalanche:9650/ext/bc/C/rpc",
        },
    ),
    (
        Chain::Kuji,
        ChainParams {
            name: "KUJI",
            address_prefix: Some("kujira"),
            decimals: 6,
            default_rpc_url: "http://kujira:26657",
        },
    ),
    (
        Chain::Thor,
        ChainParams {
            name: "THOR",
            address_prefix: Some("tthor"),
            decimals: 8,
            default_rpc_url: "http://thornode:1317",
        },
    ),
    (
        Chain::Maya,
        ChainParams {
            name: "MAYA",
            address_prefix: Some("tmaya"),
            decimals: 10,
            default_rpc_url: "http://mayanode:1317",
        },
    ),
    (
        Chain::Xrd,
        ChainParams {
            name: "XRD",
            address_prefix: Some("account_"),
            decimals: 18,
            default_rpc_url: "http://radix:3333/core",
        },
    ),
];

impl Chain {
    /// All registered chains, in table order.
    pub fn all() -> impl Iterator<Item = Chain> {
        REGISTRY.iter().map(|(chain, _)| *chain)
    }

    /// The chain's capability record.
    pub fn params(self) -> &'static ChainParams {
        REGISTRY
            .iter()
            .find(|(chain, _)| *chain == self)
            .map(|(_, params)| params)
            .expect("every Chain variant has a registry row")
    }

    pub fn name(self) -> &'static str {
        self.params().name
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Chain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        REGISTRY
            .iter()
            .find(|(_, params)| params.name == upper)
            .map(|(chain, _)| *chain)
            .ok_or_else(|| anyhow!("unsupported chain: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_chain_has_params() {
        for chain in Chain::all() {
            let params = chain.params();
            assert!(!params.name.is_empty());
            assert!(!params.default_rpc_url.is_empty());
        }
    }

    #[test]
    fn test_from_str_round_trip() {
        for chain in Chain::all() {
            assert_eq!(chain.name().parse::<Chain>().unwrap(), chain);
            assert_eq!(chain.name().to_lowercase().parse::<Chain>().unwrap(), chain);
        }
        assert!("BNB".parse::<Chain>().is_err());
    }

    #[test]
    fn test_known_prefixes() {
        assert_eq!(Chain::Xrd.params().address_prefix, Some("account_"));
        assert_eq!(Chain::Maya.params().address_prefix, Some("tmaya"));
        assert_eq!(Chain::Dash.params().address_prefix, None);
    }
}
