//! Static per-chain metadata used by the fetchers and the runtime
//!
//! Every supported network carries its chain id, a public RPC endpoint, the block
//! explorer it is verified on, and its native currency symbol.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::{Error, Result};

/// Metadata for one supported network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkConfig {
    /// Canonical lowercase name (e.g. "mainnet", "polygon")
    pub name: &'static str,
    pub display_name: &'static str,
    pub chain_id: u64,
    /// Public RPC endpoint used when no override is configured
    pub rpc_url: &'static str,
    /// Block explorer web URL
    pub explorer_url: &'static str,
    pub currency: &'static str,
    pub testnet: bool,
    /// Alternative names accepted on lookup
    #[serde(skip)]
    pub aliases: &'static [&'static str],
}

impl NetworkConfig {
    /// Explorer link for an address on this network.
    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{}", self.explorer_url, address)
    }

    /// Explorer link for a transaction on this network.
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }
}

static NETWORKS: Lazy<Vec<NetworkConfig>> = Lazy::new(|| {
    vec![
        NetworkConfig {
            name: "mainnet",
            display_name: "Ethereum Mainnet",
            chain_id: 1,
            rpc_url: "https://eth.llamarpc.com",
            explorer_url: "https://etherscan.io",
            currency: "ETH",
            testnet: false,
            aliases: &["ethereum", "eth", "homestead"],
        },
        NetworkConfig {
            name: "sepolia",
            display_name: "Sepolia Testnet",
            chain_id: 11155111,
            rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
            explorer_url: "https://sepolia.etherscan.io",
            currency: "ETH",
            testnet: true,
            aliases: &[],
        },
        NetworkConfig {
            name: "polygon",
            display_name: "Polygon PoS",
            chain_id: 137,
            rpc_url: "https://polygon-rpc.com",
            explorer_url: "https://polygonscan.com",
            currency: "POL",
            testnet: false,
            aliases: &["matic"],
        },
        NetworkConfig {
            name: "arbitrum",
            display_name: "Arbitrum One",
            chain_id: 42161,
            rpc_url: "https://arb1.arbitrum.io/rpc",
            explorer_url: "https://arbiscan.io",
            currency: "ETH",
            testnet: false,
            aliases: &["arbitrum-one", "arb"],
        },
        NetworkConfig {
            name: "optimism",
            display_name: "OP Mainnet",
            chain_id: 10,
            rpc_url: "https://mainnet.optimism.io",
            explorer_url: "https://optimistic.etherscan.io",
            currency: "ETH",
            testnet: false,
            aliases: &["op"],
        },
        NetworkConfig {
            name: "base",
            display_name: "Base",
            chain_id: 8453,
            rpc_url: "https://mainnet.base.org",
            explorer_url: "https://basescan.org",
            currency: "ETH",
            testnet: false,
            aliases: &[],
        },
        NetworkConfig {
            name: "bsc",
            display_name: "BNB Smart Chain",
            chain_id: 56,
            rpc_url: "https://bsc-dataseed.bnbchain.org",
            explorer_url: "https://bscscan.com",
            currency: "BNB",
            testnet: false,
            aliases: &["bnb", "binance"],
        },
        NetworkConfig {
            name: "avalanche",
            display_name: "Avalanche C-Chain",
            chain_id: 43114,
            rpc_url: "https://api.avax.network/ext/bc/C/rpc",
            explorer_url: "https://snowtrace.io",
            currency: "AVAX",
            testnet: false,
            aliases: &["avax"],
        },
    ]
});

/// All supported networks in display order.
pub fn all_networks() -> &'static [NetworkConfig] {
    &NETWORKS
}

/// Find a network by name, alias, or chain id (case-insensitive).
pub fn find_network(query: &str) -> Option<&'static NetworkConfig> {
    let query = query.trim();

    if let Ok(chain_id) = query.parse::<u64>() {
        return NETWORKS.iter().find(|n| n.chain_id == chain_id);
    }

    let query_lower = query.to_lowercase();
    NETWORKS.iter().find(|n| {
        n.name == query_lower || n.aliases.iter().any(|alias| *alias == query_lower)
    })
}

/// Like [`find_network`], but unknown networks are an error.
pub fn get_network(query: &str) -> Result<&'static NetworkConfig> {
    find_network(query).ok_or_else(|| Error::UnknownNetwork(query.to_string()))
}

/// Look a network up by chain id.
pub fn network_by_chain_id(chain_id: u64) -> Option<&'static NetworkConfig> {
    NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Format a network as a multi-line description.
pub fn format_network_info(network: &NetworkConfig) -> String {
    let mut response = format!(
        "Network: {} ({})\nChain ID: {}\nCurrency: {}\n",
        network.display_name, network.name, network.chain_id, network.currency
    );
    if network.testnet {
        response.push_str("Testnet: true\n");
    }
    response.push_str(&format!("RPC: {}\n", network.rpc_url));
    response.push_str(&format!("Explorer: {}\n", network.explorer_url));
    if !network.aliases.is_empty() {
        response.push_str(&format!("Aliases: {}\n", network.aliases.join(", ")));
    }
    response
}

/// Format every supported network as a table.
pub fn format_network_table() -> String {
    let mut response = format!(
        "{:<12} {:>10}  {:<6} {:<8} {}\n",
        "NAME", "CHAIN ID", "SYMBOL", "TESTNET", "EXPLORER"
    );
    for network in all_networks() {
        response.push_str(&format!(
            "{:<12} {:>10}  {:<6} {:<8} {}\n",
            network.name,
            network.chain_id,
            network.currency,
            if network.testnet { "yes" } else { "no" },
            network.explorer_url
        ));
    }
    response
}
