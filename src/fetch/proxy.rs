//! Proxy detection against a live node
//!
//! Probes run in a fixed order and each reports `Found`, `NotApplicable` or
//! `Failed`. The first `Found` wins.

use alloy::network::TransactionBuilder;
use alloy::primitives::{b256, Address, Bytes, B256, U256};
use alloy::rpc::types::TransactionRequest;

use crate::runtime::ChainClient;

/// `bytes32(uint256(keccak256("eip1967.proxy.implementation")) - 1)`
pub const EIP1967_IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// `implementation()`
pub const IMPLEMENTATION_SELECTOR: [u8; 4] = [0x5c, 0x60, 0xda, 0x1b];

const MINIMAL_PROXY_PREFIX: [u8; 10] = [0x36, 0x3d, 0x3d, 0x37, 0x3d, 0x3d, 0x3d, 0x36, 0x3d, 0x73];
const MINIMAL_PROXY_SUFFIX: [u8; 15] = [
    0x5a, 0xf4, 0x3d, 0x82, 0x80, 0x3e, 0x90, 0x3d, 0x91, 0x60, 0x2b, 0x57, 0xfd, 0x5b, 0xf3,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyProbe {
    Eip1967Slot,
    ImplementationCall,
    MinimalProxy,
}

impl ProxyProbe {
    pub const ALL: [ProxyProbe; 3] = [
        ProxyProbe::Eip1967Slot,
        ProxyProbe::ImplementationCall,
        ProxyProbe::MinimalProxy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProxyProbe::Eip1967Slot => "eip1967_slot",
            ProxyProbe::ImplementationCall => "implementation_call",
            ProxyProbe::MinimalProxy => "eip1167_bytecode",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Found(Address),
    NotApplicable,
    Failed(String),
}

/// Low 20 bytes of the first 32-byte word; zero means no address.
pub fn address_from_word(data: &[u8]) -> Option<Address> {
    let word = data.get(..32)?;
    let address = Address::from_slice(&word[12..]);
    (!address.is_zero()).then_some(address)
}

pub fn address_from_slot(value: U256) -> Option<Address> {
    address_from_word(&value.to_be_bytes::<32>())
}

/// Target of an EIP-1167 minimal proxy, if `code` is exactly one.
pub fn minimal_proxy_target(code: &[u8]) -> Option<Address> {
    if code.len() != MINIMAL_PROXY_PREFIX.len() + 20 + MINIMAL_PROXY_SUFFIX.len() {
        return None;
    }
    let (prefix, rest) = code.split_at(MINIMAL_PROXY_PREFIX.len());
    let (target, suffix) = rest.split_at(20);
    (prefix == MINIMAL_PROXY_PREFIX && suffix == MINIMAL_PROXY_SUFFIX)
        .then(|| Address::from_slice(target))
}

pub async fn probe(client: &ChainClient, address: Address, probe: ProxyProbe) -> ProbeOutcome {
    let found = |a: Option<Address>| a.map_or(ProbeOutcome::NotApplicable, ProbeOutcome::Found);
    match probe {
        ProxyProbe::Eip1967Slot => {
            let slot = U256::from_be_bytes(EIP1967_IMPLEMENTATION_SLOT.0);
            match client.storage_at(address, slot).await {
                Ok(value) => found(address_from_slot(value)),
                Err(e) => ProbeOutcome::Failed(e.to_string()),
            }
        }
        ProxyProbe::ImplementationCall => {
            let request = TransactionRequest::default()
                .with_to(address)
                .with_input(Bytes::from(IMPLEMENTATION_SELECTOR.to_vec()));
            match client.call(request).await {
                Ok(data) => found(address_from_word(&data)),
                // A contract without `implementation()` reverts
                Err(e) if e.error_payload().is_some() => ProbeOutcome::NotApplicable,
                Err(e) => ProbeOutcome::Failed(e.to_string()),
            }
        }
        ProxyProbe::MinimalProxy => match client.code(address).await {
            Ok(code) => found(minimal_proxy_target(&code)),
            Err(e) => ProbeOutcome::Failed(e.to_string()),
        },
    }
}

/// Implementation address behind `address`, if it is a recognised proxy.
pub async fn detect_proxy(client: &ChainClient, address: Address) -> Option<Address> {
    for kind in ProxyProbe::ALL {
        match probe(client, address, kind).await {
            ProbeOutcome::Found(implementation) => {
                tracing::info!(probe = kind.name(), %implementation, "proxy detected");
                return Some(implementation);
            }
            ProbeOutcome::NotApplicable => {
                tracing::debug!(probe = kind.name(), "not applicable");
            }
            ProbeOutcome::Failed(reason) => {
                tracing::debug!(probe = kind.name(), %reason, "probe failed");
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::client::test_support::mocked_client;
    use alloy::primitives::address;

    const IMPL: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

    fn minimal_proxy_code(target: Address) -> Vec<u8> {
        let mut code = MINIMAL_PROXY_PREFIX.to_vec();
        code.extend_from_slice(target.as_slice());
        code.extend_from_slice(&MINIMAL_PROXY_SUFFIX);
        code
    }

    #[test]
    fn test_slot_constant() {
        let hashed = alloy::primitives::keccak256("eip1967.proxy.implementation");
        let expected = U256::from_be_bytes(hashed.0) - U256::from(1);
        assert_eq!(U256::from_be_bytes(EIP1967_IMPLEMENTATION_SLOT.0), expected);
    }

    #[test]
    fn test_address_from_word() {
        let mut word = [0u8; 32];
        assert_eq!(address_from_word(&word), None);
        word[12..].copy_from_slice(IMPL.as_slice());
        assert_eq!(address_from_word(&word), Some(IMPL));
        assert_eq!(address_from_word(&word[..31]), None);
    }

    #[test]
    fn test_minimal_proxy_target() {
        let code = minimal_proxy_code(IMPL);
        assert_eq!(code.len(), 45);
        assert_eq!(minimal_proxy_target(&code), Some(IMPL));
        let mut altered = code.clone();
        altered[0] = 0x00;
        assert_eq!(minimal_proxy_target(&altered), None);
        assert_eq!(minimal_proxy_target(&code[..44]), None);
    }

    #[tokio::test]
    async fn test_detect_eip1967_proxy() {
        let (client, asserter) = mocked_client();
        asserter.push_success(&U256::from_be_slice(IMPL.as_slice()));
        assert_eq!(detect_proxy(&client, Address::ZERO).await, Some(IMPL));
    }

    #[tokio::test]
    async fn test_detect_minimal_proxy_after_other_probes() {
        let (client, asserter) = mocked_client();
        asserter.push_success(&U256::ZERO);
        asserter.push_failure_msg("execution reverted");
        asserter.push_success(&Bytes::from(minimal_proxy_code(IMPL)));
        assert_eq!(detect_proxy(&client, Address::ZERO).await, Some(IMPL));
    }

    #[tokio::test]
    async fn test_plain_contract_is_not_proxy() {
        let (client, asserter) = mocked_client();
        asserter.push_success(&U256::ZERO);
        asserter.push_success(&Bytes::new());
        asserter.push_success(&Bytes::from(vec![0x60, 0x80, 0x60, 0x40]));
        assert_eq!(detect_proxy(&client, Address::ZERO).await, None);
    }
}
