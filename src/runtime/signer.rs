//! Local private-key signing

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;

use super::TxError;

#[derive(Clone)]
pub struct TxSigner {
    wallet: EthereumWallet,
    address: Address,
}

impl std::fmt::Debug for TxSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl TxSigner {
    /// Accepts a 32-byte hex key with or without `0x`.
    pub fn from_private_key(key: &str) -> Result<Self, TxError> {
        let signer: PrivateKeySigner = key
            .trim()
            .parse()
            .map_err(|e| TxError::InvalidKey(format!("{e}")))?;
        let address = signer.address();
        Ok(Self {
            wallet: EthereumWallet::from(signer),
            address,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a fully populated request into raw EIP-2718 bytes.
    pub async fn sign(&self, tx: TransactionRequest) -> Result<Vec<u8>, TxError> {
        let envelope = tx
            .build(&self.wallet)
            .await
            .map_err(|e| TxError::Transaction(format!("signing failed: {e}")))?;
        Ok(envelope.encoded_2718())
    }
}
