//! JSON-RPC client wrapper with bounded timeouts

use std::future::IntoFuture;
use std::time::Duration;

use alloy::consensus::BlockHeader;
use alloy::eips::BlockNumberOrTag;
use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::json_rpc::ErrorPayload;
use alloy::rpc::types::{FeeHistory, Filter, Log, TransactionReceipt, TransactionRequest};
use alloy::transports::{TransportError, TransportResult};
use thiserror::Error;

use super::TxError;

/// Failure of a single RPC request.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// The JSON-RPC error object, when the node answered with one.
    pub fn error_payload(&self) -> Option<&ErrorPayload> {
        match self {
            ClientError::Transport(e) => e.as_error_resp(),
            ClientError::Timeout(_) => None,
        }
    }
}

impl From<ClientError> for TxError {
    fn from(err: ClientError) -> Self {
        TxError::Rpc(err.to_string())
    }
}

/// A connection to one EVM JSON-RPC endpoint.
#[derive(Clone)]
pub struct ChainClient {
    provider: DynProvider<Ethereum>,
    rpc_url: String,
    chain_id: Option<u64>,
    timeout: Duration,
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ChainClient {
    /// Connect over HTTP. No request is made until the first call.
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, TxError> {
        let url: alloy::transports::http::reqwest::Url = rpc_url
            .parse()
            .map_err(|e| TxError::InvalidUrl(format!("{rpc_url}: {e}")))?;

        let provider = ProviderBuilder::new().connect_http(url).erased();

        Ok(Self {
            provider,
            rpc_url: rpc_url.to_string(),
            chain_id: None,
            timeout,
        })
    }

    /// Wrap an existing provider (mocked transports in tests, custom stacks elsewhere).
    pub fn from_provider(provider: DynProvider<Ethereum>, label: &str, timeout: Duration) -> Self {
        Self {
            provider,
            rpc_url: label.to_string(),
            chain_id: None,
            timeout,
        }
    }

    /// Use a known chain id instead of asking the node.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn provider(&self) -> &DynProvider<Ethereum> {
        &self.provider
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn timed<F, T>(&self, request: F) -> Result<T, ClientError>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        tokio::time::timeout(self.timeout, request.into_future())
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))?
            .map_err(ClientError::from)
    }

    pub async fn chain_id(&self) -> Result<u64, ClientError> {
        match self.chain_id {
            Some(id) => Ok(id),
            None => self.timed(self.provider.get_chain_id()).await,
        }
    }

    pub async fn block_number(&self) -> Result<u64, ClientError> {
        self.timed(self.provider.get_block_number()).await
    }

    pub async fn balance(&self, address: Address) -> Result<U256, ClientError> {
        self.timed(self.provider.get_balance(address)).await
    }

    pub async fn nonce(&self, address: Address) -> Result<u64, ClientError> {
        self.timed(self.provider.get_transaction_count(address)).await
    }

    pub async fn code(&self, address: Address) -> Result<Bytes, ClientError> {
        self.timed(self.provider.get_code_at(address)).await
    }

    pub async fn is_contract(&self, address: Address) -> Result<bool, ClientError> {
        Ok(!self.code(address).await?.is_empty())
    }

    pub async fn storage_at(&self, address: Address, slot: U256) -> Result<U256, ClientError> {
        self.timed(self.provider.get_storage_at(address, slot)).await
    }

    /// `eth_call` against the latest block.
    pub async fn call(&self, tx: TransactionRequest) -> Result<Bytes, ClientError> {
        self.timed(self.provider.call(tx)).await
    }

    pub async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64, ClientError> {
        self.timed(self.provider.estimate_gas(tx)).await
    }

    pub async fn gas_price(&self) -> Result<u128, ClientError> {
        self.timed(self.provider.get_gas_price()).await
    }

    /// Base fee of the latest block, or `None` on chains without a fee market.
    pub async fn latest_base_fee(&self) -> Result<Option<u128>, ClientError> {
        let block = self
            .timed(self.provider.get_block_by_number(BlockNumberOrTag::Latest))
            .await?;
        Ok(block
            .and_then(|b| b.header.base_fee_per_gas())
            .map(u128::from))
    }

    pub async fn fee_history(
        &self,
        block_count: u64,
        percentiles: &[f64],
    ) -> Result<FeeHistory, ClientError> {
        self.timed(
            self.provider
                .get_fee_history(block_count, BlockNumberOrTag::Latest, percentiles),
        )
        .await
    }

    pub async fn send_raw(&self, raw: &[u8]) -> Result<B256, ClientError> {
        let pending = tokio::time::timeout(self.timeout, self.provider.send_raw_transaction(raw))
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))??;
        Ok(*pending.tx_hash())
    }

    pub async fn receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>, ClientError> {
        self.timed(self.provider.get_transaction_receipt(hash)).await
    }

    pub async fn logs(&self, filter: &Filter) -> Result<Vec<Log>, ClientError> {
        self.timed(self.provider.get_logs(filter)).await
    }

    /// Poll for a receipt until it appears or `limit` elapses.
    pub async fn wait_for_receipt(
        &self,
        hash: B256,
        limit: Duration,
        poll_interval: Duration,
    ) -> Result<TransactionReceipt, TxError> {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            if let Some(receipt) = self.receipt(hash).await? {
                return Ok(receipt);
            }
            if tokio::time::Instant::now() + poll_interval > deadline {
                return Err(TxError::ReceiptTimeout {
                    tx_hash: format!("{hash:#x}"),
                    waited_secs: limit.as_secs(),
                });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use alloy::providers::ProviderBuilder;
    use alloy::transports::mock::Asserter;

    /// A client whose responses are queued on the returned asserter.
    pub fn mocked_client() -> (ChainClient, Asserter) {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new()
            .connect_mocked_client(asserter.clone())
            .erased();
        let client = ChainClient::from_provider(provider, "mock", Duration::from_secs(5));
        (client, asserter)
    }
}
