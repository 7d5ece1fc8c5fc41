//! Transaction construction: fee strategy, nonce, gas limit and state tracking

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use serde::Serialize;
use serde_json::{Map, Value};

use super::client::{ChainClient, ClientError};
use super::TxError;

/// Default priority fee when the caller gives none: 2 gwei.
pub const DEFAULT_PRIORITY_FEE: u128 = 2_000_000_000;
/// Headroom added on top of `eth_estimateGas`.
pub const GAS_BUFFER_PERCENT: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    Built,
    Estimated,
    Simulated,
    Signed,
    Submitted,
    Confirmed,
    Failed,
}

impl TxState {
    /// States after which gas may have been spent.
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            TxState::Signed | TxState::Submitted | TxState::Confirmed | TxState::Failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeStrategy {
    Legacy {
        gas_price: u128,
    },
    FeeMarket {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
}

impl FeeStrategy {
    pub fn from_base_fee(base_fee: u128, priority: u128) -> Self {
        FeeStrategy::FeeMarket {
            max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(priority),
            max_priority_fee_per_gas: priority,
        }
    }

    fn apply(&self, tx: &mut TransactionRequest) {
        match *self {
            FeeStrategy::Legacy { gas_price } => tx.set_gas_price(gas_price),
            FeeStrategy::FeeMarket {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                tx.set_max_fee_per_gas(max_fee_per_gas);
                tx.set_max_priority_fee_per_gas(max_priority_fee_per_gas);
            }
        }
    }
}

/// Per-call overrides taken from write tool arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOverrides {
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub value: Option<U256>,
    pub nonce: Option<u64>,
}

impl TxOverrides {
    pub fn from_args(args: &Map<String, Value>) -> Result<Self, TxError> {
        Ok(Self {
            gas_limit: wei_arg(args, "gas_limit")?,
            gas_price: wei_arg(args, "gas_price")?,
            max_fee_per_gas: wei_arg(args, "max_fee_per_gas")?,
            max_priority_fee_per_gas: wei_arg(args, "max_priority_fee_per_gas")?,
            value: wei_arg(args, "value")?,
            nonce: None,
        })
    }

    /// Resolve the fee strategy, querying the node only when needed.
    pub async fn fee_strategy(&self, client: &ChainClient) -> Result<FeeStrategy, TxError> {
        if let Some(gas_price) = self.gas_price {
            return Ok(FeeStrategy::Legacy { gas_price });
        }
        match (self.max_fee_per_gas, self.max_priority_fee_per_gas) {
            (Some(max_fee), Some(priority)) => Ok(FeeStrategy::FeeMarket {
                max_fee_per_gas: max_fee,
                max_priority_fee_per_gas: priority.min(max_fee),
            }),
            (Some(max_fee), None) => Ok(FeeStrategy::FeeMarket {
                max_fee_per_gas: max_fee,
                max_priority_fee_per_gas: DEFAULT_PRIORITY_FEE.min(max_fee),
            }),
            (None, priority) => {
                let priority = priority.unwrap_or(DEFAULT_PRIORITY_FEE);
                match client.latest_base_fee().await? {
                    Some(base_fee) => Ok(FeeStrategy::from_base_fee(base_fee, priority)),
                    None => Ok(FeeStrategy::Legacy {
                        gas_price: client.gas_price().await?,
                    }),
                }
            }
        }
    }
}

/// Numeric argument given as a decimal string or JSON number.
fn wei_arg<T: std::str::FromStr>(args: &Map<String, Value>, key: &str) -> Result<Option<T>, TxError> {
    let text = match args.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(TxError::InvalidArgument(format!(
                "{key}: expected an integer, got {other}"
            )))
        }
    };
    text.parse::<T>()
        .map(Some)
        .map_err(|_| TxError::InvalidArgument(format!("{key}: '{text}' is not a valid integer")))
}

pub fn apply_gas_buffer(estimate: u64) -> u64 {
    let buffered = u128::from(estimate) * u128::from(100 + GAS_BUFFER_PERCENT) / 100;
    u64::try_from(buffered).unwrap_or(u64::MAX)
}

/// A transaction being driven through its states.
#[derive(Debug, Clone)]
pub struct PendingTx {
    pub request: TransactionRequest,
    pub fees: FeeStrategy,
    pub state: TxState,
}

impl PendingTx {
    /// Assemble the request: chain id, fees, sender nonce and overrides.
    pub async fn build(
        client: &ChainClient,
        to: Address,
        data: Vec<u8>,
        from: Option<Address>,
        overrides: &TxOverrides,
    ) -> Result<Self, TxError> {
        let mut request = TransactionRequest::default()
            .with_to(to)
            .with_input(Bytes::from(data));
        if let Some(value) = overrides.value {
            request.set_value(value);
        }
        request.set_chain_id(client.chain_id().await?);

        if let Some(from) = from {
            request.set_from(from);
            let nonce = match overrides.nonce {
                Some(nonce) => nonce,
                None => client.nonce(from).await?,
            };
            request.set_nonce(nonce);
        }

        let fees = overrides.fee_strategy(client).await?;
        fees.apply(&mut request);

        if let Some(gas_limit) = overrides.gas_limit {
            request.set_gas_limit(gas_limit);
        }

        Ok(Self {
            request,
            fees,
            state: TxState::Built,
        })
    }

    pub fn gas_limit(&self) -> Option<u64> {
        self.request.gas
    }

    /// Fill the gas limit from `eth_estimateGas` plus buffer unless already set.
    /// The raw client error is returned so a revert can be told apart.
    pub async fn estimate(&mut self, client: &ChainClient) -> Result<(), ClientError> {
        if self.request.gas.is_none() {
            let estimate = client.estimate_gas(self.request.clone()).await?;
            self.request.set_gas_limit(apply_gas_buffer(estimate));
        }
        self.state = TxState::Estimated;
        Ok(())
    }

    pub fn advance(&mut self, state: TxState) {
        tracing::debug!(from = ?self.state, to = ?state, "transaction state");
        self.state = state;
    }
}
