//! Transaction runtime used by generated servers
//!
//! Every outbound transaction moves through
//! `Built → Estimated → (Simulated) → Signed → Submitted → Confirmed/Failed`.
//! Failures before `Signed` never spend gas.

pub mod client;
pub mod codec;
pub mod executor;
pub mod gas;
pub mod signer;
pub mod simulate;
pub mod tx;

use thiserror::Error;

pub use client::{ChainClient, ClientError};
pub use executor::{ContractExecutor, ExecutorOptions, OutcomeStatus, TxOutcome};
pub use gas::{GasPrices, GasTier};
pub use signer::TxSigner;
pub use simulate::{RevertDecoder, Simulation};
pub use tx::{FeeStrategy, PendingTx, TxOverrides, TxState};

/// Errors raised while talking to the chain or driving a transaction.
#[derive(Debug, Error)]
pub enum TxError {
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("invalid RPC URL: {0}")]
    InvalidUrl(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
    #[error("ABI error: {0}")]
    Abi(String),
    #[error("gas estimation failed: {0}")]
    GasEstimation(String),
    #[error("simulation failed: {}", .reason.as_deref().unwrap_or("execution reverted"))]
    Simulation { reason: Option<String> },
    #[error("no signing key configured; set PRIVATE_KEY to send transactions")]
    SignerNotConfigured,
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("transaction failed: {0}")]
    Transaction(String),
    #[error("no receipt for {tx_hash} after {waited_secs}s")]
    ReceiptTimeout { tx_hash: String, waited_secs: u64 },
}

impl TxError {
    pub fn kind(&self) -> &'static str {
        match self {
            TxError::Rpc(_) => "rpc",
            TxError::InvalidUrl(_) => "invalid_url",
            TxError::InvalidArgument(_) => "invalid_argument",
            TxError::UnsupportedType(_) => "unsupported_type",
            TxError::Abi(_) => "abi",
            TxError::GasEstimation(_) => "gas_estimation",
            TxError::Simulation { .. } => "simulation",
            TxError::SignerNotConfigured => "signer_not_configured",
            TxError::InvalidKey(_) => "invalid_key",
            TxError::InsufficientFunds(_) => "insufficient_funds",
            TxError::Transaction(_) => "transaction",
            TxError::ReceiptTimeout { .. } => "receipt_timeout",
        }
    }
}
