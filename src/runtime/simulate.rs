//! Pre-flight simulation and revert reason decoding

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::Bytes;
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::decode_revert_reason;

use super::client::{ChainClient, ClientError};
use super::codec::{resolve, to_json};
use super::TxError;
use crate::abi::AbiError;

/// Decodes revert data using the contract's custom errors, then the
/// standard `Error(string)` and `Panic(uint256)` shapes.
#[derive(Debug, Clone, Default)]
pub struct RevertDecoder {
    errors: Vec<AbiError>,
}

impl RevertDecoder {
    pub fn new(errors: &[AbiError]) -> Self {
        Self {
            errors: errors.to_vec(),
        }
    }

    pub fn decode(&self, data: &[u8]) -> Option<String> {
        if data.len() >= 4 {
            if let Some(error) = self.errors.iter().find(|e| e.selector() == data[..4]) {
                if let Some(reason) = decode_custom(error, &data[4..]) {
                    return Some(reason);
                }
            }
        }
        decode_revert_reason(data).map(|r| r.strip_prefix("revert: ").unwrap_or(&r).to_string())
    }

    /// Revert reason carried by an RPC failure, or `None` if the failure was
    /// not a revert. A revert without a decodable reason yields `Some(None)`.
    pub fn revert_of(&self, err: &ClientError) -> Option<Option<String>> {
        let payload = err.error_payload()?;
        let data = payload.as_revert_data();
        let message = payload.message.to_string();
        let is_revert = data.is_some() || payload.code == 3 || message.to_lowercase().contains("revert");
        if !is_revert {
            return None;
        }

        let from_data = data.as_deref().and_then(|d| self.decode(d));
        Some(from_data.or_else(|| reason_from_message(&message)))
    }
}

fn decode_custom(error: &AbiError, args: &[u8]) -> Option<String> {
    let types = error
        .inputs
        .iter()
        .map(resolve)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    let values = match DynSolType::Tuple(types).abi_decode_params(args).ok()? {
        DynSolValue::Tuple(values) => values,
        other => vec![other],
    };
    let rendered: Vec<String> = values
        .iter()
        .map(|v| match to_json(v) {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .collect();
    Some(format!("{}({})", error.name, rendered.join(", ")))
}

/// `"execution reverted: Foo"` → `Foo`; bare `"execution reverted"` → none.
fn reason_from_message(message: &str) -> Option<String> {
    let rest = message
        .split_once("reverted")
        .map(|(_, rest)| rest)
        .unwrap_or("");
    let reason = rest.trim_start_matches(':').trim();
    (!reason.is_empty()).then(|| reason.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Simulation {
    Success { return_data: Bytes },
    Reverted { reason: Option<String> },
}

impl Simulation {
    pub fn is_success(&self) -> bool {
        matches!(self, Simulation::Success { .. })
    }
}

/// Run the transaction through `eth_call` without broadcasting it.
pub async fn simulate(
    client: &ChainClient,
    tx: TransactionRequest,
    decoder: &RevertDecoder,
) -> Result<Simulation, TxError> {
    match client.call(tx).await {
        Ok(return_data) => Ok(Simulation::Success { return_data }),
        Err(err) => match decoder.revert_of(&err) {
            Some(reason) => {
                tracing::debug!(reason = ?reason, "simulation reverted");
                Ok(Simulation::Reverted { reason })
            }
            None => Err(err.into()),
        },
    }
}
