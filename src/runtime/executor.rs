//! Contract executor: reads, writes and event queries against one address

use std::sync::Arc;
use std::time::Duration;

use alloy::network::{ReceiptResponse, TransactionBuilder};
use alloy::primitives::{keccak256, Address, Bytes};
use alloy::rpc::types::{Filter, TransactionRequest};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use super::client::ChainClient;
use super::codec::{decode_log, decode_outputs, encode_call};
use super::gas::{self, GasPrices};
use super::signer::TxSigner;
use super::simulate::{simulate, RevertDecoder, Simulation};
use super::tx::{FeeStrategy, PendingTx, TxOverrides, TxState};
use super::TxError;
use crate::abi::{AbiError, Event, Function};

/// Blocks searched when a query gives no explicit range.
pub const DEFAULT_EVENT_RANGE: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub read_only: bool,
    pub simulate_default: bool,
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            simulate_default: true,
            receipt_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Server is read-only; nothing was sent
    Refused,
    SimulationFailed,
    /// `dry_run` stopped after a successful simulation
    Simulated,
    Confirmed,
    /// Mined but reverted
    Failed,
}

/// Structured result of a write tool.
#[derive(Debug, Clone, Serialize)]
pub struct TxOutcome {
    pub status: OutcomeStatus,
    pub state: TxState,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees: Option<FeeStrategy>,
}

impl TxOutcome {
    fn new(status: OutcomeStatus, state: TxState, message: impl Into<String>) -> Self {
        Self {
            status,
            state,
            message: message.into(),
            revert_reason: None,
            tx_hash: None,
            block_number: None,
            gas_limit: None,
            gas_used: None,
            effective_gas_price: None,
            fees: None,
        }
    }

    fn for_tx(status: OutcomeStatus, tx: &PendingTx, message: impl Into<String>) -> Self {
        let mut outcome = Self::new(status, tx.state, message);
        outcome.gas_limit = tx.gas_limit().map(|g| g.to_string());
        outcome.fees = Some(tx.fees);
        outcome
    }

    fn reverted(tx: &PendingTx, reason: Option<String>) -> Self {
        let message = match &reason {
            Some(reason) => format!("Simulation reverted: {reason}. Transaction was not sent."),
            None => "Simulation reverted. Transaction was not sent.".to_string(),
        };
        let mut outcome = Self::for_tx(OutcomeStatus::SimulationFailed, tx, message);
        outcome.revert_reason = reason;
        outcome
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Confirmed | OutcomeStatus::Simulated)
    }
}

/// Executes calls against a single deployed contract.
#[derive(Debug, Clone)]
pub struct ContractExecutor {
    client: ChainClient,
    address: Address,
    signer: Option<TxSigner>,
    decoder: RevertDecoder,
    options: ExecutorOptions,
    write_lock: Arc<Mutex<()>>,
}

impl ContractExecutor {
    pub fn new(client: ChainClient, address: Address, options: ExecutorOptions) -> Self {
        Self {
            client,
            address,
            signer: None,
            decoder: RevertDecoder::default(),
            options,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_signer(mut self, signer: TxSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Decode reverts with the contract's custom errors.
    pub fn with_errors(mut self, errors: &[AbiError]) -> Self {
        self.decoder = RevertDecoder::new(errors);
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn client(&self) -> &ChainClient {
        &self.client
    }

    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    pub fn is_read_only(&self) -> bool {
        self.options.read_only
    }

    /// `eth_call` a view or pure function and decode its result.
    pub async fn read(
        &self,
        function: &Function,
        keys: &[String],
        args: &Map<String, Value>,
    ) -> Result<Value, TxError> {
        let data = encode_call(function, keys, args)?;
        let mut request = TransactionRequest::default()
            .with_to(self.address)
            .with_input(Bytes::from(data));
        if let Some(from) = self.signer_address() {
            request.set_from(from);
        }

        let output = match self.client.call(request).await {
            Ok(output) => output,
            Err(err) => {
                return Err(match self.decoder.revert_of(&err) {
                    Some(reason) => TxError::Transaction(format!(
                        "call to {} reverted: {}",
                        function.name,
                        reason.as_deref().unwrap_or("no reason given")
                    )),
                    None => err.into(),
                })
            }
        };
        decode_outputs(function, &output)
    }

    /// Drive a state-changing call through build, estimate, simulate, sign,
    /// submit and confirm.
    pub async fn write(
        &self,
        function: &Function,
        keys: &[String],
        args: &Map<String, Value>,
    ) -> Result<TxOutcome, TxError> {
        if self.options.read_only {
            return Ok(TxOutcome::new(
                OutcomeStatus::Refused,
                TxState::Built,
                format!(
                    "{} is a write operation and this server is read-only",
                    function.name
                ),
            ));
        }

        let data = encode_call(function, keys, args)?;
        let overrides = TxOverrides::from_args(args)?;
        let should_simulate = bool_arg(args, "simulate").unwrap_or(self.options.simulate_default);
        let dry_run = bool_arg(args, "dry_run").unwrap_or(false);

        let guard = self.write_lock.lock().await;

        let mut tx = PendingTx::build(
            &self.client,
            self.address,
            data,
            self.signer_address(),
            &overrides,
        )
        .await?;

        if let Err(err) = tx.estimate(&self.client).await {
            if let Some(reason) = self.decoder.revert_of(&err) {
                return Ok(TxOutcome::reverted(&tx, reason));
            }
            let message = err.to_string();
            if is_insufficient_funds(&message) {
                return Err(TxError::InsufficientFunds(message));
            }
            return Err(TxError::GasEstimation(message));
        }

        if should_simulate || dry_run {
            match simulate(&self.client, tx.request.clone(), &self.decoder).await? {
                Simulation::Reverted { reason } => return Ok(TxOutcome::reverted(&tx, reason)),
                Simulation::Success { .. } => tx.advance(TxState::Simulated),
            }
        }

        if dry_run {
            return Ok(TxOutcome::for_tx(
                OutcomeStatus::Simulated,
                &tx,
                "Simulation succeeded. Dry run: transaction was not sent.",
            ));
        }

        let signer = self.signer.as_ref().ok_or(TxError::SignerNotConfigured)?;
        let raw = signer.sign(tx.request.clone()).await?;
        tx.advance(TxState::Signed);

        let hash = self.client.send_raw(&raw).await.map_err(|err| {
            let message = err.to_string();
            if is_insufficient_funds(&message) {
                TxError::InsufficientFunds(message)
            } else {
                TxError::Transaction(message)
            }
        })?;
        tx.advance(TxState::Submitted);
        drop(guard);

        let tx_hash = format!("{hash:#x}");
        tracing::info!(tx_hash = %tx_hash, function = %function.name, "transaction submitted");

        let receipt = self
            .client
            .wait_for_receipt(hash, self.options.receipt_timeout, self.options.poll_interval)
            .await?;

        let (status, state, message) = if receipt.status() {
            (OutcomeStatus::Confirmed, TxState::Confirmed, "Transaction confirmed")
        } else {
            (OutcomeStatus::Failed, TxState::Failed, "Transaction reverted on-chain")
        };
        tx.advance(state);

        let mut outcome = TxOutcome::for_tx(status, &tx, message);
        outcome.tx_hash = Some(tx_hash);
        outcome.block_number = receipt.block_number();
        outcome.gas_used = Some(receipt.gas_used().to_string());
        outcome.effective_gas_price = Some(receipt.effective_gas_price().to_string());
        Ok(outcome)
    }

    /// Logs of `event` emitted by this contract, newest last. `names` are the
    /// output keys for the event's inputs in declaration order.
    pub async fn query_events(
        &self,
        event: &Event,
        names: &[String],
        from_block: Option<u64>,
        to_block: Option<u64>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, TxError> {
        let to = match to_block {
            Some(block) => block,
            None => self.client.block_number().await?,
        };
        let from = from_block.unwrap_or_else(|| to.saturating_sub(DEFAULT_EVENT_RANGE));
        if from > to {
            return Err(TxError::InvalidArgument(format!(
                "from_block {from} is after to_block {to}"
            )));
        }

        let mut filter = Filter::new()
            .address(self.address)
            .from_block(from)
            .to_block(to);
        if !event.anonymous {
            filter = filter.event_signature(keccak256(event.signature().as_bytes()));
        }

        let logs = self.client.logs(&filter).await?;
        tracing::debug!(event = %event.name, from, to, count = logs.len(), "fetched logs");

        let mut decoded = Vec::with_capacity(logs.len());
        for log in &logs {
            let mut fields = match decode_log(event, names, log.topics(), &log.data().data) {
                Ok(fields) => fields,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping undecodable log");
                    continue;
                }
            };
            fields.insert("block_number".into(), json!(log.block_number));
            fields.insert(
                "transaction_hash".into(),
                json!(log.transaction_hash.map(|h| format!("{h:#x}"))),
            );
            fields.insert("log_index".into(), json!(log.log_index));
            decoded.push(Value::Object(fields));
        }

        if let Some(limit) = limit {
            let skip = decoded.len().saturating_sub(limit);
            decoded.drain(..skip);
        }
        Ok(decoded)
    }

    pub async fn gas_prices(&self) -> Result<GasPrices, TxError> {
        gas::gas_prices(&self.client).await
    }
}

fn bool_arg(args: &Map<String, Value>, key: &str) -> Option<bool> {
    match args.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn is_insufficient_funds(message: &str) -> bool {
    message.to_lowercase().contains("insufficient funds")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{Parameter, StateMutability};
    use crate::runtime::client::test_support::mocked_client;
    use alloy::dyn_abi::DynSolValue;
    use alloy::primitives::{U256, U64};
    use alloy::transports::mock::Asserter;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn transfer() -> Function {
        Function {
            name: "transfer".into(),
            inputs: vec![Parameter::new("to", "address"), Parameter::new("amount", "uint256")],
            outputs: vec![Parameter::new("", "bool")],
            state_mutability: StateMutability::NonPayable,
        }
    }

    fn keys() -> Vec<String> {
        vec!["to".into(), "amount".into()]
    }

    fn args(extra: Value) -> Map<String, Value> {
        let mut args = json!({
            "to": "0x000000000000000000000000000000000000dEaD",
            "amount": "1000",
            "gas_limit": "60000",
            "gas_price": "1000000000"
        })
        .as_object()
        .cloned()
        .unwrap();
        if let Value::Object(extra) = extra {
            args.extend(extra);
        }
        args
    }

    fn executor(options: ExecutorOptions) -> (ContractExecutor, Asserter) {
        let (client, asserter) = mocked_client();
        let executor = ContractExecutor::new(client.with_chain_id(1), Address::ZERO, options);
        (executor, asserter)
    }

    #[tokio::test]
    async fn test_read_decodes_result() {
        let (executor, asserter) = executor(ExecutorOptions::default());
        let balance_of = Function {
            name: "balanceOf".into(),
            inputs: vec![Parameter::new("owner", "address")],
            outputs: vec![Parameter::new("", "uint256")],
            state_mutability: StateMutability::View,
        };
        let output = DynSolValue::Tuple(vec![DynSolValue::Uint(U256::from(1000), 256)])
            .abi_encode_params();
        asserter.push_success(&Bytes::from(output));

        let args = json!({"owner": "0x000000000000000000000000000000000000dEaD"});
        let result = executor
            .read(&balance_of, &["owner".into()], args.as_object().unwrap())
            .await
            .unwrap();
        assert_eq!(result, json!("1000"));
    }

    #[tokio::test]
    async fn test_read_only_refuses_without_rpc() {
        let (executor, _asserter) = executor(ExecutorOptions {
            read_only: true,
            ..Default::default()
        });
        let outcome = executor.write(&transfer(), &keys(), &args(json!({}))).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Refused);
    }

    #[tokio::test]
    async fn test_simulation_revert_never_signs() {
        let (executor, asserter) = executor(ExecutorOptions::default());
        let executor = executor.with_signer(TxSigner::from_private_key(KEY).unwrap());
        asserter.push_success(&U64::from(3));
        asserter.push_failure_msg("execution reverted: Insufficient balance");

        let outcome = executor.write(&transfer(), &keys(), &args(json!({}))).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::SimulationFailed);
        assert_eq!(outcome.revert_reason.as_deref(), Some("Insufficient balance"));
        assert!(!outcome.state.is_signed());
        assert!(outcome.tx_hash.is_none());
    }

    #[tokio::test]
    async fn test_dry_run_stops_after_simulation() {
        let (executor, asserter) = executor(ExecutorOptions::default());
        asserter.push_success(&Bytes::new());
        let outcome = executor
            .write(&transfer(), &keys(), &args(json!({"dry_run": true})))
            .await
            .unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Simulated);
        assert_eq!(outcome.state, TxState::Simulated);
        assert_eq!(outcome.gas_limit.as_deref(), Some("60000"));
    }

    #[tokio::test]
    async fn test_missing_signer_after_simulation() {
        let (executor, asserter) = executor(ExecutorOptions::default());
        asserter.push_success(&Bytes::new());
        let err = executor
            .write(&transfer(), &keys(), &args(json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "signer_not_configured");
    }

    #[tokio::test]
    async fn test_insufficient_funds_on_submit() {
        let (executor, asserter) = executor(ExecutorOptions::default());
        let executor = executor.with_signer(TxSigner::from_private_key(KEY).unwrap());
        asserter.push_success(&U64::from(0));
        asserter.push_failure_msg("insufficient funds for gas * price + value");
        let err = executor
            .write(&transfer(), &keys(), &args(json!({"simulate": false})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "insufficient_funds");
    }

    #[tokio::test]
    async fn test_estimation_revert_is_simulation_failure() {
        let (executor, asserter) = executor(ExecutorOptions::default());
        asserter.push_failure_msg("execution reverted");
        let mut call_args = args(json!({}));
        call_args.remove("gas_limit");
        let outcome = executor.write(&transfer(), &keys(), &call_args).await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::SimulationFailed);
        assert_eq!(outcome.state, TxState::Built);
        assert!(outcome.revert_reason.is_none());
    }

    #[tokio::test]
    async fn test_invalid_argument_before_rpc() {
        let (executor, _asserter) = executor(ExecutorOptions::default());
        let bad = args(json!({"amount": "not a number"}));
        let err = executor.write(&transfer(), &keys(), &bad).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }

    fn transfer_event() -> Event {
        let mut from = Parameter::new("from", "address");
        from.indexed = Some(true);
        let mut to = Parameter::new("to", "address");
        to.indexed = Some(true);
        Event {
            name: "Transfer".into(),
            inputs: vec![from, to, Parameter::new("value", "uint256")],
            anonymous: false,
        }
    }

    #[tokio::test]
    async fn test_query_events_decodes_logs() {
        let (executor, asserter) = executor(ExecutorOptions::default());
        let event = transfer_event();
        asserter.push_success(&json!([{
            "address": "0x0000000000000000000000000000000000000000",
            "topics": [
                event.topic_hex(),
                "0x000000000000000000000000000000000000000000000000000000000000dead",
                "0x000000000000000000000000000000000000000000000000000000000000beef"
            ],
            "data": "0x00000000000000000000000000000000000000000000000000000000000003e8",
            "blockNumber": "0x10",
            "blockHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
            "transactionHash": "0x2222222222222222222222222222222222222222222222222222222222222222",
            "transactionIndex": "0x0",
            "logIndex": "0x3",
            "removed": false
        }]));

        let names = vec!["from".to_string(), "to".to_string(), "value".to_string()];
        let events = executor
            .query_events(&event, &names, Some(1), Some(20), None)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        let log = &events[0];
        assert_eq!(log["from"], json!("0x000000000000000000000000000000000000dEaD"));
        assert_eq!(log["value"], json!("1000"));
        assert_eq!(log["block_number"], json!(16));
        assert_eq!(log["log_index"], json!(3));
        assert_eq!(
            log["transaction_hash"],
            json!("0x2222222222222222222222222222222222222222222222222222222222222222")
        );
    }

    #[tokio::test]
    async fn test_query_events_rejects_inverted_range() {
        let (executor, _asserter) = executor(ExecutorOptions::default());
        let err = executor
            .query_events(&transfer_event(), &[], Some(10), Some(5), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_argument");
    }
}
