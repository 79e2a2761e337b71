//! The transaction lifecycle state machine
//!
//! Every write goes through the same path: encode, simulate, price, sign
//! under the nonce lease, broadcast, then poll to a terminal outcome. A
//! failed simulation aborts before any fee is spent. Confirmation is only
//! reported once the finality margin has passed on top of the including
//! block and the receipt is still present.

use super::gas::GasEstimator;
use super::nonce::NonceAllocator;
use crate::chain::{Endpoint, GasPrice};
use crate::config::EngineConfig;
use crate::contract::ContractBinding;
use crate::error::{OrchResult, OrchestratorError};
use crate::wallet::SigningIdentity;

use ethers::abi::{ParamType, Token};
use ethers::providers::{Http, JsonRpcClient};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{
    BlockNumber, Bytes, Eip1559TransactionRequest, Log, Transaction, TransactionRequest, H256,
    U256,
};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Wall-clock bound on a single eth_sendRawTransaction round-trip
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable description of one desired contract call
pub struct CallIntent {
    pub binding: ContractBinding,
    pub function: String,
    pub args: Vec<Token>,
    /// Native currency attached to the call (zero for non-payable)
    pub value: U256,
    /// Caller-supplied gas limit; estimated from simulation when absent
    pub gas_limit: Option<U256>,
}

impl CallIntent {
    pub fn new(binding: ContractBinding, function: &str, args: Vec<Token>) -> Self {
        Self {
            binding,
            function: function.to_string(),
            args,
            value: U256::zero(),
            gas_limit: None,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// Lifecycle states of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Built,
    Signed,
    Submitted,
    Pending,
    Confirmed,
    Reverted,
    Dropped,
    TimedOut,
}

impl TxState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TxState::Confirmed | TxState::Reverted | TxState::Dropped | TxState::TimedOut
        )
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxState::Built => "built",
            TxState::Signed => "signed",
            TxState::Submitted => "submitted",
            TxState::Pending => "pending",
            TxState::Confirmed => "confirmed",
            TxState::Reverted => "reverted",
            TxState::Dropped => "dropped",
            TxState::TimedOut => "timed-out",
        };
        f.write_str(s)
    }
}

/// Engine-private record of one in-flight transaction.
/// Mutated only here; discarded once the outcome is reported.
struct TransactionRecord {
    function: String,
    nonce: Option<u64>,
    tx_hash: Option<H256>,
    state: TxState,
}

impl TransactionRecord {
    fn new(function: &str) -> Self {
        Self {
            function: function.to_string(),
            nonce: None,
            tx_hash: None,
            state: TxState::Built,
        }
    }

    fn advance(&mut self, state: TxState) {
        debug!(
            function = %self.function,
            nonce = ?self.nonce,
            tx_hash = ?self.tx_hash,
            "Transaction {} -> {}",
            self.state,
            state
        );
        self.state = state;
    }
}

/// Terminal success report
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub tx_hash: H256,
    pub nonce: u64,
    pub block_number: u64,
    pub gas_used: Option<U256>,
    pub logs: Vec<Log>,
}

/// Drives call intents to a terminal outcome for one signing identity
pub struct LifecycleEngine<P: JsonRpcClient = Http> {
    endpoint: Arc<Endpoint<P>>,
    signer: Arc<SigningIdentity>,
    gas: GasEstimator,
    nonce: NonceAllocator,
    config: EngineConfig,
}

impl<P: JsonRpcClient> LifecycleEngine<P> {
    pub fn new(
        endpoint: Arc<Endpoint<P>>,
        signer: Arc<SigningIdentity>,
        config: EngineConfig,
    ) -> Self {
        let gas = GasEstimator::new(config.gas_limit_buffer_percent);
        let nonce = NonceAllocator::new(signer.address());
        Self {
            endpoint,
            signer,
            gas,
            nonce,
            config,
        }
    }

    /// Execute one intent end to end and return the confirmation, or the
    /// typed failure for whichever state the transaction died in.
    pub async fn execute(&self, intent: CallIntent) -> OrchResult<Confirmation> {
        // Built: resolve the intent to a raw payload (fails fast on
        // unknown functions or bad arguments, before any network I/O)
        let data = intent.binding.encode_call(&intent.function, &intent.args)?;
        let to = intent.binding.address();
        let mut record = TransactionRecord::new(&intent.function);

        info!(
            contract = intent.binding.name(),
            function = %intent.function,
            value = %intent.value,
            "Built call payload"
        );

        // Pre-flight simulation: a call that would revert never reaches
        // submission and costs nothing.
        let sim_tx: TypedTransaction = TransactionRequest::new()
            .from(self.signer.address())
            .to(to)
            .data(data.clone())
            .value(intent.value)
            .into();
        self.simulate(&sim_tx).await?;

        let gas_limit = match intent.gas_limit {
            Some(limit) => limit,
            None => self.gas.estimate_limit(&self.endpoint, &sim_tx).await?,
        };
        let gas_price = self.gas.get_gas_price(&self.endpoint).await?;

        // Signed + Submitted happen under the nonce lease so submissions
        // from this credential are strictly serialized.
        let lease = self.nonce.acquire(&self.endpoint).await?;
        let nonce = lease.nonce();
        record.nonce = Some(nonce);

        let tx = self.build_transaction(to, data, intent.value, nonce, gas_limit, &gas_price);
        let signature = match self.signer.sign(&tx).await {
            Ok(sig) => sig,
            Err(e) => {
                drop(lease); // nonce released for reuse
                return Err(e);
            }
        };
        record.advance(TxState::Signed);

        let raw = tx.rlp_signed(&signature);
        // The hash of the signed envelope is fixed before broadcast
        let envelope_hash = H256::from(ethers::utils::keccak256(&raw));
        let tx_hash = match timeout(SUBMIT_TIMEOUT, self.endpoint.send_raw_transaction(raw)).await
        {
            Ok(Ok(hash)) => {
                lease.commit();
                hash
            }
            Ok(Err(e)) => {
                let message = e.to_string();
                if is_already_known(&message) {
                    // This exact envelope already sits in the mempool, so
                    // the submission has effectively succeeded.
                    info!(tx_hash = ?envelope_hash, nonce, "Transaction already in mempool");
                    lease.commit();
                    envelope_hash
                } else {
                    let (err, stale_nonce) = classify_submission_error(nonce, &message);
                    if stale_nonce {
                        lease.invalidate();
                    }
                    return Err(err);
                }
            }
            Err(_) => {
                return Err(OrchestratorError::SubmissionRejected {
                    nonce,
                    reason: "submission timed out at the RPC endpoint".to_string(),
                });
            }
        };
        record.tx_hash = Some(tx_hash);
        record.advance(TxState::Submitted);

        info!(tx_hash = ?tx_hash, nonce, gas_limit = %gas_limit, "Transaction submitted");

        record.advance(TxState::Pending);
        let outcome = self.watch(tx_hash, nonce).await;
        match &outcome {
            Ok(_) => record.advance(TxState::Confirmed),
            Err(OrchestratorError::Reverted { .. }) => record.advance(TxState::Reverted),
            Err(OrchestratorError::Dropped { .. }) => record.advance(TxState::Dropped),
            Err(OrchestratorError::TimedOut { .. }) => record.advance(TxState::TimedOut),
            Err(_) => {}
        }
        outcome
    }

    /// Re-attach to a previously broadcast transaction by hash, e.g. after
    /// a local watch timed out. The broadcast itself is never retracted.
    pub async fn reattach(&self, tx_hash: H256) -> OrchResult<Confirmation> {
        let nonce = self
            .endpoint
            .get_transaction(tx_hash)
            .await?
            .map(|tx| tx.nonce.as_u64())
            .unwrap_or_default();
        self.watch(tx_hash, nonce).await
    }

    /// Poll a submitted transaction to a terminal outcome
    async fn watch(&self, tx_hash: H256, nonce: u64) -> OrchResult<Confirmation> {
        let started = Instant::now();
        let wait_timeout = Duration::from_secs(self.config.wait_timeout_secs);
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let watch_start_block = self
            .endpoint
            .get_block_number()
            .await
            .map_err(|e| watch_error(e, tx_hash, nonce))?;

        loop {
            if started.elapsed() >= wait_timeout {
                // Terminal for this wait only: the chain may still confirm.
                return Err(OrchestratorError::TimedOut {
                    tx_hash: format!("{tx_hash:?}"),
                    waited_secs: started.elapsed().as_secs(),
                });
            }

            let current_block = self
                .endpoint
                .get_block_number()
                .await
                .map_err(|e| watch_error(e, tx_hash, nonce))?;

            let receipt = self
                .endpoint
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| watch_error(e, tx_hash, nonce))?;
            match receipt {
                Some(receipt) => {
                    let inclusion_block = receipt
                        .block_number
                        .map(|b| b.as_u64())
                        .unwrap_or(current_block);
                    let margin = current_block.saturating_sub(inclusion_block);

                    if margin < self.config.finality_margin {
                        debug!(
                            tx_hash = ?tx_hash,
                            "Included at block {}, waiting finality margin {}/{}",
                            inclusion_block, margin, self.config.finality_margin
                        );
                    } else {
                        // Re-verify inclusion after the margin (reorg guard)
                        let recheck = self
                            .endpoint
                            .get_transaction_receipt(tx_hash)
                            .await
                            .map_err(|e| watch_error(e, tx_hash, nonce))?;
                        match recheck {
                            Some(receipt) if receipt.block_number.is_some() => {
                                if receipt.status == Some(1u64.into()) {
                                    info!(
                                        tx_hash = ?tx_hash,
                                        block = inclusion_block,
                                        "Transaction confirmed"
                                    );
                                    return Ok(Confirmation {
                                        tx_hash,
                                        nonce,
                                        block_number: inclusion_block,
                                        gas_used: receipt.gas_used,
                                        logs: receipt.logs,
                                    });
                                }

                                let reason = self
                                    .revert_reason(tx_hash, inclusion_block)
                                    .await
                                    .unwrap_or_else(|| "unknown revert".to_string());
                                return Err(OrchestratorError::Reverted {
                                    tx_hash: format!("{tx_hash:?}"),
                                    nonce,
                                    reason,
                                });
                            }
                            _ => {
                                warn!(
                                    tx_hash = ?tx_hash,
                                    "Receipt disappeared after inclusion, possible reorg; continuing to watch"
                                );
                            }
                        }
                    }
                }
                None => {
                    let blocks_waited = current_block.saturating_sub(watch_start_block);
                    if blocks_waited >= self.config.drop_after_blocks {
                        // Resubmission is a fresh Built state, never a
                        // retry of the same signed envelope.
                        return Err(OrchestratorError::Dropped {
                            tx_hash: format!("{tx_hash:?}"),
                            nonce,
                            blocks_waited,
                        });
                    }
                    debug!(
                        tx_hash = ?tx_hash,
                        blocks_waited, "No receipt yet"
                    );
                }
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Pre-flight `eth_call`; distinguishes execution reverts from
    /// transport failures.
    async fn simulate(&self, tx: &TypedTransaction) -> OrchResult<()> {
        match self.endpoint.call(tx, None).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let message = e.to_string();
                if looks_like_revert(&message) {
                    Err(OrchestratorError::WouldRevert {
                        reason: extract_revert_reason(&message),
                    })
                } else {
                    Err(OrchestratorError::ChainConnection(message))
                }
            }
        }
    }

    /// Replay a mined transaction as a call at its inclusion block to
    /// recover the revert reason, if the chain surfaces one.
    async fn revert_reason(&self, tx_hash: H256, block: u64) -> Option<String> {
        let tx = self.endpoint.get_transaction(tx_hash).await.ok()??;
        let replay = replay_request(&tx);
        match self
            .endpoint
            .call(&replay, Some(BlockNumber::Number(block.into())))
            .await
        {
            Err(e) => {
                let message = e.to_string();
                looks_like_revert(&message).then(|| extract_revert_reason(&message))
            }
            Ok(_) => None,
        }
    }

    fn build_transaction(
        &self,
        to: ethers::types::Address,
        data: Bytes,
        value: U256,
        nonce: u64,
        gas_limit: U256,
        gas_price: &GasPrice,
    ) -> TypedTransaction {
        let chain_id = self.endpoint.chain_id();
        match gas_price {
            GasPrice::Legacy(price) => TypedTransaction::Legacy(
                TransactionRequest::new()
                    .from(self.signer.address())
                    .to(to)
                    .data(data)
                    .value(value)
                    .nonce(nonce)
                    .gas(gas_limit)
                    .gas_price(*price)
                    .chain_id(chain_id),
            ),
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => TypedTransaction::Eip1559(
                Eip1559TransactionRequest::new()
                    .from(self.signer.address())
                    .to(to)
                    .data(data)
                    .value(value)
                    .nonce(nonce)
                    .gas(gas_limit)
                    .max_fee_per_gas(*max_fee_per_gas)
                    .max_priority_fee_per_gas(*max_priority_fee_per_gas)
                    .chain_id(chain_id),
            ),
        }
    }
}

/// Rebuild a read-only request from a mined transaction for replay
fn replay_request(tx: &Transaction) -> TypedTransaction {
    let mut req = TransactionRequest::new()
        .from(tx.from)
        .value(tx.value)
        .data(tx.input.clone())
        .gas(tx.gas);
    if let Some(to) = tx.to {
        req = req.to(to);
    }
    req.into()
}

fn looks_like_revert(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("revert") || lower.contains("0x08c379a0")
}

/// Pull a human-readable reason out of a JSON-RPC revert error
fn extract_revert_reason(message: &str) -> String {
    if let Some(idx) = message.find("execution reverted") {
        let rest = message[idx + "execution reverted".len()..]
            .trim_start_matches(':')
            .trim_start();
        let reason: &str = rest
            .split(|c| c == '"' || c == ',' || c == ')')
            .next()
            .unwrap_or("")
            .trim();
        if !reason.is_empty() {
            return reason.to_string();
        }
    }

    // ABI-encoded Error(string) blob embedded in the message
    if let Some(pos) = message.find("0x08c379a0") {
        let hex_str: String = message[pos + 2..]
            .chars()
            .take_while(|c| c.is_ascii_hexdigit())
            .collect();
        if let Ok(bytes) = hex::decode(&hex_str) {
            if let Some(reason) = decode_revert_bytes(&bytes) {
                return reason;
            }
        }
    }

    message.to_string()
}

/// Decode an ABI-encoded `Error(string)` revert payload
fn decode_revert_bytes(data: &[u8]) -> Option<String> {
    const ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
    if data.len() < 4 || data[..4] != ERROR_SELECTOR {
        return None;
    }
    let tokens = ethers::abi::decode(&[ParamType::String], &data[4..]).ok()?;
    match tokens.into_iter().next() {
        Some(Token::String(s)) => Some(s),
        _ => None,
    }
}

/// A transport failure while watching keeps the hash and nonce so the
/// operator can re-attach once connectivity returns.
fn watch_error(e: OrchestratorError, tx_hash: H256, nonce: u64) -> OrchestratorError {
    match e {
        OrchestratorError::ChainConnection(msg) => OrchestratorError::ChainConnection(format!(
            "{msg} (while watching {tx_hash:?}, nonce {nonce})"
        )),
        other => other,
    }
}

/// The node already holds this exact signed envelope. Not a rejection:
/// the transaction is in flight under its precomputed hash.
fn is_already_known(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already known") || lower.contains("known transaction")
}

/// Map an eth_sendRawTransaction error to a typed rejection.
/// Returns the error and whether the local nonce view is stale.
fn classify_submission_error(nonce: u64, message: &str) -> (OrchestratorError, bool) {
    let lower = message.to_lowercase();

    let (reason, stale_nonce) = if lower.contains("nonce too low") {
        ("nonce too low".to_string(), true)
    } else if lower.contains("underpriced") {
        ("fee too low for current network conditions".to_string(), false)
    } else if lower.contains("insufficient funds") {
        ("insufficient native balance for fee + value".to_string(), false)
    } else {
        (message.to_string(), false)
    };

    (
        OrchestratorError::SubmissionRejected { nonce, reason },
        stale_nonce,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EndpointConfig, GasPriceStrategy};
    use ethers::providers::{JsonRpcError, MockProvider, MockResponse};
    use ethers::types::{Address, TransactionReceipt, U64};

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn fast_config() -> EngineConfig {
        EngineConfig {
            finality_margin: 1,
            poll_interval_ms: 1,
            drop_after_blocks: 2,
            wait_timeout_secs: 60,
            gas_price_strategy: GasPriceStrategy::Legacy,
            max_gas_price_gwei: 500,
            gas_limit_buffer_percent: 20,
        }
    }

    fn scripted_engine(config: EngineConfig) -> (LifecycleEngine<MockProvider>, MockProvider) {
        let (endpoint, mock) = Endpoint::mocked(
            EndpointConfig {
                chain_id: 43114,
                rpc_urls: vec![],
            },
            config.gas_price_strategy,
            config.max_gas_price_gwei,
        );
        let signer = SigningIdentity::from_key(TEST_KEY, 43114).unwrap();
        (
            LifecycleEngine::new(Arc::new(endpoint), Arc::new(signer), config),
            mock,
        )
    }

    fn swap_intent() -> CallIntent {
        let router = ContractBinding::router(Address::repeat_byte(0x11)).unwrap();
        CallIntent::new(
            router,
            "swapExactTokensForAVAX",
            vec![
                Token::Uint(U256::from(1_000u64)),
                Token::Uint(U256::from(990u64)),
                Token::Array(vec![
                    Token::Address(Address::repeat_byte(0x22)),
                    Token::Address(Address::repeat_byte(0x33)),
                ]),
                Token::Address(Address::repeat_byte(0x44)),
                Token::Uint(U256::from(9_999_999_999u64)),
            ],
        )
    }

    #[tokio::test]
    async fn failed_simulation_never_reaches_submission() {
        let (engine, mock) = scripted_engine(fast_config());
        // The simulation is the only scripted exchange. Any later step
        // would fail on the empty script and classify differently, so a
        // WouldRevert proves execution stopped before submission.
        mock.push_response(MockResponse::Error(JsonRpcError {
            code: 3,
            message: "execution reverted: PangolinRouter: EXPIRED".to_string(),
            data: None,
        }));

        let err = engine.execute(swap_intent()).await.unwrap_err();
        match err {
            OrchestratorError::WouldRevert { reason } => {
                assert!(reason.contains("EXPIRED"), "got reason {reason:?}")
            }
            other => panic!("expected WouldRevert, got {other}"),
        }
    }

    #[tokio::test]
    async fn unmined_transaction_is_dropped_after_the_block_budget() {
        let (engine, mock) = scripted_engine(fast_config()); // budget: 2 blocks
        // Responses pop newest-first; pushed in reverse of consumption.
        mock.push(()).unwrap(); // receipt at block 102: none
        mock.push(U64::from(102u64)).unwrap();
        mock.push(()).unwrap(); // receipt at block 101: none
        mock.push(U64::from(101u64)).unwrap();
        mock.push(()).unwrap(); // receipt at block 100: none
        mock.push(U64::from(100u64)).unwrap();
        mock.push(U64::from(100u64)).unwrap(); // watch start block
        mock.push(()).unwrap(); // eth_getTransactionByHash: unknown

        let err = engine.reattach(H256::repeat_byte(0x55)).await.unwrap_err();
        match err {
            OrchestratorError::Dropped { blocks_waited, .. } => assert_eq!(blocks_waited, 2),
            other => panic!("expected Dropped, got {other}"),
        }
    }

    #[tokio::test]
    async fn watch_times_out_on_the_wall_clock() {
        let mut config = fast_config();
        config.wait_timeout_secs = 0;
        let (engine, mock) = scripted_engine(config);
        mock.push(U64::from(100u64)).unwrap(); // watch start block
        mock.push(()).unwrap(); // eth_getTransactionByHash: unknown

        let err = engine.reattach(H256::repeat_byte(0x66)).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::TimedOut { .. }));
    }

    #[tokio::test]
    async fn already_known_submission_is_watched_to_confirmation() {
        let (engine, mock) = scripted_engine(fast_config());

        let receipt = TransactionReceipt {
            block_number: Some(U64::from(100u64)),
            status: Some(U64::from(1u64)),
            ..Default::default()
        };
        // Reverse of: simulate, estimateGas, gasPrice, pending nonce,
        // sendRaw ("already known"), start block, then two poll rounds
        // (the second passes the finality margin and re-checks).
        mock.push(receipt.clone()).unwrap(); // reorg re-check
        mock.push(receipt.clone()).unwrap(); // receipt at block 101
        mock.push(U64::from(101u64)).unwrap();
        mock.push(receipt).unwrap(); // receipt at block 100, margin 0
        mock.push(U64::from(100u64)).unwrap();
        mock.push(U64::from(100u64)).unwrap(); // watch start block
        mock.push_response(MockResponse::Error(JsonRpcError {
            code: -32000,
            message: "already known".to_string(),
            data: None,
        }));
        mock.push(U256::from(5u64)).unwrap(); // pending nonce
        mock.push(U256::from(1_000_000_000u64)).unwrap(); // gas price
        mock.push(U256::from(21_000u64)).unwrap(); // gas estimate
        mock.push::<Bytes, _>(Bytes::default()).unwrap(); // simulation output

        let confirmation = engine.execute(swap_intent()).await.unwrap();
        assert_eq!(confirmation.nonce, 5);
        assert_eq!(confirmation.block_number, 100);
        assert_ne!(confirmation.tx_hash, H256::zero());
    }

    #[test]
    fn already_known_is_not_a_rejection() {
        assert!(is_already_known("already known"));
        assert!(is_already_known("ALREADY KNOWN"));
        assert!(is_already_known("known transaction: 0x1234"));
        assert!(!is_already_known("nonce too low"));
        assert!(!is_already_known("replacement transaction underpriced"));
    }

    #[test]
    fn watch_failures_carry_the_hash_and_nonce() {
        let hash = H256::repeat_byte(0x77);
        let wrapped = watch_error(
            OrchestratorError::ChainConnection("All providers failed: timeout".into()),
            hash,
            12,
        );
        match wrapped {
            OrchestratorError::ChainConnection(msg) => {
                assert!(msg.contains(&format!("{hash:?}")));
                assert!(msg.contains("nonce 12"));
            }
            other => panic!("unexpected: {other}"),
        }

        // Non-transport outcomes pass through untouched
        let terminal = watch_error(
            OrchestratorError::TimedOut {
                tx_hash: format!("{hash:?}"),
                waited_secs: 1,
            },
            hash,
            12,
        );
        assert!(matches!(terminal, OrchestratorError::TimedOut { .. }));
    }

    #[test]
    fn terminal_states() {
        for state in [TxState::Built, TxState::Signed, TxState::Submitted, TxState::Pending] {
            assert!(!state.is_terminal());
        }
        for state in [
            TxState::Confirmed,
            TxState::Reverted,
            TxState::Dropped,
            TxState::TimedOut,
        ] {
            assert!(state.is_terminal());
        }
    }

    #[test]
    fn revert_reason_from_message() {
        let msg = "(code: 3, message: execution reverted: PangolinRouter: EXPIRED, data: None)";
        assert_eq!(extract_revert_reason(msg), "PangolinRouter: EXPIRED");
        assert!(looks_like_revert(msg));
        assert!(!looks_like_revert("connection refused"));
    }

    #[test]
    fn revert_reason_from_encoded_error() {
        // Error("INSUFFICIENT_OUTPUT_AMOUNT")
        let mut data = vec![0x08, 0xc3, 0x79, 0xa0];
        data.extend(ethers::abi::encode(&[Token::String(
            "INSUFFICIENT_OUTPUT_AMOUNT".to_string(),
        )]));
        assert_eq!(
            decode_revert_bytes(&data).as_deref(),
            Some("INSUFFICIENT_OUTPUT_AMOUNT")
        );

        let msg = format!("execution reverted, data: \"0x{}\"", hex::encode(&data));
        assert_eq!(extract_revert_reason(&msg), "INSUFFICIENT_OUTPUT_AMOUNT");
    }

    #[test]
    fn revert_decoding_rejects_other_selectors() {
        assert!(decode_revert_bytes(&[0x01, 0x02, 0x03, 0x04, 0x00]).is_none());
        assert!(decode_revert_bytes(&[0x08, 0xc3]).is_none());
    }

    #[test]
    fn submission_errors_are_classified() {
        let (err, stale) = classify_submission_error(9, "nonce too low: next nonce 12");
        assert!(stale);
        assert!(matches!(
            err,
            OrchestratorError::SubmissionRejected { nonce: 9, .. }
        ));

        let (err, stale) = classify_submission_error(3, "replacement transaction underpriced");
        assert!(!stale);
        match err {
            OrchestratorError::SubmissionRejected { reason, .. } => {
                assert!(reason.contains("fee too low"))
            }
            other => panic!("unexpected: {other}"),
        }

        let (_, stale) = classify_submission_error(0, "insufficient funds for gas * price + value");
        assert!(!stale);
    }
}
