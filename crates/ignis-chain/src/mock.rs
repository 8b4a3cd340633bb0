//! A mock chain adapter for testing that returns pre-configured responses.
//!
//! Use this in tests to avoid network dependencies and to script specific
//! scenarios: rejected submissions, reverted transactions, confirmation
//! timeouts, or exact contract addresses and transaction hashes.
//!
//! Configuration methods take `&self` so a mock already shared through an
//! `Arc<dyn ChainAdapter>` can still be scripted and inspected mid-test.
//!
//! # Example
//! ```
//! use ignis_chain::{ChainAdapter, MockChainAdapter};
//! use ignis_types::Address;
//!
//! let mock = MockChainAdapter::with_account_strings(&[
//!     "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc",
//! ]).unwrap();
//! mock.queue_tx_hash("0x123");
//! mock.queue_deploy_address("0x1f98431c8ad98523631ae4a59f267346ea31f984");
//! ```

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use ignis_types::{Address, TxHash};

use crate::adapter::{
    ChainAdapter, ConfirmationOutcome, InteractionHandle, SubmitPayload, SubmitRequest,
};

#[derive(Debug, Default)]
struct MockState {
    accounts: Vec<Address>,
    /// Per-account starting nonce reported by `current_nonce`.
    nonces: HashMap<Address, u64>,
    /// Every request accepted by `submit`, in true submission order.
    submissions: Vec<SubmitRequest>,
    /// Hash handed out for each accepted submission, parallel to
    /// `submissions`.
    issued_hashes: Vec<TxHash>,
    /// Payload kind by hash so confirmations know whether to carry an
    /// address.
    deploys: HashMap<TxHash, ()>,
    /// Explicit hashes to hand out, in order, before generated ones.
    queued_hashes: VecDeque<TxHash>,
    /// Addresses to hand out for deploy confirmations before derived ones.
    queued_deploy_addresses: VecDeque<Address>,
    /// Explicit outcome per hash; anything else confirms.
    outcomes: HashMap<TxHash, ConfirmationOutcome>,
    /// (contract address, function name) -> return value.
    static_calls: HashMap<(Address, String), Value>,
    /// (tx hash, event, argument, index) -> value.
    event_arguments: HashMap<(TxHash, String, String, u64), Value>,
    /// One-shot error for the next submit.
    next_submit_error: Option<String>,
    /// If set, all calls return this error.
    force_error: Option<String>,
    generated: u64,
}

/// Scriptable in-memory adapter for tests.
#[derive(Debug, Default)]
pub struct MockChainAdapter {
    state: Mutex<MockState>,
}

impl MockChainAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with the given sending accounts (index order preserved).
    pub fn with_accounts(accounts: Vec<Address>) -> Self {
        let mock = Self::new();
        mock.state.lock().accounts = accounts;
        mock
    }

    /// Convenience constructor parsing account addresses from strings.
    pub fn with_account_strings(accounts: &[&str]) -> Result<Self> {
        let parsed = accounts
            .iter()
            .map(|a| Address::new(a))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::with_accounts(parsed))
    }

    /// Override the starting nonce `current_nonce` reports for an account.
    pub fn set_current_nonce(&self, account: &Address, nonce: u64) -> &Self {
        self.state.lock().nonces.insert(account.clone(), nonce);
        self
    }

    /// Queue an explicit transaction hash for the next accepted submission.
    pub fn queue_tx_hash(&self, hash: &str) -> &Self {
        let hash = TxHash::new(hash).unwrap_or_else(|_| panic!("invalid mock tx hash {hash:?}"));
        self.state.lock().queued_hashes.push_back(hash);
        self
    }

    /// Queue the contract address the next confirmed deploy reports.
    pub fn queue_deploy_address(&self, address: &str) -> &Self {
        let address =
            Address::new(address).unwrap_or_else(|_| panic!("invalid mock address {address:?}"));
        self.state.lock().queued_deploy_addresses.push_back(address);
        self
    }

    /// Script the confirmation outcome for a specific hash.
    pub fn set_outcome(&self, hash: &str, outcome: ConfirmationOutcome) -> &Self {
        let hash = TxHash::new(hash).unwrap_or_else(|_| panic!("invalid mock tx hash {hash:?}"));
        self.state.lock().outcomes.insert(hash, outcome);
        self
    }

    /// Make the next submit fail with the given reason (one-shot).
    pub fn fail_next_submit(&self, reason: &str) -> &Self {
        self.state.lock().next_submit_error = Some(reason.to_string());
        self
    }

    /// Script a static-call return value.
    pub fn set_static_call(&self, address: &Address, function_name: &str, value: Value) -> &Self {
        self.state
            .lock()
            .static_calls
            .insert((address.clone(), function_name.to_string()), value);
        self
    }

    /// Script an event-argument read.
    pub fn set_event_argument(
        &self,
        tx_hash: &str,
        event_name: &str,
        argument_name: &str,
        event_index: u64,
        value: Value,
    ) -> &Self {
        let hash =
            TxHash::new(tx_hash).unwrap_or_else(|_| panic!("invalid mock tx hash {tx_hash:?}"));
        self.state.lock().event_arguments.insert(
            (
                hash,
                event_name.to_string(),
                argument_name.to_string(),
                event_index,
            ),
            value,
        );
        self
    }

    /// Force all subsequent calls to return the given error.
    pub fn set_error(&self, error: &str) -> &Self {
        self.state.lock().force_error = Some(error.to_string());
        self
    }

    /// Clear the forced error, restoring normal mock behavior.
    pub fn clear_error(&self) -> &Self {
        self.state.lock().force_error = None;
        self
    }

    /// Every request accepted so far, in true submission order.
    pub fn submissions(&self) -> Vec<SubmitRequest> {
        self.state.lock().submissions.clone()
    }

    /// Nonces submitted by one account, in true submission order.
    pub fn submitted_nonces(&self, account: &Address) -> Vec<u64> {
        self.state
            .lock()
            .submissions
            .iter()
            .filter(|r| &r.from == account)
            .map(|r| r.nonce)
            .collect()
    }

    fn check_forced(state: &MockState) -> Result<()> {
        if let Some(ref error) = state.force_error {
            return Err(anyhow!("{}", error));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainAdapter for MockChainAdapter {
    async fn accounts(&self) -> Result<Vec<Address>> {
        let state = self.state.lock();
        Self::check_forced(&state)?;
        Ok(state.accounts.clone())
    }

    async fn current_nonce(&self, account: &Address) -> Result<u64> {
        let state = self.state.lock();
        Self::check_forced(&state)?;
        Ok(state.nonces.get(account).copied().unwrap_or(0))
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<InteractionHandle> {
        let mut state = self.state.lock();
        Self::check_forced(&state)?;
        if let Some(reason) = state.next_submit_error.take() {
            return Err(anyhow!("{}", reason));
        }

        let tx_hash = match state.queued_hashes.pop_front() {
            Some(hash) => hash,
            None => {
                state.generated += 1;
                let generated = state.generated;
                TxHash::new(&format!("0x{:x}", 0x1000 + generated))
                    .map_err(|e| anyhow!("generated hash invalid: {e}"))?
            }
        };

        if matches!(request.payload, SubmitPayload::Deploy { .. }) {
            state.deploys.insert(tx_hash.clone(), ());
        }
        state.submissions.push(request.clone());
        state.issued_hashes.push(tx_hash.clone());
        Ok(InteractionHandle { tx_hash })
    }

    async fn wait_for_confirmation(
        &self,
        handle: &InteractionHandle,
        _poll_interval: Duration,
        _timeout: Duration,
    ) -> Result<ConfirmationOutcome> {
        let mut state = self.state.lock();
        Self::check_forced(&state)?;
        if let Some(outcome) = state.outcomes.get(&handle.tx_hash) {
            return Ok(outcome.clone());
        }

        if state.deploys.contains_key(&handle.tx_hash) {
            let address = match state.queued_deploy_addresses.pop_front() {
                Some(address) => address,
                None => {
                    state.generated += 1;
                    let generated = state.generated;
                    Address::new(&format!("0x{:040x}", 0xace0_0000u64 + generated))
                        .map_err(|e| anyhow!("generated address invalid: {e}"))?
                }
            };
            return Ok(ConfirmationOutcome::Confirmed {
                contract_address: Some(address),
            });
        }

        Ok(ConfirmationOutcome::Confirmed {
            contract_address: None,
        })
    }

    async fn static_call(
        &self,
        address: &Address,
        function_name: &str,
        _args: &[Value],
    ) -> Result<Value> {
        let state = self.state.lock();
        Self::check_forced(&state)?;
        state
            .static_calls
            .get(&(address.clone(), function_name.to_string()))
            .cloned()
            .ok_or_else(|| {
                anyhow!("MockChainAdapter: no static call response configured for {address}.{function_name}")
            })
    }

    async fn read_event_argument(
        &self,
        tx_hash: &TxHash,
        event_name: &str,
        argument_name: &str,
        event_index: u64,
        _emitter: &Address,
    ) -> Result<Value> {
        let state = self.state.lock();
        Self::check_forced(&state)?;
        state
            .event_arguments
            .get(&(
                tx_hash.clone(),
                event_name.to_string(),
                argument_name.to_string(),
                event_index,
            ))
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "MockChainAdapter: no event argument configured for {tx_hash} {event_name}.{argument_name}[{event_index}]"
                )
            })
    }

    fn network_name(&self) -> &str {
        "mock"
    }
}
