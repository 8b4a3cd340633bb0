//! Deterministic in-process chain simulator.
//!
//! Powers `deploy --simulate`: accounts, transaction hashes, and contract
//! addresses are all derived from submission contents with sha256, so
//! repeated runs of the same module produce identical journals. The
//! simulator enforces strict nonce ordering like a real node, which makes it
//! useful for exercising the engine's per-account serialization.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

use ignis_types::{Address, TxHash};

use crate::adapter::{
    ChainAdapter, ConfirmationOutcome, InteractionHandle, SubmitPayload, SubmitRequest,
};

#[derive(Debug, Default)]
struct SimState {
    nonces: HashMap<Address, u64>,
    /// Confirmed-on-next-wait submissions by hash; deploys carry the derived
    /// contract address.
    pending: HashMap<TxHash, Option<Address>>,
    static_calls: HashMap<(Address, String), Value>,
    event_arguments: HashMap<(String, String, u64), Value>,
}

/// In-process chain with derived identities and strict nonce checking.
#[derive(Debug)]
pub struct SimulatedChainAdapter {
    accounts: Vec<Address>,
    state: Mutex<SimState>,
}

fn hash_hex(input: &str, bytes: usize) -> String {
    let digest = Sha256::digest(input.as_bytes());
    format!("0x{}", hex::encode(&digest[..bytes]))
}

impl SimulatedChainAdapter {
    /// Create a simulator with `count` derived accounts.
    pub fn new(count: usize) -> Result<Self> {
        let accounts = (0..count)
            .map(|i| Address::new(&hash_hex(&format!("ignis/account/{i}"), 20)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            accounts,
            state: Mutex::new(SimState::default()),
        })
    }

    /// Script a static-call return value; unscripted calls return "0x".
    pub fn set_static_call(&self, address: &Address, function_name: &str, value: Value) -> &Self {
        self.state
            .lock()
            .static_calls
            .insert((address.clone(), function_name.to_string()), value);
        self
    }

    /// Script an event-argument read; unscripted reads return "0x".
    pub fn set_event_argument(
        &self,
        event_name: &str,
        argument_name: &str,
        event_index: u64,
        value: Value,
    ) -> &Self {
        self.state.lock().event_arguments.insert(
            (
                event_name.to_string(),
                argument_name.to_string(),
                event_index,
            ),
            value,
        );
        self
    }
}

#[async_trait]
impl ChainAdapter for SimulatedChainAdapter {
    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.accounts.clone())
    }

    async fn current_nonce(&self, account: &Address) -> Result<u64> {
        Ok(self.state.lock().nonces.get(account).copied().unwrap_or(0))
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<InteractionHandle> {
        let mut state = self.state.lock();
        let expected = state.nonces.get(&request.from).copied().unwrap_or(0);
        if request.nonce != expected {
            bail!(
                "invalid nonce for {}: expected {}, got {}",
                request.from,
                expected,
                request.nonce
            );
        }

        let seed = format!("ignis/tx/{}/{}", request.from, request.nonce);
        let tx_hash = TxHash::new(&hash_hex(&seed, 32))
            .map_err(|e| anyhow!("derived hash invalid: {e}"))?;
        let contract_address = match request.payload {
            SubmitPayload::Deploy { .. } => {
                let seed = format!("ignis/contract/{}/{}", request.from, request.nonce);
                Some(Address::new(&hash_hex(&seed, 20))?)
            }
            _ => None,
        };

        state.nonces.insert(request.from.clone(), expected + 1);
        state.pending.insert(tx_hash.clone(), contract_address);
        Ok(InteractionHandle { tx_hash })
    }

    async fn wait_for_confirmation(
        &self,
        handle: &InteractionHandle,
        _poll_interval: Duration,
        _timeout: Duration,
    ) -> Result<ConfirmationOutcome> {
        let state = self.state.lock();
        match state.pending.get(&handle.tx_hash) {
            Some(contract_address) => Ok(ConfirmationOutcome::Confirmed {
                contract_address: contract_address.clone(),
            }),
            None => bail!("unknown transaction {}", handle.tx_hash),
        }
    }

    async fn static_call(
        &self,
        address: &Address,
        function_name: &str,
        _args: &[Value],
    ) -> Result<Value> {
        let state = self.state.lock();
        match state
            .static_calls
            .get(&(address.clone(), function_name.to_string()))
        {
            Some(value) => Ok(value.clone()),
            None => {
                warn!(%address, function_name, "no simulated return configured, using \"0x\"");
                Ok(Value::String("0x".to_string()))
            }
        }
    }

    async fn read_event_argument(
        &self,
        _tx_hash: &TxHash,
        event_name: &str,
        argument_name: &str,
        event_index: u64,
        _emitter: &Address,
    ) -> Result<Value> {
        let state = self.state.lock();
        match state.event_arguments.get(&(
            event_name.to_string(),
            argument_name.to_string(),
            event_index,
        )) {
            Some(value) => Ok(value.clone()),
            None => {
                warn!(
                    event_name,
                    argument_name, event_index, "no simulated event argument configured, using \"0x\""
                );
                Ok(Value::String("0x".to_string()))
            }
        }
    }

    fn network_name(&self) -> &str {
        "simulated"
    }
}
