//! Chain Adapter Abstraction
//!
//! This module provides the `ChainAdapter` trait, the engine's only gateway
//! to a target network. It decouples graph execution from any particular
//! backend:
//! - Development nodes via JSON-RPC
//! - A deterministic in-process simulator
//! - Mock responses for testing
//!
//! The trait is intentionally minimal, containing only the operations the
//! execution engine suspends on. Retry policy belongs to implementations or
//! an outer control loop, never to the engine.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use ignis_types::{Address, TxHash, Wei};

/// What a submitted transaction is asked to do. The adapter performs the
/// backend-specific encoding and signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SubmitPayload {
    /// Create a contract from linked creation bytecode.
    Deploy {
        bytecode: String,
        #[serde(default)]
        args: Vec<Value>,
        value: Wei,
    },
    /// Invoke a state-changing function on a deployed contract.
    Call {
        to: Address,
        function_name: String,
        #[serde(default)]
        args: Vec<Value>,
        value: Wei,
    },
    /// Transfer value, optionally carrying raw calldata.
    Send {
        to: Address,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        value: Wei,
    },
}

/// One nonce-consuming submission on behalf of a future.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub from: Address,
    pub nonce: u64,
    pub payload: SubmitPayload,
}

/// Handle for a submission the network has accepted into its mempool.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionHandle {
    pub tx_hash: TxHash,
}

/// Terminal outcome of waiting on a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationOutcome {
    /// Landed successfully; deployments carry the created contract address.
    Confirmed { contract_address: Option<Address> },
    /// Definitively failed on-chain (reverted or rejected).
    Failed { reason: String },
    /// Not observed within the timeout budget. The transaction may still
    /// land later; callers must not assume it did not happen.
    TimedOut,
}

/// Gateway to the target network.
///
/// Every method is fallible and possibly slow. An `Err` from `submit` means
/// the network rejected the request outright (estimation failure, invalid
/// nonce); an `Ok` handle means it was accepted and can be awaited.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Accounts available for sending, index-addressable from module files.
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Next unused nonce for an account, as the network currently sees it.
    async fn current_nonce(&self, account: &Address) -> Result<u64>;

    /// Sign and submit one request.
    async fn submit(&self, request: &SubmitRequest) -> Result<InteractionHandle>;

    /// Poll until the submission confirms, definitively fails, or the
    /// timeout elapses.
    async fn wait_for_confirmation(
        &self,
        handle: &InteractionHandle,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<ConfirmationOutcome>;

    /// Read-only call; consumes no nonce.
    async fn static_call(
        &self,
        address: &Address,
        function_name: &str,
        args: &[Value],
    ) -> Result<Value>;

    /// Extract one argument of an event emitted by a confirmed transaction.
    async fn read_event_argument(
        &self,
        tx_hash: &TxHash,
        event_name: &str,
        argument_name: &str,
        event_index: u64,
        emitter: &Address,
    ) -> Result<Value>;

    /// Short name of the backing network (for logging/debugging).
    fn network_name(&self) -> &str;
}

/// An adapter that always returns errors. Stands in for a backend in
/// wiring that has not selected one yet.
pub struct NoopChainAdapter;

impl NoopChainAdapter {
    fn unavailable<T>() -> Result<T> {
        Err(anyhow::anyhow!(
            "no chain backend configured. Pass --rpc-url for a JSON-RPC node or --simulate for the in-process chain."
        ))
    }
}

#[async_trait]
impl ChainAdapter for NoopChainAdapter {
    async fn accounts(&self) -> Result<Vec<Address>> {
        Self::unavailable()
    }

    async fn current_nonce(&self, _account: &Address) -> Result<u64> {
        Self::unavailable()
    }

    async fn submit(&self, _request: &SubmitRequest) -> Result<InteractionHandle> {
        Self::unavailable()
    }

    async fn wait_for_confirmation(
        &self,
        _handle: &InteractionHandle,
        _poll_interval: Duration,
        _timeout: Duration,
    ) -> Result<ConfirmationOutcome> {
        Self::unavailable()
    }

    async fn static_call(
        &self,
        _address: &Address,
        _function_name: &str,
        _args: &[Value],
    ) -> Result<Value> {
        Self::unavailable()
    }

    async fn read_event_argument(
        &self,
        _tx_hash: &TxHash,
        _event_name: &str,
        _argument_name: &str,
        _event_index: u64,
        _emitter: &Address,
    ) -> Result<Value> {
        Self::unavailable()
    }

    fn network_name(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_adapter_returns_errors() {
        let adapter = NoopChainAdapter;
        assert!(adapter.accounts().await.is_err());
        let account = Address::new("0xba12222222228d8ba445958a75a0704d566bf2c8").unwrap();
        assert!(adapter.current_nonce(&account).await.is_err());
        assert_eq!(adapter.network_name(), "none");
    }

    #[test]
    fn test_submit_payload_serde_tags() {
        let payload = SubmitPayload::Send {
            to: Address::new("0xba12222222228d8ba445958a75a0704d566bf2c8").unwrap(),
            data: None,
            value: Wei(100),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "send");
        assert_eq!(json["value"], "100");
        assert!(json.get("data").is_none());
    }
}
