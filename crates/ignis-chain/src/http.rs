//! JSON-RPC chain adapter for development nodes.
//!
//! Speaks the standard `eth_*` method family against nodes that manage
//! unlocked accounts (dev-mode geth, anvil): the node signs,
//! this adapter only shapes requests and polls receipts. Calldata encoding
//! is out of scope for this workspace, so calls accept pre-encoded `0x`
//! data in place of a function name, and event-argument extraction reports
//! an error directing users to an ABI-capable adapter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use ignis_types::{Address, TxHash};

use crate::adapter::{
    ChainAdapter, ConfirmationOutcome, InteractionHandle, SubmitPayload, SubmitRequest,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Adapter for JSON-RPC development nodes with unlocked accounts.
pub struct HttpChainAdapter {
    endpoint: String,
    agent: ureq::Agent,
    required_confirmations: u64,
    next_id: AtomicU64,
}

impl HttpChainAdapter {
    /// Create a client for the given JSON-RPC endpoint.
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            agent: Self::build_agent(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT),
            required_confirmations: 1,
            next_id: AtomicU64::new(1),
        }
    }

    /// Require this many confirmations before reporting a submission
    /// confirmed.
    pub fn with_required_confirmations(mut self, confirmations: u64) -> Self {
        self.required_confirmations = confirmations.max(1);
        self
    }

    fn build_agent(timeout: Duration, connect_timeout: Duration) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(timeout)
            .timeout_connect(connect_timeout)
            .build()
    }

    /// Execute one JSON-RPC call on the blocking pool.
    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "json-rpc request");

        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let method_name = method.to_string();
        let response: Value = tokio::task::spawn_blocking(move || -> Result<Value> {
            agent
                .post(&endpoint)
                .set("Content-Type", "application/json")
                .send_json(&body)
                .map_err(|e| anyhow!("JSON-RPC request {method_name} failed: {e}"))?
                .into_json()
                .map_err(|e| anyhow!("failed to parse JSON-RPC response: {e}"))
        })
        .await
        .context("JSON-RPC task panicked")??;

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            bail!("JSON-RPC error from {method}: {message}");
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow!("no result in JSON-RPC response for {method}"))
    }

    /// Shape the `eth_sendTransaction` parameter object for a request.
    fn transaction_object(request: &SubmitRequest) -> Result<Value> {
        let mut tx = json!({
            "from": request.from.as_str(),
            "nonce": quantity(request.nonce as u128),
        });
        let obj = tx
            .as_object_mut()
            .ok_or_else(|| anyhow!("transaction object must be a map"))?;
        match &request.payload {
            SubmitPayload::Deploy {
                bytecode,
                args,
                value,
            } => {
                if !args.is_empty() {
                    bail!(
                        "constructor arguments require pre-encoded bytecode; the JSON-RPC adapter has no ABI encoder"
                    );
                }
                obj.insert("data".to_string(), Value::String(bytecode.clone()));
                obj.insert("value".to_string(), Value::String(quantity(value.0)));
            }
            SubmitPayload::Call {
                to,
                function_name,
                args,
                value,
            } => {
                let data = precoded_calldata(function_name, args)?;
                obj.insert("to".to_string(), Value::String(to.to_string()));
                obj.insert("data".to_string(), Value::String(data));
                obj.insert("value".to_string(), Value::String(quantity(value.0)));
            }
            SubmitPayload::Send { to, data, value } => {
                obj.insert("to".to_string(), Value::String(to.to_string()));
                obj.insert("value".to_string(), Value::String(quantity(value.0)));
                if let Some(data) = data {
                    obj.insert("data".to_string(), Value::String(data.clone()));
                }
            }
        }
        Ok(tx)
    }
}

fn quantity(value: u128) -> String {
    format!("0x{value:x}")
}

fn parse_quantity(value: &Value) -> Result<u64> {
    let text = value
        .as_str()
        .ok_or_else(|| anyhow!("expected a hex quantity, got {value}"))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    u64::from_str_radix(digits, 16).with_context(|| format!("invalid hex quantity {text:?}"))
}

/// Accept a `0x...` function name as already-encoded calldata.
fn precoded_calldata(function_name: &str, args: &[Value]) -> Result<String> {
    if function_name.starts_with("0x") && args.is_empty() {
        return Ok(function_name.to_string());
    }
    bail!(
        "function calls require pre-encoded calldata (pass \"0x...\" as the function name); the JSON-RPC adapter has no ABI encoder"
    )
}

#[async_trait]
impl ChainAdapter for HttpChainAdapter {
    async fn accounts(&self) -> Result<Vec<Address>> {
        let result = self.rpc("eth_accounts", json!([])).await?;
        let raw = result
            .as_array()
            .ok_or_else(|| anyhow!("eth_accounts returned a non-array: {result}"))?;
        raw.iter()
            .map(|entry| {
                entry
                    .as_str()
                    .ok_or_else(|| anyhow!("eth_accounts entry is not a string: {entry}"))
                    .and_then(Address::new)
            })
            .collect()
    }

    async fn current_nonce(&self, account: &Address) -> Result<u64> {
        let result = self
            .rpc(
                "eth_getTransactionCount",
                json!([account.as_str(), "pending"]),
            )
            .await?;
        parse_quantity(&result)
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<InteractionHandle> {
        let tx = Self::transaction_object(request)?;
        let result = self.rpc("eth_sendTransaction", json!([tx])).await?;
        let hash = result
            .as_str()
            .ok_or_else(|| anyhow!("eth_sendTransaction returned a non-string: {result}"))?;
        Ok(InteractionHandle {
            tx_hash: TxHash::new(hash)?,
        })
    }

    async fn wait_for_confirmation(
        &self,
        handle: &InteractionHandle,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<ConfirmationOutcome> {
        let started = Instant::now();
        loop {
            let receipt = self
                .rpc(
                    "eth_getTransactionReceipt",
                    json!([handle.tx_hash.as_str()]),
                )
                .await?;

            if !receipt.is_null() {
                let status = receipt
                    .get("status")
                    .map(parse_quantity)
                    .transpose()?
                    .unwrap_or(1);
                if status == 0 {
                    return Ok(ConfirmationOutcome::Failed {
                        reason: format!("transaction {} reverted", handle.tx_hash),
                    });
                }

                let mut confirmed = true;
                if self.required_confirmations > 1 {
                    let mined_in = receipt
                        .get("blockNumber")
                        .map(parse_quantity)
                        .transpose()?
                        .unwrap_or(0);
                    let latest = parse_quantity(&self.rpc("eth_blockNumber", json!([])).await?)?;
                    confirmed = latest.saturating_sub(mined_in) + 1 >= self.required_confirmations;
                }
                if confirmed {
                    let contract_address = match receipt.get("contractAddress") {
                        Some(Value::String(s)) => Some(Address::new(s)?),
                        _ => None,
                    };
                    return Ok(ConfirmationOutcome::Confirmed { contract_address });
                }
            }

            if started.elapsed() >= timeout {
                return Ok(ConfirmationOutcome::TimedOut);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn static_call(
        &self,
        address: &Address,
        function_name: &str,
        args: &[Value],
    ) -> Result<Value> {
        let data = precoded_calldata(function_name, args)?;
        self.rpc(
            "eth_call",
            json!([{ "to": address.as_str(), "data": data }, "latest"]),
        )
        .await
    }

    async fn read_event_argument(
        &self,
        _tx_hash: &TxHash,
        _event_name: &str,
        _argument_name: &str,
        _event_index: u64,
        _emitter: &Address,
    ) -> Result<Value> {
        bail!(
            "event-argument extraction requires an ABI decoder; use --simulate or a custom adapter"
        )
    }

    fn network_name(&self) -> &str {
        "json-rpc"
    }
}

// Arc so the CLI can hand one instance to both the engine and status checks.
impl From<HttpChainAdapter> for Arc<dyn ChainAdapter> {
    fn from(adapter: HttpChainAdapter) -> Self {
        Arc::new(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ignis_types::Wei;

    #[test]
    fn test_quantity_round_trip() {
        assert_eq!(quantity(0), "0x0");
        assert_eq!(quantity(255), "0xff");
        assert_eq!(parse_quantity(&Value::String("0xff".to_string())).unwrap(), 255);
        assert!(parse_quantity(&Value::from(255)).is_err());
    }

    #[test]
    fn test_deploy_transaction_object() {
        let request = SubmitRequest {
            from: Address::new("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc").unwrap(),
            nonce: 2,
            payload: SubmitPayload::Deploy {
                bytecode: "0x6080".to_string(),
                args: vec![],
                value: Wei(5),
            },
        };
        let tx = HttpChainAdapter::transaction_object(&request).unwrap();
        assert_eq!(tx["from"], "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc");
        assert_eq!(tx["nonce"], "0x2");
        assert_eq!(tx["data"], "0x6080");
        assert_eq!(tx["value"], "0x5");
    }

    #[test]
    fn test_deploy_with_args_is_rejected() {
        let request = SubmitRequest {
            from: Address::new("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc").unwrap(),
            nonce: 0,
            payload: SubmitPayload::Deploy {
                bytecode: "0x6080".to_string(),
                args: vec![Value::from(1)],
                value: Wei::ZERO,
            },
        };
        let err = HttpChainAdapter::transaction_object(&request).unwrap_err();
        assert!(err.to_string().contains("ABI encoder"));
    }

    #[test]
    fn test_call_requires_precoded_data() {
        assert!(precoded_calldata("transfer", &[]).is_err());
        assert!(precoded_calldata("0xa9059cbb", &[Value::from(1)]).is_err());
        assert_eq!(precoded_calldata("0xa9059cbb", &[]).unwrap(), "0xa9059cbb");
    }
}
