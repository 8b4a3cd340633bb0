//! Journal record types.
//!
//! Every state transition the engine performs is captured as one
//! [`JournalMessage`] and appended to the deployment journal before the
//! transition is acted on. Replaying the messages in order rebuilds the
//! execution state exactly, which is what makes runs resumable.
//!
//! Messages are serialized as single-line JSON objects tagged by `type`.
//! Nested payloads carry their own discriminators (`future_type` for start
//! records, `subtype` for actions and results) so the journal stays
//! self-describing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use ignis_types::{Address, FutureKind, TxHash, Wei};

/// One append-only journal record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum JournalMessage {
    /// A future began executing. Records the parameters it resolved to,
    /// so later runs can detect drift without re-resolving history.
    ExecutionStart {
        future_id: String,
        strategy: String,
        dependencies: Vec<String>,
        #[serde(flatten)]
        start: StartDetails,
    },
    /// The strategy opened a new network interaction for a future.
    OnchainAction {
        future_id: String,
        /// 1-based index of the interaction within the future.
        execution_id: u64,
        #[serde(flatten)]
        action: ActionDetails,
    },
    /// A transaction was assigned a nonce and is about to be submitted.
    OnchainTransactionRequest {
        future_id: String,
        execution_id: u64,
        from: Address,
        nonce: u64,
        tx: TransactionParams,
    },
    /// The node accepted a submitted transaction into its pool.
    OnchainTransactionAccept {
        future_id: String,
        execution_id: u64,
        tx_hash: TxHash,
    },
    /// A network interaction completed and produced its payload.
    OnchainResult {
        future_id: String,
        execution_id: u64,
        #[serde(flatten)]
        result: ResultDetails,
    },
    /// Terminal: the future succeeded with the recorded result.
    ExecutionSuccess {
        future_id: String,
        #[serde(flatten)]
        result: ExecutionResult,
    },
    /// Terminal: the future failed and will not be retried automatically.
    ExecutionFailure { future_id: String, error: String },
    /// Confirmation was not observed within the configured timeout. The
    /// transaction may still land; a later run re-checks it.
    ExecutionTimeout { future_id: String, execution_id: u64 },
    /// Removes a future's recorded state so it executes fresh on replay.
    Wipe { future_id: String },
}

impl JournalMessage {
    /// The future this record belongs to.
    pub fn future_id(&self) -> &str {
        match self {
            JournalMessage::ExecutionStart { future_id, .. }
            | JournalMessage::OnchainAction { future_id, .. }
            | JournalMessage::OnchainTransactionRequest { future_id, .. }
            | JournalMessage::OnchainTransactionAccept { future_id, .. }
            | JournalMessage::OnchainResult { future_id, .. }
            | JournalMessage::ExecutionSuccess { future_id, .. }
            | JournalMessage::ExecutionFailure { future_id, .. }
            | JournalMessage::ExecutionTimeout { future_id, .. }
            | JournalMessage::Wipe { future_id } => future_id,
        }
    }
}

/// Fully resolved parameters a future started with.
///
/// References have already been replaced by concrete values here; this is
/// what reconciliation compares against when a module is re-run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "future_type", rename_all = "kebab-case")]
pub enum StartDetails {
    ContractDeployment {
        contract_name: String,
        constructor_args: Vec<Value>,
        libraries: BTreeMap<String, Address>,
        value: Wei,
        from: Address,
    },
    ArtifactContractDeployment {
        contract_name: String,
        constructor_args: Vec<Value>,
        libraries: BTreeMap<String, Address>,
        value: Wei,
        from: Address,
    },
    LibraryDeployment {
        contract_name: String,
        libraries: BTreeMap<String, Address>,
        from: Address,
    },
    ContractAt {
        contract_name: String,
        contract_address: Address,
    },
    ContractCall {
        contract_address: Address,
        function_name: String,
        args: Vec<Value>,
        value: Wei,
        from: Address,
    },
    StaticCall {
        contract_address: Address,
        function_name: String,
        args: Vec<Value>,
        from: Address,
    },
    SendData {
        to: Address,
        value: Wei,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        from: Address,
    },
    ReadEventArgument {
        event_name: String,
        argument_name: String,
        event_index: u64,
        emitter: Address,
        tx_to_read_from: TxHash,
    },
}

impl StartDetails {
    pub fn future_kind(&self) -> FutureKind {
        match self {
            StartDetails::ContractDeployment { .. } => FutureKind::ContractDeployment,
            StartDetails::ArtifactContractDeployment { .. } => {
                FutureKind::ArtifactContractDeployment
            }
            StartDetails::LibraryDeployment { .. } => FutureKind::LibraryDeployment,
            StartDetails::ContractAt { .. } => FutureKind::ContractAt,
            StartDetails::ContractCall { .. } => FutureKind::ContractCall,
            StartDetails::StaticCall { .. } => FutureKind::StaticCall,
            StartDetails::SendData { .. } => FutureKind::SendData,
            StartDetails::ReadEventArgument { .. } => FutureKind::ReadEventArgument,
        }
    }

    /// Sending account, for kinds that sign transactions or calls.
    pub fn from_account(&self) -> Option<&Address> {
        match self {
            StartDetails::ContractDeployment { from, .. }
            | StartDetails::ArtifactContractDeployment { from, .. }
            | StartDetails::LibraryDeployment { from, .. }
            | StartDetails::ContractCall { from, .. }
            | StartDetails::StaticCall { from, .. }
            | StartDetails::SendData { from, .. } => Some(from),
            StartDetails::ContractAt { .. } | StartDetails::ReadEventArgument { .. } => None,
        }
    }
}

/// Payload of an `onchain-action` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subtype", rename_all = "kebab-case")]
pub enum ActionDetails {
    DeployContract {
        contract_name: String,
        args: Vec<Value>,
        value: Wei,
        from: Address,
    },
    CallFunction {
        contract_address: Address,
        function_name: String,
        args: Vec<Value>,
        value: Wei,
        from: Address,
    },
    StaticCall {
        contract_address: Address,
        function_name: String,
        args: Vec<Value>,
        from: Address,
    },
    SendData {
        to: Address,
        value: Wei,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        from: Address,
    },
    ReadEventArgument {
        event_name: String,
        argument_name: String,
        event_index: u64,
        emitter: Address,
        tx_to_read_from: TxHash,
    },
    ContractAt {
        contract_name: String,
        contract_address: Address,
    },
}

/// Transaction fields as handed to the network backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub value: Wei,
}

/// Payload of an `onchain-result` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subtype", rename_all = "kebab-case")]
pub enum ResultDetails {
    DeployContractSuccess {
        contract_address: Address,
        tx_hash: TxHash,
    },
    CallFunctionSuccess {
        tx_hash: TxHash,
    },
    SendDataSuccess {
        tx_hash: TxHash,
    },
    StaticCallSuccess {
        result: Value,
    },
    ReadEventArgumentSuccess {
        result: Value,
    },
    ContractAtSuccess {
        contract_address: Address,
    },
}

/// Terminal payload of an `execution-success` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subtype", rename_all = "kebab-case")]
pub enum ExecutionResult {
    DeployContract {
        contract_name: String,
        contract_address: Address,
        tx_hash: TxHash,
    },
    CallFunction {
        tx_hash: TxHash,
    },
    SendData {
        tx_hash: TxHash,
    },
    StaticCall {
        result: Value,
    },
    ReadEventArgument {
        result: Value,
    },
    ContractAt {
        contract_name: String,
        contract_address: Address,
    },
}

impl ExecutionResult {
    /// The value dependents observe when they reference this future.
    ///
    /// Deployments and address bindings resolve to the contract address,
    /// transaction futures to their hash, reads to the recorded payload.
    pub fn reference_value(&self) -> Value {
        match self {
            ExecutionResult::DeployContract {
                contract_address, ..
            }
            | ExecutionResult::ContractAt {
                contract_address, ..
            } => Value::String(contract_address.to_string()),
            ExecutionResult::CallFunction { tx_hash } | ExecutionResult::SendData { tx_hash } => {
                Value::String(tx_hash.to_string())
            }
            ExecutionResult::StaticCall { result }
            | ExecutionResult::ReadEventArgument { result } => result.clone(),
        }
    }

    pub fn contract_address(&self) -> Option<&Address> {
        match self {
            ExecutionResult::DeployContract {
                contract_address, ..
            }
            | ExecutionResult::ContractAt {
                contract_address, ..
            } => Some(contract_address),
            _ => None,
        }
    }

    /// Hash of the confirmed transaction that produced this result.
    pub fn tx_hash(&self) -> Option<&TxHash> {
        match self {
            ExecutionResult::DeployContract { tx_hash, .. }
            | ExecutionResult::CallFunction { tx_hash }
            | ExecutionResult::SendData { tx_hash } => Some(tx_hash),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn addr(s: &str) -> Address {
        Address::from_str(s).unwrap()
    }

    #[test]
    fn test_execution_start_serializes_with_type_tags() {
        let message = JournalMessage::ExecutionStart {
            future_id: "Module1:Contract1".to_string(),
            strategy: "basic".to_string(),
            dependencies: vec![],
            start: StartDetails::ContractDeployment {
                contract_name: "Contract1".to_string(),
                constructor_args: vec![Value::from(42)],
                libraries: BTreeMap::new(),
                value: Wei(0),
                from: addr("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc"),
            },
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "execution-start");
        assert_eq!(json["future_type"], "contract-deployment");
        assert_eq!(json["future_id"], "Module1:Contract1");
        assert_eq!(json["constructor_args"][0], 42);
        assert_eq!(json["value"], "0");
    }

    #[test]
    fn test_result_subtype_tags() {
        let message = JournalMessage::OnchainResult {
            future_id: "Module1:Contract1".to_string(),
            execution_id: 1,
            result: ResultDetails::DeployContractSuccess {
                contract_address: addr("0x1f98431c8ad98523631ae4a59f267346ea31f984"),
                tx_hash: TxHash::from_str("0x123").unwrap(),
            },
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "onchain-result");
        assert_eq!(json["subtype"], "deploy-contract-success");
        assert_eq!(json["execution_id"], 1);
    }

    #[test]
    fn test_round_trips_through_json_line() {
        let message = JournalMessage::OnchainTransactionRequest {
            future_id: "Module1:Contract1#configure".to_string(),
            execution_id: 1,
            from: addr("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc"),
            nonce: 7,
            tx: TransactionParams {
                to: Some(addr("0x1f98431c8ad98523631ae4a59f267346ea31f984")),
                data: None,
                value: Wei(2),
            },
        };

        let line = serde_json::to_string(&message).unwrap();
        assert!(!line.contains('\n'));
        let parsed: JournalMessage = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, message);
    }

    #[test]
    fn test_parses_handwritten_record() {
        let line = r#"{"type":"execution-success","future_id":"Module1:Contract1","subtype":"deploy-contract","contract_name":"Contract1","contract_address":"0x1f98431c8ad98523631ae4a59f267346ea31f984","tx_hash":"0x123"}"#;
        let parsed: JournalMessage = serde_json::from_str(line).unwrap();
        match parsed {
            JournalMessage::ExecutionSuccess { future_id, result } => {
                assert_eq!(future_id, "Module1:Contract1");
                assert_eq!(
                    result.reference_value(),
                    Value::String("0x1f98431c8ad98523631ae4a59f267346ea31f984".to_string())
                );
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_reference_value_per_kind() {
        let call = ExecutionResult::CallFunction {
            tx_hash: TxHash::from_str("0x456").unwrap(),
        };
        assert_eq!(call.reference_value(), Value::String("0x456".to_string()));

        let read = ExecutionResult::ReadEventArgument {
            result: Value::from("0xbeef"),
        };
        assert_eq!(read.reference_value(), Value::from("0xbeef"));
        assert!(read.tx_hash().is_none());
    }
}
