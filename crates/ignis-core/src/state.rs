//! Execution state rebuilt from the journal.
//!
//! [`ExecutionStateMap::replay`] folds journal records into per-future
//! [`ExecutionState`] values. The fold is pure and total: the same record
//! sequence always produces the same store, and any sequence that could not
//! have been produced by the engine is rejected with
//! [`CorruptJournalError`] instead of being patched over.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use ignis_types::{FutureKind, TxHash};

use crate::journal::CorruptJournalError;
use crate::messages::{
    ActionDetails, ExecutionResult, JournalMessage, ResultDetails, StartDetails, TransactionParams,
};

/// Lifecycle position of a started future.
///
/// `TimedOut` marks an unknown outcome, not a verdict: the pending
/// transaction may still land, so a later run is allowed to complete the
/// future to `Success` or `Failed` once it re-checks the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionStatus {
    Started,
    Success,
    Failed,
    TimedOut,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ExecutionStatus::Started => "started",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::TimedOut => "timed-out",
        };
        f.write_str(label)
    }
}

/// Transaction request captured inside an interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionRequest {
    pub from: ignis_types::Address,
    pub nonce: u64,
    pub tx: TransactionParams,
}

/// One network interaction of a future, from action to result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkInteraction {
    /// 1-based index within the future.
    pub id: u64,
    pub action: ActionDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<InteractionRequest>,
    /// Hashes the node accepted for this interaction, in submission order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accepted: Vec<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultDetails>,
}

/// Everything the journal knows about one future.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionState {
    pub future_id: String,
    pub strategy: String,
    pub dependencies: Vec<String>,
    /// Parameters as resolved at start time.
    pub start: StartDetails,
    pub status: ExecutionStatus,
    pub interactions: Vec<NetworkInteraction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionState {
    pub fn kind(&self) -> FutureKind {
        self.start.future_kind()
    }

    /// True once the run recorded an outcome for this future, including the
    /// unknown-outcome `TimedOut` case.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, ExecutionStatus::Started)
    }

    /// Most recent hash the node accepted, if any transaction got that far.
    pub fn last_accepted_tx(&self) -> Option<&TxHash> {
        self.interactions
            .iter()
            .rev()
            .find_map(|interaction| interaction.accepted.last())
    }

    /// Most recent transaction request, if one was journaled.
    pub fn last_request(&self) -> Option<&InteractionRequest> {
        self.interactions
            .iter()
            .rev()
            .find_map(|interaction| interaction.request.as_ref())
    }

    /// The value dependents resolve this future to.
    pub fn reference_value(&self) -> Option<Value> {
        self.result.as_ref().map(ExecutionResult::reference_value)
    }

    /// Hash of the transaction whose receipt carries this future's events.
    pub fn confirming_tx(&self) -> Option<&TxHash> {
        self.result
            .as_ref()
            .and_then(ExecutionResult::tx_hash)
            .or_else(|| self.last_accepted_tx())
    }

    fn open_interaction(&mut self, execution_id: u64) -> Result<&mut NetworkInteraction> {
        let current = self.interactions.len() as u64;
        if execution_id != current {
            return Err(CorruptJournalError::new(format!(
                "record for interaction {} of \"{}\" but the open interaction is {}",
                execution_id, self.future_id, current
            ))
            .into());
        }
        self.interactions
            .last_mut()
            .ok_or_else(|| {
                CorruptJournalError::new(format!(
                    "record for an interaction of \"{}\" before any onchain-action",
                    self.future_id
                ))
                .into()
            })
    }
}

/// Per-future execution state, keyed by future id.
///
/// Iteration follows first-start order so summaries and reports stay
/// stable across replays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionStateMap {
    states: HashMap<String, ExecutionState>,
    order: Vec<String>,
}

impl ExecutionStateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the store by folding `messages` in order.
    pub fn replay(messages: &[JournalMessage]) -> Result<Self> {
        let mut map = Self::new();
        for (index, message) in messages.iter().enumerate() {
            map.apply(message)
                .with_context(|| format!("replaying journal record {}", index + 1))?;
        }
        Ok(map)
    }

    pub fn get(&self, future_id: &str) -> Option<&ExecutionState> {
        self.states.get(future_id)
    }

    pub fn contains(&self, future_id: &str) -> bool {
        self.states.contains_key(future_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// States in first-start order.
    pub fn states(&self) -> impl Iterator<Item = &ExecutionState> {
        self.order.iter().filter_map(|id| self.states.get(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Recorded reference values of every future that has a result.
    pub fn reference_values(&self) -> BTreeMap<String, Value> {
        self.states
            .values()
            .filter_map(|state| {
                state
                    .reference_value()
                    .map(|value| (state.future_id.clone(), value))
            })
            .collect()
    }

    /// Confirmed transaction hashes, for resolving event-read sources.
    pub fn confirming_txs(&self) -> BTreeMap<String, TxHash> {
        self.states
            .values()
            .filter_map(|state| {
                state
                    .confirming_tx()
                    .map(|tx| (state.future_id.clone(), tx.clone()))
            })
            .collect()
    }

    fn live_mut(&mut self, future_id: &str, record: &str) -> Result<&mut ExecutionState> {
        let state = self.states.get_mut(future_id).ok_or_else(|| {
            anyhow::Error::from(CorruptJournalError::new(format!(
                "{record} for \"{future_id}\" which never started"
            )))
        })?;
        match state.status {
            ExecutionStatus::Started | ExecutionStatus::TimedOut => Ok(state),
            status => Err(CorruptJournalError::new(format!(
                "{record} for \"{future_id}\" which already finished as {status}"
            ))
            .into()),
        }
    }

    /// Fold one record into the store.
    ///
    /// The engine calls this for every record right after journaling it, so
    /// the live store always matches what a replay of the file would build.
    pub fn apply(&mut self, message: &JournalMessage) -> Result<()> {
        match message {
            JournalMessage::ExecutionStart {
                future_id,
                strategy,
                dependencies,
                start,
            } => {
                if self.states.contains_key(future_id) {
                    return Err(CorruptJournalError::new(format!(
                        "duplicate execution-start for \"{future_id}\""
                    ))
                    .into());
                }
                self.states.insert(
                    future_id.clone(),
                    ExecutionState {
                        future_id: future_id.clone(),
                        strategy: strategy.clone(),
                        dependencies: dependencies.clone(),
                        start: start.clone(),
                        status: ExecutionStatus::Started,
                        interactions: Vec::new(),
                        result: None,
                        error: None,
                    },
                );
                self.order.push(future_id.clone());
            }
            JournalMessage::OnchainAction {
                future_id,
                execution_id,
                action,
            } => {
                let state = self.live_mut(future_id, "onchain-action")?;
                if state.status != ExecutionStatus::Started {
                    return Err(CorruptJournalError::new(format!(
                        "onchain-action for \"{future_id}\" after a timeout"
                    ))
                    .into());
                }
                let expected = state.interactions.len() as u64 + 1;
                if *execution_id != expected {
                    return Err(CorruptJournalError::new(format!(
                        "onchain-action {execution_id} for \"{future_id}\" but expected {expected}"
                    ))
                    .into());
                }
                state.interactions.push(NetworkInteraction {
                    id: *execution_id,
                    action: action.clone(),
                    request: None,
                    accepted: Vec::new(),
                    result: None,
                });
            }
            JournalMessage::OnchainTransactionRequest {
                future_id,
                execution_id,
                from,
                nonce,
                tx,
            } => {
                let state = self.live_mut(future_id, "onchain-transaction-request")?;
                let interaction = state.open_interaction(*execution_id)?;
                if interaction.request.is_some() {
                    return Err(CorruptJournalError::new(format!(
                        "duplicate transaction-request for interaction {execution_id} of \"{future_id}\""
                    ))
                    .into());
                }
                interaction.request = Some(InteractionRequest {
                    from: from.clone(),
                    nonce: *nonce,
                    tx: tx.clone(),
                });
            }
            JournalMessage::OnchainTransactionAccept {
                future_id,
                execution_id,
                tx_hash,
            } => {
                let state = self.live_mut(future_id, "onchain-transaction-accept")?;
                let interaction = state.open_interaction(*execution_id)?;
                if interaction.request.is_none() {
                    return Err(CorruptJournalError::new(format!(
                        "transaction-accept without a request for interaction {execution_id} of \"{future_id}\""
                    ))
                    .into());
                }
                interaction.accepted.push(tx_hash.clone());
            }
            JournalMessage::OnchainResult {
                future_id,
                execution_id,
                result,
            } => {
                let state = self.live_mut(future_id, "onchain-result")?;
                let interaction = state.open_interaction(*execution_id)?;
                if interaction.result.is_some() {
                    return Err(CorruptJournalError::new(format!(
                        "duplicate result for interaction {execution_id} of \"{future_id}\""
                    ))
                    .into());
                }
                interaction.result = Some(result.clone());
            }
            JournalMessage::ExecutionSuccess { future_id, result } => {
                let state = self.live_mut(future_id, "execution-success")?;
                state.status = ExecutionStatus::Success;
                state.result = Some(result.clone());
                state.error = None;
            }
            JournalMessage::ExecutionFailure { future_id, error } => {
                let state = self.live_mut(future_id, "execution-failure")?;
                state.status = ExecutionStatus::Failed;
                state.error = Some(error.clone());
            }
            JournalMessage::ExecutionTimeout {
                future_id,
                execution_id,
            } => {
                let state = self.live_mut(future_id, "execution-timeout")?;
                let current = state.interactions.len() as u64;
                if *execution_id != current {
                    return Err(CorruptJournalError::new(format!(
                        "execution-timeout names interaction {execution_id} of \"{future_id}\" but the open interaction is {current}"
                    ))
                    .into());
                }
                state.status = ExecutionStatus::TimedOut;
            }
            JournalMessage::Wipe { future_id } => {
                if self.states.remove(future_id).is_none() {
                    return Err(CorruptJournalError::new(format!(
                        "wipe for unknown future \"{future_id}\""
                    ))
                    .into());
                }
                self.order.retain(|id| id != future_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use ignis_types::{Address, Wei};

    fn addr(s: &str) -> Address {
        Address::from_str(s).unwrap()
    }

    fn deploy_start(id: &str) -> JournalMessage {
        JournalMessage::ExecutionStart {
            future_id: id.to_string(),
            strategy: "basic".to_string(),
            dependencies: vec![],
            start: StartDetails::ContractDeployment {
                contract_name: "Contract1".to_string(),
                constructor_args: vec![],
                libraries: BTreeMap::new(),
                value: Wei(0),
                from: addr("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc"),
            },
        }
    }

    fn deploy_action(id: &str) -> JournalMessage {
        JournalMessage::OnchainAction {
            future_id: id.to_string(),
            execution_id: 1,
            action: ActionDetails::DeployContract {
                contract_name: "Contract1".to_string(),
                args: vec![],
                value: Wei(0),
                from: addr("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc"),
            },
        }
    }

    fn full_deploy_sequence(id: &str) -> Vec<JournalMessage> {
        vec![
            deploy_start(id),
            deploy_action(id),
            JournalMessage::OnchainTransactionRequest {
                future_id: id.to_string(),
                execution_id: 1,
                from: addr("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc"),
                nonce: 0,
                tx: TransactionParams {
                    to: None,
                    data: Some("0x6001600101".to_string()),
                    value: Wei(0),
                },
            },
            JournalMessage::OnchainTransactionAccept {
                future_id: id.to_string(),
                execution_id: 1,
                tx_hash: TxHash::from_str("0x123").unwrap(),
            },
            JournalMessage::OnchainResult {
                future_id: id.to_string(),
                execution_id: 1,
                result: ResultDetails::DeployContractSuccess {
                    contract_address: addr("0x1f98431c8ad98523631ae4a59f267346ea31f984"),
                    tx_hash: TxHash::from_str("0x123").unwrap(),
                },
            },
            JournalMessage::ExecutionSuccess {
                future_id: id.to_string(),
                result: ExecutionResult::DeployContract {
                    contract_name: "Contract1".to_string(),
                    contract_address: addr("0x1f98431c8ad98523631ae4a59f267346ea31f984"),
                    tx_hash: TxHash::from_str("0x123").unwrap(),
                },
            },
        ]
    }

    #[test]
    fn test_replay_builds_successful_deploy_state() {
        let map = ExecutionStateMap::replay(&full_deploy_sequence("Module1:Contract1")).unwrap();

        let state = map.get("Module1:Contract1").unwrap();
        assert_eq!(state.status, ExecutionStatus::Success);
        assert_eq!(state.interactions.len(), 1);
        assert_eq!(state.interactions[0].accepted.len(), 1);
        assert_eq!(
            state.reference_value(),
            Some(Value::String(
                "0x1f98431c8ad98523631ae4a59f267346ea31f984".to_string()
            ))
        );
        assert_eq!(state.confirming_tx().unwrap().to_string(), "0x123");
    }

    #[test]
    fn test_replay_is_deterministic() {
        let messages = full_deploy_sequence("Module1:Contract1");
        let first = ExecutionStateMap::replay(&messages).unwrap();
        let second = ExecutionStateMap::replay(&messages).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_start_is_corrupt() {
        let err = ExecutionStateMap::replay(&[
            deploy_start("Module1:Contract1"),
            deploy_start("Module1:Contract1"),
        ])
        .unwrap_err();
        let corrupt = err.downcast_ref::<CorruptJournalError>().unwrap();
        assert!(corrupt.reason.contains("duplicate execution-start"));
    }

    #[test]
    fn test_record_for_unknown_future_is_corrupt() {
        let err = ExecutionStateMap::replay(&[JournalMessage::ExecutionFailure {
            future_id: "Module1:Ghost".to_string(),
            error: "boom".to_string(),
        }])
        .unwrap_err();
        assert!(err.downcast_ref::<CorruptJournalError>().is_some());
    }

    #[test]
    fn test_out_of_order_interaction_is_corrupt() {
        let mut wrong = deploy_action("Module1:Contract1");
        if let JournalMessage::OnchainAction { execution_id, .. } = &mut wrong {
            *execution_id = 2;
        }
        let err =
            ExecutionStateMap::replay(&[deploy_start("Module1:Contract1"), wrong]).unwrap_err();
        let corrupt = err.downcast_ref::<CorruptJournalError>().unwrap();
        assert!(corrupt.reason.contains("expected 1"));
    }

    #[test]
    fn test_success_then_failure_is_corrupt() {
        let mut messages = full_deploy_sequence("Module1:Contract1");
        messages.push(JournalMessage::ExecutionFailure {
            future_id: "Module1:Contract1".to_string(),
            error: "late".to_string(),
        });
        let err = ExecutionStateMap::replay(&messages).unwrap_err();
        let corrupt = err.downcast_ref::<CorruptJournalError>().unwrap();
        assert!(corrupt.reason.contains("already finished"));
    }

    #[test]
    fn test_wipe_removes_state_and_allows_restart() {
        let mut messages = full_deploy_sequence("Module1:Contract1");
        messages.push(JournalMessage::Wipe {
            future_id: "Module1:Contract1".to_string(),
        });
        messages.extend(full_deploy_sequence("Module1:Contract1"));

        let map = ExecutionStateMap::replay(&messages).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get("Module1:Contract1").unwrap().status,
            ExecutionStatus::Success
        );
    }

    #[test]
    fn test_wipe_of_unknown_future_is_corrupt() {
        let err = ExecutionStateMap::replay(&[JournalMessage::Wipe {
            future_id: "Module1:Ghost".to_string(),
        }])
        .unwrap_err();
        assert!(err.downcast_ref::<CorruptJournalError>().is_some());
    }

    #[test]
    fn test_timed_out_future_can_complete_later() {
        let mut messages = full_deploy_sequence("Module1:Contract1");
        // Cut the sequence after the accept and time it out instead.
        messages.truncate(4);
        messages.push(JournalMessage::ExecutionTimeout {
            future_id: "Module1:Contract1".to_string(),
            execution_id: 1,
        });

        let map = ExecutionStateMap::replay(&messages).unwrap();
        assert_eq!(
            map.get("Module1:Contract1").unwrap().status,
            ExecutionStatus::TimedOut
        );

        // A later run re-checked the transaction and found it confirmed.
        messages.push(JournalMessage::OnchainResult {
            future_id: "Module1:Contract1".to_string(),
            execution_id: 1,
            result: ResultDetails::DeployContractSuccess {
                contract_address: addr("0x1f98431c8ad98523631ae4a59f267346ea31f984"),
                tx_hash: TxHash::from_str("0x123").unwrap(),
            },
        });
        messages.push(JournalMessage::ExecutionSuccess {
            future_id: "Module1:Contract1".to_string(),
            result: ExecutionResult::DeployContract {
                contract_name: "Contract1".to_string(),
                contract_address: addr("0x1f98431c8ad98523631ae4a59f267346ea31f984"),
                tx_hash: TxHash::from_str("0x123").unwrap(),
            },
        });

        let map = ExecutionStateMap::replay(&messages).unwrap();
        let state = map.get("Module1:Contract1").unwrap();
        assert_eq!(state.status, ExecutionStatus::Success);
        assert!(state.reference_value().is_some());
    }

    #[test]
    fn test_states_iterate_in_start_order() {
        let mut messages = full_deploy_sequence("Module1:B");
        messages.extend(full_deploy_sequence("Module1:A"));
        let map = ExecutionStateMap::replay(&messages).unwrap();
        let ids: Vec<_> = map.ids().collect();
        assert_eq!(ids, vec!["Module1:B", "Module1:A"]);
    }
}
