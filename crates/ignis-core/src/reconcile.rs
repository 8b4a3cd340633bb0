//! Reconciliation of recorded state with the declared module.
//!
//! A journal is only reusable if the module still describes the same
//! deployment. Before a run, each future with reusable recorded state is
//! re-resolved against the current declarations and compared field by
//! field with the parameters it originally started with. Mismatches are
//! collected as [`ReconciliationFailure`] entries and block execution.
//! Futures recorded as started or failed run again from scratch, so their
//! stale parameters are not binding and are skipped here.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::Result;
use serde_json::Value;

use ignis_types::{
    expect_address, Address, Argument, Future, FutureGraph, FutureSpec, ResolutionContext, TxHash,
    Wei,
};

use crate::messages::StartDetails;
use crate::state::{ExecutionState, ExecutionStateMap, ExecutionStatus};
use crate::strategy::STRATEGY_NAME;

/// One blocking mismatch between a recorded future and its declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationFailure {
    pub future_id: String,
    pub failure: String,
}

impl fmt::Display for ReconciliationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.future_id, self.failure)
    }
}

/// Outcome of checking a recovered journal against a module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationResult {
    /// All mismatches, across all futures, in dependency order.
    pub reconciliation_failures: Vec<ReconciliationFailure>,
    /// Futures with recorded state that the module no longer declares.
    /// Informational: they do not block the run.
    pub missing_executed_futures: Vec<String>,
}

impl ReconciliationResult {
    /// Whether the recorded results may be reused for this module.
    pub fn is_successful(&self) -> bool {
        self.reconciliation_failures.is_empty()
    }
}

/// Compare every reusable recorded state against the declared module.
///
/// Reference arguments are compared by resolved value, so renaming or
/// reordering unrelated futures never triggers a mismatch, while a
/// dependency whose current value differs from the one a dependent was
/// built with does.
pub fn reconcile(
    previous: &ExecutionStateMap,
    graph: &FutureGraph,
    accounts: &[Address],
    parameters: &BTreeMap<String, Value>,
) -> Result<ReconciliationResult> {
    let confirming_txs = previous.confirming_txs();

    // Values references resolve to in this run. Futures that will run
    // again have no entry, so a reference to one fails to resolve and the
    // comparison reports the field as changed.
    let mut current_results: BTreeMap<String, Value> = BTreeMap::new();
    let mut failures: Vec<ReconciliationFailure> = Vec::new();

    for future in graph.dependency_order()? {
        let Some(state) = previous.get(&future.id) else {
            continue;
        };
        if matches!(
            state.status,
            ExecutionStatus::Started | ExecutionStatus::Failed
        ) {
            continue;
        }

        let ctx = ResolutionContext {
            results: &current_results,
            accounts,
            parameters,
        };
        failures.extend(
            compare_future(future, state, &ctx, &confirming_txs)
                .into_iter()
                .map(|failure| ReconciliationFailure {
                    future_id: future.id.clone(),
                    failure,
                }),
        );

        // Dependents recorded their arguments against this value, so it
        // stays visible even when the future itself failed to reconcile;
        // the failure above already blocks the run.
        if let Some(value) = state.reference_value() {
            current_results.insert(future.id.clone(), value);
        }
    }

    let declared: BTreeSet<&str> = graph.ids().collect();
    let mut missing_executed_futures: Vec<String> = previous
        .ids()
        .filter(|id| !declared.contains(id))
        .map(String::from)
        .collect();
    missing_executed_futures.sort();

    Ok(ReconciliationResult {
        reconciliation_failures: failures,
        missing_executed_futures,
    })
}

/// All field mismatches of one future, in declaration order of kinds.
fn compare_future(
    future: &Future,
    state: &ExecutionState,
    ctx: &ResolutionContext<'_>,
    confirming_txs: &BTreeMap<String, TxHash>,
) -> Vec<String> {
    let mut failures = Vec::new();

    if state.strategy != STRATEGY_NAME {
        failures.push(format!(
            "Strategy has been changed from {} to {}",
            state.strategy, STRATEGY_NAME
        ));
    }

    let recorded_kind = state.kind();
    let declared_kind = future.kind();
    if recorded_kind != declared_kind {
        failures.push(format!(
            "Future type has been changed from {recorded_kind} to {declared_kind}"
        ));
        // The remaining fields are not comparable across kinds.
        return failures;
    }

    match (&future.spec, &state.start) {
        (
            FutureSpec::ContractDeployment {
                contract_name,
                args,
                value,
                libraries,
                from,
                ..
            },
            StartDetails::ContractDeployment {
                contract_name: recorded_name,
                constructor_args,
                libraries: recorded_libraries,
                value: recorded_value,
                from: recorded_from,
            },
        )
        | (
            FutureSpec::ArtifactContractDeployment {
                contract_name,
                args,
                value,
                libraries,
                from,
                ..
            },
            StartDetails::ArtifactContractDeployment {
                contract_name: recorded_name,
                constructor_args,
                libraries: recorded_libraries,
                value: recorded_value,
                from: recorded_from,
            },
        ) => {
            compare_text(&mut failures, "Contract name", recorded_name, contract_name);
            compare_args(&mut failures, constructor_args, args, ctx);
            compare_value(&mut failures, *recorded_value, *value);
            compare_libraries(&mut failures, recorded_libraries, libraries, ctx);
            compare_sender(&mut failures, recorded_from, from, ctx);
        }
        (
            FutureSpec::LibraryDeployment {
                contract_name,
                libraries,
                from,
                ..
            },
            StartDetails::LibraryDeployment {
                contract_name: recorded_name,
                libraries: recorded_libraries,
                from: recorded_from,
            },
        ) => {
            compare_text(&mut failures, "Library name", recorded_name, contract_name);
            compare_libraries(&mut failures, recorded_libraries, libraries, ctx);
            compare_sender(&mut failures, recorded_from, from, ctx);
        }
        (
            FutureSpec::ContractAt {
                contract_name,
                address,
            },
            StartDetails::ContractAt {
                contract_name: recorded_name,
                contract_address,
            },
        ) => {
            compare_text(&mut failures, "Contract name", recorded_name, contract_name);
            compare_address_arg(
                &mut failures,
                "Contract address",
                contract_address,
                address,
                ctx,
            );
        }
        (
            FutureSpec::ContractCall {
                contract,
                function_name,
                args,
                value,
                from,
            },
            StartDetails::ContractCall {
                contract_address,
                function_name: recorded_function,
                args: recorded_args,
                value: recorded_value,
                from: recorded_from,
            },
        ) => {
            compare_address_arg(
                &mut failures,
                "Contract address",
                contract_address,
                contract,
                ctx,
            );
            compare_text(&mut failures, "Function name", recorded_function, function_name);
            compare_args(&mut failures, recorded_args, args, ctx);
            compare_value(&mut failures, *recorded_value, *value);
            compare_sender(&mut failures, recorded_from, from, ctx);
        }
        (
            FutureSpec::StaticCall {
                contract,
                function_name,
                args,
                from,
            },
            StartDetails::StaticCall {
                contract_address,
                function_name: recorded_function,
                args: recorded_args,
                from: recorded_from,
            },
        ) => {
            compare_address_arg(
                &mut failures,
                "Contract address",
                contract_address,
                contract,
                ctx,
            );
            compare_text(&mut failures, "Function name", recorded_function, function_name);
            compare_args(&mut failures, recorded_args, args, ctx);
            compare_sender(&mut failures, recorded_from, from, ctx);
        }
        (
            FutureSpec::SendData {
                to,
                value,
                data,
                from,
            },
            StartDetails::SendData {
                to: recorded_to,
                value: recorded_value,
                data: recorded_data,
                from: recorded_from,
            },
        ) => {
            compare_address_arg(&mut failures, "Address \"to\"", recorded_to, to, ctx);
            compare_value(&mut failures, *recorded_value, *value);
            compare_data(&mut failures, recorded_data, data);
            compare_sender(&mut failures, recorded_from, from, ctx);
        }
        (
            FutureSpec::ReadEventArgument {
                event_name,
                argument_name,
                event_index,
                emitter,
                tx_source,
            },
            StartDetails::ReadEventArgument {
                event_name: recorded_event,
                argument_name: recorded_argument,
                event_index: recorded_index,
                emitter: recorded_emitter,
                tx_to_read_from,
            },
        ) => {
            compare_text(&mut failures, "Event name", recorded_event, event_name);
            compare_text(&mut failures, "Argument name", recorded_argument, argument_name);
            if recorded_index != event_index {
                failures.push(format!(
                    "Event index has been changed from {recorded_index} to {event_index}"
                ));
            }
            compare_address_arg(&mut failures, "Emitter", recorded_emitter, emitter, ctx);
            match confirming_txs.get(tx_source) {
                Some(tx) if tx == tx_to_read_from => {}
                Some(tx) => failures.push(format!(
                    "Transaction to read from has been changed from {tx_to_read_from} to {tx}"
                )),
                None => {
                    failures.push("Transaction to read from has been changed".to_string())
                }
            }
        }
        // Kind equality was checked above, so the pairs always line up.
        _ => {}
    }

    failures
}

fn compare_text(failures: &mut Vec<String>, field: &str, recorded: &str, declared: &str) {
    if recorded != declared {
        failures.push(format!(
            "{field} has been changed from {recorded} to {declared}"
        ));
    }
}

fn compare_value(failures: &mut Vec<String>, recorded: Wei, declared: Wei) {
    if recorded != declared {
        failures.push(format!(
            "Value has been changed from {recorded} to {declared}"
        ));
    }
}

/// Positional arguments are compared by resolved value, index by index.
/// Length changes count against every index that lost its counterpart.
fn compare_args(
    failures: &mut Vec<String>,
    recorded: &[Value],
    declared: &[Argument],
    ctx: &ResolutionContext<'_>,
) {
    let len = recorded.len().max(declared.len());
    for index in 0..len {
        let unchanged = match (recorded.get(index), declared.get(index)) {
            (Some(old), Some(arg)) => arg.resolve(ctx).is_ok_and(|new| new == *old),
            _ => false,
        };
        if !unchanged {
            failures.push(format!("Argument at index {index} has been changed"));
        }
    }
}

/// Address-valued field declared as an argument. When the declaration is a
/// reference to another future, the failure names that future.
fn compare_address_arg(
    failures: &mut Vec<String>,
    field: &str,
    recorded: &Address,
    declared: &Argument,
    ctx: &ResolutionContext<'_>,
) {
    let suffix = match declared {
        Argument::Future(reference) => format!(" (future {})", reference.future),
        _ => String::new(),
    };
    match resolve_address(declared, ctx) {
        Some(address) if address == *recorded => {}
        Some(address) => failures.push(format!(
            "{field} has been changed from {recorded} to {address}{suffix}"
        )),
        None => failures.push(format!("{field} has been changed{suffix}")),
    }
}

fn compare_sender(
    failures: &mut Vec<String>,
    recorded: &Address,
    declared: &Option<Argument>,
    ctx: &ResolutionContext<'_>,
) {
    let resolved = match declared {
        Some(arg) => resolve_address(arg, ctx),
        None => ctx.accounts.first().cloned(),
    };
    match resolved {
        Some(address) if address == *recorded => {}
        Some(address) => failures.push(format!(
            "From account has been changed from {recorded} to {address}"
        )),
        None => failures.push("From account has been changed".to_string()),
    }
}

fn compare_libraries(
    failures: &mut Vec<String>,
    recorded: &BTreeMap<String, Address>,
    declared: &BTreeMap<String, Argument>,
    ctx: &ResolutionContext<'_>,
) {
    for (name, address) in recorded {
        match declared.get(name) {
            None => failures.push(format!("Library \"{name}\" has been removed")),
            Some(arg) => match resolve_address(arg, ctx) {
                Some(new) if new == *address => {}
                Some(new) => failures.push(format!(
                    "Library \"{name}\" has been changed from {address} to {new}"
                )),
                None => failures.push(format!("Library \"{name}\" has been changed")),
            },
        }
    }
    for name in declared.keys() {
        if !recorded.contains_key(name) {
            failures.push(format!("Library \"{name}\" has been added"));
        }
    }
}

/// An omitted calldata field means the empty payload `0x`, so the two
/// spellings reconcile as equal.
fn compare_data(failures: &mut Vec<String>, recorded: &Option<String>, declared: &Option<String>) {
    let old = recorded.as_deref().unwrap_or("0x");
    let new = declared.as_deref().unwrap_or("0x");
    if old != new {
        failures.push(format!("Data has been changed from {old} to {new}"));
    }
}

fn resolve_address(arg: &Argument, ctx: &ResolutionContext<'_>) -> Option<Address> {
    arg.resolve(ctx)
        .ok()
        .and_then(|value| expect_address(&value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use ignis_types::ContractArtifact;

    use crate::messages::{ExecutionResult, JournalMessage};

    const ACCOUNT: &str = "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc";
    const ADDRESS_A: &str = "0x1f98431c8ad98523631ae4a59f267346ea31f984";
    const ADDRESS_B: &str = "0xba12222222228d8ba445958a75a0704d566bf2c8";

    fn addr(s: &str) -> Address {
        Address::from_str(s).unwrap()
    }

    fn accounts() -> Vec<Address> {
        vec![addr(ACCOUNT), addr(ADDRESS_B)]
    }

    fn started(id: &str, start: StartDetails) -> JournalMessage {
        JournalMessage::ExecutionStart {
            future_id: id.to_string(),
            strategy: "basic".to_string(),
            dependencies: vec![],
            start,
        }
    }

    fn succeeded(id: &str, result: ExecutionResult) -> JournalMessage {
        JournalMessage::ExecutionSuccess {
            future_id: id.to_string(),
            result,
        }
    }

    fn deploy_future(id: &str, name: &str, args: Vec<Argument>, deps: Vec<&str>) -> Future {
        Future {
            id: id.to_string(),
            module: "Module1".to_string(),
            dependencies: deps.into_iter().map(String::from).collect(),
            spec: FutureSpec::ContractDeployment {
                contract_name: name.to_string(),
                artifact: ContractArtifact::new(name, "0x6080"),
                args,
                value: Wei::ZERO,
                libraries: BTreeMap::new(),
                from: None,
            },
        }
    }

    fn deploy_start(name: &str, constructor_args: Vec<Value>) -> StartDetails {
        StartDetails::ContractDeployment {
            contract_name: name.to_string(),
            constructor_args,
            libraries: BTreeMap::new(),
            value: Wei::ZERO,
            from: addr(ACCOUNT),
        }
    }

    fn deploy_result(name: &str, address: &str) -> ExecutionResult {
        ExecutionResult::DeployContract {
            contract_name: name.to_string(),
            contract_address: addr(address),
            tx_hash: TxHash::from_str("0x123").unwrap(),
        }
    }

    fn call_future(id: &str, function_name: &str, args: Vec<Argument>) -> Future {
        Future {
            id: id.to_string(),
            module: "Module1".to_string(),
            dependencies: vec![],
            spec: FutureSpec::ContractCall {
                contract: Argument::string(ADDRESS_A),
                function_name: function_name.to_string(),
                args,
                value: Wei::ZERO,
                from: None,
            },
        }
    }

    fn call_start(function_name: &str, args: Vec<Value>) -> StartDetails {
        StartDetails::ContractCall {
            contract_address: addr(ADDRESS_A),
            function_name: function_name.to_string(),
            args,
            value: Wei::ZERO,
            from: addr(ACCOUNT),
        }
    }

    fn call_result() -> ExecutionResult {
        ExecutionResult::CallFunction {
            tx_hash: TxHash::from_str("0x456").unwrap(),
        }
    }

    #[test]
    fn test_identical_module_reconciles_cleanly() {
        let previous = ExecutionStateMap::replay(&[
            started("Module1:Contract1", deploy_start("Contract1", vec![])),
            succeeded("Module1:Contract1", deploy_result("Contract1", ADDRESS_A)),
        ])
        .unwrap();
        let graph = FutureGraph::new(
            "Module1",
            vec![deploy_future("Module1:Contract1", "Contract1", vec![], vec![])],
        )
        .unwrap();

        let result = reconcile(&previous, &graph, &accounts(), &BTreeMap::new()).unwrap();
        assert!(result.is_successful());
        assert!(result.missing_executed_futures.is_empty());
    }

    #[test]
    fn test_changed_argument_is_reported() {
        let previous = ExecutionStateMap::replay(&[
            started(
                "Module1:Contract1#change",
                call_start("function1", vec![Value::from("UNCHANGED")]),
            ),
            succeeded("Module1:Contract1#change", call_result()),
        ])
        .unwrap();
        let graph = FutureGraph::new(
            "Module1",
            vec![call_future(
                "Module1:Contract1#change",
                "function1",
                vec![Argument::string("CHANGED")],
            )],
        )
        .unwrap();

        let result = reconcile(&previous, &graph, &accounts(), &BTreeMap::new()).unwrap();
        assert_eq!(result.reconciliation_failures.len(), 1);
        let failure = &result.reconciliation_failures[0];
        assert_eq!(failure.future_id, "Module1:Contract1#change");
        assert_eq!(failure.failure, "Argument at index 0 has been changed");
    }

    #[test]
    fn test_changed_function_name_names_both_values() {
        let previous = ExecutionStateMap::replay(&[
            started(
                "Module1:Contract1#call",
                call_start("functionUnchanged", vec![]),
            ),
            succeeded("Module1:Contract1#call", call_result()),
        ])
        .unwrap();
        let graph = FutureGraph::new(
            "Module1",
            vec![call_future("Module1:Contract1#call", "functionChanged", vec![])],
        )
        .unwrap();

        let result = reconcile(&previous, &graph, &accounts(), &BTreeMap::new()).unwrap();
        assert_eq!(result.reconciliation_failures.len(), 1);
        assert_eq!(
            result.reconciliation_failures[0].failure,
            "Function name has been changed from functionUnchanged to functionChanged"
        );
    }

    #[test]
    fn test_each_changed_field_gets_its_own_failure() {
        let previous = ExecutionStateMap::replay(&[
            started(
                "Module1:transfer",
                StartDetails::SendData {
                    to: addr(ADDRESS_A),
                    value: Wei(2),
                    data: Some("unchanged_data".to_string()),
                    from: addr(ACCOUNT),
                },
            ),
            succeeded(
                "Module1:transfer",
                ExecutionResult::SendData {
                    tx_hash: TxHash::from_str("0x456").unwrap(),
                },
            ),
        ])
        .unwrap();
        let graph = FutureGraph::new(
            "Module1",
            vec![Future {
                id: "Module1:transfer".to_string(),
                module: "Module1".to_string(),
                dependencies: vec![],
                spec: FutureSpec::SendData {
                    to: Argument::string(ADDRESS_B),
                    value: Wei(3),
                    data: Some("changed_data".to_string()),
                    from: Some(Argument::account(1)),
                },
            }],
        )
        .unwrap();

        let result = reconcile(&previous, &graph, &accounts(), &BTreeMap::new()).unwrap();
        let messages: Vec<&str> = result
            .reconciliation_failures
            .iter()
            .map(|f| f.failure.as_str())
            .collect();
        assert_eq!(
            messages,
            vec![
                format!("Address \"to\" has been changed from {ADDRESS_A} to {ADDRESS_B}")
                    .as_str(),
                "Value has been changed from 2 to 3",
                "Data has been changed from unchanged_data to changed_data",
                format!("From account has been changed from {ACCOUNT} to {ADDRESS_B}").as_str(),
            ]
        );
    }

    #[test]
    fn test_omitted_data_reconciles_with_explicit_zero_hex() {
        let previous = ExecutionStateMap::replay(&[
            started(
                "Module1:transfer",
                StartDetails::SendData {
                    to: addr(ADDRESS_A),
                    value: Wei::ZERO,
                    data: None,
                    from: addr(ACCOUNT),
                },
            ),
            succeeded(
                "Module1:transfer",
                ExecutionResult::SendData {
                    tx_hash: TxHash::from_str("0x456").unwrap(),
                },
            ),
        ])
        .unwrap();
        let graph = FutureGraph::new(
            "Module1",
            vec![Future {
                id: "Module1:transfer".to_string(),
                module: "Module1".to_string(),
                dependencies: vec![],
                spec: FutureSpec::SendData {
                    to: Argument::string(ADDRESS_A),
                    value: Wei::ZERO,
                    data: Some("0x".to_string()),
                    from: None,
                },
            }],
        )
        .unwrap();

        let result = reconcile(&previous, &graph, &accounts(), &BTreeMap::new()).unwrap();
        assert!(result.is_successful());
    }

    #[test]
    fn test_changed_dependency_address_names_the_future() {
        // Contract1 was wiped and redeployed to a new address after the
        // call had already recorded the old one.
        let previous = ExecutionStateMap::replay(&[
            started("Module1:Contract1", deploy_start("Contract1", vec![])),
            succeeded("Module1:Contract1", deploy_result("Contract1", ADDRESS_B)),
            started("Module1:Contract1#call", call_start("function1", vec![])),
            succeeded("Module1:Contract1#call", call_result()),
        ])
        .unwrap();
        let graph = FutureGraph::new(
            "Module1",
            vec![
                deploy_future("Module1:Contract1", "Contract1", vec![], vec![]),
                Future {
                    id: "Module1:Contract1#call".to_string(),
                    module: "Module1".to_string(),
                    dependencies: vec!["Module1:Contract1".to_string()],
                    spec: FutureSpec::ContractCall {
                        contract: Argument::future("Module1:Contract1"),
                        function_name: "function1".to_string(),
                        args: vec![],
                        value: Wei::ZERO,
                        from: None,
                    },
                },
            ],
        )
        .unwrap();

        let result = reconcile(&previous, &graph, &accounts(), &BTreeMap::new()).unwrap();
        assert_eq!(result.reconciliation_failures.len(), 1);
        let failure = &result.reconciliation_failures[0];
        assert_eq!(failure.future_id, "Module1:Contract1#call");
        assert_eq!(
            failure.failure,
            format!(
                "Contract address has been changed from {ADDRESS_A} to {ADDRESS_B} (future Module1:Contract1)"
            )
        );
    }

    #[test]
    fn test_stale_resolved_result_propagates_to_dependent() {
        // The static call re-ran and now reports "second"; the consumer
        // deployed with the value "first" it resolved back then.
        let previous = ExecutionStateMap::replay(&[
            started(
                "Module1:Values#check",
                StartDetails::StaticCall {
                    contract_address: addr(ADDRESS_A),
                    function_name: "getValue".to_string(),
                    args: vec![],
                    from: addr(ACCOUNT),
                },
            ),
            succeeded(
                "Module1:Values#check",
                ExecutionResult::StaticCall {
                    result: Value::from("second"),
                },
            ),
            started(
                "Module1:Consumer",
                deploy_start("Consumer", vec![Value::from("first")]),
            ),
            succeeded("Module1:Consumer", deploy_result("Consumer", ADDRESS_B)),
        ])
        .unwrap();
        let graph = FutureGraph::new(
            "Module1",
            vec![
                Future {
                    id: "Module1:Values#check".to_string(),
                    module: "Module1".to_string(),
                    dependencies: vec![],
                    spec: FutureSpec::StaticCall {
                        contract: Argument::string(ADDRESS_A),
                        function_name: "getValue".to_string(),
                        args: vec![],
                        from: None,
                    },
                },
                deploy_future(
                    "Module1:Consumer",
                    "Consumer",
                    vec![Argument::future("Module1:Values#check")],
                    vec!["Module1:Values#check"],
                ),
            ],
        )
        .unwrap();

        let result = reconcile(&previous, &graph, &accounts(), &BTreeMap::new()).unwrap();
        assert_eq!(result.reconciliation_failures.len(), 1);
        let failure = &result.reconciliation_failures[0];
        assert_eq!(failure.future_id, "Module1:Consumer");
        assert_eq!(failure.failure, "Argument at index 0 has been changed");
    }

    #[test]
    fn test_rerunning_dependency_blocks_recorded_dependent() {
        // The dependency has no state (renamed or wiped), so its value is
        // unknown until it runs; the consumer's recorded argument cannot
        // be verified against it.
        let previous = ExecutionStateMap::replay(&[
            started(
                "Module1:Consumer",
                deploy_start("Consumer", vec![Value::from(ADDRESS_A)]),
            ),
            succeeded("Module1:Consumer", deploy_result("Consumer", ADDRESS_B)),
        ])
        .unwrap();
        let graph = FutureGraph::new(
            "Module1",
            vec![
                deploy_future("Module1:Registry", "Registry", vec![], vec![]),
                deploy_future(
                    "Module1:Consumer",
                    "Consumer",
                    vec![Argument::future("Module1:Registry")],
                    vec!["Module1:Registry"],
                ),
            ],
        )
        .unwrap();

        let result = reconcile(&previous, &graph, &accounts(), &BTreeMap::new()).unwrap();
        assert_eq!(result.reconciliation_failures.len(), 1);
        assert_eq!(
            result.reconciliation_failures[0].failure,
            "Argument at index 0 has been changed"
        );
    }

    #[test]
    fn test_started_and_failed_states_are_not_compared() {
        let previous = ExecutionStateMap::replay(&[
            started(
                "Module1:Contract1",
                deploy_start("SomethingElse", vec![Value::from(99)]),
            ),
            JournalMessage::ExecutionFailure {
                future_id: "Module1:Contract1".to_string(),
                error: "reverted".to_string(),
            },
            started(
                "Module1:Contract2",
                deploy_start("AlsoDifferent", vec![Value::from(7)]),
            ),
        ])
        .unwrap();
        let graph = FutureGraph::new(
            "Module1",
            vec![
                deploy_future("Module1:Contract1", "Contract1", vec![], vec![]),
                deploy_future("Module1:Contract2", "Contract2", vec![], vec![]),
            ],
        )
        .unwrap();

        let result = reconcile(&previous, &graph, &accounts(), &BTreeMap::new()).unwrap();
        assert!(result.is_successful());
    }

    #[test]
    fn test_future_kind_change_is_a_single_failure() {
        let previous = ExecutionStateMap::replay(&[
            started("Module1:Contract1", deploy_start("Contract1", vec![])),
            succeeded("Module1:Contract1", deploy_result("Contract1", ADDRESS_A)),
        ])
        .unwrap();
        let graph = FutureGraph::new(
            "Module1",
            vec![Future {
                id: "Module1:Contract1".to_string(),
                module: "Module1".to_string(),
                dependencies: vec![],
                spec: FutureSpec::ContractAt {
                    contract_name: "Contract1".to_string(),
                    address: Argument::string(ADDRESS_A),
                },
            }],
        )
        .unwrap();

        let result = reconcile(&previous, &graph, &accounts(), &BTreeMap::new()).unwrap();
        assert_eq!(result.reconciliation_failures.len(), 1);
        assert_eq!(
            result.reconciliation_failures[0].failure,
            "Future type has been changed from contract-deployment to contract-at"
        );
    }

    #[test]
    fn test_removed_future_is_listed_but_not_blocking() {
        let previous = ExecutionStateMap::replay(&[
            started("Module1:Old", deploy_start("Old", vec![])),
            succeeded("Module1:Old", deploy_result("Old", ADDRESS_A)),
        ])
        .unwrap();
        let graph = FutureGraph::new(
            "Module1",
            vec![deploy_future("Module1:New", "New", vec![], vec![])],
        )
        .unwrap();

        let result = reconcile(&previous, &graph, &accounts(), &BTreeMap::new()).unwrap();
        assert!(result.is_successful());
        assert_eq!(
            result.missing_executed_futures,
            vec!["Module1:Old".to_string()]
        );
    }
}
