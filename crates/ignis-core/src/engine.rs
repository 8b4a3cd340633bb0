//! The execution engine.
//!
//! Runs every future of a module graph to a terminal state, journaling
//! each transition before acting on it. Futures execute concurrently up to
//! the configured limit; a future becomes eligible the moment all of its
//! dependencies have succeeded, and eligible futures start in declaration
//! order. Anything downstream of a failure is skipped, never half-run.
//!
//! The engine is resumable by construction: it consumes the state map
//! replayed from the journal, reuses recorded successes, settles
//! transactions a previous run left pending instead of re-submitting
//! them, and wipes half-finished state before executing a future again.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use ignis_chain::{
    ChainAdapter, ConfirmationOutcome, InteractionHandle, SubmitPayload, SubmitRequest,
};
use ignis_types::{Address, Future, FutureGraph, ResolutionContext, TxHash};

use crate::config::ExecutionConfig;
use crate::journal::Journal;
use crate::messages::{
    ExecutionResult, JournalMessage, ResultDetails, StartDetails, TransactionParams,
};
use crate::nonce::NonceManager;
use crate::state::{ExecutionState, ExecutionStateMap, ExecutionStatus};
use crate::strategy::{plan_actions, resolve_start, PlannedAction, STRATEGY_NAME};

/// One failed or timed out future and the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FutureFailure {
    pub future_id: String,
    pub reason: String,
}

/// Aggregated outcome of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentResult {
    pub module: String,
    /// Reference value of every successful future.
    pub results: BTreeMap<String, Value>,
    /// Contract addresses created or bound by successful futures.
    pub addresses: BTreeMap<String, Address>,
    pub failed: Vec<FutureFailure>,
    pub timed_out: Vec<FutureFailure>,
    /// Futures not attempted because something upstream went wrong,
    /// in declaration order.
    pub skipped: Vec<String>,
}

impl DeploymentResult {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.timed_out.is_empty() && self.skipped.is_empty()
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for DeploymentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "module {}: {} succeeded, {} failed, {} timed out, {} skipped",
            self.module,
            self.results.len(),
            self.failed.len(),
            self.timed_out.len(),
            self.skipped.len()
        )?;
        for (future_id, value) in &self.results {
            writeln!(f, "  ok        {} -> {}", future_id, display_value(value))?;
        }
        for failure in &self.failed {
            writeln!(f, "  failed    {}: {}", failure.future_id, failure.reason)?;
        }
        for failure in &self.timed_out {
            writeln!(f, "  timed out {}: {}", failure.future_id, failure.reason)?;
        }
        for future_id in &self.skipped {
            writeln!(f, "  skipped   {future_id}")?;
        }
        Ok(())
    }
}

/// Journaled, resumable executor for one deployment.
pub struct ExecutionEngine {
    adapter: Arc<dyn ChainAdapter>,
    journal: Arc<dyn Journal>,
    config: ExecutionConfig,
}

struct EngineCtx {
    adapter: Arc<dyn ChainAdapter>,
    journal: Arc<dyn Journal>,
    store: Mutex<ExecutionStateMap>,
    nonces: NonceManager,
    config: ExecutionConfig,
    accounts: Vec<Address>,
    parameters: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
enum DriveOutcome {
    Success,
    Failed(String),
    TimedOut(String),
}

#[derive(Debug, Clone)]
enum NodeState {
    Pending,
    Running,
    Succeeded,
    Failed(String),
    TimedOut(String),
    Skipped,
}

enum Flow<T> {
    Done(T),
    Halt(DriveOutcome),
}

enum CompletedAction {
    Deployed {
        contract_address: Address,
        tx_hash: TxHash,
    },
    Called {
        tx_hash: TxHash,
    },
    Sent {
        tx_hash: TxHash,
    },
    Read {
        value: Value,
    },
    Bound,
}

impl ExecutionEngine {
    pub fn new(
        adapter: Arc<dyn ChainAdapter>,
        journal: Arc<dyn Journal>,
        config: ExecutionConfig,
    ) -> Self {
        ExecutionEngine {
            adapter,
            journal,
            config,
        }
    }

    /// Run every future of `graph` to a terminal state.
    ///
    /// `recovered` is the state replayed from the journal; successful
    /// futures in it are reused without touching the network. The caller
    /// is expected to have reconciled the graph against it first.
    pub async fn execute(
        &self,
        graph: &FutureGraph,
        recovered: ExecutionStateMap,
        parameters: &BTreeMap<String, Value>,
    ) -> Result<DeploymentResult> {
        let accounts = self
            .adapter
            .accounts()
            .await
            .context("fetch accounts from the network backend")?;

        info!(
            module = %graph.module,
            futures = graph.futures.len(),
            network = self.adapter.network_name(),
            "starting deployment run"
        );

        let ctx = Arc::new(EngineCtx {
            adapter: self.adapter.clone(),
            journal: self.journal.clone(),
            store: Mutex::new(recovered),
            nonces: NonceManager::new(),
            config: self.config,
            accounts,
            parameters: parameters.clone(),
        });

        let mut nodes: HashMap<String, NodeState> = graph
            .futures
            .iter()
            .map(|future| (future.id.clone(), NodeState::Pending))
            .collect();
        {
            let store = ctx.store.lock();
            for state in store.states() {
                if state.status == ExecutionStatus::Success {
                    if let Some(node) = nodes.get_mut(&state.future_id) {
                        debug!(future_id = %state.future_id, "reusing recorded result");
                        *node = NodeState::Succeeded;
                    }
                }
            }
        }

        let mut in_flight: FuturesUnordered<BoxFuture<'static, Result<(String, DriveOutcome)>>> =
            FuturesUnordered::new();

        loop {
            mark_skipped(graph, &mut nodes);

            for future in &graph.futures {
                if in_flight.len() >= ctx.config.max_concurrency {
                    break;
                }
                let pending = matches!(nodes.get(&future.id), Some(NodeState::Pending));
                let ready = pending
                    && future
                        .dependencies
                        .iter()
                        .all(|dep| matches!(nodes.get(dep.as_str()), Some(NodeState::Succeeded)));
                if ready {
                    nodes.insert(future.id.clone(), NodeState::Running);
                    debug!(future_id = %future.id, "starting future");
                    in_flight.push(Box::pin(drive_future(ctx.clone(), future.clone())));
                }
            }

            if in_flight.is_empty() {
                break;
            }

            match in_flight.next().await {
                Some(completion) => {
                    let (future_id, outcome) = completion?;
                    let node = match outcome {
                        DriveOutcome::Success => NodeState::Succeeded,
                        DriveOutcome::Failed(reason) => NodeState::Failed(reason),
                        DriveOutcome::TimedOut(reason) => NodeState::TimedOut(reason),
                    };
                    nodes.insert(future_id, node);
                }
                None => break,
            }
        }

        if let Some((stalled, _)) = nodes
            .iter()
            .find(|(_, node)| matches!(node, NodeState::Pending | NodeState::Running))
        {
            bail!("execution stalled before \"{stalled}\" could run");
        }

        let store = ctx.store.lock();
        let mut result = DeploymentResult {
            module: graph.module.clone(),
            results: BTreeMap::new(),
            addresses: BTreeMap::new(),
            failed: Vec::new(),
            timed_out: Vec::new(),
            skipped: Vec::new(),
        };
        for future in &graph.futures {
            match nodes.get(&future.id) {
                Some(NodeState::Succeeded) => {
                    if let Some(state) = store.get(&future.id) {
                        if let Some(value) = state.reference_value() {
                            result.results.insert(future.id.clone(), value);
                        }
                        if let Some(address) = state
                            .result
                            .as_ref()
                            .and_then(ExecutionResult::contract_address)
                        {
                            result.addresses.insert(future.id.clone(), address.clone());
                        }
                    }
                }
                Some(NodeState::Failed(reason)) => result.failed.push(FutureFailure {
                    future_id: future.id.clone(),
                    reason: reason.clone(),
                }),
                Some(NodeState::TimedOut(reason)) => result.timed_out.push(FutureFailure {
                    future_id: future.id.clone(),
                    reason: reason.clone(),
                }),
                Some(NodeState::Skipped) => result.skipped.push(future.id.clone()),
                _ => {}
            }
        }

        info!(
            module = %graph.module,
            succeeded = result.results.len(),
            failed = result.failed.len(),
            timed_out = result.timed_out.len(),
            skipped = result.skipped.len(),
            "deployment run finished"
        );
        Ok(result)
    }
}

fn mark_skipped(graph: &FutureGraph, nodes: &mut HashMap<String, NodeState>) {
    loop {
        let mut changed = false;
        for future in &graph.futures {
            if !matches!(nodes.get(&future.id), Some(NodeState::Pending)) {
                continue;
            }
            let blocked = future.dependencies.iter().any(|dep| {
                matches!(
                    nodes.get(dep.as_str()),
                    Some(NodeState::Failed(_) | NodeState::TimedOut(_) | NodeState::Skipped)
                )
            });
            if blocked {
                debug!(future_id = %future.id, "skipping future, a dependency did not succeed");
                nodes.insert(future.id.clone(), NodeState::Skipped);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Journal a record, then fold it into the live store.
///
/// Append-before-apply keeps the invariant that the live store is always
/// reproducible by replaying the file.
fn record(ctx: &EngineCtx, message: JournalMessage) -> Result<()> {
    ctx.journal.append(&message)?;
    ctx.store.lock().apply(&message)?;
    Ok(())
}

fn record_failure(ctx: &EngineCtx, future_id: &str, error: String) -> Result<DriveOutcome> {
    warn!(future_id, %error, "future failed");
    record(
        ctx,
        JournalMessage::ExecutionFailure {
            future_id: future_id.to_string(),
            error: error.clone(),
        },
    )?;
    Ok(DriveOutcome::Failed(error))
}

async fn drive_future(ctx: Arc<EngineCtx>, future: Future) -> Result<(String, DriveOutcome)> {
    let future_id = future.id.clone();

    let prior = ctx.store.lock().get(&future_id).cloned();
    if let Some(state) = prior {
        match state.status {
            ExecutionStatus::Success => return Ok((future_id, DriveOutcome::Success)),
            ExecutionStatus::Started | ExecutionStatus::TimedOut => {
                // A previous run stopped mid-flight. A transaction may be
                // pending, so settle it before anything is re-submitted.
                if let Some(outcome) = settle_pending(&ctx, &future_id, &state).await? {
                    return Ok((future_id, outcome));
                }
                // State was wiped, run from scratch below.
            }
            ExecutionStatus::Failed => {
                debug!(future_id = %future_id, "wiping failed state from a previous run");
                record(
                    &ctx,
                    JournalMessage::Wipe {
                        future_id: future_id.clone(),
                    },
                )?;
            }
        }
    }

    let outcome = run_fresh(&ctx, &future).await?;
    Ok((future_id, outcome))
}

/// Settle a future a previous run left unfinished.
///
/// An accepted transaction is awaited again; a requested-but-unaccepted
/// one is probed via the account nonce to decide whether it was consumed.
/// Returns `None` when the pending work provably never reached the
/// network; the caller then re-runs the future against the wiped state.
async fn settle_pending(
    ctx: &EngineCtx,
    future_id: &str,
    state: &ExecutionState,
) -> Result<Option<DriveOutcome>> {
    let execution_id = state.interactions.len() as u64;

    if let Some(tx_hash) = state.last_accepted_tx() {
        debug!(future_id, tx_hash = %tx_hash, "re-checking transaction from a previous run");
        match await_confirmation(ctx, future_id, execution_id, tx_hash).await? {
            Flow::Done(contract_address) => {
                let (details, result) = match completion_for(&state.start, contract_address, tx_hash)
                {
                    Ok(pair) => pair,
                    Err(err) => {
                        return Ok(Some(record_failure(ctx, future_id, format!("{err:#}"))?))
                    }
                };
                record(
                    ctx,
                    JournalMessage::OnchainResult {
                        future_id: future_id.to_string(),
                        execution_id,
                        result: details,
                    },
                )?;
                record(
                    ctx,
                    JournalMessage::ExecutionSuccess {
                        future_id: future_id.to_string(),
                        result,
                    },
                )?;
                info!(future_id, "pending transaction from a previous run confirmed");
                Ok(Some(DriveOutcome::Success))
            }
            Flow::Halt(outcome) => Ok(Some(outcome)),
        }
    } else if let Some(request) = state.last_request() {
        // A request was journaled but no acceptance. Probe the account to
        // find out whether the nonce was consumed.
        let chain_nonce = match ctx.adapter.current_nonce(&request.from).await {
            Ok(nonce) => nonce,
            Err(err) => {
                return Ok(Some(DriveOutcome::TimedOut(format!(
                    "could not re-check the pending transaction from {}: {err:#}",
                    request.from
                ))));
            }
        };
        if chain_nonce > request.nonce {
            let error = format!(
                "a previous run submitted a transaction from {} with nonce {} but its hash was not recorded; inspect the account and wipe the future to retry",
                request.from, request.nonce
            );
            Ok(Some(record_failure(ctx, future_id, error)?))
        } else {
            debug!(future_id, "pending transaction never reached the network, wiping");
            record(
                ctx,
                JournalMessage::Wipe {
                    future_id: future_id.to_string(),
                },
            )?;
            Ok(None)
        }
    } else {
        record(
            ctx,
            JournalMessage::Wipe {
                future_id: future_id.to_string(),
            },
        )?;
        Ok(None)
    }
}

async fn run_fresh(ctx: &EngineCtx, future: &Future) -> Result<DriveOutcome> {
    let future_id = future.id.as_str();

    let (results, confirming) = {
        let store = ctx.store.lock();
        (store.reference_values(), store.confirming_txs())
    };
    let rctx = ResolutionContext {
        results: &results,
        accounts: &ctx.accounts,
        parameters: &ctx.parameters,
    };

    let start = match resolve_start(future, &rctx, &confirming) {
        Ok(start) => start,
        Err(err) => {
            // Nothing journaled yet, so the failure leaves no state behind.
            let reason = format!("{err:#}");
            warn!(future_id, %reason, "could not resolve parameters");
            return Ok(DriveOutcome::Failed(reason));
        }
    };

    record(
        ctx,
        JournalMessage::ExecutionStart {
            future_id: future_id.to_string(),
            strategy: STRATEGY_NAME.to_string(),
            dependencies: future.dependencies.clone(),
            start: start.clone(),
        },
    )?;

    let actions = match plan_actions(&future.spec, &start) {
        Ok(actions) => actions,
        Err(err) => return record_failure(ctx, future_id, format!("{err:#}")),
    };

    let mut completed = None;
    for (index, action) in actions.into_iter().enumerate() {
        let execution_id = index as u64 + 1;
        record(
            ctx,
            JournalMessage::OnchainAction {
                future_id: future_id.to_string(),
                execution_id,
                action: action.action_details(),
            },
        )?;
        match execute_action(ctx, future_id, execution_id, action).await? {
            Flow::Done(done) => completed = Some(done),
            Flow::Halt(outcome) => return Ok(outcome),
        }
    }

    let result = terminal_result(&start, completed)?;
    record(
        ctx,
        JournalMessage::ExecutionSuccess {
            future_id: future_id.to_string(),
            result,
        },
    )?;
    debug!(future_id, "future succeeded");
    Ok(DriveOutcome::Success)
}

async fn execute_action(
    ctx: &EngineCtx,
    future_id: &str,
    execution_id: u64,
    action: PlannedAction,
) -> Result<Flow<CompletedAction>> {
    match action {
        PlannedAction::DeployContract {
            bytecode,
            args,
            value,
            from,
            ..
        } => {
            let tx = TransactionParams {
                to: None,
                data: Some(bytecode.clone()),
                value,
            };
            let payload = SubmitPayload::Deploy {
                bytecode,
                args,
                value,
            };
            let tx_hash =
                match submit_signed(ctx, future_id, execution_id, &from, payload, tx).await? {
                    Flow::Done(tx_hash) => tx_hash,
                    Flow::Halt(outcome) => return Ok(Flow::Halt(outcome)),
                };
            let contract_address =
                match await_confirmation(ctx, future_id, execution_id, &tx_hash).await? {
                    Flow::Done(contract_address) => contract_address,
                    Flow::Halt(outcome) => return Ok(Flow::Halt(outcome)),
                };
            let contract_address = match contract_address {
                Some(address) => address,
                None => {
                    let error = format!(
                        "transaction {tx_hash} confirmed but the node reported no contract address"
                    );
                    return Ok(Flow::Halt(record_failure(ctx, future_id, error)?));
                }
            };
            record(
                ctx,
                JournalMessage::OnchainResult {
                    future_id: future_id.to_string(),
                    execution_id,
                    result: ResultDetails::DeployContractSuccess {
                        contract_address: contract_address.clone(),
                        tx_hash: tx_hash.clone(),
                    },
                },
            )?;
            Ok(Flow::Done(CompletedAction::Deployed {
                contract_address,
                tx_hash,
            }))
        }
        PlannedAction::CallFunction {
            contract_address,
            function_name,
            args,
            value,
            from,
        } => {
            let tx = TransactionParams {
                to: Some(contract_address.clone()),
                data: None,
                value,
            };
            let payload = SubmitPayload::Call {
                to: contract_address,
                function_name,
                args,
                value,
            };
            let tx_hash =
                match submit_signed(ctx, future_id, execution_id, &from, payload, tx).await? {
                    Flow::Done(tx_hash) => tx_hash,
                    Flow::Halt(outcome) => return Ok(Flow::Halt(outcome)),
                };
            match await_confirmation(ctx, future_id, execution_id, &tx_hash).await? {
                Flow::Done(_) => {}
                Flow::Halt(outcome) => return Ok(Flow::Halt(outcome)),
            }
            record(
                ctx,
                JournalMessage::OnchainResult {
                    future_id: future_id.to_string(),
                    execution_id,
                    result: ResultDetails::CallFunctionSuccess {
                        tx_hash: tx_hash.clone(),
                    },
                },
            )?;
            Ok(Flow::Done(CompletedAction::Called { tx_hash }))
        }
        PlannedAction::SendData {
            to,
            value,
            data,
            from,
        } => {
            let tx = TransactionParams {
                to: Some(to.clone()),
                data: data.clone(),
                value,
            };
            let payload = SubmitPayload::Send { to, data, value };
            let tx_hash =
                match submit_signed(ctx, future_id, execution_id, &from, payload, tx).await? {
                    Flow::Done(tx_hash) => tx_hash,
                    Flow::Halt(outcome) => return Ok(Flow::Halt(outcome)),
                };
            match await_confirmation(ctx, future_id, execution_id, &tx_hash).await? {
                Flow::Done(_) => {}
                Flow::Halt(outcome) => return Ok(Flow::Halt(outcome)),
            }
            record(
                ctx,
                JournalMessage::OnchainResult {
                    future_id: future_id.to_string(),
                    execution_id,
                    result: ResultDetails::SendDataSuccess {
                        tx_hash: tx_hash.clone(),
                    },
                },
            )?;
            Ok(Flow::Done(CompletedAction::Sent { tx_hash }))
        }
        PlannedAction::StaticCall {
            contract_address,
            function_name,
            args,
            ..
        } => match ctx
            .adapter
            .static_call(&contract_address, &function_name, &args)
            .await
        {
            Ok(value) => {
                record(
                    ctx,
                    JournalMessage::OnchainResult {
                        future_id: future_id.to_string(),
                        execution_id,
                        result: ResultDetails::StaticCallSuccess {
                            result: value.clone(),
                        },
                    },
                )?;
                Ok(Flow::Done(CompletedAction::Read { value }))
            }
            Err(err) => Ok(Flow::Halt(record_failure(
                ctx,
                future_id,
                format!("{err:#}"),
            )?)),
        },
        PlannedAction::ReadEventArgument {
            event_name,
            argument_name,
            event_index,
            emitter,
            tx_to_read_from,
        } => match ctx
            .adapter
            .read_event_argument(
                &tx_to_read_from,
                &event_name,
                &argument_name,
                event_index,
                &emitter,
            )
            .await
        {
            Ok(value) => {
                record(
                    ctx,
                    JournalMessage::OnchainResult {
                        future_id: future_id.to_string(),
                        execution_id,
                        result: ResultDetails::ReadEventArgumentSuccess {
                            result: value.clone(),
                        },
                    },
                )?;
                Ok(Flow::Done(CompletedAction::Read { value }))
            }
            Err(err) => Ok(Flow::Halt(record_failure(
                ctx,
                future_id,
                format!("{err:#}"),
            )?)),
        },
        PlannedAction::BindContract {
            contract_address, ..
        } => {
            record(
                ctx,
                JournalMessage::OnchainResult {
                    future_id: future_id.to_string(),
                    execution_id,
                    result: ResultDetails::ContractAtSuccess { contract_address },
                },
            )?;
            Ok(Flow::Done(CompletedAction::Bound))
        }
    }
}

/// Reserve a nonce, journal the request and submit it.
///
/// The account lock is held across the submission so nonces are assigned
/// in true submission order; it is released as soon as the node answers.
async fn submit_signed(
    ctx: &EngineCtx,
    future_id: &str,
    execution_id: u64,
    from: &Address,
    payload: SubmitPayload,
    tx: TransactionParams,
) -> Result<Flow<TxHash>> {
    let reservation = match ctx.nonces.acquire(from, ctx.adapter.as_ref()).await {
        Ok(reservation) => reservation,
        Err(err) => {
            return Ok(Flow::Halt(record_failure(
                ctx,
                future_id,
                format!("{err:#}"),
            )?))
        }
    };
    let nonce = reservation.nonce();

    record(
        ctx,
        JournalMessage::OnchainTransactionRequest {
            future_id: future_id.to_string(),
            execution_id,
            from: from.clone(),
            nonce,
            tx,
        },
    )?;

    let request = SubmitRequest {
        from: from.clone(),
        nonce,
        payload,
    };
    match ctx.adapter.submit(&request).await {
        Ok(handle) => {
            reservation.commit();
            record(
                ctx,
                JournalMessage::OnchainTransactionAccept {
                    future_id: future_id.to_string(),
                    execution_id,
                    tx_hash: handle.tx_hash.clone(),
                },
            )?;
            debug!(future_id, tx_hash = %handle.tx_hash, nonce, "transaction accepted");
            Ok(Flow::Done(handle.tx_hash))
        }
        Err(err) => {
            // The nonce was not consumed; the reservation releases it.
            drop(reservation);
            Ok(Flow::Halt(record_failure(
                ctx,
                future_id,
                format!("{err:#}"),
            )?))
        }
    }
}

async fn await_confirmation(
    ctx: &EngineCtx,
    future_id: &str,
    execution_id: u64,
    tx_hash: &TxHash,
) -> Result<Flow<Option<Address>>> {
    let handle = InteractionHandle {
        tx_hash: tx_hash.clone(),
    };
    match ctx
        .adapter
        .wait_for_confirmation(&handle, ctx.config.poll_interval, ctx.config.confirmation_timeout)
        .await
    {
        Ok(ConfirmationOutcome::Confirmed { contract_address }) => Ok(Flow::Done(contract_address)),
        Ok(ConfirmationOutcome::Failed { reason }) => {
            Ok(Flow::Halt(record_failure(ctx, future_id, reason)?))
        }
        Ok(ConfirmationOutcome::TimedOut) => {
            let reason = format!(
                "transaction {tx_hash} was not confirmed within {}ms",
                ctx.config.confirmation_timeout.as_millis()
            );
            warn!(future_id, tx_hash = %tx_hash, "confirmation timed out");
            record(
                ctx,
                JournalMessage::ExecutionTimeout {
                    future_id: future_id.to_string(),
                    execution_id,
                },
            )?;
            Ok(Flow::Halt(DriveOutcome::TimedOut(reason)))
        }
        Err(err) => Ok(Flow::Halt(record_failure(
            ctx,
            future_id,
            format!("{err:#}"),
        )?)),
    }
}

/// Build the result records for a transaction that confirmed during a
/// re-check of a previously timed out future.
fn completion_for(
    start: &StartDetails,
    contract_address: Option<Address>,
    tx_hash: &TxHash,
) -> Result<(ResultDetails, ExecutionResult)> {
    match start {
        StartDetails::ContractDeployment { contract_name, .. }
        | StartDetails::ArtifactContractDeployment { contract_name, .. }
        | StartDetails::LibraryDeployment { contract_name, .. } => {
            let contract_address = contract_address
                .context("the node reported no contract address for the confirmed deployment")?;
            Ok((
                ResultDetails::DeployContractSuccess {
                    contract_address: contract_address.clone(),
                    tx_hash: tx_hash.clone(),
                },
                ExecutionResult::DeployContract {
                    contract_name: contract_name.clone(),
                    contract_address,
                    tx_hash: tx_hash.clone(),
                },
            ))
        }
        StartDetails::ContractCall { .. } => Ok((
            ResultDetails::CallFunctionSuccess {
                tx_hash: tx_hash.clone(),
            },
            ExecutionResult::CallFunction {
                tx_hash: tx_hash.clone(),
            },
        )),
        StartDetails::SendData { .. } => Ok((
            ResultDetails::SendDataSuccess {
                tx_hash: tx_hash.clone(),
            },
            ExecutionResult::SendData {
                tx_hash: tx_hash.clone(),
            },
        )),
        StartDetails::ContractAt { .. }
        | StartDetails::StaticCall { .. }
        | StartDetails::ReadEventArgument { .. } => {
            bail!("future has no pending transaction to re-check")
        }
    }
}

fn terminal_result(
    start: &StartDetails,
    completed: Option<CompletedAction>,
) -> Result<ExecutionResult> {
    match (start, completed) {
        (
            StartDetails::ContractDeployment { contract_name, .. }
            | StartDetails::ArtifactContractDeployment { contract_name, .. }
            | StartDetails::LibraryDeployment { contract_name, .. },
            Some(CompletedAction::Deployed {
                contract_address,
                tx_hash,
            }),
        ) => Ok(ExecutionResult::DeployContract {
            contract_name: contract_name.clone(),
            contract_address,
            tx_hash,
        }),
        (StartDetails::ContractCall { .. }, Some(CompletedAction::Called { tx_hash })) => {
            Ok(ExecutionResult::CallFunction { tx_hash })
        }
        (StartDetails::SendData { .. }, Some(CompletedAction::Sent { tx_hash })) => {
            Ok(ExecutionResult::SendData { tx_hash })
        }
        (StartDetails::StaticCall { .. }, Some(CompletedAction::Read { value })) => {
            Ok(ExecutionResult::StaticCall { result: value })
        }
        (StartDetails::ReadEventArgument { .. }, Some(CompletedAction::Read { value })) => {
            Ok(ExecutionResult::ReadEventArgument { result: value })
        }
        (
            StartDetails::ContractAt {
                contract_name,
                contract_address,
            },
            Some(CompletedAction::Bound),
        ) => Ok(ExecutionResult::ContractAt {
            contract_name: contract_name.clone(),
            contract_address: contract_address.clone(),
        }),
        _ => bail!("future finished its actions without a usable result"),
    }
}
