//! Turns a declared future into resolved parameters and planned actions.
//!
//! Resolution happens once per future, at the moment all of its
//! dependencies have results: reference arguments collapse to concrete
//! values, the sending account defaults to account zero, and library
//! placeholders are linked into the bytecode. The resolved
//! [`StartDetails`] is journaled verbatim, so the plan can be rebuilt and
//! compared on later runs.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use ignis_types::{
    expect_address, Address, Argument, Future, FutureSpec, ResolutionContext, TxHash, Wei,
};

use crate::messages::{ActionDetails, StartDetails};

/// Name of the execution strategy journaled with every start record.
pub const STRATEGY_NAME: &str = "basic";

/// One network-facing step the engine will carry out for a future.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedAction {
    DeployContract {
        contract_name: String,
        /// Creation bytecode with all library placeholders linked.
        bytecode: String,
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
    BindContract {
        contract_name: String,
        contract_address: Address,
    },
}

impl PlannedAction {
    /// Whether carrying this out consumes a nonce and needs a signature.
    pub fn requires_signing(&self) -> bool {
        matches!(
            self,
            PlannedAction::DeployContract { .. }
                | PlannedAction::CallFunction { .. }
                | PlannedAction::SendData { .. }
        )
    }

    /// Whether this only observes the network.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            PlannedAction::StaticCall { .. }
                | PlannedAction::ReadEventArgument { .. }
                | PlannedAction::BindContract { .. }
        )
    }

    /// The journal payload announcing this action.
    pub fn action_details(&self) -> ActionDetails {
        match self {
            PlannedAction::DeployContract {
                contract_name,
                args,
                value,
                from,
                ..
            } => ActionDetails::DeployContract {
                contract_name: contract_name.clone(),
                args: args.clone(),
                value: *value,
                from: from.clone(),
            },
            PlannedAction::CallFunction {
                contract_address,
                function_name,
                args,
                value,
                from,
            } => ActionDetails::CallFunction {
                contract_address: contract_address.clone(),
                function_name: function_name.clone(),
                args: args.clone(),
                value: *value,
                from: from.clone(),
            },
            PlannedAction::StaticCall {
                contract_address,
                function_name,
                args,
                from,
            } => ActionDetails::StaticCall {
                contract_address: contract_address.clone(),
                function_name: function_name.clone(),
                args: args.clone(),
                from: from.clone(),
            },
            PlannedAction::SendData {
                to,
                value,
                data,
                from,
            } => ActionDetails::SendData {
                to: to.clone(),
                value: *value,
                data: data.clone(),
                from: from.clone(),
            },
            PlannedAction::ReadEventArgument {
                event_name,
                argument_name,
                event_index,
                emitter,
                tx_to_read_from,
            } => ActionDetails::ReadEventArgument {
                event_name: event_name.clone(),
                argument_name: argument_name.clone(),
                event_index: *event_index,
                emitter: emitter.clone(),
                tx_to_read_from: tx_to_read_from.clone(),
            },
            PlannedAction::BindContract {
                contract_name,
                contract_address,
            } => ActionDetails::ContractAt {
                contract_name: contract_name.clone(),
                contract_address: contract_address.clone(),
            },
        }
    }
}

fn resolve_from(from: &Option<Argument>, ctx: &ResolutionContext<'_>) -> Result<Address> {
    match from {
        Some(arg) => expect_address(&arg.resolve(ctx)?).context("resolve the sending account"),
        None => ctx
            .accounts
            .first()
            .cloned()
            .context("the network backend exposes no accounts to send from"),
    }
}

fn resolve_args(args: &[Argument], ctx: &ResolutionContext<'_>) -> Result<Vec<Value>> {
    args.iter()
        .enumerate()
        .map(|(index, arg)| {
            arg.resolve(ctx)
                .with_context(|| format!("resolve argument at index {index}"))
        })
        .collect()
}

fn resolve_libraries(
    libraries: &BTreeMap<String, Argument>,
    ctx: &ResolutionContext<'_>,
) -> Result<BTreeMap<String, Address>> {
    libraries
        .iter()
        .map(|(name, arg)| {
            let address = expect_address(&arg.resolve(ctx)?)
                .with_context(|| format!("resolve library \"{name}\""))?;
            Ok((name.clone(), address))
        })
        .collect()
}

/// Resolve every declared argument of `future` to a concrete value.
///
/// `confirming_txs` maps finished futures to the hash of their confirming
/// transaction, which is what event reads are anchored to.
pub fn resolve_start(
    future: &Future,
    ctx: &ResolutionContext<'_>,
    confirming_txs: &BTreeMap<String, TxHash>,
) -> Result<StartDetails> {
    match &future.spec {
        FutureSpec::ContractDeployment {
            contract_name,
            args,
            value,
            libraries,
            from,
            ..
        } => Ok(StartDetails::ContractDeployment {
            contract_name: contract_name.clone(),
            constructor_args: resolve_args(args, ctx)?,
            libraries: resolve_libraries(libraries, ctx)?,
            value: *value,
            from: resolve_from(from, ctx)?,
        }),
        FutureSpec::ArtifactContractDeployment {
            contract_name,
            args,
            value,
            libraries,
            from,
            ..
        } => Ok(StartDetails::ArtifactContractDeployment {
            contract_name: contract_name.clone(),
            constructor_args: resolve_args(args, ctx)?,
            libraries: resolve_libraries(libraries, ctx)?,
            value: *value,
            from: resolve_from(from, ctx)?,
        }),
        FutureSpec::LibraryDeployment {
            contract_name,
            libraries,
            from,
            ..
        } => Ok(StartDetails::LibraryDeployment {
            contract_name: contract_name.clone(),
            libraries: resolve_libraries(libraries, ctx)?,
            from: resolve_from(from, ctx)?,
        }),
        FutureSpec::ContractAt {
            contract_name,
            address,
        } => Ok(StartDetails::ContractAt {
            contract_name: contract_name.clone(),
            contract_address: expect_address(&address.resolve(ctx)?)
                .context("resolve the contract address")?,
        }),
        FutureSpec::ContractCall {
            contract,
            function_name,
            args,
            value,
            from,
        } => Ok(StartDetails::ContractCall {
            contract_address: expect_address(&contract.resolve(ctx)?)
                .context("resolve the target contract")?,
            function_name: function_name.clone(),
            args: resolve_args(args, ctx)?,
            value: *value,
            from: resolve_from(from, ctx)?,
        }),
        FutureSpec::StaticCall {
            contract,
            function_name,
            args,
            from,
        } => Ok(StartDetails::StaticCall {
            contract_address: expect_address(&contract.resolve(ctx)?)
                .context("resolve the target contract")?,
            function_name: function_name.clone(),
            args: resolve_args(args, ctx)?,
            from: resolve_from(from, ctx)?,
        }),
        FutureSpec::SendData {
            to,
            value,
            data,
            from,
        } => Ok(StartDetails::SendData {
            to: expect_address(&to.resolve(ctx)?).context("resolve the recipient")?,
            value: *value,
            data: data.clone(),
            from: resolve_from(from, ctx)?,
        }),
        FutureSpec::ReadEventArgument {
            event_name,
            argument_name,
            event_index,
            emitter,
            tx_source,
        } => Ok(StartDetails::ReadEventArgument {
            event_name: event_name.clone(),
            argument_name: argument_name.clone(),
            event_index: *event_index,
            emitter: expect_address(&emitter.resolve(ctx)?).context("resolve the emitter")?,
            tx_to_read_from: confirming_txs.get(tx_source).cloned().with_context(|| {
                format!("future \"{tx_source}\" has no confirmed transaction to read events from")
            })?,
        }),
    }
}

/// Plan the network actions for a future from its resolved parameters.
pub fn plan_actions(spec: &FutureSpec, start: &StartDetails) -> Result<Vec<PlannedAction>> {
    let action = match (spec, start) {
        (
            FutureSpec::ContractDeployment { artifact, .. }
            | FutureSpec::ArtifactContractDeployment { artifact, .. },
            StartDetails::ContractDeployment {
                contract_name,
                constructor_args,
                libraries,
                value,
                from,
            }
            | StartDetails::ArtifactContractDeployment {
                contract_name,
                constructor_args,
                libraries,
                value,
                from,
            },
        ) => PlannedAction::DeployContract {
            contract_name: contract_name.clone(),
            bytecode: artifact.link(libraries)?,
            args: constructor_args.clone(),
            value: *value,
            from: from.clone(),
        },
        (
            FutureSpec::LibraryDeployment { artifact, .. },
            StartDetails::LibraryDeployment {
                contract_name,
                libraries,
                from,
            },
        ) => PlannedAction::DeployContract {
            contract_name: contract_name.clone(),
            bytecode: artifact.link(libraries)?,
            args: Vec::new(),
            value: Wei::ZERO,
            from: from.clone(),
        },
        (
            FutureSpec::ContractAt { .. },
            StartDetails::ContractAt {
                contract_name,
                contract_address,
            },
        ) => PlannedAction::BindContract {
            contract_name: contract_name.clone(),
            contract_address: contract_address.clone(),
        },
        (
            FutureSpec::ContractCall { .. },
            StartDetails::ContractCall {
                contract_address,
                function_name,
                args,
                value,
                from,
            },
        ) => PlannedAction::CallFunction {
            contract_address: contract_address.clone(),
            function_name: function_name.clone(),
            args: args.clone(),
            value: *value,
            from: from.clone(),
        },
        (
            FutureSpec::StaticCall { .. },
            StartDetails::StaticCall {
                contract_address,
                function_name,
                args,
                from,
            },
        ) => PlannedAction::StaticCall {
            contract_address: contract_address.clone(),
            function_name: function_name.clone(),
            args: args.clone(),
            from: from.clone(),
        },
        (
            FutureSpec::SendData { .. },
            StartDetails::SendData {
                to,
                value,
                data,
                from,
            },
        ) => PlannedAction::SendData {
            to: to.clone(),
            value: *value,
            data: data.clone(),
            from: from.clone(),
        },
        (
            FutureSpec::ReadEventArgument { .. },
            StartDetails::ReadEventArgument {
                event_name,
                argument_name,
                event_index,
                emitter,
                tx_to_read_from,
            },
        ) => PlannedAction::ReadEventArgument {
            event_name: event_name.clone(),
            argument_name: argument_name.clone(),
            event_index: *event_index,
            emitter: emitter.clone(),
            tx_to_read_from: tx_to_read_from.clone(),
        },
        _ => bail!("resolved parameters do not match the declared future kind"),
    };
    Ok(vec![action])
}
