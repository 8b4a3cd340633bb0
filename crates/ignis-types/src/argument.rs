//! Declared argument values and their resolution.
//!
//! Arguments form a recursive tree: scalars, nested lists and objects, and
//! three reference leaves that are substituted once the referenced inputs are
//! available (a dependency's result, an adapter account, a deployment
//! parameter). Resolution is a pure tree transform that produces plain JSON.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::address::Address;

/// Reference to another future's result, e.g. `{ "future": "Module1:Token" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FutureRef {
    pub future: String,
}

/// Reference to the n-th adapter account, e.g. `{ "account": 1 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountRef {
    pub account: usize,
}

/// Reference to a named deployment parameter with an optional default,
/// e.g. `{ "parameter": "supply", "default": 1000 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterRef {
    pub parameter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// One declared argument: a scalar, a nested collection, or a reference leaf.
///
/// Serde tries the variants in declaration order, so the reference shapes
/// must stay ahead of the generic collection and scalar fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Future(FutureRef),
    Account(AccountRef),
    Parameter(ParameterRef),
    List(Vec<Argument>),
    Object(BTreeMap<String, Argument>),
    Scalar(Value),
}

impl Argument {
    pub fn future(id: impl Into<String>) -> Self {
        Argument::Future(FutureRef { future: id.into() })
    }

    pub fn account(index: usize) -> Self {
        Argument::Account(AccountRef { account: index })
    }

    pub fn parameter(name: impl Into<String>, default: Option<Value>) -> Self {
        Argument::Parameter(ParameterRef {
            parameter: name.into(),
            default,
        })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Argument::Scalar(Value::String(value.into()))
    }

    pub fn number(value: u64) -> Self {
        Argument::Scalar(Value::from(value))
    }

    /// Collect every future id referenced anywhere in this tree.
    pub fn collect_future_refs(&self, out: &mut BTreeSet<String>) {
        match self {
            Argument::Future(r) => {
                out.insert(r.future.clone());
            }
            Argument::List(items) => {
                for item in items {
                    item.collect_future_refs(out);
                }
            }
            Argument::Object(map) => {
                for item in map.values() {
                    item.collect_future_refs(out);
                }
            }
            Argument::Account(_) | Argument::Parameter(_) | Argument::Scalar(_) => {}
        }
    }

    /// Substitute every reference leaf, producing a plain JSON value.
    pub fn resolve(&self, ctx: &ResolutionContext<'_>) -> Result<Value> {
        match self {
            Argument::Future(r) => ctx
                .results
                .get(&r.future)
                .cloned()
                .with_context(|| format!("future \"{}\" has no recorded result to reference", r.future)),
            Argument::Account(r) => {
                let address = ctx.accounts.get(r.account).with_context(|| {
                    format!(
                        "account index {} is out of range ({} available)",
                        r.account,
                        ctx.accounts.len()
                    )
                })?;
                Ok(Value::String(address.to_string()))
            }
            Argument::Parameter(r) => ctx
                .parameters
                .get(&r.parameter)
                .cloned()
                .or_else(|| r.default.clone())
                .with_context(|| {
                    format!(
                        "deployment parameter \"{}\" was not provided and has no default",
                        r.parameter
                    )
                }),
            Argument::List(items) => items
                .iter()
                .map(|item| item.resolve(ctx))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Argument::Object(map) => {
                let mut out = serde_json::Map::new();
                for (key, value) in map {
                    out.insert(key.clone(), value.resolve(ctx)?);
                }
                Ok(Value::Object(out))
            }
            Argument::Scalar(value) => Ok(value.clone()),
        }
    }
}

/// Lookup tables used to turn declared arguments into concrete values.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    /// Future id to recorded result (address, value, or transaction hash).
    pub results: &'a BTreeMap<String, Value>,
    /// Adapter accounts, index-addressable.
    pub accounts: &'a [Address],
    /// Deployment parameters by name.
    pub parameters: &'a BTreeMap<String, Value>,
}

/// Interpret a resolved value as an address.
pub fn expect_address(value: &Value) -> Result<Address> {
    match value {
        Value::String(s) => Address::new(s),
        other => bail!("expected an address string, got {other}"),
    }
}
