//! Module definition loading.
//!
//! A module is declared as a JSON file: a namespace plus a list of future
//! declarations. Each declaration carries the kind-specific parameters and
//! optionally a `name` and an `after` list. Ids are `<module>:<name>`,
//! with names derived from the declaration when none is given explicitly.
//! Dependencies are inferred from reference arguments, merged with
//! `after`, and the finished graph passes the full structural validation
//! before anything else sees it.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use ignis_types::{Argument, Future, FutureGraph, FutureSpec};

/// One declared future as written in the module file.
#[derive(Debug, Clone, Deserialize)]
pub struct FutureDecl {
    /// Overrides the derived name. Always wins when present.
    #[serde(default)]
    pub name: Option<String>,
    /// Ordering dependencies beyond the ones referenced in the parameters.
    #[serde(default)]
    pub after: Vec<String>,
    #[serde(flatten)]
    pub spec: FutureSpec,
}

impl FutureDecl {
    fn into_future(self, module: &str) -> Result<Future> {
        let name = match self.name {
            Some(name) => {
                if name.trim().is_empty() {
                    bail!("explicit name must not be empty");
                }
                if name.contains(':') {
                    bail!("explicit name \"{name}\" must not contain \":\"");
                }
                name
            }
            None => derived_name(&self.spec, module)?,
        };

        let mut dependencies: BTreeSet<String> = self.spec.referenced_futures();
        dependencies.extend(self.after);

        Ok(Future {
            id: format!("{module}:{name}"),
            module: module.to_string(),
            dependencies: dependencies.into_iter().collect(),
            spec: self.spec,
        })
    }
}

/// Parsed module file, not yet validated.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleFile {
    pub module: String,
    #[serde(default)]
    pub futures: Vec<FutureDecl>,
}

impl ModuleFile {
    /// Derive names and dependencies and build the validated graph.
    pub fn into_graph(self) -> Result<FutureGraph> {
        let module = self.module;
        let mut futures = Vec::with_capacity(self.futures.len());
        for (index, decl) in self.futures.into_iter().enumerate() {
            let future = decl
                .into_future(&module)
                .with_context(|| format!("future at position {}", index + 1))?;
            futures.push(future);
        }
        FutureGraph::new(module, futures)
    }
}

/// Load and validate a module definition file.
pub fn load_module(path: &Path) -> Result<FutureGraph> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read module file {}", path.display()))?;
    let file: ModuleFile = serde_json::from_str(&text)
        .with_context(|| format!("parse module file {}", path.display()))?;
    file.into_graph()
}

/// Load a deployment parameters file, a flat JSON object of named values.
pub fn load_parameters(path: &Path) -> Result<BTreeMap<String, Value>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read parameters file {}", path.display()))?;
    let parameters = serde_json::from_str(&text)
        .with_context(|| format!("parse parameters file {}", path.display()))?;
    Ok(parameters)
}

fn derived_name(spec: &FutureSpec, module: &str) -> Result<String> {
    match spec {
        FutureSpec::ContractDeployment { contract_name, .. }
        | FutureSpec::ArtifactContractDeployment { contract_name, .. }
        | FutureSpec::LibraryDeployment { contract_name, .. }
        | FutureSpec::ContractAt { contract_name, .. } => Ok(contract_name.clone()),
        FutureSpec::ContractCall {
            contract,
            function_name,
            ..
        }
        | FutureSpec::StaticCall {
            contract,
            function_name,
            ..
        } => match contract {
            Argument::Future(reference) => Ok(format!(
                "{}#{}",
                local_name(&reference.future, module),
                function_name
            )),
            _ => bail!(
                "a call on a contract given by address needs an explicit name (function \"{function_name}\")"
            ),
        },
        FutureSpec::SendData { .. } => bail!("send-data futures need an explicit name"),
        FutureSpec::ReadEventArgument {
            event_name,
            argument_name,
            event_index,
            emitter,
            tx_source,
        } => {
            let source = match emitter {
                Argument::Future(reference) => reference.future.as_str(),
                _ => tx_source.as_str(),
            };
            Ok(format!(
                "{}#{}#{}#{}",
                local_name(source, module),
                event_name,
                argument_name,
                event_index
            ))
        }
    }
}

/// Part of a future id after this module's prefix, or the id unchanged
/// when it belongs to another module.
fn local_name<'a>(future_id: &'a str, module: &str) -> &'a str {
    future_id
        .strip_prefix(module)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(future_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> ModuleFile {
        serde_json::from_value(value).unwrap()
    }

    fn token_deploy() -> Value {
        json!({
            "kind": "contract-deployment",
            "contract_name": "Token",
            "artifact": { "contract_name": "Token", "bytecode": "0x6080" },
            "args": [1000]
        })
    }

    #[test]
    fn test_derives_ids_and_dependencies() {
        let file = parse(json!({
            "module": "Module1",
            "futures": [
                token_deploy(),
                {
                    "kind": "contract-call",
                    "contract": { "future": "Module1:Token" },
                    "function_name": "transfer",
                    "args": [{ "future": "Module1:Token" }, 5]
                }
            ]
        }));

        let graph = file.into_graph().unwrap();
        let ids: Vec<_> = graph.ids().collect();
        assert_eq!(ids, vec!["Module1:Token", "Module1:Token#transfer"]);
        assert_eq!(
            graph.get("Module1:Token#transfer").unwrap().dependencies,
            vec!["Module1:Token".to_string()]
        );
    }

    #[test]
    fn test_explicit_name_wins() {
        let file = parse(json!({
            "module": "Module1",
            "futures": [
                token_deploy(),
                {
                    "name": "fund-the-pool",
                    "kind": "send-data",
                    "to": { "future": "Module1:Token" },
                    "value": "500"
                }
            ]
        }));

        let graph = file.into_graph().unwrap();
        assert!(graph.get("Module1:fund-the-pool").is_some());
    }

    #[test]
    fn test_send_data_requires_explicit_name() {
        let file = parse(json!({
            "module": "Module1",
            "futures": [
                {
                    "kind": "send-data",
                    "to": "0x1f98431c8ad98523631ae4a59f267346ea31f984",
                    "value": "1"
                }
            ]
        }));

        let err = file.into_graph().unwrap_err().to_string();
        assert!(err.contains("future at position 1"));
        assert!(err.contains("explicit name"));
    }

    #[test]
    fn test_call_on_literal_address_requires_explicit_name() {
        let file = parse(json!({
            "module": "Module1",
            "futures": [
                {
                    "kind": "contract-call",
                    "contract": "0x1f98431c8ad98523631ae4a59f267346ea31f984",
                    "function_name": "configure"
                }
            ]
        }));

        let err = file.into_graph().unwrap_err().to_string();
        assert!(err.contains("explicit name"));
        assert!(err.contains("configure"));
    }

    #[test]
    fn test_event_read_name_comes_from_the_emitter() {
        let file = parse(json!({
            "module": "Module1",
            "futures": [
                {
                    "kind": "contract-deployment",
                    "contract_name": "Factory",
                    "artifact": { "contract_name": "Factory", "bytecode": "0x6080" }
                },
                {
                    "kind": "contract-call",
                    "contract": { "future": "Module1:Factory" },
                    "function_name": "create"
                },
                {
                    "kind": "read-event-argument",
                    "event_name": "PoolCreated",
                    "argument_name": "pool",
                    "emitter": { "future": "Module1:Factory" },
                    "tx_source": "Module1:Factory#create"
                }
            ]
        }));

        let graph = file.into_graph().unwrap();
        let read = graph.get("Module1:Factory#PoolCreated#pool#0").unwrap();
        assert_eq!(
            read.dependencies,
            vec![
                "Module1:Factory".to_string(),
                "Module1:Factory#create".to_string()
            ]
        );
    }

    #[test]
    fn test_after_extends_inferred_dependencies() {
        let file = parse(json!({
            "module": "Module1",
            "futures": [
                token_deploy(),
                {
                    "name": "Registry",
                    "kind": "contract-deployment",
                    "contract_name": "Registry",
                    "artifact": { "contract_name": "Registry", "bytecode": "0x6080" },
                    "after": ["Module1:Token"]
                }
            ]
        }));

        let graph = file.into_graph().unwrap();
        assert_eq!(
            graph.get("Module1:Registry").unwrap().dependencies,
            vec!["Module1:Token".to_string()]
        );
    }

    #[test]
    fn test_unknown_reference_is_caught_by_validation() {
        let file = parse(json!({
            "module": "Module1",
            "futures": [
                {
                    "kind": "contract-call",
                    "contract": { "future": "Module1:Ghost" },
                    "function_name": "configure"
                }
            ]
        }));

        let err = file.into_graph().unwrap_err().to_string();
        assert!(err.contains("unknown future \"Module1:Ghost\""));
    }

    #[test]
    fn test_unknown_kind_is_rejected_at_parse_time() {
        let result = serde_json::from_value::<ModuleFile>(json!({
            "module": "Module1",
            "futures": [{ "kind": "teleport", "contract_name": "X" }]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_loads_module_and_parameters_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let module_path = dir.path().join("module.json");
        let params_path = dir.path().join("params.json");
        fs::write(
            &module_path,
            serde_json::to_string_pretty(&json!({
                "module": "Module1",
                "futures": [token_deploy()]
            }))
            .unwrap(),
        )
        .unwrap();
        fs::write(&params_path, r#"{ "supply": 1000, "owner": "0xba12222222228d8ba445958a75a0704d566bf2c8" }"#).unwrap();

        let graph = load_module(&module_path).unwrap();
        assert_eq!(graph.module, "Module1");
        assert_eq!(graph.futures.len(), 1);

        let parameters = load_parameters(&params_path).unwrap();
        assert_eq!(parameters.get("supply"), Some(&Value::from(1000)));
    }

    #[test]
    fn test_missing_module_file_reports_the_path() {
        let err = load_module(Path::new("/nonexistent/module.json"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("/nonexistent/module.json"));
    }
}
