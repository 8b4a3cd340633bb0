//! Deployment futures and the validated dependency graph.
//!
//! A future is one declared unit of deployment work. The closed set of kinds
//! is mirrored by [`FutureSpec`], a tagged enum whose variants carry the
//! kind-specific parameters, so dispatch over kinds is an exhaustive match.
//! [`FutureGraph`] holds futures in declaration order and validates the
//! structural invariants before anything reaches the engine: unique ids,
//! acyclicity, dependency completeness, and linkable bytecode.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::address::Wei;
use crate::argument::Argument;
use crate::artifact::ContractArtifact;

/// Closed set of future kinds the engine knows how to execute.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FutureKind {
    ContractDeployment,
    ArtifactContractDeployment,
    LibraryDeployment,
    ContractAt,
    ContractCall,
    StaticCall,
    SendData,
    ReadEventArgument,
}

impl FutureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FutureKind::ContractDeployment => "contract-deployment",
            FutureKind::ArtifactContractDeployment => "artifact-contract-deployment",
            FutureKind::LibraryDeployment => "library-deployment",
            FutureKind::ContractAt => "contract-at",
            FutureKind::ContractCall => "contract-call",
            FutureKind::StaticCall => "static-call",
            FutureKind::SendData => "send-data",
            FutureKind::ReadEventArgument => "read-event-argument",
        }
    }
}

impl fmt::Display for FutureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific parameters of a future.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FutureSpec {
    /// Deploy a contract whose artifact was looked up by name.
    ContractDeployment {
        contract_name: String,
        artifact: ContractArtifact,
        #[serde(default)]
        args: Vec<Argument>,
        #[serde(default)]
        value: Wei,
        #[serde(default)]
        libraries: BTreeMap<String, Argument>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Argument>,
    },
    /// Deploy a contract from an explicitly supplied artifact.
    ArtifactContractDeployment {
        contract_name: String,
        artifact: ContractArtifact,
        #[serde(default)]
        args: Vec<Argument>,
        #[serde(default)]
        value: Wei,
        #[serde(default)]
        libraries: BTreeMap<String, Argument>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Argument>,
    },
    /// Deploy a library (no constructor arguments, no value).
    LibraryDeployment {
        contract_name: String,
        artifact: ContractArtifact,
        #[serde(default)]
        libraries: BTreeMap<String, Argument>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Argument>,
    },
    /// Bind an already-deployed contract at a known or referenced address.
    ContractAt {
        contract_name: String,
        address: Argument,
    },
    /// State-changing function call on a deployed contract.
    ContractCall {
        contract: Argument,
        function_name: String,
        #[serde(default)]
        args: Vec<Argument>,
        #[serde(default)]
        value: Wei,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Argument>,
    },
    /// Read-only call whose result becomes the future's value.
    StaticCall {
        contract: Argument,
        function_name: String,
        #[serde(default)]
        args: Vec<Argument>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Argument>,
    },
    /// Plain value transfer, optionally carrying raw calldata.
    SendData {
        to: Argument,
        #[serde(default)]
        value: Wei,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<Argument>,
    },
    /// Extract one argument of an event emitted by a dependency's transaction.
    ReadEventArgument {
        event_name: String,
        argument_name: String,
        #[serde(default)]
        event_index: u64,
        emitter: Argument,
        /// Id of the future whose confirming transaction emitted the event.
        tx_source: String,
    },
}

impl FutureSpec {
    pub fn kind(&self) -> FutureKind {
        match self {
            FutureSpec::ContractDeployment { .. } => FutureKind::ContractDeployment,
            FutureSpec::ArtifactContractDeployment { .. } => FutureKind::ArtifactContractDeployment,
            FutureSpec::LibraryDeployment { .. } => FutureKind::LibraryDeployment,
            FutureSpec::ContractAt { .. } => FutureKind::ContractAt,
            FutureSpec::ContractCall { .. } => FutureKind::ContractCall,
            FutureSpec::StaticCall { .. } => FutureKind::StaticCall,
            FutureSpec::SendData { .. } => FutureKind::SendData,
            FutureSpec::ReadEventArgument { .. } => FutureKind::ReadEventArgument,
        }
    }

    /// Every future id referenced anywhere in this spec's parameters.
    pub fn referenced_futures(&self) -> BTreeSet<String> {
        let mut refs = BTreeSet::new();
        let mut walk = |arg: &Argument| arg.collect_future_refs(&mut refs);
        match self {
            FutureSpec::ContractDeployment {
                args,
                libraries,
                from,
                ..
            }
            | FutureSpec::ArtifactContractDeployment {
                args,
                libraries,
                from,
                ..
            } => {
                args.iter().for_each(&mut walk);
                libraries.values().for_each(&mut walk);
                from.iter().for_each(&mut walk);
            }
            FutureSpec::LibraryDeployment {
                libraries, from, ..
            } => {
                libraries.values().for_each(&mut walk);
                from.iter().for_each(&mut walk);
            }
            FutureSpec::ContractAt { address, .. } => walk(address),
            FutureSpec::ContractCall {
                contract,
                args,
                from,
                ..
            }
            | FutureSpec::StaticCall {
                contract,
                args,
                from,
                ..
            } => {
                walk(contract);
                args.iter().for_each(&mut walk);
                from.iter().for_each(&mut walk);
            }
            FutureSpec::SendData { to, from, .. } => {
                walk(to);
                from.iter().for_each(&mut walk);
            }
            FutureSpec::ReadEventArgument {
                emitter, tx_source, ..
            } => {
                walk(emitter);
                refs.insert(tx_source.clone());
            }
        }
        refs
    }
}

/// A node in the dependency graph: one declared unit of deployment work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Future {
    /// Stable id derived from the module namespace and declared name,
    /// e.g. `Module1:Token` or `Module1:Token#transfer`.
    pub id: String,
    pub module: String,
    /// Ids this future waits on, sorted and deduplicated.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(flatten)]
    pub spec: FutureSpec,
}

impl Future {
    pub fn kind(&self) -> FutureKind {
        self.spec.kind()
    }
}

/// Declaration-ordered dependency graph for one module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FutureGraph {
    pub module: String,
    pub futures: Vec<Future>,
}

impl FutureGraph {
    /// Build a graph and reject it unless all structural invariants hold.
    pub fn new(module: impl Into<String>, futures: Vec<Future>) -> Result<Self> {
        let graph = Self {
            module: module.into(),
            futures,
        };
        graph.validate()?;
        Ok(graph)
    }

    pub fn get(&self, id: &str) -> Option<&Future> {
        self.futures.iter().find(|f| f.id == id)
    }

    pub fn declaration_index(&self, id: &str) -> Option<usize> {
        self.futures.iter().position(|f| f.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.futures.iter().map(|f| f.id.as_str())
    }

    /// Check every structural invariant, collecting all violations before
    /// failing so the operator sees the full list at once.
    pub fn validate(&self) -> Result<()> {
        let mut issues: Vec<String> = Vec::new();

        if self.module.trim().is_empty() {
            issues.push("module name must not be empty".to_string());
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for future in &self.futures {
            if future.id.trim().is_empty() {
                issues.push("future with an empty id".to_string());
            }
            if !seen.insert(future.id.as_str()) {
                issues.push(format!("duplicate future id \"{}\"", future.id));
            }
        }

        let known: HashSet<&str> = self.futures.iter().map(|f| f.id.as_str()).collect();
        for future in &self.futures {
            for dep in &future.dependencies {
                if dep == &future.id {
                    issues.push(format!("future \"{}\" depends on itself", future.id));
                } else if !known.contains(dep.as_str()) {
                    issues.push(format!(
                        "future \"{}\" depends on unknown future \"{}\"",
                        future.id, dep
                    ));
                }
            }

            // Dependency completeness: parameter references must also be
            // declared dependencies.
            let listed: HashSet<&str> = future.dependencies.iter().map(String::as_str).collect();
            for referenced in future.spec.referenced_futures() {
                if !listed.contains(referenced.as_str()) {
                    issues.push(format!(
                        "future \"{}\" references \"{}\" in its parameters but does not list it as a dependency",
                        future.id, referenced
                    ));
                }
            }

            // Link placeholders must have a library entry.
            match &future.spec {
                FutureSpec::ContractDeployment {
                    artifact, libraries, ..
                }
                | FutureSpec::ArtifactContractDeployment {
                    artifact, libraries, ..
                }
                | FutureSpec::LibraryDeployment {
                    artifact, libraries, ..
                } => {
                    for placeholder in artifact.placeholders() {
                        if !libraries.contains_key(&placeholder) {
                            issues.push(format!(
                                "future \"{}\" bytecode placeholder {{{{{}}}}} has no library entry",
                                future.id, placeholder
                            ));
                        }
                    }
                }
                _ => {}
            }
        }

        if self.dependency_order().is_err() {
            issues.push(format!(
                "dependency cycle detected in module \"{}\"",
                self.module
            ));
        }

        if !issues.is_empty() {
            let listing = issues
                .iter()
                .enumerate()
                .map(|(i, issue)| format!("  {}. {}", i + 1, issue))
                .collect::<Vec<_>>()
                .join("\n");
            bail!(
                "module validation failed with {} issue(s):\n{}",
                issues.len(),
                listing
            );
        }
        Ok(())
    }

    /// Futures in an order where every dependency precedes its dependents,
    /// breaking ties by declaration order. Dependencies on ids outside the
    /// graph are ignored here (they are reported by `validate`). Fails on
    /// cycles.
    pub fn dependency_order(&self) -> Result<Vec<&Future>> {
        let known: HashSet<&str> = self.futures.iter().map(|f| f.id.as_str()).collect();
        let mut placed: HashSet<&str> = HashSet::new();
        let mut order: Vec<&Future> = Vec::with_capacity(self.futures.len());
        while order.len() < self.futures.len() {
            let mut progressed = false;
            for future in &self.futures {
                if placed.contains(future.id.as_str()) {
                    continue;
                }
                let ready = future
                    .dependencies
                    .iter()
                    .all(|dep| placed.contains(dep.as_str()) || !known.contains(dep.as_str()));
                if ready {
                    placed.insert(future.id.as_str());
                    order.push(future);
                    progressed = true;
                }
            }
            if !progressed {
                bail!("dependency cycle detected in module \"{}\"", self.module);
            }
        }
        Ok(order)
    }
}
