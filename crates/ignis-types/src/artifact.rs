//! Contract artifacts and library placeholder linking.
//!
//! An artifact is whatever the compiler toolchain produced for one contract:
//! creation bytecode plus an optional ABI blob that adapters may use for
//! encoding. Bytecode may contain `{{LibraryName}}` placeholders that are
//! substituted with deployed library addresses before submission.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Compiler output for a single contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractArtifact {
    pub contract_name: String,
    /// Creation bytecode, `0x`-prefixed hex with optional `{{Name}}` link
    /// placeholders.
    pub bytecode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<serde_json::Value>,
}

impl ContractArtifact {
    pub fn new(contract_name: impl Into<String>, bytecode: impl Into<String>) -> Self {
        Self {
            contract_name: contract_name.into(),
            bytecode: bytecode.into(),
            abi: None,
        }
    }

    /// Names of all `{{...}}` link placeholders in the bytecode.
    pub fn placeholders(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        let mut rest = self.bytecode.as_str();
        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    names.insert(after[..end].to_string());
                    rest = &after[end + 2..];
                }
                None => break,
            }
        }
        names
    }

    /// Substitute every placeholder with its library's address (prefix
    /// stripped). Fails if a placeholder has no matching library entry.
    pub fn link(&self, libraries: &BTreeMap<String, Address>) -> Result<String> {
        let mut linked = self.bytecode.clone();
        for name in self.placeholders() {
            let address = match libraries.get(&name) {
                Some(address) => address,
                None => bail!(
                    "bytecode for {} references library \"{}\" but no address was provided",
                    self.contract_name,
                    name
                ),
            };
            let bare = address.as_str().trim_start_matches("0x");
            linked = linked.replace(&format!("{{{{{name}}}}}"), bare);
        }
        Ok(linked)
    }
}
