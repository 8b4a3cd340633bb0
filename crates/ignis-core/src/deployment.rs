//! Deployment directory layout.
//!
//! Each deployment owns one directory: the journal, a manifest carrying
//! identity and timestamps, and the addresses of every successful deploy
//! or bind future, rewritten after each run.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use ignis_types::Address;

const JOURNAL_FILE: &str = "journal.jsonl";
const MANIFEST_FILE: &str = "manifest.json";
const ADDRESSES_FILE: &str = "deployed_addresses.json";

/// Identity and bookkeeping of one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentManifest {
    pub deployment_id: String,
    pub module: String,
    /// Name of the network backend the deployment was created against.
    pub network: String,
    pub created_at: DateTime<Utc>,
    pub last_run_at: DateTime<Utc>,
}

/// Handle on the directory recording one deployment.
#[derive(Debug, Clone)]
pub struct DeploymentDir {
    root: PathBuf,
}

impl DeploymentDir {
    /// Open an existing deployment directory or create a fresh one.
    ///
    /// An existing manifest must agree on the module name; running a
    /// different module against another module's recorded state is always
    /// a mistake. The network name is recorded for the operator but not
    /// enforced, since development nodes rarely expose a stable identity.
    pub fn open_or_create(
        root: impl Into<PathBuf>,
        module: &str,
        network: &str,
    ) -> Result<DeploymentDir> {
        let dir = DeploymentDir { root: root.into() };
        fs::create_dir_all(&dir.root)
            .with_context(|| format!("create deployment directory {}", dir.root.display()))?;

        match dir.read_manifest()? {
            Some(mut manifest) => {
                if manifest.module != module {
                    bail!(
                        "deployment directory {} belongs to module \"{}\", not \"{}\"",
                        dir.root.display(),
                        manifest.module,
                        module
                    );
                }
                manifest.last_run_at = Utc::now();
                dir.write_manifest(&manifest)?;
            }
            None => {
                let now = Utc::now();
                let manifest = DeploymentManifest {
                    deployment_id: format!("deploy-{}", Uuid::new_v4()),
                    module: module.to_string(),
                    network: network.to_string(),
                    created_at: now,
                    last_run_at: now,
                };
                debug!(
                    deployment_id = %manifest.deployment_id,
                    path = %dir.root.display(),
                    "creating deployment directory"
                );
                dir.write_manifest(&manifest)?;
            }
        }
        Ok(dir)
    }

    /// Open without creating anything, for read-only commands.
    pub fn open_existing(root: impl Into<PathBuf>) -> Result<DeploymentDir> {
        let dir = DeploymentDir { root: root.into() };
        if dir.read_manifest()?.is_none() && !dir.journal_path().exists() {
            bail!("no deployment found at {}", dir.root.display());
        }
        Ok(dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn journal_path(&self) -> PathBuf {
        self.root.join(JOURNAL_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn addresses_path(&self) -> PathBuf {
        self.root.join(ADDRESSES_FILE)
    }

    pub fn read_manifest(&self) -> Result<Option<DeploymentManifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("read deployment manifest {}", path.display()))?;
        let manifest = serde_json::from_str(&text)
            .with_context(|| format!("parse deployment manifest {}", path.display()))?;
        Ok(Some(manifest))
    }

    fn write_manifest(&self, manifest: &DeploymentManifest) -> Result<()> {
        let path = self.manifest_path();
        let body = serde_json::to_string_pretty(manifest)?;
        fs::write(&path, body)
            .with_context(|| format!("write deployment manifest {}", path.display()))
    }

    /// Rewrite `deployed_addresses.json` with the addresses of the latest
    /// run, including the ones reused from earlier runs.
    pub fn write_addresses(&self, addresses: &BTreeMap<String, Address>) -> Result<()> {
        let path = self.addresses_path();
        let body = serde_json::to_string_pretty(addresses)?;
        fs::write(&path, body)
            .with_context(|| format!("write deployed addresses {}", path.display()))
    }

    pub fn read_addresses(&self) -> Result<BTreeMap<String, Address>> {
        let path = self.addresses_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("read deployed addresses {}", path.display()))?;
        let addresses = serde_json::from_str(&text)
            .with_context(|| format!("parse deployed addresses {}", path.display()))?;
        Ok(addresses)
    }
}
