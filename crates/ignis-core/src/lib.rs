//! Ignis Core
//!
//! Journaled execution engine for resumable deployments.
//!
//! This crate turns a validated future graph into network actions, records
//! every transition in an append-only journal, and rebuilds execution
//! state from that journal so interrupted runs continue instead of
//! repeating work.
//!
//! # Features
//!
//! - **Journaled execution**: Every transition is appended before it is
//!   acted on, so a crash loses at most the action in flight
//! - **Replay**: Folding the journal rebuilds per-future state exactly
//! - **Reconciliation**: Recorded state is compared field by field against
//!   the current module before anything runs
//! - **Bounded concurrency**: Independent futures run in parallel with
//!   per-account nonce serialization
//!
//! # Core Modules
//!
//! - [`journal`]: Append-only journal trait, file-backed and in-memory
//! - [`messages`]: The journal record schema
//! - [`state`]: Execution state store and the replay fold
//! - [`strategy`]: Resolves declared futures into planned actions
//! - [`engine`]: The concurrent, resumable executor
//! - [`reconcile`]: Drift detection between runs
//! - [`module`]: Module definition loading and validation
//! - [`deployment`]: Deployment directory, manifest and address book
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use ignis_core::deployment::DeploymentDir;
//! use ignis_core::engine::ExecutionEngine;
//! use ignis_core::journal::{FileJournal, Journal};
//! use ignis_core::module::load_module;
//! use ignis_core::reconcile::reconcile;
//! use ignis_core::state::ExecutionStateMap;
//!
//! let graph = load_module("module.json".as_ref())?;
//! let dir = DeploymentDir::open_or_create("deployments/local", &graph.module, "simulator")?;
//! let journal = Arc::new(FileJournal::new(dir.journal_path()));
//! let recovered = ExecutionStateMap::replay(&journal.read_all()?)?;
//!
//! let report = reconcile(&recovered, &graph, &accounts, &parameters)?;
//! if report.is_successful() {
//!     let engine = ExecutionEngine::new(adapter, journal, Default::default());
//!     let result = engine.execute(&graph, recovered, &parameters).await?;
//! }
//! ```

pub mod config;
pub mod deployment;
pub mod engine;
pub mod journal;
pub mod messages;
pub mod module;
pub mod nonce;
pub mod reconcile;
pub mod state;
pub mod strategy;

pub use config::ExecutionConfig;
pub use engine::{DeploymentResult, ExecutionEngine, FutureFailure};
pub use journal::{CorruptJournalError, FileJournal, Journal, MemoryJournal};
pub use messages::JournalMessage;
pub use reconcile::{reconcile, ReconciliationFailure, ReconciliationResult};
pub use state::{ExecutionState, ExecutionStateMap, ExecutionStatus};
