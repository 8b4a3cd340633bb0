//! Chain adapters for the ignis workspace.
//!
//! The execution engine talks to a network exclusively through the
//! [`ChainAdapter`] trait defined here. This crate also bundles the
//! implementations shipped with the CLI:
//!
//! - [`sim::SimulatedChainAdapter`] - deterministic in-process chain used by
//!   `deploy --simulate` and most tests
//! - [`http::HttpChainAdapter`] - JSON-RPC client for development nodes with
//!   unlocked accounts
//! - [`mock::MockChainAdapter`] - scriptable responses for tests
//! - [`adapter::NoopChainAdapter`] - always errors; stands in before a
//!   backend is selected

pub mod adapter;
pub mod http;
pub mod mock;
pub mod sim;

pub use adapter::{
    ChainAdapter, ConfirmationOutcome, InteractionHandle, NoopChainAdapter, SubmitPayload,
    SubmitRequest,
};
pub use http::HttpChainAdapter;
pub use mock::MockChainAdapter;
pub use sim::SimulatedChainAdapter;
