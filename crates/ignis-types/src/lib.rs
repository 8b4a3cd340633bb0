//! Shared types for the ignis workspace.
//!
//! This crate provides the foundational vocabulary used across the workspace,
//! keeping the heavier crates (engine, adapters, CLI) free of circular
//! dependencies:
//!
//! - [`address`] - validated address, transaction hash, and wei-amount newtypes
//! - [`argument`] - the recursive declared-argument tree and its resolution
//! - [`future`] - deployment futures, their kinds, and the validated graph
//! - [`artifact`] - contract artifacts and library placeholder linking
//! - [`env_utils`] - environment variable parsing helpers

pub mod address;
pub mod argument;
pub mod artifact;
pub mod env_utils;
pub mod future;

pub use address::{Address, TxHash, Wei};
pub use argument::{expect_address, Argument, ResolutionContext};
pub use artifact::ContractArtifact;
pub use future::{Future, FutureGraph, FutureKind, FutureSpec};
