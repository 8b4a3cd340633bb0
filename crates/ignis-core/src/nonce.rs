//! Per-account nonce accounting.
//!
//! Nonces must be handed out in the order transactions actually reach the
//! node, so each account owns an async lock that callers hold from nonce
//! assignment until the node has accepted (or rejected) the submission.
//! The counter advances only on acceptance; a rejected submission releases
//! its nonce for the next caller.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use ignis_chain::ChainAdapter;
use ignis_types::Address;

#[derive(Default)]
struct AccountNonce {
    /// Next unused nonce. Lazily seeded from the network on first use.
    next: Option<u64>,
}

/// Hands out monotonically increasing nonces per sending account.
#[derive(Default)]
pub struct NonceManager {
    accounts: parking_lot::Mutex<HashMap<Address, Arc<AsyncMutex<AccountNonce>>>>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `account` and reserve its next nonce.
    ///
    /// The returned reservation keeps the account locked; no other future
    /// can be assigned a nonce for it until the reservation is committed
    /// or dropped.
    pub async fn acquire(
        &self,
        account: &Address,
        adapter: &dyn ChainAdapter,
    ) -> Result<NonceReservation> {
        let cell = {
            let mut accounts = self.accounts.lock();
            accounts
                .entry(account.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(AccountNonce::default())))
                .clone()
        };
        let mut guard = cell.lock_owned().await;
        let nonce = match guard.next {
            Some(nonce) => nonce,
            None => {
                let nonce = adapter
                    .current_nonce(account)
                    .await
                    .with_context(|| format!("fetch the current nonce of {account}"))?;
                guard.next = Some(nonce);
                nonce
            }
        };
        Ok(NonceReservation { guard, nonce })
    }
}

/// An assigned nonce plus the account lock backing it.
///
/// Dropping without [`commit`](Self::commit) returns the nonce to the pool,
/// which is correct exactly when the submission never reached the node.
pub struct NonceReservation {
    guard: OwnedMutexGuard<AccountNonce>,
    nonce: u64,
}

impl NonceReservation {
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Mark the nonce consumed. Call once the node accepted the submission.
    pub fn commit(mut self) {
        self.guard.next = Some(self.nonce + 1);
    }
}
