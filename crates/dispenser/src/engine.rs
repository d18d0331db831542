//! Draw engine: per-pool locking, policy dispatch, cursor rotation
//!
//! The engine owns two tables keyed by pool identity: the draw locks that
//! serialize every load-mutate-persist cycle per pool, and the round-robin
//! cursors. Each table sits behind one coarse mutex, so two first-time
//! callers for the same new pool can never race two distinct locks into
//! existence. Cursors are process-scoped: a restart resets rotation order
//! but never pool contents.

use std::collections::HashMap;
use std::sync::Arc;

use common::Record;
use pool_store::{PoolKey, PoolRef};
use rand::seq::IndexedRandom;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::policy::Policy;

/// Account-distribution engine.
///
/// One instance per process, shared by every caller, so that all draws
/// against the same pool serialize through the same lock.
#[derive(Debug, Default)]
pub struct Engine {
    locks: Mutex<HashMap<PoolKey, Arc<Mutex<()>>>>,
    cursors: Mutex<HashMap<PoolKey, usize>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw one record from the pool under the given policy.
    ///
    /// Returns `Ok(None)` when the pool is empty, which is a normal outcome
    /// and not an error. The pool's lock is held across the whole load-mutate-persist
    /// cycle, so concurrent draws against one pool are strictly serialized
    /// while draws against different pools proceed independently.
    pub async fn draw(&self, pool: &PoolRef, policy: Policy) -> Result<Option<Record>> {
        let key = pool.key();
        let lock = self.pool_lock(&key).await;
        let _guard = lock.lock().await;

        let records = pool.load().await;
        if records.is_empty() {
            debug!(pool = ?key, policy = policy.label(), "pool empty, nothing to draw");
            return Ok(None);
        }

        match policy {
            Policy::Consume => draw_consume(pool, &key, records).await,
            Policy::RandomRepeat => Ok(records.choose(&mut rand::rng()).cloned()),
            Policy::RoundRobin => Ok(Some(self.draw_round_robin(key, &records).await)),
        }
    }

    /// Lookup-or-create the pool's draw lock.
    async fn pool_lock(&self, key: &PoolKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key.clone()).or_default().clone()
    }

    /// Select at the cursor, then advance it modulo the current length so a
    /// shrunken pool can never leave the cursor out of range.
    async fn draw_round_robin(&self, key: PoolKey, records: &[Record]) -> Record {
        let mut cursors = self.cursors.lock().await;
        let cursor = cursors.entry(key).or_insert(0);
        let idx = *cursor % records.len();
        let chosen = records[idx].clone();
        *cursor = (idx + 1) % records.len();
        chosen
    }
}

/// Random pick, then remove that single occurrence and persist before the
/// record is reported as delivered.
async fn draw_consume(
    pool: &PoolRef,
    key: &PoolKey,
    mut records: Vec<Record>,
) -> Result<Option<Record>> {
    let Some(chosen) = records.choose(&mut rand::rng()).cloned() else {
        return Ok(None);
    };

    // Remove the first occurrence only; a pool holding duplicate values
    // loses one copy per draw. A value already gone counts as consumed.
    if let Some(pos) = records.iter().position(|r| *r == chosen) {
        records.remove(pos);
    }
    let remaining = records.len();
    pool.replace(records).await?;

    info!(pool = ?key, remaining, "record consumed");
    Ok(Some(chosen))
}
