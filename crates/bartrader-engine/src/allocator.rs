//! Process-wide identifier allocators shared by every worker.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bartrader_core::error::{BrokerError, TradingError, TradingResult};
use tracing::debug;

/// Pool of feed client-session ids, unique among live workers.
#[derive(Debug)]
pub struct ClientIdPool {
    in_use: Mutex<BTreeSet<u32>>,
    max_sessions: u32,
}

impl ClientIdPool {
    /// Pool handing out ids `1..=max_sessions`.
    pub fn new(max_sessions: u32) -> Self {
        Self {
            in_use: Mutex::new(BTreeSet::new()),
            max_sessions,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<u32>> {
        self.in_use.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve the lowest free id. The id returns to the pool when the
    /// lease is dropped.
    pub fn allocate(self: &Arc<Self>) -> TradingResult<ClientSession> {
        let mut in_use = self.lock();
        let id = (1..=self.max_sessions)
            .find(|id| !in_use.contains(id))
            .ok_or_else(|| {
                TradingError::Broker(BrokerError::Subscription(format!(
                    "all {} client sessions are in use",
                    self.max_sessions
                )))
            })?;
        in_use.insert(id);
        debug!(session_id = id, "client session allocated");
        Ok(ClientSession {
            id,
            pool: Arc::clone(self),
        })
    }

    /// Number of leases currently held.
    pub fn in_use(&self) -> usize {
        self.lock().len()
    }

    pub fn capacity(&self) -> u32 {
        self.max_sessions
    }

    fn release(&self, id: u32) {
        self.lock().remove(&id);
        debug!(session_id = id, "client session released");
    }
}

/// Lease on one client-session id.
pub struct ClientSession {
    id: u32,
    pool: Arc<ClientIdPool>,
}

impl ClientSession {
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession").field("id", &self.id).finish()
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.pool.release(self.id);
    }
}

/// Monotonic order-id counter.
#[derive(Debug)]
pub struct OrderIdAllocator {
    next: AtomicU64,
}

impl OrderIdAllocator {
    pub fn new(first_order_id: u64) -> Self {
        Self {
            next: AtomicU64::new(first_order_id),
        }
    }

    /// Take the next id.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for OrderIdAllocator {
    fn default() -> Self {
        Self::new(1)
    }
}
