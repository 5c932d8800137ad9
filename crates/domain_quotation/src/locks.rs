//! Per-quotation mutation locks
//!
//! Every mutating operation on a quotation holds its lock from load to
//! persist, so two replacements of the same company quote set can never
//! interleave. Reads take no lock.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::QuotationId;

use crate::error::QuotationError;

/// What a second caller does when the quotation is already locked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LockPolicy {
    /// Reject immediately with `Conflict`
    #[default]
    FailFast,
    /// Wait up to `timeout_ms`, then reject with `Conflict`
    Wait { timeout_ms: u64 },
}

type LockRegistry = DashMap<QuotationId, Arc<Mutex<()>>>;

/// Held lock on one quotation
///
/// Dropping the guard releases the lock and removes the registry entry
/// when no other caller is waiting on it.
#[derive(Debug)]
pub struct QuotationLockGuard {
    quotation_id: QuotationId,
    guard: Option<OwnedMutexGuard<()>>,
    registry: Arc<LockRegistry>,
}

impl QuotationLockGuard {
    pub fn quotation_id(&self) -> QuotationId {
        self.quotation_id
    }
}

impl Drop for QuotationLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        forget_idle(&self.registry, self.quotation_id);
    }
}

fn forget_idle(registry: &LockRegistry, quotation_id: QuotationId) {
    registry.remove_if(&quotation_id, |_, mutex| Arc::strong_count(mutex) == 1);
}

/// Registry of per-quotation async mutexes
///
/// Holds an entry only while some caller holds or waits for the lock.
#[derive(Debug, Default)]
pub struct QuotationLocks {
    locks: Arc<LockRegistry>,
    policy: LockPolicy,
}

impl QuotationLocks {
    pub fn new(policy: LockPolicy) -> Self {
        Self {
            locks: Arc::new(DashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// Acquires the lock for a quotation according to the policy
    ///
    /// # Errors
    ///
    /// `Conflict` when the lock is held and the policy gives up
    pub async fn acquire(&self, quotation_id: QuotationId) -> Result<QuotationLockGuard, QuotationError> {
        let mutex = Arc::clone(
            &self
                .locks
                .entry(quotation_id)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );

        let guard = match self.policy {
            LockPolicy::FailFast => mutex.try_lock_owned().map_err(|_| {
                tracing::debug!(quotation_id = %quotation_id, "quotation lock busy");
                QuotationError::conflict(format!(
                    "quotation {} is being modified by another request",
                    quotation_id
                ))
            })?,
            LockPolicy::Wait { timeout_ms } => {
                tokio::time::timeout(Duration::from_millis(timeout_ms), mutex.lock_owned())
                    .await
                    .map_err(|_| {
                        tracing::debug!(quotation_id = %quotation_id, timeout_ms, "quotation lock wait timed out");
                        QuotationError::conflict(format!(
                            "quotation {} stayed locked for more than {}ms",
                            quotation_id, timeout_ms
                        ))
                    })?
            }
        };

        Ok(QuotationLockGuard {
            quotation_id,
            guard: Some(guard),
            registry: Arc::clone(&self.locks),
        })
    }

    /// Drops the registry entry of a quotation nobody holds
    pub fn forget(&self, quotation_id: QuotationId) {
        forget_idle(&self.locks, quotation_id);
    }

    /// Number of quotations with a registry entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fail_fast_conflicts_while_held() {
        let locks = QuotationLocks::new(LockPolicy::FailFast);
        let id = QuotationId::new();

        let guard = locks.acquire(id).await.unwrap();
        assert!(matches!(locks.acquire(id).await, Err(QuotationError::Conflict(_))));

        drop(guard);
        assert!(locks.acquire(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_locks_are_per_quotation() {
        let locks = QuotationLocks::new(LockPolicy::FailFast);
        let _a = locks.acquire(QuotationId::new()).await.unwrap();
        assert!(locks.acquire(QuotationId::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_policy_serializes() {
        let locks = Arc::new(QuotationLocks::new(LockPolicy::Wait { timeout_ms: 1_000 }));
        let id = QuotationId::new();

        let guard = locks.acquire(id).await.unwrap();
        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.acquire(id).await.map(|g| g.quotation_id()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);

        assert_eq!(waiter.await.unwrap().unwrap(), id);
    }

    #[tokio::test]
    async fn test_wait_policy_times_out() {
        let locks = QuotationLocks::new(LockPolicy::Wait { timeout_ms: 10 });
        let id = QuotationId::new();
        let _guard = locks.acquire(id).await.unwrap();
        assert!(matches!(locks.acquire(id).await, Err(QuotationError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_forget_keeps_held_entries() {
        let locks = QuotationLocks::new(LockPolicy::FailFast);
        let id = QuotationId::new();

        let guard = locks.acquire(id).await.unwrap();
        locks.forget(id);
        assert_eq!(locks.len(), 1);

        drop(guard);
        locks.forget(id);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_released_lock_leaves_no_entry() {
        let locks = QuotationLocks::new(LockPolicy::FailFast);
        for _ in 0..100 {
            let guard = locks.acquire(QuotationId::new()).await.unwrap();
            drop(guard);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_while_a_waiter_queues() {
        let locks = Arc::new(QuotationLocks::new(LockPolicy::Wait { timeout_ms: 1_000 }));
        let id = QuotationId::new();

        let first = locks.acquire(id).await.unwrap();
        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let guard = locks.acquire(id).await.unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
                drop(guard);
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(locks.len(), 1);
        drop(first);

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[test]
    fn test_policy_from_config() {
        let policy: LockPolicy = serde_json::from_str(r#"{"mode": "wait", "timeout_ms": 250}"#).unwrap();
        assert_eq!(policy, LockPolicy::Wait { timeout_ms: 250 });
        let policy: LockPolicy = serde_json::from_str(r#"{"mode": "fail_fast"}"#).unwrap();
        assert_eq!(policy, LockPolicy::FailFast);
    }
}
