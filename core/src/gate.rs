//! Process-wide admission gate.
//!
//! One semaphore caps the number of network operations in flight and one task
//! tracker records every spawned task, so the driver can block until the whole
//! work tree (including tasks spawned by tasks) has drained.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::error::ConfigError;

pub const DEFAULT_SLOTS: usize = 150;
pub const MIN_SLOTS: usize = 5;

#[derive(Default)]
struct Counters {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[derive(Clone)]
pub struct AdmissionGate {
    sem: Arc<Semaphore>,
    tracker: TaskTracker,
    counters: Arc<Counters>,
    limit: usize,
}

/// A held slot. Dropping it (normally or while unwinding) frees the slot.
pub struct Slot {
    _permit: OwnedSemaphorePermit,
    counters: Arc<Counters>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AdmissionGate {
    pub fn new(limit: usize) -> Result<Self, ConfigError> {
        if limit < MIN_SLOTS {
            return Err(ConfigError::TooFewConnections { min: MIN_SLOTS, got: limit });
        }
        Ok(AdmissionGate {
            sem: Arc::new(Semaphore::new(limit)),
            tracker: TaskTracker::new(),
            counters: Arc::new(Counters::default()),
            limit,
        })
    }

    /// Wait for a free slot. Only fails if the semaphore was closed, which
    /// this type never does.
    pub async fn acquire(&self) -> Result<Slot, AcquireError> {
        let permit = self.sem.clone().acquire_owned().await?;
        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(now, Ordering::SeqCst);
        Ok(Slot { _permit: permit, counters: self.counters.clone() })
    }

    /// Spawn a tracked task that does not need a slot (e.g. waiting on a subprocess).
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(fut)
    }

    /// Spawn a tracked task that holds a slot for its whole lifetime.
    pub fn spawn_gated<F>(&self, fut: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let gate = self.clone();
        self.tracker.spawn(async move {
            let _slot = gate.acquire().await.ok()?;
            Some(fut.await)
        })
    }

    /// Stop treating the seed phase as open and wait for every tracked task.
    /// Tasks spawned by tracked tasks after this call are still waited for.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of slots ever held at the same time.
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Number of tracked tasks still running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }
}
