//! Per-history write sections
//!
//! All writes to one history identity (prepare followed by register or
//! save) are serialized. Distinct identities never contend.
//!
//! Each identity gets a gate in a `DashMap`. Entries are created on first
//! use and are never removed implicitly; `remove` drops the entry of an
//! identity that will not be written again.

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use archivist_core::{ArchivistError, ArchivistResult, HistoryId};

#[derive(Debug, Default)]
struct Gate {
    held: Mutex<bool>,
    released: Condvar,
}

/// Table of per-history write sections
#[derive(Debug)]
pub struct HistoryLocks {
    gates: DashMap<HistoryId, Arc<Gate>>,
    timeout: Duration,
}

impl HistoryLocks {
    /// Create a table whose acquisitions give up after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            gates: DashMap::new(),
            timeout,
        }
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Enter the write section of a history
    ///
    /// Blocks until the section is free or the timeout elapses. The
    /// section is left when the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// `ArchivistError::LockTimeout` if the section stayed busy.
    pub fn acquire(&self, history_id: &HistoryId) -> ArchivistResult<HistoryGuard> {
        // clone the Arc so the map shard is not held while waiting
        let gate = Arc::clone(
            self.gates
                .entry(*history_id)
                .or_insert_with(|| Arc::new(Gate::default()))
                .value(),
        );
        let deadline = Instant::now() + self.timeout;
        {
            let mut held = gate.held.lock();
            while *held {
                if gate.released.wait_until(&mut held, deadline).timed_out() && *held {
                    let timeout_ms = self.timeout.as_millis() as u64;
                    warn!(
                        target: "archivist::save",
                        history_id = %history_id,
                        timeout_ms,
                        "Write lock timed out"
                    );
                    return Err(ArchivistError::LockTimeout {
                        history_id: *history_id,
                        timeout_ms,
                    });
                }
            }
            *held = true;
        }
        Ok(HistoryGuard {
            history_id: *history_id,
            gate,
        })
    }

    /// Drop the gate of a history
    ///
    /// A guard that is still alive keeps its gate; later acquisitions
    /// start from a fresh one.
    pub fn remove(&self, history_id: &HistoryId) {
        self.gates.remove(history_id);
    }

    /// Number of identities with a gate
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Check if no gate exists
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

/// Held write section of one history
#[derive(Debug)]
pub struct HistoryGuard {
    history_id: HistoryId,
    gate: Arc<Gate>,
}

impl HistoryGuard {
    /// History this guard protects
    pub fn history_id(&self) -> HistoryId {
        self.history_id
    }
}

impl Drop for HistoryGuard {
    fn drop(&mut self) {
        *self.gate.held.lock() = false;
        self.gate.released.notify_one();
    }
}
