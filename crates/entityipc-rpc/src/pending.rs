use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::envelope::Reply;

/// What a waiting caller receives through its one-shot handoff.
#[derive(Debug)]
pub enum Delivery {
    /// The peer answered.
    Reply(Reply),
    /// The connection terminated first; carries the terminal reason.
    Closed(String),
}

/// Why a registration was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// Another pending call already owns the id.
    Occupied,
    /// The table was closed by connection teardown.
    Closed(String),
}

/// Correlation table mapping call ids to the one-shot sender of the caller
/// waiting on that id.
///
/// A single lock guards the map. It is held for map mutation only; callers
/// block on the `Receiver` returned by [`PendingCalls::register`], outside
/// the lock.
pub struct PendingCalls {
    inner: Mutex<Table>,
}

#[derive(Default)]
struct Table {
    calls: HashMap<u32, SyncSender<Delivery>>,
    closed: Option<String>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Table::default()),
        }
    }

    /// Register a pending call under `id`.
    ///
    /// Check and insert happen under one lock, so two callers can never both
    /// own the same id. An occupied id is refused, never overwritten.
    pub fn register(&self, id: u32) -> Result<Receiver<Delivery>, RegisterError> {
        let mut table = self.lock();
        if let Some(reason) = &table.closed {
            return Err(RegisterError::Closed(reason.clone()));
        }
        if table.calls.contains_key(&id) {
            return Err(RegisterError::Occupied);
        }
        let (tx, rx) = sync_channel(1);
        table.calls.insert(id, tx);
        Ok(rx)
    }

    /// Hand `reply` to the caller waiting on `id`.
    ///
    /// Returns `false` if no call is pending under `id` (already answered,
    /// timed out, or never issued).
    pub fn deliver(&self, id: u32, reply: Reply) -> bool {
        let Some(tx) = self.lock().calls.remove(&id) else {
            return false;
        };
        // Capacity 1 and a single send per entry: never blocks. A dropped
        // receiver means the caller gave up; the reply is discarded.
        let _ = tx.try_send(Delivery::Reply(reply));
        true
    }

    /// Forget the pending call under `id` without delivering anything.
    pub fn remove(&self, id: u32) -> bool {
        self.lock().calls.remove(&id).is_some()
    }

    /// Close the table: wake every pending caller with `reason` and refuse
    /// further registrations. Returns the number of callers woken.
    pub fn close(&self, reason: &str) -> usize {
        let drained: Vec<_> = {
            let mut table = self.lock();
            if table.closed.is_none() {
                table.closed = Some(reason.to_string());
            }
            table.calls.drain().collect()
        };

        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.try_send(Delivery::Closed(reason.to_string()));
        }
        count
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed.is_some()
    }

    /// The reason recorded by the first [`PendingCalls::close`].
    pub fn closed_reason(&self) -> Option<String> {
        self.lock().closed.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Map operations cannot leave the table half-updated, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Table> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PendingCalls {
    fn default() -> Self {
        Self::new()
    }
}
