//! Enumeration cursors
//!
//! `setpwent`/`getpwent_r`/`endpwent` (and the group and shadow equivalents)
//! walk the helper's records by index. The index lives here, not in the
//! helper: begin and end reset it, and a `next` call advances it only once a
//! record has been fully written to the caller.
//!
//! Each record kind has its own lock. The resolver holds it for the whole of a
//! `next` call, so two threads iterating the same kind never receive the same
//! index, at the cost of serializing their helper invocations.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::RecordKind;

/// Per-kind enumeration positions
#[derive(Debug, Default)]
pub struct EnumerationState {
    passwd: Mutex<u64>,
    group: Mutex<u64>,
    shadow: Mutex<u64>,
}

impl EnumerationState {
    pub const fn new() -> Self {
        Self {
            passwd: Mutex::new(0),
            group: Mutex::new(0),
            shadow: Mutex::new(0),
        }
    }

    fn slot(&self, kind: RecordKind) -> &Mutex<u64> {
        match kind {
            RecordKind::Passwd => &self.passwd,
            RecordKind::Group => &self.group,
            RecordKind::Shadow => &self.shadow,
        }
    }

    /// Exclusive access to the cursor of `kind`.
    ///
    /// A panic while the lock was held leaves a plain integer behind, so a
    /// poisoned lock is taken over rather than propagated.
    pub fn lock(&self, kind: RecordKind) -> MutexGuard<'_, u64> {
        self.slot(kind)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Next index `kind` will request
    pub fn position(&self, kind: RecordKind) -> u64 {
        *self.lock(kind)
    }

    pub fn reset(&self, kind: RecordKind) {
        *self.lock(kind) = 0;
    }
}
