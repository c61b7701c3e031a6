//! The action log: a LIFO stack of reversible file operations.
//!
//! Lives for one session. The dispatcher pushes a record after every
//! successful destructive file operation; undo pops the most recent one.

use codewright_core::action::ActionRecord;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared between the dispatcher and the undo tool. Never held across `.await`.
pub type SharedActionLog = Arc<Mutex<ActionLog>>;

#[derive(Debug, Default)]
pub struct ActionLog {
    records: Vec<ActionRecord>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedActionLog {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn push(&mut self, record: ActionRecord) {
        self.records.push(record);
    }

    pub fn pop(&mut self) -> Option<ActionRecord> {
        self.records.pop()
    }

    pub fn last(&self) -> Option<&ActionRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ActionRecord> {
        self.records.iter()
    }
}

/// Lock the shared log, recovering from a poisoned mutex.
pub fn lock(log: &SharedActionLog) -> MutexGuard<'_, ActionLog> {
    log.lock().unwrap_or_else(PoisonError::into_inner)
}
