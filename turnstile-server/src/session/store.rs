//! Session store: one workflow slot and one event lock per user.
//!
//! The store enforces the concurrency contract: state reads/writes for a
//! single user are serialized by holding that user's lock for the duration
//! of one event. Cross-user events proceed independently. Conversation
//! state is process-local and deliberately not persisted across restarts.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::registry::UserId;

use super::state::Workflow;

/// Thread-safe per-user session store.
#[derive(Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<UserId, Workflow>>,
    /// Per-user event locks. Entries are created on first use and live for
    /// the process lifetime; the set of active users is small enough that
    /// reaping is not worth the complexity.
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The event lock for one user. Hold the guard for the whole of one
    /// event's handling; never across a broadcast fan-out.
    pub async fn user_lock(&self, user: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(user)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Current workflow for a user, if any. `None` means idle.
    pub async fn get(&self, user: UserId) -> Option<Workflow> {
        let slots = self.slots.read().await;
        slots.get(&user).cloned()
    }

    /// Enter a workflow state, discarding any previous workflow and its
    /// accumulated data.
    pub async fn enter(&self, user: UserId, workflow: Workflow) {
        let mut slots = self.slots.write().await;
        if let Some(previous) = slots.insert(user, workflow) {
            debug!("User {} abandoned workflow {}", user, previous.name());
        }
    }

    /// Return the user to idle, handing back whatever state was active.
    pub async fn finish(&self, user: UserId) -> Option<Workflow> {
        let mut slots = self.slots.write().await;
        slots.remove(&user)
    }
}
