//! Application state: the immutable quest definition, the progress store,
//! and the per-user turn locks.
//!
//! The quest is built once at startup and handed in here; nothing reads
//! configuration from a global afterwards.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument};

use crate::quest::Quest;
use crate::store::QuestStore;

type TurnLocks = Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>;

#[derive(Clone)]
pub struct AppState {
    pub quest: Arc<Quest>,
    pub store: Arc<dyn QuestStore>,
    turn_locks: TurnLocks,
}

/// Held for the duration of one user's turn. Dropping it releases the turn and
/// removes the user's lock entry once nobody else holds or awaits it.
pub struct TurnGuard {
    user_id: String,
    locks: TurnLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Clones are only taken under this map lock, so the count is stable here.
        if locks.get(&self.user_id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&self.user_id);
        }
    }
}

impl AppState {
    #[instrument(level = "info", skip_all)]
    pub fn new(quest: Quest, store: Arc<dyn QuestStore>) -> Self {
        info!(
            target: "quest_backend",
            title = %quest.title(),
            checkpoints = quest.len(),
            start = %quest.start(),
            finish = %quest.finish(),
            "Quest ready"
        );
        Self {
            quest: Arc::new(quest),
            store,
            turn_locks: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// Serialize turns for one user across load -> decide -> save.
    /// Different users never wait on each other here.
    pub async fn lock_user(&self, user_id: &str) -> TurnGuard {
        let lock = {
            let mut locks = self.turn_locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        TurnGuard {
            user_id: user_id.to_string(),
            locks: self.turn_locks.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    pub fn pending_turn_locks(&self) -> usize {
        self.turn_locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
