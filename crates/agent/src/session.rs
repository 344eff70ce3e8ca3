use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use ordercopilot_core::catalog::MatchCandidate;
use ordercopilot_core::domain::intent::ParsedIntent;
use ordercopilot_core::domain::order::Order;
use ordercopilot_core::flows::ConversationState;

/// A product the buyer picked from a list, waiting for a quantity.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingSelection {
    pub candidate: MatchCandidate,
    pub quantity: Option<u32>,
}

/// Per-buyer conversation state. Only the engine mutates it, and only while holding the
/// session's lock.
#[derive(Clone, Debug)]
pub struct Session {
    pub session_key: String,
    pub state: ConversationState,
    pub parsed_intent: Option<ParsedIntent>,
    pub matched_candidates: Vec<MatchCandidate>,
    pub draft_order: Option<Order>,
    pub pending_selection: Option<PendingSelection>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    pub fn new(session_key: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_key: session_key.into(),
            state: ConversationState::Idle,
            parsed_intent: None,
            matched_candidates: Vec::new(),
            draft_order: None,
            pending_selection: None,
            created_at: now,
            last_activity_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    /// Drops the draft and everything derived from the last inquiry.
    pub fn clear_draft(&mut self) {
        self.parsed_intent = None;
        self.matched_candidates.clear();
        self.draft_order = None;
        self.pending_selection = None;
    }

    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_activity_at < cutoff
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

/// Keyed session storage. Holding a handle's lock serializes one session's turns;
/// different keys never contend on it.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the session for `session_key`, creating an idle one on first contact.
    async fn acquire(&self, session_key: &str) -> SessionHandle;

    async fn get(&self, session_key: &str) -> Option<SessionHandle>;

    /// Forgets the session; the next `acquire` starts from `Idle`.
    async fn reset(&self, session_key: &str) -> bool;

    /// Removes sessions whose last activity is older than `idle_for`. A session whose
    /// handle is held outside the store, locked or not, is in use and is kept.
    async fn evict_idle(&self, idle_for: Duration) -> usize;

    async fn len(&self) -> usize;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn acquire(&self, session_key: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(session_key) {
            return Arc::clone(handle);
        }

        let mut sessions = self.sessions.write().await;
        let handle = sessions.entry(session_key.to_string()).or_insert_with(|| {
            debug!(event_name = "session.created", session_key, "session created");
            Arc::new(Mutex::new(Session::new(session_key, Utc::now())))
        });
        Arc::clone(handle)
    }

    async fn get(&self, session_key: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_key).cloned()
    }

    async fn reset(&self, session_key: &str) -> bool {
        self.sessions.write().await.remove(session_key).is_some()
    }

    async fn evict_idle(&self, idle_for: Duration) -> usize {
        let Ok(idle_for) = chrono::Duration::from_std(idle_for) else {
            return 0;
        };
        let cutoff = Utc::now() - idle_for;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| {
            if Arc::strong_count(handle) > 1 {
                return true;
            }
            match handle.try_lock() {
                Ok(session) => !session.is_idle_since(cutoff),
                Err(_) => true,
            }
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(event_name = "session.evicted", evicted, "idle sessions evicted");
        }
        evicted
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use ordercopilot_core::flows::ConversationState;

    use super::{InMemorySessionStore, SessionStore};

    #[tokio::test]
    async fn acquire_creates_once_and_returns_the_same_handle() {
        let store = InMemorySessionStore::new();
        let first = store.acquire("+6591234567").await;
        let second = store.acquire("+6591234567").await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.lock().await.state, ConversationState::Idle);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn reset_forgets_state() {
        let store = InMemorySessionStore::new();
        store.acquire("buyer").await.lock().await.state = ConversationState::AwaitingQuantity;

        assert!(store.reset("buyer").await);
        assert!(!store.reset("buyer").await);
        assert!(store.get("buyer").await.is_none());
        assert_eq!(store.acquire("buyer").await.lock().await.state, ConversationState::Idle);
    }

    #[tokio::test]
    async fn evict_idle_skips_recent_and_locked_sessions() {
        let store = InMemorySessionStore::new();
        let stale_at = Utc::now() - chrono::Duration::hours(2);

        store.acquire("stale").await.lock().await.touch(stale_at);
        store.acquire("fresh").await;
        let busy = store.acquire("busy").await;
        busy.lock().await.touch(stale_at);
        let _guard = busy.lock().await;

        let evicted = store.evict_idle(Duration::from_secs(3600)).await;

        assert_eq!(evicted, 1);
        assert!(store.get("stale").await.is_none());
        assert!(store.get("fresh").await.is_some());
        assert!(store.get("busy").await.is_some());
    }

    #[tokio::test]
    async fn evict_idle_keeps_sessions_acquired_but_not_yet_locked() {
        let store = InMemorySessionStore::new();
        let stale_at = Utc::now() - chrono::Duration::hours(2);

        let waiting = store.acquire("waiting").await;
        waiting.lock().await.touch(stale_at);

        assert_eq!(store.evict_idle(Duration::from_secs(3600)).await, 0);
        let stored = store.get("waiting").await.expect("held session stays in the store");
        assert!(Arc::ptr_eq(&stored, &waiting));
        drop(stored);

        drop(waiting);
        assert_eq!(store.evict_idle(Duration::from_secs(3600)).await, 1);
        assert!(store.get("waiting").await.is_none());
    }
}
