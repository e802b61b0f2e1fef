//! In-memory session map keyed by the session cookie

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::SessionState;

type SessionMap = HashMap<Uuid, SessionState>;

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<SessionMap>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of a live session, creating one if `id` is absent or unknown
    ///
    /// The boolean is true when a new session was created.
    pub async fn ensure(&self, id: Option<Uuid>) -> (Uuid, bool) {
        let mut sessions = self.sessions.write().await;
        if let Some(id) = id {
            if let Some(state) = sessions.get_mut(&id) {
                state.touch();
                return (id, false);
            }
        }
        let id = Uuid::new_v4();
        sessions.insert(id, SessionState::new());
        tracing::debug!(session_id = %id, "Created session");
        (id, true)
    }

    /// Shared access for lookups that change nothing
    pub async fn read(&self) -> RwLockReadGuard<'_, SessionMap> {
        self.sessions.read().await
    }

    /// Exclusive access to the map; hold it only across in-memory work
    pub async fn write(&self) -> RwLockWriteGuard<'_, SessionMap> {
        self.sessions.write().await
    }

    pub async fn remove(&self, id: &Uuid) -> Option<SessionState> {
        self.sessions.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove and return sessions idle for at least `max_idle`
    pub async fn drain_idle(&self, max_idle: Duration) -> Vec<SessionState> {
        let mut sessions = self.sessions.write().await;
        let idle: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, state)| state.idle_for() >= max_idle)
            .map(|(id, _)| *id)
            .collect();
        idle.iter().filter_map(|id| sessions.remove(id)).collect()
    }

    /// Remove and return every session
    pub async fn drain_all(&self) -> Vec<SessionState> {
        self.sessions.write().await.drain().map(|(_, state)| state).collect()
    }
}
