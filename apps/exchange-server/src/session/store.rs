//! Session Store
//!
//! In-memory session storage keyed by the opaque session id:
//! - Load on request start, write back on request end
//! - Identifier rotation and forced adoption
//! - Automatic expiry cleanup

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use tokio::sync::RwLock;

use super::types::{is_valid_session_id, new_token, ExchangeSession};

// ============================================================================
// Session Store
// ============================================================================

/// Stores exchange sessions across independent requests
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    sessions: RwLock<HashMap<String, ExchangeSession>>,
    lifetime: Duration,
}

impl SessionStore {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                lifetime,
            }),
        }
    }

    // ========================================================================
    // Request Lifecycle
    // ========================================================================

    /// Open the session a request belongs to.
    ///
    /// A known, live id resumes its data. An unknown but well-formed id is
    /// kept with fresh data; anything else gets a new id.
    pub async fn start(&self, candidate: Option<&str>) -> SessionHandle {
        let candidate = candidate.filter(|id| is_valid_session_id(id));

        if let Some(id) = candidate {
            let sessions = self.inner.sessions.read().await;
            if let Some(data) = sessions.get(id).filter(|s| !s.is_expired()) {
                return SessionHandle::resume(id.to_string(), data.clone());
            }
        }

        let id = candidate.map(str::to_string).unwrap_or_else(new_token);
        tracing::debug!(session_id = %id, "Starting new exchange session");
        SessionHandle::fresh(id, ExchangeSession::new(self.inner.lifetime))
    }

    /// Persist the handle under its current id
    pub async fn save(&self, handle: SessionHandle) {
        let SessionHandle {
            id,
            mut data,
            loaded_as,
        } = handle;
        data.touch(self.inner.lifetime);

        let mut sessions = self.inner.sessions.write().await;
        if let Some(previous) = loaded_as.filter(|prev| *prev != id) {
            sessions.remove(&previous);
        }
        sessions.insert(id, data);
    }

    /// Get a copy of a stored session
    pub async fn get(&self, id: &str) -> Option<ExchangeSession> {
        let sessions = self.inner.sessions.read().await;
        sessions.get(id).cloned()
    }

    /// Remove a session
    pub async fn forget(&self, id: &str) -> Option<ExchangeSession> {
        let mut sessions = self.inner.sessions.write().await;
        let removed = sessions.remove(id);
        if removed.is_some() {
            tracing::info!(session_id = %id, "Exchange session closed");
        }
        removed
    }

    pub async fn session_count(&self) -> usize {
        let sessions = self.inner.sessions.read().await;
        sessions.len()
    }

    // ========================================================================
    // Cleanup
    // ========================================================================

    /// Clean up expired sessions
    ///
    /// Returns the number of sessions cleaned up
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.inner.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        let count = before - sessions.len();

        if count > 0 {
            tracing::info!(count = count, "Cleaned up expired exchange sessions");
        }

        count
    }

    /// Start background cleanup task
    pub fn start_cleanup_task(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(300)); // 5 minutes

            loop {
                interval.tick().await;
                self.cleanup_expired().await;
            }
        })
    }
}

// ============================================================================
// Session Handle
// ============================================================================

/// A session checked out for the duration of one request
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    data: ExchangeSession,
    /// Key the data was loaded from, if it came from the store
    loaded_as: Option<String>,
}

impl SessionHandle {
    fn resume(id: String, data: ExchangeSession) -> Self {
        Self {
            loaded_as: Some(id.clone()),
            id,
            data,
        }
    }

    fn fresh(id: String, data: ExchangeSession) -> Self {
        Self {
            id,
            data,
            loaded_as: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &ExchangeSession {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ExchangeSession {
        &mut self.data
    }

    /// Issue a new id for the same data
    pub fn regenerate_id(&mut self) {
        self.id = new_token();
    }

    /// Force the session to live under `id`, keeping the in-memory data
    pub fn adopt_id(&mut self, id: &str) {
        if is_valid_session_id(id) && self.id != id {
            tracing::debug!(from = %self.id, to = %id, "Re-binding session id");
            self.id = id.to_string();
        }
    }

    pub fn csrf_token(&self) -> &str {
        &self.data.csrf_token
    }
}

// ============================================================================
// Tests
// ============================================================================
