use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::ModelManager;
use crate::storage::ObjectStore;
use crate::utils::ttl_cache::TtlCache;
use crate::web::UserRole;

/// What the auth middleware needs from a session row, cached by session id.
#[derive(Debug, Clone)]
pub struct CachedSession {
    pub user_id: Uuid,
    pub role: UserRole,
    pub expires_at: DateTime<Utc>,
}

impl CachedSession {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

pub type SessionCache = TtlCache<Uuid, CachedSession>;

#[derive(Debug, Clone)]
pub struct AppState {
    mm: ModelManager,
    store: Arc<dyn ObjectStore>,
    sessions: Arc<SessionCache>,
}

impl AppState {
    pub fn new(mm: ModelManager, store: Arc<dyn ObjectStore>, session_cache_ttl: Duration) -> Self {
        Self {
            mm,
            store,
            sessions: Arc::new(TtlCache::new(session_cache_ttl)),
        }
    }

    pub fn pool(&self) -> &ModelManager {
        &self.mm
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn sessions(&self) -> &Arc<SessionCache> {
        &self.sessions
    }

    /// Forces the next request of `user_id` to reload its role from the database.
    pub fn forget_user_sessions(&self, user_id: Uuid) -> usize {
        self.sessions.invalidate_where(|s| s.user_id == user_id)
    }
}
