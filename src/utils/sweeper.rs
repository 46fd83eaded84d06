//! Periodic removal of expired sessions, both the rows and their cached copies.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::log_error;
use crate::model::{ModelManager, entity::Session};
use crate::web::state::{CachedSession, SessionCache};

#[tracing::instrument(skip_all)]
pub async fn run_session_sweeper(
    mm: ModelManager,
    cache: Arc<SessionCache>,
    every: Duration,
    token: CancellationToken,
) {
    let mut interval = tokio::time::interval(every);
    // first tick completes immediately

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::debug!("session sweeper stopped");
                break;
            }
            _ = interval.tick() => sweep_once(&mm, &cache).await,
        }
    }
}

/// One pass: stale cache entries and expired session rows go away.
pub async fn sweep_once(mm: &ModelManager, cache: &SessionCache) {
    let purged = cache.purge_expired() + cache.invalidate_where(CachedSession::is_expired);
    match Session::cleanup_expired(mm).await {
        Ok(0) if purged == 0 => {}
        Ok(removed) => {
            tracing::info!("expired sessions removed: {removed}, cache entries purged: {purged}")
        }
        Err(e) => log_error(&e),
    }
}
