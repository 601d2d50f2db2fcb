//! Background worker pruning idle curation sessions.
//!
//! A pruned session that never finished also loses its output document; a
//! finished document is left in place for the user.

use std::io::ErrorKind;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::session::{SessionStore, SharedSession};
use crate::workflow::Phase;

/// Cleanup configuration.
pub struct CleanupConfig {
    /// Interval between cleanup runs.
    pub interval: Duration,
    /// Sessions unused for longer than this are dropped.
    pub max_idle: Duration,
}

impl CleanupConfig {
    /// Check every tenth of the idle limit, at least once a minute.
    #[must_use]
    pub fn for_idle(max_idle: Duration) -> Self {
        Self {
            interval: (max_idle / 10).clamp(Duration::from_secs(1), Duration::from_secs(60)),
            max_idle,
        }
    }
}

/// Delete the output document of an unfinished session. Returns whether a
/// file was removed.
async fn discard_unfinished(session: &SharedSession) -> bool {
    let session = session.lock().await;
    if session.phase() == Phase::Finished {
        return false;
    }
    let path = session.document().path();
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to remove abandoned document: {e}");
            false
        }
    }
}

async fn cleanup_once(store: &SessionStore, max_idle: Duration) {
    let pruned = store.prune_idle(max_idle);
    if pruned.is_empty() {
        return;
    }

    let mut removed_documents = 0;
    for session in &pruned {
        if discard_unfinished(session).await {
            removed_documents += 1;
        }
    }
    tracing::info!(
        pruned_sessions = pruned.len(),
        removed_documents,
        remaining = store.len(),
        "Cleaned up idle sessions"
    );
}

/// Run the cleanup worker until `shutdown` is cancelled.
pub async fn run_cleanup_worker(
    store: SessionStore,
    config: CleanupConfig,
    shutdown: CancellationToken,
) {
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        max_idle_secs = config.max_idle.as_secs(),
        "Starting session cleanup worker"
    );

    let mut interval = tokio::time::interval(config.interval);
    interval.tick().await; // The first tick completes immediately.

    loop {
        tokio::select! {
            _ = interval.tick() => {
                cleanup_once(&store, config.max_idle).await;
            }
            () = shutdown.cancelled() => {
                tracing::info!("Session cleanup worker shutting down");
                break;
            }
        }
    }
}
