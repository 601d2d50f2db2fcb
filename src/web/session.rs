//! Per-visitor curation sessions keyed by a cookie token.
//!
//! Each token owns its own [`CurationSession`], so collectors and documents
//! are never shared between visitors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tokio::sync::Mutex as AsyncMutex;

use crate::constants::SESSION_COOKIE;
use crate::workflow::CurationSession;

pub type SharedSession = Arc<AsyncMutex<CurationSession>>;

/// Generate a cryptographically secure random session token.
pub fn generate_session_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Session token from the request's `Cookie` header.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{SESSION_COOKIE}=");
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| cookie.trim().strip_prefix(prefix.as_str()))
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
}

/// `Set-Cookie` value binding the browser to `token`.
#[must_use]
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/")
}

struct Slot {
    session: SharedSession,
    last_seen: Instant,
}

/// In-memory map from session token to curation session.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Slot>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `session` under a fresh token and return the token.
    pub fn insert(&self, session: CurationSession) -> String {
        let token = generate_session_token();
        self.slots().insert(
            token.clone(),
            Slot {
                session: Arc::new(AsyncMutex::new(session)),
                last_seen: Instant::now(),
            },
        );
        token
    }

    /// Look up a session and mark it as recently used.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<SharedSession> {
        let mut slots = self.slots();
        let slot = slots.get_mut(token)?;
        slot.last_seen = Instant::now();
        Some(slot.session.clone())
    }

    /// Session for the request's cookie, if it names a live session.
    #[must_use]
    pub fn by_cookie(&self, headers: &HeaderMap) -> Option<SharedSession> {
        session_token(headers).and_then(|token| self.get(&token))
    }

    /// Drop sessions unused for longer than `max_idle` and return them.
    pub fn prune_idle(&self, max_idle: Duration) -> Vec<SharedSession> {
        let mut slots = self.slots();
        let idle: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.last_seen.elapsed() > max_idle)
            .map(|(token, _)| token.clone())
            .collect();
        idle.iter()
            .filter_map(|token| slots.remove(token))
            .map(|slot| slot.session)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
