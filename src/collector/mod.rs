//! Incremental collection of favorited entries from the remote listing.
//!
//! The [`Collector`] owns a FIFO buffer of parsed entries and the page counter
//! of the listing. Consumers pull entries with [`Collector::pop_front`]; every
//! pop runs [`Collector::refill_if_low`], which fetches the next page as soon
//! as one entry or fewer remain buffered. An empty page ends the listing.

mod parser;
mod source;

use std::collections::VecDeque;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

pub use parser::{parse_listing, ParseRules};
pub use source::{HttpListingSource, ListingSource, SourceError};

use crate::config::Config;
use crate::entry::Entry;

/// Buffer length at or below which a pop triggers the next page fetch.
pub const LOW_WATER_MARK: usize = 1;

/// A listing page could not be fetched. Buffer and page counter are unchanged.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no subject bound to the collector")]
    NoSubject,
    #[error("timed out fetching page {page}")]
    Timeout { page: u32 },
    #[error("page {page} returned HTTP {status}")]
    Status { page: u32, status: u16 },
    #[error("failed to fetch page {page}: {source}")]
    Transport {
        page: u32,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub(crate) fn from_reqwest(page: u32, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout { page }
        } else {
            Self::Transport {
                page,
                source: error,
            }
        }
    }
}

/// `peek_front`/`pop_front` on an empty buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no buffered entries")]
pub struct EmptyBufferError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectError {
    #[error("subject cannot be empty")]
    Empty,
    #[error("collector is already bound to subject '{current}'")]
    AlreadyBound { current: String },
}

/// Result of the most recent page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was fetched and this many entries were appended.
    Fetched(usize),
    /// The fetch failed; nothing changed.
    Failed,
}

/// Lazily extended queue of entries from one subject's favorites listing.
pub struct Collector {
    source: Arc<dyn ListingSource>,
    rules: ParseRules,
    entries: VecDeque<Entry>,
    next_page: u32,
    subject: Option<String>,
    end_reached: bool,
    last_fetch: Option<FetchOutcome>,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("subject", &self.subject)
            .field("buffered", &self.entries.len())
            .field("next_page", &self.next_page)
            .field("end_reached", &self.end_reached)
            .field("last_fetch", &self.last_fetch)
            .finish_non_exhaustive()
    }
}

impl Collector {
    #[must_use]
    pub fn new(source: Arc<dyn ListingSource>, rules: ParseRules) -> Self {
        Self {
            source,
            rules,
            entries: VecDeque::new(),
            next_page: 1,
            subject: None,
            end_reached: false,
            last_fetch: None,
        }
    }

    /// Collector over the HTTP listing described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP source cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let source = HttpListingSource::new(config)?;
        Ok(Self::new(
            Arc::new(source),
            ParseRules::new(&config.site_origin, &config.media_host_prefix),
        ))
    }

    /// Bind the account whose favorites are paginated. Passed through verbatim.
    ///
    /// Binding the identical subject again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if `subject` is empty or a different subject is bound.
    pub fn set_subject(&mut self, subject: &str) -> Result<(), SubjectError> {
        if subject.is_empty() {
            return Err(SubjectError::Empty);
        }
        match &self.subject {
            Some(current) if current == subject => Ok(()),
            Some(current) => Err(SubjectError::AlreadyBound {
                current: current.clone(),
            }),
            None => {
                self.subject = Some(subject.to_string());
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Fetch page `next_page` and append its entries to the buffer.
    ///
    /// Returns the number of entries appended. Once an empty page has been
    /// seen the listing is over and this returns `Ok(0)` without a request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if no subject is bound or the request fails. The
    /// buffer and page counter are left untouched, so the same page can be
    /// retried.
    pub async fn fetch_next_page(&mut self) -> Result<usize, FetchError> {
        let subject = self.subject.clone().ok_or(FetchError::NoSubject)?;

        if self.end_reached {
            debug!(subject = %subject, "Listing already ended, not fetching");
            return Ok(0);
        }

        let page = self.next_page;
        let body = match self.source.fetch_page(&subject, page).await {
            Ok(body) => body,
            Err(e) => {
                self.last_fetch = Some(FetchOutcome::Failed);
                return Err(e);
            }
        };

        let parsed = parse_listing(&body, &self.rules);
        let count = parsed.len();
        self.entries.extend(parsed);
        self.next_page += 1;
        self.last_fetch = Some(FetchOutcome::Fetched(count));

        if count == 0 {
            self.end_reached = true;
            info!(subject = %subject, page, "Empty listing page, no more entries");
        } else {
            debug!(
                subject = %subject,
                page,
                count,
                buffered = self.entries.len(),
                "Fetched listing page"
            );
        }

        Ok(count)
    }

    /// Lookahead prefetch: fetch the next page if at most
    /// [`LOW_WATER_MARK`] entries remain and the listing has not ended.
    ///
    /// Returns `None` when no fetch was needed.
    pub async fn refill_if_low(&mut self) -> Option<Result<usize, FetchError>> {
        if self.entries.len() > LOW_WATER_MARK || self.end_reached {
            return None;
        }
        Some(self.fetch_next_page().await)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of the head entry.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyBufferError`] if nothing is buffered.
    pub fn peek_front(&self) -> Result<Entry, EmptyBufferError> {
        self.entries.front().cloned().ok_or(EmptyBufferError)
    }

    /// Remove and return the head entry, then run [`Self::refill_if_low`].
    ///
    /// A failed lookahead fetch is logged and recorded in
    /// [`Self::last_fetch`]; the popped entry is still returned.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyBufferError`] if nothing is buffered.
    pub async fn pop_front(&mut self) -> Result<Entry, EmptyBufferError> {
        let entry = self.entries.pop_front().ok_or(EmptyBufferError)?;

        if let Some(Err(e)) = self.refill_if_low().await {
            warn!(next_page = self.next_page, "Lookahead fetch failed: {e}");
        }

        Ok(entry)
    }

    /// Page number the next fetch will request.
    #[must_use]
    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    /// Buffer is empty and the listing has ended.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.entries.is_empty() && self.end_reached
    }

    /// An empty page has been fetched.
    #[must_use]
    pub fn end_reached(&self) -> bool {
        self.end_reached
    }

    #[must_use]
    pub fn last_fetch(&self) -> Option<FetchOutcome> {
        self.last_fetch
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{page, Reply, ScriptedSource};
    use super::*;

    fn collector(source: &Arc<ScriptedSource>) -> Collector {
        Collector::new(
            source.clone(),
            ParseRules::new("https://forum.example.com", "https://media.example.com/i/"),
        )
    }

    #[test]
    fn test_set_subject() {
        let source = Arc::new(ScriptedSource::default());
        let mut c = collector(&source);

        assert_eq!(c.set_subject(""), Err(SubjectError::Empty));
        assert!(c.set_subject("alice").is_ok());
        assert!(c.set_subject("alice").is_ok());
        assert_eq!(
            c.set_subject("bob"),
            Err(SubjectError::AlreadyBound {
                current: "alice".to_string()
            })
        );
        assert_eq!(c.subject(), Some("alice"));
    }

    #[tokio::test]
    async fn test_fetch_without_subject() {
        let source = Arc::new(ScriptedSource::default());
        let mut c = collector(&source);

        assert!(matches!(
            c.fetch_next_page().await,
            Err(FetchError::NoSubject)
        ));
        assert!(source.requested_pages().is_empty());
        assert_eq!(c.next_page(), 1);
    }

    #[tokio::test]
    async fn test_fetch_appends_in_order_and_advances_page() {
        let source = Arc::new(ScriptedSource::new(vec![
            page(&["a", "b"]),
            page(&["c"]),
        ]));
        let mut c = collector(&source);
        c.set_subject("alice").unwrap();

        assert_eq!(c.fetch_next_page().await.unwrap(), 2);
        assert_eq!(c.next_page(), 2);
        assert_eq!(c.fetch_next_page().await.unwrap(), 1);
        assert_eq!(c.next_page(), 3);
        assert_eq!(c.len(), 3);
        assert_eq!(c.peek_front().unwrap().title, "a");
        assert_eq!(c.last_fetch(), Some(FetchOutcome::Fetched(1)));

        let requests = source.requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![("alice".to_string(), 1), ("alice".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_unchanged() {
        let source = Arc::new(ScriptedSource::new(vec![
            page(&["a"]),
            Reply::Fail,
            page(&["b"]),
        ]));
        let mut c = collector(&source);
        c.set_subject("alice").unwrap();

        c.fetch_next_page().await.unwrap();
        let err = c.fetch_next_page().await.unwrap_err();
        assert!(matches!(err, FetchError::Status { page: 2, status: 503 }));
        assert_eq!(c.next_page(), 2);
        assert_eq!(c.len(), 1);
        assert_eq!(c.last_fetch(), Some(FetchOutcome::Failed));
        assert!(!c.is_exhausted());

        // Retrying requests the same page again.
        assert_eq!(c.fetch_next_page().await.unwrap(), 1);
        assert_eq!(c.next_page(), 3);
        assert_eq!(source.requested_pages(), vec![1, 2, 2]);
    }

    #[tokio::test]
    async fn test_empty_buffer_errors() {
        let source = Arc::new(ScriptedSource::default());
        let mut c = collector(&source);

        assert_eq!(c.peek_front(), Err(EmptyBufferError));
        assert_eq!(c.pop_front().await, Err(EmptyBufferError));
        assert!(c.is_empty());
    }

    #[tokio::test]
    async fn test_pop_triggers_lookahead_at_low_water_mark() {
        let source = Arc::new(ScriptedSource::new(vec![
            page(&["a", "b", "c"]),
            page(&["d", "e"]),
        ]));
        let mut c = collector(&source);
        c.set_subject("alice").unwrap();
        c.fetch_next_page().await.unwrap();

        // Two remain: no fetch.
        assert_eq!(c.pop_front().await.unwrap().title, "a");
        assert_eq!(source.requested_pages(), vec![1]);

        // One remains: page 2 is fetched before returning.
        assert_eq!(c.pop_front().await.unwrap().title, "b");
        assert_eq!(source.requested_pages(), vec![1, 2]);
        assert_eq!(c.len(), 3);
        assert_eq!(c.next_page(), 3);
    }

    #[tokio::test]
    async fn test_buffer_refilled_after_every_pop() {
        let source = Arc::new(ScriptedSource::new(vec![
            page(&["a", "b"]),
            page(&["c"]),
            page(&["d", "e", "f"]),
            page(&[]),
        ]));
        let mut c = collector(&source);
        c.set_subject("alice").unwrap();
        c.fetch_next_page().await.unwrap();

        let mut titles = Vec::new();
        while let Ok(entry) = c.pop_front().await {
            titles.push(entry.title);
            assert!(c.len() >= 1 || c.last_fetch() == Some(FetchOutcome::Fetched(0)));
        }

        assert_eq!(titles, vec!["a", "b", "c", "d", "e", "f"]);
        assert!(c.is_exhausted());
    }

    #[tokio::test]
    async fn test_end_of_listing_stops_fetching() {
        let source = Arc::new(ScriptedSource::new(vec![page(&["a"]), page(&[])]));
        let mut c = collector(&source);
        c.set_subject("alice").unwrap();
        c.fetch_next_page().await.unwrap();

        c.pop_front().await.unwrap();
        assert!(c.end_reached());
        assert!(c.is_exhausted());
        assert_eq!(c.next_page(), 3);

        assert_eq!(c.fetch_next_page().await.unwrap(), 0);
        assert!(c.refill_if_low().await.is_none());
        assert_eq!(c.next_page(), 3);
        assert_eq!(source.requested_pages(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_failed_lookahead_still_returns_entry() {
        let source = Arc::new(ScriptedSource::new(vec![page(&["a", "b"]), Reply::Fail]));
        let mut c = collector(&source);
        c.set_subject("alice").unwrap();
        c.fetch_next_page().await.unwrap();

        assert_eq!(c.pop_front().await.unwrap().title, "a");
        assert_eq!(c.last_fetch(), Some(FetchOutcome::Failed));
        assert_eq!(c.next_page(), 2);
        assert_eq!(c.len(), 1);
    }
}
