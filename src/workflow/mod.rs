//! Curation workflow driving a human through the collected entries.
//!
//! A [`CurationSession`] owns one [`Collector`] and one [`ArchiveDocument`]
//! and moves through [`Phase::AwaitingSubject`], [`Phase::Reviewing`] and
//! [`Phase::Finished`]. While reviewing, the head of the collector's buffer is
//! the focus and is either kept, discarded, or the session is finished.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::collector::{Collector, FetchError, SubjectError};
use crate::document::{ArchiveDocument, DocumentError};
use crate::entry::Entry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingSubject,
    Reviewing,
    Finished,
}

/// What the driver should present next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Focus {
    /// An entry awaits a decision.
    Entry(Entry),
    /// The listing has ended and every entry has been decided.
    Exhausted,
    /// Nothing is buffered because the last fetch failed; a retry may recover.
    Stalled,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("cannot {action} while {phase:?}")]
    InvalidState { action: &'static str, phase: Phase },
    #[error("no entry in focus")]
    NoFocus,
    #[error("session is not finished")]
    NotFinished,
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// One user's curation session.
#[derive(Debug)]
pub struct CurationSession {
    collector: Collector,
    document: ArchiveDocument,
    phase: Phase,
}

impl CurationSession {
    #[must_use]
    pub fn new(collector: Collector, document: ArchiveDocument) -> Self {
        Self {
            collector,
            document,
            phase: Phase::AwaitingSubject,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.collector.subject()
    }

    #[must_use]
    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    #[must_use]
    pub fn document(&self) -> &ArchiveDocument {
        &self.document
    }

    fn require(&self, phase: Phase, action: &'static str) -> Result<(), WorkflowError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(WorkflowError::InvalidState {
                action,
                phase: self.phase,
            })
        }
    }

    /// Bind `subject`, fetch its first page and start reviewing.
    ///
    /// Returns the number of entries on the first page. If the fetch fails
    /// the document is untouched and the session stays awaiting a subject;
    /// calling `begin` again with the same subject retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the subject is rejected or the first fetch fails.
    pub async fn begin(&mut self, subject: &str) -> Result<usize, WorkflowError> {
        self.require(Phase::AwaitingSubject, "begin")?;
        self.collector.set_subject(subject)?;
        let fetched = self.collector.fetch_next_page().await?;
        self.document.add_header(subject)?;
        self.phase = Phase::Reviewing;

        info!(subject = %subject, fetched, "Curation session started");
        Ok(fetched)
    }

    /// The current focus.
    ///
    /// # Errors
    ///
    /// Returns an error unless reviewing.
    pub fn focus(&self) -> Result<Focus, WorkflowError> {
        self.require(Phase::Reviewing, "read focus")?;
        Ok(match self.collector.peek_front() {
            Ok(entry) => Focus::Entry(entry),
            Err(_) if self.collector.is_exhausted() => Focus::Exhausted,
            Err(_) => Focus::Stalled,
        })
    }

    /// Append the focused entry to the document, save it, and advance.
    ///
    /// If the save fails the entry is taken back out of the document and
    /// stays focused, so keeping it again does not duplicate it.
    ///
    /// # Errors
    ///
    /// Returns an error unless reviewing with an entry in focus, or if the
    /// document cannot be saved.
    pub async fn keep(&mut self) -> Result<Entry, WorkflowError> {
        self.require(Phase::Reviewing, "keep")?;
        let entry = self
            .collector
            .peek_front()
            .map_err(|_| WorkflowError::NoFocus)?;

        self.document.add_entry(&entry)?;
        if let Err(e) = self.document.save() {
            self.document.remove_last_entry();
            warn!(url = %entry.url, "Keeping entry failed, document not saved: {e}");
            return Err(e.into());
        }

        self.collector
            .pop_front()
            .await
            .map_err(|_| WorkflowError::NoFocus)?;
        info!(url = %entry.url, kept = self.document.entry_count(), "Entry kept");
        Ok(entry)
    }

    /// Drop the focused entry and advance.
    ///
    /// # Errors
    ///
    /// Returns an error unless reviewing with an entry in focus.
    pub async fn discard(&mut self) -> Result<Entry, WorkflowError> {
        self.require(Phase::Reviewing, "discard")?;
        let entry = self
            .collector
            .pop_front()
            .await
            .map_err(|_| WorkflowError::NoFocus)?;
        info!(url = %entry.url, "Entry discarded");
        Ok(entry)
    }

    /// Fetch the next page again after a failed fetch.
    ///
    /// # Errors
    ///
    /// Returns an error unless reviewing, or if the fetch fails again.
    pub async fn retry_fetch(&mut self) -> Result<usize, WorkflowError> {
        self.require(Phase::Reviewing, "retry fetch")?;
        Ok(self.collector.fetch_next_page().await?)
    }

    /// Save the document as-is and finish. Finishing again re-saves the same
    /// content. Buffered entries are abandoned.
    ///
    /// # Errors
    ///
    /// Returns an error before the session began, or if the save fails, in
    /// which case the session keeps reviewing so the finish can be retried.
    pub fn finish(&mut self) -> Result<&Path, WorkflowError> {
        if self.phase == Phase::AwaitingSubject {
            return Err(WorkflowError::InvalidState {
                action: "finish",
                phase: self.phase,
            });
        }
        self.document.save()?;

        if self.phase != Phase::Finished {
            info!(
                subject = ?self.collector.subject(),
                kept = self.document.entry_count(),
                abandoned = self.collector.len(),
                path = %self.document.path().display(),
                "Curation session finished"
            );
            self.phase = Phase::Finished;
        }
        Ok(self.document.path())
    }

    /// Where the finished document was saved.
    ///
    /// # Errors
    ///
    /// Returns an error unless finished.
    pub fn delivery_path(&self) -> Result<&Path, WorkflowError> {
        if self.phase == Phase::Finished {
            Ok(self.document.path())
        } else {
            Err(WorkflowError::NotFinished)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::collector::testing::{page, Reply, ScriptedSource};
    use crate::collector::ParseRules;

    fn session(source: &Arc<ScriptedSource>, path: PathBuf) -> CurationSession {
        let collector = Collector::new(
            source.clone(),
            ParseRules::new("https://forum.example.com", "https://media.example.com/i/"),
        );
        CurationSession::new(collector, ArchiveDocument::new(path, "archive"))
    }

    #[tokio::test]
    async fn test_alice_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            page(&["one", "two", "three"]),
            page(&[]),
        ]));
        let mut s = session(&source, dir.path().join("alice.docx"));

        assert_eq!(s.begin("alice").await.unwrap(), 3);
        assert_eq!(s.phase(), Phase::Reviewing);
        assert_eq!(s.collector().len(), 3);

        assert_eq!(s.keep().await.unwrap().title, "one");
        assert_eq!(source.requested_pages(), vec![1]);
        assert_eq!(s.keep().await.unwrap().title, "two");
        // One entry left: page 2 was requested during the pop.
        assert_eq!(source.requested_pages(), vec![1, 2]);
        assert_eq!(s.discard().await.unwrap().title, "three");

        assert_eq!(s.focus().unwrap(), Focus::Exhausted);
        let path = s.finish().unwrap().to_path_buf();
        assert!(path.exists());
        assert_eq!(s.phase(), Phase::Finished);

        assert!(s.document().has_header());
        assert_eq!(
            s.document().entry_urls().collect::<Vec<_>>(),
            vec![
                "https://forum.example.com/entry/one",
                "https://forum.example.com/entry/two"
            ]
        );
        assert_eq!(s.collector().next_page(), 3);
        assert!(s.collector().peek_front().is_err());
        assert_eq!(source.requested_pages(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_first_fetch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![Reply::Fail, page(&["one"])]));
        let mut s = session(&source, dir.path().join("alice.docx"));

        let err = s.begin("alice").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Fetch(FetchError::Status { page: 1, .. })));
        assert_eq!(s.phase(), Phase::AwaitingSubject);
        assert!(s.collector().is_empty());
        assert_eq!(s.collector().next_page(), 1);
        assert!(s.document().blocks().is_empty());
        assert!(!dir.path().join("alice.docx").exists());

        // Same subject may retry; a different one may not.
        assert!(matches!(
            s.begin("bob").await,
            Err(WorkflowError::Subject(SubjectError::AlreadyBound { .. }))
        ));
        assert_eq!(s.begin("alice").await.unwrap(), 1);
        assert_eq!(s.phase(), Phase::Reviewing);
    }

    #[tokio::test]
    async fn test_keep_count_matches_document() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            page(&["a", "b", "c"]),
            page(&["d", "e"]),
            page(&[]),
        ]));
        let mut s = session(&source, dir.path().join("alice.docx"));
        s.begin("alice").await.unwrap();

        let decisions = [true, false, true, true, false];
        let mut expected = Vec::new();
        for keep in decisions {
            if keep {
                expected.push(s.keep().await.unwrap().url);
            } else {
                s.discard().await.unwrap();
            }
        }

        assert_eq!(s.document().entry_count(), 3);
        assert_eq!(
            s.document().entry_urls().map(String::from).collect::<Vec<_>>(),
            expected
        );
        assert_eq!(s.focus().unwrap(), Focus::Exhausted);
        assert!(matches!(s.keep().await, Err(WorkflowError::NoFocus)));
        assert!(matches!(s.discard().await, Err(WorkflowError::NoFocus)));
    }

    #[tokio::test]
    async fn test_finish_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![page(&["a", "b", "c"])]));
        let mut s = session(&source, dir.path().join("alice.docx"));
        s.begin("alice").await.unwrap();
        s.keep().await.unwrap();

        let path = s.finish().unwrap().to_path_buf();
        let first = std::fs::read(&path).unwrap().len();
        s.finish().unwrap();
        let second = std::fs::read(&path).unwrap().len();

        assert_eq!(first, second);
        assert_eq!(s.document().entry_count(), 1);
        assert_eq!(s.document().blocks().len(), 2);
        assert_eq!(s.delivery_path().unwrap(), path.as_path());
    }

    #[tokio::test]
    async fn test_finish_without_keeping() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![page(&["a", "b", "c"])]));
        let mut s = session(&source, dir.path().join("alice.docx"));
        s.begin("alice").await.unwrap();

        assert!(matches!(s.delivery_path(), Err(WorkflowError::NotFinished)));
        s.finish().unwrap();
        assert_eq!(s.document().entry_count(), 0);
        assert!(s.delivery_path().unwrap().exists());
    }

    #[tokio::test]
    async fn test_actions_rejected_outside_reviewing() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![page(&["a", "b", "c"])]));
        let mut s = session(&source, dir.path().join("alice.docx"));

        assert!(matches!(s.keep().await, Err(WorkflowError::InvalidState { .. })));
        assert!(matches!(s.focus(), Err(WorkflowError::InvalidState { .. })));
        assert!(matches!(s.finish(), Err(WorkflowError::InvalidState { .. })));

        s.begin("alice").await.unwrap();
        s.finish().unwrap();

        assert!(matches!(s.discard().await, Err(WorkflowError::InvalidState { .. })));
        assert!(matches!(s.begin("alice").await, Err(WorkflowError::InvalidState { .. })));
        assert!(matches!(s.retry_fetch().await, Err(WorkflowError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back_keep() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![page(&["a", "b", "c"])]));
        let mut s = session(&source, dir.path().join("missing").join("alice.docx"));
        s.begin("alice").await.unwrap();

        assert!(matches!(s.keep().await, Err(WorkflowError::Document(_))));
        assert_eq!(s.document().entry_count(), 0);
        assert_eq!(s.collector().len(), 3);

        assert!(matches!(s.finish(), Err(WorkflowError::Document(_))));
        assert_eq!(s.phase(), Phase::Reviewing);

        std::fs::create_dir(dir.path().join("missing")).unwrap();
        assert_eq!(s.keep().await.unwrap().title, "a");
        assert_eq!(s.document().entry_count(), 1);
        s.finish().unwrap();
        assert_eq!(s.phase(), Phase::Finished);
    }

    #[tokio::test]
    async fn test_stalled_focus_recovers_with_retry() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            page(&["a"]),
            Reply::Fail,
            page(&["b"]),
        ]));
        let mut s = session(&source, dir.path().join("alice.docx"));
        s.begin("alice").await.unwrap();

        // Popping the only entry triggers the lookahead, which fails.
        s.discard().await.unwrap();
        assert_eq!(s.focus().unwrap(), Focus::Stalled);

        assert_eq!(s.retry_fetch().await.unwrap(), 1);
        match s.focus().unwrap() {
            Focus::Entry(entry) => assert_eq!(entry.title, "b"),
            other => panic!("expected an entry, got {other:?}"),
        }
        assert_eq!(source.requested_pages(), vec![1, 2, 2]);
    }
}
