//! One consumer's view of the engine: query submission, delivery slot and history.

use crate::error::QuranSearchError;
use crate::history::{Direction, HistoryEntry, HistoryLedger};
use crate::query::{self, Query};
use crate::stream::{BatchSink, FirstBatch, ResultStreamer, StreamHandle};
use std::sync::Arc;

/// An accepted query and the start of its delivery.
pub struct Submission {
    pub query: Query,
    pub first: FirstBatch,
    pub handle: StreamHandle,
}

pub struct SearchSession {
    streamer: ResultStreamer,
    history: HistoryLedger,
}

impl SearchSession {
    pub fn new(streamer: ResultStreamer) -> Self {
        Self {
            streamer,
            history: HistoryLedger::new(),
        }
    }

    pub fn streamer(&self) -> &ResultStreamer {
        &self.streamer
    }

    /// Parse and stream `raw`. The trimmed input is recorded in history only
    /// once the query has been accepted by both the parser and the executor.
    pub fn submit(
        &mut self,
        raw: &str,
        sink: Arc<dyn BatchSink>,
    ) -> Result<Submission, QuranSearchError> {
        let query = query::parse(raw)?;
        let (first, handle) = self.streamer.stream(&query, sink)?;
        self.history.record(raw.trim());

        tracing::debug!(
            "Submitted {} query '{}' ({} matches)",
            query.kind(),
            query,
            first.total
        );
        Ok(Submission {
            query,
            first,
            handle,
        })
    }

    pub fn navigate(&mut self, direction: Direction) -> Option<String> {
        self.history.navigate(direction)
    }

    pub fn history_snapshot(&self) -> Vec<String> {
        self.history.snapshot()
    }

    pub fn history_entries(&self) -> Vec<HistoryEntry> {
        self.history.entries().cloned().collect()
    }

    pub fn restore_history(&mut self, raw_queries: Vec<String>) {
        self.history.restore(raw_queries);
    }

    pub fn restore_history_entries(&mut self, entries: Vec<HistoryEntry>) {
        self.history.restore_entries(entries);
    }

    /// Cancel the active delivery, if any.
    pub fn cancel(&self) {
        self.streamer.cancel_active();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::fixtures;
    use crate::error::{ExecError, ParseError};
    use crate::search::{Match, SearchEngine};
    use crate::stream::{DeliveryOutcome, StreamOptions};
    use tokio::runtime::Handle;

    fn session() -> SearchSession {
        let engine = Arc::new(SearchEngine::new(Arc::new(fixtures::corpus()), 16));
        SearchSession::new(ResultStreamer::new(
            engine,
            Handle::current(),
            StreamOptions::default(),
        ))
    }

    fn ignore() -> Arc<dyn BatchSink> {
        Arc::new(|_: &[Match], _: bool| {})
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_accepted_queries_are_recorded() {
        let mut session = session();

        let submission = session.submit("  الرحمن ", ignore()).unwrap();
        assert_eq!(
            submission.query,
            Query::Text {
                raw: "الرحمن".to_string()
            }
        );
        assert_eq!(submission.first.total, 2);

        session.submit("2 255", ignore()).unwrap();
        assert_eq!(session.history_snapshot(), vec!["الرحمن", "2 255"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rejected_queries_are_not_recorded() {
        let mut session = session();

        assert!(matches!(
            session.submit("   ", ignore()),
            Err(QuranSearchError::Parse(ParseError::Empty))
        ));
        assert!(matches!(
            session.submit("115", ignore()),
            Err(QuranSearchError::Exec(ExecError::ChapterOutOfRange(115)))
        ));
        assert!(matches!(
            session.submit("1 9", ignore()),
            Err(QuranSearchError::Exec(ExecError::EmptyRange { .. }))
        ));
        assert!(session.history_snapshot().is_empty());

        // No matches is still an accepted query.
        let submission = session.submit("zzz", ignore()).unwrap();
        assert!(submission.first.is_final);
        assert_eq!(session.history_snapshot(), vec!["zzz"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_history_navigation_and_restore() {
        let mut session = session();
        session.restore_history(vec!["1".into(), "2".into()]);
        session.submit("3", ignore()).unwrap();

        assert_eq!(session.navigate(Direction::Older).as_deref(), Some("3"));
        assert_eq!(session.navigate(Direction::Older).as_deref(), Some("2"));
        assert_eq!(session.navigate(Direction::Newer).as_deref(), Some("3"));
        assert_eq!(session.navigate(Direction::Newer), None);
        assert_eq!(session.history_entries().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancel_marks_active_delivery() {
        let mut session = session();
        let submission = session.submit("مبين", ignore()).unwrap();
        assert!(!submission.first.is_final);

        session.cancel();
        assert!(submission.handle.is_cancelled());
        assert!(matches!(
            submission.handle.join().await,
            DeliveryOutcome::Completed { .. } | DeliveryOutcome::Cancelled { .. }
        ));
    }
}
