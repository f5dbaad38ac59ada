//! Runs suggestion searches on a background thread as the user types.
//!
//! At most one scan is in flight. A new request first flips the shared
//! `working` flag off and joins the previous scan, and only then builds the
//! new request, so a superseded scan can never publish after a newer search
//! has started.

use crate::bookmark_suggestor::BookmarkSuggestor;
use crate::config::SuggestConfig;
use crate::error::{Error, Result};
use crate::history_suggestor::HistorySuggestor;
use crate::source::{SearchRequest, SuggestionSource};
use crate::store::{SharedBookmarkStore, SharedFaviconStore, SharedHistoryStore};
use crate::types::UrlSuggestion;
use crate::word_index::SharedWordIndex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, error, info};

/// Called on the scan thread with the final list of a completed search.
pub type SuggestionCallback = Arc<dyn Fn(Vec<UrlSuggestion>) + Send + Sync>;

pub struct SuggestionWorker {
    sources: Arc<Vec<Box<dyn SuggestionSource>>>,
    on_ready: SuggestionCallback,
    working: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    in_flight: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SuggestionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionWorker")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("working", &self.working.load(Ordering::Relaxed))
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SuggestionWorker {
    /// Sources are scanned in the given order and their batches concatenated
    /// in that order.
    pub fn new(sources: Vec<Box<dyn SuggestionSource>>, on_ready: SuggestionCallback) -> Self {
        Self {
            sources: Arc::new(sources),
            on_ready,
            working: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: None,
        }
    }

    /// Bookmarks first, then history.
    pub fn with_stores(
        bookmarks: SharedBookmarkStore,
        history: SharedHistoryStore,
        favicons: SharedFaviconStore,
        word_index: Arc<SharedWordIndex>,
        config: SuggestConfig,
        on_ready: SuggestionCallback,
    ) -> Self {
        let config = Arc::new(config);
        let sources: Vec<Box<dyn SuggestionSource>> = vec![
            Box::new(BookmarkSuggestor::new(
                bookmarks,
                Arc::clone(&history),
                Arc::clone(&favicons),
                Arc::clone(&config),
            )),
            Box::new(HistorySuggestor::new(history, favicons, word_index, config)),
        ];

        Self::new(sources, on_ready)
    }

    /// Start searching for `text`, superseding any running search. Results
    /// are delivered through the callback. Blank input only cancels.
    pub fn find_suggestions_for(&mut self, text: &str) -> Result<()> {
        self.cancel();

        if text.trim().is_empty() {
            debug!("Empty search term, nothing to suggest");
            return Ok(());
        }

        let request = SearchRequest::new(text);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            term = %request.term,
            tokens = request.tokens.len(),
            has_scheme = request.has_scheme,
            generation,
            "Starting suggestion search"
        );

        self.working.store(true, Ordering::SeqCst);

        let sources = Arc::clone(&self.sources);
        let working = Arc::clone(&self.working);
        let current_generation = Arc::clone(&self.generation);
        let on_ready = Arc::clone(&self.on_ready);

        let spawned = std::thread::Builder::new()
            .name("url-suggestions".to_string())
            .spawn(move || {
                let Some(results) = search_for_hits(&sources, &working, &request) else {
                    return;
                };

                // losing this race to cancel() means a newer request owns the results slot
                let still_current = current_generation.load(Ordering::SeqCst) == generation;
                if still_current
                    && working
                        .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                {
                    on_ready(results);
                }
            });

        match spawned {
            Ok(handle) => {
                self.in_flight = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.working.store(false, Ordering::SeqCst);
                error!(?e, "Failed to spawn suggestion thread");
                Err(Error::SpawnThread(e))
            }
        }
    }

    /// Stop the running search, if any, and wait for its thread to exit.
    pub fn cancel(&mut self) {
        let Some(handle) = self.in_flight.take() else {
            return;
        };

        if self.working.swap(false, Ordering::SeqCst) {
            debug!("Cancelling in-flight suggestion search");
        }

        if handle.join().is_err() {
            error!("Suggestion search thread panicked, dropping its results");
        }
    }

    pub fn is_working(&self) -> bool {
        self.working.load(Ordering::SeqCst)
    }

    /// Number of searches started so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Drop for SuggestionWorker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Scan every source in order. Each batch is sorted by visit count on its
/// own and truncated to the source's result cap before it is appended.
/// Returns `None` once the search has been cancelled.
#[tracing::instrument(skip_all, fields(term = %request.term), level = tracing::Level::DEBUG)]
fn search_for_hits(
    sources: &[Box<dyn SuggestionSource>],
    working: &AtomicBool,
    request: &SearchRequest,
) -> Option<Vec<UrlSuggestion>> {
    let started = Instant::now();
    let mut suggestions = Vec::new();

    for source in sources {
        if !working.load(Ordering::Relaxed) {
            return None;
        }

        let source_started = Instant::now();
        let mut batch = source.get_suggestions(working, request);
        if !working.load(Ordering::Relaxed) {
            debug!(source = source.name(), "Suggestion search cancelled");
            return None;
        }

        glidesort::sort_by(batch.as_mut_slice(), |a, b| b.visit_count.cmp(&a.visit_count));
        if let Some(limit) = source.max_results() {
            batch.truncate(limit);
        }

        debug!(
            source = source.name(),
            hits = batch.len(),
            elapsed = ?source_started.elapsed(),
            "Suggestion source completed"
        );
        suggestions.append(&mut batch);
    }

    info!(
        term = %request.term,
        total = suggestions.len(),
        elapsed = ?started.elapsed(),
        "Suggestion search completed"
    );
    Some(suggestions)
}
