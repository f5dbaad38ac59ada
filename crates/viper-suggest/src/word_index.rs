//! Word association index of the browsing history.
//!
//! The index is rebuilt periodically on a background thread. Each rebuild
//! produces a new immutable [`HistoryWordIndex`] which is swapped into the
//! [`SharedWordIndex`] under a short write lock, so a running scan keeps
//! reading the snapshot it started with.

use crate::error::{Error, Result};
use crate::store::{SharedHistoryStore, current};
use crate::tokenize::tokenize_possible_url;
use crate::types::HistoryEntry;
use ahash::AHashMap;
use parking_lot::{Condvar, Mutex, RwLock};
use rayon::prelude::*;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Default)]
pub struct HistoryWordIndex {
    /// word id -> uppercased word
    words: AHashMap<i64, String>,
    /// history id -> ids of the words found in that record
    entry_words: AHashMap<i64, Vec<i64>>,
}

impl HistoryWordIndex {
    pub fn from_parts(words: AHashMap<i64, String>, entry_words: AHashMap<i64, Vec<i64>>) -> Self {
        Self { words, entry_words }
    }

    /// Index the uppercased URL and title tokens of every record.
    pub fn build(entries: &[HistoryEntry]) -> Self {
        let per_entry: Vec<(i64, Vec<String>)> = entries
            .par_iter()
            .map(|entry| (entry.visit_id, entry_words(entry)))
            .collect();

        let mut ids: AHashMap<String, i64> = AHashMap::new();
        let mut words: AHashMap<i64, String> = AHashMap::new();
        let mut entry_words: AHashMap<i64, Vec<i64>> = AHashMap::with_capacity(per_entry.len());

        for (history_id, entry_tokens) in per_entry {
            let word_ids = entry_tokens
                .into_iter()
                .map(|word| {
                    let next_id = ids.len() as i64;
                    *ids.entry(word).or_insert_with_key(|word| {
                        words.insert(next_id, word.clone());
                        next_id
                    })
                })
                .collect();
            entry_words.insert(history_id, word_ids);
        }

        Self { words, entry_words }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty() || self.entry_words.is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entry_words.len()
    }

    /// Resolve the words of one history record. Unknown ids are skipped.
    pub fn words_for(&self, history_id: i64) -> impl Iterator<Item = &str> + '_ {
        self.entry_words
            .get(&history_id)
            .into_iter()
            .flatten()
            .filter_map(|word_id| self.words.get(word_id).map(String::as_str))
    }
}

fn entry_words(entry: &HistoryEntry) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let tokens = tokenize_possible_url(&entry.url)
        .into_iter()
        .chain(tokenize_possible_url(&entry.title));

    for token in tokens {
        let upper = token.to_uppercase();
        if !seen.contains(&upper) {
            seen.push(upper);
        }
    }

    seen
}

/// The currently published word index.
#[derive(Debug, Default)]
pub struct SharedWordIndex {
    current: RwLock<Arc<HistoryWordIndex>>,
}

impl SharedWordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<HistoryWordIndex> {
        Arc::clone(&self.current.read())
    }

    pub fn replace(&self, index: HistoryWordIndex) {
        let index = Arc::new(index);
        *self.current.write() = index;
    }

    pub fn clear(&self) {
        self.replace(HistoryWordIndex::default());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshState {
    Waiting,
    RefreshRequested,
    Stopping,
}

#[derive(Debug)]
struct RefreshSignal {
    state: Mutex<RefreshState>,
    wakeup: Condvar,
}

impl RefreshSignal {
    fn set(&self, state: RefreshState) {
        let mut guard = self.state.lock();
        // a stop request must never be downgraded to a refresh
        if *guard != RefreshState::Stopping {
            *guard = state;
        }
        self.wakeup.notify_one();
    }
}

/// Background thread that reloads the word index from the history store on
/// a fixed interval.
pub struct WordIndexRefresher {
    signal: Arc<RefreshSignal>,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for WordIndexRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordIndexRefresher")
            .field("state", &*self.signal.state.lock())
            .field("running", &self.handle.is_some())
            .finish()
    }
}

impl WordIndexRefresher {
    pub fn spawn(
        history: SharedHistoryStore,
        index: Arc<SharedWordIndex>,
        interval: Duration,
    ) -> Result<Self> {
        let signal = Arc::new(RefreshSignal {
            state: Mutex::new(RefreshState::Waiting),
            wakeup: Condvar::new(),
        });

        let thread_signal = Arc::clone(&signal);
        let handle = std::thread::Builder::new()
            .name("history-word-index".to_string())
            .spawn(move || refresh_loop(&history, &index, &thread_signal, interval))
            .map_err(Error::SpawnThread)?;

        info!(?interval, "History word index refresher started");
        Ok(Self {
            signal,
            handle: Some(handle),
        })
    }

    /// Reload the index now instead of waiting for the next tick.
    pub fn refresh_now(&self) {
        self.signal.set(RefreshState::RefreshRequested);
    }

    pub fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        self.signal.set(RefreshState::Stopping);
        handle.join().map_err(|_| {
            error!("History word index refresher panicked");
            Error::ThreadPanic
        })?;

        info!("History word index refresher stopped");
        Ok(())
    }
}

impl Drop for WordIndexRefresher {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!(?e, "Failed to stop history word index refresher");
        }
    }
}

fn refresh_loop(
    history: &SharedHistoryStore,
    index: &SharedWordIndex,
    signal: &RefreshSignal,
    interval: Duration,
) {
    loop {
        if *signal.state.lock() == RefreshState::Stopping {
            break;
        }

        refresh_once(history, index);

        let mut state = signal.state.lock();
        if *state == RefreshState::Waiting {
            // a timeout and a spurious wakeup both just lead to the next refresh
            let _ = signal.wakeup.wait_for(&mut state, interval);
        }

        match *state {
            RefreshState::Stopping => break,
            _ => *state = RefreshState::Waiting,
        }
    }
}

#[tracing::instrument(skip_all, level = tracing::Level::DEBUG)]
pub(crate) fn refresh_once(history: &SharedHistoryStore, index: &SharedWordIndex) {
    let Some(store) = current(history) else {
        debug!("History store is not available, keeping the current word index");
        return;
    };

    let started = Instant::now();
    match store.load_word_index() {
        Some(new_index) => {
            let words = new_index.word_count();
            let entries = new_index.entry_count();
            index.replace(new_index);
            info!(words, entries, elapsed = ?started.elapsed(), "Refreshed history word index");
        }
        None => debug!("History store has no word index"),
    }
}
