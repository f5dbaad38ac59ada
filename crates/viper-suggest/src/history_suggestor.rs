use crate::config::SuggestConfig;
use crate::source::{SearchRequest, SuggestionSource, is_host_match, length_ratio};
use crate::store::{FaviconStore, SharedFaviconStore, SharedHistoryStore, current};
use crate::types::{HistoryEntry, MatchType, UrlSuggestion};
use crate::word_index::{HistoryWordIndex, SharedWordIndex};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{Level, debug};

/// Suggests pages from the browsing history.
pub struct HistorySuggestor {
    history: SharedHistoryStore,
    favicons: SharedFaviconStore,
    word_index: Arc<SharedWordIndex>,
    config: Arc<SuggestConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryMatch {
    pub match_type: MatchType,
    pub percent_match: i32,
}

impl HistoryMatch {
    const NONE: HistoryMatch = HistoryMatch {
        match_type: MatchType::None,
        percent_match: 0,
    };

    fn of(match_type: MatchType) -> Self {
        Self {
            match_type,
            percent_match: 0,
        }
    }
}

impl HistorySuggestor {
    pub fn new(
        history: SharedHistoryStore,
        favicons: SharedFaviconStore,
        word_index: Arc<SharedWordIndex>,
        config: Arc<SuggestConfig>,
    ) -> Self {
        Self {
            history,
            favicons,
            word_index,
            config,
        }
    }

    /// Pages visited a few times, long ago and never typed are noise.
    pub fn is_stale(&self, entry: &HistoryEntry, cutoff: DateTime<Utc>) -> bool {
        entry.url_typed_count < self.config.stale_min_typed
            && entry.visit_count < self.config.stale_min_visits
            && entry.last_visit < cutoff
    }

    /// Records last visited before this instant are candidates for the stale
    /// filter. An age too large to subtract from `now` leaves nothing stale.
    pub fn stale_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.config
            .stale_after()
            .and_then(|age| now.checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Decide why, if at all, a history record matches the request. `index`
    /// is `None` when the word index is absent or the query is not eligible.
    pub fn classify(
        &self,
        request: &SearchRequest,
        entry: &HistoryEntry,
        index: Option<&HistoryWordIndex>,
    ) -> HistoryMatch {
        let title_upper = entry.title.to_uppercase();
        let mut title_checked = false;

        if let Some(index) = index {
            if let Some(percent_match) = self.word_overlap_percent(request, entry, index) {
                return HistoryMatch {
                    match_type: MatchType::SearchWords,
                    percent_match,
                };
            }

            if request.hash.is_match_str(&title_upper) {
                return HistoryMatch::of(MatchType::Title);
            }
            title_checked = true;
        }

        let url_upper = entry.url.to_uppercase();
        if self.is_host_window_match(request, &url_upper) {
            return HistoryMatch::of(MatchType::Url);
        }
        if url_upper.contains(request.term.as_str())
            && length_ratio(request.term_len(), &entry.url) >= self.config.history_url_ratio
        {
            return HistoryMatch::of(MatchType::Url);
        }

        if !title_checked && request.hash.is_match_str(&title_upper) {
            return HistoryMatch::of(MatchType::Title);
        }

        HistoryMatch::NONE
    }

    /// Weighted overlap between the query tokens and the record's indexed
    /// words, as a percentage of the URL length. `None` below the threshold.
    fn word_overlap_percent(
        &self,
        request: &SearchRequest,
        entry: &HistoryEntry,
        index: &HistoryWordIndex,
    ) -> Option<i32> {
        let url_len = entry.url.chars().count();
        if url_len == 0 {
            return None;
        }

        let mut score = 0.0f64;
        let mut match_count = 0usize;

        for word in index.words_for(entry.visit_id) {
            let word_len = word.chars().count();
            if word_len == 0 {
                continue;
            }

            for token in &request.tokens {
                if let Some(byte_offset) = word.find(token.as_str()) {
                    let offset = word[..byte_offset].chars().count();
                    let token_len = token.chars().count();
                    // earlier and more complete overlaps weigh more
                    score += (token_len * (word_len - offset)) as f64 / word_len as f64;
                    match_count += 1;
                } else if token.contains(word) {
                    match_count += 1;
                }
            }
        }

        let score_ratio = score / url_len as f64;
        if match_count + 1 >= request.tokens.len()
            && score_ratio >= self.config.history_words_score_ratio
        {
            Some(((100.0 * score_ratio).round() as i32).min(100))
        } else {
            None
        }
    }

    /// Term found near the start of the host, right after `scheme://`, or at
    /// the very start of the URL when the term carries its own scheme.
    fn is_host_window_match(&self, request: &SearchRequest, url_upper: &str) -> bool {
        let start = if request.has_scheme {
            0
        } else {
            url_upper.find("://").map_or(0, |i| i + 3)
        };

        url_upper[start..]
            .find(request.term.as_str())
            .is_some_and(|byte_pos| {
                url_upper[start..start + byte_pos].chars().count() < self.config.history_host_window
            })
    }

    /// Only multi-word queries go through the word index, a host like
    /// `browser.com` is left to the URL checks.
    fn uses_word_index(&self, request: &SearchRequest) -> bool {
        request.word_count() >= self.config.history_word_min_words
            && request.term_len() >= self.config.history_word_min_term_len
    }

    fn build_suggestion(
        &self,
        entry: &HistoryEntry,
        matched: HistoryMatch,
        request: &SearchRequest,
        favicons: Option<&dyn FaviconStore>,
    ) -> UrlSuggestion {
        UrlSuggestion {
            favicon: favicons.map(|f| f.favicon(&entry.url)).unwrap_or_default(),
            title: entry.title.clone(),
            url: entry.url.clone(),
            last_visit: entry.last_visit,
            url_typed_count: entry.url_typed_count,
            visit_count: entry.visit_count,
            percent_match: matched.percent_match,
            is_host_match: is_host_match(&request.term, &entry.url),
            is_bookmark: false,
            match_type: matched.match_type,
            history_id: entry.visit_id,
        }
    }
}

impl SuggestionSource for HistorySuggestor {
    fn name(&self) -> &'static str {
        "history"
    }

    fn max_results(&self) -> Option<usize> {
        Some(self.config.history_max_results)
    }

    #[tracing::instrument(skip_all, name = "history_suggestions", level = Level::DEBUG)]
    fn get_suggestions(&self, working: &AtomicBool, request: &SearchRequest) -> Vec<UrlSuggestion> {
        let Some(history) = current(&self.history) else {
            debug!("History store is not available");
            return Vec::new();
        };
        let favicons = current(&self.favicons);

        let started = Instant::now();
        let entries = history.entries();
        let word_index = self.word_index.snapshot();
        let index = (!word_index.is_empty() && self.uses_word_index(request)).then(|| word_index.as_ref());

        let cutoff = self.stale_cutoff(Utc::now());
        let max_hits = self.config.history_max_hits;
        let mut hits = Vec::new();

        for entry in entries.iter() {
            if !working.load(Ordering::Relaxed) {
                debug!(hits = hits.len(), "History scan cancelled");
                return hits;
            }

            if self.is_stale(entry, cutoff) {
                continue;
            }

            let matched = self.classify(request, entry, index);
            if matched.match_type == MatchType::None {
                continue;
            }

            hits.push(self.build_suggestion(entry, matched, request, favicons.as_deref()));
            if hits.len() >= max_hits {
                break;
            }
        }

        debug!(
            hits = hits.len(),
            scanned = entries.len(),
            with_word_index = index.is_some(),
            elapsed = ?started.elapsed(),
            "History scan completed"
        );
        hits
    }
}
