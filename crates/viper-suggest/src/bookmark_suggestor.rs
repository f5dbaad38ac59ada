use crate::config::SuggestConfig;
use crate::source::{SearchRequest, SuggestionSource, is_host_match, length_ratio};
use crate::store::{
    FaviconStore, HistoryStore, SharedBookmarkStore, SharedFaviconStore, SharedHistoryStore,
    current,
};
use crate::tokenize::tokenize_possible_url;
use crate::types::{BookmarkNode, MatchType, UrlSuggestion};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{Level, debug};

/// Suggests bookmarks. Hits are taken in tree order until the cap is reached,
/// they are not ranked against each other here.
pub struct BookmarkSuggestor {
    bookmarks: SharedBookmarkStore,
    history: SharedHistoryStore,
    favicons: SharedFaviconStore,
    config: Arc<SuggestConfig>,
}

impl BookmarkSuggestor {
    pub fn new(
        bookmarks: SharedBookmarkStore,
        history: SharedHistoryStore,
        favicons: SharedFaviconStore,
        config: Arc<SuggestConfig>,
    ) -> Self {
        Self {
            bookmarks,
            history,
            favicons,
            config,
        }
    }

    /// Decide why, if at all, a bookmark matches the request.
    pub fn classify(&self, request: &SearchRequest, title: &str, url: &str, shortcut: &str) -> MatchType {
        let term = request.term.as_str();

        if !shortcut.is_empty() && term.starts_with(&shortcut.to_uppercase()) {
            return MatchType::Shortcut;
        }

        let term_len = request.term_len();
        if term_len < self.config.short_term_len {
            // short terms hit almost everything as substrings, only whole tokens count
            let is_exact_token =
                |haystack: &str| tokenize_possible_url(haystack).iter().any(|token| token.to_uppercase() == term);

            return if is_exact_token(title) {
                MatchType::Title
            } else if is_exact_token(url) {
                MatchType::Url
            } else {
                MatchType::None
            };
        }

        let url_upper = url.to_uppercase();
        if url_upper.contains(term) && length_ratio(term_len, url) >= self.config.bookmark_url_ratio {
            return MatchType::Url;
        }

        let title_upper = title.to_uppercase();
        if request.tokens.len() > 1 {
            let matching = request
                .tokens
                .iter()
                .filter(|token| token.chars().count() >= self.config.bookmark_min_word_len)
                .filter(|token| title_upper.contains(token.as_str()))
                .count();

            if matching as f64 / request.tokens.len() as f64 >= self.config.bookmark_words_ratio {
                return MatchType::SearchWords;
            }
        }

        if request.hash.is_match_str(&title_upper) {
            return MatchType::Title;
        }
        if request.hash.is_match_str(&url_upper) {
            return MatchType::Url;
        }

        MatchType::None
    }

    fn build_suggestion(
        &self,
        node: &BookmarkNode,
        match_type: MatchType,
        request: &SearchRequest,
        history: Option<&dyn HistoryStore>,
        favicons: Option<&dyn FaviconStore>,
    ) -> UrlSuggestion {
        let record = history.and_then(|h| h.entry(&node.url));
        let favicon = match favicons {
            Some(store) if node.icon.is_empty() => store.favicon(&node.url),
            _ => node.icon.clone(),
        };

        UrlSuggestion {
            favicon,
            title: node.name.clone(),
            url: node.url.clone(),
            last_visit: record
                .as_ref()
                .map_or(DateTime::<Utc>::UNIX_EPOCH, |r| r.last_visit),
            url_typed_count: record.as_ref().map_or(0, |r| r.url_typed_count),
            visit_count: record.as_ref().map_or(0, |r| r.visit_count),
            percent_match: 0,
            is_host_match: is_host_match(&request.term, &node.url),
            is_bookmark: true,
            match_type,
            history_id: record.as_ref().map_or(-1, |r| r.visit_id),
        }
    }
}

impl SuggestionSource for BookmarkSuggestor {
    fn name(&self) -> &'static str {
        "bookmarks"
    }

    #[tracing::instrument(skip_all, name = "bookmark_suggestions", level = Level::DEBUG)]
    fn get_suggestions(&self, working: &AtomicBool, request: &SearchRequest) -> Vec<UrlSuggestion> {
        let Some(bookmarks) = current(&self.bookmarks) else {
            debug!("Bookmark store is not available");
            return Vec::new();
        };
        let history = current(&self.history);
        let favicons = current(&self.favicons);

        let started = Instant::now();
        let root = bookmarks.root();
        let max_hits = self.config.bookmark_max_hits;
        let mut hits = Vec::new();

        // pre-order walk, children pushed in reverse to keep tree order
        let mut stack: Vec<&BookmarkNode> = vec![root.as_ref()];
        while let Some(node) = stack.pop() {
            if !working.load(Ordering::Relaxed) {
                debug!(hits = hits.len(), "Bookmark scan cancelled");
                return hits;
            }

            if node.is_folder() {
                stack.extend(node.children.iter().rev());
                continue;
            }

            let match_type = self.classify(request, &node.name, &node.url, &node.shortcut);
            if match_type == MatchType::None {
                continue;
            }

            hits.push(self.build_suggestion(
                node,
                match_type,
                request,
                history.as_deref(),
                favicons.as_deref(),
            ));

            if hits.len() >= max_hits {
                break;
            }
        }

        debug!(hits = hits.len(), elapsed = ?started.elapsed(), "Bookmark scan completed");
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BookmarkStore, MemoryBookmarkStore, MemoryHistoryStore, NoFavicons, empty_slot, shared};
    use crate::types::{Favicon, HistoryEntry};

    fn suggestor_with(root: BookmarkNode, history: Vec<HistoryEntry>) -> BookmarkSuggestor {
        let bookmarks: Arc<dyn BookmarkStore> = Arc::new(MemoryBookmarkStore::new(root));
        let history: Arc<dyn HistoryStore> = Arc::new(MemoryHistoryStore::new(history));
        let favicons: Arc<dyn FaviconStore> = Arc::new(NoFavicons);
        BookmarkSuggestor::new(
            shared(bookmarks),
            shared(history),
            shared(favicons),
            Arc::new(SuggestConfig::default()),
        )
    }

    fn suggestor() -> BookmarkSuggestor {
        suggestor_with(BookmarkNode::folder("root", vec![]), vec![])
    }

    fn classify(term: &str, title: &str, url: &str, shortcut: &str) -> MatchType {
        suggestor().classify(&SearchRequest::new(term), title, url, shortcut)
    }

    fn run(suggestor: &BookmarkSuggestor, term: &str) -> Vec<UrlSuggestion> {
        let working = AtomicBool::new(true);
        suggestor.get_suggestions(&working, &SearchRequest::new(term))
    }

    #[test]
    fn shortcut_wins_over_everything() {
        assert_eq!(classify("gh rust", "GitHub", "https://github.com", "gh"), MatchType::Shortcut);
        assert_eq!(classify("g", "Google", "https://google.com", "G"), MatchType::Shortcut);
        assert_eq!(classify("x", "Google", "https://google.com", ""), MatchType::None);
    }

    #[test]
    fn short_terms_need_exact_tokens() {
        assert_eq!(classify("faq", "Donate Today | FAQ", "https://charity.org/help", ""), MatchType::Title);
        assert_eq!(classify("org", "Charity", "https://charity.org/help", ""), MatchType::Url);
        // substring of a longer token only
        assert_eq!(classify("don", "Donate Today", "https://charity.org/help", ""), MatchType::None);
    }

    #[test]
    fn short_terms_match_tokens_split_at_digits() {
        assert_eq!(classify("html", "html5 guide", "https://example.com/", ""), MatchType::Title);
        assert_eq!(classify("HTML", "HTML5 GUIDE", "https://example.com/", ""), MatchType::Title);
        assert_eq!(classify("tml", "html5 guide", "https://example.com/", ""), MatchType::None);
    }

    #[test]
    fn url_substring_needs_a_large_enough_share() {
        // 11 of 19 characters
        assert_eq!(classify("github.com/", "Code", "https://github.com/", ""), MatchType::Url);
        // substring of the url, but too small a share; the hash fallback still finds it
        assert_eq!(
            classify("github", "Code", "https://github.com/rust-lang/rust/issues", ""),
            MatchType::Url
        );
    }

    #[test]
    fn search_words_need_half_of_the_tokens() {
        assert_eq!(
            classify("rust book", "The Rust Programming Language Book", "https://doc.rust-lang.org/book/", ""),
            MatchType::SearchWords
        );
        assert_eq!(
            classify("rust zzzz", "The Rust Programming Language", "https://doc.rust-lang.org/", ""),
            MatchType::SearchWords
        );
        // tokens of two characters never count
        assert_eq!(
            classify("qq zz rust", "Rust", "https://example.com", ""),
            MatchType::None
        );
    }

    #[test]
    fn falls_back_to_hash_match_on_title() {
        assert_eq!(classify("ogrammi", "Programming", "https://example.com", ""), MatchType::Title);
        assert_eq!(classify("nothing", "Programming", "https://example.com", ""), MatchType::None);
    }

    #[test]
    fn folders_are_skipped_and_tree_order_is_kept() {
        let root = BookmarkNode::folder(
            "root",
            vec![
                BookmarkNode::bookmark("Rust Docs", "https://doc.rust-lang.org"),
                BookmarkNode::folder(
                    "Rust",
                    vec![BookmarkNode::bookmark("Rust Blog", "https://blog.rust-lang.org")],
                ),
                BookmarkNode::bookmark("Rust Forum", "https://users.rust-lang.org"),
            ],
        );

        let hits = run(&suggestor_with(root, vec![]), "rust");
        let titles: Vec<&str> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, ["Rust Docs", "Rust Blog", "Rust Forum"]);
        assert!(hits.iter().all(|h| h.is_bookmark && h.match_type == MatchType::Title));
    }

    #[test]
    fn caps_hits_in_tree_order() {
        let children = (0..30)
            .map(|i| BookmarkNode::bookmark(format!("Example page {i}"), format!("https://example.com/{i}")))
            .collect();
        let hits = run(&suggestor_with(BookmarkNode::folder("root", children), vec![]), "example");

        assert_eq!(hits.len(), 20);
        assert_eq!(hits[0].title, "Example page 0");
        assert_eq!(hits[19].title, "Example page 19");
    }

    #[test]
    fn decorates_hits_with_history_metadata() {
        let root = BookmarkNode::folder(
            "root",
            vec![
                BookmarkNode::bookmark("GitHub", "https://www.github.com/")
                    .with_icon(Favicon::from_bytes(vec![1u8, 2, 3])),
                BookmarkNode::bookmark("GitHub Issues", "https://issues.github.com/"),
            ],
        );
        let record = HistoryEntry {
            url: "https://www.github.com/".to_string(),
            title: "GitHub".to_string(),
            last_visit: Utc::now(),
            visit_count: 12,
            url_typed_count: 3,
            visit_id: 99,
        };

        let hits = run(&suggestor_with(root, vec![record]), "github");
        assert_eq!(hits.len(), 2);

        assert_eq!(hits[0].visit_count, 12);
        assert_eq!(hits[0].url_typed_count, 3);
        assert_eq!(hits[0].history_id, 99);
        assert!(hits[0].is_host_match);
        assert_eq!(hits[0].favicon.bytes(), Some(&[1u8, 2, 3][..]));

        assert_eq!(hits[1].history_id, -1);
        assert_eq!(hits[1].visit_count, 0);
        assert!(!hits[1].is_host_match);
        assert!(hits[1].favicon.is_empty());
    }

    #[test]
    fn missing_store_yields_nothing() {
        let suggestor = BookmarkSuggestor::new(
            empty_slot(),
            empty_slot(),
            empty_slot(),
            Arc::new(SuggestConfig::default()),
        );
        assert!(run(&suggestor, "anything").is_empty());
    }

    #[test]
    fn cancelled_scan_returns_immediately() {
        let children = (0..10)
            .map(|i| BookmarkNode::bookmark(format!("Example {i}"), format!("https://example.com/{i}")))
            .collect();
        let suggestor = suggestor_with(BookmarkNode::folder("root", children), vec![]);

        let working = AtomicBool::new(false);
        assert!(suggestor.get_suggestions(&working, &SearchRequest::new("example")).is_empty());
    }
}
