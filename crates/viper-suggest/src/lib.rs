//! viper-suggest - address bar suggestion engine
//!
//! Matches what the user types against bookmarks and browsing history and
//! hands back a ranked list of URL suggestions. Searches run on a background
//! thread and are cancelled as soon as the input changes.

pub mod bookmark_suggestor;
pub mod config;
mod error;
pub mod fast_hash;
pub mod history_suggestor;
pub mod log;
pub mod source;
pub mod store;
pub mod tokenize;
pub mod types;
pub mod word_index;
pub mod worker;

pub use bookmark_suggestor::BookmarkSuggestor;
pub use config::SuggestConfig;
pub use error::{Error, Result};
pub use fast_hash::FastHashParameters;
pub use history_suggestor::HistorySuggestor;
pub use source::{SearchRequest, SuggestionSource};
pub use store::{
    BookmarkStore, FaviconStore, HistoryStore, MemoryBookmarkStore, MemoryHistoryStore,
    NoFavicons,
};
pub use tokenize::tokenize_possible_url;
pub use types::{BookmarkNode, BookmarkNodeType, Favicon, HistoryEntry, MatchType, UrlSuggestion};
pub use word_index::{HistoryWordIndex, SharedWordIndex, WordIndexRefresher};
pub use worker::{SuggestionCallback, SuggestionWorker};
