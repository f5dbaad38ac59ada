use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Opaque icon handle handed out by the favicon store. The engine only
/// clones it into suggestions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Favicon(Option<Arc<[u8]>>);

impl Favicon {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(Some(bytes.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.0.as_deref()
    }
}

/// The signal that caused a candidate to be suggested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchType {
    #[default]
    None,
    Shortcut,
    Title,
    Url,
    SearchWords,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::None => "none",
            MatchType::Shortcut => "shortcut",
            MatchType::Title => "title",
            MatchType::Url => "url",
            MatchType::SearchWords => "search_words",
        }
    }
}

/// A suggestion produced by one search pass. Never mutated after the source
/// that built it returns.
#[derive(Debug, Clone)]
pub struct UrlSuggestion {
    pub favicon: Favicon,
    pub title: String,
    pub url: String,
    pub last_visit: DateTime<Utc>,
    pub url_typed_count: i32,
    pub visit_count: i32,
    /// 0..=100, only set by the word-overlap history match
    pub percent_match: i32,
    pub is_host_match: bool,
    pub is_bookmark: bool,
    pub match_type: MatchType,
    /// `-1` when the suggestion has no history record
    pub history_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkNodeType {
    Folder,
    Bookmark,
}

/// A node of the bookmark tree snapshot. Folders carry children, bookmarks
/// carry a URL.
#[derive(Debug, Clone)]
pub struct BookmarkNode {
    pub node_type: BookmarkNodeType,
    pub name: String,
    pub url: String,
    pub shortcut: String,
    pub icon: Favicon,
    pub children: Vec<BookmarkNode>,
}

impl BookmarkNode {
    pub fn folder(name: impl Into<String>, children: Vec<BookmarkNode>) -> Self {
        Self {
            node_type: BookmarkNodeType::Folder,
            name: name.into(),
            url: String::new(),
            shortcut: String::new(),
            icon: Favicon::empty(),
            children,
        }
    }

    pub fn bookmark(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            node_type: BookmarkNodeType::Bookmark,
            name: name.into(),
            url: url.into(),
            shortcut: String::new(),
            icon: Favicon::empty(),
            children: Vec::new(),
        }
    }

    pub fn with_shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcut = shortcut.into();
        self
    }

    pub fn with_icon(mut self, icon: Favicon) -> Self {
        self.icon = icon;
        self
    }

    #[inline]
    pub fn is_folder(&self) -> bool {
        self.node_type == BookmarkNodeType::Folder
    }
}

/// One record of the browsing history, keyed by URL.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
    pub last_visit: DateTime<Utc>,
    pub visit_count: i32,
    pub url_typed_count: i32,
    pub visit_id: i64,
}
