//! The contract shared by every suggestion source, and the per-search state
//! they all read.

use crate::fast_hash::FastHashParameters;
use crate::tokenize::{TokenVec, tokenize_possible_url};
use crate::types::UrlSuggestion;
use std::sync::atomic::AtomicBool;

/// Everything derived from the user's input for one search pass.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub raw: String,
    /// Uppercased input, the needle every source matches with
    pub term: String,
    pub tokens: TokenVec,
    /// Whether the term starts like an explicit `http`, `file` or `viper` URL
    pub has_scheme: bool,
    pub hash: FastHashParameters,
}

impl SearchRequest {
    pub fn new(text: &str) -> Self {
        let term = text.to_uppercase();
        let tokens = tokenize_possible_url(&term);
        let has_scheme = ["HTTP", "FILE", "VIPER"]
            .iter()
            .any(|&scheme| term.starts_with(scheme));
        let hash = FastHashParameters::new(&term);

        Self {
            raw: text.to_string(),
            term,
            tokens,
            has_scheme,
            hash,
        }
    }

    /// Number of whitespace separated words the user typed.
    pub fn word_count(&self) -> usize {
        self.term.split_whitespace().count()
    }

    /// Length of the term in characters.
    #[inline]
    pub fn term_len(&self) -> usize {
        self.hash.needle.len()
    }
}

/// A collection that can be scanned for suggestions.
///
/// Implementations run synchronously on the worker's scan thread. They must
/// check `working` at least once per element of their collection and return
/// what they have so far as soon as it reads `false`.
pub trait SuggestionSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn get_suggestions(&self, working: &AtomicBool, request: &SearchRequest) -> Vec<UrlSuggestion>;

    /// Number of hits kept after the worker sorts this source's batch.
    fn max_results(&self) -> Option<usize> {
        None
    }
}

/// Whether the host of `url`, uppercased and without a leading `WWW.`, starts
/// with `term`. The `WWW.` prefix is kept when the term itself starts with `WWW`.
pub fn is_host_match(term: &str, url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };

    let host = host.to_uppercase();
    let host = if term.starts_with("WWW") {
        host.as_str()
    } else {
        host.strip_prefix("WWW.").unwrap_or(&host)
    };

    host.starts_with(term)
}

/// `term_len / haystack_len` in characters, 0 for an empty haystack.
#[inline]
pub(crate) fn length_ratio(term_len: usize, haystack: &str) -> f64 {
    let haystack_len = haystack.chars().count();
    if haystack_len == 0 {
        return 0.0;
    }
    term_len as f64 / haystack_len as f64
}
