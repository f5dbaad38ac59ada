//! Tunables for the suggestion sources and the worker.
//!
//! Every field defaults to the value the address bar ships with, so an empty
//! TOML document yields the stock behaviour.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A century, far beyond any history the browser keeps.
const MAX_STALE_AFTER_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuggestConfig {
    /// Hard cap on bookmark hits, first found first served
    pub bookmark_max_hits: usize,
    /// Hard cap on history hits collected during the scan
    pub history_max_hits: usize,
    /// History hits kept after sorting by visit count
    pub history_max_results: usize,

    /// Search terms shorter than this only match whole tokens
    pub short_term_len: usize,
    pub bookmark_url_ratio: f64,
    pub bookmark_words_ratio: f64,
    pub bookmark_min_word_len: usize,

    pub history_url_ratio: f64,
    pub history_words_score_ratio: f64,
    /// Number of characters after the scheme in which a URL hit counts as a host hit
    pub history_host_window: usize,
    pub history_word_min_term_len: usize,
    /// Whitespace separated words the query needs before the word index is
    /// consulted. `github.com` is one word even though it has two tokens.
    pub history_word_min_words: usize,

    pub stale_after_days: i64,
    pub stale_min_visits: i32,
    pub stale_min_typed: i32,

    pub word_index_refresh_secs: u64,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            bookmark_max_hits: 20,
            history_max_hits: 75,
            history_max_results: 25,
            short_term_len: 5,
            bookmark_url_ratio: 0.325,
            bookmark_words_ratio: 0.5,
            bookmark_min_word_len: 3,
            history_url_ratio: 0.25,
            history_words_score_ratio: 0.275,
            history_host_window: 10,
            history_word_min_term_len: 5,
            history_word_min_words: 2,
            stale_after_days: 3,
            stale_min_visits: 4,
            stale_min_typed: 1,
            word_index_refresh_secs: 300,
        }
    }
}

impl SuggestConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: SuggestConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(?path, ?config, "Loaded suggestion config");
        Ok(config)
    }

    /// `<config dir>/viper/suggest.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("viper").join("suggest.toml"))
    }

    /// Load the user's config file if there is one, the defaults otherwise.
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!(?path, "No suggestion config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<()> {
        let ratios = [
            ("bookmark_url_ratio", self.bookmark_url_ratio),
            ("bookmark_words_ratio", self.bookmark_words_ratio),
            ("history_url_ratio", self.history_url_ratio),
            ("history_words_score_ratio", self.history_words_score_ratio),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be within 0.0..=1.0, got {value}"
                )));
            }
        }

        let caps = [
            ("bookmark_max_hits", self.bookmark_max_hits),
            ("history_max_hits", self.history_max_hits),
            ("history_max_results", self.history_max_results),
        ];
        for (name, value) in caps {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be non zero")));
            }
        }

        if !(0..=MAX_STALE_AFTER_DAYS).contains(&self.stale_after_days) {
            return Err(Error::InvalidConfig(format!(
                "stale_after_days must be within 0..={MAX_STALE_AFTER_DAYS}, got {}",
                self.stale_after_days
            )));
        }

        if self.word_index_refresh_secs == 0 {
            return Err(Error::InvalidConfig(
                "word_index_refresh_secs must be non zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn word_index_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.word_index_refresh_secs)
    }

    /// `None` when the configured age does not fit a `chrono::Duration`.
    pub fn stale_after(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_days(self.stale_after_days)
    }
}
