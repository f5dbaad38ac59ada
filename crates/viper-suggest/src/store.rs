//! Interfaces of the bookmark, history and favicon collaborators, plus the
//! in-memory implementations used by tests, benches and the profiler.
//!
//! Collaborators live in shared late-bound slots: a source created before its
//! store exists simply sees `None` and returns no suggestions.

use crate::types::{BookmarkNode, Favicon, HistoryEntry};
use crate::word_index::HistoryWordIndex;
use ahash::AHashMap;
use std::sync::{Arc, RwLock};

pub trait BookmarkStore: Send + Sync {
    /// Snapshot of the bookmark tree, safe to walk from the scan thread.
    fn root(&self) -> Arc<BookmarkNode>;
}

pub trait HistoryStore: Send + Sync {
    /// Snapshot of every history record.
    fn entries(&self) -> Arc<Vec<HistoryEntry>>;

    /// History metadata for a single URL, used to decorate bookmark hits.
    fn entry(&self, url: &str) -> Option<HistoryEntry>;

    /// Loads the word association index. `None` when the store has none.
    fn load_word_index(&self) -> Option<HistoryWordIndex>;
}

pub trait FaviconStore: Send + Sync {
    fn favicon(&self, url: &str) -> Favicon;
}

pub type SharedBookmarkStore = Arc<RwLock<Option<Arc<dyn BookmarkStore>>>>;
pub type SharedHistoryStore = Arc<RwLock<Option<Arc<dyn HistoryStore>>>>;
pub type SharedFaviconStore = Arc<RwLock<Option<Arc<dyn FaviconStore>>>>;

/// Wrap a store into a shared slot.
pub fn shared<T: ?Sized>(store: Arc<T>) -> Arc<RwLock<Option<Arc<T>>>> {
    Arc::new(RwLock::new(Some(store)))
}

/// A slot that has not been filled yet.
pub fn empty_slot<T: ?Sized>() -> Arc<RwLock<Option<Arc<T>>>> {
    Arc::new(RwLock::new(None))
}

/// Clone the store out of its slot so no lock is held during a scan.
pub fn current<T: ?Sized>(slot: &RwLock<Option<Arc<T>>>) -> Option<Arc<T>> {
    match slot.read() {
        Ok(guard) => guard.as_ref().map(Arc::clone),
        Err(_) => {
            tracing::warn!("Collaborator slot lock is poisoned, treating store as missing");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoFavicons;

impl FaviconStore for NoFavicons {
    fn favicon(&self, _url: &str) -> Favicon {
        Favicon::empty()
    }
}

#[derive(Debug)]
pub struct MemoryBookmarkStore {
    root: parking_lot::RwLock<Arc<BookmarkNode>>,
}

impl MemoryBookmarkStore {
    pub fn new(root: BookmarkNode) -> Self {
        Self {
            root: parking_lot::RwLock::new(Arc::new(root)),
        }
    }

    /// Swap in a new tree. Scans holding the previous snapshot keep reading it.
    pub fn replace(&self, root: BookmarkNode) {
        *self.root.write() = Arc::new(root);
    }
}

impl BookmarkStore for MemoryBookmarkStore {
    fn root(&self) -> Arc<BookmarkNode> {
        Arc::clone(&self.root.read())
    }
}

#[derive(Debug, Default)]
struct HistorySnapshot {
    entries: Arc<Vec<HistoryEntry>>,
    by_url: AHashMap<String, usize>,
}

impl HistorySnapshot {
    fn new(entries: Vec<HistoryEntry>) -> Self {
        let by_url = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.url.clone(), index))
            .collect();

        Self {
            entries: Arc::new(entries),
            by_url,
        }
    }
}

/// History kept in memory. Writers build a full replacement snapshot and swap
/// it in, so the scan thread never sees a half-updated collection.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    snapshot: parking_lot::RwLock<Arc<HistorySnapshot>>,
}

impl MemoryHistoryStore {
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        let mut deduped: Vec<HistoryEntry> = Vec::with_capacity(entries.len());
        let mut positions: AHashMap<String, usize> = AHashMap::with_capacity(entries.len());
        for entry in entries {
            match positions.get(&entry.url) {
                Some(&index) => deduped[index] = entry,
                None => {
                    positions.insert(entry.url.clone(), deduped.len());
                    deduped.push(entry);
                }
            }
        }

        Self {
            snapshot: parking_lot::RwLock::new(Arc::new(HistorySnapshot::new(deduped))),
        }
    }

    /// Insert a record or replace the record with the same URL.
    pub fn upsert(&self, entry: HistoryEntry) {
        let mut current = self.snapshot.write();
        let mut entries = current.entries.as_ref().clone();
        match current.by_url.get(&entry.url) {
            Some(&index) => entries[index] = entry,
            None => entries.push(entry),
        }

        *current = Arc::new(HistorySnapshot::new(entries));
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn entries(&self) -> Arc<Vec<HistoryEntry>> {
        Arc::clone(&self.snapshot.read().entries)
    }

    fn entry(&self, url: &str) -> Option<HistoryEntry> {
        let snapshot = Arc::clone(&self.snapshot.read());
        snapshot
            .by_url
            .get(url)
            .and_then(|&index| snapshot.entries.get(index))
            .cloned()
    }

    fn load_word_index(&self) -> Option<HistoryWordIndex> {
        let entries = self.entries();
        Some(HistoryWordIndex::build(&entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(url: &str, visits: i32) -> HistoryEntry {
        HistoryEntry {
            url: url.to_string(),
            title: String::new(),
            last_visit: Utc::now(),
            visit_count: visits,
            url_typed_count: 0,
            visit_id: visits as i64,
        }
    }

    #[test]
    fn history_lookup_by_url() {
        let store = MemoryHistoryStore::new(vec![entry("https://a.com", 1), entry("https://b.com", 2)]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.entry("https://b.com").map(|e| e.visit_count), Some(2));
        assert!(store.entry("https://c.com").is_none());
    }

    #[test]
    fn duplicate_urls_keep_the_last_record() {
        let store = MemoryHistoryStore::new(vec![entry("https://a.com", 1), entry("https://a.com", 5)]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.entry("https://a.com").map(|e| e.visit_count), Some(5));
    }

    #[test]
    fn upsert_does_not_touch_existing_snapshots() {
        let store = MemoryHistoryStore::new(vec![entry("https://a.com", 1)]);
        let before = store.entries();

        store.upsert(entry("https://b.com", 2));
        store.upsert(entry("https://a.com", 3));

        assert_eq!(before.len(), 1);
        assert_eq!(before[0].visit_count, 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.entry("https://a.com").map(|e| e.visit_count), Some(3));
    }

    #[test]
    fn empty_slot_has_no_store() {
        let slot: SharedHistoryStore = empty_slot();
        assert!(current(&slot).is_none());

        let store: Arc<dyn HistoryStore> = Arc::new(MemoryHistoryStore::default());
        *slot.write().unwrap() = Some(store);
        assert!(current(&slot).is_some());
    }
}
