/// Suggestion latency profiler
///
/// Builds a synthetic browsing history and bookmark tree, then runs every
/// query through the suggestion worker the way the address bar does and
/// prints how long each one took to publish.
///
/// Usage:
///   cargo run --release --bin suggest_profiler                      # 50k entries, default queries
///   cargo run --release --bin suggest_profiler -- 200000 "rust docs" github
use chrono::{Duration as ChronoDuration, Utc};
use mimalloc::MiMalloc;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use viper_suggest::store::{empty_slot, shared};
use viper_suggest::{
    BookmarkNode, BookmarkStore, HistoryEntry, HistoryStore, MemoryBookmarkStore,
    MemoryHistoryStore, SharedWordIndex, SuggestConfig, SuggestionCallback, SuggestionWorker,
    UrlSuggestion, WordIndexRefresher,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const DEFAULT_ENTRIES: usize = 50_000;

const DEFAULT_QUERIES: &[&str] = &[
    "g",
    "git",
    "github",
    "github.com/rust",
    "rust docs",
    "https://docs.rs",
    "news today",
    "nothing-matches-this",
];

const HOSTS: &[&str] = &[
    "github.com",
    "www.rust-lang.org",
    "docs.rs",
    "news.ycombinator.com",
    "en.wikipedia.org",
    "www.reddit.com",
    "stackoverflow.com",
    "crates.io",
    "lobste.rs",
    "www.youtube.com",
];

const WORDS: &[&str] = &[
    "rust", "async", "docs", "news", "today", "release", "compiler", "search", "browser",
    "engine", "memory", "thread", "parser", "history", "bookmark", "tutorial", "guide",
];

fn synthetic_history(count: usize) -> Vec<HistoryEntry> {
    let now = Utc::now();
    (0..count)
        .map(|i| {
            let host = HOSTS[i % HOSTS.len()];
            let first = WORDS[i % WORDS.len()];
            let second = WORDS[(i / WORDS.len()) % WORDS.len()];
            HistoryEntry {
                url: format!("https://{host}/{first}/{second}-{i}"),
                title: format!("{first} {second} | {host}"),
                last_visit: now - ChronoDuration::hours((i % 24 * 14) as i64),
                visit_count: (i % 37) as i32,
                url_typed_count: (i % 5 == 0) as i32,
                visit_id: i as i64,
            }
        })
        .collect()
}

fn synthetic_bookmarks() -> BookmarkNode {
    let folders = HOSTS
        .iter()
        .map(|host| {
            let children = WORDS
                .iter()
                .map(|word| BookmarkNode::bookmark(format!("{word} on {host}"), format!("https://{host}/{word}")))
                .collect();
            BookmarkNode::folder(*host, children)
        })
        .collect();
    BookmarkNode::folder("Bookmarks", folders)
}

fn main() {
    let log_path = std::env::temp_dir().join("viper-suggest-profiler.log");
    match viper_suggest::log::init_tracing(&log_path.to_string_lossy(), Some("info")) {
        Ok(path) => eprintln!("Logging to {path}"),
        Err(e) => eprintln!("Tracing disabled: {e}"),
    }
    viper_suggest::log::install_panic_hook();

    let mut args = std::env::args().skip(1).peekable();
    let entries = match args.peek().map(|arg| arg.parse::<usize>()) {
        Some(Ok(n)) => {
            args.next();
            n
        }
        _ => DEFAULT_ENTRIES,
    };
    let queries: Vec<String> = args.collect();
    let queries: Vec<String> = if queries.is_empty() {
        DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect()
    } else {
        queries
    };

    let config = match SuggestConfig::load_or_default(None) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config, using defaults: {e}");
            SuggestConfig::default()
        }
    };

    println!("=== Suggestion profiler ===");
    let start = Instant::now();
    let history: Arc<dyn HistoryStore> = Arc::new(MemoryHistoryStore::new(synthetic_history(entries)));
    let bookmarks: Arc<dyn BookmarkStore> = Arc::new(MemoryBookmarkStore::new(synthetic_bookmarks()));
    println!("Built {entries} history entries in {:?}", start.elapsed());

    let history = shared(history);
    let word_index = Arc::new(SharedWordIndex::new());
    let start = Instant::now();
    let refresher = match WordIndexRefresher::spawn(
        Arc::clone(&history),
        Arc::clone(&word_index),
        config.word_index_refresh_interval(),
    ) {
        Ok(refresher) => refresher,
        Err(e) => {
            eprintln!("Failed to start the word index refresher: {e}");
            std::process::exit(1);
        }
    };
    while word_index.snapshot().is_empty() && start.elapsed() < Duration::from_secs(60) {
        std::thread::sleep(Duration::from_millis(10));
    }
    let index = word_index.snapshot();
    println!(
        "Word index: {} words for {} entries in {:?}",
        index.word_count(),
        index.entry_count(),
        start.elapsed()
    );

    let (tx, rx) = mpsc::channel::<Vec<UrlSuggestion>>();
    let tx = std::sync::Mutex::new(tx);
    let on_ready: SuggestionCallback = Arc::new(move |results| {
        if let Ok(tx) = tx.lock() {
            let _ = tx.send(results);
        }
    });

    let mut worker = SuggestionWorker::with_stores(
        shared(bookmarks),
        history,
        empty_slot(),
        word_index,
        config,
        on_ready,
    );

    println!();
    println!("{:<28} {:>8} {:>10} {:>12}", "query", "hits", "bookmarks", "latency");
    println!("{}", "-".repeat(62));

    for query in &queries {
        let start = Instant::now();
        if let Err(e) = worker.find_suggestions_for(query) {
            eprintln!("{query}: {e}");
            continue;
        }

        match rx.recv_timeout(Duration::from_secs(30)) {
            Ok(results) => {
                let bookmark_hits = results.iter().filter(|r| r.is_bookmark).count();
                println!(
                    "{:<28} {:>8} {:>10} {:>12.2?}",
                    query,
                    results.len(),
                    bookmark_hits,
                    start.elapsed()
                );
            }
            Err(_) => println!("{query:<28} timed out"),
        }
    }

    drop(worker);
    drop(refresher);
}
