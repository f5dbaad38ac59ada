use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::distributions::Alphanumeric;
use rand::prelude::*;
use rand::rngs::SmallRng;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use viper_suggest::store::{empty_slot, shared};
use viper_suggest::{
    FastHashParameters, HistoryEntry, HistoryStore, HistorySuggestor, MemoryHistoryStore,
    SearchRequest, SharedWordIndex, SuggestConfig, SuggestionSource, tokenize_possible_url,
};

fn random_word(rng: &mut SmallRng, min: usize, max: usize) -> String {
    let len = rng.gen_range(min..max);
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

fn random_url(rng: &mut SmallRng) -> String {
    let host = random_word(rng, 5, 15);
    let path = random_word(rng, 10, 80);
    format!("HTTPS://WWW.{}.COM/{}", host.to_uppercase(), path.to_uppercase())
}

fn bench_is_match(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(42);
    let haystacks: Vec<String> = (0..1000).map(|_| random_url(&mut rng)).collect();
    let haystack_chars: Vec<Vec<char>> = haystacks.iter().map(|h| h.chars().collect()).collect();

    let mut group = c.benchmark_group("is_match");
    group.throughput(Throughput::Elements(haystacks.len() as u64));

    for needle in ["GIT", "GITHUB.COM", "RUST-LANG.ORG/LEARN/GET-STARTED"] {
        let params = FastHashParameters::new(needle);

        group.bench_with_input(BenchmarkId::new("rolling_hash", needle.len()), &params, |b, params| {
            b.iter(|| {
                haystack_chars
                    .iter()
                    .filter(|h| params.is_match_in(black_box(h)))
                    .count()
            });
        });

        group.bench_with_input(BenchmarkId::new("str_contains", needle.len()), needle, |b, needle| {
            b.iter(|| haystacks.iter().filter(|h| black_box(h).contains(needle)).count());
        });
    }

    group.finish();
}

fn bench_tokenize(c: &mut Criterion) {
    let inputs = [
        "github",
        "https://www.github.com/rust-lang/rust/issues?q=is:open&label=T-compiler",
        "Donate Today | FAQ",
        "viper://settings/page2section3",
    ];

    c.bench_function("tokenize_possible_url", |b| {
        b.iter(|| {
            for input in &inputs {
                black_box(tokenize_possible_url(black_box(input)));
            }
        });
    });
}

fn bench_history_scan(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(7);
    let now = chrono::Utc::now();
    let entries: Vec<HistoryEntry> = (0..10_000)
        .map(|i| HistoryEntry {
            url: random_url(&mut rng).to_lowercase(),
            title: format!("Page {i}"),
            last_visit: now,
            visit_count: rng.gen_range(1..50),
            url_typed_count: 0,
            visit_id: i,
        })
        .collect();

    let store: Arc<dyn HistoryStore> = Arc::new(MemoryHistoryStore::new(entries));
    let suggestor = HistorySuggestor::new(
        shared(store),
        empty_slot(),
        Arc::new(SharedWordIndex::new()),
        Arc::new(SuggestConfig::default()),
    );
    let working = AtomicBool::new(true);

    let mut group = c.benchmark_group("history_scan");
    for term in ["zz", "qwerty", "page 9999"] {
        let request = SearchRequest::new(term);
        group.bench_with_input(BenchmarkId::from_parameter(term), &request, |b, request| {
            b.iter(|| black_box(suggestor.get_suggestions(&working, request)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_is_match, bench_tokenize, bench_history_scan);
criterion_main!(benches);
