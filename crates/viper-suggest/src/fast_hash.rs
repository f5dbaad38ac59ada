//! Rabin-Karp substring matching for short needles against URLs and titles.
//!
//! The needle hash and the difference hash only depend on the search term, so
//! they are computed once per search in [`FastHashParameters`] and reused for
//! every haystack the suggestion sources look at.

/// Radix of the polynomial hash.
pub const RADIX: u64 = 256;

/// Modulus of the polynomial hash. Small enough that `hash * RADIX + char`
/// and `char * difference_hash` never leave 64-bit range.
pub const PRIME: u64 = 89_999_027;

/// Precomputed values for one needle. Must be rebuilt whenever the needle changes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FastHashParameters {
    pub needle: Vec<char>,
    pub needle_hash: u64,
    pub difference_hash: u64,
}

impl FastHashParameters {
    pub fn new(needle: &str) -> Self {
        let needle: Vec<char> = needle.chars().collect();
        let needle_hash = compute_needle_hash(&needle);
        let difference_hash = compute_difference_hash(needle.len() as u64);

        Self {
            needle,
            needle_hash,
            difference_hash,
        }
    }

    /// Checks whether the needle occurs in `haystack`. The comparison is
    /// ordinal, so callers uppercase both sides for case-insensitive matching.
    #[inline]
    pub fn is_match_in(&self, haystack: &[char]) -> bool {
        is_match(
            &self.needle,
            haystack,
            self.needle_hash,
            self.difference_hash,
        )
    }

    /// Same as [`Self::is_match_in`] for a haystack that is still a `str`.
    pub fn is_match_str(&self, haystack: &str) -> bool {
        let haystack: Vec<char> = haystack.chars().collect();
        self.is_match_in(&haystack)
    }
}

/// `RADIX^(needle_len - 1) mod PRIME`, or 1 for needles of length 0 or 1.
pub fn compute_difference_hash(needle_len: u64) -> u64 {
    let mut hash = 1u64;
    for _ in 1..needle_len {
        hash = (hash * RADIX) % PRIME;
    }
    hash
}

pub fn compute_needle_hash(needle: &[char]) -> u64 {
    needle
        .iter()
        .fold(0u64, |hash, &c| (hash * RADIX + c as u64) % PRIME)
}

/// Rolling hash search of `needle` inside `haystack`.
///
/// Every hash hit is confirmed with a full comparison, so collisions never
/// produce a false positive.
pub fn is_match(needle: &[char], haystack: &[char], needle_hash: u64, difference_hash: u64) -> bool {
    let needle_len = needle.len();
    let haystack_len = haystack.len();

    if needle_len > haystack_len {
        return false;
    }
    if needle_len == 0 {
        return true;
    }

    let mut window_hash = compute_needle_hash(&haystack[..needle_len]);
    let last_window = haystack_len - needle_len;

    for i in 0..=last_window {
        if window_hash == needle_hash && haystack[i..i + needle_len] == *needle {
            return true;
        }

        if i < last_window {
            let leading = haystack[i] as u64;
            let trailing = haystack[i + needle_len] as u64;
            window_hash = (window_hash + PRIME - (difference_hash * leading) % PRIME) % PRIME;
            window_hash = (window_hash * RADIX + trailing) % PRIME;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn matches(needle: &str, haystack: &str) -> bool {
        FastHashParameters::new(needle).is_match_str(haystack)
    }

    #[test]
    fn difference_hash_small_lengths() {
        assert_eq!(compute_difference_hash(0), 1);
        assert_eq!(compute_difference_hash(1), 1);
        assert_eq!(compute_difference_hash(2), 256);
        assert_eq!(compute_difference_hash(3), 65_536);
        assert_eq!(compute_difference_hash(4), 16_777_216);
        // 256^4 = 4294967296, reduced modulo the prime
        assert_eq!(compute_difference_hash(5), 4_294_967_296 % PRIME);
    }

    #[test]
    fn needle_hash_is_polynomial() {
        assert_eq!(compute_needle_hash(&[]), 0);
        assert_eq!(compute_needle_hash(&chars("A")), 65);
        assert_eq!(compute_needle_hash(&chars("AB")), (65 * 256 + 66) % PRIME);
        let expected = ((65 * 256 + 66) % PRIME * 256 + 67) % PRIME;
        assert_eq!(compute_needle_hash(&chars("ABC")), expected);
    }

    #[test]
    fn hash_parameters_are_deterministic() {
        let a = FastHashParameters::new("VIPER-BROWSER");
        let b = FastHashParameters::new("VIPER-BROWSER");
        assert_eq!(a, b);
        assert_eq!(compute_difference_hash(42), compute_difference_hash(42));
    }

    #[test]
    fn empty_needle_always_matches() {
        assert!(matches("", ""));
        assert!(matches("", "anything"));
    }

    #[test]
    fn longer_needle_never_matches() {
        assert!(!matches("abcd", "abc"));
        assert!(!matches("a", ""));
    }

    #[test]
    fn finds_substring_at_every_position() {
        assert!(matches("HTTPS", "HTTPS://GITHUB.COM"));
        assert!(matches("GITHUB", "HTTPS://GITHUB.COM"));
        assert!(matches(".COM", "HTTPS://GITHUB.COM"));
        assert!(matches("HTTPS://GITHUB.COM", "HTTPS://GITHUB.COM"));
        assert!(!matches("GITLAB", "HTTPS://GITHUB.COM"));
    }

    #[test]
    fn comparison_is_case_sensitive() {
        assert!(!matches("github", "HTTPS://GITHUB.COM"));
        assert!(matches("GitHub", "Welcome to GitHub"));
    }

    #[test]
    fn handles_wide_characters() {
        assert!(matches("ÜBER", "ALLES ÜBER RUST"));
        assert!(matches("日本", "ようこそ日本へ"));
        assert!(!matches("日本語", "ようこそ日本へ"));
    }

    #[test]
    fn random_substrings_match_and_mutations_do_not() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let alphabet: Vec<char> = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789./:-".chars().collect();

        for _ in 0..500 {
            let len = rng.gen_range(1..200);
            let haystack: Vec<char> = (0..len)
                .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                .collect();

            let start = rng.gen_range(0..haystack.len());
            let end = rng.gen_range(start + 1..=haystack.len());
            let needle = &haystack[start..end];
            let params = FastHashParameters {
                needle: needle.to_vec(),
                needle_hash: compute_needle_hash(needle),
                difference_hash: compute_difference_hash(needle.len() as u64),
            };
            assert!(params.is_match_in(&haystack));

            // a character outside the alphabet can never occur in the haystack
            let mut mutated = needle.to_vec();
            let pos = rng.gen_range(0..mutated.len());
            mutated[pos] = '#';
            let mutated_params = FastHashParameters {
                needle_hash: compute_needle_hash(&mutated),
                difference_hash: compute_difference_hash(mutated.len() as u64),
                needle: mutated,
            };
            assert!(!mutated_params.is_match_in(&haystack));
        }
    }

    #[test]
    fn agrees_with_naive_search() {
        let mut rng = SmallRng::seed_from_u64(7);
        let alphabet: Vec<char> = "AB".chars().collect();

        for _ in 0..1000 {
            let haystack: String = (0..rng.gen_range(0..24))
                .map(|_| alphabet[rng.gen_range(0..2)])
                .collect();
            let needle: String = (0..rng.gen_range(0..6))
                .map(|_| alphabet[rng.gen_range(0..2)])
                .collect();

            assert_eq!(
                matches(&needle, &haystack),
                haystack.contains(&needle),
                "needle {needle:?} haystack {haystack:?}"
            );
        }
    }
}
