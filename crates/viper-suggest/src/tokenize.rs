//! Splits URLs and page titles into coarse word tokens.

use smallvec::SmallVec;

/// Token list, stack-allocated for the usual handful of words in a query
pub type TokenVec = SmallVec<[String; 8]>;

#[inline]
fn is_url_delimiter(c: char) -> bool {
    matches!(c, '?' | '=' | '&' | '.' | '/' | ':' | '-')
}

#[inline]
fn is_letter_digit_boundary(prev: char, next: char) -> bool {
    (prev.is_ascii_alphabetic() && next.is_ascii_digit())
        || (prev.is_ascii_digit() && next.is_ascii_alphabetic())
}

/// Tokenize a string that may be a URL.
///
/// Runs of URL punctuation collapse into one space, a space is inserted at
/// every letter/digit boundary (`Page2Title` -> `Page 2 Title`), and the result
/// is split on spaces with empty tokens dropped. Case is preserved and tokens
/// are not deduplicated.
///
/// The letter/digit split ignores case, so `v8engine` and `V8ENGINE` give the
/// same tokens modulo case. Upper/lower transitions (`camelCase`) never split.
/// Callers that match case-insensitively can tokenize before or after
/// uppercasing and get the same words.
pub fn tokenize_possible_url(input: &str) -> TokenVec {
    let mut normalized = String::with_capacity(input.len() + 8);
    let mut prev: Option<char> = None;
    let mut in_delimiter_run = false;

    for c in input.chars() {
        if is_url_delimiter(c) {
            if !in_delimiter_run {
                normalized.push(' ');
                in_delimiter_run = true;
            }
            prev = Some(' ');
            continue;
        }
        in_delimiter_run = false;

        if let Some(p) = prev
            && is_letter_digit_boundary(p, c)
        {
            normalized.push(' ');
        }

        normalized.push(c);
        prev = Some(c);
    }

    normalized
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}
