//! Token-overlap similarity between free-text strings.
//!
//! Measures how similar two strings are by tokenizing both and computing
//! the ratio of tokens in common to the total token count (a Dice-style
//! coefficient over bags of tokens). Scores are in [0, 1] and exactly
//! symmetric in the arguments.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// A whitespace-delimited path followed by whitespace; the capture is the
/// trailing filename segment. Only the first occurrence is collapsed, and a
/// path at end-of-string is left intact.
fn path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\S+/(\S+)\s").expect("path pattern is valid"))
}

/// Token separators: runs of whitespace, comma, slash, and pipe.
fn separator_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\s/,|]+").expect("separator pattern is valid"))
}

/// Replace a path like `/foo/bar/baz.html` with just `baz.html`, padded
/// with spaces so the filename becomes a standalone token.
fn collapse_path(text: &str) -> std::borrow::Cow<'_, str> {
    path_pattern().replace(text, " ${1} ")
}

fn tokenize(text: &str) -> Vec<&str> {
    separator_pattern()
        .split(text)
        .filter(|token| !token.is_empty())
        .collect()
}

fn token_counts<'a>(tokens: &[&'a str]) -> HashMap<&'a str, usize> {
    let mut counts = HashMap::new();
    for token in tokens {
        *counts.entry(*token).or_insert(0) += 1;
    }
    counts
}

/// Similarity of two strings in [0, 1].
///
/// Zero when either string tokenizes to nothing; 1.0 when the token bags
/// are identical. `similarity(a, b) == similarity(b, a)` for all inputs.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = collapse_path(a);
    let b = collapse_path(b);

    let tokens_a = tokenize(&a);
    let tokens_b = tokenize(&b);

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let counts_a = token_counts(&tokens_a);
    let counts_b = token_counts(&tokens_b);

    let overlap: usize = counts_a
        .iter()
        .filter_map(|(token, &count_a)| {
            counts_b.get(token).map(|&count_b| 2 * count_a.min(count_b))
        })
        .sum();

    overlap as f64 / (tokens_a.len() + tokens_b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_score_one() {
        assert_eq!(similarity("foo bar baz", "foo bar baz"), 1.0);
        assert_eq!(similarity("foo foo bar", "foo foo bar"), 1.0);
    }

    #[test]
    fn test_symmetry() {
        let pairs = [
            ("TEST-UNEXPECTED-FAIL /a/b/foo.js line 10", "foo.js line 10 fail"),
            ("alpha beta", "beta gamma delta"),
            ("a,b|c/d", "d c b"),
            ("", "anything"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a), "asymmetric for {a:?} / {b:?}");
        }
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        assert_eq!(similarity("", ""), 0.0);
        assert_eq!(similarity("", "foo"), 0.0);
        assert_eq!(similarity("foo", ""), 0.0);
        // separators only tokenize to nothing
        assert_eq!(similarity(" ,| / ", "foo"), 0.0);
    }

    #[test]
    fn test_no_shared_tokens_score_zero() {
        assert_eq!(similarity("alpha beta", "gamma delta"), 0.0);
    }

    #[test]
    fn test_separators() {
        // comma, slash, and pipe all separate tokens
        assert_eq!(similarity("a,b|c", "a b c"), 1.0);
    }

    #[test]
    fn test_multiplicity_counts() {
        // "foo foo" vs "foo": overlap = 2*min(2,1) = 2, total = 3
        let score = similarity("foo foo", "foo");
        assert!((score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_path_collapsed_to_filename() {
        // With the path collapsed the tokens are
        // [TEST-UNEXPECTED-FAIL, foo.js, line, 10] vs [foo.js, line, 10, fail]:
        // overlap 6 over 8 tokens. Without collapsing, the slash-split path
        // would contribute the extra tokens a and b and drop the score to 0.6.
        let score = similarity(
            "TEST-UNEXPECTED-FAIL /a/b/foo.js line 10",
            "foo.js line 10 fail",
        );
        assert!((score - 0.75).abs() < 1e-12);
        assert!(score > 0.6);
    }

    #[test]
    fn test_path_at_end_of_string_not_collapsed() {
        // The collapse requires trailing whitespace; here the slash-splitting
        // tokenizer still yields [fail, a, b, foo.js] vs [foo.js]
        let score = similarity("fail /a/b/foo.js", "foo.js");
        assert!((score - 2.0 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_only_first_path_collapsed() {
        // First path collapses to foo.js; the second keeps its slash-split
        // tokens: [x, foo.js, a, bar.js, y]
        let a = "x /p/foo.js a/bar.js y";
        let score = similarity(a, "bar.js");
        assert!((score - 2.0 / 6.0).abs() < 1e-12);
    }
}
