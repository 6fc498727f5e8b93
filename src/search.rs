//! Trigram word-similarity backing the `search` query parameter.
//!
//! The store contract calls for a fuzzy text-match predicate: a search term
//! should find a session note containing "Middlesbrough" even when typed as
//! "Middlesbruh". Matching works on character trigrams: each word is
//! lowercased, padded with two leading spaces and one trailing space, and
//! split into overlapping 3-character windows; two strings are compared by
//! set overlap over those windows. A query matches a text when its best
//! per-word overlap reaches [`WORD_SIMILARITY_THRESHOLD`].
//!
//! [`register_functions`] exposes the match as a `word_similarity(query,
//! text)` scalar inside SQLite so the Query Builder can use it directly in
//! WHERE clauses.

use std::collections::HashSet;

use rusqlite::{functions::FunctionFlags, Connection};

/// Minimum best-word overlap for a `search` term to count as a match.
pub const WORD_SIMILARITY_THRESHOLD: f64 = 0.3;

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Trigram set of a single already-lowercased word, space-padded so that
/// word boundaries contribute trigrams of their own.
fn trigrams(word: &str) -> HashSet<String> {
    let padded: Vec<char> = format!("  {word} ").chars().collect();
    padded.windows(3).map(|w| w.iter().collect()).collect()
}

fn overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count() as f64;
    let total = a.union(b).count() as f64;
    shared / total
}

/// Trigram similarity of two strings in `[0.0, 1.0]`.
///
/// Multi-word strings contribute the union of their per-word trigrams.
pub fn similarity(a: &str, b: &str) -> f64 {
    let set_a: HashSet<String> = words(a).flat_map(|w| trigrams(&w)).collect();
    let set_b: HashSet<String> = words(b).flat_map(|w| trigrams(&w)).collect();
    overlap(&set_a, &set_b)
}

/// Best similarity between `query` and any single word of `text`.
///
/// This is the predicate behind the `search` parameter: a misspelled term
/// still matches the word it was aiming at, while unrelated terms stay
/// near zero.
pub fn word_similarity(query: &str, text: &str) -> f64 {
    let query_set: HashSet<String> = words(query).flat_map(|w| trigrams(&w)).collect();
    if query_set.is_empty() {
        return 0.0;
    }

    words(text)
        .map(|word| overlap(&query_set, &trigrams(&word)))
        .fold(0.0, f64::max)
}

/// Register the `word_similarity` SQL function on a connection.
///
/// Must run before any statement that filters by search term is prepared.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "word_similarity",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let query: String = ctx.get(0)?;
            let text: String = ctx.get(1)?;
            Ok(word_similarity(&query, &text))
        },
    )
}
