//! Identifier batching and list-column codecs.
//!
//! Remote APIs accept a bounded number of identifiers per request, so the
//! working set of a run is deduplicated and split into batches of at most
//! `size` codes before it is fetched.
//!
//! # Example
//!
//! ```rust
//! use lachaise_sync_core::chunk::{batches, dedup_sorted};
//!
//! let codes = dedup_sorted(vec!["Q3".into(), "Q1".into(), "Q3".into()]);
//! let sizes: Vec<usize> = batches(&codes, 1).map(|b| b.len()).collect();
//! assert_eq!(sizes, vec![1, 1]);
//! ```

use std::collections::BTreeSet;

/// Default number of identifiers per remote request.
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Split `items` into consecutive batches of at most `size` elements.
///
/// A `size` of zero is treated as one so the iterator always advances.
pub fn batches<T>(items: &[T], size: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(size.max(1))
}

/// Sort and deduplicate, dropping empty codes.
pub fn dedup_sorted<I>(codes: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    codes
        .into_iter()
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Parse a `|`-delimited override list, e.g. `"Q1|Q2"`.
pub fn split_pipe(s: &str) -> Vec<String> {
    split_on(s, '|')
}

/// Parse a `;`-delimited list column.
pub fn split_semicolon(s: &str) -> Vec<String> {
    split_on(s, ';')
}

fn split_on(s: &str, sep: char) -> Vec<String> {
    s.split(sep)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batches_respect_size() {
        let codes: Vec<String> = (1..=60).map(|i| format!("Q{i}")).collect();
        let sizes: Vec<usize> = batches(&codes, DEFAULT_BATCH_SIZE)
            .map(|b| b.len())
            .collect();
        assert_eq!(sizes, vec![25, 25, 10]);
    }

    #[test]
    fn test_batches_of_empty_input() {
        let codes: Vec<String> = Vec::new();
        assert_eq!(batches(&codes, 25).count(), 0);
    }

    #[test]
    fn test_zero_size_still_advances() {
        let codes = vec!["Q1".to_string(), "Q2".to_string()];
        assert_eq!(batches(&codes, 0).count(), 2);
    }

    #[test]
    fn test_dedup_sorted() {
        let codes = dedup_sorted(vec![
            "Q2".to_string(),
            "".to_string(),
            "Q1".to_string(),
            "Q2".to_string(),
        ]);
        assert_eq!(codes, vec!["Q1", "Q2"]);
    }

    #[test]
    fn test_split_pipe_trims_and_skips_empty() {
        assert_eq!(split_pipe("Q1| Q2 ||"), vec!["Q1", "Q2"]);
        assert!(split_pipe("").is_empty());
    }

    #[test]
    fn test_split_semicolon() {
        assert_eq!(split_semicolon("Q1;Q2"), vec!["Q1", "Q2"]);
    }
}
