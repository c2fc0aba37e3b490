//! Small helpers shared by the store and the front ends.

use std::collections::HashSet;
use std::hash::Hash;

/// Removes duplicates while keeping the first occurrence of each value.
pub fn dedup<T: Eq + Hash + Clone>(items: &[T]) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .filter(|item| seen.insert((*item).clone()))
        .cloned()
        .collect()
}

/// Trims `s` and maps the empty string to `None`.
pub fn non_empty(s: impl AsRef<str>) -> Option<String> {
    let s = s.as_ref().trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Normalized tag set: trimmed, empty names dropped, duplicates removed.
pub fn clean_tags(tags: &[String]) -> Vec<String> {
    let trimmed: Vec<String> = tags.iter().filter_map(non_empty).collect();
    dedup(&trimmed)
}
