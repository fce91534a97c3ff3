//! Unresolved reference bookkeeping.
//!
//! One `ReferenceStats` is shared (through `Arc`) by every conversion of a
//! namespace build, including parallel ones, and summarized at the end.

use dashmap::DashMap;
use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct ReferenceStats {
    missed_references: AtomicUsize,
    missed_links: AtomicUsize,
    /// Unresolved name to number of occurrences
    misses: DashMap<String, usize>,
}

impl ReferenceStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count an explicit reference (`#Foo`, `%FOO`, `Foo::sig`, ...) that
    /// did not resolve.
    pub fn record_missed_reference(&self, name: &str) {
        self.missed_references.fetch_add(1, Ordering::Relaxed);
        *self.misses.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Count a `<link linkend>` that matched neither a symbol nor a URL.
    pub fn record_missed_link(&self, linkend: &str) {
        self.missed_links.fetch_add(1, Ordering::Relaxed);
        *self.misses.entry(linkend.to_string()).or_insert(0) += 1;
    }

    pub fn missed_references(&self) -> usize {
        self.missed_references.load(Ordering::Relaxed)
    }

    pub fn missed_links(&self) -> usize {
        self.missed_links.load(Ordering::Relaxed)
    }

    /// The `n` most frequent unresolved names, most frequent first, ties by name.
    pub fn most_common_misses(&self, n: usize) -> Vec<(String, usize)> {
        let mut misses: Vec<(String, usize)> = self
            .misses
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        misses.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        misses.truncate(n);
        misses
    }

    pub fn reset(&self) {
        self.missed_references.store(0, Ordering::Relaxed);
        self.missed_links.store(0, Ordering::Relaxed);
        self.misses.clear();
    }

    /// Log the end-of-build summary for `namespace`.
    pub fn log_summary(&self, namespace: &str) {
        info!(
            "{}: {} unresolved references, {} unresolved links",
            namespace,
            self.missed_references(),
            self.missed_links()
        );
        for (name, count) in self.most_common_misses(10) {
            log::debug!("{}: unresolved '{}' ({}x)", namespace, name, count);
        }
    }
}
