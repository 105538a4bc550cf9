use std::collections::VecDeque;

use crate::ipc::DocumentId;

pub const DEFAULT_RECENT_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEntry {
    pub id: DocumentId,
    pub title: String,
}

impl RecentEntry {
    pub fn new(id: DocumentId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// Bounded MRU list of recently opened documents, most-recent last. Session
/// scoped only; never persisted. The document id is the dedup key, so two
/// documents sharing a title stay distinct.
#[derive(Debug, Clone)]
pub struct RecentDocuments {
    entries: VecDeque<RecentEntry>,
    capacity: usize,
}

impl RecentDocuments {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a document as just opened. An existing entry with the same id
    /// moves to the most-recent end; otherwise the least-recent entries are
    /// evicted until one slot is free.
    pub fn record(&mut self, entry: RecentEntry) {
        if self.capacity == 0 {
            self.entries.clear();
            return;
        }

        if let Some(pos) = self.entries.iter().position(|e| e.id == entry.id) {
            self.entries.remove(pos);
        } else {
            while self.entries.len() >= self.capacity {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(entry);
    }

    /// Ordered snapshot, most-recent last
    pub fn snapshot(&self) -> Vec<RecentEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecentEntry> {
        self.entries.iter()
    }
}

impl Default for RecentDocuments {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(n: u64) -> RecentEntry {
        RecentEntry::new(DocumentId(n), format!("doc-{n}"))
    }

    fn ids(list: &RecentDocuments) -> Vec<u64> {
        list.iter().map(|e| e.id.0).collect()
    }

    #[test]
    fn never_exceeds_capacity_and_never_duplicates() {
        let mut list = RecentDocuments::new(4);
        for n in [1, 2, 3, 1, 2, 4, 5, 5, 1, 6, 7] {
            list.record(doc(n));
            assert!(list.len() <= 4);
            let mut seen = ids(&list);
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), list.len());
        }
    }

    #[test]
    fn reopening_moves_to_most_recent_without_growth() {
        let mut list = RecentDocuments::new(5);
        for n in 1..=3 {
            list.record(doc(n));
        }
        list.record(doc(1));
        assert_eq!(ids(&list), vec![2, 3, 1]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn eleventh_document_evicts_the_first() {
        let mut list = RecentDocuments::default();
        for n in 1..=11 {
            list.record(doc(n));
        }
        assert_eq!(ids(&list), (2..=11).collect::<Vec<_>>());
    }

    #[test]
    fn reopen_then_evict_scenario() {
        let mut list = RecentDocuments::new(3);
        for n in [1, 2, 3] {
            list.record(doc(n));
        }
        list.record(doc(1));
        assert_eq!(ids(&list), vec![2, 3, 1]);
        list.record(doc(4));
        assert_eq!(ids(&list), vec![3, 1, 4]);
    }

    #[test]
    fn zero_capacity_stays_empty() {
        let mut list = RecentDocuments::new(0);
        for n in 1..=5 {
            list.record(doc(n));
            assert!(list.is_empty());
        }
    }

    #[test]
    fn same_title_different_ids_are_distinct() {
        let mut list = RecentDocuments::new(5);
        list.record(RecentEntry::new(DocumentId(1), "notes.md"));
        list.record(RecentEntry::new(DocumentId(2), "notes.md"));
        assert_eq!(list.len(), 2);
    }
}
