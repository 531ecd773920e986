//! Incremental list assembly.
//!
//! Devices report collections (authorized channels, scan results, palette
//! colors) one item per message. Each message carries a [`Marker`] telling
//! where it sits in the sequence. The [`IncrementalListAssembler`] buffers a
//! sequence and only swaps it into the visible list once it is complete.

use std::cmp::Ordering;
use std::fmt::Debug;
use tracing::trace;

// ============================================================================
// Marker
// ============================================================================

/// Position of a partial list message within its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Middle of a sequence.
    None,
    /// Starts a new sequence.
    First,
    /// Ends the current sequence.
    Last,
    /// A complete one-item sequence.
    FirstLast,
    /// The device holds no items. Carries no item.
    Empty,
    /// Remove one item, outside of any sequence.
    Remove,
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Marker::None => write!(f, "none"),
            Marker::First => write!(f, "first"),
            Marker::Last => write!(f, "last"),
            Marker::FirstLast => write!(f, "first+last"),
            Marker::Empty => write!(f, "empty"),
            Marker::Remove => write!(f, "remove"),
        }
    }
}

/// Ordering applied to a committed list.
#[derive(Debug)]
pub enum ListOrder<T> {
    /// Keep arrival order.
    Arrival,
    /// Sort with the given comparator on commit.
    Sorted(fn(&T, &T) -> Ordering),
}

impl<T> Clone for ListOrder<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ListOrder<T> {}

// ============================================================================
// Content Equality
// ============================================================================

/// Order-insensitive content equality of two lists.
///
/// Duplicates count: `[x, x, y]` differs from `[x, y, y]`.
pub fn same_content<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut matched = vec![false; b.len()];
    'outer: for item in a {
        for (i, candidate) in b.iter().enumerate() {
            if !matched[i] && candidate == item {
                matched[i] = true;
                continue 'outer;
            }
        }
        return false;
    }
    true
}

// ============================================================================
// Assembler
// ============================================================================

/// Builds a list out of marker-framed partial messages.
///
/// `committed` is what observers see; it only changes on a `Last`,
/// `FirstLast`, `Empty` or `Remove` marker. Items of an in-progress sequence
/// accumulate in a separate capture buffer, de-duplicated by key.
#[derive(Debug, Clone)]
pub struct IncrementalListAssembler<T, K> {
    committed: Vec<T>,
    building: Option<Vec<T>>,
    key_of: fn(&T) -> K,
    order: ListOrder<T>,
    commits: u64,
}

impl<T, K> IncrementalListAssembler<T, K>
where
    T: Clone + PartialEq + Debug,
    K: PartialEq,
{
    /// Create an empty assembler keeping arrival order.
    pub fn new(key_of: fn(&T) -> K) -> Self {
        IncrementalListAssembler {
            committed: Vec::new(),
            building: None,
            key_of,
            order: ListOrder::Arrival,
            commits: 0,
        }
    }

    /// Create an empty assembler that sorts each committed list.
    pub fn sorted(key_of: fn(&T) -> K, compare: fn(&T, &T) -> Ordering) -> Self {
        IncrementalListAssembler {
            order: ListOrder::Sorted(compare),
            ..IncrementalListAssembler::new(key_of)
        }
    }

    /// The externally visible list.
    pub fn committed(&self) -> &[T] {
        &self.committed
    }

    /// Whether a sequence is being captured.
    pub fn is_capturing(&self) -> bool {
        self.building.is_some()
    }

    /// Number of commits performed so far (including clears by `Empty`).
    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    /// Process one partial message.
    ///
    /// `item` is ignored for [`Marker::Empty`]. Returns `true` when the
    /// committed list was replaced or shrunk, i.e. when observers need exactly
    /// one change notification.
    pub fn process(&mut self, item: Option<T>, marker: Marker) -> bool {
        match (marker, item) {
            (Marker::Empty, _) => {
                trace!("list reported empty");
                self.building = None;
                self.commit(Vec::new());
                true
            }
            (_, None) => {
                trace!(%marker, "list marker without item ignored");
                false
            }
            (Marker::First, Some(item)) => {
                self.building = Some(vec![item]);
                false
            }
            (Marker::None, Some(item)) => {
                self.capture(item);
                false
            }
            (Marker::Last, Some(item)) => {
                self.capture(item);
                let items = self.building.take().unwrap_or_default();
                self.commit(items);
                true
            }
            (Marker::FirstLast, Some(item)) => {
                self.building = None;
                self.commit(vec![item]);
                true
            }
            (Marker::Remove, Some(item)) => self.remove(&item),
        }
    }

    /// Add an item to the capture buffer, starting one if needed.
    fn capture(&mut self, item: T) {
        let key_of = self.key_of;
        let building = self.building.get_or_insert_with(Vec::new);
        let key = key_of(&item);
        match building.iter_mut().find(|existing| key_of(existing) == key) {
            Some(existing) => *existing = item,
            None => building.push(item),
        }
    }

    fn commit(&mut self, mut items: Vec<T>) {
        if let ListOrder::Sorted(compare) = self.order {
            items.sort_by(compare);
        }
        trace!(len = items.len(), "list committed");
        self.committed = items;
        self.commits += 1;
    }

    /// Remove the item with the same key as `item`.
    ///
    /// The capture buffer is purged too. Returns whether the committed list
    /// shrank.
    fn remove(&mut self, item: &T) -> bool {
        let key = (self.key_of)(item);
        let key_of = self.key_of;
        if let Some(building) = &mut self.building {
            building.retain(|existing| key_of(existing) != key);
        }
        let before = self.committed.len();
        self.committed.retain(|existing| key_of(existing) != key);
        self.committed.len() != before
    }

    /// Discard any in-progress capture. The committed list is kept as the last
    /// good snapshot.
    pub fn on_disconnect(&mut self) -> bool {
        if self.building.take().is_some() {
            trace!("discarding partial list capture");
        }
        false
    }

    /// Clear everything. Returns whether the committed list was non-empty.
    pub fn reset(&mut self) -> bool {
        self.building = None;
        let had_items = !self.committed.is_empty();
        self.committed.clear();
        had_items
    }

    /// Whether the committed list has the same content as `items`, in any order.
    pub fn has_same_content(&self, items: &[T]) -> bool {
        same_content(&self.committed, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        id: u32,
        payload: &'static str,
    }

    fn entry(id: u32, payload: &'static str) -> Entry {
        Entry { id, payload }
    }

    fn assembler() -> IncrementalListAssembler<Entry, u32> {
        IncrementalListAssembler::new(|e| e.id)
    }

    #[test]
    fn test_sequence_commits_atomically() {
        let mut list = assembler();

        assert!(!list.process(Some(entry(1, "a")), Marker::First));
        assert!(!list.process(Some(entry(2, "b")), Marker::None));
        assert!(list.committed().is_empty());
        assert!(list.is_capturing());

        assert!(list.process(Some(entry(3, "c")), Marker::Last));
        assert_eq!(list.committed().len(), 3);
        assert_eq!(list.commit_count(), 1);
        assert!(!list.is_capturing());
    }

    #[test]
    fn test_new_first_restarts_capture() {
        let mut list = assembler();
        list.process(Some(entry(1, "a")), Marker::First);
        list.process(Some(entry(2, "b")), Marker::None);
        list.process(Some(entry(3, "c")), Marker::First);
        list.process(Some(entry(4, "d")), Marker::Last);

        let ids: Vec<u32> = list.committed().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn test_last_without_first_is_single_item() {
        let mut list = assembler();
        assert!(list.process(Some(entry(9, "z")), Marker::Last));
        assert_eq!(list.committed(), &[entry(9, "z")]);
    }

    #[test]
    fn test_first_last_is_single_item() {
        let mut list = assembler();
        list.process(Some(entry(1, "a")), Marker::FirstLast);
        assert_eq!(list.committed(), &[entry(1, "a")]);
    }

    #[test]
    fn test_empty_clears_regardless_of_capture() {
        let mut list = assembler();
        list.process(Some(entry(1, "a")), Marker::FirstLast);
        list.process(Some(entry(2, "b")), Marker::First);

        assert!(list.process(None, Marker::Empty));
        assert!(list.committed().is_empty());
        assert!(!list.is_capturing());
    }

    #[test]
    fn test_remove_without_framing() {
        let mut list = assembler();
        list.process(Some(entry(1, "a")), Marker::First);
        list.process(Some(entry(2, "b")), Marker::Last);

        assert!(!list.process(Some(entry(7, "x")), Marker::Remove));
        assert_eq!(list.committed().len(), 2);

        assert!(list.process(Some(entry(1, "other payload")), Marker::Remove));
        assert_eq!(list.committed(), &[entry(2, "b")]);
    }

    #[test]
    fn test_remove_purges_capture() {
        let mut list = assembler();
        list.process(Some(entry(1, "a")), Marker::First);
        list.process(Some(entry(2, "b")), Marker::None);
        list.process(Some(entry(1, "a")), Marker::Remove);
        list.process(Some(entry(3, "c")), Marker::Last);

        let ids: Vec<u32> = list.committed().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_capture_dedups_by_key() {
        let mut list = assembler();
        list.process(Some(entry(1, "a")), Marker::First);
        list.process(Some(entry(1, "a2")), Marker::Last);
        assert_eq!(list.committed(), &[entry(1, "a2")]);
    }

    #[test]
    fn test_disconnect_keeps_last_snapshot() {
        let mut list = assembler();
        list.process(Some(entry(1, "a")), Marker::FirstLast);
        list.process(Some(entry(2, "b")), Marker::First);

        list.on_disconnect();
        assert_eq!(list.committed(), &[entry(1, "a")]);

        // a stray middle item after reconnect starts a fresh capture
        list.process(Some(entry(3, "c")), Marker::Last);
        assert_eq!(list.committed(), &[entry(3, "c")]);
    }

    #[test]
    fn test_sorted_order() {
        let mut list: IncrementalListAssembler<u32, u32> =
            IncrementalListAssembler::sorted(|v| *v, |a, b| a.cmp(b));
        list.process(Some(3), Marker::First);
        list.process(Some(1), Marker::None);
        list.process(Some(2), Marker::Last);
        assert_eq!(list.committed(), &[1, 2, 3]);
    }

    #[test]
    fn test_same_content_ignores_order() {
        assert!(same_content(&[1, 2, 3], &[3, 1, 2]));
        assert!(!same_content(&[1, 1, 2], &[1, 2, 2]));
        assert!(!same_content(&[1, 2], &[1, 2, 3]));
        assert!(same_content::<u8>(&[], &[]));
    }
}
