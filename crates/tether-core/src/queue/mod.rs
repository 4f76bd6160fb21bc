//! Queue module: the FIFO container and the loop's state machine.

mod state;

pub use state::{ListenTicket, LoopState, ProcessingStatus};

use std::collections::VecDeque;

/// Ordered FIFO sequence. Head is the oldest item.
///
/// No duplicate detection and no keyed lookup; the engine relies on the
/// order alone.
#[derive(Debug, Clone, PartialEq)]
pub struct Queue<T> {
    items: VecDeque<T>,
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Rebuild a queue from a persisted snapshot, keeping its order.
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
        }
    }

    /// Append at the tail and return a reference to the stored item.
    pub fn enqueue(&mut self, item: T) -> &T {
        self.items.push_back(item);
        &self.items[self.items.len() - 1]
    }

    /// Remove the head. `None` when empty.
    pub fn dequeue(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn head(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove everything, returning how many items were dropped.
    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Clone> Queue<T> {
    /// Owned copy in head-to-tail order, handed to persistence.
    pub fn snapshot(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut q = Queue::new();
        q.enqueue("a");
        q.enqueue("b");
        q.enqueue("c");

        assert_eq!(q.head(), Some(&"a"));
        assert_eq!(q.dequeue(), Some("a"));
        assert_eq!(q.dequeue(), Some("b"));
        assert_eq!(q.size(), 1);
        assert_eq!(q.head(), Some(&"c"));
    }

    #[test]
    fn dequeue_on_empty_is_none() {
        let mut q: Queue<u32> = Queue::new();
        assert_eq!(q.dequeue(), None);
        assert!(q.head().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn enqueue_returns_stored_item() {
        let mut q = Queue::new();
        q.enqueue(1);
        assert_eq!(*q.enqueue(2), 2);
    }

    #[test]
    fn snapshot_round_trips_order() {
        let mut q = Queue::new();
        for i in 0..5 {
            q.enqueue(i);
        }
        let restored = Queue::from_items(q.snapshot());
        assert_eq!(restored, q);
        assert_eq!(restored.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn clear_reports_removed_count() {
        let mut q = Queue::from_items(vec![1, 2, 3]);
        assert_eq!(q.clear(), 3);
        assert_eq!(q.size(), 0);
    }
}
