// Dedup Queue - pending identifiers awaiting a retrieval round

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Most-recent-first queue that holds each identifier at most once
///
/// Order lives in a deque and membership in a set, both behind one lock, so
/// the presence check and insert are a single critical section. Consumers
/// still tolerate duplicates: an identifier popped and re-enqueued before its
/// cache entry lands may be resolved twice.
pub struct DedupQueue<T> {
    inner: Mutex<QueueInner<T>>,
}

struct QueueInner<T> {
    order: VecDeque<T>,
    members: HashSet<T>,
}

impl<T: Clone + Eq + Hash> DedupQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                order: VecDeque::new(),
                members: HashSet::new(),
            }),
        }
    }

    /// Push to the front unless already queued. Returns true if added.
    pub fn enqueue(&self, identifier: T) -> bool {
        let mut inner = self.inner.lock();
        if !inner.members.insert(identifier.clone()) {
            return false;
        }
        inner.order.push_front(identifier);
        true
    }

    /// Remove and return the most recently queued identifier
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        let identifier = inner.order.pop_front()?;
        inner.members.remove(&identifier);
        Some(identifier)
    }

    pub fn contains(&self, identifier: &T) -> bool {
        self.inner.lock().members.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().order.is_empty()
    }
}

impl<T: Clone + Eq + Hash> Default for DedupQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_enqueue_is_idempotent() {
        let queue = DedupQueue::new();
        assert!(queue.enqueue(1));
        assert!(!queue.enqueue(1));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_pop_is_most_recent_first() {
        let queue = DedupQueue::new();
        queue.enqueue("a");
        queue.enqueue("b");
        queue.enqueue("c");

        assert_eq!(queue.pop(), Some("c"));
        assert_eq!(queue.pop(), Some("b"));
        assert_eq!(queue.pop(), Some("a"));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_requeue_after_pop() {
        let queue = DedupQueue::new();
        queue.enqueue(7);
        assert_eq!(queue.pop(), Some(7));
        assert!(!queue.contains(&7));
        assert!(queue.enqueue(7));
    }

    #[test]
    fn test_duplicate_keeps_original_position() {
        let queue = DedupQueue::new();
        queue.enqueue(1);
        queue.enqueue(2);
        queue.enqueue(1);

        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(1));
    }

    #[test]
    fn test_concurrent_enqueue_and_pop() {
        let queue = Arc::new(DedupQueue::new());

        let producers: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        queue.enqueue(i);
                    }
                })
            })
            .collect();
        for handle in producers {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 100);

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    let mut popped = Vec::new();
                    while let Some(i) = queue.pop() {
                        popped.push(i);
                    }
                    popped
                })
            })
            .collect();

        let mut all: Vec<i32> = consumers
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }
}
