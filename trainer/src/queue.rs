//! Bounded queue between game workers and the updater.
//!
//! Many producers, one consumer. Producers block once the queue is full
//! (back-pressure keeps memory bounded when the updater is the slow side);
//! the consumer blocks on empty. `set_done` wakes every waiter: blocked
//! producers give up, the consumer drains what is left and then sees `None`.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

struct Inner<T> {
    items: VecDeque<T>,
    done: bool,
}

pub struct BoundedQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> BoundedQueue<T> {
        assert!(capacity > 0);
        BoundedQueue {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                done: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Push an item, blocking while the queue is full. Returns `false` when
    /// the queue has been closed, in which case the item is dropped.
    pub fn push(&self, item: T) -> bool {
        let mut inner = self.inner.lock().unwrap();
        while inner.items.len() >= self.capacity && !inner.done {
            inner = self.not_full.wait(inner).unwrap();
        }
        if inner.done {
            return false;
        }
        inner.items.push_back(item);
        self.not_empty.notify_one();
        true
    }

    /// Pop the oldest item, blocking while the queue is empty. Returns
    /// `None` once the queue is closed and drained.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = inner.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if inner.done {
                return None;
            }
            inner = self.not_empty.wait(inner).unwrap();
        }
    }

    /// Close the queue and wake every waiter.
    pub fn set_done(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.done = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn fifo_order() {
        let queue = BoundedQueue::new(4);
        assert!(queue.push(1));
        assert!(queue.push(2));
        assert!(queue.push(3));
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
    }

    #[test]
    fn pop_drains_after_done() {
        let queue = BoundedQueue::new(4);
        queue.push(7);
        queue.set_done();
        assert_eq!(queue.pop(), Some(7));
        assert_eq!(queue.pop(), None);
        assert!(!queue.push(8));
    }

    #[test]
    fn full_queue_blocks_producer_until_consumed() {
        let queue = Arc::new(BoundedQueue::new(1));
        queue.push(0);

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(1))
        };

        // Give the producer time to block on the full queue
        thread::sleep(Duration::from_millis(30));
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.pop(), Some(0));
        assert!(producer.join().unwrap());
        assert_eq!(queue.pop(), Some(1));
    }

    #[test]
    fn done_unblocks_waiting_consumer() {
        let queue: Arc<BoundedQueue<u32>> = Arc::new(BoundedQueue::new(2));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(30));
        queue.set_done();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn many_producers_one_consumer() {
        let queue = Arc::new(BoundedQueue::new(3));
        let mut producers = Vec::new();
        for base in 0..4u32 {
            let queue = Arc::clone(&queue);
            producers.push(thread::spawn(move || {
                for i in 0..25 {
                    assert!(queue.push(base * 100 + i));
                }
            }));
        }

        let mut seen = Vec::new();
        for _ in 0..100 {
            seen.push(queue.pop().unwrap());
        }
        for p in producers {
            p.join().unwrap();
        }
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 100);
    }
}
