//! The Election Core's inbound queue. Needs one thing `std::sync::mpsc`
//! doesn't offer: an `unget` (head-insert) operation, used when the
//! finalization window (§4.5) sees a strictly better vote and has to push
//! it back for the outer loop to re-evaluate. Built the teacher's way —
//! a `Mutex`-guarded structure plus a `Condvar` — rather than a channel,
//! since channels have no peek/unget primitive.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

pub struct InboundQueue<T> {
    items: Mutex<VecDeque<T>>,
    not_empty: Condvar,
}

impl<T> InboundQueue<T> {
    pub fn new() -> InboundQueue<T> {
        InboundQueue {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
        }
    }

    /// Enqueue at the tail (normal arrival order).
    pub fn push(&self, item: T) {
        let mut items = self.items.lock().unwrap();
        items.push_back(item);
        self.not_empty.notify_one();
    }

    /// Re-insert at the head: the item will be the very next one returned
    /// by `poll`.
    pub fn unget(&self, item: T) {
        let mut items = self.items.lock().unwrap();
        items.push_front(item);
        self.not_empty.notify_one();
    }

    /// Block for up to `timeout` waiting for an item. `None` on timeout.
    pub fn poll(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.items.lock().unwrap();
        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, result) = self.not_empty.wait_timeout(items, deadline - now).unwrap();
            items = guard;
            if result.timed_out() && items.is_empty() {
                return None;
            }
        }
    }

    /// Discard every queued item, e.g. on commit or on `leaveInstance`.
    pub fn clear(&self) {
        self.items.lock().unwrap().clear();
    }
}

impl<T> Default for InboundQueue<T> {
    fn default() -> InboundQueue<T> {
        InboundQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn poll_times_out_when_empty() {
        let q: InboundQueue<i32> = InboundQueue::new();
        assert_eq!(q.poll(Duration::from_millis(20)), None);
    }

    #[test]
    fn fifo_order_preserved() {
        let q = InboundQueue::new();
        q.push(1);
        q.push(2);
        assert_eq!(q.poll(Duration::from_millis(10)), Some(1));
        assert_eq!(q.poll(Duration::from_millis(10)), Some(2));
    }

    #[test]
    fn unget_is_returned_before_later_pushes() {
        let q = InboundQueue::new();
        q.push(1);
        let popped = q.poll(Duration::from_millis(10)).unwrap();
        assert_eq!(popped, 1);
        q.push(2);
        q.unget(popped);
        assert_eq!(q.poll(Duration::from_millis(10)), Some(1));
        assert_eq!(q.poll(Duration::from_millis(10)), Some(2));
    }

    #[test]
    fn push_wakes_a_blocked_poller() {
        let q = Arc::new(InboundQueue::new());
        let q2 = q.clone();
        let handle = thread::spawn(move || q2.poll(Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(30));
        q.push(42);
        assert_eq!(handle.join().unwrap(), Some(42));
    }
}
