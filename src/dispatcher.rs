use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Hands completion callbacks from worker threads to the owning thread.
///
/// Workers call `enqueue`; the owning loop calls `drain` once per tick and the
/// callbacks run there, in the order they were queued. Clones share one queue.
#[derive(Clone, Default)]
pub struct Dispatcher {
    queue: Arc<Mutex<VecDeque<Callback>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.push_back(Box::new(callback));
    }

    /// Run every pending callback on the calling thread. Returns how many ran.
    ///
    /// Only callbacks queued before the call are run, and each is popped on
    /// its own with the lock released while it runs. A callback may enqueue
    /// again (those run on the next drain), and one that panics leaves the
    /// rest of the queue in place.
    pub fn drain(&self) -> usize {
        let count = self.pending();
        for _ in 0..count {
            let next = self
                .queue
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front();
            match next {
                Some(callback) => callback(),
                None => break,
            }
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_callbacks_run_in_enqueue_order() {
        let dispatcher = Dispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for label in ["A", "B", "C"] {
            let seen = seen.clone();
            dispatcher.enqueue(move || seen.lock().unwrap().push(label));
        }

        assert_eq!(dispatcher.drain(), 3);
        assert_eq!(*seen.lock().unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_each_callback_runs_once() {
        let dispatcher = Dispatcher::new();
        let counter = Arc::new(Mutex::new(0));
        let c = counter.clone();
        dispatcher.enqueue(move || *c.lock().unwrap() += 1);

        dispatcher.drain();
        assert_eq!(dispatcher.drain(), 0);
        assert_eq!(*counter.lock().unwrap(), 1);
    }

    #[test]
    fn test_callback_may_enqueue_without_deadlock() {
        let dispatcher = Dispatcher::new();
        let inner = dispatcher.clone();
        let hit = Arc::new(Mutex::new(false));
        let h = hit.clone();

        dispatcher.enqueue(move || {
            inner.enqueue(move || *h.lock().unwrap() = true);
        });

        assert_eq!(dispatcher.drain(), 1);
        assert_eq!(dispatcher.pending(), 1);
        assert!(!*hit.lock().unwrap());
        dispatcher.drain();
        assert!(*hit.lock().unwrap());
    }

    #[test]
    fn test_panicking_callback_keeps_rest_queued() {
        let dispatcher = Dispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        dispatcher.enqueue(|| panic!("callback bug"));
        let s = seen.clone();
        dispatcher.enqueue(move || s.lock().unwrap().push("B"));

        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| dispatcher.drain()));
        assert!(first.is_err());
        assert_eq!(dispatcher.pending(), 1);
        assert!(seen.lock().unwrap().is_empty());

        assert_eq!(dispatcher.drain(), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["B"]);
    }

    #[test]
    fn test_callbacks_from_worker_run_on_owner() {
        let dispatcher = Dispatcher::new();
        let owner = thread::current().id();
        let ran_on = Arc::new(Mutex::new(None));

        let worker_dispatcher = dispatcher.clone();
        let r = ran_on.clone();
        thread::spawn(move || {
            worker_dispatcher.enqueue(move || *r.lock().unwrap() = Some(thread::current().id()));
        })
        .join()
        .unwrap();

        dispatcher.drain();
        assert_eq!(*ran_on.lock().unwrap(), Some(owner));
    }
}
