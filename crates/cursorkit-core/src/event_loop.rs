//! Single-threaded cooperative event loop.
//!
//! Every store primitive queues a task here instead of running inline. A task
//! settles its request and fires that request's callbacks, so callbacks always
//! run after the call that issued the primitive has returned.
//!
//! The loop is not a general executor. `run` polls exactly one caller future
//! and dispatches one task between polls, which is enough to drive
//! request/response style code written with `.await`.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;

use crate::config::Config;

type Task = Box<dyn FnOnce() + Send>;

struct LoopInner {
    /// FIFO of tasks waiting to run
    queue: Mutex<VecDeque<Task>>,
    /// Tasks run since creation
    dispatched: AtomicU64,
    max_turns: usize,
    trace_dispatch: bool,
}

/// Handle to a task queue. Clones share the queue.
#[derive(Clone)]
pub struct EventLoop {
    inner: Arc<LoopInner>,
}

impl EventLoop {
    pub fn new(config: &Config) -> Self {
        Self {
            inner: Arc::new(LoopInner {
                queue: Mutex::new(VecDeque::new()),
                dispatched: AtomicU64::new(0),
                max_turns: config.max_loop_turns,
                trace_dispatch: config.trace_dispatch,
            }),
        }
    }

    /// Append a task. It runs after every task queued before it.
    pub fn queue_task<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.queue.lock().push_back(Box::new(task));
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Tasks dispatched since the loop was created.
    pub fn total_dispatched(&self) -> u64 {
        self.inner.dispatched.load(Ordering::Relaxed)
    }

    /// Run the oldest queued task. Returns false if the queue was empty.
    ///
    /// The queue lock is released before the task runs, so tasks and the
    /// callbacks they fire may queue further tasks.
    pub fn dispatch_next(&self) -> bool {
        let task = self.inner.queue.lock().pop_front();
        match task {
            Some(task) => {
                let seq = self.inner.dispatched.fetch_add(1, Ordering::Relaxed);
                if self.inner.trace_dispatch {
                    tracing::trace!(seq, "dispatching task");
                }
                task();
                true
            }
            None => false,
        }
    }

    /// Dispatch until the queue is empty. Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut count = 0;
        while self.dispatch_next() {
            count += 1;
        }
        count
    }

    /// Drive `future` to completion, dispatching queued tasks between polls.
    ///
    /// Returns `None` if the queue runs dry (or the turn limit is hit) while
    /// the future is still pending: nothing left in the loop can ever settle
    /// it.
    pub fn run<F: Future>(&self, future: F) -> Option<F::Output> {
        let mut future = std::pin::pin!(future);
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        let mut turns = 0usize;

        loop {
            if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                return Some(output);
            }
            if turns >= self.inner.max_turns {
                tracing::warn!(turns, "event loop turn limit reached with future still pending");
                return None;
            }
            if !self.dispatch_next() {
                tracing::debug!(turns, "event loop idle with future still pending");
                return None;
            }
            turns += 1;
        }
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("pending", &self.pending())
            .field("dispatched", &self.total_dispatched())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_dispatch() {
        let event_loop = EventLoop::new(&Config::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let log = Arc::clone(&log);
            event_loop.queue_task(move || log.lock().push(i));
        }
        assert_eq!(event_loop.pending(), 3);
        assert_eq!(event_loop.run_until_idle(), 3);
        assert_eq!(*log.lock(), vec![0, 1, 2]);
        assert_eq!(event_loop.total_dispatched(), 3);
    }

    #[test]
    fn test_tasks_can_queue_tasks() {
        let event_loop = EventLoop::new(&Config::default());
        let hits = Arc::new(AtomicU64::new(0));

        let inner_loop = event_loop.clone();
        let inner_hits = Arc::clone(&hits);
        event_loop.queue_task(move || {
            inner_hits.fetch_add(1, Ordering::Relaxed);
            let hits = Arc::clone(&inner_hits);
            inner_loop.queue_task(move || {
                hits.fetch_add(1, Ordering::Relaxed);
            });
        });

        assert_eq!(event_loop.run_until_idle(), 2);
        assert_eq!(hits.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_run_ready_future() {
        let event_loop = EventLoop::new(&Config::default());
        assert_eq!(event_loop.run(async { 7 }), Some(7));
    }

    #[test]
    fn test_run_reports_stall() {
        let event_loop = EventLoop::new(&Config::default());
        let never = futures::future::pending::<()>();
        assert_eq!(event_loop.run(never), None);
    }

    #[test]
    fn test_run_waits_for_task() {
        let event_loop = EventLoop::new(&Config::default());
        let (tx, rx) = futures::channel::oneshot::channel();
        event_loop.queue_task(move || {
            let _ = tx.send(42);
        });
        assert_eq!(event_loop.run(rx), Some(Ok(42)));
    }
}
