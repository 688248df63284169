//! Per-island task queue
//!
//! Every island owns one worker thread that drains a counter of pending
//! evolution tasks in FIFO order. Enqueueing never blocks; `wait` blocks the
//! caller until the counter is zero and no task is executing. Dropping the
//! queue drains outstanding tasks and joins the worker.

use std::io;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::utils::lock;

#[derive(Default)]
struct QueueState {
    pending: usize,
    running: bool,
    shutdown: bool,
}

struct QueueShared {
    state: Mutex<QueueState>,
    // Wakes the worker when tasks arrive or shutdown is requested.
    work: Condvar,
    // Wakes waiters when the queue becomes idle.
    idle: Condvar,
}

pub(crate) struct TaskQueue {
    shared: Arc<QueueShared>,
    handle: Option<JoinHandle<()>>,
}

impl TaskQueue {
    /// Spawn the worker thread. `task` runs once per enqueued unit of work
    /// and must not panic; callers wrap user code in a panic guard.
    pub(crate) fn spawn(task: impl Fn() + Send + 'static) -> io::Result<Self> {
        let shared = Arc::new(QueueShared {
            state: Mutex::new(QueueState::default()),
            work: Condvar::new(),
            idle: Condvar::new(),
        });
        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("island-worker".to_string())
            .spawn(move || loop {
                let mut st = lock(&worker.state);
                while st.pending == 0 && !st.shutdown {
                    st = worker.work.wait(st).unwrap_or_else(PoisonError::into_inner);
                }
                if st.pending == 0 {
                    // Shutdown requested and every task has drained.
                    return;
                }
                st.pending -= 1;
                st.running = true;
                drop(st);
                task();
                let mut st = lock(&worker.state);
                st.running = false;
                if st.pending == 0 {
                    worker.idle.notify_all();
                }
            })?;
        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Enqueue `n` units of work and return immediately
    pub(crate) fn enqueue(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut st = lock(&self.shared.state);
        st.pending += n;
        drop(st);
        self.shared.work.notify_one();
    }

    /// Block until the queue is empty and no task is executing
    pub(crate) fn wait(&self) {
        let mut st = lock(&self.shared.state);
        while st.pending > 0 || st.running {
            st = self
                .shared
                .idle
                .wait(st)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Whether a task is queued or executing
    pub(crate) fn is_busy(&self) -> bool {
        let st = lock(&self.shared.state);
        st.pending > 0 || st.running
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        {
            let mut st = lock(&self.shared.state);
            st.shutdown = true;
        }
        self.shared.work.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_tasks_all_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let queue = TaskQueue::spawn(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        queue.enqueue(10);
        queue.enqueue(5);
        queue.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 15);
        assert!(!queue.is_busy());
    }

    #[test]
    fn test_wait_on_idle_queue_returns() {
        let queue = TaskQueue::spawn(|| {}).unwrap();
        queue.wait();
        assert!(!queue.is_busy());
    }

    #[test]
    fn test_drop_drains_pending_tasks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let queue = TaskQueue::spawn(move || {
            thread::sleep(Duration::from_millis(1));
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        queue.enqueue(8);
        drop(queue);
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_is_busy_while_running() {
        let queue = TaskQueue::spawn(|| {
            thread::sleep(Duration::from_millis(20));
        })
        .unwrap();
        queue.enqueue(1);
        // The task sleeps long enough for this probe to observe it.
        thread::sleep(Duration::from_millis(5));
        assert!(queue.is_busy());
        queue.wait();
        assert!(!queue.is_busy());
    }
}
