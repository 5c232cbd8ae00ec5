//! Prioritized per-thread work queue.
//!
//! A `Dispatcher` is a cloneable handle to one thread's work queue. Work is
//! submitted fire-and-continue from any thread and executed on the single
//! thread that pumps the queue. Two guarantees hold:
//!
//! - callbacks queued with the same priority execute in submission order;
//! - `Priority::Send` callbacks execute before any `Priority::Input` work,
//!   including input work that was queued earlier.
//!
//! The second guarantee is what lets the handoff protocol assume "the
//! removal ran before we were notified about it".

use crate::error::{DispatchError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::ThreadId;

/// Priority class for dispatched work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    /// Head-of-line: protocol-critical callbacks (visual removal, handoff
    /// notifications).
    Send,
    /// Regular input-processing work.
    Input,
}

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Queues {
    send: VecDeque<Task>,
    input: VecDeque<Task>,
    shutdown: bool,
}

impl Queues {
    fn pop(&mut self) -> Option<Task> {
        self.send.pop_front().or_else(|| self.input.pop_front())
    }

    fn is_empty(&self) -> bool {
        self.send.is_empty() && self.input.is_empty()
    }
}

struct Shared {
    queues: Mutex<Queues>,
    ready: Condvar,
    owner: Mutex<Option<ThreadId>>,
}

/// Cloneable handle to one thread's work queue.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Create an unbound dispatcher. The queue binds to the first thread
    /// that pumps it (or to an explicit [`bind_current_thread`] call).
    ///
    /// [`bind_current_thread`]: Dispatcher::bind_current_thread
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                queues: Mutex::new(Queues::default()),
                ready: Condvar::new(),
                owner: Mutex::new(None),
            }),
        }
    }

    /// Claim the calling thread as the queue's executor.
    pub fn bind_current_thread(&self) {
        let mut owner = self.shared.owner.lock().unwrap();
        let current = std::thread::current().id();
        debug_assert!(
            owner.is_none() || *owner == Some(current),
            "dispatcher already bound to a different thread"
        );
        *owner = Some(current);
    }

    /// Whether the calling thread is the queue's executor.
    pub fn check_access(&self) -> bool {
        *self.shared.owner.lock().unwrap() == Some(std::thread::current().id())
    }

    /// Queue a callback for execution on the owning thread. Returns
    /// immediately; never blocks on execution.
    pub fn invoke<F>(&self, priority: Priority, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queues = self.shared.queues.lock().unwrap();
        if queues.shutdown {
            return Err(DispatchError::Disconnected);
        }
        match priority {
            Priority::Send => queues.send.push_back(Box::new(f)),
            Priority::Input => queues.input.push_back(Box::new(f)),
        }
        drop(queues);
        self.shared.ready.notify_one();
        Ok(())
    }

    /// Execute everything currently queued (and anything queued while
    /// draining) on the calling thread. Binds the queue if unbound.
    /// Returns the number of callbacks executed.
    pub fn run_until_idle(&self) -> usize {
        self.bind_current_thread();
        let mut executed = 0;
        loop {
            let task = {
                let mut queues = self.shared.queues.lock().unwrap();
                queues.pop()
            };
            match task {
                Some(task) => {
                    task();
                    executed += 1;
                }
                None => return executed,
            }
        }
    }

    /// Pump the queue on the calling thread until shutdown. `on_idle` runs
    /// each time the queue drains after executing at least one callback;
    /// the dispatcher thread uses it to commit a frame.
    pub fn run<F: FnMut()>(&self, mut on_idle: F) {
        self.bind_current_thread();
        loop {
            let task = {
                let mut queues = self.shared.queues.lock().unwrap();
                loop {
                    if let Some(task) = queues.pop() {
                        break Some(task);
                    }
                    if queues.shutdown {
                        break None;
                    }
                    queues = self.shared.ready.wait(queues).unwrap();
                }
            };
            let Some(task) = task else {
                return;
            };
            task();

            let drained = self.shared.queues.lock().unwrap().is_empty();
            if drained {
                on_idle();
            }
        }
    }

    /// Stop the queue. Pending work is dropped unexecuted; subsequent
    /// `invoke` calls fail with [`DispatchError::Disconnected`].
    pub fn shutdown(&self) {
        let mut queues = self.shared.queues.lock().unwrap();
        queues.shutdown = true;
        queues.send.clear();
        queues.input.clear();
        drop(queues);
        self.shared.ready.notify_all();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.queues.lock().unwrap().shutdown
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_fifo_within_class() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..4 {
            let log = log.clone();
            dispatcher
                .invoke(Priority::Input, move || log.lock().unwrap().push(i))
                .unwrap();
        }

        dispatcher.run_until_idle();
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_send_runs_before_earlier_input() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = log.clone();
        dispatcher
            .invoke(Priority::Input, move || l.lock().unwrap().push("input"))
            .unwrap();
        let l = log.clone();
        dispatcher
            .invoke(Priority::Send, move || l.lock().unwrap().push("send"))
            .unwrap();

        dispatcher.run_until_idle();
        assert_eq!(*log.lock().unwrap(), vec!["send", "input"]);
    }

    #[test]
    fn test_invoke_after_shutdown_fails() {
        let dispatcher = Dispatcher::new();
        dispatcher.shutdown();
        let result = dispatcher.invoke(Priority::Send, || {});
        assert_eq!(result, Err(DispatchError::Disconnected));
    }

    #[test]
    fn test_shutdown_drops_pending_work() {
        let dispatcher = Dispatcher::new();
        let ran = Arc::new(Mutex::new(false));
        let r = ran.clone();
        dispatcher
            .invoke(Priority::Send, move || *r.lock().unwrap() = true)
            .unwrap();
        dispatcher.shutdown();
        dispatcher.run_until_idle();
        assert!(!*ran.lock().unwrap());
    }

    #[test]
    fn test_check_access_tracks_pumping_thread() {
        let dispatcher = Dispatcher::new();
        assert!(!dispatcher.check_access());
        dispatcher.run_until_idle();
        assert!(dispatcher.check_access());

        let remote = dispatcher.clone();
        let handle = std::thread::spawn(move || remote.check_access());
        assert!(!handle.join().unwrap());
    }

    #[test]
    fn test_cross_thread_submission_order_preserved() {
        let dispatcher = Dispatcher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let remote = dispatcher.clone();
        let remote_log = log.clone();
        std::thread::spawn(move || {
            for i in 0..16 {
                let log = remote_log.clone();
                remote
                    .invoke(Priority::Send, move || log.lock().unwrap().push(i))
                    .unwrap();
            }
        })
        .join()
        .unwrap();

        dispatcher.run_until_idle();
        assert_eq!(*log.lock().unwrap(), (0..16).collect::<Vec<_>>());
    }
}
