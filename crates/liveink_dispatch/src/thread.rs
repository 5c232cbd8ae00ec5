//! Dedicated dispatcher thread lifecycle.
//!
//! The render thread is created lazily when inking becomes active and torn
//! down when it is deactivated. The thread pumps its dispatcher queue; in
//! [`CommitMode::Auto`] it commits a simulated frame every time the queue
//! drains, so visual mutations are followed by a render-complete signal
//! without a real compositor in the loop. [`CommitMode::Manual`] leaves
//! committing to the embedder (or a test harness) entirely.

use crate::compositor::CompositorContext;
use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, Result};
use std::thread::JoinHandle;

/// How frames are committed on a dispatcher thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CommitMode {
    /// Commit a frame after each drained batch of work.
    #[default]
    Auto,
    /// Frames are committed externally via the compositor handle.
    Manual,
}

/// A dedicated thread pumping a dispatcher until shut down.
pub struct DispatcherThread {
    dispatcher: Dispatcher,
    compositor: CompositorContext,
    join: Option<JoinHandle<()>>,
}

impl DispatcherThread {
    /// Spawn a named dispatcher thread.
    pub fn spawn(name: &str, mode: CommitMode) -> Result<Self> {
        let dispatcher = Dispatcher::new();
        let compositor = CompositorContext::new();

        let thread_dispatcher = dispatcher.clone();
        let thread_compositor = compositor.clone();
        let join = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                thread_compositor.bind_current_thread();
                tracing::debug!("dispatcher thread started");
                match mode {
                    CommitMode::Auto => {
                        thread_dispatcher.run(|| thread_compositor.frame_rendered())
                    }
                    CommitMode::Manual => thread_dispatcher.run(|| {}),
                }
                tracing::debug!("dispatcher thread exited");
            })
            .map_err(|e| DispatchError::SpawnFailed(e.to_string()))?;

        Ok(Self {
            dispatcher,
            compositor,
            join: Some(join),
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn compositor(&self) -> &CompositorContext {
        &self.compositor
    }

    /// Stop the thread and wait for it to exit. Pending work and armed
    /// render-complete callbacks are dropped, not executed.
    pub fn shutdown_and_join(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        self.compositor.cancel_pending();
        self.dispatcher.shutdown();
        if let Some(join) = self.join.take() {
            if std::thread::current().id() != join.thread().id() && join.join().is_err() {
                tracing::warn!("dispatcher thread panicked during shutdown");
            }
        }
    }
}

impl Drop for DispatcherThread {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Priority;
    use std::sync::mpsc;

    #[test]
    fn test_work_runs_on_spawned_thread() {
        let thread = DispatcherThread::spawn("test-dispatch", CommitMode::Manual).unwrap();
        let (tx, rx) = mpsc::channel();

        let main_id = std::thread::current().id();
        thread
            .dispatcher()
            .invoke(Priority::Send, move || {
                tx.send(std::thread::current().id() != main_id).unwrap();
            })
            .unwrap();

        assert!(rx.recv().unwrap());
        thread.shutdown_and_join();
    }

    #[test]
    fn test_auto_commit_fires_render_complete() {
        let thread = DispatcherThread::spawn("test-dispatch", CommitMode::Auto).unwrap();
        let (tx, rx) = mpsc::channel();

        thread.compositor().notify_next_render_complete(move || {
            tx.send(()).unwrap();
        });
        thread.dispatcher().invoke(Priority::Send, || {}).unwrap();

        // The drained batch commits a frame, which fires the one-shot.
        rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
        thread.shutdown_and_join();
    }

    #[test]
    fn test_invoke_after_shutdown_is_disconnected() {
        let thread = DispatcherThread::spawn("test-dispatch", CommitMode::Manual).unwrap();
        let dispatcher = thread.dispatcher().clone();
        thread.shutdown_and_join();
        assert_eq!(
            dispatcher.invoke(Priority::Send, || {}),
            Err(DispatchError::Disconnected)
        );
    }
}
