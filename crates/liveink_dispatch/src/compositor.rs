//! Per-thread render-complete signaling.
//!
//! Each scheduling domain (application thread, render thread) has a
//! compositor context. A committed frame means every visual mutation
//! submitted before the commit has reached the screen/buffer; the handoff
//! protocol sequences its phases off that signal.
//!
//! Registrations are one-shot: a callback armed with
//! [`notify_next_render_complete`] fires on exactly the next commit, then
//! is forgotten. There is no persistent subscription to unhook, so a phase
//! can never be double-processed.
//!
//! [`notify_next_render_complete`]: CompositorContext::notify_next_render_complete

use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

type RenderCompleteCallback = Box<dyn FnOnce() + Send + 'static>;

struct Inner {
    pending: Vec<RenderCompleteCallback>,
    owner: Option<ThreadId>,
    frames: u64,
}

/// Cloneable handle to one thread's render-complete signal.
#[derive(Clone)]
pub struct CompositorContext {
    inner: Arc<Mutex<Inner>>,
}

impl CompositorContext {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                pending: Vec::new(),
                owner: None,
                frames: 0,
            })),
        }
    }

    /// Claim the calling thread as the committing thread.
    pub fn bind_current_thread(&self) {
        let mut inner = self.inner.lock().unwrap();
        let current = std::thread::current().id();
        debug_assert!(
            inner.owner.is_none() || inner.owner == Some(current),
            "compositor already bound to a different thread"
        );
        inner.owner = Some(current);
    }

    /// Arm a one-shot callback for the next committed frame.
    pub fn notify_next_render_complete<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.lock().unwrap().pending.push(Box::new(callback));
    }

    /// Commit a frame: every armed callback fires once, on the calling
    /// thread, in registration order. Must be called by the owning thread.
    pub fn frame_rendered(&self) {
        let drained = {
            let mut inner = self.inner.lock().unwrap();
            debug_assert!(
                inner.owner.is_none() || inner.owner == Some(std::thread::current().id()),
                "frame committed off the compositor's owning thread"
            );
            if inner.owner.is_none() {
                inner.owner = Some(std::thread::current().id());
            }
            inner.frames += 1;
            std::mem::take(&mut inner.pending)
        };
        for callback in drained {
            callback();
        }
    }

    /// Drop all armed callbacks without firing them. Teardown path: once
    /// the thread behind the signal is going away, the completions would
    /// never usefully arrive.
    pub fn cancel_pending(&self) {
        let dropped = {
            let mut inner = self.inner.lock().unwrap();
            std::mem::take(&mut inner.pending)
        };
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), "render-complete registrations abandoned");
        }
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Number of frames committed so far.
    pub fn frame_count(&self) -> u64 {
        self.inner.lock().unwrap().frames
    }
}

impl Default for CompositorContext {
    fn default() -> Self {
        Self::new()
    }
}
