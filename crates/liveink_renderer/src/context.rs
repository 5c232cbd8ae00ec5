//! Scheduling-domain contexts.
//!
//! The engine spans two domains: the application thread, whose dispatcher,
//! compositor, and visual tree belong to the host, and one dedicated render
//! thread created lazily when inking becomes active.

use crate::error::{InkError, Result};
use liveink_core::{SharedVisualTree, VisualId, VisualTree};
use liveink_dispatch::{CommitMode, CompositorContext, Dispatcher, DispatcherThread, Priority};
use std::sync::mpsc;

/// Application-thread context handed to the engine at construction.
#[derive(Clone)]
pub struct AppContext {
    pub dispatcher: Dispatcher,
    pub compositor: CompositorContext,
    pub visuals: SharedVisualTree,
}

impl AppContext {
    /// Build a context owned by the calling thread. Suitable for embedders
    /// (and tests) where the current thread plays the application thread
    /// and pumps the dispatcher itself.
    pub fn for_current_thread() -> Self {
        let dispatcher = Dispatcher::new();
        dispatcher.bind_current_thread();
        let compositor = CompositorContext::new();
        compositor.bind_current_thread();
        Self {
            dispatcher,
            compositor,
            visuals: VisualTree::new("app-root").into_shared(),
        }
    }

    /// Execute all queued application-thread work.
    pub fn pump(&self) -> usize {
        self.dispatcher.run_until_idle()
    }

    /// Commit an application-thread frame, firing armed render-complete
    /// callbacks.
    pub fn commit_frame(&self) {
        self.compositor.frame_rendered();
    }
}

/// The dedicated render thread plus its visual tree.
pub(crate) struct RenderDomain {
    pub thread: DispatcherThread,
    pub visuals: SharedVisualTree,
}

impl RenderDomain {
    /// Spawn the render thread. The thread builds its own visual tree and
    /// the two slot target roots, so every render-side container is owned
    /// by the render thread from birth.
    pub fn start(mode: CommitMode) -> Result<(RenderDomain, VisualId, VisualId)> {
        let thread = DispatcherThread::spawn("liveink-render", mode)?;

        let (tx, rx) = mpsc::channel();
        thread.dispatcher().invoke(Priority::Send, move || {
            let mut tree = VisualTree::new("render-root");
            let root = tree.root();
            let target_a = tree.create_child(root, "slot-a-target");
            let target_b = tree.create_child(root, "slot-b-target");
            let _ = tx.send((tree.into_shared(), target_a, target_b));
        })?;

        let (visuals, target_a, target_b) = rx
            .recv()
            .map_err(|_| InkError::RenderThread("render thread exited during startup".into()))?;

        Ok((
            RenderDomain { thread, visuals },
            target_a,
            target_b,
        ))
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.thread.dispatcher().clone()
    }

    pub fn compositor(&self) -> CompositorContext {
        self.thread.compositor().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_domain_builds_tree_on_its_thread() {
        let (domain, target_a, target_b) = RenderDomain::start(CommitMode::Manual).unwrap();

        let tree = domain.visuals.lock().unwrap();
        let owner = tree.owner(target_a).unwrap();
        assert_ne!(owner, std::thread::current().id());
        assert_eq!(tree.owner(target_b), Some(owner));
        assert_eq!(tree.owner(tree.root()), Some(owner));
        drop(tree);

        domain.thread.shutdown_and_join();
    }
}
