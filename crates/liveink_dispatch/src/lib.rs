//! Liveink Cross-Thread Dispatch
//!
//! Ordered marshaling of work between the application thread and the
//! dedicated render thread:
//!
//! - **Dispatcher**: a per-thread work queue with two priority classes.
//!   `Send`-class callbacks run head-of-line, strictly before any
//!   `Input`-class work, and in submission order within a class.
//! - **DispatcherThread**: a dedicated thread pumping a dispatcher until
//!   shut down, optionally committing a simulated frame after each drained
//!   batch of work.
//! - **CompositorContext**: the per-thread "render complete" signal. Phases
//!   of the stroke handoff protocol arm one-shot callbacks that fire on the
//!   next committed frame of the owning thread.

pub mod compositor;
pub mod dispatcher;
pub mod error;
pub mod thread;

pub use compositor::CompositorContext;
pub use dispatcher::{Dispatcher, Priority};
pub use error::{DispatchError, Result};
pub use thread::{CommitMode, DispatcherThread};
