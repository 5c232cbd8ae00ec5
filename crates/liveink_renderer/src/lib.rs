//! Liveink Dynamic Stroke Renderer
//!
//! Renders freehand pen/touch strokes with minimal input-to-pixel latency.
//! Samples arriving on input threads are drawn incrementally on a dedicated
//! render thread; when a stroke ends, its visual content is handed to the
//! application thread through a render-complete-driven state machine that
//! never shows the stroke twice or not at all.
//!
//! # Overview
//!
//! - [`LiveInk`] is the engine facade a host embeds: input events in,
//!   visual-tree mutations out.
//! - Strokes are tracked per device (or one at a time) by an internal
//!   registry with wraparound-tolerant timestamp windows.
//! - Exactly two host slots alternate as transition surfaces bridging the
//!   render thread's output into the application tree.
//! - The handoff coordinator drives the flicker-free transition; strokes
//!   that end while another transition is in flight, and strokes that are
//!   force-aborted, take a fast path instead.
//!
//! # Example
//!
//! ```rust
//! use liveink_core::{batch, Color, InkStyle};
//! use liveink_renderer::{AppContext, LiveInk};
//!
//! let app = AppContext::for_current_thread();
//! let ink = LiveInk::builder(app.clone()).build();
//!
//! ink.root_visual().unwrap();
//! ink.activate().unwrap();
//! ink.set_style(InkStyle::new(Color::from_hex(0x1A6FEB), 3.0)).unwrap();
//!
//! // One stroke: down, move, up, then the host confirms routing.
//! let down = ink.stylus_down(1, 100, &batch(&[(0.0, 0.0)])).unwrap();
//! ink.down_processed(down, true);
//! ink.stylus_move(1, 110, &batch(&[(1.0, 1.0)]));
//! let up = ink.stylus_up(1, 120, &batch(&[(2.0, 2.0)])).unwrap();
//! ink.up_processed(up, true);
//!
//! ink.deactivate().unwrap();
//! ```

pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod plugin;
pub mod state;
pub mod stroke;

mod handoff;
mod host_slot;
mod input;
mod registry;
mod render;

pub use config::{EngineOptions, QualityConfig, RegistryMode};
pub use context::AppContext;
pub use device::{DeviceTracker, NoDeviceTracker};
pub use error::{InkError, Result};
pub use plugin::{LiveInk, LiveInkBuilder};
pub use state::{CompletedStroke, Diagnostics, SlotDiagnostics, TransitionStats};
pub use stroke::InputAck;
