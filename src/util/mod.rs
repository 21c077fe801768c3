//! Helpers for views built on view models.
//!
//! The timed helpers run on tokio time and deliver through a
//! [`crate::Dispatcher`], so a UI can receive their callbacks on its own
//! thread.

pub mod collections;
pub mod latch;
pub mod repeater;
pub mod state_latch;
pub mod suppressor;
pub mod throttler;
pub mod timer;

pub use latch::ValueLatch;
pub use repeater::ValueRepeater;
pub use state_latch::{CompositeStateLatch, StateLatch};
pub use suppressor::ValueSuppressor;
pub use throttler::ValueThrottler;
pub use timer::{Timer, TimerTask};
