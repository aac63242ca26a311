//! Continuous position tracking.
//!
//! Wraps the platform's position-reporting capability behind the
//! [`PositionBackend`] trait and runs the watch as an owned task with an
//! explicit `start`/`stop` lifecycle, so subscription and cancellation stay
//! auditable outside any UI layer.

pub mod backend;
pub mod watcher;

// Re-exports
pub use backend::{ChannelBackend, PositionBackend, PositionFeed, PositionFix, ReplayBackend, WatchError};
pub use watcher::{GeoWatcher, WatchConfig, WatchEvent};
