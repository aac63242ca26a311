//! Proximity-aware safety dashboard engine.
//!
//! Composes the position watch, proximity aggregation, alert polling and SOS
//! dispatch behind one session controller with an explicit start/stop
//! lifecycle, and exposes the live view model to the presentation layer.

pub mod aggregator;
pub mod alerts;
pub mod api;
pub mod config;
pub mod controller;
pub mod rest_api;
pub mod sos;
pub mod viewmodel;

// Re-exports
pub use aggregator::{AggregatorConfig, AggregatorEvent, ProximityAggregator, ProximitySnapshot};
pub use alerts::{AlertChannel, AlertChannelConfig, AlertFeed};
pub use api::SafetyBackend;
pub use config::DashboardConfig;
pub use controller::{DashboardController, SessionConfig};
pub use rest_api::ApiState;
pub use sos::{SosEmitter, SosError};
pub use viewmodel::{DashboardState, DashboardView, ErrorFlags, LoadingFlags, Mode};
