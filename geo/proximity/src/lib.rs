//! Geographic core for the safety dashboard.
//!
//! Positions, points of interest and great-circle distance ranking. This
//! crate is pure data + math: no I/O, no clocks, no shared state.

pub mod position;
pub mod ranker;

// Re-exports
pub use position::{haversine_km, Category, PlacePoint, Position, RankedPlace, EARTH_RADIUS_KM};
pub use ranker::rank;
