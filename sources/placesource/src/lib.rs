//! Point-of-interest sources.
//!
//! The [`PlaceSource`] trait is the query boundary the aggregator fans out
//! over; [`OverpassSource`] is the production adapter for an Overpass-style
//! provider.

pub mod overpass;
pub mod source;

// Re-exports
pub use overpass::{OverpassConfig, OverpassSource};
pub use source::{PlaceQueryError, PlaceSource};
