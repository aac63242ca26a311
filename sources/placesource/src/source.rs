//! Query boundary for external POI providers.

use async_trait::async_trait;
use proximity::{Category, PlacePoint, Position};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaceQueryError {
    #[error("place provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("place provider rejected the query: {0}")]
    Rejected(String),
    #[error("place provider returned a malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A provider of points of interest around a center.
///
/// Pure query: implementations hold no cache; refresh and merge policy
/// belong to the aggregator.
#[async_trait]
pub trait PlaceSource: Send + Sync {
    async fn fetch_nearby(
        &self,
        center: Position,
        radius_m: u32,
        category: Category,
    ) -> Result<Vec<PlacePoint>, PlaceQueryError>;
}
