//! Core geographic value types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// An observer coordinate. Immutable value; a new fix replaces the old one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite coordinates inside the WGS84 envelope.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Great-circle distance between two positions (haversine).
pub fn haversine_km(a: Position, b: Position) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Kinds of points of interest tracked by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Hospital,
    Police,
    Pharmacy,
    Restaurant,
    Attraction,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Hospital,
        Category::Police,
        Category::Pharmacy,
        Category::Restaurant,
        Category::Attraction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Hospital => "hospital",
            Category::Police => "police",
            Category::Pharmacy => "pharmacy",
            Category::Restaurant => "restaurant",
            Category::Attraction => "attraction",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point of interest as fetched from the provider, not yet ranked.
///
/// `id` is source-qualified (`"{element_type}/{element_id}"`) so ids from
/// different element kinds never collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacePoint {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PlacePoint {
    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }
}

/// A place plus its computed distance from the observer. Derived on every
/// ranking pass, never cached on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPlace {
    #[serde(flatten)]
    pub place: PlacePoint,
    pub distance_km: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = Position::new(12.9716, 77.5946);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = Position::new(12.9716, 77.5946);
        let b = Position::new(13.0827, 80.2707);
        let ab = haversine_km(a, b);
        let ba = haversine_km(b, a);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_adjacent_points_distance() {
        // Observer and a hospital one street apart.
        let observer = Position::new(12.9716, 77.5946);
        let hospital = Position::new(12.9717, 77.5947);
        let d = haversine_km(observer, hospital);
        assert!((d - 0.015).abs() < 0.005, "got {d}");
    }

    #[test]
    fn test_position_validity() {
        assert!(Position::new(0.0, 0.0).is_valid());
        assert!(Position::new(-90.0, 180.0).is_valid());
        assert!(!Position::new(91.0, 0.0).is_valid());
        assert!(!Position::new(0.0, -181.0).is_valid());
        assert!(!Position::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Hospital).unwrap();
        assert_eq!(json, "\"hospital\"");
    }
}
