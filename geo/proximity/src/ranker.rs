//! Distance ranking with graceful degradation.
//!
//! Candidates are ranked by great-circle distance from the observer. When
//! nothing falls inside the radius the closest candidates are returned
//! instead: the nearest hospital must stay visible even when it is far away.

use std::cmp::Ordering;

use crate::position::{haversine_km, PlacePoint, Position, RankedPlace};

/// Rank `candidates` by distance from `observer`.
///
/// Candidates whose distance is not a finite non-negative number are
/// discarded. The result is ascending by `distance_km` (stable sort, ties
/// keep fetch order), restricted to `max_distance_km` when that subset is
/// non-empty and falling back to the closest candidates otherwise, then
/// truncated to `limit`.
pub fn rank(
    observer: Position,
    candidates: &[PlacePoint],
    max_distance_km: f64,
    limit: usize,
) -> Vec<RankedPlace> {
    let mut ranked: Vec<RankedPlace> = candidates
        .iter()
        .filter_map(|place| {
            let distance_km = haversine_km(observer, place.position());
            if !distance_km.is_finite() || distance_km < 0.0 {
                return None;
            }
            Some(RankedPlace {
                place: place.clone(),
                distance_km,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(Ordering::Equal)
    });

    let within = ranked
        .iter()
        .take_while(|r| r.distance_km <= max_distance_km)
        .count();

    if within > 0 {
        ranked.truncate(within);
    }
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Category;

    fn place(id: &str, latitude: f64, longitude: f64) -> PlacePoint {
        PlacePoint {
            id: id.to_string(),
            name: format!("place {id}"),
            category: Category::Hospital,
            latitude,
            longitude,
            address: "somewhere".to_string(),
            description: None,
        }
    }

    fn observer() -> Position {
        Position::new(12.9716, 77.5946)
    }

    #[test]
    fn test_output_is_sorted_ascending() {
        let candidates = vec![
            place("node/3", 13.05, 77.60),
            place("node/1", 12.9717, 77.5947),
            place("node/2", 12.99, 77.60),
        ];
        let ranked = rank(observer(), &candidates, 50.0, 10);
        assert_eq!(ranked.len(), 3);
        for pair in ranked.windows(2) {
            assert!(pair[0].distance_km <= pair[1].distance_km);
        }
        assert_eq!(ranked[0].place.id, "node/1");
    }

    #[test]
    fn test_nearby_hospital_ranks_first_within_radius() {
        let candidates = vec![place("node/h", 12.9717, 77.5947)];
        let ranked = rank(observer(), &candidates, 5.0, 5);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].distance_km - 0.015).abs() < 0.005);
    }

    #[test]
    fn test_fallback_returns_closest_when_radius_is_empty() {
        // Both candidates far outside the 5 km radius.
        let candidates = vec![
            place("node/far", 13.3409, 74.7421),
            place("node/farther", 17.3850, 78.4867),
        ];
        let ranked = rank(observer(), &candidates, 5.0, 1);
        assert_eq!(ranked.len(), 1, "closest candidate must survive");
        assert_eq!(ranked[0].place.id, "node/far");
        assert!(ranked[0].distance_km > 5.0);
    }

    #[test]
    fn test_fallback_law_min_of_total_and_limit() {
        let candidates = vec![
            place("node/a", 20.0, 77.0),
            place("node/b", 21.0, 77.0),
            place("node/c", 22.0, 77.0),
        ];
        let ranked = rank(observer(), &candidates, 1.0, 10);
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn test_limit_truncates_within_radius() {
        let candidates = vec![
            place("node/a", 12.9717, 77.5947),
            place("node/b", 12.9720, 77.5950),
            place("node/c", 12.9730, 77.5960),
        ];
        let ranked = rank(observer(), &candidates, 5.0, 2);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn test_invalid_coordinates_are_discarded() {
        let candidates = vec![
            place("node/bad", f64::NAN, 77.5947),
            place("node/good", 12.9717, 77.5947),
        ];
        let ranked = rank(observer(), &candidates, 5.0, 5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].place.id, "node/good");
    }

    #[test]
    fn test_empty_candidates_yield_empty_result() {
        let ranked = rank(observer(), &[], 5.0, 5);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_rank_is_idempotent() {
        let candidates = vec![
            place("node/1", 12.9717, 77.5947),
            place("node/2", 12.99, 77.60),
        ];
        let first = rank(observer(), &candidates, 5.0, 5);
        let second = rank(observer(), &candidates, 5.0, 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_ties_keep_fetch_order() {
        // Identical coordinates, distinct ids: stable sort keeps fetch order.
        let candidates = vec![
            place("node/first", 12.9717, 77.5947),
            place("node/second", 12.9717, 77.5947),
        ];
        let ranked = rank(observer(), &candidates, 5.0, 5);
        assert_eq!(ranked[0].place.id, "node/first");
        assert_eq!(ranked[1].place.id, "node/second");
    }
}
