//! Overpass adapter.
//!
//! Issues one bounding query per category (`around:radius,lat,lng` over
//! nodes and ways) and decodes the element set tolerantly: records without
//! resolvable coordinates are dropped, names and addresses fall back to
//! placeholders instead of failing the fetch.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use proximity::{Category, PlacePoint, Position};
use serde::Deserialize;
use tracing::debug;

use crate::source::{PlaceQueryError, PlaceSource};

const UNNAMED_PLACE: &str = "Unnamed Place";
const NO_ADDRESS: &str = "Address not available";

#[derive(Debug, Clone)]
pub struct OverpassConfig {
    pub endpoint: String,
    pub request_timeout: Duration,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://overpass-api.de/api/interpreter".to_string(),
            request_timeout: Duration::from_secs(25),
        }
    }
}

pub struct OverpassSource {
    client: reqwest::Client,
    cfg: OverpassConfig,
}

impl OverpassSource {
    pub fn new(cfg: OverpassConfig) -> Result<Self, PlaceQueryError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self { client, cfg })
    }
}

#[async_trait]
impl PlaceSource for OverpassSource {
    async fn fetch_nearby(
        &self,
        center: Position,
        radius_m: u32,
        category: Category,
    ) -> Result<Vec<PlacePoint>, PlaceQueryError> {
        let query = build_query(center, radius_m, category);
        debug!(%category, radius_m, "querying place provider");

        let response = self
            .client
            .post(&self.cfg.endpoint)
            .form(&[("data", query.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PlaceQueryError::Rejected(format!(
                "status {}",
                response.status()
            )));
        }
        let text = response.text().await?;

        let body: OverpassResponse = serde_json::from_str(&text)?;
        let places: Vec<PlacePoint> = body
            .elements
            .into_iter()
            .filter_map(|element| element.into_place(category))
            .collect();

        debug!(%category, count = places.len(), "place provider responded");
        Ok(places)
    }
}

/// OSM tag selector for a dashboard category.
fn selector(category: Category) -> (&'static str, &'static str) {
    match category {
        Category::Hospital => ("amenity", "hospital"),
        Category::Police => ("amenity", "police"),
        Category::Pharmacy => ("amenity", "pharmacy"),
        Category::Restaurant => ("amenity", "restaurant"),
        Category::Attraction => ("tourism", "attraction"),
    }
}

fn build_query(center: Position, radius_m: u32, category: Category) -> String {
    let (key, value) = selector(category);
    let (lat, lng) = (center.latitude, center.longitude);
    format!(
        "[out:json][timeout:25];\
         (node[\"{key}\"=\"{value}\"](around:{radius_m},{lat},{lng});\
          way[\"{key}\"=\"{value}\"](around:{radius_m},{lat},{lng}););\
         out center;"
    )
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    element_type: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    /// Direct coordinates for nodes; the `center` pair for area features.
    fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => self.center.as_ref().map(|c| (c.lat, c.lon)),
        }
    }

    fn into_place(self, category: Category) -> Option<PlacePoint> {
        let (latitude, longitude) = self.coordinates()?;
        let id = format!("{}/{}", self.element_type, self.id);
        let name = self
            .tags
            .get("name")
            .filter(|n| !n.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| UNNAMED_PLACE.to_string());
        let address = synthesize_address(&self.tags);
        let description = self.tags.get("description").cloned();

        Some(PlacePoint {
            id,
            name,
            category,
            latitude,
            longitude,
            address,
            description,
        })
    }
}

/// Address policy: full formatted address when present, otherwise composed
/// from sub-fields (house number + street, then city), otherwise a
/// placeholder.
fn synthesize_address(tags: &BTreeMap<String, String>) -> String {
    if let Some(full) = tags.get("addr:full").filter(|a| !a.trim().is_empty()) {
        return full.clone();
    }

    let mut parts: Vec<String> = Vec::new();
    match (tags.get("addr:housenumber"), tags.get("addr:street")) {
        (Some(number), Some(street)) => parts.push(format!("{number} {street}")),
        (None, Some(street)) => parts.push(street.clone()),
        _ => {}
    }
    if let Some(city) = tags.get("addr:city") {
        parts.push(city.clone());
    }

    if parts.is_empty() {
        NO_ADDRESS.to_string()
    } else {
        parts.join(", ")
    }
}
