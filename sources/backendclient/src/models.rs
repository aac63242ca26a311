//! Wire models for the safety backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TouristProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub blockchain_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department: String,
}

/// Roster entry for the authority dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TouristSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

/// An active emergency alert. The dashboard holds a read-only snapshot of
/// these; the backend owns their lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosAlert {
    pub id: i64,
    pub tourist_id: i64,
    pub tourist_name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Poll envelope for the active alert feed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveAlerts {
    #[serde(default)]
    pub alerts: Vec<SosAlert>,
}

/// Creation request for a new SOS alert.
#[derive(Debug, Clone, Serialize)]
pub struct SosRequest {
    pub tourist_id: i64,
    pub lat: f64,
    pub lng: f64,
    pub description: String,
}

/// Panic report payload for the incident endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PanicReport {
    pub profile: i64,
    pub title: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: i64,
    pub title: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_deserializes_from_backend_json() {
        let alert: SosAlert = serde_json::from_str(
            r#"{"id":3,"tourist_id":9,"tourist_name":"Asha","lat":12.97,"lng":77.59,
                "description":"lost near market","created_at":"2026-08-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(alert.tourist_name, "Asha");
        assert_eq!(alert.lat, 12.97);
    }

    #[test]
    fn test_empty_alert_envelope() {
        let feed: ActiveAlerts = serde_json::from_str(r#"{"alerts":[]}"#).unwrap();
        assert!(feed.alerts.is_empty());
    }

    #[test]
    fn test_profile_tolerates_missing_optional_fields() {
        let profile: TouristProfile =
            serde_json::from_str(r#"{"id":1,"name":"Ravi","email":"r@example.com"}"#).unwrap();
        assert_eq!(profile.phone, "");
        assert_eq!(profile.blockchain_id, "");
    }
}
