//! Client for the safety backend REST API.
//!
//! Profiles, the tourist roster, the SOS alert feed and incident creation,
//! exchanged as JSON over HTTPS with a bearer token.

pub mod client;
pub mod models;

// Re-exports
pub use client::{BackendClient, BackendConfig, BackendError};
pub use models::{
    ActiveAlerts, AuthorityProfile, Incident, PanicReport, SosAlert, SosRequest, TouristProfile,
    TouristSummary,
};
