//! Seam over the remote safety backend.
//!
//! The controller, alert channel and SOS emitter talk to this trait so the
//! network edge stays swappable in tests.

use async_trait::async_trait;
use backendclient::{
    AuthorityProfile, BackendClient, BackendError, SosAlert, SosRequest, TouristProfile,
    TouristSummary,
};

#[async_trait]
pub trait SafetyBackend: Send + Sync {
    async fn tourist_profile(&self, user_id: i64) -> Result<TouristProfile, BackendError>;
    async fn authority_profile(&self, user_id: i64) -> Result<AuthorityProfile, BackendError>;
    async fn tourists(&self) -> Result<Vec<TouristSummary>, BackendError>;
    async fn active_alerts(&self) -> Result<Vec<SosAlert>, BackendError>;
    async fn create_sos(&self, request: &SosRequest) -> Result<SosAlert, BackendError>;
}

#[async_trait]
impl SafetyBackend for BackendClient {
    async fn tourist_profile(&self, user_id: i64) -> Result<TouristProfile, BackendError> {
        BackendClient::tourist_profile(self, user_id).await
    }

    async fn authority_profile(&self, user_id: i64) -> Result<AuthorityProfile, BackendError> {
        BackendClient::authority_profile(self, user_id).await
    }

    async fn tourists(&self) -> Result<Vec<TouristSummary>, BackendError> {
        BackendClient::tourists(self).await
    }

    async fn active_alerts(&self) -> Result<Vec<SosAlert>, BackendError> {
        BackendClient::active_alerts(self).await
    }

    async fn create_sos(&self, request: &SosRequest) -> Result<SosAlert, BackendError> {
        BackendClient::create_sos(self, request).await
    }
}
