//! One-shot SOS dispatch from the current tracked position.

use std::sync::Arc;

use backendclient::{BackendError, SosAlert, SosRequest};
use proximity::Position;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::SafetyBackend;

#[derive(Error, Debug)]
pub enum SosError {
    /// Precondition: the caller must not send coordinates it does not have.
    #[error("no tracked position available for SOS dispatch")]
    NoLocationAvailable,
    #[error("SOS dispatch failed: {0}")]
    DispatchFailed(#[source] BackendError),
}

pub struct SosEmitter {
    api: Arc<dyn SafetyBackend>,
    tourist_id: i64,
}

impl SosEmitter {
    pub fn new(api: Arc<dyn SafetyBackend>, tourist_id: i64) -> Self {
        Self { api, tourist_id }
    }

    /// Fire exactly one creation request. No retry on failure: resending an
    /// emergency alert is an explicit caller decision.
    pub async fn emit(
        &self,
        position: Option<Position>,
        description: &str,
    ) -> Result<SosAlert, SosError> {
        let position = position.ok_or(SosError::NoLocationAvailable)?;

        let request = SosRequest {
            tourist_id: self.tourist_id,
            lat: position.latitude,
            lng: position.longitude,
            description: description.to_string(),
        };

        match self.api.create_sos(&request).await {
            Ok(alert) => {
                info!(alert_id = alert.id, "SOS alert dispatched from {position}");
                Ok(alert)
            }
            Err(error) => {
                warn!("SOS dispatch failed: {error}");
                Err(SosError::DispatchFailed(error))
            }
        }
    }
}
