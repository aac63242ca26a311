//! The HTTP client.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::models::{
    ActiveAlerts, AuthorityProfile, Incident, PanicReport, SosAlert, SosRequest, TouristProfile,
    TouristSummary,
};

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub bearer_token: String,
    pub request_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            bearer_token: String::new(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("backend returned a malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    cfg: BackendConfig,
}

impl BackendClient {
    pub fn new(cfg: BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self { client, cfg })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BackendError> {
        debug!(path, "backend GET");
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.cfg.bearer_token)
            .query(query)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::Rejected(format!(
                "status {} on {path}",
                response.status()
            )));
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        debug!(path, "backend POST");
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.cfg.bearer_token)
            .json(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::Rejected(format!(
                "status {} on {path}",
                response.status()
            )));
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn tourist_profile(&self, user_id: i64) -> Result<TouristProfile, BackendError> {
        self.get_json("/api/profile/tourist/", &[("user_id", user_id.to_string())])
            .await
    }

    pub async fn authority_profile(&self, user_id: i64) -> Result<AuthorityProfile, BackendError> {
        self.get_json("/api/profile/authority/", &[("user_id", user_id.to_string())])
            .await
    }

    /// Full tourist roster; authority sessions only.
    pub async fn tourists(&self) -> Result<Vec<TouristSummary>, BackendError> {
        self.get_json("/api/tourists/", &[]).await
    }

    /// Current set of unresolved SOS alerts.
    pub async fn active_alerts(&self) -> Result<Vec<SosAlert>, BackendError> {
        let feed: ActiveAlerts = self.get_json("/api/sos/active/", &[]).await?;
        Ok(feed.alerts)
    }

    pub async fn create_sos(&self, request: &SosRequest) -> Result<SosAlert, BackendError> {
        self.post_json("/api/sos/", request).await
    }

    pub async fn report_panic(&self, report: &PanicReport) -> Result<Incident, BackendError> {
        self.post_json("/api/incidents/panic/", report).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = BackendClient::new(BackendConfig {
            base_url: "http://backend.local/".to_string(),
            ..BackendConfig::default()
        })
        .unwrap();
        assert_eq!(client.url("/api/sos/"), "http://backend.local/api/sos/");
    }
}
