//! Runtime configuration, loaded from the environment with logged defaults.
//!
//! Everything the session needs is explicit here and handed to the
//! controller at construction; nothing reads ambient state later.

use std::{env, fmt::Display, str::FromStr, time::Duration};

use backendclient::BackendConfig;
use geowatch::WatchConfig;
use placesource::OverpassConfig;
use tracing::{debug, warn};

use crate::aggregator::AggregatorConfig;
use crate::alerts::AlertChannelConfig;
use crate::controller::SessionConfig;

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub backend: BackendConfig,
    pub overpass: OverpassConfig,
    pub watch: WatchConfig,
    pub aggregator: AggregatorConfig,
    pub alerts: AlertChannelConfig,
    pub api_bind_addr: String,
}

impl DashboardConfig {
    pub fn load() -> Self {
        let backend = BackendConfig {
            base_url: try_load("SAFETY_BACKEND_URL", "http://127.0.0.1:8000"),
            bearer_token: env::var("SAFETY_BACKEND_TOKEN").unwrap_or_else(|_| {
                warn!("SAFETY_BACKEND_TOKEN not set, requests go out unauthenticated");
                String::new()
            }),
            request_timeout: Duration::from_secs(try_load("SAFETY_BACKEND_TIMEOUT_S", "10")),
        };

        let overpass = OverpassConfig {
            endpoint: try_load(
                "SAFETY_OVERPASS_URL",
                "https://overpass-api.de/api/interpreter",
            ),
            request_timeout: Duration::from_secs(try_load("SAFETY_OVERPASS_TIMEOUT_S", "25")),
        };

        let aggregator = AggregatorConfig {
            radius_m: try_load("SAFETY_RADIUS_M", "5000"),
            quiet_window: Duration::from_millis(try_load("SAFETY_QUIET_WINDOW_MS", "500")),
            max_distance_km: try_load("SAFETY_MAX_DISTANCE_KM", "5.0"),
            limit: try_load("SAFETY_RANK_LIMIT", "5"),
            ..AggregatorConfig::default()
        };

        let alerts = AlertChannelConfig {
            poll_interval: Duration::from_millis(try_load("SAFETY_ALERT_POLL_MS", "5000")),
        };

        Self {
            backend,
            overpass,
            watch: WatchConfig::default(),
            aggregator,
            alerts,
            api_bind_addr: try_load("SAFETY_API_ADDR", "127.0.0.1:8080"),
        }
    }

    pub fn session(&self, user_id: i64) -> SessionConfig {
        SessionConfig {
            user_id,
            watch: self.watch.clone(),
            aggregator: self.aggregator.clone(),
            alerts: self.alerts.clone(),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = match env::var(key) {
        Ok(raw) => raw,
        Err(_) => {
            debug!("{key} not set, using default: {default}");
            default.to_string()
        }
    };

    raw.parse().unwrap_or_else(|e| {
        warn!("invalid {key} value ({e}), using default: {default}");
        default
            .parse()
            .map_err(|e| format!("{e}"))
            .expect("builtin default must parse")
    })
}
