//! Fixed-interval SOS alert polling.
//!
//! Each successful poll wholly replaces the alert snapshot; an alert absent
//! from a fetch is treated as resolved. A failed poll keeps the previous
//! snapshot, flags the failure as transient and retries on the next tick.

use std::sync::Arc;
use std::time::Duration;

use backendclient::SosAlert;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::SafetyBackend;

#[derive(Debug, Clone)]
pub struct AlertChannelConfig {
    pub poll_interval: Duration,
}

impl Default for AlertChannelConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// The current alert snapshot plus transient poll status.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertFeed {
    pub alerts: Vec<SosAlert>,
    /// Set while the last poll failed; cleared by the next success.
    pub poll_error: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// AlertChannel = (poll task) + (watch channel with the latest snapshot).
pub struct AlertChannel {
    join: JoinHandle<()>,
    feed_rx: watch::Receiver<AlertFeed>,
    shutdown: CancellationToken,
}

impl AlertChannel {
    pub fn start(cfg: AlertChannelConfig, api: Arc<dyn SafetyBackend>) -> Self {
        let shutdown = CancellationToken::new();
        let (feed_tx, feed_rx) = watch::channel(AlertFeed::default());

        info!(
            poll_interval_ms = cfg.poll_interval.as_millis() as u64,
            "alert channel started"
        );

        let task_shutdown = shutdown.clone();

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cfg.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_shutdown.cancelled() => {
                        info!("alert polling shutdown requested");
                        break;
                    }

                    // First tick completes immediately: initial fetch up front.
                    _ = ticker.tick() => {
                        match api.active_alerts().await {
                            Ok(alerts) => {
                                debug!(count = alerts.len(), "alert snapshot replaced");
                                feed_tx.send_replace(AlertFeed {
                                    alerts,
                                    poll_error: None,
                                    fetched_at: Some(Utc::now()),
                                });
                            }
                            Err(error) => {
                                // Transient: retry on the next tick.
                                warn!("alert poll failed: {error}");
                                feed_tx.send_modify(|feed| {
                                    feed.poll_error = Some(error.to_string());
                                });
                            }
                        }
                    }
                }
            }
        });

        Self {
            join,
            feed_rx,
            shutdown,
        }
    }

    pub fn feed(&self) -> watch::Receiver<AlertFeed> {
        self.feed_rx.clone()
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        let _ = self.join.await;
    }
}
