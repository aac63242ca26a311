//! The watch task: one owned subscription, explicit stop.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use proximity::Position;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{PositionBackend, WatchError};

/// Subscription options, mirroring the platform's accuracy/timeout/staleness
/// knobs.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Hint forwarded to the platform source.
    pub high_accuracy: bool,
    /// A gap this long with no fix is reported as a lost signal.
    pub timeout: Duration,
    /// Fixes reported longer ago than this are dropped as stale.
    pub max_age: Duration,
    pub event_channel_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(15),
            max_age: Duration::from_secs(30),
            event_channel_capacity: 32,
        }
    }
}

/// What the watch delivers: a fresh fix, or a classified failure that keeps
/// the subscription alive.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Fix(Position),
    Failed(WatchError),
}

/// GeoWatcher = (platform backend) + (watch task) + (event channel).
///
/// Dropping the handle without `stop()` cancels nothing by itself; the
/// controller owns exactly one watcher and must stop it on unmount.
pub struct GeoWatcher {
    join: JoinHandle<Result<()>>,
    events_rx: mpsc::Receiver<WatchEvent>,
    shutdown: CancellationToken,
}

impl GeoWatcher {
    pub fn start(cfg: WatchConfig, mut backend: Box<dyn PositionBackend>) -> Self {
        let shutdown = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::channel(cfg.event_channel_capacity);

        info!(
            high_accuracy = cfg.high_accuracy,
            timeout_ms = cfg.timeout.as_millis() as u64,
            "position watch started"
        );

        let task_shutdown = shutdown.clone();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_shutdown.cancelled() => {
                        info!("position watch shutdown requested");
                        break;
                    }

                    _ = tokio::time::sleep(cfg.timeout) => {
                        // No fix inside the window. Report and keep watching.
                        warn!("no position fix within {:?}", cfg.timeout);
                        if events_tx.send(WatchEvent::Failed(WatchError::SignalLost)).await.is_err() {
                            return Ok(());
                        }
                    }

                    fix = backend.recv() => {
                        match fix {
                            Some(Ok(fix)) => {
                                let stale = Utc::now()
                                    .signed_duration_since(fix.reported_at)
                                    .to_std()
                                    .map_or(false, |age| age > cfg.max_age);
                                if stale {
                                    debug!("dropping stale fix from {}", fix.reported_at);
                                    continue;
                                }
                                if events_tx.send(WatchEvent::Fix(fix.position)).await.is_err() {
                                    warn!("watch event receiver dropped, stopping watch task");
                                    return Ok(());
                                }
                            }
                            Some(Err(e)) => {
                                warn!("position backend failure: {e}");
                                if events_tx.send(WatchEvent::Failed(e)).await.is_err() {
                                    return Ok(());
                                }
                            }
                            None => {
                                info!("position backend exhausted");
                                break;
                            }
                        }
                    }
                }
            }

            Ok(())
        });

        Self {
            join,
            events_rx,
            shutdown,
        }
    }

    pub fn events(&mut self) -> &mut mpsc::Receiver<WatchEvent> {
        &mut self.events_rx
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel the subscription and wait for the task to finish.
    pub async fn stop(self) -> Result<()> {
        self.shutdown.cancel();
        self.join.await.context("watch task join failed")?
    }
}
