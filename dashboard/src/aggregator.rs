//! Debounced fetch-and-rank cycles over the live position stream.
//!
//! Position updates are debounced behind a quiet window so GPS jitter does
//! not multiply provider queries; each stable position triggers one cycle of
//! parallel per-category fetches whose results are ranked and published as a
//! single snapshot. A newer cycle cancels the previous one: stale results
//! are discarded, never merged over fresher state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use placesource::{PlaceQueryError, PlaceSource};
use proximity::{rank, Category, Position, RankedPlace};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Provider query radius around the observer.
    pub radius_m: u32,
    /// Updates closer together than this collapse into one cycle.
    pub quiet_window: Duration,
    pub max_distance_km: f64,
    /// Entries kept per category after ranking.
    pub limit: usize,
    pub categories: Vec<Category>,
    pub position_channel_capacity: usize,
    pub event_channel_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            radius_m: 5000,
            quiet_window: Duration::from_millis(500),
            max_distance_km: 5.0,
            limit: 5,
            categories: Category::ALL.to_vec(),
            position_channel_capacity: 64,
            event_channel_capacity: 16,
        }
    }
}

/// One fully-ranked working set. Replaces the previous snapshot wholesale.
#[derive(Debug, Clone, Serialize)]
pub struct ProximitySnapshot {
    pub position: Position,
    pub ranked: HashMap<Category, Vec<RankedPlace>>,
    /// Categories whose query failed this cycle; their working set is empty.
    pub category_errors: HashMap<Category, String>,
    pub cycle: u64,
}

#[derive(Debug, Clone)]
pub enum AggregatorEvent {
    CycleStarted { cycle: u64, position: Position },
    CycleCompleted { snapshot: ProximitySnapshot },
}

struct CycleResult {
    cycle: u64,
    snapshot: ProximitySnapshot,
}

/// ProximityAggregator = (position intake) + (debounce/cycle task) +
/// (event channel for the controller).
pub struct ProximityAggregator {
    join: JoinHandle<()>,
    positions_tx: mpsc::Sender<Position>,
    events_rx: mpsc::Receiver<AggregatorEvent>,
    shutdown: CancellationToken,
}

impl ProximityAggregator {
    pub fn start(cfg: AggregatorConfig, source: Arc<dyn PlaceSource>) -> Self {
        let shutdown = CancellationToken::new();
        let (positions_tx, positions_rx) = mpsc::channel(cfg.position_channel_capacity);
        let (events_tx, events_rx) = mpsc::channel(cfg.event_channel_capacity);

        info!(
            radius_m = cfg.radius_m,
            quiet_window_ms = cfg.quiet_window.as_millis() as u64,
            categories = cfg.categories.len(),
            "proximity aggregator started"
        );

        let join = tokio::spawn(run_loop(
            cfg,
            source,
            positions_rx,
            events_tx,
            shutdown.clone(),
        ));

        Self {
            join,
            positions_tx,
            events_rx,
            shutdown,
        }
    }

    /// Intake for debounced position updates.
    pub fn positions(&self) -> mpsc::Sender<Position> {
        self.positions_tx.clone()
    }

    pub fn events(&mut self) -> &mut mpsc::Receiver<AggregatorEvent> {
        &mut self.events_rx
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        let _ = self.join.await;
    }
}

async fn run_loop(
    cfg: AggregatorConfig,
    source: Arc<dyn PlaceSource>,
    mut positions_rx: mpsc::Receiver<Position>,
    events_tx: mpsc::Sender<AggregatorEvent>,
    shutdown: CancellationToken,
) {
    // The loop keeps one sender alive, so results_rx never closes under it.
    let (results_tx, mut results_rx) = mpsc::channel::<CycleResult>(8);
    let mut pending: Option<Position> = None;
    let mut deadline: Option<Instant> = None;
    let mut cycle: u64 = 0;
    let mut inflight: Option<CancellationToken> = None;

    loop {
        let quiet_over = deadline.unwrap_or_else(Instant::now);
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("aggregator shutdown requested");
                break;
            }

            maybe = positions_rx.recv() => match maybe {
                Some(position) => {
                    pending = Some(position);
                    deadline = Some(Instant::now() + cfg.quiet_window);
                }
                None => break,
            },

            Some(result) = results_rx.recv() => {
                // Last-update-wins: only the newest cycle may publish.
                if result.cycle == cycle {
                    let event = AggregatorEvent::CycleCompleted {
                        snapshot: result.snapshot,
                    };
                    if events_tx.send(event).await.is_err() {
                        break;
                    }
                } else {
                    debug!(stale = result.cycle, current = cycle, "discarding superseded cycle");
                }
            }

            _ = tokio::time::sleep_until(quiet_over), if deadline.is_some() => {
                deadline = None;
                let position = match pending.take() {
                    Some(p) => p,
                    None => continue,
                };

                cycle += 1;
                if let Some(token) = inflight.take() {
                    token.cancel();
                }
                let token = CancellationToken::new();
                inflight = Some(token.clone());

                let event = AggregatorEvent::CycleStarted { cycle, position };
                if events_tx.send(event).await.is_err() {
                    break;
                }
                tokio::spawn(run_cycle(
                    cycle,
                    position,
                    cfg.clone(),
                    Arc::clone(&source),
                    token,
                    results_tx.clone(),
                ));
            }
        }
    }

    if let Some(token) = inflight {
        token.cancel();
    }
}

/// One aggregation cycle: parallel category fetches, per-category ranking,
/// one atomic publication. Failed categories publish empty with an error
/// flag; siblings are unaffected.
async fn run_cycle(
    cycle: u64,
    position: Position,
    cfg: AggregatorConfig,
    source: Arc<dyn PlaceSource>,
    token: CancellationToken,
    results_tx: mpsc::Sender<CycleResult>,
) {
    let mut handles = Vec::with_capacity(cfg.categories.len());
    for category in cfg.categories.iter().copied() {
        let source = Arc::clone(&source);
        let token = token.clone();
        let radius_m = cfg.radius_m;
        handles.push((
            category,
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => None,
                    result = source.fetch_nearby(position, radius_m, category) => Some(result),
                }
            }),
        ));
    }

    let mut ranked = HashMap::new();
    let mut category_errors: HashMap<Category, String> = HashMap::new();
    for (category, handle) in handles {
        match handle.await {
            Ok(Some(Ok(places))) => {
                ranked.insert(
                    category,
                    rank(position, &places, cfg.max_distance_km, cfg.limit),
                );
            }
            Ok(Some(Err(error))) => {
                warn!(%category, "place query failed: {error}");
                ranked.insert(category, Vec::new());
                category_errors.insert(category, error.to_string());
            }
            Ok(None) => return,
            Err(error) => {
                warn!(%category, "cycle fetch task failed: {error}");
                ranked.insert(category, Vec::new());
                category_errors.insert(category, error.to_string());
            }
        }
    }

    if token.is_cancelled() {
        return;
    }

    let snapshot = ProximitySnapshot {
        position,
        ranked,
        category_errors,
        cycle,
    };
    let _ = results_tx.send(CycleResult { cycle, snapshot }).await;
}
