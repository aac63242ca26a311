//! Session controller.
//!
//! Owns the lifecycle of the watch, aggregation and alert subsystems for one
//! dashboard session and drives the state machine:
//! tourist `Initializing → Tracking ⇄ Refreshing`, authority
//! `Initializing → Polling`, both terminal in `Stopped`.

use std::sync::Arc;

use anyhow::{Context, Result};
use backendclient::SosAlert;
use geowatch::{GeoWatcher, PositionBackend, WatchConfig, WatchEvent};
use placesource::PlaceSource;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregator::{AggregatorConfig, AggregatorEvent, ProximityAggregator};
use crate::alerts::{AlertChannel, AlertChannelConfig};
use crate::api::SafetyBackend;
use crate::sos::{SosEmitter, SosError};
use crate::viewmodel::{DashboardState, DashboardView, Mode};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Backend user id resolved during Initializing.
    pub user_id: i64,
    pub watch: WatchConfig,
    pub aggregator: AggregatorConfig,
    pub alerts: AlertChannelConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: 1,
            watch: WatchConfig::default(),
            aggregator: AggregatorConfig::default(),
            alerts: AlertChannelConfig::default(),
        }
    }
}

/// One running dashboard session.
///
/// `start_*` consumes its position backend, so a session can never hold two
/// hardware subscriptions; `stop()` tears everything down deterministically.
pub struct DashboardController {
    mode: Mode,
    join: JoinHandle<()>,
    view_rx: watch::Receiver<DashboardView>,
    shutdown: CancellationToken,
    sos: SosEmitter,
}

impl DashboardController {
    pub fn start_tourist(
        cfg: SessionConfig,
        api: Arc<dyn SafetyBackend>,
        places: Arc<dyn PlaceSource>,
        position_backend: Box<dyn PositionBackend>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let (view_tx, view_rx) = watch::channel(DashboardView::new(Mode::Tourist));
        let sos = SosEmitter::new(api.clone(), cfg.user_id);

        let join = tokio::spawn(run_tourist(
            cfg,
            api,
            places,
            position_backend,
            view_tx,
            shutdown.clone(),
        ));

        Self {
            mode: Mode::Tourist,
            join,
            view_rx,
            shutdown,
            sos,
        }
    }

    pub fn start_authority(cfg: SessionConfig, api: Arc<dyn SafetyBackend>) -> Self {
        let shutdown = CancellationToken::new();
        let (view_tx, view_rx) = watch::channel(DashboardView::new(Mode::Authority));
        let sos = SosEmitter::new(api.clone(), cfg.user_id);

        let join = tokio::spawn(run_authority(cfg, api, view_tx, shutdown.clone()));

        Self {
            mode: Mode::Authority,
            join,
            view_rx,
            shutdown,
            sos,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Live view model; refreshed on every state transition.
    pub fn view(&self) -> watch::Receiver<DashboardView> {
        self.view_rx.clone()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Dispatch an SOS alert from the current tracked position.
    pub async fn send_sos(&self, description: &str) -> Result<SosAlert, SosError> {
        let position = self.view_rx.borrow().position;
        self.sos.emit(position, description).await
    }

    /// Enter the terminal `Stopped` state and wait for teardown.
    pub async fn stop(self) -> Result<()> {
        self.shutdown.cancel();
        self.join.await.context("dashboard task join failed")
    }
}

async fn run_tourist(
    cfg: SessionConfig,
    api: Arc<dyn SafetyBackend>,
    places: Arc<dyn PlaceSource>,
    position_backend: Box<dyn PositionBackend>,
    view_tx: watch::Sender<DashboardView>,
    shutdown: CancellationToken,
) {
    // Initializing: the profile fetch resolves the first transition. A
    // failure is recorded but does not keep the dashboard from tracking.
    match api.tourist_profile(cfg.user_id).await {
        Ok(profile) => {
            info!("tourist session started for {}", profile.name);
            view_tx.send_modify(|view| view.loading.profile = false);
        }
        Err(error) => {
            warn!("tourist profile fetch failed: {error}");
            view_tx.send_modify(|view| {
                view.loading.profile = false;
                view.errors.profile = Some(error.to_string());
            });
        }
    }
    view_tx.send_modify(|view| view.state = DashboardState::Tracking);

    let mut watcher = GeoWatcher::start(cfg.watch.clone(), position_backend);
    let mut aggregator = ProximityAggregator::start(cfg.aggregator.clone(), places);
    let positions_tx = aggregator.positions();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            event = watcher.events().recv() => match event {
                Some(WatchEvent::Fix(position)) => {
                    view_tx.send_modify(|view| {
                        view.position = Some(position);
                        view.errors.location = None;
                    });
                    if positions_tx.send(position).await.is_err() {
                        break;
                    }
                }
                Some(WatchEvent::Failed(error)) => {
                    // Location is unavailable: surface it and halt proximity
                    // refresh until a fresh fix arrives.
                    view_tx.send_modify(|view| {
                        view.errors.location = Some(error.to_string());
                    });
                }
                None => break,
            },

            event = aggregator.events().recv() => match event {
                Some(AggregatorEvent::CycleStarted { cycle, position }) => {
                    debug!(cycle, "refreshing at {position}");
                    view_tx.send_modify(|view| {
                        view.state = DashboardState::Refreshing;
                        view.loading.places = true;
                    });
                }
                Some(AggregatorEvent::CycleCompleted { snapshot }) => {
                    view_tx.send_modify(|view| {
                        view.state = DashboardState::Tracking;
                        view.loading.places = false;
                        view.ranked_places = snapshot.ranked;
                        view.errors.places = snapshot.category_errors;
                    });
                }
                None => break,
            },
        }
    }

    if let Err(error) = watcher.stop().await {
        warn!("position watch stop failed: {error}");
    }
    aggregator.stop().await;
    view_tx.send_modify(|view| view.state = DashboardState::Stopped);
    info!("tourist dashboard stopped");
}

async fn run_authority(
    cfg: SessionConfig,
    api: Arc<dyn SafetyBackend>,
    view_tx: watch::Sender<DashboardView>,
    shutdown: CancellationToken,
) {
    // Initializing: the roster fetch resolves the first transition.
    match api.tourists().await {
        Ok(tourists) => {
            info!("authority session tracking {} tourists", tourists.len());
            view_tx.send_modify(|view| {
                view.loading.profile = false;
                view.tourists = tourists;
            });
        }
        Err(error) => {
            warn!("tourist roster fetch failed: {error}");
            view_tx.send_modify(|view| {
                view.loading.profile = false;
                view.errors.profile = Some(error.to_string());
            });
        }
    }
    view_tx.send_modify(|view| view.state = DashboardState::Polling);

    let channel = AlertChannel::start(cfg.alerts.clone(), api);
    let mut feed_rx = channel.feed();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            changed = feed_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let feed = feed_rx.borrow_and_update().clone();
                view_tx.send_modify(|view| {
                    view.loading.alerts = false;
                    view.alerts = feed.alerts;
                    view.errors.alerts = feed.poll_error;
                });
            }
        }
    }

    channel.stop().await;
    view_tx.send_modify(|view| view.state = DashboardState::Stopped);
    info!("authority dashboard stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use backendclient::{
        AuthorityProfile, BackendError, SosRequest, TouristProfile, TouristSummary,
    };
    use chrono::Utc;
    use geowatch::ChannelBackend;
    use placesource::PlaceQueryError;
    use proximity::{Category, PlacePoint, Position};

    struct FakeBackend {
        alerts: Vec<SosAlert>,
    }

    #[async_trait]
    impl SafetyBackend for FakeBackend {
        async fn tourist_profile(&self, user_id: i64) -> Result<TouristProfile, BackendError> {
            Ok(TouristProfile {
                id: user_id,
                name: "Ravi".to_string(),
                email: "ravi@example.com".to_string(),
                phone: String::new(),
                country: String::new(),
                blockchain_id: String::new(),
            })
        }

        async fn authority_profile(
            &self,
            user_id: i64,
        ) -> Result<AuthorityProfile, BackendError> {
            Ok(AuthorityProfile {
                id: user_id,
                name: "Officer".to_string(),
                email: "officer@example.com".to_string(),
                department: String::new(),
            })
        }

        async fn tourists(&self) -> Result<Vec<TouristSummary>, BackendError> {
            Ok(vec![TouristSummary {
                id: 7,
                name: "Ravi".to_string(),
                phone: String::new(),
            }])
        }

        async fn active_alerts(&self) -> Result<Vec<SosAlert>, BackendError> {
            Ok(self.alerts.clone())
        }

        async fn create_sos(&self, request: &SosRequest) -> Result<SosAlert, BackendError> {
            Ok(SosAlert {
                id: 99,
                tourist_id: request.tourist_id,
                tourist_name: "Ravi".to_string(),
                lat: request.lat,
                lng: request.lng,
                description: request.description.clone(),
                created_at: Utc::now(),
            })
        }
    }

    struct OnePlaceSource;

    #[async_trait]
    impl PlaceSource for OnePlaceSource {
        async fn fetch_nearby(
            &self,
            center: Position,
            _radius_m: u32,
            category: Category,
        ) -> Result<Vec<PlacePoint>, PlaceQueryError> {
            Ok(vec![PlacePoint {
                id: format!("node/{category}"),
                name: "Nearby".to_string(),
                category,
                latitude: center.latitude + 0.0001,
                longitude: center.longitude + 0.0001,
                address: "test".to_string(),
                description: None,
            }])
        }
    }

    fn quick_session() -> SessionConfig {
        SessionConfig {
            user_id: 7,
            aggregator: AggregatorConfig {
                quiet_window: Duration::from_millis(20),
                categories: vec![Category::Hospital],
                ..AggregatorConfig::default()
            },
            alerts: AlertChannelConfig {
                poll_interval: Duration::from_millis(30),
            },
            ..SessionConfig::default()
        }
    }

    async fn wait_for_view<F>(view: &mut watch::Receiver<DashboardView>, mut accept: F)
    where
        F: FnMut(&DashboardView) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                if accept(&*view.borrow_and_update()) {
                    return;
                }
                view.changed().await.expect("view channel closed");
            }
        })
        .await
        .expect("view never reached the expected state");
    }

    #[tokio::test]
    async fn test_tourist_session_tracks_and_ranks() {
        let (feed, backend) = ChannelBackend::new(8);
        let controller = DashboardController::start_tourist(
            quick_session(),
            Arc::new(FakeBackend { alerts: Vec::new() }),
            Arc::new(OnePlaceSource),
            Box::new(backend),
        );
        let mut view = controller.view();

        wait_for_view(&mut view, |v| v.state == DashboardState::Tracking).await;

        feed.push(Position::new(12.9716, 77.5946)).await;

        wait_for_view(&mut view, |v| {
            v.position.is_some()
                && v.ranked_places
                    .get(&Category::Hospital)
                    .map_or(false, |places| !places.is_empty())
        })
        .await;

        let snapshot = view.borrow().clone();
        assert_eq!(snapshot.mode, Mode::Tourist);
        assert!(snapshot.errors.location.is_none());

        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_reaches_terminal_state() {
        let (_feed, backend) = ChannelBackend::new(8);
        let controller = DashboardController::start_tourist(
            quick_session(),
            Arc::new(FakeBackend { alerts: Vec::new() }),
            Arc::new(OnePlaceSource),
            Box::new(backend),
        );
        let mut view = controller.view();

        wait_for_view(&mut view, |v| v.state == DashboardState::Tracking).await;
        controller.stop().await.unwrap();

        assert_eq!(view.borrow().state, DashboardState::Stopped);
    }

    #[tokio::test]
    async fn test_location_failure_surfaces_and_halts_refresh() {
        let (feed, backend) = ChannelBackend::new(8);
        let controller = DashboardController::start_tourist(
            quick_session(),
            Arc::new(FakeBackend { alerts: Vec::new() }),
            Arc::new(OnePlaceSource),
            Box::new(backend),
        );
        let mut view = controller.view();

        wait_for_view(&mut view, |v| v.state == DashboardState::Tracking).await;
        feed.fail(geowatch::WatchError::PermissionDenied).await;

        wait_for_view(&mut view, |v| v.errors.location.is_some()).await;
        let snapshot = view.borrow().clone();
        assert!(snapshot.ranked_places.is_empty(), "no cycle without a fix");

        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_authority_session_polls_alerts() {
        let alert = SosAlert {
            id: 4,
            tourist_id: 7,
            tourist_name: "Ravi".to_string(),
            lat: 12.97,
            lng: 77.59,
            description: "help".to_string(),
            created_at: Utc::now(),
        };
        let controller = DashboardController::start_authority(
            quick_session(),
            Arc::new(FakeBackend {
                alerts: vec![alert],
            }),
        );
        let mut view = controller.view();

        wait_for_view(&mut view, |v| {
            v.state == DashboardState::Polling && !v.alerts.is_empty()
        })
        .await;

        let snapshot = view.borrow().clone();
        assert_eq!(snapshot.alerts[0].id, 4);
        assert_eq!(snapshot.tourists.len(), 1);

        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_sos_requires_a_tracked_position() {
        let (_feed, backend) = ChannelBackend::new(8);
        let controller = DashboardController::start_tourist(
            quick_session(),
            Arc::new(FakeBackend { alerts: Vec::new() }),
            Arc::new(OnePlaceSource),
            Box::new(backend),
        );

        let result = controller.send_sos("help").await;
        assert!(matches!(result, Err(SosError::NoLocationAvailable)));

        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_sos_uses_current_position() {
        let (feed, backend) = ChannelBackend::new(8);
        let controller = DashboardController::start_tourist(
            quick_session(),
            Arc::new(FakeBackend { alerts: Vec::new() }),
            Arc::new(OnePlaceSource),
            Box::new(backend),
        );
        let mut view = controller.view();

        feed.push(Position::new(12.9716, 77.5946)).await;
        wait_for_view(&mut view, |v| v.position.is_some()).await;

        let alert = controller.send_sos("lost").await.unwrap();
        assert_eq!(alert.lat, 12.9716);
        assert_eq!(alert.tourist_id, 7);

        controller.stop().await.unwrap();
    }
}
