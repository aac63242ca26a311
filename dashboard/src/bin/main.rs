use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use backendclient::BackendClient;
use clap::Parser;
use dashboard::rest_api::{self, ApiState};
use dashboard::{DashboardConfig, DashboardController, DashboardState, SafetyBackend};
use geowatch::{ChannelBackend, PositionFeed, ReplayBackend};
use placesource::{OverpassSource, PlaceSource};
use proximity::Position;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SessionMode {
    Tourist,
    Authority,
}

#[derive(Parser, Debug)]
#[command(name = "safety-dashboard", about = "Tourist safety dashboard engine")]
struct Args {
    /// Session role, fixed for the session lifetime.
    #[arg(long, value_enum, default_value_t = SessionMode::Tourist)]
    mode: SessionMode,

    /// Backend user id for the session profile.
    #[arg(long, default_value_t = 1)]
    user_id: i64,

    /// Replay a demo route instead of waiting for device pushes.
    #[arg(long)]
    replay: bool,
}

/// A short walk around the default map center.
fn demo_route() -> Vec<Position> {
    vec![
        Position::new(12.9716, 77.5946),
        Position::new(12.9722, 77.5952),
        Position::new(12.9731, 77.5961),
        Position::new(12.9745, 77.5975),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let cfg = DashboardConfig::load();
    let session = cfg.session(args.user_id);

    let api: Arc<dyn SafetyBackend> = Arc::new(BackendClient::new(cfg.backend.clone())?);

    let (controller, feed): (DashboardController, Option<PositionFeed>) = match args.mode {
        SessionMode::Tourist => {
            let places: Arc<dyn PlaceSource> =
                Arc::new(OverpassSource::new(cfg.overpass.clone())?);
            if args.replay {
                let backend = ReplayBackend::new(demo_route(), Duration::from_secs(3));
                let controller =
                    DashboardController::start_tourist(session, api, places, Box::new(backend));
                (controller, None)
            } else {
                let (feed, backend) = ChannelBackend::new(64);
                let controller =
                    DashboardController::start_tourist(session, api, places, Box::new(backend));
                (controller, Some(feed))
            }
        }
        SessionMode::Authority => {
            let controller = DashboardController::start_authority(session, api);
            (controller, None)
        }
    };

    let state = Arc::new(ApiState { controller, feed });
    let api_shutdown = CancellationToken::new();

    let server = tokio::spawn(rest_api::serve(
        cfg.api_bind_addr.clone(),
        state.clone(),
        api_shutdown.clone(),
    ));

    info!("dashboard running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down");

    // Unmount: release the watch subscription and poll timers first, then
    // close the presentation API.
    state.controller.shutdown_token().cancel();
    let mut view = state.controller.view();
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        while view.borrow_and_update().state != DashboardState::Stopped {
            if view.changed().await.is_err() {
                break;
            }
        }
    })
    .await;

    api_shutdown.cancel();
    server.await??;

    info!("dashboard stopped");
    Ok(())
}
