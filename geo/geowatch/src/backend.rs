//! Platform position boundary.
//!
//! A [`PositionBackend`] is whatever actually produces fixes: a device
//! pushing over HTTP ([`ChannelBackend`]) or a scripted route for demos and
//! tests ([`ReplayBackend`]).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proximity::Position;
use thiserror::Error;
use tokio::sync::mpsc;

/// Classified watch failures. Delivery of one of these never implicitly
/// terminates the watch; the caller decides whether to retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position signal lost")]
    SignalLost,
}

/// A single platform-reported fix with its report time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub position: Position,
    pub reported_at: DateTime<Utc>,
}

impl PositionFix {
    pub fn now(position: Position) -> Self {
        Self {
            position,
            reported_at: Utc::now(),
        }
    }
}

/// Continuous-position capability of the platform.
///
/// Implementations deliver fixes (or classified failures) until the source
/// is exhausted, signalled by `None`.
#[async_trait]
pub trait PositionBackend: Send + 'static {
    async fn recv(&mut self) -> Option<Result<PositionFix, WatchError>>;
}

/// Producer half of a [`ChannelBackend`]. Cheap to clone; hand one to the
/// ingest layer that receives device pushes.
#[derive(Clone)]
pub struct PositionFeed {
    tx: mpsc::Sender<Result<PositionFix, WatchError>>,
}

impl PositionFeed {
    /// Push a fix stamped with the current time. Returns `false` once the
    /// watch side is gone.
    pub async fn push(&self, position: Position) -> bool {
        self.push_fix(PositionFix::now(position)).await
    }

    pub async fn push_fix(&self, fix: PositionFix) -> bool {
        self.tx.send(Ok(fix)).await.is_ok()
    }

    /// Report a platform failure without ending the subscription.
    pub async fn fail(&self, error: WatchError) -> bool {
        self.tx.send(Err(error)).await.is_ok()
    }
}

/// Backend fed from the outside over a channel.
pub struct ChannelBackend {
    rx: mpsc::Receiver<Result<PositionFix, WatchError>>,
}

impl ChannelBackend {
    pub fn new(capacity: usize) -> (PositionFeed, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (PositionFeed { tx }, Self { rx })
    }
}

#[async_trait]
impl PositionBackend for ChannelBackend {
    async fn recv(&mut self) -> Option<Result<PositionFix, WatchError>> {
        self.rx.recv().await
    }
}

/// Backend replaying a fixed route at a fixed cadence.
pub struct ReplayBackend {
    route: std::vec::IntoIter<Position>,
    cadence: Duration,
}

impl ReplayBackend {
    pub fn new(route: Vec<Position>, cadence: Duration) -> Self {
        Self {
            route: route.into_iter(),
            cadence,
        }
    }
}

#[async_trait]
impl PositionBackend for ReplayBackend {
    async fn recv(&mut self) -> Option<Result<PositionFix, WatchError>> {
        let next = self.route.next()?;
        tokio::time::sleep(self.cadence).await;
        Some(Ok(PositionFix::now(next)))
    }
}
