//! Presentation-layer view of a dashboard session.

use std::collections::HashMap;

use backendclient::{SosAlert, TouristSummary};
use proximity::{Category, Position, RankedPlace};
use serde::Serialize;

/// Session role, fixed for the session lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Tourist,
    Authority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardState {
    Initializing,
    Tracking,
    Refreshing,
    Polling,
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LoadingFlags {
    pub profile: bool,
    pub places: bool,
    pub alerts: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorFlags {
    pub profile: Option<String>,
    pub location: Option<String>,
    pub places: HashMap<Category, String>,
    pub alerts: Option<String>,
}

/// The whole dashboard state as the presentation layer sees it, refreshed on
/// every state transition.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub mode: Mode,
    pub state: DashboardState,
    pub position: Option<Position>,
    pub ranked_places: HashMap<Category, Vec<RankedPlace>>,
    pub alerts: Vec<SosAlert>,
    pub tourists: Vec<TouristSummary>,
    pub loading: LoadingFlags,
    pub errors: ErrorFlags,
}

impl DashboardView {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            state: DashboardState::Initializing,
            position: None,
            ranked_places: HashMap::new(),
            alerts: Vec::new(),
            tourists: Vec::new(),
            loading: LoadingFlags {
                profile: true,
                places: false,
                alerts: mode == Mode::Authority,
            },
            errors: ErrorFlags::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_view_is_initializing() {
        let view = DashboardView::new(Mode::Tourist);
        assert_eq!(view.state, DashboardState::Initializing);
        assert!(view.loading.profile);
        assert!(!view.loading.alerts);
        assert!(view.position.is_none());
    }

    #[test]
    fn test_view_serializes_mode_lowercase() {
        let view = DashboardView::new(Mode::Authority);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["mode"], "authority");
        assert_eq!(json["state"], "initializing");
    }
}
