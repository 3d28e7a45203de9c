mod hub;
pub mod session;
pub mod timer;

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::{
    clock::{SystemClock, WallClock},
    config::AppConfig,
    state::session::DraftSession,
};

pub use self::hub::TimerHub;

/// Shared handle to the application state, cheap to clone.
pub type SharedState = Arc<AppState>;

/// Broadcast capacity of each session's push hub. Viewers that lag this far
/// behind are disconnected and reconnect through the snapshot path.
pub const HUB_CAPACITY: usize = 16;

/// Central application state holding the live session registry.
pub struct AppState {
    config: AppConfig,
    clock: Arc<dyn WallClock>,
    sessions: DashMap<Uuid, DraftSession>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Construct the state with an explicit wall clock.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn WallClock>) -> SharedState {
        Arc::new(Self {
            config,
            clock,
            sessions: DashMap::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Wall clock used to stamp protocol messages.
    pub fn clock(&self) -> Arc<dyn WallClock> {
        self.clock.clone()
    }

    /// Registry of live draft sessions keyed by their identifier.
    pub fn sessions(&self) -> &DashMap<Uuid, DraftSession> {
        &self.sessions
    }

    /// Total number of subscribed viewers across all sessions.
    pub fn viewer_total(&self) -> usize {
        self.sessions
            .iter()
            .map(|entry| entry.hub.viewer_count())
            .sum()
    }
}
