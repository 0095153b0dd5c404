//! Remote data accessors, one group per entity.
//!
//! Every accessor is a thin wrapper around a single table or RPC call. The
//! store never retries; callers decide whether a failure is surfaced or
//! logged and swallowed.

use std::future::Future;

use crate::api::BackendClient;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

mod badges;
mod challenges;
mod logs;
mod missions;
mod profile;
mod snapshots;

pub const MISSIONS: &str = "missions";
pub const MISSION_LOGS: &str = "mission_logs";
pub const DAILY_SNAPSHOTS: &str = "daily_snapshots";
pub const BADGES: &str = "badges";
pub const EARNED_BADGES: &str = "earned_badges";
pub const WEEKLY_BADGE_SETTINGS: &str = "weekly_badge_settings";
pub const CHALLENGES: &str = "challenges";
pub const PROFILES: &str = "profiles";

pub const RPC_INCREMENT_COMPLETED: &str = "increment_completed_count";
pub const RPC_DECREMENT_COMPLETED: &str = "decrement_completed_count";

/// Accessors scoped to one child's data.
#[derive(Clone, Debug)]
pub struct Store {
    client: BackendClient,
    user_id: String,
    image_bucket: String,
}

impl Store {
    pub fn new(client: BackendClient, user_id: impl Into<String>, image_bucket: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
            image_bucket: image_bucket.into(),
        }
    }

    /// Build a store from configuration; fails when no user id is set.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let user_id = config
            .user
            .user_id
            .clone()
            .ok_or(AppError::NotConfigured("user.user_id"))?;
        let client = BackendClient::new(&config.backend, &config.network)?;
        Ok(Self::new(client, user_id, config.backend.image_bucket.clone()))
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }
}

/// Loading / error / result state of one accessor call, as a view sees it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Loadable<T> {
    #[default]
    Idle,
    Loading,
    Ready(T),
    /// Generic user-facing message; details go to the log.
    Failed(String),
}

impl<T> Loadable<T> {
    /// Run `fut`, moving through `Loading` into `Ready` or `Failed`.
    pub async fn track<F>(&mut self, fut: F)
    where
        F: Future<Output = AppResult<T>>,
    {
        *self = Loadable::Loading;
        *self = match fut.await {
            Ok(value) => Loadable::Ready(value),
            Err(e) => {
                tracing::error!("Load failed: {}", e);
                Loadable::Failed(e.user_message())
            }
        };
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Loadable::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Loadable::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}
