//! Mission Tracker Library
//!
//! Daily missions, streaks, badges and a calendar for a parent/child routine,
//! backed by a hosted backend. This module exposes the core components for
//! the CLI and for testing.

pub mod api;
pub mod calendar;
pub mod config;
pub mod dates;
pub mod error;
pub mod models;
pub mod popup;
pub mod rewards;
pub mod sequencer;
pub mod store;
pub mod streak;
pub mod tracker;
pub mod traits;
pub mod validation;

// Re-export commonly used types
pub use api::{BackendClient, Query};
pub use calendar::{CalendarCell, CompletionTier, month_view, tier_for};
pub use config::AppConfig;
pub use dates::{month_bounds, school_week, week_bounds};
pub use error::{AppError, AppResult, ValidationError};
pub use models::{Badge, BadgeType, DailySnapshot, Mission, MissionLog, SnapshotMission};
pub use popup::{DismissReason, PopupLifecycle, present_popup};
pub use sequencer::{NotificationHandle, NotificationService, Phase, Sequencer, SequencerState};
pub use store::{Loadable, Store};
pub use streak::{DayStatus, MissionListSource, resolve_mission_list, weekly_status};
pub use tracker::{CompletionOutcome, MissionTracker, TrackerSettings};
pub use traits::{
    BadgeSource, Clock, ConsoleNotifier, MockBadgeSource, MockClock, MockNotifier, Notifier,
    SystemClock,
};
