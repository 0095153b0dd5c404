//! Abstractions for time, side effects and badge lookup to enable testing.
//!
//! This module provides traits for:
//! - `Clock`: Abstracting time access for deterministic testing
//! - `Notifier`: Toast-style user messages
//! - `BadgeSource`: Badge detail lookup used by the notification sequencer

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

use crate::error::{AppError, AppResult};
use crate::models::Badge;

// ==================== Clock Trait ====================

/// Trait for abstracting time access.
pub trait Clock: Send + Sync {
    /// Get the current time in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Get the current time in the local timezone.
    fn now_local(&self) -> DateTime<Local>;

    /// Today's local calendar date.
    fn today(&self) -> NaiveDate {
        self.now_local().date_naive()
    }

    /// The UTC instant at which the local calendar day `date` begins.
    fn day_start_utc(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        Local
            .from_local_datetime(&midnight)
            .earliest()
            .map_or_else(|| midnight.and_utc(), |t| t.with_timezone(&Utc))
    }
}

/// System clock implementation using real time.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Mock clock for testing with controllable time.
///
/// Local days follow a fixed offset (UTC unless built with
/// [`MockClock::with_offset`]) so tests do not depend on the host zone.
#[derive(Debug, Clone)]
pub struct MockClock {
    utc_time: Arc<Mutex<DateTime<Utc>>>,
    offset: FixedOffset,
}

impl MockClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self::with_offset(time, Utc.fix())
    }

    pub fn with_offset(time: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            utc_time: Arc::new(Mutex::new(time)),
            offset,
        }
    }

    pub fn set_time(&self, time: DateTime<Utc>) {
        *self.utc_time.lock().unwrap() = time;
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut time = self.utc_time.lock().unwrap();
        *time = *time + duration;
    }
}

impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.utc_time.lock().unwrap()
    }

    fn now_local(&self) -> DateTime<Local> {
        self.now_utc().with_timezone(&Local)
    }

    fn today(&self) -> NaiveDate {
        self.now_utc().with_timezone(&self.offset).date_naive()
    }

    fn day_start_utc(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        self.offset
            .from_local_datetime(&midnight)
            .earliest()
            .map_or_else(|| midnight.and_utc(), |t| t.with_timezone(&Utc))
    }
}

// ==================== Notifier Trait ====================

/// Sink for transient user-facing messages (success / failure toasts).
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Prints toasts to stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, body: &str) {
        if body.is_empty() {
            println!("{title}");
        } else {
            println!("{title}: {body}");
        }
    }
}

/// Mock notifier for testing that records all notifications.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    notifications: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_notifications(&self) -> Vec<(String, String)> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.notifications.lock().unwrap().clear();
    }

    pub fn was_called(&self) -> bool {
        !self.notifications.lock().unwrap().is_empty()
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, title: &str, body: &str) {
        self.notifications
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

// ==================== BadgeSource Trait ====================

/// Lookup of full badge details by id.
///
/// `Ok(None)` means the id does not exist in the catalog.
pub trait BadgeSource: Send + Sync + 'static {
    fn fetch_badge(&self, id: &str) -> impl Future<Output = AppResult<Option<Badge>>> + Send;
}

/// In-memory badge catalog for tests. Ids listed in `failing` return a
/// network error instead of a row.
#[derive(Debug, Clone, Default)]
pub struct MockBadgeSource {
    badges: Arc<Mutex<HashMap<String, Badge>>>,
    failing: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockBadgeSource {
    pub fn new(badges: impl IntoIterator<Item = Badge>) -> Self {
        let source = Self::default();
        {
            let mut map = source.badges.lock().unwrap();
            for badge in badges {
                map.insert(badge.id.clone(), badge);
            }
        }
        source
    }

    pub fn fail_on(&self, id: &str) {
        self.failing.lock().unwrap().push(id.to_string());
    }

    /// Ids requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl BadgeSource for MockBadgeSource {
    async fn fetch_badge(&self, id: &str) -> AppResult<Option<Badge>> {
        self.requests.lock().unwrap().push(id.to_string());
        if self.failing.lock().unwrap().iter().any(|f| f == id) {
            return Err(AppError::Network(format!("lookup of {id} failed")));
        }
        Ok(self.badges.lock().unwrap().get(id).cloned())
    }
}
