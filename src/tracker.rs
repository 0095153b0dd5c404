//! Application flows built on the store, the clock and the badge sequencer.
//!
//! Multi-step writes (log, counter, badge check) are plain sequences of
//! independent calls. Only the first write decides success; later steps that
//! fail are logged and skipped.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use crate::calendar::{CalendarCell, month_view};
use crate::config::{AppConfig, CalendarConfig};
use crate::dates::{month_bounds, school_week, week_bounds};
use crate::error::{AppError, AppResult, ValidationError};
use crate::models::{
    Badge, BadgeType, Challenge, ConditionType, DailySnapshot, EarnedBadge, Mission, MissionLog,
    SnapshotMission,
};
use crate::rewards::{ChallengeProgress, all_done, eligible_challenges};
use crate::sequencer::NotificationHandle;
use crate::store::Store;
use crate::streak::{
    DayEntry, MissionListSource, current_streak, resolve_mission_list, week_complete,
    weekly_status,
};
use crate::traits::{Clock, Notifier};
use crate::validation::{
    MAX_DESCRIPTION_LENGTH, MAX_MISSION_LENGTH, MAX_NAME_LENGTH, validate_image, validate_pin,
    validate_required, validate_required_count,
};

/// Snapshot history considered for challenge progress.
const HISTORY_DAYS: i64 = 365;
/// Snapshot history considered for the streak counter.
const STREAK_DAYS: i64 = 60;

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub calendar: CalendarConfig,
    pub daily_badge_id: Option<String>,
    pub max_image_bytes: u64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            calendar: CalendarConfig::default(),
            daily_badge_id: None,
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

impl From<&AppConfig> for TrackerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            calendar: config.calendar,
            daily_badge_id: config.badges.daily_badge_id.clone(),
            max_image_bytes: config.validation.max_image_bytes,
        }
    }
}

/// Today's mission list and what has been done so far.
#[derive(Debug, Clone, PartialEq)]
pub struct TodayView {
    pub date: NaiveDate,
    pub source: MissionListSource,
    pub missions: Vec<SnapshotMission>,
    pub completed: HashSet<String>,
    /// A snapshot row for today exists (possibly with an empty list).
    pub snapshot_exists: bool,
}

impl TodayView {
    pub fn is_completed(&self, mission_id: &str) -> bool {
        self.completed.contains(mission_id)
    }

    pub fn completed_count(&self) -> u32 {
        self.missions
            .iter()
            .filter(|m| self.completed.contains(&m.id))
            .count() as u32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekView {
    pub days: [DayEntry; 5],
    pub streak: u32,
    pub complete: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOutcome {
    pub all_done: bool,
    /// Badge ids queued for display by this completion.
    pub awarded: Vec<String>,
}

pub struct MissionTracker {
    store: Store,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    notifications: NotificationHandle,
    settings: TrackerSettings,
}

impl MissionTracker {
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        notifications: NotificationHandle,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            store,
            clock,
            notifier,
            notifications,
            settings,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn notifications(&self) -> &NotificationHandle {
        &self.notifications
    }

    // ==================== Today ====================

    /// Today's list via the snapshot fallback chain, plus today's logs.
    pub async fn today_missions(&self) -> AppResult<TodayView> {
        let today = self.clock.today();
        let today_snapshot = self.store.snapshot_for_date(today).await?;

        let has_list = today_snapshot
            .as_ref()
            .is_some_and(|s| !s.missions.is_empty());
        let (week_snapshots, live) = if has_list {
            (Vec::new(), Vec::new())
        } else {
            let (monday, _) = week_bounds(today);
            let week = self.store.snapshots_in_range(monday, today).await?;
            let has_earlier = week
                .iter()
                .any(|s| s.date < today && !s.missions.is_empty());
            let live = if has_earlier {
                Vec::new()
            } else {
                self.store.list_missions().await?
            };
            (week, live)
        };

        let (source, missions) =
            resolve_mission_list(today, today_snapshot.as_ref(), &week_snapshots, &live);
        let completed = self
            .store
            .logs_for_date(today)
            .await?
            .into_iter()
            .map(|l| l.mission_id)
            .collect();

        Ok(TodayView {
            date: today,
            source,
            missions,
            completed,
            snapshot_exists: today_snapshot.is_some(),
        })
    }

    /// Mark a mission done for today.
    pub async fn complete_mission(&self, mission_id: &str) -> AppResult<CompletionOutcome> {
        let mission_id = validate_required("Mission", mission_id, usize::MAX)?;
        let view = self.report(self.today_missions().await)?;
        if !view.missions.iter().any(|m| m.id == mission_id) {
            return Err(ValidationError::NotInToday(mission_id.to_string()).into());
        }
        if view.is_completed(mission_id) {
            return Ok(CompletionOutcome {
                all_done: self.all_done_after(&view, None),
                awarded: Vec::new(),
            });
        }

        self.report(self.store.insert_log(mission_id, view.date).await)?;

        let completed_count = view.completed_count() + 1;
        self.sync_snapshot_counter(&view, completed_count, true).await;

        let mut outcome = CompletionOutcome {
            all_done: self.all_done_after(&view, Some(mission_id)),
            awarded: Vec::new(),
        };
        if outcome.all_done {
            if let Some(badge_id) = self.award_daily_badge(view.date).await {
                outcome.awarded.push(badge_id);
            }
        }
        outcome.awarded.extend(self.award_challenges().await);

        let content = view
            .missions
            .iter()
            .find(|m| m.id == mission_id)
            .map_or(mission_id, |m| m.content.as_str());
        if outcome.all_done {
            self.notifier.notify("All missions done!", content);
        } else {
            self.notifier.notify("Mission complete", content);
        }
        Ok(outcome)
    }

    /// Undo today's completion of a mission.
    pub async fn uncomplete_mission(&self, mission_id: &str) -> AppResult<()> {
        let mission_id = validate_required("Mission", mission_id, usize::MAX)?;
        let view = self.report(self.today_missions().await)?;
        if !view.is_completed(mission_id) {
            return Ok(());
        }

        self.report(self.store.delete_log(mission_id, view.date).await)?;
        let completed_count = view.completed_count().saturating_sub(1);
        self.sync_snapshot_counter(&view, completed_count, false).await;

        self.notifier.notify("Mission reopened", "");
        Ok(())
    }

    fn all_done_after(&self, view: &TodayView, extra: Option<&str>) -> bool {
        let mut logs: Vec<MissionLog> = view
            .completed
            .iter()
            .map(|id| log_stub(id, view.date))
            .collect();
        if let Some(id) = extra {
            logs.push(log_stub(id, view.date));
        }
        all_done(&view.missions, &logs)
    }

    /// Secondary step: make today's snapshot reflect the new completed count.
    async fn sync_snapshot_counter(&self, view: &TodayView, completed_count: u32, increment: bool) {
        let result = if !view.snapshot_exists {
            self.store
                .create_snapshot(view.date, &view.missions, completed_count)
                .await
                .map(|_| ())
        } else if view.source != MissionListSource::TodaySnapshot {
            // Row exists with an empty list; freeze the resolved list first.
            match self
                .store
                .replace_snapshot_missions(view.date, &view.missions)
                .await
            {
                Ok(_) => self.counter_rpc(view.date, increment).await,
                Err(e) => Err(e),
            }
        } else {
            self.counter_rpc(view.date, increment).await
        };

        if let Err(e) = result {
            tracing::warn!("Snapshot update for {} failed, continuing: {}", view.date, e);
        }
    }

    async fn counter_rpc(&self, date: NaiveDate, increment: bool) -> AppResult<()> {
        let count = if increment {
            self.store.increment_completed(date).await?
        } else {
            self.store.decrement_completed(date).await?
        };
        tracing::debug!("Completed count for {} is now {}", date, count);
        Ok(())
    }

    /// Secondary step: award and queue the daily badge once per local day.
    async fn award_daily_badge(&self, date: NaiveDate) -> Option<String> {
        let badge_id = self.settings.daily_badge_id.as_deref()?;
        let day_start = self.clock.day_start_utc(date);
        let day_end = self.clock.day_start_utc(date + Duration::days(1));
        let result = async {
            if self.store.has_earned_between(badge_id, day_start, day_end).await? {
                return Ok(false);
            }
            self.store
                .award_badge(badge_id, BadgeType::Mission, self.clock.now_utc(), None)
                .await?;
            Ok::<_, AppError>(true)
        }
        .await;

        match result {
            Ok(true) => {
                self.notifications.enqueue(badge_id);
                Some(badge_id.to_string())
            }
            Ok(false) => None,
            Err(e) => {
                tracing::warn!("Daily badge check failed, skipping: {}", e);
                None
            }
        }
    }

    /// Secondary step: award every newly satisfied challenge.
    async fn award_challenges(&self) -> Vec<String> {
        let eligible = match self.eligible_challenge_badges().await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("Challenge check failed, skipping: {}", e);
                return Vec::new();
            }
        };

        let mut awarded = Vec::new();
        for challenge in eligible {
            match self
                .store
                .award_badge(&challenge.badge_id, BadgeType::Challenge, self.clock.now_utc(), None)
                .await
            {
                Ok(_) => {
                    tracing::info!("Challenge '{}' completed", challenge.name);
                    self.notifications.enqueue(challenge.badge_id.clone());
                    awarded.push(challenge.badge_id);
                }
                Err(e) => tracing::warn!("Awarding challenge '{}' failed: {}", challenge.name, e),
            }
        }
        awarded
    }

    async fn eligible_challenge_badges(&self) -> AppResult<Vec<Challenge>> {
        let challenges = self.store.list_challenges().await?;
        if challenges.is_empty() {
            return Ok(Vec::new());
        }
        let progress = self.challenge_progress().await?;
        let earned = self.store.earned_badges().await?;
        Ok(eligible_challenges(&challenges, &progress, &earned)
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn challenge_progress(&self) -> AppResult<ChallengeProgress> {
        let today = self.clock.today();
        let snapshots = self
            .store
            .snapshots_in_range(today - Duration::days(HISTORY_DAYS), today)
            .await?;
        let weeks = completed_weeks(&snapshots, today);
        let total = self.store.total_completions().await?;
        Ok(ChallengeProgress::from_history(&snapshots, &weeks, total))
    }

    // ==================== Missions ====================

    pub async fn list_missions(&self) -> AppResult<Vec<Mission>> {
        self.report(self.store.list_missions().await)
    }

    pub async fn add_mission(&self, content: &str) -> AppResult<Mission> {
        let content = validate_required("Mission", content, MAX_MISSION_LENGTH)?;
        let mission = self.report(self.store.add_mission(content).await)?;
        self.refresh_today_snapshot().await;
        self.notifier.notify("Mission added", &mission.content);
        Ok(mission)
    }

    pub async fn edit_mission(&self, mission_id: &str, content: &str) -> AppResult<()> {
        let content = validate_required("Mission", content, MAX_MISSION_LENGTH)?;
        self.report(self.store.update_mission_content(mission_id, content).await)?;
        self.refresh_today_snapshot().await;
        self.notifier.notify("Mission updated", content);
        Ok(())
    }

    pub async fn remove_mission(&self, mission_id: &str) -> AppResult<()> {
        let mission_id = validate_required("Mission", mission_id, usize::MAX)?;
        self.report(self.store.delete_mission(mission_id).await)?;
        self.refresh_today_snapshot().await;
        self.notifier.notify("Mission removed", "");
        Ok(())
    }

    pub async fn reorder_missions(&self, ordered_ids: &[String]) -> AppResult<()> {
        self.report(self.store.reorder_missions(ordered_ids).await)?;
        self.refresh_today_snapshot().await;
        Ok(())
    }

    /// Secondary step: today's snapshot follows live edits; earlier days stay frozen.
    async fn refresh_today_snapshot(&self) {
        let today = self.clock.today();
        let result = async {
            if self.store.snapshot_for_date(today).await?.is_none() {
                return Ok(());
            }
            let live: Vec<SnapshotMission> = self
                .store
                .list_missions()
                .await?
                .iter()
                .map(SnapshotMission::from)
                .collect();
            self.store.replace_snapshot_missions(today, &live).await?;
            Ok::<_, AppError>(())
        }
        .await;
        if let Err(e) = result {
            tracing::warn!("Refreshing today's snapshot failed: {}", e);
        }
    }

    // ==================== Week & calendar ====================

    pub async fn weekly_status(&self) -> AppResult<WeekView> {
        let today = self.clock.today();
        let view = self.report(self.today_missions().await)?;
        let snapshots = self.report(
            self.store
                .snapshots_in_range(today - Duration::days(STREAK_DAYS), today)
                .await,
        )?;

        let today_done = self.all_done_after(&view, None);
        let days = weekly_status(school_week(today), &snapshots, today, Some(today_done));
        Ok(WeekView {
            streak: current_streak(&snapshots, today, today_done),
            complete: week_complete(&days),
            days,
        })
    }

    pub async fn month_calendar(&self, year: i32, month: u32) -> AppResult<Vec<Option<CalendarCell>>> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| ValidationError::InvalidDate(format!("{year}-{month:02}")))?;
        let (start, end) = month_bounds(first);
        let snapshots: Vec<DailySnapshot> =
            self.report(self.store.snapshots_in_range(start, end).await)?;
        month_view(year, month, &snapshots, &self.settings.calendar)
            .ok_or_else(|| ValidationError::InvalidDate(format!("{year}-{month:02}")).into())
    }

    // ==================== Profile ====================

    pub async fn set_pin(&self, pin: &str) -> AppResult<()> {
        validate_pin(pin)?;
        self.report(self.store.update_pin(pin).await)?;
        self.notifier.notify("PIN updated", "");
        Ok(())
    }

    pub async fn verify_pin(&self, pin: &str) -> AppResult<bool> {
        validate_pin(pin)?;
        let profile = self.report(self.store.profile().await)?;
        Ok(profile.and_then(|p| p.pin).is_some_and(|stored| stored == pin))
    }

    pub async fn rename_child(&self, name: &str) -> AppResult<()> {
        let name = validate_required("Name", name, MAX_NAME_LENGTH)?;
        self.report(self.store.update_child_name(name).await)?;
        self.notifier.notify("Name updated", name);
        Ok(())
    }

    pub async fn set_theme(&self, theme: &str) -> AppResult<()> {
        let theme = validate_required("Theme", theme, MAX_NAME_LENGTH)?;
        self.report(self.store.set_theme(theme).await)?;
        Ok(())
    }

    // ==================== Badges & challenges ====================

    /// Earned badges joined with their catalog entries, newest first.
    pub async fn badge_collection(&self) -> AppResult<Vec<(EarnedBadge, Option<Badge>)>> {
        let earned = self.report(self.store.earned_badges().await)?;
        let catalog = self.report(self.store.list_badges().await)?;
        Ok(earned
            .into_iter()
            .map(|e| {
                let badge = catalog.iter().find(|b| b.id == e.badge_id).cloned();
                (e, badge)
            })
            .collect())
    }

    /// Claim a weekly badge after a fully completed week.
    pub async fn choose_weekly_badge(&self, badge_id: &str, reward_text: Option<&str>) -> AppResult<EarnedBadge> {
        let reward_text = reward_text
            .map(|r| validate_required("Reward", r, MAX_DESCRIPTION_LENGTH))
            .transpose()?;

        let week = self.weekly_status().await?;
        if !week.complete {
            return Err(ValidationError::WeekIncomplete.into());
        }
        let choices = self.report(self.store.weekly_badge_choices().await)?;
        if !choices.iter().any(|c| c.badge_id == badge_id) {
            return Err(ValidationError::NotAWeeklyChoice(badge_id.to_string()).into());
        }

        let earned = self.report(
            self.store
                .award_badge(badge_id, BadgeType::Weekly, self.clock.now_utc(), reward_text)
                .await,
        )?;
        self.notifications.enqueue(badge_id);
        Ok(earned)
    }

    pub async fn set_weekly_badge_choices(&self, badge_ids: &[String]) -> AppResult<()> {
        self.report(self.store.set_weekly_badge_choices(badge_ids).await)?;
        self.notifier.notify("Weekly badges saved", "");
        Ok(())
    }

    /// Mark a reward as used. Returns `false` when no such reward exists.
    pub async fn redeem_reward(&self, earned_id: &str) -> AppResult<bool> {
        let updated = self.report(self.store.mark_reward_used(earned_id).await)?;
        if updated.is_empty() {
            return Ok(false);
        }
        self.notifier.notify("Reward used", "");
        Ok(true)
    }

    /// Register a catalog badge whose image is already stored under `image_name`.
    pub async fn register_badge(
        &self,
        name: &str,
        description: Option<&str>,
        image_name: &str,
        image_size: u64,
    ) -> AppResult<Badge> {
        let name = validate_required("Badge name", name, MAX_NAME_LENGTH)?;
        let description = description
            .map(|d| validate_required("Description", d, MAX_DESCRIPTION_LENGTH))
            .transpose()?;
        validate_image(image_name, image_size, self.settings.max_image_bytes)?;

        let badge = self.report(
            self.store
                .create_badge(name, description, Some(image_name), BadgeType::Mission)
                .await,
        )?;
        self.notifier.notify("Badge created", &badge.name);
        Ok(badge)
    }

    pub async fn create_challenge(
        &self,
        name: &str,
        description: Option<&str>,
        badge_id: &str,
        condition_type: ConditionType,
        required_count: u32,
    ) -> AppResult<Challenge> {
        let name = validate_required("Challenge name", name, MAX_NAME_LENGTH)?;
        let description = description
            .map(|d| validate_required("Description", d, MAX_DESCRIPTION_LENGTH))
            .transpose()?;
        let badge_id = validate_required("Badge", badge_id, usize::MAX)?;
        validate_required_count(required_count)?;

        let challenge = self.report(
            self.store
                .create_challenge(name, description, badge_id, condition_type, required_count)
                .await,
        )?;
        self.notifier.notify("Challenge created", &challenge.name);
        Ok(challenge)
    }

    /// Toast remote failures; validation errors are left for inline display.
    fn report<T>(&self, result: AppResult<T>) -> AppResult<T> {
        if let Err(e) = &result {
            if !e.is_validation() {
                tracing::error!("{}", e);
                self.notifier.notify("Error", &e.user_message());
            }
        }
        result
    }
}

fn log_stub(mission_id: &str, date: NaiveDate) -> MissionLog {
    MissionLog {
        id: String::new(),
        user_id: String::new(),
        mission_id: mission_id.to_string(),
        completed_date: date,
    }
}

/// Weekly status of every past full week covered by `snapshots`.
fn completed_weeks(snapshots: &[DailySnapshot], today: NaiveDate) -> Vec<[DayEntry; 5]> {
    let Some(oldest) = snapshots.iter().map(|s| s.date).min() else {
        return Vec::new();
    };
    let (current_monday, _) = week_bounds(today);
    let mut monday = week_bounds(oldest).0;
    let mut weeks = Vec::new();
    while monday <= current_monday {
        let week = school_week(monday);
        weeks.push(weekly_status(week, snapshots, today, None));
        monday += Duration::days(7);
    }
    weeks
}
