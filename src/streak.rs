//! Weekly status, streaks and the mission-list fallback chain.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use crate::dates::is_weekday;
use crate::models::{DailySnapshot, Mission, SnapshotMission};

/// Completion state of one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Done,
    NotDone,
    NoData,
}

impl DayStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            DayStatus::Done => "●",
            DayStatus::NotDone => "○",
            DayStatus::NoData => "·",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayEntry {
    pub date: NaiveDate,
    pub status: DayStatus,
}

/// Status of each day of `week`.
///
/// Days after `today` have no data. For `today`, `today_done` (computed from
/// live logs) wins over the snapshot when present.
pub fn weekly_status(
    week: [NaiveDate; 5],
    snapshots: &[DailySnapshot],
    today: NaiveDate,
    today_done: Option<bool>,
) -> [DayEntry; 5] {
    let by_date: HashMap<NaiveDate, &DailySnapshot> =
        snapshots.iter().map(|s| (s.date, s)).collect();

    week.map(|date| {
        let status = if date > today {
            DayStatus::NoData
        } else if let (true, Some(done)) = (date == today, today_done) {
            if done { DayStatus::Done } else { DayStatus::NotDone }
        } else {
            match by_date.get(&date) {
                Some(s) if s.is_complete() => DayStatus::Done,
                Some(_) => DayStatus::NotDone,
                None => DayStatus::NoData,
            }
        };
        DayEntry { date, status }
    })
}

/// Where the mission list shown for today came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionListSource {
    TodaySnapshot,
    /// Most recent non-empty snapshot earlier in the same week.
    EarlierThisWeek(NaiveDate),
    Live,
}

/// Mission list for `today`: today's snapshot, else the latest non-empty
/// snapshot earlier in the week, else the live list.
pub fn resolve_mission_list(
    today: NaiveDate,
    today_snapshot: Option<&DailySnapshot>,
    week_snapshots: &[DailySnapshot],
    live: &[Mission],
) -> (MissionListSource, Vec<SnapshotMission>) {
    if let Some(snapshot) = today_snapshot.filter(|s| !s.missions.is_empty()) {
        return (MissionListSource::TodaySnapshot, sorted(snapshot.missions.clone()));
    }

    let earlier = week_snapshots
        .iter()
        .filter(|s| s.date < today && !s.missions.is_empty())
        .max_by_key(|s| s.date);
    if let Some(snapshot) = earlier {
        return (
            MissionListSource::EarlierThisWeek(snapshot.date),
            sorted(snapshot.missions.clone()),
        );
    }

    let live = live.iter().map(SnapshotMission::from).collect();
    (MissionListSource::Live, sorted(live))
}

fn sorted(mut missions: Vec<SnapshotMission>) -> Vec<SnapshotMission> {
    missions.sort_by_key(|m| m.order_index);
    missions
}

/// Consecutive fully completed weekdays ending today (if complete) or
/// yesterday. Weekends neither count nor break the streak.
pub fn current_streak(snapshots: &[DailySnapshot], today: NaiveDate, today_complete: bool) -> u32 {
    let complete: HashMap<NaiveDate, bool> =
        snapshots.iter().map(|s| (s.date, s.is_complete())).collect();

    let mut streak = 0;
    let mut day = today;
    if today_complete && is_weekday(today) {
        streak += 1;
    }
    loop {
        day -= Duration::days(1);
        if !is_weekday(day) {
            continue;
        }
        if complete.get(&day).copied().unwrap_or(false) {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// True when every day of the week is `Done`.
pub fn week_complete(entries: &[DayEntry; 5]) -> bool {
    entries.iter().all(|e| e.status == DayStatus::Done)
}
